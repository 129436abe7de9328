//! Rule Engine
//!
//! Holds the current compiled rule set behind an `RwLock<Arc<_>>`. `load`
//! compiles a complete new snapshot and swaps it in under the write lock, so a
//! concurrent `evaluate` sees either the old rules or the new ones, never a
//! mix. Evaluation clones the `Arc` and releases the lock before doing any work.

use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, trace};
use uc_core::host::{HostCanonicalizer, IdnaCanonicalizer};
use uc_core::url::{Url, UrlError, UrlParts};

use crate::compiled::{CompiledRules, RuleLoadWarning};
use crate::evaluation::{merge_warnings, Evaluation, RuleMatch, TokenEffect};
use crate::settings::AppSettings;

/// Outcome of [`RuleEngine::load`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Rules compiled and active
    pub loaded: usize,
    /// Rules dropped because of an invalid pattern
    pub skipped: Vec<RuleLoadWarning>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

// =============================================================================
// Engine
// =============================================================================

/// The URL cleaning engine.
pub struct RuleEngine<C = IdnaCanonicalizer> {
    canonicalizer: C,
    rules: RwLock<Arc<CompiledRules>>,
}

impl RuleEngine<IdnaCanonicalizer> {
    /// Create an engine with no rules and the default canonicalizer.
    pub fn new() -> Self {
        Self::with_canonicalizer(IdnaCanonicalizer)
    }
}

impl Default for RuleEngine<IdnaCanonicalizer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: HostCanonicalizer> RuleEngine<C> {
    pub fn with_canonicalizer(canonicalizer: C) -> Self {
        Self {
            canonicalizer,
            rules: RwLock::new(Arc::new(CompiledRules::default())),
        }
    }

    pub fn canonicalizer(&self) -> &C {
        &self.canonicalizer
    }

    /// Replace the active rule set with `settings`.
    pub fn load(&self, settings: &AppSettings) -> LoadReport {
        let (compiled, skipped) = CompiledRules::compile(settings, &self.canonicalizer);
        let loaded = compiled.len();
        debug!(
            "Loaded {} of {} rules ({} skipped)",
            loaded,
            settings.sites.len(),
            skipped.len()
        );

        *self.rules.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(compiled);

        LoadReport { loaded, skipped }
    }

    /// The active rule set.
    pub fn snapshot(&self) -> Arc<CompiledRules> {
        Arc::clone(&self.rules.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn evaluate(&self, parts: &UrlParts) -> Evaluation {
        evaluate(&self.snapshot(), parts, &self.canonicalizer)
    }

    /// New parts with every token marked for removal dropped.
    pub fn apply_removals(&self, parts: &UrlParts) -> UrlParts {
        let evaluation = self.evaluate(parts);
        remove_tokens(parts, &evaluation)
    }

    /// Parse, clean and re-serialize. Fails for text that is not a usable URL.
    pub fn clean_url(&self, raw: &str) -> Result<String, UrlError> {
        let url = Url::parse(raw)?;
        Ok(self.apply_removals(url.parts()).to_string())
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Evaluate `parts` against a rule snapshot.
///
/// Every matching rule contributes: a token is removed if any pattern of any
/// matching rule hits its decoded name.
pub fn evaluate<C: HostCanonicalizer + ?Sized>(rules: &CompiledRules, parts: &UrlParts, canon: &C) -> Evaluation {
    let host = parts.host.as_deref().map(|h| canonical_host(h, canon));
    let scheme = parts.scheme.as_deref();

    let matched: Vec<_> = rules
        .iter()
        .filter(|rule| {
            let hit = rule.applies_to(scheme, host.as_deref());
            trace!("Rule {} {}", rule.rule_index, if hit { "matches" } else { "does not match" });
            hit
        })
        .collect();

    let token_effects: Vec<TokenEffect> = parts
        .query_pairs()
        .iter()
        .map(|token| {
            let mut effect = TokenEffect::untouched(token);
            for rule in &matched {
                let patterns = rule
                    .matching_patterns(&token.decoded_key)
                    .map(str::to_string)
                    .collect();
                effect.record(rule.rule_index, patterns);
            }
            effect
        })
        .collect();

    let (effective_warnings, sensitive) = merge_warnings(matched.iter().copied());

    let matches: Vec<RuleMatch> = matched
        .iter()
        .map(|rule| RuleMatch {
            rule_index: rule.rule_index,
            rule: Arc::clone(&rule.rule),
        })
        .collect();

    let evaluation = Evaluation {
        matches,
        token_effects,
        effective_warnings,
        sensitive,
    };
    debug!(
        "Evaluated {:?}: {} rules matched, {} of {} tokens removed",
        host,
        evaluation.matches.len(),
        evaluation.removed_count(),
        evaluation.token_effects.len()
    );
    evaluation
}

/// Canonical host, or the lowercase original when canonicalization fails.
fn canonical_host<C: HostCanonicalizer + ?Sized>(host: &str, canon: &C) -> String {
    canon.to_ascii(host).unwrap_or_else(|| {
        debug!("Host {host:?} does not canonicalize, matching on its lowercase form");
        host.to_lowercase()
    })
}

/// Rebuild the query without the removed tokens. If nothing is left the `?` goes too.
fn remove_tokens(parts: &UrlParts, evaluation: &Evaluation) -> UrlParts {
    let Some(query) = &parts.query else {
        return parts.clone();
    };
    if evaluation.removed_count() == 0 {
        return parts.clone();
    }

    let kept = query.retained(|token| !evaluation.will_remove(token.token_index));
    parts.with_query((!kept.is_empty()).then_some(kept))
}
