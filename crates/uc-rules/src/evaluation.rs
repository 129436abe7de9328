//! Evaluation results
//!
//! An [`Evaluation`] is produced once per evaluate call and describes, for a
//! single URL, which rules matched, what happens to every query token, and
//! the warning settings in force after folding all matching rules.

use std::collections::BTreeMap;
use std::sync::Arc;

use uc_core::glob::Glob;
use uc_core::query::QueryToken;
use uc_core::url::UrlParts;

use crate::compiled::CompiledRule;
use crate::settings::{SensitiveMerge, UrlRule, WarningSettings};

/// A rule that matched, with its position in the settings list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub rule_index: usize,
    pub rule: Arc<UrlRule>,
}

/// What happens to one query token, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEffect {
    pub token_index: usize,
    /// Decoded parameter name
    pub name: String,
    pub will_be_removed: bool,
    /// Every matching rule with at least one pattern hitting this token, in settings order
    pub matched_rule_indexes: Vec<usize>,
    pub matched_patterns_by_rule: BTreeMap<usize, Vec<String>>,
}

impl TokenEffect {
    pub(crate) fn untouched(token: &QueryToken) -> Self {
        Self {
            token_index: token.token_index,
            name: token.decoded_key.clone(),
            will_be_removed: false,
            matched_rule_indexes: Vec::new(),
            matched_patterns_by_rule: BTreeMap::new(),
        }
    }

    pub(crate) fn record(&mut self, rule_index: usize, patterns: Vec<String>) {
        if patterns.is_empty() {
            return;
        }
        self.will_be_removed = true;
        self.matched_rule_indexes.push(rule_index);
        self.matched_patterns_by_rule.insert(rule_index, patterns);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub matches: Vec<RuleMatch>,
    pub token_effects: Vec<TokenEffect>,
    pub effective_warnings: WarningSettings,
    /// `effective_warnings.sensitive_params`, as compiled at load
    pub(crate) sensitive: Vec<Glob>,
}

impl Evaluation {
    pub fn matched_rule_indexes(&self) -> impl Iterator<Item = usize> + '_ {
        self.matches.iter().map(|m| m.rule_index)
    }

    pub fn removed_count(&self) -> usize {
        self.token_effects.iter().filter(|e| e.will_be_removed).count()
    }

    pub fn will_remove(&self, token_index: usize) -> bool {
        self.token_effects
            .iter()
            .any(|e| e.token_index == token_index && e.will_be_removed)
    }

    /// True when the URL carries credentials and the matching rules ask for a warning.
    pub fn credential_warning(&self, parts: &UrlParts) -> bool {
        self.effective_warnings.warn_on_embedded_credentials == Some(true) && parts.has_credentials()
    }

    /// Indexes of tokens in `parts` whose decoded name matches an effective
    /// sensitive-parameter pattern. Pass the cleaned parts to check only what
    /// will actually be shared.
    pub fn sensitive_tokens(&self, parts: &UrlParts) -> Vec<usize> {
        if self.sensitive.is_empty() {
            return Vec::new();
        }

        parts
            .query_pairs()
            .iter()
            .filter(|t| self.sensitive.iter().any(|g| g.matches(&t.decoded_key)))
            .map(|t| t.token_index)
            .collect()
    }
}

// =============================================================================
// Warning merge
// =============================================================================

/// Fold warning settings over matching rules in settings order.
///
/// `warnOnEmbeddedCredentials`: last rule that sets it wins.
/// `sensitiveParams`: an explicitly empty list clears the accumulator; a
/// non-empty list is unioned into it (order-preserving, deduplicated) or
/// replaces it, per the rule's merge mode. Rules that leave a field unset
/// inherit it.
///
/// The compiled globs of the surviving `sensitiveParams` are returned
/// alongside, in the same order.
pub(crate) fn merge_warnings<'a, I>(rules: I) -> (WarningSettings, Vec<Glob>)
where
    I: IntoIterator<Item = &'a CompiledRule>,
{
    let mut merged = WarningSettings::default();
    let mut globs: Vec<Glob> = Vec::new();

    for rule in rules {
        let Some(warn) = &rule.rule.then.warn else {
            continue;
        };

        if let Some(flag) = warn.warn_on_embedded_credentials {
            merged.warn_on_embedded_credentials = Some(flag);
        }

        let Some(params) = &warn.sensitive_params else {
            continue;
        };

        if params.is_empty() || warn.sensitive_merge == SensitiveMerge::Replace {
            merged.sensitive_params = Some(Vec::new());
            globs.clear();
        }
        let acc = merged.sensitive_params.get_or_insert_with(Vec::new);
        for glob in rule.sensitive_params() {
            if !acc.iter().any(|p| p == glob.as_str()) {
                acc.push(glob.as_str().to_string());
                globs.push(glob.clone());
            }
        }
    }

    (merged, globs)
}
