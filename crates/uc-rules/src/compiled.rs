//! Compiled rule snapshot
//!
//! Settings are compiled once per load into an immutable [`CompiledRules`]:
//! patterns are validated and tokenized, and rule-side domains and subdomain
//! labels are canonicalized so that evaluation only does comparisons.
//! A rule with an invalid pattern is dropped and reported; the rest still load.

use std::sync::Arc;

use log::warn;
use uc_core::glob::{Glob, PatternError};
use uc_core::host::HostCanonicalizer;

use crate::settings::{AppSettings, Domains, Subdomains, UrlRule};

/// A rule that was skipped at load time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Rule {rule_index} skipped: {error}")]
pub struct RuleLoadWarning {
    pub rule_index: usize,
    pub pattern: String,
    #[source]
    pub error: PatternError,
}

// =============================================================================
// Host matching
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum HostMatcher {
    Any,
    ListOf {
        domains: Vec<String>,
        subdomains: Subdomains,
    },
}

impl HostMatcher {
    fn compile<C: HostCanonicalizer + ?Sized>(
        rule_index: usize,
        domains: &Domains,
        subdomains: Option<&Subdomains>,
        canon: &C,
    ) -> Self {
        let domains = match domains {
            Domains::Any => return Self::Any,
            Domains::ListOf(domains) => domains
                .iter()
                .map(|d| canonical_domain(rule_index, d, canon))
                .collect(),
        };

        let subdomains = match subdomains.cloned().unwrap_or_default() {
            Subdomains::OneOf(labels) => Subdomains::OneOf(
                labels
                    .iter()
                    .map(|l| if l.is_empty() { String::new() } else { canonical_domain(rule_index, l, canon) })
                    .collect(),
            ),
            other => other,
        };

        Self::ListOf { domains, subdomains }
    }

    fn matches(&self, host: Option<&str>) -> bool {
        match self {
            Self::Any => true,
            Self::ListOf { domains, subdomains } => match host {
                Some(host) => domains.iter().any(|d| host_matches(host, d, subdomains)),
                None => false,
            },
        }
    }
}

/// Canonical form of a rule-side domain, or its lowercase form if it does not canonicalize.
fn canonical_domain<C: HostCanonicalizer + ?Sized>(rule_index: usize, raw: &str, canon: &C) -> String {
    let trimmed = raw.trim();
    canon.to_ascii(trimmed).unwrap_or_else(|| {
        warn!("Rule {rule_index}: domain {raw:?} does not canonicalize, comparing it as-is");
        trimmed.to_lowercase()
    })
}

/// Does `host` fall under `domain` per the subdomain condition?
pub(crate) fn host_matches(host: &str, domain: &str, subdomains: &Subdomains) -> bool {
    let prefix = if host == domain {
        ""
    } else {
        match host.strip_suffix(domain).and_then(|p| p.strip_suffix('.')) {
            Some(prefix) if !prefix.is_empty() && !domain.is_empty() => prefix,
            _ => return false,
        }
    };

    match subdomains {
        Subdomains::None => prefix.is_empty(),
        Subdomains::Any => true,
        Subdomains::OneOf(labels) => labels.iter().any(|l| l == prefix),
    }
}

// =============================================================================
// Compiled rule
// =============================================================================

#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// Position of the rule in `AppSettings::sites`
    pub rule_index: usize,
    pub rule: Arc<UrlRule>,
    schemes: Option<Vec<String>>,
    host: HostMatcher,
    remove: Vec<Glob>,
    sensitive: Vec<Glob>,
}

impl CompiledRule {
    pub fn compile<C: HostCanonicalizer + ?Sized>(
        rule_index: usize,
        rule: &UrlRule,
        canon: &C,
    ) -> Result<Self, RuleLoadWarning> {
        let invalid = |pattern: &str, error: PatternError| RuleLoadWarning {
            rule_index,
            pattern: pattern.to_string(),
            error,
        };

        let mut remove = Vec::with_capacity(rule.then.remove.len());
        for (i, pattern) in rule.then.remove.iter().enumerate() {
            let context = format!("rule {rule_index} remove[{i}]");
            remove.push(Glob::new(pattern, &context).map_err(|e| invalid(pattern.as_str(), e))?);
        }

        let params = rule.then.warn.as_ref().and_then(|w| w.sensitive_params.as_ref());
        let mut sensitive = Vec::new();
        for (i, pattern) in params.into_iter().flatten().enumerate() {
            let context = format!("rule {rule_index} sensitiveParams[{i}]");
            sensitive.push(Glob::new(pattern, &context).map_err(|e| invalid(pattern.as_str(), e))?);
        }

        let schemes = rule
            .when
            .schemes
            .as_ref()
            .map(|list| list.iter().map(|s| s.trim().to_ascii_lowercase()).collect());

        let host = HostMatcher::compile(
            rule_index,
            &rule.when.host.domains,
            rule.when.host.subdomains.as_ref(),
            canon,
        );

        Ok(Self {
            rule_index,
            rule: Arc::new(rule.clone()),
            schemes,
            host,
            remove,
            sensitive,
        })
    }

    /// Scheme membership, then host condition. `host` must already be canonical.
    pub fn applies_to(&self, scheme: Option<&str>, host: Option<&str>) -> bool {
        if let Some(schemes) = &self.schemes {
            let Some(scheme) = scheme else {
                return false;
            };
            if !schemes.iter().any(|s| s.eq_ignore_ascii_case(scheme)) {
                return false;
            }
        }
        self.host.matches(host)
    }

    /// Compiled `sensitiveParams`, in settings order. Empty when the rule sets none.
    pub fn sensitive_params(&self) -> &[Glob] {
        &self.sensitive
    }

    /// Remove patterns that match a decoded parameter name, in rule order.
    pub fn matching_patterns<'r>(&'r self, name: &'r str) -> impl Iterator<Item = &'r str> + 'r {
        self.remove.iter().filter(move |g| g.matches(name)).map(Glob::as_str)
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// The immutable rule set an engine evaluates against.
#[derive(Debug, Clone, Default)]
pub struct CompiledRules {
    rules: Vec<CompiledRule>,
}

impl CompiledRules {
    /// Compile every rule, collecting the ones that fail instead of aborting.
    pub fn compile<C: HostCanonicalizer + ?Sized>(
        settings: &AppSettings,
        canon: &C,
    ) -> (Self, Vec<RuleLoadWarning>) {
        let mut rules = Vec::with_capacity(settings.sites.len());
        let mut skipped = Vec::new();

        for (rule_index, rule) in settings.sites.iter().enumerate() {
            match CompiledRule::compile(rule_index, rule, canon) {
                Ok(compiled) => rules.push(compiled),
                Err(warning) => {
                    warn!("{warning}");
                    skipped.push(warning);
                }
            }
        }

        (Self { rules }, skipped)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CompiledRule> {
        self.rules.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{HostCond, ThenBlock, WarningSettings, WhenBlock};
    use uc_core::host::IdnaCanonicalizer;

    fn one_of(labels: &[&str]) -> Subdomains {
        Subdomains::OneOf(labels.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_host_matches_none() {
        assert!(host_matches("example.com", "example.com", &Subdomains::None));
        assert!(!host_matches("www.example.com", "example.com", &Subdomains::None));
    }

    #[test]
    fn test_host_matches_any() {
        assert!(host_matches("example.com", "example.com", &Subdomains::Any));
        assert!(host_matches("a.b.example.com", "example.com", &Subdomains::Any));
        assert!(!host_matches("badexample.com", "example.com", &Subdomains::Any));
        assert!(!host_matches("example.com.evil", "example.com", &Subdomains::Any));
    }

    #[test]
    fn test_host_matches_one_of() {
        let subs = one_of(&["www", ""]);
        assert!(host_matches("www.example.com", "example.com", &subs));
        assert!(host_matches("example.com", "example.com", &subs));
        assert!(!host_matches("m.example.com", "example.com", &subs));
        assert!(!host_matches("api.v2.example.com", "example.com", &subs));

        let subs = one_of(&["www"]);
        assert!(!host_matches("example.com", "example.com", &subs));

        let subs = one_of(&["api.v2"]);
        assert!(host_matches("api.v2.example.com", "example.com", &subs));
    }

    #[test]
    fn test_compile_canonicalizes_rule_side() {
        let rule = UrlRule::new(
            WhenBlock::host(HostCond::list_of(["Example.COM.", "bücher.de"], one_of(&["WWW", ""])))
                .with_schemes(["HTTPS"]),
            ThenBlock::remove(["utm_*"]),
        );
        let compiled = CompiledRule::compile(0, &rule, &IdnaCanonicalizer).unwrap();

        assert!(compiled.applies_to(Some("https"), Some("www.example.com")));
        assert!(compiled.applies_to(Some("https"), Some("xn--bcher-kva.de")));
        assert!(!compiled.applies_to(Some("http"), Some("example.com")));
        assert!(!compiled.applies_to(None, Some("example.com")));
        assert!(!compiled.applies_to(Some("https"), None));
    }

    #[test]
    fn test_domains_any_matches_hostless() {
        let rule = UrlRule::new(WhenBlock::host(HostCond::any()), ThenBlock::remove(["x"]));
        let compiled = CompiledRule::compile(0, &rule, &IdnaCanonicalizer).unwrap();
        assert!(compiled.applies_to(None, None));
        assert!(compiled.applies_to(Some("mailto"), None));
    }

    #[test]
    fn test_uncanonical_domain_falls_back_to_lowercase() {
        let rule = UrlRule::new(
            WhenBlock::host(HostCond::list_of(["Bad..Domain"], Subdomains::None)),
            ThenBlock::remove(["x"]),
        );
        let compiled = CompiledRule::compile(0, &rule, &IdnaCanonicalizer).unwrap();
        assert!(compiled.applies_to(Some("https"), Some("bad..domain")));
    }

    #[test]
    fn test_matching_patterns_in_order() {
        let rule = UrlRule::new(WhenBlock::host(HostCond::any()), ThenBlock::remove(["utm_*", "*_source", "ref"]));
        let compiled = CompiledRule::compile(0, &rule, &IdnaCanonicalizer).unwrap();
        let hits: Vec<&str> = compiled.matching_patterns("utm_source").collect();
        assert_eq!(hits, ["utm_*", "*_source"]);
        assert_eq!(compiled.matching_patterns("q").count(), 0);
    }

    #[test]
    fn test_sensitive_params_compiled_at_load() {
        let rule = UrlRule::new(
            WhenBlock::host(HostCond::any()),
            ThenBlock::default().with_warn(WarningSettings {
                sensitive_params: Some(vec!["*token".into(), "pwd".into()]),
                ..Default::default()
            }),
        );
        let compiled = CompiledRule::compile(0, &rule, &IdnaCanonicalizer).unwrap();
        let patterns: Vec<&str> = compiled.sensitive_params().iter().map(Glob::as_str).collect();
        assert_eq!(patterns, ["*token", "pwd"]);
        assert!(compiled.sensitive_params()[0].matches("access_token"));

        let plain = UrlRule::new(WhenBlock::host(HostCond::any()), ThenBlock::remove(["x"]));
        let compiled = CompiledRule::compile(0, &plain, &IdnaCanonicalizer).unwrap();
        assert!(compiled.sensitive_params().is_empty());
    }

    #[test]
    fn test_compile_skips_only_bad_rules() {
        let settings = AppSettings::new(vec![
            UrlRule::new(WhenBlock::host(HostCond::any()), ThenBlock::remove(["utm_*"])),
            UrlRule::new(WhenBlock::host(HostCond::any()), ThenBlock::remove(["ok", "bad\\"])),
            UrlRule::new(
                WhenBlock::host(HostCond::any()),
                ThenBlock::default().with_warn(WarningSettings {
                    sensitive_params: Some(vec!["".into()]),
                    ..Default::default()
                }),
            ),
            UrlRule::new(WhenBlock::host(HostCond::any()), ThenBlock::remove(["fbclid"])),
        ]);

        let (rules, skipped) = CompiledRules::compile(&settings, &IdnaCanonicalizer);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.iter().map(|r| r.rule_index).collect::<Vec<_>>(), [0, 3]);

        assert_eq!(skipped.len(), 2);
        assert_eq!(skipped[0].rule_index, 1);
        assert_eq!(skipped[0].pattern, "bad\\");
        assert!(matches!(skipped[0].error, PatternError::TrailingBackslash { .. }));
        assert_eq!(skipped[0].to_string(), "Rule 1 skipped: rule 1 remove[1]: Trailing backslash");
        assert_eq!(skipped[1].rule_index, 2);
        assert!(matches!(skipped[1].error, PatternError::Empty { .. }));
    }
}
