//! urlcleaner Rules
//!
//! Declarative cleaning rules and the engine that applies them. Settings are
//! loaded as a whole, compiled into an immutable snapshot and swapped in
//! atomically; evaluation reports which rules matched, which query tokens go
//! and why, and which warnings apply.
//!
//! # Modules
//!
//! - `settings`: Serde model of the rule document (`AppSettings`, `UrlRule`, ...)
//! - `compiled`: Load-time validation and compilation of rules
//! - `evaluation`: Per-URL results and the warning merge
//! - `engine`: `RuleEngine`, the thread-safe entry point

pub mod compiled;
pub mod engine;
pub mod evaluation;
pub mod settings;

// Re-export commonly used types
pub use compiled::{CompiledRule, CompiledRules, RuleLoadWarning};
pub use engine::{evaluate, LoadReport, RuleEngine};
pub use evaluation::{Evaluation, RuleMatch, TokenEffect};
pub use settings::{
    AppSettings, Domains, HostCond, SensitiveMerge, SettingsError, Subdomains, ThenBlock, UrlRule,
    WarningSettings, WhenBlock, SETTINGS_VERSION,
};
