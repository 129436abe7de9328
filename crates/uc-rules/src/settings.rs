//! Declarative rule settings
//!
//! `AppSettings` is the whole matching configuration: an ordered list of
//! rules, each pairing a host/scheme condition with a remove/warn action.
//! Order matters: it is the order in which warning settings are folded.
//!
//! The JSON shape uses camelCase keys:
//!
//! ```json
//! {
//!   "version": 1,
//!   "sites": [
//!     {
//!       "when": { "host": { "domains": "any" } },
//!       "then": {
//!         "remove": ["utm_*", "fbclid"],
//!         "warn": { "warnOnEmbeddedCredentials": true, "sensitiveParams": ["token"] }
//!       }
//!     },
//!     {
//!       "when": {
//!         "host": { "domains": { "listOf": ["example.com"] }, "subdomains": { "oneOf": ["www", ""] } },
//!         "schemes": ["https"]
//!       },
//!       "then": { "remove": ["ref"] }
//!     }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Newest settings document version this crate understands.
pub const SETTINGS_VERSION: u32 = 1;

/// Error decoding a settings document.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported settings version: {found} (newest supported is {supported})", supported = SETTINGS_VERSION)]
    UnsupportedVersion { found: u32 },
}

// =============================================================================
// Host conditions
// =============================================================================

/// Which registrable domains a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Domains {
    /// Every host, and URLs without one
    Any,
    ListOf(Vec<String>),
}

/// Which subdomains of a listed domain a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Subdomains {
    /// The host must equal the domain exactly
    None,
    /// The domain itself or any subdomain of it
    Any,
    /// The whole subdomain prefix must equal one of these; `""` is the bare domain
    OneOf(Vec<String>),
}

impl Default for Subdomains {
    fn default() -> Self {
        Self::None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostCond {
    pub domains: Domains,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdomains: Option<Subdomains>,
}

impl HostCond {
    /// Matches every host.
    pub fn any() -> Self {
        Self {
            domains: Domains::Any,
            subdomains: None,
        }
    }

    pub fn list_of<I, S>(domains: I, subdomains: Subdomains) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            domains: Domains::ListOf(domains.into_iter().map(Into::into).collect()),
            subdomains: Some(subdomains),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhenBlock {
    pub host: HostCond,
    /// When present, the URL scheme must be one of these (case-insensitive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schemes: Option<Vec<String>>,
}

impl WhenBlock {
    pub fn host(host: HostCond) -> Self {
        Self { host, schemes: None }
    }

    pub fn with_schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schemes = Some(schemes.into_iter().map(Into::into).collect());
        self
    }
}

// =============================================================================
// Actions
// =============================================================================

/// How a rule's `sensitiveParams` combine with those of earlier rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SensitiveMerge {
    #[default]
    Union,
    Replace,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarningSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn_on_embedded_credentials: Option<bool>,
    /// Glob patterns naming parameters worth a warning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitive_params: Option<Vec<String>>,
    #[serde(default)]
    pub sensitive_merge: SensitiveMerge,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThenBlock {
    /// Glob patterns matched against decoded parameter names
    #[serde(default)]
    pub remove: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn: Option<WarningSettings>,
}

impl ThenBlock {
    pub fn remove<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            remove: patterns.into_iter().map(Into::into).collect(),
            warn: None,
        }
    }

    pub fn with_warn(mut self, warn: WarningSettings) -> Self {
        self.warn = Some(warn);
        self
    }
}

// =============================================================================
// Rules
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlRule {
    pub when: WhenBlock,
    pub then: ThenBlock,
    /// Free-form annotations, carried through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
}

impl UrlRule {
    pub fn new(when: WhenBlock, then: ThenBlock) -> Self {
        Self {
            when,
            then,
            metadata: None,
        }
    }
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub sites: Vec<UrlRule>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            sites: Vec::new(),
        }
    }
}

impl AppSettings {
    pub fn new(sites: Vec<UrlRule>) -> Self {
        Self {
            version: SETTINGS_VERSION,
            sites,
        }
    }

    /// Decode a settings document.
    pub fn from_json(text: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(text)?;
        if settings.version > SETTINGS_VERSION {
            return Err(SettingsError::UnsupportedVersion {
                found: settings.version,
            });
        }
        Ok(settings)
    }

    pub fn to_json_pretty(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
