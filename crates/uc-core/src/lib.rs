//! urlcleaner Core Library
//!
//! This crate provides the string-level building blocks of the URL cleaner:
//! everything needed to take a raw URL apart, compare its host against rule
//! domains, and match query parameter names against rule patterns. It knows
//! nothing about rules themselves; see `uc-rules` for that.
//!
//! # Modules
//!
//! - `percent`: UTF-8 safe percent encoding and lossless decoding
//! - `query`: Ordered, duplicate-preserving query token model
//! - `url`: Permissive URL parser, serializer and the validated `Url`
//! - `host`: Host canonicalization (case fold + IDNA) for rule comparison
//! - `glob`: `*` / `?` / `\` glob patterns with bounded-time matching

pub mod glob;
pub mod host;
pub mod percent;
pub mod query;
pub mod url;

// Re-export commonly used types
pub use glob::{Glob, PatternError};
pub use host::{CachingCanonicalizer, HostCanonicalizer, IdnaCanonicalizer};
pub use query::{QueryPairs, QueryToken};
pub use url::{InvalidUrl, ParseError, Url, UrlError, UrlParts};
