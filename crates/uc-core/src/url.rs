//! Structural URL parsing
//!
//! The parser is deliberately permissive, in the manner of a platform URI
//! parser: it splits a string into components without validating them against
//! RFC 3986. Only the scheme is normalized (lowercased); every other component
//! keeps its source text so that a parsed URL serializes back unchanged.
//!
//! [`Url`] is the strict variant: a parsed URL that is known to have both a
//! scheme and a host.

use std::fmt;
use std::str::FromStr;

use crate::query::QueryPairs;

// =============================================================================
// Errors
// =============================================================================

/// The input could not be split into URL components at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Empty input")]
    Empty,
    #[error("Unterminated IPv6 literal at byte {position}")]
    UnterminatedIpv6 { position: usize },
    #[error("Invalid authority: {0}")]
    InvalidAuthority(String),
}

/// The input parsed, but is not a usable URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidUrl {
    #[error("URL has no scheme")]
    MissingScheme,
    #[error("URL has no host")]
    MissingHost,
}

/// Error returned by [`Url::parse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Invalid(#[from] InvalidUrl),
}

// =============================================================================
// UrlParts
// =============================================================================

/// A URL split into its components.
///
/// `host` is `Some("")` when an authority is present but empty (`file:///x`).
/// `query` is `None` when there is no `?`, and an empty [`QueryPairs`] for a
/// bare `?`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UrlParts {
    pub scheme: Option<String>,
    pub user_info: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: String,
    pub query: Option<QueryPairs>,
    pub fragment: Option<String>,
    /// Port text that is not a valid port, kept so the URL serializes back unchanged
    unparsed_port: Option<String>,
}

static EMPTY_QUERY: QueryPairs = QueryPairs::EMPTY;

impl UrlParts {
    /// Parse a raw string. See [`parse`].
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        parse(raw)
    }

    /// Query tokens, empty when the URL has no query.
    pub fn query_pairs(&self) -> &QueryPairs {
        self.query.as_ref().unwrap_or(&EMPTY_QUERY)
    }

    /// The query string without the leading `?`.
    pub fn raw_query(&self) -> Option<String> {
        self.query.as_ref().map(QueryPairs::to_raw)
    }

    /// True when the URL carries non-empty credentials before the host.
    pub fn has_credentials(&self) -> bool {
        self.user_info.as_deref().is_some_and(|ui| !ui.is_empty())
    }

    /// Copy of these parts with the query replaced.
    pub fn with_query(&self, query: Option<QueryPairs>) -> Self {
        Self {
            query,
            ..self.clone()
        }
    }

    /// The text after the authority's `:` when it is not a number in 0..=65535.
    pub fn unparsed_port(&self) -> Option<&str> {
        self.unparsed_port.as_deref()
    }

    #[inline]
    fn has_authority(&self) -> bool {
        self.host.is_some()
            || self.user_info.is_some()
            || self.port.is_some()
            || self.unparsed_port.is_some()
    }
}

impl fmt::Display for UrlParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{scheme}:")?;
        }
        if self.has_authority() {
            f.write_str("//")?;
            if let Some(user_info) = &self.user_info {
                write!(f, "{user_info}@")?;
            }
            f.write_str(self.host.as_deref().unwrap_or(""))?;
            if let Some(port) = self.port {
                write!(f, ":{port}")?;
            } else if let Some(text) = &self.unparsed_port {
                write!(f, ":{text}")?;
            }
        }
        f.write_str(&self.path)?;
        if let Some(query) = &self.query {
            write!(f, "?{}", query.to_raw())?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

impl FromStr for UrlParts {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Split a raw string into URL components.
///
/// Surrounding whitespace is ignored; anything inside is kept verbatim. Fails
/// only for empty input and malformed IPv6 literals.
pub fn parse(raw: &str) -> Result<UrlParts, ParseError> {
    let input = raw.trim();
    if input.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut parts = UrlParts::default();

    let rest = match scheme_end(input) {
        Some(colon) => {
            parts.scheme = Some(input[..colon].to_ascii_lowercase());
            &input[colon + 1..]
        }
        None => input,
    };
    let rest_offset = input.len() - rest.len();

    let rest = match rest.strip_prefix("//") {
        Some(after) => {
            let end = find_any(after, b"/?#").unwrap_or(after.len());
            parse_authority(&after[..end], rest_offset + 2, &mut parts)?;
            &after[end..]
        }
        None => rest,
    };

    let (before_fragment, fragment) = match rest.split_once('#') {
        Some((before, fragment)) => (before, Some(fragment)),
        None => (rest, None),
    };
    let (path, query) = match before_fragment.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (before_fragment, None),
    };

    parts.path = path.to_string();
    parts.query = query.map(QueryPairs::parse);
    parts.fragment = fragment.map(str::to_string);

    Ok(parts)
}

/// Position of the `:` terminating a syntactically valid scheme.
#[inline]
fn scheme_end(input: &str) -> Option<usize> {
    let bytes = input.as_bytes();
    let colon = find_any(input, b":/?#")?;
    if bytes[colon] != b':' || colon == 0 || !bytes[0].is_ascii_alphabetic() {
        return None;
    }
    let valid = bytes[1..colon]
        .iter()
        .all(|&b| b.is_ascii_alphanumeric() || b == b'+' || b == b'-' || b == b'.');
    valid.then_some(colon)
}

#[inline]
fn find_any(s: &str, set: &[u8]) -> Option<usize> {
    s.bytes().position(|b| set.contains(&b))
}

/// Fill user info, host and port from the authority text.
/// `offset` is the authority's position in the input, for error reporting.
fn parse_authority(authority: &str, offset: usize, parts: &mut UrlParts) -> Result<(), ParseError> {
    let (user_info, host_port, host_offset) = match authority.rfind('@') {
        Some(at) => (Some(&authority[..at]), &authority[at + 1..], offset + at + 1),
        None => (None, authority, offset),
    };
    parts.user_info = user_info.map(str::to_string);

    let (host, port_text) = if host_port.starts_with('[') {
        let close = host_port
            .find(']')
            .ok_or(ParseError::UnterminatedIpv6 { position: host_offset })?;
        let after = &host_port[close + 1..];
        let port_text = match after.strip_prefix(':') {
            Some(port) => Some(port),
            None if after.is_empty() => None,
            None => return Err(ParseError::InvalidAuthority(authority.to_string())),
        };
        (&host_port[..=close], port_text)
    } else {
        match host_port.rfind(':') {
            Some(colon) => (&host_port[..colon], Some(&host_port[colon + 1..])),
            None => (host_port, None),
        }
    };

    parts.host = Some(host.to_string());
    parts.port = port_text.and_then(parse_port);
    if parts.port.is_none() {
        parts.unparsed_port = port_text.map(str::to_string);
    }
    Ok(())
}

/// Digits only, 0..=65535.
#[inline]
fn parse_port(text: &str) -> Option<u16> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

// =============================================================================
// Url
// =============================================================================

/// A parsed URL guaranteed to have a scheme and a non-empty host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    parts: UrlParts,
}

impl Url {
    /// Parse and validate in one step.
    pub fn parse(raw: &str) -> Result<Self, UrlError> {
        let parts = parse(raw)?;
        Ok(Self::from_parts(parts)?)
    }

    /// Validate already-parsed parts.
    pub fn from_parts(parts: UrlParts) -> Result<Self, InvalidUrl> {
        if parts.scheme.as_deref().map_or(true, str::is_empty) {
            return Err(InvalidUrl::MissingScheme);
        }
        if parts.host.as_deref().map_or(true, str::is_empty) {
            return Err(InvalidUrl::MissingHost);
        }
        Ok(Self { parts })
    }

    pub fn scheme(&self) -> &str {
        self.parts.scheme.as_deref().unwrap_or_default()
    }

    pub fn host(&self) -> &str {
        self.parts.host.as_deref().unwrap_or_default()
    }

    pub fn parts(&self) -> &UrlParts {
        &self.parts
    }

    pub fn into_parts(self) -> UrlParts {
        self.parts
    }
}

impl TryFrom<UrlParts> for Url {
    type Error = InvalidUrl;

    fn try_from(parts: UrlParts) -> Result<Self, Self::Error> {
        Self::from_parts(parts)
    }
}

impl FromStr for Url {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.parts, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_full() {
        let p = parse("HTTPS://user:pw@Example.com:8443/a/b?x=1&y#frag").unwrap();
        assert_eq!(p.scheme.as_deref(), Some("https"));
        assert_eq!(p.user_info.as_deref(), Some("user:pw"));
        assert_eq!(p.host.as_deref(), Some("Example.com"));
        assert_eq!(p.port, Some(8443));
        assert_eq!(p.path, "/a/b");
        assert_eq!(p.raw_query().as_deref(), Some("x=1&y"));
        assert_eq!(p.fragment.as_deref(), Some("frag"));
    }

    #[test]
    fn test_user_info_uses_last_at() {
        let p = parse("https://a@b:c@example.com/").unwrap();
        assert_eq!(p.user_info.as_deref(), Some("a@b:c"));
        assert_eq!(p.host.as_deref(), Some("example.com"));
        assert!(p.has_credentials());
    }

    #[test]
    fn test_ipv6_host() {
        let p = parse("http://[::1]:8080/x").unwrap();
        assert_eq!(p.host.as_deref(), Some("[::1]"));
        assert_eq!(p.port, Some(8080));

        let p = parse("http://[2001:db8::1]/").unwrap();
        assert_eq!(p.host.as_deref(), Some("[2001:db8::1]"));
        assert_eq!(p.port, None);
    }

    #[test]
    fn test_ipv6_errors() {
        assert!(matches!(parse("http://[::1/x"), Err(ParseError::UnterminatedIpv6 { .. })));
        assert!(matches!(parse("http://[::1]junk/"), Err(ParseError::InvalidAuthority(_))));
    }

    #[test]
    fn test_port_bounds() {
        assert_eq!(parse("http://h:65535/").unwrap().port, Some(65535));
        assert_eq!(parse("http://h:0/").unwrap().port, Some(0));

        let p = parse("http://h:65536/").unwrap();
        assert_eq!(p.port, None);
        assert_eq!(p.host.as_deref(), Some("h"));

        assert_eq!(parse("http://h:abc/").unwrap().port, None);
        assert_eq!(parse("http://h:+80/").unwrap().port, None);
        assert_eq!(parse("http://h:/").unwrap().port, None);
    }

    #[test]
    fn test_unparsed_port_serializes_back() {
        let p = parse("https://example.com:99999/p?x=1").unwrap();
        assert_eq!(p.port, None);
        assert_eq!(p.unparsed_port(), Some("99999"));
        assert_eq!(p.host.as_deref(), Some("example.com"));
        assert_eq!(p.to_string(), "https://example.com:99999/p?x=1");

        for raw in ["http://h:abc/", "http://h:/", "http://[::1]:x/", "http://u@h:+80"] {
            assert_eq!(parse(raw).unwrap().to_string(), raw);
        }

        let p = parse("http://h:8080/").unwrap();
        assert_eq!(p.unparsed_port(), None);
    }

    #[test]
    fn test_default_port_is_kept() {
        let p = parse("https://example.com:443/").unwrap();
        assert_eq!(p.port, Some(443));
        assert_eq!(p.to_string(), "https://example.com:443/");
    }

    #[test]
    fn test_permissive_inputs() {
        let p = parse("mailto:someone@example.com").unwrap();
        assert_eq!(p.scheme.as_deref(), Some("mailto"));
        assert_eq!(p.host, None);
        assert_eq!(p.path, "someone@example.com");

        let p = parse("about:").unwrap();
        assert_eq!(p.scheme.as_deref(), Some("about"));
        assert_eq!(p.path, "");

        let p = parse("example.com/path?q=1").unwrap();
        assert_eq!(p.scheme, None);
        assert_eq!(p.path, "example.com/path");

        let p = parse("file:///etc/hosts").unwrap();
        assert_eq!(p.host.as_deref(), Some(""));
        assert_eq!(p.to_string(), "file:///etc/hosts");
    }

    #[test]
    fn test_bare_question_mark() {
        let p = parse("https://example.com/?").unwrap();
        assert!(p.query.as_ref().unwrap().is_empty());
        assert_eq!(p.to_string(), "https://example.com/?");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse("   "), Err(ParseError::Empty));
        assert_eq!(parse(""), Err(ParseError::Empty));
    }

    #[test]
    fn test_interior_whitespace_kept_verbatim() {
        let p = parse("https://example.com/search?q=hello world&utm_source=x").unwrap();
        assert_eq!(p.host.as_deref(), Some("example.com"));
        assert_eq!(p.query_pairs().get(0).unwrap().decoded_value, "hello world");
        assert_eq!(p.query_pairs().get(1).unwrap().decoded_key, "utm_source");
        assert_eq!(p.to_string(), "https://example.com/search?q=hello world&utm_source=x");

        let p = parse("https://example.com/a\tb#x y").unwrap();
        assert_eq!(p.path, "/a\tb");
        assert_eq!(p.fragment.as_deref(), Some("x y"));

        let p = parse("not a url").unwrap();
        assert_eq!(p.scheme, None);
        assert_eq!(p.path, "not a url");
        assert_eq!(Url::parse("not a url"), Err(UrlError::Invalid(InvalidUrl::MissingScheme)));
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        let p = parse("  https://example.com/\n").unwrap();
        assert_eq!(p.to_string(), "https://example.com/");
    }

    #[test]
    fn test_serialize_preserves_encoding() {
        let raw = "https://example.com/p%20q?utm%5Fsource=a%2Bb&x=caf%C3%A9#f%20g";
        assert_eq!(parse(raw).unwrap().to_string(), raw);
    }

    #[test]
    fn test_url_validation() {
        assert!(Url::parse("https://example.com").is_ok());
        assert_eq!(
            Url::parse("example.com/path"),
            Err(UrlError::Invalid(InvalidUrl::MissingScheme))
        );
        assert_eq!(
            Url::parse("mailto:x@example.com"),
            Err(UrlError::Invalid(InvalidUrl::MissingHost))
        );
        assert_eq!(
            Url::parse("file:///tmp"),
            Err(UrlError::Invalid(InvalidUrl::MissingHost))
        );
        assert!(matches!(Url::parse(""), Err(UrlError::Parse(ParseError::Empty))));

        let url: Url = "https://Example.com:8080/x".parse().unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host(), "Example.com");
        assert_eq!(url.to_string(), "https://Example.com:8080/x");
    }

    fn assert_component_equal(a: &UrlParts, b: &UrlParts) {
        assert_eq!(a.scheme, b.scheme);
        assert_eq!(a.user_info, b.user_info);
        assert_eq!(a.host, b.host);
        assert_eq!(a.port, b.port);
        assert_eq!(a.unparsed_port(), b.unparsed_port());
        assert_eq!(a.path, b.path);
        assert_eq!(a.fragment, b.fragment);
        assert_eq!(a.query, b.query);
    }

    #[test]
    fn test_round_trip_samples() {
        let samples = [
            "https://www.example.com/watch?v=abc&utm_source=x&utm_source=y#t=10",
            "http://user@[fe80::1]:80/?a&a=&a=1",
            "https://example.com:notaport/path",
            "ftp://ftp.example.org/pub;type=d",
            "intent://scan/#Intent;scheme=zxing;end",
            "?only=query",
            "#only-fragment",
        ];
        for raw in samples {
            let first = parse(raw).unwrap();
            let second = parse(&first.to_string()).unwrap();
            assert_component_equal(&first, &second);
        }
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            scheme in "[a-z][a-z0-9+.-]{0,6}",
            user in proptest::option::of("[a-z0-9:%]{0,8}"),
            host in "[a-z0-9.-]{0,12}",
            port in proptest::option::of(any::<u16>()),
            path in "(/[a-zA-Z0-9%._~-]{0,6}){0,3}",
            query in proptest::option::of("[a-z0-9=&%_]{0,16}"),
            fragment in proptest::option::of("[a-z0-9#?/=&]{0,8}"),
        ) {
            let mut raw = format!("{scheme}://");
            if let Some(user) = &user {
                raw.push_str(user);
                raw.push('@');
            }
            raw.push_str(&host);
            if let Some(port) = port {
                raw.push_str(&format!(":{port}"));
            }
            raw.push_str(&path);
            if let Some(query) = &query {
                raw.push('?');
                raw.push_str(query);
            }
            if let Some(fragment) = &fragment {
                raw.push('#');
                raw.push_str(fragment);
            }

            let first = parse(&raw).unwrap();
            prop_assert_eq!(first.to_string(), raw.clone());
            let second = parse(&first.to_string()).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
