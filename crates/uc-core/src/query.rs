//! Ordered query-string model
//!
//! A query is kept as the sequence of its `&`-separated tokens, in source
//! order, with duplicates intact. Each token keeps its raw text so that a
//! rebuilt query reproduces the original encoding byte for byte.

use crate::percent;

/// One `key[=value]` unit of a query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryToken {
    /// Position within the query, 0-based
    pub token_index: usize,
    /// Key exactly as it appeared in the source
    pub raw_key: String,
    /// Value exactly as it appeared in the source (empty when there is no `=`)
    pub raw_value: String,
    pub decoded_key: String,
    pub decoded_value: String,
    /// Distinguishes `a` from `a=`
    pub has_equals: bool,
}

impl QueryToken {
    /// Build a token from its raw source text.
    pub fn parse(token_index: usize, raw: &str) -> Self {
        let (raw_key, raw_value, has_equals) = match raw.split_once('=') {
            Some((key, value)) => (key, value, true),
            None => (raw, "", false),
        };

        Self {
            token_index,
            raw_key: raw_key.to_string(),
            raw_value: raw_value.to_string(),
            decoded_key: percent::decode(raw_key),
            decoded_value: percent::decode(raw_value),
            has_equals,
        }
    }

    /// Write the token back in its original encoding.
    pub fn write_raw(&self, out: &mut String) {
        out.push_str(&self.raw_key);
        if self.has_equals {
            out.push('=');
            out.push_str(&self.raw_value);
        }
    }
}

/// Ordered, duplicate-preserving collection of query tokens.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryPairs {
    tokens: Vec<QueryToken>,
}

impl QueryPairs {
    /// A query with no tokens.
    pub const EMPTY: Self = Self { tokens: Vec::new() };

    /// Tokenize a raw (undecoded) query string, without the leading `?`.
    ///
    /// An empty string has no tokens. Empty tokens between separators
    /// (`a&&b`) are kept so the query survives a rebuild unchanged.
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::default();
        }

        let tokens = raw
            .split('&')
            .enumerate()
            .map(|(idx, part)| QueryToken::parse(idx, part))
            .collect();

        Self { tokens }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueryToken> {
        self.tokens.iter()
    }

    pub fn get(&self, token_index: usize) -> Option<&QueryToken> {
        self.tokens.get(token_index)
    }

    /// All tokens whose decoded key equals `key`, in order.
    pub fn find<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a QueryToken> + 'a {
        self.tokens.iter().filter(move |t| t.decoded_key == key)
    }

    /// Rebuild with only the tokens for which `keep` returns true.
    /// Relative order and raw encoding are preserved; indexes are renumbered.
    pub fn retained<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&QueryToken) -> bool,
    {
        let tokens = self
            .tokens
            .iter()
            .filter(|t| keep(*t))
            .enumerate()
            .map(|(idx, t)| QueryToken {
                token_index: idx,
                ..t.clone()
            })
            .collect();

        Self { tokens }
    }

    /// Serialize back to a raw query string (no leading `?`).
    pub fn to_raw(&self) -> String {
        let mut out = String::new();
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                out.push('&');
            }
            token.write_raw(&mut out);
        }
        out
    }
}

impl<'a> IntoIterator for &'a QueryPairs {
    type Item = &'a QueryToken;
    type IntoIter = std::slice::Iter<'a, QueryToken>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}
