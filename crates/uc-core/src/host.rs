//! Host canonicalization for rule matching
//!
//! A canonical host is lowercased, has no trailing dot, and has every
//! non-ASCII label converted to Punycode. It is only ever used for comparison,
//! never for display.
//!
//! # Examples
//!
//! ```
//! use uc_core::host::to_ascii;
//!
//! assert_eq!(to_ascii("EXAMPLE.com.").as_deref(), Some("example.com"));
//! assert!(to_ascii("例え.テスト").unwrap().starts_with("xn--"));
//! assert_eq!(to_ascii("invalid..domain"), None);
//! ```

use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;
use std::sync::{Mutex, PoisonError};

const MAX_LABEL_LEN: usize = 63;
const MAX_HOST_LEN: usize = 253;

// =============================================================================
// Canonicalizer capability
// =============================================================================

/// Something that can turn a host into its canonical ASCII form.
///
/// Returns `None` for hosts that are structurally invalid.
pub trait HostCanonicalizer {
    fn to_ascii(&self, host: &str) -> Option<String>;
}

impl<F> HostCanonicalizer for F
where
    F: Fn(&str) -> Option<String>,
{
    fn to_ascii(&self, host: &str) -> Option<String> {
        self(host)
    }
}

/// The default canonicalizer: case fold plus IDNA/UTS-46 via the `idna` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdnaCanonicalizer;

impl HostCanonicalizer for IdnaCanonicalizer {
    #[inline]
    fn to_ascii(&self, host: &str) -> Option<String> {
        to_ascii(host)
    }
}

// =============================================================================
// Canonicalization
// =============================================================================

/// Canonicalize a host.
///
/// IPv4 literals and bracketed IPv6 literals are only lowercased. Labels that
/// are already ASCII (including `xn--` labels) are left as they are.
pub fn to_ascii(host: &str) -> Option<String> {
    let host = host.strip_suffix('.').unwrap_or(host);
    if host.is_empty() {
        return None;
    }

    if host.starts_with('[') {
        return (host.len() > 2 && host.ends_with(']')).then(|| host.to_ascii_lowercase());
    }

    if host.parse::<Ipv4Addr>().is_ok() {
        return Some(host.to_string());
    }

    let lower = host.to_lowercase();
    if lower.split('.').any(str::is_empty) {
        return None;
    }

    let ascii = if lower.is_ascii() {
        lower
    } else {
        match idna::domain_to_ascii(&lower) {
            Ok(ascii) => ascii,
            Err(err) => {
                log::debug!("IDNA conversion failed for {host:?}: {err:?}");
                return None;
            }
        }
    };

    is_well_formed(&ascii).then_some(ascii)
}

/// Label and length limits on an ASCII host.
fn is_well_formed(host: &str) -> bool {
    !host.is_empty()
        && host.len() <= MAX_HOST_LEN
        && host
            .split('.')
            .all(|label| !label.is_empty() && label.len() <= MAX_LABEL_LEN)
}

// =============================================================================
// LRU Cache
// =============================================================================

/// Simple fixed-size cache for canonicalization results.
/// Uses a basic LRU strategy with a hashmap + deque.
struct LruCache {
    capacity: usize,
    entries: HashMap<String, Option<String>>,
    order: VecDeque<String>,
}

impl LruCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    fn get(&mut self, key: &str) -> Option<Option<String>> {
        let value = self.entries.get(key)?.clone();
        // Move to back (most recently used)
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
        Some(value)
    }

    fn insert(&mut self, key: String, value: Option<String>) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.contains_key(&key) {
            self.order.retain(|k| k != &key);
        } else if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, value);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

/// Memoizes another canonicalizer, negative results included.
pub struct CachingCanonicalizer<C> {
    inner: C,
    cache: Mutex<LruCache>,
}

impl<C: HostCanonicalizer> CachingCanonicalizer<C> {
    pub fn new(inner: C, capacity: usize) -> Self {
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of cached hosts.
    pub fn cached(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn clear(&self) {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl<C: HostCanonicalizer> HostCanonicalizer for CachingCanonicalizer<C> {
    fn to_ascii(&self, host: &str) -> Option<String> {
        if let Some(hit) = self.cache.lock().unwrap_or_else(PoisonError::into_inner).get(host) {
            return hit;
        }

        // Computed outside the lock; a concurrent miss just does the work twice.
        let result = self.inner.to_ascii(host);
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(host.to_string(), result.clone());
        result
    }
}
