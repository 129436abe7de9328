//! Percent encoding for URL components
//!
//! Encoding keeps only the RFC 3986 unreserved set. Decoding is lossless:
//! anything that is not a well-formed `%XX` triplet passes through untouched,
//! and `+` is never turned into a space.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything except `[A-Za-z0-9-._~]` is escaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

// =============================================================================
// Encoding
// =============================================================================

/// Percent-encode a component. Hex digits are uppercase.
pub fn encode(input: &str) -> String {
    utf8_percent_encode(input, COMPONENT).to_string()
}

// =============================================================================
// Decoding
// =============================================================================

#[inline]
fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Decode the `%XX` triplet starting at `pos`, if there is one.
#[inline]
fn triplet_at(bytes: &[u8], pos: usize) -> Option<u8> {
    if bytes.get(pos) != Some(&b'%') {
        return None;
    }
    let hi = hex_value(*bytes.get(pos + 1)?)?;
    let lo = hex_value(*bytes.get(pos + 2)?)?;
    Some(hi << 4 | lo)
}

/// Percent-decode a component.
///
/// Contiguous runs of triplets are collected and decoded together so that
/// multi-byte UTF-8 sequences are reassembled. Bytes inside a run that do not
/// form valid UTF-8 are emitted as their original triplet text.
pub fn decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut run: Vec<u8> = Vec::new();
    let mut run_start = 0;
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if let Some(byte) = triplet_at(bytes, i) {
            if run.is_empty() {
                out.push_str(&input[literal_start..i]);
                run_start = i;
            }
            run.push(byte);
            i += 3;
            literal_start = i;
            continue;
        }

        if !run.is_empty() {
            push_run(&mut out, &run, &input[run_start..i]);
            run.clear();
        }
        i += 1;
    }

    if !run.is_empty() {
        push_run(&mut out, &run, &input[run_start..]);
    }
    out.push_str(&input[literal_start..]);

    out
}

/// Append a decoded run. `raw` is the run's source text, three characters per byte.
fn push_run(out: &mut String, run: &[u8], raw: &str) {
    let mut offset = 0;

    while offset < run.len() {
        match std::str::from_utf8(&run[offset..]) {
            Ok(text) => {
                out.push_str(text);
                return;
            }
            Err(err) => {
                let valid = err.valid_up_to();
                if let Ok(text) = std::str::from_utf8(&run[offset..offset + valid]) {
                    out.push_str(text);
                }
                let bad_start = offset + valid;
                let bad_len = err.error_len().unwrap_or(run.len() - bad_start);
                out.push_str(&raw[bad_start * 3..(bad_start + bad_len) * 3]);
                offset = bad_start + bad_len;
            }
        }
    }
}
