//! Glob patterns for query parameter names
//!
//! Syntax: `*` matches any run of characters (including none), `?` matches
//! exactly one character, and `\x` matches `x` literally for any `x`.
//! Matching is anchored at both ends and case-sensitive.
//!
//! Evaluation uses the two-pointer scan with a single backtrack checkpoint,
//! so the worst case is `O(pattern * candidate)` no matter how many `*` the
//! pattern contains.

/// Longest accepted pattern, in characters.
pub const MAX_PATTERN_LEN: usize = 256;

/// A malformed pattern. `context` names where the pattern came from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("{context}: Empty pattern")]
    Empty { context: String },
    #[error("{context}: Pattern is {len} characters long (max {max})", max = MAX_PATTERN_LEN)]
    TooLong { context: String, len: usize },
    #[error("{context}: Illegal character {ch:?} at {position}")]
    IllegalCharacter {
        context: String,
        ch: char,
        position: usize,
    },
    #[error("{context}: Trailing backslash")]
    TrailingBackslash { context: String },
}

// =============================================================================
// Validation
// =============================================================================

/// Check length, characters and escape well-formedness.
pub fn require_valid(pattern: &str, context: &str) -> Result<(), PatternError> {
    compile(pattern, context).map(drop)
}

// =============================================================================
// Compiled glob
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyChar,
    AnyRun,
}

/// A validated, pre-tokenized pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glob {
    source: String,
    tokens: Vec<Token>,
}

impl Glob {
    pub fn new(pattern: &str, context: &str) -> Result<Self, PatternError> {
        Ok(Self {
            source: pattern.to_string(),
            tokens: compile(pattern, context)?,
        })
    }

    /// The pattern text as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Anchored match against the whole candidate.
    pub fn matches(&self, candidate: &str) -> bool {
        let text: Vec<char> = candidate.chars().collect();
        match_tokens(&self.tokens, &text)
    }
}

/// One-shot match. An invalid pattern matches nothing.
pub fn matches(pattern: &str, candidate: &str) -> bool {
    match compile(pattern, "pattern") {
        Ok(tokens) => {
            let text: Vec<char> = candidate.chars().collect();
            match_tokens(&tokens, &text)
        }
        Err(_) => false,
    }
}

fn compile(pattern: &str, context: &str) -> Result<Vec<Token>, PatternError> {
    if pattern.is_empty() {
        return Err(PatternError::Empty {
            context: context.to_string(),
        });
    }

    let len = pattern.chars().count();
    if len > MAX_PATTERN_LEN {
        return Err(PatternError::TooLong {
            context: context.to_string(),
            len,
        });
    }

    let mut tokens = Vec::with_capacity(len);
    let mut chars = pattern.chars().enumerate();

    while let Some((position, ch)) = chars.next() {
        if ch.is_control() {
            return Err(PatternError::IllegalCharacter {
                context: context.to_string(),
                ch,
                position,
            });
        }

        let token = match ch {
            '\\' => match chars.next() {
                Some((position, escaped)) if escaped.is_control() => {
                    return Err(PatternError::IllegalCharacter {
                        context: context.to_string(),
                        ch: escaped,
                        position,
                    });
                }
                Some((_, escaped)) => Token::Literal(escaped),
                None => {
                    return Err(PatternError::TrailingBackslash {
                        context: context.to_string(),
                    });
                }
            },
            '?' => Token::AnyChar,
            // Consecutive stars are equivalent to one
            '*' if tokens.last() == Some(&Token::AnyRun) => continue,
            '*' => Token::AnyRun,
            other => Token::Literal(other),
        };
        tokens.push(token);
    }

    Ok(tokens)
}

// =============================================================================
// Matching
// =============================================================================

/// Greedy scan that remembers only the most recent `*`. On a mismatch it
/// resumes right after that star with the star consuming one more character.
fn match_tokens(tokens: &[Token], text: &[char]) -> bool {
    let mut p = 0;
    let mut t = 0;
    let mut checkpoint: Option<(usize, usize)> = None;

    while t < text.len() {
        match tokens.get(p) {
            Some(Token::AnyRun) => {
                p += 1;
                checkpoint = Some((p, t));
                continue;
            }
            Some(Token::AnyChar) => {
                p += 1;
                t += 1;
                continue;
            }
            Some(Token::Literal(c)) if *c == text[t] => {
                p += 1;
                t += 1;
                continue;
            }
            _ => {}
        }

        match checkpoint {
            Some((star_p, star_t)) => {
                p = star_p;
                t = star_t + 1;
                checkpoint = Some((star_p, t));
            }
            None => return false,
        }
    }

    tokens[p..].iter().all(|tok| *tok == Token::AnyRun)
}
