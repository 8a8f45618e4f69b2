//! Validated storage-namespace token.

use std::fmt;
use thiserror::Error;

/// Maximum accepted token length in bytes.
pub const MAX_TOKEN_LEN: usize = 128;

/// A bearer token validated for use as a filename component.
///
/// Tokens double as the storage-namespace key: the store derives the
/// per-token file name directly from the raw string. [`Token::parse`]
/// therefore allow-lists the characters a token may contain (ASCII
/// alphanumerics plus `.`, `_` and `-`), so a validated token can never
/// name a path outside the storage directory. Unvalidated strings
/// cannot reach path construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// Validates a raw bearer string.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidToken`] if the string is empty, longer than
    /// [`MAX_TOKEN_LEN`] bytes, or contains a character outside
    /// `[A-Za-z0-9._-]`.
    pub fn parse(raw: &str) -> Result<Self, InvalidToken> {
        if raw.is_empty() {
            return Err(InvalidToken::Empty);
        }
        if raw.len() > MAX_TOKEN_LEN {
            return Err(InvalidToken::TooLong(raw.len()));
        }
        if let Some(found) = raw.chars().find(|c| !is_allowed(*c)) {
            return Err(InvalidToken::ForbiddenChar(found));
        }
        Ok(Self(raw.to_owned()))
    }

    /// Returns the validated token string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

/// Reason a bearer string failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidToken {
    /// The token was empty.
    #[error("token is empty")]
    Empty,
    /// The token exceeded [`MAX_TOKEN_LEN`] bytes.
    #[error("token is {0} bytes, limit is {MAX_TOKEN_LEN}")]
    TooLong(usize),
    /// The token contained a character outside the allow-list.
    #[error("token contains forbidden character {0:?}")]
    ForbiddenChar(char),
}
