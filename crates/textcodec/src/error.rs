//! Decode- and encode-side error types.
//!
//! `NoMatch` is a control-flow signal: it means a codec looked at the start of
//! its input and decided the input is not for it. Only [`Alternation`] may
//! recover from it; every other error is fatal and carries enough position
//! information to point at the offending character.
//!
//! [`Alternation`]: crate::Alternation

use core::fmt::Write as _;

use thiserror::Error;

/// Boxed error produced by user-supplied hook / unhook functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while decoding text into values.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The input does not begin with what this codec expects.
    ///
    /// Internal backtracking signal: recovered by [`Alternation`], promoted to
    /// [`DecodeError::Syntax`] by the composite codecs once a grammar has
    /// committed, and never surfaced by a top-level `decode`.
    ///
    /// [`Alternation`]: crate::Alternation
    #[error("no match for {codec}")]
    NoMatch {
        /// Name of the codec that declined the input.
        codec: String,
    },

    /// The source ran out of data in the middle of a match.
    #[error("unexpected end of data")]
    Incomplete,

    /// Malformed input inside a committed grammar.
    #[error("{message}")]
    Syntax {
        /// Name of the codec that detected the problem.
        codec: String,
        /// 1-based line of the offending character.
        line: usize,
        /// 1-based column of the offending character.
        column: usize,
        /// Full human-readable message, including position and context.
        message: String,
    },

    /// A complete value was decoded but non-whitespace input remains.
    #[error("data continues past expected end on line {line}, character {column} (got '{found}')")]
    TrailingData {
        /// 1-based line of the first excess character.
        line: usize,
        /// 1-based column of the first excess character.
        column: usize,
        /// Up to 16 characters of the excess input.
        found: String,
    },

    /// The structural decode succeeded but the value transform raised.
    #[error("hook failed over input bytes {start}..{end}: {source}")]
    Hook {
        /// Absolute byte offset where the structural match began.
        start: usize,
        /// Absolute byte offset where the structural match ended.
        end: usize,
        /// The underlying failure.
        #[source]
        source: BoxError,
    },

    /// Reading from the underlying source failed.
    #[error("read from source failed")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    pub(crate) fn no_match(codec: &str) -> Self {
        DecodeError::NoMatch {
            codec: codec.to_owned(),
        }
    }

    /// Builds a [`DecodeError::Syntax`] with the standard message shape
    /// `"<message> on line <L>, character <C> (got '<found>', expected <X>)"`.
    ///
    /// `expected` carries its own quoting so that callers can render
    /// alternatives, e.g. `"',' or ']'"`.
    pub(crate) fn syntax(
        codec: &str,
        base: &str,
        (line, column): (usize, usize),
        found: &str,
        expected: Option<&str>,
    ) -> Self {
        let mut message = format!("{base} on line {line}, character {column}");
        match expected {
            Some(expected) => {
                let _ = write!(message, " (got '{found}', expected {expected})");
            }
            None => {
                let _ = write!(message, " ('{found}')");
            }
        }
        DecodeError::Syntax {
            codec: codec.to_owned(),
            line,
            column,
            message,
        }
    }

    /// Returns `true` if the error is the internal [`NoMatch`] signal.
    ///
    /// [`NoMatch`]: DecodeError::NoMatch
    #[must_use]
    pub fn is_no_match(&self) -> bool {
        matches!(self, DecodeError::NoMatch { .. })
    }
}

/// Errors raised while encoding values back into text.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// No codec in scope accepts the value.
    #[error("{codec} does not accept a {kind} value for encoding")]
    ValueNotAccepted {
        /// Name of the codec (or alternation) that was asked to encode.
        codec: String,
        /// Kind of the rejected value.
        kind: &'static str,
    },

    /// The value could not be decomposed into its structural representation.
    #[error("cannot decompose value for encoding by {codec}: {source}")]
    Unhook {
        /// Name of the codec whose unhook failed.
        codec: String,
        /// The underlying failure.
        #[source]
        source: BoxError,
    },

    /// The codec is decode-only.
    #[error("{codec} does not support encoding")]
    Unsupported {
        /// Name of the decode-only codec.
        codec: String,
    },

    /// Writing to the output sink failed.
    #[error("write to sink failed")]
    Sink(#[from] core::fmt::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_message_with_expected() {
        let err =
            DecodeError::syntax("sequence", "Unexpected character", (1, 7), "3]", Some("','"));
        assert_eq!(
            err.to_string(),
            "Unexpected character on line 1, character 7 (got '3]', expected ',')"
        );
    }

    #[test]
    fn syntax_message_without_expected() {
        let err = DecodeError::syntax("sequence", "Unexpected item", (2, 4), "@@", None);
        assert_eq!(err.to_string(), "Unexpected item on line 2, character 4 ('@@')");
    }

    #[test]
    fn no_match_is_distinguishable() {
        assert!(DecodeError::no_match("token").is_no_match());
        assert!(!DecodeError::Incomplete.is_no_match());
    }
}
