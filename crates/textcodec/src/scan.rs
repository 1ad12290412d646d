//! Partial-match-aware token scanners.
//!
//! The incremental buffer needs a matching primitive that can tell apart
//! three outcomes: "this input can never match", "this input definitely
//! matches up to here", and "the answer may change once more input arrives".
//! General-purpose regex engines do not report the third outcome, so every
//! leaf pattern in this crate is a small hand-written scanner implementing
//! [`Scanner`].
//!
//! The contract, in detail:
//!
//! - A scan that ends strictly before the end of `text` is a definite
//!   [`ScanOutcome::Match`]: the following character proves the token cannot
//!   extend.
//! - A scan that reaches the end of `text` must report
//!   [`ScanOutcome::Partial`], because a longer input could extend or
//!   invalidate the token. `complete` carries the match end if the text as
//!   seen already forms a valid token; the buffer commits it once the source
//!   is exhausted.
//! - [`ScanOutcome::NoMatch`] is only returned when no amount of additional
//!   input could produce a match at `start`.
//!
//! This is what makes decoding a byte-at-a-time stream and decoding a fully
//! materialized string produce identical results.

/// Result of one scan attempt over retained text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// No prefix of the input at `start` can ever match.
    NoMatch,
    /// A definite match ending at byte offset `end`.
    Match { end: usize },
    /// The scan ran off the end of the text. `complete` holds the match end
    /// to commit if no more input arrives, or `None` if the text seen so far
    /// does not yet form a match.
    Partial { complete: Option<usize> },
}

/// A token pattern that can be matched incrementally.
pub trait Scanner: Send + Sync {
    /// Scans `text` anchored at byte offset `start`.
    ///
    /// `start` must lie on a character boundary and be at most `text.len()`.
    fn scan(&self, text: &str, start: usize) -> ScanOutcome;
}

fn digits_end(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    i
}

/// A possibly-empty run of ` \t\n\r`.
#[derive(Debug, Clone, Copy)]
pub struct Whitespace;

impl Scanner for Whitespace {
    fn scan(&self, text: &str, start: usize) -> ScanOutcome {
        let bytes = text.as_bytes();
        let mut i = start;
        while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\n' | b'\r') {
            i += 1;
        }
        if i == bytes.len() {
            ScanOutcome::Partial { complete: Some(i) }
        } else {
            ScanOutcome::Match { end: i }
        }
    }
}

/// One or more ASCII digits.
#[derive(Debug, Clone, Copy)]
pub struct Digits;

impl Scanner for Digits {
    fn scan(&self, text: &str, start: usize) -> ScanOutcome {
        let bytes = text.as_bytes();
        let end = digits_end(bytes, start);
        if end == bytes.len() {
            ScanOutcome::Partial {
                complete: (end > start).then_some(end),
            }
        } else if end == start {
            ScanOutcome::NoMatch
        } else {
            ScanOutcome::Match { end }
        }
    }
}

/// An optional sign followed by one or more ASCII digits.
#[derive(Debug, Clone, Copy)]
pub struct SignedInteger;

impl Scanner for SignedInteger {
    fn scan(&self, text: &str, start: usize) -> ScanOutcome {
        let bytes = text.as_bytes();
        let mut i = start;
        if i < bytes.len() && matches!(bytes[i], b'+' | b'-') {
            i += 1;
        }
        if i == bytes.len() {
            return ScanOutcome::Partial { complete: None };
        }
        let end = digits_end(bytes, i);
        if end == i {
            ScanOutcome::NoMatch
        } else if end == bytes.len() {
            ScanOutcome::Partial { complete: Some(end) }
        } else {
            ScanOutcome::Match { end }
        }
    }
}

/// A decimal float: optional sign, digits with a mandatory decimal point
/// (`12.`, `.5`, `3.14`), optional exponent.
///
/// The decimal point is required so that a bare integer is left for the
/// integer codec to claim.
#[derive(Debug, Clone, Copy)]
pub struct FloatLiteral;

impl Scanner for FloatLiteral {
    fn scan(&self, text: &str, start: usize) -> ScanOutcome {
        let bytes = text.as_bytes();
        let n = bytes.len();
        let mut i = start;
        if i < n && matches!(bytes[i], b'+' | b'-') {
            i += 1;
        }
        if i == n {
            return ScanOutcome::Partial { complete: None };
        }
        let int_end = digits_end(bytes, i);
        let has_int = int_end > i;
        i = int_end;
        if i == n {
            // Digits so far; a decimal point may still arrive.
            return ScanOutcome::Partial { complete: None };
        }
        if bytes[i] != b'.' {
            return ScanOutcome::NoMatch;
        }
        i += 1;
        let frac_end = digits_end(bytes, i);
        let has_frac = frac_end > i;
        i = frac_end;
        if !has_int && !has_frac {
            // A lone "." is dead unless digits can still arrive after it.
            return if i == n {
                ScanOutcome::Partial { complete: None }
            } else {
                ScanOutcome::NoMatch
            };
        }
        let mantissa = i;
        if i == n {
            return ScanOutcome::Partial {
                complete: Some(mantissa),
            };
        }
        if matches!(bytes[i], b'e' | b'E') {
            let mut j = i + 1;
            if j < n && matches!(bytes[j], b'+' | b'-') {
                j += 1;
            }
            if j == n {
                // The exponent may still be completed by more input; without
                // it the mantissa alone is the match.
                return ScanOutcome::Partial {
                    complete: Some(mantissa),
                };
            }
            let exp_end = digits_end(bytes, j);
            if exp_end == j {
                // "1.5ex": the exponent is dead, the mantissa stands.
                return ScanOutcome::Match { end: mantissa };
            }
            if exp_end == n {
                return ScanOutcome::Partial {
                    complete: Some(exp_end),
                };
            }
            return ScanOutcome::Match { end: exp_end };
        }
        ScanOutcome::Match { end: mantissa }
    }
}

/// A rational literal `[+-]?<digits>/<digits>`.
#[derive(Debug, Clone, Copy)]
pub struct RationalLiteral;

impl Scanner for RationalLiteral {
    fn scan(&self, text: &str, start: usize) -> ScanOutcome {
        let bytes = text.as_bytes();
        let n = bytes.len();
        let mut i = start;
        if i < n && matches!(bytes[i], b'+' | b'-') {
            i += 1;
        }
        if i == n {
            return ScanOutcome::Partial { complete: None };
        }
        let numer_end = digits_end(bytes, i);
        if numer_end == i {
            return ScanOutcome::NoMatch;
        }
        if numer_end == n {
            return ScanOutcome::Partial { complete: None };
        }
        if bytes[numer_end] != b'/' {
            return ScanOutcome::NoMatch;
        }
        let denom_start = numer_end + 1;
        if denom_start == n {
            return ScanOutcome::Partial { complete: None };
        }
        let denom_end = digits_end(bytes, denom_start);
        if denom_end == denom_start {
            ScanOutcome::NoMatch
        } else if denom_end == n {
            ScanOutcome::Partial {
                complete: Some(denom_end),
            }
        } else {
            ScanOutcome::Match { end: denom_end }
        }
    }
}

/// An identifier `[A-Za-z][A-Za-z0-9]*`.
#[derive(Debug, Clone, Copy)]
pub struct Identifier;

impl Scanner for Identifier {
    fn scan(&self, text: &str, start: usize) -> ScanOutcome {
        let bytes = text.as_bytes();
        let n = bytes.len();
        if start == n {
            return ScanOutcome::Partial { complete: None };
        }
        if !bytes[start].is_ascii_alphabetic() {
            return ScanOutcome::NoMatch;
        }
        let mut i = start + 1;
        while i < n && bytes[i].is_ascii_alphanumeric() {
            i += 1;
        }
        if i == n {
            ScanOutcome::Partial { complete: Some(i) }
        } else {
            ScanOutcome::Match { end: i }
        }
    }
}

/// One of a fixed set of keywords, with a word-boundary check so that
/// `nullable` does not begin with the keyword `null`.
#[derive(Debug, Clone)]
pub struct Keywords {
    words: &'static [&'static str],
}

impl Keywords {
    #[must_use]
    pub fn new(words: &'static [&'static str]) -> Self {
        Self { words }
    }
}

impl Scanner for Keywords {
    fn scan(&self, text: &str, start: usize) -> ScanOutcome {
        let tail = &text[start..];
        let mut prefix_alive = false;
        for word in self.words {
            if tail.len() >= word.len() {
                if !tail.starts_with(word) {
                    continue;
                }
                let end = start + word.len();
                if end == text.len() {
                    // The next chunk could still turn this into a longer
                    // word; commit only at end of input.
                    return ScanOutcome::Partial { complete: Some(end) };
                }
                let boundary = text[end..]
                    .chars()
                    .next()
                    .is_none_or(|c| !(c.is_ascii_alphanumeric() || c == '_'));
                if boundary {
                    return ScanOutcome::Match { end };
                }
            } else if word.starts_with(tail) {
                prefix_alive = true;
            }
        }
        if prefix_alive {
            ScanOutcome::Partial { complete: None }
        } else {
            ScanOutcome::NoMatch
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("   x", 0, ScanOutcome::Match { end: 3 })]
    #[case("x", 0, ScanOutcome::Match { end: 0 })]
    #[case(" \t\r\n", 0, ScanOutcome::Partial { complete: Some(4) })]
    #[case("", 0, ScanOutcome::Partial { complete: Some(0) })]
    fn whitespace(#[case] text: &str, #[case] start: usize, #[case] expected: ScanOutcome) {
        assert_eq!(Whitespace.scan(text, start), expected);
    }

    #[rstest]
    #[case("123,", 0, ScanOutcome::Match { end: 3 })]
    #[case("123", 0, ScanOutcome::Partial { complete: Some(3) })]
    #[case("", 0, ScanOutcome::Partial { complete: None })]
    #[case("x", 0, ScanOutcome::NoMatch)]
    fn digits(#[case] text: &str, #[case] start: usize, #[case] expected: ScanOutcome) {
        assert_eq!(Digits.scan(text, start), expected);
    }

    #[rstest]
    #[case("-42]", 0, ScanOutcome::Match { end: 3 })]
    #[case("+7", 0, ScanOutcome::Partial { complete: Some(2) })]
    #[case("-", 0, ScanOutcome::Partial { complete: None })]
    #[case("-x", 0, ScanOutcome::NoMatch)]
    #[case("x", 0, ScanOutcome::NoMatch)]
    fn signed_integer(#[case] text: &str, #[case] start: usize, #[case] expected: ScanOutcome) {
        assert_eq!(SignedInteger.scan(text, start), expected);
    }

    #[rstest]
    #[case("3.14,", 0, ScanOutcome::Match { end: 4 })]
    #[case("3.14", 0, ScanOutcome::Partial { complete: Some(4) })]
    #[case(".5 ", 0, ScanOutcome::Match { end: 2 })]
    #[case(".5", 0, ScanOutcome::Partial { complete: Some(2) })]
    #[case("12.", 0, ScanOutcome::Partial { complete: Some(3) })]
    #[case("12. ", 0, ScanOutcome::Match { end: 3 })]
    #[case("3", 0, ScanOutcome::Partial { complete: None })]
    #[case("3,", 0, ScanOutcome::NoMatch)]
    #[case("-1.5e10,", 0, ScanOutcome::Match { end: 7 })]
    #[case("1.5e", 0, ScanOutcome::Partial { complete: Some(3) })]
    #[case("1.5e-", 0, ScanOutcome::Partial { complete: Some(3) })]
    #[case("1.5ex", 0, ScanOutcome::Match { end: 3 })]
    #[case("1.5e7", 0, ScanOutcome::Partial { complete: Some(5) })]
    #[case(".", 0, ScanOutcome::Partial { complete: None })]
    #[case(".x", 0, ScanOutcome::NoMatch)]
    #[case("x", 0, ScanOutcome::NoMatch)]
    fn float_literal(#[case] text: &str, #[case] start: usize, #[case] expected: ScanOutcome) {
        assert_eq!(FloatLiteral.scan(text, start), expected);
    }

    #[rstest]
    #[case("1/2,", 0, ScanOutcome::Match { end: 3 })]
    #[case("-3/4", 0, ScanOutcome::Partial { complete: Some(4) })]
    #[case("3", 0, ScanOutcome::Partial { complete: None })]
    #[case("3/", 0, ScanOutcome::Partial { complete: None })]
    #[case("3,", 0, ScanOutcome::NoMatch)]
    #[case("3/x", 0, ScanOutcome::NoMatch)]
    fn rational_literal(#[case] text: &str, #[case] start: usize, #[case] expected: ScanOutcome) {
        assert_eq!(RationalLiteral.scan(text, start), expected);
    }

    #[rstest]
    #[case("foo1(", 0, ScanOutcome::Match { end: 4 })]
    #[case("x", 0, ScanOutcome::Partial { complete: Some(1) })]
    #[case("1x", 0, ScanOutcome::NoMatch)]
    #[case("", 0, ScanOutcome::Partial { complete: None })]
    fn identifier(#[case] text: &str, #[case] start: usize, #[case] expected: ScanOutcome) {
        assert_eq!(Identifier.scan(text, start), expected);
    }

    #[rstest]
    #[case("true,", 0, ScanOutcome::Match { end: 4 })]
    #[case("true", 0, ScanOutcome::Partial { complete: Some(4) })]
    #[case("tru", 0, ScanOutcome::Partial { complete: None })]
    #[case("truex", 0, ScanOutcome::NoMatch)]
    #[case("true_x", 0, ScanOutcome::NoMatch)]
    #[case("true2", 0, ScanOutcome::NoMatch)]
    #[case("false]", 0, ScanOutcome::Match { end: 5 })]
    #[case("maybe", 0, ScanOutcome::NoMatch)]
    fn keywords(#[case] text: &str, #[case] start: usize, #[case] expected: ScanOutcome) {
        let scanner = Keywords::new(&["true", "false"]);
        assert_eq!(scanner.scan(text, start), expected);
    }

    #[test]
    fn keywords_mid_text_anchor() {
        let scanner = Keywords::new(&["null"]);
        assert_eq!(scanner.scan("[null]", 1), ScanOutcome::Match { end: 5 });
        assert_eq!(scanner.scan("[nil]", 1), ScanOutcome::NoMatch);
    }

    #[test]
    fn digits_anchor_past_prefix() {
        assert_eq!(Digits.scan("ab12 ", 2), ScanOutcome::Match { end: 4 });
    }
}
