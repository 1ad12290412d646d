//! The delimited, escape-aware string codec.

use core::fmt;

use crate::{
    codec::{Codec, CodecConfig, Hook, Indent, Unhook},
    error::{DecodeError, EncodeError},
    read_buffer::ReadBuffer,
    scan::{ScanOutcome, Scanner},
    value::Value,
};

/// Single-character escape names and the characters they stand for.
const NAMED_ESCAPES: &[(char, char)] = &[
    ('r', '\r'),
    ('n', '\n'),
    ('t', '\t'),
    ('a', '\x07'),
    ('b', '\x08'),
    ('f', '\x0c'),
    ('\\', '\\'),
    ('"', '"'),
];

fn named_escape(name: char) -> Option<char> {
    NAMED_ESCAPES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, c)| *c)
}

fn escape_name(c: char) -> Option<char> {
    NAMED_ESCAPES
        .iter()
        .find(|(_, mapped)| *mapped == c)
        .map(|(n, _)| *n)
}

/// Scanner for the escaped body between the delimiters.
///
/// The body is a possibly-empty run of plain characters and complete escape
/// sequences, ending just before the end delimiter, a control character, or
/// a malformed escape. An escape cut off by the end of the text reports the
/// prefix before its backslash as the committed match, so an unterminated
/// escape surfaces as a missing end delimiter rather than a silent truncation.
struct StringBody {
    end: String,
}

impl Scanner for StringBody {
    fn scan(&self, text: &str, start: usize) -> ScanOutcome {
        let mut i = start;
        loop {
            let rest = &text[i..];
            if rest.is_empty() {
                return ScanOutcome::Partial { complete: Some(i) };
            }
            if rest.starts_with(&self.end) {
                return ScanOutcome::Match { end: i };
            }
            // The end delimiter itself may straddle a chunk boundary.
            if self.end.starts_with(rest) {
                return ScanOutcome::Partial { complete: Some(i) };
            }
            let Some(c) = rest.chars().next() else {
                return ScanOutcome::Partial { complete: Some(i) };
            };
            if c == '\\' {
                let Some(name) = rest[1..].chars().next() else {
                    return ScanOutcome::Partial { complete: Some(i) };
                };
                if named_escape(name).is_some() {
                    i += 1 + name.len_utf8();
                    continue;
                }
                let hex_len = match name {
                    'x' => 2,
                    'u' => 4,
                    'U' => 8,
                    _ => return ScanOutcome::Match { end: i },
                };
                let mut seen = 0;
                for d in rest[2..].chars().take(hex_len) {
                    if !d.is_ascii_hexdigit() {
                        return ScanOutcome::Match { end: i };
                    }
                    seen += 1;
                }
                if seen < hex_len {
                    return ScanOutcome::Partial { complete: Some(i) };
                }
                i += 2 + hex_len;
            } else if c >= ' ' && c != '\x7f' {
                i += c.len_utf8();
            } else {
                return ScanOutcome::Match { end: i };
            }
        }
    }
}

/// A string codec with configurable delimiters and backslash escapes.
///
/// Decoding matches the begin delimiter, the escaped body, and the end
/// delimiter, then resolves escapes; once the begin delimiter has matched,
/// any malformed body is a hard syntax error rather than a `NoMatch`.
/// Encoding escapes control characters, the delimiters, the backslash, and
/// everything non-ASCII, preferring named escapes and the shortest numeric
/// form (`\xHH`, `\uHHHH`, `\UHHHHHHHH`).
///
/// # Examples
///
/// ```
/// use textcodec::{Codec, QuotedCodec, Value};
///
/// let codec = QuotedCodec::new("string");
/// assert_eq!(
///     codec.decode(r#""a\nb""#).unwrap(),
///     Value::String("a\nb".into())
/// );
/// assert_eq!(
///     codec.encode(&Value::String("a\nb".into())).unwrap(),
///     r#""a\nb""#
/// );
/// ```
pub struct QuotedCodec {
    config: CodecConfig,
    begin: String,
    end: String,
    body: StringBody,
}

impl QuotedCodec {
    /// A string codec delimited by double quotes.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_delimiters(name, "\"", "\"")
    }

    /// A string codec with explicit (non-empty) delimiters.
    #[must_use]
    pub fn with_delimiters(
        name: impl Into<String>,
        begin: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        let end = end.into();
        Self {
            config: CodecConfig::new(name)
                .with_accepts(|value| matches!(value, Value::String(_))),
            begin: begin.into(),
            body: StringBody { end: end.clone() },
            end,
        }
    }

    #[must_use]
    pub fn with_hook(mut self, hook: Hook) -> Self {
        self.config = self.config.with_hook(hook);
        self
    }

    #[must_use]
    pub fn with_unhook(mut self, unhook: Unhook) -> Self {
        self.config = self.config.with_unhook(unhook);
        self
    }

    #[must_use]
    pub fn with_accepts(
        mut self,
        accepts: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.config = self.config.with_accepts(accepts);
        self
    }

    /// Resolves the escapes in `retained[body_start..body_end]`.
    ///
    /// The body scanner has already validated the shape of every escape, so
    /// the only failure left is a numeric escape naming an invalid scalar.
    fn unescape(
        &self,
        buf: &ReadBuffer<'_>,
        body_start: usize,
        body_end: usize,
    ) -> Result<String, DecodeError> {
        let body = &buf.retained()[body_start..body_end];
        let mut out = String::with_capacity(body.len());
        let mut i = 0;
        while i < body.len() {
            let rest = &body[i..];
            let Some(c) = rest.chars().next() else { break };
            if c != '\\' {
                out.push(c);
                i += c.len_utf8();
                continue;
            }
            let Some(name) = rest[1..].chars().next() else { break };
            if let Some(mapped) = named_escape(name) {
                out.push(mapped);
                i += 2;
                continue;
            }
            let hex_len = match name {
                'x' => 2,
                'u' => 4,
                'U' => 8,
                _ => break,
            };
            let scalar = u32::from_str_radix(&rest[2..2 + hex_len], 16)
                .ok()
                .and_then(char::from_u32);
            match scalar {
                Some(ch) => out.push(ch),
                None => {
                    return Err(DecodeError::syntax(
                        self.name(),
                        "Invalid character escape",
                        buf.position_at(body_start + i),
                        &buf.context_at(body_start + i, 16),
                        None,
                    ));
                }
            }
            i += 2 + hex_len;
        }
        Ok(out)
    }

    fn write_escaped(&self, out: &mut dyn fmt::Write, c: char) -> fmt::Result {
        if let Some(name) = escape_name(c) {
            out.write_char('\\')?;
            return out.write_char(name);
        }
        let plain = c >= ' '
            && c != '\x7f'
            && c.is_ascii()
            && !self.begin.contains(c)
            && !self.end.contains(c);
        if plain {
            return out.write_char(c);
        }
        let n = c as u32;
        if n <= 0xff {
            write!(out, "\\x{n:02x}")
        } else if n <= 0xffff {
            write!(out, "\\u{n:04x}")
        } else {
            write!(out, "\\U{n:08x}")
        }
    }
}

impl fmt::Debug for QuotedCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuotedCodec")
            .field("name", &self.name())
            .field("begin", &self.begin)
            .field("end", &self.end)
            .finish_non_exhaustive()
    }
}

impl Codec for QuotedCodec {
    fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn decode_at(
        &self,
        buf: &mut ReadBuffer<'_>,
        offset: usize,
    ) -> Result<(Value, usize), DecodeError> {
        if !buf.match_literal(&self.begin, offset)? {
            return Err(DecodeError::no_match(self.name()));
        }
        let body_start = offset + self.begin.len();
        // The body matches the empty string, so the scan always succeeds.
        let body_end = buf.match_scan(&self.body, body_start)?.unwrap_or(body_start);
        if !buf.match_literal(&self.end, body_end)? {
            if buf.is_exhausted() && body_end == buf.retained().len() {
                return Err(DecodeError::Incomplete);
            }
            return Err(DecodeError::syntax(
                self.name(),
                "Unexpected character, escape sequence, or missing end delimiter",
                buf.position_at(body_end),
                &buf.context_at(body_end, 16),
                None,
            ));
        }
        let text = self.unescape(buf, body_start, body_end)?;
        Ok((Value::String(text), body_end + self.end.len()))
    }

    fn encode_at(
        &self,
        value: &Value,
        out: &mut dyn fmt::Write,
        _indent: Indent<'_>,
    ) -> Result<(), EncodeError> {
        let Value::String(text) = value else {
            return Err(EncodeError::Unhook {
                codec: self.name().to_owned(),
                source: format!(
                    "can only encode text, got {}; supply an unhook",
                    value.kind()
                )
                .into(),
            });
        };
        out.write_str(&self.begin)?;
        for c in text.chars() {
            self.write_escaped(out, c)?;
        }
        out.write_str(&self.end)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn codec() -> QuotedCodec {
        QuotedCodec::new("string")
    }

    #[rstest]
    #[case(r#""hello""#, "hello")]
    #[case(r#""""#, "")]
    #[case(r#""a\nb\tc""#, "a\nb\tc")]
    #[case(r#""\a\b\f\r""#, "\x07\x08\x0c\r")]
    #[case(r#""say \"hi\"""#, "say \"hi\"")]
    #[case(r#""back\\slash""#, "back\\slash")]
    #[case(r#""\x41é\U0001f600""#, "A\u{e9}\u{1f600}")]
    fn decodes_escapes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(codec().decode(input).unwrap(), Value::String(expected.into()));
    }

    #[test]
    fn missing_begin_delimiter_is_no_match() {
        assert!(codec().decode("hello").unwrap_err().is_no_match());
    }

    #[test]
    fn unterminated_string_is_incomplete() {
        assert!(matches!(
            codec().decode(r#""abc"#).unwrap_err(),
            DecodeError::Incomplete
        ));
        assert!(matches!(
            codec().decode("\"").unwrap_err(),
            DecodeError::Incomplete
        ));
    }

    #[rstest]
    #[case(r#""a\qb""#)] // unknown escape
    #[case(r#""a\x4g""#)] // non-hex digit
    #[case("\"a\nb\"")] // raw control character
    fn malformed_body_is_a_syntax_error(#[case] input: &str) {
        assert!(matches!(
            codec().decode(input).unwrap_err(),
            DecodeError::Syntax { .. }
        ));
    }

    #[test]
    fn surrogate_escape_is_rejected() {
        let err = codec().decode(r#""\ud800""#).unwrap_err();
        assert!(matches!(err, DecodeError::Syntax { .. }));
        assert!(err.to_string().starts_with("Invalid character escape"));
    }

    #[rstest]
    #[case("a\nb", r#""a\nb""#)]
    #[case("say \"hi\"", r#""say \"hi\"""#)]
    #[case("back\\slash", r#""back\\slash""#)]
    #[case("\x07\x1b", r#""\a\x1b""#)]
    #[case("\u{e9}", r#""\xe9""#)]
    #[case("\u{0138}", r#""\u0138""#)]
    #[case("\u{1f600}", r#""\U0001f600""#)]
    fn encodes_escapes(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(codec().encode(&Value::String(text.into())).unwrap(), expected);
    }

    #[test]
    fn encode_rejects_untextual_values() {
        assert!(matches!(
            codec().encode(&Value::Integer(1)),
            Err(EncodeError::ValueNotAccepted { .. })
        ));
    }

    #[test]
    fn custom_delimiters() {
        let codec = QuotedCodec::with_delimiters("quoted", "'", "'");
        assert_eq!(codec.decode("'hi'").unwrap(), Value::String("hi".into()));
        assert_eq!(
            codec.encode(&Value::String("it's".into())).unwrap(),
            r"'it\x27s'"
        );
    }
}
