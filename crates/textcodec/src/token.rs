//! The pattern-matching leaf codec.

use core::fmt;

use crate::{
    codec::{Codec, CodecConfig, Hook, Indent, Unhook},
    error::{DecodeError, EncodeError},
    read_buffer::ReadBuffer,
    scan::Scanner,
    value::Value,
};

/// A leaf codec wrapping one token [`Scanner`].
///
/// Decoding matches the scanner against the input and hands the matched text
/// to the hook; encoding writes the unhooked text verbatim. The numeral
/// constructors in [`crate::numeral`] are all instances of this type.
///
/// # Examples
///
/// ```
/// use textcodec::{Codec, TokenCodec, Value, scan::Digits};
///
/// let digits = TokenCodec::new("digits", Digits);
/// assert_eq!(digits.decode("42").unwrap(), Value::String("42".into()));
/// ```
pub struct TokenCodec {
    config: CodecConfig,
    scanner: Box<dyn Scanner>,
}

impl TokenCodec {
    pub fn new(name: impl Into<String>, scanner: impl Scanner + 'static) -> Self {
        Self {
            config: CodecConfig::new(name),
            scanner: Box::new(scanner),
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

    #[must_use]
    pub fn keep_whitespace(mut self) -> Self {
        self.config = self.config.keep_whitespace();
        self
    }
}

impl Codec for TokenCodec {
    fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn decode_at(
        &self,
        buf: &mut ReadBuffer<'_>,
        offset: usize,
    ) -> Result<(Value, usize), DecodeError> {
        match buf.match_scan(self.scanner.as_ref(), offset)? {
            Some(end) => {
                let text = buf.retained()[offset..end].to_owned();
                Ok((Value::String(text), end))
            }
            None => Err(DecodeError::no_match(self.name())),
        }
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
        out.write_str(text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::scan::{Digits, Identifier};

    use super::*;

    #[test]
    fn decode_skips_leading_whitespace() {
        let codec = TokenCodec::new("digits", Digits);
        assert_eq!(codec.decode("  17\n").unwrap(), Value::String("17".into()));
    }

    #[test]
    fn no_match_surfaces_codec_name() {
        let codec = TokenCodec::new("identifier", Identifier);
        let err = codec.decode("123").unwrap_err();
        assert!(matches!(err, DecodeError::NoMatch { codec } if codec == "identifier"));
    }

    #[test]
    fn trailing_data_is_rejected() {
        let codec = TokenCodec::new("digits", Digits);
        let err = codec.decode("12 x").unwrap_err();
        assert!(matches!(err, DecodeError::TrailingData { line: 1, column: 4, .. }));
    }

    #[test]
    fn hook_failure_carries_span() {
        let codec = TokenCodec::new("digits", Digits)
            .with_hook(Hook::single(|_| Err("nope".into())));
        let err = codec.decode("  123").unwrap_err();
        assert!(matches!(err, DecodeError::Hook { start: 2, end: 5, .. }));
    }

    #[test]
    fn encode_writes_text_verbatim() {
        let codec = TokenCodec::new("digits", Digits);
        assert_eq!(codec.encode(&Value::String("99".into())).unwrap(), "99");
    }

    #[test]
    fn encode_rejects_untextual_value_without_unhook() {
        let codec = TokenCodec::new("digits", Digits);
        assert!(matches!(
            codec.encode(&Value::Integer(3)),
            Err(EncodeError::Unhook { .. })
        ));
    }
}
