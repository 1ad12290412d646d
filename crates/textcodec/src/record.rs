//! The keyed-sequence composite.

use core::fmt;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use crate::{
    codec::{Codec, CodecConfig, Hook, Indent, Unhook},
    error::{DecodeError, EncodeError},
    read_buffer::ReadBuffer,
    sequence::match_delim,
    value::{Record, Value},
};

/// A leading key/value pair that identifies which record type follows.
///
/// The pair must come first, its value must equal `identity`, and it is
/// excluded from the decoded record. An identity mismatch is a `NoMatch`, so
/// an [`Alternation`](crate::Alternation) of discriminated records dispatches
/// on the identity text.
#[derive(Debug, Clone)]
pub struct Discriminator {
    pub key: String,
    pub identity: String,
}

/// A delimited sequence of key/value pairs.
///
/// Keys decode through the key codec and must come out as text; values route
/// through per-key override codecs or the shared item codec. Duplicate keys,
/// unknown keys (when unknown keys are denied) and missing required keys are
/// hard errors naming the key. Decoded pairs keep their input order.
///
/// Keys and discriminator values are decoded pinned, so the codec never
/// discards input before its identity is settled.
pub struct RecordCodec {
    config: CodecConfig,
    key: Arc<dyn Codec>,
    item: Arc<dyn Codec>,
    by_key: BTreeMap<String, Arc<dyn Codec>>,
    required: BTreeSet<String>,
    optional: BTreeSet<String>,
    allow_unknown: bool,
    discriminator: Option<Discriminator>,
    begin: String,
    item_delim: String,
    key_delim: String,
    end: String,
    multiline: bool,
    skip_between: bool,
}

impl RecordCodec {
    /// A `{`-delimited, `,`-separated, `:`-keyed, `}`-terminated record that
    /// accepts unknown keys.
    #[must_use]
    pub fn new(name: impl Into<String>, key: Arc<dyn Codec>, item: Arc<dyn Codec>) -> Self {
        Self {
            config: CodecConfig::new(name)
                .with_accepts(|value| matches!(value, Value::Record(_))),
            key,
            item,
            by_key: BTreeMap::new(),
            required: BTreeSet::new(),
            optional: BTreeSet::new(),
            allow_unknown: true,
            discriminator: None,
            begin: "{".to_owned(),
            item_delim: ",".to_owned(),
            key_delim: ":".to_owned(),
            end: "}".to_owned(),
            multiline: true,
            skip_between: true,
        }
    }

    #[must_use]
    pub fn with_delimiters(
        mut self,
        begin: impl Into<String>,
        item_delim: impl Into<String>,
        key_delim: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        self.begin = begin.into();
        self.item_delim = item_delim.into();
        self.key_delim = key_delim.into();
        self.end = end.into();
        self
    }

    /// Routes the value under `key` through `codec` instead of the shared
    /// item codec, on both decode and encode.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, codec: Arc<dyn Codec>) -> Self {
        self.by_key.insert(key.into(), codec);
        self
    }

    /// Marks `key` as required; decoding fails when it is absent.
    #[must_use]
    pub fn require(mut self, key: impl Into<String>) -> Self {
        self.required.insert(key.into());
        self
    }

    /// Marks `key` as known but optional.
    #[must_use]
    pub fn allow(mut self, key: impl Into<String>) -> Self {
        self.optional.insert(key.into());
        self
    }

    /// Rejects keys that are neither required nor optional.
    #[must_use]
    pub fn deny_unknown(mut self) -> Self {
        self.allow_unknown = false;
        self
    }

    /// Requires a leading `key: "identity"` pair, excluded from the result.
    #[must_use]
    pub fn with_discriminator(mut self, key: impl Into<String>, identity: impl Into<String>) -> Self {
        self.discriminator = Some(Discriminator {
            key: key.into(),
            identity: identity.into(),
        });
        self
    }

    /// Encodes on one line instead of one pair per line.
    #[must_use]
    pub fn single_line(mut self) -> Self {
        self.multiline = false;
        self
    }

    /// Stops skipping whitespace around pairs and delimiters on decode, and
    /// stops padding delimiters on encode.
    #[must_use]
    pub fn keep_whitespace_between(mut self) -> Self {
        self.skip_between = false;
        self
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

    fn item_for(&self, key: &str) -> &dyn Codec {
        self.by_key.get(key).map_or(&*self.item, |codec| &**codec)
    }

    fn key_is_known(&self, key: &str) -> bool {
        self.allow_unknown || self.required.contains(key) || self.optional.contains(key)
    }

    fn key_error(&self, buf: &mut ReadBuffer<'_>, offset: usize, message: String) -> DecodeError {
        let (line, column) = buf.position_at(offset);
        DecodeError::Syntax {
            codec: self.name().to_owned(),
            line,
            column,
            message: format!("{message} on line {line}, character {column}"),
        }
    }

    /// Whitespace-adjusted position for an error at `offset`.
    fn error_pos(&self, buf: &mut ReadBuffer<'_>, offset: usize) -> Result<usize, DecodeError> {
        if self.skip_between {
            crate::codec::skip_whitespace(buf, offset, false)
        } else {
            Ok(offset)
        }
    }

    fn close(
        &self,
        buf: &mut ReadBuffer<'_>,
        fields: Record,
        end: usize,
    ) -> Result<(Value, usize), DecodeError> {
        for key in &self.required {
            if !fields.contains_key(key) {
                return Err(self.key_error(buf, end, format!("Required key '{key}' missing")));
            }
        }
        Ok((Value::Record(fields), end))
    }

    fn encode_pair(
        &self,
        key: &str,
        value: &Value,
        out: &mut dyn fmt::Write,
        indent: Indent<'_>,
        indent_key: bool,
    ) -> Result<(), EncodeError> {
        self.key
            .encode_to(&Value::String(key.to_owned()), out, indent, indent_key)?;
        out.write_str(&self.key_delim)?;
        if self.skip_between {
            out.write_str(" ")?;
        }
        if self.discriminator.as_ref().is_some_and(|disc| disc.key == key) {
            self.key.encode_to(value, out, indent, false)
        } else {
            self.item_for(key).encode_to(value, out, indent, false)
        }
    }

    fn encode_pairs(
        &self,
        fields: &Record,
        out: &mut dyn fmt::Write,
        indent: Indent<'_>,
    ) -> Result<(), EncodeError> {
        let multiline = self.multiline && self.skip_between;
        out.write_str(&self.begin)?;
        let discriminator = self
            .discriminator
            .as_ref()
            .map(|disc| (disc.key.as_str(), Value::String(disc.identity.clone())));
        let head = discriminator
            .iter()
            .map(|(key, identity)| (*key, identity));
        let tail = fields.iter().map(|(key, value)| (key.as_str(), value));
        let mut first = true;
        for (key, value) in head.chain(tail) {
            if multiline {
                if !first {
                    out.write_str(&self.item_delim)?;
                }
                out.write_str("\n")?;
            } else if !first {
                out.write_str(&self.item_delim)?;
                if self.skip_between {
                    out.write_str(" ")?;
                }
            }
            self.encode_pair(key, value, out, indent.deeper(), multiline)?;
            first = false;
        }
        if multiline {
            out.write_str("\n")?;
            indent.write_to(out)?;
        }
        out.write_str(&self.end)?;
        Ok(())
    }
}

impl fmt::Debug for RecordCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordCodec")
            .field("name", &self.name())
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("allow_unknown", &self.allow_unknown)
            .field("discriminator", &self.discriminator)
            .finish_non_exhaustive()
    }
}

impl Codec for RecordCodec {
    fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn decode_at(
        &self,
        buf: &mut ReadBuffer<'_>,
        offset: usize,
    ) -> Result<(Value, usize), DecodeError> {
        let Some(mut offset) = match_delim(buf, &self.begin, offset, self.skip_between)? else {
            return Err(DecodeError::no_match(self.name()));
        };
        let mut fields = Record::new();
        let mut discriminated = self.discriminator.is_none();
        loop {
            if let Some(end) = match_delim(buf, &self.end, offset, self.skip_between)? {
                if let Some(disc) = self.discriminator.as_ref().filter(|_| !discriminated) {
                    let pos = end - self.end.len();
                    return Err(self.key_error(
                        buf,
                        pos,
                        format!("Expected discriminator key '{}', got '{}'", disc.key, self.end),
                    ));
                }
                return self.close(buf, fields, end);
            }

            let key_pos = self.error_pos(buf, offset)?;
            let (key_value, next) = match self.key.decode_pinned(buf, offset) {
                Ok(decoded) => decoded,
                Err(err) if err.is_no_match() => {
                    return Err(DecodeError::syntax(
                        self.name(),
                        "Unexpected character while trying to decode key",
                        buf.position_at(key_pos),
                        &buf.context_at(key_pos, 16),
                        None,
                    ));
                }
                Err(err) => return Err(err),
            };
            offset = next;
            let Value::String(key) = key_value else {
                return Err(self.key_error(
                    buf,
                    key_pos,
                    "Key did not decode to text".to_owned(),
                ));
            };

            if !discriminated {
                // Unwrap-free: `discriminated` starts false only when set.
                if let Some(disc) = self.discriminator.as_ref() {
                    if key != disc.key {
                        return Err(self.key_error(
                            buf,
                            key_pos,
                            format!("Expected discriminator key '{}', got '{key}'", disc.key),
                        ));
                    }
                }
            } else if fields.contains_key(&key) {
                return Err(self.key_error(buf, key_pos, format!("Key '{key}' repeated")));
            } else if !self.key_is_known(&key) {
                return Err(self.key_error(buf, key_pos, format!("Unexpected key '{key}'")));
            }

            let Some(next) = match_delim(buf, &self.key_delim, offset, self.skip_between)? else {
                let pos = self.error_pos(buf, offset)?;
                return Err(DecodeError::syntax(
                    self.name(),
                    "Unexpected character",
                    buf.position_at(pos),
                    &buf.context_at(pos, 16),
                    Some(&format!("'{}'", self.key_delim)),
                ));
            };
            offset = next;

            if discriminated {
                let (value, next) = match self.item_for(&key).decode_one(buf, offset) {
                    Ok(decoded) => decoded,
                    Err(err) if err.is_no_match() => {
                        let pos = self.error_pos(buf, offset)?;
                        return Err(DecodeError::syntax(
                            self.name(),
                            "Unexpected character or item",
                            buf.position_at(pos),
                            &buf.context_at(pos, 16),
                            None,
                        ));
                    }
                    Err(err) => return Err(err),
                };
                fields.insert(key, value);
                offset = next;
            } else {
                let (value, next) = self.key.decode_pinned(buf, offset)?;
                if let Some(disc) = self.discriminator.as_ref() {
                    if !matches!(&value, Value::String(identity) if *identity == disc.identity) {
                        // Lets an alternation of discriminated records try
                        // the next candidate.
                        return Err(DecodeError::no_match(self.name()));
                    }
                }
                discriminated = true;
                offset = next;
            }

            if let Some(next) = match_delim(buf, &self.item_delim, offset, self.skip_between)? {
                offset = next;
                continue;
            }
            if let Some(end) = match_delim(buf, &self.end, offset, self.skip_between)? {
                return self.close(buf, fields, end);
            }
            let pos = self.error_pos(buf, offset)?;
            return Err(DecodeError::syntax(
                self.name(),
                "Unexpected character",
                buf.position_at(pos),
                &buf.context_at(pos, 16),
                Some(&format!("'{}' or '{}'", self.item_delim, self.end)),
            ));
        }
    }

    fn encode_at(
        &self,
        value: &Value,
        out: &mut dyn fmt::Write,
        indent: Indent<'_>,
    ) -> Result<(), EncodeError> {
        let Value::Record(fields) = value else {
            return Err(EncodeError::Unhook {
                codec: self.name().to_owned(),
                source: format!(
                    "can only encode a record, got {}; supply an unhook",
                    value.kind()
                )
                .into(),
            });
        };
        self.encode_pairs(fields, out, indent)
    }
}

#[cfg(test)]
mod tests {
    use crate::{numeral, quoted::QuotedCodec};

    use super::*;

    fn int_record() -> RecordCodec {
        RecordCodec::new(
            "record",
            Arc::new(QuotedCodec::new("key")),
            Arc::new(numeral::signed_integer()),
        )
    }

    fn record(pairs: &[(&str, Value)]) -> Value {
        Value::Record(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_owned(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn decodes_pairs_in_input_order() {
        assert_eq!(
            int_record().decode(r#"{"b": 2, "a": 1}"#).unwrap(),
            record(&[("b", Value::Integer(2)), ("a", Value::Integer(1))])
        );
    }

    #[test]
    fn decodes_empty_record() {
        assert_eq!(int_record().decode("{ }").unwrap(), record(&[]));
    }

    #[test]
    fn duplicate_key_names_the_key() {
        let err = int_record().decode(r#"{"a": 1, "a": 2}"#).unwrap_err();
        assert_eq!(err.to_string(), "Key 'a' repeated on line 1, character 10");
    }

    #[test]
    fn unknown_key_is_rejected_when_denied() {
        let codec = int_record().require("a").deny_unknown();
        let err = codec.decode(r#"{"a": 1, "c": 2}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unexpected key 'c' on line 1, character 10"
        );
    }

    #[test]
    fn missing_required_key_names_the_key() {
        let codec = int_record().require("a").require("b");
        let err = codec.decode(r#"{"a": 1}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Required key 'b' missing on line 1, character 9"
        );
    }

    #[test]
    fn missing_key_delimiter_is_reported() {
        let err = int_record().decode(r#"{"a" 1}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unexpected character on line 1, character 6 (got '1}', expected ':')"
        );
    }

    #[test]
    fn discriminator_is_consumed_and_checked() {
        let codec = int_record().with_discriminator("class", "point");
        assert_eq!(
            codec.decode(r#"{"class": "point", "x": 1}"#).unwrap(),
            record(&[("x", Value::Integer(1))])
        );
    }

    #[test]
    fn discriminator_only_record_is_valid() {
        let codec = int_record().with_discriminator("class", "point");
        assert_eq!(codec.decode(r#"{"class": "point"}"#).unwrap(), record(&[]));
    }

    #[test]
    fn wrong_identity_is_no_match() {
        let codec = int_record().with_discriminator("class", "point");
        assert!(codec
            .decode(r#"{"class": "line", "x": 1}"#)
            .unwrap_err()
            .is_no_match());
    }

    #[test]
    fn missing_discriminator_is_an_error() {
        let codec = int_record().with_discriminator("class", "point");
        let err = codec.decode(r#"{"x": 1}"#).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Expected discriminator key 'class', got 'x'"));
        let err = codec.decode("{}").unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Expected discriminator key 'class', got '}'"));
    }

    #[test]
    fn per_key_override_routes_the_value() {
        let codec = int_record().with_field("name", Arc::new(QuotedCodec::new("string")));
        assert_eq!(
            codec.decode(r#"{"name": "ada", "n": 1}"#).unwrap(),
            record(&[
                ("name", Value::String("ada".into())),
                ("n", Value::Integer(1))
            ])
        );
    }

    #[test]
    fn encodes_one_pair_per_line() {
        let out = int_record()
            .encode(&record(&[("a", Value::Integer(1)), ("b", Value::Integer(2))]))
            .unwrap();
        assert_eq!(out, "{\n    \"a\": 1,\n    \"b\": 2\n}");
    }

    #[test]
    fn encodes_discriminator_first() {
        let codec = int_record().with_discriminator("class", "point").single_line();
        let out = codec.encode(&record(&[("x", Value::Integer(1))])).unwrap();
        assert_eq!(out, r#"{"class": "point", "x": 1}"#);
    }

    #[test]
    fn compact_encode_when_whitespace_is_kept() {
        let out = int_record()
            .single_line()
            .keep_whitespace_between()
            .encode(&record(&[("a", Value::Integer(1))]))
            .unwrap();
        assert_eq!(out, r#"{"a":1}"#);
    }
}
