//! The delimited homogeneous-sequence composite.

use core::fmt;
use std::{collections::BTreeMap, sync::Arc};

use crate::{
    codec::{Codec, CodecConfig, Hook, Indent, Unhook, skip_whitespace},
    error::{DecodeError, EncodeError},
    read_buffer::ReadBuffer,
    value::Value,
};

/// Matches `delim` at `offset`, optionally skipping whitespace first.
///
/// Returns the offset just past the delimiter, or `None` when the input does
/// not continue with it. Never mutates the buffer beyond pulling more input.
pub(crate) fn match_delim(
    buf: &mut ReadBuffer<'_>,
    delim: &str,
    offset: usize,
    skip: bool,
) -> Result<Option<usize>, DecodeError> {
    let pos = if skip {
        skip_whitespace(buf, offset, false)?
    } else {
        offset
    };
    if buf.match_literal(delim, pos)? {
        Ok(Some(pos + delim.len()))
    } else {
        Ok(None)
    }
}

/// A delimited sequence of values sharing one item codec.
///
/// Decoding matches the begin delimiter, then alternates items and item
/// delimiters until the end delimiter; specific indices can be routed to
/// override codecs. The begin delimiter is the commit point: before it the
/// codec reports `NoMatch`, after it every failure is a hard error, which is
/// what keeps this codec safe to use inside an [`Alternation`].
///
/// Encoding is multi-line by default, one item per line at the next
/// indentation level; [`single_line`] switches to a delimiter-joined form.
///
/// [`Alternation`]: crate::Alternation
/// [`single_line`]: SequenceCodec::single_line
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use textcodec::{Codec, SequenceCodec, Value, numeral};
///
/// let list = SequenceCodec::new("list", Arc::new(numeral::signed_integer()));
/// assert_eq!(
///     list.decode("[1, 2, 3]").unwrap(),
///     Value::Array(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)])
/// );
/// ```
pub struct SequenceCodec {
    config: CodecConfig,
    item: Arc<dyn Codec>,
    by_index: BTreeMap<usize, Arc<dyn Codec>>,
    begin: String,
    item_delim: String,
    end: String,
    multiline: bool,
    skip_between: bool,
}

impl SequenceCodec {
    /// A `[`-delimited, `,`-separated, `]`-terminated sequence.
    #[must_use]
    pub fn new(name: impl Into<String>, item: Arc<dyn Codec>) -> Self {
        Self {
            config: CodecConfig::new(name)
                .with_accepts(|value| matches!(value, Value::Array(_))),
            item,
            by_index: BTreeMap::new(),
            begin: "[".to_owned(),
            item_delim: ",".to_owned(),
            end: "]".to_owned(),
            multiline: true,
            skip_between: true,
        }
    }

    /// Replaces the three delimiters. An empty end delimiter makes the
    /// sequence end wherever an item delimiter fails to match.
    #[must_use]
    pub fn with_delimiters(
        mut self,
        begin: impl Into<String>,
        item_delim: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        self.begin = begin.into();
        self.item_delim = item_delim.into();
        self.end = end.into();
        self
    }

    /// Routes the item at `index` through `codec` instead of the shared item
    /// codec, on both decode and encode.
    #[must_use]
    pub fn with_override(mut self, index: usize, codec: Arc<dyn Codec>) -> Self {
        self.by_index.insert(index, codec);
        self
    }

    /// Encodes on one line instead of one item per line.
    #[must_use]
    pub fn single_line(mut self) -> Self {
        self.multiline = false;
        self
    }

    /// Stops skipping whitespace around items and delimiters on decode, and
    /// stops padding item delimiters on encode.
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

    fn item_at(&self, index: usize) -> &dyn Codec {
        self.by_index
            .get(&index)
            .map_or(&*self.item, |codec| &**codec)
    }

    /// Offset whitespace is skipped to before reporting an error at `offset`.
    fn error_pos(&self, buf: &mut ReadBuffer<'_>, offset: usize) -> Result<usize, DecodeError> {
        if self.skip_between {
            skip_whitespace(buf, offset, false)
        } else {
            Ok(offset)
        }
    }

    fn encode_multiline(
        &self,
        items: &[Value],
        out: &mut dyn fmt::Write,
        indent: Indent<'_>,
    ) -> Result<(), EncodeError> {
        out.write_str(&self.begin)?;
        for (k, item) in items.iter().enumerate() {
            if k > 0 {
                out.write_str(&self.item_delim)?;
            }
            out.write_str("\n")?;
            self.item_at(k).encode_to(item, out, indent.deeper(), true)?;
        }
        out.write_str("\n")?;
        indent.write_to(out)?;
        out.write_str(&self.end)?;
        Ok(())
    }

    fn encode_single_line(
        &self,
        items: &[Value],
        out: &mut dyn fmt::Write,
        indent: Indent<'_>,
    ) -> Result<(), EncodeError> {
        out.write_str(&self.begin)?;
        for (k, item) in items.iter().enumerate() {
            if k > 0 {
                out.write_str(&self.item_delim)?;
                if self.skip_between {
                    out.write_str(" ")?;
                }
            }
            self.item_at(k).encode_to(item, out, indent.deeper(), false)?;
        }
        out.write_str(&self.end)?;
        Ok(())
    }
}

impl fmt::Debug for SequenceCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceCodec")
            .field("name", &self.name())
            .field("begin", &self.begin)
            .field("item_delim", &self.item_delim)
            .field("end", &self.end)
            .field("multiline", &self.multiline)
            .finish_non_exhaustive()
    }
}

impl Codec for SequenceCodec {
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
        let mut items = Vec::new();
        loop {
            if !self.end.is_empty() {
                // An empty sequence closes immediately.
                if let Some(end) = match_delim(buf, &self.end, offset, self.skip_between)? {
                    return Ok((Value::Array(items), end));
                }
            }
            let (item, next) = match self.item_at(items.len()).decode_one(buf, offset) {
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
            items.push(item);
            offset = next;
            if let Some(next) = match_delim(buf, &self.item_delim, offset, self.skip_between)? {
                offset = next;
                continue;
            }
            if let Some(end) = match_delim(buf, &self.end, offset, self.skip_between)? {
                return Ok((Value::Array(items), end));
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
        let Value::Array(items) = value else {
            return Err(EncodeError::Unhook {
                codec: self.name().to_owned(),
                source: format!(
                    "can only encode a sequence, got {}; supply an unhook",
                    value.kind()
                )
                .into(),
            });
        };
        if self.multiline && self.skip_between {
            self.encode_multiline(items, out, indent)
        } else {
            self.encode_single_line(items, out, indent)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::numeral;

    use super::*;

    fn int_list() -> SequenceCodec {
        SequenceCodec::new("list", Arc::new(numeral::signed_integer()))
    }

    #[test]
    fn decodes_separated_items() {
        assert_eq!(
            int_list().decode("[1, -2,3]").unwrap(),
            Value::Array(vec![
                Value::Integer(1),
                Value::Integer(-2),
                Value::Integer(3)
            ])
        );
    }

    #[test]
    fn decodes_empty_sequence() {
        assert_eq!(int_list().decode("[ ]").unwrap(), Value::Array(vec![]));
    }

    #[test]
    fn missing_begin_delimiter_is_no_match() {
        assert!(int_list().decode("1, 2]").unwrap_err().is_no_match());
    }

    #[test]
    fn bad_item_is_a_hard_error() {
        let err = int_list().decode("[@]").unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Unexpected character or item on line 1, character 2"));
    }

    #[test]
    fn missing_delimiter_reports_position_past_whitespace() {
        let err = int_list().decode("[1, 2 3]").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unexpected character on line 1, character 7 (got '3]', expected ',' or ']')"
        );
    }

    #[test]
    fn index_overrides_take_precedence() {
        let list = int_list().with_override(
            1,
            Arc::new(crate::quoted::QuotedCodec::new("string")),
        );
        assert_eq!(
            list.decode("[1, \"x\"]").unwrap(),
            Value::Array(vec![Value::Integer(1), Value::String("x".into())])
        );
    }

    #[test]
    fn encodes_one_item_per_line() {
        let out = int_list()
            .encode(&Value::Array(vec![Value::Integer(1), Value::Integer(2)]))
            .unwrap();
        assert_eq!(out, "[\n    1,\n    2\n]");
    }

    #[test]
    fn nested_encode_indents_by_level() {
        let inner = Arc::new(int_list());
        let outer = SequenceCodec::new("lists", inner);
        let out = outer
            .encode(&Value::Array(vec![Value::Array(vec![Value::Integer(7)])]))
            .unwrap();
        assert_eq!(out, "[\n    [\n        7\n    ]\n]");
    }

    #[test]
    fn single_line_encode_pads_delimiters() {
        let out = int_list()
            .single_line()
            .encode(&Value::Array(vec![Value::Integer(1), Value::Integer(2)]))
            .unwrap();
        assert_eq!(out, "[1, 2]");
    }

    #[test]
    fn compact_encode_when_whitespace_is_kept() {
        let out = int_list()
            .single_line()
            .keep_whitespace_between()
            .encode(&Value::Array(vec![Value::Integer(1), Value::Integer(2)]))
            .unwrap();
        assert_eq!(out, "[1,2]");
    }

    #[test]
    fn encode_rejects_non_sequences() {
        assert!(matches!(
            int_list().encode(&Value::Integer(1)),
            Err(EncodeError::ValueNotAccepted { .. })
        ));
    }
}
