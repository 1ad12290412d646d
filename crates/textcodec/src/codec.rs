//! The decode/encode contract every codec implements.
//!
//! A [`Codec`] pairs a structural decoder (`decode_at`) with a structural
//! encoder (`encode_at`) for one grammar fragment. The provided methods wrap
//! the structural pair with the shared pipeline: whitespace skipping, buffer
//! discard, the hook/unhook value transforms, the whole-input trailing-data
//! check, and the encode-side acceptance check.
//!
//! Codecs are immutable after construction and hold no per-call state, so a
//! single codec graph can be shared freely across decode sessions.

use core::fmt;
use std::sync::Arc;

use crate::{
    error::{BoxError, DecodeError, EncodeError},
    read_buffer::ReadBuffer,
    scan::Whitespace,
    value::{Record, Value},
};

/// Forward transform from a structural decode result to a domain value.
///
/// The arity mode is fixed at construction: a closed set of shapes instead of
/// runtime argument-count inspection.
#[derive(Clone)]
pub enum Hook {
    /// Apply to the decoded value as a whole.
    Single(Arc<dyn Fn(Value) -> Result<Value, BoxError> + Send + Sync>),
    /// Spread a decoded sequence as positional arguments.
    Spread(Arc<dyn Fn(Vec<Value>) -> Result<Value, BoxError> + Send + Sync>),
    /// Spread a decoded record as named fields.
    Named(Arc<dyn Fn(Record) -> Result<Value, BoxError> + Send + Sync>),
}

impl Hook {
    /// Wraps a plain single-value function.
    pub fn single(f: impl Fn(Value) -> Result<Value, BoxError> + Send + Sync + 'static) -> Self {
        Hook::Single(Arc::new(f))
    }

    /// Wraps a positional-spread function.
    pub fn spread(
        f: impl Fn(Vec<Value>) -> Result<Value, BoxError> + Send + Sync + 'static,
    ) -> Self {
        Hook::Spread(Arc::new(f))
    }

    /// Wraps a named-field-spread function.
    pub fn named(f: impl Fn(Record) -> Result<Value, BoxError> + Send + Sync + 'static) -> Self {
        Hook::Named(Arc::new(f))
    }

    fn apply(&self, value: Value) -> Result<Value, BoxError> {
        match self {
            Hook::Single(f) => f(value),
            Hook::Spread(f) => match value {
                Value::Array(items) => f(items),
                other => Err(format!("spread hook expects a sequence, got {}", other.kind()).into()),
            },
            Hook::Named(f) => match value {
                Value::Record(fields) => f(fields),
                other => Err(format!("named hook expects a record, got {}", other.kind()).into()),
            },
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Hook::Single(_) => "Hook::Single",
            Hook::Spread(_) => "Hook::Spread",
            Hook::Named(_) => "Hook::Named",
        })
    }
}

/// Backward transform from a domain value to its structural representation.
#[derive(Clone)]
pub struct Unhook(Arc<dyn Fn(&Value) -> Result<Value, BoxError> + Send + Sync>);

impl Unhook {
    pub fn new(f: impl Fn(&Value) -> Result<Value, BoxError> + Send + Sync + 'static) -> Self {
        Unhook(Arc::new(f))
    }

    pub(crate) fn apply(&self, value: &Value) -> Result<Value, BoxError> {
        (self.0)(value)
    }
}

impl fmt::Debug for Unhook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Unhook")
    }
}

type AcceptFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Shared per-codec configuration, immutable after construction.
#[derive(Clone)]
pub struct CodecConfig {
    name: String,
    /// Skip leading whitespace before matching (and trailing whitespace in a
    /// whole-input decode).
    pub skip_whitespace: bool,
    /// Discard consumed input from the buffer after a successful decode.
    pub discard: bool,
    hook: Option<Hook>,
    unhook: Option<Unhook>,
    accepts: Option<AcceptFn>,
}

impl fmt::Debug for CodecConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecConfig")
            .field("name", &self.name)
            .field("skip_whitespace", &self.skip_whitespace)
            .field("discard", &self.discard)
            .finish_non_exhaustive()
    }
}

impl CodecConfig {
    /// A configuration with whitespace skipping and discard enabled and no
    /// transforms.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            skip_whitespace: true,
            discard: true,
            hook: None,
            unhook: None,
            accepts: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn with_hook(mut self, hook: Hook) -> Self {
        self.hook = Some(hook);
        self
    }

    #[must_use]
    pub fn with_unhook(mut self, unhook: Unhook) -> Self {
        self.unhook = Some(unhook);
        self
    }

    /// Sets the predicate deciding which values this codec encodes.
    #[must_use]
    pub fn with_accepts(mut self, accepts: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        self.accepts = Some(Arc::new(accepts));
        self
    }

    #[must_use]
    pub fn keep_whitespace(mut self) -> Self {
        self.skip_whitespace = false;
        self
    }

    #[must_use]
    pub fn keep_buffer(mut self) -> Self {
        self.discard = false;
        self
    }

    pub(crate) fn accepts_value(&self, value: &Value) -> bool {
        self.accepts.as_ref().is_none_or(|accepts| accepts(value))
    }

    pub(crate) fn apply_hook(&self, value: Value) -> Result<Value, BoxError> {
        match &self.hook {
            Some(hook) => hook.apply(value),
            None => Ok(value),
        }
    }

    pub(crate) fn apply_unhook(&self, value: &Value) -> Result<Value, BoxError> {
        match &self.unhook {
            Some(unhook) => unhook.apply(value),
            None => Ok(value.clone()),
        }
    }
}

/// Indentation state threaded through structural encoders.
#[derive(Debug, Clone, Copy)]
pub struct Indent<'a> {
    /// Text written once per indentation level.
    pub unit: &'a str,
    /// Current nesting depth.
    pub level: usize,
}

impl Default for Indent<'_> {
    fn default() -> Self {
        Self {
            unit: "    ",
            level: 0,
        }
    }
}

impl<'a> Indent<'a> {
    #[must_use]
    pub fn new(unit: &'a str) -> Self {
        Self { unit, level: 0 }
    }

    /// One level deeper, same unit.
    #[must_use]
    pub fn deeper(self) -> Self {
        Self {
            unit: self.unit,
            level: self.level + 1,
        }
    }

    /// Writes the indentation for the current level.
    ///
    /// # Errors
    ///
    /// Propagates sink failures.
    pub fn write_to(self, out: &mut dyn fmt::Write) -> fmt::Result {
        for _ in 0..self.level {
            out.write_str(self.unit)?;
        }
        Ok(())
    }
}

/// Skips a run of whitespace starting at `offset`.
///
/// With `discard` set the consumed run (and everything before it) is dropped
/// from the buffer and the returned offset is zero; otherwise the returned
/// offset points just past the run.
///
/// # Errors
///
/// Propagates buffer I/O failures.
pub fn skip_whitespace(
    buf: &mut ReadBuffer<'_>,
    offset: usize,
    discard: bool,
) -> Result<usize, DecodeError> {
    // Whitespace matches the empty string, so a scan can only fail on I/O.
    let end = buf.match_scan(&Whitespace, offset)?.unwrap_or(offset);
    if discard {
        buf.discard(end);
        Ok(0)
    } else {
        Ok(end)
    }
}

/// A paired decoder/encoder for one grammar fragment.
///
/// Implement [`decode_at`] and [`encode_at`]; the provided methods supply the
/// shared pipeline. Callers use [`decode_one`] to decode a value and keep
/// going, [`decode`] / [`decode_stream`] for whole inputs, and [`encode`] /
/// [`encode_to`] for the reverse direction.
///
/// [`decode_at`]: Codec::decode_at
/// [`encode_at`]: Codec::encode_at
/// [`decode_one`]: Codec::decode_one
/// [`decode`]: Codec::decode
/// [`decode_stream`]: Codec::decode_stream
/// [`encode`]: Codec::encode
/// [`encode_to`]: Codec::encode_to
pub trait Codec: Send + Sync {
    /// This codec's configuration.
    fn config(&self) -> &CodecConfig;

    /// Structurally decodes one value at `offset`, returning the value and
    /// the end offset of the match.
    ///
    /// The returned end offset is never smaller than `offset`, and the codec
    /// retains no state between calls: re-invoking any codec at the returned
    /// offset continues correctly.
    ///
    /// # Errors
    ///
    /// [`DecodeError::NoMatch`] when the input does not begin with this
    /// codec's grammar; the other [`DecodeError`] kinds per their meaning.
    fn decode_at(
        &self,
        buf: &mut ReadBuffer<'_>,
        offset: usize,
    ) -> Result<(Value, usize), DecodeError>;

    /// Structurally encodes `value` (already unhooked) to `out`.
    ///
    /// Indentation of the first line is the caller's concern; everything
    /// after the first line break is this codec's.
    ///
    /// # Errors
    ///
    /// [`EncodeError`] kinds per their meaning.
    fn encode_at(
        &self,
        value: &Value,
        out: &mut dyn fmt::Write,
        indent: Indent<'_>,
    ) -> Result<(), EncodeError>;

    /// This codec's display name, used in error messages.
    fn name(&self) -> &str {
        self.config().name()
    }

    /// Whether this codec can encode `value`.
    fn accepts(&self, value: &Value) -> bool {
        self.config().accepts_value(value)
    }

    /// Decodes one value at `offset`, never discarding consumed input.
    ///
    /// Applies the whitespace policy, the structural decode and the hook.
    /// Offsets held by the caller stay valid across the call, making this
    /// the right entry point wherever the caller may still need to back out,
    /// regardless of the codec's own discard policy.
    ///
    /// # Errors
    ///
    /// Structural errors from [`decode_at`](Codec::decode_at);
    /// [`DecodeError::Hook`] when the value transform fails.
    fn decode_pinned(
        &self,
        buf: &mut ReadBuffer<'_>,
        offset: usize,
    ) -> Result<(Value, usize), DecodeError> {
        let config = self.config();
        let offset = if config.skip_whitespace {
            skip_whitespace(buf, offset, false)?
        } else {
            offset
        };
        let start = buf.abs_offset(offset);
        let (value, end) = self.decode_at(buf, offset)?;
        let end_abs = buf.abs_offset(end);
        let value = config.apply_hook(value).map_err(|source| DecodeError::Hook {
            start,
            end: end_abs,
            source,
        })?;
        Ok((value, end))
    }

    /// Decodes one value at `offset`, expecting more input to follow.
    ///
    /// Like [`decode_pinned`](Codec::decode_pinned), then applies the
    /// configured discard policy. When discard is enabled the returned end
    /// offset is relative to the shrunken buffer.
    ///
    /// # Errors
    ///
    /// As [`decode_pinned`](Codec::decode_pinned).
    fn decode_one(
        &self,
        buf: &mut ReadBuffer<'_>,
        offset: usize,
    ) -> Result<(Value, usize), DecodeError> {
        let (value, end) = self.decode_pinned(buf, offset)?;
        if self.config().discard {
            buf.discard(end);
            Ok((value, 0))
        } else {
            Ok((value, end))
        }
    }

    /// Decodes exactly one value from `buf`, verifying nothing but
    /// whitespace follows.
    ///
    /// # Errors
    ///
    /// [`DecodeError::TrailingData`] when non-whitespace input remains after
    /// a complete value; otherwise as [`decode_one`](Codec::decode_one).
    fn decode_stream(&self, buf: &mut ReadBuffer<'_>) -> Result<Value, DecodeError> {
        let (value, mut offset) = self.decode_one(buf, 0)?;
        if self.config().skip_whitespace {
            offset = skip_whitespace(buf, offset, self.config().discard)?;
        }
        if offset < buf.retained().len() {
            let (line, column) = buf.position_at(offset);
            return Err(DecodeError::TrailingData {
                line,
                column,
                found: buf.context_at(offset, 16),
            });
        }
        Ok(value)
    }

    /// Decodes exactly one value from a fully materialized string.
    ///
    /// # Errors
    ///
    /// As [`decode_stream`](Codec::decode_stream).
    fn decode(&self, text: &str) -> Result<Value, DecodeError> {
        let mut buf = ReadBuffer::from_text(text);
        self.decode_stream(&mut buf)
    }

    /// Decodes exactly one value off a buffered reader, pulling lines on
    /// demand.
    ///
    /// # Errors
    ///
    /// As [`decode_stream`](Codec::decode_stream).
    fn decode_from(&self, reader: &mut dyn std::io::BufRead) -> Result<Value, DecodeError> {
        let mut buf = ReadBuffer::from_reader(reader);
        self.decode_stream(&mut buf)
    }

    /// Encodes `value` to `out`. Checks acceptance, unhooks, then encodes
    /// structurally; `indent_first` controls indentation of the first line.
    ///
    /// # Errors
    ///
    /// [`EncodeError::ValueNotAccepted`] when `value` fails the acceptance
    /// check; [`EncodeError::Unhook`] when decomposition fails.
    fn encode_to(
        &self,
        value: &Value,
        out: &mut dyn fmt::Write,
        indent: Indent<'_>,
        indent_first: bool,
    ) -> Result<(), EncodeError> {
        if !self.accepts(value) {
            return Err(EncodeError::ValueNotAccepted {
                codec: self.name().to_owned(),
                kind: value.kind(),
            });
        }
        let structural = self
            .config()
            .apply_unhook(value)
            .map_err(|source| EncodeError::Unhook {
                codec: self.name().to_owned(),
                source,
            })?;
        if indent_first {
            indent.write_to(out)?;
        }
        self.encode_at(&structural, out, indent)
    }

    /// Encodes `value` into a fresh string.
    ///
    /// # Errors
    ///
    /// As [`encode_to`](Codec::encode_to).
    fn encode(&self, value: &Value) -> Result<String, EncodeError> {
        let mut out = String::new();
        self.encode_to(value, &mut out, Indent::default(), false)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spread_hook_rejects_non_sequences() {
        let hook = Hook::spread(|items| Ok(Value::Integer(items.len() as i64)));
        assert!(hook.apply(Value::Integer(3)).is_err());
        assert_eq!(
            hook.apply(Value::Array(vec![Value::Null, Value::Null])).unwrap(),
            Value::Integer(2)
        );
    }

    #[test]
    fn named_hook_rejects_non_records() {
        let hook = Hook::named(|fields| Ok(Value::Integer(fields.len() as i64)));
        assert!(hook.apply(Value::Array(vec![])).is_err());
        assert_eq!(hook.apply(Value::Record(Record::new())).unwrap(), Value::Integer(0));
    }

    #[test]
    fn indent_writes_level_times() {
        let mut out = String::new();
        Indent { unit: "  ", level: 3 }.write_to(&mut out).unwrap();
        assert_eq!(out, "      ");
    }
}
