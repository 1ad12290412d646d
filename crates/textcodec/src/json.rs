//! Ready-made JSON-style codec assemblies.
//!
//! The value grammar is the alternation boolean, null, string, real number,
//! list, record, with lists and records recursing through the whole
//! alternation. [`value_codec`] encodes nested structures one item per line;
//! [`value_codec_single_line`] emits the compact one-line form. Numbers keep
//! the distinction the numeral codecs make: `3` is an integer, `3.5` a
//! float, `2/3` a rational.

use std::sync::Arc;

use crate::{
    alternation::Alternation,
    codec::{Codec, Hook, Unhook},
    numeral,
    quoted::QuotedCodec,
    record::RecordCodec,
    scan::Keywords,
    sequence::SequenceCodec,
    token::TokenCodec,
    value::Value,
};

/// The double-quoted string codec used for values and record keys.
#[must_use]
pub fn string_codec() -> QuotedCodec {
    QuotedCodec::new("string")
}

/// `true` / `false`, decoding to [`Value::Boolean`].
#[must_use]
pub fn boolean_codec() -> TokenCodec {
    TokenCodec::new("boolean", Keywords::new(&["true", "false"]))
        .with_hook(Hook::single(|v| match v.as_str() {
            Some("true") => Ok(Value::Boolean(true)),
            Some("false") => Ok(Value::Boolean(false)),
            _ => Err(format!("expected a boolean keyword, got {}", v.kind()).into()),
        }))
        .with_unhook(Unhook::new(|v| match v {
            Value::Boolean(true) => Ok(Value::String("true".to_owned())),
            Value::Boolean(false) => Ok(Value::String("false".to_owned())),
            other => Err(format!("expected a boolean, got {}", other.kind()).into()),
        }))
        .with_accepts(|v| matches!(v, Value::Boolean(_)))
}

/// `null`, decoding to [`Value::Null`].
#[must_use]
pub fn null_codec() -> TokenCodec {
    TokenCodec::new("null", Keywords::new(&["null"]))
        .with_hook(Hook::single(|_| Ok(Value::Null)))
        .with_unhook(Unhook::new(|v| match v {
            Value::Null => Ok(Value::String("null".to_owned())),
            other => Err(format!("expected null, got {}", other.kind()).into()),
        }))
        .with_accepts(Value::is_null)
}

fn assemble(single_line: bool) -> Arc<Alternation> {
    let value = Alternation::deferred("JSON value");
    let mut list = SequenceCodec::new("list", value.clone() as Arc<dyn Codec>);
    let mut record = RecordCodec::new("record", Arc::new(string_codec()), value.clone());
    if single_line {
        list = list.single_line().keep_whitespace_between();
        record = record.single_line().keep_whitespace_between();
    }
    value.bind(vec![
        Arc::new(boolean_codec()),
        Arc::new(null_codec()),
        Arc::new(string_codec()),
        Arc::new(numeral::real()),
        Arc::new(list),
        Arc::new(record),
    ]);
    value
}

/// The JSON value codec, encoding nested structures one item per line.
#[must_use]
pub fn value_codec() -> Arc<Alternation> {
    assemble(false)
}

/// The JSON value codec with compact, whitespace-free encoding.
#[must_use]
pub fn value_codec_single_line() -> Arc<Alternation> {
    assemble(true)
}

/// A record codec requiring a leading `"class": "<identity>"` pair.
///
/// The discriminator pair is checked and dropped on decode and re-emitted on
/// encode, so the decoded record carries only the payload keys. Alternations
/// of typed records dispatch on the identity string.
#[must_use]
pub fn typed_record(name: impl Into<String>, identity: impl Into<String>) -> RecordCodec {
    RecordCodec::new(name, Arc::new(string_codec()), assemble(false))
        .with_discriminator("class", identity)
}
