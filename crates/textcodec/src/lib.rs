//! Composable, bidirectional text codecs with incremental decoding.
//!
//! A [`Codec`] couples a decoder and an encoder for one fragment of a text
//! format. Leaf codecs match tokens and delimited strings; composites build
//! alternations, delimited sequences and keyed records out of other codecs;
//! hooks and unhooks convert between matched text and domain values at every
//! level. Decoding runs over a [`ReadBuffer`], which pulls input on demand
//! and produces the same results whether the input arrives as one string or
//! one character at a time.
//!
//! ```rust
//! use textcodec::{Codec, Value, json};
//!
//! let codec = json::value_codec();
//! let value = codec.decode(r#"{"ok": true, "score": 3/4}"#).unwrap();
//! let fields = value.as_record().unwrap();
//! assert_eq!(fields["ok"], Value::Boolean(true));
//! ```

mod alternation;
mod codec;
mod error;
mod quoted;
mod read_buffer;
mod record;
mod sequence;
mod token;
mod value;

pub mod expr;
pub mod json;
pub mod numeral;
pub mod scan;

pub use num_rational::Ratio;

pub use alternation::Alternation;
pub use codec::{Codec, CodecConfig, Hook, Indent, Unhook, skip_whitespace};
pub use error::{BoxError, DecodeError, EncodeError};
pub use quoted::QuotedCodec;
pub use read_buffer::{LineSource, ReadBuffer, TextSource};
pub use record::{Discriminator, RecordCodec};
pub use sequence::SequenceCodec;
pub use token::TokenCodec;
pub use value::{Record, Value};
