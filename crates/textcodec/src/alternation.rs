//! Ordered-choice composite codec.

use core::fmt;
use std::sync::{Arc, OnceLock};

use crate::{
    codec::{Codec, CodecConfig, Hook, Indent},
    error::{DecodeError, EncodeError},
    read_buffer::ReadBuffer,
    value::Value,
};

/// Tries child codecs in priority order.
///
/// Decoding catches only the internal [`DecodeError::NoMatch`] signal from a
/// child and moves on; any other failure propagates. This containment
/// boundary is deliberate: a grandchild's `NoMatch` must be handled by its
/// own parent, never silently treated as "try the next branch" here, or real
/// syntax errors would vanish into false alternation failures.
///
/// Encoding routes to the first child whose acceptance check passes.
///
/// Children are held behind a [`OnceLock`] so that self-referential grammars
/// can be built in two phases: create the alternation empty with
/// [`Alternation::deferred`], build the codecs that refer back to it, then
/// [`bind`](Alternation::bind) the child list once.
pub struct Alternation {
    config: CodecConfig,
    children: OnceLock<Vec<Arc<dyn Codec>>>,
}

impl fmt::Debug for Alternation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Alternation")
            .field("name", &self.name())
            .field("children", &self.children().len())
            .finish()
    }
}

impl Alternation {
    /// An alternation over a fixed child list.
    #[must_use]
    pub fn new(name: impl Into<String>, children: Vec<Arc<dyn Codec>>) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(children);
        Self {
            config: CodecConfig::new(name),
            children: cell,
        }
    }

    /// An empty alternation to be [`bind`](Alternation::bind)ed later;
    /// returned in an [`Arc`] so children can hold references back to it.
    #[must_use]
    pub fn deferred(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            config: CodecConfig::new(name),
            children: OnceLock::new(),
        })
    }

    /// Supplies the child list of a deferred alternation.
    ///
    /// # Panics
    ///
    /// Panics if the children were already bound.
    pub fn bind(&self, children: Vec<Arc<dyn Codec>>) {
        assert!(
            self.children.set(children).is_ok(),
            "alternation '{}' is already bound",
            self.name()
        );
    }

    #[must_use]
    pub fn with_hook(mut self, hook: Hook) -> Self {
        self.config = self.config.with_hook(hook);
        self
    }

    fn children(&self) -> &[Arc<dyn Codec>] {
        self.children.get().map_or(&[], Vec::as_slice)
    }
}

impl Codec for Alternation {
    fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn accepts(&self, value: &Value) -> bool {
        self.children().iter().any(|child| child.accepts(value))
    }

    fn decode_at(
        &self,
        buf: &mut ReadBuffer<'_>,
        offset: usize,
    ) -> Result<(Value, usize), DecodeError> {
        for child in self.children() {
            match child.decode_one(buf, offset) {
                Err(err) if err.is_no_match() => {}
                other => return other,
            }
        }
        Err(DecodeError::no_match(self.name()))
    }

    fn encode_at(
        &self,
        value: &Value,
        out: &mut dyn fmt::Write,
        indent: Indent<'_>,
    ) -> Result<(), EncodeError> {
        for child in self.children() {
            if child.accepts(value) {
                return child.encode_to(value, out, indent, false);
            }
        }
        Err(EncodeError::ValueNotAccepted {
            codec: self.name().to_owned(),
            kind: value.kind(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        numeral,
        scan::{Digits, Identifier},
        token::TokenCodec,
    };

    use super::*;

    fn digits_or_name() -> Alternation {
        Alternation::new(
            "digits or name",
            vec![
                Arc::new(TokenCodec::new("digits", Digits)),
                Arc::new(TokenCodec::new("name", Identifier)),
            ],
        )
    }

    #[test]
    fn first_matching_child_wins() {
        let alt = digits_or_name();
        assert_eq!(alt.decode("12").unwrap(), Value::String("12".into()));
        assert_eq!(alt.decode("ab").unwrap(), Value::String("ab".into()));
    }

    #[test]
    fn no_child_matching_reports_the_alternation() {
        let alt = digits_or_name();
        let err = alt.decode("!?").unwrap_err();
        assert!(matches!(err, DecodeError::NoMatch { codec } if codec == "digits or name"));
    }

    #[test]
    fn child_structural_errors_propagate() {
        // A hook failure inside a child is not an alternation miss; it must
        // escape, not fall through to the next child.
        let alt = Alternation::new(
            "strict",
            vec![
                Arc::new(
                    TokenCodec::new("digits", Digits)
                        .with_hook(crate::codec::Hook::single(|_| Err("boom".into()))),
                ),
                Arc::new(TokenCodec::new("fallback", Digits)),
            ],
        );
        assert!(matches!(
            alt.decode("12").unwrap_err(),
            DecodeError::Hook { .. }
        ));
    }

    #[test]
    fn encode_routes_to_first_accepting_child() {
        let real = numeral::real();
        assert_eq!(real.encode(&Value::Integer(5)).unwrap(), "5");
    }

    #[test]
    fn encode_with_no_accepting_child_fails() {
        let real = numeral::real();
        assert!(matches!(
            real.encode(&Value::String("x".into())),
            Err(EncodeError::ValueNotAccepted { .. })
        ));
    }

    #[test]
    #[should_panic(expected = "already bound")]
    fn double_bind_panics() {
        let alt = Alternation::deferred("expr");
        alt.bind(vec![]);
        alt.bind(vec![]);
    }
}
