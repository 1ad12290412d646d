//! Numeral leaf codecs.
//!
//! The `real` alternation tries float, then rational, then integer, in that
//! order. The order is load-bearing: the float pattern requires a decimal
//! point precisely so that a bare `3` falls through to the integer codec.

use std::sync::Arc;

use num_rational::Ratio;

use crate::{
    alternation::Alternation,
    codec::{Hook, Unhook},
    error::BoxError,
    scan::{Digits, FloatLiteral, RationalLiteral, SignedInteger},
    token::TokenCodec,
    value::Value,
};

/// `\d+`, decoding to a non-negative [`Value::Integer`].
#[must_use]
pub fn unsigned_integer() -> TokenCodec {
    TokenCodec::new("unsigned integer", Digits)
        .with_hook(Hook::single(|v| parse_integer(&v)))
        .with_unhook(Unhook::new(integer_text))
        .with_accepts(|v| matches!(v, Value::Integer(i) if *i >= 0))
}

/// `[+-]?\d+`, decoding to a [`Value::Integer`].
#[must_use]
pub fn signed_integer() -> TokenCodec {
    TokenCodec::new("integer", SignedInteger)
        .with_hook(Hook::single(|v| parse_integer(&v)))
        .with_unhook(Unhook::new(integer_text))
        .with_accepts(|v| matches!(v, Value::Integer(_)))
}

/// A decimal float with a mandatory point, decoding to a [`Value::Float`].
#[must_use]
pub fn float() -> TokenCodec {
    TokenCodec::new("float", FloatLiteral)
        .with_hook(Hook::single(|v| {
            let text = expect_text(&v)?;
            Ok(Value::Float(text.parse::<f64>()?))
        }))
        .with_unhook(Unhook::new(float_text))
        .with_accepts(|v| matches!(v, Value::Float(_)))
}

/// `[+-]?\d+/\d+`, decoding to a normalized [`Value::Rational`].
#[must_use]
pub fn rational() -> TokenCodec {
    TokenCodec::new("rational", RationalLiteral)
        .with_hook(Hook::single(|v| parse_rational(&v)))
        .with_unhook(Unhook::new(rational_text))
        .with_accepts(|v| matches!(v, Value::Rational(_)))
}

/// The real-number alternation: float, then rational, then integer.
#[must_use]
pub fn real() -> Alternation {
    Alternation::new(
        "real number",
        vec![
            Arc::new(float()),
            Arc::new(rational()),
            Arc::new(signed_integer()),
        ],
    )
}

fn expect_text(value: &Value) -> Result<&str, BoxError> {
    value
        .as_str()
        .ok_or_else(|| format!("expected matched text, got {}", value.kind()).into())
}

fn parse_integer(value: &Value) -> Result<Value, BoxError> {
    let text = expect_text(value)?;
    Ok(Value::Integer(text.parse::<i64>()?))
}

fn integer_text(value: &Value) -> Result<Value, BoxError> {
    match value {
        Value::Integer(i) => Ok(Value::String(i.to_string())),
        other => Err(format!("expected an integer, got {}", other.kind()).into()),
    }
}

fn float_text(value: &Value) -> Result<Value, BoxError> {
    let Value::Float(f) = value else {
        return Err(format!("expected a float, got {}", value.kind()).into());
    };
    if !f.is_finite() {
        return Err("non-finite floats have no textual form".into());
    }
    let mut text = f.to_string();
    // `14_f64` renders as "14"; force a decimal point so the text decodes
    // back as a float rather than an integer.
    if !text.contains('.') && !text.contains('e') {
        text.push_str(".0");
    }
    Ok(Value::String(text))
}

fn parse_rational(value: &Value) -> Result<Value, BoxError> {
    let text = expect_text(value)?;
    let (numer, denom) = text
        .split_once('/')
        .ok_or_else(|| BoxError::from("rational literal is missing '/'"))?;
    let numer: i64 = numer.parse()?;
    let denom: i64 = denom.parse()?;
    if denom == 0 {
        return Err("rational literal has a zero denominator".into());
    }
    Ok(Value::Rational(Ratio::new(numer, denom)))
}

fn rational_text(value: &Value) -> Result<Value, BoxError> {
    match value {
        Value::Rational(r) => Ok(Value::String(format!("{}/{}", r.numer(), r.denom()))),
        other => Err(format!("expected a rational, got {}", other.kind()).into()),
    }
}
