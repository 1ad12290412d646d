//! The arithmetic grammar against a realistic resolver, including
//! chunked input.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::ChunkSource;
use quickcheck_macros::quickcheck;
use rstest::rstest;
use textcodec::{
    BoxError, Codec, DecodeError, Ratio, ReadBuffer, Value,
    expr::{self, Resolver},
};

struct Env {
    variables: HashMap<&'static str, Value>,
}

impl Env {
    fn new() -> Self {
        let mut variables = HashMap::new();
        variables.insert("x", Value::Integer(4));
        variables.insert("half", Value::Rational(Ratio::new(1, 2)));
        variables.insert("pi", Value::Float(std::f64::consts::PI));
        Self { variables }
    }
}

impl Resolver for Env {
    fn variable(&self, name: &str) -> Result<Value, BoxError> {
        self.variables
            .get(name)
            .cloned()
            .ok_or_else(|| format!("unknown variable '{name}'").into())
    }

    fn call(&self, name: &str, args: &[Value]) -> Result<Value, BoxError> {
        match name {
            "sum" => args
                .iter()
                .try_fold(Value::Integer(0), |acc, arg| expr::add(&acc, arg)),
            "first" => args
                .first()
                .cloned()
                .ok_or_else(|| BoxError::from("first needs an argument")),
            _ => Err(format!("unknown function '{name}'").into()),
        }
    }
}

fn evaluate(text: &str) -> Result<Value, DecodeError> {
    expr::arithmetic(Arc::new(Env::new())).decode(text)
}

#[rstest]
#[case("x ^ 2 - 1", Value::Integer(15))]
#[case("half + 1/4", Value::Rational(Ratio::new(3, 4)))]
#[case("2 * (x - 1)", Value::Integer(6))]
#[case("sum(1, 2, 3)", Value::Integer(6))]
#[case("sum(x)", Value::Integer(4))]
#[case("first(7, 8)", Value::Integer(7))]
#[case("sum(2 * x, 1) + 1", Value::Integer(10))]
#[case("x == 4", Value::Boolean(true))]
#[case("x < half", Value::Boolean(false))]
fn resolver_backed_evaluation(#[case] text: &str, #[case] expected: Value) {
    assert_eq!(evaluate(text).unwrap(), expected);
}

#[test]
fn unknown_names_surface_as_decode_failures() {
    let err = evaluate("2 + y").unwrap_err();
    assert!(matches!(err, DecodeError::Hook { .. }), "{err}");
    assert!(err.to_string().contains("unknown variable 'y'"), "{err}");

    let err = evaluate("product(1, 2)").unwrap_err();
    assert!(err.to_string().contains("unknown function 'product'"), "{err}");
}

#[test]
fn chunked_expression_decodes_like_whole_text() {
    let text = "1 + 2 * (3 - 4) ^ 2 - x / 8";
    let codec = expr::arithmetic(Arc::new(Env::new()));
    let whole = codec.decode(text).unwrap();
    assert_eq!(whole, Value::Rational(Ratio::new(5, 2)));

    let mut buf = ReadBuffer::from_source(ChunkSource::trickle(text));
    assert_eq!(codec.decode_stream(&mut buf).unwrap(), whole);
}

#[test]
fn trailing_operands_are_rejected() {
    let err = evaluate("2 3").unwrap_err();
    assert!(matches!(err, DecodeError::TrailingData { .. }), "{err}");
}

#[quickcheck]
fn linear_forms_evaluate_exactly(a: i16, b: i16, c: i16) -> bool {
    let text = format!("{a} + {b} * {c}");
    let expected = i64::from(a) + i64::from(b) * i64::from(c);
    evaluate(&text).unwrap() == Value::Integer(expected)
}
