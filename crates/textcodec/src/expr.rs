//! Decode-only operator codecs and the arithmetic expression grammar.
//!
//! The grammar is assembled from four structural codecs: prefix operators
//! ([`UnaryOpCodec`]), left-to-right infix chains with an optional inverse
//! operator ([`VariadicOpCodec`]), comparison relations ([`RelationCodec`])
//! and name/call resolution ([`CallCodec`]). [`arithmetic`] wires them into
//! the usual precedence tower, evaluating as it decodes; none of them
//! support encoding.

use core::{cmp::Ordering, fmt};
use std::sync::Arc;

use num_integer::Integer as _;
use num_rational::Ratio;

use crate::{
    alternation::Alternation,
    codec::{Codec, CodecConfig, Hook, Indent, skip_whitespace},
    error::{BoxError, DecodeError, EncodeError},
    numeral,
    read_buffer::ReadBuffer,
    scan::Identifier,
    sequence::SequenceCodec,
    token::TokenCodec,
    value::Value,
};

/// Supplies values for bare names and function calls in an expression.
pub trait Resolver: Send + Sync {
    /// Resolves a bare identifier.
    ///
    /// # Errors
    ///
    /// An error for unknown names; it surfaces as a decode failure spanning
    /// the name.
    fn variable(&self, name: &str) -> Result<Value, BoxError>;

    /// Applies the named function to already-evaluated arguments.
    ///
    /// # Errors
    ///
    /// An error for unknown functions or bad arguments.
    fn call(&self, name: &str, args: &[Value]) -> Result<Value, BoxError>;
}

/// Error for an operator with nothing decodable after it.
fn missing_operand(
    codec: &str,
    buf: &mut ReadBuffer<'_>,
    offset: usize,
) -> DecodeError {
    match skip_whitespace(buf, offset, false) {
        Ok(pos) if pos < buf.retained().len() => DecodeError::syntax(
            codec,
            "Unexpected character while trying to decode operand",
            buf.position_at(pos),
            &buf.context_at(pos, 16),
            Some("an operand"),
        ),
        Ok(_) => DecodeError::Incomplete,
        Err(err) => err,
    }
}

fn unsupported(codec: &dyn Codec) -> EncodeError {
    EncodeError::Unsupported {
        codec: codec.name().to_owned(),
    }
}

/// A prefix operator applied to one operand.
///
/// `NoMatch` when the operator is absent; once it has matched, a missing
/// operand is a hard error. The operation itself is the configured hook.
pub struct UnaryOpCodec {
    config: CodecConfig,
    operator: String,
    operand: Arc<dyn Codec>,
}

impl UnaryOpCodec {
    #[must_use]
    pub fn new(name: impl Into<String>, operator: impl Into<String>, operand: Arc<dyn Codec>) -> Self {
        Self {
            config: CodecConfig::new(name).with_accepts(|_| false),
            operator: operator.into(),
            operand,
        }
    }

    #[must_use]
    pub fn with_hook(mut self, hook: Hook) -> Self {
        self.config = self.config.with_hook(hook);
        self
    }
}

impl Codec for UnaryOpCodec {
    fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn decode_at(
        &self,
        buf: &mut ReadBuffer<'_>,
        offset: usize,
    ) -> Result<(Value, usize), DecodeError> {
        if !buf.match_literal(&self.operator, offset)? {
            return Err(DecodeError::no_match(self.name()));
        }
        let operand_at = offset + self.operator.len();
        match self.operand.decode_one(buf, operand_at) {
            Err(err) if err.is_no_match() => Err(missing_operand(self.name(), buf, operand_at)),
            other => other,
        }
    }

    fn encode_at(
        &self,
        _value: &Value,
        _out: &mut dyn fmt::Write,
        _indent: Indent<'_>,
    ) -> Result<(), EncodeError> {
        Err(unsupported(self))
    }
}

type InverseFn = Arc<dyn Fn(Value) -> Result<Value, BoxError> + Send + Sync>;

/// A left-to-right chain of one infix operator and, optionally, its inverse.
///
/// Structurally decodes `a OP b INV c ...` into a sequence of operands, the
/// inverse transform already applied to operands following the inverse
/// operator; the configured spread hook folds the sequence. Pairing an
/// operation with its inverse in one codec is what keeps `2-3-4` strictly
/// left-to-right instead of `2-(3-4)`.
pub struct VariadicOpCodec {
    config: CodecConfig,
    operator: String,
    inverse: Option<(String, InverseFn)>,
    operand: Arc<dyn Codec>,
}

impl VariadicOpCodec {
    #[must_use]
    pub fn new(name: impl Into<String>, operator: impl Into<String>, operand: Arc<dyn Codec>) -> Self {
        Self {
            config: CodecConfig::new(name).with_accepts(|_| false),
            operator: operator.into(),
            inverse: None,
            operand,
        }
    }

    #[must_use]
    pub fn with_inverse(
        mut self,
        operator: impl Into<String>,
        transform: impl Fn(Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.inverse = Some((operator.into(), Arc::new(transform)));
        self
    }

    #[must_use]
    pub fn with_hook(mut self, hook: Hook) -> Self {
        self.config = self.config.with_hook(hook);
        self
    }

    fn next_operand(
        &self,
        buf: &mut ReadBuffer<'_>,
        offset: usize,
    ) -> Result<(Value, usize), DecodeError> {
        match self.operand.decode_one(buf, offset) {
            Err(err) if err.is_no_match() => Err(missing_operand(self.name(), buf, offset)),
            other => other,
        }
    }
}

impl Codec for VariadicOpCodec {
    fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn decode_at(
        &self,
        buf: &mut ReadBuffer<'_>,
        offset: usize,
    ) -> Result<(Value, usize), DecodeError> {
        let (first, mut offset) = self.operand.decode_one(buf, offset)?;
        let mut operands = vec![first];
        loop {
            let pos = skip_whitespace(buf, offset, false)?;
            if buf.match_literal(&self.operator, pos)? {
                let (operand, next) = self.next_operand(buf, pos + self.operator.len())?;
                operands.push(operand);
                offset = next;
                continue;
            }
            if let Some((inv_op, transform)) = &self.inverse {
                if buf.match_literal(inv_op, pos)? {
                    let start = buf.abs_offset(pos);
                    let (operand, next) = self.next_operand(buf, pos + inv_op.len())?;
                    let operand = transform(operand).map_err(|source| DecodeError::Hook {
                        start,
                        end: buf.abs_offset(next),
                        source,
                    })?;
                    operands.push(operand);
                    offset = next;
                    continue;
                }
            }
            return Ok((Value::Array(operands), pos));
        }
    }

    fn encode_at(
        &self,
        _value: &Value,
        _out: &mut dyn fmt::Write,
        _indent: Indent<'_>,
    ) -> Result<(), EncodeError> {
        Err(unsupported(self))
    }
}

type RelationFn = Arc<dyn Fn(&Value, &Value) -> Result<Value, BoxError> + Send + Sync>;

/// An optional comparison between two operand chains.
///
/// With no relation present the operand decodes through unchanged. Relation
/// tokens are tried longest first, so `>=` wins over `>`.
pub struct RelationCodec {
    config: CodecConfig,
    operand: Arc<dyn Codec>,
    relations: Vec<(String, RelationFn)>,
}

impl RelationCodec {
    #[must_use]
    pub fn new(name: impl Into<String>, operand: Arc<dyn Codec>) -> Self {
        Self {
            config: CodecConfig::new(name).with_accepts(|_| false),
            operand,
            relations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_relation(
        mut self,
        token: impl Into<String>,
        apply: impl Fn(&Value, &Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.relations.push((token.into(), Arc::new(apply)));
        self.relations
            .sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));
        self
    }
}

impl Codec for RelationCodec {
    fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn decode_at(
        &self,
        buf: &mut ReadBuffer<'_>,
        offset: usize,
    ) -> Result<(Value, usize), DecodeError> {
        let start = buf.abs_offset(offset);
        let (lhs, offset) = self.operand.decode_one(buf, offset)?;
        let pos = skip_whitespace(buf, offset, false)?;
        for (token, apply) in &self.relations {
            if buf.match_literal(token, pos)? {
                let (rhs, next) = match self.operand.decode_one(buf, pos + token.len()) {
                    Err(err) if err.is_no_match() => {
                        return Err(missing_operand(self.name(), buf, pos + token.len()));
                    }
                    other => other?,
                };
                let value = apply(&lhs, &rhs).map_err(|source| DecodeError::Hook {
                    start,
                    end: buf.abs_offset(next),
                    source,
                })?;
                return Ok((value, next));
            }
        }
        Ok((lhs, pos))
    }

    fn encode_at(
        &self,
        _value: &Value,
        _out: &mut dyn fmt::Write,
        _indent: Indent<'_>,
    ) -> Result<(), EncodeError> {
        Err(unsupported(self))
    }
}

/// Bare names and function calls, resolved through a [`Resolver`].
///
/// A name followed by an argument list becomes a call; a name alone becomes
/// a variable lookup. Resolver failures surface as decode errors spanning
/// the expression.
pub struct CallCodec {
    config: CodecConfig,
    name_codec: Arc<dyn Codec>,
    args: Arc<dyn Codec>,
    resolver: Arc<dyn Resolver>,
}

impl CallCodec {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        name_codec: Arc<dyn Codec>,
        args: Arc<dyn Codec>,
        resolver: Arc<dyn Resolver>,
    ) -> Self {
        Self {
            config: CodecConfig::new(name).with_accepts(|_| false),
            name_codec,
            args,
            resolver,
        }
    }
}

impl Codec for CallCodec {
    fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn decode_at(
        &self,
        buf: &mut ReadBuffer<'_>,
        offset: usize,
    ) -> Result<(Value, usize), DecodeError> {
        let start = buf.abs_offset(offset);
        let (name_value, offset) = self.name_codec.decode_one(buf, offset)?;
        let Value::String(name) = name_value else {
            let (line, column) = buf.position_at(offset);
            return Err(DecodeError::Syntax {
                codec: self.name().to_owned(),
                line,
                column,
                message: "Name did not decode to text".to_owned(),
            });
        };
        match self.args.decode_one(buf, offset) {
            Ok((args_value, next)) => {
                let args: &[Value] = match &args_value {
                    Value::Array(items) => items,
                    other => core::slice::from_ref(other),
                };
                let value = self
                    .resolver
                    .call(&name, args)
                    .map_err(|source| DecodeError::Hook {
                        start,
                        end: buf.abs_offset(next),
                        source,
                    })?;
                Ok((value, next))
            }
            Err(err) if err.is_no_match() => {
                let value =
                    self.resolver
                        .variable(&name)
                        .map_err(|source| DecodeError::Hook {
                            start,
                            end: buf.abs_offset(offset),
                            source,
                        })?;
                Ok((value, offset))
            }
            Err(err) => Err(err),
        }
    }

    fn encode_at(
        &self,
        _value: &Value,
        _out: &mut dyn fmt::Write,
        _indent: Indent<'_>,
    ) -> Result<(), EncodeError> {
        Err(unsupported(self))
    }
}

fn as_ratio(value: &Value) -> Option<Ratio<i64>> {
    match value {
        Value::Integer(i) => Some(Ratio::from_integer(*i)),
        Value::Rational(r) => Some(*r),
        _ => None,
    }
}

fn as_float(value: &Value) -> Result<f64, BoxError> {
    match value {
        Value::Integer(i) => Ok(*i as f64),
        Value::Float(f) => Ok(*f),
        Value::Rational(r) => Ok(*r.numer() as f64 / *r.denom() as f64),
        other => Err(format!("cannot use {} in arithmetic", other.kind()).into()),
    }
}

/// Rationals with denominator one collapse back to integers.
fn normalized(r: Ratio<i64>) -> Value {
    if r.is_integer() {
        Value::Integer(r.to_integer())
    } else {
        Value::Rational(r)
    }
}

/// Reduces `numer / denom` and narrows it back to `Ratio<i64>`.
///
/// The wide intermediates keep products of two `i64` factors exact; `None`
/// means the reduced fraction does not fit, and the caller falls back to
/// floats.
fn checked_ratio(numer: i128, denom: i128) -> Option<Ratio<i64>> {
    if denom == 0 {
        return None;
    }
    let g = numer.gcd(&denom);
    let (mut n, mut d) = (numer / g, denom / g);
    if d < 0 {
        n = -n;
        d = -d;
    }
    Some(Ratio::new_raw(i64::try_from(n).ok()?, i64::try_from(d).ok()?))
}

/// Raises an already-reduced ratio to an integer power without overflowing,
/// inverting first for negative exponents. The caller must rule out a zero
/// base with a negative exponent.
fn checked_ratio_pow(r: Ratio<i64>, e: i32) -> Option<Ratio<i64>> {
    let base = if e < 0 {
        checked_ratio(i128::from(*r.denom()), i128::from(*r.numer()))?
    } else {
        r
    };
    let mag = e.unsigned_abs();
    // A reduced fraction stays reduced under componentwise powers.
    Some(Ratio::new_raw(
        base.numer().checked_pow(mag)?,
        base.denom().checked_pow(mag)?,
    ))
}

/// Exact addition where both sides are exact and the result fits, float
/// addition otherwise.
pub fn add(a: &Value, b: &Value) -> Result<Value, BoxError> {
    if let (Some(x), Some(y)) = (as_ratio(a), as_ratio(b)) {
        let ad = i128::from(*x.numer()) * i128::from(*y.denom());
        let cb = i128::from(*y.numer()) * i128::from(*x.denom());
        let denom = i128::from(*x.denom()) * i128::from(*y.denom());
        if let Some(r) = ad.checked_add(cb).and_then(|n| checked_ratio(n, denom)) {
            return Ok(normalized(r));
        }
    }
    Ok(Value::Float(as_float(a)? + as_float(b)?))
}

pub fn mul(a: &Value, b: &Value) -> Result<Value, BoxError> {
    if let (Some(x), Some(y)) = (as_ratio(a), as_ratio(b)) {
        let numer = i128::from(*x.numer()) * i128::from(*y.numer());
        let denom = i128::from(*x.denom()) * i128::from(*y.denom());
        if let Some(r) = checked_ratio(numer, denom) {
            return Ok(normalized(r));
        }
    }
    Ok(Value::Float(as_float(a)? * as_float(b)?))
}

pub fn neg(value: Value) -> Result<Value, BoxError> {
    match value {
        Value::Integer(i) => i
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| "integer overflow in negation".into()),
        Value::Float(f) => Ok(Value::Float(-f)),
        Value::Rational(r) => Ok(Value::Rational(-r)),
        other => Err(format!("cannot negate {}", other.kind()).into()),
    }
}

pub fn recip(value: Value) -> Result<Value, BoxError> {
    match value {
        Value::Integer(0) => Err("division by zero".into()),
        Value::Integer(i) => match checked_ratio(1, i128::from(i)) {
            Some(r) => Ok(normalized(r)),
            None => Ok(Value::Float(1.0 / i as f64)),
        },
        Value::Rational(r) if *r.numer() == 0 => Err("division by zero".into()),
        Value::Rational(r) => {
            match checked_ratio(i128::from(*r.denom()), i128::from(*r.numer())) {
                Some(inverted) => Ok(normalized(inverted)),
                None => Ok(Value::Float(*r.denom() as f64 / *r.numer() as f64)),
            }
        }
        Value::Float(f) if f == 0.0 => Err("division by zero".into()),
        Value::Float(f) => Ok(Value::Float(1.0 / f)),
        other => Err(format!("cannot divide by {}", other.kind()).into()),
    }
}

/// Exponentiation, staying exact for integer and rational bases with
/// integer exponents that fit; everything else goes through `f64`.
pub fn pow(base: &Value, exp: &Value) -> Result<Value, BoxError> {
    if let Value::Integer(e) = exp {
        match base {
            Value::Integer(b) => {
                if *e >= 0 {
                    if let Ok(e) = u32::try_from(*e) {
                        if let Some(result) = b.checked_pow(e) {
                            return Ok(Value::Integer(result));
                        }
                    }
                } else {
                    if *b == 0 {
                        return Err("zero raised to a negative power".into());
                    }
                    if let Ok(e) = i32::try_from(*e) {
                        if let Some(r) = checked_ratio_pow(Ratio::from_integer(*b), e) {
                            return Ok(normalized(r));
                        }
                    }
                }
            }
            Value::Rational(r) => {
                if *e < 0 && *r.numer() == 0 {
                    return Err("zero raised to a negative power".into());
                }
                if let Ok(e) = i32::try_from(*e) {
                    if let Some(result) = checked_ratio_pow(*r, e) {
                        return Ok(normalized(result));
                    }
                }
            }
            _ => {}
        }
    }
    Ok(Value::Float(as_float(base)?.powf(as_float(exp)?)))
}

fn compare(a: &Value, b: &Value) -> Result<Ordering, BoxError> {
    match (as_ratio(a), as_ratio(b)) {
        (Some(x), Some(y)) => Ok(x.cmp(&y)),
        _ => as_float(a)?
            .partial_cmp(&as_float(b)?)
            .ok_or_else(|| "cannot order against NaN".into()),
    }
}

pub fn eq(a: &Value, b: &Value) -> Result<Value, BoxError> {
    if a.is_number() && b.is_number() {
        return Ok(Value::Boolean(compare(a, b)? == Ordering::Equal));
    }
    if a.kind() == b.kind() {
        return Ok(Value::Boolean(a == b));
    }
    Err(format!("cannot compare {} and {}", a.kind(), b.kind()).into())
}

pub fn ne(a: &Value, b: &Value) -> Result<Value, BoxError> {
    match eq(a, b)? {
        Value::Boolean(equal) => Ok(Value::Boolean(!equal)),
        other => Ok(other),
    }
}

pub fn lt(a: &Value, b: &Value) -> Result<Value, BoxError> {
    Ok(Value::Boolean(compare(a, b)? == Ordering::Less))
}

pub fn le(a: &Value, b: &Value) -> Result<Value, BoxError> {
    Ok(Value::Boolean(compare(a, b)? != Ordering::Greater))
}

pub fn gt(a: &Value, b: &Value) -> Result<Value, BoxError> {
    Ok(Value::Boolean(compare(a, b)? == Ordering::Greater))
}

pub fn ge(a: &Value, b: &Value) -> Result<Value, BoxError> {
    Ok(Value::Boolean(compare(a, b)? != Ordering::Less))
}

/// Left fold over an operand chain.
fn fold(
    operands: Vec<Value>,
    f: impl Fn(&Value, &Value) -> Result<Value, BoxError>,
) -> Result<Value, BoxError> {
    let mut iter = operands.into_iter();
    let Some(mut acc) = iter.next() else {
        return Err("operator applied to no operands".into());
    };
    for operand in iter {
        acc = f(&acc, &operand)?;
    }
    Ok(acc)
}

/// Right fold, for right-associative operators.
fn fold_right(
    operands: Vec<Value>,
    f: impl Fn(&Value, &Value) -> Result<Value, BoxError>,
) -> Result<Value, BoxError> {
    let mut iter = operands.into_iter().rev();
    let Some(mut acc) = iter.next() else {
        return Err("operator applied to no operands".into());
    };
    for operand in iter {
        acc = f(&operand, &acc)?;
    }
    Ok(acc)
}

/// The arithmetic expression grammar, evaluated as it decodes.
///
/// Precedence, loosest first: relations, sum/difference, product/quotient,
/// prefix sign, power (right-associative), then parentheses, function calls
/// and numeric literals. Parenthesized comma lists decode to their single
/// element or to a sequence value, which is also the argument convention for
/// calls.
#[must_use]
pub fn arithmetic(resolver: Arc<dyn Resolver>) -> RelationCodec {
    let expr = Alternation::deferred("expression");
    let power: Arc<dyn Codec> = Arc::new(
        VariadicOpCodec::new("power", "^", expr.clone())
            .with_hook(Hook::spread(|operands| fold_right(operands, pow))),
    );
    let positive = Arc::new(UnaryOpCodec::new("positive", "+", power.clone()));
    let negative = Arc::new(
        UnaryOpCodec::new("negative", "-", power.clone()).with_hook(Hook::single(neg)),
    );
    let factor: Arc<dyn Codec> = Arc::new(Alternation::new(
        "factor",
        vec![negative.clone(), positive.clone(), power.clone()],
    ));
    let product = Arc::new(
        VariadicOpCodec::new("product", "*", factor)
            .with_inverse("/", recip)
            .with_hook(Hook::spread(|operands| fold(operands, mul))),
    );
    let sum: Arc<dyn Codec> = Arc::new(
        VariadicOpCodec::new("sum", "+", product)
            .with_inverse("-", neg)
            .with_hook(Hook::spread(|operands| fold(operands, add))),
    );
    let parenthesis = Arc::new(
        SequenceCodec::new("parenthesis", sum.clone())
            .with_delimiters("(", ",", ")")
            .with_hook(Hook::spread(|mut items| {
                Ok(if items.len() == 1 {
                    items.swap_remove(0)
                } else {
                    Value::Array(items)
                })
            })),
    );
    let call = Arc::new(CallCodec::new(
        "call",
        Arc::new(TokenCodec::new("name", Identifier)),
        parenthesis.clone(),
        resolver,
    ));
    expr.bind(vec![
        parenthesis,
        negative,
        positive,
        call,
        Arc::new(numeral::float()),
        Arc::new(numeral::signed_integer()),
    ]);
    RelationCodec::new("relation", sum)
        .with_relation("=", eq)
        .with_relation("==", eq)
        .with_relation("!=", ne)
        .with_relation(">=", ge)
        .with_relation("<=", le)
        .with_relation(">", gt)
        .with_relation("<", lt)
}
