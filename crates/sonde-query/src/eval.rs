use serde_json::{Number, Value};
use tokio_util::sync::CancellationToken;

use crate::error::EvalError;
use crate::parser::{Ast, BinOp};

/// A compiled filter, ready to run against input values.
///
/// Compilation and execution are independent; a filter holds no state across
/// runs.
#[derive(Debug, Clone)]
pub struct Filter {
    ast: Ast,
}

/// How a filter's output stream ended.
#[derive(Debug, Clone, PartialEq)]
pub enum End {
    /// The stream was drained completely.
    Finished,
    /// The `halt` built-in stopped the stream; prior outputs are kept.
    Halted,
    /// A runtime fault stopped the stream.
    Failed(EvalError),
}

/// The drained output stream of one filter run.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Values emitted before the stream ended, in emission order.
    pub outputs: Vec<Value>,
    pub end: End,
}

enum Interrupt {
    Halt,
    Fail(EvalError),
}

type Emit<'e> = &'e mut dyn FnMut(Value) -> Result<(), Interrupt>;

impl Filter {
    pub(crate) fn new(ast: Ast) -> Self {
        Self { ast }
    }

    /// Run the filter against `input`, draining the whole output stream.
    ///
    /// The cancellation token is observed at every evaluation step; a
    /// cancelled token ends the stream with [`EvalError::Cancelled`].
    pub fn run(&self, input: &Value, cancel: &CancellationToken) -> Outcome {
        let env = Env { cancel };
        let mut outputs = Vec::new();
        let end = match env.eval(&self.ast, input, &mut |v| {
            outputs.push(v);
            Ok(())
        }) {
            Ok(()) => End::Finished,
            Err(Interrupt::Halt) => End::Halted,
            Err(Interrupt::Fail(e)) => End::Failed(e),
        };
        Outcome { outputs, end }
    }
}

struct Env<'a> {
    cancel: &'a CancellationToken,
}

impl Env<'_> {
    fn eval(&self, ast: &Ast, input: &Value, out: Emit) -> Result<(), Interrupt> {
        if self.cancel.is_cancelled() {
            return Err(Interrupt::Fail(EvalError::Cancelled));
        }
        match ast {
            Ast::Identity => out(input.clone()),
            Ast::Literal(v) => out(v.clone()),
            Ast::Field(base, name) => self.eval(base, input, &mut |v| match v {
                Value::Object(map) => out(map.get(name).cloned().unwrap_or(Value::Null)),
                Value::Null => out(Value::Null),
                other => Err(fail("index", &other)),
            }),
            Ast::Index(base, index) => self.eval(base, input, &mut |b| {
                self.eval(index, input, &mut |i| out(index_value(&b, &i)?))
            }),
            Ast::Iterate(base) => self.eval(base, input, &mut |v| match v {
                Value::Array(items) => items.into_iter().try_for_each(&mut *out),
                Value::Object(map) => map.into_iter().map(|(_, v)| v).try_for_each(&mut *out),
                other => Err(fail("iterate over", &other)),
            }),
            Ast::Pipe(lhs, rhs) => {
                self.eval(lhs, input, &mut |v| self.eval(rhs, &v, &mut *out))
            }
            Ast::Concat(lhs, rhs) => {
                self.eval(lhs, input, &mut *out)?;
                self.eval(rhs, input, &mut *out)
            }
            Ast::Neg(expr) => self.eval(expr, input, &mut |v| match v.as_f64() {
                Some(f) => out(number(-f)?),
                None => Err(fail("negate", &v)),
            }),
            Ast::Binary(op, lhs, rhs) => self.eval(lhs, input, &mut |a| {
                self.eval(rhs, input, &mut |b| out(binary(*op, &a, b)?))
            }),
            Ast::Call(name, args) => self.call(name, args, input, out),
        }
    }

    fn call(&self, name: &str, args: &[Ast], input: &Value, out: Emit) -> Result<(), Interrupt> {
        match (name, args.len()) {
            ("length", 0) => out(length(input)?),
            ("keys", 0) => out(keys(input)?),
            ("tostring", 0) => out(Value::String(stringify(input))),
            ("tonumber", 0) => match input {
                Value::Number(_) => out(input.clone()),
                Value::String(s) => match s.trim().parse::<f64>() {
                    Ok(f) => out(number(f)?),
                    Err(_) => Err(fail("parse as number", input)),
                },
                other => Err(fail("parse as number", other)),
            },
            ("not", 0) => out(Value::Bool(!truthy(input))),
            ("empty", 0) => Ok(()),
            ("halt", 0) => Err(Interrupt::Halt),
            ("error", 0) => Err(Interrupt::Fail(EvalError::Raised(stringify(input)))),
            ("error", 1) => {
                let mut message = None;
                self.eval(&args[0], input, &mut |v| {
                    message = Some(stringify(&v));
                    Ok(())
                })?;
                Err(Interrupt::Fail(EvalError::Raised(
                    message.unwrap_or_else(|| "error".to_string()),
                )))
            }
            ("select", 1) => self.eval(&args[0], input, &mut |t| {
                if truthy(&t) { out(input.clone()) } else { Ok(()) }
            }),
            (_, arity) => Err(Interrupt::Fail(EvalError::Undefined {
                name: name.to_string(),
                arity,
            })),
        }
    }
}

fn fail(op: &'static str, value: &Value) -> Interrupt {
    Interrupt::Fail(EvalError::TypeMismatch {
        op,
        got: type_name(value),
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

/// Render a value the way `tostring` does: strings verbatim, everything else
/// as compact JSON.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Build a number value, keeping integral results as integers.
fn number(f: f64) -> Result<Value, Interrupt> {
    const SAFE: f64 = 9_007_199_254_740_992.0; // 2^53
    if f.is_finite() && f.fract() == 0.0 && f.abs() <= SAFE {
        return Ok(Value::Number(Number::from(f as i64)));
    }
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or(Interrupt::Fail(EvalError::Raised(
            "result is not a finite number".to_string(),
        )))
}

fn index_value(base: &Value, index: &Value) -> Result<Value, Interrupt> {
    match (base, index) {
        (Value::Array(items), Value::Number(n)) => {
            let raw = n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .ok_or_else(|| fail("index array with", index))?;
            let idx = if raw < 0 { items.len() as i64 + raw } else { raw };
            if idx < 0 || idx as usize >= items.len() {
                return Ok(Value::Null);
            }
            Ok(items[idx as usize].clone())
        }
        (Value::Object(map), Value::String(key)) => {
            Ok(map.get(key).cloned().unwrap_or(Value::Null))
        }
        (Value::Null, Value::Number(_) | Value::String(_)) => Ok(Value::Null),
        (other, _) => Err(fail("index", other)),
    }
}

fn length(value: &Value) -> Result<Value, Interrupt> {
    match value {
        Value::Null => Ok(Value::Number(Number::from(0))),
        Value::Number(n) => number(n.as_f64().unwrap_or(0.0).abs()),
        Value::String(s) => Ok(Value::Number(Number::from(s.chars().count() as u64))),
        Value::Array(items) => Ok(Value::Number(Number::from(items.len() as u64))),
        Value::Object(map) => Ok(Value::Number(Number::from(map.len() as u64))),
        Value::Bool(_) => Err(fail("take length of", value)),
    }
}

fn keys(value: &Value) -> Result<Value, Interrupt> {
    match value {
        Value::Object(map) => {
            let mut names: Vec<&String> = map.keys().collect();
            names.sort();
            Ok(Value::Array(
                names
                    .into_iter()
                    .map(|k| Value::String(k.clone()))
                    .collect(),
            ))
        }
        Value::Array(items) => Ok(Value::Array(
            (0..items.len() as u64)
                .map(|i| Value::Number(Number::from(i)))
                .collect(),
        )),
        other => Err(fail("take keys of", other)),
    }
}

fn binary(op: BinOp, lhs: &Value, rhs: Value) -> Result<Value, Interrupt> {
    match op {
        BinOp::Eq => return Ok(Value::Bool(*lhs == rhs)),
        BinOp::Ne => return Ok(Value::Bool(*lhs != rhs)),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => return order(op, lhs, &rhs),
        _ => {}
    }

    match (lhs, &rhs) {
        (Value::Number(a), Value::Number(b)) => {
            let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
            match op {
                BinOp::Add => number(a + b),
                BinOp::Sub => number(a - b),
                BinOp::Mul => number(a * b),
                BinOp::Div if b == 0.0 => Err(Interrupt::Fail(EvalError::DivideByZero)),
                BinOp::Div => number(a / b),
                BinOp::Rem if b == 0.0 => Err(Interrupt::Fail(EvalError::DivideByZero)),
                BinOp::Rem => number(a % b),
                _ => unreachable!("comparisons handled above"),
            }
        }
        (Value::String(a), Value::String(b)) if op == BinOp::Add => {
            Ok(Value::String(format!("{a}{b}")))
        }
        (Value::Array(a), Value::Array(b)) if op == BinOp::Add => {
            let mut joined = a.clone();
            joined.extend(b.iter().cloned());
            Ok(Value::Array(joined))
        }
        (Value::Null, _) if op == BinOp::Add => Ok(rhs),
        (_, Value::Null) if op == BinOp::Add => Ok(lhs.clone()),
        (a, b) => {
            let offender = if matches!(a, Value::Number(_)) { b } else { a };
            Err(Interrupt::Fail(EvalError::TypeMismatch {
                op: op.name(),
                got: type_name(offender),
            }))
        }
    }
}

fn order(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, Interrupt> {
    let ordering = match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .unwrap_or(0.0)
            .partial_cmp(&b.as_f64().unwrap_or(0.0)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (a, b) => {
            let offender = if matches!(a, Value::Number(_) | Value::String(_)) {
                b
            } else {
                a
            };
            return Err(Interrupt::Fail(EvalError::TypeMismatch {
                op: op.name(),
                got: type_name(offender),
            }));
        }
    };
    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false));
    };
    let result = match op {
        BinOp::Lt => ordering.is_lt(),
        BinOp::Le => ordering.is_le(),
        BinOp::Gt => ordering.is_gt(),
        BinOp::Ge => ordering.is_ge(),
        _ => unreachable!("only comparisons reach order()"),
    };
    Ok(Value::Bool(result))
}
