use std::fmt;

use danmaku_core::{DetRng, FrameError, TickContext, Value, ValueType, VariableFrame};

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::builtins::{find_function, IF_NAME};

/// What one evaluation may touch besides the frame: the shared tick snapshot
/// and the instance's own random stream.
pub struct EvalContext<'a> {
    pub tick: &'a TickContext,
    pub rng: DetRng,
}

impl<'a> EvalContext<'a> {
    pub fn new(tick: &'a TickContext, rng: DetRng) -> Self {
        Self { tick, rng }
    }

    fn context_value(&self, name: &str) -> Option<f64> {
        let value = match name {
            "dt" => self.tick.dt,
            "tick" => self.tick.tick as f64,
            "player_x" => self.tick.player.x,
            "player_y" => self.tick.player.y,
            "player_valid" => {
                if self.tick.player.valid {
                    1.0
                } else {
                    0.0
                }
            }
            _ => return None,
        };
        Some(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalErrorKind {
    UnknownVariable { name: String },
    TypeMismatch { context: String, expected: ValueType, found: ValueType },
    UnknownFunction { name: String },
    ArityMismatch { name: String, expected: usize, found: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalError {
    pub kind: EvalErrorKind,
}

impl EvalError {
    pub fn unknown_variable(name: &str) -> Self {
        Self {
            kind: EvalErrorKind::UnknownVariable {
                name: name.to_string(),
            },
        }
    }

    pub fn type_mismatch(context: &str, expected: ValueType, found: ValueType) -> Self {
        Self {
            kind: EvalErrorKind::TypeMismatch {
                context: context.to_string(),
                expected,
                found,
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self.kind {
            EvalErrorKind::UnknownVariable { .. } => "E_EVAL_UNKNOWN_VARIABLE",
            EvalErrorKind::TypeMismatch { .. } => "E_EVAL_TYPE_MISMATCH",
            EvalErrorKind::UnknownFunction { .. } => "E_EVAL_UNKNOWN_FUNCTION",
            EvalErrorKind::ArityMismatch { .. } => "E_EVAL_ARITY_MISMATCH",
        }
    }
}

impl From<FrameError> for EvalError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Undeclared { name } => EvalError::unknown_variable(&name),
            FrameError::TypeChanged {
                name,
                declared,
                found,
            } => EvalError::type_mismatch(&format!("assignment to `{}`", name), declared, found),
        }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            EvalErrorKind::UnknownVariable { name } => {
                write!(f, "{} unknown variable `{}`", self.code(), name)
            }
            EvalErrorKind::TypeMismatch {
                context,
                expected,
                found,
            } => write!(
                f,
                "{} {} expects {}, found {}",
                self.code(),
                context,
                expected,
                found
            ),
            EvalErrorKind::UnknownFunction { name } => {
                write!(f, "{} unknown function `{}`", self.code(), name)
            }
            EvalErrorKind::ArityMismatch {
                name,
                expected,
                found,
            } => write!(
                f,
                "{} `{}` takes {} argument(s), got {}",
                self.code(),
                name,
                expected,
                found
            ),
        }
    }
}

impl std::error::Error for EvalError {}

/// Evaluates `expr` against `frame`. Never writes to the frame; division by
/// zero follows IEEE and yields inf or NaN.
pub fn evaluate(expr: &Expr, frame: &VariableFrame, ctx: &mut EvalContext<'_>) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Variable(name) => {
            if let Some(value) = ctx.context_value(name) {
                return Ok(Value::Number(value));
            }
            frame
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::unknown_variable(name))
        }
        Expr::Unary { op, expr } => {
            let value = eval_number(expr, frame, ctx, op.symbol())?;
            let out = match op {
                UnaryOp::Neg => -value,
                UnaryOp::Not => bool_num(value == 0.0),
            };
            Ok(Value::Number(out))
        }
        Expr::Binary { op, lhs, rhs } => eval_binary(*op, lhs, rhs, frame, ctx).map(Value::Number),
        Expr::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            if eval_number(cond, frame, ctx, "if condition")? != 0.0 {
                evaluate(then_expr, frame, ctx)
            } else {
                evaluate(else_expr, frame, ctx)
            }
        }
        Expr::Call { name, args } => eval_call(name, args, frame, ctx),
    }
}

fn eval_binary(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    frame: &VariableFrame,
    ctx: &mut EvalContext<'_>,
) -> Result<f64, EvalError> {
    let what = op.symbol();
    let l = eval_number(lhs, frame, ctx, what)?;
    match op {
        BinaryOp::And => {
            if l == 0.0 {
                return Ok(0.0);
            }
            let r = eval_number(rhs, frame, ctx, what)?;
            return Ok(bool_num(r != 0.0));
        }
        BinaryOp::Or => {
            if l != 0.0 {
                return Ok(1.0);
            }
            let r = eval_number(rhs, frame, ctx, what)?;
            return Ok(bool_num(r != 0.0));
        }
        _ => {}
    }
    let r = eval_number(rhs, frame, ctx, what)?;
    let out = match op {
        BinaryOp::Add => l + r,
        BinaryOp::Sub => l - r,
        BinaryOp::Mul => l * r,
        BinaryOp::Div => l / r,
        BinaryOp::Lt => bool_num(l < r),
        BinaryOp::LtEq => bool_num(l <= r),
        BinaryOp::Gt => bool_num(l > r),
        BinaryOp::GtEq => bool_num(l >= r),
        BinaryOp::Eq => bool_num(l == r),
        BinaryOp::NotEq => bool_num(l != r),
        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit ops handled above"),
    };
    Ok(out)
}

fn eval_call(
    name: &str,
    args: &[Expr],
    frame: &VariableFrame,
    ctx: &mut EvalContext<'_>,
) -> Result<Value, EvalError> {
    if name == IF_NAME {
        if args.len() != 3 {
            return Err(EvalError {
                kind: EvalErrorKind::ArityMismatch {
                    name: name.to_string(),
                    expected: 3,
                    found: args.len(),
                },
            });
        }
        return if eval_number(&args[0], frame, ctx, "if condition")? != 0.0 {
            evaluate(&args[1], frame, ctx)
        } else {
            evaluate(&args[2], frame, ctx)
        };
    }
    let sig = find_function(name).ok_or_else(|| EvalError {
        kind: EvalErrorKind::UnknownFunction {
            name: name.to_string(),
        },
    })?;
    if sig.arity() != args.len() {
        return Err(EvalError {
            kind: EvalErrorKind::ArityMismatch {
                name: name.to_string(),
                expected: sig.arity(),
                found: args.len(),
            },
        });
    }
    let mut values = [0.0f64; 2];
    for (slot, arg) in values.iter_mut().zip(args) {
        *slot = eval_number(arg, frame, ctx, sig.name)?;
    }
    Ok(Value::Number(sig.builtin.apply(&values[..args.len()], &mut ctx.rng)))
}

fn eval_number(
    expr: &Expr,
    frame: &VariableFrame,
    ctx: &mut EvalContext<'_>,
    what: &str,
) -> Result<f64, EvalError> {
    match evaluate(expr, frame, ctx)? {
        Value::Number(n) => Ok(n),
        Value::Text(_) => Err(EvalError::type_mismatch(
            &format!("operator `{}`", what),
            ValueType::Number,
            ValueType::Text,
        )),
    }
}

fn bool_num(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use danmaku_core::PlayerPosition;

    fn eval_with(text: &str, frame: &VariableFrame, tick: &TickContext) -> Result<Value, EvalError> {
        let expr = parse(text).unwrap();
        let mut ctx = EvalContext::new(tick, DetRng::new(1));
        evaluate(&expr, frame, &mut ctx)
    }

    fn eval(text: &str) -> Result<Value, EvalError> {
        eval_with(text, &VariableFrame::new().with("a", 2.0).with("s", "tex.png"), &TickContext::new(1, 0.5))
    }

    #[test]
    fn arithmetic_precedence_and_assoc() {
        assert_eq!(eval("1 + 2 * 3"), Ok(Value::Number(7.0)));
        assert_eq!(eval("10 - 4 - 3"), Ok(Value::Number(3.0)));
        assert_eq!(eval("8 / 4 / 2"), Ok(Value::Number(1.0)));
        assert_eq!(eval("-(a + 1) * 2"), Ok(Value::Number(-6.0)));
    }

    #[test]
    fn division_by_zero_is_ieee() {
        assert_eq!(eval("1/0"), Ok(Value::Number(f64::INFINITY)));
        assert_eq!(eval("-1/0"), Ok(Value::Number(f64::NEG_INFINITY)));
        let nan = eval("0/0").unwrap().as_number().unwrap();
        assert!(nan.is_nan());
    }

    #[test]
    fn comparisons_and_logic_yield_one_or_zero() {
        assert_eq!(eval("a < 3"), Ok(Value::Number(1.0)));
        assert_eq!(eval("a >= 3"), Ok(Value::Number(0.0)));
        assert_eq!(eval("a == 2 && !(a != 2)"), Ok(Value::Number(1.0)));
        assert_eq!(eval("0 || 5"), Ok(Value::Number(1.0)));
    }

    #[test]
    fn logic_short_circuits_past_errors() {
        assert_eq!(eval("0 && missing"), Ok(Value::Number(0.0)));
        assert_eq!(eval("1 || missing"), Ok(Value::Number(1.0)));
        assert!(eval("1 && missing").is_err());
    }

    #[test]
    fn conditional_is_lazy_and_may_yield_text() {
        assert_eq!(eval("if(a > 1, s, \"other.png\")"), Ok(Value::text("tex.png")));
        assert_eq!(eval("if(0, missing, 4)"), Ok(Value::Number(4.0)));
    }

    #[test]
    fn text_in_arithmetic_is_type_mismatch() {
        let err = eval("s + 1").unwrap_err();
        assert_eq!(err.code(), "E_EVAL_TYPE_MISMATCH");
        let err = eval("if(s, 1, 2)").unwrap_err();
        assert_eq!(err.code(), "E_EVAL_TYPE_MISMATCH");
    }

    #[test]
    fn unknown_variable_is_reported() {
        let err = eval("nope * 2").unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::UnknownVariable { name: "nope".to_string() });
    }

    #[test]
    fn handmade_calls_are_checked_at_evaluation() {
        let frame = VariableFrame::new();
        let tick = TickContext::new(1, 0.5);
        let mut ctx = EvalContext::new(&tick, DetRng::new(1));

        let unknown = Expr::Call { name: "warp".to_string(), args: vec![] };
        assert_eq!(evaluate(&unknown, &frame, &mut ctx).unwrap_err().code(), "E_EVAL_UNKNOWN_FUNCTION");

        let short = Expr::Call { name: "sin".to_string(), args: vec![] };
        assert_eq!(evaluate(&short, &frame, &mut ctx).unwrap_err().code(), "E_EVAL_ARITY_MISMATCH");

        let cond = Expr::Call {
            name: "if".to_string(),
            args: vec![Expr::number(0.0), Expr::number(1.0), Expr::number(2.0)],
        };
        assert_eq!(evaluate(&cond, &frame, &mut ctx), Ok(Value::Number(2.0)));
    }

    #[test]
    fn context_names_read_the_tick() {
        let tick = TickContext::new(9, 0.25).with_player(PlayerPosition::at(3.0, -4.0));
        let frame = VariableFrame::new();
        assert_eq!(eval_with("dt * 4", &frame, &tick), Ok(Value::Number(1.0)));
        assert_eq!(eval_with("player_x + player_y", &frame, &tick), Ok(Value::Number(-1.0)));
        assert_eq!(eval_with("tick", &frame, &tick), Ok(Value::Number(9.0)));
        assert_eq!(eval_with("player_valid", &frame, &tick), Ok(Value::Number(1.0)));
    }

    #[test]
    fn trig_takes_radians_and_pi_is_a_constant() {
        let v = eval("cos(180 * (pi / 180))").unwrap().as_number().unwrap();
        assert_eq!(v, (180.0 * (std::f64::consts::PI / 180.0)).cos());
    }

    #[test]
    fn uniform_draws_from_the_instance_stream() {
        let frame = VariableFrame::new();
        let tick = TickContext::new(1, 0.5);
        let expr = parse("uniform(0, 20)").unwrap();

        let mut ctx = EvalContext::new(&tick, DetRng::new(77));
        let first = evaluate(&expr, &frame, &mut ctx).unwrap().as_number().unwrap();
        let second = evaluate(&expr, &frame, &mut ctx).unwrap().as_number().unwrap();
        assert_ne!(first, second);

        let mut expected = DetRng::new(77);
        assert_eq!(first, expected.uniform(0.0, 20.0));
        assert_eq!(second, expected.uniform(0.0, 20.0));
    }
}
