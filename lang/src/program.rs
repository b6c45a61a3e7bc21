use std::fmt;

use danmaku_core::{Value, ValueType, VariableFrame};

use crate::ast::Expr;
use crate::builtins::{is_reserved_name, CONTEXT_NAMES};
use crate::eval::{evaluate, EvalContext, EvalError};
use crate::parser::SyntaxError;

/// One `target = expr` step of a program.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: String,
    pub expr: Expr,
    /// Text the expression was parsed from, kept for diagnostics.
    pub source: String,
}

impl Assignment {
    pub fn new(target: &str, expr: Expr) -> Self {
        let source = expr.to_string();
        Self {
            target: target.to_string(),
            expr,
            source,
        }
    }

    pub fn parse(target: &str, source: &str) -> Result<Self, SyntaxError> {
        Ok(Self {
            target: target.to_string(),
            expr: crate::parse(source)?,
            source: source.to_string(),
        })
    }
}

/// Ordered assignments plus a deletion predicate, shared by every instance of
/// a pattern. `on_spawn` runs once when an instance is realized.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateProgram {
    pub on_spawn: Vec<Assignment>,
    pub assignments: Vec<Assignment>,
    pub delete: Expr,
}

impl UpdateProgram {
    pub fn new(assignments: Vec<Assignment>, delete: Expr) -> Self {
        Self {
            on_spawn: Vec::new(),
            assignments,
            delete,
        }
    }

    pub fn with_on_spawn(mut self, on_spawn: Vec<Assignment>) -> Self {
        self.on_spawn = on_spawn;
        self
    }

    /// Checks every read and write against `frame`'s schema. Run once per
    /// spawn request so the tick loop never meets an undeclared name.
    pub fn validate(&self, frame: &VariableFrame) -> Result<(), ValidationError> {
        for name in frame.names() {
            if is_reserved_name(name) {
                return Err(ValidationError::ReservedName {
                    name: name.to_string(),
                });
            }
        }
        for (phase, list) in [("on_spawn", &self.on_spawn), ("update", &self.assignments)] {
            for assignment in list.iter() {
                validate_assignment(phase, assignment, frame)?;
            }
        }
        check_reads("delete", &self.delete, frame)?;
        check_operands("delete", &self.delete, frame)?;
        if infer_type(&self.delete, frame) == Some(ValueType::Text) {
            return Err(ValidationError::TypeClash {
                name: "delete".to_string(),
                declared: ValueType::Number,
                found: ValueType::Text,
            });
        }
        Ok(())
    }

    pub fn run_on_spawn(&self, frame: &mut VariableFrame, ctx: &mut EvalContext<'_>) -> Result<(), EvalError> {
        run_assignments(&self.on_spawn, frame, ctx)
    }

    /// One tick: assignments in order, then the predicate against the
    /// updated frame. Returns true when the instance should be deleted.
    pub fn step(&self, frame: &mut VariableFrame, ctx: &mut EvalContext<'_>) -> Result<bool, EvalError> {
        run_assignments(&self.assignments, frame, ctx)?;
        match evaluate(&self.delete, frame, ctx)? {
            Value::Number(n) => Ok(n != 0.0),
            Value::Text(_) => Err(EvalError::type_mismatch(
                "deletion predicate",
                ValueType::Number,
                ValueType::Text,
            )),
        }
    }

    /// blake3 over the canonical rendering of every expression.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for (tag, list) in [("on_spawn", &self.on_spawn), ("update", &self.assignments)] {
            hasher.update(tag.as_bytes());
            for assignment in list.iter() {
                hasher.update(assignment.target.as_bytes());
                hasher.update(b"=");
                hasher.update(assignment.expr.to_string().as_bytes());
                hasher.update(b";");
            }
        }
        hasher.update(b"delete");
        hasher.update(self.delete.to_string().as_bytes());
        hasher.finalize().to_hex().to_string()
    }
}

fn run_assignments(list: &[Assignment], frame: &mut VariableFrame, ctx: &mut EvalContext<'_>) -> Result<(), EvalError> {
    for assignment in list {
        let value = evaluate(&assignment.expr, frame, ctx)?;
        frame.assign(&assignment.target, value)?;
    }
    Ok(())
}

fn validate_assignment(phase: &str, assignment: &Assignment, frame: &VariableFrame) -> Result<(), ValidationError> {
    let target = assignment.target.as_str();
    if is_reserved_name(target) {
        return Err(ValidationError::ReservedName {
            name: target.to_string(),
        });
    }
    let declared = frame
        .type_of(target)
        .ok_or_else(|| ValidationError::UndeclaredWrite {
            name: target.to_string(),
        })?;
    let context = format!("{}.{}", phase, target);
    check_reads(&context, &assignment.expr, frame)?;
    check_operands(&context, &assignment.expr, frame)?;
    if let Some(found) = infer_type(&assignment.expr, frame) {
        if found != declared {
            return Err(ValidationError::TypeClash {
                name: target.to_string(),
                declared,
                found,
            });
        }
    }
    Ok(())
}

fn check_reads(context: &str, expr: &Expr, frame: &VariableFrame) -> Result<(), ValidationError> {
    for name in expr.variables() {
        if !frame.contains(name) && !CONTEXT_NAMES.contains(&name) {
            return Err(ValidationError::UndeclaredRead {
                context: context.to_string(),
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

/// Static result type, `None` when the branches of a conditional disagree.
fn infer_type(expr: &Expr, frame: &VariableFrame) -> Option<ValueType> {
    match expr {
        Expr::Literal(value) => Some(value.value_type()),
        Expr::Variable(name) => frame.type_of(name).or(Some(ValueType::Number)),
        Expr::Unary { .. } | Expr::Binary { .. } | Expr::Call { .. } => Some(ValueType::Number),
        Expr::Conditional {
            then_expr,
            else_expr,
            ..
        } => {
            let then_ty = infer_type(then_expr, frame)?;
            let else_ty = infer_type(else_expr, frame)?;
            (then_ty == else_ty).then_some(then_ty)
        }
    }
}

/// Operands of operators, calls and conditions must be numeric.
fn check_operands(context: &str, expr: &Expr, frame: &VariableFrame) -> Result<(), ValidationError> {
    let numeric = |operand: &Expr, operator: &str| -> Result<(), ValidationError> {
        check_operands(context, operand, frame)?;
        if infer_type(operand, frame) == Some(ValueType::Text) {
            return Err(ValidationError::TextOperand {
                context: context.to_string(),
                operator: operator.to_string(),
            });
        }
        Ok(())
    };
    match expr {
        Expr::Literal(_) | Expr::Variable(_) => Ok(()),
        Expr::Unary { op, expr } => numeric(expr, op.symbol()),
        Expr::Binary { op, lhs, rhs } => {
            numeric(lhs, op.symbol())?;
            numeric(rhs, op.symbol())
        }
        Expr::Call { name, args } => {
            for arg in args {
                numeric(arg, name)?;
            }
            Ok(())
        }
        Expr::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            numeric(cond, "if")?;
            check_operands(context, then_expr, frame)?;
            check_operands(context, else_expr, frame)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    UndeclaredRead { context: String, name: String },
    UndeclaredWrite { name: String },
    ReservedName { name: String },
    TypeClash { name: String, declared: ValueType, found: ValueType },
    TextOperand { context: String, operator: String },
    /// A scripted bullet's frame lacks a field the driver relies on.
    MissingField { name: String, expected: ValueType },
    InvalidName { name: String },
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::UndeclaredRead { .. } => "E_VALIDATION_UNDECLARED_READ",
            ValidationError::UndeclaredWrite { .. } => "E_VALIDATION_UNDECLARED_WRITE",
            ValidationError::ReservedName { .. } => "E_VALIDATION_RESERVED_NAME",
            ValidationError::TypeClash { .. } => "E_VALIDATION_TYPE_CLASH",
            ValidationError::TextOperand { .. } => "E_VALIDATION_TEXT_OPERAND",
            ValidationError::MissingField { .. } => "E_VALIDATION_MISSING_FIELD",
            ValidationError::InvalidName { .. } => "E_VALIDATION_INVALID_NAME",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValidationError::UndeclaredRead { context, name } => {
                write!(f, "{} {} reads undeclared `{}`", self.code(), context, name)
            }
            ValidationError::UndeclaredWrite { name } => {
                write!(f, "{} assignment to undeclared `{}`", self.code(), name)
            }
            ValidationError::ReservedName { name } => {
                write!(f, "{} `{}` is reserved", self.code(), name)
            }
            ValidationError::TypeClash {
                name,
                declared,
                found,
            } => write!(
                f,
                "{} `{}` is {}, cannot hold {}",
                self.code(),
                name,
                declared,
                found
            ),
            ValidationError::TextOperand { context, operator } => write!(
                f,
                "{} {} applies `{}` to text",
                self.code(),
                context,
                operator
            ),
            ValidationError::MissingField { name, expected } => write!(
                f,
                "{} frame needs {} field `{}`",
                self.code(),
                expected,
                name
            ),
            ValidationError::InvalidName { name } => {
                write!(f, "{} `{}` is not an identifier", self.code(), name)
            }
        }
    }
}

impl std::error::Error for ValidationError {}
