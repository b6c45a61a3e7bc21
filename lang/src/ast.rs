// lang/src/ast.rs
use std::collections::BTreeSet;
use std::fmt;

use danmaku_core::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Eq,
    NotEq,
    And,
    Or,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// Binding strength, higher binds tighter. All levels are left-assoc.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::NotEq => 3,
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div => 6,
        }
    }
}

const UNARY_PREC: u8 = 7;

/// Immutable expression tree. Built once when a pattern loads.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Variable(String),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
}

impl Expr {
    pub fn number(value: f64) -> Self {
        Expr::Literal(Value::Number(value))
    }

    pub fn variable(name: &str) -> Self {
        Expr::Variable(name.to_string())
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Every variable name the expression reads, context names included.
    pub fn variables(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Variable(name) => {
                out.insert(name.as_str());
            }
            Expr::Unary { expr, .. } => expr.collect_variables(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_variables(out);
                rhs.collect_variables(out);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_variables(out);
                }
            }
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                cond.collect_variables(out);
                then_expr.collect_variables(out);
                else_expr.collect_variables(out);
            }
        }
    }

    fn fmt_prec(&self, f: &mut fmt::Formatter<'_>, parent: u8) -> fmt::Result {
        match self {
            Expr::Literal(Value::Number(n)) => write!(f, "{}", n),
            Expr::Literal(Value::Text(s)) => {
                f.write_str("\"")?;
                for ch in s.chars() {
                    match ch {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        other => write!(f, "{}", other)?,
                    }
                }
                f.write_str("\"")
            }
            Expr::Variable(name) => f.write_str(name),
            Expr::Unary { op, expr } => {
                let wrap = UNARY_PREC < parent;
                if wrap {
                    f.write_str("(")?;
                }
                f.write_str(op.symbol())?;
                expr.fmt_prec(f, UNARY_PREC)?;
                if wrap {
                    f.write_str(")")?;
                }
                Ok(())
            }
            Expr::Binary { op, lhs, rhs } => {
                let prec = op.precedence();
                let wrap = prec < parent;
                if wrap {
                    f.write_str("(")?;
                }
                lhs.fmt_prec(f, prec)?;
                write!(f, " {} ", op.symbol())?;
                rhs.fmt_prec(f, prec + 1)?;
                if wrap {
                    f.write_str(")")?;
                }
                Ok(())
            }
            Expr::Call { name, args } => {
                write!(f, "{}(", name)?;
                for (idx, arg) in args.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    arg.fmt_prec(f, 0)?;
                }
                f.write_str(")")
            }
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                f.write_str("if(")?;
                cond.fmt_prec(f, 0)?;
                f.write_str(", ")?;
                then_expr.fmt_prec(f, 0)?;
                f.write_str(", ")?;
                else_expr.fmt_prec(f, 0)?;
                f.write_str(")")
            }
        }
    }
}

/// Canonical text with the fewest parentheses that keep the tree shape.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_prec(f, 0)
    }
}
