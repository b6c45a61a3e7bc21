// danmaku-lang/src/lib.rs
// Bullet update expressions
//
// - Lexer / Parser: formula text into an immutable tree
// - Eval: tree against a typed frame and a tick snapshot
// - Program: ordered assignments plus a deletion predicate
// - Pattern: JSON spawn templates

pub mod ast;
pub mod builtins;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod pattern;
pub mod program;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use builtins::{find_function, function_sigs, is_reserved_name, Builtin, FunctionSig, CONTEXT_NAMES};
pub use eval::{evaluate, EvalContext, EvalError, EvalErrorKind};
pub use lexer::{LexError, Lexer, Token, TokenKind};
pub use parser::{Parser, SyntaxError, MAX_NESTING};
pub use pattern::{is_identifier, LiteralDef, Pattern, PatternBatch, PatternDef, PatternError, PatternErrorKind};
pub use program::{Assignment, UpdateProgram, ValidationError};

/// Convenience: source text to expression tree.
pub fn parse(source: &str) -> Result<Expr, SyntaxError> {
    let tokens = Lexer::new(source)
        .tokenize()
        .map_err(|e| SyntaxError::new(e.pos, &e.message))?;
    let mut parser = Parser::new(tokens);
    parser.parse_complete()
}

#[cfg(test)]
mod tests;
