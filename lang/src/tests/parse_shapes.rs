use std::f64::consts::PI;

use danmaku_core::Value;

use crate::{parse, BinaryOp, Expr, UnaryOp, MAX_NESTING};

#[test]
fn same_text_same_tree() {
    let text = "if(jump_now, speed * cos(angle * (pi / 180)), vx + gx * dt)";
    assert_eq!(parse(text).unwrap(), parse(text).unwrap());
}

#[test]
fn precedence_builds_the_expected_shape() {
    let tree = parse("a + b * c < d || !e").unwrap();
    let expected = Expr::binary(
        BinaryOp::Or,
        Expr::binary(
            BinaryOp::Lt,
            Expr::binary(
                BinaryOp::Add,
                Expr::variable("a"),
                Expr::binary(BinaryOp::Mul, Expr::variable("b"), Expr::variable("c")),
            ),
            Expr::variable("d"),
        ),
        Expr::Unary {
            op: UnaryOp::Not,
            expr: Box::new(Expr::variable("e")),
        },
    );
    assert_eq!(tree, expected);
}

#[test]
fn subtraction_is_left_associative() {
    let tree = parse("1 - 2 - 3").unwrap();
    let expected = Expr::binary(
        BinaryOp::Sub,
        Expr::binary(BinaryOp::Sub, Expr::number(1.0), Expr::number(2.0)),
        Expr::number(3.0),
    );
    assert_eq!(tree, expected);
}

#[test]
fn pi_and_if_fold_at_parse_time() {
    assert_eq!(parse("pi").unwrap(), Expr::Literal(Value::Number(PI)));
    assert!(matches!(parse("if(a, 1, 2)").unwrap(), Expr::Conditional { .. }));
}

#[test]
fn display_reparses_to_the_same_tree() {
    for text in [
        "x + vx * dt",
        "(a + b) * c",
        "a - (b - c)",
        "-(a + 1) / 2",
        "if(jumping, timer, timer - dt)",
        "!(a && b) || c != 2",
        "texture == \"a\\\"b\"",
        "atan2(player_y - y, player_x - x)",
        "1e-7 + .5",
    ] {
        let tree = parse(text).unwrap();
        let rendered = tree.to_string();
        assert_eq!(parse(&rendered).unwrap(), tree, "{text} -> {rendered}");
    }
}

#[test]
fn display_drops_redundant_parens() {
    assert_eq!(parse("((a)) + (b * c)").unwrap().to_string(), "a + b * c");
    assert_eq!(parse("(a + b) * c").unwrap().to_string(), "(a + b) * c");
}

#[test]
fn syntax_errors_carry_positions() {
    let cases: &[(&str, usize, &str)] = &[
        ("", 0, "empty"),
        ("(1 + 2", 6, "expected ')'"),
        ("1 + 2)", 5, "unmatched ')'"),
        ("1 2", 2, "trailing"),
        ("1 +", 3, "end of expression"),
        ("sin(1, 2)", 0, "arity mismatch"),
        ("if(1, 2)", 0, "arity mismatch"),
        ("warp(1)", 0, "unknown function"),
        ("a = 1", 2, "'='"),
        ("\"open", 0, "unterminated"),
    ];
    for (text, position, needle) in cases {
        let err = parse(text).unwrap_err();
        assert_eq!(err.position, *position, "{text}: {err}");
        assert!(err.message.contains(needle), "{text}: {err}");
        assert_eq!(err.code(), "E_EXPR_SYNTAX");
    }
}

#[test]
fn variables_lists_reads_once() {
    let tree = parse("x + vx * dt + if(x > 0, vx, gx)").unwrap();
    let names: Vec<&str> = tree.variables().into_iter().collect();
    assert_eq!(names, vec!["dt", "gx", "vx", "x"]);
}

#[test]
fn trailing_dot_numbers_lex() {
    assert_eq!(parse("1.").unwrap(), Expr::number(1.0));
    assert_eq!(parse("2. * x").unwrap(), parse("2 * x").unwrap());
    assert_eq!(parse("1.e2").unwrap(), Expr::number(100.0));
    assert!(parse("1..2").is_err());
}

#[test]
fn deep_nesting_is_a_syntax_error() {
    let deep = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
    let err = parse(&deep).unwrap_err();
    assert_eq!(err.message, "expression nested too deeply");

    let negs = format!("{}1", "-".repeat(100_000));
    assert_eq!(parse(&negs).unwrap_err().message, "expression nested too deeply");

    let calls = format!("{}x{}", "abs(".repeat(10_000), ")".repeat(10_000));
    assert_eq!(parse(&calls).unwrap_err().message, "expression nested too deeply");

    let chain = vec!["1"; 100_000].join(" + ");
    assert_eq!(parse(&chain).unwrap_err().message, "expression nested too deeply");
}

#[test]
fn nesting_below_the_limit_parses() {
    let depth = MAX_NESTING / 2;
    let text = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
    assert_eq!(parse(&text).unwrap(), Expr::number(1.0));
    let chain = vec!["1"; depth].join(" + ");
    assert!(parse(&chain).is_ok());
}
