use danmaku_core::DetRng;

/// Names the evaluator answers from the tick context. They can never be
/// declared in a frame.
pub const CONTEXT_NAMES: &[&str] = &["dt", "tick", "player_x", "player_y", "player_valid"];

/// Folded into a literal by the parser.
pub const PI_NAME: &str = "pi";

/// Parsed into a lazy conditional node, never dispatched as a call.
pub const IF_NAME: &str = "if";

pub fn is_reserved_name(name: &str) -> bool {
    name == PI_NAME || name == IF_NAME || CONTEXT_NAMES.contains(&name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Sin,
    Cos,
    Tan,
    Atan2,
    Sqrt,
    Abs,
    Floor,
    Min,
    Max,
    Uniform,
}

#[derive(Debug, Clone)]
pub struct FunctionSig {
    pub name: &'static str,
    pub params: &'static [&'static str],
    pub builtin: Builtin,
}

const SIGS: &[FunctionSig] = &[
    FunctionSig { name: "sin", params: &["rad"], builtin: Builtin::Sin },
    FunctionSig { name: "cos", params: &["rad"], builtin: Builtin::Cos },
    FunctionSig { name: "tan", params: &["rad"], builtin: Builtin::Tan },
    FunctionSig { name: "atan2", params: &["y", "x"], builtin: Builtin::Atan2 },
    FunctionSig { name: "sqrt", params: &["x"], builtin: Builtin::Sqrt },
    FunctionSig { name: "abs", params: &["x"], builtin: Builtin::Abs },
    FunctionSig { name: "floor", params: &["x"], builtin: Builtin::Floor },
    FunctionSig { name: "min", params: &["a", "b"], builtin: Builtin::Min },
    FunctionSig { name: "max", params: &["a", "b"], builtin: Builtin::Max },
    FunctionSig { name: "uniform", params: &["min", "max"], builtin: Builtin::Uniform },
];

pub fn function_sigs() -> &'static [FunctionSig] {
    SIGS
}

pub fn find_function(name: &str) -> Option<&'static FunctionSig> {
    SIGS.iter().find(|sig| sig.name == name)
}

impl FunctionSig {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl Builtin {
    /// `args.len()` has already been checked against the signature.
    pub fn apply(self, args: &[f64], rng: &mut DetRng) -> f64 {
        match self {
            Builtin::Sin => args[0].sin(),
            Builtin::Cos => args[0].cos(),
            Builtin::Tan => args[0].tan(),
            Builtin::Atan2 => args[0].atan2(args[1]),
            Builtin::Sqrt => args[0].sqrt(),
            Builtin::Abs => args[0].abs(),
            Builtin::Floor => args[0].floor(),
            Builtin::Min => args[0].min(args[1]),
            Builtin::Max => args[0].max(args[1]),
            Builtin::Uniform => rng.uniform(args[0], args[1]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_trig_and_random() {
        assert_eq!(find_function("sin").map(FunctionSig::arity), Some(1));
        assert_eq!(find_function("atan2").map(FunctionSig::arity), Some(2));
        assert_eq!(find_function("uniform").map(FunctionSig::arity), Some(2));
        assert!(find_function("if").is_none());
        assert!(find_function("tanh").is_none());
    }

    #[test]
    fn reserved_names_cover_context_and_constants() {
        for name in ["pi", "if", "dt", "player_x", "player_y", "tick"] {
            assert!(is_reserved_name(name), "{name}");
        }
        assert!(!is_reserved_name("x"));
    }
}
