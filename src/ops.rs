/// Every operator known to the tree.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Exp,
    Sqrt,
    Log,
    Sin,
    Cos,
    Tan,
    Ctg,
    Sh,
    Ch,
    Th,
    Asin,
    Acos,
    Atan,
    Actg,
}

use Op::*;

/// Static properties of an operator.
#[derive(Debug, PartialEq, Eq)]
pub struct Descriptor {
    pub op: Op,
    /// Number of operands, either 1 or 2.
    pub arity: u8,
    /// Higher binds tighter.
    pub precedence: u8,
    /// Token used by the parser and the serialized form.
    pub token: &'static str,
}

const fn describe(op: Op, arity: u8, precedence: u8, token: &'static str) -> Descriptor {
    Descriptor {
        op,
        arity,
        precedence,
        token,
    }
}

/// The catalog, indexed by `Op::index`.
static CATALOG: [Descriptor; 19] = [
    describe(Add, 2, 1, "+"),
    describe(Sub, 2, 1, "-"),
    describe(Mul, 2, 2, "*"),
    describe(Div, 2, 2, "/"),
    describe(Pow, 2, 3, "^"),
    describe(Exp, 1, 4, "exp"),
    describe(Sqrt, 1, 4, "sqrt"),
    describe(Log, 1, 4, "ln"),
    describe(Sin, 1, 4, "sin"),
    describe(Cos, 1, 4, "cos"),
    describe(Tan, 1, 4, "tan"),
    describe(Ctg, 1, 4, "ctg"),
    describe(Sh, 1, 4, "sh"),
    describe(Ch, 1, 4, "ch"),
    describe(Th, 1, 4, "th"),
    describe(Asin, 1, 4, "arcsin"),
    describe(Acos, 1, 4, "arccos"),
    describe(Atan, 1, 4, "arctg"),
    describe(Actg, 1, 4, "arcctg"),
];

impl Op {
    pub const ALL: [Op; 19] = [
        Add, Sub, Mul, Div, Pow, Exp, Sqrt, Log, Sin, Cos, Tan, Ctg, Sh, Ch, Th, Asin, Acos, Atan,
        Actg,
    ];

    /// The index of the variant in the catalog.
    pub fn index(&self) -> usize {
        match self {
            Add => 0,
            Sub => 1,
            Mul => 2,
            Div => 3,
            Pow => 4,
            Exp => 5,
            Sqrt => 6,
            Log => 7,
            Sin => 8,
            Cos => 9,
            Tan => 10,
            Ctg => 11,
            Sh => 12,
            Ch => 13,
            Th => 14,
            Asin => 15,
            Acos => 16,
            Atan => 17,
            Actg => 18,
        }
    }

    pub fn descriptor(&self) -> &'static Descriptor {
        &CATALOG[self.index()]
    }

    pub fn arity(&self) -> u8 {
        self.descriptor().arity
    }

    pub fn is_unary(&self) -> bool {
        self.arity() == 1
    }

    pub fn precedence(&self) -> u8 {
        self.descriptor().precedence
    }

    pub fn token(&self) -> &'static str {
        self.descriptor().token
    }

    /// Find the operator with the given surface token.
    pub fn from_token(token: &str) -> Option<Op> {
        CATALOG.iter().find(|d| d.token == token).map(|d| d.op)
    }

    /// Like `from_token`, but only matches operators that take a single
    /// operand. Binary operators never match as function names.
    pub fn unary_from_token(token: &str) -> Option<Op> {
        Op::from_token(token).filter(|op| op.is_unary())
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token())
    }
}
