use crate::ops::Op;
use std::fmt::{Debug, Display};

/// Floating point exception raised by a single primitive operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Signal {
    DivisionByZero,
    DomainError,
    Overflow,
    Underflow,
}

impl Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Signal::*;
        match self {
            DivisionByZero => write!(f, "division by zero"),
            DomainError => write!(f, "domain error"),
            Overflow => write!(f, "overflow"),
            Underflow => write!(f, "underflow"),
        }
    }
}

/// Describes the operation that raised a floating point signal during
/// evaluation, and its operands.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NumericError {
    pub op: Op,
    pub lhs: f64,
    /// Only present for binary operators.
    pub rhs: Option<f64>,
    pub signal: Signal,
}

impl Display for NumericError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.rhs {
            Some(rhs) => write!(f, "{} {} {}: {}", self.lhs, self.op, rhs, self.signal),
            None => write!(f, "{}({}): {}", self.op, self.lhs, self.signal),
        }
    }
}

#[derive(Clone, PartialEq)]
pub enum Error {
    // Structural.
    /// A node index does not refer to a node in the tree, or the tree has no
    /// root where one is required.
    NullArgument,
    /// The cursor of a reader moved outside its buffer.
    InvalidCursorPosition(usize),
    /// Memory for a node could not be reserved.
    AllocationFailure,
    /// The node already sits in a slot of the tree, so it can't be put in
    /// another one.
    AlreadyAttached(usize),

    // Serialization.
    IOError(String),
    /// Malformed input text. Carries the byte offset of the offending
    /// character and the class of token that was expected there.
    Syntax {
        offset: usize,
        expected: &'static str,
    },

    // Evaluation.
    /// A floating point signal was raised while evaluating.
    Numeric(NumericError),
    /// No variable with the given hash exists in the registry.
    VariableNotFound(u64),
    /// The variable exists but was never assigned a value.
    UnboundVariable(char),

    // Derivatives.
    /// Differentiating with respect to a symbol that doesn't appear in the
    /// tree's variable registry.
    UndefinedVariable(char),
    /// An operator node with the wrong number of children.
    ArityMismatch(Op),
}

impl Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Error::*;
        match self {
            NullArgument => write!(f, "NullArgument"),
            InvalidCursorPosition(pos) => f.debug_tuple("InvalidCursorPosition").field(pos).finish(),
            AllocationFailure => write!(f, "AllocationFailure"),
            AlreadyAttached(index) => f.debug_tuple("AlreadyAttached").field(index).finish(),
            IOError(msg) => f.debug_tuple("IOError").field(msg).finish(),
            Syntax { offset, expected } => f
                .debug_struct("Syntax")
                .field("offset", offset)
                .field("expected", expected)
                .finish(),
            Numeric(err) => f.debug_tuple("Numeric").field(err).finish(),
            VariableNotFound(hash) => f.debug_tuple("VariableNotFound").field(hash).finish(),
            UnboundVariable(symbol) => f.debug_tuple("UnboundVariable").field(symbol).finish(),
            UndefinedVariable(symbol) => f.debug_tuple("UndefinedVariable").field(symbol).finish(),
            ArityMismatch(op) => f.debug_tuple("ArityMismatch").field(op).finish(),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Error::*;
        match self {
            NullArgument => write!(f, "missing node"),
            InvalidCursorPosition(pos) => write!(f, "cursor position {pos} is out of bounds"),
            AllocationFailure => write!(f, "memory allocation failed"),
            AlreadyAttached(index) => write!(f, "node {index} is already attached to the tree"),
            IOError(msg) => write!(f, "io error: {msg}"),
            Syntax { offset, expected } => {
                write!(f, "syntax error at byte {offset}: expected {expected}")
            }
            Numeric(err) => write!(f, "{err}"),
            VariableNotFound(hash) => write!(f, "no variable with hash {hash}"),
            UnboundVariable(symbol) => write!(f, "variable '{symbol}' has no value"),
            UndefinedVariable(symbol) => write!(f, "variable '{symbol}' is not defined"),
            ArityMismatch(op) => write!(f, "wrong number of operands for '{op}'"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IOError(err.to_string())
    }
}

impl From<NumericError> for Error {
    fn from(err: NumericError) -> Self {
        Error::Numeric(err)
    }
}
