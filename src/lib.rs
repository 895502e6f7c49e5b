pub mod error;
pub mod fold;
pub mod hash;
pub mod latex;
pub mod ops;
pub mod parser;
pub mod report;
pub mod tree;

mod derivative;
mod eval;
mod io;
mod macros;
mod taylor;
mod walk;

pub use error::{Error, NumericError, Signal};
pub use fold::FLOAT_TOLERANCE;
pub use latex::LatexSink;
pub use ops::Op;
pub use parser::parse;
pub use report::{MessageSink, NullSink, Report, Sink, TracingSink};
pub use tree::{MaybeTree, Node, Tree, Variable};

#[cfg(test)]
mod test;
