use crate::{
    error::Error,
    ops::Op::*,
    report::Sink,
    tree::{Node::*, Tree},
    walk::DepthWalker,
};
use tracing::debug;

/// Literals within this distance of 0 or 1 are treated as exactly 0 or 1
/// when eliminating identities.
pub const FLOAT_TOLERANCE: f64 = 1e-9;

fn is_value(tree: &Tree, index: usize, value: f64) -> bool {
    match tree.node(index) {
        Number(v) => f64::abs(v - value) < FLOAT_TOLERANCE,
        _ => false,
    }
}

/// What to put in place of a node.
enum Rewrite {
    /// An existing node, usually one of the children.
    Node(usize),
    Number(f64),
}

impl Tree {
    /// Look for an identity that lets `index` be replaced with one of its
    /// children or a literal.
    fn find_identity(&self, index: usize) -> Option<Rewrite> {
        let (op, lhs, rhs) = match *self.node(index) {
            Binary(op, lhs, rhs) => (op, lhs, rhs),
            _ => return None,
        };
        let rewrite = match op {
            Mul if is_value(self, lhs, 0.) => Rewrite::Number(0.),
            Mul if is_value(self, lhs, 1.) => Rewrite::Node(rhs),
            Mul if is_value(self, rhs, 0.) => Rewrite::Number(0.),
            Mul if is_value(self, rhs, 1.) => Rewrite::Node(lhs),
            Add if is_value(self, lhs, 0.) => Rewrite::Node(rhs),
            Add if is_value(self, rhs, 0.) => Rewrite::Node(lhs),
            Sub if is_value(self, rhs, 0.) => Rewrite::Node(lhs),
            Div if is_value(self, rhs, 1.) => Rewrite::Node(lhs),
            Pow if is_value(self, lhs, 0.) => Rewrite::Number(0.),
            Pow if is_value(self, lhs, 1.) => Rewrite::Number(1.),
            Pow if is_value(self, rhs, 0.) => Rewrite::Number(1.),
            Pow if is_value(self, rhs, 1.) => Rewrite::Node(lhs),
            _ => return None,
        };
        Some(rewrite)
    }

    /// Try to evaluate an operator whose operands are all literals. Returns
    /// `Ok(None)` if the node is not such an operator.
    fn fold_constant(&self, index: usize) -> Result<Option<f64>, Error> {
        match *self.node(index) {
            Unary(op, input) => match self.node(input) {
                Number(value) => op.apply(*value, None).map(Some),
                _ => Ok(None),
            },
            Binary(op, lhs, rhs) => match (self.node(lhs), self.node(rhs)) {
                (Number(a), Number(b)) => op.apply(*a, Some(*b)).map(Some),
                _ => Ok(None),
            },
            Number(_) | Variable(_) => Ok(None),
        }
    }

    /// Run one simplification pass over the live tree, visiting children
    /// before their parents. Returns the number of nodes rewritten.
    fn simplify_pass(&mut self, sink: &mut impl Sink) -> Result<usize, Error> {
        let root = self.root_index()?;
        let mut order: Vec<usize> = DepthWalker::new()
            .walk(self.nodes(), root)
            .map(|(i, _)| i)
            .collect();
        // Reversed pre-order puts every node after all of its descendants.
        order.reverse();
        let mut count = 0usize;
        for index in order {
            let rewrite = match self.fold_constant(index) {
                Ok(Some(value)) => Some(Rewrite::Number(value)),
                Ok(None) => self.find_identity(index),
                Err(err @ Error::Numeric(_)) => {
                    // The node stays as it is, literal operands and all.
                    self.report_error(sink, index, &err, "Constant folding skipped");
                    continue;
                }
                Err(err) => return Err(err),
            };
            let replacement = match rewrite {
                None => continue,
                Some(Rewrite::Node(child)) => child,
                Some(Rewrite::Number(value)) => self.number(value)?,
            };
            self.replace(index, replacement)?;
            count += 1;
        }
        Ok(count)
    }

    /**
    Fold constants and eliminate identities such as `x * 1` and `x ^ 0`,
    repeatedly, until nothing changes. Returns the total number of nodes
    that were rewritten. The replaced nodes are retired, not removed.

    Operators with literal operands whose evaluation raises a floating point
    signal are left unfolded, so the simplified tree never contains infinite
    or NaN literals that weren't there before.
    */
    pub fn simplify(&mut self, sink: &mut impl Sink) -> Result<usize, Error> {
        let mut total = 0usize;
        let mut passes = 0usize;
        loop {
            let count = self.simplify_pass(sink)?;
            passes += 1;
            if count == 0 {
                break;
            }
            total += count;
        }
        debug!("Simplified {total} nodes in {passes} passes");
        if total > 0 {
            let root = self.root_index()?;
            self.report(sink, root, None, "After simplification");
        }
        Ok(total)
    }
}
