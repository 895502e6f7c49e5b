use crate::{
    error::Error,
    tree::{Node, Node::*},
};

/// Helper struct for traversing a subtree depth first.
///
/// Doing a non-recursive depth first traversal requires an explicit
/// stack. That buffer is owned by this instance, so reusing the same walker
/// for many traversals avoids repeated allocations.
#[derive(Default)]
pub struct DepthWalker {
    stack: Vec<(usize, Option<usize>)>,
}

impl DepthWalker {
    pub fn new() -> DepthWalker {
        DepthWalker { stack: vec![] }
    }

    /// Get an iterator that walks the subtree of `nodes` rooted at `start`,
    /// in pre-order, left child before right child. Each item is the index of
    /// a node and the index of the node it was reached from. The start node
    /// is reported without a parent, even if it has one in the tree.
    pub fn walk<'a>(&'a mut self, nodes: &'a [Node], start: usize) -> DepthIterator<'a> {
        self.stack.clear();
        self.stack.push((start, None));
        DepthIterator {
            walker: self,
            nodes,
        }
    }
}

/// Iterator that walks the tree depth first.
///
/// The lifetime of this iterator is bound to the lifetime of the nodes it's
/// traversing. For that reason, this is a separate struct from
/// `DepthWalker`. That way, the `DepthWalker` instance won't get tangled up in
/// lifetimes and it can be used for multiple traversals, even on different
/// trees.
pub struct DepthIterator<'a> {
    walker: &'a mut DepthWalker,
    nodes: &'a [Node],
}

impl Iterator for DepthIterator<'_> {
    type Item = (usize, Option<usize>);

    fn next(&mut self) -> Option<Self::Item> {
        let (index, parent) = self.walker.stack.pop()?;
        match &self.nodes[index] {
            Number(_) | Variable(_) => {}
            Unary(_op, input) => self.walker.stack.push((*input, Some(index))),
            Binary(_op, lhs, rhs) => {
                // Pushing rhs first because last in first out.
                self.walker.stack.push((*rhs, Some(index)));
                self.walker.stack.push((*lhs, Some(index)));
            }
        }
        Some((index, parent))
    }
}

/// Indices of the subtree of `nodes` rooted at `start`, in post-order: the
/// left subtree, then the right subtree, then the node itself. Every node
/// comes after all of its descendants, so the list can drive a stack machine
/// that pops the results of the operands of each node.
pub fn post_order(nodes: &[Node], start: usize) -> Vec<usize> {
    let mut order = Vec::new();
    let mut stack = vec![start];
    while let Some(index) = stack.pop() {
        order.push(index);
        match &nodes[index] {
            Number(_) | Variable(_) => {}
            Unary(_op, input) => stack.push(*input),
            Binary(_op, lhs, rhs) => {
                // Reversing at the end puts lhs before rhs.
                stack.push(*lhs);
                stack.push(*rhs);
            }
        }
    }
    order.reverse();
    order
}

/// Pop the result of an operand from a stack filled in post-order.
pub(crate) fn pop_operand<T>(stack: &mut Vec<T>) -> Result<T, Error> {
    stack.pop().ok_or(Error::NullArgument)
}
