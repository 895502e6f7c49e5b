use crate::{
    error::Error,
    hash::hash_symbol,
    ops::Op,
    walk::{DepthWalker, pop_operand, post_order},
};

/// Represents a node in an abstract syntax `Tree`. Operator nodes refer to
/// their operands by their index in the tree.
#[derive(Debug, PartialEq, Copy, Clone)]
pub enum Node {
    Number(f64),
    /// Holds the hash of the variable's symbol. The symbol and its value live
    /// in the variable registry of the tree.
    Variable(u64),
    Unary(Op, usize),
    Binary(Op, usize, usize),
}

use Node::*;

/// An entry in the variable registry of a tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub symbol: char,
    pub hash: u64,
    /// `None` until the host assigns a value.
    pub value: Option<f64>,
}

/// Represents a mutable expression tree.
///
/// All nodes live in an arena owned by the tree, and refer to each other by
/// index. Every node also knows its parent, which is only used to find the
/// slot to overwrite when the node is replaced. Nodes that get detached
/// during a rewrite are not removed right away. They are recorded as retired,
/// and remain readable until the tree is flushed or dropped.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<Node>,
    parents: Vec<Option<usize>>,
    root: Option<usize>,
    retired: Vec<usize>,
    vars: Vec<Variable>,
}

pub type MaybeTree = Result<Tree, Error>;

impl Tree {
    /// Create an empty tree with no root and no variables.
    pub fn new() -> Tree {
        Tree::default()
    }

    /// The root of the tree, if it has one.
    pub fn root(&self) -> Option<usize> {
        self.root
    }

    /// Like `root`, but an empty tree is an error.
    pub fn root_index(&self) -> Result<usize, Error> {
        self.root.ok_or(Error::NullArgument)
    }

    /// Make `index` the root of the tree. The node must not be in a slot of
    /// another node.
    pub fn set_root(&mut self, index: usize) -> Result<(), Error> {
        self.check(index)?;
        if self.parents[index].is_some() {
            return Err(Error::AlreadyAttached(index));
        }
        self.root = Some(index);
        Ok(())
    }

    /// The number of nodes in the arena, including retired nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// The number of nodes reachable from the root.
    pub fn live_len(&self) -> usize {
        match self.root {
            Some(root) => DepthWalker::new().walk(&self.nodes, root).count(),
            None => 0,
        }
    }

    /// Get a reference to the node at `index`.
    ///
    /// # Panics
    ///
    /// If `index` is not in the arena. Use `nodes().get(index)` to check.
    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    /// Reference to all the nodes in the arena.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The node whose slot holds `index`, if any.
    ///
    /// # Panics
    ///
    /// If `index` is not in the arena.
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.parents[index]
    }

    /// Nodes detached from the tree since the last flush.
    pub fn retired(&self) -> &[usize] {
        &self.retired
    }

    /// Return an error if `index` is not a node of this tree.
    pub(crate) fn check(&self, index: usize) -> Result<(), Error> {
        if index < self.nodes.len() {
            Ok(())
        } else {
            Err(Error::NullArgument)
        }
    }

    /// Return an error unless `index` is a node that is free to be put in a
    /// new slot, i.e. it has no parent and is not the root.
    fn check_detached(&self, index: usize) -> Result<(), Error> {
        self.check(index)?;
        if self.parents[index].is_some() || self.root == Some(index) {
            Err(Error::AlreadyAttached(index))
        } else {
            Ok(())
        }
    }

    /// Add a node to the arena and return its index. The operands of the node,
    /// if any, become its children, so they must not be attached anywhere
    /// else. A binary node can't use the same node for both operands.
    pub fn push(&mut self, node: Node) -> Result<usize, Error> {
        match node {
            Number(_) | Variable(_) => {}
            Unary(op, input) => {
                if !op.is_unary() {
                    return Err(Error::ArityMismatch(op));
                }
                self.check_detached(input)?;
            }
            Binary(op, lhs, rhs) => {
                if op.is_unary() {
                    return Err(Error::ArityMismatch(op));
                }
                self.check_detached(lhs)?;
                self.check_detached(rhs)?;
                if lhs == rhs {
                    return Err(Error::AlreadyAttached(rhs));
                }
            }
        }
        self.nodes
            .try_reserve(1)
            .map_err(|_| Error::AllocationFailure)?;
        self.parents
            .try_reserve(1)
            .map_err(|_| Error::AllocationFailure)?;
        let index = self.nodes.len();
        self.nodes.push(node);
        self.parents.push(None);
        match node {
            Number(_) | Variable(_) => {}
            Unary(_, input) => self.parents[input] = Some(index),
            Binary(_, lhs, rhs) => {
                self.parents[lhs] = Some(index);
                self.parents[rhs] = Some(index);
            }
        }
        Ok(index)
    }

    pub fn number(&mut self, value: f64) -> Result<usize, Error> {
        self.push(Number(value))
    }

    pub fn variable(&mut self, hash: u64) -> Result<usize, Error> {
        self.push(Variable(hash))
    }

    pub fn unary(&mut self, op: Op, input: usize) -> Result<usize, Error> {
        self.push(Unary(op, input))
    }

    pub fn binary(&mut self, op: Op, lhs: usize, rhs: usize) -> Result<usize, Error> {
        self.push(Binary(op, lhs, rhs))
    }

    /// Put `new` in the slot currently occupied by `old`, and retire
    /// `old`. The slot is either a child slot of the parent of `old`, found by
    /// comparing indices, or the root of the tree. `new` must be detached, or
    /// a child of `old`.
    pub fn replace(&mut self, old: usize, new: usize) -> Result<(), Error> {
        self.check(old)?;
        self.check(new)?;
        if old == new {
            return Ok(());
        }
        let movable = match self.parents[new] {
            None => self.root != Some(new),
            Some(parent) => parent == old,
        };
        if !movable {
            return Err(Error::AlreadyAttached(new));
        }
        match self.parents[old] {
            Some(parent) => {
                match &mut self.nodes[parent] {
                    Number(_) | Variable(_) => return Err(Error::NullArgument),
                    Unary(_, input) => {
                        if *input == old {
                            *input = new;
                        }
                    }
                    Binary(_, lhs, rhs) => {
                        if *lhs == old {
                            *lhs = new;
                        } else if *rhs == old {
                            *rhs = new;
                        }
                    }
                }
                self.parents[new] = Some(parent);
            }
            None => {
                if self.root == Some(old) {
                    self.root = Some(new);
                }
                self.parents[new] = None;
            }
        }
        self.parents[old] = None;
        self.retire(old);
        Ok(())
    }

    /// Record `index` as detached from the tree. It stays in the arena until
    /// the next flush.
    pub fn retire(&mut self, index: usize) {
        self.retired.push(index);
    }

    /// Make a deep copy of the subtree at `index` and return the index of the
    /// copy. The copy has no parent.
    pub fn copy_subtree(&mut self, index: usize) -> Result<usize, Error> {
        self.check(index)?;
        let mut copies: Vec<usize> = Vec::new();
        for i in post_order(&self.nodes, index) {
            let copy = match self.nodes[i] {
                Number(value) => self.number(value)?,
                Variable(hash) => self.variable(hash)?,
                Unary(op, _) => {
                    let input = pop_operand(&mut copies)?;
                    self.unary(op, input)?
                }
                Binary(op, _, _) => {
                    let rhs = pop_operand(&mut copies)?;
                    let lhs = pop_operand(&mut copies)?;
                    self.binary(op, lhs, rhs)?
                }
            };
            copies.push(copy);
        }
        pop_operand(&mut copies)
    }

    /// Copy the subtree at `index` of `other` into this tree, and return the
    /// index of the copy.
    pub fn import_subtree(&mut self, other: &Tree, index: usize) -> Result<usize, Error> {
        other.check(index)?;
        let mut copies: Vec<usize> = Vec::new();
        for i in post_order(&other.nodes, index) {
            let copy = match other.nodes[i] {
                Number(value) => self.number(value)?,
                Variable(hash) => {
                    if let Some(var) = other.find_variable(hash) {
                        self.register_variable(var.symbol)?;
                    }
                    self.variable(hash)?
                }
                Unary(op, _) => {
                    let input = pop_operand(&mut copies)?;
                    self.unary(op, input)?
                }
                Binary(op, _, _) => {
                    let rhs = pop_operand(&mut copies)?;
                    let lhs = pop_operand(&mut copies)?;
                    self.binary(op, lhs, rhs)?
                }
            };
            copies.push(copy);
        }
        pop_operand(&mut copies)
    }

    /// Check if the subtree at `index` contains any variable.
    pub fn holds_any_var(&self, index: usize) -> bool {
        DepthWalker::new()
            .walk(&self.nodes, index)
            .any(|(i, _)| matches!(self.nodes[i], Variable(_)))
    }

    /// Check if the subtree at `index` contains the variable with the given
    /// hash.
    pub fn depends_on(&self, index: usize, hash: u64) -> bool {
        DepthWalker::new()
            .walk(&self.nodes, index)
            .any(|(i, _)| self.nodes[i] == Variable(hash))
    }

    /// Drop all nodes that are not reachable from the root, and clear the
    /// list of retired nodes. The surviving nodes are renumbered in
    /// depth-first order, with the root at index 0. Any node index obtained
    /// before flushing is invalid afterwards.
    pub fn flush(&mut self) {
        let root = match self.root {
            Some(root) => root,
            None => {
                self.nodes.clear();
                self.parents.clear();
                self.retired.clear();
                return;
            }
        };
        let mut index_map = vec![usize::MAX; self.nodes.len()];
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for (index, _parent) in DepthWalker::new().walk(&self.nodes, root) {
            index_map[index] = nodes.len();
            nodes.push(self.nodes[index]);
        }
        let mut parents = vec![None; nodes.len()];
        for (i, node) in nodes.iter_mut().enumerate() {
            match node {
                Number(_) | Variable(_) => {}
                Unary(_, input) => {
                    *input = index_map[*input];
                    parents[*input] = Some(i);
                }
                Binary(_, lhs, rhs) => {
                    *lhs = index_map[*lhs];
                    *rhs = index_map[*rhs];
                    parents[*lhs] = Some(i);
                    parents[*rhs] = Some(i);
                }
            }
        }
        self.nodes = nodes;
        self.parents = parents;
        self.root = Some(0);
        self.retired.clear();
    }

    /// Check if this tree and `other` have the same shape and hold the same
    /// operators, numbers and variables. Node indices are not compared.
    pub fn is_equivalent(&self, other: &Tree) -> bool {
        let mut stack = match (self.root, other.root) {
            (Some(a), Some(b)) => vec![(a, b)],
            (None, None) => return true,
            _ => return false,
        };
        while let Some((a, b)) = stack.pop() {
            match (self.nodes[a], other.nodes[b]) {
                (Number(x), Number(y)) if x == y => {}
                (Variable(x), Variable(y)) if x == y => {}
                (Unary(op1, i1), Unary(op2, i2)) if op1 == op2 => stack.push((i1, i2)),
                (Binary(op1, l1, r1), Binary(op2, l2, r2)) if op1 == op2 => {
                    stack.push((r1, r2));
                    stack.push((l1, l2));
                }
                _ => return false,
            }
        }
        true
    }

    /// The variable registry, in the order the symbols were first seen.
    pub fn variables(&self) -> &[Variable] {
        &self.vars
    }

    /// Add `symbol` to the variable registry if it isn't already there, and
    /// return its hash.
    pub fn register_variable(&mut self, symbol: char) -> Result<u64, Error> {
        let hash = hash_symbol(symbol);
        if self.find_variable(hash).is_none() {
            self.vars
                .try_reserve(1)
                .map_err(|_| Error::AllocationFailure)?;
            self.vars.push(Variable {
                symbol,
                hash,
                value: None,
            });
        }
        Ok(hash)
    }

    /// Find a variable by the hash of its symbol. The registry is expected to
    /// be tiny, so this is a linear scan.
    pub fn find_variable(&self, hash: u64) -> Option<&Variable> {
        self.vars.iter().find(|v| v.hash == hash)
    }

    pub fn variable_by_symbol(&self, symbol: char) -> Option<&Variable> {
        self.find_variable(hash_symbol(symbol))
    }

    /// Assign `value` to the variable `symbol`. The variable must already be
    /// in the registry.
    pub fn set_variable(&mut self, symbol: char, value: f64) -> Result<(), Error> {
        let hash = hash_symbol(symbol);
        match self.vars.iter_mut().find(|v| v.hash == hash) {
            Some(var) => {
                var.value = Some(value);
                Ok(())
            }
            None => Err(Error::UndefinedVariable(symbol)),
        }
    }

    /// Forget the values of all variables.
    pub fn clear_variables(&mut self) {
        for var in self.vars.iter_mut() {
            var.value = None;
        }
    }

    /// The symbols of the registered variables.
    pub fn symbols(&self) -> Vec<char> {
        self.vars.iter().map(|v| v.symbol).collect()
    }
}
