use crate::{
    error::Error,
    ops::Op,
    tree::{Node, Node::*, Tree},
    walk::DepthWalker,
};
use std::path::Path;

impl std::fmt::Display for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        enum Token {
            Branch,
            Pass,
            Turn,
            Gap,
            Newline,
            NodeIndex(usize),
        }
        use Token::*;
        let root = match self.root() {
            Some(root) => root,
            None => return writeln!(f, "(empty)"),
        };
        // Walk the tree and collect tokens.
        let tokens = {
            // First pass of collecting tokens with no branching.
            let mut tokens = {
                let mut tokens: Vec<Token> = Vec::with_capacity(self.len()); // Likely need more memory.
                let mut walker = DepthWalker::default();
                let mut node_depths: Box<[usize]> = vec![0; self.len()].into_boxed_slice();
                for (index, parent) in walker.walk(self.nodes(), root) {
                    if let Some(pi) = parent {
                        node_depths[index] = node_depths[pi] + 1;
                    }
                    let depth = node_depths[index];
                    if depth > 0 {
                        for _ in 0..(depth - 1) {
                            tokens.push(Gap);
                        }
                        tokens.push(Turn);
                    }
                    tokens.push(NodeIndex(index));
                    tokens.push(Newline);
                }
                tokens
            };
            // Insert branching tokens where necessary.
            let mut line_start: usize = 0;
            for i in 0..tokens.len() {
                match tokens[i] {
                    Branch | Pass | Gap | NodeIndex(_) => {} // Do nothing.
                    Newline => line_start = i,
                    Turn => {
                        let offset = i - line_start;
                        for li in (0..line_start).rev() {
                            if let Newline = tokens[li] {
                                let ti = li + offset;
                                tokens[ti] = match &tokens[ti] {
                                    Branch | Pass | NodeIndex(_) => break,
                                    Turn => Branch,
                                    Gap => Pass,
                                    Newline => return Err(std::fmt::Error),
                                }
                            }
                        }
                    }
                }
            }
            tokens
        };
        // Write all the tokens out.
        writeln!(f)?;
        for token in tokens.iter() {
            match token {
                Branch => write!(f, " ├── ")?,
                Pass => write!(f, " │   ")?,
                Turn => write!(f, " └── ")?,
                Gap => write!(f, "     ")?,
                Newline => writeln!(f)?,
                NodeIndex(index) => match self.node(*index) {
                    Variable(hash) => match self.find_variable(*hash) {
                        Some(var) => write!(f, "[{}] Variable({})", *index, var.symbol)?,
                        None => write!(f, "[{}] {}", *index, self.node(*index))?,
                    },
                    node => write!(f, "[{}] {}", *index, node)?,
                },
            };
        }
        writeln!(f)
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Number(value) => write!(f, "Number({})", value),
            Variable(hash) => write!(f, "Variable(#{})", hash),
            Unary(op, input) => write!(f, "{:?}({})", op, input),
            Binary(op, lhs, rhs) => write!(f, "{:?}({}, {})", op, lhs, rhs),
        }
    }
}

const NIL: &str = "nil";

impl Tree {
    fn write_prefix(&self, index: usize, out: &mut String) -> Result<(), Error> {
        enum Item {
            Node(usize),
            Text(&'static str),
        }
        let mut stack = vec![Item::Node(index)];
        while let Some(item) = stack.pop() {
            let index = match item {
                Item::Text(text) => {
                    out.push_str(text);
                    continue;
                }
                Item::Node(index) => index,
            };
            out.push_str("( ");
            match *self.node(index) {
                Number(value) => {
                    out.push_str(&value.to_string());
                    out.push_str(" nil nil )");
                }
                Variable(hash) => {
                    let var = self.find_variable(hash).ok_or(Error::VariableNotFound(hash))?;
                    out.push(var.symbol);
                    out.push_str(" nil nil )");
                }
                Unary(op, input) => {
                    out.push_str(op.token());
                    out.push(' ');
                    stack.push(Item::Text(" nil )"));
                    stack.push(Item::Node(input));
                }
                Binary(op, lhs, rhs) => {
                    out.push_str(op.token());
                    out.push(' ');
                    stack.push(Item::Text(" )"));
                    stack.push(Item::Node(rhs));
                    stack.push(Item::Text(" "));
                    stack.push(Item::Node(lhs));
                }
            }
        }
        Ok(())
    }

    /**
    Serialize the live tree in prefix form. Every node is written as

    `( payload left right )`

    where the payload is the operator token, the number, or the symbol of the
    variable, and a missing child is written as `nil`.
    */
    pub fn to_prefix(&self) -> Result<String, Error> {
        let mut out = String::new();
        self.write_prefix(self.root_index()?, &mut out)?;
        Ok(out)
    }

    /// Read a tree from the prefix form written by `to_prefix`.
    pub fn from_prefix(text: &str) -> Result<Tree, Error> {
        let mut reader = PrefixReader {
            text,
            pos: 0,
            tree: Tree::new(),
        };
        let root = reader.subtree()?;
        if let Some((start, _)) = reader.next_token() {
            return Err(Error::Syntax {
                offset: start,
                expected: "end of input",
            });
        }
        reader.tree.set_root(root)?;
        Ok(reader.tree)
    }

    /// Write the prefix form of the tree to a file.
    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let text = self.to_prefix()?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Read a tree from a file containing its prefix form.
    pub fn read_file(path: impl AsRef<Path>) -> Result<Tree, Error> {
        let text = std::fs::read_to_string(path)?;
        Tree::from_prefix(&text)
    }
}

fn syntax<T>(offset: usize, expected: &'static str) -> Result<T, Error> {
    Err(Error::Syntax { offset, expected })
}

struct PrefixReader<'a> {
    text: &'a str,
    pos: usize,
    tree: Tree,
}

impl<'a> PrefixReader<'a> {
    /// Find the next token without consuming it. Returns its offset, the
    /// token, and the offset right after it.
    fn peek_token(&self) -> Option<(usize, &'a str, usize)> {
        let rest = self.text.get(self.pos..)?;
        let skipped = rest.len() - rest.trim_start().len();
        let start = self.pos + skipped;
        let rest = &self.text[start..];
        let first = rest.chars().next()?;
        let len = if first == '(' || first == ')' {
            1
        } else {
            rest.find(|c: char| c.is_whitespace() || c == '(' || c == ')')
                .unwrap_or(rest.len())
        };
        Some((start, &rest[..len], start + len))
    }

    fn next_token(&mut self) -> Option<(usize, &'a str)> {
        let (start, token, end) = self.peek_token()?;
        self.pos = end;
        Some((start, token))
    }

    fn expect(&mut self, expected: &'static str) -> Result<usize, Error> {
        match self.next_token() {
            Some((start, token)) if token == expected => Ok(start),
            Some((start, _)) => Err(Error::Syntax {
                offset: start,
                expected,
            }),
            None => Err(Error::Syntax {
                offset: self.text.len(),
                expected,
            }),
        }
    }

    /// Read the opening parenthesis and the payload of a subtree.
    fn open(&mut self) -> Result<Pending<'a>, Error> {
        let start = self.expect("(")?;
        let (offset, payload) = self.next_token().ok_or(Error::Syntax {
            offset: self.text.len(),
            expected: "payload",
        })?;
        Ok(Pending {
            start,
            offset,
            payload,
            children: Vec::with_capacity(2),
        })
    }

    /// Create the node of a subtree whose children have all been read.
    fn build(&mut self, pending: &Pending) -> Result<usize, Error> {
        let (left_offset, left) = pending.children[0];
        let (right_offset, right) = pending.children[1];
        if let Some(op) = Op::from_token(pending.payload) {
            return match (op.is_unary(), left, right) {
                (_, None, _) => syntax(left_offset, "subtree"),
                (true, Some(input), None) => self.tree.unary(op, input),
                (true, Some(_), Some(_)) => syntax(right_offset, NIL),
                (false, Some(_), None) => syntax(right_offset, "subtree"),
                (false, Some(lhs), Some(rhs)) => self.tree.binary(op, lhs, rhs),
            };
        }
        if left.is_some() {
            return syntax(left_offset, NIL);
        }
        if right.is_some() {
            return syntax(right_offset, NIL);
        }
        let mut chars = pending.payload.chars();
        match (chars.next(), chars.next()) {
            (Some(symbol), None) if symbol.is_alphabetic() => {
                let hash = self.tree.register_variable(symbol)?;
                self.tree.variable(hash)
            }
            _ => match pending.payload.parse::<f64>() {
                Ok(value) => self.tree.number(value),
                Err(_) => syntax(pending.offset, "operator, number or variable"),
            },
        }
    }

    /// Read a subtree. Nested subtrees are kept on an explicit stack, so
    /// the depth of the tree is only limited by memory.
    fn subtree(&mut self) -> Result<usize, Error> {
        let mut stack = vec![self.open()?];
        loop {
            let Some(top) = stack.last_mut() else {
                return syntax(self.pos, "subtree");
            };
            if top.children.len() < 2 {
                match self.peek_token() {
                    Some((start, NIL, end)) => {
                        self.pos = end;
                        top.children.push((start, None));
                    }
                    _ => stack.push(self.open()?),
                }
                continue;
            }
            let Some(done) = stack.pop() else {
                return syntax(self.pos, "subtree");
            };
            let index = self.build(&done)?;
            self.expect(")")?;
            match stack.last_mut() {
                Some(parent) => parent.children.push((done.start, Some(index))),
                None => return Ok(index),
            }
        }
    }
}

/// A subtree whose opening parenthesis and payload have been read, but not
/// all of its children.
struct Pending<'a> {
    start: usize,
    offset: usize,
    payload: &'a str,
    /// Offset and node of every child read so far. `None` is `nil`.
    children: Vec<(usize, Option<usize>)>,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{parser::parse, test::util::compare_trees};

    #[test]
    fn t_tree_string_formatting() {
        let tree = parse("x^2 + y^2").unwrap();
        assert_eq!(
            format!("{}", tree).trim(),
            "
[6] Add(2, 5)
 ├── [2] Pow(0, 1)
 │    ├── [0] Variable(x)
 │    └── [1] Number(2)
 └── [5] Pow(3, 4)
      ├── [3] Variable(y)
      └── [4] Number(2)"
                .trim()
        );
        let tree = parse("sin(x + 1) * 2").unwrap();
        assert_eq!(
            format!("{}", tree).trim(),
            "
[5] Mul(3, 4)
 ├── [3] Sin(2)
 │    └── [2] Add(0, 1)
 │         ├── [0] Variable(x)
 │         └── [1] Number(1)
 └── [4] Number(2)"
                .trim()
        );
        assert_eq!(format!("{}", Tree::new()).trim(), "(empty)");
    }

    #[test]
    fn t_prefix_format() {
        let tree = parse("x + 2").unwrap();
        assert_eq!(
            tree.to_prefix().unwrap(),
            "( + ( x nil nil ) ( 2 nil nil ) )"
        );
        let tree = parse("arcctg(x)").unwrap();
        assert_eq!(tree.to_prefix().unwrap(), "( arcctg ( x nil nil ) nil )");
        assert_eq!(Tree::new().to_prefix(), Err(Error::NullArgument));
    }

    #[test]
    fn t_prefix_round_trip() {
        let tree = parse("sin(x)*(y + 3)^2 - ln(x)/arcctg(y) + sh(ch(th(x)))").unwrap();
        let text = tree.to_prefix().unwrap();
        let copy = Tree::from_prefix(&text).unwrap();
        assert!(tree.is_equivalent(&copy));
        assert_eq!(copy.symbols(), vec!['x', 'y']);
        assert_eq!(copy.to_prefix().unwrap(), text);
        compare_trees(&tree, &copy, &[('x', 0.5, 2.), ('y', 0.5, 2.)], 10, 0.);
    }

    #[test]
    fn t_prefix_numbers() {
        let mut tree = parse("x * 2 + 3").unwrap();
        let frac = tree.number(-0.1).unwrap();
        tree.replace(1, frac).unwrap();
        let big = tree.number(1.5e300).unwrap();
        tree.replace(3, big).unwrap();
        let copy = Tree::from_prefix(&tree.to_prefix().unwrap()).unwrap();
        assert!(tree.is_equivalent(&copy));
        // Compact whitespace is fine too.
        let tree = Tree::from_prefix("(-(x nil nil)(-2.5 nil nil))").unwrap();
        assert!(tree.is_equivalent(&Tree::from_prefix("( - ( x nil nil ) ( -2.5 nil nil ) )").unwrap()));
    }

    #[test]
    fn t_prefix_errors() {
        let syntax = |offset, expected| super::syntax::<()>(offset, expected);
        assert_eq!(Tree::from_prefix("( sin nil nil )").map(|_| ()), syntax(6, "subtree"));
        assert_eq!(
            Tree::from_prefix("( + ( x nil nil ) nil )").map(|_| ()),
            syntax(18, "subtree")
        );
        assert_eq!(
            Tree::from_prefix("( 2 ( x nil nil ) nil )").map(|_| ()),
            syntax(4, NIL)
        );
        assert_eq!(
            Tree::from_prefix("( foo nil nil )").map(|_| ()),
            syntax(2, "operator, number or variable")
        );
        assert_eq!(Tree::from_prefix("( x nil nil").map(|_| ()), syntax(11, ")"));
        assert_eq!(
            Tree::from_prefix("( x nil nil ) x").map(|_| ()),
            syntax(14, "end of input")
        );
        assert_eq!(Tree::from_prefix("").map(|_| ()), syntax(0, "("));
    }

    #[test]
    fn t_deep_prefix() {
        let tree = parse(&format!("x{}", "-x".repeat(20000))).unwrap();
        let text = tree.to_prefix().unwrap();
        assert!(text.starts_with("( - ( - ( - "));
        let copy = Tree::from_prefix(&text).unwrap();
        assert!(tree.is_equivalent(&copy));
        assert_eq!(copy.to_prefix().unwrap(), text);
    }

    #[test]
    fn t_file_round_trip() {
        let path = std::env::temp_dir().join(format!("difftree_io_{}.txt", std::process::id()));
        let tree = parse("exp(x)*arcsin(y) - 7").unwrap();
        tree.write_file(&path).unwrap();
        let copy = Tree::read_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(tree.is_equivalent(&copy));
        assert!(matches!(Tree::read_file(&path), Err(Error::IOError(_))));
    }
}
