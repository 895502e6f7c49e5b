use crate::{
    error::Error,
    ops::Op,
    tree::{MaybeTree, Tree},
};
use tracing::trace;

/// Parentheses and function calls can't be nested deeper than this.
pub const MAX_NESTING: usize = 256;

/// Recursive descent parser for infix expressions.
///
/// The whole input is kept in memory and read through a byte cursor. Every
/// node created while parsing goes into `tree`, so if parsing fails, dropping
/// the parser also drops everything it built.
struct Parser<'a> {
    text: &'a [u8],
    pos: usize,
    depth: usize,
    tree: Tree,
}

fn syntax(offset: usize, expected: &'static str) -> Error {
    Error::Syntax { offset, expected }
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Parser<'a> {
        Parser {
            text: text.as_bytes(),
            pos: 0,
            depth: 0,
            tree: Tree::new(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.text.get(self.pos).copied()
    }

    fn skip_blanks(&mut self) {
        while let Some(b' ' | b'\t' | b'\r') = self.peek() {
            self.pos += 1;
        }
    }

    /// Skip blanks, then consume `byte` if it is the next character.
    fn eat(&mut self, byte: u8) -> bool {
        self.skip_blanks();
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, byte: u8, expected: &'static str) -> Result<(), Error> {
        if self.eat(byte) {
            Ok(())
        } else {
            Err(syntax(self.pos, expected))
        }
    }

    /// Parse the top level expression and the terminator that follows it.
    fn statement(mut self) -> Result<Tree, Error> {
        let root = self.expr()?;
        self.skip_blanks();
        match self.peek() {
            None => {}
            Some(b'\n') => {
                self.pos += 1;
                while let Some(byte) = self.peek() {
                    if !byte.is_ascii_whitespace() {
                        return Err(syntax(self.pos, "end of input"));
                    }
                    self.pos += 1;
                }
            }
            Some(_) => return Err(syntax(self.pos, "newline")),
        }
        self.tree.set_root(root)?;
        Ok(self.tree)
    }

    /// Parse an expression nested inside a group that starts at `start`.
    fn nested_expr(&mut self, start: usize) -> Result<usize, Error> {
        if self.depth >= MAX_NESTING {
            return Err(syntax(start, "shallower nesting"));
        }
        self.depth += 1;
        let inner = self.expr();
        self.depth -= 1;
        inner
    }

    fn expr(&mut self) -> Result<usize, Error> {
        let mut lhs = self.term()?;
        loop {
            let op = if self.eat(b'+') {
                Op::Add
            } else if self.eat(b'-') {
                Op::Sub
            } else {
                return Ok(lhs);
            };
            let rhs = self.term()?;
            lhs = self.tree.binary(op, lhs, rhs)?;
        }
    }

    fn term(&mut self) -> Result<usize, Error> {
        let mut lhs = self.power()?;
        loop {
            let op = if self.eat(b'*') {
                Op::Mul
            } else if self.eat(b'/') {
                Op::Div
            } else {
                return Ok(lhs);
            };
            let rhs = self.power()?;
            lhs = self.tree.binary(op, lhs, rhs)?;
        }
    }

    /// Exponents fold to the left, so `2^3^2` is `(2^3)^2`.
    fn power(&mut self) -> Result<usize, Error> {
        let mut lhs = self.primary()?;
        while self.eat(b'^') {
            let rhs = self.primary()?;
            lhs = self.tree.binary(Op::Pow, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn primary(&mut self) -> Result<usize, Error> {
        self.skip_blanks();
        let start = self.pos;
        match self.peek() {
            Some(b'(') => {
                self.pos += 1;
                let inner = self.nested_expr(start)?;
                self.expect(b')', "')'")?;
                Ok(inner)
            }
            Some(byte) if byte.is_ascii_digit() => self.number(start),
            Some(byte) if byte.is_ascii_alphabetic() => self.identifier(start),
            _ => Err(syntax(start, "operand")),
        }
    }

    fn number(&mut self, start: usize) -> Result<usize, Error> {
        while let Some(b'0'..=b'9') = self.peek() {
            self.pos += 1;
        }
        // Only ascii digits were consumed, so this is valid utf-8.
        let digits = std::str::from_utf8(&self.text[start..self.pos])
            .map_err(|_| Error::InvalidCursorPosition(start))?;
        let value: f64 = digits.parse().map_err(|_| syntax(start, "number"))?;
        if !value.is_finite() {
            return Err(syntax(start, "number"));
        }
        trace!("number {value} at {start}");
        self.tree.number(value)
    }

    fn identifier(&mut self, start: usize) -> Result<usize, Error> {
        while let Some(b'a'..=b'z' | b'A'..=b'Z') = self.peek() {
            self.pos += 1;
        }
        let name = &self.text[start..self.pos];
        if let [symbol] = name {
            let symbol = *symbol as char;
            trace!("variable '{symbol}' at {start}");
            let hash = self.tree.register_variable(symbol)?;
            return self.tree.variable(hash);
        }
        let op = std::str::from_utf8(name)
            .ok()
            .and_then(Op::unary_from_token)
            .ok_or(syntax(start, "function name"))?;
        trace!("function '{op}' at {start}");
        self.expect(b'(', "'('")?;
        let input = self.nested_expr(start)?;
        self.expect(b')', "')'")?;
        self.tree.unary(op, input)
    }
}

/// Parse an infix expression into a tree.
///
/// The expression ends at a newline or at the end of `text`. Only whitespace
/// is allowed after the newline. Numbers are unsigned integers, single letters
/// are variables, and longer names must be followed by a parenthesized
/// argument and name a function such as `sin` or `arcctg`.
pub fn parse(text: &str) -> MaybeTree {
    Parser::new(text).statement()
}

impl Tree {
    pub fn parse(text: &str) -> MaybeTree {
        parse(text)
    }
}
