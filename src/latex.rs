use crate::{
    error::Error,
    ops::Op::{self, *},
    report::{Report, Sink},
    tree::{Node, Node::*, Tree},
    walk::post_order,
};
use std::io::Write;

impl Tree {
    /// Produce the latex expression for the tree.
    pub fn to_latex(&self) -> String {
        match self.root() {
            Some(root) => self.subtree_latex(root),
            None => String::new(),
        }
    }

    /// Produce the latex expression for the subtree of a single node.
    pub fn subtree_latex(&self, index: usize) -> String {
        to_latex(self, index)
    }
}

fn symbol_latex(tree: &Tree, hash: u64) -> String {
    match tree.find_variable(hash) {
        Some(var) => var.symbol.to_string(),
        None => format!("v_{{{hash}}}"),
    }
}

fn to_latex(tree: &Tree, index: usize) -> String {
    let mut stack: Vec<String> = Vec::new();
    for i in post_order(tree.nodes(), index) {
        let latex = match tree.node(i) {
            Number(val) => val.to_string(),
            Variable(hash) => symbol_latex(tree, *hash),
            Unary(op, input) => {
                let ix = stack.pop().unwrap_or_default();
                unary_latex(*op, tree.node(*input), ix)
            }
            Binary(op, lhs, rhs) => {
                let rx = stack.pop().unwrap_or_default();
                let lx = stack.pop().unwrap_or_default();
                binary_latex(*op, tree.node(*lhs), lx, tree.node(*rhs), rx)
            }
        };
        stack.push(latex);
    }
    stack.pop().unwrap_or_default()
}

fn unary_latex(op: Op, inode: &Node, ix: String) -> String {
    match op {
        Sqrt => format!("\\sqrt{{{ix}}}"),
        Exp => format!("e^{{{}}}", {
            match inode {
                Number(_) | Variable(_) | Unary(..) => ix,
                Binary(..) => with_parens(ix),
            }
        }),
        Log => format!("\\ln\\left({{{ix}}}\\right)"),
        Sin => format!("\\sin\\left({{{ix}}}\\right)"),
        Cos => format!("\\cos\\left({{{ix}}}\\right)"),
        Tan => format!("\\tan\\left({{{ix}}}\\right)"),
        Ctg => format!("\\cot\\left({{{ix}}}\\right)"),
        Sh => format!("\\sinh\\left({{{ix}}}\\right)"),
        Ch => format!("\\cosh\\left({{{ix}}}\\right)"),
        Th => format!("\\tanh\\left({{{ix}}}\\right)"),
        Asin => format!("\\arcsin\\left({{{ix}}}\\right)"),
        Acos => format!("\\arccos\\left({{{ix}}}\\right)"),
        Atan => format!("\\arctan\\left({{{ix}}}\\right)"),
        Actg => format!("\\operatorname{{arccot}}\\left({{{ix}}}\\right)"),
        Add | Sub | Mul | Div | Pow => format!("{op}{{{ix}}}"),
    }
}

fn binary_latex(op: Op, lnode: &Node, lx: String, rnode: &Node, rx: String) -> String {
    match op {
        Add => format!(
            "{{{}}} + {{{}}}",
            parens_add_sub(lnode, lx),
            parens_add_sub(rnode, rx)
        ),
        Sub => format!(
            "{{{}}} - {{{}}}",
            parens_add_sub(lnode, lx),
            parens_add_sub(rnode, rx)
        ),
        Mul => format!("{{{}}}\\cdot{{{}}}", parens_mul(lnode, lx), parens_mul(rnode, rx)),
        Div => format!("\\dfrac{{{}}}{{{}}}", parens_div(lnode, lx), parens_div(rnode, rx)),
        Pow => {
            let lx = match lnode {
                Unary(..) | Binary(..) => with_parens(lx),
                Number(_) if lx.len() > 1 => with_parens(lx),
                Number(_) | Variable(_) => lx,
            };
            let rx = match rnode {
                Binary(Add | Sub, ..) => with_parens(rx),
                _ => rx,
            };
            format!("{{{lx}}}^{{{rx}}}")
        }
        _ => format!("{op}\\left({{{lx}}}, {{{rx}}}\\right)"),
    }
}

/// Given `node` that is an operand of a division, either a numerator or a
/// denominator, wrap its `latex` string in parentheses if necessary.
fn parens_div(node: &Node, latex: String) -> String {
    match node {
        Binary(Div, ..) => with_parens(latex),
        _ => latex,
    }
}

/// Given `node` that is an operand of a multiplication and wrap its `latex`
/// string in parentheses if necessary.
fn parens_mul(node: &Node, latex: String) -> String {
    match node {
        Binary(Add | Sub | Mul, ..) => with_parens(latex),
        Number(val) if *val < 0. => with_parens(latex),
        Binary(..) | Unary(..) | Variable(_) | Number(_) => latex,
    }
}

/// Given a `node` that is an operand of an addition or subtraction, wrap its
/// `latex` string in parentheses if necessary.
fn parens_add_sub(node: &Node, latex: String) -> String {
    match node {
        Binary(Add | Sub, ..) => with_parens(latex),
        Number(val) if *val < 0. => with_parens(latex),
        Binary(..) | Number(_) | Variable(_) | Unary(..) => latex,
    }
}

fn with_parens(latex: String) -> String {
    format!("\\left({latex}\\right)")
}

/// Writes every reported step as a `dmath` block, to be included in a latex
/// document.
pub struct LatexSink<W: Write> {
    out: W,
    error: Option<std::io::Error>,
}

impl<W: Write> LatexSink<W> {
    pub fn new(out: W) -> LatexSink<W> {
        LatexSink { out, error: None }
    }

    fn write(&mut self, report: &Report) -> std::io::Result<()> {
        let after = report.tree.subtree_latex(report.node);
        writeln!(self.out, "{}", report.message)?;
        writeln!(self.out, "\\begin{{dmath}}")?;
        match (report.before, report.error) {
            (_, Some(err)) => writeln!(self.out, "{after} \\quad \\text{{{err}}}")?,
            (Some(before), None) => {
                let before = report.tree.subtree_latex(before);
                writeln!(self.out, "{before} \\rightarrow {after}")?
            }
            (None, None) => writeln!(self.out, "{after}")?,
        }
        writeln!(self.out, "\\end{{dmath}}")?;
        writeln!(self.out)
    }

    /// Get the writer back. Returns the first error encountered while
    /// writing, if any.
    pub fn finish(self) -> Result<W, Error> {
        match self.error {
            Some(err) => Err(err.into()),
            None => Ok(self.out),
        }
    }
}

impl<W: Write> Sink for LatexSink<W> {
    fn report(&mut self, report: &Report) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = self.write(report) {
            self.error = Some(err);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::parse;

    fn latex(text: &str) -> String {
        parse(text).unwrap().to_latex()
    }

    #[test]
    fn t_functions() {
        assert_eq!("\\sqrt{x}", latex("sqrt(x)"));
        assert_eq!("\\sin\\left({{2}\\cdot{x}}\\right)", latex("sin(2*x)"));
        assert_eq!("\\cos\\left({{x}^{2}}\\right)", latex("cos(x^2)"));
        assert_eq!("\\ln\\left({{x}^{2}}\\right)", latex("ln(x^2)"));
        assert_eq!("e^{\\left({x}^{2}\\right)}", latex("exp(x^2)"));
        assert_eq!("e^{x}", latex("exp(x)"));
        assert_eq!("\\cot\\left({x}\\right)", latex("ctg(x)"));
        assert_eq!("\\operatorname{arccot}\\left({x}\\right)", latex("arcctg(x)"));
        assert_eq!("\\tanh\\left({x}\\right)", latex("th(x)"));
    }

    #[test]
    fn t_binary() {
        assert_eq!("{x} + {y}", latex("x + y"));
        assert_eq!("{\\left({x} + {y}\\right)} - {z}", latex("x + y - z"));
        assert_eq!("{\\left({x} + {y}\\right)}\\cdot{z}", latex("(x + y) * z"));
        assert_eq!("\\dfrac{x}{y}", latex("x / y"));
        assert_eq!("\\dfrac{\\left(\\dfrac{x}{y}\\right)}{z}", latex("x / y / z"));
        assert_eq!("{\\left(\\sin\\left({x}\\right)\\right)}^{2}", latex("sin(x)^2"));
        assert_eq!("{\\left(10\\right)}^{\\left({x} + {1}\\right)}", latex("10^(x + 1)"));
    }

    #[test]
    fn t_negative_numbers() {
        let mut tree = parse("x * 2").unwrap();
        let two = 1;
        let minus = tree.number(-2.).unwrap();
        tree.replace(two, minus).unwrap();
        assert_eq!("{x}\\cdot{\\left(-2\\right)}", tree.to_latex());
    }

    #[test]
    fn t_latex_sink() {
        let tree = parse("x^2").unwrap();
        let root = tree.root().unwrap();
        let mut sink = LatexSink::new(Vec::new());
        tree.report(&mut sink, root, None, "We get");
        let out = String::from_utf8(sink.finish().unwrap()).unwrap();
        assert_eq!(out, "We get\n\\begin{dmath}\n{x}^{2}\n\\end{dmath}\n\n");
    }
}
