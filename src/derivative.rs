use crate::{
    error::Error,
    ops::Op::{self, *},
    report::Sink,
    tree::{Node::*, Tree},
    walk::post_order,
};
use tracing::debug;

impl Tree {
    fn negate(&mut self, index: usize) -> Result<usize, Error> {
        let minus_one = self.number(-1.)?;
        self.binary(Mul, minus_one, index)
    }

    /// Copy of the subtree at `index`, raised to the power 2.
    fn copy_squared(&mut self, index: usize) -> Result<usize, Error> {
        let copy = self.copy_subtree(index)?;
        let two = self.number(2.)?;
        self.binary(Pow, copy, two)
    }

    /// Copy the subtree at `index` and apply the unary `op` to it.
    fn copy_unary(&mut self, op: Op, index: usize) -> Result<usize, Error> {
        let copy = self.copy_subtree(index)?;
        self.unary(op, copy)
    }

    /// `1 - a^2` or `1 + a^2`, for the derivatives of inverse trig functions.
    fn one_and_square(&mut self, op: Op, index: usize) -> Result<usize, Error> {
        let one = self.number(1.)?;
        let square = self.copy_squared(index)?;
        self.binary(op, one, square)
    }

    /// Build the derivative of the single node at `index` from the
    /// derivatives of its operands, which are looked up in `derivs`. Operands
    /// whose derivative is not needed by the rule have no entry there.
    fn derive_node(
        &mut self,
        index: usize,
        var: u64,
        depends: &[bool],
        derivs: &[Option<usize>],
        sink: &mut impl Sink,
    ) -> Result<usize, Error> {
        let deriv_of = |i: usize| derivs[i].ok_or(Error::NullArgument);
        let deriv = match *self.node(index) {
            Number(_) => return self.number(0.),
            Variable(hash) => return self.number(if hash == var { 1. } else { 0. }),
            Unary(op, a) => {
                let da = deriv_of(a)?;
                match op {
                    Exp => {
                        let exp = self.copy_unary(Exp, a)?;
                        self.binary(Mul, exp, da)?
                    }
                    Sqrt => {
                        let two = self.number(2.)?;
                        let sqrt = self.copy_unary(Sqrt, a)?;
                        let denom = self.binary(Mul, two, sqrt)?;
                        self.binary(Div, da, denom)?
                    }
                    Log => {
                        let ca = self.copy_subtree(a)?;
                        self.binary(Div, da, ca)?
                    }
                    Sin => {
                        let cos = self.copy_unary(Cos, a)?;
                        self.binary(Mul, cos, da)?
                    }
                    Cos => {
                        let sin = self.copy_unary(Sin, a)?;
                        let prod = self.binary(Mul, sin, da)?;
                        self.negate(prod)?
                    }
                    Tan => {
                        let cos = self.copy_unary(Cos, a)?;
                        let two = self.number(2.)?;
                        let cos2 = self.binary(Pow, cos, two)?;
                        self.binary(Div, da, cos2)?
                    }
                    Ctg => {
                        let sin = self.copy_unary(Sin, a)?;
                        let two = self.number(2.)?;
                        let sin2 = self.binary(Pow, sin, two)?;
                        let quot = self.binary(Div, da, sin2)?;
                        self.negate(quot)?
                    }
                    Sh => {
                        let ch = self.copy_unary(Ch, a)?;
                        self.binary(Mul, ch, da)?
                    }
                    Ch => {
                        let sh = self.copy_unary(Sh, a)?;
                        self.binary(Mul, sh, da)?
                    }
                    Th => {
                        let ch = self.copy_unary(Ch, a)?;
                        let two = self.number(2.)?;
                        let ch2 = self.binary(Pow, ch, two)?;
                        self.binary(Div, da, ch2)?
                    }
                    Asin => {
                        let diff = self.one_and_square(Sub, a)?;
                        let root = self.unary(Sqrt, diff)?;
                        self.binary(Div, da, root)?
                    }
                    Acos => {
                        let diff = self.one_and_square(Sub, a)?;
                        let root = self.unary(Sqrt, diff)?;
                        let quot = self.binary(Div, da, root)?;
                        self.negate(quot)?
                    }
                    Atan => {
                        let sum = self.one_and_square(Add, a)?;
                        self.binary(Div, da, sum)?
                    }
                    Actg => {
                        let sum = self.one_and_square(Add, a)?;
                        let quot = self.binary(Div, da, sum)?;
                        self.negate(quot)?
                    }
                    Add | Sub | Mul | Div | Pow => return Err(Error::ArityMismatch(op)),
                }
            }
            Binary(op, a, b) => match op {
                Add | Sub => self.binary(op, deriv_of(a)?, deriv_of(b)?)?,
                Mul => {
                    let cb = self.copy_subtree(b)?;
                    let lhs = self.binary(Mul, deriv_of(a)?, cb)?;
                    let ca = self.copy_subtree(a)?;
                    let rhs = self.binary(Mul, ca, deriv_of(b)?)?;
                    self.binary(Add, lhs, rhs)?
                }
                Div if depends[b] => {
                    // Quotient rule.
                    let cb = self.copy_subtree(b)?;
                    let lhs = self.binary(Mul, deriv_of(a)?, cb)?;
                    let ca = self.copy_subtree(a)?;
                    let rhs = self.binary(Mul, ca, deriv_of(b)?)?;
                    let numer = self.binary(Sub, lhs, rhs)?;
                    let denom = self.copy_squared(b)?;
                    self.binary(Div, numer, denom)?
                }
                Div => {
                    let cb = self.copy_subtree(b)?;
                    self.binary(Div, deriv_of(a)?, cb)?
                }
                Pow => match (depends[a], depends[b]) {
                    (true, true) => {
                        // a^b = exp(b * ln(a)), and the product rule gives
                        // d(b * ln(a)) = db * ln(a) + b * (da / a).
                        let cb = self.copy_subtree(b)?;
                        let log = self.copy_unary(Log, a)?;
                        let inner = self.binary(Mul, cb, log)?;
                        let exp = self.unary(Exp, inner)?;
                        let log = self.copy_unary(Log, a)?;
                        let lhs = self.binary(Mul, deriv_of(b)?, log)?;
                        let ca = self.copy_subtree(a)?;
                        let dlog = self.binary(Div, deriv_of(a)?, ca)?;
                        let cb = self.copy_subtree(b)?;
                        let rhs = self.binary(Mul, cb, dlog)?;
                        let dinner = self.binary(Add, lhs, rhs)?;
                        self.binary(Mul, exp, dinner)?
                    }
                    (true, false) => {
                        let cb = self.copy_subtree(b)?;
                        let cb2 = self.copy_subtree(b)?;
                        let one = self.number(1.)?;
                        let exponent = self.binary(Sub, cb2, one)?;
                        let ca = self.copy_subtree(a)?;
                        let pow = self.binary(Pow, ca, exponent)?;
                        let scaled = self.binary(Mul, cb, pow)?;
                        self.binary(Mul, scaled, deriv_of(a)?)?
                    }
                    (false, true) => {
                        let ca = self.copy_subtree(a)?;
                        let cb = self.copy_subtree(b)?;
                        let pow = self.binary(Pow, ca, cb)?;
                        let log = self.copy_unary(Log, a)?;
                        let prod = self.binary(Mul, pow, log)?;
                        self.binary(Mul, prod, deriv_of(b)?)?
                    }
                    (false, false) => self.number(0.)?,
                },
                Exp | Sqrt | Log | Sin | Cos | Tan | Ctg | Sh | Ch | Th | Asin | Acos | Atan
                | Actg => return Err(Error::ArityMismatch(op)),
            },
        };
        self.report(sink, deriv, Some(index), "Differentiating a step");
        Ok(deriv)
    }

    /**
    Build the derivative of the subtree at `index` with respect to the
    variable with hash `var`, and return the root of the new subtree.

    The original subtree is only read, never modified. Wherever the
    derivative needs the original operands, it uses fresh deep copies of
    them, so the returned subtree shares no nodes with the original.

    The subtree is visited children first. Only the nodes whose derivative
    is used by the rule of their parent are differentiated, so operands that
    don't depend on the variable are skipped where the rule allows it.
    */
    fn derive(&mut self, index: usize, var: u64, sink: &mut impl Sink) -> Result<usize, Error> {
        let order = post_order(self.nodes(), index);
        let mut depends = vec![false; self.len()];
        for &i in &order {
            depends[i] = match *self.node(i) {
                Number(_) => false,
                Variable(hash) => hash == var,
                Unary(_, a) => depends[a],
                Binary(_, a, b) => depends[a] || depends[b],
            };
        }
        // Parents come before children in the reversed order.
        let mut needed = vec![false; self.len()];
        needed[index] = true;
        for &i in order.iter().rev() {
            if !needed[i] {
                continue;
            }
            match *self.node(i) {
                Number(_) | Variable(_) => {}
                Unary(_, a) => needed[a] = true,
                Binary(op, a, b) => {
                    let (da, db) = match op {
                        Div => (true, depends[b]),
                        Pow => (depends[a], depends[b]),
                        _ => (true, true),
                    };
                    needed[a] = da;
                    needed[b] = db;
                }
            }
        }
        let mut derivs: Vec<Option<usize>> = vec![None; self.len()];
        for &i in &order {
            if needed[i] {
                let deriv = self.derive_node(i, var, &depends, &derivs, sink)?;
                derivs[i] = Some(deriv);
            }
        }
        derivs[index].ok_or(Error::NullArgument)
    }

    /// Replace the subtree at `index` with its derivative with respect to the
    /// variable whose symbol hashes to `var`, and return the index of the
    /// derivative. The replaced node is retired.
    pub fn differentiate(
        &mut self,
        index: usize,
        var: u64,
        sink: &mut impl Sink,
    ) -> Result<usize, Error> {
        self.check(index)?;
        let deriv = self.derive(index, var, sink)?;
        self.replace(index, deriv)?;
        debug!(
            "Differentiated node {index} into {deriv}, arena has {} nodes",
            self.len()
        );
        self.report(sink, deriv, Some(index), "Taking the derivative we get");
        Ok(deriv)
    }

    /// Hash of a variable that must exist in the registry.
    pub(crate) fn defined_variable(&self, symbol: char) -> Result<u64, Error> {
        self.variable_by_symbol(symbol)
            .map(|v| v.hash)
            .ok_or(Error::UndefinedVariable(symbol))
    }

    /// Replace the whole tree with its derivative with respect to `var`.
    pub fn differentiate_tree(&mut self, var: char, sink: &mut impl Sink) -> Result<(), Error> {
        let hash = self.defined_variable(var)?;
        let root = self.root_index()?;
        self.differentiate(root, hash, sink)?;
        Ok(())
    }

    /// Replace the tree with its `n`-th derivative with respect to `var`. The
    /// tree is simplified before the first and after every differentiation,
    /// and flushed after every differentiation.
    pub fn differentiate_n(&mut self, var: char, n: usize, sink: &mut impl Sink) -> Result<(), Error> {
        self.defined_variable(var)?;
        let root = self.root_index()?;
        self.report(sink, root, None, "The original expression is");
        self.simplify(sink)?;
        for order in 1..=n {
            self.differentiate_tree(var, sink)?;
            self.simplify(sink)?;
            self.flush();
            debug!("Derivative of order {order} has {} nodes", self.len());
            let root = self.root_index()?;
            self.report(sink, root, None, "The derivative of the expression is");
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        hash::hash_symbol,
        parser::parse,
        report::{MessageSink, NullSink},
        test::util::compare_trees,
    };

    fn derivative(text: &str) -> Tree {
        let mut tree = parse(text).unwrap();
        tree.differentiate_tree('x', &mut NullSink).unwrap();
        tree
    }

    fn check_derivative(text: &str, expected: &str, vardata: &[(char, f64, f64)], eps: f64) {
        compare_trees(&derivative(text), &parse(expected).unwrap(), vardata, 50, eps);
    }

    #[test]
    fn t_at_point() {
        let mut tree = derivative("x^2");
        tree.set_variable('x', 3.).unwrap();
        assert_eq!(tree.evaluate_tree(), Ok(6.));
        let mut tree = derivative("sin(x)");
        tree.set_variable('x', 0.).unwrap();
        assert_eq!(tree.evaluate_tree(), Ok(1.));
    }

    #[test]
    fn t_leaves() {
        let tree = derivative("x");
        assert_eq!(tree.node(tree.root().unwrap()), &Number(1.));
        let tree = derivative("x + y - 3");
        compare_trees(&tree, &parse("1").unwrap(), &[('x', -1., 1.), ('y', -1., 1.)], 5, 0.);
    }

    #[test]
    fn t_arithmetic() {
        let xy = [('x', 0.5, 5.), ('y', -5., 5.)];
        check_derivative("x*y", "y", &xy, 0.);
        check_derivative("x/y", "1/y", &[('x', -5., 5.), ('y', 0.5, 5.)], 1e-15);
        check_derivative("y/x", "0 - y/x^2", &xy, 1e-13);
        check_derivative("3*x^2 + 2*x - 7", "6*x + 2", &[('x', -10., 10.)], 1e-12);
    }

    #[test]
    fn t_powers() {
        let x = [('x', 0.5, 3.)];
        check_derivative("x^3", "3*x^2", &x, 1e-12);
        check_derivative("2^x", "2^x*ln(2)", &x, 1e-14);
        check_derivative("x^x", "x^x*(ln(x) + 1)", &x, 1e-10);
        check_derivative("x + y^3", "1", &[('x', -1., 1.), ('y', -2., 2.)], 0.);
    }

    #[test]
    fn t_exp_log() {
        check_derivative("exp(2*x)", "2*exp(2*x)", &[('x', -3., 3.)], 1e-12);
        check_derivative("ln(x^2)", "2/x", &[('x', 0.1, 10.)], 1e-12);
        check_derivative("sqrt(x)", "1/(2*sqrt(x))", &[('x', 0.1, 10.)], 1e-14);
    }

    #[test]
    fn t_trigonometry() {
        check_derivative("sin(x)", "cos(x)", &[('x', -5., 5.)], 0.);
        check_derivative("cos(x)", "0 - sin(x)", &[('x', -5., 5.)], 0.);
        check_derivative("tan(x)", "1/cos(x)^2", &[('x', -1.2, 1.2)], 1e-12);
        check_derivative("ctg(x)", "0 - 1/sin(x)^2", &[('x', 0.2, 3.)], 1e-12);
        check_derivative("sin(x^2)", "cos(x^2)*2*x", &[('x', -2., 2.)], 1e-13);
    }

    #[test]
    fn t_hyperbolic() {
        let x = [('x', -3., 3.)];
        check_derivative("sh(x)", "ch(x)", &x, 0.);
        check_derivative("ch(x)", "sh(x)", &x, 0.);
        check_derivative("th(x)", "1/ch(x)^2", &x, 1e-15);
    }

    #[test]
    fn t_inverse_trigonometry() {
        let x = [('x', -0.9, 0.9)];
        check_derivative("arcsin(x)", "1/sqrt(1 - x^2)", &x, 1e-14);
        check_derivative("arccos(x)", "0 - 1/sqrt(1 - x^2)", &x, 1e-14);
        check_derivative("arctg(x)", "1/(1 + x^2)", &x, 1e-15);
        check_derivative("arcctg(x)", "0 - 1/(1 + x^2)", &x, 1e-15);
    }

    #[test]
    fn t_original_untouched() {
        let mut tree = parse("sin(x) + y").unwrap();
        let root = tree.root().unwrap();
        let lhs = match tree.node(root) {
            Binary(Add, lhs, _) => *lhs,
            _ => panic!("Expected addition at the root"),
        };
        let before = *tree.node(lhs);
        let deriv = tree
            .differentiate(lhs, hash_symbol('x'), &mut NullSink)
            .unwrap();
        assert_eq!(tree.node(lhs), &before);
        assert_eq!(tree.retired(), &[lhs]);
        assert_eq!(tree.parent(deriv), Some(root));
        assert!(matches!(tree.node(root), Binary(Add, l, _) if *l == deriv));
        compare_trees(
            &tree,
            &parse("cos(x) + y").unwrap(),
            &[('x', -3., 3.), ('y', -3., 3.)],
            10,
            0.,
        );
    }

    #[test]
    fn t_undefined_variable() {
        let mut tree = parse("5 + y").unwrap();
        assert_eq!(
            tree.differentiate_tree('x', &mut NullSink),
            Err(Error::UndefinedVariable('x'))
        );
        assert_eq!(
            tree.differentiate_n('x', 2, &mut NullSink),
            Err(Error::UndefinedVariable('x'))
        );
        assert!(tree.retired().is_empty());
    }

    #[test]
    fn t_differentiate_n() {
        let mut tree = parse("x^3").unwrap();
        tree.differentiate_n('x', 2, &mut NullSink).unwrap();
        assert!(tree.retired().is_empty());
        assert_eq!(tree.len(), tree.live_len());
        compare_trees(&tree, &parse("6*x").unwrap(), &[('x', -5., 5.)], 20, 1e-13);
        tree.differentiate_n('x', 1, &mut NullSink).unwrap();
        assert_eq!(tree.nodes(), &[Number(6.)]);
        tree.differentiate_n('x', 1, &mut NullSink).unwrap();
        assert_eq!(tree.nodes(), &[Number(0.)]);
    }

    #[test]
    fn t_deep_sum() {
        let mut tree = parse(&format!("x{}", "+x".repeat(20000))).unwrap();
        tree.differentiate_n('x', 1, &mut NullSink).unwrap();
        assert_eq!(tree.nodes(), &[Number(20001.)]);
        let mut tree = parse(&format!("x{}", "*x".repeat(200))).unwrap();
        tree.differentiate_tree('x', &mut NullSink).unwrap();
        tree.set_variable('x', 1.).unwrap();
        assert_eq!(tree.evaluate_tree(), Ok(201.));
    }

    #[test]
    fn t_skipped_operands() {
        // Operands that don't depend on the variable are only copied.
        let mut tree = parse("x / (y + 1) + 2^y").unwrap();
        let before = tree.len();
        tree.differentiate_tree('x', &mut NullSink).unwrap();
        let built = tree.len() - before;
        // d(x) / copy(y + 1) + 0
        assert_eq!(built, 7);
        compare_trees(
            &tree,
            &parse("1 / (y + 1)").unwrap(),
            &[('x', -2., 2.), ('y', 0., 2.)],
            20,
            0.,
        );
    }

    #[test]
    fn t_second_derivative() {
        let mut tree = parse("sin(x)*exp(x)").unwrap();
        let mut sink = MessageSink::default();
        tree.differentiate_n('x', 2, &mut sink).unwrap();
        compare_trees(
            &tree,
            &parse("2*cos(x)*exp(x)").unwrap(),
            &[('x', -2., 2.)],
            50,
            1e-13,
        );
        let orders = sink
            .messages
            .iter()
            .filter(|m| *m == "The derivative of the expression is")
            .count();
        assert_eq!(orders, 2);
    }
}
