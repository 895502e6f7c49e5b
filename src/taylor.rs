use crate::{
    error::Error,
    ops::Op::*,
    report::Sink,
    tree::Tree,
};
use tracing::debug;

impl Tree {
    /// Evaluate the working copy at `x0` for the taylor expansion. Failures
    /// are reported to `sink` before being returned.
    fn eval_at(&mut self, var: char, x0: f64, sink: &mut impl Sink) -> Result<f64, Error> {
        self.set_variable(var, x0)?;
        let root = self.root_index()?;
        self.evaluate(root).inspect_err(|err| {
            self.report_error(sink, root, err, "Cannot evaluate the derivative");
        })
    }

    /**
    Build the taylor polynomial of this tree with `n` terms, about `x0`, in
    the variable `var`:

    sum over k in 0..n of f⁽ᵏ⁾(x0) / k! * (var - x0)^k

    This tree is not modified. The derivatives are computed on a private
    copy, so any other variables in the tree must already have values. The
    returned tree is simplified, and only refers to `var`. With `n == 0` the
    result is the constant 0.
    */
    pub fn taylor_expansion(
        &self,
        var: char,
        x0: f64,
        n: usize,
        sink: &mut impl Sink,
    ) -> Result<Tree, Error> {
        let hash = self.defined_variable(var)?;
        let mut work = self.clone();
        work.simplify(sink)?;
        let mut out = Tree::new();
        out.register_variable(var)?;
        let mut sum: Option<usize> = None;
        let mut factorial = 1.;
        for k in 0..n {
            if k > 0 {
                work.differentiate_tree(var, sink)?;
                work.simplify(sink)?;
                work.flush();
                factorial *= k as f64;
            }
            let value = work.eval_at(var, x0, sink)?;
            debug!("Taylor coefficient {k}: {value} / {factorial}");
            let coeff = {
                let value = out.number(value)?;
                let factorial = out.number(factorial)?;
                out.binary(Div, value, factorial)?
            };
            let power = {
                let x = out.variable(hash)?;
                let x0 = out.number(x0)?;
                let diff = out.binary(Sub, x, x0)?;
                let k = out.number(k as f64)?;
                out.binary(Pow, diff, k)?
            };
            let term = out.binary(Mul, coeff, power)?;
            sum = Some(match sum {
                Some(sum) => out.binary(Add, sum, term)?,
                None => term,
            });
        }
        let root = match sum {
            Some(sum) => sum,
            None => out.number(0.)?,
        };
        out.set_root(root)?;
        out.simplify(sink)?;
        out.flush();
        out.report(sink, 0, None, "The taylor expansion is");
        Ok(out)
    }

    /// Get the first `n` derivatives of this tree with respect to `var`, in
    /// increasing order, each simplified. This tree is not modified.
    pub fn derivatives(&self, var: char, n: usize, sink: &mut impl Sink) -> Result<Vec<Tree>, Error> {
        self.defined_variable(var)?;
        let mut work = self.clone();
        work.simplify(sink)?;
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            work.differentiate_tree(var, sink)?;
            work.simplify(sink)?;
            work.flush();
            out.push(work.clone());
        }
        Ok(out)
    }
}
