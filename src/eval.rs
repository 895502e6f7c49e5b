use crate::{
    error::{Error, NumericError, Signal},
    ops::Op::{self, *},
    tree::{Node::*, Tree},
    walk::{pop_operand, post_order},
};

fn cot(x: f64) -> f64 {
    f64::cos(x) / f64::sin(x)
}

fn acot(x: f64) -> f64 {
    std::f64::consts::FRAC_PI_2 - f64::atan(x)
}

impl Op {
    /// Compute the raw result of the operation without checking it. `rhs` is
    /// ignored by unary operators.
    pub fn compute(&self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Add => lhs + rhs,
            Sub => lhs - rhs,
            Mul => lhs * rhs,
            Div => lhs / rhs,
            Pow => f64::powf(lhs, rhs),
            Exp => f64::exp(lhs),
            Sqrt => f64::sqrt(lhs),
            Log => f64::ln(lhs),
            Sin => f64::sin(lhs),
            Cos => f64::cos(lhs),
            Tan => f64::tan(lhs),
            Ctg => cot(lhs),
            Sh => f64::sinh(lhs),
            Ch => f64::cosh(lhs),
            Th => f64::tanh(lhs),
            Asin => f64::asin(lhs),
            Acos => f64::acos(lhs),
            Atan => f64::atan(lhs),
            Actg => acot(lhs),
        }
    }

    /// Check if the operation has a pole at the given operands, i.e. the
    /// exact result is an infinity.
    fn is_pole(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Div => rhs == 0.,
            Log => lhs == 0.,
            Pow => lhs == 0. && rhs < 0.,
            Ctg => f64::sin(lhs) == 0.,
            _ => false,
        }
    }

    /// Figure out which floating point exception, if any, would have been
    /// raised while computing `result` from the operands.
    fn classify(&self, lhs: f64, rhs: Option<f64>, result: f64) -> Option<Signal> {
        let operands = [Some(lhs), rhs];
        let operands = operands.iter().flatten();
        if result.is_nan() {
            return if operands.clone().any(|v| v.is_nan()) {
                None
            } else {
                Some(Signal::DomainError)
            };
        }
        if result.is_infinite() {
            if !operands.clone().all(|v| v.is_finite()) {
                return None;
            }
            return if self.is_pole(lhs, rhs.unwrap_or(0.)) {
                Some(Signal::DivisionByZero)
            } else {
                Some(Signal::Overflow)
            };
        }
        if result.is_subnormal() {
            return Some(Signal::Underflow);
        }
        if result == 0. && operands.clone().all(|v| v.is_finite()) {
            let underflow = match self {
                Mul => lhs != 0. && rhs.is_some_and(|r| r != 0.),
                Div | Pow => lhs != 0.,
                Exp => true,
                _ => false,
            };
            if underflow {
                return Some(Signal::Underflow);
            }
        }
        None
    }

    /// Compute the result of the operation, and check it for floating point
    /// exceptions. Binary operators require `rhs`.
    pub fn apply(&self, lhs: f64, rhs: Option<f64>) -> Result<f64, Error> {
        let rhs = match (self.is_unary(), rhs) {
            (true, _) => None,
            (false, Some(rhs)) => Some(rhs),
            (false, None) => return Err(Error::ArityMismatch(*self)),
        };
        let result = self.compute(lhs, rhs.unwrap_or(0.));
        match self.classify(lhs, rhs, result) {
            None => Ok(result),
            Some(signal) => {
                let err = NumericError {
                    op: *self,
                    lhs,
                    rhs,
                    signal,
                };
                tracing::warn!("{err}");
                Err(Error::Numeric(err))
            }
        }
    }
}

impl Tree {
    /// Evaluate the subtree at `index` with the current variable values.
    /// Operands are evaluated left to right, and the first failure is
    /// returned.
    pub fn evaluate(&self, index: usize) -> Result<f64, Error> {
        self.check(index)?;
        let mut values: Vec<f64> = Vec::new();
        for i in post_order(self.nodes(), index) {
            let value = match *self.node(i) {
                Number(value) => value,
                Variable(hash) => {
                    let var = self
                        .find_variable(hash)
                        .ok_or(Error::VariableNotFound(hash))?;
                    var.value.ok_or(Error::UnboundVariable(var.symbol))?
                }
                Unary(op, _) => op.apply(pop_operand(&mut values)?, None)?,
                Binary(op, _, _) => {
                    let rhs = pop_operand(&mut values)?;
                    let lhs = pop_operand(&mut values)?;
                    op.apply(lhs, Some(rhs))?
                }
            };
            values.push(value);
        }
        pop_operand(&mut values)
    }

    /// Evaluate the whole tree.
    pub fn evaluate_tree(&self) -> Result<f64, Error> {
        self.evaluate(self.root_index()?)
    }
}
