pub(crate) mod util {
    use crate::{assert_float_eq, parser::parse, tree::Tree};
    use rand::{Rng, SeedableRng, rngs::StdRng};

    /// Install a subscriber that prints log events to the test output. Safe
    /// to call from many tests.
    pub fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    }

    /// Helper for sampling multiple variables at once.
    pub struct Sampler {
        samples_per_var: usize,
        var_samples: Vec<f64>,
        sample: Vec<f64>,
        counter: Vec<usize>,
        done: bool,
    }

    impl Sampler {
        /**
        Create a sampler for all the variables. `vardata` should contain a
        tuple of (variable symbol, lower bound, upper bound). The variables
        are sampled between the bounds, `samples_per_var` times.
        */
        pub fn new(vardata: &[(char, f64, f64)], samples_per_var: usize, seed: u64) -> Sampler {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut var_samples = Vec::with_capacity(vardata.len() * samples_per_var);
            for &(_symbol, lower, upper) in vardata {
                let span = upper - lower;
                for _ in 0..samples_per_var {
                    var_samples.push(lower + rng.random::<f64>() * span);
                }
            }
            Sampler {
                samples_per_var,
                var_samples,
                sample: vec![f64::NAN; vardata.len()],
                counter: vec![0; vardata.len()],
                done: false,
            }
        }

        pub fn next(&mut self) -> Option<&[f64]> {
            if self.done {
                return None;
            }
            for (i, c) in self.counter.iter().enumerate() {
                self.sample[i] = self.var_samples[i * self.samples_per_var + *c];
            }
            for c in self.counter.iter_mut() {
                *c += 1;
                if *c < self.samples_per_var {
                    break;
                } else {
                    *c = 0;
                }
            }
            if self.counter.iter().all(|c| *c == 0) {
                self.done = true;
            }
            Some(&self.sample)
        }
    }

    /// Assign the sampled values to the variables of `tree`. Symbols that
    /// don't appear in the tree are skipped.
    fn bind(tree: &mut Tree, symbols: &[char], sample: &[f64]) {
        for (&symbol, &value) in symbols.iter().zip(sample.iter()) {
            if tree.variable_by_symbol(symbol).is_some() {
                tree.set_variable(symbol, value).unwrap();
            }
        }
    }

    /**
    Helper function to evaluate the tree parsed from `text` with randomly
    sampled variable values and compare the result to the one returned by the
    `expectedfn` for the same inputs. The values must be within `eps` of each
    other.

    Each variable is sampled within the range indicated by the corresponding
    entry in `vardata`. Each entry in vardata consists of the symbol of the
    variable, lower bound and upper bound.
    */
    pub fn check_tree_eval<F>(
        text: &str,
        expectedfn: F,
        vardata: &[(char, f64, f64)],
        samples_per_var: usize,
        eps: f64,
    ) where
        F: Fn(&[f64]) -> f64,
    {
        let mut tree = parse(text).unwrap();
        let mut sampler = Sampler::new(vardata, samples_per_var, 42);
        let symbols: Vec<_> = vardata.iter().map(|(symbol, ..)| *symbol).collect();
        while let Some(sample) = sampler.next() {
            bind(&mut tree, &symbols, sample);
            let result = tree.evaluate_tree().unwrap();
            assert_float_eq!(expectedfn(sample), result, eps, sample);
        }
    }

    /// Compare `tree1` and `tree2` by evaluating them at randomly sampled
    /// values. The `vardata` slice is expected to contain tuples in the format
    /// (symbol, min, max), where the symbol is that of a variable in the
    /// trees, and [min, max] represents the range from which the values for
    /// that variable can be randomly sampled. Each variable will be sampled
    /// `samples_per_var` times, and the trees will be compared at all
    /// combinations of samples. That means, if the trees contain 2 variables
    /// each and `samples_per_var` is 20, then the trees will be evaluated and
    /// compared with 20 ^ 2 = 400 different samples. This test asserts that
    /// the values of the two trees do not differ by more than `eps` at all the
    /// samples.
    pub fn compare_trees(
        tree1: &Tree,
        tree2: &Tree,
        vardata: &[(char, f64, f64)],
        samples_per_var: usize,
        eps: f64,
    ) {
        let mut tree1 = tree1.clone();
        let mut tree2 = tree2.clone();
        let mut sampler = Sampler::new(vardata, samples_per_var, 42);
        let symbols: Vec<_> = vardata.iter().map(|(symbol, ..)| *symbol).collect();
        while let Some(sample) = sampler.next() {
            bind(&mut tree1, &symbols, sample);
            bind(&mut tree2, &symbols, sample);
            let a = tree1.evaluate_tree().unwrap();
            let b = tree2.evaluate_tree().unwrap();
            assert_float_eq!(a, b, eps, sample);
        }
    }
}
