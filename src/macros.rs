/// Assert that the floating point numbers are equal within the given epsilon.
#[macro_export]
macro_rules! assert_float_eq {
    ($a:expr, $b:expr, $eps:expr, $debug:expr) => {{
        // Make variables to avoid evaluating experssions multiple times.
        let a = $a;
        let b = $b;
        let eps = $eps;
        let error = f64::abs(a - b);
        if error > eps {
            eprintln!("{:?}", $debug);
        }
        assert!(
            error <= eps,
            "Assertion failed: |({}) - ({})| = {:e} <= {:e}",
            a,
            b,
            error,
            eps
        );
    }};
    ($a:expr, $b:expr, $eps:expr) => {
        $crate::assert_float_eq!($a, $b, $eps, "")
    };
    ($a:expr, $b:expr) => {
        $crate::assert_float_eq!($a, $b, f64::EPSILON)
    };
}

/// Parse the infix expression and bind the given variables, for use in
/// tests and benchmarks. Panics if the text doesn't parse or a variable is
/// missing.
///
/// ```
/// let tree = difftree::deftree!("x * y + 1", x = 2., y = 3.);
/// assert_eq!(tree.evaluate_tree().unwrap(), 7.);
/// ```
#[macro_export]
macro_rules! deftree {
    ($text:expr) => {
        $crate::parser::parse($text).unwrap()
    };
    ($text:expr, $($var:ident = $value:expr),+ $(,)?) => {{
        let mut tree = $crate::parser::parse($text).unwrap();
        $(
            tree.set_variable(stringify!($var).chars().next().unwrap(), $value)
                .unwrap();
        )+
        tree
    }};
}
