use criterion::{Criterion, criterion_group, criterion_main};
use difftree::{NullSink, Tree, parse};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::hint::black_box;

const N_QUERIES: usize = 512;
const RANGE: (f64, f64) = (0.1, 10.);

fn sample_range(range: (f64, f64), rng: &mut StdRng) -> f64 {
    range.0 + rng.random::<f64>() * (range.1 - range.0)
}

fn queries() -> Vec<(f64, f64)> {
    let mut rng = StdRng::seed_from_u64(234);
    (0..N_QUERIES)
        .map(|_| (sample_range(RANGE, &mut rng), sample_range(RANGE, &mut rng)))
        .collect()
}

fn run(tree: &mut Tree, queries: &[(f64, f64)], outputs: &mut Vec<f64>) {
    outputs.clear();
    for &(x, y) in queries {
        tree.set_variable('x', x).unwrap();
        tree.set_variable('y', y).unwrap();
        outputs.push(tree.evaluate_tree().unwrap());
    }
}

fn b_expression_eval(c: &mut Criterion) {
    let mut tree = parse("sqrt((x - 3)^2 + (y - 4)^2) - ln(x * y + 1) / th(x / y)").unwrap();
    let queries = queries();
    let mut outputs = Vec::with_capacity(N_QUERIES);
    c.bench_function("expression_value_eval", |b| {
        b.iter(|| run(&mut tree, black_box(&queries), &mut outputs))
    });
}

fn b_gradient_eval(c: &mut Criterion) {
    let mut tree = parse("sin(x * y) + x^3 / (y + 1) - exp(0 - x / y)").unwrap();
    tree.differentiate_n('x', 1, &mut NullSink).unwrap();
    let queries = queries();
    let mut outputs = Vec::with_capacity(N_QUERIES);
    c.bench_function("partial_derivative_eval", |b| {
        b.iter(|| run(&mut tree, black_box(&queries), &mut outputs))
    });
}

criterion_group!(bench, b_expression_eval, b_gradient_eval);
criterion_main!(bench);
