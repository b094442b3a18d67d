use std::fmt::Write;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use pierre::{clean, evaluate};

// ------------- Document -------------
// a document with `hypotheses` priors, `rounds` evidence blocks and some prose between them
fn document(hypotheses: usize, rounds: usize) -> String {
    let mut text = String::from("# Benchmark\n\nA base rate of `base = 1/100`.\n\n    @priors\n");
    for h in 0..hypotheses {
        writeln!(text, "    h{h}: base + {h}").unwrap();
    }
    for r in 0..rounds {
        writeln!(text, "\nRound {r} uses `w{r} = {r} / {rounds}` as weight.\n\n    @evidence: round {r}").unwrap();
        for h in 0..hypotheses {
            writeln!(text, "    h{h}: (1 + {h} * w{r}) / {hypotheses}").unwrap();
        }
    }
    text
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let small = document(2, 1);
    let medium = document(10, 10);
    let large = document(50, 100);
    c.bench_function("evaluate small", |b| b.iter(|| evaluate(black_box(&small))));
    c.bench_function("evaluate medium", |b| b.iter(|| evaluate(black_box(&medium))));
    c.bench_function("evaluate large", |b| b.iter(|| evaluate(black_box(&large))));

    let (annotated, hypotheses) = evaluate(&large).unwrap();
    println!("{} hypotheses, {} bytes annotated", hypotheses.len(), annotated.len());
    c.bench_function("clean large", |b| b.iter(|| clean(black_box(&annotated))));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
