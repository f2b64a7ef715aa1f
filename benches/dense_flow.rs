// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use criterion::{criterion_group, criterion_main, Criterion};
use nalgebra::DMatrix;
use visual_dead_reckoning_rs::core::flow;

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("dense_flow 3 levels 480x640", |b| {
        let config = flow::Config {
            levels: 3,
            window: 2,
            iterations: 3,
            smoothing: 1,
        };
        let frame = |shift: f32| -> DMatrix<u8> {
            DMatrix::from_fn(480, 640, |i, j| {
                let x = j as f32 - shift;
                let y = i as f32;
                (128.0 + 60.0 * (0.2 * x).sin() * (0.15 * y).cos()).round() as u8
            })
        };
        let first = frame(0.0);
        let second = frame(1.5);
        b.iter(|| {
            let mut estimator = flow::Estimator::new(config.clone());
            estimator.estimate(&first);
            estimator.estimate(&second)
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
