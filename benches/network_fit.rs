use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use ndarray::{Array1, Array2};
use rand::distributions::Standard;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use showerfit::model::{
    HyperParameters, NetworkConfig, NetworkFactory, PipelineFactory, Regressor, RegressorFactory,
};
use showerfit::validate::{KFold, cross_val_score};

fn random_problem(rows: usize) -> (Array2<f64>, Array1<f64>) {
    let mut rng = StdRng::seed_from_u64(0x5EED_F64 + rows as u64);
    let x = Array2::from_shape_fn((rows, 4), |_| rng.sample::<f64, _>(Standard));
    let y = x.rows().into_iter().map(|r| 0.5 * r[0] - r[2] + 0.25).collect();
    (x, y)
}

fn factory(training: HyperParameters) -> PipelineFactory<NetworkFactory> {
    let network = NetworkFactory::new(NetworkConfig::default(), training, 7)
        .expect("default network config is valid");
    PipelineFactory::new(network)
}

fn benchmark_fit(c: &mut Criterion) {
    let training = HyperParameters {
        batch_size: 10,
        epochs: 10,
    };
    let mut group = c.benchmark_group("network_fit");
    for rows in [100_usize, 500, 2000] {
        let (x, y) = random_problem(rows);
        group.throughput(Throughput::Elements((rows * training.epochs) as u64));
        group.bench_with_input(BenchmarkId::new("pipeline", rows), &(x, y), |b, (x, y)| {
            let factory = factory(training);
            b.iter(|| {
                let mut model = factory.build();
                model
                    .fit(black_box(x.view()), black_box(y.view()))
                    .expect("fit succeeds");
                black_box(model);
            });
        });
    }
    group.finish();
}

fn benchmark_cross_validation(c: &mut Criterion) {
    let (x, y) = random_problem(340);
    let factory = factory(HyperParameters {
        batch_size: 20,
        epochs: 5,
    });
    c.bench_function("cross_val_score_17_folds", |b| {
        b.iter(|| {
            let cv = cross_val_score(&factory, x.view(), y.view(), &KFold::default())
                .expect("cross-validation succeeds");
            black_box(cv.mean_mse());
        });
    });
}

criterion_group!(network_fit, benchmark_fit, benchmark_cross_validation);
criterion_main!(network_fit);
