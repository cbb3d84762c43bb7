use criterion::{black_box, criterion_group, criterion_main, Criterion};
use elastic_mdp::mdp::{
    Action, Measurement, MdpModel, ParameterDomain, SolverSettings, SweepMode, ADD_VMS,
    NUMBER_OF_VMS, REMOVE_VMS,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn trained_model(sweep: SweepMode) -> MdpModel {
    let vms: Vec<f64> = (1..=10).map(f64::from).collect();
    let domains = vec![
        ParameterDomain::discrete(NUMBER_OF_VMS, &vms).unwrap(),
        ParameterDomain::from_limits("load", &[0.0, 25.0, 50.0, 75.0, 100.0]).unwrap(),
    ];
    let actions = vec![
        Action::new(ADD_VMS, 1),
        Action::new(REMOVE_VMS, 1),
        Action::new("no_op", 0),
    ];
    let settings = SolverSettings::new(0.9)
        .with_convergence_threshold(0.1)
        .with_sweep(sweep);
    let mut model = MdpModel::from_domains(domains, &actions, settings).unwrap();

    let mut rng = ChaCha8Rng::seed_from_u64(21);
    for _ in 0..200 {
        let legal = model.legal_actions();
        let action = legal[rng.gen_range(0..legal.len())].clone();
        let current = model
            .current_state()
            .parameter(NUMBER_OF_VMS)
            .unwrap()
            .lower();
        let next = match action.name.as_str() {
            ADD_VMS => current + 1.0,
            REMOVE_VMS => current - 1.0,
            _ => current,
        };
        let load: f64 = rng.gen_range(0.0..100.0);
        let measurement: Measurement = [
            (NUMBER_OF_VMS.to_string(), next),
            ("load".to_string(), load),
        ]
        .into_iter()
        .collect();
        let reward = (next * 10.0).min(load) - next;
        model.update(&action, &measurement, reward).unwrap();
    }
    model
}

fn bench_value_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("value_iteration");
    for (name, sweep) in [
        ("in_place", SweepMode::InPlace),
        ("synchronous", SweepMode::Synchronous),
    ] {
        let model = trained_model(sweep);
        group.bench_function(name, |b| {
            b.iter_batched(
                || model.clone(),
                |mut m| black_box(m.value_iteration_with_threshold(1e-6).unwrap()),
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_value_iteration);
criterion_main!(benches);
