use criterion::{Criterion, criterion_group, criterion_main};
use nalgebra::DMatrix;
use phylogen::config::ModelConfig;
use phylogen::ctmc::{CtmcOptions, simulate};
use phylogen::generators::coalescent::simulate_coalescent;
use phylogen::generators::population::ConstantPopulation;
use phylogen::generators::{Coalescent, JukesCantor, LogNormal, PhyloCtmc};
use phylogen::graph::GraphicalModel;
use phylogen::newick;
use phylogen::random::RandomSource;
use phylogen::tree::TimeTree;

const TAXON_COUNTS: &[usize] = &[50, 500];

fn coalescent_tree(n: usize, seed: u64) -> TimeTree {
    let taxa: Vec<String> = (0..n).map(|i| format!("taxon_{}", i)).collect();
    let population = ConstantPopulation::new(10.0).unwrap();
    simulate_coalescent(&taxa, &population, &mut RandomSource::seeded(seed)).unwrap()
}

fn newick_round_trip(c: &mut Criterion) {
    for &n in TAXON_COUNTS {
        let tree = coalescent_tree(n, 1);
        let text = tree.to_newick(true);
        c.bench_function(&format!("write_newick_n{}", n), |b| {
            b.iter(|| tree.to_newick(true));
        });
        c.bench_function(&format!("parse_newick_n{}", n), |b| {
            b.iter(|| newick::parse_str(&text).unwrap());
        });
    }
}

fn coalescent_simulation(c: &mut Criterion) {
    for &n in TAXON_COUNTS {
        let mut seed = 0;
        c.bench_function(&format!("coalescent_n{}", n), |b| {
            b.iter(|| {
                seed += 1;
                coalescent_tree(n, seed)
            });
        });
    }
}

fn ctmc_simulation(c: &mut Criterion) {
    let tree = coalescent_tree(50, 2);
    let third = 1.0 / 3.0;
    let q = DMatrix::from_fn(4, 4, |i, j| if i == j { -1.0 } else { third });
    let options = CtmcOptions::default().with_length(1000);
    let config = ModelConfig::default();
    let mut rng = RandomSource::seeded(3);

    c.bench_function("ctmc_jc_n50_L1000", |b| {
        b.iter(|| simulate(&tree, &q, &options, &mut rng, &config).unwrap());
    });
}

fn model_resampling(c: &mut Criterion) {
    let mut model = GraphicalModel::with_config(ModelConfig::default().with_seed(4));
    let meanlog = model.constant(None, 3.0);
    let sdlog = model.constant(None, 1.0);
    let theta = model
        .sample(Some("theta"), LogNormal, &[("meanlog", meanlog), ("sdlog", sdlog)])
        .unwrap();
    let n = model.constant(Some("n"), 20);
    let psi = model.sample(Some("psi"), Coalescent, &[("theta", theta), ("n", n)]).unwrap();
    let q = model.apply(Some("Q"), JukesCantor, &[]).unwrap();
    let length = model.constant(Some("L"), 200);
    model
        .sample(Some("D"), PhyloCtmc, &[("tree", psi), ("Q", q), ("L", length)])
        .unwrap();

    c.bench_function("resample_coalescent_jc", |b| {
        b.iter(|| model.resample(None).unwrap());
    });
}

criterion_group!(regression, newick_round_trip, coalescent_simulation);
criterion_group! {
    name = simulation;
    config = Criterion::default().sample_size(10);
    targets = ctmc_simulation, model_resampling
}
criterion_main!(regression, simulation);
