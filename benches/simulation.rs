//! Performance benchmarks for moxen

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use moxen::config::{PopulationConfig, SensorConfig};
use moxen::engine::ReflexFactory;
use moxen::genetics::{MutationRates, ParmGenome};
use moxen::world::{perceive, spawn_moxen, WorldBuilder};
use moxen::{Config, Evolver, Mox, Species};
use std::sync::Arc;

fn benchmark_automaton_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("automaton_step");

    for size in [32usize, 128, 256].iter() {
        let builder = WorldBuilder {
            width: *size,
            height: *size,
            live_cell_probability: 0.3,
            ..Default::default()
        };
        let Ok(world) = builder.build(SensorConfig::default()) else { continue };
        let mut automaton = world.automaton().clone();

        group.bench_with_input(BenchmarkId::new("size", size), size, |b, _| {
            b.iter(|| automaton.step());
        });
    }

    group.finish();
}

fn benchmark_world_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");

    for count in [10usize, 100, 400].iter() {
        let builder = WorldBuilder {
            width: 64,
            height: 64,
            live_cell_probability: 0.2,
            ..Default::default()
        };
        let mut world = builder.build(SensorConfig::default()).unwrap();
        let mut moxen = spawn_moxen(&world, count * 3 / 4, count / 4, 42, &ReflexFactory);

        group.bench_with_input(BenchmarkId::new("moxen", count), count, |b, _| {
            let mut refs: Vec<&mut Mox> = moxen.iter_mut().collect();
            b.iter(|| world.step_moxen(&mut refs));
        });
    }

    group.finish();
}

fn benchmark_sensing(c: &mut Criterion) {
    let world = WorldBuilder::default().build(SensorConfig::default()).unwrap();
    let moxen = spawn_moxen(&world, 1, 0, 42, &ReflexFactory);
    let pose = moxen[0].live_pose;

    c.bench_function("perceive", |b| {
        b.iter(|| perceive(world.automaton(), black_box(pose), Species::Forager, world.sensor_config()))
    });
}

fn benchmark_mutation(c: &mut Criterion) {
    c.bench_function("parm_genome_mutate", |b| {
        let mut genome = ParmGenome::new(MutationRates::default(), 42);
        b.iter(|| genome.mutate());
    });
}

fn benchmark_generation(c: &mut Criterion) {
    let builder = WorldBuilder {
        width: 16,
        height: 16,
        live_cell_probability: 0.3,
        ..Default::default()
    };
    let worlds = vec![builder.build(SensorConfig::default()).unwrap()];

    let mut config = Config::default();
    config.cycle_budget.enabled = false;
    config.foragers = PopulationConfig {
        fit_size: 10,
        num_mutants: 5,
        num_offspring: 5,
    };
    let mut evolver = Evolver::new(config, worlds, 25, Arc::new(ReflexFactory)).unwrap();

    let mut group = c.benchmark_group("evolution");
    group.sample_size(10);
    group.bench_function("generation", |b| {
        b.iter(|| evolver.step_generation().unwrap());
    });
    group.finish();

    let checkpoint = evolver.checkpoint().unwrap();
    c.bench_function("checkpoint_serialize", |b| {
        b.iter(|| bincode::serialize(black_box(&checkpoint)).unwrap());
    });
}

criterion_group!(
    benches,
    benchmark_automaton_step,
    benchmark_world_step,
    benchmark_sensing,
    benchmark_mutation,
    benchmark_generation,
);

criterion_main!(benches);
