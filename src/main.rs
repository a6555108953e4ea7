//! moxen - CLI Entry Point
//!
//! Evolve foragers and predators on a toroidal Game of Life.

use clap::{Parser, Subcommand, ValueEnum};
use moxen::automaton::Automaton;
use moxen::checkpoint::{Checkpoint, CheckpointManager};
use moxen::config::{EvolutionMode, PopulationMode, SensorConfig};
use moxen::engine::ReflexFactory;
use moxen::evolution::Evolver;
use moxen::mox::Mox;
use moxen::stats::FitnessHistory;
use moxen::world::{spawn_moxen, WorldBuilder};
use moxen::{Config, World};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "moxen")]
#[command(version)]
#[command(about = "Evolve foraging and predatory agents on a toroidal Game of Life")]
struct Cli {
    /// Also write the log to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Individual,
    System,
}

#[derive(Clone, Copy, ValueEnum)]
enum PopulationsArg {
    Foragers,
    ForagersAndPredators,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new evolution from cells files
    Evolve {
        /// Cells files, one world each
        #[arg(required = true)]
        cells: Vec<PathBuf>,

        /// Generations to run
        #[arg(short, long, default_value = "100")]
        generations: u32,

        /// Steps per trial
        #[arg(short, long, default_value = "50")]
        steps: usize,

        /// Configuration file (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory for checkpoints and statistics
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        #[arg(long, value_enum)]
        populations: Option<PopulationsArg>,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        mutation_rate: Option<f64>,

        #[arg(long)]
        random_mutation_rate: Option<f64>,

        /// Negative for unbounded sensing
        #[arg(long, allow_hyphen_values = true)]
        max_sensor_range: Option<f32>,

        /// Step the automaton after every tick
        #[arg(long)]
        step_automaton: bool,

        /// Train foragers toward food before each evaluation
        #[arg(long)]
        train: bool,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Continue an evolution from a checkpoint
    Resume {
        checkpoint: PathBuf,

        /// Additional generations
        #[arg(short, long, default_value = "100")]
        generations: u32,

        #[arg(short, long, default_value = "output")]
        output: PathBuf,
    },

    /// Write one world file per member and world
    Extract {
        checkpoint: PathBuf,

        #[arg(short, long, default_value = "extracted")]
        output: PathBuf,
    },

    /// Print every member's info and genomes
    Properties { checkpoint: PathBuf },

    /// Print the fitness table of a checkpoint or statistics file
    Stats {
        /// Checkpoint (.bin) or history (.json)
        file: PathBuf,
    },

    /// Build a random cells file
    Build {
        #[arg(short, long, default_value = "cells.txt")]
        output: PathBuf,

        #[arg(long, default_value = "20")]
        width: usize,

        #[arg(long, default_value = "20")]
        height: usize,

        /// Automaton generations before counting food
        #[arg(short, long, default_value = "0")]
        steps: usize,

        #[arg(long, default_value = "0.1")]
        probability: f64,

        #[arg(long, default_value = "4517")]
        seed: u64,

        #[arg(long)]
        min_blue: Option<usize>,

        #[arg(long)]
        max_blue: Option<usize>,

        #[arg(long)]
        min_green: Option<usize>,

        #[arg(long)]
        max_green: Option<usize>,

        #[arg(long, default_value = "1000")]
        max_attempts: u32,
    },

    /// Run a world file, or a random world with new moxen
    World {
        /// World file to load; a random 20x20 world when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(short, long, default_value = "100")]
        steps: usize,

        #[arg(long, default_value = "1")]
        foragers: usize,

        #[arg(long, default_value = "0")]
        predators: usize,

        #[arg(long, default_value = "4517")]
        seed: u64,

        #[arg(long)]
        step_automaton: bool,

        /// Sensor range, neighborhood and automaton stepping come from here
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Save the world after the run
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate default configuration file
    Init {
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },
}

fn init_logging(log_file: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(path) = log_file {
        let file = std::fs::File::create(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    match cli.command {
        Commands::Evolve {
            cells,
            generations,
            steps,
            config,
            output,
            mode,
            populations,
            seed,
            mutation_rate,
            random_mutation_rate,
            max_sensor_range,
            step_automaton,
            train,
            quiet,
        } => {
            let mut config = match config {
                Some(path) => {
                    println!("Loading config from: {:?}", path);
                    Config::from_file(&path)?
                }
                None => Config::default(),
            };
            if let Some(mode) = mode {
                config.evolution.mode = match mode {
                    ModeArg::Individual => EvolutionMode::Individual,
                    ModeArg::System => EvolutionMode::System,
                };
            }
            if let Some(populations) = populations {
                config.evolution.populations = match populations {
                    PopulationsArg::Foragers => PopulationMode::ForagersOnly,
                    PopulationsArg::ForagersAndPredators => PopulationMode::ForagersAndPredators,
                };
            }
            if let Some(seed) = seed {
                config.evolution.random_seed = seed;
            }
            if let Some(rate) = mutation_rate {
                config.evolution.mutation_rate = rate;
            }
            if let Some(rate) = random_mutation_rate {
                config.evolution.random_mutation_rate = rate;
            }
            if let Some(range) = max_sensor_range {
                config.sensors.max_sensor_range = range;
            }
            config.world.step_automaton |= step_automaton;
            config.evolution.train_foragers |= train;
            run_evolution(config, cells, generations, steps, output, quiet)
        }

        Commands::Resume {
            checkpoint,
            generations,
            output,
        } => resume_evolution(checkpoint, generations, output),

        Commands::Extract { checkpoint, output } => extract_members(checkpoint, output),

        Commands::Properties { checkpoint } => {
            let evolver = Evolver::from_checkpoint(Checkpoint::load(&checkpoint)?, Arc::new(ReflexFactory))?;
            print!("{}", evolver.properties());
            Ok(())
        }

        Commands::Stats { file } => {
            let history = if file.extension().is_some_and(|e| e == "json") {
                FitnessHistory::load_json(&file.to_string_lossy())?
            } else {
                Checkpoint::load(&file)?.history
            };
            print!("{}", history.table());
            Ok(())
        }

        Commands::Build {
            output,
            width,
            height,
            steps,
            probability,
            seed,
            min_blue,
            max_blue,
            min_green,
            max_green,
            max_attempts,
        } => {
            let builder = WorldBuilder {
                width,
                height,
                steps,
                live_cell_probability: probability,
                seed,
                min_blue: min_blue.unwrap_or(0),
                max_blue: max_blue.unwrap_or(usize::MAX),
                min_green: min_green.unwrap_or(0),
                max_green: max_green.unwrap_or(usize::MAX),
                max_attempts,
                ..Default::default()
            };
            let world = builder.build(SensorConfig::default())?;
            world.automaton().save(&output)?;
            println!("Cells saved to: {:?}", output);
            Ok(())
        }

        Commands::World {
            input,
            steps,
            foragers,
            predators,
            seed,
            step_automaton,
            config,
            output,
        } => {
            let mut config = match config {
                Some(path) => Config::from_file(&path)?,
                None => Config::default(),
            };
            config.world.step_automaton |= step_automaton;
            run_world(&config, input, steps, foragers, predators, seed, output)
        }

        Commands::Init { output } => {
            Config::default().save(&output)?;
            println!("Configuration saved to: {:?}", output);
            Ok(())
        }
    }
}

fn run_evolution(
    config: Config,
    cells: Vec<PathBuf>,
    generations: u32,
    steps: usize,
    output: PathBuf,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let worlds = cells
        .iter()
        .map(|path| Automaton::load(path).map(|a| World::new(a, config.sensors)))
        .collect::<Result<Vec<_>, _>>()?;

    std::fs::create_dir_all(&output)?;
    let mut evolver = Evolver::new(config, worlds, steps, Arc::new(ReflexFactory))?;

    println!("Starting evolution");
    println!("  Worlds: {}", cells.len());
    println!("  Foragers: {}", evolver.foragers().len());
    if let Some(predators) = evolver.predators() {
        println!("  Predators: {}", predators.len());
    }
    println!("  Generations: {}", generations);
    println!("  Steps: {}", steps);
    println!();

    drive(&mut evolver, generations, &output, quiet)
}

fn resume_evolution(checkpoint_path: PathBuf, generations: u32, output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading checkpoint: {:?}", checkpoint_path);
    let checkpoint = Checkpoint::load(&checkpoint_path)?;
    let mut evolver = Evolver::from_checkpoint(checkpoint, Arc::new(ReflexFactory))?;

    println!("Resumed after generation {}", evolver.generation());
    println!("Running {} additional generations", generations);
    println!();

    std::fs::create_dir_all(&output)?;
    drive(&mut evolver, generations, &output, false)
}

fn drive(evolver: &mut Evolver, generations: u32, output: &Path, quiet: bool) -> Result<(), Box<dyn std::error::Error>> {
    let logging = evolver.config().logging.clone();
    let mut checkpoint_mgr = CheckpointManager::new(
        output.to_string_lossy().to_string(),
        logging.checkpoint_interval,
        logging.max_checkpoints,
    )?;

    let start = Instant::now();
    evolver.run_with_callback(generations, Some(&mut checkpoint_mgr), |stats| {
        if !quiet && stats.generation % logging.stats_interval == 0 {
            println!("{}", stats.summary());
        }
    })?;
    let elapsed = start.elapsed();

    println!();
    println!("=== Evolution Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Generations: {}", evolver.generation());
    if let Some(latest) = evolver.history().latest() {
        println!("{}", latest.summary());
    }
    if let Some(path) = checkpoint_mgr.find_latest() {
        println!("Latest checkpoint: {}", path);
    }

    let stats_path = output.join("stats_history.json");
    evolver.history().save_json(&stats_path.to_string_lossy())?;
    println!("Stats history: {:?}", stats_path);
    Ok(())
}

fn extract_members(checkpoint_path: PathBuf, output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let checkpoint = Checkpoint::load(&checkpoint_path)?;
    let mut evolver = Evolver::from_checkpoint(checkpoint, Arc::new(ReflexFactory))?;
    let paths = evolver.extract(&output)?;
    println!("Extracted {} world files to {:?}", paths.len(), output);
    Ok(())
}

fn run_world(
    config: &Config,
    input: Option<PathBuf>,
    steps: usize,
    foragers: usize,
    predators: usize,
    seed: u64,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let factory = ReflexFactory;
    let (mut world, mut moxen) = match input {
        Some(path) => {
            println!("Loading world: {:?}", path);
            let (mut world, moxen) = World::load(&path, config.sensors, &factory)?;
            world.apply_config(config);
            (world, moxen)
        }
        None => {
            let builder = WorldBuilder {
                seed,
                neighborhood: config.world.neighborhood,
                ..Default::default()
            };
            let world = builder.build(config.sensors)?;
            let moxen = spawn_moxen(&world, foragers, predators, seed, &factory);
            (world, moxen)
        }
    };

    println!("World: {}x{}, {} moxen", world.width(), world.height(), moxen.len());
    let mut refs: Vec<&mut Mox> = moxen.iter_mut().collect();
    let totals = world.run(&mut refs, steps, config.world.step_automaton);

    println!("Steps: {}", steps);
    println!("Moves: {}", totals.moves);
    println!("Conflicts: {}", totals.conflicts);
    println!("Food eaten: {}", totals.eaten);
    println!("Kills: {}", totals.kills);
    for mox in &moxen {
        println!("  {}", mox.info());
    }

    if let Some(path) = output {
        let refs: Vec<&Mox> = moxen.iter().collect();
        world.save(&path, &refs)?;
        println!("World saved to: {:?}", path);
    }
    Ok(())
}
