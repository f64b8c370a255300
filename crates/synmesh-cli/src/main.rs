//! `synmesh` — command-line interface for the synapse-processing runtime.
//!
//! ```text
//! USAGE:
//!   synmesh generate [opts] -o core.bin   Build a runnable core blob
//!   synmesh run core.bin                  Run a core to completion
//!   synmesh info core.bin                 Inspect a blob's region table
//! ```

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use synmesh_core::{ExpDecayLut, KeyRange, RowLocator, Trace};
use synmesh_matgen::{
    AllToAll, Constant, ConnectorGenerator, FixedProbability, MatrixGenerator, OneToOne,
};
use synmesh_runtime::{
    write_key_lookup, AnySimulation, ConfigBlob, ConfigWriter, PoissonSource, RegionId,
    SynapseKind, SystemConfig,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "synmesh", about = "Synapse-processing core toolkit", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    /// Fixed-weight rows.
    Static,
    /// Nearest-pair STDP, additive weights.
    Nearest,
    /// Pair STDP, additive weights.
    Pair,
}

#[derive(Clone, Copy, ValueEnum)]
enum ConnectorArg {
    /// Every pre connects to every post.
    All,
    /// Pre n connects to post n.
    One,
    /// Independent Bernoulli connections.
    Prob,
}

#[derive(Subcommand)]
enum Cmd {
    /// Build a complete, runnable core configuration blob.
    Generate(GenerateArgs),
    /// Load a configuration blob and run it to completion.
    Run {
        /// Path to the blob.
        config: PathBuf,
    },
    /// Print a configuration blob's region table.
    Info {
        /// Path to the blob.
        config: PathBuf,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// Pre-synaptic rows in the matrix.
    #[arg(long, default_value_t = 64)]
    rows: u32,
    /// Post-neurons on the core.
    #[arg(long, default_value_t = 64)]
    post: u32,
    /// Synaptic-word slots per row.
    #[arg(long, default_value_t = 32)]
    max_row_synapses: usize,
    /// Row kernel.
    #[arg(long, value_enum, default_value = "static")]
    kind: KindArg,
    /// Connectivity pattern.
    #[arg(long, value_enum, default_value = "prob")]
    connector: ConnectorArg,
    /// Connection probability for --connector prob.
    #[arg(long, default_value_t = 0.1)]
    probability: f64,
    /// Constant synaptic weight (pre fixed-point).
    #[arg(long, default_value_t = 0.5)]
    weight: f64,
    /// Constant dendritic delay in ticks.
    #[arg(long, default_value_t = 1.0)]
    delay: f64,
    /// Weight fixed-point position.
    #[arg(long, default_value_t = 11)]
    weight_fixed_point: u32,
    /// Simulation length in ticks.
    #[arg(long, default_value_t = 1000)]
    ticks: u32,
    /// Timer period in microseconds.
    #[arg(long, default_value_t = 1000)]
    timer_period_us: u32,
    /// Poisson stimulus rate (spikes/tick) for every pre-neuron.
    #[arg(long)]
    poisson_rate: Option<f64>,
    /// RNG seed for generation and stimulus.
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Output path.
    #[arg(short, long)]
    output: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Cmd::Generate(args) => cmd_generate(&args),
        Cmd::Run { config } => cmd_run(&config),
        Cmd::Info { config } => cmd_info(&config),
    }
}

/// Routing-key base for the single generated population.
const KEY_BASE: u32 = 0x0001_0000;

fn cmd_generate(args: &GenerateArgs) -> Result<()> {
    let kind = match args.kind {
        KindArg::Static => SynapseKind::Static,
        KindArg::Nearest => SynapseKind::StdpNearestAdditive,
        KindArg::Pair => SynapseKind::StdpPairAdditive,
    };

    let generator = MatrixGenerator::new(
        args.rows,
        args.max_row_synapses,
        args.weight_fixed_point,
        args.post,
    )?;
    let connector: Box<dyn ConnectorGenerator> = match args.connector {
        ConnectorArg::All => Box::new(AllToAll::new()),
        ConnectorArg::One => Box::new(OneToOne),
        ConnectorArg::Prob => Box::new(FixedProbability::new(args.probability, true)?),
    };
    let delays = Constant::new(args.delay);
    let weights = Constant::new(args.weight);
    let mut rng = StdRng::seed_from_u64(args.seed);

    let (matrix, row_words) = match kind {
        SynapseKind::Static => (
            generator.generate_static(connector.as_ref(), &delays, &weights, &mut rng)?,
            generator.static_row_words(),
        ),
        SynapseKind::StdpNearestAdditive => (
            generator.generate_plastic::<()>(connector.as_ref(), &delays, &weights, &mut rng)?,
            generator.plastic_row_words(<() as Trace>::WORDS),
        ),
        SynapseKind::StdpPairAdditive => (
            generator.generate_plastic::<u16>(connector.as_ref(), &delays, &weights, &mut rng)?,
            generator.plastic_row_words(<u16 as Trace>::WORDS),
        ),
    };

    let system = SystemConfig {
        timer_period_us: args.timer_period_us,
        simulation_ticks: args.ticks,
        synapse_kind: kind,
        post_count: args.post,
        max_row_synapses: args.max_row_synapses as u32,
        key_base: KEY_BASE,
    };

    // Assemble once with a placeholder key table to learn the matrix
    // offset, then rebuild the table pointing at it; payload lengths are
    // identical so every offset stays valid.
    let lookup_placeholder = write_key_lookup(&[key_range(args, 0, row_words)]);
    let blob = assemble_blob(args, kind, &system, lookup_placeholder.clone(), &matrix)?;
    let matrix_offset = ConfigBlob::parse_words(blob.clone())
        .context("self-check of generated blob failed")?
        .region_offset(RegionId::SynapticMatrix)
        .context("generated blob lost its matrix region")?;

    let lookup = write_key_lookup(&[key_range(args, matrix_offset as u32, row_words)]);
    let blob = assemble_blob(args, kind, &system, lookup, &matrix)?;

    let mut bytes = Vec::with_capacity(blob.len() * 4);
    for word in &blob {
        bytes.extend_from_slice(&word.to_le_bytes());
    }
    std::fs::write(&args.output, &bytes)
        .with_context(|| format!("writing {}", args.output.display()))?;

    println!(
        "wrote {} ({} words, {} rows x {} word stride)",
        args.output.display(),
        blob.len(),
        args.rows,
        row_words
    );
    Ok(())
}

fn key_range(args: &GenerateArgs, matrix_offset: u32, row_words: usize) -> KeyRange {
    KeyRange {
        key_base: KEY_BASE,
        key_count: args.rows,
        locator: RowLocator::new(matrix_offset, row_words as u32),
        row_stride: row_words as u32,
    }
}

fn assemble_blob(
    args: &GenerateArgs,
    kind: SynapseKind,
    system: &SystemConfig,
    lookup: Vec<u32>,
    matrix: &[u32],
) -> Result<Vec<u32>> {
    let mut writer = ConfigWriter::new()
        .region(RegionId::System, system.to_words())
        .region(RegionId::KeyLookup, lookup);

    if kind != SynapseKind::Static {
        writer = writer.region(RegionId::PlasticityData, plasticity_words(args));
    }

    writer = writer
        .region(RegionId::SynapticMatrix, matrix.to_vec())
        .region(RegionId::OutputBuffer, vec![0; args.post as usize])
        .region(RegionId::SpikeRecording, vec![0; 2048]);

    if let Some(rate) = args.poisson_rate {
        let mut payload = vec![args.seed as u32];
        payload.extend(PoissonSource::write_region(&vec![rate; args.rows as usize]));
        writer = writer.region(RegionId::PoissonSource, payload);
    }

    Ok(writer.build())
}

/// Reference STDP parameters: 256-entry exponential tables with a 20-tick
/// time constant, weights in the full 16-bit range, eighth-strength
/// updates.
fn plasticity_words(args: &GenerateArgs) -> Vec<u32> {
    let table = ExpDecayLut::exponential(20.0, 256);
    let mut words = Vec::with_capacity(2 * (1 + table.len()) + 4);
    for _ in 0..2 {
        words.push(table.len() as u32);
        words.extend((0..table.len()).map(|delta| table.lookup(delta as u32) as u32));
    }
    let max_weight = ((1u32 << args.weight_fixed_point).saturating_mul(2) - 1).min(0xFFFF);
    words.extend_from_slice(&[0, max_weight, 256, 256]);
    words
}

fn cmd_run(config: &PathBuf) -> Result<()> {
    let bytes = Bytes::from(
        std::fs::read(config).with_context(|| format!("reading {}", config.display()))?,
    );
    let mut sim = AnySimulation::load(&bytes)?;
    let system = *sim.system();
    println!(
        "running {:?} core: {} ticks at {} us/tick",
        system.synapse_kind, system.simulation_ticks, system.timer_period_us
    );

    let counters = sim.run()?;

    println!("rows processed : {}", counters.rows_processed);
    println!("rows flushed   : {}", counters.rows_flushed);
    println!("delay replays  : {}", counters.delay_rows_replayed);
    println!("unknown keys   : {}", counters.unknown_keys);
    println!("queue overflows: {}", counters.spike_overflows);
    println!("delay overflows: {}", counters.delay_row_overflows);
    println!("saturations    : {}", counters.ring_saturations);
    Ok(())
}

fn cmd_info(config: &PathBuf) -> Result<()> {
    let bytes = Bytes::from(
        std::fs::read(config).with_context(|| format!("reading {}", config.display()))?,
    );
    let blob = ConfigBlob::parse(&bytes)?;

    println!("regions: {}", blob.regions().len());
    for entry in blob.regions() {
        let name = match entry.id {
            0 => "System",
            1 => "KeyLookup",
            2 => "SynapticMatrix",
            3 => "PlasticityData",
            4 => "OutputBuffer",
            5 => "SpikeRecording",
            6 => "PoissonSource",
            _ => "(unknown)",
        };
        println!(
            "  [{:>2}] {:<15} offset {:>6}  {:>7} words",
            entry.id, name, entry.offset, entry.length
        );
    }

    if let Some(words) = blob.region(RegionId::System) {
        let system = SystemConfig::read(words)?;
        println!();
        println!("kind           : {:?}", system.synapse_kind);
        println!("ticks          : {}", system.simulation_ticks);
        println!("timer period   : {} us", system.timer_period_us);
        println!("post-neurons   : {}", system.post_count);
        println!("row width      : {} synapses", system.max_row_synapses);
        println!("key base       : {:#010x}", system.key_base);
    }
    Ok(())
}
