//! seedbox CLI: headless runs of the control core.
//!
//! Usage:
//!   sb-cli run --ticks 384 [--config session.yaml] [--seed 1234]
//!              [--reseed 99 --prime live-input --tap-ms 500]
//!   sb-cli genomes [--config session.yaml] [--seed 1234]
//!
//! `run` prints the golden trigger log; `genomes` dumps the generated table
//! as a JSON snapshot. Set `RUST_LOG=debug` to watch steals and fallbacks.

use std::error::Error;
use std::path::PathBuf;

use clap::{crate_version, Parser, Subcommand, ValueEnum};
use sb_master::{Controller, SeedPrimeMode, SessionConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(version = crate_version!(), about = "Seedbox control core, headless.")]
struct Cli {
    /// Session config (YAML, TOML or JSON).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Override the config's master seed.
    #[arg(short, long, global = true)]
    seed: Option<u32>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tick the internal clock and print every trigger.
    Run {
        /// Number of 24 PPQN ticks to run.
        #[arg(short, long, default_value_t = 384)]
        ticks: u64,
        /// Seeds to lock before reseeding with --reseed.
        #[arg(short, long, value_delimiter = ',')]
        lock: Vec<usize>,
        /// Reseed to this value halfway through the run.
        #[arg(short, long)]
        reseed: Option<u32>,
        /// How the halfway reseed fills unlocked seeds.
        #[arg(short, long, value_enum, default_value_t = Prime::Lfsr)]
        prime: Prime,
        /// Tap-tempo interval in milliseconds, used by `--prime tap-tempo`.
        #[arg(long)]
        tap_ms: Option<u32>,
    },
    /// Print the generated genome table as JSON.
    Genomes {},
}

#[derive(Clone, Copy, ValueEnum)]
enum Prime {
    Lfsr,
    TapTempo,
    LiveInput,
}

impl From<Prime> for SeedPrimeMode {
    fn from(prime: Prime) -> Self {
        match prime {
            Prime::Lfsr => SeedPrimeMode::Lfsr,
            Prime::TapTempo => SeedPrimeMode::TapTempo,
            Prime::LiveInput => SeedPrimeMode::LiveInput,
        }
    }
}

fn load_config(cli: &Cli) -> Result<SessionConfig, Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.master_seed = seed;
    }
    Ok(config)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let mut controller = Controller::new(&config);

    match cli.command {
        Commands::Run { ticks, lock, reseed, prime, tap_ms } => {
            for index in lock {
                controller.set_seed_lock(index, true);
            }
            if let Some(interval) = tap_ms {
                controller.record_tap_tempo_interval(interval);
            }
            for tick in 0..ticks {
                if tick == ticks / 2 {
                    if let Some(master) = reseed {
                        controller.seed_page_reseed(master, prime.into());
                    }
                }
                controller.tick();
            }
            for record in controller.trigger_log() {
                println!("{record}");
            }
            let diag = controller.scheduler().diagnostics();
            info!(
                ticks = diag.ticks,
                density_gates = diag.density_gates,
                probability_drops = diag.probability_drops,
                triggers = diag.triggers,
                "run finished"
            );
        }
        Commands::Genomes {} => {
            println!("{}", controller.snapshot_json()?);
        }
    }
    Ok(())
}
