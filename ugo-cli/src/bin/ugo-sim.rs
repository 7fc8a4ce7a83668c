//! UGO Simulator - drives the sent packet handler over a lossy synthetic link
//!
//! Settings come from an optional TOML file; command-line flags override it.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use ugo_cli::{display_compact_stats, display_summary, SimConfig, Simulation};

#[derive(Parser, Debug)]
#[command(name = "ugo-sim")]
#[command(about = "UGO sent packet handler simulator", long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write an example configuration to this path and exit
    #[arg(long)]
    write_example: Option<PathBuf>,

    /// Number of messages to deliver
    #[arg(short, long)]
    messages: Option<u64>,

    /// Payload size in bytes
    #[arg(long)]
    payload_size: Option<usize>,

    /// One-way link delay in milliseconds
    #[arg(short, long)]
    delay_ms: Option<u64>,

    /// Data packet loss rate (0.0 to 1.0)
    #[arg(short, long)]
    loss: Option<f64>,

    /// Ack frame loss rate (0.0 to 1.0)
    #[arg(long)]
    ack_loss: Option<f64>,

    /// Receiver acks after this many packets
    #[arg(long)]
    ack_every: Option<u32>,

    /// Longest the receiver holds an ack, in milliseconds
    #[arg(long)]
    ack_delay_ms: Option<u64>,

    /// RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Simulated time limit in seconds
    #[arg(long)]
    duration: Option<u64>,

    /// Statistics interval in milliseconds of simulated time (0 disables)
    #[arg(long)]
    stats: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Apply command-line overrides on top of the file configuration
    fn apply(&self, config: &mut SimConfig) {
        if let Some(messages) = self.messages {
            config.sender.messages = messages;
        }
        if let Some(payload_size) = self.payload_size {
            config.sender.payload_size = payload_size;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.link.delay_ms = delay_ms;
        }
        if let Some(loss) = self.loss {
            config.link.loss_rate = loss;
        }
        if let Some(ack_loss) = self.ack_loss {
            config.link.ack_loss_rate = ack_loss;
        }
        if let Some(ack_every) = self.ack_every {
            config.link.ack_every = ack_every;
        }
        if let Some(ack_delay_ms) = self.ack_delay_ms {
            config.link.ack_delay_ms = ack_delay_ms;
        }
        if let Some(seed) = self.seed {
            config.link.seed = seed;
        }
        if let Some(duration) = self.duration {
            config.sender.duration_secs = duration;
        }
        if let Some(stats) = self.stats {
            config.sender.stats_interval_ms = stats;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if let Some(path) = &args.write_example {
        SimConfig::example().to_file(path)?;
        tracing::info!("Example configuration written to {}", path.display());
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("Loading configuration from {}", path.display());
            SimConfig::from_file(path)?
        }
        None => SimConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    tracing::info!("UGO simulator starting (seed {})...", config.link.seed);

    let mut simulation = Simulation::new(config);
    let report = simulation.run(display_compact_stats)?;
    println!();

    display_summary(&report);

    if !report.completed {
        anyhow::bail!(
            "only {} of {} messages delivered",
            report.receiver.messages_delivered,
            report.messages
        );
    }
    Ok(())
}
