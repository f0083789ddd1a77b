use std::path::PathBuf;

use clap::Parser;
use sandbox::config_file::effective_config;
use sandbox::init::{self, SandboxSettings};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Fixed ticks to simulate.
    #[arg(short, long, default_value_t = 500)]
    ticks: u64,

    /// Seed for a reproducible run.
    #[arg(short, long)]
    seed: Option<u64>,

    /// RON file with the bleeding config; defaults apply when it is missing.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Surface drops stepped per tick.
    #[arg(short, long)]
    max_updates: Option<usize>,

    /// Write the effective config to this file before running.
    #[arg(short, long)]
    write_config: Option<PathBuf>,

    /// Tick on which the creature is removed.
    #[arg(short, long)]
    despawn_at: Option<u64>,

    /// Pace the run at the fixed tick rate.
    #[arg(short, long)]
    realtime: bool,
}

fn main() {
    let args = Args::parse();

    if args.max_updates == Some(0) {
        eprintln!("Error: max_updates must be at least 1.");
        std::process::exit(1);
    }

    let config = match effective_config(
        args.config.as_deref(),
        args.seed,
        args.max_updates,
        args.write_config.as_deref(),
    ) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };

    let settings = SandboxSettings {
        ticks: args.ticks,
        despawn_at: args.despawn_at.or(SandboxSettings::default().despawn_at),
        realtime: args.realtime,
    };
    init::run(config, &settings);
}
