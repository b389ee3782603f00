//! `blocklevel` command-line runner

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use blocklevel_core::control::{Leveler, LevelingReport};
use blocklevel_core::plant::{Corner, CornerSet};
use blocklevel_core::simulation::SimulatedBlock;
use blocklevel_rig::codec::{decode_tilt_packet, parse_hex, parse_ranging_block};
use blocklevel_rig::scenarios::Scenario;
use blocklevel_rig::RigConfig;

#[derive(Parser, Debug)]
#[command(name = "blocklevel")]
#[command(about = "Closed-loop leveling of a block on four corner pistons")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Level the simulated block
    Simulate {
        /// Built-in scenario, used when no config file is given
        #[arg(short, long, value_enum, default_value = "reference")]
        scenario: Scenario,

        /// JSON session configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// RNG seed override
        #[arg(long)]
        seed: Option<u64>,

        /// Initial corner heights A,B,C,D [mm]
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        initial: Option<Vec<f64>>,

        /// Iteration budget override
        #[arg(long)]
        max_iters: Option<usize>,

        /// Print the effective configuration as JSON and exit
        #[arg(long)]
        dump_config: bool,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Decode a raw sensor frame given as hex bytes
    Decode {
        #[arg(value_enum)]
        kind: FrameKind,

        /// Frame bytes, e.g. `01 00 00 00 00 00 00 00 00 00 00 C8`
        #[arg(required = true, num_args = 1..)]
        hex: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FrameKind {
    /// 12-byte dual-axis tilt packet
    Tilt,
    /// 12-byte time-of-flight ranging block
    Ranging,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Simulate {
            scenario,
            config,
            seed,
            initial,
            max_iters,
            dump_config,
            json,
        } => {
            let mut config = match config {
                Some(path) => RigConfig::from_json_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => scenario.config(seed.unwrap_or(42)),
            };
            if let Some(seed) = seed {
                config.plant.seed = seed;
            }
            if let Some(heights) = initial {
                ensure!(
                    heights.len() == 4,
                    "--initial needs 4 corner heights, got {}",
                    heights.len()
                );
                config.plant.initial_heights =
                    CornerSet::new([heights[0], heights[1], heights[2], heights[3]]);
            }
            if let Some(n) = max_iters {
                config.leveler.max_iterations = n;
            }
            config.validate()?;

            if dump_config {
                println!("{}", config.to_json_pretty()?);
                return Ok(());
            }
            simulate(&config, json)
        }
        Command::Decode { kind, hex } => decode(kind, &hex.join(" ")),
    }
}

fn simulate(config: &RigConfig, json: bool) -> Result<()> {
    let mut block = SimulatedBlock::new(config.plant.clone())?;
    let mut leveler = Leveler::new(config.leveler.clone(), config.estimator.clone())?;

    info!("leveling from corners {:?}", block.corners().as_array());
    let report = leveler.run(&mut block)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, &block);
    }

    report.into_result()?;
    Ok(())
}

fn print_report(report: &LevelingReport, block: &SimulatedBlock) {
    println!("Outcome:     {:?}", report.outcome);
    println!("Iterations:  {}", report.iterations);
    println!("Initial:     {}", report.initial_state);
    println!("Final:       {}", report.final_state);
    println!("Actuations:  {}", block.history().len());
    println!("Lowest:      {:+.3} mm", block.history().lowest_corner());

    let status = block.corner_status();
    println!("Corners:");
    for corner in Corner::ALL {
        println!(
            "  {corner}: {:+8.3} mm  {:?}",
            block.corners()[corner],
            status[corner.index()]
        );
    }
}

fn decode(kind: FrameKind, hex: &str) -> Result<()> {
    let bytes = parse_hex(hex)?;
    match kind {
        FrameKind::Tilt => {
            let reading = decode_tilt_packet(&bytes)?;
            println!("x = {:+.3}°, y = {:+.3}°", reading.x_deg, reading.y_deg);
        }
        FrameKind::Ranging => match parse_ranging_block(&bytes)? {
            Some(distance) => println!("distance = {distance} mm"),
            None => println!("no reading"),
        },
    }
    Ok(())
}
