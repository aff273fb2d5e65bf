//! Raster band ingester.
//!
//! Inspects raster sources and loads them into aligned band stores,
//! printing JSON to stdout. Logs go to stderr.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "ingester")]
#[command(about = "Discover, match and load raster bands")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Grid consistency policy: allow, warn or reject
    #[arg(long, global = true)]
    grid_check: Option<String>,

    /// Read bands one at a time
    #[arg(long, global = true)]
    sequential: bool,

    /// Size of the band read pool
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print source metadata without reading pixels
    Inspect {
        /// Container file or directory of single-band files
        source: PathBuf,

        /// YAML band plan
        #[arg(short, long)]
        plan: Option<PathBuf>,
    },

    /// Load bands and print a store summary
    Load {
        /// Container file or directory of single-band files
        source: PathBuf,

        /// YAML band plan
        #[arg(short, long)]
        plan: Option<PathBuf>,

        /// Write the summary here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn init_tracing(args: &Args) -> Result<()> {
    let builder = FmtSubscriber::builder()
        .with_max_level(parse_level(&args.log_level))
        .with_target(true)
        .with_writer(std::io::stderr);

    if args.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args)?;

    #[cfg(feature = "netcdf")]
    raster_reader::silence_hdf5_errors();

    let overrides = config::Overrides {
        grid_check: args.grid_check.clone(),
        sequential: args.sequential,
        threads: args.threads,
    };

    let output = match &args.command {
        Command::Inspect { source, plan } => {
            info!(source = %source.display(), "Inspecting source");
            commands::inspect(source, plan.as_deref(), &overrides)?
        }
        Command::Load {
            source,
            plan,
            output,
        } => {
            info!(source = %source.display(), "Loading source");
            let summary = commands::load(source, plan.as_deref(), &overrides)?;
            if let Some(path) = output {
                std::fs::write(path, &summary)?;
                info!(path = %path.display(), "Wrote store summary");
                return Ok(());
            }
            summary
        }
    };

    println!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inspect() {
        let args = Args::try_parse_from(["ingester", "inspect", "/data/scene", "--plan", "plan.yaml"]).unwrap();
        match args.command {
            Command::Inspect { source, plan } => {
                assert_eq!(source, PathBuf::from("/data/scene"));
                assert_eq!(plan, Some(PathBuf::from("plan.yaml")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn test_parse_load_with_global_flags() {
        let args = Args::try_parse_from([
            "ingester",
            "load",
            "scene.hdf",
            "--sequential",
            "--threads",
            "4",
            "--grid-check",
            "reject",
            "-o",
            "out.json",
        ])
        .unwrap();
        assert!(args.sequential);
        assert_eq!(args.threads, Some(4));
        assert_eq!(args.grid_check.as_deref(), Some("reject"));
        assert!(matches!(args.command, Command::Load { output: Some(_), .. }));
    }

    #[test]
    fn test_missing_subcommand_rejected() {
        assert!(Args::try_parse_from(["ingester"]).is_err());
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("nonsense"), Level::INFO);
    }
}
