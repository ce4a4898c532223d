mod config;
mod error;
mod fsutil;
mod pipeline;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use config::CompendiumConfig;
use pipeline::{RunOptions, RunOutcome};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "compendium")]
#[command(author, version, about = "Merge map ids of Minecraft saves into one stable id space", long_about = None)]
struct Args {
    /// Save directory to read
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Content hash to map id database, shared between runs
    #[arg(short, long)]
    mapping: Option<PathBuf>,

    /// Directory the remapped copy is written to
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Append found and missing ids to log files in the output directory
    #[arg(long = "dump-ids", alias = "dumpIDs")]
    dump_ids: bool,

    /// Log every rewritten id
    #[arg(short, long)]
    verbose: bool,

    /// Config file (defaults to compendium.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match CompendiumConfig::discover(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let level = if args.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let options = RunOptions {
        input: args.input.unwrap_or_else(|| config.input()),
        mapping: args.mapping.unwrap_or_else(|| config.mapping()),
        output: args.output.unwrap_or_else(|| config.output()),
        dump_ids: args.dump_ids || config.diagnostics.dump_ids,
    };

    info!("Compendium v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Input: {}, mapping: {}, output: {}",
        options.input.display(),
        options.mapping.display(),
        options.output.display()
    );

    match pipeline::run(&options) {
        Ok(RunOutcome::NoMaps) => ExitCode::SUCCESS,
        Ok(RunOutcome::Completed(summary)) => {
            summary.log(&options);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn flags_parse() {
        let args = Args::parse_from([
            "compendium",
            "-i",
            "worlds/a",
            "--mapping",
            "maps.json",
            "--dumpIDs",
        ]);
        assert_eq!(args.input, Some(PathBuf::from("worlds/a")));
        assert_eq!(args.mapping, Some(PathBuf::from("maps.json")));
        assert_eq!(args.output, None);
        assert!(args.dump_ids);
        assert!(!args.verbose);
    }
}
