mod cli;

use anyhow::Result;
use clap::Parser;
use log::info;

fn main() -> Result<()> {
    let args = cli::Args::parse();

    let level = if args.quiet {
        "error"
    } else if args.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    info!("Starting file-court v{}", env!("CARGO_PKG_VERSION"));

    cli::run(args)
}
