use anyhow::Context;
use clap::Parser;
use tiny_squeeze::cli::Args;
use tiny_squeeze::{logger, run};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.version {
        println!("\n➜  tiny-squeeze v{}\n", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    logger::init(args.verbose, args.quiet);
    let options = args.into_options();

    let runtime = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
    runtime
        .block_on(run(&options))
        .context("Failed to start compression run")?;

    Ok(())
}
