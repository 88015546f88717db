mod cli;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    metro_cli::logging::init_cli_logger(args.verbose);

    match cli::run(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            // One-line diagnostic: context chain joined with ": ".
            eprintln!("{e:#}");
            std::process::exit(1);
        }
    }
}
