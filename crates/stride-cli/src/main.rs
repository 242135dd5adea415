use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use stride_cli::commands::{replay, validate};
use stride_cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match cli.command {
        Some(Commands::Replay { trace, json, out }) => {
            replay::run(cli.config.as_deref(), &trace, json, out)?;
        }
        Some(Commands::Validate { markers, json }) => {
            validate::run(&markers, json)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
