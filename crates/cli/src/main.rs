//! stakechain CLI entry point.

use clap::Parser;
use tracing::Level;

mod commands;
mod config;
mod display;

#[derive(Parser)]
#[command(name = "stakechain")]
#[command(about = "A proof-of-stake blockchain simulator", long_about = None)]
struct Cli {
    /// Log chain events at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<commands::Commands>,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(cmd) => {
            if let Err(e) = commands::run(cmd) {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("stakechain - A proof-of-stake blockchain simulator");
            println!("Run 'stakechain --help' for usage information.");
        }
    }
}
