mod app;
mod cli;
mod config;
mod deck;
mod notes;
mod playback;
mod record;
mod render;
mod session;
mod sync;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = cli::Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("deckcast={default_level}"))),
        )
        .init();

    if let Err(err) = cli.run() {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(1);
    }
}
