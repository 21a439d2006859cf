use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "deckcast")]
#[command(author, version, about)]
#[command(long_about = "A pitch-deck presenter.\n\n\
    Present a fixed deck of slides with staged reveals, a detachable\n\
    speaker-notes window, and local recording.\n\n\
    Examples:\n  \
    deckcast deck.yaml             Launch presentation (fullscreen)\n  \
    deckcast deck.yaml --windowed  Launch in a window\n  \
    deckcast deck.yaml --notes     Also open the presenter notes window")]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Deck manifest to present
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Launch in a window instead of fullscreen
    #[arg(long, global = false)]
    pub windowed: bool,

    /// Start on a specific slide (1-indexed)
    #[arg(long, global = false)]
    pub slide: Option<usize>,

    /// Open the presenter notes window at startup
    #[arg(long, global = false)]
    pub notes: bool,

    /// Increase output verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// View and modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Display current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g. defaults.reveal_delay_ms, recording.output_dir)
        key: String,

        /// Value to set
        value: String,
    },
}

#[derive(Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        match self.command {
            Some(Commands::Config { command }) => run_config(command),
            Some(Commands::Completion { shell }) => {
                run_completion(shell);
                Ok(())
            }
            Some(Commands::Version) => {
                println!(
                    "{} {}",
                    "deckcast".bold(),
                    env!("CARGO_PKG_VERSION").cyan()
                );
                Ok(())
            }
            None => {
                if let Some(file) = self.file {
                    if !file.exists() {
                        anyhow::bail!("File not found: {}", file.display());
                    }
                    crate::app::run(file, self.windowed, self.slide, self.notes)
                } else {
                    use clap::CommandFactory;
                    let mut cmd = Self::command();
                    cmd.print_help()?;
                    println!();
                    Ok(())
                }
            }
        }
    }
}

fn run_config(command: ConfigCommands) -> anyhow::Result<()> {
    use crate::config::Config;
    match command {
        ConfigCommands::Show => {
            let config = Config::load_or_default();
            let yaml = serde_yaml::to_string(&config)?;
            println!("{yaml}");
            Ok(())
        }
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load_or_default();
            config.set(&key, &value)?;
            let path = config.save()?;
            println!("{} {key} = {value}", "updated".green());
            println!("  {}", path.display().to_string().dimmed());
            Ok(())
        }
    }
}

fn run_completion(shell: Shell) {
    use clap::CommandFactory;
    let mut cmd = Cli::command();
    let target: clap_complete::Shell = match shell {
        Shell::Bash => clap_complete::Shell::Bash,
        Shell::Zsh => clap_complete::Shell::Zsh,
        Shell::Fish => clap_complete::Shell::Fish,
        Shell::Powershell => clap_complete::Shell::PowerShell,
    };
    clap_complete::generate(target, &mut cmd, "deckcast", &mut std::io::stdout());
}
