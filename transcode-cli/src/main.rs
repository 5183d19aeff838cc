//! Transcode CLI - encoder benchmark and output settings advisor.

mod commands;

use clap::{Parser, Subcommand};
use console::style;

use commands::{CmdAdvise, CmdAutotune, CmdPresets};

/// Command-line arguments for the transcode tool.
#[derive(Parser, Debug)]
#[command(name = "transcode")]
#[command(version)]
#[command(about = "Benchmark this machine and recommend live encoding settings")]
#[command(long_about = "Transcode measures how much CPU a live video encoder needs on this \n\
    machine at a range of output sizes, frame rates and presets, and \n\
    recommends the best combination that fits a CPU and bandwidth budget.\n\n\
    EXAMPLES:\n    \
    transcode autotune --upload 5 --unit mbps --cpu medium\n    \
    transcode autotune --local-file --cpu high --json\n    \
    transcode advise --upload 3000 --high-action\n    \
    transcode presets --show veryfast")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print the final result
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Benchmark the encoder and recommend output settings
    Autotune(CmdAutotune),
    /// Recommend bitrates and output size for an upload speed
    Advise(CmdAdvise),
    /// List encoder speed presets
    Presets(CmdPresets),
}

impl Cli {
    fn json(&self) -> bool {
        match &self.command {
            Commands::Autotune(cmd) => cmd.json,
            Commands::Advise(cmd) => cmd.json,
            Commands::Presets(cmd) => cmd.json,
        }
    }
}

fn print_header() {
    println!(
        "{} {}",
        style("transcode").cyan().bold(),
        style(env!("CARGO_PKG_VERSION")).dim()
    );
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging goes to stderr and stays off for machine-readable output
    if !cli.json() && !cli.quiet {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(if cli.verbose {
                tracing::Level::DEBUG
            } else {
                tracing::Level::INFO
            })
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    if !cli.json() && !cli.quiet {
        print_header();
    }

    match &cli.command {
        Commands::Autotune(cmd) => cmd.run(cli.quiet),
        Commands::Advise(cmd) => cmd.run(),
        Commands::Presets(cmd) => cmd.run(),
    }
}
