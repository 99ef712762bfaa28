//! CLI for noisepipe: transform pipelines over directories of noise recordings.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "noisepipe")]
#[command(about = "noisepipe: transform pipelines over directories of noise recordings")]
#[command(version = noisepipe_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pipeline from a JSON config file, or a single stage from flags
    Run {
        /// Path to a JSON pipeline config (overrides the single-stage flags)
        #[arg(long)]
        config: Option<String>,

        /// Transform to apply (see `noisepipe transforms`)
        #[arg(long)]
        transform: Option<String>,

        /// Gain parameter for the amplify transform
        #[arg(long, default_value = "1.0")]
        gain: f64,

        /// Input streams consumed jointly per transform invocation
        #[arg(long, default_value = "1")]
        arity: usize,

        /// Block size in frames; omit to process each file as a single block
        #[arg(long)]
        block_size: Option<usize>,

        /// Directory scanned for input .wav files
        #[arg(long)]
        input_dir: Option<String>,

        /// Directory the output containers are written to
        #[arg(long)]
        output: Option<String>,
    },

    /// Print the format of a .wav file, or of every .wav file in a directory
    Inspect {
        /// File or directory to inspect
        path: String,

        /// Emit machine-readable JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List the registered transforms and their parameters
    Transforms,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            transform,
            gain,
            arity,
            block_size,
            input_dir,
            output,
        } => commands::run::run(commands::run::RunCommandConfig {
            config_path: config.as_deref(),
            transform: transform.as_deref(),
            gain,
            arity,
            block_size,
            input_dir: input_dir.as_deref(),
            output: output.as_deref(),
        }),
        Commands::Inspect { path, json } => commands::inspect::run(&path, json),
        Commands::Transforms => commands::transforms::run(),
    }
}
