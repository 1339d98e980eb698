//! vocstream CLI - Stream WAV audio through an external vocoder
//!
//! This binary provides commands for transcoding, inspecting source files,
//! and checking the local vocoder setup.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use vocstream_cli::commands;
use vocstream_cli::commands::transcode::{TranscodeOptions, DEFAULT_INPUT_PATH};
use vocstream_core::{DEFAULT_CHUNK_FRAMES, DEFAULT_OUTPUT_PATH};

/// vocstream - stream 16-bit PCM through a vocoder process
#[derive(Parser)]
#[command(name = "vocstream")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transcode a WAV file through the vocoder
    Transcode {
        /// Source WAV file (16-bit integer PCM)
        #[arg(short, long, default_value = DEFAULT_INPUT_PATH)]
        input: PathBuf,

        /// Vocoder executable (default: $VOCSTREAM_VOCODER, PATH, then ./src/vocoder)
        #[arg(short, long)]
        vocoder: Option<PathBuf>,

        /// Destination WAV file
        #[arg(short, long, default_value = DEFAULT_OUTPUT_PATH)]
        output: PathBuf,

        /// Frames read from the source per chunk
        #[arg(long, default_value_t = DEFAULT_CHUNK_FRAMES)]
        chunk_frames: usize,

        /// Kill the vocoder if it has not finished after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,

        /// Extra arguments passed to the vocoder after the sample rate
        #[arg(last = true)]
        vocoder_args: Vec<String>,
    },

    /// Show the sample layout of a WAV file
    Inspect {
        /// WAV file to inspect
        #[arg(short, long)]
        input: PathBuf,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Check the vocoder installation and output permissions
    Doctor,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    vocstream_cli::init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Transcode {
            input,
            vocoder,
            output,
            chunk_frames,
            timeout_secs,
            json,
            vocoder_args,
        } => commands::transcode::run(&TranscodeOptions {
            input,
            vocoder,
            output,
            chunk_frames,
            timeout_secs,
            vocoder_args,
            json,
        }),
        Commands::Inspect { input, json } => commands::inspect::run(&input, json),
        Commands::Doctor => commands::doctor::run(),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}
