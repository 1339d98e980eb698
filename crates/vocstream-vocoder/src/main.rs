//! Reference vocoder.
//!
//! Reads raw little-endian 16-bit mono PCM from stdin until end of input,
//! time-stretches it, and writes the result to stdout in the same format.
//!
//! ```text
//! vocoder <sample_rate> [--stretch F]
//! ```

use std::io::{self, BufWriter};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use vocstream_vocoder::{run, PhaseVocoder, DEFAULT_STRETCH};

/// Time-stretch 16-bit mono PCM from stdin to stdout
#[derive(Parser)]
#[command(name = "vocoder")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Sample rate of the input in Hz
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    sample_rate: u32,

    /// Time-stretch factor (greater than 1 slows the audio down)
    #[arg(long, default_value_t = DEFAULT_STRETCH)]
    stretch: f64,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // Usage errors exit 1; --help and --version exit 0.
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // stdout carries audio, so diagnostics go to stderr only.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("vocoder: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn execute(cli: &Cli) -> Result<()> {
    let vocoder = PhaseVocoder::new(cli.stretch)?;
    debug!(
        sample_rate = cli.sample_rate,
        stretch = vocoder.stretch(),
        synthesis_hop = vocoder.synthesis_hop(),
        "starting"
    );

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut input = stdin.lock();
    let mut output = BufWriter::new(stdout.lock());

    let samples = run(&vocoder, &mut input, &mut output).context("failed to process audio")?;
    debug!(samples, "done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_sample_rate_and_stretch() {
        let cli = Cli::try_parse_from(["vocoder", "44100", "--stretch", "2.0"]).unwrap();
        assert_eq!(cli.sample_rate, 44100);
        assert_eq!(cli.stretch, 2.0);
    }

    #[test]
    fn test_cli_default_stretch() {
        let cli = Cli::try_parse_from(["vocoder", "22050"]).unwrap();
        assert_eq!(cli.stretch, DEFAULT_STRETCH);
    }

    #[test]
    fn test_cli_requires_sample_rate() {
        let err = Cli::try_parse_from(["vocoder"]).err().unwrap();
        assert!(err.use_stderr());
    }

    #[test]
    fn test_cli_rejects_zero_sample_rate() {
        assert!(Cli::try_parse_from(["vocoder", "0"]).is_err());
    }
}
