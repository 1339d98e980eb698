//! Inspect command implementation
//!
//! Prints the layout of a WAV file and whether the pipeline can read it.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use std::process::ExitCode;

use vocstream_core::WaveformReader;

use super::json_output::{InspectOutput, JsonError};

/// Run the inspect command
///
/// # Returns
/// Exit code: 0 if the file is readable 16-bit PCM, 1 otherwise
pub fn run(input: &Path, json_output: bool) -> Result<ExitCode> {
    let result = WaveformReader::open(input);

    if json_output {
        let output = match &result {
            Ok(reader) => InspectOutput {
                success: true,
                path: input.display().to_string(),
                metadata: Some(reader.metadata()),
                frames: Some(reader.total_frames()),
                duration_secs: Some(reader.duration_secs()),
                errors: Vec::new(),
            },
            Err(err) => InspectOutput {
                success: false,
                path: input.display().to_string(),
                metadata: None,
                frames: None,
                duration_secs: None,
                errors: vec![JsonError::from(err)],
            },
        };
        let json = serde_json::to_string_pretty(&output).context("Failed to serialize output")?;
        println!("{}", json);
        return Ok(exit_code(result.is_ok()));
    }

    println!("{} {}", "Inspecting".cyan().bold(), input.display());
    match &result {
        Ok(reader) => {
            let meta = reader.metadata();
            println!("  {} {}", "Channels:".dimmed(), meta.num_channels);
            println!("  {} {} Hz", "Rate:".dimmed(), meta.frame_rate_hz);
            println!(
                "  {} {}-bit integer",
                "Samples:".dimmed(),
                meta.sample_width_bytes * 8
            );
            println!("  {} {}", "Frames:".dimmed(), reader.total_frames());
            println!("  {} {:.3} s", "Duration:".dimmed(), reader.duration_secs());
            if meta.needs_downmix() {
                println!(
                    "  {} {}",
                    "->".yellow(),
                    "channel 0 will be kept when transcoding".dimmed()
                );
            }
            println!("  {} readable by vocstream", "ok".green());
        }
        Err(err) => {
            println!("  {} [{}] {}", "!!".red(), err.code(), err);
        }
    }

    Ok(exit_code(result.is_ok()))
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
