//! Transcode command implementation
//!
//! Streams a WAV file through the vocoder and writes the result.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use vocstream_core::{PipelineError, TranscodeConfig, TranscodeReport, Transcoder};

use super::json_output::TranscodeOutput;

/// Input used when `--input` is omitted.
pub const DEFAULT_INPUT_PATH: &str = "test_data/Recording.wav";

/// Options for a transcode run, as parsed from the command line.
#[derive(Debug, Clone)]
pub struct TranscodeOptions {
    pub input: PathBuf,
    pub vocoder: Option<PathBuf>,
    pub output: PathBuf,
    pub chunk_frames: usize,
    pub timeout_secs: Option<u64>,
    pub vocoder_args: Vec<String>,
    pub json: bool,
}

impl TranscodeOptions {
    /// Builds the pipeline configuration.
    pub fn to_config(&self) -> TranscodeConfig {
        let mut config = TranscodeConfig::default()
            .output_path(&self.output)
            .chunk_frames(self.chunk_frames);
        if let Some(vocoder) = &self.vocoder {
            config = config.vocoder_path(vocoder);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.timeout(Duration::from_secs(secs));
        }
        for arg in &self.vocoder_args {
            config = config.vocoder_arg(arg);
        }
        config
    }
}

/// Run the transcode command
///
/// # Returns
/// Exit code: 0 if the output was written, 1 otherwise
pub fn run(options: &TranscodeOptions) -> Result<ExitCode> {
    let transcoder = Transcoder::with_config(options.to_config());
    let result = transcoder.run(&options.input);

    if options.json {
        let output = match &result {
            Ok(report) => TranscodeOutput::success(report.clone()),
            Err(err) => TranscodeOutput::failure(err),
        };
        let json = serde_json::to_string_pretty(&output).context("Failed to serialize output")?;
        println!("{}", json);
    } else {
        println!(
            "{} {}",
            "Transcoding".cyan().bold(),
            options.input.display()
        );
        match &result {
            Ok(report) => print_report(report),
            Err(err) => print_failure(err),
        }
    }

    Ok(if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn print_report(report: &TranscodeReport) {
    let input = &report.input;
    println!("  {} {}", "Vocoder:".dimmed(), report.vocoder.display());
    println!(
        "  {} {} ch, {} Hz, {}-bit, {:.2} s ({} frames)",
        "Source:".dimmed(),
        input.num_channels,
        input.frame_rate_hz,
        input.sample_width_bytes * 8,
        report.input_duration_secs,
        report.input_frames
    );
    if input.needs_downmix() {
        println!("  {} kept channel 0", "Downmix:".dimmed());
    }
    println!("  {} {} bytes", "Fed:".dimmed(), report.bytes_fed);
    println!(
        "  {} {} bytes ({:.2} s)",
        "Received:".dimmed(),
        report.bytes_received,
        report.output_duration_secs
    );
    println!("  {} {}", "Hash:".dimmed(), &report.pcm_hash[..16]);
    println!("  {} {} ms", "Elapsed:".dimmed(), report.elapsed_ms);
    if !report.stderr.trim().is_empty() {
        println!("  {}", "Vocoder stderr:".dimmed());
        for line in report.stderr.lines() {
            println!("    {}", line.dimmed());
        }
    }
    println!();
    println!(
        "{} wrote {}",
        "SUCCESS".green().bold(),
        report.output_path.display()
    );
}

fn print_failure(err: &PipelineError) {
    println!("  {} [{}] {}", "!!".red(), err.code(), err);
    if let Some(partial) = err.partial_output() {
        println!(
            "     {}",
            format!(
                "{} bytes of vocoder output were captured; no output file was written.",
                partial.len()
            )
            .dimmed()
        );
    }
    if let PipelineError::VocoderNotFound = err {
        println!(
            "     {}",
            "Run `vocstream doctor` to see where the vocoder is searched for.".dimmed()
        );
    }
}
