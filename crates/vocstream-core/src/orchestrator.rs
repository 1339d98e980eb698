//! End-to-end transcode: source waveform -> vocoder -> output waveform.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::downmix::downmix;
use crate::error::{PipelineError, PipelineResult};
use crate::locate::find_vocoder;
use crate::pipe::VocoderCommand;
use crate::wav::{WaveformMetadata, WaveformReader, WaveformWriter};

/// Default output file name.
pub const DEFAULT_OUTPUT_PATH: &str = "output.wav";

/// Default number of frames per chunk fed to the vocoder.
pub const DEFAULT_CHUNK_FRAMES: usize = 1024;

/// Configuration for a transcode run.
#[derive(Debug, Clone)]
pub struct TranscodeConfig {
    /// Vocoder executable; discovered when `None`.
    pub vocoder_path: Option<PathBuf>,
    /// Extra arguments passed after the frame-rate argument.
    pub vocoder_args: Vec<String>,
    /// Destination waveform.
    pub output_path: PathBuf,
    /// Frames per chunk read from the source.
    pub chunk_frames: usize,
    /// Deadline for the whole vocoder exchange.
    pub timeout: Option<Duration>,
    /// Whether to capture the vocoder's stderr.
    pub capture_stderr: bool,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            vocoder_path: None,
            vocoder_args: Vec::new(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            chunk_frames: DEFAULT_CHUNK_FRAMES,
            timeout: None,
            capture_stderr: true,
        }
    }
}

impl TranscodeConfig {
    /// Creates a config with the given vocoder executable.
    pub fn with_vocoder(path: impl Into<PathBuf>) -> Self {
        Self {
            vocoder_path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Sets the vocoder executable.
    pub fn vocoder_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.vocoder_path = Some(path.into());
        self
    }

    /// Appends an argument passed to the vocoder after the frame rate.
    pub fn vocoder_arg(mut self, arg: impl Into<String>) -> Self {
        self.vocoder_args.push(arg.into());
        self
    }

    /// Sets the destination path.
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    /// Sets the chunk size in frames.
    pub fn chunk_frames(mut self, frames: usize) -> Self {
        self.chunk_frames = frames;
        self
    }

    /// Sets the timeout duration.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Some(Duration::from_secs(secs));
        self
    }

    /// Sets whether the vocoder's stderr is captured.
    pub fn capture_stderr(mut self, capture: bool) -> Self {
        self.capture_stderr = capture;
        self
    }

    fn validate(&self) -> PipelineResult<()> {
        if self.chunk_frames == 0 {
            return Err(PipelineError::invalid_config(
                "chunk_frames must be at least 1",
            ));
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(PipelineError::invalid_config("timeout must be non-zero"));
        }
        Ok(())
    }
}

/// Summary of a successful transcode.
#[derive(Debug, Clone, Serialize)]
pub struct TranscodeReport {
    /// Path of the written waveform.
    pub output_path: PathBuf,
    /// Vocoder executable that was run.
    pub vocoder: PathBuf,
    /// Layout of the source waveform.
    pub input: WaveformMetadata,
    /// Frames in the source.
    pub input_frames: u32,
    /// Source duration in seconds.
    pub input_duration_secs: f64,
    /// Bytes written to the vocoder (after downmixing).
    pub bytes_fed: u64,
    /// Bytes received from the vocoder.
    pub bytes_received: usize,
    /// Declared duration of the output in seconds.
    pub output_duration_secs: f64,
    /// BLAKE3 hash of the output sample body.
    pub pcm_hash: String,
    /// Time spent streaming through the vocoder.
    pub elapsed_ms: u64,
    /// Captured vocoder stderr.
    pub stderr: String,
}

/// Runs source waveforms through a vocoder.
pub struct Transcoder {
    config: TranscodeConfig,
}

impl Transcoder {
    /// Creates a new transcoder with default configuration.
    pub fn new() -> Self {
        Self {
            config: TranscodeConfig::default(),
        }
    }

    /// Creates a new transcoder with the given configuration.
    pub fn with_config(config: TranscodeConfig) -> Self {
        Self { config }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &TranscodeConfig {
        &self.config
    }

    /// Transcodes `input` into the configured output file.
    ///
    /// The source is validated before the vocoder is spawned, and the output
    /// file is only written once the vocoder has exited successfully. The
    /// vocoder is reaped (or killed) on every path out of this function.
    pub fn run(&self, input: &Path) -> PipelineResult<TranscodeReport> {
        self.config.validate()?;

        let reader = WaveformReader::open(input)?;
        let metadata = reader.metadata();
        let input_frames = reader.total_frames();
        let input_duration_secs = reader.duration_secs();

        let (vocoder, source) = find_vocoder(self.config.vocoder_path.as_deref())?;
        debug!(path = %vocoder.display(), source = source.as_str(), "resolved vocoder");

        let mut process = VocoderCommand::new(&vocoder)
            .arg(metadata.frame_rate_hz.to_string())
            .args(self.config.vocoder_args.iter().cloned())
            .capture_stderr(self.config.capture_stderr)
            .spawn()?;

        let channels = metadata.num_channels;
        if metadata.needs_downmix() {
            debug!(channels, "downmixing to channel 0");
        }
        let chunks = reader
            .chunks(self.config.chunk_frames)
            .map(move |chunk| chunk.and_then(|chunk| downmix(chunk, channels)));

        let outcome = process.stream(chunks, self.config.timeout)?;

        let writer = WaveformWriter::new(&metadata);
        writer.write(&self.config.output_path, outcome.output.as_bytes())?;

        let report = TranscodeReport {
            output_path: self.config.output_path.clone(),
            vocoder,
            input: metadata,
            input_frames,
            input_duration_secs,
            bytes_fed: outcome.bytes_fed,
            bytes_received: outcome.output.len(),
            output_duration_secs: metadata.mono_duration_secs(outcome.output.len()),
            pcm_hash: blake3::hash(outcome.output.as_bytes()).to_hex().to_string(),
            elapsed_ms: outcome.elapsed.as_millis() as u64,
            stderr: outcome.stderr,
        };

        info!(
            input = %input.display(),
            output = %report.output_path.display(),
            bytes_received = report.bytes_received,
            "transcode complete"
        );
        Ok(report)
    }
}

impl Default for Transcoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Transcodes `input` through `vocoder` into `output`, returning the output path.
pub fn transcode(input: &Path, vocoder: &Path, output: &Path) -> PipelineResult<PathBuf> {
    let config = TranscodeConfig::with_vocoder(vocoder).output_path(output);
    Transcoder::with_config(config)
        .run(input)
        .map(|report| report.output_path)
}
