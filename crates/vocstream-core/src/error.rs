//! Error types for the transcoding pipeline.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::pipe::OutputBuffer;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that can occur while transcoding a waveform through a vocoder.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The source container is not 16-bit integer PCM.
    #[error("unsupported sample format: {bits_per_sample}-bit {encoding} (only 16-bit integer PCM is supported)")]
    UnsupportedFormat {
        /// Declared bit depth of the source.
        bits_per_sample: u16,
        /// Sample encoding ("integer" or "float").
        encoding: &'static str,
    },

    /// A frame chunk does not hold a whole number of frames.
    #[error("malformed chunk: {len} bytes is not a multiple of the {frame_bytes}-byte frame size")]
    MalformedChunk {
        /// Length of the offending chunk in bytes.
        len: usize,
        /// Expected frame size in bytes.
        frame_bytes: usize,
    },

    /// No vocoder executable could be located.
    #[error("vocoder executable not found. Pass an explicit path, set VOCSTREAM_VOCODER, or put 'vocoder' on PATH")]
    VocoderNotFound,

    /// The vocoder process could not be started.
    #[error("failed to spawn vocoder '{program}': {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The vocoder exited unsuccessfully. Output drained before exit is kept.
    #[error("vocoder exited with {status}: {stderr}")]
    VocoderFailed {
        /// Exit status description (code or signal).
        status: String,
        /// Exit code, if the process exited normally.
        exit_code: Option<i32>,
        /// Captured standard error (empty when not captured).
        stderr: String,
        /// Output drained from the vocoder before it exited.
        output: OutputBuffer,
    },

    /// The vocoder did not finish before the configured deadline.
    #[error("vocoder timed out after {timeout:?}")]
    Timeout {
        timeout: Duration,
        /// Output drained before the process was terminated.
        output: OutputBuffer,
    },

    /// Failed to read or parse the source container.
    #[error("failed to read waveform {path}: {message}")]
    Read { path: PathBuf, message: String },

    /// Failed to write the destination container.
    #[error("failed to write waveform {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing to the vocoder's input stream failed.
    #[error("failed to feed vocoder input: {0}")]
    Feed(#[source] std::io::Error),

    /// Reading the vocoder's output stream failed.
    #[error("failed to drain vocoder output: {0}")]
    Drain(#[source] std::io::Error),

    /// Reaping the vocoder process failed.
    #[error("failed to wait for vocoder: {0}")]
    Wait(#[source] std::io::Error),

    /// A configuration value is out of range.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl PipelineError {
    /// Creates a read error for the given path.
    pub fn read(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Read {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a write error for the given path.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Output captured from the vocoder before a failure, if any.
    pub fn partial_output(&self) -> Option<&OutputBuffer> {
        match self {
            PipelineError::VocoderFailed { output, .. } | PipelineError::Timeout { output, .. } => {
                Some(output)
            }
            _ => None,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::UnsupportedFormat { .. } => "VOC_001",
            PipelineError::MalformedChunk { .. } => "VOC_002",
            PipelineError::VocoderNotFound => "VOC_003",
            PipelineError::Spawn { .. } => "VOC_004",
            PipelineError::VocoderFailed { .. } => "VOC_005",
            PipelineError::Timeout { .. } => "VOC_006",
            PipelineError::Read { .. } => "VOC_007",
            PipelineError::Write { .. } => "VOC_008",
            PipelineError::Feed(_) => "VOC_009",
            PipelineError::Drain(_) => "VOC_010",
            PipelineError::InvalidConfig { .. } => "VOC_011",
            PipelineError::Wait(_) => "VOC_012",
        }
    }

    /// Pipeline stage the error belongs to.
    pub fn category(&self) -> &'static str {
        match self {
            PipelineError::UnsupportedFormat { .. } | PipelineError::Read { .. } => "source",
            PipelineError::MalformedChunk { .. } => "downmix",
            PipelineError::VocoderNotFound
            | PipelineError::Spawn { .. }
            | PipelineError::VocoderFailed { .. }
            | PipelineError::Timeout { .. }
            | PipelineError::Feed(_)
            | PipelineError::Drain(_)
            | PipelineError::Wait(_) => "vocoder",
            PipelineError::Write { .. } => "destination",
            PipelineError::InvalidConfig { .. } => "config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::UnsupportedFormat {
            bits_per_sample: 8,
            encoding: "integer",
        };
        assert!(err.to_string().contains("8-bit integer"));

        let err = PipelineError::MalformedChunk {
            len: 7,
            frame_bytes: 4,
        };
        assert!(err.to_string().contains("7 bytes"));

        let err = PipelineError::read("in.wav", "no RIFF tag found");
        assert!(err.to_string().contains("in.wav"));
        assert!(err.to_string().contains("no RIFF tag"));
    }

    #[test]
    fn test_partial_output() {
        let err = PipelineError::VocoderFailed {
            status: "exit status: 3".to_string(),
            exit_code: Some(3),
            stderr: String::new(),
            output: OutputBuffer::from(vec![1, 2, 3]),
        };
        assert_eq!(err.partial_output().unwrap().as_bytes(), &[1, 2, 3]);
        assert_eq!(err.code(), "VOC_005");
        assert_eq!(err.category(), "vocoder");

        assert!(PipelineError::VocoderNotFound.partial_output().is_none());
    }
}
