//! JSON output types for machine-readable CLI output.
//!
//! Emitted by `transcode --json` and `inspect --json`. Error codes are the
//! stable `VOC_xxx` codes from the core library.

use serde::Serialize;
use vocstream_core::{PipelineError, TranscodeReport, WaveformMetadata};

/// A structured error in JSON output.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct JsonError {
    /// Stable error code (e.g., "VOC_005")
    pub code: String,
    /// Pipeline stage the error belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Human-readable error message
    pub message: String,
}

impl From<&PipelineError> for JsonError {
    fn from(err: &PipelineError) -> Self {
        Self {
            code: err.code().to_string(),
            category: Some(err.category().to_string()),
            message: err.to_string(),
        }
    }
}

/// Output of `transcode --json`.
#[derive(Debug, Serialize)]
pub struct TranscodeOutput {
    /// Whether the output file was written
    pub success: bool,
    /// Run summary on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<TranscodeReport>,
    /// Errors encountered
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<JsonError>,
    /// Bytes the vocoder produced before failing, if any were captured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_output_bytes: Option<usize>,
}

impl TranscodeOutput {
    /// Creates a successful output.
    pub fn success(report: TranscodeReport) -> Self {
        Self {
            success: true,
            report: Some(report),
            errors: Vec::new(),
            partial_output_bytes: None,
        }
    }

    /// Creates a failed output.
    pub fn failure(err: &PipelineError) -> Self {
        Self {
            success: false,
            report: None,
            errors: vec![JsonError::from(err)],
            partial_output_bytes: err.partial_output().map(|buf| buf.len()),
        }
    }
}

/// Output of `inspect --json`.
#[derive(Debug, Serialize)]
pub struct InspectOutput {
    /// Whether the file could be read
    pub success: bool,
    /// Inspected file
    pub path: String,
    /// Sample layout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<WaveformMetadata>,
    /// Frames in the sample body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames: Option<u32>,
    /// Duration in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    /// Errors encountered
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<JsonError>,
}
