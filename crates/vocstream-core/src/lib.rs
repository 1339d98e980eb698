//! vocstream core
//!
//! Streams a 16-bit PCM waveform through an external vocoder process and
//! captures the vocoder's output as a new single-channel waveform.
//!
//! # Pipeline
//!
//! ```text
//! WaveformReader -> downmix (channels > 1) -> vocoder stdin
//!                                                 |
//!                       WaveformWriter <- vocoder stdout
//! ```
//!
//! The vocoder is invoked as `<vocoder> <frame_rate_hz> [extra args...]`. It
//! receives raw little-endian 16-bit mono samples on stdin with no framing,
//! and signals completion by closing stdout and exiting with status 0.
//!
//! Feeding and draining always run concurrently, so vocoders that emit output
//! while still consuming input, and vocoders that buffer everything until end
//! of input, are both handled without pipe deadlock.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use vocstream_core::{TranscodeConfig, Transcoder};
//!
//! let config = TranscodeConfig::with_vocoder("./src/vocoder").output_path("output.wav");
//! let report = Transcoder::with_config(config).run(Path::new("test_data/Recording.wav"))?;
//! println!("wrote {} bytes to {}", report.bytes_received, report.output_path.display());
//! ```
//!
//! # Crate Structure
//!
//! - [`wav`] - Container reading and writing
//! - [`downmix`] - Channel selection
//! - [`pipe`] - Vocoder subprocess management
//! - [`orchestrator`] - End-to-end transcode
//! - [`locate`] - Vocoder discovery
//! - [`error`] - Error types

pub mod downmix;
pub mod error;
pub mod locate;
pub mod orchestrator;
pub mod pipe;
pub mod wav;

// Re-export main types at crate root
pub use downmix::{downmix, select_channel};
pub use error::{PipelineError, PipelineResult};
pub use locate::{find_vocoder, VocoderSource, DEFAULT_VOCODER_PATH, VOCODER_ENV};
pub use orchestrator::{
    transcode, TranscodeConfig, TranscodeReport, Transcoder, DEFAULT_CHUNK_FRAMES,
    DEFAULT_OUTPUT_PATH,
};
pub use pipe::{
    OutputBuffer, StreamOutcome, VocoderCommand, VocoderInput, VocoderOutput, VocoderProcess,
};
pub use wav::{FrameChunk, WaveformMetadata, WaveformReader, WaveformWriter};
