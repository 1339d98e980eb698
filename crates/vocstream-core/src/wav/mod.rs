//! Waveform container reading and writing.
//!
//! The reader parses RIFF/WAVE sources with `hound` and hands out raw
//! little-endian frame chunks. The writer emits a plain 44-byte PCM header
//! followed by the vocoder's output bytes, unmodified.

mod chunk;
mod format;
mod reader;
mod writer;


// Re-export public API
pub use chunk::FrameChunk;
pub use format::{WavFormat, WaveformMetadata, SUPPORTED_SAMPLE_WIDTH};
pub use reader::{Chunks, WaveformReader};
pub use writer::{write_wav, write_wav_file, write_wav_to_vec, WaveformWriter, WAV_HEADER_LEN};
