//! Channel reduction for interleaved 16-bit frames.
//!
//! Multi-channel sources are reduced to one channel by keeping a single
//! channel from every frame. Channel 0 (left) is the default; no averaging is
//! performed.

use crate::error::{PipelineError, PipelineResult};
use crate::wav::FrameChunk;

/// Bytes per 16-bit sample.
const SAMPLE_BYTES: usize = 2;

/// Reduces an interleaved chunk to its first channel.
///
/// Identity when `num_channels == 1`. Otherwise the chunk must hold a whole
/// number of frames, or [`PipelineError::MalformedChunk`] is returned.
pub fn downmix(chunk: FrameChunk, num_channels: u16) -> PipelineResult<FrameChunk> {
    if num_channels == 1 {
        return Ok(chunk);
    }
    select_channel(&chunk, num_channels, 0)
}

/// Extracts channel `index` from an interleaved chunk.
pub fn select_channel(
    chunk: &FrameChunk,
    num_channels: u16,
    index: u16,
) -> PipelineResult<FrameChunk> {
    if num_channels == 0 || index >= num_channels {
        return Err(PipelineError::invalid_config(format!(
            "channel {} does not exist in a {}-channel stream",
            index, num_channels
        )));
    }

    let frame_bytes = SAMPLE_BYTES * num_channels as usize;
    let bytes = chunk.as_bytes();
    if bytes.len() % frame_bytes != 0 {
        return Err(PipelineError::MalformedChunk {
            len: bytes.len(),
            frame_bytes,
        });
    }

    let offset = index as usize * SAMPLE_BYTES;
    let mut mono = Vec::with_capacity(bytes.len() / num_channels as usize);
    for frame in bytes.chunks_exact(frame_bytes) {
        let sample = i16::from_le_bytes([frame[offset], frame[offset + 1]]);
        mono.extend_from_slice(&sample.to_le_bytes());
    }

    Ok(FrameChunk::new(mono))
}
