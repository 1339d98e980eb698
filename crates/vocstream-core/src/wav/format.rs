//! Sample metadata and WAV header parameters.

use serde::Serialize;

/// The only sample width the pipeline accepts, in bytes.
pub const SUPPORTED_SAMPLE_WIDTH: u16 = 2;

/// Sample layout of a source waveform.
///
/// Read once from the source header; drives both the downmix decision and
/// the output header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WaveformMetadata {
    /// Bytes per sample (always 2 once validated).
    pub sample_width_bytes: u16,
    /// Interleaved channel count.
    pub num_channels: u16,
    /// Frames per second.
    pub frame_rate_hz: u32,
}

impl WaveformMetadata {
    /// Creates 16-bit metadata.
    pub fn pcm16(num_channels: u16, frame_rate_hz: u32) -> Self {
        Self {
            sample_width_bytes: SUPPORTED_SAMPLE_WIDTH,
            num_channels,
            frame_rate_hz,
        }
    }

    /// Bytes per interleaved frame.
    pub fn frame_bytes(&self) -> usize {
        self.sample_width_bytes as usize * self.num_channels as usize
    }

    /// Returns true if the source needs downmixing before it reaches the vocoder.
    pub fn needs_downmix(&self) -> bool {
        self.num_channels > 1
    }

    /// Duration in seconds of `byte_len` bytes of single-channel data at this rate.
    pub fn mono_duration_secs(&self, byte_len: usize) -> f64 {
        if self.frame_rate_hz == 0 || self.sample_width_bytes == 0 {
            return 0.0;
        }
        let frames = byte_len / self.sample_width_bytes as usize;
        frames as f64 / self.frame_rate_hz as f64
    }
}

/// WAV file format parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    /// Number of channels (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bits per sample.
    pub bits_per_sample: u16,
}

impl WavFormat {
    /// Creates a 16-bit mono WAV format.
    pub fn mono(sample_rate: u32) -> Self {
        Self {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
        }
    }

    /// Creates a format matching the source's width and rate with `channels` channels.
    pub fn from_metadata(metadata: &WaveformMetadata, channels: u16) -> Self {
        Self {
            channels,
            sample_rate: metadata.frame_rate_hz,
            bits_per_sample: metadata.sample_width_bytes * 8,
        }
    }

    /// Calculates bytes per sample (per channel).
    pub(crate) fn bytes_per_sample(&self) -> u16 {
        self.bits_per_sample / 8
    }

    /// Calculates block align (bytes per sample frame).
    pub(crate) fn block_align(&self) -> u16 {
        self.channels * self.bytes_per_sample()
    }

    /// Calculates byte rate (bytes per second).
    pub(crate) fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }
}
