//! Test fixture utilities for generating source waveforms.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Sample rate used by most fixtures.
pub const FIXTURE_RATE: u32 = 44100;

fn pcm16_spec(channels: u16, sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

/// Writes interleaved 16-bit samples to a WAV file.
pub fn write_pcm16_wav(path: &Path, channels: u16, sample_rate: u32, samples: &[i16]) {
    let mut writer = hound::WavWriter::create(path, pcm16_spec(channels, sample_rate))
        .expect("Failed to create fixture WAV");
    for &sample in samples {
        writer.write_sample(sample).expect("Failed to write sample");
    }
    writer.finalize().expect("Failed to finalize fixture WAV");
}

/// Encodes interleaved 16-bit samples as an in-memory WAV file.
pub fn pcm16_wav_bytes(channels: u16, sample_rate: u32, samples: &[i16]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, pcm16_spec(channels, sample_rate))
            .expect("Failed to create in-memory WAV");
        for &sample in samples {
            writer.write_sample(sample).expect("Failed to write sample");
        }
        writer.finalize().expect("Failed to finalize in-memory WAV");
    }
    cursor.into_inner()
}

/// Writes an 8-bit WAV file, which the pipeline must reject.
pub fn write_pcm8_wav(path: &Path, channels: u16, frames: usize) {
    let spec = hound::WavSpec {
        channels,
        sample_rate: FIXTURE_RATE,
        bits_per_sample: 8,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("Failed to create fixture WAV");
    for i in 0..frames * channels as usize {
        writer
            .write_sample((i % 64) as i8)
            .expect("Failed to write sample");
    }
    writer.finalize().expect("Failed to finalize fixture WAV");
}

/// Interleaved samples where each channel carries a distinct ramp.
///
/// Channel `c` of frame `f` holds `(f * 7 + c * 1000) as i16`, so any
/// channel mix-up or frame reordering is visible in the output.
pub fn interleaved_ramp(channels: u16, frames: usize) -> Vec<i16> {
    let mut samples = Vec::with_capacity(frames * channels as usize);
    for frame in 0..frames {
        for channel in 0..channels as usize {
            samples.push((frame * 7 + channel * 1000) as i16);
        }
    }
    samples
}

/// Extracts one channel from interleaved samples.
pub fn channel(samples: &[i16], channels: u16, index: u16) -> Vec<i16> {
    samples
        .chunks_exact(channels as usize)
        .map(|frame| frame[index as usize])
        .collect()
}

/// Little-endian bytes of `samples`.
pub fn le_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Reads a WAV file back as its spec and 16-bit samples.
pub fn read_wav(path: &Path) -> (hound::WavSpec, Vec<i16>) {
    let mut reader = hound::WavReader::open(path).expect("Failed to open output WAV");
    let spec = reader.spec();
    let samples = reader
        .samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .expect("Failed to read output samples");
    (spec, samples)
}

/// BLAKE3 hex digest of `bytes`, matching the report's `pcm_hash`.
pub fn pcm_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// A temporary directory holding one source and one destination path.
pub struct PipelineFixture {
    pub root: TempDir,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl PipelineFixture {
    /// Create a fixture with no files written yet.
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        let input = root.path().join("input.wav");
        let output = root.path().join("output.wav");
        Self {
            root,
            input,
            output,
        }
    }

    /// Create a fixture whose input holds `samples` (interleaved).
    pub fn with_pcm16(channels: u16, samples: &[i16]) -> Self {
        let fixture = Self::new();
        write_pcm16_wav(&fixture.input, channels, FIXTURE_RATE, samples);
        fixture
    }

    /// Get the fixture root path.
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Number of entries in the fixture directory.
    pub fn entry_count(&self) -> usize {
        std::fs::read_dir(self.path())
            .expect("Failed to list fixture dir")
            .count()
    }
}

impl Default for PipelineFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleaved_ramp_layout() {
        let samples = interleaved_ramp(2, 3);
        assert_eq!(samples, vec![0, 1000, 7, 1007, 14, 1014]);
        assert_eq!(channel(&samples, 2, 0), vec![0, 7, 14]);
        assert_eq!(channel(&samples, 2, 1), vec![1000, 1007, 1014]);
    }

    #[test]
    fn test_fixture_roundtrip() {
        let fixture = PipelineFixture::with_pcm16(2, &interleaved_ramp(2, 10));
        let (spec, samples) = read_wav(&fixture.input);
        assert_eq!(spec.channels, 2);
        assert_eq!(samples.len(), 20);
    }
}
