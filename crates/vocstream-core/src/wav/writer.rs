//! WAV container writer for captured vocoder output.

use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use super::format::{WavFormat, WaveformMetadata};
use crate::error::{PipelineError, PipelineResult};

/// Size of the canonical PCM header emitted by [`write_wav`].
pub const WAV_HEADER_LEN: usize = 44;

/// Writes a complete WAV file to a writer.
///
/// `pcm_data` is copied verbatim as the sample body. The data chunk declares
/// its true byte length; an odd-length body is followed by the RIFF pad byte.
///
/// # Arguments
/// * `writer` - Output writer
/// * `format` - WAV format parameters
/// * `pcm_data` - Raw PCM samples as bytes
pub fn write_wav<W: Write>(writer: &mut W, format: &WavFormat, pcm_data: &[u8]) -> io::Result<()> {
    let pad = pcm_data.len() % 2;
    let data_size = u32::try_from(pcm_data.len())
        .ok()
        .filter(|size| size.checked_add(36 + pad as u32).is_some())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "sample data exceeds the 4 GiB RIFF limit",
            )
        })?;
    let file_size = 36 + data_size + pad as u32; // Total file size minus 8 bytes for RIFF header

    // RIFF header
    writer.write_all(b"RIFF")?;
    writer.write_all(&file_size.to_le_bytes())?;
    writer.write_all(b"WAVE")?;

    // fmt chunk
    writer.write_all(b"fmt ")?;
    writer.write_all(&16u32.to_le_bytes())?; // Chunk size (16 for PCM)
    writer.write_all(&1u16.to_le_bytes())?; // Audio format (1 = PCM)
    writer.write_all(&format.channels.to_le_bytes())?;
    writer.write_all(&format.sample_rate.to_le_bytes())?;
    writer.write_all(&format.byte_rate().to_le_bytes())?;
    writer.write_all(&format.block_align().to_le_bytes())?;
    writer.write_all(&format.bits_per_sample.to_le_bytes())?;

    // data chunk
    writer.write_all(b"data")?;
    writer.write_all(&data_size.to_le_bytes())?;
    writer.write_all(pcm_data)?;
    if pad == 1 {
        writer.write_all(&[0])?;
    }

    Ok(())
}

/// Writes a WAV file to a byte vector.
pub fn write_wav_to_vec(format: &WavFormat, pcm_data: &[u8]) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(WAV_HEADER_LEN + pcm_data.len() + 1);
    write_wav(&mut buffer, format, pcm_data)?;
    Ok(buffer)
}

/// Writes a WAV file to `path`.
///
/// The file is staged next to the destination and renamed into place, so a
/// failure never leaves a partially written destination behind.
pub fn write_wav_file(path: &Path, format: &WavFormat, pcm_data: &[u8]) -> PipelineResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = tempfile::Builder::new()
        .prefix(".vocstream-")
        .suffix(".wav.part")
        .tempfile_in(dir)
        .map_err(|e| PipelineError::write(path, e))?;

    {
        let mut out = BufWriter::new(staged.as_file_mut());
        write_wav(&mut out, format, pcm_data).map_err(|e| PipelineError::write(path, e))?;
        out.flush().map_err(|e| PipelineError::write(path, e))?;
    }

    staged
        .persist(path)
        .map_err(|e| PipelineError::write(path, e.error))?;

    debug!(
        path = %path.display(),
        channels = format.channels,
        sample_rate = format.sample_rate,
        data_bytes = pcm_data.len(),
        "wrote waveform"
    );
    Ok(())
}

/// Writes captured vocoder output as a waveform matching the source's layout.
#[derive(Debug, Clone, Copy)]
pub struct WaveformWriter {
    format: WavFormat,
}

impl WaveformWriter {
    /// Single-channel writer with the source's sample width and frame rate.
    pub fn new(metadata: &WaveformMetadata) -> Self {
        Self::with_channels(metadata, 1)
    }

    /// Writer declaring `channels` channels with the source's width and rate.
    pub fn with_channels(metadata: &WaveformMetadata, channels: u16) -> Self {
        Self {
            format: WavFormat::from_metadata(metadata, channels),
        }
    }

    /// Returns the header parameters this writer emits.
    pub fn format(&self) -> &WavFormat {
        &self.format
    }

    /// Writes the container to `path`.
    pub fn write(&self, path: &Path, data: &[u8]) -> PipelineResult<()> {
        write_wav_file(path, &self.format, data)
    }
}
