//! Interleaved frame chunks.

/// An ordered run of interleaved little-endian samples.
///
/// Chunks produced by [`WaveformReader`](super::WaveformReader) always hold a
/// whole number of frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameChunk {
    bytes: Vec<u8>,
}

impl FrameChunk {
    /// Wraps raw sample bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Returns the raw sample bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the chunk, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the chunk holds no samples.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of complete 16-bit frames for the given channel count.
    pub fn frame_count(&self, num_channels: u16) -> usize {
        match num_channels {
            0 => 0,
            n => self.bytes.len() / (2 * n as usize),
        }
    }

    /// Decodes the chunk into signed 16-bit samples.
    ///
    /// A trailing odd byte is ignored; callers that need strict alignment
    /// check it first.
    pub fn samples(&self) -> impl Iterator<Item = i16> + '_ {
        self.bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
    }

    /// Encodes signed 16-bit samples as a little-endian chunk.
    pub fn from_samples(samples: &[i16]) -> Self {
        let mut bytes = Vec::with_capacity(samples.len() * 2);
        for sample in samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        Self { bytes }
    }
}

impl From<Vec<u8>> for FrameChunk {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl AsRef<[u8]> for FrameChunk {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
