//! Sequential frame-chunk reader for 16-bit PCM waveforms.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::chunk::FrameChunk;
use super::format::{WaveformMetadata, SUPPORTED_SAMPLE_WIDTH};
use crate::error::{PipelineError, PipelineResult};

/// Forward-only reader over a waveform's sample body.
///
/// Once [`next_chunk`](Self::next_chunk) returns `Ok(None)` (or an error) the
/// reader stays exhausted.
pub struct WaveformReader<R: Read = BufReader<File>> {
    inner: hound::WavReader<R>,
    metadata: WaveformMetadata,
    source: PathBuf,
    samples_left: u32,
    finished: bool,
}

impl WaveformReader<BufReader<File>> {
    /// Opens a waveform file and validates that it is 16-bit integer PCM.
    pub fn open(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let inner = hound::WavReader::open(path)
            .map_err(|e| PipelineError::read(path, e.to_string()))?;
        Self::from_hound(inner, path.to_path_buf())
    }
}

impl<R: Read> WaveformReader<R> {
    /// Parses a waveform from an arbitrary byte source.
    pub fn new(reader: R) -> PipelineResult<Self> {
        let source = PathBuf::from("<stream>");
        let inner =
            hound::WavReader::new(reader).map_err(|e| PipelineError::read(&source, e.to_string()))?;
        Self::from_hound(inner, source)
    }

    fn from_hound(inner: hound::WavReader<R>, source: PathBuf) -> PipelineResult<Self> {
        let spec = inner.spec();

        if spec.sample_format != hound::SampleFormat::Int {
            return Err(PipelineError::UnsupportedFormat {
                bits_per_sample: spec.bits_per_sample,
                encoding: "float",
            });
        }
        if spec.bits_per_sample != SUPPORTED_SAMPLE_WIDTH * 8 {
            return Err(PipelineError::UnsupportedFormat {
                bits_per_sample: spec.bits_per_sample,
                encoding: "integer",
            });
        }
        if spec.channels == 0 {
            return Err(PipelineError::read(&source, "header declares zero channels"));
        }
        if spec.sample_rate == 0 {
            return Err(PipelineError::read(&source, "header declares a zero frame rate"));
        }

        let metadata = WaveformMetadata::pcm16(spec.channels, spec.sample_rate);
        let samples_left = inner.len();

        debug!(
            source = %source.display(),
            channels = metadata.num_channels,
            frame_rate_hz = metadata.frame_rate_hz,
            frames = inner.duration(),
            "opened waveform"
        );

        Ok(Self {
            inner,
            metadata,
            source,
            samples_left,
            finished: false,
        })
    }

    /// Returns the validated sample metadata.
    pub fn metadata(&self) -> WaveformMetadata {
        self.metadata
    }

    /// Total number of frames declared by the header.
    pub fn total_frames(&self) -> u32 {
        self.inner.duration()
    }

    /// Duration of the source in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.total_frames() as f64 / self.metadata.frame_rate_hz as f64
    }

    /// Path the reader was opened from (`<stream>` for in-memory sources).
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Reads the next chunk of at most `max_frames` complete frames.
    ///
    /// Returns `Ok(None)` at end of stream, and on every call after that.
    /// A body that ends mid-sample or mid-frame is reported as an error
    /// rather than truncated.
    pub fn next_chunk(&mut self, max_frames: usize) -> PipelineResult<Option<FrameChunk>> {
        if self.finished {
            return Ok(None);
        }
        if max_frames == 0 {
            return Err(PipelineError::invalid_config("chunk size must be at least one frame"));
        }

        let channels = self.metadata.num_channels as usize;
        let wanted = max_frames
            .saturating_mul(channels)
            .min(self.samples_left as usize);
        let mut bytes = Vec::with_capacity(wanted * 2);

        for sample in self.inner.samples::<i16>().take(wanted) {
            match sample {
                Ok(value) => bytes.extend_from_slice(&value.to_le_bytes()),
                Err(e) => {
                    self.finished = true;
                    return Err(PipelineError::read(&self.source, e.to_string()));
                }
            }
        }
        self.samples_left -= (bytes.len() / 2) as u32;

        if bytes.is_empty() {
            self.finished = true;
            return Ok(None);
        }

        let frame_bytes = self.metadata.frame_bytes();
        if bytes.len() % frame_bytes != 0 {
            self.finished = true;
            return Err(PipelineError::MalformedChunk {
                len: bytes.len(),
                frame_bytes,
            });
        }

        Ok(Some(FrameChunk::new(bytes)))
    }

    /// Turns the reader into an iterator of chunks of at most `max_frames` frames.
    pub fn chunks(self, max_frames: usize) -> Chunks<R> {
        Chunks {
            reader: self,
            max_frames,
        }
    }
}

/// Iterator over the remaining chunks of a [`WaveformReader`].
pub struct Chunks<R: Read> {
    reader: WaveformReader<R>,
    max_frames: usize,
}

impl<R: Read> Chunks<R> {
    /// Returns the metadata of the underlying reader.
    pub fn metadata(&self) -> WaveformMetadata {
        self.reader.metadata()
    }
}

impl<R: Read> Iterator for Chunks<R> {
    type Item = PipelineResult<FrameChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.next_chunk(self.max_frames) {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => None,
            Err(e) => {
                self.reader.finished = true;
                Some(Err(e))
            }
        }
    }
}
