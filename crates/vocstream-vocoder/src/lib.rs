//! STFT phase vocoder.
//!
//! Time-stretches a mono signal without changing its pitch. Frames are taken
//! every [`ANALYSIS_HOP`] samples, their per-bin instantaneous frequency is
//! estimated from the phase advance, and the frames are re-synthesised every
//! `round(ANALYSIS_HOP * stretch)` samples with phases accumulated at those
//! frequencies.

use std::f64::consts::PI;
use std::io::{self, Read, Write};
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use thiserror::Error;

/// Analysis/synthesis window length in samples.
pub const WINDOW_SIZE: usize = 1024;

/// Samples between analysis frames.
pub const ANALYSIS_HOP: usize = WINDOW_SIZE / 4;

/// Default time-stretch factor (1.5 = 50% slower).
pub const DEFAULT_STRETCH: f64 = 1.5;

/// Full-scale value used to normalise 16-bit samples.
const MAX_INT16: f64 = 32767.0;

/// Window-sum values below this are treated as silence during normalisation.
const NORM_FLOOR: f64 = 1e-8;

/// Errors produced by the vocoder.
#[derive(Debug, Error)]
pub enum VocoderError {
    /// Stretch factor is not a positive finite number.
    #[error("invalid stretch factor {0}: must be a positive finite number")]
    InvalidStretch(f64),

    /// Stretch factor leads to a zero synthesis hop.
    #[error("stretch factor {0} is too small for a {1}-sample analysis hop")]
    StretchTooSmall(f64, usize),

    /// I/O error on stdin/stdout.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Symmetric Hann window of length `n`.
pub fn hann_window(n: usize) -> Vec<f64> {
    if n < 2 {
        return vec![1.0; n];
    }
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / (n - 1) as f64).cos()))
        .collect()
}

/// Wraps a phase to `[-PI, PI]`.
fn principal_arg(phase: f64) -> f64 {
    phase - 2.0 * PI * (phase / (2.0 * PI)).round()
}

/// A configured phase vocoder.
pub struct PhaseVocoder {
    stretch: f64,
    synthesis_hop: usize,
    window: Vec<f64>,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl PhaseVocoder {
    /// Creates a vocoder with the given time-stretch factor.
    pub fn new(stretch: f64) -> Result<Self, VocoderError> {
        if !stretch.is_finite() || stretch <= 0.0 {
            return Err(VocoderError::InvalidStretch(stretch));
        }
        let synthesis_hop = (ANALYSIS_HOP as f64 * stretch).round() as usize;
        if synthesis_hop == 0 {
            return Err(VocoderError::StretchTooSmall(stretch, ANALYSIS_HOP));
        }

        let mut planner = FftPlanner::new();
        Ok(Self {
            stretch,
            synthesis_hop,
            window: hann_window(WINDOW_SIZE),
            forward: planner.plan_fft_forward(WINDOW_SIZE),
            inverse: planner.plan_fft_inverse(WINDOW_SIZE),
        })
    }

    /// Returns the configured stretch factor.
    pub fn stretch(&self) -> f64 {
        self.stretch
    }

    /// Returns the synthesis hop in samples.
    pub fn synthesis_hop(&self) -> usize {
        self.synthesis_hop
    }

    /// Output length for an input of `input_len` samples.
    pub fn output_len(&self, input_len: usize) -> usize {
        if input_len < WINDOW_SIZE {
            return 0;
        }
        let frames = 1 + (input_len - WINDOW_SIZE) / ANALYSIS_HOP;
        (frames - 1) * self.synthesis_hop + WINDOW_SIZE
    }

    /// Time-stretches `signal`. Inputs shorter than one window yield no output.
    pub fn process(&self, signal: &[f64]) -> Vec<f64> {
        let out_len = self.output_len(signal.len());
        if out_len == 0 {
            return Vec::new();
        }
        let frames = 1 + (signal.len() - WINDOW_SIZE) / ANALYSIS_HOP;

        let mut output = vec![0.0; out_len];
        let mut window_sum = vec![0.0; out_len];
        let mut last_phase = vec![0.0; WINDOW_SIZE];
        let mut synth_phase = vec![0.0; WINDOW_SIZE];
        let mut frame = vec![Complex::new(0.0, 0.0); WINDOW_SIZE];
        let scale = 1.0 / WINDOW_SIZE as f64;

        for i in 0..frames {
            let start = i * ANALYSIS_HOP;
            for (j, bin) in frame.iter_mut().enumerate() {
                *bin = Complex::new(signal[start + j] * self.window[j], 0.0);
            }
            self.forward.process(&mut frame);

            for (k, bin) in frame.iter_mut().enumerate() {
                let magnitude = bin.norm();
                let phase = bin.arg();
                if i == 0 {
                    synth_phase[k] = phase;
                } else {
                    let bin_freq = 2.0 * PI * k as f64 / WINDOW_SIZE as f64;
                    let deviation =
                        principal_arg(phase - last_phase[k] - bin_freq * ANALYSIS_HOP as f64);
                    let true_freq = bin_freq + deviation / ANALYSIS_HOP as f64;
                    synth_phase[k] += true_freq * self.synthesis_hop as f64;
                }
                last_phase[k] = phase;
                *bin = Complex::from_polar(magnitude, synth_phase[k]);
            }
            self.inverse.process(&mut frame);

            let offset = i * self.synthesis_hop;
            for (j, bin) in frame.iter().enumerate() {
                let w = self.window[j];
                output[offset + j] += bin.re * scale * w;
                window_sum[offset + j] += w * w;
            }
        }

        for (sample, norm) in output.iter_mut().zip(&window_sum) {
            if *norm > NORM_FLOOR {
                *sample /= norm;
            }
        }
        output
    }
}

/// Decodes little-endian 16-bit samples to `[-1, 1]`. A trailing odd byte is dropped.
pub fn decode_pcm16(bytes: &[u8]) -> Vec<f64> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f64 / MAX_INT16)
        .collect()
}

/// Encodes samples as clamped little-endian 16-bit PCM, truncating toward zero.
pub fn encode_pcm16(samples: &[f64]) -> Vec<u8> {
    let mut pcm = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * MAX_INT16) as i16;
        pcm.extend_from_slice(&value.to_le_bytes());
    }
    pcm
}

/// Reads all PCM from `input`, stretches it, and writes PCM to `output`.
///
/// Returns the number of samples written.
pub fn run<R: Read, W: Write>(
    vocoder: &PhaseVocoder,
    input: &mut R,
    output: &mut W,
) -> Result<usize, VocoderError> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;

    let signal = decode_pcm16(&bytes);
    let stretched = vocoder.process(&signal);
    output.write_all(&encode_pcm16(&stretched))?;
    output.flush()?;
    Ok(stretched.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sine(len: usize, freq: f64, rate: f64) -> Vec<f64> {
        (0..len)
            .map(|i| 0.5 * (2.0 * PI * freq * i as f64 / rate).sin())
            .collect()
    }

    #[test]
    fn test_hann_window_shape() {
        let w = hann_window(5);
        assert!(w[0].abs() < 1e-12);
        assert!((w[2] - 1.0).abs() < 1e-12);
        assert!(w[4].abs() < 1e-12);
    }

    #[test]
    fn test_invalid_stretch() {
        assert!(matches!(
            PhaseVocoder::new(0.0),
            Err(VocoderError::InvalidStretch(_))
        ));
        assert!(PhaseVocoder::new(f64::NAN).is_err());
        assert!(matches!(
            PhaseVocoder::new(0.001),
            Err(VocoderError::StretchTooSmall(..))
        ));
    }

    #[test]
    fn test_short_input_yields_nothing() {
        let vocoder = PhaseVocoder::new(DEFAULT_STRETCH).unwrap();
        assert!(vocoder.process(&vec![0.1; WINDOW_SIZE - 1]).is_empty());
    }

    #[test]
    fn test_output_length_scales_with_stretch() {
        let vocoder = PhaseVocoder::new(1.5).unwrap();
        assert_eq!(vocoder.synthesis_hop(), 384);

        let input = sine(44100, 440.0, 44100.0);
        let output = vocoder.process(&input);
        assert_eq!(output.len(), vocoder.output_len(input.len()));

        let ratio = output.len() as f64 / input.len() as f64;
        assert!((ratio - 1.5).abs() < 0.05, "ratio = {}", ratio);
    }

    #[test]
    fn test_unit_stretch_reconstructs_signal() {
        let vocoder = PhaseVocoder::new(1.0).unwrap();
        let input = sine(8192, 1000.0, 44100.0);
        let output = vocoder.process(&input);

        for i in WINDOW_SIZE..output.len() - WINDOW_SIZE {
            assert!(
                (output[i] - input[i]).abs() < 1e-6,
                "sample {} differs: {} vs {}",
                i,
                output[i],
                input[i]
            );
        }
    }

    #[test]
    fn test_pcm_codec() {
        let bytes = encode_pcm16(&[0.0, 1.0, -1.0, 2.0]);
        assert_eq!(bytes.len(), 8);
        let decoded = decode_pcm16(&bytes);
        assert_eq!(decoded[0], 0.0);
        assert_eq!(decoded[1], 1.0);
        assert_eq!(decoded[2], -1.0);
        assert_eq!(decoded[3], 1.0); // clamped
    }

    #[test]
    fn test_encode_truncates_toward_zero() {
        let decoded = |bytes: Vec<u8>| {
            bytes
                .chunks_exact(2)
                .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
                .collect::<Vec<_>>()
        };
        assert_eq!(
            decoded(encode_pcm16(&[0.99999, -0.99999, 0.5, -0.5])),
            vec![32766, -32766, 16383, -16383]
        );
    }

    #[test]
    fn test_run_streams() {
        let vocoder = PhaseVocoder::new(2.0).unwrap();
        let input = encode_pcm16(&sine(4096, 220.0, 22050.0));
        let mut output = Vec::new();

        let written = run(&vocoder, &mut input.as_slice(), &mut output).unwrap();
        assert_eq!(written, vocoder.output_len(4096));
        assert_eq!(output.len(), written * 2);
    }
}
