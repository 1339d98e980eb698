//! Failure-path tests: every error leaves no output file and no running
//! vocoder behind.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p vocstream-tests --test failure
//! ```

use std::path::PathBuf;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use vocstream_core::{PipelineError, TranscodeConfig, Transcoder};
use vocstream_tests::fixtures::{interleaved_ramp, le_bytes, write_pcm8_wav, PipelineFixture};

fn echo_vocoder() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_echo-vocoder"))
}

fn hoarding_vocoder() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_hoarding-vocoder"))
}

fn failing_vocoder() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_failing-vocoder"))
}

#[test]
fn test_nonzero_exit_keeps_partial_output() {
    let samples = interleaved_ramp(1, 2000);
    let fixture = PipelineFixture::with_pcm16(1, &samples);

    let config = TranscodeConfig::with_vocoder(failing_vocoder()).output_path(&fixture.output);
    let err = Transcoder::with_config(config)
        .run(&fixture.input)
        .unwrap_err();

    match &err {
        PipelineError::VocoderFailed {
            exit_code, stderr, ..
        } => {
            assert_eq!(*exit_code, Some(3));
            assert!(stderr.contains("simulated failure"), "stderr: {}", stderr);
        }
        other => panic!("expected VocoderFailed, got {:?}", other),
    }
    assert_eq!(err.code(), "VOC_005");

    let partial = err.partial_output().unwrap();
    assert_eq!(partial.as_bytes(), &le_bytes(&samples)[..1000]);
    assert!(!fixture.output.exists());
}

#[test]
fn test_vocoder_exiting_without_reading() {
    // Large enough that the feeder cannot finish into the pipe buffer.
    let samples = interleaved_ramp(1, 1024 * 1024);
    let fixture = PipelineFixture::with_pcm16(1, &samples);

    let config = TranscodeConfig::with_vocoder(failing_vocoder())
        .vocoder_arg("--no-read")
        .output_path(&fixture.output)
        .timeout(Duration::from_secs(60));
    let err = Transcoder::with_config(config)
        .run(&fixture.input)
        .unwrap_err();

    assert!(
        matches!(
            err,
            PipelineError::VocoderFailed {
                exit_code: Some(3),
                ..
            }
        ),
        "got {:?}",
        err
    );
    assert!(err.partial_output().unwrap().is_empty());
    assert!(!fixture.output.exists());
}

#[test]
fn test_timeout_kills_vocoder() {
    let fixture = PipelineFixture::with_pcm16(1, &interleaved_ramp(1, 1000));

    let config = TranscodeConfig::with_vocoder(hoarding_vocoder())
        .vocoder_arg("--hang")
        .output_path(&fixture.output)
        .timeout(Duration::from_millis(500));

    let start = Instant::now();
    let err = Transcoder::with_config(config)
        .run(&fixture.input)
        .unwrap_err();

    assert!(matches!(err, PipelineError::Timeout { .. }), "got {:?}", err);
    assert!(start.elapsed() < Duration::from_secs(30));
    assert_eq!(err.category(), "vocoder");
    assert!(!fixture.output.exists());
}

#[test]
fn test_missing_vocoder_is_spawn_error() {
    let fixture = PipelineFixture::with_pcm16(1, &interleaved_ramp(1, 10));

    let config = TranscodeConfig::with_vocoder(fixture.path().join("no-such-vocoder"))
        .output_path(&fixture.output);
    let err = Transcoder::with_config(config)
        .run(&fixture.input)
        .unwrap_err();

    assert!(matches!(err, PipelineError::Spawn { .. }), "got {:?}", err);
    assert!(!fixture.output.exists());
}

#[test]
fn test_eight_bit_source_rejected() {
    let fixture = PipelineFixture::new();
    write_pcm8_wav(&fixture.input, 2, 100);

    let config = TranscodeConfig::with_vocoder(echo_vocoder()).output_path(&fixture.output);
    let err = Transcoder::with_config(config)
        .run(&fixture.input)
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::UnsupportedFormat {
            bits_per_sample: 8,
            ..
        }
    ));
    assert_eq!(err.category(), "source");
    assert!(!fixture.output.exists());
}

#[test]
fn test_truncated_source_rejected() {
    let fixture = PipelineFixture::with_pcm16(2, &interleaved_ramp(2, 100));
    let mut bytes = std::fs::read(&fixture.input).unwrap();
    bytes.truncate(bytes.len() - 3);
    std::fs::write(&fixture.input, &bytes).unwrap();

    let config = TranscodeConfig::with_vocoder(echo_vocoder()).output_path(&fixture.output);
    let err = Transcoder::with_config(config)
        .run(&fixture.input)
        .unwrap_err();

    assert!(matches!(err, PipelineError::Read { .. }), "got {:?}", err);
    assert!(!fixture.output.exists());
}

#[test]
fn test_unwritable_destination() {
    let fixture = PipelineFixture::with_pcm16(1, &interleaved_ramp(1, 10));
    let output = fixture.path().join("missing_dir").join("out.wav");

    let config = TranscodeConfig::with_vocoder(echo_vocoder()).output_path(&output);
    let err = Transcoder::with_config(config)
        .run(&fixture.input)
        .unwrap_err();

    assert!(matches!(err, PipelineError::Write { .. }), "got {:?}", err);
    assert!(!output.exists());
}
