//! End-to-end transcoding through streaming stub vocoders.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p vocstream-tests --test e2e
//! ```

use std::path::PathBuf;

use pretty_assertions::assert_eq;
use vocstream_core::{
    transcode, TranscodeConfig, Transcoder, VocoderProcess, WaveformMetadata, WaveformReader,
};
use vocstream_tests::fixtures::{
    channel, interleaved_ramp, le_bytes, pcm_hash, read_wav, PipelineFixture, FIXTURE_RATE,
};

fn echo_vocoder() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_echo-vocoder"))
}

fn hoarding_vocoder() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_hoarding-vocoder"))
}

#[test]
fn test_stereo_source_becomes_left_channel_mono() {
    // One second of stereo audio.
    let frames = FIXTURE_RATE as usize;
    let samples = interleaved_ramp(2, frames);
    let fixture = PipelineFixture::with_pcm16(2, &samples);

    let config = TranscodeConfig::with_vocoder(echo_vocoder()).output_path(&fixture.output);
    let report = Transcoder::with_config(config).run(&fixture.input).unwrap();

    assert_eq!(report.input, WaveformMetadata::pcm16(2, FIXTURE_RATE));
    assert_eq!(report.input_frames, frames as u32);
    assert_eq!(report.bytes_fed, (frames * 2) as u64);
    assert_eq!(report.bytes_received, frames * 2);
    assert!((report.output_duration_secs - 1.0).abs() < 1e-9);

    let (spec, output) = read_wav(&fixture.output);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, FIXTURE_RATE);
    assert_eq!(spec.bits_per_sample, 16);

    let left = channel(&samples, 2, 0);
    assert_eq!(output, left);
    assert_eq!(report.pcm_hash, pcm_hash(&le_bytes(&left)));
}

#[test]
fn test_mono_source_passes_through() {
    let samples = interleaved_ramp(1, 5000);
    let fixture = PipelineFixture::with_pcm16(1, &samples);

    let path = transcode(&fixture.input, &echo_vocoder(), &fixture.output).unwrap();
    assert_eq!(path, fixture.output);

    let (spec, output) = read_wav(&fixture.output);
    assert_eq!(spec.channels, 1);
    assert_eq!(output, samples);
}

#[test]
fn test_four_channel_source() {
    let samples = interleaved_ramp(4, 3000);
    let fixture = PipelineFixture::with_pcm16(4, &samples);

    let config = TranscodeConfig::with_vocoder(hoarding_vocoder())
        .output_path(&fixture.output)
        .chunk_frames(100);
    Transcoder::with_config(config).run(&fixture.input).unwrap();

    let (_, output) = read_wav(&fixture.output);
    assert_eq!(output, channel(&samples, 4, 0));
}

#[test]
fn test_empty_source_gives_empty_output() {
    let fixture = PipelineFixture::with_pcm16(2, &[]);

    let config = TranscodeConfig::with_vocoder(echo_vocoder()).output_path(&fixture.output);
    let report = Transcoder::with_config(config).run(&fixture.input).unwrap();
    assert_eq!(report.bytes_fed, 0);
    assert_eq!(report.bytes_received, 0);

    let (spec, output) = read_wav(&fixture.output);
    assert_eq!(spec.channels, 1);
    assert!(output.is_empty());
}

#[test]
fn test_chunk_size_does_not_change_output() {
    let samples = interleaved_ramp(2, 4321);
    let fixture = PipelineFixture::with_pcm16(2, &samples);

    let mut hashes = Vec::new();
    for chunk_frames in [1, 17, 1024, 100_000] {
        let output = fixture.path().join(format!("out_{}.wav", chunk_frames));
        let config = TranscodeConfig::with_vocoder(echo_vocoder())
            .output_path(&output)
            .chunk_frames(chunk_frames);
        let report = Transcoder::with_config(config).run(&fixture.input).unwrap();
        hashes.push(report.pcm_hash);
    }
    assert!(hashes.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_output_overwrites_existing_file() {
    let samples = interleaved_ramp(1, 100);
    let fixture = PipelineFixture::with_pcm16(1, &samples);
    std::fs::write(&fixture.output, b"stale").unwrap();

    transcode(&fixture.input, &echo_vocoder(), &fixture.output).unwrap();

    let (_, output) = read_wav(&fixture.output);
    assert_eq!(output, samples);
    // input.wav and output.wav only; the staging file is gone.
    assert_eq!(fixture.entry_count(), 2);
}

#[test]
fn test_process_level_sequential_exchange() {
    // Small payloads fit in the pipe buffer, so the sequential
    // feed -> close -> drain -> wait path works for them.
    let payload = le_bytes(&interleaved_ramp(1, 256));
    let mut process = VocoderProcess::spawn(echo_vocoder(), &["8000".to_string()]).unwrap();

    process.feed(&payload).unwrap();
    process.close_input();
    let output = process.drain_all().unwrap();
    let status = process.wait().unwrap();

    assert!(status.success());
    assert_eq!(output.as_bytes(), payload.as_slice());
}

#[test]
fn test_reader_metadata_matches_fixture() {
    let fixture = PipelineFixture::with_pcm16(2, &interleaved_ramp(2, 441));
    let reader = WaveformReader::open(&fixture.input).unwrap();
    assert_eq!(reader.metadata(), WaveformMetadata::pcm16(2, FIXTURE_RATE));
    assert_eq!(reader.total_frames(), 441);
    assert!((reader.duration_secs() - 0.01).abs() < 1e-9);
}
