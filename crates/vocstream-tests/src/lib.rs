//! vocstream End-to-End Test Infrastructure
//!
//! This crate provides integration tests for the transcoding pipeline:
//!
//! - End-to-end: stereo and mono sources through streaming stub vocoders
//! - **Deadlock regression**: multi-megabyte payloads through vocoders that
//!   emit nothing until end of input
//! - Failure paths: non-zero exit, early exit, timeouts, unsupported sources
//! - Properties: chunking is exhaustive and downmixing keeps channel 0
//!
//! ## Stub vocoders
//!
//! The crate builds three binaries used as vocoders by the tests:
//!
//! | Binary | Behaviour |
//! |--------|-----------|
//! | `echo-vocoder` | copies stdin to stdout as it arrives |
//! | `hoarding-vocoder` | buffers all input, writes it after EOF (`--hang` never writes) |
//! | `failing-vocoder` | writes part of its input, then exits with status 3 (`--no-read` exits immediately) |
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p vocstream-tests
//! ```

pub mod fixtures;
