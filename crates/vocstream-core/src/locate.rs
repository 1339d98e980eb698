//! Vocoder executable discovery.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{PipelineError, PipelineResult};

/// Environment variable naming the vocoder executable.
pub const VOCODER_ENV: &str = "VOCSTREAM_VOCODER";

/// Relative location used when nothing else is configured.
pub const DEFAULT_VOCODER_PATH: &str = "./src/vocoder";

/// Where a vocoder path was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VocoderSource {
    /// Explicitly configured path.
    Explicit,
    /// The `VOCSTREAM_VOCODER` environment variable.
    Environment,
    /// Found on `PATH`.
    SearchPath,
    /// The relative default location.
    Default,
}

impl VocoderSource {
    /// Returns a short human-readable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            VocoderSource::Explicit => "explicit",
            VocoderSource::Environment => "environment",
            VocoderSource::SearchPath => "PATH",
            VocoderSource::Default => "default",
        }
    }
}

/// Finds the vocoder executable.
///
/// Search order: `explicit`, then `VOCSTREAM_VOCODER`, then `vocoder` on
/// `PATH`, then [`DEFAULT_VOCODER_PATH`]. An explicit path that does not
/// exist is still returned, so the spawn error names it.
pub fn find_vocoder(explicit: Option<&Path>) -> PipelineResult<(PathBuf, VocoderSource)> {
    if let Some(path) = explicit {
        return Ok((path.to_path_buf(), VocoderSource::Explicit));
    }

    if let Some(path) = std::env::var_os(VOCODER_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            debug!(path = %path.display(), "vocoder from {}", VOCODER_ENV);
            return Ok((path, VocoderSource::Environment));
        }
        debug!(path = %path.display(), "{} points at a missing file, ignoring", VOCODER_ENV);
    }

    let names = if cfg!(windows) {
        vec!["vocoder.exe", "vocoder"]
    } else {
        vec!["vocoder"]
    };
    for name in names {
        if let Ok(path) = which::which(name) {
            return Ok((path, VocoderSource::SearchPath));
        }
    }

    let fallback = PathBuf::from(DEFAULT_VOCODER_PATH);
    if fallback.exists() {
        return Ok((fallback, VocoderSource::Default));
    }

    Err(PipelineError::VocoderNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let (path, source) = find_vocoder(Some(Path::new("/opt/custom/vocoder"))).unwrap();
        assert_eq!(path, PathBuf::from("/opt/custom/vocoder"));
        assert_eq!(source, VocoderSource::Explicit);
    }

    #[test]
    fn test_source_labels() {
        assert_eq!(VocoderSource::Explicit.as_str(), "explicit");
        assert_eq!(VocoderSource::SearchPath.as_str(), "PATH");
    }
}
