//! Doctor command implementation
//!
//! Checks the vocoder installation and output directory permissions.

use anyhow::Result;
use colored::Colorize;
use std::env;
use std::path::Path;
use std::process::ExitCode;

use vocstream_core::{find_vocoder, PipelineError, VOCODER_ENV};

use super::transcode::DEFAULT_INPUT_PATH;

/// Run the doctor command
///
/// Checks:
/// - Vocoder discovery
/// - Current directory is writable
/// - Default input file presence (informational)
///
/// # Returns
/// Exit code: 0 if all checks pass, 1 if any fail
pub fn run() -> Result<ExitCode> {
    println!("{}", "vocstream Doctor".cyan().bold());
    println!("{}", "================".cyan());
    println!();

    let mut all_ok = true;

    println!("{}", "Versions:".bold());
    println!(
        "  {} vocstream-cli v{}",
        "->".green(),
        env!("CARGO_PKG_VERSION")
    );
    println!();

    println!("{}", "Vocoder:".bold());
    match find_vocoder(None) {
        Ok((path, source)) => {
            println!(
                "  {} {} (from {})",
                "ok".green(),
                path.display(),
                source.as_str()
            );
        }
        Err(PipelineError::VocoderNotFound) => {
            println!("  {} vocoder not found", "!!".red());
            println!(
                "     {}",
                format!(
                    "Set {} or put 'vocoder' on PATH, or pass --vocoder to transcode.",
                    VOCODER_ENV
                )
                .dimmed()
            );
            all_ok = false;
        }
        Err(e) => {
            println!("  {} vocoder check failed: {}", "!!".red(), e);
            all_ok = false;
        }
    }
    println!();

    println!("{}", "Permissions:".bold());
    match env::current_dir() {
        Ok(dir) => match check_writable(&dir) {
            Ok(()) => println!(
                "  {} Current directory is writable ({})",
                "ok".green(),
                dir.display()
            ),
            Err(e) => {
                println!("  {} Cannot write to current directory: {}", "!!".red(), e);
                all_ok = false;
            }
        },
        Err(e) => {
            println!("  {} Cannot determine current directory: {}", "!!".red(), e);
            all_ok = false;
        }
    }
    println!();

    println!("{}", "Inputs:".bold());
    if Path::new(DEFAULT_INPUT_PATH).is_file() {
        println!("  {} {} present", "ok".green(), DEFAULT_INPUT_PATH);
    } else {
        // Not a hard failure - the input can always be passed explicitly
        println!(
            "  {} {} not found (pass --input to transcode)",
            "!!".yellow(),
            DEFAULT_INPUT_PATH
        );
    }
    println!();

    if all_ok {
        println!("{} All checks passed!", "SUCCESS".green().bold());
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "{} Some checks failed. See above for details.",
            "WARNING".yellow().bold()
        );
        Ok(ExitCode::from(1))
    }
}

/// Checks that a file can be created (and removed) in `dir`.
fn check_writable(dir: &Path) -> std::io::Result<()> {
    let probe = dir.join(".vocstream_write_test");
    std::fs::write(&probe, b"test")?;
    std::fs::remove_file(&probe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_writable_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        check_writable(dir.path()).unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_check_writable_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_writable(&dir.path().join("missing")).is_err());
    }
}
