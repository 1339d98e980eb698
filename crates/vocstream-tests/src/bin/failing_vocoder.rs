//! Stub vocoder that fails after producing some output.
//!
//! Usage: `failing-vocoder <sample_rate> [--no-read]`
//!
//! Consumes all input, echoes the first [`PARTIAL_BYTES`] bytes, reports an
//! error on stderr and exits with status 3. With `--no-read` it exits with
//! status 3 before reading anything.

use std::io::{self, Read, Write};
use std::process::ExitCode;

/// Bytes of input echoed before failing.
const PARTIAL_BYTES: usize = 1000;

fn main() -> ExitCode {
    if std::env::args().skip(1).any(|a| a == "--no-read") {
        eprintln!("failing-vocoder: refusing input");
        return ExitCode::from(3);
    }

    let mut input = Vec::new();
    if let Err(e) = io::stdin().lock().read_to_end(&mut input) {
        eprintln!("failing-vocoder: read failed: {}", e);
        return ExitCode::from(1);
    }

    let partial = &input[..input.len().min(PARTIAL_BYTES)];
    let mut stdout = io::stdout().lock();
    let _ = stdout.write_all(partial).and_then(|_| stdout.flush());

    eprintln!("failing-vocoder: simulated failure after {} bytes", partial.len());
    ExitCode::from(3)
}
