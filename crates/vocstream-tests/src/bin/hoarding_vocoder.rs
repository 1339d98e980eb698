//! Stub vocoder that emits nothing until its input is closed.
//!
//! Usage: `hoarding-vocoder <sample_rate> [--hang]`
//!
//! With `--hang` it never writes or exits after EOF.

use std::io::{self, Read, Write};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().and_then(|a| a.parse::<u32>().ok()).is_none() {
        eprintln!("usage: hoarding-vocoder <sample_rate> [--hang]");
        return ExitCode::from(2);
    }
    let hang = args.iter().any(|a| a == "--hang");

    let mut input = Vec::new();
    if let Err(e) = io::stdin().lock().read_to_end(&mut input) {
        eprintln!("hoarding-vocoder: read failed: {}", e);
        return ExitCode::from(1);
    }

    if hang {
        loop {
            thread::sleep(Duration::from_secs(60));
        }
    }

    let mut stdout = io::stdout().lock();
    if let Err(e) = stdout.write_all(&input).and_then(|_| stdout.flush()) {
        eprintln!("hoarding-vocoder: write failed: {}", e);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}
