//! Stub vocoder that copies stdin to stdout as data arrives.
//!
//! Usage: `echo-vocoder <sample_rate>`

use std::io::{self, Read, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    if !has_sample_rate() {
        eprintln!("usage: echo-vocoder <sample_rate>");
        return ExitCode::from(2);
    }

    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    let mut buf = [0u8; 4096];
    loop {
        let n = match stdin.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                eprintln!("echo-vocoder: read failed: {}", e);
                return ExitCode::from(1);
            }
        };
        // Flush each block so output interleaves with input.
        if let Err(e) = stdout.write_all(&buf[..n]).and_then(|_| stdout.flush()) {
            eprintln!("echo-vocoder: write failed: {}", e);
            return ExitCode::from(1);
        }
    }
    ExitCode::SUCCESS
}

fn has_sample_rate() -> bool {
    std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse::<u32>().ok())
        .is_some_and(|rate| rate > 0)
}
