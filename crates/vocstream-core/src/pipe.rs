//! Vocoder subprocess management.
//!
//! The vocoder is driven through two one-directional pipes. Feeding and
//! draining always run on separate threads: a child that writes output while
//! it is still consuming input would otherwise fill its stdout pipe and stall
//! with our writes blocked on its full stdin pipe.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::wav::FrameChunk;

/// Read size used when draining vocoder output.
const DRAIN_BUF_SIZE: usize = 64 * 1024;

/// How long a child that stopped accepting input gets to exit on its own.
const FEED_GRACE: Duration = Duration::from_secs(2);

/// How long the pipe readers get to finish once the vocoder has been killed.
const KILL_GRACE: Duration = Duration::from_millis(500);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Raw bytes captured from the vocoder's output stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputBuffer(Vec<u8>);

impl OutputBuffer {
    /// Returns the captured bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the buffer, returning its bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    /// Number of captured bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for OutputBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for OutputBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Builder for a vocoder invocation.
#[derive(Debug, Clone)]
pub struct VocoderCommand {
    program: PathBuf,
    args: Vec<String>,
    capture_stderr: bool,
    working_dir: Option<PathBuf>,
}

impl VocoderCommand {
    /// Creates a command for the given executable. Stderr is captured by default.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            capture_stderr: true,
            working_dir: None,
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments in order.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Captures stderr (`true`) or lets the child inherit ours (`false`).
    pub fn capture_stderr(mut self, capture: bool) -> Self {
        self.capture_stderr = capture;
        self
    }

    /// Sets the child's working directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Starts the process with piped stdin and stdout.
    pub fn spawn(&self) -> PipelineResult<VocoderProcess> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped());
        if self.capture_stderr {
            cmd.stderr(Stdio::piped());
        } else {
            cmd.stderr(Stdio::inherit());
        }
        if let Some(ref cwd) = self.working_dir {
            cmd.current_dir(cwd);
        }

        let mut child = cmd.spawn().map_err(|source| PipelineError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        info!(
            program = %self.program.display(),
            args = ?self.args,
            pid = child.id(),
            "spawned vocoder"
        );

        Ok(VocoderProcess {
            program: self.program.clone(),
            stdin: child.stdin.take(),
            stdout: child.stdout.take(),
            stderr: child.stderr.take(),
            child,
            reaped: false,
        })
    }
}

/// Writable half of a vocoder's pipes.
#[derive(Debug)]
pub struct VocoderInput {
    stdin: ChildStdin,
    written: u64,
}

impl VocoderInput {
    /// Writes one chunk, blocking until the pipe accepts all of it.
    pub fn feed(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stdin.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    /// Flushes and closes the pipe, signalling end of input.
    pub fn close(mut self) -> io::Result<u64> {
        self.stdin.flush()?;
        Ok(self.written)
    }
}

/// Readable half of a vocoder's pipes.
#[derive(Debug)]
pub struct VocoderOutput {
    stdout: ChildStdout,
}

impl VocoderOutput {
    /// Reads until end of stream, keeping bytes in order.
    pub fn drain_all(mut self) -> io::Result<OutputBuffer> {
        let mut output = Vec::new();
        self.read_each(|bytes| {
            output.extend_from_slice(bytes);
            true
        })?;
        Ok(OutputBuffer(output))
    }

    /// Sends each read to `tx` as it arrives. Stops early once nobody listens.
    fn drain_into(mut self, tx: &Sender<Event>) -> io::Result<()> {
        self.read_each(|bytes| tx.send(Event::Output(bytes.to_vec())).is_ok())
    }

    fn read_each(&mut self, mut sink: impl FnMut(&[u8]) -> bool) -> io::Result<()> {
        let mut buf = vec![0u8; DRAIN_BUF_SIZE];
        loop {
            match self.stdout.read(&mut buf) {
                Ok(0) => return Ok(()),
                Ok(n) => {
                    if !sink(&buf[..n]) {
                        return Ok(());
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

/// Everything a completed exchange with the vocoder produced.
#[derive(Debug)]
pub struct StreamOutcome {
    /// Bytes captured from the vocoder's stdout.
    pub output: OutputBuffer,
    /// Bytes written to the vocoder's stdin.
    pub bytes_fed: u64,
    /// Exit status of the reaped process.
    pub status: ExitStatus,
    /// Captured stderr (empty when not captured).
    pub stderr: String,
    /// Wall-clock time spent streaming.
    pub elapsed: Duration,
}

enum Event {
    Fed(PipelineResult<u64>),
    Output(Vec<u8>),
    Drained(io::Result<()>),
    Stderr(String),
}

/// A running vocoder process.
///
/// Dropping a process that has not been reaped kills and reaps it.
#[derive(Debug)]
pub struct VocoderProcess {
    child: Child,
    program: PathBuf,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    reaped: bool,
}

impl VocoderProcess {
    /// Spawns `program` with `args`, capturing stderr.
    pub fn spawn(program: impl AsRef<Path>, args: &[String]) -> PipelineResult<Self> {
        VocoderCommand::new(program.as_ref())
            .args(args.iter().cloned())
            .spawn()
    }

    /// Executable this process was started from.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// OS process id.
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Writes bytes to the vocoder's stdin on the calling thread.
    ///
    /// Only safe for inputs that fit in the pipe buffer, or when another
    /// thread is draining; prefer [`stream`](Self::stream).
    pub fn feed(&mut self, bytes: &[u8]) -> PipelineResult<()> {
        let stdin = self.stdin.as_mut().ok_or_else(|| {
            PipelineError::Feed(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "vocoder input is already closed",
            ))
        })?;
        stdin.write_all(bytes).map_err(PipelineError::Feed)
    }

    /// Closes stdin. The process stays readable.
    pub fn close_input(&mut self) {
        if let Some(mut stdin) = self.stdin.take() {
            let _ = stdin.flush();
        }
    }

    /// Reads stdout to end of stream on the calling thread.
    pub fn drain_all(&mut self) -> PipelineResult<OutputBuffer> {
        let output = self.take_output().ok_or_else(|| {
            PipelineError::Drain(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "vocoder output was already taken",
            ))
        })?;
        output.drain_all().map_err(PipelineError::Drain)
    }

    /// Detaches the writable half, for use on another thread.
    pub fn take_input(&mut self) -> Option<VocoderInput> {
        self.stdin
            .take()
            .map(|stdin| VocoderInput { stdin, written: 0 })
    }

    /// Detaches the readable half, for use on another thread.
    pub fn take_output(&mut self) -> Option<VocoderOutput> {
        self.stdout.take().map(|stdout| VocoderOutput { stdout })
    }

    /// Kills the process. Errors (e.g. it already exited) are ignored.
    pub fn kill(&mut self) {
        if self.reaped {
            return;
        }
        if let Err(e) = self.child.kill() {
            debug!(pid = self.id(), error = %e, "kill failed");
        }
    }

    /// Waits for the process to exit, closing stdin first if still open.
    pub fn wait(&mut self) -> PipelineResult<ExitStatus> {
        self.close_input();
        let status = self.child.wait().map_err(PipelineError::Wait)?;
        self.reaped = true;
        debug!(pid = self.id(), %status, "vocoder exited");
        Ok(status)
    }

    /// Polls for exit until `deadline`, returning `None` if the process is still
    /// running then. Without a deadline this blocks like [`wait`](Self::wait).
    fn wait_until(&mut self, deadline: Option<Instant>) -> PipelineResult<Option<ExitStatus>> {
        let Some(deadline) = deadline else {
            return self.wait().map(Some);
        };
        self.close_input();
        loop {
            match self.child.try_wait().map_err(PipelineError::Wait)? {
                Some(status) => {
                    self.reaped = true;
                    debug!(pid = self.id(), %status, "vocoder exited");
                    return Ok(Some(status));
                }
                None if Instant::now() >= deadline => return Ok(None),
                None => thread::sleep(POLL_INTERVAL),
            }
        }
    }

    /// Streams `chunks` into the vocoder while draining its output, then reaps it.
    ///
    /// The feeder, the drainer and the stderr reader run on their own threads
    /// and report back over a channel. If the feeder or drainer fails, the
    /// process is killed so the other unblocks.
    ///
    /// With a `timeout`, the whole exchange is bounded: feeding, draining and
    /// the final exit. Once the deadline passes the process is killed and
    /// [`PipelineError::Timeout`] is returned with the output drained so far.
    /// Readers still blocked [`KILL_GRACE`] after a kill (a grandchild holding
    /// the pipes open) are abandoned rather than joined.
    ///
    /// A non-zero exit yields [`PipelineError::VocoderFailed`] carrying the
    /// output drained so far.
    pub fn stream<I>(&mut self, chunks: I, timeout: Option<Duration>) -> PipelineResult<StreamOutcome>
    where
        I: Iterator<Item = PipelineResult<FrameChunk>> + Send + 'static,
    {
        let input = self.take_input().ok_or_else(|| {
            PipelineError::Feed(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "vocoder input is already closed",
            ))
        })?;
        let output = self.take_output().ok_or_else(|| {
            PipelineError::Drain(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "vocoder output was already taken",
            ))
        })?;
        let started = Instant::now();

        let (tx, rx) = mpsc::channel();
        let mut pending = 2;

        let feed_tx = tx.clone();
        thread::spawn(move || {
            let _ = feed_tx.send(Event::Fed(feed_all(input, chunks)));
        });
        let drain_tx = tx.clone();
        thread::spawn(move || {
            let result = output.drain_into(&drain_tx);
            let _ = drain_tx.send(Event::Drained(result));
        });
        if let Some(pipe) = self.stderr.take() {
            pending += 1;
            let stderr_tx = tx.clone();
            thread::spawn(move || {
                let _ = stderr_tx.send(Event::Stderr(read_lossy(pipe)));
            });
        }
        drop(tx);

        let mut deadline = timeout.map(|limit| started + limit);
        let mut first_error: Option<PipelineError> = None;
        let mut killed = false;
        let mut timed_out = false;
        let mut bytes_fed = 0u64;
        let mut drained = Vec::new();
        let mut stderr_text = String::new();

        while pending > 0 {
            let received = match deadline {
                Some(at) => rx.recv_timeout(at.saturating_duration_since(Instant::now())),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            let event = match received {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) if !killed => {
                    warn!(
                        pid = self.id(),
                        timeout_ms = timeout.unwrap_or_default().as_millis() as u64,
                        "vocoder timed out, killing"
                    );
                    timed_out = true;
                    killed = true;
                    self.kill();
                    deadline = Some(Instant::now() + KILL_GRACE);
                    continue;
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        pid = self.id(),
                        pending,
                        "vocoder pipes still open after kill, abandoning readers"
                    );
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            };
            if !matches!(event, Event::Output(_)) {
                pending -= 1;
            }

            match event {
                Event::Output(bytes) => drained.extend_from_slice(&bytes),
                Event::Fed(Ok(n)) => {
                    bytes_fed = n;
                    debug!(bytes = n, "vocoder input closed");
                }
                Event::Fed(Err(e)) => {
                    let broken_pipe = matches!(&e, PipelineError::Feed(io_err)
                        if io_err.kind() == io::ErrorKind::BrokenPipe);
                    let grace = deadline.map_or(FEED_GRACE, |at| {
                        FEED_GRACE.min(at.saturating_duration_since(Instant::now()))
                    });
                    if !killed && !(broken_pipe && self.exits_within(grace)) {
                        warn!(pid = self.id(), error = %e, "feeder failed, killing vocoder");
                        killed = true;
                        self.kill();
                        deadline = Some(kill_deadline(deadline));
                    }
                    first_error.get_or_insert(e);
                }
                Event::Drained(Ok(())) => {
                    debug!(bytes = drained.len(), "vocoder output drained");
                }
                Event::Drained(Err(e)) => {
                    if !killed {
                        warn!(pid = self.id(), error = %e, "drainer failed, killing vocoder");
                        killed = true;
                        self.kill();
                        deadline = Some(kill_deadline(deadline));
                    }
                    first_error.get_or_insert(PipelineError::Drain(e));
                }
                Event::Stderr(text) => stderr_text = text,
            }
        }

        let status = match self.wait_until(deadline)? {
            Some(status) => status,
            None => {
                if !killed {
                    warn!(pid = self.id(), "vocoder still running at deadline, killing");
                    timed_out = true;
                }
                self.kill();
                self.wait()?
            }
        };
        let elapsed = started.elapsed();
        let drained = OutputBuffer(drained);

        if timed_out {
            return Err(PipelineError::Timeout {
                timeout: timeout.unwrap_or_default(),
                output: drained,
            });
        }
        if killed {
            if let Some(e) = first_error {
                return Err(e);
            }
        }
        if !status.success() {
            return Err(PipelineError::VocoderFailed {
                status: status.to_string(),
                exit_code: status.code(),
                stderr: stderr_text.trim_end().to_string(),
                output: drained,
            });
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        info!(
            program = %self.program().display(),
            bytes_fed,
            bytes_received = drained.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "vocoder finished"
        );

        Ok(StreamOutcome {
            output: drained,
            bytes_fed,
            status,
            stderr: stderr_text,
            elapsed,
        })
    }

    /// Polls until the process exits or `grace` elapses.
    fn exits_within(&mut self, grace: Duration) -> bool {
        let start = Instant::now();
        loop {
            match self.child.try_wait() {
                Ok(Some(_)) => return true,
                Ok(None) if start.elapsed() < grace => thread::sleep(POLL_INTERVAL),
                _ => return false,
            }
        }
    }
}

impl Drop for VocoderProcess {
    fn drop(&mut self) {
        if self.reaped {
            return;
        }
        self.stdin.take();
        self.stdout.take();
        self.stderr.take();
        if let Ok(None) = self.child.try_wait() {
            warn!(pid = self.id(), "vocoder still running on drop, killing");
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

/// The earlier of `deadline` and [`KILL_GRACE`] from now.
fn kill_deadline(deadline: Option<Instant>) -> Instant {
    let grace = Instant::now() + KILL_GRACE;
    deadline.map_or(grace, |at| at.min(grace))
}

fn feed_all<I>(mut input: VocoderInput, chunks: I) -> PipelineResult<u64>
where
    I: Iterator<Item = PipelineResult<FrameChunk>>,
{
    for chunk in chunks {
        let chunk = chunk?;
        input.feed(chunk.as_bytes()).map_err(PipelineError::Feed)?;
    }
    input.close().map_err(PipelineError::Feed)
}

fn read_lossy(mut pipe: ChildStderr) -> String {
    let mut buf = Vec::new();
    let _ = pipe.read_to_end(&mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sh(script: &str) -> VocoderProcess {
        VocoderCommand::new("sh").arg("-c").arg(script).spawn().unwrap()
    }

    fn chunks_of(data: &[u8], size: usize) -> Vec<PipelineResult<FrameChunk>> {
        data.chunks(size)
            .map(|c| Ok(FrameChunk::new(c.to_vec())))
            .collect()
    }

    #[test]
    fn test_spawn_missing_executable() {
        let err = VocoderProcess::spawn("/nonexistent/vocstream/vocoder", &[]).unwrap_err();
        assert!(matches!(err, PipelineError::Spawn { .. }));
    }

    #[test]
    fn test_feed_close_drain_sequential() {
        let mut process = sh("cat");
        assert_eq!(process.program(), Path::new("sh"));
        assert!(process.id() > 0);
        process.feed(b"hello ").unwrap();
        process.feed(b"vocoder").unwrap();
        process.close_input();
        let output = process.drain_all().unwrap();
        let status = process.wait().unwrap();

        assert!(status.success());
        assert_eq!(output.as_bytes(), b"hello vocoder");
    }

    #[test]
    fn test_feed_after_close_fails() {
        let mut process = sh("cat");
        process.close_input();
        assert!(matches!(
            process.feed(b"late"),
            Err(PipelineError::Feed(_))
        ));
        process.wait().unwrap();
    }

    #[test]
    fn test_stream_echo_large_input() {
        // Several pipe buffers' worth, echoed back while still being fed.
        let data: Vec<u8> = (0..4 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
        let mut process = sh("cat");
        let outcome = process
            .stream(chunks_of(&data, 4096).into_iter(), None)
            .unwrap();

        assert_eq!(outcome.bytes_fed, data.len() as u64);
        assert_eq!(outcome.output.len(), data.len());
        assert!(outcome.output.as_bytes() == data.as_slice());
        assert!(outcome.status.success());
    }

    #[test]
    fn test_stream_captures_failure_and_partial_output() {
        let mut process = sh("cat >/dev/null; printf partial; echo oops >&2; exit 3");
        let err = process
            .stream(chunks_of(b"abcdef", 2).into_iter(), None)
            .unwrap_err();

        match err {
            PipelineError::VocoderFailed {
                exit_code,
                stderr,
                output,
                ..
            } => {
                assert_eq!(exit_code, Some(3));
                assert_eq!(stderr, "oops");
                assert_eq!(output.as_bytes(), b"partial");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_stream_source_error_kills_vocoder() {
        let chunks = vec![
            Ok(FrameChunk::new(vec![0; 4])),
            Err(PipelineError::MalformedChunk {
                len: 3,
                frame_bytes: 4,
            }),
        ];
        let mut process = sh("exec sleep 30");
        let started = Instant::now();
        let err = process.stream(chunks.into_iter(), None).unwrap_err();

        assert!(matches!(err, PipelineError::MalformedChunk { .. }));
        assert!(started.elapsed() < Duration::from_secs(20));
    }

    #[test]
    fn test_stream_timeout() {
        let mut process = sh("printf early; exec sleep 30");
        let err = process
            .stream(std::iter::empty(), Some(Duration::from_millis(300)))
            .unwrap_err();

        match err {
            PipelineError::Timeout { output, .. } => assert_eq!(output.as_bytes(), b"early"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_stream_timeout_after_pipes_close() {
        // Both output pipes reach end of stream, but the process keeps running.
        let mut process = sh("exec >&- 2>&-; exec sleep 8");
        let started = Instant::now();
        let err = process
            .stream(std::iter::empty(), Some(Duration::from_millis(300)))
            .unwrap_err();

        match err {
            PipelineError::Timeout { output, .. } => assert!(output.is_empty()),
            other => panic!("unexpected error: {other}"),
        }
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_stream_timeout_with_grandchild_holding_pipes() {
        // The shell's sleep child inherits stdout and stderr and outlives the kill.
        let mut process = sh("printf early; sleep 8; true");
        let started = Instant::now();
        let err = process
            .stream(std::iter::empty(), Some(Duration::from_millis(300)))
            .unwrap_err();

        match err {
            PipelineError::Timeout { output, .. } => assert_eq!(output.as_bytes(), b"early"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_drop_reaps_running_process() {
        let process = sh("exec sleep 30");
        let started = Instant::now();
        drop(process);
        assert!(started.elapsed() < Duration::from_secs(20));
    }
}
