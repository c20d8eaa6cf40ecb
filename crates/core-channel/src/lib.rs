//! The Debugger Interaction Core (DIC): the I/O Channel (component A) and
//! the Mode Arbiter (component B) fused into one owned value, per Design
//! Notes §9 ("model the channel as an owned value that exposes `send` and
//! a blocking `recv_response`"). A single reader thread owns the child's
//! stdout; a mutex + condvar pair realizes the mode machine in §4.2.

mod error;

pub use error::ChannelError;

use std::io::{Read, Write};
use std::os::unix::process::CommandExt;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use core_events::{Event, EventBus, ResponseUnit};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

/// The literal byte sequence that terminates every response unit (§3).
pub const PROMPT_SENTINEL: &str = "(gdb) ";

/// Hard ceiling on the receive buffer (§3, §9 Open Questions: growable
/// internally but capped; exceeding it is the spec's one *Fatal* transport
/// condition).
pub const MAX_BUFFER: usize = 16 * 1024 * 1024;

/// The named constant for the synchronous-call timeout (§4.2, §9 Open
/// Questions: hard-coded, not yet exposed through `[gdb]`).
pub const SYNC_TIMEOUT: Duration = Duration::from_secs(1);

/// How long a sync call waits for the impending prompt after interrupting a
/// running inferior, before proceeding to send its own command anyway.
const INTERRUPT_GRACE: Duration = Duration::from_secs(1);

/// The synthetic response substituted on a sync-call timeout or on
/// restart, so parsers degrade gracefully rather than block (§4.2).
pub const SYNTHETIC_EMPTY_RESPONSE: &str = "\n(gdb) \n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Idle,
    Running,
    AwaitingResponse,
}

struct ModeState {
    mode: Mode,
    waiter_response: Option<String>,
}

struct Shared {
    state: Mutex<ModeState>,
    condvar: Condvar,
    session_id: AtomicU64,
    bus: EventBus,
}

struct ChannelInner {
    shared: Arc<Shared>,
    child: Mutex<Child>,
    stdin: Mutex<ChildStdin>,
    reader_handle: Mutex<Option<JoinHandle<()>>>,
    argv: Vec<String>,
}

/// A single-writer, single-reader channel to a child debugger process
/// (component A + B, the DIC). Cloning is cheap (`Arc`-backed) and shares
/// the same underlying child and mode machine.
#[derive(Clone)]
pub struct Channel {
    inner: Arc<ChannelInner>,
}

fn find_sentinel_end(buf: &[u8]) -> Option<usize> {
    let needle = PROMPT_SENTINEL.as_bytes();
    if buf.len() < needle.len() {
        return None;
    }
    buf.windows(needle.len()).position(|w| w == needle).map(|p| p + needle.len())
}

fn deliver(shared: &Shared, text: String) {
    let mut state = shared.state.lock().unwrap();
    match state.mode {
        Mode::AwaitingResponse => {
            state.waiter_response = Some(text);
            state.mode = Mode::Idle;
            shared.condvar.notify_all();
        }
        Mode::Running | Mode::Idle => {
            state.mode = Mode::Idle;
            drop(state);
            let session_id = shared.session_id.load(Ordering::SeqCst);
            shared.bus.post(Event::Debugger(ResponseUnit { text, session_id }));
        }
    }
}

fn release_waiter_with_empty(shared: &Shared) {
    let mut state = shared.state.lock().unwrap();
    if state.mode == Mode::AwaitingResponse {
        state.waiter_response = Some(SYNTHETIC_EMPTY_RESPONSE.to_string());
        state.mode = Mode::Idle;
        shared.condvar.notify_all();
    }
}

fn reader_loop(mut stdout: impl Read, shared: Arc<Shared>) {
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        match stdout.read(&mut chunk) {
            Ok(0) => {
                tracing::info!("debugger child exited (EOF on stdout)");
                break;
            }
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.len() > MAX_BUFFER {
                    tracing::error!(len = buf.len(), "receive buffer overflow, no prompt sentinel found");
                    shared.bus.post(Event::Shutdown);
                    break;
                }
                while let Some(end) = find_sentinel_end(&buf) {
                    let unit: Vec<u8> = buf.drain(..end).collect();
                    let text = String::from_utf8_lossy(&unit).into_owned();
                    deliver(&shared, text);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "read error on debugger stdout, reader stopping");
                break;
            }
        }
    }
    release_waiter_with_empty(&shared);
}

fn spawn_child(argv: &[String]) -> Result<Child, ChannelError> {
    let (program, args) = argv.split_first().ok_or_else(|| {
        ChannelError::Spawn(std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argv"))
    })?;
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    unsafe {
        command.pre_exec(|| {
            nix::unistd::setsid().map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;
            Ok(())
        });
    }
    command.spawn().map_err(ChannelError::Spawn)
}

impl Channel {
    /// `open(argv) -> handle`: spawns the child with its stdio rewired to
    /// anonymous pipes, sends the deterministic `set prompt` command, and
    /// launches the reader thread (§4.1).
    pub fn open(argv: Vec<String>, bus: EventBus) -> Result<Channel, ChannelError> {
        let mut child = spawn_child(&argv)?;
        let stdout = child.stdout.take().expect("piped stdout");
        let stdin = child.stdin.take().expect("piped stdin");

        let shared = Arc::new(Shared {
            state: Mutex::new(ModeState { mode: Mode::Idle, waiter_response: None }),
            condvar: Condvar::new(),
            session_id: AtomicU64::new(0),
            bus,
        });

        let reader_shared = shared.clone();
        let handle = std::thread::Builder::new()
            .name("core-channel-reader".into())
            .spawn(move || reader_loop(stdout, reader_shared))
            .expect("spawn reader thread");

        let inner = Arc::new(ChannelInner {
            shared,
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            reader_handle: Mutex::new(Some(handle)),
            argv,
        });

        let channel = Channel { inner };
        channel.send_async("set prompt (gdb) ")?;
        Ok(channel)
    }

    fn write_line(&self, text: &str) -> Result<(), ChannelError> {
        let mut stdin = self.inner.stdin.lock().unwrap();
        stdin.write_all(text.as_bytes()).map_err(ChannelError::Write)?;
        stdin.write_all(b"\n").map_err(ChannelError::Write)?;
        stdin.flush().map_err(ChannelError::Write)
    }

    /// `send(bytes)`: a resuming or fire-and-forget command. Transitions
    /// Idle/Running -> Running; the next response unit is published on the
    /// event bus rather than returned here (§4.2).
    pub fn send_async(&self, cmd: &str) -> Result<(), ChannelError> {
        {
            let mut state = self.inner.shared.state.lock().unwrap();
            state.mode = Mode::Running;
        }
        self.write_line(cmd)
    }

    /// A synchronous request/response call (§4.2). Serialized by the mode
    /// mutex: a concurrent caller simply blocks until this one completes,
    /// which is how "nested sync calls are forbidden" is enforced — there
    /// is structurally only ever one mutex holder.
    pub fn call_sync(&self, cmd: &str) -> String {
        let shared = &self.inner.shared;
        let mut guard = shared.state.lock().unwrap();

        if guard.mode == Mode::Running {
            drop(guard);
            if let Err(e) = self.interrupt() {
                tracing::warn!(error = %e, "failed to interrupt running inferior before sync call");
            }
            guard = shared.state.lock().unwrap();
            let (g, _timeout) = shared
                .condvar
                .wait_timeout_while(guard, INTERRUPT_GRACE, |s| s.mode == Mode::Running)
                .unwrap();
            guard = g;
        }

        guard.mode = Mode::AwaitingResponse;
        guard.waiter_response = None;

        drop(guard);
        if let Err(e) = self.write_line(cmd) {
            tracing::warn!(error = %e, "write failed during synchronous call");
        }
        let guard = shared.state.lock().unwrap();

        let (mut guard, timeout) = shared
            .condvar
            .wait_timeout_while(guard, SYNC_TIMEOUT, |s| s.waiter_response.is_none())
            .unwrap();

        if timeout.timed_out() && guard.waiter_response.is_none() {
            tracing::warn!(cmd, "synchronous call timed out, degrading to empty response");
            guard.mode = Mode::Idle;
            SYNTHETIC_EMPTY_RESPONSE.to_string()
        } else {
            guard.waiter_response.take().unwrap_or_else(|| SYNTHETIC_EMPTY_RESPONSE.to_string())
        }
    }

    /// Sends `SIGINT` to the child's process group, used both to pause a
    /// running inferior before a sync call and as the user-facing "pause"
    /// action.
    pub fn interrupt(&self) -> Result<(), ChannelError> {
        let child = self.inner.child.lock().unwrap();
        let pid = Pid::from_raw(child.id() as i32);
        signal::kill(pid, Signal::SIGINT)
            .map_err(|e| ChannelError::Write(std::io::Error::from_raw_os_error(e as i32)))
    }

    /// Restart (§4.1, §5 Cancellation): kill the child with a strong
    /// signal, let the reader observe EOF and exit, bump the session id,
    /// release any in-flight waiter with a synthetic response, and re-run
    /// `open` semantics on the stored argv.
    pub fn restart(&self) -> Result<(), ChannelError> {
        release_waiter_with_empty(&self.inner.shared);
        {
            let mut child = self.inner.child.lock().unwrap();
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.inner.reader_handle.lock().unwrap().take() {
            let _ = handle.join();
        }

        self.inner.shared.session_id.fetch_add(1, Ordering::SeqCst);
        {
            let mut state = self.inner.shared.state.lock().unwrap();
            state.mode = Mode::Idle;
            state.waiter_response = None;
        }

        let mut new_child = spawn_child(&self.inner.argv)?;
        let stdout = new_child.stdout.take().expect("piped stdout");
        let new_stdin = new_child.stdin.take().expect("piped stdin");

        *self.inner.child.lock().unwrap() = new_child;
        *self.inner.stdin.lock().unwrap() = new_stdin;

        let reader_shared = self.inner.shared.clone();
        let handle = std::thread::Builder::new()
            .name("core-channel-reader".into())
            .spawn(move || reader_loop(stdout, reader_shared))
            .expect("spawn reader thread");
        *self.inner.reader_handle.lock().unwrap() = Some(handle);

        self.send_async("set prompt (gdb) ")
    }

    /// Signals the child, cancels the reader, and invalidates the handle.
    /// Pipes (owned by `core-pipes`) are left as filesystem artifacts
    /// (§5 Cancellation).
    pub fn close(&self) {
        release_waiter_with_empty(&self.inner.shared);
        let mut child = self.inner.child.lock().unwrap();
        let _ = child.kill();
        let _ = child.wait();
        drop(child);
        if let Some(handle) = self.inner.reader_handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }

    pub fn session_id(&self) -> u64 {
        self.inner.shared.session_id.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.inner.shared.state.lock().unwrap().mode == Mode::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::Event;

    /// A tiny shell "debugger" that echoes each stdin line back, prefixed,
    /// and always terminates its output with the prompt sentinel — enough
    /// to exercise framing and the sync/async split without a real gdb.
    fn fake_debugger_argv() -> Vec<String> {
        vec![
            "/bin/sh".to_string(),
            "-c".to_string(),
            "while IFS= read -r line; do printf '%s\\n(gdb) ' \"$line\"; done".to_string(),
        ]
    }

    #[test]
    fn frames_responses_on_prompt_sentinel() {
        let (bus, rx) = EventBus::new();
        let channel = Channel::open(fake_debugger_argv(), bus).unwrap();
        // The `set prompt` command sent by `open` triggers one async unit.
        let event = rx.recv().unwrap();
        match event {
            Event::Debugger(unit) => assert!(unit.text.contains(PROMPT_SENTINEL)),
            other => panic!("unexpected event: {other:?}"),
        }
        channel.close();
    }

    #[test]
    fn sync_call_returns_framed_response() {
        let (bus, _rx) = EventBus::new();
        let channel = Channel::open(fake_debugger_argv(), bus).unwrap();
        let response = channel.call_sync("hello");
        assert!(response.contains("hello"));
        assert!(response.contains(PROMPT_SENTINEL));
        channel.close();
    }

    #[test]
    fn sync_call_times_out_to_synthetic_response() {
        // A child that never prompts: the sync call must degrade to the
        // synthetic empty response rather than block indefinitely.
        let argv = vec!["/bin/sh".to_string(), "-c".to_string(), "sleep 5".to_string()];
        let (bus, _rx) = EventBus::new();
        let channel = Channel::open(argv, bus).unwrap();
        let start = std::time::Instant::now();
        let response = channel.call_sync("anything");
        assert_eq!(response, SYNTHETIC_EMPTY_RESPONSE);
        assert!(start.elapsed() < Duration::from_secs(3));
        channel.close();
    }

    #[test]
    fn restart_bumps_session_id() {
        let (bus, _rx) = EventBus::new();
        let channel = Channel::open(fake_debugger_argv(), bus).unwrap();
        let before = channel.session_id();
        channel.restart().unwrap();
        assert_eq!(channel.session_id(), before + 1);
        channel.close();
    }

    #[test]
    fn sentinel_not_matched_on_partial_prefix() {
        let mut buf = b"(gdb".to_vec();
        assert_eq!(find_sentinel_end(&buf), None);
        buf.extend_from_slice(b") ");
        assert_eq!(find_sentinel_end(&buf), Some(buf.len()));
    }
}
