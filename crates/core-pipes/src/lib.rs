//! The Control and Log Pipes (component G, the CLP): two named FIFOs that
//! let an external editor and the inferior itself post commands and log
//! lines into the UI (§4.7). Both threads post onto the same
//! [`core_events::EventBus`] the Channel Reader uses, so arrival order is
//! whatever order the underlying OS delivers across the three producers —
//! the UI thread is the only consumer and processes each as it arrives.

mod error;

pub use error::PipeError;

use std::fs::File;
use std::io::Read;
use std::os::fd::AsFd;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::Duration;

use core_events::{ControlMessage, Event, EventBus, LogLine};
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;

/// How long the log reader waits for data before giving up and looping
/// again to re-check for shutdown (§4.7: "polls it with a 10-second
/// timeout").
const LOG_POLL_TIMEOUT: Duration = Duration::from_secs(10);

/// How long the log reader sleeps after observing a hangup (writer
/// closed) before reopening, to avoid spinning (§4.7).
const HANGUP_BACKOFF: Duration = Duration::from_millis(200);

/// Upper bound on one control-pipe burst, so a misbehaving writer cannot
/// make the reader allocate unboundedly (§4.7: "reads a single bounded
/// burst").
const CONTROL_BURST_MAX: u64 = 64 * 1024;

/// Creates `path` as a world-read/write FIFO if it doesn't already exist
/// (§4.7's last paragraph, shared by both pipes).
fn ensure_fifo(path: &Path) -> Result<(), PipeError> {
    if path.exists() {
        return Ok(());
    }
    mkfifo(path, Mode::from_bits_truncate(0o666)).map_err(|e| PipeError::Create {
        path: path.to_path_buf(),
        source: std::io::Error::from_raw_os_error(e as i32),
    })
}

/// Opens `path` for reading, retrying briefly on transient failure. FIFO
/// opens for reading block until a writer connects, which is the
/// intended behavior here (the thread is otherwise idle).
fn open_for_read(path: &Path) -> Result<File, PipeError> {
    File::open(path).map_err(|e| PipeError::Open { path: path.to_path_buf(), source: e })
}

/// Spawns the control-pipe reader thread (§4.7 first paragraph): opens
/// the FIFO, reads one bounded burst, posts a [`Event::Control`] per
/// parsed line, then closes and reopens.
pub fn spawn_control_reader(path: PathBuf, bus: EventBus) -> Result<JoinHandle<()>, PipeError> {
    ensure_fifo(&path)?;
    let handle = std::thread::Builder::new()
        .name("core-pipes-control".into())
        .spawn(move || control_loop(path, bus))
        .expect("spawn control pipe reader thread");
    Ok(handle)
}

fn control_loop(path: PathBuf, bus: EventBus) {
    loop {
        let file = match open_for_read(&path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(error = %e, "failed to open control pipe, retrying");
                std::thread::sleep(Duration::from_secs(1));
                continue;
            }
        };
        let mut bounded = file.take(CONTROL_BURST_MAX);
        let mut text = String::new();
        match bounded.read_to_string(&mut text) {
            Ok(_) => {
                for line in text.lines() {
                    if let Some(message) = ControlMessage::parse(line) {
                        bus.post(Event::Control(message));
                    } else {
                        tracing::debug!(line, "unrecognized control pipe line, ignoring");
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "error reading control pipe"),
        }
        // `bounded` (and the underlying file) is dropped here; the next
        // loop iteration reopens the fifo, matching "the file is then
        // closed and reopened" (§4.7).
    }
}

/// Spawns the log-pipe reader thread (§4.7 second paragraph): polls with
/// a 10-second timeout, sleeping briefly on hangup to avoid spinning.
/// Each non-empty read is posted as an [`Event::Log`] tagged with
/// `target` (the log viewer element's name).
pub fn spawn_log_reader(path: PathBuf, target: String, bus: EventBus) -> Result<JoinHandle<()>, PipeError> {
    ensure_fifo(&path)?;
    let handle = std::thread::Builder::new()
        .name("core-pipes-log".into())
        .spawn(move || log_loop(path, target, bus))
        .expect("spawn log pipe reader thread");
    Ok(handle)
}

fn log_loop(path: PathBuf, target: String, bus: EventBus) {
    loop {
        let mut file = match open_for_read(&path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(error = %e, "failed to open log pipe, retrying");
                std::thread::sleep(Duration::from_secs(1));
                continue;
            }
        };

        loop {
            let mut poll_fds = [PollFd::new(file.as_fd(), PollFlags::POLLIN | PollFlags::POLLHUP)];
            let timeout = PollTimeout::try_from(LOG_POLL_TIMEOUT.as_millis() as i32)
                .expect("10s timeout fits in poll's millisecond range");
            let ready = match poll(&mut poll_fds, timeout) {
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!(error = %e, "poll on log pipe failed");
                    break;
                }
            };
            if ready == 0 {
                // Timed out with nothing to read: keep polling the same
                // open file descriptor.
                continue;
            }

            let revents = poll_fds[0].revents().unwrap_or(PollFlags::empty());
            if revents.contains(PollFlags::POLLIN) {
                let mut buf = [0u8; 8192];
                match file.read(&mut buf) {
                    Ok(0) => {
                        // Writer closed with nothing left buffered: treat
                        // as hangup below.
                    }
                    Ok(n) => {
                        let text = String::from_utf8_lossy(&buf[..n]).into_owned();
                        if !text.is_empty() {
                            bus.post(Event::Log(LogLine { target: target.clone(), text }));
                        }
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "error reading log pipe");
                    }
                }
            }
            if revents.contains(PollFlags::POLLHUP) {
                std::thread::sleep(HANGUP_BACKOFF);
                break;
            }
        }
        // Reopen for the next writer.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::EventBus;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn ensure_fifo_creates_world_rw_fifo() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ctrl");
        ensure_fifo(&path).unwrap();
        let meta = std::fs::metadata(&path).unwrap();
        assert!(std::os::unix::fs::FileTypeExt::is_fifo(&meta.file_type()));
    }

    #[test]
    fn ensure_fifo_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ctrl");
        ensure_fifo(&path).unwrap();
        ensure_fifo(&path).unwrap();
    }

    #[test]
    fn control_pipe_posts_parsed_messages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("control");
        ensure_fifo(&path).unwrap();
        let (bus, rx) = EventBus::new();
        let _handle = spawn_control_reader(path.clone(), bus).unwrap();

        let mut writer = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        writeln!(writer, "f src/x.c").unwrap();
        writeln!(writer, "l 42").unwrap();
        drop(writer);

        let mut seen = Vec::new();
        for _ in 0..2 {
            if let Some(Event::Control(msg)) = rx.recv() {
                seen.push(msg);
            }
        }
        assert_eq!(seen, vec![
            ControlMessage::SetFile("src/x.c".to_string()),
            ControlMessage::SetLine(42),
        ]);
    }

    #[test]
    fn log_pipe_posts_target_tagged_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log");
        ensure_fifo(&path).unwrap();
        let (bus, rx) = EventBus::new();
        let _handle = spawn_log_reader(path.clone(), "LogViewer".to_string(), bus).unwrap();

        let mut writer = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        writer.write_all(b"inferior says hi\n").unwrap();
        drop(writer);

        match rx.recv_timeout(Duration::from_secs(2)) {
            Ok(Event::Log(line)) => {
                assert_eq!(line.target, "LogViewer");
                assert!(line.text.contains("inferior says hi"));
            }
            other => panic!("expected a Log event, got {other:?}"),
        }
    }
}
