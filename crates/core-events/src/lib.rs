//! Cross-thread event bus (component H, the Event Bus).
//!
//! Three background threads — the channel reader, the control-pipe reader,
//! and the optional log-pipe reader — each post one kind of [`Event`] onto a
//! single [`crossbeam_channel`] so the owning thread (the real UI's event
//! loop, `dbgview`'s headless loop in this crate, or a test) can observe
//! them in arrival order. No other cross-thread state is shared: everything
//! else in the workspace is owned by whichever thread drains the receiver.

use std::fmt;

use crossbeam_channel::{Receiver, Sender, unbounded};

/// One completed response unit from the debugger, already delimited by the
/// prompt sentinel. Carried verbatim; parsing happens downstream in
/// `core-state`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseUnit {
    pub text: String,
    /// The channel's session id at the time this unit was produced, so a
    /// consumer can discard units from a session that has since restarted.
    pub session_id: u64,
}

/// A single line read from the control FIFO (see `core-pipes`), already
/// split into its sub-command per §3 of the spec (`f `, `l `, `c `).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    SetFile(String),
    SetLine(u32),
    RunCommand(String),
}

/// A single line read from the log FIFO, delivered verbatim to whichever
/// viewer element the pipe configuration names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub target: String,
    pub text: String,
}

/// The event bus's payload. Each variant corresponds to one of the three
/// posting threads in §5, plus a `Tick` used by the headless loop to notice
/// idle time and a `Shutdown` used to unwind all threads on quit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// An async response unit delivered outside of any synchronous call
    /// (i.e. the Mode Arbiter was in `Running`, not `AwaitingResponse`).
    Debugger(ResponseUnit),
    Control(ControlMessage),
    Log(LogLine),
    Tick,
    Shutdown,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Debugger(u) => write!(f, "Debugger({} bytes)", u.text.len()),
            Event::Control(c) => write!(f, "Control({c:?})"),
            Event::Log(l) => write!(f, "Log({}: {} bytes)", l.target, l.text.len()),
            Event::Tick => write!(f, "Tick"),
            Event::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// The bus: an unbounded MPSC channel. Unbounded because the producers are
/// all slow, human- or process-paced sources (debugger prompts, FIFO
/// writes); there is no risk of the kind of high-frequency backpressure a
/// keystroke stream would create.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<Event>,
}

pub struct EventBusReceiver {
    receiver: Receiver<Event>,
}

impl EventBus {
    pub fn new() -> (EventBus, EventBusReceiver) {
        let (sender, receiver) = unbounded();
        (EventBus { sender }, EventBusReceiver { receiver })
    }

    /// Post an event. Never blocks; a closed receiver (UI thread gone) is
    /// logged and otherwise ignored, matching the "write failures are
    /// silent" posture of the rest of the transport layer (§4.1).
    pub fn post(&self, event: Event) {
        if self.sender.send(event).is_err() {
            tracing::debug!("event bus receiver dropped; discarding event");
        }
    }

    pub fn sender(&self) -> Sender<Event> {
        self.sender.clone()
    }
}

impl EventBusReceiver {
    pub fn recv(&self) -> Option<Event> {
        self.receiver.recv().ok()
    }

    pub fn try_recv(&self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Result<Event, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.receiver.iter()
    }
}

impl ControlMessage {
    /// Parse one control-pipe line per §3: the first two characters select
    /// the sub-command (`f `, `l `, `c `); anything else is not a valid
    /// control message and is rejected rather than guessed at.
    pub fn parse(line: &str) -> Option<ControlMessage> {
        let line = line.trim_end_matches(['\n', '\r']);
        if let Some(rest) = line.strip_prefix("f ") {
            Some(ControlMessage::SetFile(rest.to_string()))
        } else if let Some(rest) = line.strip_prefix("l ") {
            rest.trim().parse::<u32>().ok().map(ControlMessage::SetLine)
        } else if let Some(rest) = line.strip_prefix("c ") {
            Some(ControlMessage::RunCommand(rest.to_string()))
        } else {
            None
        }
    }
}
