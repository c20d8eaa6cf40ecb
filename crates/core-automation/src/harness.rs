//! The Automation Hook (component I, §4.8): drives the real
//! `Channel` + `Router` + `DebuggerSession` triple against a scripted
//! step list, exercising the actual Mode Arbiter transitions rather than
//! a mock.

use std::path::{Path, PathBuf};
use std::time::Duration;

use core_channel::Channel;
use core_events::{Event, EventBusReceiver};
use core_router::{Router, RouterHost};
use core_state::DebuggerSession;

use crate::step::{MAX_SLEEP_MS, Step};

/// How long the harness waits, after an async send, for the corresponding
/// response unit to arrive off the event bus before giving up on that
/// step's projector refresh.
const ASYNC_SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// One step's observed-vs-expected mismatch. The harness does not retry
/// (§4.8: "the harness does not retry — each step runs exactly once").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub step_index: usize,
    pub expected: String,
    pub observed: String,
}

/// The structured report produced by a script run (§4.8: "Failures
/// produce a structured report naming the step index and a diff of
/// expected vs. observed").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub failures: Vec<StepFailure>,
}

impl Report {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

struct AutomationHost<'a> {
    session: &'a mut DebuggerSession,
    focused_pane: Option<String>,
}

impl RouterHost for AutomationHost<'_> {
    fn append_console(&mut self, _text: &str) {
        // The harness has no scrollback widget; console text is only
        // relevant here via the captured response string `Harness`
        // tracks separately.
    }

    fn focus_pane(&mut self, name: &str) {
        self.focused_pane = Some(name.to_string());
    }

    fn set_cwd(&mut self, dir: &Path) {
        self.session.cwd = dir.to_path_buf();
    }

    fn current_source_lines(&self) -> Option<Vec<String>> {
        let path = self.session.loaded_file.path.as_ref()?;
        std::fs::read_to_string(path).ok().map(|text| text.lines().map(String::from).collect())
    }

    fn current_line(&self) -> Option<usize> {
        self.session.source.as_ref().map(|s| s.line as usize)
    }
}

/// Owns the same `Channel` + `Router` + `DebuggerSession` triple the
/// binary wires up (§4.8), so a script exercises the real Mode Arbiter
/// transitions.
pub struct Harness {
    channel: Channel,
    router: Router,
    session: DebuggerSession,
    bus_rx: EventBusReceiver,
    last_response: String,
}

impl Harness {
    pub fn new(
        channel: Channel,
        router: Router,
        session: DebuggerSession,
        bus_rx: EventBusReceiver,
    ) -> Harness {
        Harness { channel, router, session, bus_rx, last_response: String::new() }
    }

    pub fn session(&self) -> &DebuggerSession {
        &self.session
    }

    /// Runs every step exactly once, in order, accumulating failures
    /// without aborting early so one bad assertion doesn't hide the next.
    pub fn run_script(&mut self, steps: &[Step]) -> Report {
        let mut report = Report::default();
        for (index, step) in steps.iter().enumerate() {
            self.run_step(index, step, &mut report);
        }
        report
    }

    fn run_step(&mut self, index: usize, step: &Step, report: &mut Report) {
        match step {
            Step::Send { command, is_async } => self.do_send(command, *is_async),
            Step::ExpectContains { substring } => {
                if !self.last_response.contains(substring.as_str()) {
                    report.failures.push(StepFailure {
                        step_index: index,
                        expected: format!("response containing {substring:?}"),
                        observed: self.last_response.clone(),
                    });
                }
            }
            Step::ExpectStackLen { len } => {
                if self.session.stack.len() != *len {
                    report.failures.push(StepFailure {
                        step_index: index,
                        expected: format!("stack length {len}"),
                        observed: format!("stack length {}", self.session.stack.len()),
                    });
                }
            }
            Step::ExpectBreakpointCount { count } => {
                if self.session.breakpoints.len() != *count {
                    report.failures.push(StepFailure {
                        step_index: index,
                        expected: format!("{count} breakpoints"),
                        observed: format!("{} breakpoints", self.session.breakpoints.len()),
                    });
                }
            }
            Step::ExpectSource { file, line } => {
                let observed = self.session.source.as_ref();
                let matches = observed
                    .map(|s| s.file.to_string_lossy().ends_with(file.as_str()) && s.line == *line)
                    .unwrap_or(false);
                if !matches {
                    let observed_desc = observed
                        .map(|s| format!("{}:{}", s.file.display(), s.line))
                        .unwrap_or_else(|| "no source position".to_string());
                    report.failures.push(StepFailure {
                        step_index: index,
                        expected: format!("{file}:{line}"),
                        observed: observed_desc,
                    });
                }
            }
            Step::SleepMs { ms } => {
                std::thread::sleep(Duration::from_millis((*ms).min(MAX_SLEEP_MS)));
            }
        }
    }

    fn do_send(&mut self, command: &str, is_async: bool) {
        if is_async {
            self.session.on_resume();
            {
                let mut host = AutomationHost { session: &mut self.session, focused_pane: None };
                self.router.route(command, &mut host);
            }
            match self.bus_rx.recv_timeout(ASYNC_SETTLE_TIMEOUT) {
                Ok(Event::Debugger(unit)) => {
                    self.last_response = unit.text;
                    self.session.on_stop(&self.channel);
                }
                Ok(other) => {
                    tracing::warn!(event = %other, command, "unexpected event settling async step");
                }
                Err(_) => {
                    tracing::warn!(command, "async step timed out waiting for a response unit");
                }
            }
        } else {
            self.last_response = self.channel.call_sync(command);
        }
    }
}
