//! `DebuggerSession`: the single aggregate context that replaces the
//! original tool's file-scope globals (`stack`, `breakpoints`,
//! `displayCode`, `evaluateResult`, `programRunning`, Design Notes §9).
//! Owned by the thread that drains the event bus; every projector takes
//! `&mut DebuggerSession` plus the one command response it needs.

use std::path::{Path, PathBuf};

use core_channel::Channel;

use crate::autoprint::{self, AutoPrintRecord};
use crate::breakpoints::{self, Breakpoint};
use crate::registers::{self, RegisterEntry};
use crate::source_position::{self, LoadedFile, SourcePosition};
use crate::stack::{self, StackEntry};
use crate::threads::{self, ThreadEntry};

#[derive(Debug, Default)]
pub struct DebuggerSession {
    pub stack: Vec<StackEntry>,
    pub breakpoints: Vec<Breakpoint>,
    pub registers: Vec<RegisterEntry>,
    pub threads: Vec<ThreadEntry>,
    pub source: Option<SourcePosition>,
    pub loaded_file: LoadedFile,
    pub pending_autoprint: Option<AutoPrintRecord>,
    pub program_running: bool,
    pub cwd: PathBuf,
    /// Mirrors `[gdb].breakpoint_type` (§6): when true, `toggle_breakpoint`
    /// sets new breakpoints with `hbreak` instead of `break`.
    pub hardware_breakpoints: bool,
}

impl DebuggerSession {
    pub fn new(cwd: PathBuf) -> DebuggerSession {
        DebuggerSession { cwd, ..Default::default() }
    }

    /// Runs the full projector pipeline for one stop, in the order
    /// mandated by §5: Stack -> Breakpoints -> Registers -> Threads ->
    /// source position. The watch engine (component E) is a separate
    /// crate and is driven by the caller after this returns, preserving
    /// the same overall ordering without coupling the two crates.
    pub fn on_stop(&mut self, channel: &Channel) {
        self.program_running = false;

        let bt_response = channel.call_sync("bt 50");
        self.stack = stack::parse_stack(&bt_response);

        let break_response = channel.call_sync("info break");
        self.breakpoints = breakpoints::parse_breakpoints(&break_response, &self.cwd);

        let reg_response = channel.call_sync("info registers");
        let mut new_registers = registers::parse_registers(&reg_response);
        registers::diff_registers(&self.registers, &mut new_registers);
        self.registers = new_registers;

        let threads_response = channel.call_sync("info threads");
        self.threads = threads::parse_threads(&threads_response);

        self.update_source_position();
    }

    /// Marks the session as running again (Idle -> Running observed via
    /// the event bus), clearing the stack per the "Hello" scenario (after
    /// `c`, stack length becomes 0).
    pub fn on_resume(&mut self) {
        self.program_running = true;
        self.stack.clear();
    }

    fn update_source_position(&mut self) {
        let Some(frame) = self.stack.iter().find(|f| f.selected) else {
            return;
        };
        let Some(location) = &frame.location else {
            return;
        };
        let Some((file, line)) = location.rsplit_once(':') else {
            return;
        };
        let Ok(line) = line.parse::<u32>() else {
            return;
        };
        let path = Path::new(file);
        let mtime = std::fs::metadata(path).and_then(|m| m.modified()).ok();

        if source_position::needs_reload(&self.loaded_file, path, mtime) {
            self.loaded_file.path = Some(path.to_path_buf());
            self.loaded_file.mtime = mtime;
            self.pending_autoprint = None;
        }

        self.source = Some(SourcePosition { file: path.to_path_buf(), line });
    }

    /// Selects a stack frame by index, re-running source positioning from
    /// the newly selected frame (§4.4).
    pub fn select_frame(&mut self, channel: &Channel, frame_index: usize) {
        stack::select_frame(&mut self.stack, frame_index);
        let _ = channel.call_sync(&format!("frame {frame_index}"));
        self.update_source_position();
    }

    /// Auto-print (§4.6): called when a new source line is about to
    /// execute, passing the freshly loaded line's text. Evaluates any
    /// prior pending expression and records a new one from `line_text`.
    pub fn on_source_line(&mut self, channel: &Channel, line_text: &str, line_number: u32) {
        if let Some(mut pending) = self.pending_autoprint.take() {
            let response = channel.call_sync(&format!("print {}", pending.expression));
            pending.last_result = autoprint::extract_result_annotation(&response);
            self.pending_autoprint = Some(pending);
        }
        if let Some(expression) = autoprint::extract_expression(line_text) {
            self.pending_autoprint = Some(AutoPrintRecord {
                expression,
                line: line_number,
                last_result: None,
            });
        }
    }

    /// Toggles a breakpoint at `file:line` (§8 item 2 / the toggle-parity
    /// scenario): issues `break` or `clear` depending on current state,
    /// then reparses the table.
    pub fn toggle_breakpoint(&mut self, channel: &Channel, file: &str, line: u32) {
        let cmd = breakpoints::toggle_command(&self.breakpoints, file, line, self.hardware_breakpoints);
        let _ = channel.call_sync(&cmd);
        let break_response = channel.call_sync("info break");
        self.breakpoints = breakpoints::parse_breakpoints(&break_response, &self.cwd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::EventBus;

    /// A fake debugger that answers `bt 50`, `info break`, `info
    /// registers`, and `info threads` with one canned transcript each, so
    /// `on_stop` can be exercised end-to-end without a real gdb child.
    fn scripted_debugger_argv() -> Vec<String> {
        let script = r#"
while IFS= read -r line; do
  case "$line" in
    "bt 50") printf '#0  main () at hello.c:4\n(gdb) ' ;;
    "info break") printf 'Num     Type           Disp Enb Address            What\n1       breakpoint     keep y   0x1 in main at hello.c:4\n(gdb) ' ;;
    "info registers") printf 'rax 0x5 5\n(gdb) ' ;;
    "info threads") printf '* 1    Thread 1 "hello"   main () at hello.c:4\n(gdb) ' ;;
    *) printf '(gdb) ' ;;
  esac
done
"#;
        vec!["/bin/sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[test]
    fn on_stop_runs_full_pipeline_in_order() {
        let (bus, _rx) = EventBus::new();
        let channel = core_channel::Channel::open(scripted_debugger_argv(), bus).unwrap();
        let mut session = DebuggerSession::new(PathBuf::from("/proj"));
        session.on_stop(&channel);

        assert_eq!(session.stack.len(), 1);
        assert_eq!(session.breakpoints.len(), 1);
        assert_eq!(session.registers.len(), 1);
        assert_eq!(session.threads.len(), 1);
        assert_eq!(session.source.as_ref().unwrap().line, 4);
        channel.close();
    }

    #[test]
    fn on_resume_clears_stack() {
        let mut session = DebuggerSession::new(PathBuf::from("/proj"));
        session.stack.push(StackEntry {
            index: 0,
            function: "main".into(),
            location: Some("hello.c:4".into()),
            address: None,
            selected: true,
        });
        session.on_resume();
        assert!(session.stack.is_empty());
        assert!(session.program_running);
    }
}
