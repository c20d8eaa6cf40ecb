use std::cell::Cell;
use std::collections::BTreeMap;
use std::path::Path;

use core_channel::Channel;

use crate::meta;

/// Host callbacks the router needs from whatever owns the UI state
/// (`dbgview`'s `DebuggerSession`, or a test double). Kept minimal and
/// trait-based so `core-router` does not depend on `core-state`.
pub trait RouterHost {
    /// Appends text to the scrollback console (§4.3 items 2 and 3).
    fn append_console(&mut self, text: &str);
    /// Asks the UI to focus a named pane (`gf-switch-to`).
    fn focus_pane(&mut self, name: &str);
    /// Changes the process working directory (`gf-get-pwd`).
    fn set_cwd(&mut self, dir: &Path);
    /// The lines of the currently displayed source file, if any, for
    /// `gf-step-out-of-block`.
    fn current_source_lines(&self) -> Option<Vec<String>>;
    /// The 1-indexed line currently executing, if known.
    fn current_line(&self) -> Option<usize>;
    /// Called right before a command that resumes the inferior is sent
    /// (§3 Mode token: "Running implies the child was last sent a
    /// resuming command"), so the host can clear its stack and flip its
    /// "program running" indicator the way the Hello scenario (§8)
    /// requires. Default no-op for hosts that don't track that state.
    fn mark_running(&mut self) {}
    /// Toggles a breakpoint on the line currently displayed in the source
    /// view (§8's "toggle breakpoint on current line" command). Default
    /// no-op for hosts (e.g. the automation harness) that drive
    /// breakpoints directly instead of through this gesture.
    fn toggle_breakpoint_at_current_line(&mut self) {}
}

/// The Command Router (component C): classifies an input string into one
/// of the three buckets in §4.3 and drives the [`Channel`] accordingly.
pub struct Router {
    channel: Channel,
    presets: BTreeMap<String, String>,
    /// Disassembly toggling is router-level (§4.3 last paragraph): while
    /// set, `gf-step`/`gf-next` emit `stepi`/`nexti` instead of `s`/`n`.
    disassembly: Cell<bool>,
}

impl Router {
    pub fn new(channel: Channel, presets: BTreeMap<String, String>) -> Router {
        Router { channel, presets, disassembly: Cell::new(false) }
    }

    pub fn set_disassembly(&self, enabled: bool) {
        self.disassembly.set(enabled);
    }

    pub fn is_disassembly(&self) -> bool {
        self.disassembly.get()
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Classify and execute `input` against `host` (§4.3).
    pub fn route(&self, input: &str, host: &mut dyn RouterHost) {
        let input = input.trim();
        if input.is_empty() {
            return;
        }
        if let Some(rest) = input.strip_prefix("gf-") {
            self.route_meta(rest, host);
        } else {
            // Raw passthrough: sent verbatim, echoed into the console.
            host.append_console(input);
            host.mark_running();
            if let Err(e) = self.channel.send_async(input) {
                tracing::warn!(error = %e, cmd = input, "failed to send raw command");
            }
        }
    }

    fn route_meta(&self, rest: &str, host: &mut dyn RouterHost) {
        let mut parts = rest.splitn(2, ' ');
        let name = parts.next().unwrap_or_default();
        let arg = parts.next().unwrap_or("").trim();

        match name {
            "step" => {
                let cmd = if self.disassembly.get() { "stepi" } else { "s" };
                host.mark_running();
                let _ = self.channel.send_async(cmd);
            }
            "next" => {
                let cmd = if self.disassembly.get() { "nexti" } else { "n" };
                host.mark_running();
                let _ = self.channel.send_async(cmd);
            }
            "step-out-of-block" => {
                if let (Some(lines), Some(current)) = (host.current_source_lines(), host.current_line()) {
                    let borrowed: Vec<&str> = lines.iter().map(String::as_str).collect();
                    if let Some(target) = meta::step_out_of_block_target(&borrowed, current) {
                        let _ = self.channel.send_async(&format!("until {target}"));
                    } else {
                        tracing::warn!("gf-step-out-of-block: no enclosing block closer found");
                    }
                }
            }
            "restart-gdb" => {
                if let Err(e) = self.channel.restart() {
                    tracing::error!(error = %e, "gf-restart-gdb failed");
                }
            }
            "get-pwd" => {
                let response = self.channel.call_sync("info source");
                if let Some(dir) = meta::parse_compilation_directory(&response) {
                    host.set_cwd(Path::new(dir));
                } else {
                    tracing::warn!("gf-get-pwd: could not find compilation directory in response");
                }
            }
            "switch-to" => {
                host.focus_pane(arg);
            }
            "toggle-breakpoint" => {
                host.toggle_breakpoint_at_current_line();
            }
            "command" => {
                self.run_preset(arg, host);
            }
            other => {
                tracing::warn!(name = other, "unknown gf- meta-command, ignoring");
            }
        }
    }

    /// Expands a preset command block (§4.3 item 2): semicolon-separated
    /// segments, a trailing `&` forces async delivery, otherwise the
    /// segment runs synchronously and its response is appended to the
    /// console.
    fn run_preset(&self, name: &str, host: &mut dyn RouterHost) {
        let Some(sequence) = self.presets.get(name).cloned() else {
            tracing::warn!(name, "unknown preset command");
            return;
        };
        for raw_segment in sequence.split(';') {
            let segment = raw_segment.trim();
            if segment.is_empty() {
                continue;
            }
            if let Some(segment) = segment.strip_suffix('&') {
                let segment = segment.trim();
                host.mark_running();
                if let Err(e) = self.channel.send_async(segment) {
                    tracing::warn!(error = %e, segment, "preset async segment failed");
                }
            } else {
                let response = self.channel.call_sync(segment);
                host.append_console(&format!("{segment}\n{response}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::EventBus;
    use std::path::PathBuf;

    #[derive(Default)]
    struct FakeHost {
        console: String,
        focused: Option<String>,
        cwd: Option<PathBuf>,
        lines: Option<Vec<String>>,
        line: Option<usize>,
        breakpoint_toggled: bool,
    }

    impl RouterHost for FakeHost {
        fn append_console(&mut self, text: &str) {
            self.console.push_str(text);
            self.console.push('\n');
        }
        fn focus_pane(&mut self, name: &str) {
            self.focused = Some(name.to_string());
        }
        fn set_cwd(&mut self, dir: &Path) {
            self.cwd = Some(dir.to_path_buf());
        }
        fn current_source_lines(&self) -> Option<Vec<String>> {
            self.lines.clone()
        }
        fn current_line(&self) -> Option<usize> {
            self.line
        }
        fn toggle_breakpoint_at_current_line(&mut self) {
            self.breakpoint_toggled = true;
        }
    }

    fn fake_debugger_argv() -> Vec<String> {
        vec![
            "/bin/sh".to_string(),
            "-c".to_string(),
            "while IFS= read -r line; do printf '%s\\n(gdb) ' \"$line\"; done".to_string(),
        ]
    }

    #[test]
    fn raw_passthrough_echoes_to_console() {
        let (bus, _rx) = EventBus::new();
        let channel = Channel::open(fake_debugger_argv(), bus).unwrap();
        let router = Router::new(channel.clone(), BTreeMap::new());
        let mut host = FakeHost::default();
        router.route("print x", &mut host);
        assert!(host.console.contains("print x"));
        channel.close();
    }

    #[test]
    fn switch_to_focuses_named_pane() {
        let (bus, _rx) = EventBus::new();
        let channel = Channel::open(fake_debugger_argv(), bus).unwrap();
        let router = Router::new(channel.clone(), BTreeMap::new());
        let mut host = FakeHost::default();
        router.route("gf-switch-to Watch", &mut host);
        assert_eq!(host.focused.as_deref(), Some("Watch"));
        channel.close();
    }

    #[test]
    fn toggle_breakpoint_meta_command_reaches_host() {
        let (bus, _rx) = EventBus::new();
        let channel = Channel::open(fake_debugger_argv(), bus).unwrap();
        let router = Router::new(channel.clone(), BTreeMap::new());
        let mut host = FakeHost::default();
        router.route("gf-toggle-breakpoint", &mut host);
        assert!(host.breakpoint_toggled);
        channel.close();
    }

    #[test]
    fn preset_runs_sync_segments_and_appends_response() {
        let (bus, _rx) = EventBus::new();
        let channel = Channel::open(fake_debugger_argv(), bus).unwrap();
        let mut presets = BTreeMap::new();
        presets.insert("build".to_string(), "echo hi".to_string());
        let router = Router::new(channel.clone(), presets);
        let mut host = FakeHost::default();
        router.route("gf-command build", &mut host);
        assert!(host.console.contains("echo hi"));
        channel.close();
    }

    #[test]
    fn disassembly_mode_swaps_step_and_next() {
        let (bus, _rx) = EventBus::new();
        let channel = Channel::open(fake_debugger_argv(), bus).unwrap();
        let router = Router::new(channel.clone(), BTreeMap::new());
        router.set_disassembly(true);
        assert!(router.is_disassembly());
        channel.close();
    }
}
