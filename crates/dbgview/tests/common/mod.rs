#![allow(dead_code)] // Shared across several scenario test files; each uses a subset.

use std::collections::BTreeMap;

use core_channel::Channel;
use core_events::EventBus;
use core_router::RouterHost;

/// A `/bin/sh` script that answers a fixed set of gdb commands with
/// canned gdb-style responses, terminated by the literal prompt
/// sentinel `core_channel::Channel` frames on. Extra case arms can be
/// appended by callers that need more than the "hello" scenario below.
pub fn scripted_debugger_argv(extra_cases: &str) -> Vec<String> {
    let script = format!(
        r#"
while IFS= read -r line; do
  case "$line" in
    "file hello") printf 'Reading symbols from hello...\n(gdb) ' ;;
    "break 4") printf 'Breakpoint 1 at 0x401136: file hello.c, line 4.\n(gdb) ' ;;
    "bt 50") printf '#0  main () at hello.c:4\n(gdb) ' ;;
    "info break") printf 'Num     Type           Disp Enb Address            What\n1       breakpoint     keep y   0x1 in main at hello.c:4\n(gdb) ' ;;
    "info registers") printf 'rax 0x5 5\n(gdb) ' ;;
    "info threads") printf '* 1    Thread 1 "hello"   main () at hello.c:4\n(gdb) ' ;;
    "gf_fields(['x'])") printf '(array) 0\n(gdb) ' ;;
    "gf_typeof(['x'])") printf 'int\n(gdb) ' ;;
    "gf_valueof(['x'], ' ')") printf '7\n(gdb) ' ;;
{extra_cases}
    *) printf '(gdb) ' ;;
  esac
done
"#
    );
    vec!["/bin/sh".to_string(), "-c".to_string(), script]
}

pub fn open_hello_channel() -> Channel {
    let (bus, _rx) = EventBus::new();
    Channel::open(scripted_debugger_argv(""), bus).unwrap()
}

pub fn break4_presets() -> BTreeMap<String, String> {
    let mut presets = BTreeMap::new();
    presets.insert("break4".to_string(), "break 4".to_string());
    presets
}

#[derive(Default)]
pub struct FakeHost {
    pub console: String,
}

impl RouterHost for FakeHost {
    fn append_console(&mut self, text: &str) {
        self.console.push_str(text);
    }
    fn focus_pane(&mut self, _name: &str) {}
    fn set_cwd(&mut self, _dir: &std::path::Path) {}
    fn current_source_lines(&self) -> Option<Vec<String>> {
        None
    }
    fn current_line(&self) -> Option<usize> {
        None
    }
}
