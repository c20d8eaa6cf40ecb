//! Drives `core_automation::Harness` — the same automation entry point
//! `dbgview --script` uses — against a scripted fake debugger, reusing
//! the shared scenario fixture in `tests/common`.

mod common;

use std::path::PathBuf;

use common::scripted_debugger_argv;
use core_automation::{Harness, parse_script};
use core_events::EventBus;
use core_router::Router;
use core_state::DebuggerSession;

const RUN_CASE: &str = r#"    "run") printf '\nBreakpoint 1, main () at hello.c:4\n4\t\tprintf("hello!\\n");\n(gdb) ' ;;"#;

#[test]
fn script_mode_stops_at_the_breakpoint() {
    let (bus, rx) = EventBus::new();
    let channel = core_channel::Channel::open(scripted_debugger_argv(RUN_CASE), bus).unwrap();
    let router = Router::new(channel.clone(), Default::default());
    let session = DebuggerSession::new(PathBuf::from("/proj"));
    let mut harness = Harness::new(channel, router, session, rx);

    let steps = parse_script(
        r#"[
            {"op": "send", "command": "file hello", "is_async": false},
            {"op": "send", "command": "break 4", "is_async": false},
            {"op": "send", "command": "run", "is_async": true},
            {"op": "expect-stack-len", "len": 1},
            {"op": "expect-breakpoint-count", "count": 1},
            {"op": "expect-source", "file": "hello.c", "line": 4}
        ]"#,
    )
    .unwrap();

    let report = harness.run_script(&steps);
    assert!(report.is_success(), "{:?}", report.failures);
}
