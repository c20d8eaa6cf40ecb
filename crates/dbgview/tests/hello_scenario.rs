//! End-to-end composition test: wires the same Channel + Router +
//! DebuggerSession + WatchTree quartet `main` builds, against a scripted
//! fake debugger, and drives it through a stop, a watch expression, and a
//! breakpoint toggle.

mod common;

use std::path::PathBuf;

use common::{break4_presets, open_hello_channel, FakeHost};
use core_router::Router;
use core_state::DebuggerSession;
use core_watch::{EvalBackend, GdbBackend, WatchTree};

#[test]
fn drives_session_and_watch_tree_through_a_stop() {
    let channel = open_hello_channel();
    let mut host = FakeHost::default();

    let router = Router::new(channel.clone(), break4_presets());
    router.route("file hello", &mut host);
    router.route("gf-command break4", &mut host);
    assert!(host.console.contains("Breakpoint 1"));

    let mut session = DebuggerSession::new(PathBuf::from("/proj"));
    session.on_stop(&channel);
    assert_eq!(session.stack.len(), 1);
    assert_eq!(session.breakpoints.len(), 1);

    let mut watch = WatchTree::new();
    let root = watch.add_root("x".to_string());
    let backend = GdbBackend::new(&channel);
    watch.open(root, &backend as &dyn EvalBackend);
    assert!(watch.is_open(root));
    assert!(watch.children(root).is_empty());

    channel.close();
}

#[test]
fn toggle_breakpoint_round_trips_through_session() {
    let channel = open_hello_channel();
    let mut session = DebuggerSession::new(PathBuf::from("/proj"));
    session.on_stop(&channel);
    let before = session.breakpoints.len();
    session.toggle_breakpoint(&channel, "hello.c", 4);
    assert_eq!(session.breakpoints.len(), before);
    channel.close();
}
