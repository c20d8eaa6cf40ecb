//! `dbgview` entrypoint: wires the Debugger Interaction Core, the Command
//! Router, the State Projectors, the Watch Expression Engine, and the
//! Control/Log Pipes into the headless, line-oriented front-end described
//! by §5 ("Host binding") and §6 ("CLI"). There is no widget toolkit in
//! this crate — the binary's own stdin/stdout stand in for whatever
//! graphical shell a real front-end would supply.

mod prelude;

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};

use anyhow::Result;
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use core_automation::{Harness, parse_script};
use core_channel::Channel;
use core_config::{ConfigError, DenyAll, Settings, TrustPrompt};
use core_events::{ControlMessage, Event, EventBus};
use core_router::{Router, RouterHost};
use core_state::DebuggerSession;
use core_watch::{EvalBackend, GdbBackend, WatchTree};

/// Forwarded verbatim as additional gdb arguments (§6: "Arguments after
/// the binary name are forwarded as additional gdb arguments"). The one
/// addition over the original CLI contract is `--script`, stripped
/// before the remainder is forwarded.
#[derive(Parser, Debug)]
#[command(name = "dbgview", version, about = "Front-end for a line-oriented command debugger")]
struct Args {
    /// Run a scripted regression (§4.8) instead of the interactive loop.
    #[arg(long)]
    script: Option<PathBuf>,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    gdb_args: Vec<String>,
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let file_appender = tracing_appender::rolling::never(log_dir, "dbgview.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(_) => Some(guard),
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

/// Reads a yes/no answer from stdin to decide whether a per-directory
/// `.gdbview.ini` should be trusted (§6).
struct StdinTrustPrompt;

impl TrustPrompt for StdinTrustPrompt {
    fn confirm_trust(&self, dir: &Path) -> bool {
        eprint!("Trust per-directory config in {}? [y/N] ", dir.display());
        let _ = std::io::stderr().flush();
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).is_err() {
            return false;
        }
        matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

/// Loads settings per §6's two-file precedence, degrading to global-only
/// settings (with a warning) on an untrusted per-directory file instead
/// of aborting, and propagating the one fatal configuration condition
/// (§7/§8's "Layout fatal" scenario) as a process exit.
fn load_settings(global_path: &Path, project_dir: &Path, prompt: &dyn TrustPrompt) -> Settings {
    match core_config::load(global_path, project_dir, prompt) {
        Ok(settings) => settings,
        Err(ConfigError::Layout(reason)) => {
            eprintln!("fatal: malformed [ui] layout: {reason}");
            std::process::exit(1);
        }
        Err(ConfigError::UntrustedDirectory(dir)) => {
            tracing::warn!(dir = %dir.display(), "per-directory config not trusted, using global settings only");
            let text = std::fs::read_to_string(global_path).unwrap_or_default();
            let entries = core_config::ini::parse(&text).unwrap_or_default();
            Settings::from_entries(&entries).unwrap_or_default()
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            Settings::default()
        }
    }
}

fn global_ini_path() -> PathBuf {
    std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")).join(".dbgview.ini")
}

fn build_argv(settings: &Settings, forwarded: &[String]) -> Vec<String> {
    let mut argv = vec![settings.gdb.path.clone().unwrap_or_else(|| "gdb".to_string())];
    argv.extend(settings.gdb.arguments.iter().cloned());
    argv.extend(forwarded.iter().cloned());
    argv
}

fn send_python_prelude(channel: &Channel) {
    let _ = channel.call_sync(prelude::PYTHON_PRELUDE);
}

/// Adapts the shared, mutex-protected session to [`RouterHost`] for the
/// interactive loop, where the stdin-reading thread and the event-bus
/// thread both need access to the same projected state.
struct LineHost {
    session: Arc<Mutex<DebuggerSession>>,
    channel: Channel,
}

impl RouterHost for LineHost {
    fn append_console(&mut self, text: &str) {
        println!("{text}");
    }

    fn focus_pane(&mut self, name: &str) {
        tracing::info!(pane = name, "gf-switch-to (no widget toolkit here; logged only)");
    }

    fn set_cwd(&mut self, dir: &Path) {
        self.session.lock().unwrap().cwd = dir.to_path_buf();
    }

    fn current_source_lines(&self) -> Option<Vec<String>> {
        let session = self.session.lock().unwrap();
        let path = session.loaded_file.path.clone()?;
        std::fs::read_to_string(path).ok().map(|text| text.lines().map(String::from).collect())
    }

    fn current_line(&self) -> Option<usize> {
        self.session.lock().unwrap().source.as_ref().map(|s| s.line as usize)
    }

    fn mark_running(&mut self) {
        self.session.lock().unwrap().on_resume();
    }

    fn toggle_breakpoint_at_current_line(&mut self) {
        let mut session = self.session.lock().unwrap();
        let Some(position) = session.source.clone() else {
            tracing::warn!("gf-toggle-breakpoint: no current source position");
            return;
        };
        let file = position.file.to_string_lossy().into_owned();
        session.toggle_breakpoint(&self.channel, &file, position.line);
    }
}

/// Applies one control-pipe message (§4.7's three sub-commands) against
/// the shared session. `c ` (run a command) goes through the router so
/// `gf-` expansion still applies, matching how a keystroke would behave.
fn apply_control(message: ControlMessage, router: &Router, session: &Arc<Mutex<DebuggerSession>>, channel: &Channel) {
    match message {
        ControlMessage::SetFile(file) => {
            let mut session = session.lock().unwrap();
            session.loaded_file.path = Some(PathBuf::from(file));
            session.loaded_file.mtime = None;
        }
        ControlMessage::SetLine(line) => {
            let mut session = session.lock().unwrap();
            if let Some(path) = session.loaded_file.path.clone() {
                session.source = Some(core_state::SourcePosition { file: path, line });
            }
        }
        ControlMessage::RunCommand(command) => {
            let mut host = LineHost { session: session.clone(), channel: channel.clone() };
            router.route(&command, &mut host);
        }
    }
}

/// Drains the event bus on its own thread: the channel reader, the
/// control-pipe reader, and the optional log-pipe reader all post here
/// (§5, §8). A response unit re-runs the full projector pipeline before
/// auto-print evaluates the freshly displayed line.
fn run_event_loop(
    channel: Channel,
    router: Arc<Router>,
    session: Arc<Mutex<DebuggerSession>>,
    watch: Arc<Mutex<WatchTree>>,
    bus_rx: core_events::EventBusReceiver,
) {
    while let Some(event) = bus_rx.recv() {
        match event {
            Event::Debugger(unit) => {
                print!("{}", unit.text);
                let _ = std::io::stdout().flush();
                let mut session_guard = session.lock().unwrap();
                session_guard.on_stop(&channel);
                if let Some(position) = session_guard.source.clone() {
                    if let Ok(text) = std::fs::read_to_string(&position.file) {
                        if let Some(line_text) = text.lines().nth(position.line.saturating_sub(1) as usize) {
                            session_guard.on_source_line(&channel, line_text, position.line);
                        }
                    }
                }
                drop(session_guard);
                let backend = GdbBackend::new(&channel);
                let running = session.lock().unwrap().program_running;
                watch.lock().unwrap().refresh(&backend as &dyn EvalBackend, running);
            }
            Event::Control(message) => apply_control(message, &router, &session, &channel),
            Event::Log(line) => {
                eprintln!("[{}] {}", line.target, line.text.trim_end());
            }
            Event::Tick => {}
            Event::Shutdown => {
                // Only posted by the channel reader on a receive-buffer
                // overflow (§7's one *Fatal* transport condition); a
                // clean `quit` is handled by the stdin loop directly.
                eprintln!("fatal: debugger channel reported an unrecoverable transport error");
                std::process::exit(1);
            }
        }
    }
}

/// The interactive, line-oriented front-end (§5): one thread drains the
/// event bus and projects state; the main thread reads newline-delimited
/// commands from stdin and forwards each to the router.
fn run_interactive(
    channel: Channel,
    router: Router,
    settings: &Settings,
    bus: EventBus,
    bus_rx: core_events::EventBusReceiver,
) {
    let session = Arc::new(Mutex::new(DebuggerSession::new(std::env::current_dir().unwrap_or_default())));
    session.lock().unwrap().hardware_breakpoints = settings.gdb.breakpoint_type == core_config::BreakpointType::Hardware;
    let watch = Arc::new(Mutex::new(WatchTree::new()));
    let router = Arc::new(router);

    send_python_prelude(&channel);

    if let Some(control_path) = settings.pipe.control.clone() {
        if let Err(e) = core_pipes::spawn_control_reader(control_path, bus.clone()) {
            tracing::warn!(error = %e, "failed to start control pipe reader");
        }
    }
    if let Some(log_path) = settings.pipe.log.clone() {
        if let Err(e) = core_pipes::spawn_log_reader(log_path, "Log".to_string(), bus) {
            tracing::warn!(error = %e, "failed to start log pipe reader");
        }
    }

    let event_channel = channel.clone();
    let event_router = router.clone();
    let event_session = session.clone();
    let event_watch = watch.clone();
    let event_thread = std::thread::Builder::new()
        .name("dbgview-events".into())
        .spawn(move || run_event_loop(event_channel, event_router, event_session, event_watch, bus_rx))
        .expect("spawn event loop thread");

    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed == "quit" {
                    break;
                }
                if let Some(expr) = trimmed.strip_prefix("watch ") {
                    let mut tree = watch.lock().unwrap();
                    let id = tree.add_root(expr.to_string());
                    let backend = GdbBackend::new(&channel);
                    tree.open(id, &backend as &dyn EvalBackend);
                    println!("{}", tree.label(id));
                    continue;
                }
                let mut host = LineHost { session: session.clone(), channel: channel.clone() };
                router.route(trimmed, &mut host);
            }
            Err(e) => {
                tracing::warn!(error = %e, "stdin read error, shutting down");
                break;
            }
        }
    }

    channel.close();
    let _ = event_thread.join();
}

fn run_script_mode(
    channel: Channel,
    router: Router,
    settings: &Settings,
    bus_rx: core_events::EventBusReceiver,
    script_path: &Path,
) -> Result<()> {
    let text = std::fs::read_to_string(script_path)?;
    let steps = parse_script(&text)?;
    let mut session = DebuggerSession::new(std::env::current_dir().unwrap_or_default());
    session.hardware_breakpoints = settings.gdb.breakpoint_type == core_config::BreakpointType::Hardware;
    let mut harness = Harness::new(channel.clone(), router, session, bus_rx);
    let report = harness.run_script(&steps);
    channel.close();

    if report.is_success() {
        println!("ok: {} step(s) passed", steps.len());
        Ok(())
    } else {
        for failure in &report.failures {
            println!(
                "step {}: expected {}, observed {}",
                failure.step_index, failure.expected, failure.observed
            );
        }
        std::process::exit(1);
    }
}

fn main() -> Result<()> {
    let _log_guard = configure_logging();
    install_panic_hook();

    let args = Args::parse();
    let project_dir = std::env::current_dir()?;
    let global_ini = global_ini_path();

    let prompt: Box<dyn TrustPrompt> = if args.script.is_some() { Box::new(DenyAll) } else { Box::new(StdinTrustPrompt) };
    let settings = load_settings(&global_ini, &project_dir, prompt.as_ref());

    let argv = build_argv(&settings, &args.gdb_args);
    let (bus, bus_rx) = EventBus::new();
    let pipe_bus = bus.clone();
    let channel = Channel::open(argv, bus)?;

    let presets: BTreeMap<String, String> = settings.commands.clone();
    let router = Router::new(channel.clone(), presets);

    if let Some(script_path) = args.script.clone() {
        run_script_mode(channel, router, &settings, bus_rx, &script_path)
    } else {
        run_interactive(channel, router, &settings, pipe_bus, bus_rx);
        Ok(())
    }
}
