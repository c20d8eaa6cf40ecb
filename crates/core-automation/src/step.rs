//! The Automation Hook's script format (§4.8): a JSON array of steps,
//! deserialized with `serde` rather than a bespoke scanner, matching how
//! the rest of this workspace reaches for the ecosystem's serialization
//! crate instead of hand-rolling one more parser.

use serde::Deserialize;

/// One step of a script. `op` selects the variant; unrecognized fields or
/// an unknown `op` fail to deserialize rather than being silently skipped
/// — a malformed automation script is a test-authoring bug, not a runtime
/// condition to degrade gracefully from.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Step {
    /// A router-level command string. `is_async` selects whether the
    /// harness sends it as a resuming command and waits for the next
    /// response unit off the event bus, or issues it as a direct
    /// synchronous call and captures its response immediately.
    Send {
        command: String,
        #[serde(default)]
        is_async: bool,
    },
    /// The most recent response unit (sync sends) or event-bus response
    /// (async sends) must contain `substring`.
    ExpectContains { substring: String },
    ExpectStackLen { len: usize },
    ExpectBreakpointCount { count: usize },
    /// The current source position must be at `file`:`line`. `file` is
    /// matched as a suffix, since the projector may have resolved a
    /// relative path to an absolute one.
    ExpectSource { file: String, line: u32 },
    /// Bounded per [`MAX_SLEEP_MS`] (§4.8: "bounded, for giving the async
    /// event path time to settle").
    SleepMs { ms: u64 },
}

/// The sleep-ms step's upper bound (§4.8).
pub const MAX_SLEEP_MS: u64 = 5_000;

/// Parses a script from its JSON text (§4.8: "A script is a JSON array of
/// steps").
pub fn parse_script(text: &str) -> Result<Vec<Step>, crate::error::AutomationError> {
    serde_json::from_str(text).map_err(crate::error::AutomationError::InvalidScript)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_step_script() {
        let text = r#"[
            {"op": "send", "command": "file hello", "is_async": false},
            {"op": "send", "command": "run", "is_async": true},
            {"op": "expect-stack-len", "len": 1},
            {"op": "expect-source", "file": "hello.c", "line": 4},
            {"op": "sleep-ms", "ms": 50}
        ]"#;
        let steps = parse_script(text).unwrap();
        assert_eq!(steps.len(), 5);
        assert_eq!(steps[0], Step::Send { command: "file hello".to_string(), is_async: false });
        assert_eq!(steps[2], Step::ExpectStackLen { len: 1 });
    }

    #[test]
    fn send_defaults_to_synchronous() {
        let steps = parse_script(r#"[{"op": "send", "command": "x"}]"#).unwrap();
        assert_eq!(steps[0], Step::Send { command: "x".to_string(), is_async: false });
    }

    #[test]
    fn unknown_op_is_rejected() {
        assert!(parse_script(r#"[{"op": "frobnicate"}]"#).is_err());
    }
}
