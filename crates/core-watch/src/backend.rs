//! The evaluation backend: the boundary between the arena-of-nodes engine
//! and the three python helpers the debugger evaluates (`gf_typeof`,
//! `gf_valueof`, `gf_fields`), plus `gf_locals` (§4.5, §6). Kept as a
//! trait so the engine can be tested against a canned backend instead of
//! a real gdb child (Design Notes §9: "keep this as a constant string; do
//! not attempt to regenerate or parse its behavior on the host side" — we
//! only ever call it, never reinterpret the Python).

use core_channel::Channel;

use crate::path::{self, PathElement};

/// What `gf_fields` reported for one node (§4.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldsResult {
    Array(usize),
    DynamicArray(usize),
    Fields(Vec<String>),
    /// The helper returned `??` or raised: evaluation failed (§7's
    /// *Evaluation* kind; represented as data, not a thrown error).
    Error,
}

pub trait EvalBackend {
    fn typeof_(&self, root_expression: &str, path: &[PathElement]) -> String;
    /// `format` is a single character; `' '` means "natural" (§4.5).
    fn valueof(&self, root_expression: &str, path: &[PathElement], format: char) -> String;
    fn fields(&self, root_expression: &str, path: &[PathElement]) -> FieldsResult;
    fn locals(&self) -> Vec<String>;
}

/// Clamp on how many children a single `(array)`/`(d_arr)` node may
/// materialize (§4.5).
pub const MAX_ARRAY_CHILDREN: usize = 10_000_000;

/// Parses one `gf_fields` response line, e.g. `"(array) 12"`,
/// `"(d_arr) 3"`, a newline-separated field-name list, or `"??"`.
pub fn parse_fields_response(response: &str) -> FieldsResult {
    let trimmed = response.trim();
    if trimmed == "??" || trimmed.is_empty() {
        return FieldsResult::Error;
    }
    if let Some(rest) = trimmed.strip_prefix("(array)") {
        if let Ok(n) = rest.trim().parse::<usize>() {
            return FieldsResult::Array(n.min(MAX_ARRAY_CHILDREN));
        }
        return FieldsResult::Error;
    }
    if let Some(rest) = trimmed.strip_prefix("(d_arr)") {
        if let Ok(n) = rest.trim().parse::<usize>() {
            return FieldsResult::DynamicArray(n.min(MAX_ARRAY_CHILDREN));
        }
        return FieldsResult::Error;
    }
    FieldsResult::Fields(trimmed.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from).collect())
}

/// Strips the trailing gdb prompt and any leading `$N = ` print-result
/// decoration the `print gf_*(...)` wrapper leaves behind, returning only
/// the payload the helper's own `print(...)` call produced.
fn unwrap_print_response(response: &str) -> String {
    response
        .lines()
        .find(|l| !l.trim().is_empty() && *l != core_channel::PROMPT_SENTINEL.trim_end())
        .map(str::trim)
        .unwrap_or("")
        .to_string()
}

/// The real backend: each call is one synchronous `print gf_xxx(path)`
/// round trip through the [`Channel`] (§6's "A Python prelude ... is
/// evaluated on the first response unit").
pub struct GdbBackend<'a> {
    channel: &'a Channel,
}

impl<'a> GdbBackend<'a> {
    pub fn new(channel: &'a Channel) -> GdbBackend<'a> {
        GdbBackend { channel }
    }
}

impl EvalBackend for GdbBackend<'_> {
    fn typeof_(&self, root_expression: &str, path: &[PathElement]) -> String {
        let encoded = path::render(root_expression, path);
        let response = self.channel.call_sync(&format!("gf_typeof({encoded})"));
        unwrap_print_response(&response)
    }

    fn valueof(&self, root_expression: &str, path: &[PathElement], format: char) -> String {
        let encoded = path::render(root_expression, path);
        let response = self.channel.call_sync(&format!("gf_valueof({encoded}, '{format}')"));
        unwrap_print_response(&response)
    }

    fn fields(&self, root_expression: &str, path: &[PathElement]) -> FieldsResult {
        let encoded = path::render(root_expression, path);
        let response = self.channel.call_sync(&format!("gf_fields({encoded})"));
        parse_fields_response(&unwrap_print_response(&response))
    }

    fn locals(&self) -> Vec<String> {
        let response = self.channel.call_sync("gf_locals()");
        unwrap_print_response(&response)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect()
    }
}
