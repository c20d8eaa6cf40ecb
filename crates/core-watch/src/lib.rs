//! The Watch Expression Engine (component E, the WEE): an arena-addressed
//! tree of access-path-identified nodes, lazily materialized against the
//! three `gf_*` python helpers the debugger evaluates (§4.5).

pub mod backend;
pub mod path;
pub mod tree;

pub use backend::{EvalBackend, FieldsResult, GdbBackend, MAX_ARRAY_CHILDREN};
pub use path::PathElement;
pub use tree::{NodeId, NodeView, WatchTree};

/// Carries the `??` token a watch helper returned for one node's access
/// path (§7 *Evaluation*). This is not a Rust `Error` a caller propagates
/// with `?` — an evaluation failure is an expected, displayable outcome
/// (the node shows `??` and keeps its tree position), represented as data
/// rather than thrown, per `SPEC_FULL.md`'s error taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalError {
    pub root_expression: String,
    pub path: Vec<PathElement>,
}
