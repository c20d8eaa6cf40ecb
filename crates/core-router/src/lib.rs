//! The Command Router (component C): meta-command expansion, preset
//! command blocks, and raw passthrough (§4.3).

mod meta;
mod router;

pub use router::{Router, RouterHost};
