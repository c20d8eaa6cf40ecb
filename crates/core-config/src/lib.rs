//! Settings (INI) loader and the `[ui].layout` grammar, per §6.
//!
//! This crate has no dependents among the four core subsystems (it is a
//! leaf the binary consumes directly to build `core-router`'s presets and
//! `core-pipes`'s FIFO paths); see the crate map in `SPEC_FULL.md` §2.

pub mod error;
pub mod ini;
pub mod layout;
pub mod settings;
pub mod shortcuts;

pub use error::ConfigError;
pub use layout::LayoutNode;
pub use settings::{BreakpointType, DenyAll, Settings, TrustPrompt, load};
