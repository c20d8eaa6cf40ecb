use std::path::PathBuf;

/// Error taxonomy for the settings/INI loader (§7's *Configuration* kind).
///
/// Per §7, an unknown shortcut key or an invalid `breakpoint_type` are
/// warn-and-default; only [`ConfigError::Layout`] is fatal and expected to
/// terminate the process with exit code 1 (§6, §8's "Layout fatal" scenario).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed ini at line {line}: {reason}")]
    Ini { line: usize, reason: String },

    #[error("fatal layout grammar error: {0}")]
    Layout(String),

    #[error("directory {0} is not in [trusted_folders]; per-directory config ignored")]
    UntrustedDirectory(PathBuf),
}
