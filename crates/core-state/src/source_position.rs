//! Source position projector (§4.4 last bullet): reload the displayed
//! file only when the path or its on-disk mtime changed.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePosition {
    pub file: PathBuf,
    pub line: u32,
}

/// Tracks the last file we actually loaded from disk, independent of
/// which line is currently focused, so repeated stops in the same
/// unmodified file don't re-read it.
#[derive(Debug, Clone, Default)]
pub struct LoadedFile {
    pub path: Option<PathBuf>,
    pub mtime: Option<SystemTime>,
}

/// Decides whether a file reload is required given the new target and the
/// previously loaded file's path/mtime. Pure and filesystem-agnostic so it
/// can be unit tested with canned `SystemTime`s.
pub fn needs_reload(loaded: &LoadedFile, new_path: &Path, new_mtime: Option<SystemTime>) -> bool {
    match &loaded.path {
        None => true,
        Some(path) if path != new_path => true,
        Some(_) => loaded.mtime != new_mtime,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn first_load_always_needed() {
        let loaded = LoadedFile::default();
        assert!(needs_reload(&loaded, Path::new("a.c"), Some(SystemTime::UNIX_EPOCH)));
    }

    #[test]
    fn same_path_same_mtime_skips_reload() {
        let loaded = LoadedFile { path: Some(PathBuf::from("a.c")), mtime: Some(SystemTime::UNIX_EPOCH) };
        assert!(!needs_reload(&loaded, Path::new("a.c"), Some(SystemTime::UNIX_EPOCH)));
    }

    #[test]
    fn changed_mtime_forces_reload() {
        let loaded = LoadedFile { path: Some(PathBuf::from("a.c")), mtime: Some(SystemTime::UNIX_EPOCH) };
        let newer = SystemTime::UNIX_EPOCH + Duration::from_secs(5);
        assert!(needs_reload(&loaded, Path::new("a.c"), Some(newer)));
    }

    #[test]
    fn different_path_forces_reload() {
        let loaded = LoadedFile { path: Some(PathBuf::from("a.c")), mtime: Some(SystemTime::UNIX_EPOCH) };
        assert!(needs_reload(&loaded, Path::new("b.c"), Some(SystemTime::UNIX_EPOCH)));
    }
}
