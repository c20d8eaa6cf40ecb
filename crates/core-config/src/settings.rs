//! Maps the flat `section.key` pairs the INI scanner produces onto the
//! fixed, enumerated set of options in §6. Unknown keys warn and are
//! ignored (§7's *Configuration* kind, non-fatal branch); `breakpoint_type`
//! values outside `{software, hardware}` likewise warn and fall back to the
//! default rather than aborting the whole load.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::ini::{self, RawEntry};
use crate::layout::{self, LayoutNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BreakpointType {
    #[default]
    Software,
    Hardware,
}

#[derive(Debug, Clone, Default)]
pub struct UiSettings {
    pub font_size: Option<i64>,
    pub scale: Option<f64>,
    pub layout: Option<LayoutNode>,
    pub maximize: bool,
}

#[derive(Debug, Clone, Default)]
pub struct GdbSettings {
    pub path: Option<String>,
    pub arguments: Vec<String>,
    pub breakpoint_type: BreakpointType,
}

#[derive(Debug, Clone, Default)]
pub struct VimSettings {
    pub server_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PipeSettings {
    pub log: Option<PathBuf>,
    pub control: Option<PathBuf>,
}

/// The fully assembled, enumerated configuration (§6), built from whichever
/// `RawEntry` list the two-file precedence in [`load`] hands it.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub ui: UiSettings,
    pub gdb: GdbSettings,
    /// Preset name -> semicolon-separated command sequence (§4.3).
    pub commands: BTreeMap<String, String>,
    /// `Ctrl+Shift+Key` -> command string (§6).
    pub shortcuts: BTreeMap<String, String>,
    /// Theme color name -> 24-bit RGB value.
    pub theme: BTreeMap<String, u32>,
    pub vim: VimSettings,
    pub pipe: PipeSettings,
    pub trusted_folders: Vec<PathBuf>,
}

fn warn_unknown(section: &str, key: &str, line: usize) {
    tracing::warn!(section, key, line, "unknown config key, ignoring");
}

impl Settings {
    /// Fold a flat entry list into a `Settings`, applying later entries'
    /// precedence over earlier ones for singular keys (so the per-directory
    /// file, applied second, can override the global file) while
    /// `argument`/`commands`/`shortcuts`/`theme` accumulate.
    pub fn from_entries(entries: &[RawEntry]) -> Result<Settings, ConfigError> {
        let mut settings = Settings::default();

        for entry in entries {
            match (entry.section.as_str(), entry.key.as_str()) {
                ("ui", "font_size") => {
                    settings.ui.font_size = entry.value.parse().ok();
                }
                ("ui", "scale") => {
                    settings.ui.scale = entry.value.parse().ok();
                }
                ("ui", "layout") => {
                    settings.ui.layout = Some(layout::parse(&entry.value)?);
                }
                ("ui", "maximize") => {
                    settings.ui.maximize = entry.value.trim() == "1";
                }
                ("gdb", "path") => {
                    settings.gdb.path = Some(entry.value.clone());
                }
                ("gdb", "argument") => {
                    settings.gdb.arguments.push(entry.value.clone());
                }
                ("gdb", "breakpoint_type") => match entry.value.as_str() {
                    "software" => settings.gdb.breakpoint_type = BreakpointType::Software,
                    "hardware" => settings.gdb.breakpoint_type = BreakpointType::Hardware,
                    other => {
                        tracing::warn!(value = other, "invalid breakpoint_type, defaulting to software");
                        settings.gdb.breakpoint_type = BreakpointType::Software;
                    }
                },
                ("commands", key) => {
                    settings.commands.insert(key.to_string(), entry.value.clone());
                }
                ("shortcuts", key) => {
                    settings.shortcuts.insert(key.to_string(), entry.value.clone());
                }
                ("theme", key) => match u32::from_str_radix(entry.value.trim_start_matches('#'), 16) {
                    Ok(v) => {
                        settings.theme.insert(key.to_string(), v);
                    }
                    Err(_) => {
                        tracing::warn!(key, value = %entry.value, "invalid theme color, ignoring");
                    }
                },
                ("vim", "server_name") => {
                    settings.vim.server_name = Some(entry.value.clone());
                }
                ("pipe", "log") => {
                    settings.pipe.log = Some(PathBuf::from(&entry.value));
                }
                ("pipe", "control") => {
                    settings.pipe.control = Some(PathBuf::from(&entry.value));
                }
                ("trusted_folders", key) => {
                    let _ = key;
                    settings.trusted_folders.push(PathBuf::from(&entry.value));
                }
                (section, key) => warn_unknown(section, key, entry.line),
            }
        }

        Ok(settings)
    }
}

/// Asks the user whether `dir` should be added to `[trusted_folders]` the
/// first time a per-directory config is encountered (§6). Implemented as a
/// trait so tests and headless runs can supply a canned answer instead of
/// reading a real terminal.
pub trait TrustPrompt {
    fn confirm_trust(&self, dir: &Path) -> bool;
}

/// Never trusts; used when no interactive prompt is available (e.g. under
/// `--script`).
pub struct DenyAll;
impl TrustPrompt for DenyAll {
    fn confirm_trust(&self, _dir: &Path) -> bool {
        false
    }
}

/// Loads the two-file precedence described in §6: a user-global INI file,
/// then (only if its directory is already trusted, or the prompt accepts
/// it) a per-directory INI file layered on top.
pub fn load(
    global_path: &Path,
    project_dir: &Path,
    prompt: &dyn TrustPrompt,
) -> Result<Settings, ConfigError> {
    let global_text = std::fs::read_to_string(global_path).unwrap_or_default();
    let mut entries = ini::parse(&global_text)?;
    let mut settings = Settings::from_entries(&entries)?;

    let project_ini = project_dir.join(".gdbview.ini");
    if project_ini.exists() {
        let trusted = settings.trusted_folders.iter().any(|p| p == project_dir);
        let trusted = trusted || prompt.confirm_trust(project_dir);
        if trusted {
            if !settings.trusted_folders.iter().any(|p| p == project_dir) {
                settings.trusted_folders.push(project_dir.to_path_buf());
                entries.push(RawEntry {
                    section: "trusted_folders".to_string(),
                    key: "folder".to_string(),
                    value: project_dir.to_string_lossy().to_string(),
                    line: entries.len() + 1,
                });
            }
            let local_text = std::fs::read_to_string(&project_ini)?;
            let local_entries = ini::parse(&local_text)?;
            entries.extend(local_entries);
            settings = Settings::from_entries(&entries)?;
        } else {
            return Err(ConfigError::UntrustedDirectory(project_dir.to_path_buf()));
        }
    }

    Ok(settings)
}
