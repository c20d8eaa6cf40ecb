//! Parses the `[shortcuts]` key strings (`Ctrl+Shift+Key`) into a small
//! structured form the router/keymap layer can register as global
//! bindings. An unrecognized modifier warns and is dropped rather than
//! failing the whole load (§7, *Configuration*, non-fatal branch).

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChord {
    pub modifiers: Modifiers,
    pub key: String,
}

/// Parse `"Ctrl+Shift+B"` into a [`KeyChord`]. The final `+`-separated token
/// is always the key; any preceding tokens are modifiers.
pub fn parse(spec: &str) -> Option<KeyChord> {
    let parts: Vec<&str> = spec.split('+').map(str::trim).filter(|s| !s.is_empty()).collect();
    let (key, modifier_tokens) = parts.split_last()?;
    let mut modifiers = Modifiers::default();
    for token in modifier_tokens {
        match token.to_ascii_lowercase().as_str() {
            "ctrl" | "control" => modifiers.ctrl = true,
            "shift" => modifiers.shift = true,
            "alt" => modifiers.alt = true,
            other => {
                tracing::warn!(modifier = other, "unknown shortcut modifier, ignoring");
            }
        }
    }
    Some(KeyChord { modifiers, key: key.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ctrl_shift_key() {
        let chord = parse("Ctrl+Shift+B").unwrap();
        assert!(chord.modifiers.ctrl);
        assert!(chord.modifiers.shift);
        assert!(!chord.modifiers.alt);
        assert_eq!(chord.key, "B");
    }

    #[test]
    fn parses_bare_key() {
        let chord = parse("F5").unwrap();
        assert_eq!(chord.modifiers, Modifiers::default());
        assert_eq!(chord.key, "F5");
    }

    #[test]
    fn unknown_modifier_is_dropped_not_fatal() {
        let chord = parse("Hyper+X").unwrap();
        assert_eq!(chord.key, "X");
        assert!(!chord.modifiers.ctrl);
    }
}
