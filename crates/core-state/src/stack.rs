//! Stack projector (§4.4): `bt 50`, parsed into frames.

/// One call-stack frame. `function` and `location` are truncated per §3's
/// data-model bounds (64 and 256 bytes respectively).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackEntry {
    pub index: usize,
    pub function: String,
    pub location: Option<String>,
    pub address: Option<u64>,
    pub selected: bool,
}

const FUNCTION_MAX: usize = 64;
const LOCATION_MAX: usize = 256;

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        s[..max].to_string()
    }
}

/// Parses a `bt` response into frames. Lines that start with `#<n>` are
/// frames; everything else (blank lines, "No stack." etc.) is skipped
/// (§7's *Parse* kind: silently skip the affected row).
pub fn parse_stack(text: &str) -> Vec<StackEntry> {
    let mut frames = Vec::new();
    for line in text.lines() {
        let line = line.trim_start();
        if !line.starts_with('#') {
            continue;
        }
        let rest = &line[1..];
        let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits_end == 0 {
            continue;
        }
        let Ok(index) = rest[..digits_end].parse::<usize>() else {
            continue;
        };
        let mut remainder = rest[digits_end..].trim_start();

        let mut address = None;
        if let Some(stripped) = remainder.strip_prefix("0x") {
            let hex_end = stripped.find(char::is_whitespace).unwrap_or(stripped.len());
            if let Ok(addr) = u64::from_str_radix(&stripped[..hex_end], 16) {
                address = Some(addr);
            }
            remainder = remainder[2 + hex_end..].trim_start();
            remainder = remainder.strip_prefix("in ").unwrap_or(remainder);
        }

        let function_end = remainder.find(|c: char| c == ' ' || c == '(').unwrap_or(remainder.len());
        let function = truncate(remainder[..function_end].trim(), FUNCTION_MAX);

        let location = remainder.find(" at ").map(|pos| truncate(remainder[pos + 4..].trim(), LOCATION_MAX));

        frames.push(StackEntry { index, function, location, address, selected: false });
    }
    if let Some(first) = frames.first_mut() {
        first.selected = true;
    }
    frames
}

/// Selects `frame_index`, clearing the previous selection. No-op if the
/// index is out of range.
pub fn select_frame(frames: &mut [StackEntry], frame_index: usize) {
    for frame in frames.iter_mut() {
        frame.selected = frame.index == frame_index;
    }
}
