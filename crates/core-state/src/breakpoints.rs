//! Breakpoint projector (§4.4): `info break`, parsed into the breakpoint
//! table. The entire previous vector is discarded wholesale on each parse
//! (§3's Breakpoint lifecycle).

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    /// The file as GDB reported it (may be relative).
    pub short_file: String,
    /// Resolved to an absolute path when one can be derived; otherwise a
    /// copy of `short_file`.
    pub absolute_file: String,
    /// 1-indexed; 0 if this record is a watchpoint.
    pub line: u32,
    /// 0 if this is a line breakpoint.
    pub watchpoint_id: u32,
    pub enabled: bool,
    pub hit_count: u32,
}

fn resolve_absolute(file: &str, cwd: &std::path::Path) -> String {
    let path = std::path::Path::new(file);
    if path.is_absolute() {
        file.to_string()
    } else {
        cwd.join(path).to_string_lossy().into_owned()
    }
}

/// Parses an `info break` response. Rows whose leading column is not a
/// breakpoint number (the header row, blank lines, trailing "(gdb) ")
/// are skipped per §7's *Parse* kind.
pub fn parse_breakpoints(text: &str, cwd: &std::path::Path) -> Vec<Breakpoint> {
    let mut breakpoints: Vec<Breakpoint> = Vec::new();

    for line in text.lines() {
        let trimmed_start = line.trim_start();
        let leading_ws = line.len() - trimmed_start.len();

        if leading_ws >= 1 && !trimmed_start.is_empty() && trimmed_start.chars().next().unwrap().is_ascii_digit() == false {
            // Continuation line (e.g. "\tbreakpoint already hit 1 time").
            if let Some(pos) = line.find("already hit") {
                if let Some(last) = breakpoints.last_mut() {
                    let rest = &line[pos + "already hit".len()..];
                    if let Some(count) = rest.split_whitespace().next().and_then(|s| s.parse::<u32>().ok()) {
                        last.hit_count = count;
                    }
                }
            }
            continue;
        }

        let mut fields = trimmed_start.split_whitespace();
        let Some(num_token) = fields.next() else { continue };
        let Ok(num) = num_token.parse::<u32>() else { continue };

        let rest: Vec<&str> = fields.collect();
        if rest.is_empty() {
            continue;
        }
        // `Disp` is rest[1] when present (e.g. "keep"); `Enb` follows.
        let enabled_flag = rest.iter().find(|t| **t == "y" || **t == "n").copied();
        let enabled = enabled_flag == Some("y");

        let what_start = line.find(" at ");
        // GDB's watchpoint `Type` column is two words ("hw watchpoint",
        // "read watchpoint", "acc watchpoint"), so the substring can only
        // be found by scanning the whole type-ish prefix, not `rest[0]`
        // alone.
        let is_watchpoint = rest.iter().any(|t| t.eq_ignore_ascii_case("watchpoint"));

        if is_watchpoint {
            breakpoints.push(Breakpoint {
                short_file: String::new(),
                absolute_file: String::new(),
                line: 0,
                watchpoint_id: num,
                enabled,
                hit_count: 0,
            });
            continue;
        }

        if let Some(pos) = what_start {
            let location = line[pos + 4..].trim();
            if let Some((file, line_no)) = location.rsplit_once(':') {
                if let Ok(line_no) = line_no.trim().parse::<u32>() {
                    let absolute_file = resolve_absolute(file, cwd);
                    breakpoints.push(Breakpoint {
                        short_file: file.to_string(),
                        absolute_file,
                        line: line_no,
                        watchpoint_id: 0,
                        enabled,
                        hit_count: 0,
                    });
                    continue;
                }
            }
        }

        // Couldn't resolve a file:line and it isn't a watchpoint: skip
        // the row rather than fabricate a location (§7 *Parse*).
        tracing::debug!(num, "skipping unparsable breakpoint row");
    }

    breakpoints
}

/// Determines the gdb command to toggle a breakpoint at `file:line`: a
/// `clear` if one already exists there (any enabled/disabled state), else
/// a set command chosen by `hardware` — `hbreak` when `[gdb].breakpoint_type`
/// is `hardware`, `break` otherwise (§6; `examples/original_source/gf2.cpp`'s
/// `BREAK_COMMAND` macro: `useHardwareBreakpoints ? "hbreak" : "b"`). Matches
/// §8 item 2 (toggle parity) and the corresponding end-to-end scenario.
pub fn toggle_command(breakpoints: &[Breakpoint], file: &str, line: u32, hardware: bool) -> String {
    let exists = breakpoints
        .iter()
        .any(|b| b.watchpoint_id == 0 && b.line == line && (b.short_file == file || b.absolute_file == file));
    if exists {
        format!("clear {file}:{line}")
    } else if hardware {
        format!("hbreak {file}:{line}")
    } else {
        format!("break {file}:{line}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    #[test]
    fn parses_single_line_breakpoint() {
        let text = "Num     Type           Disp Enb Address            What\n1       breakpoint     keep y   0x0000000000401136 in main at hello.c:4\n(gdb) ";
        let bps = parse_breakpoints(text, Path::new("/proj"));
        assert_eq!(bps.len(), 1);
        assert_eq!(bps[0].short_file, "hello.c");
        assert_eq!(bps[0].line, 4);
        assert!(bps[0].enabled);
        assert_eq!(bps[0].absolute_file, "/proj/hello.c");
    }

    #[test]
    fn parses_hit_count_continuation() {
        let text = "Num     Type           Disp Enb Address            What\n1       breakpoint     keep y   0x0000000000401136 in main at hello.c:4\n\tbreakpoint already hit 3 times\n(gdb) ";
        let bps = parse_breakpoints(text, Path::new("/proj"));
        assert_eq!(bps[0].hit_count, 3);
    }

    #[test]
    fn parses_watchpoint() {
        let text = "Num     Type           Disp Enb Address            What\n2       hw watchpoint  keep y                      counter\n(gdb) ";
        let bps = parse_breakpoints(text, Path::new("/proj"));
        assert_eq!(bps.len(), 1);
        assert_eq!(bps[0].watchpoint_id, 2);
        assert_eq!(bps[0].line, 0);
    }

    #[test]
    fn no_breakpoints_yields_empty() {
        let text = "No breakpoints or watchpoints.\n(gdb) ";
        assert_eq!(parse_breakpoints(text, Path::new("/proj")), Vec::new());
    }

    #[test]
    fn toggle_parity_is_idempotent_over_two_flips() {
        let empty: Vec<Breakpoint> = Vec::new();
        let cmd1 = toggle_command(&empty, "hello.c", 4, false);
        assert_eq!(cmd1, "break hello.c:4");

        let after_add = parse_breakpoints(
            "Num     Type           Disp Enb Address            What\n1       breakpoint     keep y   0x1 in main at hello.c:4\n(gdb) ",
            Path::new("/proj"),
        );
        let cmd2 = toggle_command(&after_add, "hello.c", 4, false);
        assert_eq!(cmd2, "clear hello.c:4");
    }

    #[test]
    fn hardware_breakpoint_type_emits_hbreak() {
        let empty: Vec<Breakpoint> = Vec::new();
        assert_eq!(toggle_command(&empty, "hello.c", 4, true), "hbreak hello.c:4");
    }

    #[test]
    fn hardware_setting_does_not_change_the_clear_side() {
        let after_add = parse_breakpoints(
            "Num     Type           Disp Enb Address            What\n1       breakpoint     keep y   0x1 in main at hello.c:4\n(gdb) ",
            Path::new("/proj"),
        );
        assert_eq!(toggle_command(&after_add, "hello.c", 4, true), "clear hello.c:4");
    }
}
