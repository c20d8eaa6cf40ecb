//! The `gf-*` internal meta-commands (§4.3, item 1).

/// Finds the line one past the matching closing brace of the block that
/// contains `current_line` (1-indexed into `lines`), by indentation rather
/// than a real parser (matching the original tool's text-mode approach,
/// Design Notes §9). Returns `None` if no enclosing block closer is found.
pub fn step_out_of_block_target(lines: &[&str], current_line: usize) -> Option<usize> {
    if current_line == 0 || current_line > lines.len() {
        return None;
    }
    let indent_of = |line: &str| line.len() - line.trim_start().len();
    let current_indent = indent_of(lines[current_line - 1]);

    for (offset, line) in lines.iter().enumerate().skip(current_line) {
        let trimmed = line.trim_start();
        if trimmed.starts_with('}') && indent_of(line) < current_indent {
            return Some(offset + 2); // one past this line (1-indexed + 1)
        }
    }
    None
}

/// Extracts the compilation directory from an `info source` response, as
/// used by `gf-get-pwd`. The original debugger prints a line of the form
/// `Compilation directory is /path/to/dir`.
pub fn parse_compilation_directory(response: &str) -> Option<&str> {
    const MARKER: &str = "Compilation directory is ";
    response.lines().find_map(|line| line.strip_prefix(MARKER))
}
