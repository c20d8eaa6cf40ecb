//! Thread projector (§4.4): `info threads`, with GDB's cosmetic
//! 3+-leading-space run collapsed before parsing.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadEntry {
    pub id: u32,
    pub description: String,
    pub active: bool,
}

/// Collapses runs of 3 or more leading spaces into a single space, a
/// cosmetic artifact of gdb's `info threads` column alignment (§4.4).
fn collapse_gdb_padding(line: &str) -> String {
    let mut result = String::new();
    let mut space_run = 0usize;
    for c in line.chars() {
        if c == ' ' {
            space_run += 1;
        } else {
            if space_run >= 3 {
                result.push(' ');
            } else {
                result.push_str(&" ".repeat(space_run));
            }
            space_run = 0;
            result.push(c);
        }
    }
    if space_run >= 3 {
        result.push(' ');
    } else {
        result.push_str(&" ".repeat(space_run));
    }
    result
}

/// Parses `info threads` rows: an optional leading `*` marks the active
/// thread, followed by an id and a quoted frame description.
pub fn parse_threads(text: &str) -> Vec<ThreadEntry> {
    let mut threads = Vec::new();
    for raw_line in text.lines() {
        let line = collapse_gdb_padding(raw_line);
        let trimmed = line.trim_start();
        let (active, rest) = if let Some(r) = trimmed.strip_prefix('*') {
            (true, r.trim_start())
        } else {
            (false, trimmed)
        };
        let mut fields = rest.splitn(2, ' ');
        let Some(id_token) = fields.next() else { continue };
        let Ok(id) = id_token.parse::<u32>() else { continue };
        let description = fields.next().unwrap_or("").trim().to_string();
        threads.push(ThreadEntry { id, description, active });
    }
    threads
}
