//! Auto-print (component F, §4.6): infers an expression of interest from
//! the source line about to execute, and extracts the `=` substring from
//! its evaluated result for display as a pale annotation.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoPrintRecord {
    pub expression: String,
    pub line: u32,
    pub last_result: Option<String>,
}

const EXPR_MAX: usize = 1024;

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_expr_char(c: char) -> bool {
    is_ident_char(c) || matches!(c, '[' | ']' | '.' | '-' | '>' | ' ')
}

fn scan_ident(chars: &[char], from: usize) -> usize {
    let mut i = from;
    while i < chars.len() && is_ident_char(chars[i]) {
        i += 1;
    }
    i
}

/// Parses the current source line per §4.6: skip leading indentation,
/// optionally skip a type-name prefix (`identifier SPACE stars* identifier`),
/// then consume expression characters until an `=` is reached. Returns the
/// expression text, or `None` if no `=` is found (e.g. the line is not a
/// declaration/assignment).
pub fn extract_expression(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    let chars: Vec<char> = trimmed.chars().collect();

    let first_ident_end = scan_ident(&chars, 0);
    let mut expr_start = 0;

    if first_ident_end > 0 {
        let mut k = first_ident_end;
        let ws_start = k;
        while k < chars.len() && chars[k] == ' ' {
            k += 1;
        }
        if k > ws_start {
            let mut m = k;
            while m < chars.len() && (chars[m] == '*' || chars[m] == ' ') {
                m += 1;
            }
            let name_start = m;
            let name_end = scan_ident(&chars, m);
            if name_end > name_start {
                expr_start = name_start;
            }
        }
    }

    let mut p = expr_start;
    while p < chars.len() {
        let c = chars[p];
        if c == '=' {
            let expr: String = chars[expr_start..p].iter().collect();
            let expr = expr.trim().to_string();
            if expr.is_empty() || expr.len() > EXPR_MAX {
                return None;
            }
            return Some(expr);
        }
        if is_expr_char(c) {
            p += 1;
        } else {
            return None;
        }
    }
    None
}

/// Extracts the `=`-prefixed substring from a `print` response, e.g.
/// `"$1 = 5\n(gdb) "` -> `Some("= 5")`.
pub fn extract_result_annotation(response: &str) -> Option<String> {
    for line in response.lines() {
        if let Some(pos) = line.find(" = ") {
            return Some(line[pos + 1..].trim().to_string());
        }
    }
    None
}
