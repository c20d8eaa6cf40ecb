//! Access paths (§4.5): a root-to-node sequence of keys that uniquely
//! identifies a watch expression, and the python-literal encoding passed
//! to the `gf_typeof`/`gf_valueof`/`gf_fields` helpers.

/// One element of an access path below the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathElement {
    Field(String),
    /// An array index. Whether this renders as a bare integer or a
    /// synthesized `"[i]"` string depends on whether the *parent* node is
    /// a dynamic array (§4.5).
    Index(usize),
    DynamicIndex(usize),
}

/// Renders a full access path (root expression + element list) as the
/// python list literal the embedded helpers expect, e.g.
/// `['p', 'field', 2, '[3]']`.
pub fn render(root_expression: &str, elements: &[PathElement]) -> String {
    let mut out = String::from("[");
    out.push_str(&quote(root_expression));
    for elem in elements {
        out.push_str(", ");
        match elem {
            PathElement::Field(name) => out.push_str(&quote(name)),
            PathElement::Index(i) => out.push_str(&i.to_string()),
            PathElement::DynamicIndex(i) => out.push_str(&quote(&format!("[{i}]"))),
        }
    }
    out.push(']');
    out
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_root_only() {
        assert_eq!(render("p", &[]), "['p']");
    }

    #[test]
    fn renders_field_and_indices() {
        let elements = vec![
            PathElement::Field("items".to_string()),
            PathElement::Index(2),
            PathElement::DynamicIndex(3),
        ];
        assert_eq!(render("root", &elements), "['root', 'items', 2, '[3]']");
    }

    #[test]
    fn escapes_quotes_in_root_expression() {
        assert_eq!(render("a['x']", &[]), "['a[\\'x\\']']");
    }
}
