//! The watch-node arena (§4.5, Design Notes §9's "prefer an arena of watch
//! nodes addressed by index; the tree then holds indices, not pointers, and
//! freeing a root is a subtree traversal returning indices to a free list").
//!
//! One [`WatchTree`] serves either the user-typed watch view or the
//! Locals view (§4.5 "Locals mode" is a separate watch view synced to
//! `gf_locals()`, not a different data structure).

use std::collections::BTreeSet;

use crate::backend::{EvalBackend, FieldsResult};
use crate::path::PathElement;

/// An index into the arena. `Copy`/`Ord` so it can live in a `BTreeSet`
/// (the dynamic-arrays registry, §4.5) without a wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKey {
    /// A root's key is the user-typed expression, or (in Locals mode) the
    /// local variable's name (§3).
    Root(String),
    Field(String),
    Index(usize),
}

/// The "natural" format: no override (§3, §4.5).
pub const NATURAL_FORMAT: char = ' ';

struct WatchNode {
    key: NodeKey,
    parent: Option<NodeId>,
    depth: usize,
    format: char,
    is_open: bool,
    has_children: bool,
    is_array: bool,
    is_dynamic_array: bool,
    children: Vec<NodeId>,
    cached_type: Option<String>,
    cached_value: Option<String>,
    last_update: u64,
}

/// A read-only view of one row for a renderer to consume, decoupled from
/// the arena's internal indices.
#[derive(Debug, Clone)]
pub struct NodeView {
    pub id: NodeId,
    pub depth: usize,
    pub label: String,
    pub format: char,
    pub is_open: bool,
    pub has_children: bool,
    pub is_array: bool,
    pub is_dynamic_array: bool,
    pub cached_type: Option<String>,
}

/// The Watch Expression Engine's tree (component E): an arena of
/// [`WatchNode`]s, a root list (order-preserving), and the dynamic-arrays
/// registry (§3, §4.5).
#[derive(Default)]
pub struct WatchTree {
    nodes: Vec<Option<WatchNode>>,
    free_list: Vec<usize>,
    roots: Vec<NodeId>,
    dynamic_registry: BTreeSet<NodeId>,
    generation: u64,
}

impl WatchTree {
    pub fn new() -> WatchTree {
        WatchTree::default()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    fn get(&self, id: NodeId) -> &WatchNode {
        self.nodes[id.0].as_ref().expect("dangling NodeId")
    }

    fn get_mut(&mut self, id: NodeId) -> &mut WatchNode {
        self.nodes[id.0].as_mut().expect("dangling NodeId")
    }

    fn alloc(&mut self, key: NodeKey, parent: Option<NodeId>, format: char) -> NodeId {
        let depth = parent.map(|p| self.get(p).depth + 1).unwrap_or(0);
        let node = WatchNode {
            key,
            parent,
            depth,
            format,
            is_open: false,
            has_children: false,
            is_array: false,
            is_dynamic_array: false,
            children: Vec::new(),
            cached_type: None,
            cached_value: None,
            last_update: 0,
        };
        if let Some(slot) = self.free_list.pop() {
            self.nodes[slot] = Some(node);
            NodeId(slot)
        } else {
            self.nodes.push(Some(node));
            NodeId(self.nodes.len() - 1)
        }
    }

    /// Creates a new root from a textbox submission (§4.5 "born from a
    /// textbox submission or a Locals diff").
    pub fn add_root(&mut self, expression: String) -> NodeId {
        let id = self.alloc(NodeKey::Root(expression), None, NATURAL_FORMAT);
        self.roots.push(id);
        id
    }

    /// Deletion removes a root and its entire subtree (§4.5).
    pub fn remove_root(&mut self, id: NodeId) {
        self.free_subtree(id);
        self.roots.retain(|&r| r != id);
    }

    fn free_subtree(&mut self, id: NodeId) {
        let children = self.get(id).children.clone();
        for child in children {
            self.free_subtree(child);
        }
        self.dynamic_registry.remove(&id);
        self.nodes[id.0] = None;
        self.free_list.push(id.0);
    }

    /// A root's expression is edited by reopening the textbox over its
    /// row; submission replaces the root, tearing down its subtree but
    /// keeping its position among `roots()` (§4.5 "Interaction with
    /// editing").
    pub fn edit_root(&mut self, id: NodeId, new_expression: String) {
        let children = std::mem::take(&mut self.get_mut(id).children);
        for child in children {
            self.free_subtree(child);
        }
        self.dynamic_registry.remove(&id);
        let node = self.get_mut(id);
        node.key = NodeKey::Root(new_expression);
        node.is_open = false;
        node.has_children = false;
        node.is_array = false;
        node.is_dynamic_array = false;
        node.cached_type = None;
        node.cached_value = None;
        node.last_update = 0;
    }

    /// The access path from `id` up to and including its root (§4.5):
    /// the root expression plus the element list, with array-index
    /// elements rendered as `DynamicIndex` when the *parent* is a
    /// dynamic array.
    fn access_path(&self, id: NodeId) -> (String, Vec<PathElement>) {
        let mut elements = Vec::new();
        let mut current = id;
        loop {
            let node = self.get(current);
            match &node.key {
                NodeKey::Root(expression) => {
                    elements.reverse();
                    return (expression.clone(), elements);
                }
                NodeKey::Field(name) => {
                    elements.push(PathElement::Field(name.clone()));
                }
                NodeKey::Index(i) => {
                    let parent_id = node.parent.expect("non-root Index node must have a parent");
                    let parent = self.get(parent_id);
                    elements.push(if parent.is_dynamic_array {
                        PathElement::DynamicIndex(*i)
                    } else {
                        PathElement::Index(*i)
                    });
                }
            }
            current = node.parent.expect("non-root node must have a parent");
        }
    }

    /// The display label for one row: the field name, a synthesized
    /// `[i]` for array elements, or the root expression.
    pub fn label(&self, id: NodeId) -> String {
        match &self.get(id).key {
            NodeKey::Root(expression) => expression.clone(),
            NodeKey::Field(name) => name.clone(),
            NodeKey::Index(i) => format!("[{i}]"),
        }
    }

    pub fn view(&self, id: NodeId) -> NodeView {
        let node = self.get(id);
        NodeView {
            id,
            depth: node.depth,
            label: self.label(id),
            format: node.format,
            is_open: node.is_open,
            has_children: node.has_children,
            is_array: node.is_array,
            is_dynamic_array: node.is_dynamic_array,
            cached_type: node.cached_type.clone(),
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.get(id).children
    }

    pub fn is_open(&self, id: NodeId) -> bool {
        self.get(id).is_open
    }

    pub fn close(&mut self, id: NodeId) {
        self.get_mut(id).is_open = false;
    }

    /// Opens `id`, materializing its children on first expand (§4.5
    /// "Children materialization"). Re-opening an already-materialized
    /// node is a no-op beyond flipping the flag: children persist while
    /// collapsed.
    pub fn open(&mut self, id: NodeId, backend: &dyn EvalBackend) {
        let already_materialized = !self.get(id).children.is_empty() || self.get(id).cached_type.is_some();
        self.get_mut(id).is_open = true;
        if already_materialized {
            return;
        }
        self.materialize_children(id, backend);
    }

    fn materialize_children(&mut self, id: NodeId, backend: &dyn EvalBackend) {
        let (root_expr, path) = self.access_path(id);
        let fields = backend.fields(&root_expr, &path);
        let format = self.get(id).format;

        match fields {
            FieldsResult::Array(n) => {
                let node = self.get_mut(id);
                node.is_array = true;
                node.is_dynamic_array = false;
                self.allocate_array_children(id, n, format, backend);
            }
            FieldsResult::DynamicArray(n) => {
                let node = self.get_mut(id);
                node.is_array = true;
                node.is_dynamic_array = true;
                self.dynamic_registry.insert(id);
                self.allocate_array_children(id, n, format, backend);
            }
            FieldsResult::Fields(names) => {
                let node = self.get_mut(id);
                node.is_array = false;
                node.is_dynamic_array = false;
                for name in names {
                    let child = self.alloc(NodeKey::Field(name), Some(id), format);
                    self.get_mut(id).children.push(child);
                }
                self.probe_has_children(id, backend);
            }
            FieldsResult::Error => {
                // Evaluation error (§7): no children, node stays a leaf
                // that will render `??` from `gf_valueof`.
            }
        }
    }

    fn allocate_array_children(&mut self, id: NodeId, n: usize, format: char, backend: &dyn EvalBackend) {
        for i in 0..n {
            let child = self.alloc(NodeKey::Index(i), Some(id), format);
            self.get_mut(id).children.push(child);
        }
        self.probe_has_children(id, backend);
    }

    /// "After children are allocated, each is probed with `gf_fields` once
    /// to set its has-children flag" (§4.5) — a single shallow probe, not
    /// a full recursive materialization.
    fn probe_has_children(&mut self, parent: NodeId, backend: &dyn EvalBackend) {
        let children = self.get(parent).children.clone();
        for child in children {
            let (root_expr, path) = self.access_path(child);
            let has_children = match backend.fields(&root_expr, &path) {
                FieldsResult::Array(n) | FieldsResult::DynamicArray(n) => n > 0,
                FieldsResult::Fields(names) => !names.is_empty(),
                FieldsResult::Error => false,
            };
            self.get_mut(child).has_children = has_children;
        }
    }

    /// Pressing `/` followed by a letter (§4.5 "Format overrides"):
    /// assigns the override and, for array nodes, propagates to every
    /// element child and invalidates their cached values.
    pub fn set_format(&mut self, id: NodeId, format: char) {
        let node = self.get_mut(id);
        node.format = format;
        node.cached_value = None;
        node.last_update = 0;
        if self.get(id).is_array {
            let children = self.get(id).children.clone();
            for child in children {
                self.set_format(child, format);
            }
        }
    }

    /// The value to display for `id`, respecting the "while running,
    /// display text is `..`" rule and the "opened nodes show no value"
    /// rule, and re-evaluating only stale, visible leaves (§4.5
    /// "Refresh").
    pub fn value_for_display(&mut self, id: NodeId, backend: &dyn EvalBackend, program_running: bool) -> String {
        if program_running {
            return "..".to_string();
        }
        let node = self.get(id);
        if node.is_open && node.has_children {
            return String::new();
        }
        if node.last_update == self.generation {
            return node.cached_value.clone().unwrap_or_default();
        }
        let (root_expr, path) = self.access_path(id);
        let format = self.get(id).format;
        let value = backend.valueof(&root_expr, &path, format);
        let generation = self.generation;
        let node = self.get_mut(id);
        node.cached_value = Some(value.clone());
        node.last_update = generation;
        value
    }

    /// Advances the refresh generation and runs the two structural
    /// idempotent re-syncs mandated by §5's ordering (type changes before
    /// dynamic-array resync, both before redraw). Leaf values are left to
    /// be re-pulled lazily by [`WatchTree::value_for_display`] as they
    /// become visible; this matches §4.5 ("does not re-evaluate opened
    /// subtrees eagerly").
    pub fn refresh(&mut self, backend: &dyn EvalBackend, program_running: bool) {
        self.generation += 1;
        if program_running {
            return;
        }
        self.resync_root_types(backend);
        self.resync_dynamic_arrays(backend);
    }

    fn resync_root_types(&mut self, backend: &dyn EvalBackend) {
        let roots = self.roots.clone();
        for id in roots {
            let (root_expr, path) = self.access_path(id);
            let new_type = backend.typeof_(&root_expr, &path);
            let trimmed = new_type.trim();
            if trimmed.is_empty() || trimmed == "??" {
                // Evaluation error: retain tree position (§7 *Evaluation*).
                continue;
            }
            let changed = self.get(id).cached_type.as_deref() != Some(new_type.as_str());
            if changed {
                self.rebuild_root(id, new_type, backend);
            }
        }
    }

    fn rebuild_root(&mut self, id: NodeId, new_type: String, backend: &dyn EvalBackend) {
        let was_open = self.get(id).is_open;
        let children = std::mem::take(&mut self.get_mut(id).children);
        for child in children {
            self.free_subtree(child);
        }
        self.dynamic_registry.remove(&id);
        let node = self.get_mut(id);
        node.cached_type = Some(new_type);
        node.is_array = false;
        node.is_dynamic_array = false;
        node.has_children = false;
        node.cached_value = None;
        node.last_update = 0;
        node.is_open = false;
        if was_open {
            self.open(id, backend);
        }
    }

    /// Idempotent dynamic-array resync (§4.5, §8 item 4): for every
    /// registered node, re-query `gf_fields` and rebuild the subtree in
    /// place if the reported length differs from the current child count.
    fn resync_dynamic_arrays(&mut self, backend: &dyn EvalBackend) {
        let registry: Vec<NodeId> = self.dynamic_registry.iter().copied().collect();
        for id in registry {
            let (root_expr, path) = self.access_path(id);
            let new_len = match backend.fields(&root_expr, &path) {
                FieldsResult::DynamicArray(n) => n,
                FieldsResult::Array(n) => n,
                FieldsResult::Fields(_) | FieldsResult::Error => continue,
            };
            if new_len != self.get(id).children.len() {
                self.rebuild_array_in_place(id, new_len, backend);
            }
        }
    }

    fn rebuild_array_in_place(&mut self, id: NodeId, new_len: usize, backend: &dyn EvalBackend) {
        let format = self.get(id).format;
        let was_open = self.get(id).is_open;
        let children = std::mem::take(&mut self.get_mut(id).children);
        for child in children {
            self.free_subtree(child);
        }
        self.dynamic_registry.insert(id);
        if was_open {
            self.allocate_array_children(id, new_len, format, backend);
        }
    }

    /// Locals mode (§4.5): diffs `names` (in appearance order, from
    /// `gf_locals()`) against the current roots. Missing names are
    /// deleted; new ones are appended; persisting names keep their
    /// `NodeId` (and therefore their cached subtree) and their row
    /// position follows `names`'s order (§8 item 6).
    pub fn sync_locals(&mut self, names: &[String]) {
        let existing: std::collections::HashMap<String, NodeId> = self
            .roots
            .iter()
            .map(|&id| {
                let name = match &self.get(id).key {
                    NodeKey::Root(n) => n.clone(),
                    _ => unreachable!("locals tree roots are always NodeKey::Root"),
                };
                (name, id)
            })
            .collect();

        let keep: BTreeSet<&String> = names.iter().collect();
        for (name, id) in &existing {
            if !keep.contains(name) {
                self.free_subtree(*id);
            }
        }

        let mut new_roots = Vec::with_capacity(names.len());
        for name in names {
            let id = existing
                .get(name)
                .copied()
                .unwrap_or_else(|| self.alloc(NodeKey::Root(name.clone()), None, NATURAL_FORMAT));
            new_roots.push(id);
        }
        self.roots = new_roots;
    }

    /// "Inspect line" (§4.5): identifies up to nine sub-expressions made
    /// of identifier chars, `.`, `->`, and `[]` in `line`.
    pub fn inspect_line(line: &str) -> Vec<String> {
        fn is_token_char(c: char) -> bool {
            c.is_alphanumeric() || c == '_' || c == '.' || c == '-' || c == '>' || c == '[' || c == ']'
        }

        let chars: Vec<char> = line.chars().collect();
        let mut out = Vec::new();
        let mut i = 0;
        while i < chars.len() && out.len() < 9 {
            if is_token_char(chars[i]) {
                let start = i;
                while i < chars.len() && is_token_char(chars[i]) {
                    i += 1;
                }
                let token: String = chars[start..i].iter().collect();
                if token.chars().any(|c| c.is_alphanumeric()) {
                    out.push(token);
                }
            } else {
                i += 1;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// A canned backend driven entirely by scripted responses keyed by
    /// the rendered access path, so the tree's structural logic can be
    /// tested without a real gdb child (Design Notes §9).
    #[derive(Default)]
    struct FakeBackend {
        fields: RefCell<HashMap<String, FieldsResult>>,
        values: RefCell<HashMap<String, String>>,
        types: RefCell<HashMap<String, String>>,
        locals: RefCell<Vec<String>>,
    }

    impl FakeBackend {
        fn set_fields(&self, root: &str, path: &[PathElement], result: FieldsResult) {
            self.fields.borrow_mut().insert(crate::path::render(root, path), result);
        }
        fn set_type(&self, root: &str, path: &[PathElement], ty: &str) {
            self.types.borrow_mut().insert(crate::path::render(root, path), ty.to_string());
        }
    }

    impl EvalBackend for FakeBackend {
        fn typeof_(&self, root: &str, path: &[PathElement]) -> String {
            let key = crate::path::render(root, path);
            self.types.borrow().get(&key).cloned().unwrap_or_else(|| "int".to_string())
        }
        fn valueof(&self, root: &str, path: &[PathElement], _format: char) -> String {
            let key = crate::path::render(root, path);
            self.values.borrow().get(&key).cloned().unwrap_or_else(|| "0".to_string())
        }
        fn fields(&self, root: &str, path: &[PathElement]) -> FieldsResult {
            let key = crate::path::render(root, path);
            self.fields.borrow().get(&key).cloned().unwrap_or(FieldsResult::Fields(Vec::new()))
        }
        fn locals(&self) -> Vec<String> {
            self.locals.borrow().clone()
        }
    }

    #[test]
    fn opening_struct_root_materializes_field_children() {
        let backend = FakeBackend::default();
        backend.set_fields("p", &[], FieldsResult::Fields(vec!["x".into(), "y".into()]));
        let mut tree = WatchTree::new();
        let root = tree.add_root("p".to_string());
        tree.open(root, &backend);
        assert_eq!(tree.children(root).len(), 2);
        assert_eq!(tree.label(tree.children(root)[0]), "x");
    }

    #[test]
    fn array_children_clamp_and_carry_index() {
        let backend = FakeBackend::default();
        backend.set_fields("arr", &[], FieldsResult::Array(3));
        let mut tree = WatchTree::new();
        let root = tree.add_root("arr".to_string());
        tree.open(root, &backend);
        assert_eq!(tree.children(root).len(), 3);
        assert_eq!(tree.label(tree.children(root)[1]), "[1]");
        assert!(tree.view(root).is_array);
        assert!(!tree.view(root).is_dynamic_array);
    }

    #[test]
    fn dynamic_array_children_use_synthesized_index_string() {
        let backend = FakeBackend::default();
        backend.set_fields("v", &[], FieldsResult::DynamicArray(2));
        let mut tree = WatchTree::new();
        let root = tree.add_root("v".to_string());
        tree.open(root, &backend);
        let (_, path) = tree.access_path(tree.children(root)[1]);
        assert_eq!(path, vec![PathElement::DynamicIndex(1)]);
    }

    #[test]
    fn dynamic_array_resync_grows_in_place() {
        let backend = FakeBackend::default();
        backend.set_fields("v", &[], FieldsResult::DynamicArray(3));
        let mut tree = WatchTree::new();
        let root = tree.add_root("v".to_string());
        tree.open(root, &backend);
        assert_eq!(tree.children(root).len(), 3);

        backend.set_fields("v", &[], FieldsResult::DynamicArray(5));
        tree.refresh(&backend, false);
        assert_eq!(tree.children(root).len(), 5);
    }

    #[test]
    fn dynamic_array_resync_is_idempotent() {
        let backend = FakeBackend::default();
        backend.set_fields("v", &[], FieldsResult::DynamicArray(4));
        let mut tree = WatchTree::new();
        let root = tree.add_root("v".to_string());
        tree.open(root, &backend);
        tree.refresh(&backend, false);
        let first = tree.children(root).len();
        tree.refresh(&backend, false);
        let second = tree.children(root).len();
        assert_eq!(first, second);
    }

    #[test]
    fn ancestor_cached_value_is_unaffected_by_open_close() {
        let backend = FakeBackend::default();
        backend.set_fields("p", &[], FieldsResult::Fields(vec!["x".into()]));
        let mut tree = WatchTree::new();
        let root = tree.add_root("p".to_string());
        let before = tree.value_for_display(root, &backend, false);
        tree.open(root, &backend);
        tree.close(root);
        let after = tree.value_for_display(root, &backend, false);
        assert_eq!(before, after);
    }

    #[test]
    fn root_type_change_rebuilds_subtree_preserving_key() {
        let backend = FakeBackend::default();
        backend.set_type("p", &[], "int");
        backend.set_fields("p", &[], FieldsResult::Fields(Vec::new()));
        let mut tree = WatchTree::new();
        let root = tree.add_root("p".to_string());
        tree.refresh(&backend, false);
        tree.open(root, &backend);

        backend.set_type("p", &[], "struct foo");
        backend.set_fields("p", &[], FieldsResult::Fields(vec!["a".into(), "b".into()]));
        tree.refresh(&backend, false);

        assert_eq!(tree.label(root), "p");
        assert_eq!(tree.view(root).cached_type.as_deref(), Some("struct foo"));
    }

    #[test]
    fn format_override_propagates_to_array_children() {
        let backend = FakeBackend::default();
        backend.set_fields("arr", &[], FieldsResult::Array(2));
        let mut tree = WatchTree::new();
        let root = tree.add_root("arr".to_string());
        tree.open(root, &backend);
        tree.set_format(root, 'x');
        for &child in tree.children(root) {
            assert_eq!(tree.view(child).format, 'x');
        }
    }

    #[test]
    fn locals_sync_preserves_persisting_node_ids_in_appearance_order() {
        let mut tree = WatchTree::new();
        tree.sync_locals(&["a".to_string(), "b".to_string()]);
        let a_before = tree.roots()[0];

        tree.sync_locals(&["b".to_string(), "a".to_string(), "c".to_string()]);
        assert_eq!(tree.roots().len(), 3);
        assert_eq!(tree.label(tree.roots()[1]), "a");
        assert_eq!(tree.roots()[1], a_before);
    }

    #[test]
    fn locals_sync_removes_vanished_names() {
        let mut tree = WatchTree::new();
        tree.sync_locals(&["a".to_string(), "b".to_string()]);
        tree.sync_locals(&["b".to_string()]);
        assert_eq!(tree.roots().len(), 1);
        assert_eq!(tree.label(tree.roots()[0]), "b");
    }

    #[test]
    fn running_program_shows_placeholder() {
        let backend = FakeBackend::default();
        let mut tree = WatchTree::new();
        let root = tree.add_root("x".to_string());
        assert_eq!(tree.value_for_display(root, &backend, true), "..");
    }

    #[test]
    fn inspect_line_limits_to_nine_expressions() {
        let line = "a b c d e f g h i j + k";
        let exprs = WatchTree::inspect_line(line);
        assert_eq!(exprs.len(), 9);
        assert_eq!(exprs[0], "a");
    }

    #[test]
    fn inspect_line_captures_field_and_arrow_expressions() {
        let line = "if (node->next.value == arr[3]) {";
        let exprs = WatchTree::inspect_line(line);
        assert!(exprs.contains(&"node->next.value".to_string()));
        assert!(exprs.contains(&"arr[3]".to_string()));
    }

    #[test]
    fn remove_root_frees_whole_subtree() {
        let backend = FakeBackend::default();
        backend.set_fields("p", &[], FieldsResult::Fields(vec!["x".into()]));
        let mut tree = WatchTree::new();
        let root = tree.add_root("p".to_string());
        tree.open(root, &backend);
        tree.remove_root(root);
        assert!(tree.roots().is_empty());
    }
}
