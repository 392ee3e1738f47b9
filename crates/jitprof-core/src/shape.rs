//! Hidden classes (shapes) as a transition trie.
//!
//! Each node is one hidden class. A node is reached from its parent by a
//! single [`EdgeLabel`], so objects that went through the same sequence of
//! property insertions (prototype first) end up on the same node. Nodes are
//! never removed.

use crate::field::{FieldId, FieldInterner};
use rustc_hash::FxHashMap;
use std::fmt;

/// Index of a node in the trie arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// The empty root shape
    pub const ROOT: NodeId = NodeId(0);

    /// Raw arena index
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Public hidden-class id, assigned lazily in order of first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What distinguishes values stored under the same field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Any non-function value
    Data,
    /// A function or prototype, keyed by its unique id (0 for no object)
    Identity(u32),
}

/// Label of a transition edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeLabel {
    /// Field the transition adds
    pub field: FieldId,
    /// Data or identity marker
    pub kind: EdgeKind,
}

impl EdgeLabel {
    /// Label for a data-valued field
    pub fn data(field: FieldId) -> Self {
        Self {
            field,
            kind: EdgeKind::Data,
        }
    }

    /// Label for a function or prototype identity
    pub fn identity(field: FieldId, id: u32) -> Self {
        Self {
            field,
            kind: EdgeKind::Identity(id),
        }
    }

    /// Render as `field:n` or `field:f<id>`
    pub fn describe(&self, fields: &FieldInterner) -> String {
        match self.kind {
            EdgeKind::Data => format!("{}:n", fields.name(self.field)),
            EdgeKind::Identity(id) => format!("{}:f{}", fields.name(self.field), id),
        }
    }
}

/// One hidden class.
#[derive(Debug)]
pub struct TransitionNode {
    /// Parent shape, `None` for the root
    pub parent: Option<NodeId>,
    /// Edge from the parent, `None` for the root
    pub label: Option<EdgeLabel>,
    /// Public id, assigned on first read through this class
    class_id: Option<ClassId>,
    /// Outgoing transitions
    children: FxHashMap<EdgeLabel, NodeId>,
}

impl TransitionNode {
    fn new(parent: Option<NodeId>, label: Option<EdgeLabel>) -> Self {
        Self {
            parent,
            label,
            class_id: None,
            children: FxHashMap::default(),
        }
    }

    /// Public id if one has been assigned
    pub fn class_id(&self) -> Option<ClassId> {
        self.class_id
    }

    /// Number of outgoing transitions
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Child reached through `label`, if it exists
    pub fn child(&self, label: &EdgeLabel) -> Option<NodeId> {
        self.children.get(label).copied()
    }
}

/// Arena-backed transition trie.
#[derive(Debug)]
pub struct TransitionTrie {
    nodes: Vec<TransitionNode>,
    /// `ClassId` -> node
    classes: Vec<NodeId>,
}

impl TransitionTrie {
    /// Create a trie holding only the root shape
    pub fn new() -> Self {
        Self {
            nodes: vec![TransitionNode::new(None, None)],
            classes: Vec::new(),
        }
    }

    /// The root shape
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Follow `label` from `node`, creating the child on first use.
    pub fn next_child(&mut self, node: NodeId, label: EdgeLabel) -> NodeId {
        if let Some(child) = self.nodes[node.index()].children.get(&label) {
            return *child;
        }

        let child = NodeId(self.nodes.len() as u32);
        self.nodes.push(TransitionNode::new(Some(node), Some(label)));
        self.nodes[node.index()].children.insert(label, child);
        tracing::trace!(parent = node.0, child = child.0, "new hidden class");
        child
    }

    /// Public id of `node`, assigning the next one on first use.
    pub fn class_id(&mut self, node: NodeId) -> ClassId {
        let entry = &mut self.nodes[node.index()];
        if let Some(id) = entry.class_id {
            return id;
        }
        let id = ClassId(self.classes.len() as u32);
        entry.class_id = Some(id);
        self.classes.push(node);
        id
    }

    /// Node behind a public id
    pub fn node_of(&self, class: ClassId) -> Option<NodeId> {
        self.classes.get(class.0 as usize).copied()
    }

    /// Access a node
    pub fn node(&self, node: NodeId) -> &TransitionNode {
        &self.nodes[node.index()]
    }

    /// Edge labels from the root down to `node`
    pub fn layout(&self, node: NodeId) -> Vec<EdgeLabel> {
        let mut labels = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            let entry = &self.nodes[id.index()];
            if let Some(label) = entry.label {
                labels.push(label);
            }
            current = entry.parent;
        }
        labels.reverse();
        labels
    }

    /// Render a layout as `a:n|b:n|`
    pub fn describe_layout(&self, node: NodeId, fields: &FieldInterner) -> String {
        let mut out = String::new();
        for label in self.layout(node) {
            out.push_str(&label.describe(fields));
            out.push('|');
        }
        out
    }

    /// Number of hidden classes created (root excluded)
    pub fn classes_created(&self) -> usize {
        self.nodes.len() - 1
    }
}

impl Default for TransitionTrie {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(fields: &mut FieldInterner, names: &[&str]) -> Vec<EdgeLabel> {
        names
            .iter()
            .map(|name| EdgeLabel::data(fields.intern(name)))
            .collect()
    }

    fn walk(trie: &mut TransitionTrie, labels: &[EdgeLabel]) -> NodeId {
        labels
            .iter()
            .fold(trie.root(), |node, label| trie.next_child(node, *label))
    }

    #[test]
    fn test_same_sequence_same_node() {
        let mut fields = FieldInterner::new();
        let mut trie = TransitionTrie::new();
        let path = labels(&mut fields, &["a", "b"]);

        let n1 = walk(&mut trie, &path);
        let n2 = walk(&mut trie, &path);
        assert_eq!(n1, n2);
        assert_eq!(trie.classes_created(), 2);
    }

    #[test]
    fn test_order_matters() {
        let mut fields = FieldInterner::new();
        let mut trie = TransitionTrie::new();
        let ab = labels(&mut fields, &["a", "b"]);
        let ba = labels(&mut fields, &["b", "a"]);

        assert_ne!(walk(&mut trie, &ab), walk(&mut trie, &ba));
        assert_eq!(trie.classes_created(), 4);
        assert_eq!(trie.node(trie.root()).child_count(), 2);
    }

    #[test]
    fn test_shared_prefix() {
        let mut fields = FieldInterner::new();
        let mut trie = TransitionTrie::new();
        let abc = labels(&mut fields, &["a", "b", "c"]);
        let abd = labels(&mut fields, &["a", "b", "d"]);

        walk(&mut trie, &abc);
        walk(&mut trie, &abd);
        assert_eq!(trie.classes_created(), 4);
    }

    #[test]
    fn test_identity_labels_are_distinct() {
        let mut fields = FieldInterner::new();
        let mut trie = TransitionTrie::new();
        let m = fields.intern("m");
        let root = trie.root();

        let f1 = trie.next_child(root, EdgeLabel::identity(m, 1));
        let f2 = trie.next_child(root, EdgeLabel::identity(m, 2));
        let data = trie.next_child(root, EdgeLabel::data(m));
        assert_ne!(f1, f2);
        assert_ne!(f1, data);
    }

    #[test]
    fn test_class_ids_are_lazy_and_stable() {
        let mut fields = FieldInterner::new();
        let mut trie = TransitionTrie::new();
        let a = walk(&mut trie, &labels(&mut fields, &["a"]));
        let b = walk(&mut trie, &labels(&mut fields, &["b"]));

        assert_eq!(trie.node(a).class_id(), None);
        let id_b = trie.class_id(b);
        let id_a = trie.class_id(a);
        assert_eq!(id_b, ClassId(0));
        assert_eq!(id_a, ClassId(1));
        assert_eq!(trie.class_id(b), id_b);
        assert_eq!(trie.node_of(id_a), Some(a));
    }

    #[test]
    fn test_layout_description() {
        let mut fields = FieldInterner::new();
        let mut trie = TransitionTrie::new();
        let proto = fields.intern("__proto__");
        let a = fields.intern("a");
        let node = trie.next_child(trie.root(), EdgeLabel::identity(proto, 3));
        let node = trie.next_child(node, EdgeLabel::data(a));

        assert_eq!(trie.layout(node).len(), 2);
        assert_eq!(trie.describe_layout(node, &fields), "__proto__:f3|a:n|");
        assert_eq!(trie.describe_layout(trie.root(), &fields), "");
    }
}
