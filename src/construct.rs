//! Construct tree
//!
//! Arena-backed tree of named constructs. Identity is (parent, local name);
//! sibling names are unique, children keep insertion order, and the tree is
//! append-only while authoring. `freeze()` flips it immutable for synthesis.
//!
//! There is no ambient "current scope": every creation call names its
//! parent explicitly.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::StrataError;
use crate::token::Token;
use crate::value::PropValue;

/// Construct names must stay clear of the '/' path and '#' export separators
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("valid name regex"));

/// Handle into a [`ConstructTree`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Everything a construct carries besides its tree position
#[derive(Debug, Default)]
pub struct NodeSpec {
    kind: Option<String>,
    properties: BTreeMap<String, PropValue>,
    outputs: BTreeMap<String, PropValue>,
}

impl NodeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag with a resource kind (drives pluggable validation and rendering)
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Declare an output usable as a reference target
    pub fn with_output(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.outputs.insert(name.into(), value.into());
        self
    }
}

/// A single node in the tree
#[derive(Debug)]
struct ConstructNode {
    name: Arc<str>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    child_index: HashMap<Arc<str>, NodeId>,
    kind: Option<Arc<str>>,
    properties: BTreeMap<String, PropValue>,
    outputs: BTreeMap<String, PropValue>,
}

/// Append-only tree of constructs, frozen once synthesis begins
#[derive(Debug)]
pub struct ConstructTree {
    nodes: Vec<ConstructNode>,
    frozen: bool,
}

impl Default for ConstructTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructTree {
    /// Create a tree with an implicit unnamed root
    pub fn new() -> Self {
        Self {
            nodes: vec![ConstructNode {
                name: Arc::from(""),
                parent: None,
                children: Vec::new(),
                child_index: HashMap::new(),
                kind: None,
                properties: BTreeMap::new(),
                outputs: BTreeMap::new(),
            }],
            frozen: false,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Make the tree immutable; every later mutation fails with `TreeFrozen`
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    fn node(&self, id: NodeId) -> &ConstructNode {
        &self.nodes[id.0]
    }

    fn guard_mutable(&self, operation: &'static str) -> Result<(), StrataError> {
        if self.frozen {
            return Err(StrataError::TreeFrozen { operation });
        }
        Ok(())
    }

    /// Add a named child under `parent`.
    ///
    /// Fails with `DuplicateName` if a sibling already has that name,
    /// `InvalidName` if the name fails the format check, `TreeFrozen`
    /// once synthesis began.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: &str,
        spec: NodeSpec,
    ) -> Result<NodeId, StrataError> {
        self.guard_mutable("add_child")?;

        if !NAME_RE.is_match(name) {
            return Err(StrataError::InvalidName {
                name: name.to_string(),
            });
        }

        let name: Arc<str> = Arc::from(name);
        if self.node(parent).child_index.contains_key(&name) {
            return Err(StrataError::DuplicateName {
                parent_path: self.path(parent),
                name: name.to_string(),
            });
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(ConstructNode {
            name: Arc::clone(&name),
            parent: Some(parent),
            children: Vec::new(),
            child_index: HashMap::new(),
            kind: spec.kind.map(Arc::from),
            properties: spec.properties,
            outputs: spec.outputs,
        });

        let parent_node = &mut self.nodes[parent.0];
        parent_node.children.push(id);
        parent_node.child_index.insert(name, id);
        Ok(id)
    }

    /// Add a deployment unit (a direct child of the root)
    pub fn add_unit(&mut self, name: &str) -> Result<NodeId, StrataError> {
        self.add_child(self.root(), name, NodeSpec::new())
    }

    /// Look up a direct child by name
    pub fn get_child(&self, parent: NodeId, name: &str) -> Result<NodeId, StrataError> {
        self.node(parent)
            .child_index
            .get(name)
            .copied()
            .ok_or_else(|| StrataError::NotFound {
                parent_path: self.path(parent),
                name: name.to_string(),
            })
    }

    /// Children in insertion order
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.node(id).name
    }

    pub fn kind(&self, id: NodeId) -> Option<&str> {
        self.node(id).kind.as_deref()
    }

    pub fn properties(&self, id: NodeId) -> &BTreeMap<String, PropValue> {
        &self.node(id).properties
    }

    pub fn outputs(&self, id: NodeId) -> &BTreeMap<String, PropValue> {
        &self.node(id).outputs
    }

    /// Look up a declared output, failing if the node never declared it
    pub fn output(&self, id: NodeId, name: &str) -> Result<&PropValue, StrataError> {
        self.node(id)
            .outputs
            .get(name)
            .ok_or_else(|| StrataError::UnknownOutput {
                path: self.path(id),
                output: name.to_string(),
            })
    }

    /// Set a property during authoring
    pub fn set_property(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        value: impl Into<PropValue>,
    ) -> Result<(), StrataError> {
        self.guard_mutable("set_property")?;
        self.nodes[id.0].properties.insert(name.into(), value.into());
        Ok(())
    }

    /// Declare or update an output during authoring
    pub fn set_output(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        value: impl Into<PropValue>,
    ) -> Result<(), StrataError> {
        self.guard_mutable("set_output")?;
        self.nodes[id.0].outputs.insert(name.into(), value.into());
        Ok(())
    }

    /// Ordered names from the root, '/'-joined; the root itself is ""
    pub fn path(&self, id: NodeId) -> String {
        self.path_segments(id).join("/")
    }

    /// Ordered name segments from the root (root excluded)
    pub fn path_segments(&self, id: NodeId) -> Vec<String> {
        let mut segments = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.node(current);
            if node.parent.is_some() {
                segments.push(node.name.to_string());
            }
            cursor = node.parent;
        }
        segments.reverse();
        segments
    }

    /// Reverse lookup: '/'-joined path to node
    pub fn find(&self, path: &str) -> Option<NodeId> {
        if path.is_empty() {
            return None;
        }
        let mut cursor = self.root();
        for segment in path.split('/') {
            cursor = *self.node(cursor).child_index.get(segment)?;
        }
        Some(cursor)
    }

    /// The deployment unit a node belongs to: its root-ancestor
    /// (a direct child of the root). The root itself has no unit.
    pub fn unit_of(&self, id: NodeId) -> Option<NodeId> {
        let mut cursor = id;
        loop {
            let parent = self.node(cursor).parent?;
            if parent == self.root() {
                return Some(cursor);
            }
            cursor = parent;
        }
    }

    /// Deployment units in insertion order
    pub fn units(&self) -> &[NodeId] {
        self.children(self.root())
    }

    /// A reference token to this node's named output
    pub fn output_ref(&self, id: NodeId, output: impl Into<String>) -> Token {
        Token::reference(self.path(id), output)
    }

    /// Bottom-up traversal: all children (insertion order) strictly
    /// before their parent.
    pub fn walk_postorder(&self, from: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        self.postorder_into(from, &mut order);
        order
    }

    fn postorder_into(&self, id: NodeId, order: &mut Vec<NodeId>) {
        for &child in self.children(id) {
            self.postorder_into(child, order);
        }
        order.push(id);
    }

    /// Top-down traversal, children in insertion order
    pub fn walk_preorder(&self, from: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            order.push(id);
            for &child in self.children(id).iter().rev() {
                stack.push(child);
            }
        }
        order
    }
}
