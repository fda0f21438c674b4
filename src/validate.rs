//! Construct tree validation
//!
//! The core knows no resource semantics: per-kind rules plug in through a
//! registry keyed by resource-kind tag. The walk is bottom-up (children in
//! insertion order strictly before their parent, so parent rules may
//! assume well-formed children) and never short-circuits: every issue in
//! the tree comes back in one report.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use tracing::debug;

use crate::construct::{ConstructTree, NodeId};
use crate::value::PropValue;

/// Severity of a validation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A single validation finding, attached to a node path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
    pub severity: Severity,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Error => write!(f, "error at '{}': {}", self.path, self.message),
            Severity::Warning => write!(f, "warning at '{}': {}", self.path, self.message),
        }
    }
}

/// Read-only view of a node handed to check functions
pub struct NodeView<'a> {
    tree: &'a ConstructTree,
    id: NodeId,
}

impl<'a> NodeView<'a> {
    pub fn name(&self) -> &str {
        self.tree.name(self.id)
    }

    pub fn path(&self) -> String {
        self.tree.path(self.id)
    }

    pub fn kind(&self) -> Option<&str> {
        self.tree.kind(self.id)
    }

    pub fn properties(&self) -> &BTreeMap<String, PropValue> {
        self.tree.properties(self.id)
    }

    pub fn outputs(&self) -> &BTreeMap<String, PropValue> {
        self.tree.outputs(self.id)
    }

    pub fn child_count(&self) -> usize {
        self.tree.children(self.id).len()
    }

    pub fn children(&self) -> Vec<NodeView<'a>> {
        self.tree
            .children(self.id)
            .iter()
            .map(|&id| NodeView {
                tree: self.tree,
                id,
            })
            .collect()
    }
}

/// A pluggable per-node rule: returns one message per finding
pub type CheckFn = Box<dyn Fn(&NodeView<'_>) -> Vec<String>>;

/// Validation rules keyed by resource-kind tag
#[derive(Default)]
pub struct CheckRegistry {
    checks: HashMap<String, Vec<CheckFn>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule for a kind; multiple rules per kind accumulate
    pub fn register<F>(&mut self, kind: impl Into<String>, check: F)
    where
        F: Fn(&NodeView<'_>) -> Vec<String> + 'static,
    {
        self.checks
            .entry(kind.into())
            .or_default()
            .push(Box::new(check));
    }

    fn checks_for(&self, kind: &str) -> &[CheckFn] {
        self.checks.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

/// Result of validating a construct tree
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// No error-severity issues (warnings do not block synthesis)
    pub fn is_valid(&self) -> bool {
        !self
            .issues
            .iter()
            .any(|issue| issue.severity == Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.severity == Severity::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Error)
    }

    pub fn add(&mut self, severity: Severity, path: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
            severity,
        });
    }
}

/// Validate the whole tree bottom-up, collecting every issue
pub fn run_checks(tree: &ConstructTree, registry: &CheckRegistry) -> ValidationReport {
    let mut report = ValidationReport::new();

    for id in tree.walk_postorder(tree.root()) {
        if id == tree.root() {
            continue;
        }
        let Some(kind) = tree.kind(id) else { continue };
        let view = NodeView { tree, id };
        for check in registry.checks_for(kind) {
            for message in check(&view) {
                report.add(Severity::Error, tree.path(id), message);
            }
        }
    }

    // structural sweep: a deployment unit with nothing in it is suspicious
    for &unit in tree.units() {
        if tree.children(unit).is_empty() {
            report.add(
                Severity::Warning,
                tree.path(unit),
                "deployment unit has no constructs",
            );
        }
    }

    debug!(
        issues = report.issues.len(),
        valid = report.is_valid(),
        "validation sweep finished"
    );
    report
}
