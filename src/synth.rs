//! Synthesis orchestration
//!
//! Drives a finalized construct tree through validation, per-unit
//! resolution, cycle detection, and rendering, producing one artifact per
//! deployment unit plus the dependency manifest.
//!
//! State machine: Authoring -> Validating -> Resolving -> Rendering ->
//! Done, with Failed terminal from Validating or Resolving. Done is
//! terminal too: re-running synthesis needs a fresh tree.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::construct::{ConstructTree, NodeId};
use crate::error::StrataError;
use crate::refs::{CrossUnitWire, ReferenceTracker};
use crate::resolve::{Resolver, DEFAULT_MAX_DEPTH};
use crate::validate::{run_checks, CheckRegistry};

/// Synthesis pipeline states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthState {
    Authoring,
    Validating,
    Resolving,
    Rendering,
    Done,
    Failed,
}

impl SynthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SynthState::Authoring => "Authoring",
            SynthState::Validating => "Validating",
            SynthState::Resolving => "Resolving",
            SynthState::Rendering => "Rendering",
            SynthState::Done => "Done",
            SynthState::Failed => "Failed",
        }
    }
}

/// Synthesis configuration
#[derive(Debug, Clone)]
pub struct SynthOptions {
    /// Bound on token-chain length during resolution
    pub max_depth: usize,
}

impl Default for SynthOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl SynthOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Renders a unit's fully-resolved document into its final artifact.
///
/// Must be a pure function of its input: the synthesizer invokes it once
/// per unit with no retry semantics of its own.
pub trait DocumentRenderer {
    fn render(&self, doc: &Value) -> Result<String, StrataError>;
}

/// Default renderer: pretty-printed JSON
#[derive(Debug, Default)]
pub struct JsonRenderer;

impl DocumentRenderer for JsonRenderer {
    fn render(&self, doc: &Value) -> Result<String, StrataError> {
        serde_json::to_string_pretty(doc).map_err(|err| StrataError::Render {
            details: err.to_string(),
        })
    }
}

/// One directed dependency between deployment units
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEdge {
    pub from: String,
    pub to: String,
}

/// Inter-unit dependency manifest emitted next to the artifacts
#[derive(Debug, Clone, Serialize)]
pub struct DependencyManifest {
    /// Units in deployment order (exporters before importers)
    pub deployment_order: Vec<String>,
    /// Edge set: exporting unit -> importing unit
    pub edges: Vec<ManifestEdge>,
    /// Export/import wiring table
    pub wires: Vec<CrossUnitWire>,
}

/// Everything a successful synthesis run produces
#[derive(Debug)]
pub struct Assembly {
    /// One rendered artifact per deployment unit, keyed by unit name
    pub artifacts: BTreeMap<String, String>,
    pub manifest: DependencyManifest,
}

/// Orchestrates one synthesis run over one construct tree
pub struct Synthesizer {
    tree: ConstructTree,
    options: SynthOptions,
    registry: CheckRegistry,
    state: SynthState,
}

impl Synthesizer {
    pub fn new(tree: ConstructTree, options: SynthOptions) -> Self {
        Self {
            tree,
            options,
            registry: CheckRegistry::new(),
            state: SynthState::Authoring,
        }
    }

    /// Install per-kind validation rules
    pub fn with_checks(mut self, registry: CheckRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn state(&self) -> SynthState {
        self.state
    }

    pub fn tree(&self) -> &ConstructTree {
        &self.tree
    }

    /// Mutable tree access while authoring; once finalized the tree itself
    /// rejects mutation with `TreeFrozen`.
    pub fn tree_mut(&mut self) -> &mut ConstructTree {
        &mut self.tree
    }

    /// End the authoring phase: freeze the tree, enter Validating
    pub fn finalize(&mut self) -> Result<(), StrataError> {
        if self.state != SynthState::Authoring {
            return Err(StrataError::InvalidState {
                expected: "Authoring",
                actual: self.state.as_str(),
            });
        }
        self.tree.freeze();
        self.state = SynthState::Validating;
        info!("construct tree finalized");
        Ok(())
    }

    /// Run validation, resolution, and rendering. On any failure the run
    /// lands in `Failed` and no artifacts are produced.
    pub fn synthesize(
        &mut self,
        renderer: &dyn DocumentRenderer,
    ) -> Result<Assembly, StrataError> {
        if self.state != SynthState::Validating {
            return Err(StrataError::InvalidState {
                expected: "Validating",
                actual: self.state.as_str(),
            });
        }

        match self.run_pipeline(renderer) {
            Ok(assembly) => {
                self.state = SynthState::Done;
                info!(units = assembly.artifacts.len(), "synthesis finished");
                Ok(assembly)
            }
            Err(err) => {
                self.state = SynthState::Failed;
                Err(err)
            }
        }
    }

    fn run_pipeline(&mut self, renderer: &dyn DocumentRenderer) -> Result<Assembly, StrataError> {
        info!("validating construct tree");
        let report = run_checks(&self.tree, &self.registry);
        if !report.is_valid() {
            return Err(StrataError::ValidationFailed {
                issues: report.issues,
            });
        }

        self.state = SynthState::Resolving;
        let mut tracker = ReferenceTracker::new();
        let mut documents: BTreeMap<String, Value> = BTreeMap::new();

        let units: Vec<NodeId> = self.tree.units().to_vec();
        for unit in &units {
            let unit_name = self.tree.name(*unit).to_string();
            info!(unit = %unit_name, "resolving deployment unit");
            let doc = resolve_unit(&self.tree, *unit, &mut tracker, self.options.max_depth)?;
            documents.insert(unit_name, doc);
        }

        let unit_names: Vec<String> = units
            .iter()
            .map(|&unit| self.tree.name(unit).to_string())
            .collect();
        let name_refs: Vec<&str> = unit_names.iter().map(String::as_str).collect();
        let graph = tracker.dependency_graph(&name_refs);

        if let Some(cycle) = graph.detect_cycle() {
            return Err(StrataError::CircularDependency { cycle });
        }
        let deployment_order: Vec<String> = graph
            .topo_order()?
            .into_iter()
            .map(|name| name.to_string())
            .collect();
        debug!(order = ?deployment_order, "deployment order computed");

        self.state = SynthState::Rendering;
        let mut artifacts = BTreeMap::new();
        for (unit_name, doc) in &documents {
            let artifact = renderer.render(doc)?;
            artifacts.insert(unit_name.clone(), artifact);
        }

        let edges = graph
            .edges()
            .into_iter()
            .map(|(from, to)| ManifestEdge {
                from: from.to_string(),
                to: to.to_string(),
            })
            .collect();

        Ok(Assembly {
            artifacts,
            manifest: DependencyManifest {
                deployment_order,
                edges,
                wires: tracker.wires(),
            },
        })
    }
}

/// Flatten one unit's subtree into a resolved document.
///
/// Every descendant that carries a kind tag or any properties contributes
/// a `resources` entry keyed by its path under the unit; pure scope nodes
/// are traversed but add nothing of their own.
fn resolve_unit(
    tree: &ConstructTree,
    unit: NodeId,
    tracker: &mut ReferenceTracker,
    max_depth: usize,
) -> Result<Value, StrataError> {
    let mut resolver = Resolver::new(tree, unit, tracker, max_depth);
    let unit_path = tree.path(unit);

    let mut resources = Map::new();
    for id in tree.walk_preorder(unit) {
        if id == unit {
            continue;
        }
        let kind = tree.kind(id);
        let properties = tree.properties(id);
        if kind.is_none() && properties.is_empty() {
            continue;
        }

        let mut rendered_props = Map::new();
        for (name, value) in properties {
            rendered_props.insert(name.clone(), resolver.resolve(value)?);
        }

        let full_path = tree.path(id);
        let relative = full_path
            .strip_prefix(&unit_path)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(&full_path);

        resources.insert(
            relative.to_string(),
            json!({
                "kind": kind,
                "properties": Value::Object(rendered_props),
            }),
        );
    }

    Ok(json!({
        "unit": tree.name(unit),
        "resources": Value::Object(resources),
    }))
}
