//! Cross-unit reference tracking
//!
//! When a token inside unit A resolves to an output owned by unit B, the
//! value cannot be taken eagerly: it does not exist until B is deployed.
//! The tracker instead hands back an import placeholder and records the
//! export/import wiring as first-class data.
//!
//! Export identifiers are deduplicated per (target unit, target path,
//! output) triple: every consumer of the same underlying value shares one
//! export.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::graph::UnitGraph;

/// One export/import pair in the dependency manifest
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct CrossUnitWire {
    pub exporting_unit: String,
    pub export_id: String,
    pub importing_unit: String,
    pub import_id: String,
}

/// Value substituted for a cross-unit reference during resolution.
/// Only valid once the exporting unit has deployed and the wire exists.
#[derive(Debug, Clone)]
pub struct ImportPlaceholder {
    export_id: Arc<str>,
    import_id: Arc<str>,
}

impl ImportPlaceholder {
    pub fn export_id(&self) -> &str {
        &self.export_id
    }

    pub fn import_id(&self) -> &str {
        &self.import_id
    }

    /// The placeholder as it appears in a resolved document
    pub fn to_value(&self) -> Value {
        json!({ "$import": self.export_id.as_ref() })
    }
}

/// A registered export: who owns it, plus everyone importing it
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ExportKey {
    target_unit: String,
    target_path: String,
    output: String,
}

/// Export-identifier table, mutated only while units resolve
#[derive(Debug, Default)]
pub struct ReferenceTracker {
    exports: BTreeMap<ExportKey, Arc<str>>,
    wires: BTreeSet<CrossUnitWire>,
}

impl ReferenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `source_unit` consumes `target_path`'s `output`, owned
    /// by `target_unit`. The same triple always yields the same export
    /// identifier, no matter how many units ask.
    pub fn record(
        &mut self,
        source_unit: &str,
        target_unit: &str,
        target_path: &str,
        output: &str,
    ) -> ImportPlaceholder {
        let key = ExportKey {
            target_unit: target_unit.to_string(),
            target_path: target_path.to_string(),
            output: output.to_string(),
        };

        let export_id = self
            .exports
            .entry(key)
            .or_insert_with(|| {
                let id: Arc<str> = Arc::from(format!("{target_path}#{output}"));
                debug!(export = %id, unit = target_unit, "registered cross-unit export");
                id
            });
        let export_id = Arc::clone(export_id);

        let import_id: Arc<str> = Arc::from(format!("{export_id}@{source_unit}"));
        self.wires.insert(CrossUnitWire {
            exporting_unit: target_unit.to_string(),
            export_id: export_id.to_string(),
            importing_unit: source_unit.to_string(),
            import_id: import_id.to_string(),
        });

        ImportPlaceholder {
            export_id,
            import_id,
        }
    }

    /// Number of distinct exports
    pub fn export_count(&self) -> usize {
        self.exports.len()
    }

    /// All export identifiers, sorted
    pub fn export_ids(&self) -> Vec<&str> {
        self.exports.values().map(|id| id.as_ref()).collect()
    }

    /// All wires, sorted
    pub fn wires(&self) -> Vec<CrossUnitWire> {
        self.wires.iter().cloned().collect()
    }

    /// Build the unit dependency graph: exporting unit -> importing unit.
    /// `units` seeds every known unit so unreferenced ones still appear.
    pub fn dependency_graph(&self, units: &[&str]) -> UnitGraph {
        let mut graph = UnitGraph::new();
        for unit in units {
            graph.add_node(unit);
        }
        for wire in &self.wires {
            graph.add_edge(&wire.exporting_unit, &wire.importing_unit);
        }
        graph
    }
}
