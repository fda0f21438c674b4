//! Declarative tree manifests
//!
//! Builds a construct tree from a YAML document instead of code:
//!
//! ```yaml
//! schema: strata/v1
//! units:
//!   - name: Net
//!     constructs:
//!       - name: Vpc
//!         kind: network/vpc
//!         properties:
//!           cidr: 10.0.0.0/16
//!         outputs:
//!           vpcId: vpc-123
//! ```
//!
//! String properties containing `{{path#output}}` markers go through the
//! template parser and arrive in the tree as structural tokens.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::debug;

use crate::construct::{ConstructTree, NodeId, NodeSpec};
use crate::error::StrataError;
use crate::template;
use crate::value::PropValue;

const SCHEMA: &str = "strata/v1";

#[derive(Debug, Deserialize)]
struct ManifestRaw {
    schema: String,
    #[serde(default)]
    units: Vec<UnitRaw>,
}

#[derive(Debug, Deserialize)]
struct UnitRaw {
    name: String,
    #[serde(default)]
    constructs: Vec<ConstructRaw>,
}

#[derive(Debug, Deserialize)]
struct ConstructRaw {
    name: String,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    properties: std::collections::BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    outputs: std::collections::BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    children: Vec<ConstructRaw>,
}

/// Build a construct tree from YAML manifest text
pub fn tree_from_yaml(yaml: &str) -> Result<ConstructTree, StrataError> {
    let raw: ManifestRaw = serde_yaml::from_str(yaml)?;
    if raw.schema != SCHEMA {
        return Err(StrataError::UnsupportedSchema { schema: raw.schema });
    }

    let mut tree = ConstructTree::new();
    for unit in raw.units {
        let unit_id = tree.add_unit(&unit.name)?;
        for construct in unit.constructs {
            add_construct(&mut tree, unit_id, construct)?;
        }
    }

    debug!(units = tree.units().len(), "tree manifest loaded");
    Ok(tree)
}

/// Build a construct tree from a YAML manifest file
pub fn tree_from_file(path: &Path) -> anyhow::Result<ConstructTree> {
    let yaml = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read tree manifest from {:?}", path))?;
    tree_from_yaml(&yaml)
        .with_context(|| format!("Failed to build construct tree from {:?}", path))
}

fn add_construct(
    tree: &mut ConstructTree,
    parent: NodeId,
    raw: ConstructRaw,
) -> Result<(), StrataError> {
    let mut spec = NodeSpec::new();
    if let Some(kind) = raw.kind {
        spec = spec.with_kind(kind);
    }
    for (name, value) in raw.properties {
        spec = spec.with_property(name, convert(value)?);
    }
    for (name, value) in raw.outputs {
        spec = spec.with_output(name, convert(value)?);
    }

    let id = tree.add_child(parent, &raw.name, spec)?;
    for child in raw.children {
        add_construct(tree, id, child)?;
    }
    Ok(())
}

/// YAML value -> property value; strings with markers become token trees
fn convert(value: serde_yaml::Value) -> Result<PropValue, StrataError> {
    match value {
        serde_yaml::Value::Null => Ok(PropValue::Null),
        serde_yaml::Value::Bool(b) => Ok(PropValue::Bool(b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(PropValue::from(i))
            } else if let Some(u) = n.as_u64() {
                Ok(PropValue::from(u))
            } else if let Some(f) = n.as_f64() {
                Ok(PropValue::from(f))
            } else {
                Err(StrataError::Manifest {
                    details: format!("unrepresentable number: {n}"),
                })
            }
        }
        serde_yaml::Value::String(s) => {
            if template::has_markers(&s) {
                template::parse(&s)
            } else {
                Ok(PropValue::String(s))
            }
        }
        serde_yaml::Value::Sequence(items) => Ok(PropValue::Sequence(
            items.into_iter().map(convert).collect::<Result<_, _>>()?,
        )),
        serde_yaml::Value::Mapping(map) => {
            let mut entries = std::collections::BTreeMap::new();
            for (key, entry) in map {
                let serde_yaml::Value::String(key) = key else {
                    return Err(StrataError::Manifest {
                        details: "mapping keys must be strings".to_string(),
                    });
                };
                entries.insert(key, convert(entry)?);
            }
            Ok(PropValue::Mapping(entries))
        }
        serde_yaml::Value::Tagged(tagged) => Err(StrataError::Manifest {
            details: format!("unsupported YAML tag '{}'", tagged.tag),
        }),
    }
}
