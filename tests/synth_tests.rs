//! # Synthesis Tests
//!
//! End-to-end scenarios through the public API:
//! - export/import wiring between deployment units
//! - circular dependency rejection before any artifact exists
//! - validation aborting synthesis with the full issue list
//! - deterministic deployment ordering
//! - custom renderers

use serde_json::{json, Value};
use strata::{
    CheckRegistry, ConstructTree, DocumentRenderer, JsonRenderer, NodeSpec, NodeView, StrataError,
    SynthOptions, SynthState, Synthesizer, Token,
};

// ============================================================================
// TEST HELPERS
// ============================================================================

fn net_unit(tree: &mut ConstructTree) {
    let net = tree.add_unit("Net").unwrap();
    tree.add_child(
        net,
        "Vpc",
        NodeSpec::new()
            .with_kind("network/vpc")
            .with_property("cidr", "10.0.0.0/16")
            .with_output("vpcId", "vpc-123"),
    )
    .unwrap();
}

fn app_unit(tree: &mut ConstructTree) {
    let app = tree.add_unit("App").unwrap();
    tree.add_child(
        app,
        "Service",
        NodeSpec::new()
            .with_kind("compute/service")
            .with_property("subnet", Token::reference("Net/Vpc", "vpcId")),
    )
    .unwrap();
}

fn artifact(assembly: &strata::Assembly, unit: &str) -> Value {
    serde_json::from_str(&assembly.artifacts[unit]).unwrap()
}

// ============================================================================
// EXPORT/IMPORT SCENARIO (Net exports vpcId, App imports it)
// ============================================================================

#[test]
fn net_app_export_import_scenario() {
    let mut tree = ConstructTree::new();
    net_unit(&mut tree);
    app_unit(&mut tree);

    let mut synth = Synthesizer::new(tree, SynthOptions::default());
    synth.finalize().unwrap();
    let assembly = synth.synthesize(&JsonRenderer).unwrap();

    // Net artifact has no unresolved tokens and keeps its real values
    let net = artifact(&assembly, "Net");
    assert_eq!(net["unit"], "Net");
    assert_eq!(net["resources"]["Vpc"]["properties"]["cidr"], "10.0.0.0/16");
    assert!(!assembly.artifacts["Net"].contains("$import"));

    // App artifact carries the import placeholder tied to Net's export
    let app = artifact(&assembly, "App");
    assert_eq!(
        app["resources"]["Service"]["properties"]["subnet"],
        json!({"$import": "Net/Vpc#vpcId"})
    );

    // manifest: edge Net -> App and exactly one export/import pair
    assert_eq!(assembly.manifest.deployment_order, vec!["Net", "App"]);
    assert_eq!(assembly.manifest.edges.len(), 1);
    assert_eq!(assembly.manifest.edges[0].from, "Net");
    assert_eq!(assembly.manifest.edges[0].to, "App");
    assert_eq!(assembly.manifest.wires.len(), 1);
    assert_eq!(assembly.manifest.wires[0].export_id, "Net/Vpc#vpcId");
    assert_eq!(assembly.manifest.wires[0].import_id, "Net/Vpc#vpcId@App");
}

#[test]
fn multiple_importers_share_one_export() {
    let mut tree = ConstructTree::new();
    net_unit(&mut tree);
    app_unit(&mut tree);
    let db = tree.add_unit("Db").unwrap();
    tree.add_child(
        db,
        "Cluster",
        NodeSpec::new()
            .with_kind("storage/cluster")
            .with_property("subnet", Token::reference("Net/Vpc", "vpcId")),
    )
    .unwrap();

    let mut synth = Synthesizer::new(tree, SynthOptions::default());
    synth.finalize().unwrap();
    let assembly = synth.synthesize(&JsonRenderer).unwrap();

    // one export, two wires (one per importing unit)
    assert_eq!(assembly.manifest.wires.len(), 2);
    assert!(assembly
        .manifest
        .wires
        .iter()
        .all(|w| w.export_id == "Net/Vpc#vpcId"));

    // both importers come after Net; ties resolve alphabetically
    assert_eq!(
        assembly.manifest.deployment_order,
        vec!["Net", "App", "Db"]
    );
}

#[test]
fn same_unit_reference_needs_no_wiring() {
    let mut tree = ConstructTree::new();
    let net = tree.add_unit("Net").unwrap();
    tree.add_child(
        net,
        "Vpc",
        NodeSpec::new()
            .with_kind("network/vpc")
            .with_output("vpcId", "vpc-123"),
    )
    .unwrap();
    tree.add_child(
        net,
        "Subnet",
        NodeSpec::new()
            .with_kind("network/subnet")
            .with_property("vpc", Token::reference("Net/Vpc", "vpcId")),
    )
    .unwrap();

    let mut synth = Synthesizer::new(tree, SynthOptions::default());
    synth.finalize().unwrap();
    let assembly = synth.synthesize(&JsonRenderer).unwrap();

    let net = artifact(&assembly, "Net");
    assert_eq!(net["resources"]["Subnet"]["properties"]["vpc"], "vpc-123");
    assert!(assembly.manifest.wires.is_empty());
    assert!(assembly.manifest.edges.is_empty());
}

// ============================================================================
// FAILURE SCENARIOS
// ============================================================================

#[test]
fn mutual_references_fail_with_circular_dependency() {
    let mut tree = ConstructTree::new();
    let a = tree.add_unit("A").unwrap();
    tree.add_child(
        a,
        "Left",
        NodeSpec::new()
            .with_kind("demo/left")
            .with_property("peer", Token::reference("B/Right", "id"))
            .with_output("id", "left-1"),
    )
    .unwrap();
    let b = tree.add_unit("B").unwrap();
    tree.add_child(
        b,
        "Right",
        NodeSpec::new()
            .with_kind("demo/right")
            .with_property("peer", Token::reference("A/Left", "id"))
            .with_output("id", "right-1"),
    )
    .unwrap();

    let mut synth = Synthesizer::new(tree, SynthOptions::default());
    synth.finalize().unwrap();
    let err = synth.synthesize(&JsonRenderer).unwrap_err();

    assert!(matches!(err, StrataError::CircularDependency { .. }));
    assert_eq!(synth.state(), SynthState::Failed);
}

#[test]
fn single_validation_error_halts_with_zero_artifacts() {
    let mut tree = ConstructTree::new();
    let app = tree.add_unit("App").unwrap();
    tree.add_child(app, "Broken", NodeSpec::new().with_kind("demo/named"))
        .unwrap();
    let ok = tree.add_unit("Ok").unwrap();
    tree.add_child(ok, "Fine", NodeSpec::new().with_kind("demo/plain"))
        .unwrap();

    let mut registry = CheckRegistry::new();
    registry.register("demo/named", |node: &NodeView<'_>| {
        if node.properties().contains_key("name") {
            Vec::new()
        } else {
            vec!["name required".to_string()]
        }
    });

    let mut synth = Synthesizer::new(tree, SynthOptions::default()).with_checks(registry);
    synth.finalize().unwrap();
    let err = synth.synthesize(&JsonRenderer).unwrap_err();

    assert_eq!(synth.state(), SynthState::Failed);
    match err {
        StrataError::ValidationFailed { issues } => {
            let errors: Vec<_> = issues
                .iter()
                .filter(|i| i.severity == strata::Severity::Error)
                .collect();
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].path, "App/Broken");
            assert_eq!(errors[0].message, "name required");
        }
        other => panic!("expected ValidationFailed, got {other}"),
    }
}

#[test]
fn dangling_reference_fails_resolution() {
    let mut tree = ConstructTree::new();
    let app = tree.add_unit("App").unwrap();
    tree.add_child(
        app,
        "Service",
        NodeSpec::new()
            .with_kind("compute/service")
            .with_property("subnet", Token::reference("Net/Vpc", "vpcId")),
    )
    .unwrap();

    let mut synth = Synthesizer::new(tree, SynthOptions::default());
    synth.finalize().unwrap();
    let err = synth.synthesize(&JsonRenderer).unwrap_err();
    assert!(matches!(err, StrataError::UnresolvedReference { .. }));
    assert_eq!(synth.state(), SynthState::Failed);
}

// ============================================================================
// RENDERER CONTRACT
// ============================================================================

struct CompactRenderer;

impl DocumentRenderer for CompactRenderer {
    fn render(&self, doc: &Value) -> Result<String, StrataError> {
        serde_json::to_string(doc).map_err(|err| StrataError::Render {
            details: err.to_string(),
        })
    }
}

#[test]
fn custom_renderer_receives_resolved_documents() {
    let mut tree = ConstructTree::new();
    net_unit(&mut tree);

    let mut synth = Synthesizer::new(tree, SynthOptions::default());
    synth.finalize().unwrap();
    let assembly = synth.synthesize(&CompactRenderer).unwrap();

    let doc: Value = serde_json::from_str(&assembly.artifacts["Net"]).unwrap();
    assert_eq!(doc["resources"]["Vpc"]["kind"], "network/vpc");
}

struct FailingRenderer;

impl DocumentRenderer for FailingRenderer {
    fn render(&self, _doc: &Value) -> Result<String, StrataError> {
        Err(StrataError::Render {
            details: "disk full".to_string(),
        })
    }
}

#[test]
fn renderer_failure_lands_in_failed_state() {
    let mut tree = ConstructTree::new();
    net_unit(&mut tree);

    let mut synth = Synthesizer::new(tree, SynthOptions::default());
    synth.finalize().unwrap();
    let err = synth.synthesize(&FailingRenderer).unwrap_err();
    assert!(matches!(err, StrataError::Render { .. }));
    assert_eq!(synth.state(), SynthState::Failed);
}

// ============================================================================
// TEMPLATE FRONT-END THROUGH SYNTHESIS
// ============================================================================

#[test]
fn template_markers_resolve_inside_one_unit() {
    let mut tree = ConstructTree::new();
    let net = tree.add_unit("Net").unwrap();
    tree.add_child(
        net,
        "Vpc",
        NodeSpec::new()
            .with_kind("network/vpc")
            .with_output("vpcId", "vpc-123"),
    )
    .unwrap();
    let name = strata::template::parse("arn:vpc/{{Net/Vpc#vpcId}}/main").unwrap();
    tree.add_child(
        net,
        "Tag",
        NodeSpec::new().with_kind("meta/tag").with_property("value", name),
    )
    .unwrap();

    let mut synth = Synthesizer::new(tree, SynthOptions::default());
    synth.finalize().unwrap();
    let assembly = synth.synthesize(&JsonRenderer).unwrap();

    let net = artifact(&assembly, "Net");
    assert_eq!(
        net["resources"]["Tag"]["properties"]["value"],
        "arn:vpc/vpc-123/main"
    );
}
