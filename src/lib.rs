//! Strata - construct tree synthesis for deployable artifacts

pub mod construct;
pub mod error;
pub mod graph;
pub mod loader;
pub mod refs;
pub mod resolve;
pub mod synth;
pub mod template;
pub mod token;
pub mod validate;
pub mod value;

pub use construct::{ConstructTree, NodeId, NodeSpec};
pub use error::{FixSuggestion, StrataError};
pub use graph::UnitGraph;
pub use loader::{tree_from_file, tree_from_yaml};
pub use refs::{CrossUnitWire, ImportPlaceholder, ReferenceTracker};
pub use resolve::{Resolver, DEFAULT_MAX_DEPTH};
pub use synth::{
    Assembly, DependencyManifest, DocumentRenderer, JsonRenderer, ManifestEdge, SynthOptions,
    SynthState, Synthesizer,
};
pub use token::{Token, TokenId, TokenPayload};
pub use validate::{
    run_checks, CheckRegistry, NodeView, Severity, ValidationIssue, ValidationReport,
};
pub use value::PropValue;
