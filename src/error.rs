//! Error types with fix suggestions

use thiserror::Error;

use crate::validate::ValidationIssue;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// All error variants are part of the public API.
#[derive(Error, Debug)]
pub enum StrataError {
    // ─────────────────────────────────────────────────────────────
    // Tree authoring errors (ST-010 to ST-013)
    // ─────────────────────────────────────────────────────────────

    #[error("ST-010: construct '{name}' already exists under '{parent_path}'")]
    DuplicateName { parent_path: String, name: String },

    #[error("ST-011: no construct named '{name}' under '{parent_path}'")]
    NotFound { parent_path: String, name: String },

    #[error("ST-012: construct tree is frozen, {operation} is no longer permitted")]
    TreeFrozen { operation: &'static str },

    #[error("ST-013: invalid construct name '{name}'")]
    InvalidName { name: String },

    // ─────────────────────────────────────────────────────────────
    // Resolution errors (ST-020 to ST-023)
    // ─────────────────────────────────────────────────────────────

    #[error("ST-020: reference to unknown construct '{path}' (output '{output}')")]
    UnresolvedReference { path: String, output: String },

    #[error("ST-021: construct '{path}' declares no output named '{output}'")]
    UnknownOutput { path: String, output: String },

    #[error("ST-022: token chain still unresolved after {limit} hops")]
    ResolutionDepthExceeded { limit: usize },

    #[error("ST-023: cannot join a {kind} fragment into a string template")]
    FragmentNotScalar { kind: &'static str },

    // ─────────────────────────────────────────────────────────────
    // Cross-unit wiring errors (ST-030)
    // ─────────────────────────────────────────────────────────────

    #[error("ST-030: circular dependency between deployment units: {}", .cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    // ─────────────────────────────────────────────────────────────
    // Synthesis errors (ST-040 to ST-041)
    // ─────────────────────────────────────────────────────────────

    #[error("ST-040: validation failed with {} issue(s)", .issues.len())]
    ValidationFailed { issues: Vec<ValidationIssue> },

    #[error("ST-041: synthesis is in state '{actual}', expected '{expected}'")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    // ─────────────────────────────────────────────────────────────
    // Template errors (ST-050)
    // ─────────────────────────────────────────────────────────────

    #[error("ST-050: template parse error at position {position}: {details}")]
    TemplateParse { position: usize, details: String },

    // ─────────────────────────────────────────────────────────────
    // Tree manifest errors (ST-051 to ST-052)
    // ─────────────────────────────────────────────────────────────

    #[error("ST-051: unsupported manifest schema '{schema}' (expected 'strata/v1')")]
    UnsupportedSchema { schema: String },

    #[error("ST-052: malformed tree manifest: {details}")]
    Manifest { details: String },

    // ─────────────────────────────────────────────────────────────
    // Rendering errors (ST-060)
    // ─────────────────────────────────────────────────────────────

    #[error("ST-060: document renderer failed: {details}")]
    Render { details: String },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FixSuggestion for StrataError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            StrataError::DuplicateName { .. } => {
                Some("Use unique names among siblings, or nest under a scope construct")
            }
            StrataError::NotFound { .. } => Some("Check the child name and its parent scope"),
            StrataError::TreeFrozen { .. } => {
                Some("Build the whole tree before calling finalize()")
            }
            StrataError::InvalidName { .. } => {
                Some("Names are alphanumeric plus '_', '.', '-' ('/' and '#' are reserved)")
            }
            StrataError::UnresolvedReference { .. } => {
                Some("Verify the target construct was added to the tree before synthesis")
            }
            StrataError::UnknownOutput { .. } => {
                Some("Declare the output on the target construct with set_output()")
            }
            StrataError::ResolutionDepthExceeded { .. } => {
                Some("Break the token chain, or raise SynthOptions::with_max_depth")
            }
            StrataError::FragmentNotScalar { .. } => {
                Some("Only scalars can be joined into a string template")
            }
            StrataError::CircularDependency { .. } => {
                Some("Remove one direction of the cross-unit references, or merge the units")
            }
            StrataError::ValidationFailed { .. } => {
                Some("Fix every listed issue, then synthesize a fresh tree")
            }
            StrataError::InvalidState { .. } => {
                Some("Call finalize() once, then synthesize() once; re-runs need a fresh tree")
            }
            StrataError::TemplateParse { .. } => {
                Some("Check marker syntax: {{Unit/Construct#output}}")
            }
            StrataError::UnsupportedSchema { .. } => Some("Set schema: strata/v1"),
            StrataError::Manifest { .. } => {
                Some("Check the manifest structure: units > constructs > children")
            }
            StrataError::Render { .. } => Some("Check the renderer against the resolved document"),
            StrataError::Yaml(_) => Some("Check YAML syntax: indentation and quoting"),
            StrataError::Io(_) => Some("Check file path and permissions"),
        }
    }
}
