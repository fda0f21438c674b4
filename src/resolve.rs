//! Recursive property resolution
//!
//! One `Resolver` runs one resolution pass: a single deployment unit's
//! property bags flattened to concrete `serde_json::Value`s. Mappings keep
//! their keys, sequences keep their order, scalars pass through. Tokens
//! are replaced by their payload value, followed through chains up to a
//! configured depth, and memoized per pass so a lazy producer runs at most
//! once and the same token always lands on the same value.
//!
//! A reference whose target lives in another deployment unit never yields
//! the real value: the reference tracker hands back an import placeholder
//! instead, and the real value travels through the export/import wiring.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::trace;

use crate::construct::{ConstructTree, NodeId};
use crate::error::StrataError;
use crate::refs::ReferenceTracker;
use crate::token::{Token, TokenId, TokenPayload};
use crate::value::PropValue;

/// Default bound on token-chain length
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// One resolution pass over one deployment unit
pub struct Resolver<'a> {
    tree: &'a ConstructTree,
    current_unit: NodeId,
    current_unit_name: String,
    tracker: &'a mut ReferenceTracker,
    memo: HashMap<TokenId, Value>,
    max_depth: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(
        tree: &'a ConstructTree,
        current_unit: NodeId,
        tracker: &'a mut ReferenceTracker,
        max_depth: usize,
    ) -> Self {
        Self {
            current_unit_name: tree.path(current_unit),
            tree,
            current_unit,
            tracker,
            memo: HashMap::new(),
            max_depth,
        }
    }

    /// Resolve a property value to a concrete document fragment
    pub fn resolve(&mut self, value: &PropValue) -> Result<Value, StrataError> {
        self.resolve_value(value, 0)
    }

    fn resolve_value(&mut self, value: &PropValue, depth: usize) -> Result<Value, StrataError> {
        match value {
            PropValue::Null => Ok(Value::Null),
            PropValue::Bool(b) => Ok(Value::Bool(*b)),
            PropValue::Number(n) => Ok(Value::Number(n.clone())),
            PropValue::String(s) => Ok(Value::String(s.clone())),
            PropValue::Sequence(items) => items
                .iter()
                .map(|item| self.resolve_value(item, depth))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            PropValue::Mapping(entries) => {
                let mut map = Map::new();
                for (key, entry) in entries {
                    map.insert(key.clone(), self.resolve_value(entry, depth)?);
                }
                Ok(Value::Object(map))
            }
            PropValue::Concat(fragments) => self.resolve_concat(fragments, depth),
            PropValue::Token(token) => self.resolve_token(token, depth),
        }
    }

    fn resolve_concat(
        &mut self,
        fragments: &[PropValue],
        depth: usize,
    ) -> Result<Value, StrataError> {
        let mut joined = String::new();
        for fragment in fragments {
            match self.resolve_value(fragment, depth)? {
                Value::String(s) => joined.push_str(&s),
                Value::Bool(b) => joined.push_str(if b { "true" } else { "false" }),
                Value::Number(n) => joined.push_str(&n.to_string()),
                Value::Null => return Err(StrataError::FragmentNotScalar { kind: "null" }),
                Value::Array(_) => {
                    return Err(StrataError::FragmentNotScalar { kind: "sequence" })
                }
                Value::Object(obj) => {
                    // an import placeholder may legitimately land inside a
                    // string template: splice its marker form
                    if let Some(Value::String(export_id)) = obj.get("$import") {
                        joined.push_str(&format!("${{import:{export_id}}}"));
                    } else {
                        return Err(StrataError::FragmentNotScalar { kind: "mapping" });
                    }
                }
            }
        }
        Ok(Value::String(joined))
    }

    fn resolve_token(&mut self, token: &Token, depth: usize) -> Result<Value, StrataError> {
        if let Some(memoized) = self.memo.get(&token.id()) {
            return Ok(memoized.clone());
        }
        if depth >= self.max_depth {
            return Err(StrataError::ResolutionDepthExceeded {
                limit: self.max_depth,
            });
        }

        let resolved = match token.payload() {
            TokenPayload::Literal(inner) => self.resolve_value(inner, depth + 1)?,
            TokenPayload::Lazy(producer) => {
                let produced = producer();
                trace!(token = ?token.id(), "lazy token produced a value");
                self.resolve_value(&produced, depth + 1)?
            }
            TokenPayload::Reference { target, output } => {
                self.resolve_reference(target, output, depth)?
            }
        };

        self.memo.insert(token.id(), resolved.clone());
        Ok(resolved)
    }

    fn resolve_reference(
        &mut self,
        target: &str,
        output: &str,
        depth: usize,
    ) -> Result<Value, StrataError> {
        let node = self
            .tree
            .find(target)
            .ok_or_else(|| StrataError::UnresolvedReference {
                path: target.to_string(),
                output: output.to_string(),
            })?;

        let output_value = self.tree.output(node, output)?;

        match self.tree.unit_of(node) {
            Some(unit) if unit == self.current_unit => {
                // local reference: substitute the real value
                self.resolve_value(output_value, depth + 1)
            }
            Some(unit) => {
                let placeholder = self.tracker.record(
                    &self.current_unit_name,
                    self.tree.name(unit),
                    target,
                    output,
                );
                Ok(placeholder.to_value())
            }
            None => Err(StrataError::UnresolvedReference {
                path: target.to_string(),
                output: output.to_string(),
            }),
        }
    }
}
