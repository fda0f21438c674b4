//! Single-pass template parser with caching
//!
//! Turns `{{Unit/Construct#output}}` markers inside a string into a
//! structural `PropValue::Concat` of literal fragments and reference
//! tokens. Resolution then works on the expression tree, never on text.
//!
//! Fragment lists are tokenized once per distinct template string and
//! cached; tokens themselves are minted fresh per `parse` call.

use std::ops::Range;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::error::StrataError;
use crate::token::Token;
use crate::value::PropValue;

/// A parsed template fragment
#[derive(Debug, Clone)]
enum Fragment {
    /// Literal text (range into the original string)
    Literal(Range<usize>),
    /// Reference marker: `{{target#output}}`
    Reference { target: String, output: String },
}

/// Cache of tokenized templates
static CACHE: Lazy<DashMap<String, Arc<Vec<Fragment>>>> = Lazy::new(DashMap::new);

/// Parse a template into a property value.
///
/// - no markers: plain `String`
/// - one marker spanning the whole string: a bare reference `Token`,
///   so non-string outputs keep their type
/// - otherwise: a `Concat` of literals and reference tokens
pub fn parse(template: &str) -> Result<PropValue, StrataError> {
    let fragments = tokenize(template)?;

    if fragments.len() == 1 {
        match &fragments[0] {
            Fragment::Literal(_) => return Ok(PropValue::String(template.to_string())),
            Fragment::Reference { target, output } => {
                return Ok(PropValue::Token(Token::reference(target, output)));
            }
        }
    }

    let parts = fragments
        .iter()
        .map(|fragment| match fragment {
            Fragment::Literal(range) => PropValue::String(template[range.clone()].to_string()),
            Fragment::Reference { target, output } => {
                PropValue::Token(Token::reference(target, output))
            }
        })
        .collect();

    Ok(PropValue::Concat(parts))
}

/// True if the string contains a reference marker
pub fn has_markers(template: &str) -> bool {
    template.contains("{{")
}

/// Tokenize a template (with caching)
fn tokenize(template: &str) -> Result<Arc<Vec<Fragment>>, StrataError> {
    if let Some(cached) = CACHE.get(template) {
        return Ok(Arc::clone(&cached));
    }

    let mut fragments = Vec::new();
    let mut rest = 0;

    let bytes = template.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'{' && bytes[i + 1] == b'{' {
            let close = template[i + 2..]
                .find("}}")
                .map(|off| i + 2 + off)
                .ok_or_else(|| StrataError::TemplateParse {
                    position: i,
                    details: "unclosed '{{' marker".to_string(),
                })?;

            if i > rest {
                fragments.push(Fragment::Literal(rest..i));
            }

            let content = template[i + 2..close].trim();
            fragments.push(parse_marker(content, i)?);

            i = close + 2;
            rest = i;
        } else {
            i += 1;
        }
    }

    if rest < template.len() || template.is_empty() {
        fragments.push(Fragment::Literal(rest..template.len()));
    }

    let fragments = Arc::new(fragments);
    CACHE.insert(template.to_string(), Arc::clone(&fragments));
    Ok(fragments)
}

/// Parse the inside of a `{{...}}` marker into target path + output name
fn parse_marker(content: &str, position: usize) -> Result<Fragment, StrataError> {
    let (target, output) = content.split_once('#').ok_or_else(|| StrataError::TemplateParse {
        position,
        details: format!("marker '{}' is missing '#output'", content),
    })?;

    if target.is_empty() || output.is_empty() {
        return Err(StrataError::TemplateParse {
            position,
            details: format!("marker '{}' needs both a path and an output name", content),
        });
    }

    Ok(Fragment::Reference {
        target: target.to_string(),
        output: output.to_string(),
    })
}
