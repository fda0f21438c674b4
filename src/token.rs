//! Deferred value tokens
//!
//! A token stands in for a value not known while the tree is being built.
//! Identity is a process-unique handle; the payload is one of:
//! - a literal (resolves to itself)
//! - a lazy producer, invoked once per resolution pass
//! - a reference to another construct's declared output

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::value::PropValue;

/// Monotonic token handle source
static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique token identity, used as the memoization key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(u64);

/// What a token resolves to
#[derive(Clone)]
pub enum TokenPayload {
    /// A value known up front, carried opaquely
    Literal(Box<PropValue>),
    /// Zero-argument producer, invoked exactly once per resolution pass
    Lazy(Arc<dyn Fn() -> PropValue + Send + Sync>),
    /// Named output of another construct, addressed by tree path
    Reference { target: String, output: String },
}

/// Placeholder for a value unknown at authoring time
#[derive(Clone)]
pub struct Token {
    id: TokenId,
    payload: TokenPayload,
}

impl Token {
    fn new(payload: TokenPayload) -> Self {
        Self {
            id: TokenId(NEXT_TOKEN_ID.fetch_add(1, Ordering::SeqCst)),
            payload,
        }
    }

    /// Wrap a literal value
    pub fn literal(value: impl Into<PropValue>) -> Self {
        Self::new(TokenPayload::Literal(Box::new(value.into())))
    }

    /// Wrap a producer function, invoked lazily at resolution time
    pub fn lazy<F>(producer: F) -> Self
    where
        F: Fn() -> PropValue + Send + Sync + 'static,
    {
        Self::new(TokenPayload::Lazy(Arc::new(producer)))
    }

    /// Reference a construct's named output by its tree path
    pub fn reference(target: impl Into<String>, output: impl Into<String>) -> Self {
        Self::new(TokenPayload::Reference {
            target: target.into(),
            output: output.into(),
        })
    }

    pub fn id(&self) -> TokenId {
        self.id
    }

    pub fn payload(&self) -> &TokenPayload {
        &self.payload
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Token");
        d.field("id", &self.id);
        match &self.payload {
            TokenPayload::Literal(v) => d.field("payload", v),
            TokenPayload::Lazy(_) => d.field("payload", &"<lazy>"),
            TokenPayload::Reference { target, output } => {
                d.field("target", target).field("output", output)
            }
        };
        d.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_ids_are_unique() {
        let a = Token::literal("x");
        let b = Token::literal("x");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn clones_share_identity() {
        let a = Token::lazy(|| PropValue::from("later"));
        let b = a.clone();
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn reference_payload_keeps_target_and_output() {
        let t = Token::reference("Net/Vpc", "vpcId");
        match t.payload() {
            TokenPayload::Reference { target, output } => {
                assert_eq!(target, "Net/Vpc");
                assert_eq!(output, "vpcId");
            }
            _ => panic!("expected reference payload"),
        }
    }

    #[test]
    fn debug_hides_lazy_closures() {
        let t = Token::lazy(|| PropValue::Null);
        assert!(format!("{:?}", t).contains("<lazy>"));
    }
}
