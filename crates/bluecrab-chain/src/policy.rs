use crate::block::Block;

/// The outcome of a policy evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The block is acceptable.
    Accept,
    /// The block must not join the chain.
    Reject { reason: String },
}

impl Verdict {
    /// Convenience constructor for rejections.
    pub fn reject(reason: impl Into<String>) -> Self {
        Self::Reject {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the verdict is `Accept`.
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }

    /// Returns `true` if the verdict is `Reject`.
    pub fn is_reject(&self) -> bool {
        matches!(self, Self::Reject { .. })
    }
}

/// An injectable acceptance policy consulted before a block joins a chain.
///
/// The policy sees the fully sealed candidate (digest included) and cannot
/// modify it; a rejection aborts the append with the chain untouched. The
/// trait is object-safe and `Send + Sync` so a store can hold one as a
/// `Box<dyn AcceptancePolicy>`.
pub trait AcceptancePolicy: Send + Sync {
    /// Human-readable name, used in rejection errors.
    fn name(&self) -> &str;

    /// Evaluate a sealed candidate block.
    fn evaluate(&self, block: &Block) -> Verdict;
}

/// Built-in policy: every block's payload must parse to at least one field.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequireParsedFields;

impl AcceptancePolicy for RequireParsedFields {
    fn name(&self) -> &str {
        "require-parsed-fields"
    }

    fn evaluate(&self, block: &Block) -> Verdict {
        if block.fields.is_empty() {
            Verdict::reject("payload parsed to zero fields")
        } else {
            Verdict::Accept
        }
    }
}
