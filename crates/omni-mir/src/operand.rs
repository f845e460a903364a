//! Operands: references to previously produced values, and literal constants.

use serde::{Deserialize, Serialize};

use crate::id::ValueId;
use crate::types::TypeTag;

/// A tagged operand: either a reference to a value produced earlier in the
/// same function, or a string-encoded literal.
///
/// `Literal` does double duty beyond constants: it also carries block
/// names in terminator targets and callee names in `call`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    /// References a value produced by an earlier instruction or a parameter.
    Value(ValueId, TypeTag),
    /// A string-encoded constant, block-name target, or callee name.
    Literal(String, TypeTag),
}

impl Operand {
    /// Shorthand for `Operand::Value(id, ty)`.
    pub fn value(id: ValueId, ty: TypeTag) -> Self {
        Operand::Value(id, ty)
    }

    /// Shorthand for `Operand::Literal(text, ty)`.
    pub fn literal(text: impl Into<String>, ty: TypeTag) -> Self {
        Operand::Literal(text.into(), ty)
    }

    /// A literal with no meaningful type tag -- used for block-name targets
    /// and callee names, where the tag is not consulted.
    pub fn untyped_literal(text: impl Into<String>) -> Self {
        Operand::Literal(text.into(), TypeTag::Infer)
    }

    /// Returns the operand's type tag.
    pub fn type_tag(&self) -> &TypeTag {
        match self {
            Operand::Value(_, ty) => ty,
            Operand::Literal(_, ty) => ty,
        }
    }

    /// Returns the referenced [`ValueId`], if this is a `Value` operand.
    pub fn as_value_id(&self) -> Option<ValueId> {
        match self {
            Operand::Value(id, _) => Some(*id),
            Operand::Literal(_, _) => None,
        }
    }

    /// Returns the literal text, if this is a `Literal` operand.
    pub fn as_literal_text(&self) -> Option<&str> {
        match self {
            Operand::Literal(text, _) => Some(text.as_str()),
            Operand::Value(_, _) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_operand_accessors() {
        let op = Operand::value(ValueId(2), TypeTag::Int);
        assert_eq!(op.as_value_id(), Some(ValueId(2)));
        assert_eq!(op.as_literal_text(), None);
        assert_eq!(op.type_tag(), &TypeTag::Int);
    }

    #[test]
    fn literal_operand_accessors() {
        let op = Operand::literal("42", TypeTag::Int);
        assert_eq!(op.as_value_id(), None);
        assert_eq!(op.as_literal_text(), Some("42"));
    }

    #[test]
    fn untyped_literal_is_infer() {
        let op = Operand::untyped_literal("then");
        assert_eq!(op.type_tag(), &TypeTag::Infer);
        assert_eq!(op.as_literal_text(), Some("then"));
    }

    #[test]
    fn serde_roundtrip() {
        let op = Operand::value(ValueId(5), TypeTag::Bool);
        let json = serde_json::to_string(&op).unwrap();
        let back: Operand = serde_json::from_str(&json).unwrap();
        assert_eq!(op, back);
    }
}
