//! A single, non-terminating instruction within a basic block.

use serde::{Deserialize, Serialize};

use crate::id::ValueId;
use crate::opcode::Opcode;
use crate::operand::Operand;
use crate::types::TypeTag;

/// One instruction. `id == ValueId::INVALID` iff `op.produces_value()` is
/// `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub id: ValueId,
    pub op: Opcode,
    #[serde(rename = "type")]
    pub ty: TypeTag,
    pub operands: Vec<Operand>,
}

impl Instruction {
    /// Builds a value-producing instruction.
    pub fn producing(id: ValueId, op: Opcode, ty: TypeTag, operands: Vec<Operand>) -> Self {
        debug_assert!(op.produces_value(), "opcode {op} does not produce a value");
        Instruction { id, op, ty, operands }
    }

    /// Builds a side-effecting instruction that produces no value.
    pub fn side_effecting(op: Opcode, ty: TypeTag, operands: Vec<Operand>) -> Self {
        debug_assert!(!op.produces_value(), "opcode {op} produces a value");
        Instruction {
            id: ValueId::INVALID,
            op,
            ty,
            operands,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn producing_instruction_carries_its_id() {
        let inst = Instruction::producing(ValueId(3), Opcode::Add, TypeTag::Int, vec![]);
        assert_eq!(inst.id, ValueId(3));
        assert!(inst.id.is_valid());
    }

    #[test]
    fn side_effecting_instruction_uses_invalid_id() {
        let inst = Instruction::side_effecting(Opcode::Free, TypeTag::Void, vec![]);
        assert_eq!(inst.id, ValueId::INVALID);
    }

    #[test]
    fn serde_roundtrip() {
        let inst = Instruction::producing(
            ValueId(0),
            Opcode::Const,
            TypeTag::Int,
            vec![Operand::literal("40", TypeTag::Int)],
        );
        let json = serde_json::to_string(&inst).unwrap();
        let back: Instruction = serde_json::from_str(&json).unwrap();
        assert_eq!(inst, back);
    }
}
