//! Basic blocks: a straight-line instruction sequence with one terminator.

use serde::{Deserialize, Serialize};

use crate::instruction::Instruction;
use crate::terminator::Terminator;

/// A basic block. Blocks are referenced by name from branch operands within
/// the same function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub name: String,
    pub instructions: Vec<Instruction>,
    pub terminator: Option<Terminator>,
}

impl BasicBlock {
    pub fn new(name: impl Into<String>, terminator: Terminator) -> Self {
        BasicBlock {
            name: name.into(),
            instructions: Vec::new(),
            terminator: Some(terminator),
        }
    }

    /// A block under construction that has not yet received its terminator
    /// (e.g. a front end still lowering statements into it). A module
    /// containing one of these fails verification with `MissingTerminator`.
    pub fn unterminated(name: impl Into<String>) -> Self {
        BasicBlock {
            name: name.into(),
            instructions: Vec::new(),
            terminator: None,
        }
    }

    pub fn push(&mut self, inst: Instruction) {
        self.instructions.push(inst);
    }

    pub fn set_terminator(&mut self, terminator: Terminator) {
        self.terminator = Some(terminator);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_block_starts_empty() {
        let block = BasicBlock::new("entry", Terminator::ret_void());
        assert_eq!(block.name, "entry");
        assert!(block.instructions.is_empty());
    }

    #[test]
    fn push_appends_in_order() {
        use crate::id::ValueId;
        use crate::opcode::Opcode;
        use crate::operand::Operand;
        use crate::types::TypeTag;

        let mut block = BasicBlock::new("entry", Terminator::ret_void());
        block.push(Instruction::producing(
            ValueId(0),
            Opcode::Const,
            TypeTag::Int,
            vec![Operand::literal("1", TypeTag::Int)],
        ));
        block.push(Instruction::producing(
            ValueId(1),
            Opcode::Const,
            TypeTag::Int,
            vec![Operand::literal("2", TypeTag::Int)],
        ));
        assert_eq!(block.instructions.len(), 2);
        assert_eq!(block.instructions[0].id, ValueId(0));
        assert_eq!(block.instructions[1].id, ValueId(1));
    }
}
