//! Functions: a name, signature, and the basic blocks that make up its body.

use serde::{Deserialize, Serialize};

use crate::block::BasicBlock;
use crate::id::ValueId;
use crate::types::TypeTag;

/// A single named, typed parameter. Parameter IDs occupy `0..params.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeTag,
    pub id: ValueId,
}

/// A function: its signature plus its control-flow graph as an ordered list
/// of basic blocks. The first block is always the entry block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub return_type: TypeTag,
    pub params: Vec<Param>,
    pub blocks: Vec<BasicBlock>,
    /// Seeds further [`ValueId`] allocation; starts at `params.len()`.
    pub next_value: u32,
}

impl Function {
    /// Creates a function with the given name, params, and return type, and
    /// no blocks yet. `next_value` is seeded past the parameter IDs.
    pub fn new(name: impl Into<String>, params: Vec<(String, TypeTag)>, return_type: TypeTag) -> Self {
        let params: Vec<Param> = params
            .into_iter()
            .enumerate()
            .map(|(i, (name, ty))| Param {
                name,
                ty,
                id: ValueId(i as u32),
            })
            .collect();
        let next_value = params.len() as u32;
        Function {
            name: name.into(),
            return_type,
            params,
            blocks: Vec::new(),
            next_value,
        }
    }

    /// Allocates and returns the next [`ValueId`] for this function, bumping
    /// the internal counter.
    pub fn next_value(&mut self) -> ValueId {
        let id = ValueId(self.next_value);
        self.next_value += 1;
        id
    }

    /// Appends a block to the function body. The first block pushed becomes
    /// the entry block.
    pub fn push_block(&mut self, block: BasicBlock) {
        self.blocks.push(block);
    }

    /// Returns the entry block, if any blocks have been added.
    pub fn entry_block(&self) -> Option<&BasicBlock> {
        self.blocks.first()
    }

    /// Finds a block by name.
    pub fn block(&self, name: &str) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.name == name)
    }

    /// Returns the index of a block by name.
    pub fn block_index(&self, name: &str) -> Option<usize> {
        self.blocks.iter().position(|b| b.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminator::Terminator;

    #[test]
    fn new_function_seeds_next_value_past_params() {
        let f = Function::new(
            "add",
            vec![("a".into(), TypeTag::Int), ("b".into(), TypeTag::Int)],
            TypeTag::Int,
        );
        assert_eq!(f.params.len(), 2);
        assert_eq!(f.params[0].id, ValueId(0));
        assert_eq!(f.params[1].id, ValueId(1));
        assert_eq!(f.next_value, 2);
    }

    #[test]
    fn next_value_allocates_monotonically() {
        let mut f = Function::new("f", vec![], TypeTag::Void);
        assert_eq!(f.next_value(), ValueId(0));
        assert_eq!(f.next_value(), ValueId(1));
        assert_eq!(f.next_value(), ValueId(2));
    }

    #[test]
    fn entry_block_is_first_pushed() {
        let mut f = Function::new("f", vec![], TypeTag::Void);
        f.push_block(BasicBlock::new("entry", Terminator::ret_void()));
        f.push_block(BasicBlock::new("second", Terminator::ret_void()));
        assert_eq!(f.entry_block().unwrap().name, "entry");
        assert_eq!(f.block_index("second"), Some(1));
        assert_eq!(f.block_index("missing"), None);
    }
}
