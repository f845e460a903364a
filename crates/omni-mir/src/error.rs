//! Verifier error categories, each naming the function/block/
//! instruction position responsible so a caller can report precisely where
//! verification failed.

use thiserror::Error;

/// A single structural violation found while verifying a [`crate::module::Module`].
///
/// The verifier runs a single linear pass and fails fast: the first
/// violation found is returned and nothing downstream runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("module has no functions")]
    NilModule,

    #[error("function at index {index} is nil")]
    NilFunction { index: usize },

    #[error("function at index {index} has an empty name")]
    EmptyFunctionName { index: usize },

    #[error("function '{function}' is not unique within the module")]
    DuplicateFunctionName { function: String },

    #[error("function '{function}' has no blocks")]
    NoBlocks { function: String },

    #[error("block at index {index} in function '{function}' is nil")]
    NilBlock { function: String, index: usize },

    #[error("block at index {index} in function '{function}' has an empty name")]
    EmptyBlockName { function: String, index: usize },

    #[error("block '{block}' in function '{function}' is not unique within the function")]
    DuplicateBlockName { function: String, block: String },

    #[error("block '{block}' in function '{function}' missing terminator")]
    MissingTerminator { function: String, block: String },

    #[error(
        "instruction {index} in block '{block}' of function '{function}': unsupported instruction '{opcode}'"
    )]
    UnsupportedInstruction {
        function: String,
        block: String,
        index: usize,
        opcode: String,
    },

    #[error("block '{block}' in function '{function}': unsupported terminator '{opcode}'")]
    UnsupportedTerminator {
        function: String,
        block: String,
        opcode: String,
    },

    #[error(
        "block '{block}' in function '{function}': branch target '{target}' not found"
    )]
    BranchTargetNotFound {
        function: String,
        block: String,
        target: String,
    },

    #[error(
        "block '{block}' in function '{function}': cbr has {found} operands, expected 3"
    )]
    CbrOperandCountWrong {
        function: String,
        block: String,
        found: usize,
    },

    #[error(
        "block '{block}' in function '{function}': br/jmp has {found} operands, expected 1"
    )]
    BrOperandCountWrong {
        function: String,
        block: String,
        found: usize,
    },

    #[error(
        "instruction {index} in block '{block}' of function '{function}': phi has {found} operands, expected an even count >= 2"
    )]
    PhiOperandCountWrong {
        function: String,
        block: String,
        index: usize,
        found: usize,
    },

    #[error(
        "instruction {index} in block '{block}' of function '{function}': opcode '{opcode}' requires at least 2 operands, found {found}"
    )]
    BinaryOperandCountWrong {
        function: String,
        block: String,
        index: usize,
        opcode: String,
        found: usize,
    },
}
