//! Dynamic (execution-time) error categories, each tagged with the
//! enclosing function name and a concrete cause.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("function '{function}': type coercion failed: {detail}")]
    TypeCoercionFailed { function: String, detail: String },

    #[error("function '{function}': division or modulo by zero")]
    DivisionByZero { function: String },

    #[error("function '{function}': index {index} out of bounds (len {len})")]
    IndexOutOfBounds { function: String, index: i64, len: usize },

    #[error("function '{function}': unsupported instruction '{opcode}'")]
    UnsupportedInstruction { function: String, opcode: String },

    #[error("function '{function}': unsupported terminator '{opcode}'")]
    UnsupportedTerminator { function: String, opcode: String },

    #[error("function '{function}': callee '{callee}' not found")]
    CalleeNotFound { function: String, callee: String },

    #[error("function '{function}': invalid operand arity for '{opcode}': expected {expected}, found {found}")]
    InvalidOperandArity {
        function: String,
        opcode: String,
        expected: String,
        found: usize,
    },

    #[error("function '{function}': invalid literal '{text}' for type {ty}")]
    InvalidLiteral { function: String, text: String, ty: String },
}
