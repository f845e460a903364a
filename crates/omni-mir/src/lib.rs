//! Mid-level IR: types, structural verification, constant folding, the
//! canonical text printer, and the JSON wire format.
//!
//! This crate has no runtime semantics of its own -- it defines the shape of
//! a module and the passes that operate on that shape. Evaluating a module
//! is `omni-eval`'s job.

pub mod block;
pub mod constfold;
pub mod error;
pub mod function;
pub mod id;
pub mod instruction;
pub mod json;
pub mod literal;
pub mod module;
pub mod opcode;
pub mod operand;
pub mod pipeline;
pub mod printer;
pub mod terminator;
pub mod types;
pub mod verifier;

pub use block::BasicBlock;
pub use error::VerifyError;
pub use function::{Function, Param};
pub use id::ValueId;
pub use instruction::Instruction;
pub use json::JsonError;
pub use module::Module;
pub use opcode::{AssertOp, CallSuffix, ClosureOp, CmpKind, Opcode};
pub use operand::Operand;
pub use pipeline::{Pass, Pipeline};
pub use terminator::{Terminator, TerminatorOp};
pub use types::TypeTag;
