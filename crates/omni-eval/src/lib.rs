//! Tree-walking evaluator for Omni MIR modules: execution, the promise
//! substrate, shared process state, and the `std.*` intrinsic library.

pub mod error;
pub mod eval;
pub mod frame;
pub mod intrinsics;
pub mod promise;
pub mod state;
pub mod value;

pub use error::EvalError;
pub use eval::{execute, EvalContext, EvalOutcome};
pub use promise::PromiseTable;
pub use state::{CliArgs, ProcessState};
pub use value::{RtResult, RuntimeValue};
