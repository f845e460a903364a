//! The `std.*` intrinsic library: every intrinsic the evaluator can
//! dispatch a `call`/`file.*`/`test.*` opcode to. Each submodule owns one
//! `std.<group>` namespace and exposes a `dispatch(suffix, args, ..)` that
//! returns `None` for a name it does not recognize, letting the caller fall
//! back to ordinary MIR function lookup.

pub mod file;
pub mod io;
pub mod log;
pub mod math;
pub mod network;
pub mod os;
pub mod string;
pub mod testing;
pub mod time;

use crate::error::EvalError;
use crate::eval::{EvalContext, StepResult, Unwind};
use crate::value::{render_canonical, RtResult, RuntimeValue};

/// Entry point for the `call` family: recognizes a
/// `std.<group>.<name>` callee and routes it to the matching submodule.
/// Anything outside the `std.` namespace returns `None`.
pub fn dispatch(name: &str, args: &[RtResult], ctx: &EvalContext) -> Option<StepResult<RtResult>> {
    let rest = name.strip_prefix("std.")?;
    let (group, suffix) = rest.split_once('.')?;
    match group {
        "io" => io::dispatch(suffix, args, ctx),
        "math" => math::dispatch(suffix, args),
        "string" => string::dispatch(suffix, args),
        "os" => os::dispatch(suffix, args, ctx),
        "file" => file::dispatch(suffix, args, ctx),
        "log" => log::dispatch(suffix, args, ctx),
        "network" => network::dispatch(suffix, args),
        "testing" => testing::dispatch(suffix, args, ctx),
        "time" => time::dispatch(suffix, args),
        _ => None,
    }
}

fn missing_arg(name: &str, idx: usize, found: usize) -> Unwind {
    Unwind::Err(EvalError::InvalidOperandArity {
        function: name.to_string(),
        opcode: name.to_string(),
        expected: format!("at least {}", idx + 1),
        found,
    })
}

fn arg_int(name: &str, args: &[RtResult], idx: usize) -> StepResult<i64> {
    match args.get(idx) {
        Some(r) => match &r.value {
            RuntimeValue::Int(i) => Ok(*i),
            RuntimeValue::Bool(b) => Ok(*b as i64),
            RuntimeValue::Float(f) => Ok(*f as i64),
            other => Err(Unwind::Err(EvalError::TypeCoercionFailed {
                function: name.to_string(),
                detail: format!("argument {idx} ({other:?}) is not an integer"),
            })),
        },
        None => Err(missing_arg(name, idx, args.len())),
    }
}

fn arg_float(name: &str, args: &[RtResult], idx: usize) -> StepResult<f64> {
    match args.get(idx) {
        Some(r) => match &r.value {
            RuntimeValue::Float(f) => Ok(*f),
            RuntimeValue::Int(i) => Ok(*i as f64),
            other => Err(Unwind::Err(EvalError::TypeCoercionFailed {
                function: name.to_string(),
                detail: format!("argument {idx} ({other:?}) is not a float"),
            })),
        },
        None => Err(missing_arg(name, idx, args.len())),
    }
}

fn arg_bool(name: &str, args: &[RtResult], idx: usize) -> StepResult<bool> {
    match args.get(idx) {
        Some(r) => Ok(r.value.is_truthy()),
        None => Err(missing_arg(name, idx, args.len())),
    }
}

/// Coerces argument `idx` to a string the way `strcat` does: a `Str` passes
/// through unchanged, anything else renders to its canonical surface form.
fn arg_string(name: &str, args: &[RtResult], idx: usize) -> StepResult<String> {
    match args.get(idx) {
        Some(r) => Ok(match &r.value {
            RuntimeValue::Str(s) => s.clone(),
            other => render_canonical(other),
        }),
        None => Err(missing_arg(name, idx, args.len())),
    }
}
