//! `std.io`: console I/O.

use std::io::Write;
use std::sync::Arc;

use omni_mir::TypeTag;

use crate::eval::{EvalContext, StepResult};
use crate::value::{render_canonical, RtResult, RuntimeValue};

use super::{arg_bool, arg_float, arg_int, arg_string};

pub fn dispatch(suffix: &str, args: &[RtResult], ctx: &EvalContext) -> Option<StepResult<RtResult>> {
    let name = format!("std.io.{suffix}");
    Some(match suffix {
        "print" => Ok(print_args(args, false)),
        "println" => Ok(print_args(args, true)),
        "print_int" => int_variant(&name, args, false),
        "println_int" => int_variant(&name, args, true),
        "print_float" => float_variant(&name, args, false),
        "println_float" => float_variant(&name, args, true),
        "print_bool" => bool_variant(&name, args, false),
        "println_bool" => bool_variant(&name, args, true),
        "print_string" => string_variant(&name, args, false),
        "println_string" => string_variant(&name, args, true),
        "read_line" => Ok(RtResult::string(ctx.state.stdin.read_line())),
        "read_line_async" => Ok(read_line_async(ctx)),
        _ => return None,
    })
}

fn print_args(args: &[RtResult], newline: bool) -> RtResult {
    let mut out = String::new();
    for a in args {
        out.push_str(&render_canonical(&a.value));
    }
    emit(&out, newline);
    RtResult::void()
}

fn emit(text: &str, newline: bool) {
    if newline {
        println!("{text}");
    } else {
        print!("{text}");
        let _ = std::io::stdout().flush();
    }
}

fn int_variant(name: &str, args: &[RtResult], newline: bool) -> StepResult<RtResult> {
    let v = arg_int(name, args, 0)?;
    emit(&v.to_string(), newline);
    Ok(RtResult::void())
}

fn float_variant(name: &str, args: &[RtResult], newline: bool) -> StepResult<RtResult> {
    let v = arg_float(name, args, 0)?;
    emit(&v.to_string(), newline);
    Ok(RtResult::void())
}

fn bool_variant(name: &str, args: &[RtResult], newline: bool) -> StepResult<RtResult> {
    let v = arg_bool(name, args, 0)?;
    emit(&v.to_string(), newline);
    Ok(RtResult::void())
}

fn string_variant(name: &str, args: &[RtResult], newline: bool) -> StepResult<RtResult> {
    let v = arg_string(name, args, 0)?;
    emit(&v, newline);
    Ok(RtResult::void())
}

fn read_line_async(ctx: &EvalContext) -> RtResult {
    let promise_id = ctx.promises.create();
    let state = Arc::clone(&ctx.state);
    let promises = Arc::clone(&ctx.promises);
    ctx.runtime.spawn_blocking(move || {
        let line = state.stdin.read_line();
        promises.resolve(promise_id, RtResult::string(line));
    });
    RtResult::new(TypeTag::Struct("Promise".to_string()), RuntimeValue::Promise(promise_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc as StdArc;

    fn test_ctx() -> EvalContext {
        EvalContext {
            module: StdArc::new(omni_mir::Module::new(Vec::new())),
            state: StdArc::new(crate::state::ProcessState::new(crate::state::CliArgs::default())),
            promises: StdArc::new(crate::promise::PromiseTable::new()),
            runtime: StdArc::new(tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap()),
        }
    }

    #[test]
    fn println_int_reports_missing_arg() {
        let ctx = test_ctx();
        let err = dispatch("println_int", &[], &ctx).unwrap().unwrap_err();
        match err {
            crate::eval::Unwind::Err(crate::error::EvalError::InvalidOperandArity { .. }) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_suffix_is_none() {
        let ctx = test_ctx();
        assert!(dispatch("bogus", &[], &ctx).is_none());
    }
}
