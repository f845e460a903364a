//! `std.testing`: a per-process registry of test suites, keyed by an
//! integer suite ID. Reached both through the `test.*` opcode family
//! (suffix from [`omni_mir::Opcode::Test`]) and through an explicit
//! `call "std.testing.<name>"`.
//!
//! Every recording intrinsic here takes the suite ID and test name as its
//! first two arguments (`(suite, name, ...)`), matching
//! [`crate::state::TestingRegistry::record`]'s own parameter order.

use crate::eval::{EvalContext, StepResult, Unwind};
use crate::value::RtResult;

use super::{arg_bool, arg_float, arg_int, arg_string};

const DEFAULT_PRECISION: i32 = 6;

pub fn dispatch(suffix: &str, args: &[RtResult], ctx: &EvalContext) -> Option<StepResult<RtResult>> {
    let name = format!("std.testing.{suffix}");
    Some(match suffix {
        "suite" => Ok(RtResult::int(ctx.state.testing.create_suite())),
        "expect" => expect(&name, args, ctx),
        "pass" => pass(&name, args, ctx),
        "fail" => fail(&name, args, ctx),
        "equal_int" => equal_int(&name, args, ctx),
        "equal_bool" => equal_bool(&name, args, ctx),
        "equal_string" => equal_string(&name, args, ctx),
        "equal_float" => equal_float(&name, args, ctx, DEFAULT_PRECISION),
        "equal_float_precision" => equal_float_precision(&name, args, ctx),
        "total" => Ok(RtResult::int(ctx.state.testing.total(arg_int(&name, args, 0)?))),
        "failures" => Ok(RtResult::int(ctx.state.testing.failures(arg_int(&name, args, 0)?))),
        "passed" => Ok(RtResult::int(ctx.state.testing.passed(arg_int(&name, args, 0)?))),
        "summary" => Ok(RtResult::string(ctx.state.testing.summary(arg_int(&name, args, 0)?))),
        "exit" => exit_(&name, args, ctx),
        _ => return None,
    })
}

fn expect(name: &str, args: &[RtResult], ctx: &EvalContext) -> StepResult<RtResult> {
    let suite = arg_int(name, args, 0)?;
    let test_name = arg_string(name, args, 1)?;
    let passed = arg_bool(name, args, 2)?;
    let message = if passed { String::new() } else { "expected truthy value".to_string() };
    ctx.state.testing.record(suite, passed, &message, &test_name);
    Ok(RtResult::bool_(passed))
}

fn pass(name: &str, args: &[RtResult], ctx: &EvalContext) -> StepResult<RtResult> {
    let suite = arg_int(name, args, 0)?;
    let test_name = arg_string(name, args, 1)?;
    ctx.state.testing.record(suite, true, "", &test_name);
    Ok(RtResult::bool_(true))
}

fn fail(name: &str, args: &[RtResult], ctx: &EvalContext) -> StepResult<RtResult> {
    let suite = arg_int(name, args, 0)?;
    let test_name = arg_string(name, args, 1)?;
    let message = arg_string(name, args, 2)?;
    ctx.state.testing.record(suite, false, &message, &test_name);
    Ok(RtResult::bool_(false))
}

fn equal_int(name: &str, args: &[RtResult], ctx: &EvalContext) -> StepResult<RtResult> {
    let suite = arg_int(name, args, 0)?;
    let test_name = arg_string(name, args, 1)?;
    let actual = arg_int(name, args, 2)?;
    let expected = arg_int(name, args, 3)?;
    let passed = actual == expected;
    let message = format!("expected {expected}, got {actual}");
    ctx.state.testing.record(suite, passed, if passed { "" } else { &message }, &test_name);
    Ok(RtResult::bool_(passed))
}

fn equal_bool(name: &str, args: &[RtResult], ctx: &EvalContext) -> StepResult<RtResult> {
    let suite = arg_int(name, args, 0)?;
    let test_name = arg_string(name, args, 1)?;
    let actual = arg_bool(name, args, 2)?;
    let expected = arg_bool(name, args, 3)?;
    let passed = actual == expected;
    let message = format!("expected {expected}, got {actual}");
    ctx.state.testing.record(suite, passed, if passed { "" } else { &message }, &test_name);
    Ok(RtResult::bool_(passed))
}

fn equal_string(name: &str, args: &[RtResult], ctx: &EvalContext) -> StepResult<RtResult> {
    let suite = arg_int(name, args, 0)?;
    let test_name = arg_string(name, args, 1)?;
    let actual = arg_string(name, args, 2)?;
    let expected = arg_string(name, args, 3)?;
    let passed = actual == expected;
    let message = format!("expected '{expected}', got '{actual}'");
    ctx.state.testing.record(suite, passed, if passed { "" } else { &message }, &test_name);
    Ok(RtResult::bool_(passed))
}

/// `|actual - expected| <= 10^-precision`.
fn equal_float(name: &str, args: &[RtResult], ctx: &EvalContext, precision: i32) -> StepResult<RtResult> {
    let suite = arg_int(name, args, 0)?;
    let test_name = arg_string(name, args, 1)?;
    let actual = arg_float(name, args, 2)?;
    let expected = arg_float(name, args, 3)?;
    let tolerance = 10f64.powi(-precision);
    let passed = (actual - expected).abs() <= tolerance;
    let message = format!("expected {expected} (+/-1e-{precision}), got {actual}");
    ctx.state.testing.record(suite, passed, if passed { "" } else { &message }, &test_name);
    Ok(RtResult::bool_(passed))
}

fn equal_float_precision(name: &str, args: &[RtResult], ctx: &EvalContext) -> StepResult<RtResult> {
    let precision = arg_int(name, args, 4)? as i32;
    equal_float(name, args, ctx, precision)
}

fn exit_(name: &str, args: &[RtResult], ctx: &EvalContext) -> StepResult<RtResult> {
    let suite = arg_int(name, args, 0)?;
    Err(Unwind::Exit(ctx.state.testing.failures(suite) as i32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn test_ctx() -> EvalContext {
        EvalContext {
            module: Arc::new(omni_mir::Module::new(Vec::new())),
            state: Arc::new(crate::state::ProcessState::new(crate::state::CliArgs::default())),
            promises: Arc::new(crate::promise::PromiseTable::new()),
            runtime: Arc::new(tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap()),
        }
    }

    #[test]
    fn suite_and_counters() {
        let ctx = test_ctx();
        let suite = dispatch("suite", &[], &ctx).unwrap().unwrap();
        let crate::value::RuntimeValue::Int(suite_id) = suite.value else { panic!("expected int") };

        let _ = dispatch("pass", &[RtResult::int(suite_id), RtResult::string("t1")], &ctx);
        let _ = dispatch("fail", &[RtResult::int(suite_id), RtResult::string("t2"), RtResult::string("boom")], &ctx);

        let total = dispatch("total", &[RtResult::int(suite_id)], &ctx).unwrap().unwrap();
        assert_eq!(total.value, crate::value::RuntimeValue::Int(2));
        let failures = dispatch("failures", &[RtResult::int(suite_id)], &ctx).unwrap().unwrap();
        assert_eq!(failures.value, crate::value::RuntimeValue::Int(1));
    }

    #[test]
    fn equal_float_within_default_precision() {
        let ctx = test_ctx();
        let suite = ctx.state.testing.create_suite();
        let r = dispatch(
            "equal_float",
            &[RtResult::int(suite), RtResult::string("t"), RtResult::float(1.0000001), RtResult::float(1.0)],
            &ctx,
        )
        .unwrap()
        .unwrap();
        assert_eq!(r.value, crate::value::RuntimeValue::Bool(true));
    }

    #[test]
    fn exit_raises_with_failure_count() {
        let ctx = test_ctx();
        let suite = ctx.state.testing.create_suite();
        ctx.state.testing.record(suite, false, "x", "t");
        let err = dispatch("exit", &[RtResult::int(suite)], &ctx).unwrap().unwrap_err();
        assert_eq!(err, Unwind::Exit(1));
    }
}
