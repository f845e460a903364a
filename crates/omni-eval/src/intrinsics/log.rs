//! `std.log`: evaluated-program diagnostics written directly to
//! standard error with a level prefix. Deliberately not routed through
//! `tracing` -- that crate is reserved for host-tooling spans emitted by the
//! pipeline and evaluator themselves, keeping program output separate from
//! diagnostic instrumentation.

use crate::eval::{EvalContext, StepResult};
use crate::state::LogLevel;
use crate::value::{render_canonical, RtResult};

use super::arg_string;

pub fn dispatch(suffix: &str, args: &[RtResult], ctx: &EvalContext) -> Option<StepResult<RtResult>> {
    Some(match suffix {
        "debug" => Ok(write_line(ctx, LogLevel::Debug, "DEBUG", args)),
        "info" => Ok(write_line(ctx, LogLevel::Info, "INFO", args)),
        "warn" => Ok(write_line(ctx, LogLevel::Warn, "WARN", args)),
        "error" => Ok(write_line(ctx, LogLevel::Error, "ERROR", args)),
        "set_level" => set_level(&format!("std.log.{suffix}"), args, ctx),
        _ => return None,
    })
}

fn write_line(ctx: &EvalContext, level: LogLevel, label: &str, args: &[RtResult]) -> RtResult {
    if level as u8 >= ctx.state.log_level() as u8 {
        let mut message = String::new();
        for a in args {
            message.push_str(&render_canonical(&a.value));
        }
        eprintln!("[{label}] {message}");
    }
    RtResult::void()
}

fn set_level(name: &str, args: &[RtResult], ctx: &EvalContext) -> StepResult<RtResult> {
    let text = arg_string(name, args, 0)?;
    if let Some(level) = LogLevel::parse(&text) {
        ctx.state.set_log_level(level);
    }
    Ok(RtResult::void())
}
