//! `std.file`: handle-based I/O against the process-wide
//! [`crate::state::FileTable`]. Reached both through the `file.*` opcode
//! family (suffix taken straight from [`omni_mir::Opcode::File`]) and
//! through an explicit `call "std.file.<name>"`.

use omni_mir::TypeTag;

use crate::error::EvalError;
use crate::eval::{EvalContext, StepResult, Unwind};
use crate::value::{render_canonical, RtResult, RuntimeValue};

use super::{arg_int, arg_string};

pub fn dispatch(suffix: &str, args: &[RtResult], ctx: &EvalContext) -> Option<StepResult<RtResult>> {
    let name = format!("std.file.{suffix}");
    Some(match suffix {
        "open" => open(&name, args, ctx),
        "close" => close(&name, args, ctx),
        "read" => read(&name, args, ctx),
        "write" => write(&name, args, ctx),
        "seek" => seek(&name, args, ctx),
        "tell" => tell(&name, args, ctx),
        "exists" => exists(&name, args, ctx),
        "size" => size(&name, args, ctx),
        _ => return None,
    })
}

/// `mode` is one of `r|r+|w|w+|a|a+`, optionally suffixed with an ignored
/// `b`. Returns the new handle, or `-1` on any open failure.
fn open(name: &str, args: &[RtResult], ctx: &EvalContext) -> StepResult<RtResult> {
    let path = arg_string(name, args, 0)?;
    let mode = arg_string(name, args, 1)?;
    let handle = ctx.state.files.open(&path, &mode).unwrap_or(-1);
    Ok(RtResult::int(handle))
}

fn close(name: &str, args: &[RtResult], ctx: &EvalContext) -> StepResult<RtResult> {
    let handle = arg_int(name, args, 0)?;
    Ok(RtResult::bool_(ctx.state.files.close(handle)))
}

/// Returns the bytes actually read, up to `size`. Any I/O failure yields an empty buffer rather than an error --
/// the caller learns about the empty read, same as hitting EOF.
fn read(name: &str, args: &[RtResult], ctx: &EvalContext) -> StepResult<RtResult> {
    let handle = arg_int(name, args, 0)?;
    let size = arg_int(name, args, 1)?;
    let bytes = ctx.state.files.read(handle, size.max(0) as usize).unwrap_or_default();
    Ok(RtResult::new(TypeTag::Ptr, RuntimeValue::Bytes(bytes)))
}

/// Writes `data` (a string or a byte buffer), truncated to `size` when a
/// third argument is supplied. Returns the number of bytes written.
fn write(name: &str, args: &[RtResult], ctx: &EvalContext) -> StepResult<RtResult> {
    let handle = arg_int(name, args, 0)?;
    let data = args.get(1).ok_or_else(|| super::missing_arg(name, 1, args.len()))?;
    let mut bytes = value_to_bytes(&data.value);
    if let Some(size_arg) = args.get(2) {
        let size = match &size_arg.value {
            RuntimeValue::Int(i) => (*i).max(0) as usize,
            _ => bytes.len(),
        };
        bytes.truncate(size);
    }
    let written = ctx.state.files.write(handle, &bytes).map_err(|e| {
        Unwind::Err(EvalError::TypeCoercionFailed {
            function: name.to_string(),
            detail: format!("write failed on handle {handle}: {e}"),
        })
    })?;
    Ok(RtResult::int(written as i64))
}

fn value_to_bytes(value: &RuntimeValue) -> Vec<u8> {
    match value {
        RuntimeValue::Bytes(b) => b.clone(),
        RuntimeValue::Str(s) => s.as_bytes().to_vec(),
        other => render_canonical(other).into_bytes(),
    }
}

/// `whence` is `0|1|2` for start|current|end; returns the new position.
fn seek(name: &str, args: &[RtResult], ctx: &EvalContext) -> StepResult<RtResult> {
    let handle = arg_int(name, args, 0)?;
    let offset = arg_int(name, args, 1)?;
    let whence = arg_int(name, args, 2)?;
    let pos = ctx.state.files.seek(handle, offset, whence).unwrap_or(0);
    Ok(RtResult::int(pos as i64))
}

fn tell(name: &str, args: &[RtResult], ctx: &EvalContext) -> StepResult<RtResult> {
    let handle = arg_int(name, args, 0)?;
    let pos = ctx.state.files.tell(handle).unwrap_or(0);
    Ok(RtResult::int(pos as i64))
}

fn exists(name: &str, args: &[RtResult], ctx: &EvalContext) -> StepResult<RtResult> {
    let handle = arg_int(name, args, 0)?;
    Ok(RtResult::bool_(ctx.state.files.exists(handle)))
}

fn size(name: &str, args: &[RtResult], ctx: &EvalContext) -> StepResult<RtResult> {
    let handle = arg_int(name, args, 0)?;
    let bytes = ctx.state.files.size(handle).unwrap_or(0);
    Ok(RtResult::int(bytes as i64))
}
