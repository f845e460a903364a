//! `std.os`: process, environment, and whole-file filesystem
//! convenience intrinsics. Handle-based binary I/O lives in [`super::file`].

use std::sync::Arc;

use omni_mir::TypeTag;

use crate::error::EvalError;
use crate::eval::{EvalContext, StepResult, Unwind};
use crate::value::{RtResult, RuntimeValue};

use super::{arg_int, arg_string};

pub fn dispatch(suffix: &str, args: &[RtResult], ctx: &EvalContext) -> Option<StepResult<RtResult>> {
    let name = format!("std.os.{suffix}");
    Some(match suffix {
        "args" => Ok(os_args(ctx)),
        "args_count" => Ok(RtResult::int(ctx.state.args.positional.len() as i64)),
        "has_flag" => has_flag(&name, args, ctx),
        "get_flag" => get_flag(&name, args, ctx),
        "positional_arg" => positional_arg(&name, args, ctx),
        "exit" => exit_(&name, args),
        "getenv" => getenv(&name, args),
        "setenv" => setenv(&name, args),
        "unsetenv" => unsetenv(&name, args),
        "getpid" => Ok(RtResult::int(std::process::id() as i64)),
        "getppid" => Ok(RtResult::int(getppid())),
        "getcwd" => Ok(getcwd()),
        "chdir" => chdir(&name, args),
        "mkdir" => mkdir(&name, args),
        "rmdir" => rmdir(&name, args),
        "remove" => remove(&name, args),
        "rename" => rename(&name, args),
        "copy" => copy_(&name, args),
        "exists" => exists(&name, args),
        "is_file" => is_file(&name, args),
        "is_dir" => is_dir(&name, args),
        "read_file" => read_file(&name, args),
        "write_file" => write_file(&name, args),
        "append_file" => append_file(&name, args),
        "read_file_async" => Ok(spawn_read_file(ctx, args)),
        "write_file_async" => Ok(spawn_write_file(ctx, args, false)),
        "append_file_async" => Ok(spawn_write_file(ctx, args, true)),
        _ => return None,
    })
}

fn os_args(ctx: &EvalContext) -> RtResult {
    let items = ctx.state.args.positional.iter().cloned().map(RuntimeValue::Str).collect();
    RtResult::new(TypeTag::Array(Box::new(TypeTag::String)), RuntimeValue::Array(items))
}

fn has_flag(name: &str, args: &[RtResult], ctx: &EvalContext) -> StepResult<RtResult> {
    let flag = arg_string(name, args, 0)?;
    Ok(RtResult::bool_(ctx.state.args.flags.contains_key(&flag)))
}

/// A valueless flag (`--test`) counts as set but has no string value, so it
/// falls back to `default` the same as an absent flag.
fn get_flag(name: &str, args: &[RtResult], ctx: &EvalContext) -> StepResult<RtResult> {
    let flag = arg_string(name, args, 0)?;
    let default = arg_string(name, args, 1)?;
    let value = match ctx.state.args.flags.get(&flag) {
        Some(Some(v)) => v.clone(),
        _ => default,
    };
    Ok(RtResult::string(value))
}

fn positional_arg(name: &str, args: &[RtResult], ctx: &EvalContext) -> StepResult<RtResult> {
    let idx = arg_int(name, args, 0)?;
    let default = arg_string(name, args, 1)?;
    let value = if idx < 0 {
        default
    } else {
        ctx.state.args.positional.get(idx as usize).cloned().unwrap_or(default)
    };
    Ok(RtResult::string(value))
}

fn exit_(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let code = arg_int(name, args, 0)?;
    Err(Unwind::Exit(code as i32))
}

fn getenv(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let key = arg_string(name, args, 0)?;
    Ok(RtResult::string(std::env::var(key).unwrap_or_default()))
}

fn setenv(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let key = arg_string(name, args, 0)?;
    let value = arg_string(name, args, 1)?;
    std::env::set_var(key, value);
    Ok(RtResult::void())
}

fn unsetenv(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let key = arg_string(name, args, 0)?;
    std::env::remove_var(key);
    Ok(RtResult::void())
}

/// Best-effort parent PID via `/proc/self/stat` (Linux); `0` elsewhere or on
/// any parse failure, since there is no portable stdlib equivalent and this
/// evaluator does not carry a platform-specific process-info dependency.
fn getppid() -> i64 {
    std::fs::read_to_string("/proc/self/stat")
        .ok()
        .and_then(|stat| {
            let after_comm = stat.rsplit_once(')')?.1;
            after_comm.split_whitespace().nth(1)?.parse::<i64>().ok()
        })
        .unwrap_or(0)
}

fn getcwd() -> RtResult {
    let cwd = std::env::current_dir().map(|p| p.display().to_string()).unwrap_or_default();
    RtResult::string(cwd)
}

fn chdir(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let path = arg_string(name, args, 0)?;
    Ok(RtResult::bool_(std::env::set_current_dir(path).is_ok()))
}

fn mkdir(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let path = arg_string(name, args, 0)?;
    Ok(RtResult::bool_(std::fs::create_dir_all(path).is_ok()))
}

fn rmdir(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let path = arg_string(name, args, 0)?;
    Ok(RtResult::bool_(std::fs::remove_dir(path).is_ok()))
}

fn remove(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let path = arg_string(name, args, 0)?;
    Ok(RtResult::bool_(std::fs::remove_file(path).is_ok()))
}

fn rename(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let from = arg_string(name, args, 0)?;
    let to = arg_string(name, args, 1)?;
    Ok(RtResult::bool_(std::fs::rename(from, to).is_ok()))
}

fn copy_(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let from = arg_string(name, args, 0)?;
    let to = arg_string(name, args, 1)?;
    Ok(RtResult::bool_(std::fs::copy(from, to).is_ok()))
}

fn exists(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let path = arg_string(name, args, 0)?;
    Ok(RtResult::bool_(std::path::Path::new(&path).exists()))
}

fn is_file(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let path = arg_string(name, args, 0)?;
    Ok(RtResult::bool_(std::path::Path::new(&path).is_file()))
}

fn is_dir(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let path = arg_string(name, args, 0)?;
    Ok(RtResult::bool_(std::path::Path::new(&path).is_dir()))
}

fn read_file(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let path = arg_string(name, args, 0)?;
    std::fs::read_to_string(&path)
        .map(RtResult::string)
        .map_err(|e| Unwind::Err(EvalError::TypeCoercionFailed {
            function: name.to_string(),
            detail: format!("cannot read '{path}': {e}"),
        }))
}

fn write_file(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let path = arg_string(name, args, 0)?;
    let contents = arg_string(name, args, 1)?;
    Ok(RtResult::bool_(std::fs::write(path, contents).is_ok()))
}

fn append_file(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    use std::io::Write as _;
    let path = arg_string(name, args, 0)?;
    let contents = arg_string(name, args, 1)?;
    let ok = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .and_then(|mut f| f.write_all(contents.as_bytes()))
        .is_ok();
    Ok(RtResult::bool_(ok))
}

fn spawn_read_file(ctx: &EvalContext, args: &[RtResult]) -> RtResult {
    let promise_id = ctx.promises.create();
    let promises = Arc::clone(&ctx.promises);
    let path = args.first().map(|r| crate::value::render_canonical(&r.value)).unwrap_or_default();
    ctx.runtime.spawn_blocking(move || match std::fs::read_to_string(&path) {
        Ok(contents) => promises.resolve(promise_id, RtResult::string(contents)),
        Err(e) => promises.reject(promise_id, e.to_string()),
    });
    RtResult::new(TypeTag::Struct("Promise".to_string()), RuntimeValue::Promise(promise_id))
}

fn spawn_write_file(ctx: &EvalContext, args: &[RtResult], append: bool) -> RtResult {
    use std::io::Write as _;
    let promise_id = ctx.promises.create();
    let promises = Arc::clone(&ctx.promises);
    let path = args.first().map(|r| crate::value::render_canonical(&r.value)).unwrap_or_default();
    let contents = args.get(1).map(|r| crate::value::render_canonical(&r.value)).unwrap_or_default();
    ctx.runtime.spawn_blocking(move || {
        let result = if append {
            std::fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(&path)
                .and_then(|mut f| f.write_all(contents.as_bytes()))
        } else {
            std::fs::write(&path, &contents)
        };
        match result {
            Ok(()) => promises.resolve(promise_id, RtResult::bool_(true)),
            Err(e) => promises.reject(promise_id, e.to_string()),
        }
    });
    RtResult::new(TypeTag::Struct("Promise".to_string()), RuntimeValue::Promise(promise_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::CliArgs;

    fn test_ctx(args: CliArgs) -> EvalContext {
        EvalContext {
            module: Arc::new(omni_mir::Module::new(Vec::new())),
            state: Arc::new(crate::state::ProcessState::new(args)),
            promises: Arc::new(crate::promise::PromiseTable::new()),
            runtime: Arc::new(tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap()),
        }
    }

    #[test]
    fn has_flag_and_get_flag() {
        let args = CliArgs::parse(&["--entry=main".to_string(), "--test".to_string()]);
        let ctx = test_ctx(args);
        let r = dispatch("has_flag", &[RtResult::string("entry")], &ctx).unwrap().unwrap();
        assert_eq!(r.value, RuntimeValue::Bool(true));
        let r = dispatch("get_flag", &[RtResult::string("entry"), RtResult::string("fallback")], &ctx)
            .unwrap()
            .unwrap();
        assert_eq!(r.value, RuntimeValue::Str("main".to_string()));
        let r = dispatch("get_flag", &[RtResult::string("test"), RtResult::string("fallback")], &ctx)
            .unwrap()
            .unwrap();
        assert_eq!(r.value, RuntimeValue::Str("fallback".to_string()));
    }

    #[test]
    fn positional_arg_falls_back_to_default() {
        let args = CliArgs::parse(&["first".to_string()]);
        let ctx = test_ctx(args);
        let r = dispatch("positional_arg", &[RtResult::int(5), RtResult::string("none")], &ctx)
            .unwrap()
            .unwrap();
        assert_eq!(r.value, RuntimeValue::Str("none".to_string()));
    }

    #[test]
    fn read_file_roundtrip() {
        let ctx = test_ctx(CliArgs::default());
        let dir = std::env::temp_dir();
        let path = dir.join("omni_os_intrinsic_test.txt");
        let path_str = path.to_str().unwrap().to_string();
        let _ = dispatch("write_file", &[RtResult::string(path_str.clone()), RtResult::string("hi")], &ctx);
        let r = dispatch("read_file", &[RtResult::string(path_str.clone())], &ctx).unwrap().unwrap();
        assert_eq!(r.value, RuntimeValue::Str("hi".to_string()));
        let _ = std::fs::remove_file(path_str);
    }
}
