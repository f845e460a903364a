//! The tree-walking evaluator: the largest component. Executes a
//! [`Module`] one function at a time, dispatching every recognized opcode
//! and falling through to the intrinsic registry on `call`.

use std::collections::HashMap;
use std::sync::Arc;

use omni_mir::{
    AssertOp, CallSuffix, ClosureOp, CmpKind, Instruction, Module, Opcode, Operand, Terminator,
    TerminatorOp, TypeTag,
};
use tokio::runtime::Runtime;

use crate::error::EvalError;
use crate::frame::Frame;
use crate::intrinsics;
use crate::promise::PromiseTable;
use crate::state::ProcessState;
use crate::value::{render_canonical, ClosureValue, MapKey, RtResult, RuntimeValue};

/// What executing a module can produce, short of an error.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalOutcome {
    Returned(RtResult),
    Exited(i32),
}

/// Internal control-flow signal used to unwind through nested calls when an
/// intrinsic raises `Exit`. `?` converts an [`EvalError`] into
/// `Unwind::Err` automatically.
#[derive(Debug, Clone, PartialEq)]
pub enum Unwind {
    Err(EvalError),
    Exit(i32),
}

impl From<EvalError> for Unwind {
    fn from(err: EvalError) -> Self {
        Unwind::Err(err)
    }
}

pub type StepResult<T> = Result<T, Unwind>;

/// Everything an instruction dispatch or intrinsic might need: the module
/// being executed, shared process state, the promise table, and the
/// runtime used to spawn/await async work. Cheaply cloned (every field is
/// an `Arc`) so async call dispatch can move a copy into a spawned task.
#[derive(Clone)]
pub struct EvalContext {
    pub module: Arc<Module>,
    pub state: Arc<ProcessState>,
    pub promises: Arc<PromiseTable>,
    pub runtime: Arc<Runtime>,
}

impl EvalContext {
    /// Builds a fresh evaluation context around `module`, with process state
    /// seeded from `args`. Owns a dedicated
    /// multi-thread runtime so `_async` intrinsics and Promise-returning
    /// calls have somewhere to run.
    pub fn new(module: Module, args: crate::state::CliArgs) -> std::io::Result<EvalContext> {
        let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
        Ok(EvalContext {
            module: Arc::new(module),
            state: Arc::new(ProcessState::new(args)),
            promises: Arc::new(PromiseTable::new()),
            runtime: Arc::new(runtime),
        })
    }
}

/// Runs `entry_name` to completion.
pub fn execute(ctx: EvalContext, entry_name: &str) -> Result<EvalOutcome, EvalError> {
    match call_function(&ctx, entry_name, &[]) {
        Ok(result) => Ok(EvalOutcome::Returned(result)),
        Err(Unwind::Exit(code)) => Ok(EvalOutcome::Exited(code)),
        Err(Unwind::Err(err)) => Err(err),
    }
}

/// Calls `name` as a plain MIR function (not an intrinsic). Builds a frame,
/// seeds parameters from `args`, and walks blocks starting at index 0.
pub fn call_function(ctx: &EvalContext, name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let function = ctx
        .module
        .function(name)
        .ok_or_else(|| EvalError::CalleeNotFound {
            function: name.to_string(),
            callee: name.to_string(),
        })?;

    let mut frame = Frame::new();
    if !args.is_empty() {
        if args.len() != function.params.len() {
            return Err(Unwind::Err(EvalError::InvalidOperandArity {
                function: name.to_string(),
                opcode: "call".to_string(),
                expected: function.params.len().to_string(),
                found: args.len(),
            }));
        }
        for (param, arg) in function.params.iter().zip(args.iter()) {
            let ty = if matches!(arg.ty, TypeTag::Infer) {
                param.ty.clone()
            } else {
                arg.ty.clone()
            };
            frame.store(param.id, RtResult::new(ty, arg.value.clone()));
        }
    }

    if function.blocks.is_empty() {
        return Ok(RtResult::void());
    }

    let block_index: HashMap<&str, usize> =
        function.blocks.iter().enumerate().map(|(i, b)| (b.name.as_str(), i)).collect();

    let mut current = 0usize;
    loop {
        let block = &function.blocks[current];
        for inst in &block.instructions {
            let result = eval_instruction(ctx, name, &mut frame, inst)?;
            frame.store(inst.id, result);
        }
        // The pipeline verifies before handing a module to the evaluator, so
        // every block is guaranteed to carry a terminator by this point.
        let terminator = block
            .terminator
            .as_ref()
            .expect("block has no terminator; module must pass verification before execution");
        match dispatch_terminator(ctx, name, &mut frame, terminator)? {
            TerminatorFlow::Return(result) => return Ok(result),
            TerminatorFlow::Jump(target) => {
                current = *block_index.get(target.as_str()).ok_or_else(|| EvalError::UnsupportedTerminator {
                    function: name.to_string(),
                    opcode: format!("branch to unknown block '{target}'"),
                })?;
            }
        }
    }
}

enum TerminatorFlow {
    Return(RtResult),
    Jump(String),
}

fn dispatch_terminator(
    ctx: &EvalContext,
    function: &str,
    frame: &mut Frame,
    term: &Terminator,
) -> StepResult<TerminatorFlow> {
    match term.op {
        TerminatorOp::Ret => {
            if term.operands.is_empty() {
                Ok(TerminatorFlow::Return(RtResult::void()))
            } else {
                Ok(TerminatorFlow::Return(resolve_operand(ctx, function, frame, &term.operands[0])?))
            }
        }
        TerminatorOp::Br => {
            let target = term.operands.first().and_then(Operand::as_literal_text).unwrap_or_default();
            Ok(TerminatorFlow::Jump(target.to_string()))
        }
        TerminatorOp::Cbr => {
            let cond = resolve_operand(ctx, function, frame, &term.operands[0])?;
            let branch = if cond.value.is_truthy() { 1 } else { 2 };
            let text = term.operands[branch].as_literal_text().unwrap_or_default();
            Ok(TerminatorFlow::Jump(text.to_string()))
        }
    }
}

/// Resolves an operand to its [`RtResult`]: a frame lookup for `Value`, or a
/// freshly parsed literal for `Literal`.
fn resolve_operand(ctx: &EvalContext, function: &str, frame: &Frame, operand: &Operand) -> StepResult<RtResult> {
    let _ = ctx;
    match operand {
        Operand::Value(id, ty) => Ok(frame
            .get(*id)
            .cloned()
            .unwrap_or_else(|| RtResult::new(ty.clone(), RuntimeValue::Null))),
        Operand::Literal(text, ty) => parse_literal(function, text, ty),
    }
}

/// `const` literal parsing: unknown/unparsable literal for a
/// given tag yields a typed null rather than failing outright.
fn parse_literal(_function: &str, text: &str, ty: &TypeTag) -> StepResult<RtResult> {
    use omni_mir::literal::{parse_bool_literal, parse_float_literal, parse_int_literal, strip_string_literal};

    let result = match ty {
        TypeTag::Int | TypeTag::Long | TypeTag::Byte => {
            parse_int_literal(text).map(RuntimeValue::Int).unwrap_or(RuntimeValue::Null)
        }
        TypeTag::Float | TypeTag::Double => {
            parse_float_literal(text).map(RuntimeValue::Float).unwrap_or(RuntimeValue::Null)
        }
        TypeTag::Bool => parse_bool_literal(text).map(RuntimeValue::Bool).unwrap_or(RuntimeValue::Null),
        TypeTag::String => RuntimeValue::Str(strip_string_literal(text).to_string()),
        TypeTag::Char => strip_string_literal(text)
            .chars()
            .next()
            .map(RuntimeValue::Char)
            .unwrap_or(RuntimeValue::Null),
        TypeTag::Infer => {
            if let Some(i) = parse_int_literal(text) {
                RuntimeValue::Int(i)
            } else if let Some(b) = parse_bool_literal(text) {
                RuntimeValue::Bool(b)
            } else if let Some(f) = parse_float_literal(text) {
                RuntimeValue::Float(f)
            } else {
                RuntimeValue::Str(strip_string_literal(text).to_string())
            }
        }
        _ => RuntimeValue::Null,
    };
    Ok(RtResult::new(ty.clone(), result))
}

fn as_int(function: &str, result: &RtResult) -> StepResult<i64> {
    match &result.value {
        RuntimeValue::Int(i) => Ok(*i),
        RuntimeValue::Bool(b) => Ok(*b as i64),
        RuntimeValue::Float(f) => Ok(*f as i64),
        other => Err(Unwind::Err(EvalError::TypeCoercionFailed {
            function: function.to_string(),
            detail: format!("{other:?} is not an integer"),
        })),
    }
}

fn as_float(function: &str, result: &RtResult) -> StepResult<f64> {
    match &result.value {
        RuntimeValue::Float(f) => Ok(*f),
        RuntimeValue::Int(i) => Ok(*i as f64),
        other => Err(Unwind::Err(EvalError::TypeCoercionFailed {
            function: function.to_string(),
            detail: format!("{other:?} is not a float"),
        })),
    }
}

fn as_bool(function: &str, result: &RtResult) -> StepResult<bool> {
    match &result.value {
        RuntimeValue::Bool(b) => Ok(*b),
        other => Err(Unwind::Err(EvalError::TypeCoercionFailed {
            function: function.to_string(),
            detail: format!("{other:?} is not a bool"),
        })),
    }
}

fn is_float_result(result: &RtResult) -> bool {
    matches!(result.value, RuntimeValue::Float(_))
}

fn eval_instruction(ctx: &EvalContext, function: &str, frame: &mut Frame, inst: &Instruction) -> StepResult<RtResult> {
    match &inst.op {
        Opcode::Const => {
            let (text, ty) = match inst.operands.first() {
                Some(Operand::Literal(text, ty)) => (text.clone(), ty.clone()),
                Some(Operand::Value(id, ty)) => {
                    return Ok(frame.get(*id).cloned().unwrap_or_else(|| RtResult::new(ty.clone(), RuntimeValue::Null)))
                }
                None => {
                    return Err(Unwind::Err(EvalError::InvalidOperandArity {
                        function: function.to_string(),
                        opcode: "const".to_string(),
                        expected: "1".to_string(),
                        found: 0,
                    }))
                }
            };
            let ty = if inst.ty.is_infer() { ty } else { inst.ty.clone() };
            parse_literal(function, &text, &ty)
        }
        Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod => {
            eval_arith(ctx, function, frame, inst)
        }
        Opcode::BitAnd | Opcode::BitOr | Opcode::BitXor | Opcode::LShift | Opcode::RShift => {
            eval_bitwise(ctx, function, frame, inst)
        }
        Opcode::BitNot => {
            let v = resolve_operand(ctx, function, frame, &inst.operands[0])?;
            Ok(RtResult::new(inst.ty.clone(), RuntimeValue::Int(!as_int(function, &v)?)))
        }
        Opcode::Neg => {
            let v = resolve_operand(ctx, function, frame, &inst.operands[0])?;
            if is_float_result(&v) {
                Ok(RtResult::new(inst.ty.clone(), RuntimeValue::Float(-as_float(function, &v)?)))
            } else {
                Ok(RtResult::new(inst.ty.clone(), RuntimeValue::Int(-as_int(function, &v)?)))
            }
        }
        Opcode::Not => {
            let v = resolve_operand(ctx, function, frame, &inst.operands[0])?;
            Ok(RtResult::new(TypeTag::Bool, RuntimeValue::Bool(!as_bool(function, &v)?)))
        }
        Opcode::Cast => eval_cast(function, ctx, frame, inst),
        Opcode::StrCat => {
            let mut out = String::new();
            for operand in &inst.operands {
                let v = resolve_operand(ctx, function, frame, operand)?;
                out.push_str(&render_canonical(&v.value));
            }
            Ok(RtResult::string(out))
        }
        Opcode::Cmp(kind) => eval_cmp(ctx, function, frame, inst, *kind),
        Opcode::And => {
            let a = resolve_operand(ctx, function, frame, &inst.operands[0])?;
            let b = resolve_operand(ctx, function, frame, &inst.operands[1])?;
            Ok(RtResult::bool_(a.value.is_truthy() && b.value.is_truthy()))
        }
        Opcode::Or => {
            let a = resolve_operand(ctx, function, frame, &inst.operands[0])?;
            let b = resolve_operand(ctx, function, frame, &inst.operands[1])?;
            Ok(RtResult::bool_(a.value.is_truthy() || b.value.is_truthy()))
        }
        Opcode::Call(suffix) => eval_call(ctx, function, frame, inst, *suffix),
        Opcode::StructInit => eval_struct_init(ctx, function, frame, inst),
        Opcode::ArrayInit => eval_array_init(ctx, function, frame, inst),
        Opcode::MapInit => eval_map_init(ctx, function, frame, inst),
        Opcode::Index => eval_index(ctx, function, frame, inst),
        Opcode::Member => eval_member(ctx, function, frame, inst),
        Opcode::Phi => eval_phi(ctx, function, frame, inst),
        Opcode::FuncRef => {
            let name = inst.operands.first().and_then(Operand::as_literal_text).unwrap_or_default();
            Ok(RtResult::new(TypeTag::String, RuntimeValue::Str(name.to_string())))
        }
        Opcode::FuncAssign => resolve_operand(ctx, function, frame, &inst.operands[1]),
        Opcode::FuncCall => eval_func_call(ctx, function, frame, inst),
        Opcode::Closure(op) => eval_closure(ctx, function, frame, inst, *op),
        Opcode::Malloc => {
            let size = as_int(function, &resolve_operand(ctx, function, frame, &inst.operands[0])?)?;
            Ok(RtResult::new(TypeTag::Ptr, RuntimeValue::Bytes(vec![0u8; size.max(0) as usize])))
        }
        Opcode::Realloc => {
            let buf = resolve_operand(ctx, function, frame, &inst.operands[0])?;
            let size = as_int(function, &resolve_operand(ctx, function, frame, &inst.operands[1])?)?;
            let mut bytes = match buf.value {
                RuntimeValue::Bytes(b) => b,
                _ => Vec::new(),
            };
            bytes.resize(size.max(0) as usize, 0);
            Ok(RtResult::new(TypeTag::Ptr, RuntimeValue::Bytes(bytes)))
        }
        Opcode::File(suffix) => {
            let args = resolve_all(ctx, function, frame, &inst.operands)?;
            intrinsics::file::dispatch(suffix, &args, ctx).unwrap_or_else(|| {
                Err(Unwind::Err(EvalError::UnsupportedInstruction {
                    function: function.to_string(),
                    opcode: format!("file.{suffix}"),
                }))
            })
        }
        Opcode::Assign => {
            let target = inst.operands[0].as_value_id().ok_or_else(|| {
                Unwind::Err(EvalError::InvalidOperandArity {
                    function: function.to_string(),
                    opcode: "assign".to_string(),
                    expected: "value id".to_string(),
                    found: 0,
                })
            })?;
            let new_value = resolve_operand(ctx, function, frame, &inst.operands[1])?;
            frame.store(target, new_value.clone());
            Ok(new_value)
        }
        Opcode::Free => Ok(RtResult::void()),
        Opcode::Test(suffix) => {
            let args = resolve_all(ctx, function, frame, &inst.operands)?;
            intrinsics::testing::dispatch(suffix, &args, ctx).unwrap_or(Ok(RtResult::void()))
        }
        Opcode::Assert(op) => eval_assert(ctx, function, frame, inst, *op),
        Opcode::Await => eval_await(ctx, function, frame, inst),
    }
}

fn resolve_all(ctx: &EvalContext, function: &str, frame: &Frame, operands: &[Operand]) -> StepResult<Vec<RtResult>> {
    operands.iter().map(|o| resolve_operand(ctx, function, frame, o)).collect()
}

fn eval_arith(ctx: &EvalContext, function: &str, frame: &Frame, inst: &Instruction) -> StepResult<RtResult> {
    let a = resolve_operand(ctx, function, frame, &inst.operands[0])?;
    let b = resolve_operand(ctx, function, frame, &inst.operands[1])?;
    let result_ty = if inst.ty.is_infer() { a.ty.clone() } else { inst.ty.clone() };

    if is_float_result(&a) || is_float_result(&b) {
        let x = as_float(function, &a)?;
        let y = as_float(function, &b)?;
        let value = match inst.op {
            Opcode::Add => x + y,
            Opcode::Sub => x - y,
            Opcode::Mul => x * y,
            Opcode::Div => {
                if y == 0.0 {
                    return Err(Unwind::Err(EvalError::DivisionByZero { function: function.to_string() }));
                }
                x / y
            }
            Opcode::Mod => {
                if y == 0.0 {
                    return Err(Unwind::Err(EvalError::DivisionByZero { function: function.to_string() }));
                }
                x - (x / y).floor() * y
            }
            _ => unreachable!(),
        };
        Ok(RtResult::new(result_ty, RuntimeValue::Float(value)))
    } else {
        let x = as_int(function, &a)?;
        let y = as_int(function, &b)?;
        let value = match inst.op {
            Opcode::Add => x.wrapping_add(y),
            Opcode::Sub => x.wrapping_sub(y),
            Opcode::Mul => x.wrapping_mul(y),
            Opcode::Div => {
                if y == 0 {
                    return Err(Unwind::Err(EvalError::DivisionByZero { function: function.to_string() }));
                }
                x.wrapping_div(y)
            }
            Opcode::Mod => {
                if y == 0 {
                    return Err(Unwind::Err(EvalError::DivisionByZero { function: function.to_string() }));
                }
                x.wrapping_rem(y)
            }
            _ => unreachable!(),
        };
        Ok(RtResult::new(result_ty, RuntimeValue::Int(value)))
    }
}

fn eval_bitwise(ctx: &EvalContext, function: &str, frame: &Frame, inst: &Instruction) -> StepResult<RtResult> {
    let a = as_int(function, &resolve_operand(ctx, function, frame, &inst.operands[0])?)?;
    let b = as_int(function, &resolve_operand(ctx, function, frame, &inst.operands[1])?)?;
    let value = match inst.op {
        Opcode::BitAnd => a & b,
        Opcode::BitOr => a | b,
        Opcode::BitXor => a ^ b,
        Opcode::LShift => a.wrapping_shl(b as u32),
        Opcode::RShift => a.wrapping_shr(b as u32),
        _ => unreachable!(),
    };
    let ty = if inst.ty.is_infer() { TypeTag::Int } else { inst.ty.clone() };
    Ok(RtResult::new(ty, RuntimeValue::Int(value)))
}

fn eval_cmp(ctx: &EvalContext, function: &str, frame: &Frame, inst: &Instruction, kind: CmpKind) -> StepResult<RtResult> {
    let a = resolve_operand(ctx, function, frame, &inst.operands[0])?;
    let b = resolve_operand(ctx, function, frame, &inst.operands[1])?;

    let ordering = match (&a.value, &b.value) {
        (RuntimeValue::Str(x), RuntimeValue::Str(y)) => x.cmp(y),
        (RuntimeValue::Bool(x), RuntimeValue::Bool(y)) => {
            if !matches!(kind, CmpKind::Eq | CmpKind::Neq) {
                return Err(Unwind::Err(EvalError::TypeCoercionFailed {
                    function: function.to_string(),
                    detail: "bool only supports cmp.eq/cmp.neq".to_string(),
                }));
            }
            x.cmp(y)
        }
        (RuntimeValue::Float(_), _) | (_, RuntimeValue::Float(_)) => {
            let x = as_float(function, &a)?;
            let y = as_float(function, &b)?;
            x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal)
        }
        _ => {
            let x = as_int(function, &a)?;
            let y = as_int(function, &b)?;
            x.cmp(&y)
        }
    };

    use std::cmp::Ordering::*;
    let value = match (kind, ordering) {
        (CmpKind::Eq, Equal) => true,
        (CmpKind::Neq, o) => o != Equal,
        (CmpKind::Lt, Less) => true,
        (CmpKind::Lte, Less | Equal) => true,
        (CmpKind::Gt, Greater) => true,
        (CmpKind::Gte, Greater | Equal) => true,
        _ => false,
    };
    Ok(RtResult::bool_(value))
}

fn eval_cast(function: &str, ctx: &EvalContext, frame: &Frame, inst: &Instruction) -> StepResult<RtResult> {
    let v = resolve_operand(ctx, function, frame, &inst.operands[0])?;
    let result = match &inst.ty {
        TypeTag::Int | TypeTag::Long | TypeTag::Byte => match &v.value {
            RuntimeValue::Int(i) => RuntimeValue::Int(*i),
            RuntimeValue::Float(f) => RuntimeValue::Int(*f as i64),
            RuntimeValue::Bool(b) => RuntimeValue::Int(*b as i64),
            RuntimeValue::Str(s) => s
                .trim()
                .parse::<i64>()
                .map(RuntimeValue::Int)
                .map_err(|_| EvalError::TypeCoercionFailed {
                    function: function.to_string(),
                    detail: format!("cannot cast '{s}' to int"),
                })?,
            other => {
                return Err(Unwind::Err(EvalError::TypeCoercionFailed {
                    function: function.to_string(),
                    detail: format!("cannot cast {other:?} to int"),
                }))
            }
        },
        TypeTag::Float | TypeTag::Double => match &v.value {
            RuntimeValue::Float(f) => RuntimeValue::Float(*f),
            RuntimeValue::Int(i) => RuntimeValue::Float(*i as f64),
            RuntimeValue::Str(s) => s
                .trim()
                .parse::<f64>()
                .map(RuntimeValue::Float)
                .map_err(|_| EvalError::TypeCoercionFailed {
                    function: function.to_string(),
                    detail: format!("cannot cast '{s}' to float"),
                })?,
            other => {
                return Err(Unwind::Err(EvalError::TypeCoercionFailed {
                    function: function.to_string(),
                    detail: format!("cannot cast {other:?} to float"),
                }))
            }
        },
        TypeTag::Bool => RuntimeValue::Bool(v.value.is_truthy()),
        TypeTag::String => RuntimeValue::Str(render_canonical(&v.value)),
        _ => v.value.clone(),
    };
    Ok(RtResult::new(inst.ty.clone(), result))
}

fn eval_struct_init(ctx: &EvalContext, function: &str, frame: &Frame, inst: &Instruction) -> StepResult<RtResult> {
    let mut operands = &inst.operands[..];
    if let Some(Operand::Literal(_, TypeTag::Struct(_))) = operands.first() {
        operands = &operands[1..];
    }
    if operands.len() % 2 != 0 {
        return Err(Unwind::Err(EvalError::InvalidOperandArity {
            function: function.to_string(),
            opcode: "struct.init".to_string(),
            expected: "even count".to_string(),
            found: operands.len(),
        }));
    }
    let mut fields = indexmap::IndexMap::new();
    let mut i = 0;
    while i < operands.len() {
        let name = match &operands[i] {
            Operand::Literal(text, _) => text.clone(),
            Operand::Value(_, _) => format!("field_{}", i / 2),
        };
        let value = resolve_operand(ctx, function, frame, &operands[i + 1])?;
        fields.insert(name, value.value);
        i += 2;
    }
    Ok(RtResult::new(inst.ty.clone(), RuntimeValue::Struct(fields)))
}

fn eval_array_init(ctx: &EvalContext, function: &str, frame: &Frame, inst: &Instruction) -> StepResult<RtResult> {
    let values = resolve_all(ctx, function, frame, &inst.operands)?;
    let items = values.into_iter().map(|r| r.value).collect();
    Ok(RtResult::new(inst.ty.clone(), RuntimeValue::Array(items)))
}

fn eval_map_init(ctx: &EvalContext, function: &str, frame: &Frame, inst: &Instruction) -> StepResult<RtResult> {
    if inst.operands.len() % 2 != 0 {
        return Err(Unwind::Err(EvalError::InvalidOperandArity {
            function: function.to_string(),
            opcode: "map.init".to_string(),
            expected: "even count".to_string(),
            found: inst.operands.len(),
        }));
    }
    let mut map = indexmap::IndexMap::new();
    let mut i = 0;
    while i < inst.operands.len() {
        let key = resolve_operand(ctx, function, frame, &inst.operands[i])?;
        let value = resolve_operand(ctx, function, frame, &inst.operands[i + 1])?;
        map.insert(MapKey::from_value(&key.value), value.value);
        i += 2;
    }
    Ok(RtResult::new(inst.ty.clone(), RuntimeValue::Map(map)))
}

fn eval_index(ctx: &EvalContext, function: &str, frame: &Frame, inst: &Instruction) -> StepResult<RtResult> {
    let container = resolve_operand(ctx, function, frame, &inst.operands[0])?;
    let key = resolve_operand(ctx, function, frame, &inst.operands[1])?;
    match container.value {
        RuntimeValue::Map(map) => {
            let k = MapKey::from_value(&key.value);
            let value = map.get(&k).cloned().unwrap_or_else(|| zero_value_for_tag(&inst.ty));
            Ok(RtResult::new(inst.ty.clone(), value))
        }
        RuntimeValue::Array(items) => {
            let index = as_int(function, &key)?;
            if index < 0 || index as usize >= items.len() {
                return Err(Unwind::Err(EvalError::IndexOutOfBounds {
                    function: function.to_string(),
                    index,
                    len: items.len(),
                }));
            }
            Ok(RtResult::new(inst.ty.clone(), items[index as usize].clone()))
        }
        other => Err(Unwind::Err(EvalError::TypeCoercionFailed {
            function: function.to_string(),
            detail: format!("cannot index into {other:?}"),
        })),
    }
}

fn eval_member(ctx: &EvalContext, function: &str, frame: &Frame, inst: &Instruction) -> StepResult<RtResult> {
    let container = resolve_operand(ctx, function, frame, &inst.operands[0])?;
    let name = inst.operands.get(1).and_then(Operand::as_literal_text).unwrap_or_default();
    match &container.value {
        RuntimeValue::Struct(fields) => {
            let value = fields.get(name).cloned().unwrap_or(RuntimeValue::Null);
            let ty = infer_runtime_tag(&value);
            Ok(RtResult::new(ty, value))
        }
        other => Err(Unwind::Err(EvalError::TypeCoercionFailed {
            function: function.to_string(),
            detail: format!("member access requires a mapping, found {other:?}"),
        })),
    }
}

/// Builds a zero-valued `RuntimeValue` for a declared type tag -- used on a
/// `map<K,V>` lookup miss, which resolves by raw key to a zero-valued
/// default for the value type rather than failing.
fn zero_value_for_tag(ty: &TypeTag) -> RuntimeValue {
    match ty {
        TypeTag::Int | TypeTag::Long | TypeTag::Byte => RuntimeValue::Int(0),
        TypeTag::Float | TypeTag::Double => RuntimeValue::Float(0.0),
        TypeTag::Bool => RuntimeValue::Bool(false),
        TypeTag::Char => RuntimeValue::Char('\0'),
        TypeTag::String => RuntimeValue::Str(String::new()),
        TypeTag::Array(_) => RuntimeValue::Array(Vec::new()),
        // `inst.ty` on `index` normally already names the map's value type;
        // if it still names the map type itself, recurse into its value tag.
        TypeTag::Map(_, v) => zero_value_for_tag(v),
        TypeTag::Struct(_) => RuntimeValue::Struct(indexmap::IndexMap::new()),
        TypeTag::Ptr | TypeTag::Void | TypeTag::Infer => RuntimeValue::Null,
    }
}

fn infer_runtime_tag(value: &RuntimeValue) -> TypeTag {
    match value {
        RuntimeValue::Int(_) => TypeTag::Int,
        RuntimeValue::Float(_) => TypeTag::Double,
        RuntimeValue::Bool(_) => TypeTag::Bool,
        RuntimeValue::Str(_) => TypeTag::String,
        RuntimeValue::Char(_) => TypeTag::Char,
        _ => TypeTag::Infer,
    }
}

fn eval_phi(ctx: &EvalContext, function: &str, frame: &Frame, inst: &Instruction) -> StepResult<RtResult> {
    // No dominance tracker: always selects the first (value, block-name)
    // pair, matching the source's documented limitation.
    resolve_operand(ctx, function, frame, &inst.operands[0])
}

fn eval_call(ctx: &EvalContext, function: &str, frame: &Frame, inst: &Instruction, suffix: CallSuffix) -> StepResult<RtResult> {
    let callee = inst.operands.first().and_then(Operand::as_literal_text).unwrap_or_default().to_string();
    let args = resolve_all(ctx, function, frame, &inst.operands[1..])?;

    if let Some(outcome) = intrinsics::dispatch(&callee, &args, ctx) {
        return outcome;
    }

    if let Some(callee_fn) = ctx.module.function(&callee) {
        if matches!(&callee_fn.return_type, TypeTag::Struct(s) if s.starts_with("Promise<")) {
            return Ok(spawn_async_call(ctx, &callee, args));
        }
        return call_function(ctx, &callee, &args);
    }

    if callee.contains('.') && !callee.starts_with("std.") {
        let ty = match suffix {
            CallSuffix::Void => TypeTag::Void,
            CallSuffix::String => TypeTag::String,
            CallSuffix::Bool => TypeTag::Bool,
            _ => TypeTag::Int,
        };
        return Ok(RtResult::new(ty, RuntimeValue::Int(0)));
    }

    Err(Unwind::Err(EvalError::CalleeNotFound {
        function: function.to_string(),
        callee,
    }))
}

fn spawn_async_call(ctx: &EvalContext, callee: &str, args: Vec<RtResult>) -> RtResult {
    let promise_id = ctx.promises.create();
    let task_ctx = ctx.clone();
    let callee = callee.to_string();
    ctx.runtime.spawn_blocking(move || {
        let result = call_function(&task_ctx, &callee, &args);
        match result {
            Ok(value) => task_ctx.promises.resolve(promise_id, value),
            Err(Unwind::Err(err)) => task_ctx.promises.reject(promise_id, err.to_string()),
            Err(Unwind::Exit(_)) => task_ctx.promises.reject(promise_id, "exit during async call".to_string()),
        }
    });
    RtResult::new(TypeTag::Struct("Promise".to_string()), RuntimeValue::Promise(promise_id))
}

fn eval_func_call(ctx: &EvalContext, function: &str, frame: &Frame, inst: &Instruction) -> StepResult<RtResult> {
    let callee_result = resolve_operand(ctx, function, frame, &inst.operands[0])?;
    let mut args = resolve_all(ctx, function, frame, &inst.operands[1..])?;

    match callee_result.value {
        RuntimeValue::Str(name) => call_function(ctx, &name, &args),
        RuntimeValue::Closure(closure) => {
            for value in closure.captured.values() {
                args.push(RtResult::new(infer_runtime_tag(value), value.clone()));
            }
            call_function(ctx, &closure.function, &args)
        }
        other => Err(Unwind::Err(EvalError::TypeCoercionFailed {
            function: function.to_string(),
            detail: format!("func.call requires a function reference or closure, found {other:?}"),
        })),
    }
}

fn eval_closure(ctx: &EvalContext, function: &str, frame: &Frame, inst: &Instruction, op: ClosureOp) -> StepResult<RtResult> {
    match op {
        ClosureOp::Create => {
            let name = inst.operands.first().and_then(Operand::as_literal_text).unwrap_or_default();
            Ok(RtResult::new(
                inst.ty.clone(),
                RuntimeValue::Closure(ClosureValue {
                    function: name.to_string(),
                    captured: indexmap::IndexMap::new(),
                }),
            ))
        }
        ClosureOp::Capture => {
            let closure_operand = resolve_operand(ctx, function, frame, &inst.operands[0])?;
            let name = inst.operands.get(1).and_then(Operand::as_literal_text).unwrap_or_default();
            let value = resolve_operand(ctx, function, frame, &inst.operands[2])?;
            match closure_operand.value {
                RuntimeValue::Closure(mut closure) => {
                    closure.captured.insert(name.to_string(), value.value);
                    Ok(RtResult::new(inst.ty.clone(), RuntimeValue::Closure(closure)))
                }
                other => Err(Unwind::Err(EvalError::TypeCoercionFailed {
                    function: function.to_string(),
                    detail: format!("closure.capture requires a closure, found {other:?}"),
                })),
            }
        }
        ClosureOp::Bind => resolve_operand(ctx, function, frame, &inst.operands[0]),
    }
}

fn eval_assert(ctx: &EvalContext, function: &str, frame: &Frame, inst: &Instruction, op: AssertOp) -> StepResult<RtResult> {
    let (passed, message) = match op {
        AssertOp::Plain => {
            let v = resolve_operand(ctx, function, frame, &inst.operands[0])?;
            (v.value.is_truthy(), "expected truthy value".to_string())
        }
        AssertOp::True => {
            let v = resolve_operand(ctx, function, frame, &inst.operands[0])?;
            (v.value.is_truthy(), "expected true".to_string())
        }
        AssertOp::False => {
            let v = resolve_operand(ctx, function, frame, &inst.operands[0])?;
            (!v.value.is_truthy(), "expected false".to_string())
        }
        AssertOp::Eq => {
            let a = resolve_operand(ctx, function, frame, &inst.operands[0])?;
            let b = resolve_operand(ctx, function, frame, &inst.operands[1])?;
            (a.value == b.value, format!("{:?} != {:?}", a.value, b.value))
        }
    };
    ctx.state.testing.record(0, passed, &message, function);
    Ok(RtResult::bool_(passed))
}

fn eval_await(ctx: &EvalContext, function: &str, frame: &Frame, inst: &Instruction) -> StepResult<RtResult> {
    let v = resolve_operand(ctx, function, frame, &inst.operands[0])?;
    match v.value {
        RuntimeValue::Promise(id) => {
            let promises = Arc::clone(&ctx.promises);
            let outcome = ctx.runtime.block_on(async move { promises.await_promise(id).await });
            outcome.map_err(|err| {
                Unwind::Err(EvalError::TypeCoercionFailed {
                    function: function.to_string(),
                    detail: format!("promise rejected: {err}"),
                })
            })
        }
        _ => Ok(v),
    }
}
