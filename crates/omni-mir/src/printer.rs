//! The deterministic canonical text printer.
//!
//! Renders any module to the same byte sequence every time -- suitable for diffing and golden-file tests. Rendering
//! is stable under any semantics-preserving pass: the text form never
//! depends on anything but the module's own fields.
//!
//! ```text
//! func <name>(<p1>:<t1>,<p2>:<t2>,…):<returnType>
//!   block <name>:
//!     [%id =] <op>[.<type>] <operand>, <operand>, …
//!     <terminator-op> <operand>, …
//! ```

use std::fmt::Write as _;

use crate::block::BasicBlock;
use crate::function::Function;
use crate::id::ValueId;
use crate::instruction::Instruction;
use crate::module::Module;
use crate::opcode::Opcode;
use crate::operand::Operand;
use crate::terminator::Terminator;
use crate::types::TypeTag;

/// Renders `module` to its canonical text form.
pub fn print_module(module: &Module) -> String {
    let mut out = String::new();
    for (i, function) in module.functions.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        print_function(&mut out, function);
    }
    out
}

fn print_function(out: &mut String, function: &Function) {
    let params = function
        .params
        .iter()
        .map(|p| format!("{}:{}", p.name, p.ty))
        .collect::<Vec<_>>()
        .join(",");
    let _ = writeln!(out, "func {}({}):{}", function.name, params, function.return_type);
    for block in &function.blocks {
        print_block(out, block);
    }
}

fn print_block(out: &mut String, block: &BasicBlock) {
    let _ = writeln!(out, "  block {}:", block.name);
    for inst in &block.instructions {
        print_instruction(out, inst);
    }
    match &block.terminator {
        Some(term) => print_terminator(out, term),
        None => out.push_str("    <missing terminator>\n"),
    }
}

/// Opcode families whose canonical text already carries a meaningful dotted
/// suffix of their own (`cmp.eq`, `call.int`, `closure.create`, `file.open`,
/// `test.suite`, `assert.eq`) -- the instruction's declared [`TypeTag`] is
/// not additionally appended for these, to avoid a redundant double suffix.
fn opcode_already_dotted(op: &Opcode) -> bool {
    matches!(
        op,
        Opcode::Cmp(_)
            | Opcode::Call(_)
            | Opcode::Closure(_)
            | Opcode::File(_)
            | Opcode::Test(_)
            | Opcode::Assert(_)
    )
}

fn print_instruction(out: &mut String, inst: &Instruction) {
    out.push_str("    ");
    if inst.id.is_valid() {
        let _ = write!(out, "{} = ", inst.id);
    }
    out.push_str(&inst.op.to_string());
    if !opcode_already_dotted(&inst.op) && !matches!(inst.ty, TypeTag::Infer | TypeTag::Void) {
        let _ = write!(out, ".{}", inst.ty);
    }
    print_operand_list(out, &inst.operands);
    out.push('\n');
}

fn print_terminator(out: &mut String, term: &Terminator) {
    out.push_str("    ");
    out.push_str(&term.op.to_string());
    print_operand_list(out, &term.operands);
    out.push('\n');
}

fn print_operand_list(out: &mut String, operands: &[Operand]) {
    for operand in operands {
        out.push(' ');
        print_operand(out, operand);
        out.push(',');
    }
    // Trailing comma is never desired; strip it if any operand was printed.
    if !operands.is_empty() {
        out.pop();
    }
}

fn print_operand(out: &mut String, operand: &Operand) {
    match operand {
        Operand::Value(id, _) => {
            let _ = write!(out, "{}", ValueId(id.0));
        }
        Operand::Literal(text, ty) => {
            if matches!(ty, TypeTag::Infer) {
                out.push_str(text);
            } else {
                let _ = write!(out, "{}:{}", text, ty);
            }
        }
    }
}
