//! Constant folding.
//!
//! Two passes per function, kept separate and transient -- no global state:
//! a modified-variable scan that collects every "tainted" `ValueId` (one
//! that is ever the target of an `assign`), followed by a single forward
//! rewrite scan that folds `add,sub,mul,div,mod,cmp.*,and,or` over chains of
//! `const` integers, skipping anything that transitively touches a tainted
//! value. The folder never removes instructions, reorders them, or
//! reassigns IDs -- it only rewrites the opcode/operands of the target
//! instruction in place.

use std::collections::{HashMap, HashSet};

use crate::id::ValueId;
use crate::literal::parse_int_literal;
use crate::module::Module;
use crate::opcode::{CmpKind, Opcode};
use crate::operand::Operand;
use crate::types::TypeTag;

/// Runs constant folding over every function in `module`, in place.
pub fn fold(module: &mut Module) {
    for function in &mut module.functions {
        fold_function(function);
    }
}

fn fold_function(function: &mut crate::function::Function) {
    let tainted = collect_tainted(function);
    let mut known_consts: HashMap<ValueId, (i64, TypeTag)> = HashMap::new();

    for block in &mut function.blocks {
        for inst in &mut block.instructions {
            if matches!(inst.op, Opcode::Const) {
                if !tainted.contains(&inst.id) {
                    if let Some(text) = inst.operands.first().and_then(|o| o.as_literal_text()) {
                        if let Some(value) = parse_int_literal(text) {
                            known_consts.insert(inst.id, (value, inst.ty.clone()));
                        }
                    }
                }
                continue;
            }

            let Some(op_kind) = foldable_kind(&inst.op) else {
                continue;
            };
            if inst.operands.len() < 2 {
                continue;
            }

            let lhs = resolve_int(&inst.operands[0], &known_consts, &tainted);
            let rhs = resolve_int(&inst.operands[1], &known_consts, &tainted);
            let (Some(a), Some(b)) = (lhs, rhs) else {
                continue;
            };

            let folded = match op_kind {
                FoldKind::Arith(op) => match fold_arith(op, a, b) {
                    Some(v) => FoldedValue::Int(v),
                    None => continue, // division/modulo by zero: leave untouched
                },
                FoldKind::Cmp(kind) => FoldedValue::Bool(fold_cmp(kind, a, b)),
                FoldKind::Logic(op) => FoldedValue::Bool(fold_logic(op, a, b)),
            };

            match folded {
                FoldedValue::Int(v) => {
                    inst.op = Opcode::Const;
                    inst.operands = vec![Operand::literal(v.to_string(), inst.ty.clone())];
                    if !tainted.contains(&inst.id) {
                        known_consts.insert(inst.id, (v, inst.ty.clone()));
                    }
                }
                FoldedValue::Bool(v) => {
                    inst.op = Opcode::Const;
                    inst.ty = TypeTag::Bool;
                    inst.operands = vec![Operand::literal(v.to_string(), TypeTag::Bool)];
                    // Bool results are not integer consts usable by further
                    // arithmetic folding; deliberately not inserted into
                    // `known_consts`.
                }
            }
        }
    }
}

/// Collects every `ValueId` that appears as the first operand of an
/// `assign` instruction anywhere in the function -- these are "tainted"
/// and block folding of anything that references them, regardless of
/// textual position.
fn collect_tainted(function: &crate::function::Function) -> HashSet<ValueId> {
    let mut tainted = HashSet::new();
    for block in &function.blocks {
        for inst in &block.instructions {
            if matches!(inst.op, Opcode::Assign) {
                if let Some(id) = inst.operands.first().and_then(|o| o.as_value_id()) {
                    tainted.insert(id);
                }
            }
        }
    }
    tainted
}

enum ArithKind {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

enum LogicKind {
    And,
    Or,
}

enum FoldKind {
    Arith(ArithKind),
    Cmp(CmpKind),
    Logic(LogicKind),
}

enum FoldedValue {
    Int(i64),
    Bool(bool),
}

fn foldable_kind(op: &Opcode) -> Option<FoldKind> {
    match op {
        Opcode::Add => Some(FoldKind::Arith(ArithKind::Add)),
        Opcode::Sub => Some(FoldKind::Arith(ArithKind::Sub)),
        Opcode::Mul => Some(FoldKind::Arith(ArithKind::Mul)),
        Opcode::Div => Some(FoldKind::Arith(ArithKind::Div)),
        Opcode::Mod => Some(FoldKind::Arith(ArithKind::Mod)),
        Opcode::Cmp(kind) => Some(FoldKind::Cmp(*kind)),
        Opcode::And => Some(FoldKind::Logic(LogicKind::And)),
        Opcode::Or => Some(FoldKind::Logic(LogicKind::Or)),
        _ => None,
    }
}

/// Resolves an operand to an integer constant, if it is either a literal
/// integer or a reference to an already-known, untainted const.
fn resolve_int(
    operand: &Operand,
    known_consts: &HashMap<ValueId, (i64, TypeTag)>,
    tainted: &HashSet<ValueId>,
) -> Option<i64> {
    match operand {
        Operand::Literal(text, _) => parse_int_literal(text),
        Operand::Value(id, _) => {
            if tainted.contains(id) {
                None
            } else {
                known_consts.get(id).map(|(v, _)| *v)
            }
        }
    }
}

/// Folds `div`/`mod` using Rust's truncating integer division (rounds
/// toward zero; the remainder takes the sign of the dividend). Returns
/// `None` for division/modulo by zero, leaving the instruction untouched.
fn fold_arith(kind: ArithKind, a: i64, b: i64) -> Option<i64> {
    match kind {
        ArithKind::Add => Some(a.wrapping_add(b)),
        ArithKind::Sub => Some(a.wrapping_sub(b)),
        ArithKind::Mul => Some(a.wrapping_mul(b)),
        ArithKind::Div => {
            if b == 0 {
                None
            } else {
                Some(a.wrapping_div(b))
            }
        }
        ArithKind::Mod => {
            if b == 0 {
                None
            } else {
                Some(a.wrapping_rem(b))
            }
        }
    }
}

fn fold_cmp(kind: CmpKind, a: i64, b: i64) -> bool {
    match kind {
        CmpKind::Eq => a == b,
        CmpKind::Neq => a != b,
        CmpKind::Lt => a < b,
        CmpKind::Lte => a <= b,
        CmpKind::Gt => a > b,
        CmpKind::Gte => a >= b,
    }
}

fn fold_logic(kind: LogicKind, a: i64, b: i64) -> bool {
    let (a, b) = (a != 0, b != 0);
    match kind {
        LogicKind::And => a && b,
        LogicKind::Or => a || b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BasicBlock;
    use crate::function::Function;
    use crate::instruction::Instruction;
    use crate::terminator::Terminator;

    fn two_const_fn(a: &str, b: &str, op: Opcode) -> (Function, ValueId) {
        let mut f = Function::new("main", vec![], TypeTag::Int);
        let v0 = f.next_value();
        let v1 = f.next_value();
        let v2 = f.next_value();
        let mut block = BasicBlock::new("entry", Terminator::ret_void());
        block.push(Instruction::producing(
            v0,
            Opcode::Const,
            TypeTag::Int,
            vec![Operand::literal(a, TypeTag::Int)],
        ));
        block.push(Instruction::producing(
            v1,
            Opcode::Const,
            TypeTag::Int,
            vec![Operand::literal(b, TypeTag::Int)],
        ));
        block.push(Instruction::producing(
            v2,
            op,
            TypeTag::Int,
            vec![
                Operand::value(v0, TypeTag::Int),
                Operand::value(v1, TypeTag::Int),
            ],
        ));
        block.set_terminator(Terminator::ret(Operand::value(v2, TypeTag::Int)));
        f.push_block(block);
        (f, v2)
    }

    #[test]
    fn fold_add_scenario() {
        let (f, v2) = two_const_fn("40", "2", Opcode::Add);
        let mut module = Module::new(vec![f]);
        fold(&mut module);
        let inst = &module.functions[0].blocks[0].instructions[2];
        assert_eq!(inst.id, v2);
        assert_eq!(inst.op, Opcode::Const);
        assert_eq!(inst.operands[0].as_literal_text(), Some("42"));
    }

    #[test]
    fn division_by_zero_is_not_folded() {
        let (f, v2) = two_const_fn("10", "0", Opcode::Div);
        let mut module = Module::new(vec![f]);
        fold(&mut module);
        let inst = &module.functions[0].blocks[0].instructions[2];
        assert_eq!(inst.id, v2);
        assert_eq!(inst.op, Opcode::Div);
    }

    #[test]
    fn comparison_folds_to_bool() {
        let (f, v2) = two_const_fn("9", "7", Opcode::Cmp(CmpKind::Gt));
        let mut module = Module::new(vec![f]);
        fold(&mut module);
        let inst = &module.functions[0].blocks[0].instructions[2];
        assert_eq!(inst.op, Opcode::Const);
        assert_eq!(inst.ty, TypeTag::Bool);
        assert_eq!(inst.operands[0].as_literal_text(), Some("true"));
    }

    #[test]
    fn tainted_value_blocks_folding() {
        let mut f = Function::new("main", vec![], TypeTag::Int);
        let v0 = f.next_value();
        let v1 = f.next_value();
        let v2 = f.next_value();
        let mut block = BasicBlock::new("entry", Terminator::ret_void());
        block.push(Instruction::producing(
            v0,
            Opcode::Const,
            TypeTag::Int,
            vec![Operand::literal("1", TypeTag::Int)],
        ));
        block.push(Instruction::side_effecting(
            Opcode::Assign,
            TypeTag::Int,
            vec![
                Operand::value(v0, TypeTag::Int),
                Operand::literal("99", TypeTag::Int),
            ],
        ));
        block.push(Instruction::producing(
            v1,
            Opcode::Const,
            TypeTag::Int,
            vec![Operand::literal("2", TypeTag::Int)],
        ));
        block.push(Instruction::producing(
            v2,
            Opcode::Add,
            TypeTag::Int,
            vec![
                Operand::value(v0, TypeTag::Int),
                Operand::value(v1, TypeTag::Int),
            ],
        ));
        block.set_terminator(Terminator::ret(Operand::value(v2, TypeTag::Int)));
        f.push_block(block);

        let mut module = Module::new(vec![f]);
        fold(&mut module);
        let inst = &module.functions[0].blocks[0].instructions[3];
        assert_eq!(inst.op, Opcode::Add, "folding must not touch a tainted operand");
    }

    #[test]
    fn chained_folding_across_instructions() {
        // (1 + 2) + 3 -- the first add must fold before the second is
        // visited so the second add's operand resolves through
        // `known_consts`.
        let mut f = Function::new("main", vec![], TypeTag::Int);
        let v0 = f.next_value();
        let v1 = f.next_value();
        let v2 = f.next_value();
        let v3 = f.next_value();
        let v4 = f.next_value();
        let mut block = BasicBlock::new("entry", Terminator::ret_void());
        block.push(Instruction::producing(v0, Opcode::Const, TypeTag::Int, vec![Operand::literal("1", TypeTag::Int)]));
        block.push(Instruction::producing(v1, Opcode::Const, TypeTag::Int, vec![Operand::literal("2", TypeTag::Int)]));
        block.push(Instruction::producing(
            v2,
            Opcode::Add,
            TypeTag::Int,
            vec![Operand::value(v0, TypeTag::Int), Operand::value(v1, TypeTag::Int)],
        ));
        block.push(Instruction::producing(v3, Opcode::Const, TypeTag::Int, vec![Operand::literal("3", TypeTag::Int)]));
        block.push(Instruction::producing(
            v4,
            Opcode::Add,
            TypeTag::Int,
            vec![Operand::value(v2, TypeTag::Int), Operand::value(v3, TypeTag::Int)],
        ));
        block.set_terminator(Terminator::ret(Operand::value(v4, TypeTag::Int)));
        f.push_block(block);

        let mut module = Module::new(vec![f]);
        fold(&mut module);
        let last = &module.functions[0].blocks[0].instructions[4];
        assert_eq!(last.op, Opcode::Const);
        assert_eq!(last.operands[0].as_literal_text(), Some("6"));
    }
}
