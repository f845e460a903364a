//! The structural verifier.
//!
//! A single linear pass over the module that checks shape, not soundness:
//! it does not type-check values and does not require SSA dominance. It
//! fails fast, returning the first violation it encounters.

use std::collections::HashSet;

use crate::error::VerifyError;
use crate::module::Module;
use crate::opcode::Opcode;
use crate::terminator::TerminatorOp;

/// Verifies every structural invariant against `module`, returning the
/// first violation found in program order (functions, then blocks, then
/// instructions).
pub fn verify(module: &Module) -> Result<(), VerifyError> {
    if module.functions.is_empty() {
        return Err(VerifyError::NilModule);
    }

    let mut seen_functions = HashSet::new();
    for (fn_index, function) in module.functions.iter().enumerate() {
        if function.name.is_empty() {
            return Err(VerifyError::EmptyFunctionName { index: fn_index });
        }
        if !seen_functions.insert(function.name.clone()) {
            return Err(VerifyError::DuplicateFunctionName {
                function: function.name.clone(),
            });
        }
        if function.blocks.is_empty() {
            return Err(VerifyError::NoBlocks {
                function: function.name.clone(),
            });
        }

        let mut seen_blocks = HashSet::new();
        let mut block_names = HashSet::new();
        for block in &function.blocks {
            block_names.insert(block.name.as_str());
        }

        for (block_index, block) in function.blocks.iter().enumerate() {
            if block.name.is_empty() {
                return Err(VerifyError::EmptyBlockName {
                    function: function.name.clone(),
                    index: block_index,
                });
            }
            if !seen_blocks.insert(block.name.clone()) {
                return Err(VerifyError::DuplicateBlockName {
                    function: function.name.clone(),
                    block: block.name.clone(),
                });
            }

            for (inst_index, inst) in block.instructions.iter().enumerate() {
                if inst.op.is_binary_like() && inst.operands.len() < 2 {
                    return Err(VerifyError::BinaryOperandCountWrong {
                        function: function.name.clone(),
                        block: block.name.clone(),
                        index: inst_index,
                        opcode: inst.op.to_string(),
                        found: inst.operands.len(),
                    });
                }
                if matches!(inst.op, Opcode::Phi) {
                    let n = inst.operands.len();
                    if n < 2 || n % 2 != 0 {
                        return Err(VerifyError::PhiOperandCountWrong {
                            function: function.name.clone(),
                            block: block.name.clone(),
                            index: inst_index,
                            found: n,
                        });
                    }
                }
            }

            let Some(terminator) = &block.terminator else {
                return Err(VerifyError::MissingTerminator {
                    function: function.name.clone(),
                    block: block.name.clone(),
                });
            };

            match terminator.op {
                TerminatorOp::Ret => {}
                TerminatorOp::Br => {
                    if terminator.operands.len() != 1 {
                        return Err(VerifyError::BrOperandCountWrong {
                            function: function.name.clone(),
                            block: block.name.clone(),
                            found: terminator.operands.len(),
                        });
                    }
                    let target = terminator.operands[0]
                        .as_literal_text()
                        .unwrap_or_default();
                    if !block_names.contains(target) {
                        return Err(VerifyError::BranchTargetNotFound {
                            function: function.name.clone(),
                            block: block.name.clone(),
                            target: target.to_string(),
                        });
                    }
                }
                TerminatorOp::Cbr => {
                    if terminator.operands.len() != 3 {
                        return Err(VerifyError::CbrOperandCountWrong {
                            function: function.name.clone(),
                            block: block.name.clone(),
                            found: terminator.operands.len(),
                        });
                    }
                    for target_operand in &terminator.operands[1..] {
                        let target = target_operand.as_literal_text().unwrap_or_default();
                        if !block_names.contains(target) {
                            return Err(VerifyError::BranchTargetNotFound {
                                function: function.name.clone(),
                                block: block.name.clone(),
                                target: target.to_string(),
                            });
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BasicBlock;
    use crate::function::Function;
    use crate::id::ValueId;
    use crate::instruction::Instruction;
    use crate::operand::Operand;
    use crate::terminator::Terminator;
    use crate::types::TypeTag;

    fn const_fn(name: &str, value: &str, ret_ty: TypeTag) -> Function {
        let mut f = Function::new(name, vec![], ret_ty.clone());
        let id = f.next_value();
        let mut block = BasicBlock::new("entry", Terminator::ret_void());
        block.push(Instruction::producing(
            id,
            Opcode::Const,
            ret_ty.clone(),
            vec![Operand::literal(value, ret_ty.clone())],
        ));
        block.set_terminator(Terminator::ret(Operand::value(id, ret_ty)));
        f.push_block(block);
        f
    }

    #[test]
    fn empty_module_is_nil() {
        let module = Module::new(vec![]);
        assert_eq!(verify(&module), Err(VerifyError::NilModule));
    }

    #[test]
    fn well_formed_module_passes() {
        let module = Module::new(vec![const_fn("main", "42", TypeTag::Int)]);
        assert!(verify(&module).is_ok());
    }

    #[test]
    fn missing_terminator_is_caught() {
        let mut f = Function::new("broken", vec![], TypeTag::Void);
        f.push_block(BasicBlock::unterminated("entry"));
        let module = Module::new(vec![f]);
        assert_eq!(
            verify(&module),
            Err(VerifyError::MissingTerminator {
                function: "broken".to_string(),
                block: "entry".to_string(),
            })
        );
    }

    #[test]
    fn duplicate_block_name_is_caught() {
        let mut f = Function::new("broken", vec![], TypeTag::Void);
        f.push_block(BasicBlock::new("entry", Terminator::ret_void()));
        f.push_block(BasicBlock::new("entry", Terminator::ret_void()));
        let module = Module::new(vec![f]);
        assert_eq!(
            verify(&module),
            Err(VerifyError::DuplicateBlockName {
                function: "broken".to_string(),
                block: "entry".to_string(),
            })
        );
    }

    #[test]
    fn branch_to_unknown_block_is_caught() {
        let mut f = Function::new("main", vec![], TypeTag::Void);
        f.push_block(BasicBlock::new("entry", Terminator::br("nowhere")));
        let module = Module::new(vec![f]);
        assert_eq!(
            verify(&module),
            Err(VerifyError::BranchTargetNotFound {
                function: "main".to_string(),
                block: "entry".to_string(),
                target: "nowhere".to_string(),
            })
        );
    }

    #[test]
    fn cbr_wrong_operand_count_is_caught() {
        let mut f = Function::new("main", vec![], TypeTag::Void);
        f.push_block(BasicBlock::new(
            "entry",
            Terminator {
                op: TerminatorOp::Cbr,
                operands: vec![Operand::value(ValueId(0), TypeTag::Bool)],
            },
        ));
        let module = Module::new(vec![f]);
        assert_eq!(
            verify(&module),
            Err(VerifyError::CbrOperandCountWrong {
                function: "main".to_string(),
                block: "entry".to_string(),
                found: 1,
            })
        );
    }

    #[test]
    fn phi_odd_operand_count_is_caught() {
        let mut f = Function::new("main", vec![], TypeTag::Int);
        let mut block = BasicBlock::new("entry", Terminator::ret_void());
        block.push(Instruction::producing(
            ValueId(0),
            Opcode::Phi,
            TypeTag::Int,
            vec![Operand::value(ValueId(1), TypeTag::Int)],
        ));
        f.push_block(block);
        let module = Module::new(vec![f]);
        assert_eq!(
            verify(&module),
            Err(VerifyError::PhiOperandCountWrong {
                function: "main".to_string(),
                block: "entry".to_string(),
                index: 0,
                found: 1,
            })
        );
    }

    #[test]
    fn binary_op_needs_two_operands() {
        let mut f = Function::new("main", vec![], TypeTag::Int);
        let mut block = BasicBlock::new("entry", Terminator::ret_void());
        block.push(Instruction::producing(
            ValueId(0),
            Opcode::Add,
            TypeTag::Int,
            vec![Operand::literal("1", TypeTag::Int)],
        ));
        f.push_block(block);
        let module = Module::new(vec![f]);
        assert_eq!(
            verify(&module),
            Err(VerifyError::BinaryOperandCountWrong {
                function: "main".to_string(),
                block: "entry".to_string(),
                index: 0,
                opcode: "add".to_string(),
                found: 1,
            })
        );
    }

    #[test]
    fn empty_function_name_is_caught() {
        let f = Function::new("", vec![], TypeTag::Void);
        let module = Module::new(vec![f]);
        assert_eq!(verify(&module), Err(VerifyError::EmptyFunctionName { index: 0 }));
    }

    #[test]
    fn function_with_no_blocks_is_caught() {
        let f = Function::new("main", vec![], TypeTag::Void);
        let module = Module::new(vec![f]);
        assert_eq!(
            verify(&module),
            Err(VerifyError::NoBlocks {
                function: "main".to_string(),
            })
        );
    }
}
