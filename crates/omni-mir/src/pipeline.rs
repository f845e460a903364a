//! The pass pipeline: a named, ordered list of passes over a
//! [`Module`]. The default pipeline is Verify → ConstFold → Verify. A pass
//! is value-in/value-out on the module: it mutates in place, and the
//! pipeline's contract is that the caller gets back either the mutated
//! module or nothing at all.

use crate::constfold;
use crate::error::VerifyError;
use crate::module::Module;
use crate::verifier;

/// A single named pass.
pub enum Pass {
    Verify,
    ConstFold,
}

impl Pass {
    pub fn name(&self) -> &'static str {
        match self {
            Pass::Verify => "verify",
            Pass::ConstFold => "const-fold",
        }
    }
}

/// An ordered, named list of passes.
pub struct Pipeline {
    passes: Vec<Pass>,
}

impl Pipeline {
    /// The default pipeline: Verify → ConstFold → Verify.
    pub fn default_pipeline() -> Self {
        Pipeline {
            passes: vec![Pass::Verify, Pass::ConstFold, Pass::Verify],
        }
    }

    pub fn new(passes: Vec<Pass>) -> Self {
        Pipeline { passes }
    }

    /// Runs every pass in order. Any verification failure aborts
    /// immediately with that error; nothing downstream runs.
    pub fn run(&self, mut module: Module) -> Result<Module, VerifyError> {
        for pass in &self.passes {
            match pass {
                Pass::Verify => {
                    tracing::debug!(pass = pass.name(), "running pass");
                    verifier::verify(&module)?;
                }
                Pass::ConstFold => {
                    tracing::debug!(pass = pass.name(), "running pass");
                    constfold::fold(&mut module);
                }
            }
        }
        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BasicBlock;
    use crate::function::Function;
    use crate::instruction::Instruction;
    use crate::opcode::Opcode;
    use crate::operand::Operand;
    use crate::terminator::Terminator;
    use crate::types::TypeTag;

    #[test]
    fn default_pipeline_folds_and_reverifies() {
        let mut f = Function::new("main", vec![], TypeTag::Int);
        let v0 = f.next_value();
        let v1 = f.next_value();
        let v2 = f.next_value();
        let mut block = BasicBlock::new("entry", Terminator::ret_void());
        block.push(Instruction::producing(v0, Opcode::Const, TypeTag::Int, vec![Operand::literal("40", TypeTag::Int)]));
        block.push(Instruction::producing(v1, Opcode::Const, TypeTag::Int, vec![Operand::literal("2", TypeTag::Int)]));
        block.push(Instruction::producing(
            v2,
            Opcode::Add,
            TypeTag::Int,
            vec![Operand::value(v0, TypeTag::Int), Operand::value(v1, TypeTag::Int)],
        ));
        block.set_terminator(Terminator::ret(Operand::value(v2, TypeTag::Int)));
        f.push_block(block);

        let module = Module::new(vec![f]);
        let result = Pipeline::default_pipeline().run(module).unwrap();
        let inst = &result.functions[0].blocks[0].instructions[2];
        assert_eq!(inst.op, Opcode::Const);
        assert_eq!(inst.operands[0].as_literal_text(), Some("42"));
    }

    #[test]
    fn pipeline_aborts_on_verify_failure() {
        let module = Module::new(vec![]);
        let result = Pipeline::default_pipeline().run(module);
        assert!(result.is_err());
    }
}
