//! Block terminators: `ret`, `br`/`jmp`, `cbr`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::operand::Operand;

/// A terminator opcode. `Jmp` is accepted on parse as an alias of `Br` but
/// is never produced by the printer or JSON serializer -- `Br` is the
/// canonical spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminatorOp {
    Ret,
    Br,
    Cbr,
}

impl fmt::Display for TerminatorOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminatorOp::Ret => write!(f, "ret"),
            TerminatorOp::Br => write!(f, "br"),
            TerminatorOp::Cbr => write!(f, "cbr"),
        }
    }
}

/// Error returned when a textual terminator opcode is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported terminator opcode: '{0}'")]
pub struct UnsupportedTerminator(pub String);

impl FromStr for TerminatorOp {
    type Err = UnsupportedTerminator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ret" => Ok(TerminatorOp::Ret),
            "br" | "jmp" => Ok(TerminatorOp::Br),
            "cbr" => Ok(TerminatorOp::Cbr),
            _ => Err(UnsupportedTerminator(s.to_string())),
        }
    }
}

/// The terminating instruction of a basic block.
///
/// Every [`crate::block::BasicBlock`] has exactly one terminator once the
/// module has passed verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terminator {
    pub op: TerminatorOp,
    pub operands: Vec<Operand>,
}

impl Terminator {
    /// `ret` with no operand (void return).
    pub fn ret_void() -> Self {
        Terminator {
            op: TerminatorOp::Ret,
            operands: Vec::new(),
        }
    }

    /// `ret <operand>`.
    pub fn ret(value: Operand) -> Self {
        Terminator {
            op: TerminatorOp::Ret,
            operands: vec![value],
        }
    }

    /// `br <target>` where `target` is an untyped block-name literal.
    pub fn br(target: impl Into<String>) -> Self {
        Terminator {
            op: TerminatorOp::Br,
            operands: vec![Operand::untyped_literal(target)],
        }
    }

    /// `cbr <cond>, <then>, <else>`.
    pub fn cbr(cond: Operand, then_target: impl Into<String>, else_target: impl Into<String>) -> Self {
        Terminator {
            op: TerminatorOp::Cbr,
            operands: vec![
                cond,
                Operand::untyped_literal(then_target),
                Operand::untyped_literal(else_target),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeTag;

    #[test]
    fn jmp_is_an_alias_for_br_on_parse() {
        assert_eq!("jmp".parse::<TerminatorOp>().unwrap(), TerminatorOp::Br);
        assert_eq!("br".parse::<TerminatorOp>().unwrap(), TerminatorOp::Br);
    }

    #[test]
    fn canonical_display_never_prints_jmp() {
        assert_eq!(TerminatorOp::Br.to_string(), "br");
    }

    #[test]
    fn constructors_produce_expected_shapes() {
        let t = Terminator::ret(Operand::literal("42", TypeTag::Int));
        assert_eq!(t.op, TerminatorOp::Ret);
        assert_eq!(t.operands.len(), 1);

        let t = Terminator::br("then");
        assert_eq!(t.operands.len(), 1);

        let t = Terminator::cbr(Operand::value(crate::id::ValueId(0), TypeTag::Bool), "then", "else");
        assert_eq!(t.operands.len(), 3);
    }
}
