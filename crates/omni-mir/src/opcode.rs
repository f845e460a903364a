//! The recognized opcode set.
//!
//! The source vocabulary is stringly-typed at the text/JSON boundary (the
//! printer and the wire format both carry `op` as text), but internally we
//! keep a proper enum with associated data so every other component
//! (verifier, constant folder, evaluator) works against exhaustive matches
//! rather than string comparisons. [`Opcode::from_str`]/[`Opcode::Display`]
//! are the only places that deal in text.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Comparison kind for `cmp.*` opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpKind {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CmpKind {
    const ALL: [(&'static str, CmpKind); 6] = [
        ("eq", CmpKind::Eq),
        ("neq", CmpKind::Neq),
        ("lt", CmpKind::Lt),
        ("lte", CmpKind::Lte),
        ("gt", CmpKind::Gt),
        ("gte", CmpKind::Gte),
    ];
}

impl fmt::Display for CmpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (text, _) = CmpKind::ALL.iter().find(|(_, k)| k == self).unwrap();
        write!(f, "{}", text)
    }
}

/// Result-type suffix for the `call` family (`call`, `call.int`, `call.void`,
/// `call.string`, `call.bool`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallSuffix {
    None,
    Int,
    Void,
    String,
    Bool,
}

impl fmt::Display for CallSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallSuffix::None => write!(f, "call"),
            CallSuffix::Int => write!(f, "call.int"),
            CallSuffix::Void => write!(f, "call.void"),
            CallSuffix::String => write!(f, "call.string"),
            CallSuffix::Bool => write!(f, "call.bool"),
        }
    }
}

/// Closure-related opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClosureOp {
    Create,
    Capture,
    Bind,
}

impl fmt::Display for ClosureOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClosureOp::Create => write!(f, "closure.create"),
            ClosureOp::Capture => write!(f, "closure.capture"),
            ClosureOp::Bind => write!(f, "closure.bind"),
        }
    }
}

/// `assert[.eq|.true|.false]` opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssertOp {
    Plain,
    Eq,
    True,
    False,
}

impl fmt::Display for AssertOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssertOp::Plain => write!(f, "assert"),
            AssertOp::Eq => write!(f, "assert.eq"),
            AssertOp::True => write!(f, "assert.true"),
            AssertOp::False => write!(f, "assert.false"),
        }
    }
}

/// The full recognized opcode vocabulary.
///
/// `File(suffix)` and `Test(suffix)` keep their dotted suffix as a string
/// (e.g. `"open"`, `"seek"` for `file.*`) rather than enumerating every
/// member; the evaluator resolves the suffix against `std.file`/
/// `std.testing` the same way it resolves an intrinsic callee name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Opcode {
    Const,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    LShift,
    RShift,
    BitNot,
    Neg,
    Not,
    Cast,
    StrCat,
    Cmp(CmpKind),
    And,
    Or,
    Call(CallSuffix),
    StructInit,
    ArrayInit,
    MapInit,
    Index,
    Member,
    Phi,
    FuncRef,
    FuncAssign,
    FuncCall,
    Closure(ClosureOp),
    Malloc,
    Realloc,
    File(String),
    Assign,
    Free,
    Test(String),
    Assert(AssertOp),
    Await,
}

impl Opcode {
    /// Returns `true` if this opcode produces a value (i.e. a well-formed
    /// instruction using it has `id != ValueId::INVALID`).
    ///
    /// `assign`, `free`, `test.*`, and `assert[.eq|.true|.false]` are
    /// side-effecting and never produce a value; everything else in the
    /// recognized set does.
    pub fn produces_value(&self) -> bool {
        !matches!(
            self,
            Opcode::Assign | Opcode::Free | Opcode::Test(_) | Opcode::Assert(_)
        )
    }

    /// Returns `true` for the binary comparison/logical opcodes that the
    /// verifier requires to carry at least two operands.
    pub fn is_binary_like(&self) -> bool {
        matches!(
            self,
            Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::Div
                | Opcode::Mod
                | Opcode::BitAnd
                | Opcode::BitOr
                | Opcode::BitXor
                | Opcode::LShift
                | Opcode::RShift
                | Opcode::Cmp(_)
                | Opcode::And
                | Opcode::Or
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Const => write!(f, "const"),
            Opcode::Add => write!(f, "add"),
            Opcode::Sub => write!(f, "sub"),
            Opcode::Mul => write!(f, "mul"),
            Opcode::Div => write!(f, "div"),
            Opcode::Mod => write!(f, "mod"),
            Opcode::BitAnd => write!(f, "bitand"),
            Opcode::BitOr => write!(f, "bitor"),
            Opcode::BitXor => write!(f, "bitxor"),
            Opcode::LShift => write!(f, "lshift"),
            Opcode::RShift => write!(f, "rshift"),
            Opcode::BitNot => write!(f, "bitnot"),
            Opcode::Neg => write!(f, "neg"),
            Opcode::Not => write!(f, "not"),
            Opcode::Cast => write!(f, "cast"),
            Opcode::StrCat => write!(f, "strcat"),
            Opcode::Cmp(kind) => write!(f, "cmp.{}", kind),
            Opcode::And => write!(f, "and"),
            Opcode::Or => write!(f, "or"),
            Opcode::Call(suffix) => write!(f, "{}", suffix),
            Opcode::StructInit => write!(f, "struct.init"),
            Opcode::ArrayInit => write!(f, "array.init"),
            Opcode::MapInit => write!(f, "map.init"),
            Opcode::Index => write!(f, "index"),
            Opcode::Member => write!(f, "member"),
            Opcode::Phi => write!(f, "phi"),
            Opcode::FuncRef => write!(f, "func.ref"),
            Opcode::FuncAssign => write!(f, "func.assign"),
            Opcode::FuncCall => write!(f, "func.call"),
            Opcode::Closure(op) => write!(f, "{}", op),
            Opcode::Malloc => write!(f, "malloc"),
            Opcode::Realloc => write!(f, "realloc"),
            Opcode::File(suffix) => write!(f, "file.{}", suffix),
            Opcode::Assign => write!(f, "assign"),
            Opcode::Free => write!(f, "free"),
            Opcode::Test(suffix) => write!(f, "test.{}", suffix),
            Opcode::Assert(op) => write!(f, "{}", op),
            Opcode::Await => write!(f, "await"),
        }
    }
}

/// Error returned when a textual opcode is not in the recognized set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported instruction opcode: '{0}'")]
pub struct UnsupportedOpcode(pub String);

impl FromStr for Opcode {
    type Err = UnsupportedOpcode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((_, kind)) = CmpKind::ALL.iter().find(|(text, _)| format!("cmp.{}", text) == s) {
            return Ok(Opcode::Cmp(*kind));
        }
        match s {
            "const" => return Ok(Opcode::Const),
            "add" => return Ok(Opcode::Add),
            "sub" => return Ok(Opcode::Sub),
            "mul" => return Ok(Opcode::Mul),
            "div" => return Ok(Opcode::Div),
            "mod" => return Ok(Opcode::Mod),
            "bitand" => return Ok(Opcode::BitAnd),
            "bitor" => return Ok(Opcode::BitOr),
            "bitxor" => return Ok(Opcode::BitXor),
            "lshift" => return Ok(Opcode::LShift),
            "rshift" => return Ok(Opcode::RShift),
            "bitnot" => return Ok(Opcode::BitNot),
            "neg" => return Ok(Opcode::Neg),
            "not" => return Ok(Opcode::Not),
            "cast" => return Ok(Opcode::Cast),
            "strcat" => return Ok(Opcode::StrCat),
            "and" => return Ok(Opcode::And),
            "or" => return Ok(Opcode::Or),
            "call" => return Ok(Opcode::Call(CallSuffix::None)),
            "call.int" => return Ok(Opcode::Call(CallSuffix::Int)),
            "call.void" => return Ok(Opcode::Call(CallSuffix::Void)),
            "call.string" => return Ok(Opcode::Call(CallSuffix::String)),
            "call.bool" => return Ok(Opcode::Call(CallSuffix::Bool)),
            "struct.init" => return Ok(Opcode::StructInit),
            "array.init" => return Ok(Opcode::ArrayInit),
            "map.init" => return Ok(Opcode::MapInit),
            "index" => return Ok(Opcode::Index),
            "member" => return Ok(Opcode::Member),
            "phi" => return Ok(Opcode::Phi),
            "func.ref" => return Ok(Opcode::FuncRef),
            "func.assign" => return Ok(Opcode::FuncAssign),
            "func.call" => return Ok(Opcode::FuncCall),
            "closure.create" => return Ok(Opcode::Closure(ClosureOp::Create)),
            "closure.capture" => return Ok(Opcode::Closure(ClosureOp::Capture)),
            "closure.bind" => return Ok(Opcode::Closure(ClosureOp::Bind)),
            "malloc" => return Ok(Opcode::Malloc),
            "realloc" => return Ok(Opcode::Realloc),
            "assign" => return Ok(Opcode::Assign),
            "free" => return Ok(Opcode::Free),
            "assert" => return Ok(Opcode::Assert(AssertOp::Plain)),
            "assert.eq" => return Ok(Opcode::Assert(AssertOp::Eq)),
            "assert.true" => return Ok(Opcode::Assert(AssertOp::True)),
            "assert.false" => return Ok(Opcode::Assert(AssertOp::False)),
            "await" => return Ok(Opcode::Await),
            _ => {}
        }
        if let Some(suffix) = s.strip_prefix("file.") {
            return Ok(Opcode::File(suffix.to_string()));
        }
        if let Some(suffix) = s.strip_prefix("test.") {
            return Ok(Opcode::Test(suffix.to_string()));
        }
        Err(UnsupportedOpcode(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_simple_opcodes() {
        for text in [
            "const", "add", "sub", "mul", "div", "mod", "bitand", "bitor", "bitxor", "lshift",
            "rshift", "bitnot", "neg", "not", "cast", "strcat", "and", "or", "struct.init",
            "array.init", "map.init", "index", "member", "phi", "func.ref", "func.assign",
            "func.call", "malloc", "realloc", "assign", "free", "await",
        ] {
            let op: Opcode = text.parse().unwrap();
            assert_eq!(op.to_string(), text);
        }
    }

    #[test]
    fn roundtrip_cmp_family() {
        for text in ["cmp.eq", "cmp.neq", "cmp.lt", "cmp.lte", "cmp.gt", "cmp.gte"] {
            let op: Opcode = text.parse().unwrap();
            assert_eq!(op.to_string(), text);
        }
    }

    #[test]
    fn roundtrip_call_family() {
        for text in ["call", "call.int", "call.void", "call.string", "call.bool"] {
            let op: Opcode = text.parse().unwrap();
            assert_eq!(op.to_string(), text);
        }
    }

    #[test]
    fn roundtrip_closure_and_assert_families() {
        for text in ["closure.create", "closure.capture", "closure.bind"] {
            let op: Opcode = text.parse().unwrap();
            assert_eq!(op.to_string(), text);
        }
        for text in ["assert", "assert.eq", "assert.true", "assert.false"] {
            let op: Opcode = text.parse().unwrap();
            assert_eq!(op.to_string(), text);
        }
    }

    #[test]
    fn file_and_test_wildcards() {
        let op: Opcode = "file.open".parse().unwrap();
        assert_eq!(op, Opcode::File("open".to_string()));
        assert_eq!(op.to_string(), "file.open");

        let op: Opcode = "test.suite".parse().unwrap();
        assert_eq!(op, Opcode::Test("suite".to_string()));
        assert_eq!(op.to_string(), "test.suite");
    }

    #[test]
    fn unrecognized_opcode_is_an_error() {
        let err = "bogus".parse::<Opcode>().unwrap_err();
        assert_eq!(err.0, "bogus");
    }

    #[test]
    fn produces_value_classification() {
        assert!(Opcode::Const.produces_value());
        assert!(Opcode::Add.produces_value());
        assert!(!Opcode::Assign.produces_value());
        assert!(!Opcode::Free.produces_value());
        assert!(!Opcode::Test("suite".to_string()).produces_value());
        assert!(!Opcode::Assert(AssertOp::Eq).produces_value());
    }

    #[test]
    fn is_binary_like_classification() {
        assert!(Opcode::Add.is_binary_like());
        assert!(Opcode::Cmp(CmpKind::Eq).is_binary_like());
        assert!(Opcode::And.is_binary_like());
        assert!(!Opcode::Neg.is_binary_like());
        assert!(!Opcode::Const.is_binary_like());
    }
}
