//! Type tags carried on values, parameters, and operands.
//!
//! [`TypeTag`] is a structural tag, not a full type system: the front end
//! (out of scope here) is authoritative on soundness. The verifier only
//! checks shape; the evaluator uses the tag to
//! decide which runtime representation and coercions apply.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A type tag, either a scalar/void/ptr primitive, a parameterized array or
/// map, a free-form struct tag, or the `<infer>` sentinel.
///
/// Renders to and parses from the canonical text form used by the printer
/// and by `Operand::Literal` / `const` parsing (`int`, `array<int>`,
/// `map<string,int>`, a bare struct name, `<infer>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTag {
    Int,
    Long,
    Byte,
    Float,
    Double,
    Bool,
    Char,
    String,
    Void,
    Ptr,
    Array(Box<TypeTag>),
    Map(Box<TypeTag>, Box<TypeTag>),
    /// A free-form, front-end-defined struct tag.
    Struct(String),
    /// Sentinel used where the front end has not yet determined a type.
    Infer,
}

impl TypeTag {
    /// Returns `true` for `int`, `long`, or `byte` — the tags the evaluator
    /// treats as wide signed integers.
    pub fn is_integer(&self) -> bool {
        matches!(self, TypeTag::Int | TypeTag::Long | TypeTag::Byte)
    }

    /// Returns `true` for `float` or `double`.
    pub fn is_floating(&self) -> bool {
        matches!(self, TypeTag::Float | TypeTag::Double)
    }

    /// Returns `true` for the `<infer>` sentinel.
    pub fn is_infer(&self) -> bool {
        matches!(self, TypeTag::Infer)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Int => write!(f, "int"),
            TypeTag::Long => write!(f, "long"),
            TypeTag::Byte => write!(f, "byte"),
            TypeTag::Float => write!(f, "float"),
            TypeTag::Double => write!(f, "double"),
            TypeTag::Bool => write!(f, "bool"),
            TypeTag::Char => write!(f, "char"),
            TypeTag::String => write!(f, "string"),
            TypeTag::Void => write!(f, "void"),
            TypeTag::Ptr => write!(f, "ptr"),
            TypeTag::Array(elem) => write!(f, "array<{}>", elem),
            TypeTag::Map(k, v) => write!(f, "map<{},{}>", k, v),
            TypeTag::Struct(name) => write!(f, "{}", name),
            TypeTag::Infer => write!(f, "<infer>"),
        }
    }
}

/// Error returned when a textual type tag cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid type tag: '{0}'")]
pub struct ParseTypeTagError(pub String);

impl FromStr for TypeTag {
    type Err = ParseTypeTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "int" => return Ok(TypeTag::Int),
            "long" => return Ok(TypeTag::Long),
            "byte" => return Ok(TypeTag::Byte),
            "float" => return Ok(TypeTag::Float),
            "double" => return Ok(TypeTag::Double),
            "bool" => return Ok(TypeTag::Bool),
            "char" => return Ok(TypeTag::Char),
            "string" => return Ok(TypeTag::String),
            "void" => return Ok(TypeTag::Void),
            "ptr" => return Ok(TypeTag::Ptr),
            "<infer>" | "" => return Ok(TypeTag::Infer),
            _ => {}
        }

        // array<T> or the []<T> alias.
        if let Some(inner) = s.strip_prefix("array<").and_then(|s| s.strip_suffix('>')) {
            let elem = inner.parse()?;
            return Ok(TypeTag::Array(Box::new(elem)));
        }
        if let Some(inner) = s.strip_prefix("[]<").and_then(|s| s.strip_suffix('>')) {
            let elem = inner.parse()?;
            return Ok(TypeTag::Array(Box::new(elem)));
        }

        // map<K,V> -- split on the top-level comma (K/V may themselves be
        // parameterized, so track bracket depth).
        if let Some(inner) = s.strip_prefix("map<").and_then(|s| s.strip_suffix('>')) {
            let mut depth = 0i32;
            let mut split_at = None;
            for (i, c) in inner.char_indices() {
                match c {
                    '<' => depth += 1,
                    '>' => depth -= 1,
                    ',' if depth == 0 => {
                        split_at = Some(i);
                        break;
                    }
                    _ => {}
                }
            }
            let split_at = split_at.ok_or_else(|| ParseTypeTagError(s.to_string()))?;
            let key = inner[..split_at].parse()?;
            let value = inner[split_at + 1..].parse()?;
            return Ok(TypeTag::Map(Box::new(key), Box::new(value)));
        }

        // Anything else is treated as a free-form struct tag. The verifier
        // does not type-check, so any non-empty identifier is accepted.
        if !s.is_empty() {
            return Ok(TypeTag::Struct(s.to_string()));
        }

        Err(ParseTypeTagError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_roundtrip() {
        for (text, tag) in [
            ("int", TypeTag::Int),
            ("long", TypeTag::Long),
            ("byte", TypeTag::Byte),
            ("float", TypeTag::Float),
            ("double", TypeTag::Double),
            ("bool", TypeTag::Bool),
            ("char", TypeTag::Char),
            ("string", TypeTag::String),
            ("void", TypeTag::Void),
            ("ptr", TypeTag::Ptr),
        ] {
            assert_eq!(text.parse::<TypeTag>().unwrap(), tag);
            assert_eq!(tag.to_string(), text);
        }
    }

    #[test]
    fn infer_sentinel() {
        assert_eq!("<infer>".parse::<TypeTag>().unwrap(), TypeTag::Infer);
        assert!(TypeTag::Infer.is_infer());
    }

    #[test]
    fn array_and_alias() {
        assert_eq!(
            "array<int>".parse::<TypeTag>().unwrap(),
            TypeTag::Array(Box::new(TypeTag::Int))
        );
        assert_eq!(
            "[]<int>".parse::<TypeTag>().unwrap(),
            TypeTag::Array(Box::new(TypeTag::Int))
        );
        assert_eq!(TypeTag::Array(Box::new(TypeTag::Int)).to_string(), "array<int>");
    }

    #[test]
    fn map_nested() {
        let tag: TypeTag = "map<string,array<int>>".parse().unwrap();
        assert_eq!(
            tag,
            TypeTag::Map(Box::new(TypeTag::String), Box::new(TypeTag::Array(Box::new(TypeTag::Int))))
        );
        assert_eq!(tag.to_string(), "map<string,array<int>>");
    }

    #[test]
    fn struct_tag_is_free_form() {
        let tag: TypeTag = "Point".parse().unwrap();
        assert_eq!(tag, TypeTag::Struct("Point".to_string()));
        assert_eq!(tag.to_string(), "Point");
    }

    #[test]
    fn integer_and_floating_classification() {
        assert!(TypeTag::Int.is_integer());
        assert!(TypeTag::Long.is_integer());
        assert!(TypeTag::Byte.is_integer());
        assert!(!TypeTag::Float.is_integer());
        assert!(TypeTag::Float.is_floating());
        assert!(TypeTag::Double.is_floating());
    }

    #[test]
    fn serde_roundtrip() {
        let tag = TypeTag::Map(Box::new(TypeTag::Int), Box::new(TypeTag::String));
        let json = serde_json::to_string(&tag).unwrap();
        let back: TypeTag = serde_json::from_str(&json).unwrap();
        assert_eq!(tag, back);
    }
}
