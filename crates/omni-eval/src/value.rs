//! Runtime values and the `{type, value}` pair the evaluator hands back for
//! every executed instruction and function return.

use indexmap::IndexMap;
use omni_mir::TypeTag;

use crate::promise::PromiseId;

/// A key usable in a runtime `map<K,V>`. Floats are excluded deliberately --
/// a `map<float,_>` key is coerced to its canonical string form instead, the
/// same way `strcat` canonicalizes numeric operands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Int(i64),
    Str(String),
    Bool(bool),
    Char(char),
}

impl MapKey {
    pub fn from_value(value: &RuntimeValue) -> MapKey {
        match value {
            RuntimeValue::Int(i) => MapKey::Int(*i),
            RuntimeValue::Bool(b) => MapKey::Bool(*b),
            RuntimeValue::Char(c) => MapKey::Char(*c),
            other => MapKey::Str(render_canonical(other)),
        }
    }
}

/// A closure value: the function it dispatches to plus whatever it has
/// captured so far.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosureValue {
    pub function: String,
    pub captured: IndexMap<String, RuntimeValue>,
}

/// The heterogeneous runtime value a `Result` carries. `RtResult::ty` is a display tag, not authoritative --
/// this enum's own shape is what every dispatch rule actually inspects.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Char(char),
    Bytes(Vec<u8>),
    Array(Vec<RuntimeValue>),
    Map(IndexMap<MapKey, RuntimeValue>),
    Struct(IndexMap<String, RuntimeValue>),
    Closure(ClosureValue),
    Promise(PromiseId),
    Null,
}

impl RuntimeValue {
    pub fn is_truthy(&self) -> bool {
        match self {
            RuntimeValue::Bool(b) => *b,
            RuntimeValue::Int(i) => *i != 0,
            RuntimeValue::Float(f) => *f != 0.0,
            RuntimeValue::Str(s) => !s.is_empty(),
            RuntimeValue::Null => false,
            _ => true,
        }
    }
}

/// Renders a value the way `strcat` and `std.io.print*` do: no quoting, no
/// escaping, just the canonical surface form of a scalar.
pub fn render_canonical(value: &RuntimeValue) -> String {
    match value {
        RuntimeValue::Int(i) => i.to_string(),
        RuntimeValue::Float(f) => f.to_string(),
        RuntimeValue::Bool(b) => b.to_string(),
        RuntimeValue::Str(s) => s.clone(),
        RuntimeValue::Char(c) => c.to_string(),
        RuntimeValue::Null => "null".to_string(),
        RuntimeValue::Bytes(b) => format!("<bytes:{}>", b.len()),
        RuntimeValue::Array(items) => {
            let rendered: Vec<String> = items.iter().map(render_canonical).collect();
            format!("[{}]", rendered.join(","))
        }
        RuntimeValue::Map(_) => "<map>".to_string(),
        RuntimeValue::Struct(_) => "<struct>".to_string(),
        RuntimeValue::Closure(c) => format!("<closure:{}>", c.function),
        RuntimeValue::Promise(id) => format!("<promise:{}>", id),
    }
}

/// A typed result, as returned from every instruction and function call.
#[derive(Debug, Clone, PartialEq)]
pub struct RtResult {
    pub ty: TypeTag,
    pub value: RuntimeValue,
}

impl RtResult {
    pub fn new(ty: TypeTag, value: RuntimeValue) -> Self {
        RtResult { ty, value }
    }

    pub fn void() -> Self {
        RtResult::new(TypeTag::Void, RuntimeValue::Null)
    }

    pub fn int(v: i64) -> Self {
        RtResult::new(TypeTag::Int, RuntimeValue::Int(v))
    }

    pub fn float(v: f64) -> Self {
        RtResult::new(TypeTag::Double, RuntimeValue::Float(v))
    }

    pub fn bool_(v: bool) -> Self {
        RtResult::new(TypeTag::Bool, RuntimeValue::Bool(v))
    }

    pub fn string(v: impl Into<String>) -> Self {
        RtResult::new(TypeTag::String, RuntimeValue::Str(v.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_spec() {
        assert!(RuntimeValue::Int(3).is_truthy());
        assert!(!RuntimeValue::Int(0).is_truthy());
        assert!(!RuntimeValue::Null.is_truthy());
        assert!(RuntimeValue::Bool(true).is_truthy());
    }

    #[test]
    fn canonical_render_for_strcat() {
        assert_eq!(render_canonical(&RuntimeValue::Int(42)), "42");
        assert_eq!(render_canonical(&RuntimeValue::Bool(true)), "true");
    }

    #[test]
    fn map_key_from_int_and_string() {
        assert_eq!(MapKey::from_value(&RuntimeValue::Int(5)), MapKey::Int(5));
        assert_eq!(
            MapKey::from_value(&RuntimeValue::Str("k".to_string())),
            MapKey::Str("k".to_string())
        );
    }
}
