//! The bit-exact JSON wire format.
//!
//! This is deliberately independent of the `#[derive(Serialize)]` impls on
//! [`Module`] and friends -- those derives exist for internal convenience
//! (e.g. `insta`'s JSON snapshot mode, caching a module to disk between CLI
//! invocations) and are free to evolve with the struct layout. The wire
//! format is a contract with a hypothetical native backend and keeps its own
//! fixed field names, spelled out explicitly here rather than inferred from
//! `serde(rename)` attributes scattered across the type definitions.

use serde_json::{json, Value};
use thiserror::Error;

use crate::block::BasicBlock;
use crate::function::{Function, Param};
use crate::id::ValueId;
use crate::instruction::Instruction;
use crate::module::Module;
use crate::opcode::{Opcode, UnsupportedOpcode};
use crate::operand::Operand;
use crate::terminator::{Terminator, TerminatorOp, UnsupportedTerminator};
use crate::types::{ParseTypeTagError, TypeTag};

/// Everything that can go wrong decoding a module from the wire format: a
/// malformed JSON shape, or a recognized-but-unsupported opcode/terminator/
/// type tag.
#[derive(Debug, Error)]
pub enum JsonError {
    #[error("malformed json: {0}")]
    Malformed(String),
    #[error(transparent)]
    Opcode(#[from] UnsupportedOpcode),
    #[error(transparent)]
    Terminator(#[from] UnsupportedTerminator),
    #[error(transparent)]
    TypeTag(#[from] ParseTypeTagError),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

fn field<'a>(value: &'a Value, name: &str) -> Result<&'a Value, JsonError> {
    value
        .get(name)
        .ok_or_else(|| JsonError::Malformed(format!("missing field '{name}'")))
}

fn as_str(value: &Value, name: &str) -> Result<String, JsonError> {
    field(value, name)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| JsonError::Malformed(format!("field '{name}' is not a string")))
}

fn as_array<'a>(value: &'a Value, name: &str) -> Result<&'a Vec<Value>, JsonError> {
    field(value, name)?
        .as_array()
        .ok_or_else(|| JsonError::Malformed(format!("field '{name}' is not an array")))
}

/// Encodes `module` to its wire form.
pub fn to_json(module: &Module) -> Value {
    json!({
        "functions": module.functions.iter().map(function_to_json).collect::<Vec<_>>(),
    })
}

fn function_to_json(function: &Function) -> Value {
    json!({
        "name": function.name,
        "return_type": function.return_type.to_string(),
        "params": function.params.iter().map(param_to_json).collect::<Vec<_>>(),
        "blocks": function.blocks.iter().map(block_to_json).collect::<Vec<_>>(),
    })
}

fn param_to_json(param: &Param) -> Value {
    json!({
        "name": param.name,
        "type": param.ty.to_string(),
        "id": param.id.0,
    })
}

fn block_to_json(block: &BasicBlock) -> Value {
    json!({
        "name": block.name,
        "instructions": block.instructions.iter().map(instruction_to_json).collect::<Vec<_>>(),
        "terminator": block.terminator.as_ref().map(terminator_to_json).unwrap_or(Value::Null),
    })
}

fn instruction_to_json(inst: &Instruction) -> Value {
    json!({
        "id": inst.id.0,
        "op": inst.op.to_string(),
        "inst_type": inst.ty.to_string(),
        "operands": inst.operands.iter().map(operand_to_json).collect::<Vec<_>>(),
    })
}

fn terminator_to_json(term: &Terminator) -> Value {
    json!({
        "op": term.op.to_string(),
        "operands": term.operands.iter().map(operand_to_json).collect::<Vec<_>>(),
    })
}

fn operand_to_json(operand: &Operand) -> Value {
    match operand {
        Operand::Value(id, ty) => json!({
            "kind": "value",
            "value": id.0,
            "operand_type": ty.to_string(),
        }),
        Operand::Literal(text, ty) => json!({
            "kind": "literal",
            "literal": text,
            "operand_type": ty.to_string(),
        }),
    }
}

/// Decodes a module from its wire form. Unknown top-level fields on any
/// object are ignored rather than rejected, so a future wire revision that
/// adds fields this decoder doesn't know about still parses.
pub fn from_json(value: &Value) -> Result<Module, JsonError> {
    let functions = as_array(value, "functions")?
        .iter()
        .map(function_from_json)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Module::new(functions))
}

fn function_from_json(value: &Value) -> Result<Function, JsonError> {
    let name = as_str(value, "name")?;
    let return_type: TypeTag = as_str(value, "return_type")?.parse()?;
    let params = as_array(value, "params")?
        .iter()
        .map(param_from_json)
        .collect::<Result<Vec<_>, _>>()?;
    let blocks = as_array(value, "blocks")?
        .iter()
        .map(block_from_json)
        .collect::<Result<Vec<_>, _>>()?;

    let next_value = params
        .iter()
        .map(|p| p.id.0)
        .max()
        .map(|m| m + 1)
        .unwrap_or(0);
    let mut function = Function::new(name, vec![], return_type);
    function.params = params;
    function.next_value = next_value;
    for block in blocks {
        function.push_block(block);
    }
    Ok(function)
}

fn param_from_json(value: &Value) -> Result<Param, JsonError> {
    let name = as_str(value, "name")?;
    let ty: TypeTag = as_str(value, "type")?.parse()?;
    let id = field(value, "id")?
        .as_u64()
        .ok_or_else(|| JsonError::Malformed("param 'id' is not an integer".to_string()))? as u32;
    Ok(Param { name, ty, id: ValueId(id) })
}

fn block_from_json(value: &Value) -> Result<BasicBlock, JsonError> {
    let name = as_str(value, "name")?;
    let instructions = as_array(value, "instructions")?
        .iter()
        .map(instruction_from_json)
        .collect::<Result<Vec<_>, _>>()?;
    // A missing or null terminator is not a wire-format error: the
    // verifier is the component responsible for catching it, so it
    // decodes to an unterminated block rather than a `JsonError`.
    let mut block = match value.get("terminator") {
        None | Some(Value::Null) => BasicBlock::unterminated(name),
        Some(term) => BasicBlock::new(name, terminator_from_json(term)?),
    };
    for inst in instructions {
        block.push(inst);
    }
    Ok(block)
}

fn instruction_from_json(value: &Value) -> Result<Instruction, JsonError> {
    let id = field(value, "id")?
        .as_u64()
        .ok_or_else(|| JsonError::Malformed("instruction 'id' is not an integer".to_string()))? as u32;
    let op: Opcode = as_str(value, "op")?.parse()?;
    let ty: TypeTag = as_str(value, "inst_type")?.parse()?;
    let operands = as_array(value, "operands")?
        .iter()
        .map(operand_from_json)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Instruction { id: ValueId(id), op, ty, operands })
}

fn terminator_from_json(value: &Value) -> Result<Terminator, JsonError> {
    let op: TerminatorOp = as_str(value, "op")?.parse()?;
    let operands = as_array(value, "operands")?
        .iter()
        .map(operand_from_json)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Terminator { op, operands })
}

fn operand_from_json(value: &Value) -> Result<Operand, JsonError> {
    let kind = as_str(value, "kind")?;
    let ty: TypeTag = as_str(value, "operand_type")?.parse()?;
    match kind.as_str() {
        "value" => {
            let id = field(value, "value")?
                .as_u64()
                .ok_or_else(|| JsonError::Malformed("operand 'value' is not an integer".to_string()))?
                as u32;
            Ok(Operand::Value(ValueId(id), ty))
        }
        "literal" => {
            let text = as_str(value, "literal")?;
            Ok(Operand::Literal(text, ty))
        }
        other => Err(JsonError::Malformed(format!("unrecognized operand kind '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminator::Terminator as Term;

    fn sample_module() -> Module {
        let mut f = Function::new("main", vec![("n".to_string(), TypeTag::Int)], TypeTag::Int);
        let v1 = f.next_value();
        let mut block = BasicBlock::new("entry", Term::ret_void());
        block.push(Instruction::producing(
            v1,
            Opcode::Add,
            TypeTag::Int,
            vec![Operand::value(ValueId(0), TypeTag::Int), Operand::literal("1", TypeTag::Int)],
        ));
        block.set_terminator(Term::ret(Operand::value(v1, TypeTag::Int)));
        f.push_block(block);
        Module::new(vec![f])
    }

    #[test]
    fn field_names_are_exact() {
        let encoded = to_json(&sample_module());
        let inst = &encoded["functions"][0]["blocks"][0]["instructions"][0];
        assert_eq!(inst["op"], "add");
        assert_eq!(inst["inst_type"], "int");
        assert_eq!(inst["operands"][0]["kind"], "value");
        assert_eq!(inst["operands"][1]["kind"], "literal");
        assert_eq!(inst["operands"][1]["literal"], "1");
    }

    #[test]
    fn invalid_value_id_encodes_as_u32_max() {
        let inst = Instruction::side_effecting(Opcode::Free, TypeTag::Void, vec![]);
        let encoded = instruction_to_json(&inst);
        assert_eq!(encoded["id"], u32::MAX as u64);
    }

    #[test]
    fn roundtrip_preserves_module() {
        let module = sample_module();
        let encoded = to_json(&module);
        let decoded = from_json(&encoded).unwrap();
        assert_eq!(decoded, module);
    }

    #[test]
    fn unknown_top_level_fields_are_ignored() {
        let mut encoded = to_json(&sample_module());
        encoded["functions"][0]["future_extension"] = json!("ignored");
        assert!(from_json(&encoded).is_ok());
    }

    #[test]
    fn unsupported_opcode_surfaces_as_json_error() {
        let mut encoded = to_json(&sample_module());
        encoded["functions"][0]["blocks"][0]["instructions"][0]["op"] = json!("bogus");
        let err = from_json(&encoded).unwrap_err();
        assert!(matches!(err, JsonError::Opcode(_)));
    }

    #[test]
    fn missing_terminator_decodes_rather_than_erroring() {
        // Catching this is the verifier's job, not the decoder's -- see
        // `verifier::tests::missing_terminator_is_caught`.
        let mut encoded = to_json(&sample_module());
        encoded["functions"][0]["blocks"][0]
            .as_object_mut()
            .unwrap()
            .remove("terminator");
        let decoded = from_json(&encoded).unwrap();
        assert_eq!(decoded.functions[0].blocks[0].terminator, None);
    }
}
