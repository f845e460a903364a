//! `std.string`: pure string intrinsics.

use omni_mir::TypeTag;

use crate::eval::StepResult;
use crate::value::{RtResult, RuntimeValue};

use super::{arg_int, arg_string};

pub fn dispatch(suffix: &str, args: &[RtResult]) -> Option<StepResult<RtResult>> {
    let name = format!("std.string.{suffix}");
    Some(match suffix {
        "length" => length(&name, args),
        "concat" => concat(&name, args),
        "substring" => substring(&name, args),
        "char_at" => char_at(&name, args),
        "starts_with" => starts_with(&name, args),
        "ends_with" => ends_with(&name, args),
        "contains" => contains(&name, args),
        "index_of" => index_of(&name, args),
        "last_index_of" => last_index_of(&name, args),
        "trim" => trim(&name, args),
        "to_upper" => to_upper(&name, args),
        "to_lower" => to_lower(&name, args),
        "equals" => equals(&name, args),
        "compare" => compare(&name, args),
        _ => return None,
    })
}

fn length(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let s = arg_string(name, args, 0)?;
    Ok(RtResult::int(s.chars().count() as i64))
}

fn concat(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let a = arg_string(name, args, 0)?;
    let b = arg_string(name, args, 1)?;
    Ok(RtResult::string(format!("{a}{b}")))
}

/// Clamps to an empty string on any invalid range rather than
/// erroring: `start < 0`, `end` past the string, or `start >= end`.
fn substring(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let s = arg_string(name, args, 0)?;
    let start = arg_int(name, args, 1)?;
    let end = arg_int(name, args, 2)?;
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;
    if start < 0 || end > len || start >= end {
        return Ok(RtResult::string(""));
    }
    Ok(RtResult::string(chars[start as usize..end as usize].iter().collect::<String>()))
}

/// Out-of-range index returns a space character, not an error.
fn char_at(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let s = arg_string(name, args, 0)?;
    let idx = arg_int(name, args, 1)?;
    let c = if idx < 0 {
        ' '
    } else {
        s.chars().nth(idx as usize).unwrap_or(' ')
    };
    Ok(RtResult::new(TypeTag::Char, RuntimeValue::Char(c)))
}

fn starts_with(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let s = arg_string(name, args, 0)?;
    let prefix = arg_string(name, args, 1)?;
    Ok(RtResult::bool_(s.starts_with(&prefix)))
}

fn ends_with(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let s = arg_string(name, args, 0)?;
    let suffix = arg_string(name, args, 1)?;
    Ok(RtResult::bool_(s.ends_with(&suffix)))
}

fn contains(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let s = arg_string(name, args, 0)?;
    let needle = arg_string(name, args, 1)?;
    Ok(RtResult::bool_(s.contains(&needle)))
}

fn index_of(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let s = arg_string(name, args, 0)?;
    let needle = arg_string(name, args, 1)?;
    let idx = match s.find(&needle) {
        Some(byte_idx) => s[..byte_idx].chars().count() as i64,
        None => -1,
    };
    Ok(RtResult::int(idx))
}

fn last_index_of(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let s = arg_string(name, args, 0)?;
    let needle = arg_string(name, args, 1)?;
    let idx = match s.rfind(&needle) {
        Some(byte_idx) => s[..byte_idx].chars().count() as i64,
        None => -1,
    };
    Ok(RtResult::int(idx))
}

fn trim(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let s = arg_string(name, args, 0)?;
    Ok(RtResult::string(s.trim().to_string()))
}

fn to_upper(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let s = arg_string(name, args, 0)?;
    Ok(RtResult::string(s.to_uppercase()))
}

fn to_lower(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let s = arg_string(name, args, 0)?;
    Ok(RtResult::string(s.to_lowercase()))
}

fn equals(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let a = arg_string(name, args, 0)?;
    let b = arg_string(name, args, 1)?;
    Ok(RtResult::bool_(a == b))
}

fn compare(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let a = arg_string(name, args, 0)?;
    let b = arg_string(name, args, 1)?;
    let ord = match a.cmp(&b) {
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
        std::cmp::Ordering::Greater => 1,
    };
    Ok(RtResult::int(ord))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_clamps_invalid_ranges() {
        let args = [RtResult::string("hello"), RtResult::int(3), RtResult::int(1)];
        let r = dispatch("substring", &args).unwrap().unwrap();
        assert_eq!(r.value, RuntimeValue::Str(String::new()));
    }

    #[test]
    fn substring_normal_range() {
        let args = [RtResult::string("hello"), RtResult::int(1), RtResult::int(4)];
        let r = dispatch("substring", &args).unwrap().unwrap();
        assert_eq!(r.value, RuntimeValue::Str("ell".to_string()));
    }

    #[test]
    fn char_at_out_of_range_is_space() {
        let args = [RtResult::string("hi"), RtResult::int(99)];
        let r = dispatch("char_at", &args).unwrap().unwrap();
        assert_eq!(r.value, RuntimeValue::Char(' '));
    }

    #[test]
    fn index_of_missing_needle() {
        let args = [RtResult::string("hello"), RtResult::string("z")];
        let r = dispatch("index_of", &args).unwrap().unwrap();
        assert_eq!(r.value, RuntimeValue::Int(-1));
    }

    #[test]
    fn compare_orders_lexically() {
        let args = [RtResult::string("a"), RtResult::string("b")];
        let r = dispatch("compare", &args).unwrap().unwrap();
        assert_eq!(r.value, RuntimeValue::Int(-1));
    }
}
