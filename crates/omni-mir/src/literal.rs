//! Shared literal-text parsing rules.
//!
//! Both the constant folder and `omni-eval`'s `const` dispatch need to parse
//! the same literal grammar, so the rules live here once: decimal, `0x`/`0X`
//! hex, `0b`/`0B` binary integers with `_` separators; exactly `true`/
//! `false` for booleans; double-quoted strings.

/// Parses an integer literal decimal, `0x`/`0X` hex, or `0b`/`0B`
/// binary, with `_` digit separators allowed anywhere in the digit run.
/// Accepts a leading `-` for decimal only (hex/binary literals are
/// unsigned bit patterns reinterpreted as `i64`).
pub fn parse_int_literal(text: &str) -> Option<i64> {
    let text = text.trim();
    let (neg, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let value = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        let cleaned: String = hex.chars().filter(|c| *c != '_').collect();
        if cleaned.is_empty() {
            return None;
        }
        i64::from_str_radix(&cleaned, 16).ok()?
    } else if let Some(bin) = rest.strip_prefix("0b").or_else(|| rest.strip_prefix("0B")) {
        let cleaned: String = bin.chars().filter(|c| *c != '_').collect();
        if cleaned.is_empty() {
            return None;
        }
        i64::from_str_radix(&cleaned, 2).ok()?
    } else {
        let cleaned: String = rest.chars().filter(|c| *c != '_').collect();
        if cleaned.is_empty() || !cleaned.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        cleaned.parse::<i64>().ok()?
    };

    Some(if neg { -value } else { value })
}

/// Parses a floating-point literal. Unlike integers, no alternate radix or
/// separator rules apply -- this is a thin, explicit wrapper so call sites
/// read consistently with [`parse_int_literal`].
pub fn parse_float_literal(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

/// Parses a boolean literal: must be exactly `true` or `false`.
pub fn parse_bool_literal(text: &str) -> Option<bool> {
    match text.trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Strips one layer of surrounding double quotes from a string literal, if
/// present; otherwise returns the text unchanged.
pub fn strip_string_literal(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_with_separators() {
        assert_eq!(parse_int_literal("1_000_000"), Some(1_000_000));
        assert_eq!(parse_int_literal("42"), Some(42));
        assert_eq!(parse_int_literal("-7"), Some(-7));
    }

    #[test]
    fn hex_and_binary() {
        assert_eq!(parse_int_literal("0x2A"), Some(42));
        assert_eq!(parse_int_literal("0X2a"), Some(42));
        assert_eq!(parse_int_literal("0b10_10"), Some(10));
        assert_eq!(parse_int_literal("0B1010"), Some(10));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_int_literal("abc"), None);
        assert_eq!(parse_int_literal(""), None);
        assert_eq!(parse_int_literal("0x"), None);
    }

    #[test]
    fn bool_is_exact() {
        assert_eq!(parse_bool_literal("true"), Some(true));
        assert_eq!(parse_bool_literal("false"), Some(false));
        assert_eq!(parse_bool_literal("True"), None);
        assert_eq!(parse_bool_literal("1"), None);
    }

    #[test]
    fn string_quote_stripping() {
        assert_eq!(strip_string_literal("\"hi\""), "hi");
        assert_eq!(strip_string_literal("hi"), "hi");
    }

    #[test]
    fn float_parsing() {
        assert_eq!(parse_float_literal("3.5"), Some(3.5));
        assert_eq!(parse_float_literal("nope"), None);
    }
}
