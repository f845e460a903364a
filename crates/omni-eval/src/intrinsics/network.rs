//! `std.network`: IP/URL parsing and validation, DNS lookups, and
//! placeholder HTTP verbs. `http_*` intentionally stop at a structured 501
//! response -- wiring a real client is out of scope
//! for this evaluator.

use std::net::{IpAddr, ToSocketAddrs};

use indexmap::IndexMap;

use crate::eval::StepResult;
use crate::value::{RtResult, RuntimeValue};

use super::arg_string;

pub fn dispatch(suffix: &str, args: &[RtResult]) -> Option<StepResult<RtResult>> {
    let name = format!("std.network.{suffix}");
    Some(match suffix {
        "ip_parse" => ip_parse(&name, args),
        "ip_is_valid" => ip_is_valid(&name, args),
        "ip_is_private" => ip_is_private(&name, args),
        "ip_is_loopback" => ip_is_loopback(&name, args),
        "ip_to_string" => ip_parse(&name, args),
        "url_parse" => url_parse(&name, args),
        "url_to_string" => url_parse(&name, args),
        "url_is_valid" => url_is_valid(&name, args),
        "dns_lookup" => dns_lookup(&name, args),
        "dns_reverse_lookup" => dns_reverse_lookup(&name, args),
        "http_get" => http_stub(&name, args),
        "http_post" => http_stub(&name, args),
        "http_put" => http_stub(&name, args),
        "http_delete" => http_stub(&name, args),
        _ => return None,
    })
}

fn parse_ip(args: &[RtResult], idx: usize) -> Option<IpAddr> {
    args.get(idx).and_then(|r| match &r.value {
        RuntimeValue::Str(s) => s.parse().ok(),
        _ => None,
    })
}

/// Returns the canonical string form of a valid IP, or an empty string.
fn ip_parse(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let text = arg_string(name, args, 0)?;
    let canonical = text.parse::<IpAddr>().map(|ip| ip.to_string()).unwrap_or_default();
    Ok(RtResult::string(canonical))
}

fn ip_is_valid(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let text = arg_string(name, args, 0)?;
    Ok(RtResult::bool_(text.parse::<IpAddr>().is_ok()))
}

fn ip_is_private(_name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let is_private = match parse_ip(args, 0) {
        Some(IpAddr::V4(v4)) => v4.is_private(),
        _ => false,
    };
    Ok(RtResult::bool_(is_private))
}

fn ip_is_loopback(_name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let is_loopback = parse_ip(args, 0).map(|ip| ip.is_loopback()).unwrap_or(false);
    Ok(RtResult::bool_(is_loopback))
}

/// Returns the canonical string form of a valid URL, or an empty string.
fn url_parse(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let text = arg_string(name, args, 0)?;
    let canonical = url::Url::parse(&text).map(|u| u.to_string()).unwrap_or_default();
    Ok(RtResult::string(canonical))
}

fn url_is_valid(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let text = arg_string(name, args, 0)?;
    Ok(RtResult::bool_(url::Url::parse(&text).is_ok()))
}

fn dns_lookup(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let host = arg_string(name, args, 0)?;
    let resolved = (host.as_str(), 0u16)
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .map(|addr| addr.ip().to_string())
        .unwrap_or_default();
    Ok(RtResult::string(resolved))
}

/// Stub: reverse DNS has no portable stdlib path and would require pulling
/// in an additional resolver dependency. Always returns an empty string.
fn dns_reverse_lookup(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let _ = arg_string(name, args, 0)?;
    Ok(RtResult::string(""))
}

fn http_stub(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let _ = arg_string(name, args, 0)?;
    let _ = name;
    let mut fields = IndexMap::new();
    fields.insert("status".to_string(), RuntimeValue::Int(501));
    fields.insert("body".to_string(), RuntimeValue::Str(String::new()));
    Ok(RtResult::new(omni_mir::TypeTag::Struct("HttpResponse".to_string()), RuntimeValue::Struct(fields)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ip_validity() {
        assert_eq!(dispatch("ip_is_valid", &[RtResult::string("127.0.0.1")]).unwrap().unwrap().value, RuntimeValue::Bool(true));
        assert_eq!(dispatch("ip_is_valid", &[RtResult::string("not an ip")]).unwrap().unwrap().value, RuntimeValue::Bool(false));
    }

    #[test]
    fn loopback_and_private() {
        assert_eq!(dispatch("ip_is_loopback", &[RtResult::string("127.0.0.1")]).unwrap().unwrap().value, RuntimeValue::Bool(true));
        assert_eq!(dispatch("ip_is_private", &[RtResult::string("10.0.0.5")]).unwrap().unwrap().value, RuntimeValue::Bool(true));
        assert_eq!(dispatch("ip_is_private", &[RtResult::string("8.8.8.8")]).unwrap().unwrap().value, RuntimeValue::Bool(false));
    }

    #[test]
    fn url_validity() {
        assert_eq!(
            dispatch("url_is_valid", &[RtResult::string("https://example.com/path")]).unwrap().unwrap().value,
            RuntimeValue::Bool(true)
        );
        assert_eq!(dispatch("url_is_valid", &[RtResult::string("not a url")]).unwrap().unwrap().value, RuntimeValue::Bool(false));
    }

    #[test]
    fn http_stub_returns_501() {
        let r = dispatch("http_get", &[RtResult::string("https://example.com")]).unwrap().unwrap();
        match r.value {
            RuntimeValue::Struct(fields) => assert_eq!(fields.get("status"), Some(&RuntimeValue::Int(501))),
            other => panic!("expected struct, got {other:?}"),
        }
    }
}
