//! `std.time`: a minimal clock/zone intrinsic group, currently just
//! `zone_name`, which the `TZ` environment variable feeds into.

use crate::eval::StepResult;
use crate::value::RtResult;

pub fn dispatch(suffix: &str, args: &[RtResult]) -> Option<StepResult<RtResult>> {
    let _ = args;
    match suffix {
        "zone_name" => Some(Ok(zone_name())),
        _ => None,
    }
}

fn zone_name() -> RtResult {
    RtResult::string(std::env::var("TZ").unwrap_or_else(|_| "UTC".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_utc_without_tz() {
        std::env::remove_var("TZ");
        let r = dispatch("zone_name", &[]).unwrap().unwrap();
        assert_eq!(r.value, crate::value::RuntimeValue::Str("UTC".to_string()));
    }
}
