//! `std.math`: pure numeric intrinsics, deterministic in their
//! arguments alone.

use crate::eval::StepResult;
use crate::value::{render_canonical, RtResult};

use super::{arg_float, arg_int, missing_arg};

pub fn dispatch(suffix: &str, args: &[RtResult]) -> Option<StepResult<RtResult>> {
    let name = format!("std.math.{suffix}");
    Some(match suffix {
        "max" => two_ints(&name, args, i64::max),
        "min" => two_ints(&name, args, i64::min),
        "abs" => one_int(&name, args, i64::abs),
        "pow" => pow(&name, args),
        "gcd" => two_ints(&name, args, gcd),
        "lcm" => two_ints(&name, args, lcm),
        "factorial" => factorial(&name, args),
        "sqrt" => sqrt(&name, args),
        "is_prime" => is_prime(&name, args),
        "max_float" => two_floats(&name, args, f64::max),
        "min_float" => two_floats(&name, args, f64::min),
        "abs_float" => one_float(&name, args, f64::abs),
        "toString" => to_string(&name, args),
        _ => return None,
    })
}

fn two_ints(name: &str, args: &[RtResult], f: impl Fn(i64, i64) -> i64) -> StepResult<RtResult> {
    let a = arg_int(name, args, 0)?;
    let b = arg_int(name, args, 1)?;
    Ok(RtResult::int(f(a, b)))
}

fn one_int(name: &str, args: &[RtResult], f: impl Fn(i64) -> i64) -> StepResult<RtResult> {
    let a = arg_int(name, args, 0)?;
    Ok(RtResult::int(f(a)))
}

fn two_floats(name: &str, args: &[RtResult], f: impl Fn(f64, f64) -> f64) -> StepResult<RtResult> {
    let a = arg_float(name, args, 0)?;
    let b = arg_float(name, args, 1)?;
    Ok(RtResult::float(f(a, b)))
}

fn one_float(name: &str, args: &[RtResult], f: impl Fn(f64) -> f64) -> StepResult<RtResult> {
    let a = arg_float(name, args, 0)?;
    Ok(RtResult::float(f(a)))
}

fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

fn lcm(a: i64, b: i64) -> i64 {
    let g = gcd(a, b);
    if g == 0 {
        0
    } else {
        (a / g).abs() * b.abs()
    }
}

fn pow(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let base = arg_int(name, args, 0)?;
    let exp = arg_int(name, args, 1)?;
    if exp < 0 {
        return Ok(RtResult::int(0));
    }
    Ok(RtResult::int(base.wrapping_pow(exp as u32)))
}

/// Negative input returns 0 rather than erroring.
fn factorial(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let n = arg_int(name, args, 0)?;
    if n < 0 {
        return Ok(RtResult::int(0));
    }
    let mut acc: i64 = 1;
    for i in 2..=n {
        acc = acc.wrapping_mul(i);
    }
    Ok(RtResult::int(acc))
}

/// Integer floor of the square root; negative input returns 0.
fn sqrt(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let n = arg_int(name, args, 0)?;
    if n < 0 {
        return Ok(RtResult::int(0));
    }
    Ok(RtResult::int((n as f64).sqrt().floor() as i64))
}

fn is_prime(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let n = arg_int(name, args, 0)?;
    Ok(RtResult::bool_(is_prime_num(n)))
}

fn is_prime_num(n: i64) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 {
        return false;
    }
    let mut i = 3i64;
    while i * i <= n {
        if n % i == 0 {
            return false;
        }
        i += 2;
    }
    true
}

fn to_string(name: &str, args: &[RtResult]) -> StepResult<RtResult> {
    let v = args.get(0).ok_or_else(|| missing_arg(name, 0, args.len()))?;
    Ok(RtResult::string(render_canonical(&v.value)))
}
