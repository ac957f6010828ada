//! Pure global functions and the `Math` object.
//!
//! Everything here works on plain values only; functions that need the
//! evaluation context (`wiggle`, `loopOut`, `timeToFrames`, ...) live in the
//! interpreter.

use glam::Vec2;

use super::ast::BinaryOp;
use super::color::{hsl_to_rgb, rgb_to_hsl};
use super::value::Value;
use crate::animatable::Easing;
use crate::error::{LottieError, Result};

pub fn math_constant(name: &str) -> Option<f64> {
    use std::f64::consts;
    let c = match name {
        "PI" => consts::PI,
        "E" => consts::E,
        "LN2" => consts::LN_2,
        "LN10" => consts::LN_10,
        "LOG2E" => consts::LOG2_E,
        "LOG10E" => consts::LOG10_E,
        "SQRT2" => consts::SQRT_2,
        "SQRT1_2" => consts::FRAC_1_SQRT_2,
        _ => return None,
    };
    Some(c)
}

/// `Math.<name>(args)`. Returns `None` for unknown functions.
pub fn call_math(name: &str, args: &[Value]) -> Option<Result<Value>> {
    let context = format!("Math.{}", name);
    let num = |i: usize| -> Result<f64> {
        args.get(i)
            .map(|v| v.as_number(&context))
            .unwrap_or(Ok(f64::NAN))
    };
    let unary = |f: fn(f64) -> f64| -> Result<Value> { Ok(Value::Number(f(num(0)?))) };

    let result = match name {
        "abs" => unary(f64::abs),
        "floor" => unary(f64::floor),
        "ceil" => unary(f64::ceil),
        // JS rounds half up, towards positive infinity
        "round" => unary(|x| (x + 0.5).floor()),
        "trunc" => unary(f64::trunc),
        "sign" => unary(|x| if x == 0.0 || x.is_nan() { x } else { x.signum() }),
        "sqrt" => unary(f64::sqrt),
        "cbrt" => unary(f64::cbrt),
        "exp" => unary(f64::exp),
        "log" => unary(f64::ln),
        "log2" => unary(f64::log2),
        "log10" => unary(f64::log10),
        "sin" => unary(f64::sin),
        "cos" => unary(f64::cos),
        "tan" => unary(f64::tan),
        "asin" => unary(f64::asin),
        "acos" => unary(f64::acos),
        "atan" => unary(f64::atan),
        "atan2" => num(0).and_then(|y| num(1).map(|x| Value::Number(y.atan2(x)))),
        "pow" => num(0).and_then(|b| num(1).map(|e| Value::Number(b.powf(e)))),
        "hypot" => args
            .iter()
            .map(|v| v.as_number(&context))
            .try_fold(0.0, |acc, x| x.map(|x| acc + x * x))
            .map(|s: f64| Value::Number(s.sqrt())),
        "min" => fold_numbers(args, &context, f64::INFINITY, f64::min),
        "max" => fold_numbers(args, &context, f64::NEG_INFINITY, f64::max),
        _ => return None,
    };
    Some(result)
}

fn fold_numbers(args: &[Value], context: &str, init: f64, f: fn(f64, f64) -> f64) -> Result<Value> {
    let mut acc = init;
    for a in args {
        acc = f(acc, a.as_number(context)?);
    }
    Ok(Value::Number(acc))
}

/// Global helper functions. Returns `None` for unknown names.
pub fn call_global(name: &str, args: &[Value]) -> Option<Result<Value>> {
    let result = match name {
        "add" | "sum" | "$bm_sum" => binary(BinaryOp::Add, name, args),
        "sub" | "$bm_sub" => binary(BinaryOp::Sub, name, args),
        "mul" | "$bm_mul" => binary(BinaryOp::Mul, name, args),
        "div" | "$bm_div" => binary(BinaryOp::Div, name, args),
        "mod" | "$bm_mod" => binary(BinaryOp::Rem, name, args),
        "clamp" => clamp(args),
        "length" => length(args),
        "normalize" => normalize(args),
        "dot" => dot(args),
        "cross" => cross(args),
        "linear" => interpolate(name, Easing::LINEAR, args),
        "ease" => interpolate(name, ease_curve(EaseKind::InOut), args),
        "easeIn" => interpolate(name, ease_curve(EaseKind::In), args),
        "easeOut" => interpolate(name, ease_curve(EaseKind::Out), args),
        "hslToRgb" => color(name, args, hsl_to_rgb),
        "rgbToHsl" => color(name, args, rgb_to_hsl),
        "degreesToRadians" => scalar(name, args, f64::to_radians),
        "radiansToDegrees" => scalar(name, args, f64::to_degrees),
        _ => return None,
    };
    Some(result)
}

fn arg<'v>(args: &'v [Value], i: usize, function: &str) -> Result<&'v Value> {
    args.get(i).ok_or_else(|| {
        LottieError::type_mismatch("argument", "nothing", format!("{} argument {}", function, i + 1))
    })
}

fn binary(op: BinaryOp, name: &str, args: &[Value]) -> Result<Value> {
    Value::binary(op, arg(args, 0, name)?, arg(args, 1, name)?)
}

fn scalar(name: &str, args: &[Value], f: fn(f64) -> f64) -> Result<Value> {
    Ok(Value::Number(f(arg(args, 0, name)?.as_number(name)?)))
}

fn color(name: &str, args: &[Value], f: fn([f64; 4]) -> [f64; 4]) -> Result<Value> {
    let v = arg(args, 0, name)?.as_vector(name)?;
    if v.len() < 3 {
        return Err(LottieError::type_mismatch("3 or 4 components", "shorter vector", name));
    }
    let alpha = v.get(3).copied().unwrap_or(1.0);
    Ok(Value::Color(f([v[0], v[1], v[2], alpha])))
}

fn clamp(args: &[Value]) -> Result<Value> {
    let lo = arg(args, 1, "clamp")?.as_number("clamp")?;
    let hi = arg(args, 2, "clamp")?.as_number("clamp")?;
    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    match arg(args, 0, "clamp")? {
        Value::Vector(v) => Ok(Value::Vector(v.iter().map(|x| x.clamp(lo, hi)).collect())),
        other => Ok(Value::Number(other.as_number("clamp")?.clamp(lo, hi))),
    }
}

fn length(args: &[Value]) -> Result<Value> {
    let a = arg(args, 0, "length")?.as_vector("length")?;
    let v = match args.get(1) {
        Some(b) => {
            let b = b.as_vector("length")?;
            a.iter().zip(b.iter()).map(|(x, y)| x - y).collect()
        }
        None => a,
    };
    Ok(Value::Number(norm(&v)))
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

fn normalize(args: &[Value]) -> Result<Value> {
    let v = arg(args, 0, "normalize")?.as_vector("normalize")?;
    let n = norm(&v);
    if n == 0.0 {
        return Ok(Value::Vector(v));
    }
    Ok(Value::Vector(v.iter().map(|x| x / n).collect()))
}

fn dot(args: &[Value]) -> Result<Value> {
    let a = arg(args, 0, "dot")?.as_vector("dot")?;
    let b = arg(args, 1, "dot")?.as_vector("dot")?;
    Ok(Value::Number(a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()))
}

fn cross(args: &[Value]) -> Result<Value> {
    let pad = |v: Vec<f64>| [0, 1, 2].map(|i| v.get(i).copied().unwrap_or(0.0));
    let a = pad(arg(args, 0, "cross")?.as_vector("cross")?);
    let b = pad(arg(args, 1, "cross")?.as_vector("cross")?);
    Ok(Value::Vector(vec![
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]))
}

#[derive(Clone, Copy)]
enum EaseKind {
    In,
    Out,
    InOut,
}

fn ease_curve(kind: EaseKind) -> Easing {
    match kind {
        EaseKind::InOut => Easing::new(Vec2::new(0.33, 0.0), Vec2::new(0.67, 1.0)),
        EaseKind::In => Easing::new(Vec2::new(0.33, 0.0), Vec2::new(1.0, 1.0)),
        EaseKind::Out => Easing::new(Vec2::new(0.0, 0.0), Vec2::new(0.67, 1.0)),
    }
}

/// `f(t, v1, v2)` over `0..1` or `f(t, tMin, tMax, v1, v2)`.
fn interpolate(name: &str, easing: Easing, args: &[Value]) -> Result<Value> {
    let t = arg(args, 0, name)?.as_number(name)?;
    let (mut t_min, mut t_max, mut v1, mut v2) = match args.len() {
        3 => (0.0, 1.0, &args[1], &args[2]),
        n if n >= 5 => (
            args[1].as_number(name)?,
            args[2].as_number(name)?,
            &args[3],
            &args[4],
        ),
        n => {
            return Err(LottieError::type_mismatch(
                "3 or 5 arguments",
                "wrong argument count",
                format!("{} called with {}", name, n),
            ))
        }
    };
    if t_max < t_min {
        std::mem::swap(&mut t_min, &mut t_max);
        std::mem::swap(&mut v1, &mut v2);
    }
    if t <= t_min {
        return Ok(v1.clone());
    }
    if t >= t_max {
        return Ok(v2.clone());
    }
    let progress = easing.transform(((t - t_min) / (t_max - t_min)) as f32) as f64;
    let delta = Value::binary(BinaryOp::Sub, v2, v1)?;
    Value::binary(
        BinaryOp::Add,
        v1,
        &Value::binary(BinaryOp::Mul, &delta, &Value::Number(progress))?,
    )
}
