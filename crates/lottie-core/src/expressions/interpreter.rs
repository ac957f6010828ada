use std::collections::HashMap;

use super::ast::{BinaryOp, Expr, Stmt, Target, UnaryOp};
use super::builtins;
use super::value::{Reference, TransformChannel, Value};
use super::wiggle::WiggleState;
use super::{EvalContext, Expression, LoopType, PropertySource, Selector};
use crate::error::{LookupKind, LottieError, Result};

const RESULT_VAR: &str = "$bm_rt";
// seconds, for velocityAtTime
const VELOCITY_STEP: f64 = 0.001;

enum Flow {
    Normal,
    Return(Value),
}

/// Tree-walking evaluator for one run of an [`Expression`].
pub struct Interpreter<'a> {
    expr: &'a Expression,
    property: &'a dyn PropertySource,
    ctx: &'a EvalContext<'a>,
    scope: HashMap<String, Value>,
    last: Option<Value>,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        expr: &'a Expression,
        property: &'a dyn PropertySource,
        ctx: &'a EvalContext<'a>,
    ) -> Self {
        Self {
            expr,
            property,
            ctx,
            scope: HashMap::new(),
            last: None,
        }
    }

    pub fn run(mut self) -> Result<Value> {
        let expr = self.expr;
        let mut returned = None;
        for stmt in &expr.program().body {
            if let Flow::Return(v) = self.exec(stmt)? {
                returned = Some(v);
                break;
            }
        }
        let result = match returned {
            Some(v) => v,
            None => match self.scope.remove(RESULT_VAR).or(self.last.take()) {
                Some(v) => v,
                None => self.current_value(),
            },
        };
        self.deref(result)
    }

    fn frame_rate(&self) -> f64 {
        self.ctx.host.frame_rate() as f64
    }

    fn to_frame(&self, seconds: f64) -> Result<f32> {
        if !seconds.is_finite() {
            return Err(LottieError::type_mismatch("finite time", "number", "time argument"));
        }
        Ok((seconds * self.frame_rate()) as f32)
    }

    fn current_value(&self) -> Value {
        self.property.value_at(self.ctx.frame)
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Let(bindings) => {
                for (name, init) in bindings {
                    if let Some(init) = init {
                        let v = self.eval_value(init)?;
                        self.scope.insert(name.clone(), v);
                    }
                }
            }
            Stmt::Assign { target, op, value } => {
                let rhs = self.eval_value(value)?;
                self.assign(target, *op, rhs)?;
            }
            Stmt::Expr(e) => {
                let v = self.eval(e)?;
                self.last = Some(v);
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                let c = self.eval_value(cond)?;
                if c.truthy() {
                    return self.exec(then);
                } else if let Some(otherwise) = otherwise {
                    return self.exec(otherwise);
                }
            }
            Stmt::Block(body) => {
                for s in body {
                    if let Flow::Return(v) = self.exec(s)? {
                        return Ok(Flow::Return(v));
                    }
                }
            }
            Stmt::Return(e) => {
                let v = match e {
                    Some(e) => self.eval_value(e)?,
                    None => self.current_value(),
                };
                return Ok(Flow::Return(v));
            }
        }
        Ok(Flow::Normal)
    }

    fn assign(&mut self, target: &Target, op: Option<BinaryOp>, rhs: Value) -> Result<()> {
        match target {
            Target::Var(name) => {
                let v = match op {
                    Some(op) => {
                        let current = self
                            .scope
                            .get(name)
                            .ok_or_else(|| LottieError::lookup(LookupKind::Variable, name))?;
                        Value::binary(op, current, &rhs)?
                    }
                    None => rhs,
                };
                self.scope.insert(name.clone(), v);
            }
            Target::Element(name, idx) => {
                let i = self.eval_value(idx)?.as_number("element assignment")?;
                let current = self
                    .scope
                    .get(name)
                    .cloned()
                    .ok_or_else(|| LottieError::lookup(LookupKind::Variable, name))?;
                let mut comps = current.as_vector(name)?;
                if i < 0.0 || i as usize >= comps.len() {
                    return Err(LottieError::type_mismatch(
                        "index in range",
                        "out of range",
                        format!("{}[{}]", name, i),
                    ));
                }
                let slot = i as usize;
                let rhs = rhs.as_number("element assignment")?;
                comps[slot] = match op {
                    Some(op) => Value::binary(op, &Value::Number(comps[slot]), &Value::Number(rhs))?
                        .as_number("element assignment")?,
                    None => rhs,
                };
                self.scope.insert(name.clone(), Value::Vector(comps));
            }
        }
        Ok(())
    }

    /// Evaluates and resolves property references to their values.
    fn eval_value(&mut self, e: &Expr) -> Result<Value> {
        let v = self.eval(e)?;
        self.deref(v)
    }

    fn eval(&mut self, e: &Expr) -> Result<Value> {
        match e {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::String(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Array(items) => {
                let mut comps = Vec::with_capacity(items.len());
                for item in items {
                    comps.push(self.eval_value(item)?.as_number("array element")?);
                }
                Ok(Value::Vector(comps))
            }
            Expr::Ident(name) => self.identifier(name),
            Expr::Member(base, name) => {
                let base = self.eval(base)?;
                self.member(base, name)
            }
            Expr::Index(base, idx) => {
                let base = self.eval_value(base)?;
                let idx = self.eval_value(idx)?;
                base.index(&idx)
            }
            Expr::Call(callee, args) => self.call(callee, args),
            Expr::Unary(op, operand) => {
                let v = self.eval_value(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!v.truthy())),
                    UnaryOp::Plus => Ok(Value::Number(v.as_number("unary +")?)),
                    UnaryOp::Neg => match v {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        Value::Bool(_) => Ok(Value::Number(-v.as_number("unary -")?)),
                        Value::Vector(_) | Value::Color(_) => {
                            Value::binary(BinaryOp::Mul, &v, &Value::Number(-1.0))
                        }
                        other => Err(LottieError::type_mismatch(
                            "number or vector",
                            other.type_name(),
                            "unary -",
                        )),
                    },
                }
            }
            Expr::Binary(BinaryOp::And, lhs, rhs) => {
                let l = self.eval_value(lhs)?;
                if !l.truthy() {
                    return Ok(l);
                }
                self.eval_value(rhs)
            }
            Expr::Binary(BinaryOp::Or, lhs, rhs) => {
                let l = self.eval_value(lhs)?;
                if l.truthy() {
                    return Ok(l);
                }
                self.eval_value(rhs)
            }
            Expr::Binary(op, lhs, rhs) => {
                let l = self.eval_value(lhs)?;
                let r = self.eval_value(rhs)?;
                Value::binary(*op, &l, &r)
            }
            Expr::Conditional(cond, then, otherwise) => {
                if self.eval_value(cond)?.truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
        }
    }

    fn identifier(&self, name: &str) -> Result<Value> {
        if let Some(v) = self.scope.get(name) {
            return Ok(v.clone());
        }
        let ctx = self.ctx;
        let host = ctx.host;
        let seconds = |frames: f32| Value::Number(frames as f64 / self.frame_rate());
        let v = match name {
            "time" => Value::Number(ctx.time()),
            "value" => self.current_value(),
            "thisComp" => Value::Reference(Reference::Comp),
            "thisLayer" => Value::Reference(Reference::Layer(ctx.layer)),
            "thisProperty" => Value::Reference(Reference::ThisProperty),
            "transform" => Value::Reference(Reference::Transform(ctx.layer)),
            "Math" => Value::Reference(Reference::Math),
            "index" => Value::Number(host.layer_index(ctx.layer) as f64),
            "numKeys" => Value::Number(self.property.key_times().len() as f64),
            "inPoint" => seconds(host.layer_timing(ctx.layer).0),
            "outPoint" => seconds(host.layer_timing(ctx.layer).1),
            "startTime" => seconds(host.layer_timing(ctx.layer).2),
            _ => match TransformChannel::from_name(name) {
                Some(ch) => Value::Reference(Reference::Channel(ctx.layer, ch)),
                None => return Err(LottieError::lookup(LookupKind::Variable, name)),
            },
        };
        Ok(v)
    }

    fn member(&self, base: Value, name: &str) -> Result<Value> {
        let host = self.ctx.host;
        let unknown = || Err(LottieError::lookup(LookupKind::Property, name));
        let seconds = |frames: f32| Value::Number(frames as f64 / self.frame_rate());
        match base {
            Value::Reference(Reference::Comp) => {
                let (w, h) = host.size();
                let v = match name {
                    "width" => w as f64,
                    "height" => h as f64,
                    "numLayers" => host.layer_count() as f64,
                    "frameDuration" => 1.0 / self.frame_rate(),
                    "duration" => host.duration_frames() as f64 / self.frame_rate(),
                    _ => return unknown(),
                };
                Ok(Value::Number(v))
            }
            Value::Reference(Reference::Layer(l)) => match name {
                "name" => Ok(Value::String(host.layer_name(l).to_string())),
                "index" => Ok(Value::Number(host.layer_index(l) as f64)),
                "transform" => Ok(Value::Reference(Reference::Transform(l))),
                "inPoint" => Ok(seconds(host.layer_timing(l).0)),
                "outPoint" => Ok(seconds(host.layer_timing(l).1)),
                "startTime" => Ok(seconds(host.layer_timing(l).2)),
                _ => match TransformChannel::from_name(name) {
                    Some(ch) => Ok(Value::Reference(Reference::Channel(l, ch))),
                    None => unknown(),
                },
            },
            Value::Reference(Reference::Transform(l)) => match TransformChannel::from_name(name) {
                Some(ch) => Ok(Value::Reference(Reference::Channel(l, ch))),
                None => unknown(),
            },
            Value::Reference(
                r @ (Reference::Channel(..) | Reference::EffectParam(..) | Reference::ThisProperty),
            ) => match name {
                "value" => self.deref(Value::Reference(r)),
                "numKeys" if r == Reference::ThisProperty => {
                    Ok(Value::Number(self.property.key_times().len() as f64))
                }
                _ => unknown(),
            },
            Value::Reference(Reference::Math) => match builtins::math_constant(name) {
                Some(c) => Ok(Value::Number(c)),
                None => unknown(),
            },
            Value::Vector(v) if name == "length" => Ok(Value::Number(v.len() as f64)),
            Value::Color(_) if name == "length" => Ok(Value::Number(4.0)),
            Value::String(s) if name == "length" => Ok(Value::Number(s.chars().count() as f64)),
            _ => unknown(),
        }
    }

    fn eval_args(&mut self, args: &[Expr]) -> Result<Vec<Value>> {
        args.iter().map(|a| self.eval_value(a)).collect()
    }

    fn call(&mut self, callee: &Expr, args: &[Expr]) -> Result<Value> {
        match callee {
            Expr::Member(base, method) => {
                let base = self.eval(base)?;
                let args = self.eval_args(args)?;
                self.call_method(base, method, &args)
            }
            Expr::Ident(name) if !self.scope.contains_key(name) => {
                let args = self.eval_args(args)?;
                self.call_global(name, &args)
            }
            other => {
                let target = self.eval(other)?;
                let args = self.eval_args(args)?;
                match target {
                    // effect("Controls")("Slider")
                    Value::Reference(Reference::Effect(l, e)) => self.effect_param(l, e, &args),
                    other => Err(LottieError::type_mismatch(
                        "function",
                        other.type_name(),
                        "call",
                    )),
                }
            }
        }
    }

    fn call_global(&mut self, name: &str, args: &[Value]) -> Result<Value> {
        let ctx = self.ctx;
        match name {
            "wiggle" | "loopOut" | "loopIn" | "valueAtTime" | "velocityAtTime" => {
                self.call_method(Value::Reference(Reference::ThisProperty), name, args)
            }
            "effect" => self.call_method(Value::Reference(Reference::Layer(ctx.layer)), name, args),
            "timeToFrames" => {
                let t = match args.first() {
                    Some(t) => t.as_number(name)?,
                    None => ctx.time(),
                };
                let fps = match args.get(1) {
                    Some(f) => f.as_number(name)?,
                    None => self.frame_rate(),
                };
                Ok(Value::Number(t * fps))
            }
            "framesToTime" => {
                let f = args
                    .first()
                    .ok_or_else(|| {
                        LottieError::type_mismatch("argument", "nothing", "framesToTime")
                    })?
                    .as_number(name)?;
                let fps = match args.get(1) {
                    Some(fps) => fps.as_number(name)?,
                    None => self.frame_rate(),
                };
                Ok(Value::Number(f / fps))
            }
            _ => builtins::call_global(name, args)
                .unwrap_or_else(|| Err(LottieError::lookup(LookupKind::Function, name))),
        }
    }

    fn call_method(&mut self, base: Value, method: &str, args: &[Value]) -> Result<Value> {
        let host = self.ctx.host;
        let unknown = || Err(LottieError::lookup(LookupKind::Function, method));
        match base {
            Value::Reference(Reference::Math) => builtins::call_math(method, args)
                .unwrap_or_else(|| Err(LottieError::lookup(LookupKind::Function, method))),
            Value::Reference(Reference::Comp) if method == "layer" => {
                let sel = selector(args, "layer")?;
                let slot = match &sel {
                    Selector::Name(n) => host.layer_by_name(n),
                    Selector::Index(i) => host.layer_by_index(*i),
                };
                slot.map(|l| Value::Reference(Reference::Layer(l)))
                    .ok_or_else(|| LottieError::lookup(LookupKind::Layer, sel.describe()))
            }
            Value::Reference(Reference::Layer(l)) if method == "effect" => {
                let sel = selector(args, "effect")?;
                host.effect(l, &sel)
                    .map(|e| Value::Reference(Reference::Effect(l, e)))
                    .ok_or_else(|| LottieError::lookup(LookupKind::Effect, sel.describe()))
            }
            Value::Reference(Reference::Effect(l, e)) if method == "param" => {
                self.effect_param(l, e, args)
            }
            Value::Reference(
                r @ (Reference::Channel(..) | Reference::EffectParam(..) | Reference::ThisProperty),
            ) => self.property_method(r, method, args),
            _ => unknown(),
        }
    }

    fn effect_param(&self, layer: usize, effect: usize, args: &[Value]) -> Result<Value> {
        let sel = selector(args, "effect parameter")?;
        self.ctx
            .host
            .effect_param(layer, effect, &sel)
            .map(|p| Value::Reference(Reference::EffectParam(layer, effect, p)))
            .ok_or_else(|| LottieError::lookup(LookupKind::Property, sel.describe()))
    }

    fn property_method(&mut self, r: Reference, method: &str, args: &[Value]) -> Result<Value> {
        let num = |i: usize, default: f64| -> Result<f64> {
            match args.get(i) {
                Some(v) => v.as_number(method),
                None => Ok(default),
            }
        };
        match method {
            "valueAtTime" => {
                let t = num(0, self.ctx.time())?;
                self.property_at(r, self.to_frame(t)?)
            }
            "velocityAtTime" => {
                let t = num(0, self.ctx.time())?;
                let a = self.property_at(r, self.to_frame(t)?)?;
                let b = self.property_at(r, self.to_frame(t + VELOCITY_STEP)?)?;
                let delta = Value::binary(BinaryOp::Sub, &b, &a)?;
                Value::binary(BinaryOp::Div, &delta, &Value::Number(VELOCITY_STEP))
            }
            "wiggle" => {
                let freq = num(0, 0.0)?;
                let amp = num(1, 0.0)?;
                let octaves = num(2, 1.0)? as i32;
                let amp_mult = num(3, 0.5)?;
                let t = num(4, self.ctx.time())?;
                let base = self.property_at(r, self.to_frame(t)?)?;
                let state = WiggleState::from_key((self.expr.source(), self.ctx.layer, r_key(r)));
                match base {
                    Value::Number(n) => Ok(Value::Number(
                        n + state.wiggle(t, freq, amp, octaves, amp_mult),
                    )),
                    other => {
                        let comps = other.as_vector("wiggle")?;
                        Ok(Value::Vector(
                            state.wiggle_components(&comps, t, freq, amp, octaves, amp_mult),
                        ))
                    }
                }
            }
            "loopOut" | "loopIn" => {
                if r != Reference::ThisProperty {
                    return Err(LottieError::type_mismatch(
                        "the property owning the expression",
                        "property reference",
                        method,
                    ));
                }
                let kind = match args.first() {
                    Some(Value::String(s)) => LoopType::from_name(s),
                    _ => LoopType::Cycle,
                };
                let keys = num(1, 0.0)?.max(0.0) as usize;
                if method == "loopOut" {
                    self.loop_out(kind, keys)
                } else {
                    self.loop_in(kind, keys)
                }
            }
            _ => Err(LottieError::lookup(LookupKind::Function, method)),
        }
    }

    /// Reads a referenced property at an arbitrary frame.
    fn property_at(&self, r: Reference, frame: f32) -> Result<Value> {
        match r {
            Reference::ThisProperty => Ok(self.property.value_at(frame)),
            Reference::Channel(l, ch) => {
                let nested = self.ctx.nested(l, frame)?;
                self.ctx.host.transform_value(l, ch, &nested)
            }
            Reference::EffectParam(l, e, p) => {
                let nested = self.ctx.nested(l, frame)?;
                self.ctx.host.effect_param_value(l, e, p, &nested)
            }
            other => Ok(Value::Reference(other)),
        }
    }

    fn deref(&self, v: Value) -> Result<Value> {
        match v {
            Value::Reference(r) => self.property_at(r, self.ctx.frame),
            other => Ok(other),
        }
    }

    fn loop_out(&self, kind: LoopType, num_keys: usize) -> Result<Value> {
        let keys = self.property.key_times();
        let frame = self.ctx.frame;
        let n = keys.len();
        if n < 2 || frame <= keys[n - 1] {
            return Ok(self.current_value());
        }
        let last = keys[n - 1];
        let first = if num_keys == 0 || num_keys >= n {
            keys[0]
        } else {
            keys[n - 1 - num_keys]
        };
        let at = |f: f32| self.property.value_at(f);
        let dur = last - first;
        if dur <= 0.0 {
            return Ok(at(last));
        }
        let elapsed = frame - first;
        let cycles = (elapsed / dur).floor();
        let rem = elapsed - cycles * dur;
        match kind {
            LoopType::Cycle => Ok(at(first + rem)),
            LoopType::PingPong => {
                if cycles as i64 % 2 == 1 {
                    Ok(at(last - rem))
                } else {
                    Ok(at(first + rem))
                }
            }
            LoopType::Offset => {
                let delta = Value::binary(BinaryOp::Sub, &at(last), &at(first))?;
                let shift = Value::binary(BinaryOp::Mul, &delta, &Value::Number(cycles as f64))?;
                Value::binary(BinaryOp::Add, &at(first + rem), &shift)
            }
            LoopType::Continue => {
                let slope = Value::binary(BinaryOp::Sub, &at(last), &at(last - 1.0))?;
                let ext = Value::binary(BinaryOp::Mul, &slope, &Value::Number((frame - last) as f64))?;
                Value::binary(BinaryOp::Add, &at(last), &ext)
            }
        }
    }

    fn loop_in(&self, kind: LoopType, num_keys: usize) -> Result<Value> {
        let keys = self.property.key_times();
        let frame = self.ctx.frame;
        let n = keys.len();
        if n < 2 || frame >= keys[0] {
            return Ok(self.current_value());
        }
        let first = keys[0];
        let last = if num_keys == 0 || num_keys >= n {
            keys[n - 1]
        } else {
            keys[num_keys]
        };
        let at = |f: f32| self.property.value_at(f);
        let dur = last - first;
        if dur <= 0.0 {
            return Ok(at(first));
        }
        let before = first - frame;
        let cycles = (before / dur).floor();
        let rem = before - cycles * dur;
        match kind {
            LoopType::Cycle => Ok(at(last - rem)),
            LoopType::PingPong => {
                if cycles as i64 % 2 == 1 {
                    Ok(at(last - rem))
                } else {
                    Ok(at(first + rem))
                }
            }
            LoopType::Offset => {
                let delta = Value::binary(BinaryOp::Sub, &at(last), &at(first))?;
                let shift =
                    Value::binary(BinaryOp::Mul, &delta, &Value::Number(cycles as f64 + 1.0))?;
                Value::binary(BinaryOp::Sub, &at(last - rem), &shift)
            }
            LoopType::Continue => {
                let slope = Value::binary(BinaryOp::Sub, &at(first + 1.0), &at(first))?;
                let ext = Value::binary(BinaryOp::Mul, &slope, &Value::Number((first - frame) as f64))?;
                Value::binary(BinaryOp::Sub, &at(first), &ext)
            }
        }
    }
}

fn selector(args: &[Value], context: &str) -> Result<Selector> {
    let v = args
        .first()
        .ok_or_else(|| LottieError::type_mismatch("name or index", "nothing", context))?;
    Selector::from_value(v, context)
}

// distinguishes wiggles on different properties of the same layer
fn r_key(r: Reference) -> (u8, usize, usize, usize) {
    match r {
        Reference::Channel(l, ch) => (1, l, ch as usize, 0),
        Reference::EffectParam(l, e, p) => (2, l, e, p),
        _ => (0, 0, 0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{eval_at, TestHost, TestProperty};
    use super::*;

    fn host() -> TestHost {
        let mut host = TestHost::new(&["Main", "Null 1", "Controls"]);
        host.layers[2].effects.push((
            "Slider Control".into(),
            vec![("Slider".into(), Value::Number(42.0))],
        ));
        host
    }

    fn still(v: f64) -> TestProperty {
        TestProperty(vec![(0.0, v)])
    }

    fn num(v: Value) -> f64 {
        match v {
            Value::Number(n) => n,
            other => panic!("expected number, got {:?}", other),
        }
    }

    #[test]
    fn arithmetic_on_value_and_time() {
        let h = host();
        let p = still(10.0);
        assert_eq!(num(eval_at("value * 2 + time", &h, &p, 15.0).unwrap()), 20.5);
        assert_eq!(num(eval_at("var x = 3; x += 1; x * 10", &h, &p, 0.0).unwrap()), 40.0);
    }

    #[test]
    fn bm_rt_wins_over_last_statement() {
        let h = host();
        let p = still(1.0);
        let v = eval_at("$bm_rt = [1, 2]; 99", &h, &p, 0.0).unwrap();
        assert_eq!(v, Value::Vector(vec![1.0, 2.0]));
        // empty program yields the keyframed value
        assert_eq!(num(eval_at("// nothing", &h, &p, 0.0).unwrap()), 1.0);
    }

    #[test]
    fn layer_and_transform_references() {
        let h = host();
        let p = still(0.0);
        let v = eval_at(
            "thisComp.layer(\"Null 1\").transform.position[0] + thisComp.layer(1).position[1]",
            &h,
            &p,
            0.0,
        )
        .unwrap();
        assert_eq!(num(v), 25.0);
        assert_eq!(
            eval_at("thisLayer.name", &h, &p, 0.0).unwrap(),
            Value::String("Main".into())
        );
        assert_eq!(num(eval_at("thisComp.numLayers", &h, &p, 0.0).unwrap()), 3.0);
    }

    #[test]
    fn missing_layer_is_lookup_error_naming_it() {
        let h = host();
        let p = still(0.0);
        let err = eval_at("thisComp.layer(\"Ghost\").transform.position", &h, &p, 0.0).unwrap_err();
        assert_eq!(err, LottieError::lookup(LookupKind::Layer, "Ghost"));
    }

    #[test]
    fn effect_parameters() {
        let h = host();
        let p = still(0.0);
        let v = eval_at(
            "thisComp.layer(\"Controls\").effect(\"Slider Control\")(\"Slider\") / 2",
            &h,
            &p,
            0.0,
        )
        .unwrap();
        assert_eq!(num(v), 21.0);
        let v = eval_at(
            "thisComp.layer(3).effect(1).param(1).value",
            &h,
            &p,
            0.0,
        )
        .unwrap();
        assert_eq!(num(v), 42.0);
        let err = eval_at("thisComp.layer(\"Controls\").effect(\"Blur\")", &h, &p, 0.0).unwrap_err();
        assert_eq!(err, LottieError::lookup(LookupKind::Effect, "Blur"));
    }

    #[test]
    fn type_errors() {
        let h = host();
        let p = still(0.0);
        let err = eval_at("thisComp.layer(1) * 2", &h, &p, 0.0).unwrap_err();
        assert!(matches!(err, LottieError::Type { found: "layer", .. }));
        let err = eval_at("undefinedThing + 1", &h, &p, 0.0).unwrap_err();
        assert_eq!(err, LottieError::lookup(LookupKind::Variable, "undefinedThing"));
        let err = eval_at("Math.random()", &h, &p, 0.0).unwrap_err();
        assert_eq!(err, LottieError::lookup(LookupKind::Function, "random"));
    }

    #[test]
    fn control_flow() {
        let h = host();
        let p = still(5.0);
        let src = "if (time < 1) { return 1 } else { $bm_rt = value > 4 ? 2 : 3 }";
        assert_eq!(num(eval_at(src, &h, &p, 0.0).unwrap()), 1.0);
        assert_eq!(num(eval_at(src, &h, &p, 60.0).unwrap()), 2.0);
        assert_eq!(
            eval_at("0 || \"fallback\"", &h, &p, 0.0).unwrap(),
            Value::String("fallback".into())
        );
    }

    #[test]
    fn evaluation_is_idempotent() {
        let h = host();
        let p = TestProperty(vec![(0.0, 0.0), (30.0, 30.0)]);
        let src = "var a = value; a += wiggle(3, 10) - value; a";
        let first = eval_at(src, &h, &p, 12.0).unwrap();
        let second = eval_at(src, &h, &p, 12.0).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn value_and_velocity_at_time() {
        let h = host();
        let p = TestProperty(vec![(0.0, 0.0), (30.0, 60.0)]);
        assert_eq!(num(eval_at("valueAtTime(0.5)", &h, &p, 0.0).unwrap()), 30.0);
        let v = num(eval_at("thisProperty.velocityAtTime(0.5)", &h, &p, 0.0).unwrap());
        assert!((v - 60.0).abs() < 1e-2);
        assert_eq!(num(eval_at("numKeys", &h, &p, 0.0).unwrap()), 2.0);
    }

    #[test]
    fn non_finite_sample_times_are_type_errors() {
        let h = host();
        let p = TestProperty(vec![(0.0, 0.0), (30.0, 60.0)]);
        assert!(matches!(
            eval_at("valueAtTime(0/0)", &h, &p, 0.0),
            Err(LottieError::Type { .. })
        ));
        assert!(matches!(
            eval_at("velocityAtTime(1/0)", &h, &p, 0.0),
            Err(LottieError::Type { .. })
        ));
    }

    #[test]
    fn loop_out_variants() {
        let h = host();
        let p = TestProperty(vec![(0.0, 0.0), (10.0, 100.0)]);
        assert_eq!(num(eval_at("loopOut()", &h, &p, 15.0).unwrap()), 50.0);
        assert_eq!(num(eval_at("loopOut(\"pingpong\")", &h, &p, 12.0).unwrap()), 80.0);
        assert_eq!(num(eval_at("loopOut(\"offset\")", &h, &p, 15.0).unwrap()), 150.0);
        assert_eq!(num(eval_at("loopOut(\"continue\")", &h, &p, 12.0).unwrap()), 120.0);
        // inside the keyed range the property is untouched
        assert_eq!(num(eval_at("loopOut()", &h, &p, 5.0).unwrap()), 50.0);
    }

    #[test]
    fn loop_in_variants() {
        let h = host();
        let p = TestProperty(vec![(10.0, 0.0), (20.0, 100.0)]);
        assert_eq!(num(eval_at("loopIn()", &h, &p, 5.0).unwrap()), 50.0);
        assert_eq!(num(eval_at("loopIn(\"pingpong\")", &h, &p, 8.0).unwrap()), 20.0);
        assert_eq!(num(eval_at("loopIn(\"offset\")", &h, &p, 5.0).unwrap()), -50.0);
        assert_eq!(num(eval_at("loopIn(\"continue\")", &h, &p, 8.0).unwrap()), -20.0);
    }

    #[test]
    fn color_helpers_yield_colors() {
        let h = host();
        let p = still(0.0);
        let v = eval_at("hslToRgb([0, 1, 0.5, 1])", &h, &p, 0.0).unwrap();
        assert_eq!(v, Value::Color([1.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn recursion_is_bounded() {
        use super::super::{EvalContext, ExpressionHost, Selector};

        // a host whose position channel is itself an expression reading position
        struct Loopy(Expression);
        impl ExpressionHost for Loopy {
            fn frame_rate(&self) -> f32 {
                30.0
            }
            fn size(&self) -> (f32, f32) {
                (1.0, 1.0)
            }
            fn duration_frames(&self) -> f32 {
                1.0
            }
            fn layer_count(&self) -> usize {
                1
            }
            fn layer_by_name(&self, _: &str) -> Option<usize> {
                Some(0)
            }
            fn layer_by_index(&self, _: usize) -> Option<usize> {
                Some(0)
            }
            fn layer_name(&self, _: usize) -> &str {
                "self"
            }
            fn layer_index(&self, _: usize) -> usize {
                1
            }
            fn layer_timing(&self, _: usize) -> (f32, f32, f32) {
                (0.0, 1.0, 0.0)
            }
            fn transform_value(
                &self,
                _: usize,
                _: TransformChannel,
                ctx: &EvalContext<'_>,
            ) -> Result<Value> {
                self.0.evaluate(&TestProperty(vec![]), ctx)
            }
            fn effect(&self, _: usize, _: &Selector) -> Option<usize> {
                None
            }
            fn effect_param(&self, _: usize, _: usize, _: &Selector) -> Option<usize> {
                None
            }
            fn effect_param_value(
                &self,
                _: usize,
                _: usize,
                _: usize,
                _: &EvalContext<'_>,
            ) -> Result<Value> {
                Ok(Value::Number(0.0))
            }
        }

        let host = Loopy(Expression::parse("thisComp.layer(1).transform.position").unwrap());
        let ctx = EvalContext::new(&host, 0, 0.0, 4);
        let err = host.0.evaluate(&TestProperty(vec![]), &ctx).unwrap_err();
        assert_eq!(err, LottieError::RecursionLimit(4));
    }
}
