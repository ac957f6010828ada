//! Property expressions.
//!
//! Formulas attached to a property (the `x` field) are parsed once into an
//! immutable [`Program`] and interpreted per frame against a read-only view
//! of the composition ([`ExpressionHost`]). Every evaluation starts from a
//! fresh variable scope, so evaluating the same expression twice at the same
//! frame yields the same value.

pub mod ast;
mod builtins;
pub mod color;
mod interpreter;
pub mod lexer;
pub mod parser;
pub mod value;
pub mod wiggle;

use std::sync::Arc;

pub use ast::Program;
pub use interpreter::Interpreter;
pub use value::{Reference, TransformChannel, Value};

use crate::config::ExpressionErrorPolicy;
use crate::error::{LottieError, Result};

/// Read-only access to the layer list an expression runs in.
///
/// Layers, effects and effect parameters are addressed by slot (position in
/// their owning list), never by the document's `ind` numbers.
pub trait ExpressionHost {
    fn frame_rate(&self) -> f32;
    fn size(&self) -> (f32, f32);
    fn duration_frames(&self) -> f32;

    fn layer_count(&self) -> usize;
    fn layer_by_name(&self, name: &str) -> Option<usize>;
    /// `thisComp.layer(n)` uses 1-based declaration order.
    fn layer_by_index(&self, index: usize) -> Option<usize>;
    fn layer_name(&self, layer: usize) -> &str;
    fn layer_index(&self, layer: usize) -> usize;
    /// `(in point, out point, start time)` in frames.
    fn layer_timing(&self, layer: usize) -> (f32, f32, f32);

    fn transform_value(
        &self,
        layer: usize,
        channel: TransformChannel,
        ctx: &EvalContext<'_>,
    ) -> Result<Value>;

    fn effect(&self, layer: usize, selector: &Selector) -> Option<usize>;
    fn effect_param(&self, layer: usize, effect: usize, selector: &Selector) -> Option<usize>;
    fn effect_param_value(
        &self,
        layer: usize,
        effect: usize,
        param: usize,
        ctx: &EvalContext<'_>,
    ) -> Result<Value>;
}

/// Name or 1-based index, as accepted by `layer()` and `effect()`.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Name(String),
    Index(usize),
}

impl Selector {
    pub fn from_value(v: &Value, context: &str) -> Result<Self> {
        match v {
            Value::String(s) => Ok(Selector::Name(s.clone())),
            other => {
                let n = other.as_number(context)?;
                Ok(Selector::Index(n.max(0.0) as usize))
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Selector::Name(n) => n.clone(),
            Selector::Index(i) => i.to_string(),
        }
    }
}

/// The property an expression is attached to, without its expression.
pub trait PropertySource {
    /// Keyframed value at `frame`.
    fn value_at(&self, frame: f32) -> Value;
    /// Times of all keyframes, empty for static values.
    fn key_times(&self) -> Vec<f32>;
}

/// Where and when an expression is evaluated.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub host: &'a dyn ExpressionHost,
    /// Slot of the layer owning the property (`thisLayer`).
    pub layer: usize,
    pub frame: f32,
    pub depth: usize,
    pub max_depth: usize,
    /// What a property does when its expression fails.
    pub policy: ExpressionErrorPolicy,
}

impl<'a> EvalContext<'a> {
    pub fn new(host: &'a dyn ExpressionHost, layer: usize, frame: f32, max_depth: usize) -> Self {
        Self {
            host,
            layer,
            frame,
            depth: 0,
            max_depth,
            policy: ExpressionErrorPolicy::Fallback,
        }
    }

    pub fn with_policy(mut self, policy: ExpressionErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn time(&self) -> f64 {
        self.frame as f64 / self.host.frame_rate() as f64
    }

    /// Context for reading another property from inside an expression.
    pub fn nested(&self, layer: usize, frame: f32) -> Result<Self> {
        if self.depth + 1 > self.max_depth {
            return Err(LottieError::RecursionLimit(self.max_depth));
        }
        Ok(Self {
            layer,
            frame,
            depth: self.depth + 1,
            ..*self
        })
    }
}

/// A parsed expression together with its source text.
#[derive(Debug, Clone)]
pub struct Expression {
    source: Arc<str>,
    program: Arc<Program>,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self> {
        let program = parser::Parser::parse(source)?;
        Ok(Self {
            source: Arc::from(source),
            program: Arc::new(program),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn evaluate(&self, property: &dyn PropertySource, ctx: &EvalContext<'_>) -> Result<Value> {
        Interpreter::new(self, property, ctx).run()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopType {
    Cycle,
    PingPong,
    Continue,
    Offset,
}

impl LoopType {
    pub fn from_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pingpong" => LoopType::PingPong,
            "continue" => LoopType::Continue,
            "offset" => LoopType::Offset,
            _ => LoopType::Cycle,
        }
    }
}
