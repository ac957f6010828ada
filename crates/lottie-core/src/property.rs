//! Typed property resolvers.
//!
//! An [`AnimatedProperty`] wraps either a constant or a [`KeyframeTrack`] and
//! an optional [`Expression`]. Values stay in document units (opacity and
//! scale in percent, rotation in degrees) so expressions read what authors
//! wrote; callers convert when they build matrices and paints.

use glam::{Vec2, Vec4};
use lottie_data::model::{self as data, Rgba};
use tracing::warn;

use crate::animatable::{Interpolatable, Keyframe, KeyframeTrack};
use crate::config::{EngineConfig, ExpressionErrorPolicy};
use crate::error::{LottieError, Result};
use crate::expressions::{EvalContext, Expression, PropertySource, Value};
use crate::shape_data::ShapeData;

/// Conversion between engine values and expression values.
pub trait PropertyValue: Interpolatable {
    fn to_value(&self) -> Value;
    /// `base` is the keyframed value, for types an expression only
    /// partially replaces.
    fn from_value(value: &Value, base: &Self) -> Result<Self>;
}

impl PropertyValue for f32 {
    fn to_value(&self) -> Value {
        Value::Number(*self as f64)
    }

    fn from_value(value: &Value, _base: &Self) -> Result<Self> {
        Ok(value.as_number("scalar property")? as f32)
    }
}

impl PropertyValue for Vec2 {
    fn to_value(&self) -> Value {
        Value::Vector(vec![self.x as f64, self.y as f64])
    }

    fn from_value(value: &Value, _base: &Self) -> Result<Self> {
        match value.as_vector("2D property")?.as_slice() {
            [x, y, ..] => Ok(Vec2::new(*x as f32, *y as f32)),
            _ => Err(LottieError::type_mismatch(
                "2D vector",
                value.type_name(),
                "2D property",
            )),
        }
    }
}

impl PropertyValue for Vec4 {
    fn to_value(&self) -> Value {
        Value::Color(self.to_array().map(|c| c as f64))
    }

    fn from_value(value: &Value, _base: &Self) -> Result<Self> {
        match value.as_vector("color property")?.as_slice() {
            [r, g, b] => Ok(Vec4::new(*r as f32, *g as f32, *b as f32, 1.0)),
            [r, g, b, a, ..] => Ok(Vec4::new(*r as f32, *g as f32, *b as f32, *a as f32)),
            _ => Err(LottieError::type_mismatch(
                "color",
                value.type_name(),
                "color property",
            )),
        }
    }
}

impl PropertyValue for Vec<f32> {
    fn to_value(&self) -> Value {
        Value::Vector(self.iter().map(|c| *c as f64).collect())
    }

    fn from_value(value: &Value, _base: &Self) -> Result<Self> {
        Ok(value
            .as_vector("vector property")?
            .into_iter()
            .map(|c| c as f32)
            .collect())
    }
}

impl PropertyValue for ShapeData {
    fn to_value(&self) -> Value {
        Value::Path(self.clone())
    }

    fn from_value(value: &Value, _base: &Self) -> Result<Self> {
        match value {
            Value::Path(p) => Ok(p.clone()),
            other => Err(LottieError::type_mismatch(
                "path",
                other.type_name(),
                "path property",
            )),
        }
    }
}

impl PropertyValue for data::TextDocument {
    fn to_value(&self) -> Value {
        Value::String(self.t.clone())
    }

    fn from_value(value: &Value, base: &Self) -> Result<Self> {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Reference(_) | Value::Path(_) => {
                return Err(LottieError::type_mismatch(
                    "string",
                    value.type_name(),
                    "source text",
                ))
            }
            other => other.display(),
        };
        Ok(data::TextDocument {
            t: text,
            ..base.clone()
        })
    }
}

#[derive(Debug, Clone)]
enum Source<T> {
    Static(T),
    Keyframed(KeyframeTrack<T>),
}

#[derive(Debug, Clone)]
pub struct AnimatedProperty<T> {
    source: Source<T>,
    expression: Option<Expression>,
    index: Option<u32>,
}

impl<T: PropertyValue> AnimatedProperty<T> {
    pub fn constant(value: T) -> Self {
        Self {
            source: Source::Static(value),
            expression: None,
            index: None,
        }
    }

    pub fn keyframed(track: KeyframeTrack<T>) -> Self {
        Self {
            source: Source::Keyframed(track),
            expression: None,
            index: None,
        }
    }

    pub fn with_expression(mut self, expression: Expression) -> Self {
        self.expression = Some(expression);
        self
    }

    pub fn expression(&self) -> Option<&Expression> {
        self.expression.as_ref()
    }

    /// Property index (`ix`) from the document, if any.
    pub fn index(&self) -> Option<u32> {
        self.index
    }

    pub fn is_static(&self) -> bool {
        matches!(self.source, Source::Static(_)) && self.expression.is_none()
    }

    /// Keyframed value, ignoring any expression.
    pub fn interpolated(&self, frame: f32) -> T {
        match &self.source {
            Source::Static(v) => v.clone(),
            Source::Keyframed(track) => track.interpolated(frame),
        }
    }

    /// Final value at `ctx.frame`, expression applied.
    ///
    /// Evaluation failures are logged and replaced by the keyframed value
    /// under [`ExpressionErrorPolicy::Fallback`], returned otherwise.
    pub fn value(&self, ctx: &EvalContext<'_>) -> Result<T> {
        let base = self.interpolated(ctx.frame);
        let Some(expr) = &self.expression else {
            return Ok(base);
        };
        let result = expr
            .evaluate(self, ctx)
            .and_then(|v| T::from_value(&v, &base));
        match result {
            Ok(v) => Ok(v),
            Err(err) if ctx.policy == ExpressionErrorPolicy::Fail => Err(err),
            Err(err) => {
                if crate::first_report(format!("expr:{}:{}", expr.source(), err)) {
                    warn!(
                        expression = expr.source(),
                        frame = ctx.frame,
                        "expression failed, using keyframed value: {}",
                        err
                    );
                }
                Ok(base)
            }
        }
    }
}

impl<T: PropertyValue> PropertySource for AnimatedProperty<T> {
    fn value_at(&self, frame: f32) -> Value {
        self.interpolated(frame).to_value()
    }

    fn key_times(&self) -> Vec<f32> {
        match &self.source {
            Source::Static(_) => Vec::new(),
            Source::Keyframed(track) => track.keyframes().iter().map(|k| k.time).collect(),
        }
    }
}

/// Position is either one 2D property or separate x/y scalars.
#[derive(Debug, Clone)]
pub enum PositionProperty {
    Unified(AnimatedProperty<Vec2>),
    Split {
        x: AnimatedProperty<f32>,
        y: AnimatedProperty<f32>,
    },
}

impl PositionProperty {
    pub fn value(&self, ctx: &EvalContext<'_>) -> Result<Vec2> {
        match self {
            PositionProperty::Unified(p) => p.value(ctx),
            PositionProperty::Split { x, y } => Ok(Vec2::new(x.value(ctx)?, y.value(ctx)?)),
        }
    }
}

/// Converts document properties into resolvers, attaching expressions
/// according to the engine configuration.
#[derive(Clone, Copy)]
pub struct PropertyFactory<'c> {
    config: &'c EngineConfig,
}

impl<'c> PropertyFactory<'c> {
    pub fn new(config: &'c EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    pub fn build<S, T: PropertyValue>(
        &self,
        prop: &data::Property<S>,
        default: T,
        convert: impl Fn(&S) -> T,
    ) -> Result<AnimatedProperty<T>> {
        let source = match &prop.k {
            data::Value::Default => Source::Static(default),
            data::Value::Static(v) => Source::Static(convert(v)),
            data::Value::Animated(kfs) => {
                let keyframes = kfs
                    .iter()
                    .map(|kf| Keyframe::from_model(kf, &convert))
                    .collect();
                Source::Keyframed(KeyframeTrack::new(keyframes)?)
            }
        };
        let expression = match &prop.x {
            Some(src) if self.config.expressions_enabled => self.parse_expression(src)?,
            _ => None,
        };
        Ok(AnimatedProperty {
            source,
            expression,
            index: prop.ix,
        })
    }

    fn parse_expression(&self, src: &str) -> Result<Option<Expression>> {
        match Expression::parse(src) {
            Ok(e) => Ok(Some(e)),
            Err(err) if self.config.strict_expressions => Err(LottieError::structural(format!(
                "invalid expression: {}",
                err
            ))),
            Err(err) => {
                warn!("ignoring unparsable expression: {}", err);
                Ok(None)
            }
        }
    }

    pub fn scalar(&self, prop: &data::Property<f32>, default: f32) -> Result<AnimatedProperty<f32>> {
        self.build(prop, default, |v| *v)
    }

    pub fn optional_scalar(
        &self,
        prop: Option<&data::Property<f32>>,
        default: f32,
    ) -> Result<AnimatedProperty<f32>> {
        match prop {
            Some(p) => self.scalar(p, default),
            None => Ok(AnimatedProperty::constant(default)),
        }
    }

    pub fn vec2(&self, prop: &data::Property<data::Vec2>) -> Result<AnimatedProperty<Vec2>> {
        self.build(prop, Vec2::ZERO, |v| Vec2::from(*v))
    }

    pub fn point(
        &self,
        prop: &data::Property<data::Vec3DefaultZero>,
    ) -> Result<AnimatedProperty<Vec2>> {
        self.build(prop, Vec2::ZERO, |v| Vec2::new(v.0[0], v.0[1]))
    }

    pub fn scale(&self, prop: &data::Property<data::Vec3Scale>) -> Result<AnimatedProperty<Vec2>> {
        self.build(prop, Vec2::splat(100.0), |v| Vec2::new(v.0[0], v.0[1]))
    }

    pub fn color(&self, prop: &data::Property<Rgba>) -> Result<AnimatedProperty<Vec4>> {
        self.build(prop, Vec4::new(0.0, 0.0, 0.0, 1.0), |c| Vec4::from_array(c.0))
    }

    pub fn shape(&self, prop: &data::Property<data::BezierPath>) -> Result<AnimatedProperty<ShapeData>> {
        self.build(prop, ShapeData::default(), ShapeData::from_model)
    }

    pub fn floats(&self, prop: &data::Property<Vec<f32>>) -> Result<AnimatedProperty<Vec<f32>>> {
        self.build(prop, Vec::new(), |v| v.clone())
    }

    pub fn text(
        &self,
        prop: &data::Property<data::TextDocument>,
    ) -> Result<AnimatedProperty<data::TextDocument>> {
        self.build(prop, data::TextDocument::default(), |d| d.clone())
    }

    pub fn position(&self, prop: &data::PositionProperty) -> Result<PositionProperty> {
        match prop {
            data::PositionProperty::Unified(p) => Ok(PositionProperty::Unified(self.point(p)?)),
            data::PositionProperty::Split { x, y, .. } => Ok(PositionProperty::Split {
                x: self.scalar(x, 0.0)?,
                y: self.scalar(y, 0.0)?,
            }),
        }
    }
}
