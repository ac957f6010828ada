use glam::{Mat3, Vec2, Vec3};
use kurbo::Affine;
use lottie_data::model as data;

use crate::error::Result;
use crate::expressions::{EvalContext, TransformChannel, Value};
use crate::property::{AnimatedProperty, PositionProperty, PropertyFactory, PropertyValue};

/// Animated layer or group transform.
#[derive(Debug, Clone)]
pub struct Transform {
    anchor: AnimatedProperty<Vec2>,
    position: PositionProperty,
    scale: AnimatedProperty<Vec2>,
    rotation: AnimatedProperty<f32>,
    skew: AnimatedProperty<f32>,
    skew_axis: AnimatedProperty<f32>,
    opacity: AnimatedProperty<f32>,
}

impl Transform {
    pub fn from_model(ks: &data::Transform, factory: &PropertyFactory<'_>) -> Result<Self> {
        Ok(Self {
            anchor: factory.point(&ks.a)?,
            position: factory.position(&ks.p)?,
            scale: factory.scale(&ks.s)?,
            rotation: factory.scalar(&ks.r, 0.0)?,
            skew: factory.scalar(&ks.sk, 0.0)?,
            skew_axis: factory.scalar(&ks.sa, 0.0)?,
            opacity: factory.scalar(&ks.o, 100.0)?,
        })
    }

    pub fn identity() -> Self {
        Self {
            anchor: AnimatedProperty::constant(Vec2::ZERO),
            position: PositionProperty::Unified(AnimatedProperty::constant(Vec2::ZERO)),
            scale: AnimatedProperty::constant(Vec2::splat(100.0)),
            rotation: AnimatedProperty::constant(0.0),
            skew: AnimatedProperty::constant(0.0),
            skew_axis: AnimatedProperty::constant(0.0),
            opacity: AnimatedProperty::constant(100.0),
        }
    }

    pub fn matrix(&self, ctx: &EvalContext<'_>) -> Result<Mat3> {
        Ok(compose(&TransformValues {
            anchor: self.anchor.value(ctx)?,
            position: self.position.value(ctx)?,
            scale: self.scale.value(ctx)? / 100.0,
            rotation: self.rotation.value(ctx)?,
            skew: self.skew.value(ctx)?,
            skew_axis: self.skew_axis.value(ctx)?,
        }))
    }

    /// Opacity in `0..=1`.
    pub fn opacity(&self, ctx: &EvalContext<'_>) -> Result<f32> {
        Ok((self.opacity.value(ctx)? / 100.0).clamp(0.0, 1.0))
    }

    /// Channel value in document units, for expressions.
    pub fn channel(&self, channel: TransformChannel, ctx: &EvalContext<'_>) -> Result<Value> {
        Ok(match channel {
            TransformChannel::AnchorPoint => self.anchor.value(ctx)?.to_value(),
            TransformChannel::Position => self.position.value(ctx)?.to_value(),
            TransformChannel::Scale => self.scale.value(ctx)?.to_value(),
            TransformChannel::Rotation => self.rotation.value(ctx)?.to_value(),
            TransformChannel::Opacity => self.opacity.value(ctx)?.to_value(),
        })
    }
}

/// Resolved transform components. Scale is a factor, angles are degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformValues {
    pub anchor: Vec2,
    pub position: Vec2,
    pub scale: Vec2,
    pub rotation: f32,
    pub skew: f32,
    pub skew_axis: f32,
}

impl Default for TransformValues {
    fn default() -> Self {
        Self {
            anchor: Vec2::ZERO,
            position: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            skew: 0.0,
            skew_axis: 0.0,
        }
    }
}

/// `T * R * Skew * S * -A`. Positive rotation is clockwise on a y-down
/// surface.
pub fn compose(v: &TransformValues) -> Mat3 {
    let mat_t = Mat3::from_translation(v.position);
    let mat_r = Mat3::from_rotation_z(v.rotation.to_radians());
    let mat_s = Mat3::from_scale(v.scale);
    let mat_a = Mat3::from_translation(-v.anchor);

    if v.skew == 0.0 {
        return mat_t * mat_r * mat_s * mat_a;
    }
    let axis = v.skew_axis.to_radians();
    let shear = Mat3::from_cols(
        Vec3::X,
        Vec3::new(-v.skew.to_radians().tan(), 1.0, 0.0),
        Vec3::Z,
    );
    let mat_skew = Mat3::from_rotation_z(-axis) * shear * Mat3::from_rotation_z(axis);
    mat_t * mat_r * mat_skew * mat_s * mat_a
}

pub fn to_affine(m: Mat3) -> Affine {
    Affine::new([
        m.x_axis.x as f64,
        m.x_axis.y as f64,
        m.y_axis.x as f64,
        m.y_axis.y as f64,
        m.z_axis.x as f64,
        m.z_axis.y as f64,
    ])
}

pub fn from_affine(a: Affine) -> Mat3 {
    let [xx, xy, yx, yy, tx, ty] = a.as_coeffs().map(|c| c as f32);
    Mat3::from_cols(
        Vec3::new(xx, xy, 0.0),
        Vec3::new(yx, yy, 0.0),
        Vec3::new(tx, ty, 1.0),
    )
}
