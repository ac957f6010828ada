use std::f64::consts::PI;

use glam::Vec2;
use kurbo::{BezPath, Point, Shape as _};
use lottie_data::model as data;

use crate::error::Result;
use crate::expressions::EvalContext;
use crate::property::{AnimatedProperty, PropertyFactory};
use crate::shape_data::ShapeData;

const TOLERANCE: f64 = 0.1;

/// Path-producing content item.
#[derive(Debug, Clone)]
pub enum Geometry {
    Rect {
        size: AnimatedProperty<Vec2>,
        position: AnimatedProperty<Vec2>,
        roundness: AnimatedProperty<f32>,
    },
    Ellipse {
        size: AnimatedProperty<Vec2>,
        position: AnimatedProperty<Vec2>,
    },
    Path(AnimatedProperty<ShapeData>),
    Polystar(Box<Polystar>),
}

impl Geometry {
    pub fn rect(shape: &data::RectShape, factory: &PropertyFactory<'_>) -> Result<Self> {
        Ok(Geometry::Rect {
            size: factory.vec2(&shape.s)?,
            position: factory.vec2(&shape.p)?,
            roundness: factory.scalar(&shape.r, 0.0)?,
        })
    }

    pub fn ellipse(shape: &data::EllipseShape, factory: &PropertyFactory<'_>) -> Result<Self> {
        Ok(Geometry::Ellipse {
            size: factory.vec2(&shape.s)?,
            position: factory.vec2(&shape.p)?,
        })
    }

    pub fn path(shape: &data::PathShape, factory: &PropertyFactory<'_>) -> Result<Self> {
        Ok(Geometry::Path(factory.shape(&shape.ks)?))
    }

    pub fn polystar(shape: &data::PolystarShape, factory: &PropertyFactory<'_>) -> Result<Self> {
        Ok(Geometry::Polystar(Box::new(Polystar {
            kind: if shape.sy == 2 {
                StarKind::Polygon
            } else {
                StarKind::Star
            },
            position: factory.vec2(&shape.p)?,
            points: factory.scalar(&shape.pt, 5.0)?,
            rotation: factory.scalar(&shape.r, 0.0)?,
            outer_radius: factory.scalar(&shape.or, 0.0)?,
            outer_roundness: factory.scalar(&shape.os, 0.0)?,
            inner_radius: factory.optional_scalar(shape.ir.as_ref(), 0.0)?,
            inner_roundness: factory.optional_scalar(shape.is.as_ref(), 0.0)?,
        })))
    }

    /// Outline at `ctx.frame` in the owning group's space.
    pub fn build_path(&self, ctx: &EvalContext<'_>) -> Result<BezPath> {
        match self {
            Geometry::Rect {
                size,
                position,
                roundness,
            } => {
                let size = size.value(ctx)?;
                let center = position.value(ctx)?;
                Ok(rect_path(center, size, roundness.value(ctx)?))
            }
            Geometry::Ellipse { size, position } => {
                let size = size.value(ctx)?;
                let center = position.value(ctx)?;
                let ellipse = kurbo::Ellipse::new(
                    to_point(center),
                    kurbo::Vec2::new(size.x as f64 / 2.0, size.y as f64 / 2.0),
                    0.0,
                );
                Ok(ellipse.to_path(TOLERANCE))
            }
            Geometry::Path(shape) => Ok(shape.value(ctx)?.to_bez_path()),
            Geometry::Polystar(star) => star.build_path(ctx),
        }
    }
}

fn to_point(v: Vec2) -> Point {
    Point::new(v.x as f64, v.y as f64)
}

fn rect_path(center: Vec2, size: Vec2, roundness: f32) -> BezPath {
    let half = size.abs() / 2.0;
    let rect = kurbo::Rect::new(
        (center.x - half.x) as f64,
        (center.y - half.y) as f64,
        (center.x + half.x) as f64,
        (center.y + half.y) as f64,
    );
    let radius = roundness.max(0.0).min(half.x.min(half.y)) as f64;
    if radius > 0.0 {
        kurbo::RoundedRect::from_rect(rect, radius).to_path(TOLERANCE)
    } else {
        rect.to_path(TOLERANCE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarKind {
    Star,
    Polygon,
}

#[derive(Debug, Clone)]
pub struct Polystar {
    kind: StarKind,
    position: AnimatedProperty<Vec2>,
    points: AnimatedProperty<f32>,
    rotation: AnimatedProperty<f32>,
    outer_radius: AnimatedProperty<f32>,
    outer_roundness: AnimatedProperty<f32>,
    inner_radius: AnimatedProperty<f32>,
    inner_roundness: AnimatedProperty<f32>,
}

impl Polystar {
    fn build_path(&self, ctx: &EvalContext<'_>) -> Result<BezPath> {
        let center = self.position.value(ctx)?;
        let points = self.points.value(ctx)?.round();
        let rotation = self.rotation.value(ctx)?;
        let outer = (self.outer_radius.value(ctx)?, self.outer_roundness.value(ctx)?);
        let inner = match self.kind {
            StarKind::Star => (self.inner_radius.value(ctx)?, self.inner_roundness.value(ctx)?),
            StarKind::Polygon => outer,
        };

        let mut path = BezPath::new();
        if points < 3.0 {
            return Ok(path);
        }
        let total = match self.kind {
            StarKind::Star => points as usize * 2,
            StarKind::Polygon => points as usize,
        };
        let start = (rotation as f64 - 90.0).to_radians();
        let step = 2.0 * PI / total as f64;

        // (vertex, in control, out control)
        let vertices: Vec<(Point, Point, Point)> = (0..total)
            .map(|i| {
                let (r, roundness) = if i % 2 == 0 { outer } else { inner };
                let angle = start + step * i as f64;
                let (sin, cos) = angle.sin_cos();
                let vertex = Point::new(
                    center.x as f64 + r as f64 * cos,
                    center.y as f64 + r as f64 * sin,
                );
                let tangent = kurbo::Vec2::new(-sin, cos);
                let handle = r as f64 * step * roundness as f64 * 0.01;
                (vertex, vertex - tangent * handle, vertex + tangent * handle)
            })
            .collect();

        let rounded = outer.1.abs() > 0.01 || inner.1.abs() > 0.01;
        path.move_to(vertices[0].0);
        for i in 0..total {
            let next = vertices[(i + 1) % total];
            if rounded {
                path.curve_to(vertices[i].2, next.1, next.0);
            } else if i + 1 < total {
                path.line_to(next.0);
            }
        }
        path.close_path();
        Ok(path)
    }
}
