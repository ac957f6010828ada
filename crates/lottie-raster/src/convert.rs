//! Engine drawing types to tiny-skia.

use glam::Vec4;
use kurbo::{Affine, BezPath, PathEl};
use lottie_core::surface::{
    self as core, GradientGeometry, GradientShader, LineCap, LineJoin, PaintStyle, Shader,
};
use tiny_skia::{
    Color, FillRule, GradientStop, LinearGradient, Paint, Path, PathBuilder, Point,
    RadialGradient, SpreadMode, Stroke, StrokeDash, Transform,
};

pub fn transform(a: Affine) -> Transform {
    let [sx, ky, kx, sy, tx, ty] = a.as_coeffs();
    Transform::from_row(
        sx as f32, ky as f32, kx as f32, sy as f32, tx as f32, ty as f32,
    )
}

/// `None` for paths without any drawable segment.
pub fn path(path: &BezPath) -> Option<Path> {
    let mut pb = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(c, p) => pb.quad_to(c.x as f32, c.y as f32, p.x as f32, p.y as f32),
            PathEl::CurveTo(c1, c2, p) => pb.cubic_to(
                c1.x as f32,
                c1.y as f32,
                c2.x as f32,
                c2.y as f32,
                p.x as f32,
                p.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

pub fn color(c: Vec4, opacity: f32) -> Color {
    let c = c.clamp(Vec4::ZERO, Vec4::ONE);
    Color::from_rgba(c.x, c.y, c.z, (c.w * opacity).clamp(0.0, 1.0)).unwrap_or(Color::TRANSPARENT)
}

fn point(p: kurbo::Point) -> Point {
    Point::from_xy(p.x as f32, p.y as f32)
}

/// `None` when the paint cannot produce any pixel (fully transparent, or a
/// gradient tiny-skia rejects as degenerate).
pub fn paint(p: &core::Paint) -> Option<Paint<'static>> {
    if p.opacity <= 0.0 {
        return None;
    }
    let mut paint = Paint {
        anti_alias: true,
        ..Paint::default()
    };
    match &p.shader {
        Shader::Solid(c) => paint.set_color(color(*c, p.opacity)),
        Shader::Gradient { shader, geometry } => {
            paint.shader = gradient(shader, geometry, p.opacity)?;
        }
    }
    Some(paint)
}

fn gradient(
    shader: &GradientShader,
    geometry: &GradientGeometry,
    opacity: f32,
) -> Option<tiny_skia::Shader<'static>> {
    let stops: Vec<GradientStop> = shader
        .stops
        .iter()
        .map(|s| GradientStop::new(s.offset, color(s.color, opacity)))
        .collect();
    match (stops.as_slice(), geometry) {
        ([], _) => None,
        ([_], _) => Some(tiny_skia::Shader::SolidColor(color(
            shader.stops[0].color,
            opacity,
        ))),
        (_, GradientGeometry::Linear { start, end }) => LinearGradient::new(
            point(*start),
            point(*end),
            stops,
            SpreadMode::Pad,
            Transform::identity(),
        ),
        (_, GradientGeometry::Radial { center, radius, focal }) => RadialGradient::new(
            point(*focal),
            point(*center),
            *radius as f32,
            stops,
            SpreadMode::Pad,
            Transform::identity(),
        ),
    }
}

pub fn fill_rule(rule: core::FillRule) -> FillRule {
    match rule {
        core::FillRule::NonZero => FillRule::Winding,
        core::FillRule::EvenOdd => FillRule::EvenOdd,
    }
}

/// `None` for fills, and for strokes too thin to draw.
pub fn stroke(style: &PaintStyle) -> Option<Stroke> {
    let PaintStyle::Stroke(s) = style else {
        return None;
    };
    if s.width <= 0.0 {
        return None;
    }
    Some(Stroke {
        width: s.width,
        miter_limit: s.miter_limit,
        line_cap: match s.cap {
            LineCap::Butt => tiny_skia::LineCap::Butt,
            LineCap::Round => tiny_skia::LineCap::Round,
            LineCap::Square => tiny_skia::LineCap::Square,
        },
        line_join: match s.join {
            LineJoin::Miter => tiny_skia::LineJoin::Miter,
            LineJoin::Round => tiny_skia::LineJoin::Round,
            LineJoin::Bevel => tiny_skia::LineJoin::Bevel,
        },
        dash: s
            .dash
            .as_ref()
            .and_then(|d| StrokeDash::new(d.intervals.clone(), d.offset)),
    })
}
