//! Drawing capability the engine renders through.
//!
//! The engine never rasterizes on its own: it issues save/restore, clips,
//! filled and stroked paths, images and layer compositing requests against a
//! [`Surface`]. `lottie-raster` provides a CPU implementation; tests use the
//! [`RecordingSurface`] defined here.

use std::sync::Arc;

use glam::Vec4;
use kurbo::{Affine, BezPath, Rect};

use crate::assets::ImageAsset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dash {
    /// Alternating dash and gap lengths, always an even count.
    pub intervals: Vec<f32>,
    pub offset: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    pub width: f32,
    pub cap: LineCap,
    pub join: LineJoin,
    pub miter_limit: f32,
    pub dash: Option<Dash>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaintStyle {
    Fill(FillRule),
    Stroke(StrokeStyle),
}

/// One RGBA color stop, offset in `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Vec4,
}

/// Resolved color ramp, shared between frames while the stops stay equal.
#[derive(Debug, PartialEq)]
pub struct GradientShader {
    pub stops: Vec<GradientStop>,
    pub key: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GradientGeometry {
    Linear {
        start: kurbo::Point,
        end: kurbo::Point,
    },
    Radial {
        center: kurbo::Point,
        radius: f64,
        focal: kurbo::Point,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shader {
    /// Straight (non-premultiplied) RGBA in `0..=1`.
    Solid(Vec4),
    Gradient {
        shader: Arc<GradientShader>,
        geometry: GradientGeometry,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paint {
    pub shader: Shader,
    /// Multiplied into the shader's alpha.
    pub opacity: f32,
    pub style: PaintStyle,
}

/// How a layer pushed by [`Surface::save_layer`] is merged back on restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeMode {
    #[default]
    SrcOver,
    /// Keep the destination where the layer has alpha.
    DstIn,
    /// Keep the destination where the layer has no alpha.
    DstOut,
    /// Keep the destination in proportion to the layer's luminance.
    LumaIn,
    LumaOut,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerPaint {
    pub alpha: f32,
    pub mode: CompositeMode,
}

impl LayerPaint {
    pub fn alpha(alpha: f32) -> Self {
        Self {
            alpha,
            mode: CompositeMode::SrcOver,
        }
    }

    pub fn mode(mode: CompositeMode) -> Self {
        Self { alpha: 1.0, mode }
    }
}

/// Abstract 2D canvas.
///
/// Every `save` and `save_layer` is paired with exactly one `restore`.
/// Transforms are passed per call; the surface keeps no current matrix.
pub trait Surface {
    fn save(&mut self);
    fn restore(&mut self);
    /// Intersects the clip with `rect` mapped through `transform`.
    fn clip_rect(&mut self, rect: Rect, transform: Affine);
    fn draw_path(&mut self, path: &BezPath, transform: Affine, paint: &Paint);
    fn draw_image(&mut self, image: &ImageAsset, transform: Affine, alpha: f32);
    /// Redirects drawing into an offscreen layer until the matching
    /// `restore`, which composites it using `paint`.
    fn save_layer(&mut self, paint: LayerPaint);
}

/// A recorded [`Surface`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Save,
    Restore,
    ClipRect {
        rect: Rect,
        transform: Affine,
    },
    Path {
        path: BezPath,
        transform: Affine,
        paint: Paint,
    },
    Image {
        id: String,
        transform: Affine,
        alpha: f32,
    },
    SaveLayer(LayerPaint),
}

/// Surface that records calls instead of drawing them.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub ops: Vec<DrawOp>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paths(&self) -> impl Iterator<Item = (&BezPath, &Affine, &Paint)> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Path {
                path,
                transform,
                paint,
            } => Some((path, transform, paint)),
            _ => None,
        })
    }

    /// Current nesting of save/save_layer calls; zero when balanced.
    pub fn depth(&self) -> isize {
        self.ops.iter().fold(0, |d, op| match op {
            DrawOp::Save | DrawOp::SaveLayer(_) => d + 1,
            DrawOp::Restore => d - 1,
            _ => d,
        })
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }
}

impl Surface for RecordingSurface {
    fn save(&mut self) {
        self.ops.push(DrawOp::Save);
    }

    fn restore(&mut self) {
        self.ops.push(DrawOp::Restore);
    }

    fn clip_rect(&mut self, rect: Rect, transform: Affine) {
        self.ops.push(DrawOp::ClipRect { rect, transform });
    }

    fn draw_path(&mut self, path: &BezPath, transform: Affine, paint: &Paint) {
        self.ops.push(DrawOp::Path {
            path: path.clone(),
            transform,
            paint: paint.clone(),
        });
    }

    fn draw_image(&mut self, image: &ImageAsset, transform: Affine, alpha: f32) {
        self.ops.push(DrawOp::Image {
            id: image.id.clone(),
            transform,
            alpha,
        });
    }

    fn save_layer(&mut self, paint: LayerPaint) {
        self.ops.push(DrawOp::SaveLayer(paint));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_call_order() {
        let mut s = RecordingSurface::new();
        s.save_layer(LayerPaint::alpha(0.5));
        s.save();
        s.clip_rect(Rect::new(0.0, 0.0, 10.0, 10.0), Affine::IDENTITY);
        s.restore();
        assert_eq!(s.depth(), 1);
        s.restore();
        assert_eq!(s.depth(), 0);
        assert_eq!(s.ops[0], DrawOp::SaveLayer(LayerPaint::alpha(0.5)));
        assert!(matches!(s.ops[2], DrawOp::ClipRect { .. }));
    }
}
