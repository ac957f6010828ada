//! Shape layer content: geometry, paints, trims and nested groups.
//!
//! Items keep their document order. A paint applies to every path declared
//! before it in the same group (nested groups contribute their combined
//! outline), a trim to every path before it, and items are drawn from last
//! to first.

pub mod geometry;
pub mod paint;
pub mod trim;

use kurbo::{Affine, BezPath, Rect, Shape as _};
use lottie_data::model as data;
use tracing::warn;

use crate::error::Result;
use crate::expressions::EvalContext;
use crate::property::PropertyFactory;
use crate::surface::Surface;
use crate::transform::{to_affine, Transform};

pub use geometry::Geometry;
pub use paint::{CacheStats, Gradient, GradientCache, PaintNode};
pub use trim::{TrimMode, TrimPath, TrimWindow};

#[derive(Debug)]
pub enum ContentItem {
    Geometry(Geometry),
    Group(ContentGroup),
    Paint(PaintNode),
    Trim(TrimPath),
}

#[derive(Debug)]
pub struct ContentGroup {
    name: Option<String>,
    hidden: bool,
    transform: Transform,
    items: Vec<ContentItem>,
}

impl ContentGroup {
    /// Top-level content of a shape layer or glyph.
    pub fn from_shapes(shapes: &[data::Shape], factory: &PropertyFactory<'_>) -> Result<Self> {
        let (items, transform) = build_items(shapes, factory)?;
        Ok(Self {
            name: None,
            hidden: false,
            transform: transform.unwrap_or_else(Transform::identity),
            items,
        })
    }

    fn from_model(group: &data::GroupShape, factory: &PropertyFactory<'_>) -> Result<Self> {
        let (items, transform) = build_items(&group.it, factory)?;
        Ok(Self {
            name: group.nm.clone(),
            hidden: group.hd.unwrap_or(false),
            transform: transform.unwrap_or_else(Transform::identity),
            items,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    /// Number of paint items, nested groups included.
    pub fn paint_count(&self) -> usize {
        self.items
            .iter()
            .map(|item| match item {
                ContentItem::Paint(_) => 1,
                ContentItem::Group(g) if !g.hidden => g.paint_count(),
                _ => 0,
            })
            .sum()
    }

    fn local_matrix(&self, ctx: &EvalContext<'_>) -> Result<Affine> {
        Ok(to_affine(self.transform.matrix(ctx)?))
    }

    pub fn draw(
        &self,
        surface: &mut dyn Surface,
        ctx: &EvalContext<'_>,
        matrix: Affine,
        alpha: f32,
    ) -> Result<()> {
        self.draw_trimmed(surface, ctx, matrix, alpha, &[])
    }

    fn draw_trimmed(
        &self,
        surface: &mut dyn Surface,
        ctx: &EvalContext<'_>,
        parent: Affine,
        parent_alpha: f32,
        inherited: &[TrimWindow],
    ) -> Result<()> {
        if self.hidden {
            return Ok(());
        }
        let matrix = parent * self.local_matrix(ctx)?;
        let alpha = parent_alpha * self.transform.opacity(ctx)?;
        if alpha <= 0.0 {
            return Ok(());
        }
        let trims = self.trim_windows(ctx)?;
        let paths = self.resolve_paths(ctx, &trims, inherited)?;
        for (i, item) in self.items.iter().enumerate().rev() {
            match item {
                ContentItem::Paint(node) => {
                    let path = merge(&paths[..i]);
                    if path.elements().is_empty() {
                        continue;
                    }
                    let paint = node.paint(ctx, alpha)?;
                    if paint.opacity > 0.0 {
                        surface.draw_path(&path, matrix, &paint);
                    }
                }
                ContentItem::Group(group) => {
                    let trims_here = trims_after(&trims, i, inherited);
                    group.draw_trimmed(surface, ctx, matrix, alpha, &trims_here)?;
                }
                ContentItem::Geometry(_) | ContentItem::Trim(_) => {}
            }
        }
        Ok(())
    }

    /// Bounds of everything this group paints, mapped through `matrix`.
    /// Strokes are inflated by half their width.
    pub fn bounds(&self, ctx: &EvalContext<'_>, matrix: Affine) -> Result<Option<Rect>> {
        self.bounds_trimmed(ctx, matrix, &[])
    }

    fn bounds_trimmed(
        &self,
        ctx: &EvalContext<'_>,
        parent: Affine,
        inherited: &[TrimWindow],
    ) -> Result<Option<Rect>> {
        if self.hidden {
            return Ok(None);
        }
        let matrix = parent * self.local_matrix(ctx)?;
        let trims = self.trim_windows(ctx)?;
        let paths = self.resolve_paths(ctx, &trims, inherited)?;
        let mut bounds: Option<Rect> = None;
        for (i, item) in self.items.iter().enumerate().rev() {
            let rect = match item {
                ContentItem::Paint(node) => {
                    let path = merge(&paths[..i]);
                    if path.elements().is_empty() {
                        continue;
                    }
                    let half = node.stroke_width(ctx)?.unwrap_or(0.0) as f64 / 2.0;
                    Some(matrix.transform_rect_bbox(path.bounding_box().inflate(half, half)))
                }
                ContentItem::Group(group) => {
                    let trims_here = trims_after(&trims, i, inherited);
                    group.bounds_trimmed(ctx, matrix, &trims_here)?
                }
                ContentItem::Geometry(_) | ContentItem::Trim(_) => None,
            };
            bounds = union(bounds, rect);
        }
        Ok(bounds)
    }

    /// Combined outline of all geometry, in the parent's space. Used for
    /// glyphs, which carry no paints of their own.
    pub fn outline(&self, ctx: &EvalContext<'_>) -> Result<BezPath> {
        let trims = self.trim_windows(ctx)?;
        let mut path = merge(&self.resolve_paths(ctx, &trims, &[])?);
        path.apply_affine(self.local_matrix(ctx)?);
        Ok(path)
    }

    fn trim_windows(&self, ctx: &EvalContext<'_>) -> Result<Vec<(usize, TrimWindow)>> {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| match item {
                ContentItem::Trim(t) => Some(t.window(ctx).map(|w| (i, w))),
                _ => None,
            })
            .collect()
    }

    /// One path per item in group space, empty for paints and trims. Nested
    /// groups yield their combined outline.
    fn resolve_paths(
        &self,
        ctx: &EvalContext<'_>,
        trims: &[(usize, TrimWindow)],
        inherited: &[TrimWindow],
    ) -> Result<Vec<BezPath>> {
        let mut paths = vec![BezPath::new(); self.items.len()];
        for (i, item) in self.items.iter().enumerate() {
            match item {
                ContentItem::Geometry(g) => paths[i] = g.build_path(ctx)?,
                ContentItem::Group(group) if !group.hidden => {
                    let trims_here = trims_after(trims, i, inherited);
                    let sub_trims = group.trim_windows(ctx)?;
                    let mut combined = merge(&group.resolve_paths(ctx, &sub_trims, &trims_here)?);
                    combined.apply_affine(group.local_matrix(ctx)?);
                    paths[i] = combined;
                }
                _ => {}
            }
        }

        let is_geometry = |i: usize| matches!(self.items[i], ContentItem::Geometry(_));
        for (t, window) in trims {
            let mut targets: Vec<&mut BezPath> = paths
                .iter_mut()
                .enumerate()
                .filter(|(i, _)| *i < *t && is_geometry(*i))
                .map(|(_, p)| p)
                .collect();
            window.apply(&mut targets);
        }
        for window in inherited {
            let mut targets: Vec<&mut BezPath> = paths
                .iter_mut()
                .enumerate()
                .filter(|(i, _)| is_geometry(*i))
                .map(|(_, p)| p)
                .collect();
            window.apply(&mut targets);
        }
        Ok(paths)
    }
}

/// Trims a nested group at `index` inherits: this group's later trims,
/// then whatever this group inherited.
fn trims_after(
    trims: &[(usize, TrimWindow)],
    index: usize,
    inherited: &[TrimWindow],
) -> Vec<TrimWindow> {
    trims
        .iter()
        .filter(|(t, _)| *t > index)
        .map(|(_, w)| *w)
        .chain(inherited.iter().copied())
        .collect()
}

fn merge(paths: &[BezPath]) -> BezPath {
    let mut out = BezPath::new();
    for p in paths {
        out.extend(p.elements().iter().copied());
    }
    out
}

pub(crate) fn union(a: Option<Rect>, b: Option<Rect>) -> Option<Rect> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.union(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

fn build_items(
    shapes: &[data::Shape],
    factory: &PropertyFactory<'_>,
) -> Result<(Vec<ContentItem>, Option<Transform>)> {
    let mut items = Vec::with_capacity(shapes.len());
    let mut transform = None;
    for shape in shapes {
        let item = match shape {
            data::Shape::Group(g) => ContentItem::Group(ContentGroup::from_model(g, factory)?),
            data::Shape::Rect(r) => ContentItem::Geometry(Geometry::rect(r, factory)?),
            data::Shape::Ellipse(e) => ContentItem::Geometry(Geometry::ellipse(e, factory)?),
            data::Shape::Path(p) => ContentItem::Geometry(Geometry::path(p, factory)?),
            data::Shape::Polystar(s) => ContentItem::Geometry(Geometry::polystar(s, factory)?),
            data::Shape::Fill(f) => ContentItem::Paint(PaintNode::fill(f, factory)?),
            data::Shape::Stroke(s) => ContentItem::Paint(PaintNode::stroke(s, factory)?),
            data::Shape::GradientFill(g) => {
                ContentItem::Paint(PaintNode::gradient_fill(g, factory)?)
            }
            data::Shape::GradientStroke(g) => {
                ContentItem::Paint(PaintNode::gradient_stroke(g, factory)?)
            }
            data::Shape::Trim(t) => ContentItem::Trim(TrimPath::from_model(t, factory)?),
            data::Shape::Transform(tr) => {
                transform = Some(Transform::from_model(&tr.t, factory)?);
                continue;
            }
            data::Shape::Unknown => {
                if crate::first_report("shape:unknown".to_string()) {
                    warn!("skipping unsupported shape item");
                }
                continue;
            }
        };
        items.push(item);
    }
    Ok((items, transform))
}
