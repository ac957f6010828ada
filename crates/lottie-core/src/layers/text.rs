use std::collections::HashMap;

use glam::Vec4;
use kurbo::{Affine, BezPath, Rect, Shape as _};
use lottie_data::model as data;
use tracing::warn;

use crate::assets::{FontManager, FontSpec};
use crate::content::ContentGroup;
use crate::error::Result;
use crate::expressions::EvalContext;
use crate::property::{AnimatedProperty, PropertyFactory};
use crate::surface::{
    FillRule, LineCap, LineJoin, Paint, PaintStyle, Shader, StrokeStyle, Surface,
};

/// Glyph outlines from the document's `chars` table are authored at this
/// font size.
const GLYPH_UNITS: f64 = 100.0;

#[derive(Debug)]
struct EmbeddedGlyph {
    outline: ContentGroup,
    advance: f32,
}

/// Text layer content: animated text document laid out with embedded glyphs
/// or glyphs from a [`FontManager`].
#[derive(Debug)]
pub struct TextContent {
    document: AnimatedProperty<data::TextDocument>,
    fonts: Vec<FontSpec>,
    /// Keyed by (character, font family).
    glyphs: HashMap<(String, String), EmbeddedGlyph>,
}

impl TextContent {
    pub fn from_model(
        text: &data::TextData,
        fonts: &[data::FontDescriptor],
        chars: &[data::GlyphData],
        factory: &PropertyFactory<'_>,
    ) -> Result<Self> {
        let mut glyphs = HashMap::new();
        for glyph in chars {
            let shapes = glyph.data.as_ref().map(|d| d.shapes.as_slice()).unwrap_or(&[]);
            glyphs.insert(
                (glyph.ch.clone(), glyph.family.clone()),
                EmbeddedGlyph {
                    outline: ContentGroup::from_shapes(shapes, factory)?,
                    advance: glyph.w,
                },
            );
        }
        Ok(Self {
            document: factory.text(&text.d)?,
            fonts: fonts.iter().map(FontSpec::from).collect(),
            glyphs,
        })
    }

    fn font_spec(&self, name: &str) -> FontSpec {
        self.fonts
            .iter()
            .find(|f| f.name == name)
            .cloned()
            .unwrap_or_else(|| FontSpec {
                name: name.to_string(),
                family: name.to_string(),
                style: String::new(),
            })
    }

    /// Lays the document out into one outline, origin at the first baseline.
    fn layout(
        &self,
        ctx: &EvalContext<'_>,
        fonts: Option<&dyn FontManager>,
    ) -> Result<(BezPath, data::TextDocument)> {
        let doc = self.document.value(ctx)?;
        let spec = self.font_spec(&doc.f);
        let size = doc.s as f64;
        let tracking = doc.tr as f64 / 1000.0 * size;
        let line_height = if doc.lh > 0.0 { doc.lh as f64 } else { size * 1.2 };
        let font = fonts.and_then(|m| m.font(&spec));

        let mut out = BezPath::new();
        for (line_no, line) in doc.t.split(['\r', '\n', '\u{3}']).enumerate() {
            let mut line_path = BezPath::new();
            let mut x = 0.0;
            for ch in line.chars() {
                let key = (ch.to_string(), spec.family.clone());
                let (outline, advance) = if let Some(glyph) = self.glyphs.get(&key) {
                    let scale = size / GLYPH_UNITS;
                    let path = Affine::scale(scale) * glyph.outline.outline(ctx)?;
                    (Some(path), glyph.advance as f64 * scale)
                } else if let Some(glyph) = font.as_ref().and_then(|f| f.glyph(ch)) {
                    (Some(Affine::scale(size) * glyph.path), glyph.advance as f64 * size)
                } else {
                    if crate::first_report(format!("glyph:{}", spec.family)) {
                        warn!(family = %spec.family, "no glyphs available, skipping text");
                    }
                    (None, 0.0)
                };
                if let Some(path) = outline {
                    line_path.extend((Affine::translate((x, 0.0)) * path).elements().iter().copied());
                }
                x += advance + tracking;
            }
            let width = (x - tracking).max(0.0);
            let shift = match doc.j {
                1 => -width,
                2 => -width / 2.0,
                _ => 0.0,
            };
            line_path.apply_affine(Affine::translate((shift, line_no as f64 * line_height)));
            out.extend(line_path.elements().iter().copied());
        }
        Ok((out, doc))
    }

    pub fn draw(
        &self,
        surface: &mut dyn Surface,
        ctx: &EvalContext<'_>,
        fonts: Option<&dyn FontManager>,
        matrix: Affine,
        alpha: f32,
    ) -> Result<()> {
        let (path, doc) = self.layout(ctx, fonts)?;
        if path.elements().is_empty() {
            return Ok(());
        }
        let fill = Paint {
            shader: Shader::Solid(Vec4::from_array(doc.fc.0)),
            opacity: alpha,
            style: PaintStyle::Fill(FillRule::NonZero),
        };
        surface.draw_path(&path, matrix, &fill);
        if let (Some(color), Some(width)) = (doc.sc, doc.sw) {
            if width > 0.0 {
                let stroke = Paint {
                    shader: Shader::Solid(Vec4::from_array(color.0)),
                    opacity: alpha,
                    style: PaintStyle::Stroke(StrokeStyle {
                        width,
                        cap: LineCap::Butt,
                        join: LineJoin::Miter,
                        miter_limit: 4.0,
                        dash: None,
                    }),
                };
                surface.draw_path(&path, matrix, &stroke);
            }
        }
        Ok(())
    }

    pub fn bounds(
        &self,
        ctx: &EvalContext<'_>,
        fonts: Option<&dyn FontManager>,
        matrix: Affine,
    ) -> Result<Option<Rect>> {
        let (path, doc) = self.layout(ctx, fonts)?;
        if path.elements().is_empty() {
            return Ok(None);
        }
        let half = doc.sw.unwrap_or(0.0).max(0.0) as f64 / 2.0;
        Ok(Some(matrix.transform_rect_bbox(path.bounding_box().inflate(half, half))))
    }
}
