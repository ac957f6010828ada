use std::collections::{HashMap, HashSet};

use kurbo::{Affine, BezPath, Rect, Shape as _};
use lottie_core::surface::{CompositeMode, LayerPaint, Paint, PaintStyle, Surface};
use lottie_core::ImageAsset;
use tiny_skia::{
    BlendMode, Color, FilterQuality, Mask, Pixmap, PixmapPaint, Transform,
};
use tracing::{trace, warn};

use crate::convert;
use crate::error::{RasterError, Result};

struct State {
    clip: Option<Mask>,
    /// Offscreen target pushed by `save_layer`, with its composite paint.
    layer: Option<(Pixmap, LayerPaint)>,
}

/// [`Surface`] rasterizing into a premultiplied RGBA [`Pixmap`].
pub struct PixmapSurface {
    base: Pixmap,
    clip: Option<Mask>,
    stack: Vec<State>,
    /// Decoded images by asset id.
    images: HashMap<String, Pixmap>,
    undecodable: HashSet<String>,
}

impl std::fmt::Debug for PixmapSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixmapSurface")
            .field("width", &self.base.width())
            .field("height", &self.base.height())
            .field("depth", &self.stack.len())
            .finish()
    }
}

impl PixmapSurface {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Ok(Self {
            base: new_pixmap(width, height)?,
            clip: None,
            stack: Vec::new(),
            images: HashMap::new(),
            undecodable: HashSet::new(),
        })
    }

    pub fn width(&self) -> u32 {
        self.base.width()
    }

    pub fn height(&self) -> u32 {
        self.base.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.base
    }

    pub fn into_pixmap(self) -> Pixmap {
        self.base
    }

    /// Fills the whole surface, dropping clips and pending layers.
    pub fn clear(&mut self, color: Color) {
        self.stack.clear();
        self.clip = None;
        self.base.fill(color);
    }

    /// Straight RGBA bytes of one pixel, `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let c = self.base.pixel(x, y)?.demultiply();
        Some([c.red(), c.green(), c.blue(), c.alpha()])
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        self.base
            .encode_png()
            .map_err(|e| RasterError::Encode(e.to_string()))
    }

    fn target(&mut self) -> &mut Pixmap {
        match self.stack.iter_mut().rev().find_map(|s| s.layer.as_mut()) {
            Some((pixmap, _)) => pixmap,
            None => &mut self.base,
        }
    }

    /// Takes the decoded pixmap out of the cache; callers put it back.
    fn take_image(&mut self, image: &ImageAsset) -> Option<Pixmap> {
        if let Some(pixmap) = self.images.remove(&image.id) {
            return Some(pixmap);
        }
        if self.undecodable.contains(&image.id) {
            return None;
        }
        match decode(image) {
            Ok(pixmap) => Some(pixmap),
            Err(err) => {
                warn!(asset = %image.id, error = %err, "skipping undecodable image");
                self.undecodable.insert(image.id.clone());
                None
            }
        }
    }
}

impl Surface for PixmapSurface {
    fn save(&mut self) {
        self.stack.push(State {
            clip: self.clip.clone(),
            layer: None,
        });
    }

    fn restore(&mut self) {
        let Some(state) = self.stack.pop() else {
            warn!("restore without a matching save");
            return;
        };
        self.clip = state.clip;
        if let Some((layer, paint)) = state.layer {
            let clip = self.clip.take();
            composite(self.target(), layer, paint, clip.as_ref());
            self.clip = clip;
        }
    }

    fn clip_rect(&mut self, rect: Rect, transform: Affine) {
        let Some(path) = convert::path(&rect.to_path(0.1)) else {
            // empty rect clips everything
            if let Some(mask) = self.clip.as_mut() {
                mask.data_mut().fill(0);
            } else if let Some(mask) = Mask::new(self.base.width(), self.base.height()) {
                self.clip = Some(mask);
            }
            return;
        };
        let ts = convert::transform(transform);
        match self.clip.as_mut() {
            Some(mask) => mask.intersect_path(&path, tiny_skia::FillRule::Winding, true, ts),
            None => {
                if let Some(mut mask) = Mask::new(self.base.width(), self.base.height()) {
                    mask.fill_path(&path, tiny_skia::FillRule::Winding, true, ts);
                    self.clip = Some(mask);
                }
            }
        }
    }

    fn draw_path(&mut self, path: &BezPath, transform: Affine, paint: &Paint) {
        let (Some(skia_path), Some(skia_paint)) = (convert::path(path), convert::paint(paint))
        else {
            return;
        };
        let ts = convert::transform(transform);
        let clip = self.clip.take();
        match &paint.style {
            PaintStyle::Fill(rule) => {
                self.target().fill_path(
                    &skia_path,
                    &skia_paint,
                    convert::fill_rule(*rule),
                    ts,
                    clip.as_ref(),
                );
            }
            style @ PaintStyle::Stroke(_) => {
                if let Some(stroke) = convert::stroke(style) {
                    self.target()
                        .stroke_path(&skia_path, &skia_paint, &stroke, ts, clip.as_ref());
                }
            }
        }
        self.clip = clip;
    }

    fn draw_image(&mut self, image: &ImageAsset, transform: Affine, alpha: f32) {
        let Some(pixmap) = self.take_image(image) else {
            return;
        };
        // stretch to the size the document declares
        let (w, h) = (image.width, image.height);
        let fit = if w > 0.0 && h > 0.0 {
            Affine::scale_non_uniform(
                w as f64 / pixmap.width() as f64,
                h as f64 / pixmap.height() as f64,
            )
        } else {
            Affine::IDENTITY
        };
        let paint = PixmapPaint {
            opacity: alpha.clamp(0.0, 1.0),
            quality: FilterQuality::Bilinear,
            blend_mode: BlendMode::SourceOver,
        };
        let clip = self.clip.take();
        self.target().draw_pixmap(
            0,
            0,
            pixmap.as_ref(),
            &paint,
            convert::transform(transform * fit),
            clip.as_ref(),
        );
        self.clip = clip;
        self.images.insert(image.id.clone(), pixmap);
    }

    fn save_layer(&mut self, paint: LayerPaint) {
        trace!(?paint, "save layer");
        let layer = match new_pixmap(self.base.width(), self.base.height()) {
            Ok(pixmap) => Some((pixmap, paint)),
            Err(err) => {
                // draws land on the current target instead
                warn!(error = %err, "offscreen layer unavailable");
                None
            }
        };
        self.stack.push(State {
            clip: self.clip.clone(),
            layer,
        });
    }
}

fn new_pixmap(width: u32, height: u32) -> Result<Pixmap> {
    Pixmap::new(width, height).ok_or(RasterError::Allocation { width, height })
}

fn composite(target: &mut Pixmap, mut layer: Pixmap, paint: LayerPaint, clip: Option<&Mask>) {
    let blend_mode = match paint.mode {
        CompositeMode::SrcOver => BlendMode::SourceOver,
        CompositeMode::DstIn => BlendMode::DestinationIn,
        CompositeMode::DstOut => BlendMode::DestinationOut,
        CompositeMode::LumaIn => {
            luminance_to_alpha(&mut layer, false);
            BlendMode::DestinationIn
        }
        CompositeMode::LumaOut => {
            luminance_to_alpha(&mut layer, true);
            BlendMode::DestinationIn
        }
    };
    let paint = PixmapPaint {
        opacity: paint.alpha.clamp(0.0, 1.0),
        quality: FilterQuality::Nearest,
        blend_mode,
    };
    target.draw_pixmap(0, 0, layer.as_ref(), &paint, Transform::identity(), clip);
}

/// Replaces every pixel by its luminance as alpha. Transparent pixels count
/// as black.
fn luminance_to_alpha(pixmap: &mut Pixmap, invert: bool) {
    for px in pixmap.data_mut().chunks_exact_mut(4) {
        // premultiplied, so this is luminance times alpha
        let luma = 0.2126 * px[0] as f32 + 0.7152 * px[1] as f32 + 0.0722 * px[2] as f32;
        let mut m = luma.round().clamp(0.0, 255.0) as u8;
        if invert {
            m = 255 - m;
        }
        px.copy_from_slice(&[m, m, m, m]);
    }
}

fn decode(image: &ImageAsset) -> Result<Pixmap> {
    let rgba = image::load_from_memory(&image.bytes)
        .map_err(|source| RasterError::Decode {
            id: image.id.clone(),
            source,
        })?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut bytes = rgba.into_raw();
    premultiply_rgba_in_place(&mut bytes);
    let mut pixmap = new_pixmap(width, height)?;
    pixmap.data_mut().copy_from_slice(&bytes);
    Ok(pixmap)
}

fn premultiply_rgba_in_place(bytes: &mut [u8]) {
    for pixel in bytes.chunks_exact_mut(4) {
        let alpha = pixel[3] as u16;
        pixel[0] = ((pixel[0] as u16 * alpha + 127) / 255) as u8;
        pixel[1] = ((pixel[1] as u16 * alpha + 127) / 255) as u8;
        pixel[2] = ((pixel[2] as u16 * alpha + 127) / 255) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;
    use lottie_core::surface::{FillRule, Shader};

    fn red() -> Paint {
        Paint {
            shader: Shader::Solid(Vec4::new(1.0, 0.0, 0.0, 1.0)),
            opacity: 1.0,
            style: PaintStyle::Fill(FillRule::NonZero),
        }
    }

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> BezPath {
        Rect::new(x0, y0, x1, y1).to_path(0.1)
    }

    #[test]
    fn fills_inside_the_path_only() {
        let mut s = PixmapSurface::new(10, 10).unwrap();
        s.draw_path(&square(0.0, 0.0, 5.0, 10.0), Affine::IDENTITY, &red());
        assert_eq!(s.pixel(2, 5), Some([255, 0, 0, 255]));
        assert_eq!(s.pixel(7, 5), Some([0, 0, 0, 0]));
    }

    #[test]
    fn clip_is_restored() {
        let mut s = PixmapSurface::new(10, 10).unwrap();
        s.save();
        s.clip_rect(Rect::new(0.0, 0.0, 5.0, 10.0), Affine::IDENTITY);
        s.draw_path(&square(0.0, 0.0, 10.0, 5.0), Affine::IDENTITY, &red());
        s.restore();
        s.draw_path(&square(0.0, 5.0, 10.0, 10.0), Affine::IDENTITY, &red());
        assert_eq!(s.pixel(2, 2).map(|p| p[3]), Some(255));
        assert_eq!(s.pixel(7, 2).map(|p| p[3]), Some(0));
        assert_eq!(s.pixel(7, 7).map(|p| p[3]), Some(255));
    }

    #[test]
    fn alpha_layer_composites_once() {
        let mut s = PixmapSurface::new(10, 10).unwrap();
        s.save_layer(LayerPaint::alpha(0.5));
        // overlapping draws inside the layer do not double the alpha
        s.draw_path(&square(0.0, 0.0, 10.0, 10.0), Affine::IDENTITY, &red());
        s.draw_path(&square(0.0, 0.0, 10.0, 10.0), Affine::IDENTITY, &red());
        s.restore();
        let a = s.pixel(5, 5).unwrap()[3];
        assert!((126..=129).contains(&a), "alpha {a}");
    }

    #[test]
    fn alpha_matte_keeps_overlap() {
        let mut s = PixmapSurface::new(10, 10).unwrap();
        s.save_layer(LayerPaint::alpha(1.0));
        s.draw_path(&square(0.0, 0.0, 10.0, 10.0), Affine::IDENTITY, &red());
        s.save_layer(LayerPaint::mode(CompositeMode::DstIn));
        s.draw_path(&square(0.0, 0.0, 5.0, 10.0), Affine::IDENTITY, &red());
        s.restore();
        s.restore();
        assert_eq!(s.pixel(2, 5).map(|p| p[3]), Some(255));
        assert_eq!(s.pixel(7, 5).map(|p| p[3]), Some(0));
    }

    #[test]
    fn inverted_luma_matte_uses_brightness() {
        let white = Paint {
            shader: Shader::Solid(Vec4::ONE),
            ..red()
        };
        let mut s = PixmapSurface::new(10, 10).unwrap();
        s.save_layer(LayerPaint::alpha(1.0));
        s.draw_path(&square(0.0, 0.0, 10.0, 10.0), Affine::IDENTITY, &red());
        s.save_layer(LayerPaint::mode(CompositeMode::LumaOut));
        s.draw_path(&square(0.0, 0.0, 5.0, 10.0), Affine::IDENTITY, &white);
        s.restore();
        s.restore();
        // white source hides the target, no source keeps it
        assert_eq!(s.pixel(2, 5).map(|p| p[3]), Some(0));
        assert_eq!(s.pixel(7, 5).map(|p| p[3]), Some(255));
    }

    #[test]
    fn unbalanced_restore_is_ignored() {
        let mut s = PixmapSurface::new(4, 4).unwrap();
        s.restore();
        s.draw_path(&square(0.0, 0.0, 4.0, 4.0), Affine::IDENTITY, &red());
        assert_eq!(s.pixel(1, 1).map(|p| p[3]), Some(255));
    }

    #[test]
    fn undecodable_images_are_skipped() {
        let mut s = PixmapSurface::new(4, 4).unwrap();
        let image = ImageAsset {
            id: "broken".into(),
            width: 4.0,
            height: 4.0,
            bytes: vec![1, 2, 3].into(),
        };
        s.draw_image(&image, Affine::IDENTITY, 1.0);
        s.draw_image(&image, Affine::IDENTITY, 1.0);
        assert_eq!(s.pixel(1, 1), Some([0, 0, 0, 0]));
    }
}
