//! CPU rendering of Lottie compositions with `tiny-skia`.

mod convert;
mod error;
mod surface;

use kurbo::Affine;
use lottie_core::Composition;
use tiny_skia::Color;

pub use error::{RasterError, Result};
pub use surface::PixmapSurface;
pub use tiny_skia::Pixmap;

/// Options for [`render_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderOptions {
    /// Output size; `None` uses the composition's declared size.
    pub size: Option<(u32, u32)>,
    pub background: Option<[u8; 4]>,
}

/// Matrix fitting a `from` sized composition into `to`, preserving aspect
/// ratio and centering.
pub fn fit_matrix(from: (f32, f32), to: (u32, u32)) -> Affine {
    let (fw, fh) = (from.0 as f64, from.1 as f64);
    let (tw, th) = (to.0 as f64, to.1 as f64);
    if fw <= 0.0 || fh <= 0.0 {
        return Affine::IDENTITY;
    }
    let scale = (tw / fw).min(th / fh);
    let dx = (tw - fw * scale) / 2.0;
    let dy = (th - fh * scale) / 2.0;
    Affine::translate((dx, dy)) * Affine::scale(scale)
}

/// Rasterizes `frame` of `composition` into a new pixmap.
pub fn render_frame(composition: &Composition, frame: f32, options: RenderOptions) -> Result<Pixmap> {
    let (w, h) = composition.size();
    let size = options
        .size
        .unwrap_or((w.ceil().max(1.0) as u32, h.ceil().max(1.0) as u32));
    let mut surface = PixmapSurface::new(size.0, size.1)?;
    if let Some([r, g, b, a]) = options.background {
        surface.clear(Color::from_rgba8(r, g, b, a));
    }
    composition.draw(&mut surface, fit_matrix((w, h), size), 1.0, frame)?;
    Ok(surface.into_pixmap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    #[test]
    fn fit_matrix_letterboxes() {
        let m = fit_matrix((100.0, 50.0), (200, 200));
        assert_eq!(m * Point::new(0.0, 0.0), Point::new(0.0, 50.0));
        assert_eq!(m * Point::new(100.0, 50.0), Point::new(200.0, 150.0));
    }
}
