//! Image and font collaborators.

use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use kurbo::BezPath;
use lottie_data::model as data;

use crate::error::{LottieError, Result};

/// Encoded image bytes (PNG, JPEG, ...) for one document asset. Decoding is
/// left to the surface.
#[derive(Clone, PartialEq)]
pub struct ImageAsset {
    pub id: String,
    pub width: f32,
    pub height: f32,
    pub bytes: Arc<[u8]>,
}

impl fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAsset")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// An image the document references but does not embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
    pub id: String,
    /// Directory (`u`) joined with file name (`p`).
    pub path: String,
}

/// Supplies bytes for external assets. Called lazily, never retried.
pub trait AssetResolver {
    fn resolve(&self, request: &AssetRequest) -> Result<Vec<u8>>;
}

/// Resolver reading paths relative to a base directory.
#[derive(Debug, Clone)]
pub struct FileResolver {
    pub root: std::path::PathBuf,
}

impl AssetResolver for FileResolver {
    fn resolve(&self, request: &AssetRequest) -> Result<Vec<u8>> {
        std::fs::read(self.root.join(&request.path))
            .map_err(|e| LottieError::asset(&request.id, e.to_string()))
    }
}

/// Font identity as declared in the document's font list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontSpec {
    pub name: String,
    pub family: String,
    pub style: String,
}

impl From<&data::FontDescriptor> for FontSpec {
    fn from(d: &data::FontDescriptor) -> Self {
        Self {
            name: d.name.clone(),
            family: d.family.clone(),
            style: d.style.clone(),
        }
    }
}

/// Glyph outline in em units (1.0 = font size), y pointing down, origin on
/// the baseline.
#[derive(Debug, Clone)]
pub struct Glyph {
    pub path: BezPath,
    pub advance: f32,
}

pub trait Font: Send + Sync {
    fn glyph(&self, ch: char) -> Option<Glyph>;
}

/// Source of fonts for text layers whose glyphs are not embedded.
pub trait FontManager: Send + Sync {
    /// `None` means the text is drawn without this font's glyphs.
    fn font(&self, spec: &FontSpec) -> Option<Arc<dyn Font>>;
}

/// Image described by a document asset: either decoded from an embedded data
/// URI or left for the resolver.
pub(crate) enum ImageSource {
    Embedded(ImageAsset),
    External(AssetRequest),
}

pub(crate) fn image_source(asset: &data::Asset) -> Result<Option<ImageSource>> {
    let Some(p) = &asset.p else {
        return Ok(None);
    };
    let width = asset.w.unwrap_or(0.0);
    let height = asset.h.unwrap_or(0.0);
    if p.starts_with("data:") {
        let bytes = decode_data_uri(p).ok_or_else(|| {
            LottieError::structural(format!("asset `{}`: malformed data URI", asset.id))
        })?;
        return Ok(Some(ImageSource::Embedded(ImageAsset {
            id: asset.id.clone(),
            width,
            height,
            bytes: bytes.into(),
        })));
    }
    let path = match &asset.u {
        Some(u) if !u.is_empty() => format!("{u}{p}"),
        _ => p.clone(),
    };
    Ok(Some(ImageSource::External(AssetRequest {
        id: asset.id.clone(),
        path,
    })))
}

fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
    let (header, payload) = uri.split_once(',')?;
    if !header.ends_with(";base64") {
        return None;
    }
    BASE64_STANDARD.decode(payload.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn asset(v: serde_json::Value) -> data::Asset {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn embedded_images_are_decoded() {
        let a = asset(json!({"id": "img", "w": 2, "h": 3, "e": 1, "p": "data:image/png;base64,AQID"}));
        match image_source(&a).unwrap() {
            Some(ImageSource::Embedded(img)) => {
                assert_eq!(&*img.bytes, &[1, 2, 3]);
                assert_eq!((img.width, img.height), (2.0, 3.0));
            }
            _ => panic!("expected embedded image"),
        }
    }

    #[test]
    fn external_images_join_directory() {
        let a = asset(json!({"id": "img", "u": "images/", "p": "a.png"}));
        match image_source(&a).unwrap() {
            Some(ImageSource::External(req)) => assert_eq!(req.path, "images/a.png"),
            _ => panic!("expected request"),
        }
    }

    #[test]
    fn broken_data_uri_is_structural() {
        let a = asset(json!({"id": "img", "p": "data:image/png;base64,***"}));
        assert!(matches!(image_source(&a), Err(LottieError::Structural(_))));
    }
}
