use std::collections::HashMap;
use std::sync::Arc;

use kurbo::{Affine, Rect};
use lottie_data::model::{self as data, LottieJson};
use tracing::{debug, trace};

use crate::assets::{image_source, AssetRequest, AssetResolver, FontManager, ImageAsset, ImageSource};
use crate::config::EngineConfig;
use crate::error::{LottieError, Result};
use crate::layers::{BuildContext, DrawEnv, LayerList};
use crate::property::PropertyFactory;
use crate::surface::Surface;

/// Named time range of the document.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub name: String,
    /// Start frame.
    pub start: f32,
    /// Length in frames.
    pub duration: f32,
}

/// A fully built, render-ready animation.
///
/// Construction either succeeds with a complete tree or fails with
/// [`LottieError::Structural`]. A composition is `Send` so it can be built
/// on a worker thread, but not `Sync`: drawing mutates per-node caches, so
/// concurrent consumers each need their own instance.
pub struct Composition {
    config: EngineConfig,
    name: Option<String>,
    frame_rate: f32,
    start_frame: f32,
    end_frame: f32,
    width: f32,
    height: f32,
    markers: Vec<Marker>,
    root: LayerList,
    images: HashMap<String, ImageAsset>,
    image_sizes: HashMap<String, (f32, f32)>,
    external_images: Vec<AssetRequest>,
    fonts: Option<Arc<dyn FontManager>>,
}

impl std::fmt::Debug for Composition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composition")
            .field("name", &self.name)
            .field("frame_rate", &self.frame_rate)
            .field("frames", &(self.start_frame..self.end_frame))
            .field("size", &(self.width, self.height))
            .field("layers", &self.root.layers().len())
            .finish()
    }
}

impl Composition {
    pub fn from_slice(bytes: &[u8], config: EngineConfig) -> Result<Self> {
        let model = LottieJson::from_slice(bytes)?;
        Self::from_model(&model, config)
    }

    pub fn from_json(text: &str, config: EngineConfig) -> Result<Self> {
        Self::from_slice(text.as_bytes(), config)
    }

    pub fn from_model(model: &LottieJson, config: EngineConfig) -> Result<Self> {
        if !(model.fr.is_finite() && model.fr > 0.0) {
            return Err(LottieError::structural(format!(
                "frame rate must be positive, got {}",
                model.fr
            )));
        }
        if model.op < model.ip {
            return Err(LottieError::structural(format!(
                "out point {} precedes in point {}",
                model.op, model.ip
            )));
        }
        if model.layers.is_empty() {
            return Err(LottieError::structural("document has no layers"));
        }

        let mut images = HashMap::new();
        let mut image_sizes = HashMap::new();
        let mut external_images = Vec::new();
        for asset in model.assets.iter().filter(|a| !a.is_precomp()) {
            match image_source(asset)? {
                Some(ImageSource::Embedded(image)) => {
                    image_sizes.insert(asset.id.clone(), (image.width, image.height));
                    images.insert(asset.id.clone(), image);
                }
                Some(ImageSource::External(request)) => {
                    image_sizes.insert(
                        asset.id.clone(),
                        (asset.w.unwrap_or(0.0), asset.h.unwrap_or(0.0)),
                    );
                    external_images.push(request);
                }
                None => {}
            }
        }

        let (width, height) = (model.w as f32, model.h as f32);
        let root = {
            let mut cx = BuildContext {
                factory: PropertyFactory::new(&config),
                assets: model.assets.iter().map(|a| (a.id.as_str(), a)).collect(),
                fonts: model.fonts.as_ref().map(|f| f.list.as_slice()).unwrap_or_default(),
                chars: &model.chars,
                frame_rate: model.fr,
                duration: model.op - model.ip,
                stack: Vec::new(),
            };
            LayerList::build(&model.layers, width, height, &mut cx)?
        };

        let markers = model.markers.iter().map(marker_from_model).collect();
        debug!(
            name = model.nm.as_deref().unwrap_or(""),
            layers = root.layers().len(),
            images = images.len() + external_images.len(),
            "built composition"
        );
        Ok(Self {
            name: model.nm.clone(),
            frame_rate: model.fr,
            start_frame: model.ip,
            end_frame: model.op,
            width,
            height,
            markers,
            root,
            images,
            image_sizes,
            external_images,
            fonts: None,
            config,
        })
    }

    /// Draws the frame at `frame`, clamped into the document's range.
    ///
    /// Every save issued on `surface` is restored before returning, also on
    /// error.
    pub fn draw(
        &self,
        surface: &mut dyn Surface,
        matrix: Affine,
        alpha: f32,
        frame: f32,
    ) -> Result<()> {
        let frame = self.clamp_frame(frame);
        trace!(frame, "draw");
        self.root
            .draw(surface, &self.env(), matrix, alpha.clamp(0.0, 1.0), frame)
    }

    /// Bounds of what [`Composition::draw`] paints at `frame`, without
    /// drawing. `None` when nothing is visible.
    pub fn bounds(&self, frame: f32) -> Result<Option<Rect>> {
        self.root
            .bounds(&self.env(), Affine::IDENTITY, self.clamp_frame(frame))
    }

    /// Names of the top-level layers drawn at `frame`, in paint order.
    pub fn draw_list(&self, frame: f32) -> Vec<&str> {
        self.root.draw_list(self.clamp_frame(frame))
    }

    fn env(&self) -> DrawEnv<'_> {
        DrawEnv {
            config: &self.config,
            images: &self.images,
            fonts: self.fonts.as_deref(),
            frame_rate: self.frame_rate,
            start_frame: self.start_frame,
        }
    }

    /// Layers are visible strictly before `op`, so frames at or past the end
    /// hold on the last whole frame instead.
    fn clamp_frame(&self, frame: f32) -> f32 {
        if frame.is_nan() {
            return self.start_frame;
        }
        if frame >= self.end_frame {
            return (self.end_frame - 1.0).max(self.start_frame);
        }
        frame.max(self.start_frame)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    pub fn start_frame(&self) -> f32 {
        self.start_frame
    }

    pub fn end_frame(&self) -> f32 {
        self.end_frame
    }

    pub fn duration_frames(&self) -> f32 {
        self.end_frame - self.start_frame
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f32 {
        self.duration_frames() / self.frame_rate
    }

    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn marker(&self, name: &str) -> Option<&Marker> {
        self.markers.iter().find(|m| m.name == name)
    }

    pub fn layers(&self) -> &LayerList {
        &self.root
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.root.layers().iter().map(|l| l.name()).collect()
    }

    /// `(layer, effect)` name pairs of every top-level effect.
    pub fn effect_names(&self) -> Vec<(&str, &str)> {
        self.root
            .layers()
            .iter()
            .flat_map(|l| l.effects().iter().map(move |e| (l.name(), e.name())))
            .collect()
    }

    /// Images the document references but does not embed, and that have not
    /// been supplied yet.
    pub fn missing_images(&self) -> impl Iterator<Item = &AssetRequest> {
        self.external_images
            .iter()
            .filter(|r| !self.images.contains_key(&r.id))
    }

    /// Supplies encoded bytes for image asset `id`.
    pub fn set_image(&mut self, id: &str, bytes: Vec<u8>) {
        let (width, height) = self.image_sizes.get(id).copied().unwrap_or((0.0, 0.0));
        self.images.insert(
            id.to_string(),
            ImageAsset {
                id: id.to_string(),
                width,
                height,
                bytes: bytes.into(),
            },
        );
    }

    /// Requests every missing image from `resolver`. Stops at the first
    /// failure; images fetched before it are kept.
    pub fn resolve_images(&mut self, resolver: &dyn AssetResolver) -> Result<()> {
        let pending: Vec<AssetRequest> = self.missing_images().cloned().collect();
        for request in pending {
            let bytes = resolver.resolve(&request)?;
            self.set_image(&request.id, bytes);
        }
        Ok(())
    }

    pub fn set_font_manager(&mut self, fonts: Arc<dyn FontManager>) {
        self.fonts = Some(fonts);
    }
}

fn marker_from_model(m: &data::Marker) -> Marker {
    Marker {
        name: m.cm.clone().unwrap_or_default(),
        start: m.tm.unwrap_or(0.0),
        duration: m.dr.unwrap_or(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(extra: serde_json::Value) -> serde_json::Value {
        let mut d = json!({
            "v": "5.7.0", "nm": "test", "ip": 0, "op": 60, "fr": 30, "w": 100, "h": 50,
            "layers": [{"ty": 3, "nm": "null", "ip": 0, "op": 60}]
        });
        if let (Some(d), Some(extra)) = (d.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                d.insert(k.clone(), v.clone());
            }
        }
        d
    }

    fn build(v: serde_json::Value) -> Result<Composition> {
        Composition::from_json(&v.to_string(), EngineConfig::default())
    }

    #[test]
    fn accessors() {
        let comp = build(doc(json!({
            "markers": [{"cm": "intro", "tm": 10, "dr": 20}]
        })))
        .unwrap();
        assert_eq!(comp.duration(), 2.0);
        assert_eq!(comp.size(), (100.0, 50.0));
        assert_eq!(comp.layer_names(), vec!["null"]);
        assert_eq!(
            comp.marker("intro"),
            Some(&Marker {
                name: "intro".into(),
                start: 10.0,
                duration: 20.0
            })
        );
    }

    #[test]
    fn bad_documents_are_structural() {
        for bad in [
            doc(json!({"fr": 0})),
            doc(json!({"layers": []})),
            doc(json!({"op": -5})),
        ] {
            assert!(matches!(build(bad), Err(LottieError::Structural(_))));
        }
        assert!(matches!(
            Composition::from_json("{\"ip\": 0", EngineConfig::default()),
            Err(LottieError::Structural(_))
        ));
    }

    #[test]
    fn external_images_are_injected() {
        let mut comp = build(doc(json!({
            "assets": [{"id": "img", "w": 8, "h": 4, "u": "images/", "p": "a.png"}],
            "layers": [{"ty": 2, "nm": "pic", "refId": "img", "ip": 0, "op": 60}]
        })))
        .unwrap();
        assert_eq!(comp.missing_images().count(), 1);

        struct Fixed;
        impl AssetResolver for Fixed {
            fn resolve(&self, request: &AssetRequest) -> Result<Vec<u8>> {
                assert_eq!(request.path, "images/a.png");
                Ok(vec![1, 2, 3])
            }
        }
        comp.resolve_images(&Fixed).unwrap();
        assert_eq!(comp.missing_images().count(), 0);
        assert_eq!(comp.bounds(0.0).unwrap(), Some(Rect::new(0.0, 0.0, 8.0, 4.0)));
    }

    #[test]
    fn frames_past_the_end_hold_the_last_frame() {
        let comp = build(doc(json!({
            "layers": [{"ty": 1, "nm": "solid", "ip": 0, "op": 60, "sc": "#ff0000", "sw": 10, "sh": 10}]
        })))
        .unwrap();
        for frame in [59.0, 60.0, 100.0, f32::INFINITY] {
            assert_eq!(comp.draw_list(frame), vec!["solid"], "frame {frame}");
            assert!(comp.bounds(frame).unwrap().is_some(), "frame {frame}");
        }
        assert_eq!(comp.draw_list(-10.0), vec!["solid"]);
    }

    #[test]
    fn composition_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Composition>();
    }
}
