//! Layer tree.
//!
//! A [`LayerList`] owns its layers in declaration order. Parents and matte
//! sources are plain slot indices resolved in a link step after every layer
//! is decoded, so the tree has no ownership cycles and the render path never
//! resolves anything lazily.

mod effects;
mod text;

use std::collections::{HashMap, HashSet};

use glam::Vec4;
use kurbo::{Affine, Rect, Shape as _};
use lottie_data::model as data;
use tracing::{debug, trace, warn};

use crate::assets::{FontManager, ImageAsset};
use crate::config::EngineConfig;
use crate::content::{union, ContentGroup};
use crate::error::{LottieError, Result};
use crate::expressions::{EvalContext, ExpressionHost, Selector, TransformChannel, Value};
use crate::property::{AnimatedProperty, PropertyFactory};
use crate::surface::{CompositeMode, FillRule, LayerPaint, Paint, PaintStyle, Shader, Surface};
use crate::transform::{to_affine, Transform};

pub use effects::{EffectControl, EffectParam};
pub use text::TextContent;

/// How a layer is masked by its matte source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatteMode {
    Alpha,
    AlphaInverted,
    Luma,
    LumaInverted,
}

impl MatteMode {
    fn from_model(tt: u8) -> Option<Self> {
        match tt {
            1 => Some(MatteMode::Alpha),
            2 => Some(MatteMode::AlphaInverted),
            3 => Some(MatteMode::Luma),
            4 => Some(MatteMode::LumaInverted),
            _ => None,
        }
    }

    pub fn composite(self) -> CompositeMode {
        match self {
            MatteMode::Alpha => CompositeMode::DstIn,
            MatteMode::AlphaInverted => CompositeMode::DstOut,
            MatteMode::Luma => CompositeMode::LumaIn,
            MatteMode::LumaInverted => CompositeMode::LumaOut,
        }
    }
}

#[derive(Debug)]
pub struct Precomp {
    pub id: String,
    pub layers: LayerList,
}

#[derive(Debug)]
pub enum LayerKind {
    Precomp(Box<Precomp>),
    Solid { color: Vec4, width: f32, height: f32 },
    Image { asset: String },
    Null,
    Shape(ContentGroup),
    Text(Box<TextContent>),
    Unsupported(u8),
}

#[derive(Debug)]
pub struct Layer {
    name: String,
    ind: Option<i32>,
    parent_ind: Option<i32>,
    kind: LayerKind,
    transform: Transform,
    in_point: f32,
    out_point: f32,
    start_time: f32,
    stretch: f32,
    time_remap: Option<AnimatedProperty<f32>>,
    hidden: bool,
    matte_mode: Option<MatteMode>,
    matte_target: Option<i32>,
    matte_only: bool,
    effects: Vec<EffectControl>,
    /// Slots of the ancestors, immediate parent first.
    parent_chain: Vec<usize>,
    matte: Option<usize>,
}

impl Layer {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &LayerKind {
        &self.kind
    }

    pub fn effects(&self) -> &[EffectControl] {
        &self.effects
    }

    pub fn parent_chain(&self) -> &[usize] {
        &self.parent_chain
    }

    /// Slot of the layer masking this one.
    pub fn matte(&self) -> Option<usize> {
        self.matte
    }

    pub fn matte_mode(&self) -> Option<MatteMode> {
        self.matte_mode
    }

    fn in_range(&self, frame: f32) -> bool {
        self.in_point <= frame && frame < self.out_point
    }

    pub fn is_visible(&self, frame: f32) -> bool {
        !self.hidden && self.in_range(frame)
    }
}

/// Per-document state shared by every list while a composition is built.
pub(crate) struct BuildContext<'a> {
    pub factory: PropertyFactory<'a>,
    pub assets: HashMap<&'a str, &'a data::Asset>,
    pub fonts: &'a [data::FontDescriptor],
    pub chars: &'a [data::GlyphData],
    pub frame_rate: f32,
    pub duration: f32,
    /// Precompositions currently being built, to reject reference cycles.
    pub stack: Vec<String>,
}

/// Per-draw state shared by every list of a composition.
pub(crate) struct DrawEnv<'a> {
    pub config: &'a EngineConfig,
    pub images: &'a HashMap<String, ImageAsset>,
    pub fonts: Option<&'a dyn FontManager>,
    pub frame_rate: f32,
    pub start_frame: f32,
}

/// Layers of one composition or precomposition.
#[derive(Debug)]
pub struct LayerList {
    layers: Vec<Layer>,
    draw_order: Vec<usize>,
    frame_rate: f32,
    width: f32,
    height: f32,
    duration: f32,
}

impl LayerList {
    pub(crate) fn build(
        layers: &[data::Layer],
        width: f32,
        height: f32,
        cx: &mut BuildContext<'_>,
    ) -> Result<Self> {
        let decoded = layers
            .iter()
            .map(|l| decode_layer(l, width, height, cx))
            .collect::<Result<Vec<_>>>()?;
        let mut list = Self {
            layers: decoded,
            draw_order: Vec::new(),
            frame_rate: cx.frame_rate,
            width,
            height,
            duration: cx.duration,
        };
        list.link()?;
        debug!(
            layers = list.layers.len(),
            drawn = list.draw_order.len(),
            "linked layer list"
        );
        Ok(list)
    }

    fn link(&mut self) -> Result<()> {
        let n = self.layers.len();
        let mut by_ind = HashMap::new();
        for (slot, layer) in self.layers.iter().enumerate() {
            if let Some(ind) = layer.ind {
                by_ind.entry(ind).or_insert(slot);
            }
        }

        let parents: Vec<Option<usize>> = self
            .layers
            .iter()
            .map(|l| {
                let p = l.parent_ind?;
                let slot = by_ind.get(&p).copied();
                if slot.is_none() {
                    warn!(layer = %l.name, parent = p, "parent layer not found, ignoring");
                }
                slot
            })
            .collect();
        for slot in 0..n {
            let mut chain = Vec::new();
            let mut cur = parents[slot];
            while let Some(p) = cur {
                if p == slot || chain.len() >= n {
                    return Err(LottieError::structural(format!(
                        "parent cycle through layer `{}`",
                        self.layers[slot].name
                    )));
                }
                chain.push(p);
                cur = parents[p];
            }
            self.layers[slot].parent_chain = chain;
        }

        let mut sources: HashSet<usize> = self
            .layers
            .iter()
            .enumerate()
            .filter(|(_, l)| l.matte_only)
            .map(|(slot, _)| slot)
            .collect();
        for slot in 0..n {
            if self.layers[slot].matte_mode.is_none() {
                continue;
            }
            let source = match self.layers[slot].matte_target {
                Some(tp) => by_ind.get(&tp).copied(),
                None => slot.checked_sub(1),
            };
            // unresolvable mattes draw the layer unmasked
            let Some(source) = source.filter(|&s| s != slot) else {
                let name = &self.layers[slot].name;
                if crate::first_report(format!("matte:{name}")) {
                    warn!(layer = %name, "matte source not found, drawing without matte");
                }
                continue;
            };
            self.layers[slot].matte = Some(source);
            sources.insert(source);
        }

        self.draw_order = (0..n).rev().filter(|s| !sources.contains(s)).collect();
        Ok(())
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn get(&self, slot: usize) -> Option<&Layer> {
        self.layers.get(slot)
    }

    /// Slots drawn in a normal pass, in paint order. Matte sources are never
    /// part of it.
    pub fn draw_order(&self) -> &[usize] {
        &self.draw_order
    }

    /// Names of the layers a pass at `frame` paints, in paint order.
    pub fn draw_list(&self, frame: f32) -> Vec<&str> {
        self.draw_order
            .iter()
            .map(|&s| &self.layers[s])
            .filter(|l| l.is_visible(frame))
            .map(|l| l.name.as_str())
            .collect()
    }

    fn context<'a>(&'a self, slot: usize, frame: f32, env: &DrawEnv<'_>) -> EvalContext<'a> {
        EvalContext::new(self, slot, frame, env.config.max_expression_depth)
            .with_policy(env.config.expression_errors)
    }

    /// Layer matrix with its parents applied, root ancestor outermost.
    pub(crate) fn world_matrix(&self, slot: usize, frame: f32, env: &DrawEnv<'_>) -> Result<Affine> {
        let layer = &self.layers[slot];
        let mut m = layer.transform.matrix(&self.context(slot, frame, env))?;
        for &p in &layer.parent_chain {
            m = self.layers[p].transform.matrix(&self.context(p, frame, env))? * m;
        }
        Ok(to_affine(m))
    }

    /// Frame the children of a precomposition layer see.
    fn child_frame(&self, slot: usize, frame: f32, env: &DrawEnv<'_>) -> Result<f32> {
        let layer = &self.layers[slot];
        match &layer.time_remap {
            Some(tm) => {
                let local = frame / layer.stretch;
                let mut seconds = tm.value(&self.context(slot, local, env))?;
                if !seconds.is_finite() {
                    if crate::first_report(format!("time-remap:{}", layer.name)) {
                        warn!(layer = %layer.name, "time remap is not finite, using keyframes");
                    }
                    seconds = tm.interpolated(local);
                }
                Ok(seconds * env.frame_rate - env.start_frame)
            }
            None => Ok((frame - layer.start_time) / layer.stretch),
        }
    }

    pub(crate) fn draw(
        &self,
        surface: &mut dyn Surface,
        env: &DrawEnv<'_>,
        matrix: Affine,
        alpha: f32,
        frame: f32,
    ) -> Result<()> {
        for &slot in &self.draw_order {
            if self.layers[slot].is_visible(frame) {
                self.draw_layer(slot, surface, env, matrix, alpha, frame)?;
            }
        }
        Ok(())
    }

    fn draw_layer(
        &self,
        slot: usize,
        surface: &mut dyn Surface,
        env: &DrawEnv<'_>,
        matrix: Affine,
        alpha: f32,
        frame: f32,
    ) -> Result<()> {
        let layer = &self.layers[slot];
        let (Some(source), Some(mode)) = (layer.matte, layer.matte_mode) else {
            return self.draw_content(slot, surface, env, matrix, alpha, frame);
        };
        trace!(layer = %layer.name, matte = %self.layers[source].name, "drawing matted layer");
        surface.save_layer(LayerPaint::alpha(1.0));
        let mut result = self.draw_content(slot, surface, env, matrix, alpha, frame);
        if result.is_ok() {
            surface.save_layer(LayerPaint::mode(mode.composite()));
            if self.layers[source].in_range(frame) {
                result = self.draw_content(source, surface, env, matrix, 1.0, frame);
            }
            surface.restore();
        }
        surface.restore();
        result
    }

    fn draw_content(
        &self,
        slot: usize,
        surface: &mut dyn Surface,
        env: &DrawEnv<'_>,
        parent_matrix: Affine,
        parent_alpha: f32,
        frame: f32,
    ) -> Result<()> {
        let layer = &self.layers[slot];
        let ctx = self.context(slot, frame, env);
        let matrix = parent_matrix * self.world_matrix(slot, frame, env)?;
        let alpha = parent_alpha * layer.transform.opacity(&ctx)?;
        if alpha <= 0.0 {
            return Ok(());
        }
        let offscreen = alpha < 1.0 && env.config.offscreen_alpha;

        match &layer.kind {
            LayerKind::Shape(content) => {
                if offscreen && content.paint_count() > 1 {
                    surface.save_layer(LayerPaint::alpha(alpha));
                    let result = content.draw(surface, &ctx, matrix, 1.0);
                    surface.restore();
                    result
                } else {
                    content.draw(surface, &ctx, matrix, alpha)
                }
            }
            LayerKind::Solid {
                color,
                width,
                height,
            } => {
                let rect = Rect::new(0.0, 0.0, *width as f64, *height as f64);
                let paint = Paint {
                    shader: Shader::Solid(*color),
                    opacity: alpha,
                    style: PaintStyle::Fill(FillRule::NonZero),
                };
                surface.draw_path(&rect.to_path(0.1), matrix, &paint);
                Ok(())
            }
            LayerKind::Image { asset } => {
                match env.images.get(asset) {
                    Some(image) => surface.draw_image(image, matrix, alpha),
                    None => {
                        if crate::first_report(format!("image:{asset}")) {
                            warn!(asset = %asset, "image not resolved, skipping layer");
                        }
                    }
                }
                Ok(())
            }
            LayerKind::Text(text) => text.draw(surface, &ctx, env.fonts, matrix, alpha),
            LayerKind::Precomp(pre) => {
                let child_frame = self.child_frame(slot, frame, env)?;
                surface.save();
                surface.clip_rect(pre.layers.clip_rect(), matrix);
                let result = if offscreen {
                    surface.save_layer(LayerPaint::alpha(alpha));
                    let r = pre.layers.draw(surface, env, matrix, 1.0, child_frame);
                    surface.restore();
                    r
                } else {
                    pre.layers.draw(surface, env, matrix, alpha, child_frame)
                };
                surface.restore();
                result
            }
            LayerKind::Null | LayerKind::Unsupported(_) => Ok(()),
        }
    }

    fn clip_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width as f64, self.height as f64)
    }

    /// Union of everything a pass at `frame` would paint, without drawing.
    pub(crate) fn bounds(&self, env: &DrawEnv<'_>, matrix: Affine, frame: f32) -> Result<Option<Rect>> {
        let mut bounds = None;
        for &slot in &self.draw_order {
            if self.layers[slot].is_visible(frame) {
                bounds = union(bounds, self.layer_bounds(slot, env, matrix, frame)?);
            }
        }
        Ok(bounds)
    }

    fn layer_bounds(
        &self,
        slot: usize,
        env: &DrawEnv<'_>,
        parent_matrix: Affine,
        frame: f32,
    ) -> Result<Option<Rect>> {
        let layer = &self.layers[slot];
        let ctx = self.context(slot, frame, env);
        let matrix = parent_matrix * self.world_matrix(slot, frame, env)?;
        let rect = |w: f32, h: f32| {
            Some(matrix.transform_rect_bbox(Rect::new(0.0, 0.0, w as f64, h as f64)))
        };
        match &layer.kind {
            LayerKind::Shape(content) => content.bounds(&ctx, matrix),
            LayerKind::Solid { width, height, .. } => Ok(rect(*width, *height)),
            LayerKind::Image { asset } => Ok(env
                .images
                .get(asset)
                .and_then(|img| rect(img.width, img.height))),
            LayerKind::Text(text) => text.bounds(&ctx, env.fonts, matrix),
            LayerKind::Precomp(pre) => {
                let child_frame = self.child_frame(slot, frame, env)?;
                let clip = matrix.transform_rect_bbox(pre.layers.clip_rect());
                Ok(pre
                    .layers
                    .bounds(env, matrix, child_frame)?
                    .map(|b| b.intersect(clip)))
            }
            LayerKind::Null | LayerKind::Unsupported(_) => Ok(None),
        }
    }
}

impl ExpressionHost for LayerList {
    fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn duration_frames(&self) -> f32 {
        self.duration
    }

    fn layer_count(&self) -> usize {
        self.layers.len()
    }

    fn layer_by_name(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.name == name)
    }

    fn layer_by_index(&self, index: usize) -> Option<usize> {
        self.layers
            .iter()
            .position(|l| l.ind.map_or(false, |i| i as usize == index))
            .or_else(|| (index >= 1 && index <= self.layers.len()).then(|| index - 1))
    }

    fn layer_name(&self, layer: usize) -> &str {
        &self.layers[layer].name
    }

    fn layer_index(&self, layer: usize) -> usize {
        match self.layers[layer].ind {
            Some(i) if i >= 0 => i as usize,
            _ => layer + 1,
        }
    }

    fn layer_timing(&self, layer: usize) -> (f32, f32, f32) {
        let l = &self.layers[layer];
        (l.in_point, l.out_point, l.start_time)
    }

    fn transform_value(
        &self,
        layer: usize,
        channel: TransformChannel,
        ctx: &EvalContext<'_>,
    ) -> Result<Value> {
        self.layers[layer].transform.channel(channel, ctx)
    }

    fn effect(&self, layer: usize, selector: &Selector) -> Option<usize> {
        effects::find_effect(&self.layers[layer].effects, selector)
    }

    fn effect_param(&self, layer: usize, effect: usize, selector: &Selector) -> Option<usize> {
        self.layers[layer].effects.get(effect)?.param(selector)
    }

    fn effect_param_value(
        &self,
        layer: usize,
        effect: usize,
        param: usize,
        ctx: &EvalContext<'_>,
    ) -> Result<Value> {
        match self.layers[layer].effects.get(effect) {
            Some(e) => e.param_value(param, ctx),
            None => Ok(Value::Number(0.0)),
        }
    }
}

fn decode_layer(
    l: &data::Layer,
    width: f32,
    height: f32,
    cx: &mut BuildContext<'_>,
) -> Result<Layer> {
    let name = l.nm.clone().unwrap_or_default();
    let factory = cx.factory;
    let kind = match l.ty {
        0 => {
            let id = required_ref(l, &name)?;
            let asset = lookup_asset(cx, id, &name)?;
            let Some(children) = &asset.layers else {
                return Err(LottieError::structural(format!(
                    "layer `{name}` references `{id}`, which is not a precomposition"
                )));
            };
            if cx.stack.iter().any(|s| s == id) {
                return Err(LottieError::structural(format!(
                    "precomposition `{id}` contains itself"
                )));
            }
            let w = l.w.or(asset.w).unwrap_or(width);
            let h = l.h.or(asset.h).unwrap_or(height);
            cx.stack.push(id.to_string());
            let layers = LayerList::build(children, w, h, cx);
            cx.stack.pop();
            LayerKind::Precomp(Box::new(Precomp {
                id: id.to_string(),
                layers: layers?,
            }))
        }
        1 => LayerKind::Solid {
            color: parse_hex_color(l.color.as_deref().unwrap_or("#000000")).unwrap_or_else(|| {
                warn!(layer = %name, "unreadable solid color, using black");
                Vec4::new(0.0, 0.0, 0.0, 1.0)
            }),
            width: l.sw.unwrap_or(width),
            height: l.sh.unwrap_or(height),
        },
        2 => {
            let id = required_ref(l, &name)?;
            lookup_asset(cx, id, &name)?;
            LayerKind::Image {
                asset: id.to_string(),
            }
        }
        3 => LayerKind::Null,
        4 => LayerKind::Shape(ContentGroup::from_shapes(
            l.shapes.as_deref().unwrap_or(&[]),
            &factory,
        )?),
        5 => {
            let text = l.t.as_ref().ok_or_else(|| {
                LottieError::structural(format!("text layer `{name}` has no text data"))
            })?;
            LayerKind::Text(Box::new(TextContent::from_model(
                text, cx.fonts, cx.chars, &factory,
            )?))
        }
        other => {
            if crate::first_report(format!("layer:{other}")) {
                warn!(ty = other, "skipping unsupported layer type");
            }
            LayerKind::Unsupported(other)
        }
    };

    let time_remap = match &l.tm {
        Some(tm) if l.ty == 0 => Some(factory.scalar(tm, 0.0)?),
        _ => None,
    };
    let effects = l
        .ef
        .iter()
        .flatten()
        .map(|e| EffectControl::from_model(e, &factory))
        .collect::<Result<Vec<_>>>()?;

    Ok(Layer {
        ind: l.ind,
        parent_ind: l.parent,
        transform: Transform::from_model(&l.ks, &factory)?,
        in_point: l.ip,
        out_point: l.op,
        start_time: l.st,
        stretch: if l.sr.abs() < f32::EPSILON { 1.0 } else { l.sr },
        time_remap,
        hidden: l.hd.unwrap_or(false),
        matte_mode: l.tt.and_then(MatteMode::from_model),
        matte_target: l.tp,
        matte_only: l.td == Some(1),
        effects,
        parent_chain: Vec::new(),
        matte: None,
        kind,
        name,
    })
}

fn required_ref<'l>(l: &'l data::Layer, name: &str) -> Result<&'l str> {
    l.ref_id
        .as_deref()
        .ok_or_else(|| LottieError::structural(format!("layer `{name}` has no refId")))
}

fn lookup_asset<'a>(cx: &BuildContext<'a>, id: &str, layer: &str) -> Result<&'a data::Asset> {
    cx.assets.get(id).copied().ok_or_else(|| {
        LottieError::structural(format!("layer `{layer}` references missing asset `{id}`"))
    })
}

/// `#rrggbb` or `#rgb`.
fn parse_hex_color(s: &str) -> Option<Vec4> {
    let hex = s.trim().trim_start_matches('#');
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };
    let channel = |i: usize| {
        u8::from_str_radix(expanded.get(i..i + 2)?, 16)
            .ok()
            .map(|v| v as f32 / 255.0)
    };
    Some(Vec4::new(channel(0)?, channel(2)?, channel(4)?, 1.0))
}
