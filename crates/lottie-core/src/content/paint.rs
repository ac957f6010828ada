use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use glam::{Vec2, Vec4};
use kurbo::Point;
use lottie_data::model as data;

use crate::error::Result;
use crate::expressions::EvalContext;
use crate::property::{AnimatedProperty, PropertyFactory};
use crate::surface::{
    Dash, FillRule, GradientGeometry, GradientShader, GradientStop, LineCap, LineJoin, Paint,
    PaintStyle, Shader, StrokeStyle,
};

/// Fill or stroke item, applied to the geometry declared before it.
#[derive(Debug)]
pub struct PaintNode {
    source: PaintSource,
    opacity: AnimatedProperty<f32>,
    style: StyleSource,
}

#[derive(Debug)]
enum PaintSource {
    Solid(AnimatedProperty<Vec4>),
    Gradient(Box<Gradient>),
}

#[derive(Debug)]
enum StyleSource {
    Fill(FillRule),
    Stroke(StrokeParams),
}

fn fill_rule(r: Option<u8>) -> FillRule {
    if r == Some(2) {
        FillRule::EvenOdd
    } else {
        FillRule::NonZero
    }
}

impl PaintNode {
    pub fn fill(shape: &data::FillShape, factory: &PropertyFactory<'_>) -> Result<Self> {
        Ok(Self {
            source: PaintSource::Solid(factory.color(&shape.c)?),
            opacity: factory.scalar(&shape.o, 100.0)?,
            style: StyleSource::Fill(fill_rule(shape.r)),
        })
    }

    pub fn stroke(shape: &data::StrokeShape, factory: &PropertyFactory<'_>) -> Result<Self> {
        Ok(Self {
            source: PaintSource::Solid(factory.color(&shape.c)?),
            opacity: factory.scalar(&shape.o, 100.0)?,
            style: StyleSource::Stroke(StrokeParams::new(
                &shape.w, shape.lc, shape.lj, shape.ml, &shape.d, factory,
            )?),
        })
    }

    pub fn gradient_fill(
        shape: &data::GradientFillShape,
        factory: &PropertyFactory<'_>,
    ) -> Result<Self> {
        let gradient = Gradient::new(
            shape.t,
            &shape.s,
            &shape.e,
            shape.h.as_ref(),
            shape.a.as_ref(),
            &shape.g,
            factory,
        )?;
        Ok(Self {
            source: PaintSource::Gradient(Box::new(gradient)),
            opacity: factory.scalar(&shape.o, 100.0)?,
            style: StyleSource::Fill(fill_rule(shape.r)),
        })
    }

    pub fn gradient_stroke(
        shape: &data::GradientStrokeShape,
        factory: &PropertyFactory<'_>,
    ) -> Result<Self> {
        let gradient = Gradient::new(
            shape.t,
            &shape.s,
            &shape.e,
            shape.h.as_ref(),
            shape.a.as_ref(),
            &shape.g,
            factory,
        )?;
        Ok(Self {
            source: PaintSource::Gradient(Box::new(gradient)),
            opacity: factory.scalar(&shape.o, 100.0)?,
            style: StyleSource::Stroke(StrokeParams::new(
                &shape.w, shape.lc, shape.lj, shape.ml, &shape.d, factory,
            )?),
        })
    }

    /// Resolves the paint at `ctx.frame`, with `alpha` folded into its
    /// opacity.
    pub fn paint(&self, ctx: &EvalContext<'_>, alpha: f32) -> Result<Paint> {
        let opacity = (self.opacity.value(ctx)? / 100.0).clamp(0.0, 1.0) * alpha;
        let shader = match &self.source {
            PaintSource::Solid(color) => {
                Shader::Solid(color.value(ctx)?.clamp(Vec4::ZERO, Vec4::ONE))
            }
            PaintSource::Gradient(g) => g.shader(ctx)?,
        };
        let style = match &self.style {
            StyleSource::Fill(rule) => PaintStyle::Fill(*rule),
            StyleSource::Stroke(params) => PaintStyle::Stroke(params.resolve(ctx)?),
        };
        Ok(Paint {
            shader,
            opacity,
            style,
        })
    }

    /// Stroke width at `ctx.frame`, `None` for fills.
    pub fn stroke_width(&self, ctx: &EvalContext<'_>) -> Result<Option<f32>> {
        match &self.style {
            StyleSource::Fill(_) => Ok(None),
            StyleSource::Stroke(params) => Ok(Some(params.width.value(ctx)?.max(0.0))),
        }
    }

    pub fn gradient(&self) -> Option<&Gradient> {
        match &self.source {
            PaintSource::Gradient(g) => Some(g),
            PaintSource::Solid(_) => None,
        }
    }
}

#[derive(Debug)]
struct StrokeParams {
    width: AnimatedProperty<f32>,
    cap: LineCap,
    join: LineJoin,
    miter_limit: f32,
    dashes: Vec<(DashRole, AnimatedProperty<f32>)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DashRole {
    Dash,
    Gap,
    Offset,
}

impl StrokeParams {
    fn new(
        width: &data::Property<f32>,
        lc: u8,
        lj: u8,
        ml: Option<f32>,
        dashes: &[data::DashProperty],
        factory: &PropertyFactory<'_>,
    ) -> Result<Self> {
        let dashes = dashes
            .iter()
            .map(|d| {
                let role = match d.n.as_deref() {
                    Some("g") => DashRole::Gap,
                    Some("o") => DashRole::Offset,
                    _ => DashRole::Dash,
                };
                Ok((role, factory.scalar(&d.v, 0.0)?))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            width: factory.scalar(width, 1.0)?,
            cap: match lc {
                2 => LineCap::Round,
                3 => LineCap::Square,
                _ => LineCap::Butt,
            },
            join: match lj {
                2 => LineJoin::Round,
                3 => LineJoin::Bevel,
                _ => LineJoin::Miter,
            },
            miter_limit: ml.unwrap_or(4.0),
            dashes,
        })
    }

    fn resolve(&self, ctx: &EvalContext<'_>) -> Result<StrokeStyle> {
        let mut intervals = Vec::new();
        let mut offset = 0.0;
        for (role, value) in &self.dashes {
            let v = value.value(ctx)?;
            match role {
                DashRole::Offset => offset = v,
                _ => intervals.push(v.max(0.0)),
            }
        }
        let dash = if intervals.iter().any(|v| *v > 0.0) {
            if intervals.len() % 2 == 1 {
                intervals.extend_from_within(..);
            }
            Some(Dash { intervals, offset })
        } else {
            None
        };
        Ok(StrokeStyle {
            width: self.width.value(ctx)?.max(0.0),
            cap: self.cap,
            join: self.join,
            miter_limit: self.miter_limit,
            dash,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientKind {
    Linear,
    Radial,
}

/// Gradient paint source with its shader cache.
#[derive(Debug)]
pub struct Gradient {
    kind: GradientKind,
    start: AnimatedProperty<Vec2>,
    end: AnimatedProperty<Vec2>,
    highlight_length: AnimatedProperty<f32>,
    highlight_angle: AnimatedProperty<f32>,
    colors: AnimatedProperty<Vec<f32>>,
    color_count: usize,
    cache: RefCell<GradientCache>,
}

impl Gradient {
    fn new(
        t: u8,
        s: &data::Property<data::Vec2>,
        e: &data::Property<data::Vec2>,
        h: Option<&data::Property<f32>>,
        a: Option<&data::Property<f32>>,
        g: &data::GradientColors,
        factory: &PropertyFactory<'_>,
    ) -> Result<Self> {
        Ok(Self {
            kind: if t == 2 {
                GradientKind::Radial
            } else {
                GradientKind::Linear
            },
            start: factory.vec2(s)?,
            end: factory.vec2(e)?,
            highlight_length: factory.optional_scalar(h, 0.0)?,
            highlight_angle: factory.optional_scalar(a, 0.0)?,
            colors: factory.floats(&g.k)?,
            color_count: g.p as usize,
            cache: RefCell::new(GradientCache::new(factory.config().gradient_cache_capacity)),
        })
    }

    pub fn kind(&self) -> GradientKind {
        self.kind
    }

    fn shader(&self, ctx: &EvalContext<'_>) -> Result<Shader> {
        let stops = parse_gradient_stops(&self.colors.value(ctx)?, self.color_count);
        let shader = self.cache.borrow_mut().shader(stops);
        Ok(Shader::Gradient {
            shader,
            geometry: self.geometry(ctx)?,
        })
    }

    fn geometry(&self, ctx: &EvalContext<'_>) -> Result<GradientGeometry> {
        let start = self.start.value(ctx)?;
        let end = self.end.value(ctx)?;
        let pt = |v: Vec2| Point::new(v.x as f64, v.y as f64);
        Ok(match self.kind {
            GradientKind::Linear => GradientGeometry::Linear {
                start: pt(start),
                end: pt(end),
            },
            GradientKind::Radial => {
                let delta = end - start;
                let radius = delta.length();
                let highlight = (self.highlight_length.value(ctx)? / 100.0).clamp(-0.99, 0.99);
                let angle = self.highlight_angle.value(ctx)?.to_radians() + delta.y.atan2(delta.x);
                let focal = start + Vec2::from_angle(angle) * radius * highlight;
                GradientGeometry::Radial {
                    center: pt(start),
                    radius: radius as f64,
                    focal: pt(focal),
                }
            }
        })
    }

    pub fn cache_stats(&self) -> CacheStats {
        let cache = self.cache.borrow();
        CacheStats {
            hits: cache.hits,
            misses: cache.misses,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Most-recently-used shaders keyed by their color stops.
#[derive(Debug)]
pub struct GradientCache {
    capacity: usize,
    entries: Vec<Arc<GradientShader>>,
    hits: u64,
    misses: u64,
}

impl GradientCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Vec::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn shader(&mut self, stops: Vec<GradientStop>) -> Arc<GradientShader> {
        let key = stops_key(&stops);
        if let Some(pos) = self
            .entries
            .iter()
            .position(|s| s.key == key && s.stops == stops)
        {
            self.hits += 1;
            let shader = self.entries.remove(pos);
            self.entries.insert(0, shader.clone());
            return shader;
        }
        self.misses += 1;
        let shader = Arc::new(GradientShader { stops, key });
        self.entries.insert(0, shader.clone());
        self.entries.truncate(self.capacity);
        shader
    }
}

fn stops_key(stops: &[GradientStop]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for stop in stops {
        stop.offset.to_bits().hash(&mut hasher);
        for c in stop.color.to_array() {
            c.to_bits().hash(&mut hasher);
        }
    }
    hasher.finish()
}

struct ColorStop {
    t: f32,
    rgb: [f32; 3],
}

struct AlphaStop {
    t: f32,
    a: f32,
}

/// Splits the flat document array into `color_count` `[t, r, g, b]` stops
/// followed by `[t, a]` alpha stops, merged into RGBA stops at the union of
/// their offsets.
pub fn parse_gradient_stops(raw: &[f32], color_count: usize) -> Vec<GradientStop> {
    let color_len = (color_count * 4).min(raw.len());
    let color_stops: Vec<ColorStop> = raw[..color_len]
        .chunks_exact(4)
        .map(|c| ColorStop {
            t: c[0],
            rgb: [c[1], c[2], c[3]],
        })
        .collect();
    let alpha_stops: Vec<AlphaStop> = raw[color_len..]
        .chunks_exact(2)
        .map(|c| AlphaStop { t: c[0], a: c[1] })
        .collect();

    if alpha_stops.is_empty() {
        return color_stops
            .iter()
            .map(|c| GradientStop {
                offset: c.t,
                color: Vec4::new(c.rgb[0], c.rgb[1], c.rgb[2], 1.0),
            })
            .collect();
    }

    let mut offsets: Vec<f32> = color_stops
        .iter()
        .map(|c| c.t)
        .chain(alpha_stops.iter().map(|a| a.t))
        .collect();
    offsets.sort_by(f32::total_cmp);
    offsets.dedup();
    offsets
        .into_iter()
        .map(|t| {
            let [r, g, b] = interpolate_color(&color_stops, t);
            GradientStop {
                offset: t,
                color: Vec4::new(r, g, b, interpolate_alpha(&alpha_stops, t)),
            }
        })
        .collect()
}

/// Piecewise-linear lookup over stops sorted by `t`.
fn ramp<S, T: Copy>(
    stops: &[S],
    t: f32,
    key: impl Fn(&S) -> f32,
    value: impl Fn(&S) -> T,
    lerp: impl Fn(T, T, f32) -> T,
) -> Option<T> {
    let first = stops.first()?;
    let last = stops.last()?;
    if t <= key(first) {
        return Some(value(first));
    }
    if t >= key(last) {
        return Some(value(last));
    }
    stops.windows(2).find_map(|w| {
        let (a, b) = (&w[0], &w[1]);
        if t < key(a) || t > key(b) {
            return None;
        }
        let range = key(b) - key(a);
        let ratio = if range == 0.0 { 0.0 } else { (t - key(a)) / range };
        Some(lerp(value(a), value(b), ratio))
    })
}

fn interpolate_color(stops: &[ColorStop], t: f32) -> [f32; 3] {
    ramp(
        stops,
        t,
        |s| s.t,
        |s| s.rgb,
        |a, b, r| [0, 1, 2].map(|i| a[i] + (b[i] - a[i]) * r),
    )
    .unwrap_or([1.0; 3])
}

fn interpolate_alpha(stops: &[AlphaStop], t: f32) -> f32 {
    ramp(stops, t, |s| s.t, |s| s.a, |a, b, r| a + (b - a) * r).unwrap_or(1.0)
}
