use glam::{Vec2, Vec4};
use lottie_data::model::{self as data, BezierTangent};

use crate::error::{LottieError, Result};
use crate::shape_data::ShapeData;

/// Values that can be blended between two keyframes.
pub trait Interpolatable: Sized + Clone {
    fn lerp(&self, other: &Self, t: f32) -> Self;

    /// Interpolation along a spatial bezier. `tan_out` leaves `self`,
    /// `tan_in` arrives at `other`, both relative to their vertex.
    fn lerp_spatial(&self, other: &Self, t: f32, _tan_out: Vec2, _tan_in: Vec2) -> Self {
        self.lerp(other, t)
    }
}

impl Interpolatable for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Interpolatable for Vec2 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec2::lerp(*self, *other, t)
    }

    fn lerp_spatial(&self, other: &Self, t: f32, tan_out: Vec2, tan_in: Vec2) -> Self {
        if tan_out == Vec2::ZERO && tan_in == Vec2::ZERO {
            return self.lerp(other, t);
        }
        let p0 = *self;
        let p3 = *other;
        let p1 = p0 + tan_out;
        let p2 = p3 + tan_in;

        let mt = 1.0 - t;
        p0 * (mt * mt * mt) + p1 * (3.0 * mt * mt * t) + p2 * (3.0 * mt * t * t) + p3 * (t * t * t)
    }
}

impl Interpolatable for Vec4 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec4::lerp(*self, *other, t)
    }
}

// Gradient ramps and effect values. Extra components of the longer side
// are dropped.
impl Interpolatable for Vec<f32> {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self.iter()
            .zip(other.iter())
            .map(|(a, b)| a + (b - a) * t)
            .collect()
    }
}

impl Interpolatable for data::TextDocument {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        if t < 1.0 {
            self.clone()
        } else {
            other.clone()
        }
    }
}

impl Interpolatable for ShapeData {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        ShapeData::interpolate_between(self, other, t)
    }
}

/// Cubic ease mapping linear progress to eased progress, defined by the
/// out-handle of a keyframe and the in-handle of its segment end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Easing {
    pub p1: Vec2,
    pub p2: Vec2,
}

impl Easing {
    pub const LINEAR: Easing = Easing {
        p1: Vec2::ZERO,
        p2: Vec2::ONE,
    };

    pub fn new(p1: Vec2, p2: Vec2) -> Self {
        Self { p1, p2 }
    }

    fn from_handles(out: Option<&BezierTangent>, inn: Option<&BezierTangent>) -> Self {
        let handle = |h: Option<&BezierTangent>, default: f32| match h {
            Some(h) => Vec2::new(
                h.x.first().copied().unwrap_or(default),
                h.y.first().copied().unwrap_or(default),
            ),
            None => Vec2::splat(default),
        };
        Easing {
            p1: handle(out, 0.0),
            p2: handle(inn, 1.0),
        }
    }

    pub fn is_linear(&self) -> bool {
        self.p1.x == self.p1.y && self.p2.x == self.p2.y
    }

    pub fn transform(&self, progress: f32) -> f32 {
        if progress <= 0.0 {
            return 0.0;
        }
        if progress >= 1.0 {
            return 1.0;
        }
        if self.is_linear() {
            return progress;
        }
        solve_cubic_bezier(self.p1, self.p2, progress)
    }
}

impl Default for Easing {
    fn default() -> Self {
        Self::LINEAR
    }
}

/// Evaluates the y of a unit cubic bezier (0,0) p1 p2 (1,1) at the given x.
pub fn solve_cubic_bezier(p1: Vec2, p2: Vec2, x: f32) -> f32 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let sample = |a: f32, b: f32, t: f32| {
        let mt = 1.0 - t;
        3.0 * mt * mt * t * a + 3.0 * mt * t * t * b + t * t * t
    };

    // Newton-Raphson, falling back to bisection on flat slopes
    let mut t = x;
    let mut converged = false;
    for _ in 0..8 {
        let err = sample(p1.x, p2.x, t) - x;
        if err.abs() < 1e-6 {
            converged = true;
            break;
        }
        let mt = 1.0 - t;
        let dx_dt = 3.0 * mt * mt * p1.x + 6.0 * mt * t * (p2.x - p1.x) + 3.0 * t * t * (1.0 - p2.x);
        if dx_dt.abs() < 1e-6 {
            break;
        }
        t = (t - err / dx_dt).clamp(0.0, 1.0);
    }

    if !converged {
        let (mut lo, mut hi) = (0.0f32, 1.0f32);
        t = x;
        for _ in 0..32 {
            let est = sample(p1.x, p2.x, t);
            if (est - x).abs() < 1e-6 {
                break;
            }
            if est < x {
                lo = t;
            } else {
                hi = t;
            }
            t = (lo + hi) * 0.5;
        }
    }

    sample(p1.y, p2.y, t)
}

/// One keyframe with values already converted to the engine's types.
/// `easing`, `spatial_out` and `spatial_in` describe the segment that
/// starts at this keyframe.
#[derive(Debug, Clone)]
pub struct Keyframe<T> {
    pub time: f32,
    pub start: Option<T>,
    pub end: Option<T>,
    pub easing: Easing,
    pub spatial_out: Vec2,
    pub spatial_in: Vec2,
    pub hold: bool,
}

impl<T> Keyframe<T> {
    pub fn new(time: f32, start: T) -> Self {
        Self {
            time,
            start: Some(start),
            end: None,
            easing: Easing::LINEAR,
            spatial_out: Vec2::ZERO,
            spatial_in: Vec2::ZERO,
            hold: false,
        }
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn with_hold(mut self) -> Self {
        self.hold = true;
        self
    }

    pub fn from_model<S>(kf: &data::Keyframe<S>, convert: &impl Fn(&S) -> T) -> Self {
        let tangent = |v: &Option<Vec<f32>>| match v.as_deref() {
            Some([x, y, ..]) => Vec2::new(*x, *y),
            _ => Vec2::ZERO,
        };
        Self {
            time: kf.t,
            start: kf.s.as_ref().map(convert),
            end: kf.e.as_ref().map(convert),
            easing: Easing::from_handles(kf.o.as_ref(), kf.i.as_ref()),
            spatial_out: tangent(&kf.to),
            spatial_in: tangent(&kf.ti),
            hold: kf.is_hold(),
        }
    }
}

/// Ordered keyframes of one property.
#[derive(Debug, Clone)]
pub struct KeyframeTrack<T> {
    keyframes: Vec<Keyframe<T>>,
    // first value present anywhere in the track
    fallback: T,
}

impl<T: Interpolatable> KeyframeTrack<T> {
    pub fn new(keyframes: Vec<Keyframe<T>>) -> Result<Self> {
        if keyframes.is_empty() {
            return Err(LottieError::structural("animated property has no keyframes"));
        }
        if keyframes.windows(2).any(|w| w[1].time < w[0].time) {
            return Err(LottieError::structural("keyframe times are not sorted"));
        }
        let fallback = keyframes
            .iter()
            .find_map(|k| k.start.as_ref().or(k.end.as_ref()))
            .cloned()
            .ok_or_else(|| LottieError::structural("animated property has no keyframe values"))?;
        Ok(Self {
            keyframes,
            fallback,
        })
    }

    pub fn keyframes(&self) -> &[Keyframe<T>] {
        &self.keyframes
    }

    pub fn first_time(&self) -> f32 {
        self.keyframes[0].time
    }

    pub fn last_time(&self) -> f32 {
        self.keyframes[self.keyframes.len() - 1].time
    }

    /// Value the property holds when arriving at keyframe `idx`: its own
    /// start, else the end of the segment before it.
    fn value_at_key(&self, idx: usize) -> T {
        let kfs = &self.keyframes;
        if let Some(s) = &kfs[idx].start {
            return s.clone();
        }
        kfs[..idx]
            .iter()
            .rev()
            .find_map(|k| k.end.as_ref().or(k.start.as_ref()))
            .unwrap_or(&self.fallback)
            .clone()
    }

    fn segment_end(&self, idx: usize) -> T {
        match &self.keyframes[idx].end {
            Some(e) => e.clone(),
            None => self.value_at_key(idx + 1),
        }
    }

    pub fn interpolated(&self, frame: f32) -> T {
        let kfs = &self.keyframes;
        let last = kfs.len() - 1;

        // NaN lands here too
        if !(frame > kfs[0].time) {
            return self.value_at_key(0);
        }
        if frame >= kfs[last].time {
            return self.value_at_key(last);
        }

        // kfs[0].time < frame < kfs[last].time, so 1 <= idx <= last
        let idx = kfs.partition_point(|kf| kf.time <= frame);
        let k = &kfs[idx - 1];
        let next = &kfs[idx];

        // partition_point never picks a segment whose keyframes share a time
        let duration = next.time - k.time;
        let start = self.value_at_key(idx - 1);
        if k.hold {
            return start;
        }
        let end = self.segment_end(idx - 1);

        let progress = k.easing.transform((frame - k.time) / duration);
        start.lerp_spatial(&end, progress, k.spatial_out, k.spatial_in)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(frames: &[(f32, f32)]) -> KeyframeTrack<f32> {
        KeyframeTrack::new(frames.iter().map(|(t, v)| Keyframe::new(*t, *v)).collect()).unwrap()
    }

    #[test]
    fn test_boundaries_are_exact() {
        let tr = track(&[(0.0, 3.0), (10.0, 17.5), (20.0, -4.25), (35.0, 9.0)]);
        for kf in tr.keyframes() {
            assert_eq!(tr.interpolated(kf.time), kf.start.unwrap());
        }
    }

    #[test]
    fn test_clamps_outside_range() {
        let tr = track(&[(5.0, 1.0), (10.0, 2.0)]);
        assert_eq!(tr.interpolated(-100.0), 1.0);
        assert_eq!(tr.interpolated(4.999), 1.0);
        assert_eq!(tr.interpolated(10.001), 2.0);
        assert_eq!(tr.interpolated(1e6), 2.0);
    }

    #[test]
    fn test_non_finite_frames_do_not_panic() {
        let tr = track(&[(0.0, 3.0), (10.0, 7.0)]);
        assert_eq!(tr.interpolated(f32::NAN), 3.0);
        assert_eq!(tr.interpolated(f32::NEG_INFINITY), 3.0);
        assert_eq!(tr.interpolated(f32::INFINITY), 7.0);
    }

    #[test]
    fn test_linear_midpoint() {
        let tr = track(&[(0.0, 0.0), (10.0, 100.0)]);
        assert_eq!(tr.interpolated(5.0), 0.0f32.lerp(&100.0, 0.5));

        let eased = KeyframeTrack::new(vec![
            Keyframe::new(0.0, 0.0f32).with_easing(Easing::new(
                Vec2::new(1.0 / 3.0, 1.0 / 3.0),
                Vec2::new(2.0 / 3.0, 2.0 / 3.0),
            )),
            Keyframe::new(10.0, 100.0),
        ])
        .unwrap();
        assert_eq!(eased.interpolated(5.0), 50.0);
    }

    #[test]
    fn test_hold_steps() {
        let tr = KeyframeTrack::new(vec![
            Keyframe::new(0.0, 1.0f32).with_hold(),
            Keyframe::new(10.0, 2.0),
        ])
        .unwrap();
        assert_eq!(tr.interpolated(0.0), 1.0);
        assert_eq!(tr.interpolated(9.99), 1.0);
        assert_eq!(tr.interpolated(10.0), 2.0);
    }

    #[test]
    fn test_zero_length_segment_jumps_to_next_value() {
        let tr = track(&[(0.0, 0.0), (10.0, 10.0), (10.0, 50.0), (20.0, 60.0)]);
        assert_eq!(tr.interpolated(5.0), 5.0);
        assert_eq!(tr.interpolated(10.0), 50.0);
        assert_eq!(tr.interpolated(15.0), 55.0);
    }

    #[test]
    fn test_legacy_end_values() {
        // Older exports carry `e` on each keyframe and no `s` on the last one.
        let mut k0 = Keyframe::new(0.0, 0.0f32);
        k0.end = Some(10.0);
        let mut k1 = Keyframe::new(10.0, 10.0f32);
        k1.end = Some(30.0);
        let k2 = Keyframe {
            start: None,
            ..Keyframe::new(20.0, 0.0f32)
        };
        let tr = KeyframeTrack::new(vec![k0, k1, k2]).unwrap();
        assert_eq!(tr.interpolated(15.0), 20.0);
        assert_eq!(tr.interpolated(25.0), 30.0);
    }

    #[test]
    fn test_ease_in_out_is_symmetric() {
        let ease = Easing::new(Vec2::new(0.42, 0.0), Vec2::new(0.58, 1.0));
        assert!((ease.transform(0.5) - 0.5).abs() < 1e-4);
        assert!(ease.transform(0.25) < 0.25);
        assert!(ease.transform(0.75) > 0.75);
        assert_eq!(ease.transform(0.0), 0.0);
        assert_eq!(ease.transform(1.0), 1.0);
    }

    #[test]
    fn test_spatial_position_follows_tangents() {
        let mut k0 = Keyframe::new(0.0, Vec2::new(0.0, 0.0));
        k0.spatial_out = Vec2::new(0.0, 100.0);
        k0.spatial_in = Vec2::new(0.0, 100.0);
        let tr = KeyframeTrack::new(vec![k0, Keyframe::new(10.0, Vec2::new(100.0, 0.0))]).unwrap();
        let mid = tr.interpolated(5.0);
        assert!((mid.x - 50.0).abs() < 1e-3);
        assert!((mid.y - 75.0).abs() < 1e-3);
        assert_eq!(tr.interpolated(0.0), Vec2::ZERO);
    }

    #[test]
    fn test_rejects_unsorted_and_empty() {
        assert!(KeyframeTrack::<f32>::new(vec![]).is_err());
        assert!(KeyframeTrack::new(vec![Keyframe::new(5.0, 1.0f32), Keyframe::new(1.0, 2.0)]).is_err());
    }
}
