use kurbo::{BezPath, ParamCurve, ParamCurveArclen, PathSeg, Point};
use lottie_data::model as data;

use crate::error::Result;
use crate::expressions::EvalContext;
use crate::property::{AnimatedProperty, PropertyFactory};

const ACCURACY: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimMode {
    /// Every path is trimmed on its own.
    Simultaneous,
    /// All paths are trimmed as one continuous outline.
    Individually,
}

/// Trim paths item (`tm`).
#[derive(Debug, Clone)]
pub struct TrimPath {
    start: AnimatedProperty<f32>,
    end: AnimatedProperty<f32>,
    offset: AnimatedProperty<f32>,
    mode: TrimMode,
}

impl TrimPath {
    pub fn from_model(shape: &data::TrimShape, factory: &PropertyFactory<'_>) -> Result<Self> {
        Ok(Self {
            start: factory.scalar(&shape.s, 0.0)?,
            end: factory.scalar(&shape.e, 100.0)?,
            offset: factory.scalar(&shape.o, 0.0)?,
            mode: if shape.m == 2 {
                TrimMode::Individually
            } else {
                TrimMode::Simultaneous
            },
        })
    }

    pub fn window(&self, ctx: &EvalContext<'_>) -> Result<TrimWindow> {
        Ok(TrimWindow::new(
            self.start.value(ctx)? as f64 / 100.0,
            self.end.value(ctx)? as f64 / 100.0,
            self.offset.value(ctx)? as f64 / 360.0,
            self.mode,
        ))
    }
}

/// Resolved trim range, fractions of the outline length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimWindow {
    start: f64,
    end: f64,
    mode: TrimMode,
}

impl TrimWindow {
    /// `start` and `end` in `0..=1`, `offset` in turns.
    pub fn new(start: f64, end: f64, offset: f64, mode: TrimMode) -> Self {
        let (mut s, mut e) = (start.clamp(0.0, 1.0), end.clamp(0.0, 1.0));
        if s > e {
            std::mem::swap(&mut s, &mut e);
        }
        let span = e - s;
        if span >= 1.0 {
            return Self {
                start: 0.0,
                end: 1.0,
                mode,
            };
        }
        let s = (s + offset).rem_euclid(1.0);
        Self {
            start: s,
            end: s + span,
            mode,
        }
    }

    pub fn is_full(&self) -> bool {
        self.start <= 0.0 && self.end >= 1.0
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Visible pieces as `(from, to)` fractions; a window past the end wraps
    /// around to the start.
    fn pieces(&self) -> Vec<(f64, f64)> {
        if self.end <= 1.0 {
            vec![(self.start, self.end)]
        } else {
            vec![(self.start, 1.0), (0.0, self.end - 1.0)]
        }
    }

    pub fn apply(&self, paths: &mut [&mut BezPath]) {
        if self.is_full() {
            return;
        }
        if self.is_empty() {
            for p in paths.iter_mut() {
                **p = BezPath::new();
            }
            return;
        }
        match self.mode {
            TrimMode::Simultaneous => {
                for p in paths.iter_mut() {
                    let segments = measure(p);
                    let total: f64 = segments.iter().map(|s| s.1).sum();
                    let mut out = BezPath::new();
                    for (a, b) in self.pieces() {
                        extract(&segments, a * total, b * total, &mut out);
                    }
                    **p = out;
                }
            }
            TrimMode::Individually => {
                let measured: Vec<_> = paths.iter().map(|p| measure(p)).collect();
                let lengths: Vec<f64> = measured
                    .iter()
                    .map(|segs| segs.iter().map(|s| s.1).sum())
                    .collect();
                let total: f64 = lengths.iter().sum();
                let mut cursor = 0.0;
                for ((p, segs), len) in paths.iter_mut().zip(&measured).zip(&lengths) {
                    let mut out = BezPath::new();
                    for (a, b) in self.pieces() {
                        let from = (a * total).max(cursor) - cursor;
                        let to = (b * total).min(cursor + len) - cursor;
                        if to > from {
                            extract(segs, from, to, &mut out);
                        }
                    }
                    cursor += len;
                    **p = out;
                }
            }
        }
    }
}

fn measure(path: &BezPath) -> Vec<(PathSeg, f64)> {
    path.segments().map(|s| (s, s.arclen(ACCURACY))).collect()
}

/// Appends the part of the outline between the two arc lengths.
fn extract(segments: &[(PathSeg, f64)], from: f64, to: f64, out: &mut BezPath) {
    let mut pos = 0.0;
    let mut last: Option<Point> = None;
    for &(seg, len) in segments {
        let (s0, s1) = (pos, pos + len);
        pos = s1;
        if len <= 0.0 || s1 <= from || s0 >= to {
            continue;
        }
        let t0 = if from > s0 {
            seg.inv_arclen(from - s0, ACCURACY)
        } else {
            0.0
        };
        let t1 = if to < s1 {
            seg.inv_arclen(to - s0, ACCURACY)
        } else {
            1.0
        };
        let piece = seg.subsegment(t0..t1);
        let start = piece.start();
        if last.map_or(true, |p| p.distance(start) > 1e-6) {
            out.move_to(start);
        }
        match piece {
            PathSeg::Line(l) => out.line_to(l.p1),
            PathSeg::Quad(q) => out.quad_to(q.p1, q.p2),
            PathSeg::Cubic(c) => out.curve_to(c.p1, c.p2, c.p3),
        }
        last = Some(piece.end());
    }
}
