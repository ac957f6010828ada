use kurbo::Affine;
use tracing::debug;

use crate::composition::Composition;
use crate::error::Result;
use crate::surface::Surface;

/// Drives a composition through time.
///
/// Time advances in wall-clock seconds scaled by `speed`. Playback covers the
/// whole document or a marker range; when looping the frame wraps inside
/// `[start, end)`, otherwise it holds on the last whole frame of the range.
#[derive(Debug)]
pub struct LottiePlayer {
    composition: Composition,
    current_frame: f32,
    range: (f32, f32),
    speed: f32,
    looping: bool,
    finished: bool,
}

impl LottiePlayer {
    pub fn new(composition: Composition) -> Self {
        let range = (composition.start_frame(), composition.end_frame());
        Self {
            current_frame: range.0,
            range,
            composition,
            speed: 1.0,
            looping: true,
            finished: false,
        }
    }

    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    pub fn composition_mut(&mut self) -> &mut Composition {
        &mut self.composition
    }

    pub fn into_composition(self) -> Composition {
        self.composition
    }

    pub fn current_frame(&self) -> f32 {
        self.current_frame
    }

    /// Active playback range in frames.
    pub fn range(&self) -> (f32, f32) {
        self.range
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Negative speeds play backwards.
    pub fn set_speed(&mut self, speed: f32) {
        if speed.is_finite() {
            self.speed = speed;
        }
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
        if looping {
            self.finished = false;
        }
    }

    /// True once a non-looping player reached the end of its range.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Jumps to `frame`, clamped into the active range.
    pub fn seek(&mut self, frame: f32) {
        let (start, _) = self.range;
        self.current_frame = if frame.is_nan() {
            start
        } else {
            frame.clamp(start, self.last_frame())
        };
        self.finished = false;
    }

    /// Restricts playback to the named marker and rewinds to its start.
    /// Returns false, leaving playback unchanged, for unknown markers.
    pub fn play_marker(&mut self, name: &str) -> bool {
        let Some(marker) = self.composition.marker(name) else {
            return false;
        };
        let start = marker
            .start
            .clamp(self.composition.start_frame(), self.composition.end_frame());
        let end = (marker.start + marker.duration).clamp(start, self.composition.end_frame());
        debug!(marker = name, start, end, "playing marker");
        self.range = (start, end);
        self.current_frame = start;
        self.finished = false;
        true
    }

    /// Plays the whole document again from its first frame.
    pub fn play_all(&mut self) {
        self.range = (self.composition.start_frame(), self.composition.end_frame());
        self.current_frame = self.range.0;
        self.finished = false;
    }

    /// Advances by `dt` seconds and returns the new frame.
    pub fn advance(&mut self, dt: f32) -> f32 {
        if self.finished || !dt.is_finite() {
            return self.current_frame;
        }
        let (start, end) = self.range;
        let duration = end - start;
        let next = self.current_frame + dt * self.composition.frame_rate() * self.speed;

        self.current_frame = if duration <= 0.0 {
            self.finished = !self.looping;
            start
        } else if self.looping {
            start + (next - start).rem_euclid(duration)
        } else if next >= self.last_frame() && self.speed >= 0.0 {
            self.finished = true;
            self.last_frame()
        } else if next <= start && self.speed < 0.0 {
            self.finished = true;
            start
        } else {
            next.clamp(start, self.last_frame())
        };
        self.current_frame
    }

    /// Draws the current frame.
    pub fn draw(&self, surface: &mut dyn Surface, matrix: Affine, alpha: f32) -> Result<()> {
        self.composition
            .draw(surface, matrix, alpha, self.current_frame)
    }

    /// Layers are visible strictly before their out point, so a stopped
    /// player rests one frame before the range end.
    fn last_frame(&self) -> f32 {
        let (start, end) = self.range;
        (end - 1.0).max(start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use serde_json::json;

    fn player() -> LottiePlayer {
        let doc = json!({
            "v": "5.7.0", "ip": 0, "op": 60, "fr": 30, "w": 10, "h": 10,
            "markers": [{"cm": "middle", "tm": 20, "dr": 10}],
            "layers": [{"ty": 3, "nm": "null", "ip": 0, "op": 60}]
        });
        let comp = Composition::from_json(&doc.to_string(), EngineConfig::default()).unwrap();
        LottiePlayer::new(comp)
    }

    #[test]
    fn advance_wraps_when_looping() {
        let mut p = player();
        assert_eq!(p.advance(1.0), 30.0);
        assert_eq!(p.advance(1.5), 15.0);
        assert!(!p.is_finished());
    }

    #[test]
    fn speed_scales_time_and_reverses() {
        let mut p = player();
        p.set_speed(2.0);
        assert_eq!(p.advance(0.5), 30.0);
        p.set_speed(-1.0);
        assert_eq!(p.advance(1.5), 45.0);
    }

    #[test]
    fn non_looping_holds_last_frame() {
        let mut p = player();
        p.set_looping(false);
        p.advance(10.0);
        assert!(p.is_finished());
        assert_eq!(p.current_frame(), 59.0);
        assert_eq!(p.advance(1.0), 59.0);
    }

    #[test]
    fn marker_range_loops() {
        let mut p = player();
        assert!(p.play_marker("middle"));
        assert!(!p.play_marker("missing"));
        assert_eq!(p.range(), (20.0, 30.0));
        assert_eq!(p.current_frame(), 20.0);
        // 12 frames into a 10 frame range
        assert_eq!(p.advance(0.4), 22.0);
        p.play_all();
        assert_eq!(p.range(), (0.0, 60.0));
    }

    #[test]
    fn seek_clamps_into_range() {
        let mut p = player();
        p.seek(500.0);
        assert_eq!(p.current_frame(), 59.0);
        p.seek(-3.0);
        assert_eq!(p.current_frame(), 0.0);
    }
}
