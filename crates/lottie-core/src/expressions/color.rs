//! HSL <-> RGB conversions. All channels, hue included, are in `0..=1`
//! and alpha passes through unchanged.

pub fn rgb_to_hsl(rgba: [f64; 4]) -> [f64; 4] {
    let [r, g, b, a] = rgba;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        // achromatic
        return [0.0, 0.0, l, a];
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };
    [h / 6.0, s, l, a]
}

pub fn hsl_to_rgb(hsla: [f64; 4]) -> [f64; 4] {
    let [h, s, l, a] = hsla;
    if s == 0.0 {
        return [l, l, l, a];
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    [
        hue_to_channel(p, q, h + 1.0 / 3.0),
        hue_to_channel(p, q, h),
        hue_to_channel(p, q, h - 1.0 / 3.0),
        a,
    ]
}

fn hue_to_channel(p: f64, q: f64, t: f64) -> f64 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f64; 4], b: [f64; 4]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn primaries() {
        assert!(close(rgb_to_hsl([1.0, 0.0, 0.0, 1.0]), [0.0, 1.0, 0.5, 1.0]));
        assert!(close(hsl_to_rgb([1.0 / 3.0, 1.0, 0.5, 0.5]), [0.0, 1.0, 0.0, 0.5]));
        assert!(close(hsl_to_rgb([2.0 / 3.0, 1.0, 0.5, 1.0]), [0.0, 0.0, 1.0, 1.0]));
    }

    #[test]
    fn achromatic_has_no_hue_or_saturation() {
        for v in [0.0, 0.3, 0.75, 1.0] {
            let hsl = rgb_to_hsl([v, v, v, 1.0]);
            assert_eq!(hsl[0], 0.0);
            assert_eq!(hsl[1], 0.0);
            assert_eq!(hsl[2], v);
        }
    }

    #[test]
    fn round_trips_chromatic_colors() {
        // deterministic pseudo-random sweep of the hsl cube
        let mut seed = 0x2545_f491_u64;
        let mut next = || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            (seed % 10_000) as f64 / 10_000.0
        };
        for _ in 0..500 {
            let hsl = [next(), 0.05 + next() * 0.95, 0.05 + next() * 0.9, next()];
            let back = rgb_to_hsl(hsl_to_rgb(hsl));
            for c in 0..4 {
                assert!(
                    (back[c] - hsl[c]).abs() < 1e-6,
                    "{:?} came back as {:?}",
                    hsl,
                    back
                );
            }
        }
    }

    #[test]
    fn rgb_round_trip() {
        let rgba = [0.2, 0.6, 0.9, 0.4];
        assert!(close(hsl_to_rgb(rgb_to_hsl(rgba)), rgba));
    }
}
