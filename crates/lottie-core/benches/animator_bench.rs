use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::Vec2;
use kurbo::Affine;
use lottie_core::animatable::{Easing, Keyframe, KeyframeTrack};
use lottie_core::{Composition, EngineConfig, RecordingSurface};
use serde_json::json;

fn keyframe_track(c: &mut Criterion) {
    let ease = Easing::new(Vec2::new(0.33, 0.0), Vec2::new(0.67, 1.0));
    let keyframes = (0..64)
        .map(|i| Keyframe::new(i as f32 * 10.0, Vec2::new(i as f32, (i * i) as f32)).with_easing(ease))
        .collect();
    let track = KeyframeTrack::new(keyframes).unwrap();

    c.bench_function("keyframe_interpolate_eased", |b| {
        let mut frame = 0.0f32;
        b.iter(|| {
            frame = (frame + 1.7) % 640.0;
            black_box(track.interpolated(black_box(frame)))
        })
    });
}

fn expression_draw(c: &mut Criterion) {
    let doc = json!({
        "v": "5.7.0", "fr": 30, "ip": 0, "op": 120, "w": 256, "h": 256,
        "layers": [
            {"ty": 3, "nm": "driver", "ind": 1, "ip": 0, "op": 120,
             "ks": {"p": {"a": 0, "k": [128, 128, 0], "x": "wiggle(2, 40)"}}},
            {"ty": 4, "nm": "follower", "ind": 2, "ip": 0, "op": 120,
             "ks": {"p": {"a": 0, "k": [0, 0, 0],
                          "x": "var p = thisComp.layer(\"driver\").transform.position; [p[0] + Math.sin(time) * 10, p[1]]"},
                    "r": {"a": 0, "k": 0, "x": "time * 90"}},
             "shapes": [
                {"ty": "rc", "s": {"a": 0, "k": [40, 40]}, "p": {"a": 0, "k": [0, 0]}},
                {"ty": "fl", "c": {"a": 0, "k": [0.2, 0.4, 0.8, 1]}, "o": {"a": 0, "k": 100}}
             ]}
        ]
    });
    let comp = Composition::from_json(&doc.to_string(), EngineConfig::default()).unwrap();
    let mut surface = RecordingSurface::new();

    c.bench_function("draw_with_expressions", |b| {
        let mut frame = 0.0f32;
        b.iter(|| {
            frame = (frame + 0.5) % 120.0;
            surface.clear();
            comp.draw(&mut surface, Affine::IDENTITY, 1.0, black_box(frame))
                .unwrap();
        })
    });
}

criterion_group!(benches, keyframe_track, expression_draw);
criterion_main!(benches);
