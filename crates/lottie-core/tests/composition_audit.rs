//! End-to-end behavior of the engine over small inline documents.
//!
//! Run with: cargo test -p lottie-core --test composition_audit

use std::sync::Arc;

use kurbo::{Affine, Point};
use lottie_core::animatable::{Keyframe, KeyframeTrack};
use lottie_core::expressions::color::{hsl_to_rgb, rgb_to_hsl};
use lottie_core::surface::{CompositeMode, DrawOp, GradientShader, LayerPaint, Shader};
use lottie_core::{
    Composition, EngineConfig, ExpressionErrorPolicy, LookupKind, LottieError, RecordingSurface,
};
use serde_json::json;

fn transform(p: [f32; 2], r: f32, s: f32) -> serde_json::Value {
    json!({
        "o": {"a": 0, "k": 100},
        "r": {"a": 0, "k": r},
        "p": {"a": 0, "k": [p[0], p[1], 0]},
        "a": {"a": 0, "k": [0, 0, 0]},
        "s": {"a": 0, "k": [s, s, 100]}
    })
}

fn document(layers: serde_json::Value) -> serde_json::Value {
    json!({
        "v": "5.7.0", "nm": "Audit", "fr": 30, "ip": 0, "op": 60, "w": 200, "h": 200,
        "layers": layers
    })
}

fn square(nm: &str, ind: i32) -> serde_json::Value {
    json!({
        "ty": 4, "nm": nm, "ind": ind, "ip": 0, "op": 60, "st": 0,
        "ks": transform([0.0, 0.0], 0.0, 100.0),
        "shapes": [
            {"ty": "rc", "s": {"a": 0, "k": [20, 20]}, "p": {"a": 0, "k": [0, 0]}},
            {"ty": "fl", "c": {"a": 0, "k": [1, 0, 0, 1]}, "o": {"a": 0, "k": 100}}
        ]
    })
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("lottie_core=debug")
        .with_test_writer()
        .try_init();
}

fn build(doc: serde_json::Value, config: EngineConfig) -> Composition {
    init_tracing();
    Composition::from_json(&doc.to_string(), config).expect("document should build")
}

fn render(comp: &Composition, frame: f32) -> RecordingSurface {
    let mut surface = RecordingSurface::new();
    comp.draw(&mut surface, Affine::IDENTITY, 1.0, frame)
        .expect("draw should succeed");
    surface
}

mod keyframes {
    use super::*;

    fn track() -> KeyframeTrack<f32> {
        KeyframeTrack::new(vec![
            Keyframe::new(0.0, 10.0),
            Keyframe::new(10.0, 30.0),
            Keyframe::new(25.0, -4.0).with_hold(),
            Keyframe::new(40.0, 7.5),
        ])
        .unwrap()
    }

    #[test]
    fn test_keyframe_boundaries_are_exact() {
        let track = track();
        for kf in track.keyframes() {
            assert_eq!(track.interpolated(kf.time), kf.start.unwrap());
        }
    }

    #[test]
    fn test_values_clamp_outside_keyframe_range() {
        let track = track();
        for frame in [-100.0, -0.5, f32::MIN] {
            assert_eq!(track.interpolated(frame), 10.0);
        }
        for frame in [40.5, 1000.0, f32::MAX] {
            assert_eq!(track.interpolated(frame), 7.5);
        }
    }

    #[test]
    fn test_linear_midpoint() {
        let track = track();
        assert_eq!(track.interpolated(5.0), 20.0);
    }

    #[test]
    fn test_hold_keeps_start_value() {
        let track = track();
        assert_eq!(track.interpolated(39.9), -4.0);
    }

    #[test]
    fn test_zero_length_segment_does_not_fail() {
        let track = KeyframeTrack::new(vec![
            Keyframe::new(0.0, 1.0),
            Keyframe::new(5.0, 2.0),
            Keyframe::new(5.0, 3.0),
            Keyframe::new(9.0, 4.0),
        ])
        .unwrap();
        assert!(track.interpolated(5.0).is_finite());
        assert_eq!(track.interpolated(2.5), 1.5);
    }

    #[test]
    fn test_animated_layer_property_through_composition() {
        let mut layer = square("moving", 1);
        layer["ks"]["p"] = json!({"a": 1, "k": [
            {"t": 0, "s": [0, 0, 0], "o": {"x": [0], "y": [0]}, "i": {"x": [1], "y": [1]}},
            {"t": 20, "s": [100, 0, 0]}
        ]});
        let comp = build(document(json!([layer])), EngineConfig::default());
        let surface = render(&comp, 10.0);
        let (_, transform, _) = surface.paths().next().unwrap();
        let origin = *transform * Point::ZERO;
        assert!((origin.x - 50.0).abs() < 1e-4);
    }
}

mod color {
    use super::*;

    #[test]
    fn test_hsl_round_trip() {
        // deterministic spread over the unit cube
        let mut seed = 0x2545_f491_u32;
        let mut next = || {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            seed as f64 / u32::MAX as f64
        };
        for _ in 0..500 {
            let hsl = [next(), 0.05 + next() * 0.9, 0.05 + next() * 0.9, next()];
            let back = rgb_to_hsl(hsl_to_rgb(hsl));
            for (a, b) in hsl.iter().zip(back.iter()) {
                assert!((a - b).abs() < 1e-6, "{hsl:?} came back as {back:?}");
            }
        }
    }

    #[test]
    fn test_achromatic_has_no_hue_or_saturation() {
        for v in [0.0, 0.25, 0.5, 1.0] {
            let hsl = rgb_to_hsl([v, v, v, 1.0]);
            assert_eq!(hsl[0], 0.0);
            assert_eq!(hsl[1], 0.0);
            assert!((hsl[2] - v).abs() < 1e-12);
        }
    }
}

mod parenting {
    use super::*;

    #[test]
    fn test_three_level_parent_chain() {
        let doc = document(json!([
            {"ty": 3, "nm": "grandparent", "ind": 1, "ip": 0, "op": 60,
             "ks": transform([0.0, 0.0], 0.0, 200.0)},
            {"ty": 3, "nm": "parent", "ind": 2, "parent": 1, "ip": 0, "op": 60,
             "ks": transform([0.0, 0.0], 90.0, 100.0)},
            {"ty": 4, "nm": "child", "ind": 3, "parent": 2, "ip": 0, "op": 60,
             "ks": transform([10.0, 0.0], 0.0, 100.0),
             "shapes": [
                {"ty": "rc", "s": {"a": 0, "k": [2, 2]}, "p": {"a": 0, "k": [0, 0]}},
                {"ty": "fl", "c": {"a": 0, "k": [0, 0, 0, 1]}, "o": {"a": 0, "k": 100}}
             ]}
        ]));
        let comp = build(doc, EngineConfig::default());
        let surface = render(&comp, 0.0);
        let (_, transform, _) = surface.paths().next().unwrap();
        let p = *transform * Point::ZERO;
        assert!(p.x.abs() < 1e-4, "x = {}", p.x);
        assert!((p.y - 20.0).abs() < 1e-4, "y = {}", p.y);
    }

    #[test]
    fn test_parent_cycle_is_structural() {
        let doc = document(json!([
            {"ty": 3, "nm": "a", "ind": 1, "parent": 2, "ip": 0, "op": 60},
            {"ty": 3, "nm": "b", "ind": 2, "parent": 1, "ip": 0, "op": 60}
        ]));
        let err = Composition::from_json(&doc.to_string(), EngineConfig::default()).unwrap_err();
        assert!(matches!(err, LottieError::Structural(_)));
    }
}

mod mattes {
    use super::*;

    fn matte_doc() -> serde_json::Value {
        let mut source = square("A", 1);
        source["td"] = json!(1);
        let mut target = square("B", 2);
        target["tt"] = json!(1);
        target["tp"] = json!(1);
        document(json!([source, target]))
    }

    #[test]
    fn test_matte_source_is_excluded_from_draw_list() {
        let comp = build(matte_doc(), EngineConfig::default());
        assert_eq!(comp.draw_list(0.0), vec!["B"]);
    }

    #[test]
    fn test_target_is_masked_by_source() {
        let comp = build(matte_doc(), EngineConfig::default());
        let surface = render(&comp, 0.0);
        assert_eq!(surface.depth(), 0);
        assert!(surface
            .ops
            .iter()
            .any(|op| *op == DrawOp::SaveLayer(LayerPaint::mode(CompositeMode::DstIn))));
        // target content, then source content inside the matte layer
        assert_eq!(surface.paths().count(), 2);
    }
}

mod expressions {
    use super::*;

    fn dangling_doc() -> serde_json::Value {
        let mut layer = square("seeker", 1);
        layer["ks"]["p"] = json!({
            "a": 0, "k": [0, 0, 0],
            "x": "thisComp.layer(\"Ghost\").transform.position"
        });
        document(json!([layer]))
    }

    #[test]
    fn test_dangling_layer_reference_is_a_lookup_error() {
        let config = EngineConfig {
            expression_errors: ExpressionErrorPolicy::Fail,
            ..EngineConfig::default()
        };
        let comp = build(dangling_doc(), config);
        let mut surface = RecordingSurface::new();
        let err = comp
            .draw(&mut surface, Affine::IDENTITY, 1.0, 0.0)
            .unwrap_err();
        assert_eq!(err, LottieError::lookup(LookupKind::Layer, "Ghost"));
        assert_eq!(surface.depth(), 0);
    }

    #[test]
    fn test_fallback_policy_uses_keyframe_value() {
        let comp = build(dangling_doc(), EngineConfig::default());
        let surface = render(&comp, 0.0);
        let (_, transform, _) = surface.paths().next().unwrap();
        assert_eq!(*transform * Point::ZERO, Point::ZERO);
    }

    fn nan_time_doc() -> serde_json::Value {
        let mut layer = square("sampled", 1);
        layer["ks"]["p"] = json!({
            "a": 1,
            "k": [
                {"t": 0, "s": [0, 0, 0], "o": {"x": [0], "y": [0]}, "i": {"x": [1], "y": [1]}},
                {"t": 10, "s": [100, 0, 0]}
            ],
            "x": "valueAtTime(0/0)"
        });
        document(json!([layer]))
    }

    #[test]
    fn test_non_finite_sample_time_is_scoped_to_the_property() {
        let comp = build(nan_time_doc(), EngineConfig::default());
        let surface = render(&comp, 5.0);
        let (_, transform, _) = surface.paths().next().unwrap();
        assert_eq!(*transform * Point::ZERO, Point::new(50.0, 0.0));

        let strict = build(
            nan_time_doc(),
            EngineConfig {
                expression_errors: ExpressionErrorPolicy::Fail,
                ..EngineConfig::default()
            },
        );
        let mut surface = RecordingSurface::new();
        let err = strict
            .draw(&mut surface, Affine::IDENTITY, 1.0, 5.0)
            .unwrap_err();
        assert!(matches!(err, LottieError::Type { .. }), "{err:?}");
    }

    #[test]
    fn test_expression_reads_other_layer() {
        let leader = {
            let mut l = square("leader", 1);
            l["ks"]["p"] = json!({"a": 0, "k": [40, 30, 0]});
            l
        };
        let mut follower = square("follower", 2);
        follower["ks"]["p"] = json!({
            "a": 0, "k": [0, 0, 0],
            "x": "thisComp.layer(\"leader\").transform.position + [5, 0]"
        });
        let comp = build(document(json!([leader, follower])), EngineConfig::default());
        let surface = render(&comp, 0.0);
        // follower is declared last, so it is painted first
        let (_, transform, _) = surface.paths().next().unwrap();
        assert_eq!(*transform * Point::ZERO, Point::new(45.0, 30.0));
    }
}

mod gradients {
    use super::*;

    fn gradient_doc() -> serde_json::Value {
        document(json!([{
            "ty": 4, "nm": "gradient", "ind": 1, "ip": 0, "op": 60,
            "ks": transform([0.0, 0.0], 0.0, 100.0),
            "shapes": [
                {"ty": "rc", "s": {"a": 0, "k": [20, 20]}, "p": {"a": 0, "k": [0, 0]}},
                {"ty": "gf", "t": 1, "o": {"a": 0, "k": 100},
                 "s": {"a": 0, "k": [-10, 0]}, "e": {"a": 0, "k": [10, 0]},
                 "g": {"p": 2, "k": {"a": 1, "k": [
                    {"t": 0, "s": [0, 1, 0, 0, 1, 0, 0, 1], "h": 1},
                    {"t": 30, "s": [0, 1, 0, 0, 1, 0, 1, 0], "h": 1},
                    {"t": 59, "s": [0, 1, 0, 0, 1, 0, 1, 0]}
                 ]}}}
            ]
        }]))
    }

    fn shader(surface: &RecordingSurface) -> Arc<GradientShader> {
        match &surface.paths().next().unwrap().2.shader {
            Shader::Gradient { shader, .. } => shader.clone(),
            other => panic!("expected a gradient, got {other:?}"),
        }
    }

    #[test]
    fn test_identical_stops_reuse_shader() {
        let comp = build(gradient_doc(), EngineConfig::default());
        let first = shader(&render(&comp, 0.0));
        let second = shader(&render(&comp, 0.0));
        let third = shader(&render(&comp, 12.0));
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn test_changed_stop_builds_new_shader() {
        let comp = build(gradient_doc(), EngineConfig::default());
        let before = shader(&render(&comp, 0.0));
        let after = shader(&render(&comp, 30.0));
        assert!(!Arc::ptr_eq(&before, &after));
        assert_ne!(before.stops, after.stops);
    }
}

mod errors {
    use super::*;

    #[test]
    fn test_structural_errors_abort_construction() {
        let docs = [
            json!({"fr": 30, "ip": 0, "op": 60, "w": 10, "h": 10, "layers": []}),
            json!({"fr": 0, "ip": 0, "op": 60, "w": 10, "h": 10, "layers": [square("a", 1)]}),
            json!({"ip": 0, "op": 60, "w": 10, "h": 10, "layers": [square("a", 1)]}),
            document(json!([{"ty": 0, "nm": "pre", "refId": "missing", "ip": 0, "op": 60}])),
        ];
        for doc in docs {
            let result = Composition::from_json(&doc.to_string(), EngineConfig::default());
            assert!(
                matches!(result, Err(LottieError::Structural(_))),
                "{doc} should be rejected"
            );
        }
    }

    #[test]
    fn test_frames_at_and_past_the_end_hold_the_last_frame() {
        let comp = build(document(json!([square("a", 1)])), EngineConfig::default());
        for frame in [59.0, 60.0, 100.0] {
            assert_eq!(render(&comp, frame).paths().count(), 1, "frame {frame}");
        }
    }

    #[test]
    fn test_degenerate_geometry_draws_without_error() {
        let doc = document(json!([{
            "ty": 4, "nm": "empty", "ind": 1, "ip": 0, "op": 60,
            "ks": transform([0.0, 0.0], 0.0, 0.0),
            "shapes": [
                {"ty": "rc", "s": {"a": 0, "k": [0, 0]}, "p": {"a": 0, "k": [0, 0]}},
                {"ty": "sr", "sy": 2, "pt": {"a": 0, "k": 0}, "p": {"a": 0, "k": [0, 0]},
                 "or": {"a": 0, "k": 0}, "os": {"a": 0, "k": 0}, "r": {"a": 0, "k": 0}},
                {"ty": "st", "c": {"a": 0, "k": [0, 0, 0, 1]}, "o": {"a": 0, "k": 100},
                 "w": {"a": 0, "k": 0}}
            ]
        }]));
        let comp = build(doc, EngineConfig::default());
        let mut surface = RecordingSurface::new();
        comp.draw(&mut surface, Affine::IDENTITY, 1.0, 0.0).unwrap();
        assert_eq!(surface.depth(), 0);
    }
}
