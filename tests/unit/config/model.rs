use super::*;

#[test]
fn empty_object_yields_defaults() {
    let cfg = Config::from_reader("{}".as_bytes()).unwrap();
    assert_eq!(cfg, Config::default());
    assert_eq!(cfg.width, 800);
    assert_eq!(cfg.height, 600);
    assert_eq!(cfg.fps, 30);
    assert_eq!(cfg.visible_range, 3);
    assert_eq!(cfg.blur_curve, SideCurve::Linear);
    assert_eq!(cfg.encode.codec, "libx264");
    cfg.validate().unwrap();
}

#[test]
fn parses_overrides_and_ignores_unknown_keys() {
    let json = serde_json::json!({
        "width": 1280,
        "height": 720,
        "loop": true,
        "mode": "flat",
        "alignment": "bottom",
        "easing": "InOutSine",
        "scale_curve": "quadratic",
        "background_color": "#101010",
        "background_color_bottom": [0, 0, 64],
        "encode": { "crf": 18, "bitrate": "8M" },
        "source": "ignored"
    });
    let cfg = Config::from_reader(json.to_string().as_bytes()).unwrap();
    assert_eq!(cfg.width, 1280);
    assert!(cfg.loop_back);
    assert_eq!(cfg.mode, LayoutMode::Flat);
    assert_eq!(cfg.alignment, Alignment::Bottom);
    assert_eq!(cfg.easing, Ease::InOutSine);
    assert_eq!(cfg.scale_curve, SideCurve::Quadratic);
    assert_eq!(cfg.background.color, Some(Color::gray(16)));
    assert_eq!(cfg.background.color_bottom, Some(Color::rgb(0, 0, 64)));
    assert_eq!(cfg.encode.crf, 18);
    assert_eq!(cfg.encode.bitrate.as_deref(), Some("8M"));
    assert_eq!(cfg.encode.preset, "medium");
}

#[test]
fn unknown_curve_names_fall_back_per_effect() {
    let json = serde_json::json!({
        "scale_curve": "wobbly",
        "alpha_curve": "nope",
        "blur_curve": "nope",
        "easing": "bounce"
    });
    let cfg = Config::from_reader(json.to_string().as_bytes()).unwrap();
    assert_eq!(cfg.scale_curve, SideCurve::Exponential);
    assert_eq!(cfg.alpha_curve, SideCurve::Exponential);
    assert_eq!(cfg.blur_curve, SideCurve::Linear);
    assert_eq!(cfg.easing, Ease::InOutCubic);
}

#[test]
fn malformed_json_is_a_validation_error() {
    let err = Config::from_reader("{ width: ".as_bytes()).unwrap_err();
    assert!(matches!(err, CoverflowError::Validation(_)));
    let err = Config::from_path("/definitely/not/here.json").unwrap_err();
    assert!(matches!(err, CoverflowError::Validation(_)));
}

#[test]
fn validate_rejects_out_of_range_values() {
    let bad = [
        Config {
            width: 0,
            ..Config::default()
        },
        Config {
            fps: 0,
            ..Config::default()
        },
        Config {
            hold: -1.0,
            ..Config::default()
        },
        Config {
            side_scale: 0.0,
            ..Config::default()
        },
        Config {
            image_scale: 1.5,
            ..Config::default()
        },
        Config {
            reflection: 2.0,
            ..Config::default()
        },
        Config {
            start_frame: Some(10),
            end_frame: Some(5),
            ..Config::default()
        },
    ];
    for cfg in bad {
        assert!(cfg.validate().is_err(), "{cfg:?}");
    }
}

#[test]
fn timeline_spec_uses_first_hold_fallback() {
    let cfg = Config {
        hold: 1.5,
        ..Config::default()
    };
    let spec = cfg.timeline_spec(4);
    assert_eq!(spec.image_count, 4);
    assert_eq!(spec.first_hold_secs, 1.5);

    let cfg = Config {
        first_hold: Some(3.0),
        ..cfg
    };
    assert_eq!(cfg.timeline_spec(4).first_hold_secs, 3.0);
}

#[test]
fn frame_range_clamps_to_total() {
    let cfg = Config {
        start_frame: Some(5),
        end_frame: Some(500),
        ..Config::default()
    };
    let r = cfg.frame_range(100);
    assert_eq!(r.start, FrameIndex(5));
    assert_eq!(r.end, FrameIndex(100));
    assert_eq!(Config::default().frame_range(40).len_frames(), 40);
}

#[test]
fn accepts_side_prefixed_and_flat_background_keys() {
    let json = serde_json::json!({
        "side_scale_curve": "linear",
        "side_scale_start": 2,
        "side_blur_curve": "sqrt",
        "side_blur_start": 3,
        "side_alpha_curve": "quadratic",
        "side_alpha_start": 0,
        "background": "/tmp/bg.png",
        "background_color": "#ff0000",
        "background_color_bottom": [0, 0, 255]
    });
    let cfg = Config::from_reader(json.to_string().as_bytes()).unwrap();
    assert_eq!(cfg.scale_curve, SideCurve::Linear);
    assert_eq!(cfg.scale_start, 2);
    assert_eq!(cfg.blur_curve, SideCurve::Sqrt);
    assert_eq!(cfg.blur_start, 3);
    assert_eq!(cfg.alpha_curve, SideCurve::Quadratic);
    assert_eq!(cfg.alpha_start, 0);
    assert_eq!(cfg.background.image, Some(PathBuf::from("/tmp/bg.png")));
    assert_eq!(cfg.background.color, Some(Color::rgb(255, 0, 0)));
    assert_eq!(cfg.background.color_bottom, Some(Color::rgb(0, 0, 255)));
}
