use std::sync::Arc;

use scrawl::{
    Canvas, Ease, ErrorKind, Fps, FrameIndex, Keyframe, Layer, OutputFormat, OutputSpec, PathData,
    Point, PresetCatalog, RenderJob, Rgba, Scene, ScrawlError, Shape, ShapeStyle, compose, job,
    model::SCENE_FORMAT_VERSION,
};

fn ink(preset: &str) -> ShapeStyle {
    ShapeStyle {
        fill: None,
        stroke: Rgba::BLACK,
        stroke_width: 1.5,
        opacity: 1.0,
        preset: preset.to_string(),
    }
}

fn circle_key(time: f64, radius: f64, preset: &str) -> Keyframe {
    Keyframe {
        time,
        path: PathData::circle(Point::new(64.0, 64.0), radius),
        style: ink(preset),
        ease: Ease::Linear,
    }
}

fn one_shape(shapes: Vec<Shape>) -> Scene {
    Scene {
        version: SCENE_FORMAT_VERSION,
        id: "json-suite".to_string(),
        canvas: Canvas {
            width: 128,
            height: 128,
        },
        background: Rgba::WHITE,
        fps: Fps::new(24, 1).unwrap(),
        duration_secs: 1.0,
        layers: vec![Layer {
            name: "main".to_string(),
            opacity: 1.0,
            blend: Default::default(),
            shapes,
        }],
    }
}

#[test]
fn round_trip_renders_identically() {
    let scene = one_shape(vec![Shape {
        id: "pulse".to_string(),
        keyframes: vec![
            circle_key(0.0, 20.0, "tight-ink"),
            circle_key(0.8, 40.0, "tight-ink"),
        ],
    }]);

    let json = serde_json::to_string_pretty(&scene).unwrap();
    let parsed: Scene = serde_json::from_str(&json).unwrap();
    parsed.validate().unwrap();

    let catalog = PresetCatalog::builtin();
    let a = compose::compose_frame(&scene, &catalog, FrameIndex(10)).unwrap();
    let b = compose::compose_frame(&parsed, &catalog, FrameIndex(10)).unwrap();
    assert_eq!(
        scrawl::encode::encode(&a, OutputFormat::Svg).unwrap(),
        scrawl::encode::encode(&b, OutputFormat::Svg).unwrap()
    );
}

#[test]
fn ease_and_blend_default_when_omitted() {
    let json = r#"{
        "id": "minimal",
        "canvas": { "width": 64, "height": 64 },
        "background": { "r": 255, "g": 255, "b": 255, "a": 255 },
        "fps": { "num": 24, "den": 1 },
        "duration_secs": 1.0,
        "layers": [{
            "name": "main",
            "opacity": 1.0,
            "shapes": [{
                "id": "s",
                "keyframes": [{
                    "time": 0.0,
                    "path": { "subpaths": [{
                        "start": { "x": 10.0, "y": 10.0 },
                        "segments": [{ "LineTo": { "to": { "x": 50.0, "y": 50.0 } } }],
                        "closed": false
                    }] },
                    "style": {
                        "fill": null,
                        "stroke": { "r": 0, "g": 0, "b": 0, "a": 255 },
                        "stroke_width": 1.0,
                        "opacity": 1.0,
                        "preset": "tight-ink"
                    }
                }]
            }]
        }]
    }"#;

    let scene: Scene = serde_json::from_str(json).unwrap();
    assert_eq!(scene.version, SCENE_FORMAT_VERSION);
    assert_eq!(scene.layers[0].shapes[0].keyframes[0].ease, Ease::Linear);
    scene.validate().unwrap();
}

#[test]
fn duplicate_shape_ids_are_rejected() {
    let scene = one_shape(vec![
        Shape {
            id: "twin".to_string(),
            keyframes: vec![circle_key(0.0, 10.0, "tight-ink")],
        },
        Shape {
            id: "twin".to_string(),
            keyframes: vec![circle_key(0.0, 12.0, "tight-ink")],
        },
    ]);
    let err = scene.validate().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedScene);
}

#[test]
fn non_increasing_keyframe_times_are_rejected() {
    let scene = one_shape(vec![Shape {
        id: "bad".to_string(),
        keyframes: vec![
            circle_key(0.5, 10.0, "tight-ink"),
            circle_key(0.5, 20.0, "tight-ink"),
        ],
    }]);
    assert!(scene.validate().is_err());
}

#[test]
fn unknown_preset_fails_admission() {
    let scene = one_shape(vec![Shape {
        id: "s".to_string(),
        keyframes: vec![circle_key(0.0, 10.0, "crayon-deluxe")],
    }]);
    let render = RenderJob {
        job_id: "j".to_string(),
        scene: Arc::new(scene),
        catalog: Arc::new(PresetCatalog::builtin()),
        frame: FrameIndex(0),
        output: OutputSpec {
            format: OutputFormat::Svg,
        },
        timeout: None,
    };
    let err = job::admit(&render).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedScene);
}

#[test]
fn topology_mismatch_surfaces_incompatible_keyframes() {
    // Circle to two-subpath figure: no correspondence exists.
    let mut two_parts = PathData::circle(Point::new(64.0, 64.0), 10.0);
    two_parts
        .subpaths
        .extend(PathData::circle(Point::new(90.0, 90.0), 5.0).subpaths);

    let scene = one_shape(vec![Shape {
        id: "split".to_string(),
        keyframes: vec![
            circle_key(0.0, 10.0, "tight-ink"),
            Keyframe {
                time: 0.8,
                path: two_parts,
                style: ink("tight-ink"),
                ease: Ease::Linear,
            },
        ],
    }]);
    scene.validate().unwrap();

    let catalog = PresetCatalog::builtin();
    let err = compose::compose_frame(&scene, &catalog, FrameIndex(10)).unwrap_err();
    match err {
        ScrawlError::FrameRenderFailed { shape_id, source } => {
            assert_eq!(shape_id, "split");
            assert_eq!(source.kind(), ErrorKind::IncompatibleKeyframes);
        }
        other => panic!("expected FrameRenderFailed, got {other:?}"),
    }
}
