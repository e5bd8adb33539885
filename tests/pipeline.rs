use std::{sync::Arc, time::Duration};

use scrawl::{
    Canvas, Fps, FrameIndex, InMemoryQueue, JobStatus, Keyframe, Layer, OutputFormat, OutputSpec,
    PathData, Point, PresetCatalog, RenderJob, Rgba, Scene, SchedulerConfig, Shape, ShapeStyle,
    WorkerScheduler, compose, encode, model::SCENE_FORMAT_VERSION,
};

fn short_scene() -> Scene {
    let key = |time: f64, radius: f64| Keyframe {
        time,
        path: PathData::circle(Point::new(48.0, 48.0), radius),
        style: ShapeStyle {
            fill: None,
            stroke: Rgba::BLACK,
            stroke_width: 2.0,
            opacity: 1.0,
            preset: "marker".to_string(),
        },
        ease: Default::default(),
    };
    Scene {
        version: SCENE_FORMAT_VERSION,
        id: "pipeline".to_string(),
        canvas: Canvas {
            width: 96,
            height: 96,
        },
        background: Rgba::WHITE,
        fps: Fps::new(12, 1).unwrap(),
        duration_secs: 0.5, // 6 frames
        layers: vec![Layer {
            name: "main".to_string(),
            opacity: 1.0,
            blend: Default::default(),
            shapes: vec![Shape {
                id: "pulse".to_string(),
                keyframes: vec![key(0.0, 12.0), key(0.4, 30.0)],
            }],
        }],
    }
}

#[test]
fn scheduler_output_matches_direct_rendering() {
    let scene = Arc::new(short_scene());
    let catalog = Arc::new(PresetCatalog::builtin());
    let frames = scene.frame_count();
    assert_eq!(frames, 6);

    let queue = InMemoryQueue::bounded(frames as usize);
    for f in 0..frames {
        scrawl::JobQueue::enqueue(
            &queue,
            RenderJob {
                job_id: format!("frame_{f:05}"),
                scene: Arc::clone(&scene),
                catalog: Arc::clone(&catalog),
                frame: FrameIndex(f),
                output: OutputSpec {
                    format: OutputFormat::Svg,
                },
                timeout: Some(Duration::from_secs(30)),
            },
        )
        .unwrap();
    }

    let scheduler = WorkerScheduler::new(SchedulerConfig {
        workers: 3,
        ..SchedulerConfig::default()
    })
    .unwrap();
    let mut results = scheduler.drain(&queue);
    assert_eq!(results.len(), frames as usize);
    results.sort_by(|a, b| a.outcome.job_id.cmp(&b.outcome.job_id));

    for (f, result) in results.iter().enumerate() {
        assert_eq!(result.outcome.status, JobStatus::Succeeded);
        assert_eq!(result.outcome.job_id, format!("frame_{f:05}"));

        let direct = compose::compose_frame(&scene, &catalog, FrameIndex(f as u64)).unwrap();
        let direct_bytes = encode::encode(&direct, OutputFormat::Svg).unwrap();
        assert_eq!(result.payload.as_deref(), Some(direct_bytes.as_slice()));
    }
}

#[test]
fn svg_output_has_stable_structure() {
    let scene = short_scene();
    let catalog = PresetCatalog::builtin();
    let doc = compose::compose_frame(&scene, &catalog, FrameIndex(2)).unwrap();
    let bytes = encode::encode(&doc, OutputFormat::Svg).unwrap();
    let svg = String::from_utf8(bytes).unwrap();

    assert!(svg.starts_with("<svg "));
    assert!(svg.contains(r#"viewBox="0 0 96 96""#));
    assert!(svg.contains(r#"stroke-linecap="round""#));
    assert!(svg.ends_with("</svg>\n"));
}

#[test]
fn png_output_rasterizes_the_same_frame() {
    let scene = short_scene();
    let catalog = PresetCatalog::builtin();
    let doc = compose::compose_frame(&scene, &catalog, FrameIndex(2)).unwrap();
    let bytes = encode::encode(&doc, OutputFormat::Png).unwrap();

    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    let img = image::load_from_memory(&bytes).unwrap();
    assert_eq!(img.width(), 96);
    assert_eq!(img.height(), 96);
}
