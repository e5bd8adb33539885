//! # Scrawl guide (v0.1.0)
//!
//! This module is a standalone, end-to-end walkthrough of Scrawl's architecture and public API.
//! It is intentionally detailed so future phases (and external integrations) can build on a shared
//! mental model of what "a frame" means in this codebase.
//!
//! If you are looking for copy/paste commands, start with the repository `README.md`.
//! If you are implementing new features, start here.
//!
//! ---
//!
//! ## Core concepts
//!
//! - [`Scene`](crate::Scene): the keyframed vector document (layers + shapes + keyframes)
//! - [`FrameIndex`](crate::FrameIndex): a 0-based frame index within the scene's duration
//! - [`StylePreset`](crate::StylePreset): named stylization parameters (jitter, overdraw, bowing)
//! - [`FrameDocument`](crate::FrameDocument): backend-agnostic stroke list for a single frame
//! - [`RenderJob`](crate::RenderJob): one frame of one scene as a self-contained unit of work
//! - [`WorkerScheduler`](crate::WorkerScheduler): bounded-concurrency execution over a
//!   [`JobQueue`](crate::JobQueue)
//!
//! The per-frame pipeline is explicitly staged:
//!
//! 1. Interpolate shapes at the frame's time: [`interp::interpolate`](crate::interp::interpolate)
//! 2. Stylize into jittered strokes: [`stylize::stylize_path`](crate::stylize::stylize_path)
//! 3. Compose into a frame document: [`compose_frame`](crate::compose_frame)
//! 4. Encode to bytes: [`encode::encode`](crate::encode::encode)
//!
//! [`job::execute`](crate::job::execute) wraps steps (1)-(3) behind admission checks and
//! cooperative cancellation.
//!
//! ---
//!
//! ## Determinism (and why)
//!
//! Scrawl wants the whole pipeline to be a pure function of `(scene, frame, presets)`.
//! Jitter is therefore never drawn from a stateful RNG. Instead:
//!
//! - each shape gets a [`StylizationSeed`](crate::StylizationSeed) derived from the scene id and
//!   shape id via a seeded FNV-1a hash ([`stable_hash64`](crate::stable_hash64))
//! - displacement comes from smooth value noise sampled at `(arc-length position, time)`,
//!   so the same inputs always produce the same strokes
//! - encoding uses fixed-precision float formatting and a stable attribute order
//!
//! Two consequences worth internalizing:
//!
//! - retrying a failed job yields byte-identical output, so retries are always safe
//! - wobble evolves continuously over time (temporal coherence) rather than re-rolling per
//!   frame, because the noise field is smooth in its time coordinate
//!
//! ---
//!
//! ## Interpolation: from keyframes to a path
//!
//! Each shape carries a time-sorted keyframe list. Sampling at time `t`:
//!
//! - outside the keyed range, the nearest keyframe is held exactly (no extrapolation)
//! - between keyframes, easing applies to the parameter and both paths are flattened,
//!   resampled to a common point count by arc length, and lerped pointwise
//! - keyframes with mismatched topology (subpath count, open vs closed) are rejected with
//!   [`ScrawlError::IncompatibleKeyframes`](crate::ScrawlError)
//!
//! Styles interpolate alongside geometry: colors, widths, and opacities lerp; the preset name
//! holds from the earlier keyframe.
//!
//! ---
//!
//! ## Stylization: from a path to sketchy strokes
//!
//! [`stylize_path`](crate::stylize::stylize_path) turns one interpolated path into
//! [`SketchStroke`](crate::SketchStroke)s:
//!
//! - each subpath is flattened and resampled at the preset's segment length
//! - `overdraw` passes redraw the same subpath with decorrelated noise lanes and decaying
//!   opacity, like a pencil going over a line twice
//! - open strokes get a `bowing` term: a slow bend along the chord normal
//! - filled shapes grow hachure lines (angled parallel strokes clipped to the outline),
//!   jittered with the same machinery
//!
//! Noise lanes are decorrelated per `(subpath, pass, axis)` so x and y wobble independently
//! and overdraw passes do not stack on the same displacement.
//!
//! ---
//!
//! ## Jobs, the queue, and the scheduler
//!
//! One [`RenderJob`](crate::RenderJob) renders one frame. Jobs are immutable and share the
//! scene via `Arc`, so any worker can execute any job with no coordination.
//!
//! - [`JobQueue`](crate::JobQueue) is a visibility-timeout queue: `dequeue` hides a job for a
//!   claim window; `ack` removes it; `nack` (or claim expiry) makes it redeliverable
//! - [`WorkerScheduler`](crate::WorkerScheduler) claims jobs up to its worker budget, retries
//!   transient failures with exponential backoff, and reports one
//!   [`JobOutcome`](crate::JobOutcome) per job
//! - transient vs terminal is decided by [`ScrawlError::is_transient`](crate::ScrawlError):
//!   timeouts and resource exhaustion retry; malformed scenes and topology errors do not
//! - cancellation is cooperative: [`JobControl`](crate::JobControl) is checked between shapes,
//!   and a cancelled job reports `Cancelled`, which is an outcome rather than a failure
//!
//! The in-memory queue ([`InMemoryQueue`](crate::InMemoryQueue)) implements the same contract
//! a remote broker would, so scheduler logic is broker-agnostic.
//!
//! ---
//!
//! ## Rendering a frame (library usage)
//!
//! JSON scenes are supported via Serde, but for programmatic usage the model types compose
//! directly. The following builds a minimal one-shape scene and renders a single SVG frame.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use scrawl::{
//!     Canvas, Fps, FrameIndex, Keyframe, Layer, OutputFormat, OutputSpec, PathData, Point,
//!     PresetCatalog, RenderJob, Rgba, Scene, Shape, ShapeStyle,
//!     compose::FrameOutcome, encode, job, model::SCENE_FORMAT_VERSION,
//! };
//!
//! # fn main() -> scrawl::ScrawlResult<()> {
//! let scene = Scene {
//!     version: SCENE_FORMAT_VERSION,
//!     id: "demo".to_string(),
//!     canvas: Canvas { width: 640, height: 360 },
//!     background: Rgba::WHITE,
//!     fps: Fps::new(30, 1)?,
//!     duration_secs: 2.0,
//!     layers: vec![Layer {
//!         name: "main".to_string(),
//!         opacity: 1.0,
//!         blend: Default::default(),
//!         shapes: vec![Shape {
//!             id: "dot".to_string(),
//!             keyframes: vec![Keyframe {
//!                 time: 0.0,
//!                 path: PathData::circle(Point::new(320.0, 180.0), 40.0),
//!                 style: ShapeStyle {
//!                     fill: None,
//!                     stroke: Rgba::BLACK,
//!                     stroke_width: 2.0,
//!                     opacity: 1.0,
//!                     preset: "loose-sketch".to_string(),
//!                 },
//!                 ease: Default::default(),
//!             }],
//!         }],
//!     }],
//! };
//!
//! let render = RenderJob {
//!     job_id: "demo/0".to_string(),
//!     scene: Arc::new(scene),
//!     catalog: Arc::new(PresetCatalog::builtin()),
//!     frame: FrameIndex(0),
//!     output: OutputSpec { format: OutputFormat::Svg },
//!     timeout: None,
//! };
//!
//! let control = job::JobControl::for_job(&render);
//! let FrameOutcome::Document(doc) = job::execute(&render, &control)? else {
//!     unreachable!("nothing cancels this job");
//! };
//! let svg_bytes = encode::encode(&doc, OutputFormat::Svg)?;
//! assert!(!svg_bytes.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! Notes:
//!
//! - [`Scene::validate`](crate::Scene::validate) runs during job admission; malformed scenes
//!   fail before any rendering starts.
//! - PNG output renders the same SVG through `resvg`, so the two formats cannot drift.
//!
//! ---
//!
//! ## PNG encoding
//!
//! Scrawl has exactly one geometric backend: the SVG serializer. PNG is produced by parsing
//! that SVG with `usvg`, rasterizing with `resvg` into a premultiplied pixmap, demultiplying,
//! and encoding with the `image` crate. This keeps raster output pixel-for-pixel faithful to
//! the vector output by construction.
