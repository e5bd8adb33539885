use kurbo::Point;

use crate::{
    core::{Canvas, FrameIndex, Rgba},
    error::{ScrawlError, ScrawlResult},
    interp,
    job::JobControl,
    model::{Scene, Shape},
    style::PresetCatalog,
    stylize::{self, StylizationSeed},
};

/// The fully composited, stylized representation of one frame, ready for
/// encoding. Transient: created and destroyed inside a single job.
#[derive(Clone, Debug)]
pub struct FrameDocument {
    pub frame: FrameIndex,
    pub canvas: Canvas,
    pub background: Rgba,
    /// Paint-ordered drawables: earlier entries draw first.
    pub prims: Vec<StrokePrim>,
}

/// One drawable sketch stroke with fully resolved paint.
#[derive(Clone, Debug)]
pub struct StrokePrim {
    /// Originating shape, kept for observability and fingerprinting.
    pub shape_id: String,
    pub points: Vec<Point>,
    pub closed: bool,
    pub color: Rgba,
    pub width: f64,
    pub opacity: f64,
}

/// How a controlled composition ended.
#[derive(Debug)]
pub enum FrameOutcome {
    Document(FrameDocument),
    /// Cancellation observed at a checkpoint. Not an error: the caller asked.
    Cancelled,
}

/// Compose one frame without external control (no cancellation, no deadline).
pub fn compose_frame(
    scene: &Scene,
    catalog: &PresetCatalog,
    frame: FrameIndex,
) -> ScrawlResult<FrameDocument> {
    match compose_frame_controlled(scene, catalog, frame, &JobControl::unbounded())? {
        FrameOutcome::Document(doc) => Ok(doc),
        FrameOutcome::Cancelled => Err(ScrawlError::Other(anyhow::anyhow!(
            "unbounded composition reported cancellation"
        ))),
    }
}

/// Compose one frame: interpolate, stylize, and assemble every shape of
/// every layer in paint order.
///
/// Any per-shape failure aborts the whole frame with `FrameRenderFailed` —
/// partial frames are never emitted. The control is checked between shapes
/// (never mid-path), surfacing cancellation as `FrameOutcome::Cancelled`
/// and a blown deadline as the transient `Timeout` error.
#[tracing::instrument(skip(scene, catalog, control), fields(scene = %scene.id, frame = frame.0))]
pub fn compose_frame_controlled(
    scene: &Scene,
    catalog: &PresetCatalog,
    frame: FrameIndex,
    control: &JobControl,
) -> ScrawlResult<FrameOutcome> {
    scene.validate()?;
    if frame.0 >= scene.frame_count() {
        return Err(ScrawlError::malformed(format!(
            "frame {} is out of bounds (scene has {} frames)",
            frame.0,
            scene.frame_count()
        )));
    }

    let t = scene.fps.frame_to_secs(frame);
    let mut prims = Vec::new();

    for layer in &scene.layers {
        let layer_opacity = layer.opacity.clamp(0.0, 1.0);
        for shape in &layer.shapes {
            if control.is_cancelled() {
                tracing::debug!(shape = %shape.id, "composition cancelled");
                return Ok(FrameOutcome::Cancelled);
            }
            control.check_deadline()?;

            compose_shape(scene, catalog, shape, t, layer_opacity, &mut prims)
                .map_err(|e| ScrawlError::frame_failed(shape.id.clone(), e))?;
        }
    }

    tracing::debug!(prims = prims.len(), "frame composed");
    Ok(FrameOutcome::Document(FrameDocument {
        frame,
        canvas: scene.canvas,
        background: scene.background,
        prims,
    }))
}

fn compose_shape(
    scene: &Scene,
    catalog: &PresetCatalog,
    shape: &Shape,
    t: f64,
    layer_opacity: f64,
    prims: &mut Vec<StrokePrim>,
) -> ScrawlResult<()> {
    let evaluated = interp::interpolate(shape, t)?;
    let preset = catalog.get(&evaluated.style.preset)?;
    let seed = StylizationSeed::derive(&scene.id, &shape.id);
    let shape_opacity = layer_opacity * evaluated.style.opacity.clamp(0.0, 1.0);

    // Fill under outline, matching how a hand fills before inking the edge.
    if let Some(fill) = &evaluated.style.fill {
        for stroke in stylize::hachure_fill(&evaluated.path, fill, seed, t, preset) {
            prims.push(StrokePrim {
                shape_id: shape.id.clone(),
                points: stroke.points,
                closed: stroke.closed,
                color: fill.color,
                width: (evaluated.style.stroke_width * 0.6).max(0.5),
                opacity: shape_opacity * stroke.opacity,
            });
        }
    }

    for stroke in stylize::stylize_path(&evaluated.path, seed, t, preset) {
        prims.push(StrokePrim {
            shape_id: shape.id.clone(),
            points: stroke.points,
            closed: stroke.closed,
            color: evaluated.style.stroke,
            width: evaluated.style.stroke_width,
            opacity: shape_opacity * stroke.opacity,
        });
    }

    Ok(())
}
