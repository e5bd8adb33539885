use crate::{
    core::Rgba,
    error::{ScrawlError, ScrawlResult},
    model::{Fill, Keyframe, PathData, PathSeg, Shape, ShapeStyle, SubPath},
    path::{self, Bracket, Polyline},
};

/// Max deviation (px) when flattening curves for correspondence resampling.
/// Stylization resamples again at the preset's segment length, so this only
/// needs to be comfortably below visible error.
pub const FLATTEN_TOLERANCE: f64 = 0.1;

/// Geometry and style of one shape at one frame time.
///
/// Outside the keyed range this is an exact copy of the nearest keyframe. In
/// between it is tweened geometry: both keys resampled to a shared point
/// count along arc length, positions lerped point-wise under the earlier
/// key's ease.
#[derive(Clone, Debug)]
pub struct InterpolatedShape {
    pub path: PathData,
    pub style: ShapeStyle,
}

pub fn interpolate(shape: &Shape, t: f64) -> ScrawlResult<InterpolatedShape> {
    match path::bracket(shape, t) {
        Bracket::Before(k) | Bracket::After(k) => Ok(InterpolatedShape {
            path: k.path.clone(),
            style: k.style.clone(),
        }),
        Bracket::Between { a, b, u } => tween(shape, a, b, u),
    }
}

fn tween(shape: &Shape, a: &Keyframe, b: &Keyframe, u: f64) -> ScrawlResult<InterpolatedShape> {
    // Topology guard: a correspondence between structurally different paths
    // would be a guess, and a wrong guess renders garbage. Fail instead.
    if a.path.subpath_count() != b.path.subpath_count() {
        return Err(ScrawlError::IncompatibleKeyframes {
            shape_id: shape.id.clone(),
            t0: a.time,
            t1: b.time,
            detail: format!(
                "{} vs {} subpaths",
                a.path.subpath_count(),
                b.path.subpath_count()
            ),
        });
    }

    let eased = a.ease.apply(u);
    let mut subpaths = Vec::with_capacity(a.path.subpath_count());

    for (sp_a, sp_b) in a.path.subpaths.iter().zip(b.path.subpaths.iter()) {
        if sp_a.closed != sp_b.closed {
            return Err(ScrawlError::IncompatibleKeyframes {
                shape_id: shape.id.clone(),
                t0: a.time,
                t1: b.time,
                detail: "open/closed subpath mismatch".to_string(),
            });
        }

        let poly_a = path::flatten_subpath(sp_a, FLATTEN_TOLERANCE);
        let poly_b = path::flatten_subpath(sp_b, FLATTEN_TOLERANCE);
        let n = poly_a.points.len().max(poly_b.points.len()).max(2);
        let pts_a = path::resample_uniform(&poly_a, n);
        let pts_b = path::resample_uniform(&poly_b, n);

        let mixed: Vec<kurbo::Point> = pts_a
            .iter()
            .zip(pts_b.iter())
            .map(|(pa, pb)| *pa + (*pb - *pa) * eased)
            .collect();
        subpaths.push(polyline_to_subpath(&Polyline {
            points: mixed,
            closed: sp_a.closed,
        }));
    }

    Ok(InterpolatedShape {
        path: PathData { subpaths },
        style: lerp_style(&a.style, &b.style, eased),
    })
}

fn polyline_to_subpath(poly: &Polyline) -> SubPath {
    let start = poly.points[0];
    let segments = poly.points[1..]
        .iter()
        .map(|&to| PathSeg::LineTo { to })
        .collect();
    SubPath {
        start,
        segments,
        closed: poly.closed,
    }
}

fn lerp_style(a: &ShapeStyle, b: &ShapeStyle, t: f64) -> ShapeStyle {
    let fill = match (&a.fill, &b.fill) {
        (Some(fa), Some(fb)) => Some(Fill {
            color: Rgba::lerp(fa.color, fb.color, t),
            hachure_gap: fa.hachure_gap + (fb.hachure_gap - fa.hachure_gap) * t,
            hachure_angle_deg: fa.hachure_angle_deg
                + (fb.hachure_angle_deg - fa.hachure_angle_deg) * t,
        }),
        // A fill appearing or vanishing between keys is not tweenable;
        // hold the earlier key's setting for the whole span.
        _ => a.fill,
    };
    ShapeStyle {
        fill,
        stroke: Rgba::lerp(a.stroke, b.stroke, t),
        stroke_width: a.stroke_width + (b.stroke_width - a.stroke_width) * t,
        opacity: a.opacity + (b.opacity - a.opacity) * t,
        preset: a.preset.clone(),
    }
}
