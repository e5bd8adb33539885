use kurbo::Point;

use crate::model::{Keyframe, Shape, SubPath};

/// Where a query time falls relative to a shape's keyframes.
///
/// Outside the keyed range the geometry holds the nearest key exactly; the
/// renderer never extrapolates.
#[derive(Clone, Copy, Debug)]
pub enum Bracket<'a> {
    Before(&'a Keyframe),
    Between {
        a: &'a Keyframe,
        b: &'a Keyframe,
        /// Raw (un-eased) fraction in [0,1] between `a.time` and `b.time`.
        u: f64,
    },
    After(&'a Keyframe),
}

/// Find the keyframes bracketing `t`. Callers must hand in a validated shape
/// (at least one keyframe, strictly increasing times).
pub fn bracket(shape: &Shape, t: f64) -> Bracket<'_> {
    let keys = &shape.keyframes;
    let idx = keys.partition_point(|k| k.time <= t);

    if idx == 0 {
        return Bracket::Before(&keys[0]);
    }
    if idx >= keys.len() {
        let last = &keys[keys.len() - 1];
        // `t` may sit exactly on the last key; either way the last key holds.
        return Bracket::After(last);
    }

    let a = &keys[idx - 1];
    let b = &keys[idx];
    let denom = b.time - a.time;
    let u = if denom <= 0.0 {
        0.0
    } else {
        ((t - a.time) / denom).clamp(0.0, 1.0)
    };
    Bracket::Between { a, b, u }
}

/// A flattened subpath: straight-line vertices at a bounded deviation from
/// the source curve.
#[derive(Clone, Debug, PartialEq)]
pub struct Polyline {
    pub points: Vec<Point>,
    pub closed: bool,
}

impl Polyline {
    /// Total length, including the implicit closing segment when closed.
    pub fn arc_length(&self) -> f64 {
        let mut len = segment_lengths(&self.points).iter().sum::<f64>();
        if self.closed && self.points.len() >= 2 {
            len += (self.points[0] - self.points[self.points.len() - 1]).hypot();
        }
        len
    }
}

/// Flatten one subpath to a polyline with max deviation `tolerance`.
pub fn flatten_subpath(sp: &SubPath, tolerance: f64) -> Polyline {
    let mut single = crate::model::PathData {
        subpaths: vec![sp.clone()],
    };
    // Flattening ignores closure; carry it through on the polyline.
    single.subpaths[0].closed = false;
    let bez = single.to_bez();

    let mut points: Vec<Point> = Vec::new();
    kurbo::flatten(bez.elements().iter().copied(), tolerance, |el| match el {
        kurbo::PathEl::MoveTo(p) | kurbo::PathEl::LineTo(p) => points.push(p),
        _ => {}
    });
    if points.is_empty() {
        points.push(sp.start);
    }
    Polyline {
        points,
        closed: sp.closed,
    }
}

/// Resample a polyline to exactly `n` points spaced uniformly by arc length.
///
/// Open polylines keep both endpoints exactly. Closed polylines distribute
/// `n` points over the full perimeter without repeating the start point.
/// This is the correspondence primitive for shape tweening and the
/// segmentation primitive for stylization.
pub fn resample_uniform(poly: &Polyline, n: usize) -> Vec<Point> {
    assert!(n >= 2, "resample_uniform needs at least 2 points");
    let pts = &poly.points;
    if pts.len() == 1 {
        return vec![pts[0]; n];
    }

    // Work on the effective vertex loop: closed polylines get the closing
    // segment appended for measurement.
    let mut verts: Vec<Point> = pts.clone();
    if poly.closed {
        verts.push(pts[0]);
    }

    let seg_lens = segment_lengths(&verts);
    let total: f64 = seg_lens.iter().sum();
    if total <= 0.0 {
        return vec![verts[0]; n];
    }

    let step = if poly.closed {
        total / (n as f64)
    } else {
        total / ((n - 1) as f64)
    };

    let mut out = Vec::with_capacity(n);
    let mut seg_idx = 0usize;
    let mut seg_start_arc = 0.0f64;

    for i in 0..n {
        let target = if !poly.closed && i == n - 1 {
            total // land on the far endpoint exactly
        } else {
            step * (i as f64)
        };

        while seg_idx < seg_lens.len() - 1 && seg_start_arc + seg_lens[seg_idx] < target {
            seg_start_arc += seg_lens[seg_idx];
            seg_idx += 1;
        }

        let seg_len = seg_lens[seg_idx];
        let local = if seg_len <= 0.0 {
            0.0
        } else {
            ((target - seg_start_arc) / seg_len).clamp(0.0, 1.0)
        };
        let a = verts[seg_idx];
        let b = verts[seg_idx + 1];
        out.push(a + (b - a) * local);
    }
    out
}

fn segment_lengths(points: &[Point]) -> Vec<f64> {
    points
        .windows(2)
        .map(|w| (w[1] - w[0]).hypot())
        .collect::<Vec<_>>()
}
