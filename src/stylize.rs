use kurbo::{Point, Vec2};

use crate::{
    core::stable_hash64,
    model::{Fill, PathData},
    noise::ValueNoise2,
    path::{self, Polyline},
    style::StylePreset,
};

/// Max deviation (px) when flattening curves ahead of stroke resampling.
const FLATTEN_TOLERANCE: f64 = 0.1;

/// Deterministic per-shape stylization identity.
///
/// Derived from (scene id, shape id) only, never from an RNG, so the same
/// shape keeps the same "hand" across frames, re-renders, and workers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StylizationSeed(pub u64);

impl StylizationSeed {
    pub fn derive(scene_id: &str, shape_id: &str) -> Self {
        Self(stable_hash64(stable_hash64(0, scene_id), shape_id))
    }

    /// Decorrelated sub-seed for one noise lane. The lane space separates
    /// subpaths, overdraw passes, and x/y axes.
    fn lane(self, subpath: u64, pass: u64, axis: u64) -> u64 {
        self.0
            ^ subpath.wrapping_mul(0xA076_1D64_78BD_642F)
            ^ pass.wrapping_mul(0xE703_7ED1_A0B4_28DB)
            ^ axis.wrapping_mul(0x8EBC_6AF0_9C88_C6E3)
    }
}

/// One drawable sketch stroke: jittered vertices plus the opacity weight of
/// its overdraw pass. Color/width resolution is the compositor's job.
#[derive(Clone, Debug)]
pub struct SketchStroke {
    pub points: Vec<Point>,
    pub closed: bool,
    /// Pass weight in 0..=1, multiplied into the shape opacity downstream.
    pub opacity: f64,
}

/// Replace precise geometry with 1..=3 overlapping hand-drawn strokes.
///
/// Pure in (seed, geometry, time, preset): the jitter is smooth noise
/// evaluated at (arc-length position × jitter_freq, time × jitter_speed),
/// which gives both determinism and temporal coherence for free.
pub fn stylize_path(
    path: &PathData,
    seed: StylizationSeed,
    time: f64,
    preset: &StylePreset,
) -> Vec<SketchStroke> {
    let mut strokes = Vec::new();

    for (si, sp) in path.subpaths.iter().enumerate() {
        let poly = path::flatten_subpath(sp, FLATTEN_TOLERANCE);
        let total = poly.arc_length();
        if total <= 0.0 {
            continue;
        }

        let vertices = resample_for_stroke(&poly, preset.segment_len_px);
        let spacing = if poly.closed {
            total / vertices.len() as f64
        } else {
            total / (vertices.len() - 1) as f64
        };

        let mut pass_opacity = 1.0;
        for pass in 0..preset.overdraw {
            strokes.push(jitter_pass(
                &vertices,
                poly.closed,
                spacing,
                total,
                seed,
                si as u64,
                u64::from(pass),
                time,
                preset,
                pass_opacity,
            ));
            pass_opacity *= preset.overdraw_opacity_falloff;
        }
    }

    strokes
}

/// Cover the path's interior with angled, jittered hachure lines.
///
/// Scanline clipping against the flattened outline (even-odd over all
/// subpaths, so holes work), then each span is sketched like a short stroke.
pub fn hachure_fill(
    path: &PathData,
    fill: &Fill,
    seed: StylizationSeed,
    time: f64,
    preset: &StylePreset,
) -> Vec<SketchStroke> {
    let polys: Vec<Polyline> = path
        .subpaths
        .iter()
        .map(|sp| path::flatten_subpath(sp, FLATTEN_TOLERANCE))
        .collect();

    let spans = hachure_spans(&polys, fill.hachure_gap, fill.hachure_angle_deg);
    let mut strokes = Vec::with_capacity(spans.len());

    for (li, (a, b)) in spans.into_iter().enumerate() {
        let len = (b - a).hypot();
        if len <= 0.0 {
            continue;
        }
        let n = ((len / preset.segment_len_px).ceil() as usize + 1).max(2);
        let vertices: Vec<Point> = (0..n)
            .map(|i| {
                let t = i as f64 / (n - 1) as f64;
                a + (b - a) * t
            })
            .collect();
        // Hachure lanes live past the subpath lane space so fill jitter
        // never correlates with outline jitter.
        strokes.push(jitter_pass(
            &vertices,
            false,
            len / (n - 1) as f64,
            len,
            seed,
            0x4000_0000 + li as u64,
            0,
            time,
            preset,
            1.0,
        ));
    }

    strokes
}

#[allow(clippy::too_many_arguments)]
fn jitter_pass(
    vertices: &[Point],
    closed: bool,
    spacing: f64,
    total_len: f64,
    seed: StylizationSeed,
    subpath: u64,
    pass: u64,
    time: f64,
    preset: &StylePreset,
    opacity: f64,
) -> SketchStroke {
    let nx = ValueNoise2::new(seed.lane(subpath, pass, 0));
    let ny = ValueNoise2::new(seed.lane(subpath, pass, 1));
    let t_coord = time * preset.jitter_speed;

    // Whole-stroke bow: a single slow value per pass, bending open strokes
    // across the chord normal like a relaxed wrist would.
    let bow_noise = ValueNoise2::new(seed.lane(subpath, pass, 2));
    let bow = preset.bowing * bow_noise.sample(0.5, t_coord);
    let chord_normal = if closed || vertices.len() < 2 {
        Vec2::ZERO
    } else {
        let chord = vertices[vertices.len() - 1] - vertices[0];
        let len = chord.hypot();
        if len <= 1e-12 {
            Vec2::ZERO
        } else {
            Vec2::new(-chord.y / len, chord.x / len)
        }
    };

    let points = vertices
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let s = spacing * i as f64;
            let sx = s * preset.jitter_freq;
            let dx = preset.jitter_amp_px * nx.sample(sx, t_coord);
            let dy = preset.jitter_amp_px * ny.sample(sx, t_coord);
            let arc_frac = if total_len <= 0.0 { 0.0 } else { s / total_len };
            let bow_amt = bow * (std::f64::consts::PI * arc_frac).sin();
            *p + Vec2::new(dx, dy) + chord_normal * bow_amt
        })
        .collect();

    SketchStroke {
        points,
        closed,
        opacity,
    }
}

fn resample_for_stroke(poly: &Polyline, segment_len: f64) -> Vec<Point> {
    let total = poly.arc_length();
    let n = if poly.closed {
        ((total / segment_len).round() as usize).max(3)
    } else {
        ((total / segment_len).ceil() as usize + 1).max(2)
    };
    path::resample_uniform(poly, n)
}

/// Intersect evenly spaced parallel lines at `angle_deg` with the outline.
/// Returns clipped spans in original coordinates.
fn hachure_spans(polys: &[Polyline], gap: f64, angle_deg: f64) -> Vec<(Point, Point)> {
    // Rotate the outline so the hachure direction is horizontal, scanline
    // in that space, rotate the spans back.
    let theta = angle_deg.to_radians();
    let (sin, cos) = theta.sin_cos();
    let rot = |p: Point| Point::new(p.x * cos + p.y * sin, -p.x * sin + p.y * cos);
    let unrot = |p: Point| Point::new(p.x * cos - p.y * sin, p.x * sin + p.y * cos);

    // Closed edges only; an open subpath has no interior.
    let mut edges: Vec<(Point, Point)> = Vec::new();
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for poly in polys {
        if !poly.closed || poly.points.len() < 3 {
            continue;
        }
        let pts: Vec<Point> = poly.points.iter().map(|&p| rot(p)).collect();
        for i in 0..pts.len() {
            let a = pts[i];
            let b = pts[(i + 1) % pts.len()];
            min_y = min_y.min(a.y);
            max_y = max_y.max(a.y);
            edges.push((a, b));
        }
    }
    if edges.is_empty() || !min_y.is_finite() || max_y - min_y <= gap {
        return Vec::new();
    }

    let mut spans = Vec::new();
    let mut y = min_y + gap * 0.5;
    while y < max_y {
        let mut xs: Vec<f64> = Vec::new();
        for &(a, b) in &edges {
            // Half-open rule so a scanline through a vertex counts once.
            if (a.y <= y && b.y > y) || (b.y <= y && a.y > y) {
                let t = (y - a.y) / (b.y - a.y);
                xs.push(a.x + (b.x - a.x) * t);
            }
        }
        xs.sort_by(|p, q| p.partial_cmp(q).expect("finite intersection"));
        for pair in xs.chunks_exact(2) {
            if pair[1] - pair[0] > 1e-9 {
                spans.push((unrot(Point::new(pair[0], y)), unrot(Point::new(pair[1], y))));
            }
        }
        y += gap;
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Rgba;
    use crate::style::PresetCatalog;

    fn preset(name: &str) -> StylePreset {
        PresetCatalog::builtin().get(name).unwrap().clone()
    }

    fn max_displacement(original: &PathData, strokes: &[SketchStroke]) -> f64 {
        // Compare each stylized vertex with the closest exact resample point.
        let mut worst = 0.0f64;
        for stroke in strokes {
            let poly = path::flatten_subpath(&original.subpaths[0], 0.01);
            for p in &stroke.points {
                let nearest = poly
                    .points
                    .iter()
                    .map(|q| (*p - *q).hypot())
                    .fold(f64::INFINITY, f64::min);
                worst = worst.max(nearest);
            }
        }
        worst
    }

    #[test]
    fn identical_inputs_give_identical_strokes() {
        let path = PathData::circle(Point::new(50.0, 50.0), 20.0);
        let seed = StylizationSeed::derive("scene-a", "shape-1");
        let p = preset("loose-sketch");
        let a = stylize_path(&path, seed, 0.4, &p);
        let b = stylize_path(&path, seed, 0.4, &p);
        assert_eq!(a.len(), b.len());
        for (sa, sb) in a.iter().zip(b.iter()) {
            assert_eq!(sa.points, sb.points);
            assert_eq!(sa.opacity, sb.opacity);
        }
    }

    #[test]
    fn different_shape_ids_get_different_hands() {
        let path = PathData::circle(Point::new(50.0, 50.0), 20.0);
        let p = preset("loose-sketch");
        let a = stylize_path(&path, StylizationSeed::derive("s", "one"), 0.0, &p);
        let b = stylize_path(&path, StylizationSeed::derive("s", "two"), 0.0, &p);
        assert_ne!(a[0].points, b[0].points);
    }

    #[test]
    fn jitter_is_amplitude_bounded() {
        let path = PathData::circle(Point::new(50.0, 50.0), 20.0);
        let p = preset("loose-sketch");
        let strokes = stylize_path(&path, StylizationSeed::derive("s", "x"), 1.3, &p);
        // Closed stroke: no bowing, so displacement <= sqrt(2) * amp plus
        // resampling slack against the flattened outline.
        let worst = max_displacement(&path, &strokes);
        assert!(
            worst <= p.jitter_amp_px * std::f64::consts::SQRT_2 + 1.0,
            "displacement {worst}"
        );
    }

    #[test]
    fn overdraw_emits_fading_passes() {
        let path = PathData::rect(Point::new(0.0, 0.0), 40.0, 30.0);
        let p = preset("loose-sketch");
        let strokes = stylize_path(&path, StylizationSeed::derive("s", "r"), 0.0, &p);
        assert_eq!(strokes.len(), 3);
        assert_eq!(strokes[0].opacity, 1.0);
        assert!(strokes[1].opacity < strokes[0].opacity);
        assert!(strokes[2].opacity < strokes[1].opacity);
        // Passes are decorrelated, not copies.
        assert_ne!(strokes[0].points, strokes[1].points);
    }

    #[test]
    fn small_time_step_moves_strokes_slightly() {
        let path = PathData::circle(Point::new(50.0, 50.0), 20.0);
        let p = preset("loose-sketch");
        let seed = StylizationSeed::derive("s", "coherent");
        let eps = 1e-3;
        let a = stylize_path(&path, seed, 2.0, &p);
        let b = stylize_path(&path, seed, 2.0 + eps, &p);
        for (sa, sb) in a.iter().zip(b.iter()) {
            for (pa, pb) in sa.points.iter().zip(sb.points.iter()) {
                let d = (*pa - *pb).hypot();
                // Two noise lanes at slope <= 10 per unit, scaled by amp and
                // jitter_speed, plus the bow lane.
                let bound =
                    (2.0 * p.jitter_amp_px + p.bowing) * 10.0 * p.jitter_speed * eps * 2.0;
                assert!(d <= bound, "stroke jumped {d} for eps {eps}");
            }
        }
    }

    #[test]
    fn zero_jitter_speed_freezes_the_sketch() {
        let path = PathData::circle(Point::new(50.0, 50.0), 20.0);
        let mut p = preset("loose-sketch");
        p.jitter_speed = 0.0;
        let seed = StylizationSeed::derive("s", "frozen");
        let a = stylize_path(&path, seed, 0.0, &p);
        let b = stylize_path(&path, seed, 7.5, &p);
        for (sa, sb) in a.iter().zip(b.iter()) {
            assert_eq!(sa.points, sb.points);
        }
    }

    #[test]
    fn hachure_covers_a_rect() {
        let path = PathData::rect(Point::new(0.0, 0.0), 100.0, 50.0);
        let fill = Fill {
            color: Rgba::opaque(200, 40, 40),
            hachure_gap: 8.0,
            hachure_angle_deg: -45.0,
        };
        let p = preset("tight-ink");
        let strokes = hachure_fill(&path, &fill, StylizationSeed::derive("s", "f"), 0.0, &p);
        assert!(strokes.len() >= 5, "only {} hachure lines", strokes.len());
        // Every hachure vertex stays near the rect (jitter-bounded).
        for s in &strokes {
            for pt in &s.points {
                assert!(pt.x >= -4.0 && pt.x <= 104.0);
                assert!(pt.y >= -4.0 && pt.y <= 54.0);
            }
        }
    }

    #[test]
    fn open_subpath_gets_no_hachure() {
        let path = PathData::from_svg_d("M0,0 L100,0").unwrap();
        let fill = Fill::solid_look(Rgba::BLACK);
        let p = preset("tight-ink");
        let strokes = hachure_fill(&path, &fill, StylizationSeed::derive("s", "o"), 0.0, &p);
        assert!(strokes.is_empty());
    }
}
