use kurbo::{PathEl, Point};

use crate::{
    core::{Canvas, Fps, Rgba},
    ease::Ease,
    error::{ScrawlError, ScrawlResult},
};

/// Current scene snapshot format version. Bumped on breaking schema changes;
/// older snapshots are rejected at validation rather than half-parsed.
pub const SCENE_FORMAT_VERSION: u32 = 1;

fn default_version() -> u32 {
    SCENE_FORMAT_VERSION
}

/// An immutable, versioned scene snapshot: the unit of input a render job
/// receives. The core never mutates it.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Scene {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Stable project identity; part of every shape's stylization seed, so
    /// re-renders of the same project keep the same "hand".
    pub id: String,
    pub canvas: Canvas,
    pub background: Rgba,
    pub fps: Fps,
    /// Total timeline length in seconds.
    pub duration_secs: f64,
    /// Paint order: later layers draw on top.
    pub layers: Vec<Layer>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Layer {
    pub name: String,
    pub opacity: f64, // 0..1, clamped at composition
    #[serde(default)]
    pub blend: BlendMode,
    pub shapes: Vec<Shape>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BlendMode {
    #[default]
    Normal,
}

/// A keyframed vector shape. The id is a stable opaque identifier that
/// persists across keyframes; interpolation correspondence and stylization
/// seeding both key off it, never off positional indices.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Shape {
    pub id: String,
    /// Ordered by strictly increasing time; at least one entry.
    pub keyframes: Vec<Keyframe>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Keyframe {
    /// Timeline time in seconds.
    pub time: f64,
    pub path: PathData,
    pub style: ShapeStyle,
    /// Ease applied toward the next key.
    #[serde(default)]
    pub ease: Ease,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ShapeStyle {
    pub fill: Option<Fill>,
    pub stroke: Rgba,
    pub stroke_width: f64,
    pub opacity: f64,
    /// Name into the style preset catalog.
    pub preset: String,
}

/// Hachure fill: the region is covered by angled parallel sketch lines
/// rather than a solid flood, matching the hand-drawn register of strokes.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct Fill {
    pub color: Rgba,
    pub hachure_gap: f64,
    pub hachure_angle_deg: f64,
}

impl Fill {
    pub fn solid_look(color: Rgba) -> Self {
        Self {
            color,
            hachure_gap: 6.0,
            hachure_angle_deg: -45.0,
        }
    }
}

/// Vector path geometry: ordered subpaths of line/cubic segments.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PathData {
    pub subpaths: Vec<SubPath>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SubPath {
    pub start: Point,
    pub segments: Vec<PathSeg>,
    pub closed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum PathSeg {
    LineTo { to: Point },
    CurveTo { c1: Point, c2: Point, to: Point },
}

impl PathData {
    pub fn subpath_count(&self) -> usize {
        self.subpaths.len()
    }

    /// Build from a kurbo path. Quadratics are raised to cubics so the
    /// stored form has exactly two segment kinds.
    pub fn from_bez(bez: &kurbo::BezPath) -> ScrawlResult<Self> {
        let mut subpaths = Vec::new();
        let mut current: Option<SubPath> = None;
        let mut cursor = Point::ZERO;

        for el in bez.elements() {
            match *el {
                PathEl::MoveTo(p) => {
                    if let Some(sp) = current.take() {
                        subpaths.push(sp);
                    }
                    current = Some(SubPath {
                        start: p,
                        segments: Vec::new(),
                        closed: false,
                    });
                    cursor = p;
                }
                PathEl::LineTo(p) => {
                    let sp = current
                        .as_mut()
                        .ok_or_else(|| ScrawlError::malformed("path segment before MoveTo"))?;
                    sp.segments.push(PathSeg::LineTo { to: p });
                    cursor = p;
                }
                PathEl::QuadTo(c, p) => {
                    let sp = current
                        .as_mut()
                        .ok_or_else(|| ScrawlError::malformed("path segment before MoveTo"))?;
                    // Degree elevation: exact cubic form of the quadratic.
                    let c1 = cursor + (c - cursor) * (2.0 / 3.0);
                    let c2 = p + (c - p) * (2.0 / 3.0);
                    sp.segments.push(PathSeg::CurveTo { c1, c2, to: p });
                    cursor = p;
                }
                PathEl::CurveTo(c1, c2, p) => {
                    let sp = current
                        .as_mut()
                        .ok_or_else(|| ScrawlError::malformed("path segment before MoveTo"))?;
                    sp.segments.push(PathSeg::CurveTo { c1, c2, to: p });
                    cursor = p;
                }
                PathEl::ClosePath => {
                    let sp = current
                        .as_mut()
                        .ok_or_else(|| ScrawlError::malformed("ClosePath before MoveTo"))?;
                    sp.closed = true;
                    cursor = sp.start;
                }
            }
        }
        if let Some(sp) = current.take() {
            subpaths.push(sp);
        }
        if subpaths.is_empty() {
            return Err(ScrawlError::malformed("path has no subpaths"));
        }
        Ok(Self { subpaths })
    }

    /// Parse an SVG path `d` attribute (authoring-tool interchange form).
    pub fn from_svg_d(d: &str) -> ScrawlResult<Self> {
        let bez = kurbo::BezPath::from_svg(d)
            .map_err(|e| ScrawlError::malformed(format!("invalid svg path data: {e}")))?;
        Self::from_bez(&bez)
    }

    pub fn to_bez(&self) -> kurbo::BezPath {
        let mut bez = kurbo::BezPath::new();
        for sp in &self.subpaths {
            bez.move_to(sp.start);
            for seg in &sp.segments {
                match *seg {
                    PathSeg::LineTo { to } => bez.line_to(to),
                    PathSeg::CurveTo { c1, c2, to } => bez.curve_to(c1, c2, to),
                }
            }
            if sp.closed {
                bez.close_path();
            }
        }
        bez
    }

    /// Closed circle as four cubic arcs.
    pub fn circle(center: Point, radius: f64) -> Self {
        let bez = kurbo::Shape::to_path(&kurbo::Circle::new(center, radius), 1e-9);
        Self::from_bez(&bez).expect("circle path is well-formed")
    }

    /// Closed axis-aligned rectangle.
    pub fn rect(origin: Point, width: f64, height: f64) -> Self {
        Self {
            subpaths: vec![SubPath {
                start: origin,
                segments: vec![
                    PathSeg::LineTo {
                        to: Point::new(origin.x + width, origin.y),
                    },
                    PathSeg::LineTo {
                        to: Point::new(origin.x + width, origin.y + height),
                    },
                    PathSeg::LineTo {
                        to: Point::new(origin.x, origin.y + height),
                    },
                ],
                closed: true,
            }],
        }
    }
}

impl Scene {
    pub fn shape(&self, shape_id: &str) -> Option<&Shape> {
        self.layers
            .iter()
            .flat_map(|l| l.shapes.iter())
            .find(|s| s.id == shape_id)
    }

    /// Number of whole frames covered by the timeline.
    pub fn frame_count(&self) -> u64 {
        self.fps.secs_to_frames_floor(self.duration_secs)
    }

    pub fn validate(&self) -> ScrawlResult<()> {
        if self.version != SCENE_FORMAT_VERSION {
            return Err(ScrawlError::malformed(format!(
                "unsupported scene format version {} (expected {})",
                self.version, SCENE_FORMAT_VERSION
            )));
        }
        if self.id.trim().is_empty() {
            return Err(ScrawlError::malformed("scene id must be non-empty"));
        }
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(ScrawlError::malformed("canvas width/height must be > 0"));
        }
        Fps::new(self.fps.num, self.fps.den)?;
        if !self.duration_secs.is_finite() || self.duration_secs <= 0.0 {
            return Err(ScrawlError::malformed("duration must be finite and > 0"));
        }

        let mut seen_ids = std::collections::BTreeSet::new();
        let mut latest_key_time = 0.0f64;

        for layer in &self.layers {
            if !layer.opacity.is_finite() {
                return Err(ScrawlError::malformed(format!(
                    "layer '{}' opacity must be finite",
                    layer.name
                )));
            }
            for shape in &layer.shapes {
                if shape.id.trim().is_empty() {
                    return Err(ScrawlError::malformed(format!(
                        "layer '{}' contains a shape with an empty id",
                        layer.name
                    )));
                }
                if !seen_ids.insert(shape.id.as_str()) {
                    return Err(ScrawlError::malformed(format!(
                        "duplicate shape id '{}'",
                        shape.id
                    )));
                }
                if shape.keyframes.is_empty() {
                    return Err(ScrawlError::malformed(format!(
                        "shape '{}' has zero keyframes",
                        shape.id
                    )));
                }
                for kf in &shape.keyframes {
                    if !kf.time.is_finite() || kf.time < 0.0 {
                        return Err(ScrawlError::malformed(format!(
                            "shape '{}' has a keyframe with invalid time {}",
                            shape.id, kf.time
                        )));
                    }
                    if kf.path.subpaths.is_empty() {
                        return Err(ScrawlError::malformed(format!(
                            "shape '{}' has a keyframe with empty geometry",
                            shape.id
                        )));
                    }
                    kf.style.validate(&shape.id)?;
                    latest_key_time = latest_key_time.max(kf.time);
                }
                if !shape.keyframes.windows(2).all(|w| w[0].time < w[1].time) {
                    return Err(ScrawlError::malformed(format!(
                        "shape '{}' keyframe times must be strictly increasing",
                        shape.id
                    )));
                }
            }
        }

        if latest_key_time > self.duration_secs {
            return Err(ScrawlError::malformed(format!(
                "duration {}s is earlier than the latest keyframe at {}s",
                self.duration_secs, latest_key_time
            )));
        }

        Ok(())
    }
}

impl ShapeStyle {
    fn validate(&self, shape_id: &str) -> ScrawlResult<()> {
        if !self.stroke_width.is_finite() || self.stroke_width < 0.0 {
            return Err(ScrawlError::malformed(format!(
                "shape '{shape_id}' stroke_width must be finite and >= 0"
            )));
        }
        if !self.opacity.is_finite() {
            return Err(ScrawlError::malformed(format!(
                "shape '{shape_id}' opacity must be finite"
            )));
        }
        if self.preset.trim().is_empty() {
            return Err(ScrawlError::malformed(format!(
                "shape '{shape_id}' preset name must be non-empty"
            )));
        }
        if let Some(fill) = &self.fill {
            if !fill.hachure_gap.is_finite() || fill.hachure_gap <= 0.0 {
                return Err(ScrawlError::malformed(format!(
                    "shape '{shape_id}' hachure_gap must be finite and > 0"
                )));
            }
            if !fill.hachure_angle_deg.is_finite() {
                return Err(ScrawlError::malformed(format!(
                    "shape '{shape_id}' hachure_angle_deg must be finite"
                )));
            }
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_fixtures::*;
    use super::*;

    #[test]
    fn json_roundtrip_is_structural_identity() {
        let scene = one_shape_scene(growing_circle());
        let s = serde_json::to_string_pretty(&scene).unwrap();
        let de: Scene = serde_json::from_str(&s).unwrap();
        assert_eq!(de.id, scene.id);
        assert_eq!(de.layers.len(), 1);
        assert_eq!(de.layers[0].shapes[0].keyframes.len(), 2);
        assert_eq!(
            de.layers[0].shapes[0].keyframes[0].path,
            scene.layers[0].shapes[0].keyframes[0].path
        );
    }

    #[test]
    fn validate_accepts_basic_scene() {
        one_shape_scene(growing_circle()).validate().unwrap();
    }

    #[test]
    fn validate_rejects_zero_keyframes() {
        let scene = one_shape_scene(Shape {
            id: "empty".to_string(),
            keyframes: vec![],
        });
        assert!(scene.validate().is_err());
    }

    #[test]
    fn validate_rejects_unsorted_keyframes() {
        let mut shape = growing_circle();
        shape.keyframes.swap(0, 1);
        assert!(one_shape_scene(shape).validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_keyframe_times() {
        let mut shape = growing_circle();
        shape.keyframes[1].time = shape.keyframes[0].time;
        assert!(one_shape_scene(shape).validate().is_err());
    }

    #[test]
    fn validate_rejects_duration_before_last_keyframe() {
        let mut scene = one_shape_scene(growing_circle());
        scene.duration_secs = 0.5;
        assert!(scene.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_shape_ids() {
        let mut scene = one_shape_scene(growing_circle());
        let mut dup = scene.layers[0].shapes[0].clone();
        dup.keyframes.truncate(1);
        scene.layers[0].shapes.push(dup);
        assert!(scene.validate().is_err());
    }

    #[test]
    fn validate_rejects_wrong_version() {
        let mut scene = one_shape_scene(growing_circle());
        scene.version = 99;
        assert!(scene.validate().is_err());
    }

    #[test]
    fn svg_d_parse_splits_subpaths() {
        let p = PathData::from_svg_d("M0,0 L10,0 L10,10 Z M20,20 L30,20").unwrap();
        assert_eq!(p.subpath_count(), 2);
        assert!(p.subpaths[0].closed);
        assert!(!p.subpaths[1].closed);
    }

    #[test]
    fn shape_lookup_by_id() {
        let scene = one_shape_scene(growing_circle());
        assert!(scene.shape("circle-0").is_some());
        assert!(scene.shape("nope").is_none());
    }
}
