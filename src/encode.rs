use std::fmt::Write as _;

use crate::{
    compose::{FrameDocument, StrokePrim},
    error::{ScrawlError, ScrawlResult},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OutputFormat {
    Svg,
    Png,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
        }
    }
}

/// Encode a composed frame to its output bytes.
///
/// Byte-determinism is a contract here, not a nicety: the same document must
/// always encode to the same bytes (fixed float formatting, stable attribute
/// order), because job-level determinism is verified at this boundary.
pub fn encode(doc: &FrameDocument, format: OutputFormat) -> ScrawlResult<Vec<u8>> {
    match format {
        OutputFormat::Svg => Ok(encode_svg(doc).into_bytes()),
        OutputFormat::Png => encode_png(doc),
    }
}

/// Deterministic SVG markup for one frame. All strokes use round caps and
/// joins; sharp corners read as mechanical, which is the one thing the
/// stylizer exists to avoid.
pub fn encode_svg(doc: &FrameDocument) -> String {
    let mut out = String::with_capacity(1024 + doc.prims.len() * 128);
    let w = doc.canvas.width;
    let h = doc.canvas.height;

    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
    );
    let _ = writeln!(
        out,
        r#"<rect width="{w}" height="{h}" fill="{}" fill-opacity="{}"/>"#,
        hex_color(doc.background.r, doc.background.g, doc.background.b),
        fmt_f(f64::from(doc.background.a) / 255.0),
    );

    for prim in &doc.prims {
        let _ = writeln!(out, "{}", stroke_element(prim));
    }

    out.push_str("</svg>\n");
    out
}

fn stroke_element(prim: &StrokePrim) -> String {
    let mut d = String::with_capacity(prim.points.len() * 16);
    for (i, p) in prim.points.iter().enumerate() {
        let cmd = if i == 0 { 'M' } else { 'L' };
        let _ = write!(d, "{}{} {} ", cmd, fmt_f(p.x), fmt_f(p.y));
    }
    if prim.closed {
        d.push('Z');
    } else {
        d.pop(); // trailing space
    }

    let opacity = prim.opacity.clamp(0.0, 1.0) * f64::from(prim.color.a) / 255.0;
    format!(
        r#"<path d="{d}" fill="none" stroke="{}" stroke-width="{}" stroke-opacity="{}" stroke-linecap="round" stroke-linejoin="round"/>"#,
        hex_color(prim.color.r, prim.color.g, prim.color.b),
        fmt_f(prim.width),
        fmt_f(opacity),
    )
}

/// Rasterize by rendering the SVG encoding, so vector and raster output can
/// never drift apart.
fn encode_png(doc: &FrameDocument) -> ScrawlResult<Vec<u8>> {
    let svg = encode_svg(doc);
    let options = usvg::Options::default();
    let tree = usvg::Tree::from_data(svg.as_bytes(), &options)
        .map_err(|e| ScrawlError::encode(format!("svg parse for raster: {e}")))?;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(doc.canvas.width, doc.canvas.height)
        .ok_or_else(|| ScrawlError::resource("could not allocate raster surface"))?;
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::identity(),
        &mut pixmap.as_mut(),
    );

    // tiny-skia stores premultiplied RGBA; the PNG contract is straight.
    let mut rgba = Vec::with_capacity((doc.canvas.width * doc.canvas.height * 4) as usize);
    for px in pixmap.pixels() {
        let c = px.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }

    let img = image::RgbaImage::from_raw(doc.canvas.width, doc.canvas.height, rgba)
        .ok_or_else(|| ScrawlError::encode("raster buffer size mismatch"))?;
    let mut bytes = std::io::Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png)
        .map_err(|e| ScrawlError::encode(format!("png encode: {e}")))?;
    Ok(bytes.into_inner())
}

fn hex_color(r: u8, g: u8, b: u8) -> String {
    format!("#{r:02X}{g:02X}{b:02X}")
}

/// Fixed three-decimal formatting: enough precision for sub-pixel strokes,
/// bit-stable across runs and platforms.
fn fmt_f(v: f64) -> String {
    format!("{v:.3}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::compose_frame;
    use crate::core::FrameIndex;
    use crate::model::test_fixtures::{growing_circle, one_shape_scene};
    use crate::style::PresetCatalog;

    fn doc() -> FrameDocument {
        let scene = one_shape_scene(growing_circle());
        compose_frame(&scene, &PresetCatalog::builtin(), FrameIndex(10)).unwrap()
    }

    #[test]
    fn svg_is_byte_deterministic() {
        let d = doc();
        assert_eq!(encode(&d, OutputFormat::Svg).unwrap(), encode(&d, OutputFormat::Svg).unwrap());
    }

    #[test]
    fn svg_has_round_caps_and_viewbox() {
        let svg = encode_svg(&doc());
        assert!(svg.contains(r#"viewBox="0 0 640 360""#));
        assert!(svg.contains(r#"stroke-linecap="round""#));
        assert!(svg.contains(r#"stroke-linejoin="round""#));
        assert!(svg.contains(r#"fill="none""#));
    }

    #[test]
    fn closed_strokes_emit_z() {
        let svg = encode_svg(&doc());
        // The circle outline is closed.
        assert!(svg.contains('Z'));
    }

    #[test]
    fn float_formatting_is_fixed_width() {
        assert_eq!(fmt_f(1.0), "1.000");
        assert_eq!(fmt_f(0.123456), "0.123");
        assert_eq!(fmt_f(-2.5), "-2.500");
    }

    #[test]
    fn png_roundtrips_dimensions() {
        let d = doc();
        let bytes = encode(&d, OutputFormat::Png).unwrap();
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!(img.width(), 640);
        assert_eq!(img.height(), 360);
    }

    #[test]
    fn png_is_byte_deterministic() {
        let d = doc();
        assert_eq!(encode(&d, OutputFormat::Png).unwrap(), encode(&d, OutputFormat::Png).unwrap());
    }
}
