use std::collections::BTreeMap;

use crate::error::{ScrawlError, ScrawlResult};

/// The tunable surface of hand-drawn stylization. Presets are data: the
/// engine defines the parameterization, content defines the values.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct StylePreset {
    /// Target spacing (px) between stroke vertices after resampling.
    pub segment_len_px: f64,
    /// Max positional displacement (px) of any stroke vertex.
    pub jitter_amp_px: f64,
    /// Spatial frequency of the jitter along arc length (cycles per px).
    pub jitter_freq: f64,
    /// Scale on the noise time coordinate: 0 freezes the sketch, larger
    /// values give a constantly "redrawing" look.
    pub jitter_speed: f64,
    /// Number of overlapping passes per stroke (1..=3). Extra passes use
    /// decorrelated jitter and fading opacity to emulate overdrawing.
    pub overdraw: u32,
    /// Opacity multiplier applied to each pass after the first.
    pub overdraw_opacity_falloff: f64,
    /// Amplitude (px) of a low-frequency bend across the whole stroke.
    pub bowing: f64,
}

impl StylePreset {
    pub fn validate(&self, name: &str) -> ScrawlResult<()> {
        if !self.segment_len_px.is_finite() || self.segment_len_px <= 0.0 {
            return Err(ScrawlError::malformed(format!(
                "preset '{name}': segment_len_px must be finite and > 0"
            )));
        }
        if !self.jitter_amp_px.is_finite() || self.jitter_amp_px < 0.0 {
            return Err(ScrawlError::malformed(format!(
                "preset '{name}': jitter_amp_px must be finite and >= 0"
            )));
        }
        if !self.jitter_freq.is_finite() || self.jitter_freq <= 0.0 {
            return Err(ScrawlError::malformed(format!(
                "preset '{name}': jitter_freq must be finite and > 0"
            )));
        }
        if !self.jitter_speed.is_finite() || self.jitter_speed < 0.0 {
            return Err(ScrawlError::malformed(format!(
                "preset '{name}': jitter_speed must be finite and >= 0"
            )));
        }
        if !(1..=3).contains(&self.overdraw) {
            return Err(ScrawlError::malformed(format!(
                "preset '{name}': overdraw must be between 1 and 3"
            )));
        }
        if !self.overdraw_opacity_falloff.is_finite()
            || !(0.0..=1.0).contains(&self.overdraw_opacity_falloff)
        {
            return Err(ScrawlError::malformed(format!(
                "preset '{name}': overdraw_opacity_falloff must be in 0..=1"
            )));
        }
        if !self.bowing.is_finite() || self.bowing < 0.0 {
            return Err(ScrawlError::malformed(format!(
                "preset '{name}': bowing must be finite and >= 0"
            )));
        }
        Ok(())
    }
}

/// Named style presets, stable-ordered by name.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct PresetCatalog {
    pub presets: BTreeMap<String, StylePreset>,
}

impl PresetCatalog {
    /// The built-in presets. Values are tuning, not contract; the names are
    /// stable.
    pub fn builtin() -> Self {
        let mut presets = BTreeMap::new();
        presets.insert(
            "loose-sketch".to_string(),
            StylePreset {
                segment_len_px: 6.0,
                jitter_amp_px: 2.5,
                jitter_freq: 0.04,
                jitter_speed: 0.8,
                overdraw: 3,
                overdraw_opacity_falloff: 0.65,
                bowing: 3.0,
            },
        );
        presets.insert(
            "tight-ink".to_string(),
            StylePreset {
                segment_len_px: 4.0,
                jitter_amp_px: 0.8,
                jitter_freq: 0.08,
                jitter_speed: 0.2,
                overdraw: 1,
                overdraw_opacity_falloff: 1.0,
                bowing: 0.8,
            },
        );
        presets.insert(
            "marker".to_string(),
            StylePreset {
                segment_len_px: 8.0,
                jitter_amp_px: 1.4,
                jitter_freq: 0.02,
                jitter_speed: 0.4,
                overdraw: 2,
                overdraw_opacity_falloff: 0.8,
                bowing: 1.5,
            },
        );
        Self { presets }
    }

    /// Parse an external catalog (JSON map of name to preset) and layer it
    /// over the built-ins, external entries winning on name collisions.
    pub fn builtin_with_overrides(json: &str) -> ScrawlResult<Self> {
        let overrides: BTreeMap<String, StylePreset> = serde_json::from_str(json)
            .map_err(|e| ScrawlError::malformed(format!("invalid preset catalog: {e}")))?;
        let mut catalog = Self::builtin();
        catalog.presets.extend(overrides);
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn get(&self, name: &str) -> ScrawlResult<&StylePreset> {
        self.presets
            .get(name)
            .ok_or_else(|| ScrawlError::malformed(format!("unknown style preset '{name}'")))
    }

    pub fn validate(&self) -> ScrawlResult<()> {
        for (name, preset) in &self.presets {
            if name.trim().is_empty() {
                return Err(ScrawlError::malformed("preset name must be non-empty"));
            }
            preset.validate(name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_valid() {
        let catalog = PresetCatalog::builtin();
        catalog.validate().unwrap();
        for name in ["loose-sketch", "tight-ink", "marker"] {
            catalog.get(name).unwrap();
        }
    }

    #[test]
    fn unknown_preset_is_an_error() {
        assert!(PresetCatalog::builtin().get("charcoal").is_err());
    }

    #[test]
    fn overrides_layer_over_builtins() {
        let json = r#"{
            "tight-ink": {
                "segment_len_px": 2.0,
                "jitter_amp_px": 0.5,
                "jitter_freq": 0.1,
                "jitter_speed": 0.1,
                "overdraw": 1,
                "overdraw_opacity_falloff": 1.0,
                "bowing": 0.2
            }
        }"#;
        let catalog = PresetCatalog::builtin_with_overrides(json).unwrap();
        assert_eq!(catalog.get("tight-ink").unwrap().segment_len_px, 2.0);
        // Untouched builtins survive.
        catalog.get("loose-sketch").unwrap();
    }

    #[test]
    fn invalid_override_is_rejected() {
        let json = r#"{
            "bad": {
                "segment_len_px": 0.0,
                "jitter_amp_px": 1.0,
                "jitter_freq": 0.05,
                "jitter_speed": 0.5,
                "overdraw": 2,
                "overdraw_opacity_falloff": 0.7,
                "bowing": 1.0
            }
        }"#;
        assert!(PresetCatalog::builtin_with_overrides(json).is_err());
    }

    #[test]
    fn overdraw_bounds_enforced() {
        let mut catalog = PresetCatalog::builtin();
        catalog.presets.get_mut("marker").unwrap().overdraw = 4;
        assert!(catalog.validate().is_err());
    }
}
