//! Configuration structures for the notary.
//!
//! Library crates never read environment variables or files for configuration.
//! Hosts (the CLI, tests) build these structs explicitly and hand them down.

use serde::{Deserialize, Serialize};

use crate::errors::{NotaryError, NotaryResult};

/// Global configuration container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotaryConfig {
    pub watermark: WatermarkConfig,
    pub limits: LimitsConfig,
}

/// Whether the provenance text depends on the logo being drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextPolicy {
    /// Draw the text on every page regardless of the logo outcome.
    #[default]
    Always,
    /// Draw the text only on pages where the logo was drawn.
    WithLogoOnly,
}

impl TextPolicy {
    pub fn parse(s: &str) -> NotaryResult<Self> {
        match s {
            "always" => Ok(Self::Always),
            "with-logo" | "with-logo-only" => Ok(Self::WithLogoOnly),
            _ => Err(NotaryError::invalid_argument(format!(
                "unsupported text policy: {s}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::WithLogoOnly => "with-logo",
        }
    }
}

/// Geometry and styling of the provenance overlay, in PDF points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkConfig {
    /// Offset of text and logo from the lower-left page corner.
    pub margin: f32,
    pub text_size: f32,
    pub text_opacity: f32,
    pub logo_opacity: f32,
    /// Absolute cap on the drawn logo width.
    pub logo_max_width: f32,
    /// Cap on the drawn logo width relative to the page width.
    pub logo_width_fraction: f32,
    /// Vertical distance between the text baseline and the logo.
    pub logo_offset_y: f32,
    pub text_policy: TextPolicy,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            margin: 20.0,
            text_size: 10.0,
            text_opacity: 0.7,
            logo_opacity: 0.8,
            logo_max_width: 80.0,
            logo_width_fraction: 1.0 / 6.0,
            logo_offset_y: 15.0,
            text_policy: TextPolicy::Always,
        }
    }
}

/// Resource limits applied by hosts before bytes reach the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_input_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: 256 * 1024 * 1024,
        }
    }
}

/// Validate a full configuration object.
pub fn validate_config(cfg: &NotaryConfig) -> NotaryResult<()> {
    let w = &cfg.watermark;

    for (field, v) in [
        ("margin", w.margin),
        ("logo_offset_y", w.logo_offset_y),
    ] {
        if !v.is_finite() || v < 0.0 {
            return Err(NotaryError::invalid_argument(format!(
                "{field} must be a non-negative number"
            )));
        }
    }

    for (field, v) in [
        ("text_size", w.text_size),
        ("logo_max_width", w.logo_max_width),
        ("logo_width_fraction", w.logo_width_fraction),
    ] {
        if !v.is_finite() || v <= 0.0 {
            return Err(NotaryError::invalid_argument(format!(
                "{field} must be greater than zero"
            )));
        }
    }

    for (field, v) in [
        ("text_opacity", w.text_opacity),
        ("logo_opacity", w.logo_opacity),
    ] {
        if !(v > 0.0 && v <= 1.0) {
            return Err(NotaryError::invalid_argument(format!(
                "{field} must be in (0, 1]"
            )));
        }
    }

    if cfg.limits.max_input_bytes == 0 {
        return Err(NotaryError::invalid_argument(
            "max_input_bytes must be greater than zero",
        ));
    }

    Ok(())
}
