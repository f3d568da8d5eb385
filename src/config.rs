use crate::foundation::core::Extent;
use crate::foundation::error::{AfterimageError, AfterimageResult};
use crate::frame::mode::AaMode;
use crate::render::backend::PixelFormat;

/// Temporal antialiasing parameters.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaaConfig {
    /// Jitter samples before the sequence repeats; also the bootstrap length.
    pub jitter_period: usize,
    /// Pixels spanned by a jitter sample of magnitude 1.
    pub jitter_scale_px: f32,
    /// `k` in the contrast-adaptive blend weight.
    pub contrast_weight: f32,
    /// `s` in the motion encoding `(s·d + 2) / 4`.
    pub motion_scale: f32,
    /// Storage of the read, write and history targets.
    pub history_format: PixelFormat,
    /// Storage of the motion target.
    pub motion_format: PixelFormat,
}

impl Default for TaaConfig {
    fn default() -> Self {
        Self {
            jitter_period: 16,
            jitter_scale_px: 0.5,
            contrast_weight: 0.1,
            motion_scale: 1.0,
            history_format: PixelFormat::Rgba16Float,
            motion_format: PixelFormat::Rgba32Float,
        }
    }
}

impl TaaConfig {
    /// Reject values the compositor cannot run with.
    pub fn validate(&self) -> AfterimageResult<()> {
        if self.jitter_period < 2 {
            return Err(AfterimageError::config("taa.jitter_period must be >= 2"));
        }
        if !(self.jitter_scale_px.is_finite() && self.jitter_scale_px >= 0.0) {
            return Err(AfterimageError::config(
                "taa.jitter_scale_px must be finite and >= 0",
            ));
        }
        if !(self.contrast_weight.is_finite() && self.contrast_weight >= 0.0) {
            return Err(AfterimageError::config(
                "taa.contrast_weight must be finite and >= 0",
            ));
        }
        if !(self.motion_scale.is_finite() && self.motion_scale > 0.0) {
            return Err(AfterimageError::config(
                "taa.motion_scale must be finite and > 0",
            ));
        }
        if !self.motion_format.is_float() {
            return Err(AfterimageError::config(
                "taa.motion_format must be a float format",
            ));
        }
        Ok(())
    }
}

/// Top-level pipeline configuration, loadable from JSON.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Initial antialiasing mode.
    pub mode: AaMode,
    /// Display samples while in MSAA mode.
    pub msaa_samples: u32,
    /// Jittered renders averaged per frame while supersampling.
    pub supersample_count: usize,
    /// Temporal antialiasing parameters.
    pub taa: TaaConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            mode: AaMode::Temporal,
            msaa_samples: 4,
            supersample_count: 8,
            taa: TaaConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(src: &str) -> AfterimageResult<Self> {
        let cfg: Self = serde_json::from_str(src)
            .map_err(|e| AfterimageError::config(format!("invalid pipeline config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Output extent.
    pub fn extent(&self) -> AfterimageResult<Extent> {
        Extent::new(self.width, self.height)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> AfterimageResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(AfterimageError::config("width/height must be > 0"));
        }
        if !matches!(self.msaa_samples, 1 | 2 | 4 | 8) {
            return Err(AfterimageError::config(format!(
                "msaa_samples must be one of 1, 2, 4, 8 (got {})",
                self.msaa_samples
            )));
        }
        if self.supersample_count == 0 {
            return Err(AfterimageError::config("supersample_count must be >= 1"));
        }
        self.taa.validate()
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
