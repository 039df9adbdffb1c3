use std::path::Path;

use serde::Deserialize;

use crate::canvas::click::DOUBLE_CLICK_WINDOW;
use crate::render::DEFAULT_RENDER_SCALE;

/// 配置直後のマークの既定位置と倍率。
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct MarkDefaults {
    pub left: f32,
    pub top: f32,
    pub scale: f32,
}

impl MarkDefaults {
    pub const SIGNATURE: MarkDefaults = MarkDefaults {
        left: 100.0,
        top: 100.0,
        scale: 0.4,
    };

    pub const INITIAL: MarkDefaults = MarkDefaults {
        left: 100.0,
        top: 200.0,
        scale: 0.6,
    };
}

impl Default for MarkDefaults {
    fn default() -> Self {
        Self::SIGNATURE
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub render_scale: f32,
    pub export_multiplier: f32,
    pub jpeg_quality: u8,
    pub settle_delay_ms: u64,
    pub double_click_ms: u64,
    pub pdf_width_mm: f32,
    pub preview_max_width: u32,
    pub preview_max_height: u32,
    pub surface_width: u32,
    pub surface_height: u32,
    pub stroke_width: f32,
    pub stroke_color: String,
    pub mark_multiplier: f32,
    pub page_cache_capacity: usize,
    pub signature: MarkDefaults,
    pub initial: MarkDefaults,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            render_scale: DEFAULT_RENDER_SCALE,
            export_multiplier: 2.0,
            jpeg_quality: 90,
            settle_delay_ms: 500,
            double_click_ms: DOUBLE_CLICK_WINDOW.as_millis() as u64,
            pdf_width_mm: 210.0,
            preview_max_width: 800,
            preview_max_height: 600,
            surface_width: 500,
            surface_height: 200,
            stroke_width: 2.0,
            stroke_color: "#000000".to_string(),
            mark_multiplier: 2.0,
            page_cache_capacity: 8,
            signature: MarkDefaults::SIGNATURE,
            initial: MarkDefaults::INITIAL,
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        let settings: Settings = serde_yml::from_str(yaml).map_err(|e| {
            crate::error::DocSignError::config(format!("Failed to parse settings YAML: {e}"))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// 値の範囲を検証する。
    pub fn validate(&self) -> crate::error::Result<()> {
        if !self.render_scale.is_finite() || self.render_scale < 1.0 {
            return Err(crate::error::DocSignError::config(format!(
                "render_scale must be >= 1, got {}",
                self.render_scale
            )));
        }
        if !self.export_multiplier.is_finite() || self.export_multiplier <= 0.0 {
            return Err(crate::error::DocSignError::config(format!(
                "export_multiplier must be > 0, got {}",
                self.export_multiplier
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(crate::error::DocSignError::config(format!(
                "jpeg_quality must be 1-100, got {}",
                self.jpeg_quality
            )));
        }
        if !self.pdf_width_mm.is_finite() || self.pdf_width_mm <= 0.0 {
            return Err(crate::error::DocSignError::config(format!(
                "pdf_width_mm must be > 0, got {}",
                self.pdf_width_mm
            )));
        }
        if !self.mark_multiplier.is_finite() || self.mark_multiplier <= 0.0 {
            return Err(crate::error::DocSignError::config(format!(
                "mark_multiplier must be > 0, got {}",
                self.mark_multiplier
            )));
        }
        if !self.stroke_width.is_finite() || self.stroke_width <= 0.0 {
            return Err(crate::error::DocSignError::config(format!(
                "stroke_width must be > 0, got {}",
                self.stroke_width
            )));
        }
        if self.surface_width == 0 || self.surface_height == 0 {
            return Err(crate::error::DocSignError::config(
                "drawing surface dimensions must be non-zero",
            ));
        }
        Ok(())
    }
}
