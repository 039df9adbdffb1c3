use super::job::Job;
use super::settings::Settings;

#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub settings: Settings,
}

impl MergedConfig {
    /// JobのOption値がSomeならJobの値を、NoneならSettingsの値を使用する。
    pub fn new(settings: &Settings, job: &Job) -> Self {
        let mut merged = settings.clone();
        merged.render_scale = job.render_scale.unwrap_or(settings.render_scale);
        merged.export_multiplier = job.export_multiplier.unwrap_or(settings.export_multiplier);
        merged.jpeg_quality = job.jpeg_quality.unwrap_or(settings.jpeg_quality);
        merged.settle_delay_ms = job.settle_delay_ms.unwrap_or(settings.settle_delay_ms);
        MergedConfig { settings: merged }
    }

    /// Validates the merged values; job overrides can break settings invariants.
    pub fn validate(&self) -> crate::error::Result<()> {
        self.settings.validate()
    }
}
