//! Pipeline configuration.

use crate::drawlist::{DrawlistLimits, DrawlistVersion};
use crate::render::Theme;

/// Configuration for a [`Pipeline`](super::Pipeline).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Encoded frames allowed to be outstanding with the backend.
    pub max_frames_in_flight: usize,
    /// Emit developer warnings.
    pub dev_mode: bool,
    /// Wire version to target.
    pub drawlist_version: DrawlistVersion,
    /// Drawlist size limits.
    pub limits: DrawlistLimits,
    /// Default styles.
    pub theme: Theme,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_frames_in_flight: 1,
            dev_mode: false,
            drawlist_version: DrawlistVersion::LATEST,
            limits: DrawlistLimits::default(),
            theme: Theme::default(),
        }
    }
}

impl PipelineConfig {
    /// Defaults with developer warnings enabled.
    pub fn dev() -> Self {
        Self {
            dev_mode: true,
            ..Self::default()
        }
    }

    /// Builder-style version override.
    #[must_use]
    pub fn with_version(mut self, version: DrawlistVersion) -> Self {
        self.drawlist_version = version;
        self
    }

    /// Builder-style in-flight cap override, at least one.
    #[must_use]
    pub fn with_max_frames_in_flight(mut self, max: usize) -> Self {
        self.max_frames_in_flight = max.max(1);
        self
    }
}
