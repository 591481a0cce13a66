// Run configuration for a sonification pass.
//
// `SonifyConfig` carries every tunable the pipeline reads: tempo, target
// duration (explicit or auto-derived from note density), the sunrise/sunset
// tolerance window, the ephemeris model switch, the cyclical proxy range,
// and the observer's longitude. It deserializes from TOML with per-field
// defaults, so a config file only needs the keys it changes. The binary
// layers CLI flags over whatever the file provides.
//
// `validate()` is the single gate for parameter bounds. The pipeline calls
// it before touching any sample, so a bad value never produces output.
//
// See also: `pipeline.rs` which consumes the validated config,
// `ephemeris.rs` for how `longitude`/`timezone_meridian` feed the
// solar-noon offset.

use crate::error::{Result, SonifyError};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MIN_BPM: u32 = 60;
pub const MAX_BPM: u32 = 240;
pub const MIN_DURATION_SECONDS: u32 = 60;
pub const MAX_DURATION_SECONDS: u32 = 600;

/// Header names of the four required input columns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub cloud_cover: String,
    pub solar_proxy: String,
    pub sunrise: String,
    pub sunset: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        ColumnNames {
            cloud_cover: "cloud_cover_low (%)".to_string(),
            solar_proxy: "solar_sine".to_string(),
            sunrise: "sunrise_event".to_string(),
            sunset: "sunset_event".to_string(),
        }
    }
}

impl ColumnNames {
    /// All four names in pipeline order.
    pub fn required(&self) -> [&str; 4] {
        [
            self.cloud_cover.as_str(),
            self.solar_proxy.as_str(),
            self.sunrise.as_str(),
            self.sunset.as_str(),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SonifyConfig {
    /// Tempo in quarter-note beats per minute (60-240).
    pub bpm: u32,
    /// Target length of the piece. Ignored when `auto_duration` is set.
    pub duration_seconds: u32,
    /// Derive the duration from the sample count to hold note density steady.
    pub auto_duration: bool,
    /// Half-width of the window around sunrise/sunset that counts as an event.
    pub tolerance_minutes: u32,
    /// Use the seasonal equation-of-time model for solar noon instead of the
    /// measured midpoint or the fixed 12:00 fallback.
    pub use_realistic_timing: bool,
    /// Upper bound of the cyclical solar proxy.
    pub sine_range: f64,
    /// Observer longitude in degrees (east positive).
    pub longitude: f64,
    /// Longitude of the local time zone's reference meridian.
    pub timezone_meridian: f64,
    pub columns: ColumnNames,
}

impl Default for SonifyConfig {
    fn default() -> Self {
        SonifyConfig {
            bpm: 120,
            duration_seconds: 300,
            auto_duration: false,
            tolerance_minutes: 30,
            use_realistic_timing: true,
            sine_range: 6.0,
            longitude: -122.02,
            timezone_meridian: -120.0,
            columns: ColumnNames::default(),
        }
    }
}

impl SonifyConfig {
    /// Parse a config from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check every parameter against its documented bounds.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_BPM..=MAX_BPM).contains(&self.bpm) {
            return Err(SonifyError::InvalidParameter(format!(
                "bpm must be between {MIN_BPM} and {MAX_BPM}, got {}",
                self.bpm
            )));
        }
        if !self.auto_duration
            && !(MIN_DURATION_SECONDS..=MAX_DURATION_SECONDS).contains(&self.duration_seconds)
        {
            return Err(SonifyError::InvalidParameter(format!(
                "duration must be between {MIN_DURATION_SECONDS} and {MAX_DURATION_SECONDS} seconds, got {}",
                self.duration_seconds
            )));
        }
        if !self.sine_range.is_finite() || self.sine_range < 1.0 {
            return Err(SonifyError::InvalidParameter(format!(
                "sine range must be 1 or greater, got {}",
                self.sine_range
            )));
        }
        for (name, degrees) in [
            ("longitude", self.longitude),
            ("timezone meridian", self.timezone_meridian),
        ] {
            if !degrees.is_finite() || !(-180.0..=180.0).contains(&degrees) {
                return Err(SonifyError::InvalidParameter(format!(
                    "{name} must be within [-180, 180] degrees, got {degrees}"
                )));
            }
        }
        Ok(())
    }
}
