// Summary statistics for one conversion run.
//
// Collected while the pipeline folds over the samples, then logged by the
// pipeline and optionally written as JSON by the binary.

use crate::channel::Channel;
use crate::error::Result;
use crate::timing::TimingModel;
use serde::Serialize;

/// Observed `[min, max]` of a signal, ignoring missing values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RangeTracker {
    range: Option<ValueRange>,
}

impl RangeTracker {
    pub(crate) fn observe(&mut self, value: Option<f64>) {
        let Some(v) = value.filter(|v| !v.is_nan()) else {
            return;
        };
        self.range = Some(match self.range {
            Some(r) => ValueRange {
                min: r.min.min(v),
                max: r.max.max(v),
            },
            None => ValueRange { min: v, max: v },
        });
    }

    pub(crate) fn finish(&self) -> Option<ValueRange> {
        self.range
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSummary {
    pub name: String,
    pub program: u8,
    pub scale: String,
    pub notes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionReport {
    pub samples: usize,
    pub bpm: u32,
    pub duration_seconds: u64,
    pub auto_duration: bool,
    pub total_beats: f64,
    pub beat_increment: f64,
    pub sunrise_events: usize,
    pub sunset_events: usize,
    /// Raw cloud cover as read, before inversion.
    pub cloud_cover_range: Option<ValueRange>,
    /// Solar proxy after fill and clipping.
    pub solar_proxy_range: Option<ValueRange>,
    pub channels: Vec<ChannelSummary>,
}

impl ConversionReport {
    pub(crate) fn new(
        timing: &TimingModel,
        auto_duration: bool,
        channels: &[Channel],
        events: (usize, usize),
        cloud: &RangeTracker,
        proxy: &RangeTracker,
    ) -> Self {
        ConversionReport {
            samples: timing.sample_count,
            bpm: timing.bpm,
            duration_seconds: timing.duration_seconds,
            auto_duration,
            total_beats: timing.total_beats(),
            beat_increment: timing.beat_increment,
            sunrise_events: events.0,
            sunset_events: events.1,
            cloud_cover_range: cloud.finish(),
            solar_proxy_range: proxy.finish(),
            channels: channels
                .iter()
                .map(|c| ChannelSummary {
                    name: c.name().to_string(),
                    program: c.program(),
                    scale: c.kind.scale().name.to_string(),
                    notes: c.notes.len(),
                })
                .collect(),
        }
    }

    /// Notes per second of playback across all channels.
    pub fn notes_per_second(&self) -> Option<f64> {
        if self.duration_seconds == 0 {
            return None;
        }
        let notes: usize = self.channels.iter().map(|c| c.notes).sum();
        Some(notes as f64 / self.duration_seconds as f64)
    }

    /// Pretty JSON rendering.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_tracker_skips_missing() {
        let mut tracker = RangeTracker::default();
        assert_eq!(tracker.finish(), None);
        for v in [Some(40.0), None, Some(f64::NAN), Some(5.0), Some(90.0)] {
            tracker.observe(v);
        }
        assert_eq!(tracker.finish(), Some(ValueRange { min: 5.0, max: 90.0 }));
    }

    #[test]
    fn test_report_json_fields() {
        let timing = TimingModel::new(120, 5, 10);
        let report = ConversionReport::new(
            &timing,
            false,
            &[],
            (2, 1),
            &RangeTracker::default(),
            &RangeTracker::default(),
        );
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["samples"], 10);
        assert_eq!(json["beat_increment"], 1.0);
        assert_eq!(json["sunrise_events"], 2);
        assert!(json["cloud_cover_range"].is_null());
        assert_eq!(report.notes_per_second(), Some(0.0));
    }
}
