// Beat-grid timing: maps an arbitrary number of samples onto a fixed-BPM
// piece of a chosen length.
//
// Every sample gets one slot on an evenly spaced beat grid. The slot width
// (`beat_increment`) is the piece's total beats divided by the sample
// count, so a longer series plays faster, not longer. In auto-duration mode
// the length is instead derived from the sample count so that the three
// channels together sound about four notes per second.
//
// Beats here are quarter notes, matching the tempo's BPM. `midi.rs`
// converts them to ticks.

use crate::config::SonifyConfig;

/// Notes per second the auto-duration mode aims for across all channels.
pub const TARGET_NOTES_PER_SECOND: u32 = 4;

/// Number of channels that contribute to density.
pub const CHANNEL_COUNT: u32 = 3;

/// Beats each sample advances: `(duration * bpm / 60) / sample_count`.
/// Zero samples give a zero increment.
pub fn beat_increment(bpm: u32, duration_seconds: u64, sample_count: usize) -> f64 {
    if sample_count == 0 {
        return 0.0;
    }
    total_beats(bpm, duration_seconds) / sample_count as f64
}

/// Total beats in a piece of the given length.
pub fn total_beats(bpm: u32, duration_seconds: u64) -> f64 {
    let beats_per_second = bpm as f64 / 60.0;
    duration_seconds as f64 * beats_per_second
}

/// Piece length that keeps `target_notes_per_second` across `channel_count`
/// channels: `floor(sample_count * channel_count / target_notes_per_second)`.
pub fn auto_duration(sample_count: usize, channel_count: u32, target_notes_per_second: u32) -> u64 {
    if target_notes_per_second == 0 {
        return 0;
    }
    sample_count as u64 * channel_count as u64 / target_notes_per_second as u64
}

/// The resolved beat grid for one conversion run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingModel {
    pub bpm: u32,
    pub duration_seconds: u64,
    pub sample_count: usize,
    pub beat_increment: f64,
}

impl TimingModel {
    pub fn new(bpm: u32, duration_seconds: u64, sample_count: usize) -> Self {
        TimingModel {
            bpm,
            duration_seconds,
            sample_count,
            beat_increment: beat_increment(bpm, duration_seconds, sample_count),
        }
    }

    /// Resolve the duration (explicit or auto) and build the grid.
    pub fn from_config(config: &SonifyConfig, sample_count: usize) -> Self {
        let duration_seconds = if config.auto_duration {
            auto_duration(sample_count, CHANNEL_COUNT, TARGET_NOTES_PER_SECOND)
        } else {
            config.duration_seconds as u64
        };
        TimingModel::new(config.bpm, duration_seconds, sample_count)
    }

    pub fn total_beats(&self) -> f64 {
        total_beats(self.bpm, self.duration_seconds)
    }

    /// Start beat of the sample at `index`. Exactly 0 for index 0.
    pub fn start_beat(&self, index: usize) -> f64 {
        index as f64 * self.beat_increment
    }

    /// A note length as a fraction of one sample slot.
    pub fn note_length(&self, fraction: f64) -> f64 {
        self.beat_increment * fraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ten_samples_five_seconds() {
        let timing = TimingModel::new(120, 5, 10);
        assert_eq!(timing.beat_increment, 1.0);
        assert_eq!(timing.start_beat(0), 0.0);
        assert_eq!(timing.start_beat(9), 9.0);
        assert_eq!(timing.total_beats(), 10.0);
    }

    #[test]
    fn test_increment_times_count_is_total() {
        for (bpm, duration, n) in [(60, 60, 7), (97, 313, 1441), (240, 600, 3), (120, 300, 8760)] {
            let inc = beat_increment(bpm, duration, n);
            let total = total_beats(bpm, duration);
            assert!((inc * n as f64 - total).abs() < 1e-9 * total.max(1.0));
        }
    }

    #[test]
    fn test_start_beats_monotonic() {
        let timing = TimingModel::new(133, 271, 999);
        let mut previous = timing.start_beat(0);
        assert_eq!(previous, 0.0);
        for i in 1..999 {
            let beat = timing.start_beat(i);
            assert!(beat >= previous);
            previous = beat;
        }
    }

    #[test]
    fn test_auto_duration_is_three_quarters_of_count() {
        for n in [0usize, 1, 2, 3, 4, 5, 100, 101, 8759] {
            assert_eq!(auto_duration(n, 3, 4), (3 * n / 4) as u64);
        }
    }

    #[test]
    fn test_from_config_resolves_auto_duration() {
        let config = SonifyConfig {
            auto_duration: true,
            duration_seconds: 60,
            bpm: 120,
            ..Default::default()
        };
        let timing = TimingModel::from_config(&config, 400);
        assert_eq!(timing.duration_seconds, 300);
        // 300 s at 2 beats/s over 400 samples.
        assert_eq!(timing.beat_increment, 1.5);

        let config = SonifyConfig {
            auto_duration: false,
            ..config
        };
        assert_eq!(TimingModel::from_config(&config, 400).duration_seconds, 60);
    }

    #[test]
    fn test_zero_samples() {
        assert_eq!(beat_increment(120, 300, 0), 0.0);
        assert_eq!(auto_duration(10, 3, 0), 0);
    }

    #[test]
    fn test_note_length_fraction() {
        let timing = TimingModel::new(120, 5, 10);
        assert_eq!(timing.note_length(0.8), 0.8);
        assert_eq!(timing.note_length(1.2), 1.2);
    }
}
