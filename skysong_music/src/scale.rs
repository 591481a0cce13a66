// Fixed pitch palettes and the linear quantizer that maps signals onto them.
//
// Each channel plays from one immutable `Scale`: an ascending list of MIDI
// pitches plus the velocity window its loudness is mapped into.
//
// - CLEAR_SKY: C major pentatonic from C4, bright and open, for sky clarity.
// - SOLAR_CYCLE: C minor pentatonic from C3, for the day/night proxy.
// - SOLAR_EVENTS: C harmonic-minor-flavoured set from C2, for sunrise/sunset.
//
// `quantize` scales a bounded value linearly onto the scale index and the
// velocity window. The top of the value range lands exactly on the last
// entry.

/// Inclusive velocity window for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VelocityRange {
    pub min: u8,
    pub max: u8,
}

/// An ordered, fixed pitch set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scale {
    pub name: &'static str,
    /// MIDI pitches, ascending.
    pub pitches: &'static [u8],
    pub velocity: VelocityRange,
}

impl Scale {
    pub fn len(&self) -> usize {
        self.pitches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pitches.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.pitches.len().saturating_sub(1)
    }

    /// Pitch at `index`, clamped to the last entry.
    pub fn pitch(&self, index: usize) -> u8 {
        self.pitches[index.min(self.last_index())]
    }
}

/// C major pentatonic, C4 to E6 (13 notes).
pub const CLEAR_SKY: Scale = Scale {
    name: "major pentatonic",
    pitches: &[60, 62, 64, 67, 69, 72, 74, 76, 79, 81, 84, 86, 88],
    velocity: VelocityRange { min: 50, max: 100 },
};

/// C minor pentatonic, C3 to F5 (13 notes).
pub const SOLAR_CYCLE: Scale = Scale {
    name: "minor pentatonic",
    pitches: &[48, 51, 53, 55, 58, 60, 63, 65, 67, 70, 72, 75, 77],
    velocity: VelocityRange { min: 40, max: 80 },
};

/// Dramatic minor set, C2 to C4 (13 notes). Velocities are fixed per event
/// type; the window records the softest and loudest of them.
pub const SOLAR_EVENTS: Scale = Scale {
    name: "harmonic minor",
    pitches: &[36, 38, 39, 42, 44, 45, 48, 50, 51, 54, 56, 57, 60],
    velocity: VelocityRange { min: 80, max: 100 },
};

/// A pitch/velocity pair chosen for one sample on one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantizedNote {
    pub pitch: u8,
    pub velocity: u8,
}

/// Map `value` in `[0, value_max]` onto the scale.
///
/// Index is `floor(value / value_max * (len - 1))`, clamped; velocity is
/// `floor(min + value / value_max * (max - min))`. Values outside the range
/// (and NaN, or a non-positive `value_max`) are clamped to the nearest end.
pub fn quantize(value: f64, value_max: f64, scale: &Scale) -> QuantizedNote {
    let ratio = if value_max > 0.0 && !value.is_nan() {
        (value / value_max).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let index = (ratio * scale.last_index() as f64).floor() as usize;
    let span = scale.velocity.max.saturating_sub(scale.velocity.min) as f64;
    let velocity = (scale.velocity.min as f64 + ratio * span).floor() as u8;

    QuantizedNote {
        pitch: scale.pitch(index),
        velocity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scales_ascending_and_in_midi_range() {
        for scale in [CLEAR_SKY, SOLAR_CYCLE, SOLAR_EVENTS] {
            assert_eq!(scale.len(), 13, "{}", scale.name);
            assert!(scale.pitches.windows(2).all(|w| w[0] < w[1]), "{}", scale.name);
            assert!(scale.pitches.iter().all(|&p| p <= 127));
            assert!(scale.velocity.min <= scale.velocity.max);
        }
    }

    #[test]
    fn test_value_max_selects_last_entry() {
        for max in [1.0, 6.0, 100.0, 0.37] {
            let note = quantize(max, max, &CLEAR_SKY);
            assert_eq!(note.pitch, 88);
            assert_eq!(note.velocity, 100);
        }
        assert_eq!(quantize(6.0, 6.0, &SOLAR_CYCLE).pitch, 77);
    }

    #[test]
    fn test_zero_selects_first_entry() {
        let note = quantize(0.0, 100.0, &CLEAR_SKY);
        assert_eq!(note, QuantizedNote { pitch: 60, velocity: 50 });
        let note = quantize(0.0, 6.0, &SOLAR_CYCLE);
        assert_eq!(note, QuantizedNote { pitch: 48, velocity: 40 });
    }

    #[test]
    fn test_index_uses_floor() {
        // 50% of 12 steps = index 6.
        assert_eq!(quantize(50.0, 100.0, &CLEAR_SKY).pitch, 74);
        // 3/6 of 12 steps = index 6; 2.9/6 * 12 = 5.8 -> 5.
        assert_eq!(quantize(3.0, 6.0, &SOLAR_CYCLE).pitch, 63);
        assert_eq!(quantize(2.9, 6.0, &SOLAR_CYCLE).pitch, 60);
    }

    #[test]
    fn test_velocity_affine_map() {
        assert_eq!(quantize(75.0, 100.0, &CLEAR_SKY).velocity, 87);
        assert_eq!(quantize(3.0, 6.0, &SOLAR_CYCLE).velocity, 60);
    }

    #[test]
    fn test_out_of_range_values_clamp() {
        assert_eq!(quantize(150.0, 100.0, &CLEAR_SKY).pitch, 88);
        assert_eq!(quantize(-5.0, 100.0, &CLEAR_SKY).pitch, 60);
        assert_eq!(quantize(f64::NAN, 100.0, &CLEAR_SKY).pitch, 60);
        assert_eq!(quantize(5.0, 0.0, &CLEAR_SKY).pitch, 60);
    }
}
