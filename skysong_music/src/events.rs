// Sunrise/sunset event encoding for the third channel.
//
// The event channel is the only sparse one: a sample produces a note only
// when it falls inside a sunrise or sunset window. Sunrise rings high and
// strong, sunset lower and softer. If both flags are set on one sample,
// sunrise wins.

use crate::scale::{QuantizedNote, Scale};

/// Velocity of sunrise notes.
pub const SUNRISE_VELOCITY: u8 = 100;
/// Velocity of sunset notes.
pub const SUNSET_VELOCITY: u8 = 80;
/// Scale index of sunset notes.
const SUNSET_INDEX: usize = 3;
/// Distance of the sunrise note below the top of the scale.
const SUNRISE_FROM_TOP: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolarEvent {
    Sunrise,
    Sunset,
}

impl SolarEvent {
    /// Classify a sample's flags; sunrise takes precedence.
    pub fn from_flags(is_sunrise: bool, is_sunset: bool) -> Option<SolarEvent> {
        if is_sunrise {
            Some(SolarEvent::Sunrise)
        } else if is_sunset {
            Some(SolarEvent::Sunset)
        } else {
            None
        }
    }

    /// Scale index this event plays: `len - 3` for sunrise, 3 for sunset.
    pub fn scale_index(self, scale: &Scale) -> usize {
        match self {
            SolarEvent::Sunrise => scale.len().saturating_sub(SUNRISE_FROM_TOP),
            SolarEvent::Sunset => SUNSET_INDEX,
        }
    }

    pub fn velocity(self) -> u8 {
        match self {
            SolarEvent::Sunrise => SUNRISE_VELOCITY,
            SolarEvent::Sunset => SUNSET_VELOCITY,
        }
    }
}

/// The note the event channel plays for a sample, if any.
pub fn encode_event(is_sunrise: bool, is_sunset: bool, scale: &Scale) -> Option<QuantizedNote> {
    SolarEvent::from_flags(is_sunrise, is_sunset).map(|event| QuantizedNote {
        pitch: scale.pitch(event.scale_index(scale)),
        velocity: event.velocity(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::SOLAR_EVENTS;

    #[test]
    fn test_no_flags_no_note() {
        assert_eq!(encode_event(false, false, &SOLAR_EVENTS), None);
    }

    #[test]
    fn test_sunrise_plays_len_minus_three() {
        let note = encode_event(true, false, &SOLAR_EVENTS).unwrap();
        assert_eq!(note.pitch, SOLAR_EVENTS.pitches[10]);
        assert_eq!(note.pitch, 56);
        assert_eq!(note.velocity, 100);
    }

    #[test]
    fn test_sunset_plays_index_three() {
        let note = encode_event(false, true, &SOLAR_EVENTS).unwrap();
        assert_eq!(note.pitch, 42);
        assert_eq!(note.velocity, 80);
    }

    #[test]
    fn test_sunrise_wins_when_both_set() {
        assert_eq!(
            encode_event(true, true, &SOLAR_EVENTS),
            encode_event(true, false, &SOLAR_EVENTS)
        );
        assert_eq!(SolarEvent::from_flags(true, true), Some(SolarEvent::Sunrise));
    }
}
