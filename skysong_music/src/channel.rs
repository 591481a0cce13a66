// The three note channels and the events they carry.
//
// `ChannelKind` is the static description of a channel: track name, MIDI
// channel, General MIDI program, the scale it plays from and how long its
// notes ring relative to one sample slot. `Channel` is the per-run
// accumulation of `NoteEvent`s for one kind, in sample order.
//
// | kind       | track name                | ch | program            | note length |
// |------------|---------------------------|----|--------------------|-------------|
// | Clarity    | Cloud Coverage (Inverted) | 0  | 0 (piano)          | 0.8 slot    |
// | Cyclical   | Solar Sine Wave           | 1  | 8 (celesta)        | 0.7 slot    |
// | SolarEvent | Sunrise/Sunset Events     | 2  | 14 (tubular bells) | 1.2 slot    |
//
// Event notes ring past the next slot; overlap within a channel is left
// as-is.

use crate::scale::{CLEAR_SKY, QuantizedNote, SOLAR_CYCLE, SOLAR_EVENTS, Scale};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Clarity = 0,
    Cyclical = 1,
    SolarEvent = 2,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 3] = [
        ChannelKind::Clarity,
        ChannelKind::Cyclical,
        ChannelKind::SolarEvent,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// MIDI channel number (0-15).
    pub fn midi_channel(self) -> u8 {
        self as u8
    }

    pub fn track_name(self) -> &'static str {
        match self {
            ChannelKind::Clarity => "Cloud Coverage (Inverted)",
            ChannelKind::Cyclical => "Solar Sine Wave",
            ChannelKind::SolarEvent => "Sunrise/Sunset Events",
        }
    }

    /// General MIDI program number.
    pub fn program(self) -> u8 {
        match self {
            ChannelKind::Clarity => 0,
            ChannelKind::Cyclical => 8,
            ChannelKind::SolarEvent => 14,
        }
    }

    pub fn scale(self) -> &'static Scale {
        match self {
            ChannelKind::Clarity => &CLEAR_SKY,
            ChannelKind::Cyclical => &SOLAR_CYCLE,
            ChannelKind::SolarEvent => &SOLAR_EVENTS,
        }
    }

    /// Note length as a fraction of the beat increment.
    pub fn note_fraction(self) -> f64 {
        match self {
            ChannelKind::Clarity => 0.8,
            ChannelKind::Cyclical => 0.7,
            ChannelKind::SolarEvent => 1.2,
        }
    }
}

/// One timed note. Beats are quarter notes from the start of the piece.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    pub channel_id: u8,
    pub pitch: u8,
    pub start_beat: f64,
    pub duration_beats: f64,
    pub velocity: u8,
}

impl NoteEvent {
    pub fn new(kind: ChannelKind, note: QuantizedNote, start_beat: f64, duration_beats: f64) -> Self {
        NoteEvent {
            channel_id: kind.midi_channel(),
            pitch: note.pitch,
            start_beat,
            duration_beats,
            velocity: note.velocity,
        }
    }

    pub fn end_beat(&self) -> f64 {
        self.start_beat + self.duration_beats
    }
}

/// A channel's notes plus the metadata its track is written with.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub kind: ChannelKind,
    pub tempo_bpm: u32,
    pub notes: Vec<NoteEvent>,
}

impl Channel {
    pub fn new(kind: ChannelKind, tempo_bpm: u32) -> Self {
        Channel {
            kind,
            tempo_bpm,
            notes: Vec::new(),
        }
    }

    pub fn with_capacity(kind: ChannelKind, tempo_bpm: u32, capacity: usize) -> Self {
        Channel {
            kind,
            tempo_bpm,
            notes: Vec::with_capacity(capacity),
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.track_name()
    }

    pub fn program(&self) -> u8 {
        self.kind.program()
    }

    pub fn push(&mut self, note: NoteEvent) {
        self.notes.push(note);
    }
}
