// MIDI output from the three note channels.
//
// Converts the channels into a Standard MIDI File (SMF) for playback. Each
// channel maps to its own track, and every track is self-describing: it
// opens at tick 0 with its name, the run's tempo and its program change,
// then carries its note-on/note-off pairs and an end-of-track marker.
// Output is SMF Format 1 (multi-track) with exactly one track per channel.
//
// Beats are quarter notes and convert to ticks by rounding at 480 ticks per
// quarter. Every note lasts at least one tick. Events sharing a tick are
// ordered note-offs first, then note-ons, then by sample order, so the
// byte stream depends only on the notes.
//
// The whole file is rendered in memory before anything touches the disk,
// and `write_midi` writes through a sibling temp file and a rename. A failed
// run leaves no partial file behind.
//
// Uses the `midly` crate for MIDI writing.

use crate::channel::{Channel, NoteEvent};
use crate::error::{Result, SonifyError};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::path::{Path, PathBuf};
use tracing::info;

/// Ticks per quarter note in MIDI output.
pub const TICKS_PER_QUARTER: u16 = 480;

/// Largest delta time a track event can carry.
const MAX_DELTA_TICKS: u32 = (1 << 28) - 1;

/// Largest value a tempo meta event can carry.
const MAX_TEMPO_MICROSECONDS: u32 = (1 << 24) - 1;

/// Serialize the channels and write them to `path`.
pub fn write_midi(channels: &[Channel; 3], path: &Path) -> Result<()> {
    let bytes = serialize(channels)?;
    let partial = partial_path(path);

    if let Err(e) = std::fs::write(&partial, &bytes) {
        let _ = std::fs::remove_file(&partial);
        return Err(SonifyError::SerializationFailure(format!(
            "writing {}: {e}",
            partial.display()
        )));
    }
    if let Err(e) = std::fs::rename(&partial, path) {
        let _ = std::fs::remove_file(&partial);
        return Err(SonifyError::SerializationFailure(format!(
            "moving output into place at {}: {e}",
            path.display()
        )));
    }

    info!(path = %path.display(), bytes = bytes.len(), "wrote MIDI file");
    Ok(())
}

/// Render the channels to SMF bytes. Identical channels give identical bytes.
pub fn serialize(channels: &[Channel; 3]) -> Result<Vec<u8>> {
    let smf = channels_to_smf(channels)?;
    let mut buf = Vec::new();
    smf.write(&mut buf)
        .map_err(|e| SonifyError::SerializationFailure(e.to_string()))?;
    Ok(buf)
}

/// Convert channels to an in-memory SMF, one track per channel.
pub fn channels_to_smf(channels: &[Channel]) -> Result<Smf<'static>> {
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));
    for channel in channels {
        smf.tracks.push(channel_track(channel)?);
    }
    Ok(smf)
}

/// Convert a beat position to ticks, rounding to the nearest tick.
/// Negative and NaN positions map to 0.
pub fn beats_to_ticks(beats: f64) -> u32 {
    (beats * TICKS_PER_QUARTER as f64).round() as u32
}

/// A note-on or note-off waiting to be placed on the track.
struct TimedMessage {
    tick: u32,
    /// Note-offs (0) sort before note-ons (1) on the same tick.
    order: u8,
    seq: usize,
    message: MidiMessage,
}

fn channel_track(channel: &Channel) -> Result<Track<'static>> {
    let midi_channel = u4::new(channel.kind.midi_channel());
    let mut track: Track<'static> = Vec::with_capacity(channel.notes.len() * 2 + 4);

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(channel.name().as_bytes())),
    });
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_microseconds(
            channel.tempo_bpm,
        )?))),
    });
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Midi {
            channel: midi_channel,
            message: MidiMessage::ProgramChange {
                program: u7::new(channel.program()),
            },
        },
    });

    let mut timed: Vec<TimedMessage> = Vec::with_capacity(channel.notes.len() * 2);
    for (seq, note) in channel.notes.iter().enumerate() {
        let (on, off) = note_messages(note, seq);
        timed.push(on);
        timed.push(off);
    }
    timed.sort_by_key(|m| (m.tick, m.order, m.seq));

    let mut last_tick: u32 = 0;
    for m in timed {
        let delta = m.tick - last_tick;
        if delta > MAX_DELTA_TICKS {
            return Err(SonifyError::SerializationFailure(format!(
                "track {:?}: gap of {delta} ticks exceeds the MIDI delta-time limit",
                channel.name()
            )));
        }
        track.push(TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Midi {
                channel: midi_channel,
                message: m.message,
            },
        });
        last_tick = m.tick;
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    Ok(track)
}

fn note_messages(note: &NoteEvent, seq: usize) -> (TimedMessage, TimedMessage) {
    let key = u7::new(note.pitch.min(127));
    let start = beats_to_ticks(note.start_beat);
    let length = beats_to_ticks(note.duration_beats).max(1);
    let on = TimedMessage {
        tick: start,
        order: 1,
        seq,
        message: MidiMessage::NoteOn {
            key,
            vel: u7::new(note.velocity.min(127)),
        },
    };
    let off = TimedMessage {
        tick: start.saturating_add(length),
        order: 0,
        seq,
        message: MidiMessage::NoteOff {
            key,
            vel: u7::new(0),
        },
    };
    (on, off)
}

fn tempo_microseconds(bpm: u32) -> Result<u32> {
    if bpm == 0 {
        return Err(SonifyError::SerializationFailure(
            "tempo of 0 BPM cannot be encoded".to_string(),
        ));
    }
    let micros = 60_000_000 / bpm;
    if micros > MAX_TEMPO_MICROSECONDS {
        return Err(SonifyError::SerializationFailure(format!(
            "tempo of {bpm} BPM is too slow to encode"
        )));
    }
    Ok(micros)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelKind;
    use crate::scale::QuantizedNote;

    fn note(kind: ChannelKind, pitch: u8, start: f64, length: f64) -> NoteEvent {
        NoteEvent::new(kind, QuantizedNote { pitch, velocity: 90 }, start, length)
    }

    fn sample_channels() -> [Channel; 3] {
        let mut clarity = Channel::new(ChannelKind::Clarity, 120);
        let mut cyclical = Channel::new(ChannelKind::Cyclical, 120);
        let mut events = Channel::new(ChannelKind::SolarEvent, 120);
        for i in 0..4 {
            let start = i as f64;
            clarity.push(note(ChannelKind::Clarity, 60 + i as u8, start, 0.8));
            cyclical.push(note(ChannelKind::Cyclical, 48 + i as u8, start, 0.7));
        }
        events.push(note(ChannelKind::SolarEvent, 56, 1.0, 1.2));
        [clarity, cyclical, events]
    }

    /// Decode a track into (absolute tick, message) pairs for MIDI events.
    fn midi_events(track: &[TrackEvent<'_>]) -> Vec<(u32, MidiMessage)> {
        let mut tick = 0;
        let mut out = Vec::new();
        for ev in track {
            tick += ev.delta.as_int();
            if let TrackEventKind::Midi { message, .. } = ev.kind {
                out.push((tick, message));
            }
        }
        out
    }

    #[test]
    fn test_three_tracks_with_metadata() {
        let bytes = serialize(&sample_channels()).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(smf.header.format, Format::Parallel);
        assert_eq!(
            smf.header.timing,
            Timing::Metrical(u15::new(TICKS_PER_QUARTER))
        );
        assert_eq!(smf.tracks.len(), 3);

        let expected = [
            ("Cloud Coverage (Inverted)", 0u8, 0u8),
            ("Solar Sine Wave", 1, 8),
            ("Sunrise/Sunset Events", 2, 14),
        ];
        for (track, (name, channel, program)) in smf.tracks.iter().zip(expected) {
            assert_eq!(track[0].delta.as_int(), 0);
            assert_eq!(
                track[0].kind,
                TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes()))
            );
            assert_eq!(
                track[1].kind,
                TrackEventKind::Meta(MetaMessage::Tempo(u24::new(500_000)))
            );
            assert_eq!(
                track[2].kind,
                TrackEventKind::Midi {
                    channel: u4::new(channel),
                    message: MidiMessage::ProgramChange {
                        program: u7::new(program)
                    },
                }
            );
            assert_eq!(
                track.last().unwrap().kind,
                TrackEventKind::Meta(MetaMessage::EndOfTrack)
            );
        }
    }

    #[test]
    fn test_note_timing_in_ticks() {
        let smf = channels_to_smf(&sample_channels()).unwrap();
        let events = midi_events(&smf.tracks[0]);
        // Program change plus 4 on/off pairs.
        assert_eq!(events.len(), 9);
        assert_eq!(
            events[1],
            (
                0,
                MidiMessage::NoteOn {
                    key: u7::new(60),
                    vel: u7::new(90)
                }
            )
        );
        // 0.8 beats = 384 ticks.
        assert_eq!(
            events[2],
            (
                384,
                MidiMessage::NoteOff {
                    key: u7::new(60),
                    vel: u7::new(0)
                }
            )
        );
        assert_eq!(events[3].0, 480);
    }

    #[test]
    fn test_overlapping_notes_off_before_on() {
        let mut channel = Channel::new(ChannelKind::SolarEvent, 120);
        // First note ends exactly where the second starts.
        channel.push(note(ChannelKind::SolarEvent, 56, 0.0, 1.0));
        channel.push(note(ChannelKind::SolarEvent, 56, 1.0, 1.0));
        let track = channel_track(&channel).unwrap();
        let events = midi_events(&track);
        assert!(matches!(events[2], (480, MidiMessage::NoteOff { .. })));
        assert!(matches!(events[3], (480, MidiMessage::NoteOn { .. })));
    }

    #[test]
    fn test_event_notes_may_overlap_next_slot() {
        let mut channel = Channel::new(ChannelKind::SolarEvent, 120);
        channel.push(note(ChannelKind::SolarEvent, 56, 0.0, 1.2));
        channel.push(note(ChannelKind::SolarEvent, 42, 1.0, 1.2));
        let events = midi_events(&channel_track(&channel).unwrap());
        let ticks: Vec<u32> = events[1..].iter().map(|(t, _)| *t).collect();
        assert_eq!(ticks, vec![0, 480, 576, 1056]);
    }

    #[test]
    fn test_zero_length_note_lasts_one_tick() {
        let mut channel = Channel::new(ChannelKind::Clarity, 120);
        channel.push(note(ChannelKind::Clarity, 60, 0.0, 0.0));
        let events = midi_events(&channel_track(&channel).unwrap());
        assert_eq!(events[2].0, 1);
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let channels = sample_channels();
        assert_eq!(serialize(&channels).unwrap(), serialize(&channels).unwrap());
    }

    #[test]
    fn test_delta_overflow_is_serialization_failure() {
        let mut channel = Channel::new(ChannelKind::Clarity, 120);
        channel.push(note(ChannelKind::Clarity, 60, 1.0e9, 0.5));
        assert!(matches!(
            channel_track(&channel),
            Err(SonifyError::SerializationFailure(_))
        ));
    }

    #[test]
    fn test_tempo_encoding() {
        assert_eq!(tempo_microseconds(120).unwrap(), 500_000);
        assert_eq!(tempo_microseconds(60).unwrap(), 1_000_000);
        assert!(tempo_microseconds(0).is_err());
        assert!(tempo_microseconds(3).is_err());
    }

    #[test]
    fn test_beats_to_ticks_rounds() {
        assert_eq!(beats_to_ticks(0.0), 0);
        assert_eq!(beats_to_ticks(1.0), 480);
        assert_eq!(beats_to_ticks(0.7), 336);
        assert_eq!(beats_to_ticks(-2.0), 0);
        assert_eq!(beats_to_ticks(f64::NAN), 0);
    }

    #[test]
    fn test_partial_path_is_sibling() {
        let p = partial_path(Path::new("/tmp/out/song.mid"));
        assert_eq!(p, PathBuf::from("/tmp/out/song.mid.part"));
    }
}
