// The conversion pipeline: sample table in, three note channels out.
//
// Stages, in order:
// 1. Validate the config and the table's columns. Nothing below runs if
//    either fails.
// 2. Resolve the beat grid (`timing.rs`) from the sample count.
// 3. Fold over the samples once. Each sample is normalized and becomes one
//    `NoteFrame`: a clarity note, a cyclical note, and an event note only
//    when the sample sits on a sunrise or sunset.
// 4. Hand the filled channels to `midi.rs`. When a JSON report is
//    requested it is written first, and removed again if the MIDI write
//    fails.
//
// `frames` is a lazy iterator, so callers that stream frames elsewhere
// never hold the channels; `render` collects them because the container
// needs each whole track before it can be written. Frame order is sample
// order, which is playback order.
//
// Solar proxy values and event flags are read from the table. Tables that
// lack them can be filled first with `ephemeris::annotate`.

use crate::channel::{Channel, ChannelKind, NoteEvent};
use crate::config::SonifyConfig;
use crate::error::{Result, SonifyError};
use crate::events::encode_event;
use crate::midi;
use crate::normalize::{PERCENT_MAX, normalize_cloud, normalize_flag, normalize_proxy};
use crate::report::{ConversionReport, RangeTracker};
use crate::sample::{Sample, SampleTable};
use crate::scale::quantize;
use crate::timing::TimingModel;
use std::path::Path;
use tracing::{debug, info, warn};

/// The notes one sample contributes to each channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteFrame {
    pub clarity: NoteEvent,
    pub cyclical: NoteEvent,
    pub event: Option<NoteEvent>,
}

/// Everything a conversion produced before serialization.
#[derive(Debug, Clone)]
pub struct Rendering {
    pub channels: [Channel; 3],
    pub timing: TimingModel,
    pub report: ConversionReport,
}

/// Encode one sample at grid position `index`.
pub fn encode_frame(index: usize, sample: &Sample, config: &SonifyConfig, timing: &TimingModel) -> NoteFrame {
    let start = timing.start_beat(index);
    let note = |kind: ChannelKind, value: f64, value_max: f64| {
        NoteEvent::new(
            kind,
            quantize(value, value_max, kind.scale()),
            start,
            timing.note_length(kind.note_fraction()),
        )
    };

    let clarity = normalize_cloud(sample.cloud_cover_pct);
    let proxy = normalize_proxy(sample.solar_proxy, config.sine_range / 2.0, config.sine_range);

    let event_kind = ChannelKind::SolarEvent;
    let event = encode_event(
        normalize_flag(sample.sunrise_flag),
        normalize_flag(sample.sunset_flag),
        event_kind.scale(),
    )
    .map(|q| {
        NoteEvent::new(
            event_kind,
            q,
            start,
            timing.note_length(event_kind.note_fraction()),
        )
    });

    NoteFrame {
        clarity: note(ChannelKind::Clarity, clarity, PERCENT_MAX),
        cyclical: note(ChannelKind::Cyclical, proxy, config.sine_range),
        event,
    }
}

/// Lazily encode every sample in order.
pub fn frames<'a>(
    samples: &'a [Sample],
    config: &'a SonifyConfig,
    timing: TimingModel,
) -> impl Iterator<Item = NoteFrame> + 'a {
    samples
        .iter()
        .enumerate()
        .map(move |(i, sample)| encode_frame(i, sample, config, &timing))
}

/// Check the config and the table before any per-sample work.
pub fn validate_input(table: &SampleTable, config: &SonifyConfig) -> Result<()> {
    config.validate()?;
    table.require_columns(&config.columns)?;
    if table.is_empty() {
        return Err(SonifyError::EmptyInput);
    }
    Ok(())
}

/// Run the pipeline up to (not including) serialization.
pub fn render(table: &SampleTable, config: &SonifyConfig) -> Result<Rendering> {
    validate_input(table, config)?;

    let timing = TimingModel::from_config(config, table.len());
    if timing.duration_seconds == 0 {
        warn!(
            samples = table.len(),
            "auto duration resolved to 0 seconds; all notes start at beat 0"
        );
    }
    info!(
        samples = timing.sample_count,
        bpm = timing.bpm,
        duration_seconds = timing.duration_seconds,
        total_beats = timing.total_beats(),
        beat_increment = timing.beat_increment,
        "laid out beat grid"
    );

    let n = table.len();
    let mut channels = [
        Channel::with_capacity(ChannelKind::Clarity, config.bpm, n),
        Channel::with_capacity(ChannelKind::Cyclical, config.bpm, n),
        Channel::new(ChannelKind::SolarEvent, config.bpm),
    ];
    let mut cloud_range = RangeTracker::default();
    let mut proxy_range = RangeTracker::default();
    let mut sunrise_events = 0;
    let mut sunset_events = 0;

    for (sample, frame) in table.samples().iter().zip(frames(table.samples(), config, timing)) {
        cloud_range.observe(sample.cloud_cover_pct);
        proxy_range.observe(Some(normalize_proxy(
            sample.solar_proxy,
            config.sine_range / 2.0,
            config.sine_range,
        )));
        sunrise_events += normalize_flag(sample.sunrise_flag) as usize;
        sunset_events += normalize_flag(sample.sunset_flag) as usize;

        channels[ChannelKind::Clarity.index()].push(frame.clarity);
        channels[ChannelKind::Cyclical.index()].push(frame.cyclical);
        if let Some(event) = frame.event {
            debug!(
                time = %sample.timestamp,
                pitch = event.pitch,
                beat = event.start_beat,
                "event note"
            );
            channels[ChannelKind::SolarEvent.index()].push(event);
        }
    }

    let report = ConversionReport::new(
        &timing,
        config.auto_duration,
        &channels,
        (sunrise_events, sunset_events),
        &cloud_range,
        &proxy_range,
    );
    info!(
        sunrise_events = report.sunrise_events,
        sunset_events = report.sunset_events,
        event_notes = channels[ChannelKind::SolarEvent.index()].notes.len(),
        "rendered channels"
    );

    Ok(Rendering {
        channels,
        timing,
        report,
    })
}

/// Convert a table to SMF bytes.
pub fn convert(table: &SampleTable, config: &SonifyConfig) -> Result<Vec<u8>> {
    let rendering = render(table, config)?;
    midi::serialize(&rendering.channels)
}

/// Convert a table and write the MIDI file to `path`.
pub fn convert_to_file(table: &SampleTable, config: &SonifyConfig, path: &Path) -> Result<ConversionReport> {
    convert_with_report(table, config, path, None)
}

/// Convert a table, write the JSON report to `report_path` (if given), then
/// write the MIDI file to `path`. If either write fails, neither file is
/// left behind.
pub fn convert_with_report(
    table: &SampleTable,
    config: &SonifyConfig,
    path: &Path,
    report_path: Option<&Path>,
) -> Result<ConversionReport> {
    let rendering = render(table, config)?;
    let Some(report_path) = report_path else {
        midi::write_midi(&rendering.channels, path)?;
        return Ok(rendering.report);
    };

    std::fs::write(report_path, rendering.report.to_json()?)?;
    if let Err(e) = midi::write_midi(&rendering.channels, path) {
        let _ = std::fs::remove_file(report_path);
        return Err(e);
    }
    info!(path = %report_path.display(), "wrote report");
    Ok(rendering.report)
}
