// Skysong Music Generator
//
// Turns a time-stamped weather series (low cloud cover, plus the sun's
// daily cycle) into a three-track MIDI piece. Each sample of the series
// becomes one slot on a fixed-tempo beat grid:
//
// - Clarity channel: inverted cloud cover on a major pentatonic scale
//   (clear sky = high and loud).
// - Cyclical channel: a solar-elevation proxy on a minor pentatonic scale,
//   peaking at solar noon.
// - Event channel: a harmonic-minor note only when the sample falls within
//   the tolerance window of sunrise or sunset.
//
// Architecture:
// - error.rs: Crate error type (`SonifyError`) and `Result` alias
// - config.rs: Run parameters (`SonifyConfig`), TOML loading, validation
// - sample.rs: Input rows (`Sample`) and the typed table (`SampleTable`)
// - source.rs: CSV readers for sample tables and measured solar tables
// - ephemeris.rs: Solar noon / sunrise / sunset estimation, the solar proxy,
//   event proximity, and table annotation
// - normalize.rs: Missing-value fill and clipping
// - scale.rs: Fixed pitch palettes and the linear quantizer
// - timing.rs: Beat-grid timing and auto-duration
// - events.rs: Sunrise/sunset note selection
// - channel.rs: Channel metadata and note events
// - pipeline.rs: The per-sample fold that fills the three channels
// - midi.rs: Standard MIDI File output
// - report.rs: Run statistics
//
// Output is deterministic: the same samples and parameters always produce
// the same bytes.

pub mod channel;
pub mod config;
pub mod ephemeris;
pub mod error;
pub mod events;
pub mod midi;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod sample;
pub mod scale;
pub mod source;
pub mod timing;

pub use config::SonifyConfig;
pub use error::{Result, SonifyError};
pub use pipeline::{convert, convert_to_file, convert_with_report, render};
