// Solar ephemeris estimation from calendar date alone.
//
// Each calendar date resolves to a `SolarDay`: sunrise, sunset and solar
// noon in local clock time. Three sources feed it, in priority order:
//
// - Measured: a `SolarTable` entry for the date. Sunrise/sunset are taken
//   as-is and solar noon is their midpoint.
// - Seasonal: a closed-form equation-of-time approximation plus a
//   longitude correction of 4 minutes per degree west of the time zone
//   meridian. Gives solar noon only; sunrise/sunset stay at the fixed
//   06:00/18:00. Missing dates in the measured table land here (or on
//   Fixed below).
// - Fixed: 06:00 sunrise, 18:00 sunset, noon at 12:00.
//
// When the seasonal model is enabled it also overrides the solar noon of
// measured days (the proxy follows the seasonal curve) while the measured
// sunrise/sunset times still drive event proximity.
//
// From a `SolarDay` two per-timestamp quantities are derived:
// - `proxy_value`: a raised cosine peaking at solar noon, the cyclical
//   signal for the second channel.
// - `proximity`: whether the timestamp falls within the tolerance window of
//   sunrise and/or sunset.
//
// `annotate` runs both over a whole `SampleTable`, filling the solar proxy
// and event columns for sources that only carry timestamps and cloud cover.
//
// This is not a solar-position algorithm. The seasonal model has no
// day-length term, so it never moves the event times.

use crate::config::SonifyConfig;
use crate::error::{Result, SonifyError};
use crate::sample::SampleTable;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::{BTreeMap, HashMap};
use std::f64::consts::PI;
use tracing::{debug, info};

/// Fallback sunrise, minutes after midnight (06:00).
pub const FALLBACK_SUNRISE_MINUTES: i64 = 6 * 60;
/// Fallback sunset, minutes after midnight (18:00).
pub const FALLBACK_SUNSET_MINUTES: i64 = 18 * 60;
/// Clock noon, minutes after midnight.
const CLOCK_NOON_MINUTES: i64 = 12 * 60;
/// Earth turns one degree of longitude every four minutes.
const MINUTES_PER_DEGREE: f64 = 4.0;
/// Day-of-year origin of the equation-of-time phase (near the March equinox).
const EOT_PHASE_ORIGIN_DAY: f64 = 81.0;

/// Where a `SolarDay`'s event times came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SolarSource {
    Measured,
    Seasonal,
    Fixed,
}

/// Sunrise, sunset and solar noon for one calendar date.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SolarDay {
    pub date: NaiveDate,
    pub sunrise: NaiveDateTime,
    pub sunset: NaiveDateTime,
    pub solar_noon: NaiveDateTime,
    pub source: SolarSource,
}

impl SolarDay {
    /// A measured day; solar noon is the sunrise/sunset midpoint.
    pub fn measured(date: NaiveDate, sunrise: NaiveDateTime, sunset: NaiveDateTime) -> Self {
        SolarDay {
            date,
            sunrise,
            sunset,
            solar_noon: sunrise + (sunset - sunrise) / 2,
            source: SolarSource::Measured,
        }
    }

    /// A seasonal-model day: fixed 06:00/18:00 event times around the
    /// given solar noon.
    pub fn seasonal(date: NaiveDate, solar_noon: NaiveDateTime) -> Self {
        SolarDay {
            source: SolarSource::Seasonal,
            ..SolarDay::fixed(date).with_solar_noon(solar_noon)
        }
    }

    /// The fixed 06:00/18:00 day.
    pub fn fixed(date: NaiveDate) -> Self {
        let (sunrise, sunset) = fixed_event_times(date);
        SolarDay {
            date,
            sunrise,
            sunset,
            solar_noon: clock_time(date, CLOCK_NOON_MINUTES),
            source: SolarSource::Fixed,
        }
    }

    /// Same event times, different solar noon.
    pub fn with_solar_noon(self, solar_noon: NaiveDateTime) -> Self {
        SolarDay { solar_noon, ..self }
    }
}

/// Measured sunrise/sunset times keyed by date. At most one entry per date.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SolarTable {
    days: BTreeMap<NaiveDate, SolarDay>,
}

impl SolarTable {
    pub fn new() -> Self {
        SolarTable::default()
    }

    /// Add a measured day. A second entry for the same date is rejected.
    pub fn insert(&mut self, day: SolarDay) -> Result<()> {
        if self.days.contains_key(&day.date) {
            return Err(SonifyError::InvalidParameter(format!(
                "duplicate solar table entry for {}",
                day.date
            )));
        }
        self.days.insert(day.date, day);
        Ok(())
    }

    /// Look up the measured day, or `DateLookupMiss`.
    pub fn get(&self, date: NaiveDate) -> Result<&SolarDay> {
        self.days
            .get(&date)
            .ok_or(SonifyError::DateLookupMiss(date))
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// Which model supplies solar noon when the measured table has no say.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EphemerisModel {
    /// Equation of time plus longitude correction.
    Seasonal {
        longitude: f64,
        timezone_meridian: f64,
    },
    /// Solar noon at 12:00 (or the measured midpoint).
    Fixed,
}

impl EphemerisModel {
    pub fn from_config(config: &SonifyConfig) -> Self {
        if config.use_realistic_timing {
            EphemerisModel::Seasonal {
                longitude: config.longitude,
                timezone_meridian: config.timezone_meridian,
            }
        } else {
            EphemerisModel::Fixed
        }
    }

    /// Solar noon for the date under this model, or `None` for `Fixed`.
    fn solar_noon(&self, date: NaiveDate) -> Option<NaiveDateTime> {
        match *self {
            EphemerisModel::Seasonal {
                longitude,
                timezone_meridian,
            } => {
                let offset = solar_noon_offset_minutes(date.ordinal(), longitude, timezone_meridian);
                let offset = Duration::milliseconds((offset * 60_000.0).round() as i64);
                Some(clock_time(date, CLOCK_NOON_MINUTES) + offset)
            }
            EphemerisModel::Fixed => None,
        }
    }
}

/// Minutes from clock noon to solar noon for a day of the year (positive
/// means solar noon is later than 12:00).
///
/// The offset is `E + 4 * (timezone_meridian - longitude)`, where
/// `E = 9.87 sin(2B) - 7.53 cos(B) - 1.5 sin(B)` and
/// `B = 2π (day_of_year - 81) / 365`. The longitude term adds 4 minutes for
/// every degree the observer sits west of `timezone_meridian`.
pub fn solar_noon_offset_minutes(day_of_year: u32, longitude: f64, timezone_meridian: f64) -> f64 {
    let b = 2.0 * PI * (day_of_year as f64 - EOT_PHASE_ORIGIN_DAY) / 365.0;
    let equation_of_time = 9.87 * (2.0 * b).sin() - 7.53 * b.cos() - 1.5 * b.sin();
    equation_of_time + MINUTES_PER_DEGREE * (timezone_meridian - longitude)
}

/// Resolve the solar day for a date. Measured entries win; a lookup miss
/// degrades to the fixed 06:00/18:00 event times (with the seasonal solar
/// noon when that model is on) and is never an error.
pub fn estimate(date: NaiveDate, measured: Option<&SolarTable>, model: &EphemerisModel) -> SolarDay {
    let seasonal_noon = model.solar_noon(date);
    match measured.map(|table| table.get(date)) {
        Some(Ok(day)) => match seasonal_noon {
            Some(noon) => day.with_solar_noon(noon),
            None => *day,
        },
        lookup => {
            if let Some(Err(err)) = lookup {
                debug!(%err, "using modelled solar day");
            }
            match seasonal_noon {
                Some(noon) => SolarDay::seasonal(date, noon),
                None => SolarDay::fixed(date),
            }
        }
    }
}

/// Sunrise/sunset proximity flags for one timestamp.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventProximity {
    pub is_sunrise: bool,
    pub is_sunset: bool,
}

/// Test a timestamp against the sunrise and sunset of `day`, or against the
/// fixed 06:00/18:00 times when there is no day. Each event is tested
/// independently, so both flags can be set for very wide tolerances.
pub fn proximity(
    timestamp: NaiveDateTime,
    day: Option<&SolarDay>,
    tolerance_minutes: u32,
) -> EventProximity {
    let (sunrise, sunset) = match day {
        Some(day) => (day.sunrise, day.sunset),
        None => fixed_event_times(timestamp.date()),
    };
    let tolerance = tolerance_minutes as f64;
    EventProximity {
        is_sunrise: minutes_apart(timestamp, sunrise) <= tolerance,
        is_sunset: minutes_apart(timestamp, sunset) <= tolerance,
    }
}

/// Raised cosine of the time from solar noon: `value_range` at solar noon,
/// 0 twelve hours away. Always within `[0, value_range]`.
pub fn proxy_value(timestamp: NaiveDateTime, day: &SolarDay, value_range: f64) -> f64 {
    let hours = (timestamp - day.solar_noon).num_milliseconds() as f64 / 3_600_000.0;
    let hours = wrap_hours(hours);
    let half = value_range / 2.0;
    let value = half + half * (2.0 * PI * hours / 24.0).cos();
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, value_range.max(0.0))
}

/// Wrap an hour offset into `[-12, 12)`.
pub fn wrap_hours(hours: f64) -> f64 {
    (hours + 12.0).rem_euclid(24.0) - 12.0
}

/// Per-run cache of resolved solar days.
pub struct Estimator<'a> {
    model: EphemerisModel,
    measured: Option<&'a SolarTable>,
    cache: HashMap<NaiveDate, SolarDay>,
}

impl<'a> Estimator<'a> {
    pub fn new(model: EphemerisModel, measured: Option<&'a SolarTable>) -> Self {
        Estimator {
            model,
            measured,
            cache: HashMap::new(),
        }
    }

    /// The solar day for `date`, computed once per run.
    pub fn solar_day(&mut self, date: NaiveDate) -> SolarDay {
        *self
            .cache
            .entry(date)
            .or_insert_with(|| estimate(date, self.measured, &self.model))
    }

    /// Number of distinct dates resolved so far.
    pub fn cached_days(&self) -> usize {
        self.cache.len()
    }
}

/// Counts from one annotation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnnotationSummary {
    pub days: usize,
    pub measured_days: usize,
    pub sunrise_events: usize,
    pub sunset_events: usize,
}

/// Fill `solar_proxy`, `sunrise_flag` and `sunset_flag` for every sample from
/// the ephemeris model and register the three columns on the table.
/// Existing values in those columns are overwritten.
pub fn annotate(
    table: &mut SampleTable,
    config: &SonifyConfig,
    measured: Option<&SolarTable>,
) -> AnnotationSummary {
    let mut estimator = Estimator::new(EphemerisModel::from_config(config), measured);
    let mut summary = AnnotationSummary::default();
    let mut measured_dates = Vec::new();

    for sample in table.samples_mut() {
        let day = estimator.solar_day(sample.date());
        if day.source == SolarSource::Measured && !measured_dates.contains(&day.date) {
            measured_dates.push(day.date);
        }

        let value = proxy_value(sample.timestamp, &day, config.sine_range);
        let value = ((value * 100.0).round() / 100.0).clamp(0.0, config.sine_range);
        let events = proximity(sample.timestamp, Some(&day), config.tolerance_minutes);
        if events.is_sunrise || events.is_sunset {
            debug!(
                time = %sample.timestamp,
                sunrise = events.is_sunrise,
                sunset = events.is_sunset,
                "solar event"
            );
        }

        summary.sunrise_events += events.is_sunrise as usize;
        summary.sunset_events += events.is_sunset as usize;
        sample.solar_proxy = Some(value);
        sample.sunrise_flag = Some(events.is_sunrise);
        sample.sunset_flag = Some(events.is_sunset);
    }

    table.add_column(&config.columns.solar_proxy);
    table.add_column(&config.columns.sunrise);
    table.add_column(&config.columns.sunset);

    summary.days = estimator.cached_days();
    summary.measured_days = measured_dates.len();
    info!(
        days = summary.days,
        measured_days = summary.measured_days,
        sunrise_events = summary.sunrise_events,
        sunset_events = summary.sunset_events,
        "annotated solar columns"
    );
    summary
}

fn fixed_event_times(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    (
        clock_time(date, FALLBACK_SUNRISE_MINUTES),
        clock_time(date, FALLBACK_SUNSET_MINUTES),
    )
}

fn clock_time(date: NaiveDate, minutes_after_midnight: i64) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::minutes(minutes_after_midnight)
}

fn minutes_apart(a: NaiveDateTime, b: NaiveDateTime) -> f64 {
    ((a - b).num_milliseconds() as f64 / 60_000.0).abs()
}
