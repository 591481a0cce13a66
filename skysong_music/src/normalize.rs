// Signal normalization ahead of quantization.
//
// Missing readings are filled with a fixed default (no interpolation) and
// values are clipped into the range their scale expects. NaN counts as
// missing. Cloud cover is inverted so that a clear sky maps to the top of
// the clarity scale.

/// Upper bound of percentage signals.
pub const PERCENT_MAX: f64 = 100.0;

/// Sky clarity in `[0, 100]`: `100 - cloud cover`, with missing cover read as
/// a cloudless sky.
pub fn normalize_cloud(raw_pct: Option<f64>) -> f64 {
    let cover = fill_missing(raw_pct, 0.0);
    (PERCENT_MAX - cover).clamp(0.0, PERCENT_MAX)
}

/// Solar proxy clipped into `[0, range]`, with missing values read as
/// `midpoint_default`.
pub fn normalize_proxy(raw: Option<f64>, midpoint_default: f64, range: f64) -> f64 {
    fill_missing(raw, midpoint_default).clamp(0.0, range.max(0.0))
}

/// Missing event flags are "no event".
pub fn normalize_flag(raw: Option<bool>) -> bool {
    raw.unwrap_or(false)
}

fn fill_missing(raw: Option<f64>, default: f64) -> f64 {
    match raw {
        Some(v) if !v.is_nan() => v,
        _ => default,
    }
}
