//! Duration formatting and hours rounding.

/// Seconds per tenth of an hour (6 minutes).
const SECONDS_PER_TENTH_HOUR: u64 = 360;

/// Formats elapsed seconds as `H h M:SS`.
///
/// The hours segment is omitted when zero, minutes are unpadded and
/// seconds are zero-padded to two digits.
pub fn pretty_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds / 60) % 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}h {}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Rounds elapsed seconds up to the next tenth of an hour.
///
/// Returns `None` when there is nothing to log.
pub fn suggested_hours(seconds: u64) -> Option<f64> {
    if seconds == 0 {
        return None;
    }
    let tenths = seconds.div_ceil(SECONDS_PER_TENTH_HOUR);
    Some(tenths as f64 / 10.0)
}
