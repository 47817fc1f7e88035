use thiserror::Error;

/// Output unit for the clock-string conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
}

#[derive(Debug, Error)]
pub enum TimeParseError {
    #[error("clock string {0:?} is empty")]
    Empty(String),
    #[error("clock string {clock:?} has more than three fields")]
    TooManyFields { clock: String },
    #[error("clock string {clock:?} field {field:?} is not numeric")]
    BadField { clock: String, field: String },
}

/// Drop a fractional-seconds suffix from the final colon field, without
/// rounding. `"00:00:01.900"` becomes `"00:00:01"`.
pub fn truncate_subseconds(clock: &str) -> String {
    match clock.rfind(':') {
        Some(idx) => {
            let (head, last) = clock.split_at(idx + 1);
            let last = last.split('.').next().unwrap_or(last);
            format!("{head}{last}")
        }
        None => clock.split('.').next().unwrap_or(clock).to_string(),
    }
}

/// Convert a colon-delimited clock string to an offset from `zero_hour`.
///
/// Fields are right-anchored: one field is seconds, two are minutes and
/// seconds, three are hours, minutes and seconds. The zero-hour reference
/// is expressed in hours and subtracted from the parsed total; offsets may
/// be negative and are returned as-is.
pub fn clock_offset(unit: TimeUnit, clock: &str, zero_hour: f64) -> Result<f64, TimeParseError> {
    let trimmed = clock.trim();
    if trimmed.is_empty() {
        return Err(TimeParseError::Empty(clock.to_string()));
    }
    let fields: Vec<&str> = trimmed.split(':').collect();
    if fields.len() > 3 {
        return Err(TimeParseError::TooManyFields {
            clock: clock.to_string(),
        });
    }
    let mut total_secs = 0.0;
    for field in &fields {
        let value: f64 = field.trim().parse().map_err(|_| TimeParseError::BadField {
            clock: clock.to_string(),
            field: field.to_string(),
        })?;
        total_secs = total_secs * 60.0 + value;
    }
    let offset_secs = total_secs - zero_hour * 3600.0;
    Ok(match unit {
        TimeUnit::Seconds => offset_secs,
        TimeUnit::Minutes => offset_secs / 60.0,
        TimeUnit::Hours => offset_secs / 3600.0,
    })
}

/// Truncation plus conversion in one step, the form the table loader uses.
pub fn normalise_clock(clock: &str, zero_hour: f64) -> Result<f64, TimeParseError> {
    let truncated = truncate_subseconds(clock);
    clock_offset(TimeUnit::Seconds, &truncated, zero_hour)
}
