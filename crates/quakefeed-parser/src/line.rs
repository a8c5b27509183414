use chrono::{DateTime, Utc};

use crate::errors::RecordError;
use crate::model::{Coordinates, Earthquake};

/// Prefix shared by every observed variant of the feed's header line.
pub const HEADER_PREFIX: &str = "time,";

/// Column order of the USGS summary CSV: time, latitude, longitude, depth,
/// mag. Anything past index 4 (place names, networks, quoted fields) is
/// ignored, so a data line must carry at least this many fields.
pub const MIN_FIELDS: usize = 5;

/// Parse one data line into an [`Earthquake`].
///
/// The split is positional on commas with no quoting support; the fields we
/// read all precede the first quotable column in the feed.
pub fn parse_line(line: &str) -> Result<Earthquake, RecordError> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < MIN_FIELDS {
        return Err(RecordError::TooFewFields {
            found: fields.len(),
        });
    }

    let occurred_at = parse_timestamp(fields[0])?;
    let coordinates = Coordinates {
        latitude: parse_required_f64("latitude", fields[1])?,
        longitude: parse_required_f64("longitude", fields[2])?,
    };
    let depth_km = parse_optional_f64("depth", fields[3])?;
    let magnitude = parse_optional_f64("mag", fields[4])?;

    Ok(Earthquake::new(occurred_at, coordinates, depth_km, magnitude))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RecordError> {
    let trimmed = value.trim();
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| RecordError::InvalidTimestamp {
            value: trimmed.to_string(),
            message: err.to_string(),
        })
}

fn parse_required_f64(field: &'static str, value: &str) -> Result<f64, RecordError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| RecordError::InvalidNumber {
            field,
            value: value.trim().to_string(),
        })
}

fn parse_optional_f64(field: &'static str, value: &str) -> Result<Option<f64>, RecordError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_required_f64(field, trimmed).map(Some)
}
