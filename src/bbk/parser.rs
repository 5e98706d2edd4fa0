//! Parser for `bbk --quiet` output
//!
//! Format: `download upload latency server isp [ticket] [measurement_id] [rating]`
//! with download/upload in Mbit/s and latency in milliseconds.

use crate::error::ParseError;
use crate::models::ParsedFields;

const MIN_FIELDS: usize = 5;

/// Parse one summary line into structured fields.
/// Values are passed through as-is; zero or negative readings are not rejected.
pub fn parse_quiet_output(line: &str) -> Result<ParsedFields, ParseError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < MIN_FIELDS {
        return Err(ParseError::TooFewFields {
            found: fields.len(),
            line: line.to_string(),
        });
    }

    let download_mbps = parse_number("download", fields[0])?;
    let upload_mbps = parse_number("upload", fields[1])?;
    let latency_ms = parse_number("latency", fields[2])?;

    let optional = |index: usize| fields.get(index).map(|s| s.to_string());

    Ok(ParsedFields {
        download_mbps,
        upload_mbps,
        latency_ms,
        server: fields[3].to_string(),
        isp: fields[4].to_string(),
        ticket: optional(5),
        measurement_id: optional(6),
        rating: optional(7),
    })
}

fn parse_number(field: &'static str, value: &str) -> Result<f64, ParseError> {
    value.parse::<f64>().map_err(|source| ParseError::InvalidNumber {
        field,
        value: value.to_string(),
        source,
    })
}
