//! Sighting normalization.
//!
//! Turns an unordered list of raw sightings into a chronological timeline in
//! which no two consecutive entries share a location code. The input records
//! are never modified.
//!
//! ## Timestamp format
//!
//! Day-first date/time text whose fields are separated by any run of spaces,
//! `/`, `:` or `-`:
//!
//! - 6 fields: day, month, year, hour, minute, second (`14/03/2024 09:30:15`)
//! - 5 fields: day, month, year, hour, minute (`14-03-2024 09:30`)
//!
//! Anything else, or out-of-range field values, yields an invalid timestamp.
//!
//! ## Ordering of invalid timestamps
//!
//! Invalid timestamps are kept as `None` and sort by `Option`'s native
//! ordering, i.e. before every valid timestamp. Among themselves they keep
//! their input order, but no caller should rely on where they land relative
//! to one another. They never contribute to earliest/latest statistics.

use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::RawSighting;

/// A sighting after parsing, ordering and repeat collapse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSighting {
    /// Position in the normalized timeline
    pub sequence: usize,
    /// Position of the originating record in the caller's input
    pub source_index: usize,
    pub boat_id: String,
    pub location_code: String,
    /// Parsed timestamp of the first sighting in this run; `None` if invalid
    pub timestamp: Option<NaiveDateTime>,
    /// Latest valid timestamp among the collapsed repeats of this run
    pub last_seen: Option<NaiveDateTime>,
    /// Number of raw sightings collapsed into this entry
    pub repeat_count: usize,
}

/// Parse a free-text sighting timestamp.
///
/// ```
/// use canal_tracker::parse_timestamp;
///
/// assert!(parse_timestamp("14/03/2024 09:30:15").is_some());
/// assert!(parse_timestamp("14-03-2024 09:30").is_some());
/// assert!(parse_timestamp("March 14th").is_none());
/// ```
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let fields: Vec<&str> = text
        .split(|c: char| c.is_whitespace() || matches!(c, '/' | ':' | '-'))
        .filter(|f| !f.is_empty())
        .collect();

    let second = match fields.len() {
        6 => fields[5].parse::<u32>().ok()?,
        5 => 0,
        _ => return None,
    };

    let day = fields[0].parse::<u32>().ok()?;
    let month = fields[1].parse::<u32>().ok()?;
    let year = fields[2].parse::<i32>().ok()?;
    let hour = fields[3].parse::<u32>().ok()?;
    let minute = fields[4].parse::<u32>().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}

/// Parse, sort and collapse raw sightings into a canonical timeline.
///
/// Consecutive sightings at the same location code become a single entry
/// (the first of the run), which encodes "no movement" between them.
pub fn normalize_sightings(raw: &[RawSighting]) -> Vec<NormalizedSighting> {
    let mut parsed: Vec<(usize, Option<NaiveDateTime>, &RawSighting)> = raw
        .iter()
        .enumerate()
        .map(|(i, sighting)| {
            let timestamp = parse_timestamp(&sighting.timestamp);
            if timestamp.is_none() {
                warn!(
                    "[SightingNormalizer] Invalid timestamp '{}' for boat '{}' at '{}'",
                    sighting.timestamp, sighting.boat_id, sighting.location_code
                );
            }
            (i, timestamp, sighting)
        })
        .collect();

    // Stable: equal timestamps keep their input order
    parsed.sort_by_key(|(_, timestamp, _)| *timestamp);

    let mut timeline: Vec<NormalizedSighting> = Vec::with_capacity(parsed.len());
    for (source_index, timestamp, sighting) in parsed {
        if let Some(current) = timeline.last_mut() {
            if current.location_code == sighting.location_code {
                current.repeat_count += 1;
                current.last_seen = current.last_seen.max(timestamp);
                debug!(
                    "[SightingNormalizer] Already at {}, no movement",
                    sighting.location_code
                );
                continue;
            }
        }

        timeline.push(NormalizedSighting {
            sequence: timeline.len(),
            source_index,
            boat_id: sighting.boat_id.clone(),
            location_code: sighting.location_code.clone(),
            timestamp,
            last_seen: timestamp,
            repeat_count: 1,
        });
    }

    timeline
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32, hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    #[test]
    fn test_parse_six_fields() {
        assert_eq!(parse_timestamp("01/06/2024 08:15:30"), Some(at(1, 8, 15, 30)));
        assert_eq!(parse_timestamp("01-06-2024 08:15:30"), Some(at(1, 8, 15, 30)));
    }

    #[test]
    fn test_parse_five_fields_defaults_seconds() {
        assert_eq!(parse_timestamp("02/06/2024 23:59"), Some(at(2, 23, 59, 0)));
    }

    #[test]
    fn test_parse_mixed_separators() {
        assert_eq!(parse_timestamp("  03 / 06 / 2024  10:00:05 "), Some(at(3, 10, 0, 5)));
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("01/06/2024"), None);
        assert_eq!(parse_timestamp("01/06/2024 08:15:30:12"), None);
        assert_eq!(parse_timestamp("aa/06/2024 08:15"), None);
        assert_eq!(parse_timestamp("31/02/2024 08:15"), None);
        assert_eq!(parse_timestamp("01/06/2024 25:15"), None);
    }

    #[test]
    fn test_chronological_order() {
        let raw = vec![
            RawSighting::new("b", "01/06/2024 12:00", "C"),
            RawSighting::new("b", "01/06/2024 08:00", "A"),
            RawSighting::new("b", "01/06/2024 10:00", "B"),
        ];
        let timeline = normalize_sightings(&raw);
        let codes: Vec<&str> = timeline.iter().map(|s| s.location_code.as_str()).collect();
        assert_eq!(codes, vec!["A", "B", "C"]);
        assert_eq!(timeline[0].source_index, 1);
        assert_eq!(timeline[2].sequence, 2);
    }

    #[test]
    fn test_collapses_repeats() {
        let raw = vec![
            RawSighting::new("b", "01/06/2024 08:00", "X"),
            RawSighting::new("b", "01/06/2024 09:00", "X"),
            RawSighting::new("b", "01/06/2024 10:00", "Y"),
            RawSighting::new("b", "01/06/2024 11:00", "X"),
        ];
        let timeline = normalize_sightings(&raw);
        let codes: Vec<&str> = timeline.iter().map(|s| s.location_code.as_str()).collect();
        assert_eq!(codes, vec!["X", "Y", "X"]);
        assert_eq!(timeline[0].repeat_count, 2);
        assert_eq!(timeline[0].timestamp, Some(at(1, 8, 0, 0)));
        assert_eq!(timeline[0].last_seen, Some(at(1, 9, 0, 0)));
    }

    #[test]
    fn test_invalid_timestamps_sort_first() {
        let raw = vec![
            RawSighting::new("b", "01/06/2024 08:00", "A"),
            RawSighting::new("b", "yesterday", "B"),
        ];
        let timeline = normalize_sightings(&raw);
        assert_eq!(timeline[0].location_code, "B");
        assert_eq!(timeline[0].timestamp, None);
        assert_eq!(timeline[1].location_code, "A");
    }

    #[test]
    fn test_input_not_mutated() {
        let raw = vec![
            RawSighting::new("b", "01/06/2024 10:00", "B"),
            RawSighting::new("b", "01/06/2024 08:00", "A"),
        ];
        let before = raw.clone();
        let _ = normalize_sightings(&raw);
        assert_eq!(raw, before);
    }
}
