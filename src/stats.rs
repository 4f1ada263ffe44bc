//! Time statistics and the furthest-endpoint diagnostic.

use chrono::{Duration, NaiveDateTime};
use geo::{Coord, Geometry, LineString};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::geo_utils::haversine_distance;
use crate::{geometry_kind, NormalizedSighting};

/// Elapsed-time text reported when no valid timestamp exists.
pub const ELAPSED_NO_DATA: &str = "0.0";

/// Earliest and latest valid timestamps with the formatted span between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeStats {
    pub earliest_date: Option<NaiveDateTime>,
    pub latest_date: Option<NaiveDateTime>,
    pub time_taken: String,
}

/// Format a duration at its coarsest nonzero unit, truncating.
///
/// ```
/// use canal_tracker::format_elapsed;
/// use chrono::Duration;
///
/// assert_eq!(format_elapsed(Duration::seconds(86_399)), "23 hours");
/// assert_eq!(format_elapsed(Duration::seconds(86_400)), "1 days");
/// assert_eq!(format_elapsed(Duration::seconds(90)), "1 minutes");
/// ```
pub fn format_elapsed(duration: Duration) -> String {
    let seconds = duration.num_seconds().unsigned_abs();
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{} days", days)
    } else if hours > 0 {
        format!("{} hours", hours)
    } else if minutes > 0 {
        format!("{} minutes", minutes)
    } else {
        format!("{} seconds", seconds)
    }
}

/// Earliest and latest valid timestamps across a normalized timeline.
///
/// Collapsed repeats still count through each entry's `last_seen`. Invalid
/// timestamps are ignored; with none valid the span is [`ELAPSED_NO_DATA`].
pub fn time_stats(timeline: &[NormalizedSighting]) -> TimeStats {
    let valid = timeline
        .iter()
        .flat_map(|s| [s.timestamp, s.last_seen])
        .flatten();

    let mut earliest_date: Option<NaiveDateTime> = None;
    let mut latest_date: Option<NaiveDateTime> = None;
    for date in valid {
        if earliest_date.map_or(true, |e| date < e) {
            earliest_date = Some(date);
        }
        if latest_date.map_or(true, |l| date > l) {
            latest_date = Some(date);
        }
    }

    let time_taken = match (earliest_date, latest_date) {
        (Some(earliest), Some(latest)) => format_elapsed(latest - earliest),
        _ => {
            warn!("[StatsReporter] No valid dates found");
            ELAPSED_NO_DATA.to_string()
        }
    };

    TimeStats {
        earliest_date,
        latest_date,
        time_taken,
    }
}

/// Largest great-circle distance, in kilometers, between any two polyline
/// endpoints among the given geometries.
///
/// Every `LineString` (and every member of a `MultiLineString`) with at
/// least two coordinates contributes its first and last coordinate. Other
/// geometry types and non-finite endpoints are skipped with a warning. This
/// is a diagnostic only and is unrelated to the path-based total distance.
/// Runs in O(n²) over the endpoints.
pub fn furthest_endpoint_distance<'a, I>(geometries: I) -> f64
where
    I: IntoIterator<Item = &'a Geometry<f64>>,
{
    let mut endpoints: Vec<Coord<f64>> = Vec::new();

    for geometry in geometries {
        match geometry {
            Geometry::LineString(line) => push_endpoints(line, &mut endpoints),
            Geometry::MultiLineString(lines) => {
                for line in &lines.0 {
                    push_endpoints(line, &mut endpoints);
                }
            }
            other => warn!(
                "[StatsReporter] Skipping unsupported {} geometry in endpoint diagnostic",
                geometry_kind(other)
            ),
        }
    }

    let mut furthest = 0.0_f64;
    for (i, a) in endpoints.iter().enumerate() {
        for b in &endpoints[i + 1..] {
            furthest = furthest.max(haversine_distance(*a, *b) / 1000.0);
        }
    }
    furthest
}

fn push_endpoints(line: &LineString<f64>, endpoints: &mut Vec<Coord<f64>>) {
    if line.0.len() < 2 {
        warn!("[StatsReporter] Skipping polyline with fewer than 2 coordinates");
        return;
    }
    for c in [line.0[0], line.0[line.0.len() - 1]] {
        if c.x.is_finite() && c.y.is_finite() {
            endpoints.push(c);
        } else {
            warn!("[StatsReporter] Skipping non-finite endpoint ({}, {})", c.x, c.y);
        }
    }
}
