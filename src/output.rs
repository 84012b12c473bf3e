//! Text rendering: the menu-bar status report and the flat ferry line.

use anyhow::Result;
use chrono::{DateTime, Local};

use crate::config::BoardConfig;
use crate::extract::ArrivalEstimate;

/// Joins arrival estimates as `2min, 10min` labels, `Now` for zero minutes.
/// An empty slice renders as `No data`.
pub fn format_times(estimates: &[ArrivalEstimate]) -> String {
    if estimates.is_empty() {
        return "No data".to_string();
    }
    estimates
        .iter()
        .map(|e| {
            if e.minutes_away > 0 {
                format!("{}min", e.minutes_away)
            } else {
                "Now".to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// The newline-delimited status report: a header per feed, one line per
/// direction in configured order, and an update footer. A feed whose fetch
/// failed shows `No data` on every one of its direction lines.
pub fn status_report(
    config: &BoardConfig,
    subway: &Result<Vec<ArrivalEstimate>>,
    ferry: &Result<Vec<ArrivalEstimate>>,
    now: DateTime<Local>,
) -> String {
    let mut lines = Vec::new();

    for (feed, outcome) in [(&config.subway, subway), (&config.ferry, ferry)] {
        lines.push(feed.name.clone());

        let estimates: &[ArrivalEstimate] = match outcome {
            Ok(list) => list,
            Err(_) => &[],
        };

        for target in &feed.stops {
            let for_direction: Vec<ArrivalEstimate> = estimates
                .iter()
                .filter(|e| e.direction == target.direction)
                .cloned()
                .collect();
            lines.push(format!(
                "  {}: {}",
                target.direction,
                format_times(&for_direction)
            ));
        }
    }

    lines.push(format!("Updated: {}", now.format("%-I:%M:%S %p")));
    lines.join("\n") + "\n"
}

/// The flat ferry contract: comma-joined ascending minutes, an empty string
/// when no qualifying departure exists, the literal `0` when the fetch
/// itself failed. Downstream consumers branch on that distinction, so it is
/// produced here from the tagged result rather than by string inspection.
pub fn ferry_line(outcome: &Result<Vec<ArrivalEstimate>>) -> String {
    match outcome {
        Err(_) => "0".to_string(),
        Ok(estimates) => estimates
            .iter()
            .map(|e| e.minutes_away.to_string())
            .collect::<Vec<_>>()
            .join(","),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use chrono::TimeZone;

    fn estimate(minutes: i64, direction: &str) -> ArrivalEstimate {
        ArrivalEstimate {
            minutes_away: minutes,
            trip_id: String::new(),
            direction: direction.to_string(),
        }
    }

    #[test]
    fn test_format_times_labels() {
        let estimates = vec![estimate(0, "Court Square"), estimate(7, "Court Square")];
        assert_eq!(format_times(&estimates), "Now, 7min");
    }

    #[test]
    fn test_format_times_empty_is_no_data() {
        assert_eq!(format_times(&[]), "No data");
    }

    #[test]
    fn test_ferry_line_joins_minutes() {
        let outcome = Ok(vec![
            estimate(2, "Hunters Point"),
            estimate(10, "Hunters Point"),
            estimate(25, "Hunters Point"),
        ]);
        assert_eq!(ferry_line(&outcome), "2,10,25");
    }

    #[test]
    fn test_ferry_line_empty_differs_from_failure() {
        // "no departures" and "the fetch failed" must stay distinguishable
        assert_eq!(ferry_line(&Ok(vec![])), "");
        assert_eq!(ferry_line(&Err(anyhow!("connection refused"))), "0");
    }

    #[test]
    fn test_status_report_one_line_per_direction() {
        let config = crate::config::BoardConfig::from_env();
        let subway = Ok(vec![
            estimate(1, "Court Square"),
            estimate(10, "Court Square"),
            estimate(2, "Church Ave"),
        ]);
        let ferry = Err(anyhow!("timed out"));
        let now = Local.with_ymd_and_hms(2024, 6, 1, 17, 4, 33).unwrap();

        let report = status_report(&config, &subway, &ferry, now);

        assert!(report.contains("  Court Square: 1min, 10min\n"));
        assert!(report.contains("  Church Ave: 2min\n"));
        assert!(report.contains("  Hunters Point: No data\n"));
        assert!(report.contains("Updated: 5:04:33 PM\n"));
    }
}
