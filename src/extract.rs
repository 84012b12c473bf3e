//! Arrival extraction: reduces a decoded trip-update feed to a bounded,
//! time-sorted, per-direction list of "minutes until arrival" values.

use chrono::{DateTime, Utc};

use crate::gtfs_rt::{FeedMessage, TripUpdate, trip_update::StopTimeUpdate};

/// One target platform: a stop id plus the rider-facing direction label
/// shown for vehicles serving it (e.g. `G26N` → "Court Square").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopTarget {
    pub stop_id: String,
    pub direction: String,
}

impl StopTarget {
    pub fn new(stop_id: impl Into<String>, direction: impl Into<String>) -> Self {
        Self {
            stop_id: stop_id.into(),
            direction: direction.into(),
        }
    }
}

/// A single upcoming arrival at a target platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrivalEstimate {
    /// Whole minutes until the vehicle reaches (or leaves) the platform.
    /// Never negative; zero means "arriving now".
    pub minutes_away: i64,
    /// Originating trip id, empty when the feed does not publish one.
    pub trip_id: String,
    /// Direction label of the matched [`StopTarget`].
    pub direction: String,
}

/// Reduces a feed snapshot to at most `limit_per_direction` estimates per
/// target, each direction sorted ascending by minutes away.
///
/// Directions are emitted in the order `targets` lists them, never
/// interleaved by time across directions. Entries at the platform in the
/// past, entries for other stops, and entries carrying no usable timestamp
/// all contribute nothing; an empty or trip-free feed yields an empty list.
/// Ties within a direction keep feed order.
pub fn extract_arrivals(
    feed: &FeedMessage,
    targets: &[StopTarget],
    now: DateTime<Utc>,
    limit_per_direction: usize,
) -> Vec<ArrivalEstimate> {
    let now_ts = now.timestamp();
    let mut out = Vec::new();

    for target in targets {
        let mut candidates: Vec<ArrivalEstimate> = feed
            .entity
            .iter()
            .filter_map(|entity| entity.trip_update.as_ref())
            .filter_map(|update| trip_candidate(update, target, now_ts))
            .collect();

        candidates.sort_by_key(|estimate| estimate.minutes_away);
        candidates.truncate(limit_per_direction);
        out.extend(candidates);
    }

    out
}

/// At most one candidate per trip per target: the first stop entry matching
/// the target's stop id that carries a usable instant. Instants in the past
/// are discarded on raw seconds, before truncation to minutes, so a vehicle
/// that left half a minute ago never rounds back up to "now".
fn trip_candidate(update: &TripUpdate, target: &StopTarget, now_ts: i64) -> Option<ArrivalEstimate> {
    let event_ts = update
        .stop_time_update
        .iter()
        .filter(|stop_time| stop_time.stop_id() == target.stop_id)
        .find_map(representative_time)?;

    let seconds_out = event_ts - now_ts;
    if seconds_out < 0 {
        return None;
    }

    Some(ArrivalEstimate {
        minutes_away: seconds_out / 60,
        trip_id: update.trip.trip_id().to_string(),
        direction: target.direction.clone(),
    })
}

/// Departure is preferred over arrival: for a vehicle sitting at the
/// platform, "when it leaves" is the actionable number. An entry with
/// neither timestamp is a legitimate feed state and yields nothing.
fn representative_time(stop_time: &StopTimeUpdate) -> Option<i64> {
    stop_time
        .departure
        .as_ref()
        .and_then(|event| event.time)
        .or_else(|| stop_time.arrival.as_ref().and_then(|event| event.time))
}
