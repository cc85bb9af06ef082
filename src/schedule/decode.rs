use chrono::NaiveDate;
use thiserror::Error;

use crate::{
    schedule::encode::{CompactTrip, PatternEntry, PatternFile, ScheduleFile},
    shared::time::{day_offset, minutes_to_clock},
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Schedule for {schedule} was paired with patterns for {patterns}")]
    OriginMismatch { schedule: String, patterns: String },
    #[error("Trip {trip} references pattern {pattern} which does not exist")]
    UnknownPattern { trip: String, pattern: u32 },
    #[error("Trip {trip} is listed under {listed} but its pattern ends at {pattern}")]
    DestinationMismatch {
        trip: String,
        listed: String,
        pattern: String,
    },
    #[error("Trip {trip} has {found} intermediate times for {expected} stops")]
    StopCountMismatch {
        trip: String,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedStop {
    pub station: String,
    pub name: String,
    pub platform_id: String,
    pub platform: String,
    pub platform_name: String,
    pub arrival: String,
}

/// A fully expanded departure, as a client would display it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub trip_id: String,
    pub route_id: String,
    pub route_name: String,
    pub origin: String,
    pub destination: String,
    pub pattern_index: u32,
    pub departure_minutes: u32,
    pub arrival_minutes: u32,
    /// `HH:MM:SS`
    pub departure: String,
    pub arrival: String,
    pub stops: Vec<DecodedStop>,
    /// Override when present, otherwise the pattern default.
    pub origin_platform: Option<String>,
    pub destination_platform: Option<String>,
}

/// Expands the trips from the schedule's origin to `destination` on `date`.
///
/// Dates outside the window and unknown destinations give an empty list.
pub fn decode_departures(
    schedule: &ScheduleFile,
    patterns: &PatternFile,
    destination: &str,
    date: NaiveDate,
) -> Result<Vec<Departure>, self::Error> {
    check_origin(schedule, patterns)?;
    let Some(day) = day_index(schedule, date) else {
        return Ok(Vec::new());
    };
    let Some(trips) = schedule
        .routes
        .get(destination)
        .and_then(|route| route.schedules.get(day))
    else {
        return Ok(Vec::new());
    };
    trips
        .iter()
        .map(|trip| decode_trip(schedule, patterns, destination, trip))
        .collect()
}

/// Every departure from the schedule's origin on `date`, in departure order.
pub fn departures_on(
    schedule: &ScheduleFile,
    patterns: &PatternFile,
    date: NaiveDate,
) -> Result<Vec<Departure>, self::Error> {
    check_origin(schedule, patterns)?;
    let mut departures = Vec::new();
    for destination in schedule.routes.keys() {
        departures.extend(decode_departures(schedule, patterns, destination, date)?);
    }
    departures.sort_by(|a, b| {
        a.departure_minutes
            .cmp(&b.departure_minutes)
            .then_with(|| a.trip_id.cmp(&b.trip_id))
            .then_with(|| a.destination.cmp(&b.destination))
    });
    Ok(departures)
}

fn check_origin(schedule: &ScheduleFile, patterns: &PatternFile) -> Result<(), self::Error> {
    if schedule.meta.origin_slug != patterns.meta.origin_slug {
        return Err(Error::OriginMismatch {
            schedule: schedule.meta.origin_slug.clone(),
            patterns: patterns.meta.origin_slug.clone(),
        });
    }
    Ok(())
}

fn day_index(schedule: &ScheduleFile, date: NaiveDate) -> Option<usize> {
    let offset = day_offset(schedule.meta.start_date, date);
    if offset < 0 || offset >= schedule.meta.day_count as i64 {
        return None;
    }
    Some(offset as usize)
}

fn decode_trip(
    schedule: &ScheduleFile,
    patterns: &PatternFile,
    destination: &str,
    trip: &CompactTrip,
) -> Result<Departure, self::Error> {
    let pattern: &PatternEntry = patterns
        .patterns
        .get(trip.p as usize)
        .ok_or_else(|| Error::UnknownPattern {
            trip: trip.t.clone(),
            pattern: trip.p,
        })?;
    if pattern.d != destination {
        return Err(Error::DestinationMismatch {
            trip: trip.t.clone(),
            listed: destination.to_string(),
            pattern: pattern.d.clone(),
        });
    }
    if pattern.s.len() != trip.s.len() {
        return Err(Error::StopCountMismatch {
            trip: trip.t.clone(),
            expected: pattern.s.len(),
            found: trip.s.len(),
        });
    }

    let stops = pattern
        .s
        .iter()
        .zip(trip.s.iter())
        .map(|(stop, minutes)| DecodedStop {
            station: stop.0.clone(),
            name: stop.1.clone(),
            platform_id: stop.2.clone(),
            platform: stop.3.clone(),
            platform_name: stop.4.clone(),
            arrival: minutes_to_clock(*minutes as i64),
        })
        .collect();

    Ok(Departure {
        trip_id: trip.t.clone(),
        route_id: pattern.r.clone(),
        route_name: pattern.n.clone(),
        origin: schedule.meta.origin_slug.clone(),
        destination: destination.to_string(),
        pattern_index: trip.p,
        departure_minutes: trip.d,
        arrival_minutes: trip.a,
        departure: minutes_to_clock(trip.d as i64),
        arrival: minutes_to_clock(trip.a as i64),
        stops,
        origin_platform: trip.op.clone().or_else(|| pattern.op.clone()),
        destination_platform: trip.ap.clone().or_else(|| pattern.dp.clone()),
    })
}
