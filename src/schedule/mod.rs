use chrono::{Days, NaiveDate};
use std::{collections::HashMap, time::Instant};
use thiserror::Error;
use tracing::{debug, info};

pub mod decode;
pub mod encode;
mod pattern;
mod platform;
mod sequence;

pub use pattern::{Occurrence, Pattern, PatternKey, PatternStop, PatternTable};
pub use platform::{PlatformTally, platform_override};
pub use sequence::{SequenceError, StationVisit, TripStationSequence};

use crate::{
    calendar::ActiveServices,
    diagnostics::Diagnostics,
    repository::{Repository, Trip},
    shared::time::today,
    station::StationResolver,
};
use encode::{Artifacts, Encoder, FORMAT_VERSION};

#[derive(Error, Debug)]
pub enum Error {
    #[error("The service window must cover at least one day")]
    EmptyWindow,
    #[error("A window of {day_count} days from {start_date} runs past the last representable date")]
    DateOutOfRange {
        start_date: NaiveDate,
        day_count: u32,
    },
    #[error("Encoding failed: {0}")]
    Encode(#[from] encode::Error),
}

#[derive(Debug, Clone)]
pub struct Config {
    /// First service day of the window, `schedules[0]`.
    pub start_date: NaiveDate,
    pub day_count: u32,
    pub format_version: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            start_date: today(),
            day_count: 7,
            format_version: FORMAT_VERSION.to_string(),
        }
    }
}

/// Result of one run.
#[derive(Debug, Clone)]
pub struct Compaction {
    pub artifacts: Artifacts,
    /// Loader problems plus everything found while compacting.
    pub diagnostics: Diagnostics,
}

/// Runs the pipeline from sequence building to encoding.
///
/// All state built during [`Compactor::compact`] belongs to that call, so a
/// compactor can be reused and independent compactors never interfere.
pub struct Compactor<'a> {
    repository: &'a Repository,
    stations: &'a StationResolver,
    config: Config,
}

/// Everything one trip contributes on each day it runs.
struct TripPlan {
    sequence: TripStationSequence,
    relations: Box<[Relation]>,
}

#[derive(Clone, Copy)]
struct Relation {
    from: u32,
    to: u32,
    pattern: u32,
}

impl<'a> Compactor<'a> {
    pub fn new(repository: &'a Repository, stations: &'a StationResolver) -> Self {
        Self {
            repository,
            stations,
            config: Config::default(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn compact<S: ActiveServices>(&self, services: &S) -> Result<Compaction, self::Error> {
        let Config {
            start_date,
            day_count,
            ref format_version,
        } = self.config;
        if day_count == 0 {
            return Err(Error::EmptyWindow);
        }
        start_date
            .checked_add_days(Days::new(day_count as u64))
            .ok_or(Error::DateOutOfRange {
                start_date,
                day_count,
            })?;
        info!("Compacting {day_count} days of service from {start_date}");

        let mut diagnostics = Diagnostics::default();
        let mut tables: Vec<PatternTable> = (0..self.stations.stations().len() as u32)
            .map(PatternTable::new)
            .collect();
        let mut plans: HashMap<u32, Option<TripPlan>> = HashMap::new();

        debug!("Building patterns...");
        let now = Instant::now();
        let mut occurrences = 0usize;
        for (day, date) in start_date.iter_days().take(day_count as usize).enumerate() {
            let active = services.active_services(date);
            let running = self
                .repository
                .trips
                .iter()
                .filter(|trip| active.contains(&trip.service_id));
            for trip in running {
                if !plans.contains_key(&trip.index) {
                    let plan = self.plan(trip, &mut tables, &mut diagnostics);
                    plans.insert(trip.index, plan);
                }
                let Some(Some(plan)) = plans.get(&trip.index) else {
                    continue;
                };
                for relation in plan.relations.iter() {
                    let visits = &plan.sequence.visits;
                    let origin = &visits[relation.from as usize];
                    let destination = &visits[relation.to as usize];
                    tables[origin.station_idx as usize].record(
                        Occurrence {
                            day: day as u32,
                            trip_idx: trip.index,
                            from: relation.from,
                            to: relation.to,
                            pattern: relation.pattern,
                        },
                        &self.stations.platform(origin.platform_idx).code,
                        &self.stations.platform(destination.platform_idx).code,
                    );
                    occurrences += 1;
                }
            }
        }
        tables.iter_mut().for_each(PatternTable::resolve_defaults);
        debug!("Building patterns took {:?}", now.elapsed());
        info!(
            "Found {} patterns across {} trip occurrences",
            tables.iter().map(PatternTable::len).sum::<usize>(),
            occurrences
        );

        debug!("Encoding artifacts...");
        let now = Instant::now();
        let sequences: HashMap<u32, TripStationSequence> = plans
            .into_iter()
            .filter_map(|(trip_idx, plan)| Some((trip_idx, plan?.sequence)))
            .collect();
        let encoder = Encoder {
            repository: self.repository,
            stations: self.stations,
            sequences: &sequences,
            start_date,
            day_count,
            format_version,
        };
        let artifacts = encoder.encode(&tables)?;
        debug!("Encoding artifacts took {:?}", now.elapsed());

        let mut total = self.repository.diagnostics;
        total += diagnostics;
        Ok(Compaction {
            artifacts,
            diagnostics: total,
        })
    }

    /// Builds the station sequence of a trip seen for the first time and
    /// interns every origin/destination relation it contains.
    fn plan(
        &self,
        trip: &Trip,
        tables: &mut [PatternTable],
        diagnostics: &mut Diagnostics,
    ) -> Option<TripPlan> {
        let stop_times = self.repository.stop_times_by_trip_idx(trip.index);
        let sequence =
            match TripStationSequence::build(trip.index, stop_times, self.stations, diagnostics) {
                Ok(sequence) => sequence,
                Err(SequenceError::TooShort) => {
                    diagnostics.short_trips += 1;
                    return None;
                }
                Err(err @ SequenceError::Revisit(_)) => {
                    debug!("Dropping trip {}: {}", trip.id, err);
                    diagnostics.revisiting_trips += 1;
                    return None;
                }
            };

        let route = self.repository.route_by_trip(trip);
        let visits = &sequence.visits;
        let mut relations = Vec::with_capacity(visits.len() * (visits.len() - 1) / 2);
        for i in 0..visits.len() {
            for j in i + 1..visits.len() {
                let origin = &visits[i];
                let destination = &visits[j];
                let between = &visits[i + 1..j];
                let key = PatternKey::new(
                    &route.id,
                    self.stations.slug(origin.station_idx),
                    self.stations.slug(destination.station_idx),
                    between
                        .iter()
                        .map(|visit| self.stations.slug(visit.station_idx)),
                );
                let pattern = tables[origin.station_idx as usize].intern(key, |index, key| {
                    Pattern::new(
                        index,
                        key,
                        route.id.clone(),
                        route.display_name(),
                        destination.station_idx,
                        between
                            .iter()
                            .map(|visit| PatternStop {
                                station_idx: visit.station_idx,
                                platform_idx: visit.platform_idx,
                            })
                            .collect(),
                    )
                });
                relations.push(Relation {
                    from: i as u32,
                    to: j as u32,
                    pattern,
                });
            }
        }
        Some(TripPlan {
            sequence,
            relations: relations.into(),
        })
    }
}
