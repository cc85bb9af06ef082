use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs::File, io::Read, path::Path};

use crate::{
    repository::{LocationType, Repository},
    station,
};

/// One station as listed by whoever operates the departure board.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub station_name: String,
    pub platform_ids: Vec<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

/// The list of stations and the platforms each one owns.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(transparent)]
pub struct StationRoster {
    pub entries: Vec<RosterEntry>,
}

impl StationRoster {
    pub fn new(entries: Vec<RosterEntry>) -> Self {
        Self { entries }
    }

    /// Reads a JSON array of `{stationName, platformIds, lat?, lng?}`.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, station::Error> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, station::Error> {
        Self::from_json_reader(File::open(path)?)
    }

    /// Derives a roster from the `parent_station` hierarchy of the feed.
    ///
    /// Stations (`location_type = 1`) own their child stops; stops without a
    /// parent stand for themselves. Entries with the same trimmed name are
    /// merged, which is how feeds model the two sides of one street stop.
    /// Different names that share a slug stay separate, so
    /// [`StationResolver::new`](super::StationResolver::new) rejects them.
    pub fn from_repository(repository: &Repository) -> Self {
        let mut by_name: HashMap<String, usize> = HashMap::new();
        let mut entries: Vec<RosterEntry> = Vec::new();
        repository
            .stops
            .iter()
            .filter_map(|stop| {
                let platform_ids: Vec<String> = match stop.location_type {
                    LocationType::Station => repository
                        .stops_by_station_idx(stop.index)
                        .iter()
                        .map(|idx| &repository.stops[*idx as usize])
                        .filter(|child| child.location_type == LocationType::Stop)
                        .map(|child| child.id.to_string())
                        .collect(),
                    LocationType::Stop if stop.parent_idx.is_none() => vec![stop.id.to_string()],
                    _ => return None,
                };
                let name = stop.name.as_deref().unwrap_or(&stop.id).to_string();
                Some((name, platform_ids, stop.coordinate))
            })
            .for_each(|(name, platform_ids, coordinate)| {
                if let Some(idx) = by_name.get(name.trim()) {
                    entries[*idx].platform_ids.extend(platform_ids);
                    return;
                }
                by_name.insert(name.trim().to_string(), entries.len());
                entries.push(RosterEntry {
                    station_name: name,
                    platform_ids,
                    lat: coordinate.map(|c| c.latitude),
                    lng: coordinate.map(|c| c.longitude),
                });
            });
        Self { entries }
    }
}
