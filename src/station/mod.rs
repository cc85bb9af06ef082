use std::{collections::HashMap, io, sync::Arc};
use thiserror::Error;
use tracing::debug;

mod roster;
mod slug;
pub use roster::*;
pub use slug::*;

use crate::{repository::Repository, shared::geo::Coordinate};

/// Problems with the station roster itself. Any of these invalidates the run.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Roster is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Stations {first:?} and {second:?} both resolve to slug {slug:?}")]
    SlugCollision {
        slug: String,
        first: String,
        second: String,
    },
    #[error("Station name {0:?} has no usable characters for a slug")]
    EmptySlug(String),
    #[error("Platform {platform:?} is claimed by both {first:?} and {second:?}")]
    PlatformConflict {
        platform: String,
        first: String,
        second: String,
    },
}

#[derive(Debug, Clone)]
pub struct Station {
    pub index: u32,
    /// Stable identifier derived from the name, see [`slugify`].
    pub slug: Arc<str>,
    pub name: Arc<str>,
    /// Indexes into [`StationResolver::platforms`].
    pub platforms: Box<[u32]>,
    pub coordinate: Option<Coordinate>,
}

#[derive(Debug, Clone)]
pub struct Platform {
    pub index: u32,
    pub id: Arc<str>,
    pub station_idx: u32,
    /// What riders see on the sign, `platform_code` or the id.
    pub code: Arc<str>,
    pub name: Arc<str>,
}

/// Maps platforms to the stations that own them.
///
/// Built once per run from a [`StationRoster`]; the feed is only consulted for
/// platform codes, names and coordinates.
#[derive(Debug, Clone, Default)]
pub struct StationResolver {
    stations: Box<[Station]>,
    platforms: Box<[Platform]>,
    platform_lookup: HashMap<Arc<str>, u32>,
    slug_lookup: HashMap<Arc<str>, u32>,
}

impl StationResolver {
    /// Validates the roster and builds the lookups.
    ///
    /// Fails when two stations share a slug or one platform is listed under two
    /// stations.
    pub fn new(roster: &StationRoster, repository: &Repository) -> Result<Self, self::Error> {
        let mut stations: Vec<Station> = Vec::with_capacity(roster.entries.len());
        let mut platforms: Vec<Platform> = Vec::new();
        let mut platform_lookup: HashMap<Arc<str>, u32> = HashMap::new();
        let mut slug_lookup: HashMap<Arc<str>, u32> = HashMap::new();

        for entry in roster.entries.iter() {
            let slug = slugify(&entry.station_name);
            if slug.is_empty() {
                return Err(self::Error::EmptySlug(entry.station_name.clone()));
            }
            if let Some(existing) = slug_lookup.get(slug.as_str()) {
                return Err(self::Error::SlugCollision {
                    slug,
                    first: stations[*existing as usize].name.to_string(),
                    second: entry.station_name.clone(),
                });
            }

            let station_idx = stations.len() as u32;
            let name: Arc<str> = entry.station_name.trim().into();
            let mut owned: Vec<u32> = Vec::with_capacity(entry.platform_ids.len());
            for platform_id in entry.platform_ids.iter() {
                if let Some(existing) = platform_lookup.get(platform_id.as_str()) {
                    let owner = platforms[*existing as usize].station_idx;
                    if owner == station_idx {
                        continue;
                    }
                    return Err(self::Error::PlatformConflict {
                        platform: platform_id.clone(),
                        first: stations[owner as usize].name.to_string(),
                        second: entry.station_name.clone(),
                    });
                }
                let stop = repository.stop_by_id(platform_id);
                let id: Arc<str> = match stop {
                    Some(stop) => stop.id.clone(),
                    None => platform_id.as_str().into(),
                };
                let platform = Platform {
                    index: platforms.len() as u32,
                    code: stop
                        .and_then(|stop| stop.platform_code.clone())
                        .unwrap_or_else(|| id.clone()),
                    name: stop
                        .and_then(|stop| stop.name.clone())
                        .unwrap_or_else(|| name.clone()),
                    id,
                    station_idx,
                };
                platform_lookup.insert(platform.id.clone(), platform.index);
                owned.push(platform.index);
                platforms.push(platform);
            }

            let coordinate = match (entry.lat, entry.lng) {
                (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)),
                _ => Coordinate::centroid(owned.iter().filter_map(|idx| {
                    repository
                        .stop_by_id(&platforms[*idx as usize].id)
                        .and_then(|stop| stop.coordinate)
                })),
            };

            let slug: Arc<str> = slug.into();
            slug_lookup.insert(slug.clone(), station_idx);
            stations.push(Station {
                index: station_idx,
                slug,
                name,
                platforms: owned.into(),
                coordinate,
            });
        }

        debug!(
            "Resolved {} stations owning {} platforms",
            stations.len(),
            platforms.len()
        );
        Ok(Self {
            stations: stations.into(),
            platforms: platforms.into(),
            platform_lookup,
            slug_lookup,
        })
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn station(&self, station_idx: u32) -> &Station {
        &self.stations[station_idx as usize]
    }

    pub fn platform(&self, platform_idx: u32) -> &Platform {
        &self.platforms[platform_idx as usize]
    }

    pub fn platform_by_id(&self, platform_id: &str) -> Option<&Platform> {
        let index = self.platform_lookup.get(platform_id)?;
        Some(&self.platforms[*index as usize])
    }

    /// The station owning the platform, `None` for platforms outside the roster.
    pub fn station_by_platform_id(&self, platform_id: &str) -> Option<&Station> {
        let platform = self.platform_by_id(platform_id)?;
        Some(self.station(platform.station_idx))
    }

    pub fn station_by_slug(&self, slug: &str) -> Option<&Station> {
        let index = self.slug_lookup.get(slug)?;
        Some(&self.stations[*index as usize])
    }

    pub fn slug(&self, station_idx: u32) -> &str {
        &self.station(station_idx).slug
    }

    pub fn platform_ids(&self, station_idx: u32) -> impl Iterator<Item = &str> {
        self.station(station_idx)
            .platforms
            .iter()
            .map(|idx| self.platforms[*idx as usize].id.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtfs::{GtfsData, GtfsReader, GtfsStop};

    fn entry(name: &str, platforms: &[&str]) -> RosterEntry {
        RosterEntry {
            station_name: name.into(),
            platform_ids: platforms.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    fn repository() -> Repository {
        let data = GtfsData {
            stops: vec![
                GtfsStop {
                    stop_id: "600001".into(),
                    stop_name: Some("Bowen Hills platform 1".into()),
                    stop_lat: Some(-27.0),
                    stop_lon: Some(153.0),
                    platform_code: Some("1".into()),
                    ..Default::default()
                },
                GtfsStop {
                    stop_id: "600002".into(),
                    stop_lat: Some(-28.0),
                    stop_lon: Some(154.0),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        Repository::new()
            .load_gtfs(GtfsReader::new().from_data(data))
            .unwrap()
    }

    #[test]
    fn resolves_platforms_to_stations() {
        let roster = StationRoster::new(vec![
            entry("Bowen Hills", &["600001", "600002"]),
            entry("Fortitude Valley", &["600011"]),
        ]);
        let resolver = StationResolver::new(&roster, &repository()).unwrap();

        let station = resolver.station_by_platform_id("600002").unwrap();
        assert_eq!(&*station.slug, "BOWEN_HILLS");
        assert_eq!(
            resolver.platform_ids(station.index).collect::<Vec<_>>(),
            vec!["600001", "600002"]
        );
        assert_eq!(station.coordinate, Some(Coordinate::new(-27.5, 153.5)));
        assert!(resolver.station_by_platform_id("999").is_none());
        assert_eq!(
            resolver.station_by_slug("FORTITUDE_VALLEY").unwrap().name.as_ref(),
            "Fortitude Valley"
        );

        let platform = resolver.platform_by_id("600001").unwrap();
        assert_eq!(platform.code.as_ref(), "1");
        assert_eq!(platform.name.as_ref(), "Bowen Hills platform 1");
        let platform = resolver.platform_by_id("600002").unwrap();
        assert_eq!(platform.code.as_ref(), "600002");
        assert_eq!(platform.name.as_ref(), "Bowen Hills");
    }

    #[test]
    fn slug_collision_is_fatal() {
        let roster = StationRoster::new(vec![
            entry("Bowen Hills", &["600001"]),
            entry("Bowen hills ", &["600002"]),
        ]);
        let err = StationResolver::new(&roster, &repository()).unwrap_err();
        assert!(matches!(err, Error::SlugCollision { ref slug, .. } if slug == "BOWEN_HILLS"));
    }

    #[test]
    fn shared_platform_is_fatal() {
        let roster = StationRoster::new(vec![
            entry("Bowen Hills", &["600001"]),
            entry("Fortitude Valley", &["600001"]),
        ]);
        assert!(matches!(
            StationResolver::new(&roster, &repository()),
            Err(Error::PlatformConflict { .. })
        ));
    }
}
