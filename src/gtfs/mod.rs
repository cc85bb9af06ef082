use serde::de::DeserializeOwned;
use std::{
    fs::File,
    io::{self, Read},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::warn;
use zip::ZipArchive;

mod config;
mod data;
pub mod models;
pub use config::*;
pub use data::*;
pub use models::*;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Could not find file with name: {0}")]
    FileNotFound(String),
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),
}

#[derive(Default, Debug)]
pub enum StorageType {
    #[default]
    None,
    Zip(PathBuf),
    Directory(PathBuf),
    Memory(GtfsData),
}

/// Streams typed rows out of a GTFS feed.
///
/// Every `stream_*` function hands each successfully parsed row to the callback
/// together with its position and returns how many rows had to be skipped
/// because they did not deserialize.
#[derive(Default, Debug)]
pub struct GtfsReader {
    config: Config,
    storage: StorageType,
}

impl GtfsReader {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn from_zip<P: AsRef<Path>>(mut self, path: P) -> Result<Self, self::Error> {
        let path = path.as_ref().to_path_buf();
        // Fail early on a file that is not an archive at all.
        ZipArchive::new(File::open(&path)?)?;
        self.storage = StorageType::Zip(path);
        Ok(self)
    }

    pub fn from_directory<P: AsRef<Path>>(mut self, path: P) -> Result<Self, self::Error> {
        let path = path.as_ref().to_path_buf();
        if !path.is_dir() {
            return Err(self::Error::NotADirectory(path));
        }
        self.storage = StorageType::Directory(path);
        Ok(self)
    }

    /// Picks zip or directory storage depending on what `path` points at.
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Result<Self, self::Error> {
        if path.as_ref().is_dir() {
            self.from_directory(path)
        } else {
            self.from_zip(path)
        }
    }

    pub fn from_data(mut self, data: GtfsData) -> Self {
        self.storage = StorageType::Memory(data);
        self
    }

    pub fn stream_stops<F>(&self, f: F) -> Result<usize, self::Error>
    where
        F: FnMut((usize, GtfsStop)),
    {
        self.stream(&self.config.stops_path, |data| &data.stops, f)
    }

    pub fn stream_routes<F>(&self, f: F) -> Result<usize, self::Error>
    where
        F: FnMut((usize, GtfsRoute)),
    {
        self.stream(&self.config.routes_path, |data| &data.routes, f)
    }

    pub fn stream_trips<F>(&self, f: F) -> Result<usize, self::Error>
    where
        F: FnMut((usize, GtfsTrip)),
    {
        self.stream(&self.config.trips_path, |data| &data.trips, f)
    }

    pub fn stream_stop_times<F>(&self, f: F) -> Result<usize, self::Error>
    where
        F: FnMut((usize, GtfsStopTime)),
    {
        self.stream(&self.config.stop_times_path, |data| &data.stop_times, f)
    }

    fn stream<T, S, F>(&self, file_name: &str, select: S, f: F) -> Result<usize, self::Error>
    where
        T: DeserializeOwned + Clone,
        S: Fn(&GtfsData) -> &Vec<T>,
        F: FnMut((usize, T)),
    {
        match &self.storage {
            StorageType::None => Ok(0),
            StorageType::Zip(path) => stream_from_zip(path, file_name, f),
            StorageType::Directory(path) => {
                let path = path.join(file_name);
                if !path.is_file() {
                    return Err(self::Error::FileNotFound(file_name.to_string()));
                }
                stream_from_reader(File::open(path)?, file_name, f)
            }
            StorageType::Memory(data) => {
                select(data).iter().cloned().enumerate().for_each(f);
                Ok(0)
            }
        }
    }
}

fn stream_from_zip<T, F>(zip_path: &Path, file_name: &str, f: F) -> Result<usize, self::Error>
where
    T: DeserializeOwned,
    F: FnMut((usize, T)),
{
    let zip_file = File::open(zip_path)?;
    let mut archive = ZipArchive::new(zip_file)?;
    let index = archive
        .index_for_name(file_name)
        .ok_or(self::Error::FileNotFound(file_name.to_string()))?;
    let file = archive.by_index(index)?;
    stream_from_reader(file, file_name, f)
}

fn stream_from_reader<R, T, F>(reader: R, file_name: &str, f: F) -> Result<usize, self::Error>
where
    R: Read,
    T: DeserializeOwned,
    F: FnMut((usize, T)),
{
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut skipped = 0;
    reader
        .deserialize()
        .filter_map(|row| match row {
            Ok(value) => Some(value),
            Err(err) => {
                if skipped == 0 {
                    warn!("Skipping malformed row in {file_name}: {err}");
                }
                skipped += 1;
                None
            }
        })
        .enumerate()
        .for_each(f);
    Ok(skipped)
}

#[test]
fn memory_storage_streams_rows_in_order() {
    let data = GtfsData {
        routes: vec![
            GtfsRoute {
                route_id: "A".into(),
                ..Default::default()
            },
            GtfsRoute {
                route_id: "B".into(),
                ..Default::default()
            },
        ],
        ..Default::default()
    };
    let reader = GtfsReader::new().from_data(data);
    let mut seen = Vec::new();
    let skipped = reader
        .stream_routes(|(i, route)| seen.push((i, route.route_id)))
        .unwrap();
    assert_eq!(skipped, 0);
    assert_eq!(seen, vec![(0, "A".to_string()), (1, "B".to_string())]);
}

#[test]
fn malformed_rows_are_counted_not_fatal() {
    let csv = "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
               T1,06:41:00,06:41:00,P1,1\n\
               T1,06:44:00,06:44:00,P2,not-a-number\n\
               T1,06:45:00,06:45:00,P3,3\n";
    let mut rows = Vec::new();
    let skipped = stream_from_reader(csv.as_bytes(), "stop_times.txt", |(_, st): (usize, GtfsStopTime)| {
        rows.push(st.stop_id)
    })
    .unwrap();
    assert_eq!(skipped, 1);
    assert_eq!(rows, vec!["P1".to_string(), "P3".to_string()]);
}
