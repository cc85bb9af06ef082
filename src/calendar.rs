//! Which services run on which dates.
//!
//! Resolving `calendar.txt` and `calendar_dates.txt` into active services is
//! somebody else's job. The compactor only needs the answer, through
//! [`ActiveServices`].

use chrono::NaiveDate;
use serde::Deserialize;
use std::{
    collections::{BTreeMap, HashSet},
    fs::File,
    io::{self, Read},
    path::Path,
    sync::Arc,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid date {0:?}, expected YYYYMMDD")]
    InvalidDate(String),
}

/// Trusted source of "service ids active on a date".
pub trait ActiveServices {
    fn active_services(&self, date: NaiveDate) -> HashSet<Arc<str>>;
}

impl<F> ActiveServices for F
where
    F: Fn(NaiveDate) -> HashSet<Arc<str>>,
{
    fn active_services(&self, date: NaiveDate) -> HashSet<Arc<str>> {
        self(date)
    }
}

/// A precomputed date to service-id table.
#[derive(Debug, Default, Clone)]
pub struct ServiceDays {
    by_date: BTreeMap<NaiveDate, HashSet<Arc<str>>>,
}

#[derive(Deserialize)]
struct ServiceDayRow {
    date: String,
    service_id: String,
}

impl ServiceDays {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn insert(&mut self, date: NaiveDate, service_id: impl Into<Arc<str>>) {
        self.by_date
            .entry(date)
            .or_default()
            .insert(service_id.into());
    }

    pub fn with(mut self, date: NaiveDate, service_id: impl Into<Arc<str>>) -> Self {
        self.insert(date, service_id);
        self
    }

    /// Reads a `date,service_id` table with GTFS style `YYYYMMDD` dates.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, self::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut days = Self::new();
        for row in reader.deserialize() {
            let row: ServiceDayRow = row?;
            let date = NaiveDate::parse_from_str(&row.date, "%Y%m%d")
                .map_err(|_| self::Error::InvalidDate(row.date.clone()))?;
            days.insert(date, row.service_id);
        }
        Ok(days)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, self::Error> {
        Self::from_csv_reader(File::open(path)?)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.by_date.keys().next().copied()
    }
}

impl ActiveServices for ServiceDays {
    fn active_services(&self, date: NaiveDate) -> HashSet<Arc<str>> {
        self.by_date.get(&date).cloned().unwrap_or_default()
    }
}

#[test]
fn service_days_from_csv() {
    let csv = "date,service_id\n20240304,WK\n20240304,ALL\n20240309,SAT\n";
    let days = ServiceDays::from_csv_reader(csv.as_bytes()).unwrap();
    let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
    let active = days.active_services(monday);
    assert_eq!(active.len(), 2);
    assert!(active.contains("WK"));
    assert_eq!(days.first_date(), Some(monday));
    assert!(
        days.active_services(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap())
            .is_empty()
    );
}

#[test]
fn service_days_reject_bad_dates() {
    let csv = "date,service_id\n2024-03-04,WK\n";
    assert!(matches!(
        ServiceDays::from_csv_reader(csv.as_bytes()),
        Err(Error::InvalidDate(_))
    ));
}
