use std::ops::AddAssign;

use tracing::{info, warn};

/// Record-scoped data-quality problems seen during one run.
///
/// None of these abort processing; they are tallied so that regressions in the
/// upstream feed show up in the run summary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostics {
    /// Tables that were expected in the feed but not present.
    pub missing_tables: usize,
    /// CSV rows that failed to deserialize.
    pub malformed_rows: usize,
    /// Trips naming a route that is not in `routes.txt`.
    pub unknown_routes: usize,
    /// Stop times naming a trip that is not in `trips.txt`.
    pub unknown_trips: usize,
    /// Stop times whose platform is not owned by any station.
    pub unresolved_platforms: usize,
    /// Clock strings that could not be parsed and fell back to midnight.
    pub malformed_times: usize,
    /// Trips that resolved to fewer than two stations.
    pub short_trips: usize,
    /// Trips that visit the same station twice, non-consecutively.
    pub revisiting_trips: usize,
}

impl AddAssign for Diagnostics {
    fn add_assign(&mut self, rhs: Self) {
        self.missing_tables += rhs.missing_tables;
        self.malformed_rows += rhs.malformed_rows;
        self.unknown_routes += rhs.unknown_routes;
        self.unknown_trips += rhs.unknown_trips;
        self.unresolved_platforms += rhs.unresolved_platforms;
        self.malformed_times += rhs.malformed_times;
        self.short_trips += rhs.short_trips;
        self.revisiting_trips += rhs.revisiting_trips;
    }
}

impl Diagnostics {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }

    pub fn log_summary(&self) {
        if self.is_clean() {
            info!("No data quality problems found");
            return;
        }
        let counts = [
            ("missing tables", self.missing_tables),
            ("malformed rows", self.malformed_rows),
            ("trips with unknown route", self.unknown_routes),
            ("stop times with unknown trip", self.unknown_trips),
            ("stop times with unresolved platform", self.unresolved_platforms),
            ("malformed clock times", self.malformed_times),
            ("trips with fewer than two stations", self.short_trips),
            ("trips revisiting a station", self.revisiting_trips),
        ];
        counts
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .for_each(|(what, count)| warn!("Skipped or patched {count} {what}"));
    }
}

#[test]
fn add_assign_sums_every_counter() {
    let mut a = Diagnostics {
        short_trips: 1,
        ..Default::default()
    };
    a += Diagnostics {
        short_trips: 2,
        revisiting_trips: 1,
        ..Default::default()
    };
    assert_eq!(a.short_trips, 3);
    assert_eq!(a.revisiting_trips, 1);
    assert!(!a.is_clean());
}
