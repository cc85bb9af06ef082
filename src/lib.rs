pub mod calendar;
pub mod diagnostics;
pub mod gtfs;
pub mod publish;
pub mod repository;
pub mod schedule;
pub mod shared;
pub mod station;

pub mod prelude {
    pub use crate::calendar::{ActiveServices, ServiceDays};
    pub use crate::diagnostics::Diagnostics;
    pub use crate::gtfs::GtfsReader;
    pub use crate::publish::Publisher;
    pub use crate::repository::Repository;
    pub use crate::schedule::{
        Compactor,
        decode::{Departure, decode_departures},
        encode::{Artifacts, CompactTrip, PatternFile, ScheduleFile},
    };
    pub use crate::shared::time::Time;
    pub use crate::station::{StationResolver, StationRoster, slugify};
}
