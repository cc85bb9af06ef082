use crate::gtfs::{GtfsRoute, GtfsStop, GtfsStopTime, GtfsTrip};

/// A fully materialized feed, used as in-memory storage for [`super::GtfsReader`].
#[derive(Default, Debug, Clone)]
pub struct GtfsData {
    pub stops: Vec<GtfsStop>,
    pub routes: Vec<GtfsRoute>,
    pub trips: Vec<GtfsTrip>,
    pub stop_times: Vec<GtfsStopTime>,
}
