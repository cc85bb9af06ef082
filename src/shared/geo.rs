use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}, {}", self.latitude, self.longitude))
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Average position of all coordinates, `None` when the iterator is empty.
    pub fn centroid<I: IntoIterator<Item = Self>>(iter: I) -> Option<Self> {
        let mut count: usize = 0;
        let mut lat: f64 = 0.0;
        let mut lon: f64 = 0.0;
        iter.into_iter().for_each(|coordinate| {
            count += 1;
            lat += coordinate.latitude;
            lon += coordinate.longitude;
        });
        if count == 0 {
            return None;
        }
        let count = count as f64;
        Some(Self {
            latitude: lat / count,
            longitude: lon / count,
        })
    }
}

#[test]
fn centroid_of_nothing_is_none() {
    assert!(Coordinate::centroid(Vec::new()).is_none());
}

#[test]
fn centroid_averages() {
    let c = Coordinate::centroid([Coordinate::new(1.0, 2.0), Coordinate::new(3.0, 4.0)]).unwrap();
    assert_eq!(c, Coordinate::new(2.0, 3.0));
}
