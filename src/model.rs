//! Domain types shared by the recorder, the departures downloader and the
//! analysis pass.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::hash::{Hash, Hasher};

/// Mean earth radius in meters, the value geodesy libraries use for
/// great-circle distances.
pub const EARTH_RADIUS_M: f64 = 6_371_009.0;

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to `other` in meters (haversine formula).
    pub fn distance_to(&self, other: &Position) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let delta_lat = (other.lat - self.lat).to_radians();
        let delta_lon = (other.lon - self.lon).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_M * c
    }
}

/// One observation of a vehicle taken from a position snapshot.
///
/// Two records are the same observation when they share `vehicle_id` and
/// `timestamp`; the other fields do not take part in equality or hashing.
#[derive(Debug, Clone)]
pub struct VehicleRecord {
    pub vehicle_id: String,
    pub line: String,
    pub brigade: String,
    pub timestamp: NaiveDateTime,
    pub position: Position,
}

impl VehicleRecord {
    pub fn identity(&self) -> (&str, NaiveDateTime) {
        (&self.vehicle_id, self.timestamp)
    }
}

impl PartialEq for VehicleRecord {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for VehicleRecord {}

impl Hash for VehicleRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

/// A scheduled departure of a line's brigade from a bus stop.
#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    pub bus_stop_id: String,
    pub bus_stop_number: String,
    pub line: String,
    pub brigade: String,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BusStop {
    pub bus_stop_id: String,
    pub bus_stop_number: String,
    pub position: Position,
}
