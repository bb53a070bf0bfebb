//! Instantaneous speeds between consecutive samples of a vehicle.

use std::collections::HashSet;

use crate::analyzers::types::BandSummary;
use crate::model::VehicleRecord;
use crate::stats::pct;

pub const KMH_PER_MPS: f64 = 3.6;

/// Urban speed limit, in m/s.
pub const MAX_LEGAL_SPEED: f64 = 50.0 / KMH_PER_MPS;

/// Anything faster than this is treated as a GPS glitch, in m/s.
pub const MAX_VALID_SPEED: f64 = 90.0 / KMH_PER_MPS;

/// Speed in m/s needed to get from `prev` to `next`.
///
/// `None` unless `next` is strictly later than `prev`: a zero time delta
/// has no meaningful speed.
pub fn speed_between(prev: &VehicleRecord, next: &VehicleRecord) -> Option<f64> {
    let seconds = (next.timestamp - prev.timestamp).num_milliseconds() as f64 / 1000.0;
    if seconds <= 0.0 {
        return None;
    }
    Some(prev.position.distance_to(&next.position) / seconds)
}

/// Speed at every index of `records`, which must hold each vehicle's
/// samples contiguously and in time order.
///
/// The first sample of every vehicle has no speed.
pub fn speeds(records: &[VehicleRecord]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(records.len());
    if records.is_empty() {
        return out;
    }

    out.push(None);
    for pair in records.windows(2) {
        let (prev, rec) = (&pair[0], &pair[1]);
        if prev.vehicle_id == rec.vehicle_id {
            out.push(speed_between(prev, rec));
        } else {
            out.push(None);
        }
    }
    out
}

/// Half-open speed range `[min, max)` in m/s; no `max` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedBand {
    pub min: f64,
    pub max: Option<f64>,
}

impl SpeedBand {
    pub fn new(min: f64, max: Option<f64>) -> Self {
        Self { min, max }
    }

    /// Over the limit but still plausible.
    pub fn speeding() -> Self {
        Self::new(MAX_LEGAL_SPEED, Some(MAX_VALID_SPEED))
    }

    pub fn implausible() -> Self {
        Self::new(MAX_VALID_SPEED, None)
    }

    pub fn contains(&self, speed: f64) -> bool {
        speed >= self.min && self.max.is_none_or(|max| speed < max)
    }
}

/// How many distinct vehicles have at least one sample within `band`,
/// out of all vehicles in `samples`. `None` for an empty input.
pub fn summarize_band(samples: &[(&VehicleRecord, Option<f64>)], band: SpeedBand) -> Option<BandSummary> {
    if samples.is_empty() {
        return None;
    }

    let mut all = HashSet::new();
    let mut in_band = HashSet::new();
    for (record, speed) in samples {
        all.insert(record.vehicle_id.as_str());
        if speed.is_some_and(|s| band.contains(s)) {
            in_band.insert(record.vehicle_id.as_str());
        }
    }

    Some(BandSummary {
        min_kmh: band.min * KMH_PER_MPS,
        max_kmh: band.max.map(|m| m * KMH_PER_MPS),
        vehicles_in_band: in_band.len(),
        total_vehicles: all.len(),
        percentage: pct(in_band.len(), all.len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Position;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, s)
            .unwrap()
    }

    fn record(id: &str, s: u32, lat: f64, lon: f64) -> VehicleRecord {
        VehicleRecord {
            vehicle_id: id.to_string(),
            line: "1".to_string(),
            brigade: "1".to_string(),
            timestamp: at(s),
            position: Position::new(lat, lon),
        }
    }

    #[test]
    fn test_speed_between_known_positions() {
        let a = record("1000", 0, 52.248455, 21.044827);
        let b = record("1000", 10, 52.249000, 21.046000);

        let expected = a.position.distance_to(&b.position) / 10.0;
        let speed = speed_between(&a, &b).unwrap();

        assert!((speed - expected).abs() < 1e-9);
        assert!((speed - 10.02).abs() < 0.05);
    }

    #[test]
    fn test_speed_between_zero_delta_is_none() {
        let a = record("1000", 5, 52.0, 21.0);
        let b = record("1000", 5, 52.001, 21.0);
        assert_eq!(speed_between(&a, &b), None);
    }

    #[test]
    fn test_speeds_first_sample_of_each_vehicle_is_none() {
        let records = vec![
            record("1000", 0, 52.248455, 21.044827),
            record("1000", 10, 52.249000, 21.046000),
            record("2000", 0, 52.0, 21.0),
            record("2000", 20, 52.0, 21.0),
        ];

        let speeds = speeds(&records);

        assert_eq!(speeds.len(), 4);
        assert_eq!(speeds[0], None);
        assert!(speeds[1].is_some());
        assert_eq!(speeds[2], None);
        assert_eq!(speeds[3], Some(0.0));
    }

    #[test]
    fn test_speeds_empty_input() {
        assert!(speeds(&[]).is_empty());
    }

    #[test]
    fn test_band_is_half_open() {
        let band = SpeedBand::new(10.0, Some(20.0));
        assert!(band.contains(10.0));
        assert!(band.contains(19.99));
        assert!(!band.contains(20.0));
        assert!(!band.contains(9.99));

        assert!(SpeedBand::implausible().contains(1000.0));
    }

    #[test]
    fn test_summarize_band_counts_distinct_vehicles() {
        let a1 = record("1000", 0, 52.0, 21.0);
        let a2 = record("1000", 10, 52.0, 21.0);
        let a3 = record("1000", 20, 52.0, 21.0);
        let b1 = record("2000", 0, 52.0, 21.0);
        let b2 = record("2000", 10, 52.0, 21.0);
        let c1 = record("3000", 0, 52.0, 21.0);
        let samples = vec![
            (&a1, None),
            (&a2, Some(15.0)),
            (&a3, Some(16.0)),
            (&b1, None),
            (&b2, Some(5.0)),
            (&c1, None),
        ];

        let summary = summarize_band(&samples, SpeedBand::speeding()).unwrap();

        assert_eq!(summary.vehicles_in_band, 1);
        assert_eq!(summary.total_vehicles, 3);
        assert!((summary.percentage - 100.0 / 3.0).abs() < 1e-9);
        assert!((summary.min_kmh - 50.0).abs() < 1e-9);
        assert_eq!(summary.max_kmh.map(|m| m.round()), Some(90.0));
    }

    #[test]
    fn test_summarize_band_empty_input() {
        assert!(summarize_band(&[], SpeedBand::speeding()).is_none());
    }
}
