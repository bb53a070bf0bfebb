//! Data types produced by the analysis pass.

use serde::Serialize;

use crate::model::Position;

/// Vehicles with at least one sample in a speed band.
#[derive(Debug, Clone, Serialize)]
pub struct BandSummary {
    pub min_kmh: f64,
    pub max_kmh: Option<f64>,
    pub vehicles_in_band: usize,
    pub total_vehicles: usize,
    pub percentage: f64,
}

/// A group of samples around a seed sample's position.
#[derive(Debug, Clone, Serialize)]
pub struct Hotspot {
    pub position: Position,
    pub members: usize,
}

/// Mean and spread of the plausible speeds in a recording, in km/h.
#[derive(Debug, Clone, Serialize)]
pub struct SpeedStats {
    pub samples: usize,
    pub mean_kmh: f64,
    pub stddev_kmh: f64,
}

/// Session counters as loaded from the statistics file.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub requests: u64,
    pub successful_requests: u64,
    pub records: u64,
    pub start: String,
    pub end: String,
}

/// Everything the `analyze` command reports for one recording.
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub session: Option<SessionSummary>,
    pub records: usize,
    pub vehicles: usize,
    pub speed: SpeedStats,
    pub speeding: Option<BandSummary>,
    pub implausible: Option<BandSummary>,
    pub min_hotspot_size: usize,
    pub hotspots: Vec<Hotspot>,
}
