use anyhow::Result;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use crate::analyzers::hotspot::find_hotspots;
use crate::analyzers::speed::{KMH_PER_MPS, MAX_VALID_SPEED, SpeedBand, speeds, summarize_band};
use crate::analyzers::types::{AnalysisReport, SessionSummary, SpeedStats};
use crate::analyzers::utility::{mean, stddev};
use crate::config::Config;
use crate::model::VehicleRecord;
use crate::output::{read_records, read_stats};
use crate::time::TimeParser;

/// Loads a finished recording and its statistics and analyzes it.
///
/// A missing statistics file only drops the session section of the report.
pub fn analyze(config: &Config, min_hotspot_size: usize) -> Result<AnalysisReport> {
    let time_parser = config.time_parser()?;
    let mut records = read_records(&config.bus_data_file, &time_parser)?;
    info!(records = records.len(), path = %config.bus_data_file, "Recording loaded");

    let session = load_session(&config.bus_recording_stats_file, &time_parser);

    sort_by_vehicle(&mut records);
    let mut report = analyze_records(&records, min_hotspot_size);
    report.session = session;
    Ok(report)
}

fn load_session(path: &str, time_parser: &TimeParser) -> Option<SessionSummary> {
    if !Path::new(path).exists() {
        warn!(path, "No recording statistics found");
        return None;
    }
    match read_stats(path, time_parser) {
        Ok(stats) => {
            stats.log(time_parser);
            let record = stats.to_record(time_parser);
            Some(SessionSummary {
                requests: record.request_count,
                successful_requests: record.successful_request_count,
                records: record.record_count,
                start: record.start_time,
                end: record.end_time,
            })
        }
        Err(e) => {
            warn!(path, error = %e, "Failed to read recording statistics");
            None
        }
    }
}

/// Orders records so each vehicle's samples are contiguous and in time
/// order, which [`analyze_records`] requires.
pub fn sort_by_vehicle(records: &mut [VehicleRecord]) {
    records.sort_by(|a, b| {
        a.vehicle_id
            .cmp(&b.vehicle_id)
            .then(a.timestamp.cmp(&b.timestamp))
    });
}

/// Speed statistics, band summaries and speeding hotspots of `records`.
///
/// `records` must already be grouped by vehicle and sorted by time.
pub fn analyze_records(records: &[VehicleRecord], min_hotspot_size: usize) -> AnalysisReport {
    let speeds = speeds(records);
    let samples: Vec<_> = records.iter().zip(speeds.iter().copied()).collect();

    let plausible: Vec<f64> = speeds
        .iter()
        .flatten()
        .copied()
        .filter(|s| *s < MAX_VALID_SPEED)
        .map(|s| s * KMH_PER_MPS)
        .collect();
    let mean_kmh = mean(&plausible);
    let speed = SpeedStats {
        samples: plausible.len(),
        mean_kmh,
        stddev_kmh: stddev(&plausible, mean_kmh),
    };

    let speeding_band = SpeedBand::speeding();
    let speeding = summarize_band(&samples, speeding_band);
    let implausible = summarize_band(&samples, SpeedBand::implausible());

    let speeding_samples: Vec<(&VehicleRecord, f64)> = samples
        .iter()
        .filter_map(|(rec, speed)| match speed {
            Some(s) if speeding_band.contains(*s) => Some((*rec, *s)),
            _ => None,
        })
        .collect();
    let hotspots: Vec<_> = find_hotspots(&speeding_samples)
        .into_iter()
        .filter(|h| h.members >= min_hotspot_size)
        .collect();

    let vehicles = records
        .iter()
        .map(|r| r.vehicle_id.as_str())
        .collect::<HashSet<_>>()
        .len();

    if let Some(s) = &speeding {
        info!(
            vehicles = s.vehicles_in_band,
            percentage = %format_args!("{:.2}", s.percentage),
            limit_kmh = s.min_kmh,
            "Vehicles that breached the speed limit"
        );
    } else {
        info!("There are no recorded vehicles");
    }
    info!(
        hotspots = hotspots.len(),
        speeding_samples = speeding_samples.len(),
        min_hotspot_size,
        "Speeding hotspots found"
    );

    AnalysisReport {
        session: None,
        records: records.len(),
        vehicles,
        speed,
        speeding,
        implausible,
        min_hotspot_size,
        hotspots,
    }
}
