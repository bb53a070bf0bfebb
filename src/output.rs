//! Flat-file persistence for recordings, bus stops, departures and
//! statistics.
//!
//! Row files are header-less CSV; statistics and reports are JSON.

use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

use crate::model::{BusStop, Departure, Position, VehicleRecord};
use crate::stats::{RecordingStatistics, StatisticsRecord};
use crate::time::TimeParser;

/// Logs a value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Writes `rows` to a header-less CSV file at `path`, replacing any
/// previous content.
pub fn write_rows<T: Serialize>(path: impl AsRef<Path>, rows: impl IntoIterator<Item = T>) -> Result<usize> {
    let path = path.as_ref();
    create_parent_dir(path)?;

    let file = File::create(path).with_context(|| format!("failed to create '{}'", path.display()))?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

    let mut count = 0;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }
    writer.flush()?;

    debug!(path = %path.display(), rows = count, "CSV rows written");
    Ok(count)
}

/// Writes accepted records as `vehicle_id, line, brigade, timestamp, lat, lon`
/// rows in the given order.
pub fn write_records(path: impl AsRef<Path>, records: &[VehicleRecord], time_parser: &TimeParser) -> Result<usize> {
    write_rows(
        path,
        records.iter().map(|r| {
            (
                r.vehicle_id.as_str(),
                r.line.as_str(),
                r.brigade.as_str(),
                time_parser.format(&r.timestamp),
                r.position.lat,
                r.position.lon,
            )
        }),
    )
}

/// Reads records written by [`write_records`].
pub fn read_records(path: impl AsRef<Path>, time_parser: &TimeParser) -> Result<Vec<VehicleRecord>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("failed to open '{}'", path.display()))?;
    let mut rdr = ReaderBuilder::new().has_headers(false).from_reader(file);

    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let (vehicle_id, line, brigade, time, lat, lon): (String, String, String, String, f64, f64) =
            result.with_context(|| format!("malformed row in '{}'", path.display()))?;
        records.push(VehicleRecord {
            vehicle_id,
            line,
            brigade,
            timestamp: time_parser.parse(&time)?,
            position: Position::new(lat, lon),
        });
    }

    Ok(records)
}

/// Writes bus stops as `id, number, lat, lon` rows.
pub fn write_bus_stops(path: impl AsRef<Path>, stops: &[BusStop]) -> Result<usize> {
    write_rows(
        path,
        stops.iter().map(|s| {
            (
                s.bus_stop_id.as_str(),
                s.bus_stop_number.as_str(),
                s.position.lat,
                s.position.lon,
            )
        }),
    )
}

/// Writes departures as `stop_id, stop_number, line, brigade, time` rows.
pub fn write_departures(path: impl AsRef<Path>, departures: &[Departure], time_parser: &TimeParser) -> Result<usize> {
    write_rows(
        path,
        departures.iter().map(|d| {
            (
                d.bus_stop_id.as_str(),
                d.bus_stop_number.as_str(),
                d.line.as_str(),
                d.brigade.as_str(),
                time_parser.format(&d.timestamp),
            )
        }),
    )
}

pub fn write_stats(path: impl AsRef<Path>, stats: &RecordingStatistics, time_parser: &TimeParser) -> Result<()> {
    write_json(path, &stats.to_record(time_parser))
}

pub fn read_stats(path: impl AsRef<Path>, time_parser: &TimeParser) -> Result<RecordingStatistics> {
    let path = path.as_ref();
    let content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read '{}'", path.display()))?;
    let record: StatisticsRecord = serde_json::from_str(&content)
        .with_context(|| format!("invalid statistics file '{}'", path.display()))?;
    RecordingStatistics::from_record(&record, time_parser)
}

pub fn write_json(path: impl AsRef<Path>, value: &impl Serialize) -> Result<()> {
    let path = path.as_ref();
    create_parent_dir(path)?;
    let file = File::create(path).with_context(|| format!("failed to create '{}'", path.display()))?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::env;
    use std::fs;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    fn parser() -> TimeParser {
        TimeParser::new("%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn record(id: &str, sec: u32) -> VehicleRecord {
        VehicleRecord {
            vehicle_id: id.to_string(),
            line: "523".to_string(),
            brigade: "7".to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(10, 0, sec)
                .unwrap(),
            position: Position::new(52.248455, 21.044827),
        }
    }

    #[test]
    fn test_print_json_does_not_panic() {
        let stats = RecordingStatistics::empty(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
        );
        print_json(&stats.to_record(&parser())).unwrap();
    }

    #[test]
    fn test_write_records_layout() {
        let path = temp_path("bus_recorder_test_records_layout.csv");
        let _ = fs::remove_file(&path);

        let written = write_records(&path, &[record("1000", 0), record("1001", 5)], &parser()).unwrap();

        assert_eq!(written, 2);
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "1000,523,7,2024-01-01 10:00:00,52.248455,21.044827");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_read_records_restores_order_and_fields() {
        let path = temp_path("bus_recorder_test_records_read.csv");
        let _ = fs::remove_file(&path);
        let records = vec![record("1001", 5), record("1000", 0)];

        write_records(&path, &records, &parser()).unwrap();
        let read = read_records(&path, &parser()).unwrap();

        assert_eq!(read, records);
        assert_eq!(read[0].position, records[0].position);
        assert_eq!(read[1].line, "523");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_records_overwrites() {
        let path = temp_path("bus_recorder_test_records_overwrite.csv");
        let _ = fs::remove_file(&path);

        write_records(&path, &[record("1000", 0), record("1000", 1)], &parser()).unwrap();
        write_records(&path, &[record("1000", 2)], &parser()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_stats_file_round_trip() {
        let path = temp_path("bus_recorder_test_stats.json");
        let _ = fs::remove_file(&path);
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(9, 59, 0).unwrap();
        let stats = RecordingStatistics {
            request_count: 12,
            successful_request_count: 10,
            record_count: 345,
            window_start: start,
            window_end: start + chrono::Duration::minutes(60),
        };

        write_stats(&path, &stats, &parser()).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"Number of successful requests\": 10"));
        assert!(content.contains("\"Processing end time\": \"2024-01-01 10:59:00\""));

        assert_eq!(read_stats(&path, &parser()).unwrap(), stats);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_departures_creates_folder() {
        let dir = temp_path("bus_recorder_test_departures_dir");
        let _ = fs::remove_dir_all(&dir);
        let departure = Departure {
            bus_stop_id: "1001".to_string(),
            bus_stop_number: "01".to_string(),
            line: "523".to_string(),
            brigade: "3".to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(5, 27, 0).unwrap(),
        };

        write_departures(dir.join("1.csv"), &[departure], &parser()).unwrap();

        let content = fs::read_to_string(dir.join("1.csv")).unwrap();
        assert_eq!(content.trim_end(), "1001,01,523,3,2024-01-01 05:27:00");

        fs::remove_dir_all(&dir).unwrap();
    }
}
