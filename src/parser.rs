//! JSON parsing for open-data API responses.
//!
//! Every endpoint wraps its payload as `{"result": [...]}`. On failure the
//! API still answers with HTTP 200 but puts an error message in `result`.

use anyhow::{Context, Result, anyhow, bail};
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use tracing::warn;

use crate::model::{BusStop, Departure, Position, VehicleRecord};
use crate::time::TimeParser;

/// A response is well formed when it has a `result` field holding a list.
pub fn is_response_valid(response: &Value) -> bool {
    matches!(response.get("result"), Some(Value::Array(_)))
}

/// The API's explanation for a malformed response, for logging.
pub fn api_error_message(response: &Value) -> String {
    match response.get("result") {
        Some(Value::String(msg)) => msg.clone(),
        Some(other) => other.to_string(),
        None => response.to_string(),
    }
}

/// Entries of a well-formed response; empty for anything else.
pub fn result_entries(response: &Value) -> &[Value] {
    response
        .get("result")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn str_field<'a>(entry: &'a Value, key: &str) -> Result<&'a str> {
    entry
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("missing or non-string field '{key}'"))
}

fn f64_field(entry: &Value, key: &str) -> Result<f64> {
    entry
        .get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| anyhow!("missing or non-numeric field '{key}'"))
}

/// Decodes one entry of a vehicle position snapshot.
///
/// # Errors
///
/// Returns an error if a field is missing, has the wrong type, or `Time`
/// does not match the configured format.
pub fn vehicle_record_from_json(entry: &Value, time_parser: &TimeParser) -> Result<VehicleRecord> {
    Ok(VehicleRecord {
        vehicle_id: str_field(entry, "VehicleNumber")?.to_string(),
        line: str_field(entry, "Lines")?.to_string(),
        brigade: str_field(entry, "Brigade")?.to_string(),
        timestamp: time_parser.parse(str_field(entry, "Time")?)?,
        position: Position::new(f64_field(entry, "Lat")?, f64_field(entry, "Lon")?),
    })
}

/// Decodes every entry of a well-formed snapshot, dropping (and logging)
/// the ones that fail to parse.
pub fn parse_vehicle_records(response: &Value, time_parser: &TimeParser) -> Vec<VehicleRecord> {
    result_entries(response)
        .iter()
        .filter_map(|entry| match vehicle_record_from_json(entry, time_parser) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Error while parsing vehicle record");
                None
            }
        })
        .collect()
}

/// The `values` list of a key/value table row:
/// `{"values": [{"key": "...", "value": "..."}, ...]}`.
fn table_value(entry: &Value, index: usize) -> Result<&str> {
    entry
        .get("values")
        .and_then(|v| v.get(index))
        .and_then(|v| v.get("value"))
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("missing table value at index {index}"))
}

pub fn bus_stop_from_json(entry: &Value) -> Result<BusStop> {
    let lat = table_value(entry, 4)?;
    let lon = table_value(entry, 5)?;
    Ok(BusStop {
        bus_stop_id: table_value(entry, 0)?.to_string(),
        bus_stop_number: table_value(entry, 1)?.to_string(),
        position: Position::new(
            lat.parse().with_context(|| format!("invalid latitude '{lat}'"))?,
            lon.parse().with_context(|| format!("invalid longitude '{lon}'"))?,
        ),
    })
}

pub fn line_from_json(entry: &Value) -> Result<String> {
    Ok(table_value(entry, 0)?.to_string())
}

/// Resolves a timetable clock time against `today`.
///
/// Timetables run past midnight as `24:15:00`, `25:03:00`, ...; those hours
/// wrap onto the following day.
pub fn departure_time(raw: &str, today: NaiveDate) -> Result<NaiveDateTime> {
    let (hours, rest) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("invalid departure time '{raw}'"))?;
    let hours: u32 = hours
        .parse()
        .with_context(|| format!("invalid departure hour in '{raw}'"))?;

    let (date, hours) = if hours < 24 {
        (today, hours)
    } else {
        let next = today
            .checked_add_days(Days::new(1))
            .ok_or_else(|| anyhow!("date overflow after {today}"))?;
        (next, hours - 24)
    };
    if hours >= 24 {
        bail!("departure time '{raw}' is more than a day ahead");
    }

    let time = NaiveTime::parse_from_str(&format!("{hours:02}:{rest}"), "%H:%M:%S")
        .with_context(|| format!("invalid departure time '{raw}'"))?;
    Ok(date.and_time(time))
}

pub fn departure_from_json(
    bus_stop: &BusStop,
    line: &str,
    entry: &Value,
    today: NaiveDate,
) -> Result<Departure> {
    Ok(Departure {
        bus_stop_id: bus_stop.bus_stop_id.clone(),
        bus_stop_number: bus_stop.bus_stop_number.clone(),
        line: line.to_string(),
        brigade: table_value(entry, 2)?.to_string(),
        timestamp: departure_time(table_value(entry, 5)?, today)?,
    })
}
