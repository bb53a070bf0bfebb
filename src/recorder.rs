//! Polling loop that records live vehicle positions.
//!
//! The loop fetches full snapshots of all reporting vehicles until the
//! configured duration elapses and keeps only observations that are new for
//! their vehicle and newer than the session start.

use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Config;
use crate::fetch::{JsonSource, fetch_valid_json};
use crate::model::VehicleRecord;
use crate::parser::parse_vehicle_records;
use crate::stats::RecordingStatistics;
use crate::time::TimeParser;

/// Last accepted timestamp per vehicle within one recording session.
#[derive(Debug, Default)]
pub struct LastSeen(HashMap<String, NaiveDateTime>);

impl LastSeen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decides whether `record` is a new, in-session observation.
    ///
    /// A record is rejected outright if its vehicle already has an accepted
    /// timestamp at or after its own. Otherwise the vehicle's timestamp is
    /// advanced *before* the session-start check, so a stale snapshot from
    /// before `session_start` still blocks later copies of itself.
    pub fn accept(&mut self, record: &VehicleRecord, session_start: NaiveDateTime) -> bool {
        if let Some(last) = self.0.get(&record.vehicle_id) {
            if *last >= record.timestamp {
                return false;
            }
        }
        self.0.insert(record.vehicle_id.clone(), record.timestamp);
        record.timestamp > session_start
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outcome of a recording session: accepted records in arrival order and
/// the merged statistics.
#[derive(Debug)]
pub struct Recording {
    pub records: Vec<VehicleRecord>,
    pub stats: RecordingStatistics,
}

pub struct Recorder<S> {
    source: S,
    url: String,
    delay: Duration,
    duration: Duration,
    max_malformed_retries: Option<u32>,
    time_parser: TimeParser,
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl<S: JsonSource> Recorder<S> {
    pub fn new(source: S, config: &Config) -> Result<Self> {
        Ok(Self {
            source,
            url: config.bus_info_url.clone(),
            delay: config.download_delay(),
            duration: config.download_duration(),
            max_malformed_retries: config.max_malformed_retries,
            time_parser: config.time_parser()?,
        })
    }

    /// Records for the configured duration, starting now.
    #[tracing::instrument(skip(self), fields(duration_secs = self.duration.as_secs()))]
    pub async fn record(&self) -> Result<Recording> {
        let start = now();
        let end = start + chrono::Duration::from_std(self.duration)?;
        info!(
            duration_secs = self.duration.as_secs(),
            end = %self.time_parser.format(&end),
            "Starting recording"
        );
        self.record_between(start, end).await
    }

    /// Runs the polling loop for a session that started at `session_start`
    /// until the wall clock passes `end`.
    ///
    /// The deadline is checked before each fetch; a fetch in flight when it
    /// passes is completed and its records kept.
    pub async fn record_between(
        &self,
        session_start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Recording> {
        let mut records = Vec::new();
        let mut last_seen = LastSeen::new();
        let mut stats = RecordingStatistics::empty(session_start);

        while now() < end {
            info!("Requesting vehicle positions");
            let (batch, batch_stats) = self.fetch_snapshot(&mut last_seen, session_start).await?;
            info!(new_records = batch.len(), "Snapshot processed");

            records.extend(batch);
            stats = stats.merge(&batch_stats);
        }

        let stats = RecordingStatistics {
            window_start: session_start,
            window_end: now(),
            ..stats
        };
        debug!(vehicles = last_seen.len(), records = records.len(), "Recording finished");
        Ok(Recording { records, stats })
    }

    async fn fetch_snapshot(
        &self,
        last_seen: &mut LastSeen,
        session_start: NaiveDateTime,
    ) -> Result<(Vec<VehicleRecord>, RecordingStatistics)> {
        let fetch_start = now();
        let response = fetch_valid_json(
            &self.source,
            &self.url,
            self.delay,
            self.max_malformed_retries,
        )
        .await?;

        let accepted: Vec<_> = parse_vehicle_records(&response.body, &self.time_parser)
            .into_iter()
            .filter(|record| last_seen.accept(record, session_start))
            .collect();

        let stats = RecordingStatistics::for_fetch(
            response.attempts,
            accepted.len() as u64,
            fetch_start,
            now(),
        );
        Ok((accepted, stats))
    }
}
