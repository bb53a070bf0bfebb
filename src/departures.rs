//! One-shot download of bus stops and their scheduled departures.
//!
//! Departures are fetched stop by stop and line by line, and flushed to
//! numbered CSV files in the departures folder as they accumulate.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::fetch::{JsonSource, fetch_valid_json};
use crate::model::{BusStop, Departure};
use crate::output::{write_bus_stops, write_departures};
use crate::parser::{bus_stop_from_json, departure_from_json, line_from_json, result_entries};
use crate::time::TimeParser;

/// Departures are flushed to a new file once more than this many pile up.
pub const DEPARTURES_PER_FILE: usize = 10_000;

/// Appends query parameters to an API URL that already carries a query.
fn with_query(base: &str, params: &[(&str, &str)]) -> Result<String> {
    let mut url = reqwest::Url::parse(base).with_context(|| format!("invalid URL '{base}'"))?;
    url.query_pairs_mut().extend_pairs(params);
    Ok(url.into())
}

pub fn departure_file_path(folder: impl AsRef<Path>, file_id: usize) -> PathBuf {
    folder.as_ref().join(format!("{file_id}.csv"))
}

#[derive(Debug, Default, PartialEq)]
pub struct DownloadSummary {
    pub departures: usize,
    pub files: usize,
}

pub struct DeparturesDownloader<S> {
    source: S,
    config: Config,
    time_parser: TimeParser,
}

impl<S: JsonSource> DeparturesDownloader<S> {
    pub fn new(source: S, config: &Config) -> Result<Self> {
        Ok(Self {
            source,
            config: config.clone(),
            time_parser: config.time_parser()?,
        })
    }

    async fn fetch_entries(&self, url: &str) -> Result<Vec<serde_json::Value>> {
        let response = fetch_valid_json(
            &self.source,
            url,
            Duration::ZERO,
            self.config.max_malformed_retries,
        )
        .await?;
        Ok(result_entries(&response.body).to_vec())
    }

    #[tracing::instrument(skip(self))]
    pub async fn download_bus_stops(&self) -> Result<Vec<BusStop>> {
        info!("Requesting bus stops");
        let entries = self.fetch_entries(&self.config.bus_stops_url).await?;

        let stops = entries
            .iter()
            .map(bus_stop_from_json)
            .collect::<Result<Vec<_>>>()
            .context("malformed bus stop entry")?;
        info!(count = stops.len(), "Bus stops received");
        Ok(stops)
    }

    async fn download_lines(&self, stop: &BusStop) -> Result<Vec<String>> {
        let url = with_query(
            &self.config.bus_stop_lines_url,
            &[
                ("busstopId", stop.bus_stop_id.as_str()),
                ("busstopNr", stop.bus_stop_number.as_str()),
            ],
        )?;
        self.fetch_entries(&url)
            .await?
            .iter()
            .map(line_from_json)
            .collect()
    }

    async fn download_departures_for_line(
        &self,
        stop: &BusStop,
        line: &str,
        today: NaiveDate,
    ) -> Result<Vec<Departure>> {
        let url = with_query(
            &self.config.schedule_url,
            &[
                ("busstopId", stop.bus_stop_id.as_str()),
                ("busstopNr", stop.bus_stop_number.as_str()),
                ("line", line),
            ],
        )?;

        let mut departures = Vec::new();
        for entry in self.fetch_entries(&url).await? {
            match departure_from_json(stop, line, &entry, today) {
                Ok(departure) => departures.push(departure),
                Err(e) => warn!(error = %e, line, "Error while parsing departure"),
            }
        }
        Ok(departures)
    }

    /// Downloads today's departures for every line serving `stops` and
    /// writes them to `1.csv`, `2.csv`, ... in the departures folder.
    pub async fn download_departures(&self, stops: &[BusStop]) -> Result<DownloadSummary> {
        self.download_departures_on(stops, Local::now().date_naive()).await
    }

    pub async fn download_departures_on(
        &self,
        stops: &[BusStop],
        today: NaiveDate,
    ) -> Result<DownloadSummary> {
        let folder = Path::new(&self.config.departures_folder);
        let mut pending = Vec::new();
        let mut summary = DownloadSummary::default();

        for stop in stops {
            info!(
                bus_stop_id = %stop.bus_stop_id,
                bus_stop_number = %stop.bus_stop_number,
                "Downloading departures for bus stop"
            );
            for line in self.download_lines(stop).await? {
                debug!(line = %line, "Downloading departures for line");
                let departures = self.download_departures_for_line(stop, &line, today).await?;
                summary.departures += departures.len();
                pending.extend(departures);

                if pending.len() > DEPARTURES_PER_FILE {
                    self.flush(folder, &mut pending, &mut summary)?;
                }
            }
            info!(total = summary.departures, "Departures received");
        }

        if !pending.is_empty() {
            self.flush(folder, &mut pending, &mut summary)?;
        }
        Ok(summary)
    }

    fn flush(
        &self,
        folder: &Path,
        pending: &mut Vec<Departure>,
        summary: &mut DownloadSummary,
    ) -> Result<()> {
        let path = departure_file_path(folder, summary.files + 1);
        write_departures(&path, pending, &self.time_parser)?;
        info!(path = %path.display(), count = pending.len(), "Departures saved");
        summary.files += 1;
        pending.clear();
        Ok(())
    }

    /// Downloads all bus stops, saves them, then downloads their departures.
    pub async fn run(&self) -> Result<DownloadSummary> {
        let stops = self.download_bus_stops().await?;
        write_bus_stops(&self.config.bus_stops_file, &stops)?;
        self.download_departures(&stops).await
    }
}
