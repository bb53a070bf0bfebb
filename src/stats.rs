use anyhow::Result;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::time::TimeParser;

/// Request and record counters for a recording session, or one slice of it.
///
/// `window_start`/`window_end` bound the slice in wall-clock time. Instances
/// only ever change by [`merge`](Self::merge), which expects the left operand
/// to precede the right one chronologically.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingStatistics {
    pub request_count: u64,
    pub successful_request_count: u64,
    pub record_count: u64,
    pub window_start: NaiveDateTime,
    pub window_end: NaiveDateTime,
}

/// On-disk layout of [`RecordingStatistics`]. Field order is the key order
/// of the written JSON object.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatisticsRecord {
    #[serde(rename = "Number of requests")]
    pub request_count: u64,
    #[serde(rename = "Number of successful requests")]
    pub successful_request_count: u64,
    #[serde(rename = "Number of records")]
    pub record_count: u64,
    #[serde(rename = "Processing start time")]
    pub start_time: String,
    #[serde(rename = "Processing end time")]
    pub end_time: String,
}

impl RecordingStatistics {
    /// Zero counters with an empty window at `at`; the neutral start value
    /// for a chain of merges.
    pub fn empty(at: NaiveDateTime) -> Self {
        Self {
            request_count: 0,
            successful_request_count: 0,
            record_count: 0,
            window_start: at,
            window_end: at,
        }
    }

    /// Counters for a single logical fetch that took `attempts` requests to
    /// get a well-formed response and yielded `records` accepted records.
    pub fn for_fetch(
        attempts: u64,
        records: u64,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
    ) -> Self {
        Self {
            request_count: attempts,
            successful_request_count: 1,
            record_count: records,
            window_start,
            window_end,
        }
    }

    /// Sums the counters of `self` and `later`. The window starts where
    /// `self` starts and ends where `later` ends.
    pub fn merge(&self, later: &RecordingStatistics) -> RecordingStatistics {
        RecordingStatistics {
            request_count: self.request_count + later.request_count,
            successful_request_count: self.successful_request_count
                + later.successful_request_count,
            record_count: self.record_count + later.record_count,
            window_start: self.window_start,
            window_end: later.window_end,
        }
    }

    /// Percentage of requests that returned a well-formed response.
    pub fn success_pct(&self) -> f64 {
        pct(
            self.successful_request_count as usize,
            self.request_count as usize,
        )
    }

    pub fn to_record(&self, time_parser: &TimeParser) -> StatisticsRecord {
        StatisticsRecord {
            request_count: self.request_count,
            successful_request_count: self.successful_request_count,
            record_count: self.record_count,
            start_time: time_parser.format(&self.window_start),
            end_time: time_parser.format(&self.window_end),
        }
    }

    pub fn from_record(record: &StatisticsRecord, time_parser: &TimeParser) -> Result<Self> {
        Ok(Self {
            request_count: record.request_count,
            successful_request_count: record.successful_request_count,
            record_count: record.record_count,
            window_start: time_parser.parse(&record.start_time)?,
            window_end: time_parser.parse(&record.end_time)?,
        })
    }

    pub fn log(&self, time_parser: &TimeParser) {
        let record = self.to_record(time_parser);
        info!(
            requests = record.request_count,
            successful_requests = record.successful_request_count,
            success_pct = self.success_pct(),
            records = record.record_count,
            start = %record.start_time,
            end = %record.end_time,
            "Recording statistics"
        );
    }
}

/// `part` as a percentage of `total`, or 0 when `total` is zero.
pub fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn stats(requests: u64, successful: u64, records: u64, start: u32, end: u32) -> RecordingStatistics {
        RecordingStatistics {
            request_count: requests,
            successful_request_count: successful,
            record_count: records,
            window_start: at(10, start, 0),
            window_end: at(10, end, 0),
        }
    }

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(pct(50, 100), 50.0);
        assert_eq!(pct(1, 4), 25.0);
    }

    #[test]
    fn test_merge_sums_counters_and_takes_outer_window() {
        let a = stats(3, 1, 10, 0, 1);
        let b = stats(1, 1, 4, 1, 2);

        let merged = a.merge(&b);

        assert_eq!(merged.request_count, 4);
        assert_eq!(merged.successful_request_count, 2);
        assert_eq!(merged.record_count, 14);
        assert_eq!(merged.window_start, at(10, 0, 0));
        assert_eq!(merged.window_end, at(10, 2, 0));
    }

    #[test]
    fn test_merge_is_associative_on_counters() {
        let a = stats(3, 1, 10, 0, 1);
        let b = stats(1, 1, 4, 1, 2);
        let c = stats(7, 2, 0, 2, 3);

        let left = a.merge(&b).merge(&c);
        let right = a.merge(&b.merge(&c));

        assert_eq!(left, right);
    }

    #[test]
    fn test_empty_is_neutral_on_the_left() {
        let b = stats(2, 1, 5, 1, 2);
        let merged = RecordingStatistics::empty(at(10, 0, 0)).merge(&b);

        assert_eq!(merged.request_count, 2);
        assert_eq!(merged.window_start, at(10, 0, 0));
        assert_eq!(merged.window_end, at(10, 2, 0));
    }

    #[test]
    fn test_record_keys_are_stable_and_ordered() {
        let parser = TimeParser::new("%Y-%m-%d %H:%M:%S").unwrap();
        let json = serde_json::to_string(&stats(4, 2, 9, 0, 5).to_record(&parser)).unwrap();

        assert_eq!(
            json,
            "{\"Number of requests\":4,\
             \"Number of successful requests\":2,\
             \"Number of records\":9,\
             \"Processing start time\":\"2024-01-01 10:00:00\",\
             \"Processing end time\":\"2024-01-01 10:05:00\"}"
        );
    }

    #[test]
    fn test_from_record_restores_statistics() {
        let parser = TimeParser::new("%Y-%m-%d %H:%M:%S").unwrap();
        let original = stats(4, 2, 9, 0, 5);

        let restored = RecordingStatistics::from_record(&original.to_record(&parser), &parser).unwrap();

        assert_eq!(restored, original);
    }

    #[test]
    fn test_success_pct() {
        assert_eq!(stats(4, 1, 0, 0, 1).success_pct(), 25.0);
        assert_eq!(RecordingStatistics::empty(at(10, 0, 0)).success_pct(), 0.0);
    }
}
