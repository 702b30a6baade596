use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::drivers::buffer::Sample;
use crate::drivers::DashboardError;
/// One multi-channel reading as delivered by the backend:
/// `{"timestamp": 1700000000000, "hr": 72.1, "spo2": 97.4, ...}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}
impl Record {
    pub fn new(timestamp: i64) -> Self {
        Self {
            timestamp,
            values: BTreeMap::new(),
        }
    }
    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.values.insert(key.into(), value);
        self
    }
    pub fn value(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }
    /// `None` when the record carries no value for `key`.
    pub fn sample(&self, key: &str) -> Option<Sample> {
        self.value(key).map(|y| Sample::new(self.timestamp, y))
    }
    /// Missing values become `0`, which the statistics treat as a sentinel.
    pub fn sample_or_zero(&self, key: &str) -> Sample {
        Sample::new(self.timestamp, self.value(key).unwrap_or(0.0))
    }
}
pub const SCORE_KEYS: [&str; 5] = [
    "SleepQualityIndex",
    "PsychosomaticStressIndex",
    "CognitiveLoadScore",
    "CardiovascularHealthIndex",
    "EmotionalVitalityScore",
];
/// Derived model scores attached to a live record, each in 0..100.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModelScores {
    pub sleep_quality_index: f64,
    pub psychosomatic_stress_index: f64,
    pub cognitive_load_score: f64,
    pub cardiovascular_health_index: f64,
    pub emotional_vitality_score: f64,
}
impl ModelScores {
    /// `(key, display name, value)` in [`SCORE_KEYS`] order.
    pub fn entries(&self) -> [(&'static str, &'static str, f64); 5] {
        [
            (SCORE_KEYS[0], "Sleep Quality Index", self.sleep_quality_index),
            (SCORE_KEYS[1], "Psychosomatic Stress", self.psychosomatic_stress_index),
            (SCORE_KEYS[2], "Cognitive Load", self.cognitive_load_score),
            (SCORE_KEYS[3], "Cardiovascular Health", self.cardiovascular_health_index),
            (SCORE_KEYS[4], "Emotional Vitality", self.emotional_vitality_score),
        ]
    }
}
/// Outcome of a single live poll.
#[derive(Clone, Debug, PartialEq)]
pub enum LivePoll {
    Synced {
        record: Record,
        scores: Option<ModelScores>,
        polled_at_ms: i64,
    },
    /// The source had nothing newer than the previous poll.
    Waiting { polled_at_ms: i64 },
}
impl LivePoll {
    pub fn polled_at_ms(&self) -> i64 {
        match self {
            LivePoll::Synced { polled_at_ms, .. } | LivePoll::Waiting { polled_at_ms } => {
                *polled_at_ms
            }
        }
    }
}
/// Producer side of the dashboard: live polls plus historical queries.
pub trait RecordSource {
    /// The newest `limit` records, oldest first.
    fn fetch_recent(&mut self, limit: usize) -> Result<Vec<Record>, DashboardError>;
    fn fetch_latest(&mut self) -> Result<LivePoll, DashboardError>;
    /// Records with `start_ms <= timestamp <= end_ms`, oldest first.
    fn fetch_range(&mut self, start_ms: i64, end_ms: i64) -> Result<Vec<Record>, DashboardError>;
}
impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    fn fetch_recent(&mut self, limit: usize) -> Result<Vec<Record>, DashboardError> {
        (**self).fetch_recent(limit)
    }
    fn fetch_latest(&mut self) -> Result<LivePoll, DashboardError> {
        (**self).fetch_latest()
    }
    fn fetch_range(&mut self, start_ms: i64, end_ms: i64) -> Result<Vec<Record>, DashboardError> {
        (**self).fetch_range(start_ms, end_ms)
    }
}
fn tail(records: &[Record], limit: usize) -> Vec<Record> {
    records[records.len().saturating_sub(limit)..].to_vec()
}
fn within(records: &[Record], start_ms: i64, end_ms: i64) -> Vec<Record> {
    records
        .iter()
        .filter(|r| r.timestamp >= start_ms && r.timestamp <= end_ms)
        .cloned()
        .collect()
}
/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    history: Vec<Record>,
    polls: VecDeque<Result<LivePoll, String>>,
}
impl ManualSource {
    pub fn new(history: Vec<Record>, polls: impl IntoIterator<Item = LivePoll>) -> Self {
        Self {
            history,
            polls: polls.into_iter().map(Ok).collect(),
        }
    }
    pub fn push_poll(&mut self, poll: LivePoll) {
        self.polls.push_back(Ok(poll));
    }
    /// Queues a poll that fails with `message`.
    pub fn push_failure(&mut self, message: impl Into<String>) {
        self.polls.push_back(Err(message.into()));
    }
}
impl RecordSource for ManualSource {
    fn fetch_recent(&mut self, limit: usize) -> Result<Vec<Record>, DashboardError> {
        Ok(tail(&self.history, limit))
    }
    fn fetch_latest(&mut self) -> Result<LivePoll, DashboardError> {
        match self.polls.pop_front() {
            Some(Ok(poll)) => Ok(poll),
            Some(Err(message)) => Err(DashboardError::Source(message)),
            None => Ok(LivePoll::Waiting {
                polled_at_ms: self.history.last().map(|r| r.timestamp).unwrap_or(0),
            }),
        }
    }
    fn fetch_range(&mut self, start_ms: i64, end_ms: i64) -> Result<Vec<Record>, DashboardError> {
        Ok(within(&self.history, start_ms, end_ms))
    }
}
/// Replays a recorded session from a JSON array of records, one record per poll.
///
/// The first `fetch_recent` call primes the window with the head of the file and
/// live polls continue from there.
pub struct ReplaySource {
    records: Vec<Record>,
    cursor: usize,
}
impl ReplaySource {
    pub fn new(mut records: Vec<Record>) -> Self {
        records.sort_by_key(|r| r.timestamp);
        Self { records, cursor: 0 }
    }
    pub fn from_path(path: &Path) -> Result<Self, DashboardError> {
        let text = fs::read_to_string(path)?;
        let records: Vec<Record> = serde_json::from_str(&text)?;
        log::info!("loaded {} replay records from {}", records.len(), path.display());
        Ok(Self::new(records))
    }
    pub fn remaining(&self) -> usize {
        self.records.len() - self.cursor
    }
}
impl RecordSource for ReplaySource {
    fn fetch_recent(&mut self, limit: usize) -> Result<Vec<Record>, DashboardError> {
        if self.cursor == 0 {
            self.cursor = limit.min(self.records.len());
        }
        Ok(tail(&self.records[..self.cursor], limit))
    }
    fn fetch_latest(&mut self) -> Result<LivePoll, DashboardError> {
        let Some(record) = self.records.get(self.cursor).cloned() else {
            return Ok(LivePoll::Waiting {
                polled_at_ms: self.records.last().map(|r| r.timestamp).unwrap_or(0),
            });
        };
        self.cursor += 1;
        Ok(LivePoll::Synced {
            polled_at_ms: record.timestamp,
            record,
            scores: None,
        })
    }
    fn fetch_range(&mut self, start_ms: i64, end_ms: i64) -> Result<Vec<Record>, DashboardError> {
        Ok(within(&self.records, start_ms, end_ms))
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn records(count: i64) -> Vec<Record> {
        (0..count)
            .map(|i| Record::new(i * 1000).with("hr", 60.0 + i as f64))
            .collect()
    }
    #[test]
    fn record_json_matches_backend_shape() {
        let record: Record =
            serde_json::from_str(r#"{"timestamp": 1700000000000, "hr": 72.5, "spo2": 97.0}"#)
                .unwrap();
        assert_eq!(record.timestamp, 1_700_000_000_000);
        assert_eq!(record.value("hr"), Some(72.5));
        assert_eq!(record.sample("ecg"), None);
        assert_eq!(record.sample_or_zero("ecg"), Sample::new(1_700_000_000_000, 0.0));
    }
    #[test]
    fn model_scores_use_backend_keys() {
        let scores: ModelScores = serde_json::from_str(
            r#"{"SleepQualityIndex": 81.2, "PsychosomaticStressIndex": 40.0,
                "CognitiveLoadScore": 55.5, "CardiovascularHealthIndex": 90.1,
                "EmotionalVitalityScore": 62.0}"#,
        )
        .unwrap();
        assert_eq!(scores.sleep_quality_index, 81.2);
        let entries = scores.entries();
        assert_eq!(entries[3], ("CardiovascularHealthIndex", "Cardiovascular Health", 90.1));
    }
    #[test]
    fn manual_source_serves_tail_and_range() {
        let mut source = ManualSource::new(records(150), Vec::new());
        let recent = source.fetch_recent(100).unwrap();
        assert_eq!(recent.len(), 100);
        assert_eq!(recent[0].timestamp, 50_000);
        let range = source.fetch_range(10_000, 14_000).unwrap();
        assert_eq!(range.len(), 5);
        assert_eq!(
            source.fetch_latest().unwrap(),
            LivePoll::Waiting { polled_at_ms: 149_000 }
        );
    }
    #[test]
    fn manual_source_replays_failures() {
        let mut source = ManualSource::new(Vec::new(), Vec::new());
        source.push_failure("backend unreachable");
        assert!(matches!(source.fetch_latest(), Err(DashboardError::Source(_))));
    }
    #[test]
    fn replay_primes_window_then_streams() {
        let mut shuffled = records(5);
        shuffled.reverse();
        let mut source = ReplaySource::new(shuffled);
        let primed = source.fetch_recent(3).unwrap();
        assert_eq!(primed.iter().map(|r| r.timestamp).collect::<Vec<_>>(), vec![0, 1000, 2000]);
        assert_eq!(source.remaining(), 2);
        let LivePoll::Synced { record, .. } = source.fetch_latest().unwrap() else {
            panic!("expected a synced poll");
        };
        assert_eq!(record.timestamp, 3000);
        source.fetch_latest().unwrap();
        assert_eq!(
            source.fetch_latest().unwrap(),
            LivePoll::Waiting { polled_at_ms: 4000 }
        );
        assert_eq!(source.fetch_recent(10).unwrap().len(), 5);
    }
    #[test]
    fn replay_reads_json_file() {
        let path = std::env::temp_dir().join(format!("vitalscope-replay-{}.json", std::process::id()));
        fs::write(&path, serde_json::to_string(&records(4)).unwrap()).unwrap();
        let mut source = ReplaySource::from_path(&path).unwrap();
        assert_eq!(source.fetch_range(1000, 2000).unwrap().len(), 2);
        fs::remove_file(&path).ok();
    }
}
