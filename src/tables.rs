// src/tables.rs
use std::collections::VecDeque;
use serde::Serialize;
use crate::drivers::{ModelScores, Record};

/// 表格行数上限 (与网页版保持一致)
pub const RECORD_ROWS: usize = 10;
pub const SCORE_LOG_ROWS: usize = 50;

/// Zone suffix shown next to every [`clock_label`].
pub const CLOCK_ZONE: &str = "UTC";

/// Bounded list kept newest-first, the order the tables are drawn in.
#[derive(Clone, Debug)]
pub struct RecentRows<T> {
    rows: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> RecentRows<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { rows: VecDeque::with_capacity(capacity + 1), capacity }
    }

    /// Prepends `row`, dropping the oldest when full.
    pub fn push(&mut self, row: T) {
        self.rows.push_front(row);
        self.rows.truncate(self.capacity);
    }

    /// Rebuilds from an oldest-first batch: keeps its newest rows, newest on top.
    pub fn populate(&mut self, batch: impl IntoIterator<Item = T>) {
        let batch: Vec<T> = batch.into_iter().collect();
        let skip = batch.len().saturating_sub(self.capacity);
        self.rows = batch.into_iter().skip(skip).rev().collect();
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn newest(&self) -> Option<&T> {
        self.rows.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.rows.iter()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.rows.iter().cloned().collect()
    }
}

/// One line of the score log.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ScoreEntry {
    pub timestamp: i64,
    pub scores: ModelScores,
}

/// Color band for a model score card.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoreGrade {
    Good,
    Fair,
    Poor,
}

impl ScoreGrade {
    pub fn from_score(score: f64) -> Self {
        if score > 70.0 {
            ScoreGrade::Good
        } else if score > 50.0 {
            ScoreGrade::Fair
        } else {
            ScoreGrade::Poor
        }
    }
}

/// Everything the table widgets need in one message.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableSnapshot {
    /// Newest first.
    pub records: Vec<Record>,
    /// Newest first.
    pub score_log: Vec<ScoreEntry>,
    pub latest_scores: Option<ModelScores>,
    /// Pretty JSON of the newest record (raw data panel).
    pub raw: Option<String>,
}

/// `HH:MM:SS` label for a millisecond timestamp, in UTC.
///
/// Callers showing it to users mark it as UTC (see [`CLOCK_ZONE`]).
pub fn clock_label(timestamp_ms: i64) -> String {
    let secs_of_day = timestamp_ms.div_euclid(1000).rem_euclid(86_400);
    format!(
        "{:02}:{:02}:{:02}",
        secs_of_day / 3600,
        (secs_of_day % 3600) / 60,
        secs_of_day % 60
    )
}
