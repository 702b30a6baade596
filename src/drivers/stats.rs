//! Running statistics over a channel window.
//!
//! Non-positive readings are sentinels (sensor dropout) and are left out of
//! `mean`/`min`/`max`. `current` is always the last raw reading.
use std::fmt;
use serde::{Deserialize, Serialize};
use crate::drivers::buffer::Sample;
/// Half-width of the "Normal" band as a fraction of the running mean.
pub const NORMAL_BAND_PERCENT: f64 = 0.15;
/// Where the latest reading sits relative to the running mean.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    High,
    Low,
    Normal,
    #[serde(rename = "---")]
    Unknown,
}
impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::High => "High",
            Status::Low => "Low",
            Status::Normal => "Normal",
            Status::Unknown => "---",
        }
    }
    /// Classifies `current` against `mean` with a symmetric band of `band_percent`.
    pub fn classify(mean: f64, current: f64, band_percent: f64) -> Self {
        if mean <= 0.0 || current <= 0.0 {
            return Status::Unknown;
        }
        if current > mean * (1.0 + band_percent) {
            Status::High
        } else if current < mean * (1.0 - band_percent) {
            Status::Low
        } else {
            Status::Normal
        }
    }
}
impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub current: f64,
    pub status: Status,
}
impl Statistics {
    /// Snapshot for an empty or all-sentinel window.
    pub const EMPTY: Statistics = Statistics {
        mean: 0.0,
        min: 0.0,
        max: 0.0,
        current: 0.0,
        status: Status::Unknown,
    };
}
impl Default for Statistics {
    fn default() -> Self {
        Self::EMPTY
    }
}
/// Pluggable statistics computation for stats-enabled channels.
pub trait StatsStrategy {
    fn compute(&self, samples: &[Sample]) -> Statistics;
}
impl<F> StatsStrategy for F
where
    F: Fn(&[Sample]) -> Statistics,
{
    fn compute(&self, samples: &[Sample]) -> Statistics {
        self(samples)
    }
}
/// Mean/min/max over valid samples plus a status band around the mean.
#[derive(Clone, Copy, Debug)]
pub struct BandedStats {
    pub band_percent: f64,
}
impl BandedStats {
    pub fn new(band_percent: f64) -> Self {
        Self { band_percent }
    }
}
impl Default for BandedStats {
    fn default() -> Self {
        Self::new(NORMAL_BAND_PERCENT)
    }
}
impl StatsStrategy for BandedStats {
    fn compute(&self, samples: &[Sample]) -> Statistics {
        let Some(last) = samples.last() else {
            return Statistics::EMPTY;
        };
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::MAX;
        let mut max = f64::MIN;
        for value in samples.iter().map(|s| s.y).filter(|y| *y > 0.0) {
            count += 1;
            sum += value;
            min = min.min(value);
            max = max.max(value);
        }
        if count == 0 {
            return Statistics::EMPTY;
        }
        let mean = sum / count as f64;
        let current = last.y;
        Statistics {
            mean,
            min,
            max,
            current,
            status: Status::classify(mean, current, self.band_percent),
        }
    }
}
/// [`BandedStats`] with the default band.
pub fn compute_stats(samples: &[Sample]) -> Statistics {
    BandedStats::default().compute(samples)
}
#[cfg(test)]
mod tests {
    use super::*;
    fn samples(values: &[f64]) -> Vec<Sample> {
        values
            .iter()
            .enumerate()
            .map(|(i, y)| Sample::new(i as i64 * 1000, *y))
            .collect()
    }
    #[test]
    fn empty_and_all_sentinel_windows_are_zeroed() {
        assert_eq!(compute_stats(&[]), Statistics::EMPTY);
        let zeros = [Sample::new(0, 0.0), Sample::new(1, 0.0)];
        let stats = compute_stats(&zeros);
        assert_eq!(stats, Statistics::EMPTY);
        assert_eq!(stats.status.as_str(), "---");
        assert_eq!(compute_stats(&samples(&[-3.0, -1.0])), Statistics::EMPTY);
    }
    #[test]
    fn reading_inside_band_is_normal() {
        let stats = compute_stats(&samples(&[60.0, 62.0, 58.0, 64.0]));
        assert_eq!(stats.mean, 61.0);
        assert_eq!(stats.min, 58.0);
        assert_eq!(stats.max, 64.0);
        assert_eq!(stats.current, 64.0);
        assert_eq!(stats.status, Status::Normal);
    }
    #[test]
    fn reading_above_band_is_high() {
        let stats = compute_stats(&samples(&[60.0, 60.0, 60.0, 100.0]));
        assert_eq!(stats.mean, 70.0);
        assert_eq!(stats.status, Status::High);
    }
    #[test]
    fn reading_below_band_is_low() {
        let stats = compute_stats(&samples(&[100.0, 100.0, 100.0, 40.0]));
        assert_eq!(stats.mean, 85.0);
        assert_eq!(stats.status, Status::Low);
    }
    #[test]
    fn current_is_the_raw_last_value() {
        let stats = compute_stats(&samples(&[60.0, 0.0]));
        assert_eq!(stats.current, 0.0);
        assert_eq!(stats.mean, 60.0);
        assert_eq!(stats.min, 60.0);
        assert_eq!(stats.max, 60.0);
        assert_eq!(stats.status, Status::Unknown);
    }
    #[test]
    fn recompute_is_idempotent() {
        let window = samples(&[70.0, 72.0, 0.0, 75.0]);
        assert_eq!(compute_stats(&window), compute_stats(&window));
    }
    #[test]
    fn values_near_band_edges() {
        // 100 * 1.15 is not exactly representable, so probe just inside and outside the edges.
        assert_eq!(Status::classify(100.0, 114.9, NORMAL_BAND_PERCENT), Status::Normal);
        assert_eq!(Status::classify(100.0, 85.1, NORMAL_BAND_PERCENT), Status::Normal);
        assert_eq!(Status::classify(100.0, 115.1, NORMAL_BAND_PERCENT), Status::High);
        assert_eq!(Status::classify(0.0, 10.0, NORMAL_BAND_PERCENT), Status::Unknown);
    }
    #[test]
    fn closures_work_as_strategies() {
        let latest_only = |window: &[Sample]| Statistics {
            current: window.last().map(|s| s.y).unwrap_or(0.0),
            ..Statistics::EMPTY
        };
        let stats = latest_only.compute(&samples(&[1.0, 2.0]));
        assert_eq!(stats.current, 2.0);
        assert_eq!(stats.status, Status::Unknown);
    }
    #[test]
    fn status_serializes_with_display_names() {
        assert_eq!(serde_json::to_string(&Status::Unknown).unwrap(), "\"---\"");
        assert_eq!(serde_json::to_string(&Status::High).unwrap(), "\"High\"");
        assert_eq!(Status::Normal.to_string(), "Normal");
    }
}
