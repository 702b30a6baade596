use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::drivers::source::{LivePoll, ModelScores, Record, RecordSource};
use crate::drivers::DashboardError;
/// The wearable emits one record per second.
pub const DEFAULT_PERIOD_MS: i64 = 1000;
const BACKFILL_RECORDS: usize = 100;
const HISTORY_LIMIT: usize = 20_000;
/// Probability that a heart-rate reading drops out (reported as 0).
const HR_DROPOUT: f64 = 0.03;
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
/// Synthetic wearable stream for demos and offline work.
///
/// Every channel follows a plausible physiological baseline with noise; heart
/// rate random-walks between 55 and 110 bpm and occasionally drops out.
pub struct SimulatedSource {
    rng: StdRng,
    clock: Box<dyn FnMut() -> i64 + Send>,
    period_ms: i64,
    history: VecDeque<Record>,
    heart_rate: f64,
    phase: f64,
}
impl SimulatedSource {
    pub fn new(seed: u64) -> Self {
        Self::with_clock(seed, now_ms)
    }
    pub fn with_clock(seed: u64, clock: impl FnMut() -> i64 + Send + 'static) -> Self {
        let mut source = Self {
            rng: StdRng::seed_from_u64(seed),
            clock: Box::new(clock),
            period_ms: DEFAULT_PERIOD_MS,
            history: VecDeque::with_capacity(BACKFILL_RECORDS),
            heart_rate: 72.0,
            phase: 0.0,
        };
        source.backfill(BACKFILL_RECORDS);
        source
    }
    fn backfill(&mut self, count: usize) {
        let now = (self.clock)();
        for i in (1..=count as i64).rev() {
            let record = self.generate(now - i * self.period_ms);
            self.remember(record);
        }
    }
    fn remember(&mut self, record: Record) {
        self.history.push_back(record);
        if self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
    }
    fn noise(&mut self, amplitude: f64) -> f64 {
        self.rng.gen_range(-amplitude..amplitude)
    }
    fn generate(&mut self, timestamp: i64) -> Record {
        self.phase += 0.35;
        self.heart_rate = (self.heart_rate + self.noise(2.0)).clamp(55.0, 110.0);
        let hr = if self.rng.gen_bool(HR_DROPOUT) {
            0.0
        } else {
            self.heart_rate
        };
        let ibi = if hr > 0.0 { 60_000.0 / hr } else { 0.0 };
        let wave = self.phase.sin();
        Record::new(timestamp)
            .with("hr", hr)
            .with("ibi", ibi)
            .with("spo2", (97.0 + self.noise(1.5)).min(100.0))
            .with("skinTemp", 33.5 + self.noise(0.3))
            .with("eda", 2.0 + 0.5 * (self.phase * 0.1).sin() + self.noise(0.05))
            .with("ecg", 0.6 * wave.powi(7) + self.noise(0.05))
            .with("bvp", 50.0 * wave + self.noise(5.0))
            .with("ppgGreen", 2000.0 + 150.0 * wave + self.noise(20.0))
            .with("ppgRed", 1500.0 + 120.0 * wave + self.noise(20.0))
            .with("ppgIr", 2500.0 + 180.0 * wave + self.noise(20.0))
            .with("accX", self.noise(0.05))
            .with("accY", self.noise(0.05))
            .with("accZ", 1.0 + self.noise(0.05))
            .with("respirationRate", 15.0 + self.noise(1.0))
    }
    fn scores(&mut self) -> ModelScores {
        let mut score = || (self.rng.gen_range(30.0..95.0_f64) * 100.0).round() / 100.0;
        ModelScores {
            sleep_quality_index: score(),
            psychosomatic_stress_index: score(),
            cognitive_load_score: score(),
            cardiovascular_health_index: score(),
            emotional_vitality_score: score(),
        }
    }
}
impl RecordSource for SimulatedSource {
    fn fetch_recent(&mut self, limit: usize) -> Result<Vec<Record>, DashboardError> {
        let skip = self.history.len().saturating_sub(limit);
        Ok(self.history.iter().skip(skip).cloned().collect())
    }
    fn fetch_latest(&mut self) -> Result<LivePoll, DashboardError> {
        let now = (self.clock)();
        let last = self.history.back().map(|r| r.timestamp).unwrap_or(i64::MIN);
        if now.saturating_sub(last) < self.period_ms {
            return Ok(LivePoll::Waiting { polled_at_ms: now });
        }
        let record = self.generate(now);
        let scores = self.scores();
        self.remember(record.clone());
        Ok(LivePoll::Synced {
            record,
            scores: Some(scores),
            polled_at_ms: now,
        })
    }
    fn fetch_range(&mut self, start_ms: i64, end_ms: i64) -> Result<Vec<Record>, DashboardError> {
        Ok(self
            .history
            .iter()
            .filter(|r| r.timestamp >= start_ms && r.timestamp <= end_ms)
            .cloned()
            .collect())
    }
}
