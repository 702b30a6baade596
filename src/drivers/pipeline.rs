use serde::Serialize;
use crate::config::DashboardConfig;
use crate::drivers::buffer::Sample;
use crate::drivers::channel::{ChannelPresenter, Renderer};
use crate::drivers::error::DashboardError;
use crate::drivers::source::{LivePoll, ModelScores, Record};
use crate::drivers::stats::BandedStats;
use crate::tables::{RecentRows, ScoreEntry, TableSnapshot};
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Disconnected,
    /// Polling the source on a timer.
    Live,
    /// Showing a historical range; the poll timer is disarmed.
    Historical,
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    Applied,
    Waiting,
    /// Arrived while not live; nothing was touched.
    Ignored,
}
/// Session state for one dashboard: every channel presenter plus the tables.
///
/// Owned by whichever thread drives it; it is the only writer of its buffers.
pub struct Dashboard {
    presenters: Vec<ChannelPresenter>,
    state: ConnectionState,
    records: RecentRows<Record>,
    score_log: RecentRows<ScoreEntry>,
    latest_scores: Option<ModelScores>,
}
impl Dashboard {
    pub fn from_config(config: &DashboardConfig) -> Result<Self, DashboardError> {
        config.validate()?;
        let presenters = config
            .channels
            .iter()
            .map(|channel| {
                if channel.stats_enabled {
                    ChannelPresenter::with_strategy(
                        channel.clone(),
                        config.max_points,
                        BandedStats::new(config.normal_band_percent),
                    )
                } else {
                    ChannelPresenter::new(channel.clone(), config.max_points)
                }
            })
            .collect();
        Ok(Self {
            presenters,
            state: ConnectionState::Disconnected,
            records: RecentRows::new(config.record_rows),
            score_log: RecentRows::new(config.score_log_rows),
            latest_scores: None,
        })
    }
    pub fn state(&self) -> ConnectionState {
        self.state
    }
    pub fn presenters(&self) -> &[ChannelPresenter] {
        &self.presenters
    }
    pub fn presenter(&self, key: &str) -> Option<&ChannelPresenter> {
        self.presenters.iter().find(|p| p.key() == key)
    }
    /// Seeds every channel with `initial` and starts accepting live polls.
    pub fn begin_live(&mut self, initial: &[Record], renderer: &mut dyn Renderer) {
        self.replace_all(initial, renderer);
        self.state = ConnectionState::Live;
    }
    /// Replaces every channel with a historical batch. Live polls are ignored afterwards.
    pub fn load_history(&mut self, records: &[Record], renderer: &mut dyn Renderer) {
        self.replace_all(records, renderer);
        self.state = ConnectionState::Historical;
    }
    /// Fans one poll result out to the channels, unless the session is no longer live.
    pub fn apply_poll(&mut self, poll: LivePoll, renderer: &mut dyn Renderer) -> PollOutcome {
        if self.state != ConnectionState::Live {
            log::debug!("dropping poll result received while {:?}", self.state);
            return PollOutcome::Ignored;
        }
        let (record, scores) = match poll {
            LivePoll::Waiting { .. } => return PollOutcome::Waiting,
            LivePoll::Synced { record, scores, .. } => (record, scores),
        };
        for presenter in &mut self.presenters {
            if let Some(sample) = record.sample(presenter.key()) {
                presenter.add_point(sample, renderer);
            }
        }
        if let Some(scores) = scores {
            self.score_log.push(ScoreEntry {
                timestamp: record.timestamp,
                scores,
            });
            self.latest_scores = Some(scores);
        }
        self.records.push(record);
        PollOutcome::Applied
    }
    pub fn disconnect(&mut self, renderer: &mut dyn Renderer) {
        for presenter in &mut self.presenters {
            presenter.reset(renderer);
        }
        self.records.clear();
        self.score_log.clear();
        self.latest_scores = None;
        self.state = ConnectionState::Disconnected;
    }
    pub fn tables(&self) -> TableSnapshot {
        TableSnapshot {
            records: self.records.to_vec(),
            score_log: self.score_log.to_vec(),
            latest_scores: self.latest_scores,
            raw: self
                .records
                .newest()
                .and_then(|r| serde_json::to_string_pretty(r).ok()),
        }
    }
    fn replace_all(&mut self, records: &[Record], renderer: &mut dyn Renderer) {
        for presenter in &mut self.presenters {
            let samples: Vec<Sample> = records
                .iter()
                .map(|r| r.sample_or_zero(presenter.key()))
                .collect();
            presenter.load_history(samples, renderer);
        }
        self.records.populate(records.iter().cloned());
    }
}
