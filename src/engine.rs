// src/engine.rs
use crate::config::DashboardConfig;
use crate::drivers::{
    ChannelFrame, ConnectionState, Dashboard, DashboardError, LivePoll, PollOutcome,
    RecordSource, Renderer,
};
use crate::recorder::DataRecorder;
use crate::tables::{clock_label, CLOCK_ZONE};
use crate::types::*;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_millis(20);

type PollResult = (u64, Result<LivePoll, DashboardError>);

// 把每一帧直接转发给 GUI
struct FrameSender<'a> {
    tx: &'a Sender<DashboardMessage>,
}

impl Renderer for FrameSender<'_> {
    fn render(&mut self, frame: &ChannelFrame) {
        self.tx.send(DashboardMessage::Channel(frame.clone())).ok();
    }
}

/// Starts the dashboard loop on a background thread.
///
/// The thread exits once every `DashboardCommand` sender is dropped.
pub fn spawn_thread<S>(
    config: DashboardConfig,
    source: S,
    tx: Sender<DashboardMessage>,
    rx_cmd: Receiver<DashboardCommand>,
) -> Result<JoinHandle<()>, DashboardError>
where
    S: RecordSource + Send + 'static,
{
    let dashboard = Dashboard::from_config(&config)?;
    let (poll_tx, poll_rx) = channel();
    let engine = Engine {
        config,
        source: Arc::new(Mutex::new(source)),
        dashboard,
        recorder: DataRecorder::new(),
        tx,
        next_poll: None,
        poll_in_flight: false,
        epoch: 0,
        poll_tx,
        poll_rx,
    };
    Ok(thread::spawn(move || engine.run(rx_cmd)))
}

struct Engine<S> {
    config: DashboardConfig,
    source: Arc<Mutex<S>>,
    dashboard: Dashboard,
    recorder: DataRecorder,
    tx: Sender<DashboardMessage>,
    // 轮询定时器: None 表示未启动
    next_poll: Option<Instant>,
    poll_in_flight: bool,
    // 每次切换状态都加一，旧轮询结果据此丢弃
    epoch: u64,
    poll_tx: Sender<PollResult>,
    poll_rx: Receiver<PollResult>,
}

impl<S: RecordSource + Send + 'static> Engine<S> {
    fn run(mut self, rx_cmd: Receiver<DashboardCommand>) {
        self.send(DashboardMessage::Log("Dashboard engine ready.".to_owned()));
        loop {
            // ============================================================
            // 1. 消息处理 (处理 GUI 发来的命令)
            // ============================================================
            for _ in 0..10 {
                match rx_cmd.try_recv() {
                    Ok(cmd) => self.handle(cmd),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        self.recorder.stop();
                        log::info!("command channel closed, engine stopping");
                        return;
                    }
                }
            }
            // ============================================================
            // 2. 轮询结果 / 定时器
            // ============================================================
            while let Ok((epoch, result)) = self.poll_rx.try_recv() {
                self.poll_in_flight = false;
                if epoch != self.epoch {
                    log::debug!("discarding poll result from a previous session");
                    continue;
                }
                self.apply_poll(result);
            }
            if self.poll_due() {
                self.start_poll();
            }
            thread::sleep(TICK);
        }
    }

    fn send(&self, msg: DashboardMessage) {
        self.tx.send(msg).ok();
    }

    fn sync(&self, level: SyncLevel, text: String) {
        self.send(DashboardMessage::Sync { level, text });
    }

    fn handle(&mut self, cmd: DashboardCommand) {
        match cmd {
            DashboardCommand::Connect | DashboardCommand::GoLive => self.go_live(),
            DashboardCommand::Disconnect => self.disconnect(),
            DashboardCommand::LoadHistory { start_ms, end_ms } => self.load_history(start_ms, end_ms),
        }
    }

    fn fetch<T>(
        &self,
        f: impl FnOnce(&mut S) -> Result<T, DashboardError>,
    ) -> Result<T, DashboardError> {
        let mut source = self
            .source
            .lock()
            .map_err(|_| DashboardError::Source("record source lock poisoned".into()))?;
        f(&mut *source)
    }

    fn go_live(&mut self) {
        if self.dashboard.state() == ConnectionState::Live {
            return;
        }
        self.disarm();
        let limit = self.config.initial_history_points;
        let initial = match self.fetch(|s| s.fetch_recent(limit)) {
            Ok(records) => records,
            Err(err) => {
                log::warn!("initial load failed: {err}");
                self.sync(SyncLevel::Error, format!("Connection failed: {err}"));
                return;
            }
        };
        let mut renderer = FrameSender { tx: &self.tx };
        self.dashboard.begin_live(&initial, &mut renderer);
        log::info!("live mode started with {} records", initial.len());
        self.send(DashboardMessage::Title(format!(
            "Live Data (Last {} Points)",
            self.config.max_points
        )));
        self.send(DashboardMessage::Tables(self.dashboard.tables()));
        self.send(DashboardMessage::Connection(ConnectionState::Live));
        self.sync(SyncLevel::Info, "Connected. Waiting for live data...".to_owned());
        if let Some(dir) = self.config.log_dir.clone() {
            match self.recorder.start(&dir, &self.config.channel_keys()) {
                Ok(path) => self.send(DashboardMessage::Log(format!("Recording to {}", path.display()))),
                Err(err) => {
                    log::warn!("session log disabled: {err}");
                    self.send(DashboardMessage::Log(format!("Recording failed: {err}")));
                }
            }
        }
        self.next_poll = Some(Instant::now() + self.config.poll_interval());
    }

    fn load_history(&mut self, start_ms: i64, end_ms: i64) {
        if start_ms >= end_ms {
            log::warn!("rejected history range {start_ms}..{end_ms}");
            self.sync(SyncLevel::Warn, "Start time must be before end time.".to_owned());
            return;
        }
        // 先停掉定时器，再发起历史查询
        self.disarm();
        self.recorder.stop();
        let records = match self.fetch(|s| s.fetch_range(start_ms, end_ms)) {
            Ok(records) => records,
            Err(err) => {
                log::warn!("history load failed: {err}");
                self.sync(SyncLevel::Error, format!("History load failed: {err}"));
                return;
            }
        };
        let mut renderer = FrameSender { tx: &self.tx };
        self.dashboard.load_history(&records, &mut renderer);
        log::info!("loaded {} historical records", records.len());
        self.send(DashboardMessage::Title(format!(
            "Historical Data ({} records)",
            records.len()
        )));
        self.send(DashboardMessage::Tables(self.dashboard.tables()));
        self.send(DashboardMessage::Connection(ConnectionState::Historical));
        self.sync(SyncLevel::Info, format!("Loaded {} historical records.", records.len()));
    }

    fn disconnect(&mut self) {
        self.disarm();
        self.recorder.stop();
        let mut renderer = FrameSender { tx: &self.tx };
        self.dashboard.disconnect(&mut renderer);
        log::info!("disconnected");
        self.send(DashboardMessage::Tables(self.dashboard.tables()));
        self.send(DashboardMessage::Connection(ConnectionState::Disconnected));
        self.sync(SyncLevel::Info, "Disconnected.".to_owned());
    }

    fn disarm(&mut self) {
        self.next_poll = None;
        self.epoch += 1;
    }

    fn poll_due(&self) -> bool {
        !self.poll_in_flight && self.next_poll.is_some_and(|at| Instant::now() >= at)
    }

    fn start_poll(&mut self) {
        self.poll_in_flight = true;
        self.next_poll = Some(Instant::now() + self.config.poll_interval());
        let source = Arc::clone(&self.source);
        let poll_tx = self.poll_tx.clone();
        let epoch = self.epoch;
        thread::spawn(move || {
            let result = match source.lock() {
                Ok(mut source) => source.fetch_latest(),
                Err(_) => Err(DashboardError::Source("record source lock poisoned".into())),
            };
            poll_tx.send((epoch, result)).ok();
        });
    }

    fn apply_poll(&mut self, result: Result<LivePoll, DashboardError>) {
        let poll = match result {
            Ok(poll) => poll,
            Err(err) => {
                log::warn!("live poll failed: {err}");
                self.sync(SyncLevel::Error, format!("Live data poll failed: {err}"));
                return;
            }
        };
        let polled_at = poll.polled_at_ms();
        let logged = match &poll {
            LivePoll::Synced { record, scores, .. } => Some((record.clone(), *scores)),
            LivePoll::Waiting { .. } => None,
        };
        let mut renderer = FrameSender { tx: &self.tx };
        match self.dashboard.apply_poll(poll, &mut renderer) {
            PollOutcome::Applied => {
                if let Some((record, scores)) = logged {
                    if let Err(err) = self.recorder.write_record(&record, scores.as_ref()) {
                        log::warn!("failed to write session log: {err}");
                    }
                }
                self.send(DashboardMessage::Tables(self.dashboard.tables()));
                self.sync(
                    SyncLevel::Info,
                    format!("Data synced. Last update: {} {}", clock_label(polled_at), CLOCK_ZONE),
                );
            }
            PollOutcome::Waiting => self.sync(
                SyncLevel::Warn,
                format!("Waiting for new data. Last check: {} {}", clock_label(polled_at), CLOCK_ZONE),
            ),
            PollOutcome::Ignored => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::{ManualSource, ModelScores, Record};

    const WAIT: Duration = Duration::from_secs(3);

    fn history(count: i64) -> Vec<Record> {
        (0..count)
            .map(|i| Record::new(i * 1000).with("hr", 70.0).with("spo2", 98.0))
            .collect()
    }

    fn synced(timestamp: i64, hr: f64) -> LivePoll {
        LivePoll::Synced {
            record: Record::new(timestamp).with("hr", hr),
            scores: Some(ModelScores {
                sleep_quality_index: 80.0,
                psychosomatic_stress_index: 45.0,
                cognitive_load_score: 60.0,
                cardiovascular_health_index: 75.0,
                emotional_vitality_score: 52.0,
            }),
            polled_at_ms: timestamp,
        }
    }

    fn fast_config() -> DashboardConfig {
        DashboardConfig { poll_interval_ms: 10, ..DashboardConfig::default() }
    }

    fn start(
        config: DashboardConfig,
        source: ManualSource,
    ) -> (Sender<DashboardCommand>, Receiver<DashboardMessage>, JoinHandle<()>) {
        let (tx, rx) = channel();
        let (tx_cmd, rx_cmd) = channel();
        let handle = spawn_thread(config, source, tx, rx_cmd).unwrap();
        (tx_cmd, rx, handle)
    }

    // 读消息直到满足条件, 中间的消息丢弃
    fn wait_for(
        rx: &Receiver<DashboardMessage>,
        mut pred: impl FnMut(&DashboardMessage) -> bool,
    ) -> DashboardMessage {
        let deadline = Instant::now() + WAIT;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(left) {
                Ok(msg) if pred(&msg) => return msg,
                Ok(_) => continue,
                Err(err) => panic!("expected message never arrived: {err}"),
            }
        }
    }

    #[test]
    fn connect_loads_window_and_applies_polls() {
        let source = ManualSource::new(history(120), vec![synced(120_000, 90.0)]);
        let (tx_cmd, rx, handle) = start(fast_config(), source);
        tx_cmd.send(DashboardCommand::Connect).unwrap();
        let title = wait_for(&rx, |m| matches!(m, DashboardMessage::Title(_)));
        assert!(matches!(title, DashboardMessage::Title(t) if t == "Live Data (Last 100 Points)"));
        let frame = wait_for(&rx, |m| {
            matches!(m, DashboardMessage::Channel(f) if f.key == "hr" && f.samples.len() == 100 && f.latest().map(|s| s.y) == Some(90.0))
        });
        let DashboardMessage::Channel(frame) = frame else { unreachable!() };
        assert_eq!(frame.samples[0].x, 21_000);
        assert_eq!(frame.stats.map(|s| s.current), Some(90.0));
        let synced_msg = wait_for(&rx, |m| {
            matches!(m, DashboardMessage::Sync { level: SyncLevel::Info, text } if text.starts_with("Data synced"))
        });
        assert!(matches!(synced_msg, DashboardMessage::Sync { text, .. } if text.ends_with(":00 UTC")));
        wait_for(&rx, |m| matches!(m, DashboardMessage::Sync { level: SyncLevel::Warn, .. }));
        drop(tx_cmd);
        handle.join().unwrap();
    }

    #[test]
    fn source_failures_are_reported_and_polling_continues() {
        let mut source = ManualSource::new(history(5), Vec::new());
        source.push_failure("backend unreachable");
        source.push_poll(synced(5000, 72.0));
        let (tx_cmd, rx, handle) = start(fast_config(), source);
        tx_cmd.send(DashboardCommand::Connect).unwrap();
        let failed = wait_for(&rx, |m| matches!(m, DashboardMessage::Sync { level: SyncLevel::Error, .. }));
        assert!(matches!(failed, DashboardMessage::Sync { text, .. } if text.contains("backend unreachable")));
        wait_for(&rx, |m| {
            matches!(m, DashboardMessage::Sync { level: SyncLevel::Info, text } if text.starts_with("Data synced"))
        });
        drop(tx_cmd);
        handle.join().unwrap();
    }

    #[test]
    fn history_load_stops_live_updates() {
        let source = ManualSource::new(history(30), Vec::new());
        let (tx_cmd, rx, handle) = start(fast_config(), source);
        tx_cmd.send(DashboardCommand::Connect).unwrap();
        wait_for(&rx, |m| matches!(m, DashboardMessage::Connection(ConnectionState::Live)));
        tx_cmd.send(DashboardCommand::LoadHistory { start_ms: 10_000, end_ms: 5_000 }).unwrap();
        wait_for(&rx, |m| {
            matches!(m, DashboardMessage::Sync { level: SyncLevel::Warn, text } if text.starts_with("Start time"))
        });
        tx_cmd.send(DashboardCommand::LoadHistory { start_ms: 10_000, end_ms: 14_000 }).unwrap();
        let frame = wait_for(&rx, |m| matches!(m, DashboardMessage::Channel(f) if f.key == "hr" && f.samples.len() == 5));
        assert!(matches!(frame, DashboardMessage::Channel(f) if f.samples[0].x == 10_000));
        wait_for(&rx, |m| matches!(m, DashboardMessage::Title(t) if t == "Historical Data (5 records)"));
        wait_for(&rx, |m| matches!(m, DashboardMessage::Connection(ConnectionState::Historical)));
        // 历史模式下不再轮询
        thread::sleep(Duration::from_millis(100));
        assert!(rx.try_iter().all(|m| !matches!(m, DashboardMessage::Sync { level: SyncLevel::Warn, .. })));
        drop(tx_cmd);
        handle.join().unwrap();
    }

    #[test]
    fn disconnect_clears_every_channel() {
        let source = ManualSource::new(history(10), Vec::new());
        let (tx_cmd, rx, handle) = start(fast_config(), source);
        tx_cmd.send(DashboardCommand::Connect).unwrap();
        wait_for(&rx, |m| matches!(m, DashboardMessage::Connection(ConnectionState::Live)));
        tx_cmd.send(DashboardCommand::Disconnect).unwrap();
        let frame = wait_for(&rx, |m| matches!(m, DashboardMessage::Channel(f) if f.key == "hr" && f.samples.is_empty()));
        let DashboardMessage::Channel(frame) = frame else { unreachable!() };
        assert_eq!(frame.stats.map(|s| s.status.as_str()), Some("---"));
        let tables = wait_for(&rx, |m| matches!(m, DashboardMessage::Tables(_)));
        assert!(matches!(tables, DashboardMessage::Tables(t) if t.records.is_empty()));
        wait_for(&rx, |m| matches!(m, DashboardMessage::Connection(ConnectionState::Disconnected)));
        drop(tx_cmd);
        handle.join().unwrap();
    }

    #[test]
    fn session_log_is_written_while_live() {
        let dir = std::env::temp_dir().join(format!("vitalscope-engine-{}", std::process::id()));
        let config = DashboardConfig { log_dir: Some(dir.clone()), ..fast_config() };
        let source = ManualSource::new(history(3), vec![synced(3000, 88.0)]);
        let (tx_cmd, rx, handle) = start(config, source);
        tx_cmd.send(DashboardCommand::Connect).unwrap();
        wait_for(&rx, |m| {
            matches!(m, DashboardMessage::Sync { level: SyncLevel::Info, text } if text.starts_with("Data synced"))
        });
        tx_cmd.send(DashboardCommand::Disconnect).unwrap();
        wait_for(&rx, |m| matches!(m, DashboardMessage::Connection(ConnectionState::Disconnected)));
        let log = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(Result::ok)
            .find(|e| e.file_name().to_string_lossy().starts_with("vitals_log_"))
            .map(|e| std::fs::read_to_string(e.path()).unwrap())
            .unwrap();
        assert!(log.lines().nth(1).unwrap().starts_with("3000,88,"));
        drop(tx_cmd);
        handle.join().unwrap();
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn invalid_config_is_rejected_before_spawning() {
        let (tx, _rx) = channel();
        let (_tx_cmd, rx_cmd) = channel();
        let config = DashboardConfig { channels: Vec::new(), ..DashboardConfig::default() };
        let result = spawn_thread(config, ManualSource::new(Vec::new(), Vec::new()), tx, rx_cmd);
        assert!(matches!(result, Err(DashboardError::Config(_))));
    }

    #[test]
    fn go_live_after_history_rearms_polling() {
        let source = ManualSource::new(history(30), Vec::new());
        let (tx_cmd, rx, handle) = start(fast_config(), source);
        tx_cmd.send(DashboardCommand::Connect).unwrap();
        wait_for(&rx, |m| matches!(m, DashboardMessage::Connection(ConnectionState::Live)));
        tx_cmd.send(DashboardCommand::LoadHistory { start_ms: 0, end_ms: 9_000 }).unwrap();
        wait_for(&rx, |m| matches!(m, DashboardMessage::Connection(ConnectionState::Historical)));
        tx_cmd.send(DashboardCommand::GoLive).unwrap();
        let frame = wait_for(&rx, |m| matches!(m, DashboardMessage::Channel(f) if f.key == "hr"));
        assert!(matches!(frame, DashboardMessage::Channel(f) if f.samples.len() == 30));
        wait_for(&rx, |m| matches!(m, DashboardMessage::Title(t) if t.starts_with("Live Data")));
        wait_for(&rx, |m| matches!(m, DashboardMessage::Connection(ConnectionState::Live)));
        // 定时器重新启动后会再次轮询
        wait_for(&rx, |m| {
            matches!(m, DashboardMessage::Sync { level: SyncLevel::Warn, text } if text.starts_with("Waiting for new data"))
        });
        drop(tx_cmd);
        handle.join().unwrap();
    }

    // 第一次轮询卡住, 直到测试放行
    struct GatedSource {
        inner: ManualSource,
        entered: Sender<()>,
        release: Receiver<()>,
    }

    impl RecordSource for GatedSource {
        fn fetch_recent(&mut self, limit: usize) -> Result<Vec<Record>, DashboardError> {
            self.inner.fetch_recent(limit)
        }
        fn fetch_latest(&mut self) -> Result<LivePoll, DashboardError> {
            self.entered.send(()).ok();
            self.release.recv().ok();
            self.inner.fetch_latest()
        }
        fn fetch_range(&mut self, start_ms: i64, end_ms: i64) -> Result<Vec<Record>, DashboardError> {
            self.inner.fetch_range(start_ms, end_ms)
        }
    }

    #[test]
    fn poll_finishing_after_disconnect_is_discarded() {
        let (entered_tx, entered_rx) = channel();
        let (release_tx, release_rx) = channel();
        let source = GatedSource {
            inner: ManualSource::new(history(5), vec![synced(5000, 95.0)]),
            entered: entered_tx,
            release: release_rx,
        };
        let (tx, rx) = channel();
        let (tx_cmd, rx_cmd) = channel();
        let handle = spawn_thread(fast_config(), source, tx, rx_cmd).unwrap();
        tx_cmd.send(DashboardCommand::Connect).unwrap();
        entered_rx.recv_timeout(WAIT).unwrap();
        tx_cmd.send(DashboardCommand::Disconnect).unwrap();
        wait_for(&rx, |m| matches!(m, DashboardMessage::Sync { text, .. } if text == "Disconnected."));
        release_tx.send(()).unwrap();
        thread::sleep(Duration::from_millis(200));
        for msg in rx.try_iter() {
            assert!(!matches!(msg, DashboardMessage::Channel(_)), "stale poll reached a channel");
            assert!(!matches!(msg, DashboardMessage::Sync { level: SyncLevel::Info, .. }));
        }
        drop(release_tx);
        drop(tx_cmd);
        handle.join().unwrap();
    }
}
