// src/gui.rs
use std::collections::HashMap;
use std::sync::mpsc::{Receiver, Sender};
use std::time::Duration;
use eframe::egui;
use egui::{Color32, RichText};
use egui_plot::{Line, Plot, PlotPoints};
use vitalscope::config::DashboardConfig;
use vitalscope::drivers::simulator::now_ms;
use vitalscope::drivers::{
    export_frames, gap_segments, ChannelConfig, ChannelFrame, ConnectionState, PlotStyle, Sample,
    Status,
};
use vitalscope::tables::{clock_label, ScoreGrade, TableSnapshot, CLOCK_ZONE};
use vitalscope::types::*;

const LINE_COLOR: Color32 = Color32::from_rgb(59, 130, 246);
const GAP_COLOR: Color32 = Color32::from_rgb(239, 68, 68);

pub struct VitalScopeApp {
    config: DashboardConfig,

    // 系统状态
    connection: ConnectionState,
    title: String,
    sync: Option<(SyncLevel, String)>,

    // 数据
    frames: HashMap<String, ChannelFrame>,
    tables: TableSnapshot,

    // 历史查询区间 (分钟前)
    history_from_min: u32,
    history_to_min: u32,

    // 界面日志
    log_messages: Vec<String>,

    // 通讯管道
    rx: Receiver<DashboardMessage>,
    tx_cmd: Sender<DashboardCommand>,
}

impl VitalScopeApp {
    pub fn new(
        config: DashboardConfig,
        rx: Receiver<DashboardMessage>,
        tx_cmd: Sender<DashboardCommand>,
    ) -> Self {
        Self {
            config,
            connection: ConnectionState::Disconnected,
            title: "Not connected".to_owned(),
            sync: None,
            frames: HashMap::new(),
            tables: TableSnapshot::default(),
            history_from_min: 30,
            history_to_min: 0,
            log_messages: vec!["VitalScope ready.".to_owned()],
            rx,
            tx_cmd,
        }
    }

    fn log(&mut self, msg: &str) {
        self.log_messages.push(format!("> {}", msg));
        if self.log_messages.len() > 8 { self.log_messages.remove(0); }
    }

    fn send(&self, cmd: DashboardCommand) {
        self.tx_cmd.send(cmd).ok();
    }

    fn handle(&mut self, msg: DashboardMessage) {
        match msg {
            DashboardMessage::Log(s) => self.log(&s),
            DashboardMessage::Connection(state) => self.connection = state,
            DashboardMessage::Sync { level, text } => self.sync = Some((level, text)),
            DashboardMessage::Title(t) => self.title = t,
            DashboardMessage::Channel(frame) => { self.frames.insert(frame.key.clone(), frame); }
            DashboardMessage::Tables(t) => self.tables = t,
        }
    }

    fn load_history(&mut self) {
        let now = now_ms();
        let start_ms = now - i64::from(self.history_from_min) * 60_000;
        let end_ms = now - i64::from(self.history_to_min) * 60_000;
        self.send(DashboardCommand::LoadHistory { start_ms, end_ms });
    }

    fn export_charts(&mut self) {
        let frames = self
            .config
            .channels
            .iter()
            .filter_map(|c| self.frames.get(&c.key).map(|f| (f, c.label.as_str())));
        let result = export_frames(
            frames,
            &self.config.export_dir,
            &PlotStyle::default(),
            self.config.gap_threshold_ms,
        );
        match result {
            Ok(paths) => self.log(&format!("Saved {} chart(s).", paths.len())),
            Err(err) => self.log(&format!("Export failed: {}", err)),
        }
    }

    fn status_color(status: Status) -> Color32 {
        match status {
            Status::High => Color32::from_rgb(239, 68, 68),
            Status::Low => Color32::from_rgb(245, 158, 11),
            Status::Normal => Color32::from_rgb(34, 197, 94),
            Status::Unknown => Color32::GRAY,
        }
    }

    fn grade_color(score: f64) -> Color32 {
        match ScoreGrade::from_score(score) {
            ScoreGrade::Good => Color32::from_rgb(34, 197, 94),
            ScoreGrade::Fair => Color32::from_rgb(245, 158, 11),
            ScoreGrade::Poor => Color32::from_rgb(239, 68, 68),
        }
    }

    fn format_value(value: Option<f64>, precision: usize) -> String {
        match value {
            Some(v) => format!("{:.*}", precision, v),
            None => "-".to_owned(),
        }
    }

    // === 统计卡片 (心率) ===
    fn draw_stats_cards(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            for channel in self.config.channels.iter().filter(|c| c.stats_enabled) {
                let Some(stats) = self.frames.get(&channel.key).and_then(|f| f.stats) else { continue };
                egui::Frame::group(ui.style()).show(ui, |ui| {
                    ui.vertical(|ui| {
                        ui.label(RichText::new(&channel.label).small());
                        let current = if stats.current > 0.0 {
                            format!("{:.*}", channel.precision, stats.current)
                        } else {
                            "---".to_owned()
                        };
                        ui.label(RichText::new(current).size(28.0).strong());
                        ui.label(RichText::new(stats.status.as_str()).color(Self::status_color(stats.status)).strong());
                        ui.label(format!(
                            "avg {:.1}  min {:.1}  max {:.1}",
                            stats.mean, stats.min, stats.max
                        ));
                    });
                });
            }
        });
    }

    fn draw_score_cards(&self, ui: &mut egui::Ui) {
        let Some(scores) = self.tables.latest_scores else {
            ui.label(RichText::new("No model scores yet.").color(Color32::GRAY));
            return;
        };
        ui.horizontal_wrapped(|ui| {
            for (_, name, value) in scores.entries() {
                egui::Frame::group(ui.style()).show(ui, |ui| {
                    ui.vertical(|ui| {
                        ui.label(RichText::new(name).small());
                        ui.label(RichText::new(format!("{:.2}", value)).size(20.0).color(Self::grade_color(value)));
                    });
                });
            }
        });
    }

    // === 通道曲线：间隔超过阈值的线段画成红色 ===
    fn draw_channel(&self, ui: &mut egui::Ui, channel: &ChannelConfig) {
        let samples: &[Sample] = self.frames.get(&channel.key).map(|f| f.samples.as_slice()).unwrap_or(&[]);
        let newest = samples.last().map(|s| s.x).unwrap_or(0);
        let point = |s: &Sample| [(s.x - newest) as f64 / 1000.0, s.y];
        let latest = samples.last().map(|s| format!("{:.*}", channel.precision, s.y)).unwrap_or_else(|| "-".to_owned());
        ui.label(RichText::new(format!("{}  {}", channel.label, latest)).strong());
        let segments = gap_segments(samples, self.config.gap_threshold_ms);
        Plot::new(&channel.key)
            .height(120.0)
            .allow_scroll(false)
            .show(ui, |plot_ui| {
                let mut run: Vec<[f64; 2]> = Vec::new();
                for segment in &segments {
                    if segment.gap {
                        if run.len() > 1 {
                            plot_ui.line(Line::new(PlotPoints::new(std::mem::take(&mut run))).color(LINE_COLOR));
                        }
                        run.clear();
                        let gap = vec![point(&segment.from), point(&segment.to)];
                        plot_ui.line(Line::new(PlotPoints::new(gap)).color(GAP_COLOR));
                    } else {
                        if run.is_empty() { run.push(point(&segment.from)); }
                        run.push(point(&segment.to));
                    }
                }
                if run.len() > 1 {
                    plot_ui.line(Line::new(PlotPoints::new(run)).color(LINE_COLOR));
                }
            });
    }

    fn draw_tables(&self, ui: &mut egui::Ui) {
        ui.collapsing("Recent records", |ui| {
            egui::ScrollArea::horizontal().id_source("records_scroll").show(ui, |ui| {
                egui::Grid::new("records").striped(true).show(ui, |ui| {
                    ui.label(RichText::new(format!("Time ({})", CLOCK_ZONE)).strong());
                    for channel in &self.config.channels {
                        ui.label(RichText::new(&channel.key).strong());
                    }
                    ui.end_row();
                    for record in &self.tables.records {
                        ui.monospace(clock_label(record.timestamp));
                        for channel in &self.config.channels {
                            ui.monospace(Self::format_value(record.value(&channel.key), channel.precision));
                        }
                        ui.end_row();
                    }
                });
            });
        });
        ui.collapsing("Score log", |ui| {
            egui::ScrollArea::vertical().id_source("score_scroll").max_height(200.0).show(ui, |ui| {
                egui::Grid::new("score_log").striped(true).show(ui, |ui| {
                    ui.label(RichText::new(format!("Time ({})", CLOCK_ZONE)).strong());
                    if let Some(entry) = self.tables.score_log.first() {
                        for (_, name, _) in entry.scores.entries() {
                            ui.label(RichText::new(name).strong());
                        }
                    }
                    ui.end_row();
                    for entry in &self.tables.score_log {
                        ui.monospace(clock_label(entry.timestamp));
                        for (_, _, value) in entry.scores.entries() {
                            ui.label(RichText::new(format!("{:.2}", value)).color(Self::grade_color(value)));
                        }
                        ui.end_row();
                    }
                });
            });
        });
        ui.collapsing("Raw data", |ui| {
            match &self.tables.raw {
                Some(raw) => { ui.monospace(raw); }
                None => { ui.label("No data."); }
            }
        });
    }
}

impl eframe::App for VitalScopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // 1. 消息处理 loop
        while let Ok(msg) = self.rx.try_recv() {
            self.handle(msg);
        }
        ctx.request_repaint_after(Duration::from_millis(100));

        // 2. UI 绘制
        let mut visuals = egui::Visuals::dark();
        visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(10, 10, 15);
        ctx.set_visuals(visuals);

        egui::SidePanel::left("L").min_width(280.0).show(ctx, |ui| {
            ui.add_space(10.0);
            ui.heading("VitalScope");
            ui.label("Biometric Dashboard");
            ui.separator();

            let connected = self.connection != ConnectionState::Disconnected;
            let btn_txt = if connected { "DISCONNECT" } else { "CONNECT" };
            if ui.button(btn_txt).clicked() {
                if connected { self.send(DashboardCommand::Disconnect); }
                else { self.send(DashboardCommand::Connect); }
            }
            let (dot, label) = match self.connection {
                ConnectionState::Live => (Color32::GREEN, "Live"),
                ConnectionState::Historical => (Color32::LIGHT_BLUE, "Historical"),
                ConnectionState::Disconnected => (Color32::GRAY, "Disconnected"),
            };
            ui.colored_label(dot, format!("● {}", label));

            ui.add_space(20.0);
            ui.label("HISTORY");
            ui.horizontal(|ui| {
                ui.label("From");
                ui.add(egui::DragValue::new(&mut self.history_from_min).clamp_range(1..=10_080).suffix(" min ago"));
            });
            ui.horizontal(|ui| {
                ui.label("To");
                ui.add(egui::DragValue::new(&mut self.history_to_min).clamp_range(0..=10_080).suffix(" min ago"));
            });
            ui.horizontal(|ui| {
                if ui.button("Load History").clicked() { self.load_history(); }
                if ui.add_enabled(self.connection == ConnectionState::Historical, egui::Button::new("Go Live")).clicked() {
                    self.send(DashboardCommand::GoLive);
                }
            });

            ui.add_space(20.0);
            if ui.button("💾 Save charts").clicked() { self.export_charts(); }

            ui.add_space(10.0);
            ui.separator();
            egui::ScrollArea::vertical().max_height(160.0).show(ui, |ui| {
                for m in &self.log_messages { ui.monospace(m); }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading(&self.title);
                if let Some((level, text)) = &self.sync {
                    let col = match level {
                        SyncLevel::Info => Color32::from_rgb(34, 197, 94),
                        SyncLevel::Warn => Color32::YELLOW,
                        SyncLevel::Error => Color32::RED,
                    };
                    ui.label(RichText::new(text).color(col));
                }
            });
            ui.separator();
            egui::ScrollArea::vertical().show(ui, |ui| {
                self.draw_stats_cards(ui);
                self.draw_score_cards(ui);
                ui.separator();
                for channel in &self.config.channels {
                    self.draw_channel(ui, channel);
                }
                ui.separator();
                self.draw_tables(ui);
            });
        });
    }
}
