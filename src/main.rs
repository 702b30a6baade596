// src/main.rs
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
mod gui;
use std::path::PathBuf;
use std::sync::mpsc::channel;
use anyhow::{anyhow, Context};
use eframe::egui;
use vitalscope::config::{DashboardConfig, SourceConfig};
use vitalscope::drivers::simulator::now_ms;
use vitalscope::drivers::{RecordSource, ReplaySource, SimulatedSource};
use vitalscope::engine;
// 配置文件路径由环境变量指定，缺省时使用内置默认值
fn load_config() -> anyhow::Result<DashboardConfig> {
    match std::env::var_os("VITALSCOPE_CONFIG") {
        Some(path) => {
            let path = PathBuf::from(path);
            DashboardConfig::load(&path)
                .with_context(|| format!("failed to load config from {}", path.display()))
        }
        None => Ok(DashboardConfig::default()),
    }
}
fn build_source(source: &SourceConfig) -> anyhow::Result<Box<dyn RecordSource + Send>> {
    match source {
        SourceConfig::Simulation { seed } => {
            let seed = seed.unwrap_or_else(|| now_ms() as u64);
            log::info!("using simulated source (seed {seed})");
            Ok(Box::new(SimulatedSource::new(seed)))
        }
        SourceConfig::Replay { path } => {
            let replay = ReplaySource::from_path(path)
                .with_context(|| format!("failed to open replay file {}", path.display()))?;
            Ok(Box::new(replay))
        }
    }
}
// 入口函数
fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = load_config()?;
    let source = build_source(&config.source)?;
    let (tx, rx) = channel();
    let (tx_cmd, rx_cmd) = channel();
    // 启动后台引擎
    engine::spawn_thread(config.clone(), source, tx, rx_cmd)
        .context("failed to start dashboard engine")?;
    let app = gui::VitalScopeApp::new(config, rx, tx_cmd);
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1463.0, 915.0])
        .with_min_inner_size([1200.0, 760.0])
        .with_title("VitalScope");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native("VitalScope", options, Box::new(move |_cc| Box::new(app)))
        .map_err(|err| anyhow!("gui exited with error: {err}"))
}
