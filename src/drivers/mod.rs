// src/drivers/mod.rs
// 声明同级目录下的子模块文件
pub mod buffer;
pub mod channel;
pub mod error;
pub mod pipeline;
pub mod plot;
pub mod simulator;
pub mod source;
pub mod stats;
// 公开导出这些模块里的结构体，方便外部调用
pub use buffer::{Sample, SeriesBuffer, MAX_POINTS};
pub use channel::{ChannelConfig, ChannelFrame, ChannelPresenter, Renderer};
pub use error::DashboardError;
pub use pipeline::{ConnectionState, Dashboard, PollOutcome};
pub use plot::{export_frames, gap_segments, render_channel_png, PlotStyle, Segment, GAP_THRESHOLD_MS};
pub use simulator::SimulatedSource;
pub use source::{LivePoll, ManualSource, ModelScores, Record, RecordSource, ReplaySource, SCORE_KEYS};
pub use stats::{compute_stats, BandedStats, Statistics, StatsStrategy, Status, NORMAL_BAND_PERCENT};
