// src/types.rs
use crate::drivers::{ChannelFrame, ConnectionState};
use crate::tables::TableSnapshot;

// GUI 发给后台的命令
#[derive(Clone, Debug, PartialEq)]
pub enum DashboardCommand {
    Connect,
    Disconnect,
    /// Millisecond timestamps, inclusive.
    LoadHistory { start_ms: i64, end_ms: i64 },
    GoLive,
}

// 同步状态栏的颜色等级
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncLevel {
    Info,
    Warn,
    Error,
}

// 后台发给 GUI 的消息
#[derive(Clone, Debug)]
pub enum DashboardMessage {
    Log(String),
    Connection(ConnectionState),
    Sync { level: SyncLevel, text: String },
    Title(String),
    Channel(ChannelFrame),
    Tables(TableSnapshot),
}
