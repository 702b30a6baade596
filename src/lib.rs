// src/lib.rs
//! Live biometric dashboard core.
//!
//! Every channel owns a bounded window of `(timestamp, value)` samples and
//! publishes a [`drivers::ChannelFrame`] to its renderer after each change.
//! Heart rate additionally carries running statistics. The [`engine`] drives
//! a [`drivers::Dashboard`] from a [`drivers::RecordSource`] on a worker thread.
pub mod config;
pub mod drivers;
pub mod engine;
pub mod recorder;
pub mod tables;
pub mod types;
