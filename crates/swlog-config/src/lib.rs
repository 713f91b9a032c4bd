//! Configuration types and loaders for swlog.
//!
//! This crate owns the on-disk configuration schema so the app and the feed
//! runtime share a single source of truth.

pub mod monitor;

pub use monitor::{FeedConfig, FeedSpec, MonitorConfig};
