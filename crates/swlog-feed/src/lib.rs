//! Lifecycle feed for swlog.
//!
//! Worker lifecycle notifications arrive as newline-delimited JSON records
//! from a child process, a recorded session file, or stdin. This crate owns
//! the record schema and the background reader that turns a byte stream into
//! records the app can normalise into tracker signals.

pub mod protocol;
pub mod runtime;

pub use protocol::{ControllerView, FeedLine, FeedRecord};
pub use runtime::{FeedError, FeedEvent, FeedSource};
