//! Feed synchronization core.
//!
//! Reconciles three independently arriving data sources — the initial page
//! load, older-page backfill, and newer-item polling — into one ordered,
//! duplicate-free topic list, and coordinates a confirmation-gated delete.
//!
//! Split in two layers:
//!
//! - [`state`] - [`FeedState`], the pure state machine: merges, in-flight
//!   flags, and the delete workflow. No I/O, unit-testable in isolation.
//! - [`controller`] - [`FeedController`], the async shell: spawns API tasks,
//!   owns the poll timer, and routes completions back through [`FeedEvent`].

mod controller;
mod state;

pub use controller::{FeedController, FeedEvent};
pub use state::{FeedFlags, FeedState};
