//! murmur — a terminal client for a topics feed server.
//!
//! The crate is split into a small set of layers:
//! - [`api`]: HTTP client and wire types for the server's REST endpoints
//! - [`feed`]: feed synchronization state machine and its async controller
//! - [`ui`]: ratatui rendering and input handling
//! - [`config`]: TOML configuration loading
//! - [`util`]: text sanitization and timestamp formatting

pub mod api;
pub mod config;
pub mod feed;
pub mod ui;
pub mod util;
