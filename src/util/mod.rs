//! Shared text utilities for terminal rendering: Unicode-aware width and
//! truncation, control-character stripping for untrusted topic content, and
//! relative timestamp formatting.

mod text;

pub use text::{display_width, format_relative_time, strip_control_chars, truncate_to_width};
