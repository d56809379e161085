//! Client for the topics HTTP API.
//!
//! Two submodules:
//!
//! - [`types`] - Wire types mirroring the server's camelCase JSON
//! - [`client`] - [`ApiClient`], a thin reqwest wrapper for every endpoint
//!   the feed needs: initial page, cursor-based older/newer pages, new-topic
//!   count, post, delete, and login
//!
//! Failure is uniform: every call yields an [`ApiError`], and callers recover
//! by clearing their in-flight flag and leaving prior state intact.

mod client;
mod types;

pub use client::{ApiClient, ApiError, Credentials};
pub use types::{Attachment, Topic, TopicPage, User};
