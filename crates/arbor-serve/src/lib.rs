//! Arbor Serve - HTTP API for the forum post engine.
//!
//! This crate exposes the post hierarchy engine over a JSON HTTP API:
//! batch post creation, the three listing orders (flat, tree,
//! parent_tree), single-post fetch, and message edits.
//!
//! # Architecture
//!
//! - **AppState**: shared state (post store over the connection pool,
//!   configuration)
//! - **Routes**: endpoint handlers plus the slow-request middleware
//! - **ApiError**: maps the domain error taxonomy to HTTP status codes

mod error;
mod routes;
mod state;

pub use self::error::ApiError;
pub use self::routes::router;
pub use self::state::{AppState, Config};
