//! Core types and shared utilities for the Arbor forum engine.
//!
//! This crate provides:
//! - The error taxonomy shared by every component
//! - The materialized-path codec used for tree-ordered post storage
//! - Domain types for posts, thread references, and list queries

mod error;
mod path;
mod post;

pub use error::{Error, Result};
pub use path::TreePath;
pub use post::{Post, PostDraft, PostQuery, SortMode, ThreadMeta, ThreadRef};
