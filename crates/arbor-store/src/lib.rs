//! PostgreSQL persistence for the Arbor forum engine.
//!
//! This crate provides:
//! - **pool**: bounded connection pool construction with per-session
//!   statement timeouts
//! - **schema**: versioned schema bootstrap
//! - **directory**: the thread/user collaborator boundaries and their
//!   PostgreSQL implementation
//! - **posts**: the post store — batch-atomic creation and the flat,
//!   tree, and parent-tree read orders
//! - **assemble**: parent-tree windowing over path-ordered row sets

pub mod assemble;
mod directory;
mod guard;
mod pool;
mod posts;
mod schema;

pub use self::directory::{PgDirectory, ThreadDirectory, UserDirectory};
pub use self::pool::{connect, PoolConfig};
pub use self::posts::{PostStore, MAX_CREATE_BATCH};
pub use self::schema::{init_schema, SCHEMA_VERSION};
