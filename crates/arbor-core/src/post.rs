//! Forum domain types: posts, thread references, and list queries.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::path::TreePath;

/// A reply post inside a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Sequence-assigned id, immutable.
    pub id: i64,
    /// Owning thread, immutable.
    pub thread_id: i64,
    /// Forum slug denormalized from the owning thread at creation time.
    pub forum_slug: String,
    /// Author nickname; must exist when the post is created.
    pub author: String,
    /// Parent post id; `None` for a root post. A parent always belongs to
    /// the same thread.
    pub parent_id: Option<i64>,
    /// Message body. Mutable through the edit operation.
    pub message: String,
    /// Set once an edit actually changes the message.
    pub is_edited: bool,
    /// Insertion timestamp; shared by every post of one create batch, with
    /// ties resolved by id order.
    pub created_at: DateTime<Utc>,
    /// Materialized ancestry path, ending with this post's own id.
    pub path: TreePath,
}

/// Caller-supplied fields of a post to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDraft {
    /// Author nickname.
    pub author: String,
    /// Message body.
    pub message: String,
    /// Optional parent post id. May also name the id assigned to an
    /// earlier draft of the same batch.
    #[serde(default)]
    pub parent: Option<i64>,
}

/// A thread named either by numeric id or by slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadRef {
    /// Numeric thread id.
    Id(i64),
    /// Thread slug.
    Slug(String),
}

impl ThreadRef {
    /// Parse a path segment: anything that parses as an integer is an id,
    /// everything else is a slug.
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<i64>() {
            Ok(id) => Self::Id(id),
            Err(_) => Self::Slug(raw.to_string()),
        }
    }
}

impl fmt::Display for ThreadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "thread {id}"),
            Self::Slug(slug) => write!(f, "thread '{slug}'"),
        }
    }
}

/// Thread identity as resolved by the thread directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadMeta {
    /// Numeric thread id.
    pub id: i64,
    /// Slug of the forum the thread lives in.
    pub forum_slug: String,
}

/// Listing order for a thread's posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Chronological `(created_at, id)` order.
    #[default]
    Flat,
    /// Full depth-first tree order by path.
    Tree,
    /// Tree order with `limit`/`since` applied to root posts; every
    /// selected root is returned together with all of its descendants.
    ParentTree,
}

impl SortMode {
    /// Wire name of the mode, as accepted by [`SortMode::from_str`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Tree => "tree",
            Self::ParentTree => "parent_tree",
        }
    }
}

impl FromStr for SortMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flat" => Ok(Self::Flat),
            "tree" => Ok(Self::Tree),
            "parent_tree" => Ok(Self::ParentTree),
            other => Err(Error::invalid_argument(format!(
                "unknown sort mode '{other}' (expected flat, tree, or parent_tree)"
            ))),
        }
    }
}

/// Parameters for listing a thread's posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    /// Maximum number of rows (`Flat`/`Tree`) or root groups
    /// (`ParentTree`). `0` means unbounded.
    pub limit: i64,
    /// Resume strictly after (or before, when `desc`) the post with this
    /// id, in the chosen order. A `since` that names no post in the thread
    /// yields an empty page.
    pub since: Option<i64>,
    /// Listing order.
    pub sort: SortMode,
    /// Reverse the listing order.
    pub desc: bool,
}

impl Default for PostQuery {
    fn default() -> Self {
        Self {
            limit: 0,
            since: None,
            sort: SortMode::Flat,
            desc: false,
        }
    }
}

impl PostQuery {
    /// Reject out-of-range parameters before they reach the store.
    pub fn validate(&self) -> Result<(), Error> {
        if self.limit < 0 {
            return Err(Error::invalid_argument(format!(
                "limit must not be negative, got {}",
                self.limit
            )));
        }
        Ok(())
    }
}
