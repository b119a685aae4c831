//! The post store: batch-atomic creation and the three read orders.
//!
//! Writes go through one transaction per batch: ids are reserved from the
//! post sequence first, paths are computed against committed parents (or
//! earlier drafts of the same batch), and a single multi-row insert makes
//! the whole batch visible at once or not at all.
//!
//! Reads come in three orders. `flat` and `tree` are single bounded
//! queries; `parent_tree` windows root posts first and hands the member
//! rows to [`crate::assemble`] for regrouping.

use std::collections::{HashMap, HashSet};

use arbor_core::{Error, Post, PostDraft, PostQuery, Result, SortMode, ThreadRef, TreePath};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::assemble;
use crate::directory::{PgDirectory, ThreadDirectory, UserDirectory};
use crate::guard::{self, map_db_error};

/// Column list shared by every post-returning query.
const POST_COLUMNS: &str =
    "id, thread_id, forum_slug, author, parent_id, message, is_edited, created_at, path";

/// Largest accepted create batch. Nine binds per row must stay under
/// PostgreSQL's 65535 bind-parameter cap.
pub const MAX_CREATE_BATCH: usize = 5_000;

/// Post persistence over the shared connection pool.
///
/// Generic over the directory collaborators so tests can substitute stubs;
/// production code uses [`PostStore::new`], which wires in [`PgDirectory`].
#[derive(Debug, Clone)]
pub struct PostStore<D = PgDirectory> {
    pool: PgPool,
    directory: D,
}

impl PostStore<PgDirectory> {
    /// Store over `pool`, resolving threads and users from the same pool.
    pub fn new(pool: PgPool) -> Self {
        let directory = PgDirectory::new(pool.clone());
        Self { pool, directory }
    }
}

impl<D> PostStore<D>
where
    D: ThreadDirectory + UserDirectory,
{
    /// Store with an explicit directory implementation.
    pub fn with_directory(pool: PgPool, directory: D) -> Self {
        Self { pool, directory }
    }

    /// The underlying pool handle.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create a batch of posts in `thread`, atomically.
    ///
    /// Every draft's author must exist and every parent must be a post of
    /// the same thread — either already committed or an earlier draft of
    /// this batch (resolved through the batch's reserved ids). The whole
    /// batch shares one `created_at`; ties are resolved by id order. The
    /// result preserves the caller's draft order.
    ///
    /// Errors: `NotFound` for a missing thread or author, `Conflict` for a
    /// parent that is absent or lives in another thread. On any error
    /// nothing is written.
    pub async fn create_posts(&self, thread: &ThreadRef, drafts: &[PostDraft]) -> Result<Vec<Post>> {
        let meta = self.directory.resolve(thread).await?;

        if drafts.is_empty() {
            return Ok(Vec::new());
        }
        if drafts.len() > MAX_CREATE_BATCH {
            return Err(Error::invalid_argument(format!(
                "create batch exceeds {MAX_CREATE_BATCH} posts"
            )));
        }

        guard::check_authors(&self.directory, drafts).await?;

        let mut tx = self.pool.begin().await.map_err(|e| map_db_error("posts", e))?;

        // Reserve the batch's ids up front so paths can be computed, and
        // intra-batch parent references resolved, before anything is
        // written.
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT nextval('posts_id_seq') FROM generate_series(1, $1)")
                .bind(drafts.len() as i64)
                .fetch_all(&mut *tx)
                .await
                .map_err(|e| map_db_error("posts", e))?;

        // One timestamp for the whole batch. now() is fixed for the
        // transaction, so insertion order within the batch is recovered
        // from id order alone.
        let created_at: DateTime<Utc> = sqlx::query_scalar("SELECT now()")
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_db_error("posts", e))?;

        // Parents that must already be committed: everything the batch
        // does not supply itself. Fetched on the transaction's connection,
        // so another in-flight batch can never contribute a parent.
        let batch_ids: HashSet<i64> = ids.iter().copied().collect();
        let mut wanted: Vec<i64> = drafts
            .iter()
            .filter_map(|d| d.parent)
            .filter(|p| !batch_ids.contains(p))
            .collect();
        wanted.sort_unstable();
        wanted.dedup();
        let committed = if wanted.is_empty() {
            HashMap::new()
        } else {
            guard::fetch_parent_paths(&mut tx, meta.id, &wanted).await?
        };

        let paths = compute_batch_paths(meta.id, &ids, drafts, &committed)?;

        let posts: Vec<Post> = drafts
            .iter()
            .enumerate()
            .map(|(i, draft)| Post {
                id: ids[i],
                thread_id: meta.id,
                forum_slug: meta.forum_slug.clone(),
                author: draft.author.clone(),
                parent_id: draft.parent,
                message: draft.message.clone(),
                is_edited: false,
                created_at,
                path: paths[i].clone(),
            })
            .collect();

        let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new(
            "INSERT INTO posts \
             (id, thread_id, forum_slug, author, parent_id, message, is_edited, created_at, path) ",
        );
        builder.push_values(&posts, |mut b, post| {
            b.push_bind(post.id)
                .push_bind(post.thread_id)
                .push_bind(&post.forum_slug)
                .push_bind(&post.author)
                .push_bind(post.parent_id)
                .push_bind(&post.message)
                .push_bind(post.is_edited)
                .push_bind(post.created_at)
                .push_bind(post.path.segments().to_vec());
        });
        builder.build().execute(&mut *tx).await.map_err(|e| {
            // Constraint races slip past the pre-checks; name the kind the
            // pre-check would have reported.
            let constraint = e
                .as_database_error()
                .and_then(|db| db.constraint())
                .map(str::to_owned);
            match constraint.as_deref() {
                Some("posts_author_fkey") => Error::not_found("author"),
                Some(name) => {
                    tracing::warn!(constraint = name, "post insert violated constraint");
                    Error::conflict("referential rule violated")
                }
                None => map_db_error("posts", e),
            }
        })?;

        tx.commit().await.map_err(|e| map_db_error("posts", e))?;

        tracing::debug!(
            thread_id = meta.id,
            count = posts.len(),
            "created post batch"
        );
        Ok(posts)
    }

    /// List a thread's posts in the order `query` asks for.
    ///
    /// Fails with `NotFound` if the thread does not exist and
    /// `InvalidArgument` for out-of-range parameters. A `since` id that
    /// names no post of the thread yields an empty page.
    pub async fn get_posts(&self, thread: &ThreadRef, query: &PostQuery) -> Result<Vec<Post>> {
        query.validate()?;
        let meta = self.directory.resolve(thread).await?;

        match query.sort {
            SortMode::Flat => self.fetch_flat(meta.id, query).await,
            SortMode::Tree => self.fetch_tree(meta.id, query).await,
            SortMode::ParentTree => self.fetch_parent_tree(meta.id, query).await,
        }
    }

    /// Fetch a single post by id.
    pub async fn get_post(&self, id: i64) -> Result<Post> {
        let row = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error("posts", e))?
            .ok_or_else(|| Error::not_found(format!("post {id}")))?;
        post_from_row(&row)
    }

    /// Update a post's message.
    ///
    /// `is_edited` flips only when the new message differs from the stored
    /// one; editing with identical text, or passing no text, is a read.
    pub async fn edit_post(&self, id: i64, message: Option<&str>) -> Result<Post> {
        let Some(message) = message else {
            return self.get_post(id).await;
        };

        let row = sqlx::query(&format!(
            "UPDATE posts SET is_edited = is_edited OR message <> $2, message = $2 \
             WHERE id = $1 RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(message)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("posts", e))?
        .ok_or_else(|| Error::not_found(format!("post {id}")))?;
        post_from_row(&row)
    }

    /// Verify the database is reachable.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_error("ping", e))?;
        Ok(())
    }

    /// Standalone parent probe: `NotFound` if the post is absent,
    /// `Conflict` if it lives in a different thread.
    pub async fn parent_valid(&self, parent_id: i64, thread_id: i64) -> Result<()> {
        let parent_thread: Option<i64> =
            sqlx::query_scalar("SELECT thread_id FROM posts WHERE id = $1")
                .bind(parent_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_db_error("posts", e))?;

        match parent_thread {
            None => Err(Error::not_found(format!("post {parent_id}"))),
            Some(t) if t != thread_id => Err(Error::conflict(format!(
                "parent post {parent_id} belongs to another thread"
            ))),
            Some(_) => Ok(()),
        }
    }

    /// Chronological `(created_at, id)` order.
    async fn fetch_flat(&self, thread_id: i64, query: &PostQuery) -> Result<Vec<Post>> {
        // Direction fragments come from the enum, the limit is a validated
        // integer; only ids are bound.
        let (op, dir) = cursor_fragments(query.desc);

        let mut sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE thread_id = $1");
        if query.since.is_some() {
            sql.push_str(&format!(
                " AND (created_at, id) {op} \
                 (SELECT created_at, id FROM posts WHERE id = $2 AND thread_id = $1)"
            ));
        }
        sql.push_str(&format!(" ORDER BY created_at {dir}, id {dir}"));
        push_limit(&mut sql, query.limit);

        let mut q = sqlx::query(&sql).bind(thread_id);
        if let Some(since) = query.since {
            q = q.bind(since);
        }
        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error("posts", e))?;
        rows.iter().map(post_from_row).collect()
    }

    /// Full depth-first order by path.
    async fn fetch_tree(&self, thread_id: i64, query: &PostQuery) -> Result<Vec<Post>> {
        let (op, dir) = cursor_fragments(query.desc);

        let mut sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE thread_id = $1");
        if query.since.is_some() {
            // The cursor position is the since post's *path*, not its id:
            // path order and id order disagree as soon as replies nest.
            sql.push_str(&format!(
                " AND path {op} (SELECT path FROM posts WHERE id = $2 AND thread_id = $1)"
            ));
        }
        sql.push_str(&format!(" ORDER BY path {dir}"));
        push_limit(&mut sql, query.limit);

        let mut q = sqlx::query(&sql).bind(thread_id);
        if let Some(since) = query.since {
            q = q.bind(since);
        }
        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error("posts", e))?;
        rows.iter().map(post_from_row).collect()
    }

    /// Tree order with `limit`/`since` applied to root posts.
    async fn fetch_parent_tree(&self, thread_id: i64, query: &PostQuery) -> Result<Vec<Post>> {
        let (op, dir) = cursor_fragments(query.desc);

        // Step 1: window the root posts. Root ids are sequence-assigned,
        // so id order is creation order.
        let mut sql =
            "SELECT id FROM posts WHERE thread_id = $1 AND parent_id IS NULL".to_string();
        if query.since.is_some() {
            // The cursor resumes after the since post's root ancestor.
            sql.push_str(&format!(
                " AND id {op} (SELECT path[1] FROM posts WHERE id = $2 AND thread_id = $1)"
            ));
        }
        sql.push_str(&format!(" ORDER BY id {dir}"));
        push_limit(&mut sql, query.limit);

        let mut q = sqlx::query_scalar(&sql).bind(thread_id);
        if let Some(since) = query.since {
            q = q.bind(since);
        }
        let roots: Vec<i64> = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error("posts", e))?;

        if roots.is_empty() {
            return Ok(Vec::new());
        }

        // Step 2: every post under those roots, in path order. Path order
        // keeps each subtree contiguous; the assembler rearranges the
        // groups into root-selection order.
        let rows = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} FROM posts \
             WHERE thread_id = $1 AND path[1] = ANY($2) ORDER BY path"
        ))
        .bind(thread_id)
        .bind(&roots)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error("posts", e))?;

        let posts = rows
            .iter()
            .map(post_from_row)
            .collect::<Result<Vec<Post>>>()?;
        Ok(assemble::window_by_roots(&roots, posts))
    }
}

/// `(comparison, direction)` SQL fragments for a listing direction.
fn cursor_fragments(desc: bool) -> (&'static str, &'static str) {
    if desc {
        ("<", "DESC")
    } else {
        (">", "ASC")
    }
}

/// Append a LIMIT clause unless the limit is the unbounded sentinel.
fn push_limit(sql: &mut String, limit: i64) {
    if limit > 0 {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
}

/// Decode one post row.
fn post_from_row(row: &PgRow) -> Result<Post> {
    let decode = |e| map_db_error("posts", e);
    let segments: Vec<i64> = row.try_get("path").map_err(decode)?;
    let path = TreePath::from_segments(segments)
        .ok_or_else(|| Error::internal("post row carries an empty path"))?;

    Ok(Post {
        id: row.try_get("id").map_err(decode)?,
        thread_id: row.try_get("thread_id").map_err(decode)?,
        forum_slug: row.try_get("forum_slug").map_err(decode)?,
        author: row.try_get("author").map_err(decode)?,
        parent_id: row.try_get("parent_id").map_err(decode)?,
        message: row.try_get("message").map_err(decode)?,
        is_edited: row.try_get("is_edited").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
        path,
    })
}

/// Compute the path of every draft in a batch.
///
/// `ids[i]` is the id reserved for draft `i`. A parent reference resolves
/// against committed posts (their paths in `committed`) or against an
/// earlier draft of the same batch through the reserved ids. References to
/// later drafts and to unknown posts are conflicts.
fn compute_batch_paths(
    thread_id: i64,
    ids: &[i64],
    drafts: &[PostDraft],
    committed: &HashMap<i64, TreePath>,
) -> Result<Vec<TreePath>> {
    let batch_index: HashMap<i64, usize> =
        ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    let mut paths: Vec<TreePath> = Vec::with_capacity(drafts.len());
    for (i, draft) in drafts.iter().enumerate() {
        let path = match draft.parent {
            None => TreePath::root(ids[i]),
            Some(parent) => match batch_index.get(&parent) {
                Some(&j) if j < i => paths[j].child(ids[i]),
                Some(_) => {
                    return Err(Error::conflict(format!(
                        "parent post {parent} does not precede its reply in the batch"
                    )));
                }
                None => match committed.get(&parent) {
                    Some(parent_path) => parent_path.child(ids[i]),
                    None => {
                        return Err(Error::conflict(format!(
                            "parent post {parent} does not exist in thread {thread_id}"
                        )));
                    }
                },
            },
        };
        paths.push(path);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::ThreadMeta;

    fn draft(author: &str, parent: Option<i64>) -> PostDraft {
        PostDraft {
            author: author.to_string(),
            message: "hello".to_string(),
            parent,
        }
    }

    // =========================================================================
    // Batch path computation
    // =========================================================================

    #[test]
    fn test_batch_paths_roots_and_committed_parents() {
        let committed = HashMap::from([(3, TreePath::root(3))]);
        let drafts = [draft("ada", None), draft("ada", Some(3))];
        let paths = compute_batch_paths(1, &[10, 11], &drafts, &committed).unwrap();

        assert_eq!(paths[0], TreePath::root(10));
        assert_eq!(paths[1], TreePath::root(3).child(11));
    }

    #[test]
    fn test_batch_paths_intra_batch_parent() {
        // Draft 1 replies to draft 0 through its reserved id, draft 2
        // replies to draft 1.
        let drafts = [
            draft("ada", None),
            draft("bob", Some(10)),
            draft("ada", Some(11)),
        ];
        let paths = compute_batch_paths(1, &[10, 11, 12], &drafts, &HashMap::new()).unwrap();

        assert_eq!(paths[0], TreePath::root(10));
        assert_eq!(paths[1], TreePath::root(10).child(11));
        assert_eq!(paths[2], TreePath::root(10).child(11).child(12));
    }

    #[test]
    fn test_batch_paths_forward_reference_is_conflict() {
        // Draft 0 names draft 1's reserved id as parent.
        let drafts = [draft("ada", Some(11)), draft("ada", None)];
        let err = compute_batch_paths(1, &[10, 11], &drafts, &HashMap::new()).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_batch_paths_unknown_parent_is_conflict() {
        let drafts = [draft("ada", Some(99))];
        let err = compute_batch_paths(1, &[10], &drafts, &HashMap::new()).unwrap_err();
        assert!(err.is_conflict());
        assert!(err.to_string().contains("99"));
    }

    // =========================================================================
    // Guard ordering without a live database
    // =========================================================================

    /// Directory stub: a fixed thread and user set, no database behind it.
    #[derive(Clone)]
    struct StubDirectory {
        thread: Option<ThreadMeta>,
        users: Vec<String>,
    }

    impl ThreadDirectory for StubDirectory {
        async fn resolve(&self, thread: &ThreadRef) -> Result<ThreadMeta> {
            self.thread
                .clone()
                .ok_or_else(|| Error::not_found(thread.to_string()))
        }
    }

    impl UserDirectory for StubDirectory {
        async fn exists(&self, nickname: &str) -> Result<bool> {
            Ok(self.users.iter().any(|u| u == nickname))
        }
    }

    /// A pool that errors on first use; guard failures must precede it.
    fn dead_pool() -> PgPool {
        PgPool::connect_lazy("postgres://localhost:1/unreachable").unwrap()
    }

    fn stub_store(thread: Option<ThreadMeta>, users: &[&str]) -> PostStore<StubDirectory> {
        PostStore::with_directory(
            dead_pool(),
            StubDirectory {
                thread,
                users: users.iter().map(|u| u.to_string()).collect(),
            },
        )
    }

    #[tokio::test]
    async fn test_create_in_missing_thread_is_not_found() {
        let store = stub_store(None, &["ada"]);
        let err = store
            .create_posts(&ThreadRef::Id(1), &[draft("ada", None)])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_create_with_missing_author_is_not_found() {
        let meta = ThreadMeta {
            id: 1,
            forum_slug: "general".to_string(),
        };
        let store = stub_store(Some(meta), &["ada"]);
        let err = store
            .create_posts(&ThreadRef::Id(1), &[draft("ghost", None)])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("ghost"));
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop_success() {
        let meta = ThreadMeta {
            id: 1,
            forum_slug: "general".to_string(),
        };
        let store = stub_store(Some(meta), &[]);
        // Never reaches the (dead) pool.
        let created = store.create_posts(&ThreadRef::Id(1), &[]).await.unwrap();
        assert!(created.is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch_still_requires_thread() {
        let store = stub_store(None, &[]);
        let err = store
            .create_posts(&ThreadRef::Slug("gone".into()), &[])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_oversized_batch_is_invalid_argument() {
        let meta = ThreadMeta {
            id: 1,
            forum_slug: "general".to_string(),
        };
        let store = stub_store(Some(meta), &["ada"]);
        let drafts = vec![draft("ada", None); MAX_CREATE_BATCH + 1];
        let err = store
            .create_posts(&ThreadRef::Id(1), &drafts)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_get_posts_rejects_negative_limit_before_storage() {
        let meta = ThreadMeta {
            id: 1,
            forum_slug: "general".to_string(),
        };
        let store = stub_store(Some(meta), &[]);
        let query = PostQuery {
            limit: -5,
            ..PostQuery::default()
        };
        let err = store
            .get_posts(&ThreadRef::Id(1), &query)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    // =========================================================================
    // SQL text construction
    // =========================================================================

    #[test]
    fn test_cursor_fragments() {
        assert_eq!(cursor_fragments(false), (">", "ASC"));
        assert_eq!(cursor_fragments(true), ("<", "DESC"));
    }

    #[test]
    fn test_push_limit_skips_unbounded_sentinel() {
        let mut sql = String::from("SELECT 1");
        push_limit(&mut sql, 0);
        assert_eq!(sql, "SELECT 1");
        push_limit(&mut sql, 25);
        assert_eq!(sql, "SELECT 1 LIMIT 25");
    }
}
