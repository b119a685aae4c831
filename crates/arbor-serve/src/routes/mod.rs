//! API route definitions.

mod health;
mod posts;

use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Build the complete API router.
///
/// # Route Structure
///
/// - `GET /health` - Health check (includes a pool ping)
///
/// ## Posts
/// - `POST  /api/v1/threads/{thread}/posts` - Create a batch of posts
/// - `GET   /api/v1/threads/{thread}/posts` - List posts (flat, tree, parent_tree)
/// - `GET   /api/v1/posts/{id}` - Fetch a single post
/// - `PATCH /api/v1/posts/{id}` - Edit a post's message
///
/// `{thread}` is a thread id or slug.
pub fn router(state: AppState) -> Router {
    let api_v1 = Router::new()
        .route(
            "/threads/{thread}/posts",
            get(posts::list_posts).post(posts::create_posts),
        )
        .route("/posts/{id}", get(posts::get_post).patch(posts::edit_post))
        // Slow-read warnings
        .layer(middleware::from_fn_with_state(
            state.clone(),
            warn_slow_requests,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api_v1)
        .with_state(state)
}

/// Log a warning for GET requests slower than the configured threshold.
///
/// Reads are the latency-sensitive path here (tree listings over large
/// threads); writes get spans from the trace layer already.
async fn warn_slow_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let elapsed = started.elapsed();
    if method == Method::GET && elapsed >= state.config.slow_request_threshold {
        tracing::warn!(
            path = %path,
            elapsed_ms = elapsed.as_millis() as u64,
            "slow request"
        );
    }
    response
}
