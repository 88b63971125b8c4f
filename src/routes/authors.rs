use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Author Router Module
///
/// Paths are relative to the mount prefix. Credentials are enforced by the
/// middleware layered on in `create_router`; the admin tier is enforced by the
/// `AdminAuthor` extractor on the mutating handlers.
///
/// `/me` is a static segment and wins over `/{author_id}`.
pub fn author_routes() -> Router<AppState> {
    Router::new()
        // POST / (admin) and GET /
        .route(
            "/",
            post(handlers::create_author).get(handlers::list_authors),
        )
        // GET/PUT/DELETE /me
        // Operate on the identity resolved from the caller's credentials.
        .route(
            "/me",
            get(handlers::get_me)
                .put(handlers::update_me)
                .delete(handlers::delete_me),
        )
        // GET /me/stories
        .route("/me/stories", get(handlers::get_my_stories))
        // GET /{author_id}, PUT and DELETE are admin only.
        .route(
            "/{author_id}",
            get(handlers::get_author)
                .put(handlers::update_author)
                .delete(handlers::delete_author),
        )
}
