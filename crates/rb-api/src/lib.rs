//! # rb-api
//!
//! The web routing and orchestration layer for Rusty-Blog.

pub mod error;
pub mod handlers;
pub mod middleware;

use actix_web::web;

pub use error::ApiError;
pub use handlers::AppState;
pub use middleware::CurrentUser;

/// Configures the routes for the blog.
///
/// # Developer Note
/// Fixed paths (`/new`, `/follow`, `/groups`, `/group/...`) are registered
/// before the `/{username}` catch-alls, so those words cannot be profiles.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("")
            // The global feed
            .route("/", web::get().to(handlers::index))
            .route("/groups", web::get().to(handlers::list_groups))
            .route("/group/{slug}", web::get().to(handlers::group_posts))
            .route("/new", web::post().to(handlers::new_post))
            .route("/follow", web::get().to(handlers::follow_index))
            // Profiles and their posts
            .route("/{username}", web::get().to(handlers::profile))
            .route("/{username}/follow", web::post().to(handlers::profile_follow))
            .route("/{username}/unfollow", web::post().to(handlers::profile_unfollow))
            .route("/{username}/{post_id}", web::get().to(handlers::post_view))
            .route("/{username}/{post_id}/edit", web::post().to(handlers::post_edit))
            .route("/{username}/{post_id}/comment", web::post().to(handlers::add_comment)),
    );
}
