pub mod auth;
pub mod contact;
pub mod home;
pub mod mail;
pub mod posts;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// The full HTTP surface of the blog.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(home::index))
        .route("/about", get(home::about))
        .merge(auth::router())
        .merge(posts::router())
        .merge(contact::router())
        .merge(mail::router())
        .with_state(state)
}
