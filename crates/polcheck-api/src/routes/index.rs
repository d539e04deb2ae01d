//! Static front page: a small form for uploading policies and checking a
//! document against them.

use axum::response::Html;
use axum::routing::get;
use axum::Router;

use crate::state::AppState;

const INDEX_HTML: &str = include_str!("../../static/index.html");

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(index))
}

/// GET /: Serve the front page.
async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
