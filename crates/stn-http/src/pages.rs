//! Read-only pages: stored articles, embedded documents, static assets and the version.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use tracing::{debug, error};

use crate::{api::ApiResponse, AppState};

const USAGE_DOC: &str = include_str!("../assets/index.md");
const CHANGELOG: &str = include_str!("../assets/CHANGELOG.md");
const EXAMPLE_DOC: &str = include_str!("../assets/example.md");

const STYLE_CSS: &str = include_str!("../assets/style.css");
const FAVICON_SVG: &str = include_str!("../assets/favicon.svg");

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(ApiResponse::failure(message))).into_response()
}

fn render(state: &AppState, markdown: &str) -> Response {
    match state.renderer.page(markdown) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!(error = %e, "failed to render markdown");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to render markdown")
        }
    }
}

/// GET /html/{article_id}; unknown ids redirect to `/404`.
pub async fn article(State(state): State<AppState>, Path(article_id): Path<String>) -> Response {
    match state.articles.get_article(&article_id).await {
        Ok(Some(article)) => render(&state, &article.raw_content),
        Ok(None) => {
            debug!(article_id = %article_id, "unknown article");
            (StatusCode::FOUND, [(header::LOCATION, "/404")]).into_response()
        }
        Err(e) => {
            error!(article_id = %article_id, error = %e, "failed to load article");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load article")
        }
    }
}

/// GET /
pub async fn index(State(state): State<AppState>) -> Response {
    render(&state, USAGE_DOC)
}

/// GET /changelog
pub async fn changelog(State(state): State<AppState>) -> Response {
    render(&state, CHANGELOG)
}

/// GET /html/ shows what a `server-html` message looks like.
pub async fn example(State(state): State<AppState>) -> Response {
    render(&state, EXAMPLE_DOC)
}

/// GET /asserts/{file}
pub async fn asset(Path(file): Path<String>) -> Response {
    let (body, content_type) = match file.as_str() {
        "style.css" => (STYLE_CSS, "text/css; charset=utf-8"),
        "favicon.svg" => (FAVICON_SVG, "image/svg+xml"),
        _ => return failure(StatusCode::NOT_FOUND, "404 Not Found"),
    };
    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "public, max-age=86400"),
        ],
        body,
    )
        .into_response()
}

/// GET /version
pub async fn version(State(state): State<AppState>) -> String {
    state.version.clone()
}

pub async fn not_found() -> Response {
    failure(StatusCode::NOT_FOUND, "404 Not Found")
}
