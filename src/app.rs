use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::data::cache::DatasetCache;
use crate::state::SessionState;
use crate::ui;
use crate::view;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Shared by every request. The dataset itself is read-only after loading,
/// sessions only differ by the query string they send.
#[derive(Clone)]
pub struct AppState {
    cache: Arc<DatasetCache>,
}

impl AppState {
    pub fn new(cache: DatasetCache) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .fallback(not_found)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn index(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let dataset = match state.cache.get() {
        Ok(dataset) => dataset,
        Err(err) => {
            let source = state.cache.source().transactions.display().to_string();
            return page(
                StatusCode::SERVICE_UNAVAILABLE,
                ui::render_load_error(&err, &source),
            );
        }
    };

    let session = match SessionState::from_query(&pairs) {
        Ok(session) => session,
        Err(err) => {
            log::warn!("Rejected selection: {err}");
            return page(
                StatusCode::BAD_REQUEST,
                ui::render_bad_selection(&err.to_string()),
            );
        }
    };
    log::debug!("Rendering for {session:?}");

    let rendering = view::explore(&dataset, &session);
    page(StatusCode::OK, ui::render_page(&rendering))
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "not found")
}

fn page(status: StatusCode, body: Result<String, std::fmt::Error>) -> Response {
    match body {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            log::error!("Failed to render page: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
