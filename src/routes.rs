use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use cricket_scraper::{CricketScraper, ScrapeError};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub const WELCOME: &str =
    "Welcome to CricBuddy API! Use /live-matches or /upcoming-matches to get data.";

#[derive(Clone)]
pub struct AppState {
    pub scraper: Arc<CricketScraper>,
    /// false: a failed scrape is answered with `200 []`; true: with `502`.
    pub strict_errors: bool,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(welcome_handler))
        .route("/live-matches", get(live_matches_handler))
        .route("/upcoming-matches", get(upcoming_matches_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn welcome_handler() -> &'static str {
    WELCOME
}

async fn live_matches_handler(State(state): State<AppState>) -> Response {
    let result = state.scraper.try_fetch_live_matches().await;
    respond("live matches", result, state.strict_errors)
}

async fn upcoming_matches_handler(State(state): State<AppState>) -> Response {
    let result = state.scraper.try_fetch_upcoming_matches().await;
    respond("upcoming matches", result, state.strict_errors)
}

fn respond<T: Serialize>(what: &str, result: Result<Vec<T>, ScrapeError>, strict: bool) -> Response {
    match result {
        Ok(items) => Json(items).into_response(),
        Err(e) => {
            warn!("{} fetch failed: {}", what, e);
            if strict {
                (StatusCode::BAD_GATEWAY, Json(ErrorBody { error: e.to_string() })).into_response()
            } else {
                Json(Vec::<T>::new()).into_response()
            }
        }
    }
}
