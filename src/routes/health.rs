use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let active = state.with_session(|session| session.track.name.clone());
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "catalog_size": state.catalog.entries.len(),
        "cached_tracks": state.cache_len(),
        "active_track": active,
    }))
}
