use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;
use crate::types::readout::CursorReading;
use crate::types::track::PlanarPoint;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/cursor", post(pointer_moved))
        .route("/api/chart/hover", post(chart_hover))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct PointerRequest {
    x: f64,
    y: f64,
    max_distance: Option<f64>,
}

#[derive(Deserialize)]
struct HoverRequest {
    index: usize,
}

/// `null` when the track is too short or the pointer is too far from it.
async fn pointer_moved(
    State(state): State<AppState>,
    Json(req): Json<PointerRequest>,
) -> Result<Json<Option<CursorReading>>, AppError> {
    if !req.x.is_finite() || !req.y.is_finite() {
        return Err(AppError::BadRequest("Pointer coordinates must be finite".to_string()));
    }
    let max_distance = req.max_distance.or(state.config.cursor_max_distance);
    let query = PlanarPoint::new(req.x, req.y);

    state
        .with_session(|session| session.cursor.pointer_moved(query, max_distance))
        .map(Json)
        .ok_or(AppError::NoTrack)
}

async fn chart_hover(
    State(state): State<AppState>,
    Json(req): Json<HoverRequest>,
) -> Result<Json<PlanarPoint>, AppError> {
    state
        .with_session(|session| session.cursor.hover_chart_index(req.index))
        .ok_or(AppError::NoTrack)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("sample {}", req.index)))
}
