use std::sync::Arc;

use axum::extract::Multipart;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, LoadError};
use crate::pipeline::geodesy::unproject_to_geo;
use crate::pipeline::metrics::elevation_profile;
use crate::state::AppState;
use crate::types::catalog::CatalogEntry;
use crate::types::metrics::{ProfilePoint, SegmentMetric, TrackSummary};
use crate::types::track::{LoadedTrack, PlanarPoint, PointFeature, TrackSample};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tracks", get(list_tracks))
        .route("/api/tracks/select", post(select_track))
        .route("/api/tracks/upload", post(upload_track))
        .route("/api/track", get(active_track_detail))
        .route("/api/track/profile", get(profile))
        .route("/api/track/feature", post(feature_at))
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SelectRequest {
    index: Option<usize>,
    path: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadResponse {
    id: Uuid,
    name: String,
    feature_count: usize,
    summary: TrackSummary,
}

impl From<&LoadedTrack> for LoadResponse {
    fn from(track: &LoadedTrack) -> Self {
        Self {
            id: track.id,
            name: track.name.clone(),
            feature_count: track.track.features.len(),
            summary: track.metrics.summary.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TrackDetail<'a> {
    id: Uuid,
    name: &'a str,
    samples: &'a [TrackSample],
    segments: &'a [SegmentMetric],
    cumulative: &'a [f64],
    features: Vec<&'a PointFeature>,
    summary: &'a TrackSummary,
}

fn active_track(state: &AppState) -> Result<Arc<LoadedTrack>, AppError> {
    state
        .with_session(|session| session.track.clone())
        .ok_or(AppError::NoTrack)
}

async fn list_tracks(State(state): State<AppState>) -> Json<Vec<CatalogEntry>> {
    Json(state.catalog.entries.clone())
}

async fn select_track(
    State(state): State<AppState>,
    Json(req): Json<SelectRequest>,
) -> Result<Json<LoadResponse>, AppError> {
    let entry = match (req.index, req.path.as_deref()) {
        (Some(index), None) => state
            .catalog
            .get(index)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("catalog index {}", index)))?,
        (None, Some(path)) => state
            .catalog
            .find_by_path(path)
            .cloned()
            .ok_or_else(|| LoadError::UnknownTrack(path.to_string()))?,
        _ => {
            return Err(AppError::BadRequest(
                "Provide exactly one of index or path".to_string(),
            ))
        }
    };

    tracing::info!("Selecting track '{}' ({})", entry.name, entry.path);

    let track = state.select(&entry).await.map_err(|e| {
        tracing::warn!("Failed to load '{}': {}", entry.name, e);
        AppError::from(e)
    })?;

    Ok(Json(LoadResponse::from(track.as_ref())))
}

async fn upload_track(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<LoadResponse>, AppError> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(format!("Failed to read multipart field: {}", e))
    })? {
        if field.name() == Some("file") {
            filename = field.file_name().map(|s| s.to_string());
            file_bytes = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file bytes: {}", e)))?
                    .to_vec(),
            );
        }
    }

    let bytes = file_bytes.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;
    let filename = filename.ok_or_else(|| AppError::BadRequest("No filename provided".to_string()))?;

    let is_gpx = filename
        .rsplit('.')
        .next()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gpx"));
    if !is_gpx {
        return Err(AppError::BadRequest("Unsupported file format".to_string()));
    }

    tracing::info!("Parsing uploaded track: {}", filename);
    let track = state.upload(&filename, &bytes).await?;

    Ok(Json(LoadResponse::from(track.as_ref())))
}

async fn active_track_detail(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let track = active_track(&state)?;
    let detail = TrackDetail {
        id: track.id,
        name: &track.name,
        samples: &track.track.samples,
        segments: &track.metrics.segments,
        cumulative: &track.metrics.cumulative,
        features: track.track.features.iter().collect(),
        summary: &track.metrics.summary,
    };
    let body = serde_json::to_value(detail).map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(body))
}

async fn profile(State(state): State<AppState>) -> Result<Json<Vec<ProfilePoint>>, AppError> {
    let track = active_track(&state)?;
    Ok(Json(elevation_profile(
        &track.track.samples,
        &track.metrics.cumulative,
    )))
}

async fn feature_at(
    State(state): State<AppState>,
    Json(position): Json<PlanarPoint>,
) -> Result<Json<PointFeature>, AppError> {
    let track = active_track(&state)?;
    let geo = unproject_to_geo(position);
    track
        .track
        .features
        .lookup(geo)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("feature at {:.6},{:.6}", geo.lat, geo.lon)))
}
