use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::error::AppError;
use crate::pipeline::playback::PlaybackController;
use crate::sink::ReadoutEvent;
use crate::state::AppState;
use crate::types::readout::PlaybackState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/playback", get(status))
        .route("/api/playback/toggle", post(toggle))
        .route("/api/playback/start", post(start))
        .route("/api/playback/stop", post(stop))
        .route("/api/playback/reset", post(reset))
        .route("/api/playback/speed", post(set_speed))
        .route("/api/events", get(events))
}

#[derive(Deserialize)]
struct SpeedRequest {
    multiplier: f64,
}

fn control(
    state: &AppState,
    action: impl FnOnce(&PlaybackController),
) -> Result<Json<PlaybackState>, AppError> {
    state
        .with_session(|session| {
            action(&session.player);
            session.player.state()
        })
        .map(Json)
        .ok_or(AppError::NoTrack)
}

async fn status(State(state): State<AppState>) -> Result<Json<PlaybackState>, AppError> {
    control(&state, |_| {})
}

async fn toggle(State(state): State<AppState>) -> Result<Json<PlaybackState>, AppError> {
    control(&state, PlaybackController::toggle)
}

async fn start(State(state): State<AppState>) -> Result<Json<PlaybackState>, AppError> {
    control(&state, PlaybackController::start)
}

async fn stop(State(state): State<AppState>) -> Result<Json<PlaybackState>, AppError> {
    control(&state, PlaybackController::stop)
}

async fn reset(State(state): State<AppState>) -> Result<Json<PlaybackState>, AppError> {
    control(&state, PlaybackController::reset)
}

async fn set_speed(
    State(state): State<AppState>,
    Json(req): Json<SpeedRequest>,
) -> Result<Json<PlaybackState>, AppError> {
    control(&state, |player| player.set_speed(req.multiplier))
}

/// Server-sent stream of every sink event, for any number of renderers.
async fn events(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();
    let stream = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => return Some((Ok(to_sse_event(&event)), rx)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Event subscriber lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn to_sse_event(event: &ReadoutEvent) -> Event {
    Event::default()
        .event(event.name())
        .json_data(event)
        .unwrap_or_else(|_| Event::default().comment("unserializable event"))
}
