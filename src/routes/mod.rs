pub mod cursor;
pub mod health;
pub mod playback;
pub mod tracks;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(tracks::router())
        .merge(cursor::router())
        .merge(playback::router())
}
