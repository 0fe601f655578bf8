use axum::{body::to_bytes, http::Request, Router};
use tower::ServiceExt;
use trackplay_rs::{config::Config, routes, state::AppState, types::catalog::Catalog};

fn app() -> Router {
    let state = AppState::with_catalog(Config::from_env(), Catalog::default());
    routes::router().with_state(state)
}

#[tokio::test]
async fn health_returns_ok() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/health")
                .method("GET")
                .body(axum::body::Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(json["status"], "ok");
    assert_eq!(json["catalog_size"], 0);
    assert!(json["active_track"].is_null());
}
