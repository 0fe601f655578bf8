use uuid::Uuid;

use crate::error::LoadError;
use crate::pipeline::geodesy::project_to_planar;
use crate::pipeline::{metrics, parse};
use crate::types::catalog::is_remote;
use crate::types::track::{
    FeatureIndex, GeoKey, GeoPoint, LoadedTrack, ParsedTrack, PointFeature, Track, TrackSample,
};

/// Builds the track model from parsed records. Missing elevation becomes 0.
pub fn load_track(parsed: &ParsedTrack) -> Track {
    let mut features = FeatureIndex::default();
    for wpt in &parsed.waypoints {
        let geo = GeoPoint::new(wpt.lon, wpt.lat);
        let feature = PointFeature {
            key: GeoKey::from_geo(geo),
            position: project_to_planar(geo),
            name: wpt.name.clone().unwrap_or_default(),
            kind: non_empty(&wpt.kind),
            description: non_empty(&wpt.description),
            image_url: non_empty(&wpt.image),
            note: non_empty(&wpt.note),
        };
        if let Some(previous) = features.insert(feature) {
            tracing::debug!("Waypoint {} replaced '{}'", previous.key, previous.name);
        }
    }

    let samples = parsed
        .track_points
        .iter()
        .map(|pt| {
            let planar = project_to_planar(GeoPoint::new(pt.lon, pt.lat));
            TrackSample {
                x: planar.x,
                y: planar.y,
                elevation: pt.elevation.unwrap_or(0.0),
            }
        })
        .collect();

    Track { samples, features }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parses raw bytes and derives metrics. Nothing is shared until this returns `Ok`.
pub fn load_bytes(name: &str, bytes: &[u8]) -> Result<LoadedTrack, LoadError> {
    let parsed = parse::parse(bytes)?;
    let track = load_track(&parsed);
    let metrics = metrics::compute(&track);

    tracing::info!(
        "Loaded track '{}' ({} points, {} features, {:.2} km)",
        name,
        track.len(),
        track.features.len(),
        metrics.total_distance() / 1000.0
    );

    Ok(LoadedTrack {
        id: Uuid::new_v4(),
        name: name.to_string(),
        track,
        metrics,
    })
}

/// Reads a track from a local path or an `http(s)://` URL.
pub async fn fetch(location: &str) -> Result<Vec<u8>, LoadError> {
    if is_remote(location) {
        let response = reqwest::get(location)
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| LoadError::Fetch(e.to_string()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| LoadError::Fetch(e.to_string()))?;
        return Ok(bytes.to_vec());
    }

    tokio::fs::read(location).await.map_err(|source| LoadError::Io {
        path: location.to_string(),
        source,
    })
}

pub async fn load_from(name: &str, location: &str) -> Result<LoadedTrack, LoadError> {
    let bytes = fetch(location).await?;
    load_bytes(name, &bytes)
}
