//! Maps a query position to a reading on the track.
//!
//! The query is first snapped to the closest point on the whole polyline. The reported
//! segment is the one whose midpoint is nearest that snapped point, which can pick a
//! neighbouring segment near sharp turns or where the track doubles back on itself.

use std::sync::Arc;

use crate::pipeline::geodesy::planar_distance_on_sphere;
use crate::sink::{publish_reading, ReadoutSink};
use crate::types::readout::CursorReading;
use crate::types::track::{LoadedTrack, PlanarPoint, TrackSample};

const ON_SEGMENT_TOLERANCE: f64 = 1e-6;

/// Closest point on a polyline and its planar distance from the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathProjection {
    pub point: PlanarPoint,
    pub distance: f64,
}

pub struct CursorResolver {
    track: Arc<LoadedTrack>,
    sink: Arc<dyn ReadoutSink>,
}

impl CursorResolver {
    pub fn new(track: Arc<LoadedTrack>, sink: Arc<dyn ReadoutSink>) -> Self {
        Self { track, sink }
    }

    pub fn resolve(&self, query: PlanarPoint) -> Option<CursorReading> {
        resolve(&self.track, query)
    }

    pub fn resolve_within(&self, query: PlanarPoint, max_distance: Option<f64>) -> Option<CursorReading> {
        resolve_within(&self.track, query, max_distance)
    }

    /// Resolves a pointer position and pushes the marker and panel to the sink.
    pub fn pointer_moved(&self, query: PlanarPoint, max_distance: Option<f64>) -> Option<CursorReading> {
        let reading = self.resolve_within(query, max_distance)?;
        tracing::debug!(
            "Pointer at ({:.1}, {:.1}) -> segment {}",
            query.x,
            query.y,
            reading.segment_index
        );
        publish_reading(self.sink.as_ref(), &reading);
        Some(reading)
    }

    /// Places the marker on a sample, as when hovering the elevation chart.
    pub fn hover_chart_index(&self, index: usize) -> Option<PlanarPoint> {
        let sample = self.track.track.samples.get(index)?;
        let coordinate = sample.planar();
        self.sink.place_marker(coordinate);
        Some(coordinate)
    }
}

pub fn resolve(track: &LoadedTrack, query: PlanarPoint) -> Option<CursorReading> {
    resolve_within(track, query, None)
}

/// Like [`resolve`], but gives no reading when the query is farther than
/// `max_distance` planar units from the path.
pub fn resolve_within(
    track: &LoadedTrack,
    query: PlanarPoint,
    max_distance: Option<f64>,
) -> Option<CursorReading> {
    let samples = &track.track.samples;
    let metrics = &track.metrics;
    if samples.len() < 2 {
        return None;
    }

    let projection = closest_point_on_path(samples, query)?;
    if let Some(limit) = max_distance {
        if projection.distance > limit {
            return None;
        }
    }
    let closest = projection.point;

    let segment_index = nearest_segment_by_midpoint(samples, closest);
    let from = &samples[segment_index];
    let to = &samples[segment_index + 1];
    let elevation_meters = (from.elevation + to.elevation) / 2.0;
    let slope_percent = metrics.segments[segment_index].slope_percent;

    let traveled = traveled_to(track, closest, segment_index);
    let remaining = (metrics.total_distance() - traveled).max(0.0);

    Some(CursorReading {
        coordinate: closest,
        elevation_meters,
        slope_percent,
        traveled_km: traveled / 1000.0,
        remaining_km: remaining / 1000.0,
        segment_index,
    })
}

/// Reading for a cursor sitting exactly on sample `index`.
pub fn reading_at_sample(track: &LoadedTrack, index: usize) -> Option<CursorReading> {
    let sample = track.track.samples.get(index)?;
    let metrics = &track.metrics;
    let traveled = metrics.cumulative.get(index).copied().unwrap_or(0.0);
    let remaining = (metrics.total_distance() - traveled).max(0.0);

    Some(CursorReading {
        coordinate: sample.planar(),
        elevation_meters: sample.elevation,
        slope_percent: metrics.slope_at_sample(index),
        traveled_km: traveled / 1000.0,
        remaining_km: remaining / 1000.0,
        segment_index: index.min(metrics.segments.len().saturating_sub(1)),
    })
}

pub fn closest_point_on_path(samples: &[TrackSample], query: PlanarPoint) -> Option<PathProjection> {
    let mut best: Option<PathProjection> = None;

    for pair in samples.windows(2) {
        let point = closest_point_on_segment(query, pair[0].planar(), pair[1].planar());
        let distance = query.distance_to(&point);
        if best.map_or(true, |b| distance < b.distance) {
            best = Some(PathProjection { point, distance });
        }
    }

    best
}

/// Segment whose midpoint is nearest `point`; the lowest index wins ties.
pub fn nearest_segment_by_midpoint(samples: &[TrackSample], point: PlanarPoint) -> usize {
    let mut best_index = 0;
    let mut best_distance = f64::INFINITY;

    for (i, pair) in samples.windows(2).enumerate() {
        let midpoint = pair[0].planar().midpoint(&pair[1].planar());
        let distance = midpoint.distance_to(&point);
        if distance < best_distance {
            best_distance = distance;
            best_index = i;
        }
    }

    best_index
}

fn closest_point_on_segment(p: PlanarPoint, a: PlanarPoint, b: PlanarPoint) -> PlanarPoint {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return a;
    }

    let t = ((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq;
    if t <= 0.0 {
        a
    } else if t >= 1.0 {
        b
    } else {
        PlanarPoint::new(a.x + t * dx, a.y + t * dy)
    }
}

fn lies_on_segment(p: PlanarPoint, a: PlanarPoint, b: PlanarPoint) -> bool {
    let tolerance = ON_SEGMENT_TOLERANCE.max(a.distance_to(&b) * 1e-9);
    p.distance_to(&closest_point_on_segment(p, a, b)) <= tolerance
}

/// Metres from the start to `point`, walking segments until one contains it.
fn traveled_to(track: &LoadedTrack, point: PlanarPoint, fallback_segment: usize) -> f64 {
    let samples = &track.track.samples;
    let mut traveled = 0.0;

    for (i, segment) in track.metrics.segments.iter().enumerate() {
        let start = samples[i].planar();
        let end = samples[i + 1].planar();
        if lies_on_segment(point, start, end) {
            return traveled + planar_distance_on_sphere(start, point);
        }
        traveled += segment.distance_meters;
    }

    // rounding kept the point off every segment; measure from the chosen one
    let start = samples[fallback_segment].planar();
    track.metrics.cumulative[fallback_segment] + planar_distance_on_sphere(start, point)
}
