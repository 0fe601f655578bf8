use crate::pipeline::geodesy::planar_distance_on_sphere;
use crate::types::color::SlopeColor;
use crate::types::metrics::{Extent, ProfilePoint, SegmentMetric, TrackMetrics, TrackSummary};
use crate::types::track::{Track, TrackSample};

/// Per-segment slope/color/distance, cumulative distance, and summary in one pass.
pub fn compute(track: &Track) -> TrackMetrics {
    let samples = &track.samples;
    let mut segments = Vec::with_capacity(samples.len().saturating_sub(1));
    let mut cumulative = Vec::with_capacity(samples.len());
    let mut summary = TrackSummary {
        sample_count: samples.len(),
        ..Default::default()
    };

    if let Some(first) = samples.first() {
        cumulative.push(0.0);
        summary.min_elevation_meters = first.elevation;
        summary.max_elevation_meters = first.elevation;
    }

    let mut total = 0.0;
    for (i, pair) in samples.windows(2).enumerate() {
        let segment = segment_metric(i, &pair[0], &pair[1]);

        total += segment.distance_meters;
        cumulative.push(total);

        if segment.elevation_delta_meters > 0.0 {
            summary.elevation_gain_meters += segment.elevation_delta_meters;
        } else {
            summary.elevation_loss_meters -= segment.elevation_delta_meters;
        }
        summary.min_elevation_meters = summary.min_elevation_meters.min(pair[1].elevation);
        summary.max_elevation_meters = summary.max_elevation_meters.max(pair[1].elevation);

        segments.push(segment);
    }

    summary.total_distance_meters = total;
    summary.extent = Extent::from_points(
        samples
            .iter()
            .map(TrackSample::planar)
            .chain(track.features.iter().map(|f| f.position)),
    );

    TrackMetrics {
        segments,
        cumulative,
        summary,
    }
}

pub fn segment_metric(index: usize, from: &TrackSample, to: &TrackSample) -> SegmentMetric {
    let distance_meters = planar_distance_on_sphere(from.planar(), to.planar());
    let elevation_delta_meters = to.elevation - from.elevation;
    let slope_percent = slope_percent(elevation_delta_meters, distance_meters);

    SegmentMetric {
        from_index: index,
        to_index: index + 1,
        distance_meters,
        elevation_delta_meters,
        slope_percent,
        color: SlopeColor::from_slope(slope_percent),
    }
}

/// Rise over run as a percentage; 0 for a zero-length run.
pub fn slope_percent(rise: f64, run: f64) -> f64 {
    if run > 0.0 && rise.is_finite() {
        rise / run * 100.0
    } else {
        0.0
    }
}

/// One chart entry per sample, slope rounded to 2 decimals.
pub fn elevation_profile(samples: &[TrackSample], cumulative: &[f64]) -> Vec<ProfilePoint> {
    samples
        .iter()
        .zip(cumulative)
        .enumerate()
        .map(|(index, (sample, distance))| {
            let slope = if index == 0 {
                0.0
            } else {
                let rise = sample.elevation - samples[index - 1].elevation;
                let run = distance - cumulative[index - 1];
                round2(slope_percent(rise, run))
            };
            ProfilePoint {
                index,
                distance_km: distance / 1000.0,
                elevation_meters: sample.elevation,
                slope_percent: slope,
            }
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
