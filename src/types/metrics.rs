use serde::Serialize;

use crate::types::color::SlopeColor;
use crate::types::track::PlanarPoint;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentMetric {
    pub from_index: usize,
    pub to_index: usize,
    pub distance_meters: f64,
    pub elevation_delta_meters: f64,
    pub slope_percent: f64,
    pub color: SlopeColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = PlanarPoint>,
    {
        points.into_iter().fold(None, |acc, p| {
            Some(match acc {
                None => Extent {
                    min_x: p.x,
                    min_y: p.y,
                    max_x: p.x,
                    max_y: p.y,
                },
                Some(e) => Extent {
                    min_x: e.min_x.min(p.x),
                    min_y: e.min_y.min(p.y),
                    max_x: e.max_x.max(p.x),
                    max_y: e.max_y.max(p.y),
                },
            })
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSummary {
    pub sample_count: usize,
    pub total_distance_meters: f64,
    pub elevation_gain_meters: f64,
    pub elevation_loss_meters: f64,
    pub min_elevation_meters: f64,
    pub max_elevation_meters: f64,
    pub extent: Option<Extent>,
}

/// Everything derived from the samples in one pass on load.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackMetrics {
    pub segments: Vec<SegmentMetric>,
    /// Distance from the first sample, one entry per sample.
    pub cumulative: Vec<f64>,
    pub summary: TrackSummary,
}

impl TrackMetrics {
    pub fn total_distance(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Slope of the segment leaving `index`; the final sample reuses the last segment.
    pub fn slope_at_sample(&self, index: usize) -> f64 {
        if self.segments.is_empty() {
            return 0.0;
        }
        let segment = index.min(self.segments.len() - 1);
        self.segments[segment].slope_percent
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePoint {
    pub index: usize,
    pub distance_km: f64,
    pub elevation_meters: f64,
    pub slope_percent: f64,
}
