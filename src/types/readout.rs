use serde::Serialize;

use crate::types::track::PlanarPoint;

/// What to show for the current cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorReading {
    pub coordinate: PlanarPoint,
    pub elevation_meters: f64,
    pub slope_percent: f64,
    pub traveled_km: f64,
    pub remaining_km: f64,
    pub segment_index: usize,
}

/// Display strings for the info panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadoutPanel {
    pub elevation: String,
    pub slope: String,
    pub traveled: String,
    pub remaining: String,
}

impl ReadoutPanel {
    pub fn format(reading: &CursorReading) -> Self {
        Self {
            elevation: format!("{:.0}", reading.elevation_meters),
            slope: format!("{:.1}", reading.slope_percent),
            traveled: format!("{:.2}", reading.traveled_km),
            remaining: format!("{:.2}", reading.remaining_km),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub is_playing: bool,
    pub current_index: usize,
    pub step_size: usize,
    pub tick_interval_ms: u64,
}
