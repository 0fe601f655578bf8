use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::types::metrics::TrackMetrics;

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// Projected display coordinate (Web Mercator metres).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarPoint {
    pub x: f64,
    pub y: f64,
}

impl PlanarPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &PlanarPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn midpoint(&self, other: &PlanarPoint) -> PlanarPoint {
        PlanarPoint::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackSample {
    pub x: f64,
    pub y: f64,
    pub elevation: f64,
}

impl TrackSample {
    pub fn planar(&self) -> PlanarPoint {
        PlanarPoint::new(self.x, self.y)
    }
}

const GEO_KEY_SCALE: f64 = 1_000_000.0;

/// A geographic coordinate rounded to 6 decimal degrees, used to look features up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GeoKey {
    lat_micro: i64,
    lon_micro: i64,
}

impl GeoKey {
    pub fn from_geo(geo: GeoPoint) -> Self {
        Self {
            lat_micro: (geo.lat * GEO_KEY_SCALE).round() as i64,
            lon_micro: (geo.lon * GEO_KEY_SCALE).round() as i64,
        }
    }

    pub fn lat(&self) -> f64 {
        self.lat_micro as f64 / GEO_KEY_SCALE
    }

    pub fn lon(&self) -> f64 {
        self.lon_micro as f64 / GEO_KEY_SCALE
    }
}

impl fmt::Display for GeoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat(), self.lon())
    }
}

impl Serialize for GeoKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Named point of interest attached to a track.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointFeature {
    pub key: GeoKey,
    pub position: PlanarPoint,
    pub name: String,
    pub kind: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub note: Option<String>,
}

/// Features of one track keyed by rounded coordinate. Later inserts win on collision.
#[derive(Debug, Clone, Default)]
pub struct FeatureIndex {
    features: BTreeMap<GeoKey, PointFeature>,
}

impl FeatureIndex {
    pub fn insert(&mut self, feature: PointFeature) -> Option<PointFeature> {
        self.features.insert(feature.key, feature)
    }

    pub fn get(&self, key: &GeoKey) -> Option<&PointFeature> {
        self.features.get(key)
    }

    pub fn lookup(&self, geo: GeoPoint) -> Option<&PointFeature> {
        self.get(&GeoKey::from_geo(geo))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PointFeature> {
        self.features.values()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Waypoint record as it appears in the exchange format, before projection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawWaypoint {
    pub lat: f64,
    pub lon: f64,
    pub name: Option<String>,
    pub description: Option<String>,
    pub kind: Option<String>,
    pub image: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawTrackPoint {
    pub lat: f64,
    pub lon: f64,
    pub elevation: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedTrack {
    pub waypoints: Vec<RawWaypoint>,
    pub track_points: Vec<RawTrackPoint>,
}

#[derive(Debug, Clone, Default)]
pub struct Track {
    pub samples: Vec<TrackSample>,
    pub features: FeatureIndex,
}

impl Track {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// A track together with everything derived from it on load. Never mutated;
/// loading a new track produces a new value.
#[derive(Debug, Clone)]
pub struct LoadedTrack {
    pub id: Uuid,
    pub name: String,
    pub track: Track,
    pub metrics: TrackMetrics,
}
