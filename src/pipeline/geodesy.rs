//! Spherical-earth distance and the Web Mercator projection used for display coordinates.

use std::f64::consts::PI;

use crate::types::track::{GeoPoint, PlanarPoint};

/// Mean earth radius (metres) for distance.
const EARTH_RADIUS_M: f64 = 6_371_008.8;
/// Sphere radius (metres) of the Web Mercator projection.
const MERCATOR_RADIUS_M: f64 = 6_378_137.0;
/// Web Mercator is undefined at the poles; latitudes are clamped to its square extent.
const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// Great-circle distance in metres (haversine).
pub fn great_circle_distance(p1: GeoPoint, p2: GeoPoint) -> f64 {
    let lat1 = p1.lat.to_radians();
    let lat2 = p2.lat.to_radians();
    let d_lat = (p2.lat - p1.lat).to_radians();
    let d_lon = (p2.lon - p1.lon).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());

    EARTH_RADIUS_M * c
}

pub fn project_to_planar(geo: GeoPoint) -> PlanarPoint {
    let lat = geo.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let x = MERCATOR_RADIUS_M * geo.lon.to_radians();
    let y = MERCATOR_RADIUS_M * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    PlanarPoint::new(x, y)
}

pub fn unproject_to_geo(planar: PlanarPoint) -> GeoPoint {
    let lon = (planar.x / MERCATOR_RADIUS_M).to_degrees();
    let lat = (2.0 * (planar.y / MERCATOR_RADIUS_M).exp().atan() - PI / 2.0).to_degrees();
    GeoPoint::new(lon, lat)
}

/// Distance in metres between two display coordinates, measured on the sphere.
pub fn planar_distance_on_sphere(a: PlanarPoint, b: PlanarPoint) -> f64 {
    great_circle_distance(unproject_to_geo(a), unproject_to_geo(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_points_are_zero_apart() {
        let p = GeoPoint::new(-0.8891, 41.6488);
        assert_eq!(great_circle_distance(p, p), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let zaragoza = GeoPoint::new(-0.8891, 41.6488);
        let fabara = GeoPoint::new(0.1766, 41.1790);
        let there = great_circle_distance(zaragoza, fabara);
        let back = great_circle_distance(fabara, zaragoza);
        assert!((there - back).abs() < 1e-9);
        // roughly 100 km apart
        assert!(there > 90_000.0 && there < 115_000.0, "got {there}");
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = great_circle_distance(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0));
        assert!((d - 111_195.08).abs() < 1.0, "got {d}");
    }

    #[test]
    fn projection_round_trips() {
        let points = [
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(-0.8891, 41.6488),
            GeoPoint::new(179.999, -84.9),
            GeoPoint::new(-179.5, 84.9),
            GeoPoint::new(13.405, 52.52),
            GeoPoint::new(151.2093, -33.8688),
        ];
        for p in points {
            let back = unproject_to_geo(project_to_planar(p));
            assert!((back.lon - p.lon).abs() < 1e-6, "{p:?} -> {back:?}");
            assert!((back.lat - p.lat).abs() < 1e-6, "{p:?} -> {back:?}");
        }
    }

    #[test]
    fn origin_projects_to_origin() {
        let p = project_to_planar(GeoPoint::new(0.0, 0.0));
        assert!(p.x.abs() < 1e-9);
        assert!(p.y.abs() < 1e-9);
    }
}
