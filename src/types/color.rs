use std::fmt;

use serde::{Serialize, Serializer};

const SLOPE_LIMIT: f64 = 20.0;

/// Path color for a slope: blue for steep descent, green on the flat, red for steep climbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlopeColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl SlopeColor {
    pub fn from_slope(slope_percent: f64) -> Self {
        let slope = if slope_percent.is_nan() { 0.0 } else { slope_percent };
        let clamped = slope.clamp(-SLOPE_LIMIT, SLOPE_LIMIT);
        let t = (clamped + SLOPE_LIMIT) / (2.0 * SLOPE_LIMIT);

        if t < 0.5 {
            let local_t = t * 2.0;
            Self {
                r: 0,
                g: channel(local_t),
                b: channel(1.0 - local_t),
            }
        } else {
            let local_t = (t - 0.5) * 2.0;
            Self {
                r: channel(local_t),
                g: channel(1.0 - local_t),
                b: 0,
            }
        }
    }
}

fn channel(t: f64) -> u8 {
    (255.0 * t).round().clamp(0.0, 255.0) as u8
}

impl fmt::Display for SlopeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({},{},{})", self.r, self.g, self.b)
    }
}

impl Serialize for SlopeColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchors_are_pure_primaries() {
        assert_eq!(SlopeColor::from_slope(-20.0), SlopeColor { r: 0, g: 0, b: 255 });
        assert_eq!(SlopeColor::from_slope(0.0), SlopeColor { r: 0, g: 255, b: 0 });
        assert_eq!(SlopeColor::from_slope(20.0), SlopeColor { r: 255, g: 0, b: 0 });
    }

    #[test]
    fn slopes_beyond_limit_clamp() {
        assert_eq!(SlopeColor::from_slope(-75.0), SlopeColor::from_slope(-20.0));
        assert_eq!(SlopeColor::from_slope(33.3), SlopeColor::from_slope(20.0));
        assert_eq!(SlopeColor::from_slope(f64::INFINITY), SlopeColor::from_slope(20.0));
    }

    #[test]
    fn mapping_is_independent_of_call_order() {
        let slopes = [7.5, -3.0, 12.0, 0.1, -19.9];
        let first: Vec<_> = slopes.iter().map(|s| SlopeColor::from_slope(*s)).collect();
        let second: Vec<_> = slopes.iter().rev().map(|s| SlopeColor::from_slope(*s)).collect();
        let second: Vec<_> = second.into_iter().rev().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn midway_values_blend() {
        // t = 0.25 -> halfway from blue to green
        assert_eq!(SlopeColor::from_slope(-10.0), SlopeColor { r: 0, g: 128, b: 128 });
        assert_eq!(SlopeColor::from_slope(10.0), SlopeColor { r: 128, g: 128, b: 0 });
    }

    #[test]
    fn renders_css_rgb() {
        let color = SlopeColor::from_slope(20.0);
        assert_eq!(color.to_string(), "rgb(255,0,0)");
    }
}
