//! Numeric helpers shared by the geometry kernel and the segmenters.

/// Default tolerance for geometric equality checks.
pub const DEFAULT_EPSILON: f64 = 1e-3;

/// Compares two floats for approximate equality.
#[inline]
pub fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

/// Returns true if `v` is within `epsilon` of zero.
#[inline]
pub fn approx_zero(v: f64, epsilon: f64) -> bool {
    v.abs() < epsilon
}

/// Folds an angle in degrees into the half-open interval (-180, 180].
pub fn bound_angle_180(angle: f64) -> f64 {
    let mut a = angle % 360.0;
    if a > 180.0 {
        a -= 360.0;
    } else if a <= -180.0 {
        a += 360.0;
    }
    a
}

/// Angle of the segment `p1 -> p2` in degrees, measured counter-clockwise from +X.
#[inline]
pub fn line_angle(p1: crate::geometry::Point, p2: crate::geometry::Point) -> f64 {
    (p2.y - p1.y).atan2(p2.x - p1.x).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_angle_folds_into_half_open_interval() {
        assert_eq!(bound_angle_180(0.0), 0.0);
        assert_eq!(bound_angle_180(180.0), 180.0);
        assert_eq!(bound_angle_180(-180.0), 180.0);
        assert_eq!(bound_angle_180(270.0), -90.0);
        assert_eq!(bound_angle_180(-270.0), 90.0);
        assert_eq!(bound_angle_180(540.0), 180.0);
    }

    #[test]
    fn approx_helpers() {
        assert!(approx_eq(1.0, 1.0005, DEFAULT_EPSILON));
        assert!(!approx_eq(1.0, 1.01, DEFAULT_EPSILON));
        assert!(approx_zero(-0.0001, DEFAULT_EPSILON));
    }
}
