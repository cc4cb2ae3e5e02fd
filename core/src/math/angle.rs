//! Degree-based angle arithmetic shared by every estimator.
//!
//! All outputs that represent a direction are kept in `[0, 360)`; signed
//! differences live in `(-180, 180]` with positive meaning clockwise.

use num_complex::Complex64;

pub struct AngleMath;

impl AngleMath {
    /// Wraps any finite angle into `[0, 360)`.
    pub fn normalize(deg: f64) -> f64 {
        let wrapped = deg.rem_euclid(360.0);
        // rem_euclid rounds tiny negatives up to exactly 360.0
        if wrapped >= 360.0 {
            0.0
        } else {
            wrapped
        }
    }

    /// Signed rotation taking `from` to `to` along the shorter path.
    pub fn shortest_signed_diff(from: f64, to: f64) -> f64 {
        let diff = Self::normalize(to - from);
        if diff > 180.0 {
            diff - 360.0
        } else {
            diff
        }
    }

    /// Unsigned separation between two directions, in `[0, 180]`.
    pub fn abs_angular_diff(a: f64, b: f64) -> f64 {
        Self::shortest_signed_diff(a, b).abs()
    }

    pub fn to_radians(deg: f64) -> f64 {
        deg.to_radians()
    }

    pub fn to_degrees(rad: f64) -> f64 {
        rad.to_degrees()
    }

    /// Unit vector pointing along `deg`, scaled by `weight`.
    pub fn unit_vector(deg: f64, weight: f64) -> Complex64 {
        Complex64::from_polar(weight, Self::to_radians(deg))
    }

    /// Direction of a (non-zero) vector, normalized to `[0, 360)`.
    pub fn vector_angle(vector: Complex64) -> f64 {
        Self::normalize(Self::to_degrees(vector.arg()))
    }

    /// Weighted circular mean of `(angle_deg, weight)` pairs.
    ///
    /// Returns the mean direction and the resultant length in `[0, 1]`, or
    /// `None` when the total weight is zero. A resultant length near zero
    /// means the samples cancel out and carry no coherent direction.
    pub fn circular_weighted_mean(samples: &[(f64, f64)]) -> Option<(f64, f64)> {
        let mut resultant = Complex64::new(0.0, 0.0);
        let mut total_weight = 0.0;

        for &(angle, weight) in samples {
            if weight <= 0.0 {
                continue;
            }
            resultant += Self::unit_vector(angle, weight);
            total_weight += weight;
        }

        if total_weight <= 0.0 {
            return None;
        }

        let mean = resultant / total_weight;
        Some((Self::vector_angle(mean), mean.norm().clamp(0.0, 1.0)))
    }

    /// Compass heading from the horizontal magnetometer components.
    pub fn heading_from_magnetometer(x: f64, y: f64) -> f64 {
        Self::normalize(Self::to_degrees(y.atan2(x)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn normalize_stays_in_range_and_congruent() {
        for deg in [-720.5, -360.0, -1.0, 0.0, 45.0, 359.999, 360.0, 725.0, -1e-18] {
            let n = AngleMath::normalize(deg);
            assert!((0.0..360.0).contains(&n), "{} -> {}", deg, n);
            let k = (deg - n) / 360.0;
            assert!((k - k.round()).abs() < 1e-9);
        }
        assert!(approx(AngleMath::normalize(-90.0), 270.0));
    }

    #[test]
    fn signed_diff_takes_short_way_round() {
        assert!(approx(AngleMath::shortest_signed_diff(350.0, 10.0), 20.0));
        assert!(approx(AngleMath::shortest_signed_diff(10.0, 350.0), -20.0));
        assert!(approx(AngleMath::shortest_signed_diff(0.0, 180.0), 180.0));
        assert!(approx(AngleMath::shortest_signed_diff(180.0, 0.0), 180.0));
        assert_eq!(AngleMath::shortest_signed_diff(123.0, 123.0), 0.0);
    }

    #[test]
    fn signed_diff_lands_on_target() {
        let angles = [0.0, 17.5, 90.0, 179.0, 181.0, 270.0, 359.0, -45.0, 400.0];
        for &a in &angles {
            for &b in &angles {
                let d = AngleMath::shortest_signed_diff(a, b);
                assert!(d > -180.0 && d <= 180.0);
                let landed = AngleMath::normalize(a + d);
                assert!(AngleMath::abs_angular_diff(landed, AngleMath::normalize(b)) < 1e-9);
                if d.abs() < 180.0 {
                    assert!(approx(d, -AngleMath::shortest_signed_diff(b, a)));
                }
            }
        }
    }

    #[test]
    fn abs_diff_is_unsigned() {
        assert!(approx(AngleMath::abs_angular_diff(5.0, 355.0), 10.0));
        assert!(approx(AngleMath::abs_angular_diff(90.0, 270.0), 180.0));
    }

    #[test]
    fn single_sample_mean_is_itself() {
        let (angle, length) = AngleMath::circular_weighted_mean(&[(45.0, 1.0)]).unwrap();
        assert!(approx(angle, 45.0));
        assert!(approx(length, 1.0));
    }

    #[test]
    fn mean_handles_wraparound() {
        let (angle, length) =
            AngleMath::circular_weighted_mean(&[(350.0, 1.0), (10.0, 1.0)]).unwrap();
        assert!(AngleMath::abs_angular_diff(angle, 0.0) < 1e-9);
        assert!(length > 0.98);
    }

    #[test]
    fn opposite_samples_cancel() {
        let (_, length) = AngleMath::circular_weighted_mean(&[(0.0, 1.0), (180.0, 1.0)]).unwrap();
        assert!(length < 1e-9);
        assert!(AngleMath::circular_weighted_mean(&[(30.0, 0.0)]).is_none());
        assert!(AngleMath::circular_weighted_mean(&[]).is_none());
    }

    #[test]
    fn magnetometer_heading() {
        assert!(approx(AngleMath::heading_from_magnetometer(1.0, 0.0), 0.0));
        assert!(approx(AngleMath::heading_from_magnetometer(0.0, 1.0), 90.0));
        assert!(approx(AngleMath::heading_from_magnetometer(0.0, -1.0), 270.0));
    }
}
