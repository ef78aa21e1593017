//! Vector norm, distance and product computations.
//!
//! Positions throughout the crate are plain `[f64; D]` arrays; these helpers
//! keep the arithmetic on them in one place.

/// Squared Euclidean norm of a vector.
///
/// # Examples
///
/// ```
/// use orthtree_delaunay::geometry::util::squared_norm;
///
/// assert_eq!(squared_norm(&[3.0, 4.0]), 25.0);
/// assert_eq!(squared_norm(&[1.0, 2.0, 2.0]), 9.0);
/// ```
#[inline]
#[must_use]
pub fn squared_norm<const D: usize>(coords: &[f64; D]) -> f64 {
    coords.iter().fold(0.0, |acc, &x| x.mul_add(x, acc))
}

/// Squared Euclidean distance between two positions.
///
/// Most comparisons in the spatial index stay in squared space so that no
/// square root is taken on the hot paths.
///
/// # Examples
///
/// ```
/// use orthtree_delaunay::geometry::util::squared_distance;
///
/// assert_eq!(squared_distance(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
/// ```
#[inline]
#[must_use]
pub fn squared_distance<const D: usize>(a: &[f64; D], b: &[f64; D]) -> f64 {
    a.iter().zip(b.iter()).fold(0.0, |acc, (&x, &y)| {
        let diff = x - y;
        diff.mul_add(diff, acc)
    })
}

/// Euclidean norm, scaled by the largest component to avoid overflow and
/// underflow for extreme magnitudes.
///
/// # Examples
///
/// ```
/// use orthtree_delaunay::geometry::util::hypot;
///
/// assert_eq!(hypot(&[3.0, 4.0]), 5.0);
/// assert_eq!(hypot(&[1.0, 2.0, 2.0]), 3.0);
/// assert_eq!(hypot(&[0.0, 0.0, 0.0]), 0.0);
/// ```
#[must_use]
pub fn hypot<const D: usize>(coords: &[f64; D]) -> f64 {
    match D {
        0 => 0.0,
        1 => coords[0].abs(),
        2 => coords[0].hypot(coords[1]),
        _ => {
            let max_abs = coords.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
            if max_abs == 0.0 || !max_abs.is_finite() {
                return max_abs;
            }
            let sum_of_scaled_squares = coords.iter().fold(0.0, |acc, &x| {
                let scaled = x / max_abs;
                scaled.mul_add(scaled, acc)
            });
            max_abs * sum_of_scaled_squares.sqrt()
        }
    }
}

/// Dot product of two vectors.
#[inline]
#[must_use]
pub fn dot<const D: usize>(a: &[f64; D], b: &[f64; D]) -> f64 {
    a.iter()
        .zip(b.iter())
        .fold(0.0, |acc, (&x, &y)| x.mul_add(y, acc))
}

/// Component-wise difference `a − b`.
#[inline]
#[must_use]
pub fn subtract<const D: usize>(a: &[f64; D], b: &[f64; D]) -> [f64; D] {
    let mut out = [0.0; D];
    for (o, (&x, &y)) in out.iter_mut().zip(a.iter().zip(b.iter())) {
        *o = x - y;
    }
    out
}

/// Cross product of two 3-vectors.
///
/// # Examples
///
/// ```
/// use orthtree_delaunay::geometry::util::cross;
///
/// assert_eq!(cross(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]), [0.0, 0.0, 1.0]);
/// ```
#[inline]
#[must_use]
pub fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1].mul_add(b[2], -(a[2] * b[1])),
        a[2].mul_add(b[0], -(a[0] * b[2])),
        a[0].mul_add(b[1], -(a[1] * b[0])),
    ]
}

/// Scalar triple product `a · (b × c)`.
///
/// Its sign is the handedness of the ordered triple: positive when `a, b, c`
/// wind counter-clockwise seen from outside the unit sphere.
#[inline]
#[must_use]
pub fn triple_product(a: &[f64; 3], b: &[f64; 3], c: &[f64; 3]) -> f64 {
    dot(a, &cross(b, c))
}

/// Scales a vector to unit length.
///
/// A zero (or non-finite) vector has no direction; its components come back
/// as NaN, which downstream finiteness checks reject.
///
/// # Examples
///
/// ```
/// use orthtree_delaunay::geometry::util::normalize;
///
/// assert_eq!(normalize(&[0.0, 3.0, 4.0]), [0.0, 0.6, 0.8]);
/// assert!(normalize(&[0.0, 0.0, 0.0])[0].is_nan());
/// ```
#[must_use]
pub fn normalize<const D: usize>(coords: &[f64; D]) -> [f64; D] {
    let norm = hypot(coords);
    let mut out = [f64::NAN; D];
    if norm > 0.0 && norm.is_finite() {
        for (o, &x) in out.iter_mut().zip(coords.iter()) {
            *o = x / norm;
        }
    }
    out
}

/// Returns `true` if every component is finite.
#[inline]
#[must_use]
pub fn is_finite_position<const D: usize>(coords: &[f64; D]) -> bool {
    coords.iter().all(|x| x.is_finite())
}

/// Bitwise coordinate equality.
///
/// Two positions belong to the same spatial-index group only when every
/// component has the same bit pattern, so `0.0` and `-0.0` are distinct here.
#[inline]
#[must_use]
pub fn bitwise_eq<const D: usize>(a: &[f64; D], b: &[f64; D]) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hypot_matches_naive_norm() {
        assert_relative_eq!(hypot(&[3.0, 4.0]), 5.0, epsilon = 1e-12);
        assert_relative_eq!(hypot(&[1.0, 1.0, 1.0]), 3.0_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(hypot(&[-2.0]), 2.0, epsilon = 1e-12);
        assert_relative_eq!(
            hypot(&[1e200, 1e200, 1e200]),
            1e200 * 3.0_f64.sqrt(),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_squared_distance_is_symmetric() {
        let a = [1.0, -2.0, 0.5];
        let b = [-3.0, 4.0, 2.5];
        assert_relative_eq!(squared_distance(&a, &b), squared_distance(&b, &a));
        assert_relative_eq!(squared_distance(&a, &b), 16.0 + 36.0 + 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_triple_product_sign_tracks_winding() {
        let x = [1.0, 0.0, 0.0];
        let y = [0.0, 1.0, 0.0];
        let z = [0.0, 0.0, 1.0];
        assert!(triple_product(&x, &y, &z) > 0.0);
        assert!(triple_product(&x, &z, &y) < 0.0);
    }

    #[test]
    fn test_bitwise_eq_distinguishes_signed_zero() {
        assert!(bitwise_eq(&[1.0, 2.0], &[1.0, 2.0]));
        assert!(!bitwise_eq(&[0.0], &[-0.0]));
    }

    #[test]
    fn test_subtract_and_dot() {
        let d = subtract(&[3.0, 5.0], &[1.0, 1.0]);
        assert_eq!(d, [2.0, 4.0]);
        assert_relative_eq!(dot(&d, &[1.0, 0.5]), 4.0);
    }
}
