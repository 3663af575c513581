use crate::traits::MatrixTransform;
use serde::{Deserialize, Serialize};

/// 2D affine transform stored as `[a, b, c, d, e, f]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform(pub [f64; 6]);

impl Transform {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self([a, b, c, d, e, f])
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    pub fn translate(dx: f64, dy: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, dx, dy)
    }

    /// Returns `self * other`, i.e. `other` is applied first
    pub fn multiply(&self, other: &Transform) -> Transform {
        Transform(<[f64; 2] as MatrixTransform>::combine_matrices(&self.0, &other.0))
    }

    /// Applies `other` after this transform
    pub fn then(&self, other: &Transform) -> Transform {
        other.multiply(self)
    }

    pub fn determinant(&self) -> f64 {
        self.0[0] * self.0[3] - self.0[1] * self.0[2]
    }

    /// Inverse transform, `None` when the matrix is singular
    pub fn invert(&self) -> Option<Transform> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }

        let [a, b, c, d, e, f] = self.0;
        Some(Transform::new(
            d / det,
            -b / det,
            -c / det,
            a / det,
            (c * f - d * e) / det,
            -(a * f - b * e) / det,
        ))
    }

    pub fn apply(&self, coordinate: [f64; 2]) -> [f64; 2] {
        coordinate.apply_transform(&self.0)
    }

    /// Column-major 3x3 matrix suitable for a shader uniform
    pub fn to_mat3(&self) -> [f64; 9] {
        let [a, b, c, d, e, f] = self.0;
        [a, b, 0.0, c, d, 0.0, e, f, 1.0]
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_and_apply() {
        let t = Transform::translate(10.0, 0.0).multiply(&Transform::scale(2.0, 3.0));
        assert_eq!(t.apply([1.0, 1.0]), [12.0, 3.0]);

        let u = Transform::scale(2.0, 3.0).then(&Transform::translate(10.0, 0.0));
        assert_eq!(u, t);
    }

    #[test]
    fn test_invert_roundtrip() {
        let t = Transform::new(2.0, 0.0, 0.0, -4.0, 5.0, 400.0);
        let inverse = t.invert().unwrap();
        let p = t.apply([3.0, 7.0]);
        let back = inverse.apply(p);
        assert!((back[0] - 3.0).abs() < 1e-12);
        assert!((back[1] - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_singular_has_no_inverse() {
        assert!(Transform::scale(0.0, 1.0).invert().is_none());
    }
}
