//! Joint angle estimation from 2-D pose landmarks.
//!
//! Landmarks arrive in normalized image space from an external pose model.
//! The angle at a joint is the absolute difference of the two ray headings,
//! folded into [0, 180] so flexion reads the same from either side.

use thiserror::Error;

/// A landmark position in normalized image space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point2D {
    fn from(v: (f64, f64)) -> Self {
        Point2D { x: v.0, y: v.1 }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("landmark coordinates must be finite")]
    NonFiniteInput,
    #[error("coincident landmarks leave the joint angle undefined")]
    CoincidentPoints,
}

// Rays shorter than this are treated as coincident landmarks.
const MIN_RAY_LEN: f64 = 1e-9;

/// Angle in degrees at vertex `b`, formed by the rays `b -> a` and `b -> c`.
///
/// Always in [0, 180]: 180 is a straight arm, 90 a right-angle bend.
pub fn joint_angle(a: Point2D, b: Point2D, c: Point2D) -> Result<f64, GeometryError> {
    if !a.is_finite() || !b.is_finite() || !c.is_finite() {
        return Err(GeometryError::NonFiniteInput);
    }

    let ray_a = (a.x - b.x, a.y - b.y);
    let ray_c = (c.x - b.x, c.y - b.y);

    if ray_a.0.hypot(ray_a.1) < MIN_RAY_LEN || ray_c.0.hypot(ray_c.1) < MIN_RAY_LEN {
        return Err(GeometryError::CoincidentPoints);
    }

    let raw = ray_c.1.atan2(ray_c.0) - ray_a.1.atan2(ray_a.0);
    let degrees = raw.to_degrees().abs();

    if degrees > 180.0 {
        Ok(360.0 - degrees)
    } else {
        Ok(degrees)
    }
}
