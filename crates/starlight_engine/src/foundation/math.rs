//! Math utilities and types
//!
//! Provides the 2D/3D vector types used by lights and the viewport, plus the
//! handful of planar geometry helpers the compositor needs for culling.

pub use nalgebra::{Vector2, Vector3};

/// 2D vector type (world or screen space)
pub type Vec2 = Vector2<f32>;

/// 3D vector type (colors, directional light vectors)
pub type Vec3 = Vector3<f32>;

/// Angle and geometry constants
pub mod constants {
    /// Full turn in degrees
    pub const FULL_TURN_DEGREES: f32 = 360.0;
}

/// Rotate `offset` by `angle_degrees` and translate it to `origin`.
///
/// Used to place a light at a fixed point on a rotating host entity.
pub fn rotate_offset(origin: Vec2, offset: Vec2, angle_degrees: f32) -> Vec2 {
    let (sin, cos) = angle_degrees.to_radians().sin_cos();
    Vec2::new(
        offset.x.mul_add(cos, -(offset.y * sin)) + origin.x,
        offset.x.mul_add(sin, offset.y * cos) + origin.y,
    )
}

/// Wrap an angle in degrees into `[0, 360)`.
pub fn normalize_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(constants::FULL_TURN_DEGREES);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= constants::FULL_TURN_DEGREES {
        0.0
    } else {
        wrapped
    }
}

/// Squared distance from `point` to the segment `a`-`b`.
pub fn point_segment_distance_sq(a: Vec2, b: Vec2, point: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq <= f32::EPSILON {
        return (point - a).norm_squared();
    }
    let t = ((point - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (point - (a + ab * t)).norm_squared()
}

/// Whether segments `a1`-`a2` and `b1`-`b2` touch.
///
/// Endpoints of the first segment lying within a third of a unit of the
/// second count as touching, which absorbs rounding on axis-aligned edges.
pub fn segments_intersect(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> bool {
    const TOUCH_DISTANCE_SQ: f32 = 0.11111;

    if point_segment_distance_sq(b1, b2, a2) <= TOUCH_DISTANCE_SQ
        || point_segment_distance_sq(b1, b2, a1) <= TOUCH_DISTANCE_SQ
    {
        return true;
    }

    let da = a2 - a1;
    let db = b2 - b1;
    let denom = da.x.mul_add(db.y, -(da.y * db.x));
    if denom.abs() <= f32::EPSILON {
        return false;
    }

    let r = (a1.y - b1.y).mul_add(db.x, -((a1.x - b1.x) * db.y)) / denom;
    let s = (a1.y - b1.y).mul_add(da.x, -((a1.x - b1.x) * da.y)) / denom;

    (0.0..=1.0).contains(&r) && (0.0..=1.0).contains(&s)
}
