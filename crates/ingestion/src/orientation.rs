//! Pose derivation from gravity and geomagnetic vectors.
//!
//! Mirrors the platform sensor-manager math so wrist files stay comparable
//! with recordings made on the phone: rotation matrix from (accel, mag),
//! orientation angles from the matrix, then a unit quaternion built from the
//! angle vector treated as the vector part.

use nalgebra::{Matrix3, Vector3};

/// Gravity used for the free-fall check.
const GRAVITY_EARTH: f32 = 9.81;

/// Smallest accepted |gravity|², relative to g².
const FREE_FALL_RATIO: f32 = 0.01;

/// Smallest accepted |east| before normalization.
const MIN_EAST_NORM: f32 = 0.1;

/// Rotation matrix mapping device coordinates to world (east, north, up).
///
/// `gravity` is the raw accelerometer reading in m/s², `geomagnetic` the raw
/// magnetometer reading. Returns `None` in free fall or when the field is
/// (anti)parallel to gravity.
pub fn rotation_matrix(gravity: [f32; 3], geomagnetic: [f32; 3]) -> Option<Matrix3<f32>> {
    let a = Vector3::from(gravity);
    let e = Vector3::from(geomagnetic);

    if a.norm_squared() < FREE_FALL_RATIO * GRAVITY_EARTH * GRAVITY_EARTH {
        return None;
    }

    let h = e.cross(&a);
    let norm_h = h.norm();
    if norm_h < MIN_EAST_NORM {
        return None;
    }

    let h = h / norm_h;
    let a = a.normalize();
    let m = a.cross(&h);

    Some(Matrix3::from_rows(&[
        h.transpose(),
        m.transpose(),
        a.transpose(),
    ]))
}

/// Azimuth, pitch and roll in radians.
pub fn orientation(r: &Matrix3<f32>) -> [f32; 3] {
    [
        r[(0, 1)].atan2(r[(1, 1)]),
        (-r[(2, 1)]).asin(),
        (-r[(2, 0)]).atan2(r[(2, 2)]),
    ]
}

/// Quaternion `[w, x, y, z]` whose vector part is `v`.
///
/// `w` is clamped to zero when `|v| > 1`.
pub fn quaternion_from_vector(v: [f32; 3]) -> [f32; 4] {
    let w2 = 1.0 - v[0] * v[0] - v[1] * v[1] - v[2] * v[2];
    let w = if w2 > 0.0 { w2.sqrt() } else { 0.0 };
    [w, v[0], v[1], v[2]]
}

/// Full pipeline; `None` when the rotation matrix is undefined.
pub fn pose_quaternion(gravity: [f32; 3], geomagnetic: [f32; 3]) -> Option<[f32; 4]> {
    rotation_matrix(gravity, geomagnetic).map(|r| quaternion_from_vector(orientation(&r)))
}
