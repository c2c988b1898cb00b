use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};

/// Unnormalized rotation axis of `m`. The magnitude scales with the sine
/// of the rotation angle, which makes it double as a degeneracy check.
pub fn rotation_axis(m: &Matrix3<f64>) -> Vector3<f64> {
    Vector3::new(
        m[(2, 1)] - m[(1, 2)],
        m[(0, 2)] - m[(2, 0)],
        m[(1, 0)] - m[(0, 1)],
    )
}

/// Rotation angle of `m` in radians, clamped against numerical drift in
/// the trace.
pub fn rotation_angle(m: &Matrix3<f64>) -> f64 {
    ((m.trace() - 1.0) / 2.0).clamp(-1.0, 1.0).acos()
}

/// Euler angles here are ZYX in degrees: component 0 rotates about Z,
/// component 1 about Y, component 2 about X, composed as
/// `Rz(e[0]) * Ry(e[1]) * Rx(e[2])`. With Y up that makes yaw `e[1]`,
/// pitch `e[2]` and roll `e[0]`.
pub fn rotation_from_euler_deg(e: &Vector3<f64>) -> Rotation3<f64> {
    Rotation3::from_euler_angles(e[2].to_radians(), e[1].to_radians(), e[0].to_radians())
}

pub fn euler_deg_from_rotation(rot: &Rotation3<f64>) -> Vector3<f64> {
    let (x, y, z) = rot.euler_angles();
    Vector3::new(z.to_degrees(), y.to_degrees(), x.to_degrees())
}

pub fn quat_from_euler_deg(e: &Vector3<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::from_rotation_matrix(&rotation_from_euler_deg(e))
}
