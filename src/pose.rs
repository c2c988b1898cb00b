use std::fmt::Display;

use nalgebra::{Matrix3, Matrix4, Rotation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Rigid transform: a proper rotation plus a translation, double precision.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub rot: Rotation3<f64>,
    pub trans: Vector3<f64>,
}

impl std::ops::Mul for Pose {
    type Output = Self;
    fn mul(self, rhs: Pose) -> Self::Output {
        Self {
            trans: self.trans + self.rot * rhs.trans,
            rot: self.rot * rhs.rot,
        }
    }
}

impl Pose {
    pub fn new(rot: Rotation3<f64>, trans: Vector3<f64>) -> Self {
        Self { rot, trans }
    }

    /// Builds a pose from the 3x4 row-major affine matrix handed out by
    /// the tracking runtime. The upper 3x3 block must be a proper rotation.
    pub fn from_affine34(m: &[[f64; 4]; 3]) -> Self {
        let rot = Rotation3::from_matrix_unchecked(Matrix3::new(
            m[0][0], m[0][1], m[0][2], m[1][0], m[1][1], m[1][2], m[2][0], m[2][1], m[2][2],
        ));
        Self {
            rot,
            trans: Vector3::new(m[0][3], m[1][3], m[2][3]),
        }
    }

    pub fn to_homogeneous(&self) -> Matrix4<f64> {
        let mut m = self.rot.to_homogeneous();
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.trans);
        m
    }

    pub fn inverse(self) -> Self {
        let transpose = self.rot.transpose();
        Self {
            trans: transpose * self.trans.scale(-1f64),
            rot: transpose,
        }
    }

    pub fn orientation(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_rotation_matrix(&self.rot)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Pose {
            rot: Rotation3::identity(),
            trans: Vector3::zeros(),
        }
    }
}

impl Display for Pose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (roll, pitch, yaw) = self.rot.euler_angles();
        write!(
            f,
            "(X: {:.2}, Y: {:.2}, Z: {:.2} | Yaw: {:.2}, Pitch: {:.2}, Roll: {:.2})",
            self.trans.x,
            self.trans.y,
            self.trans.z,
            yaw.to_degrees(),
            pitch.to_degrees(),
            roll.to_degrees()
        )
    }
}
