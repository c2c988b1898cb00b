use nalgebra::{Dyn, Matrix3, OMatrix, Rotation3, RowVector3, Vector3, U3};

use super::Sample;
use crate::math;

/// Pairs closer than this rotation angle (radians) on either body are
/// rejected; near-identical poses yield ill-conditioned axes.
const MIN_DELTA_ANGLE: f64 = 0.4;
const MIN_AXIS_NORM: f64 = 0.01;

/// World-space rotation axes of the motion both bodies underwent between
/// two sample times. Rigidly attached bodies share the same physical
/// rotation, so the two axes differ only by the universe rotation.
pub struct DeltaSample {
    pub ref_axis: RowVector3<f64>,
    pub target_axis: RowVector3<f64>,
}

impl DeltaSample {
    /// `None` when the two samples are too close together to yield a
    /// usable axis on either body.
    pub fn from_pair(newer: &Sample, older: &Sample) -> Option<Self> {
        let delta_ref = newer.reference.rot * older.reference.rot.transpose();
        let delta_target = newer.target.rot * older.target.rot.transpose();

        let ref_axis = math::rotation_axis(delta_ref.matrix());
        let target_axis = math::rotation_axis(delta_target.matrix());

        if math::rotation_angle(delta_ref.matrix()) < MIN_DELTA_ANGLE
            || math::rotation_angle(delta_target.matrix()) < MIN_DELTA_ANGLE
            || ref_axis.norm() < MIN_AXIS_NORM
            || target_axis.norm() < MIN_AXIS_NORM
        {
            return None;
        }

        Some(Self {
            ref_axis: ref_axis.normalize().transpose(),
            target_axis: target_axis.normalize().transpose(),
        })
    }
}

/// Kabsch fit over the delta-rotation axis pairs of every unordered sample
/// pair. Returns ZYX Euler angles in degrees.
///
/// Fewer than three surviving delta pairs leave the system
/// under-determined; the result is still defined but the quality gate is
/// what rejects it.
pub fn calibrate_rotation(samples: &[Sample]) -> Vector3<f64> {
    let mut deltas = Vec::with_capacity(samples.len());
    for i in 0..samples.len() {
        for j in 0..i {
            if let Some(delta) = DeltaSample::from_pair(&samples[i], &samples[j]) {
                deltas.push(delta);
            }
        }
    }

    log::debug!(
        "{} samples produced {} delta pairs",
        samples.len(),
        deltas.len()
    );

    let mut ref_centroid = RowVector3::zeros();
    let mut target_centroid = RowVector3::zeros();
    for d in deltas.iter() {
        ref_centroid += d.ref_axis;
        target_centroid += d.target_axis;
    }
    let len_recip = 1.0 / deltas.len() as f64;
    ref_centroid *= len_recip;
    target_centroid *= len_recip;

    let mut ref_points = OMatrix::<f64, Dyn, U3>::zeros(deltas.len());
    let mut target_points = OMatrix::<f64, Dyn, U3>::zeros(deltas.len());
    for (i, d) in deltas.iter().enumerate() {
        ref_points.set_row(i, &(d.ref_axis - ref_centroid));
        target_points.set_row(i, &(d.target_axis - target_centroid));
    }

    let cross_cv = ref_points.transpose() * target_points;
    let svd = cross_cv.svd(true, true);
    let u = svd.u.unwrap();
    let v = svd.v_t.unwrap().transpose();

    let mut d = Matrix3::identity();
    if (u * v.transpose()).determinant() < 0.0 {
        d[(2, 2)] = -1.0;
    }

    // Transposed so the result maps target-universe poses onto the
    // reference universe.
    let rot = (v * d * u.transpose()).transpose();

    math::euler_deg_from_rotation(&Rotation3::from_matrix_unchecked(rot))
}
