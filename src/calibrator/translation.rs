use anyhow::anyhow;
use nalgebra::{Dyn, OMatrix, Vector3, U1, U3};

use super::Sample;

/// Least-squares translation over pairwise delta constraints, stacking the
/// reference-frame and target-frame instances of each constraint to
/// regularize the system. Expects the candidate rotation to already be
/// applied to every target pose. Returns centimetres.
pub fn calibrate_translation(samples: &[Sample]) -> anyhow::Result<Vector3<f64>> {
    let mut deltas = Vec::with_capacity(samples.len());

    for i in 0..samples.len() {
        for j in 0..i {
            let (si, sj) = (&samples[i], &samples[j]);

            let ref_rot_i = si.reference.rot.transpose();
            let ref_rot_j = sj.reference.rot.transpose();
            let delta_ref = ref_rot_j.matrix() - ref_rot_i.matrix();
            let ref_constant = ref_rot_j * (sj.reference.trans - sj.target.trans)
                - ref_rot_i * (si.reference.trans - si.target.trans);
            deltas.push((ref_constant, delta_ref));

            let target_rot_i = si.target.rot.transpose();
            let target_rot_j = sj.target.rot.transpose();
            let delta_target = target_rot_j.matrix() - target_rot_i.matrix();
            let target_constant = target_rot_j * (sj.reference.trans - sj.target.trans)
                - target_rot_i * (si.reference.trans - si.target.trans);
            deltas.push((target_constant, delta_target));
        }
    }

    let mut constants = OMatrix::<f64, Dyn, U1>::zeros(deltas.len() * 3);
    let mut coefficients = OMatrix::<f64, Dyn, U3>::zeros(deltas.len() * 3);
    for (i, (constant, coefficient)) in deltas.iter().enumerate() {
        for axis in 0..3 {
            constants[i * 3 + axis] = constant[axis];
            coefficients.set_row(i * 3 + axis, &coefficient.row(axis));
        }
    }

    let metres: Vector3<f64> = coefficients
        .svd(true, true)
        .solve(&constants, f32::EPSILON as f64)
        .map_err(|e| anyhow!(e))?;

    Ok(metres * 100.0)
}
