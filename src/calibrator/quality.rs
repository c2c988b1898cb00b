use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};

use super::Sample;
use crate::context::CalCtx;

/// Calibrations with a retargeting RMS error above this (metres) are
/// discarded.
const MAX_RMS_ERROR_M: f64 = 0.1;

/// Smallest-axis variance below this marks the sample cloud as coplanar.
const COPLANARITY_EPSILON: f64 = 5e-5;

/// Average position of the target device in reference-local coordinates
/// under the candidate transform.
pub fn derive_ref_to_target_offset(
    samples: &[Sample],
    trans_m: &Vector3<f64>,
    rot: &Rotation3<f64>,
) -> Vector3<f64> {
    let mut sum = Vector3::zeros();
    let mut count = 0usize;
    for s in samples.iter().filter(|s| s.valid) {
        let updated = trans_m + rot * s.target.trans;
        sum += s.reference.rot.transpose() * (updated - s.reference.trans);
        count += 1;
    }
    sum / count as f64
}

/// Root-mean-square distance between each retargeted sample position and
/// the position predicted from the reference pose plus the derived offset.
pub fn retargeting_error_rms(
    samples: &[Sample],
    offset: &Vector3<f64>,
    trans_m: &Vector3<f64>,
    rot: &Rotation3<f64>,
) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for s in samples.iter().filter(|s| s.valid) {
        let updated = trans_m + rot * s.target.trans;
        let predicted = s.reference.rot * offset + s.reference.trans;
        sum += (updated - predicted).norm_squared();
        count += 1;
    }
    (sum / count as f64).sqrt()
}

/// Gates on the unperturbed retargeting error and probes how sharply the
/// error responds to small rotation perturbations. Returns `true` when the
/// calibration must be rejected.
pub fn compute_sensitivity(
    ctx: &mut CalCtx,
    samples: &[Sample],
    trans_m: &Vector3<f64>,
    rot_quat: &UnitQuaternion<f64>,
) -> bool {
    let rot = rot_quat.to_rotation_matrix();
    let offset = derive_ref_to_target_offset(samples, trans_m, &rot);
    let base_error = retargeting_error_rms(samples, &offset, trans_m, &rot);

    ctx.message(format!(
        "Retargeting RMS error: {:.1} mm",
        base_error * 1000.0
    ));

    for (name, axis) in [
        ("X", Vector3::x_axis()),
        ("Y", Vector3::y_axis()),
        ("Z", Vector3::z_axis()),
    ] {
        let probe = UnitQuaternion::from_axis_angle(&axis, 10f64.to_radians()) * rot_quat;
        let probed =
            retargeting_error_rms(samples, &offset, trans_m, &probe.to_rotation_matrix());
        log::info!(
            "Rotation sensitivity {}: {:+.1} mm at 10 deg",
            name,
            (probed - base_error) * 1000.0
        );
    }

    !base_error.is_finite() || base_error > MAX_RMS_ERROR_M
}

/// PCA coplanarity check over the retargeted sample positions relative to
/// the reference. Returns `true` when the cloud is flat, in which case the
/// fit is weakly constrained along the missing direction.
pub fn compute_independence(
    ctx: &mut CalCtx,
    samples: &[Sample],
    trans_m: &Vector3<f64>,
    rot: &Rotation3<f64>,
) -> bool {
    let points: Vec<Vector3<f64>> = samples
        .iter()
        .filter(|s| s.valid)
        .map(|s| (rot * s.target.trans + trans_m) - s.reference.trans)
        .collect();
    if points.is_empty() {
        return true;
    }

    let count = points.len() as f64;
    let mean = points.iter().fold(Vector3::zeros(), |acc, p| acc + p) / count;
    let mean_distance = points.iter().map(|p| p.norm()).sum::<f64>() / count;
    if mean_distance <= f64::EPSILON {
        ctx.message("Samples are degenerate - move around more during calibration");
        return true;
    }

    let mut covariance = Matrix3::zeros();
    for p in points.iter() {
        let centered = p - mean;
        covariance += centered * centered.transpose();
    }
    covariance /= count;

    let eigen = covariance.symmetric_eigen();
    let mut basis = eigen.eigenvectors;
    for i in 0..3 {
        let column = basis.column(i).normalize();
        basis.set_column(i, &column);
    }
    // Orthonormal basis, so the transpose is the inverse.
    let basis_inv = basis.transpose();

    let projected: Vec<Vector3<f64>> = points
        .iter()
        .map(|p| basis_inv * (p / mean_distance))
        .collect();
    let projected_mean =
        projected.iter().fold(Vector3::zeros(), |acc, q| acc + q) / count;

    let mut variance = Vector3::zeros();
    for q in projected.iter() {
        let deviation = q - projected_mean;
        variance += deviation.component_mul(&deviation);
    }
    variance /= count;

    log::debug!(
        "Sample spread along principal axes: {:.2e} {:.2e} {:.2e}",
        variance[0],
        variance[1],
        variance[2]
    );

    if variance.min() < COPLANARITY_EPSILON {
        ctx.message("Samples are coplanar - move around more during calibration");
        return true;
    }
    false
}
