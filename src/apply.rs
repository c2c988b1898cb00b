use anyhow::Result;

use crate::calibrator::CalibratorData;
use crate::context::CalCtx;
use crate::driver::SetDeviceTransform;
use crate::math;
use crate::profile::ChaperoneSnapshot;
use crate::runtime::{ChaperoneSetup, DeviceClass, DeviceProperty, HMD_DEVICE, MAX_DEVICES};

/// Walks the device table, applying the calibrated transform to devices
/// living in the target universe and clearing the offset everywhere else.
/// The HMD never receives an offset; a reference-universe mismatch on it
/// disables the profile for the rest of the scan.
pub fn scan_and_apply_profile(ctx: &mut CalCtx, data: &mut CalibratorData<'_>) -> Result<()> {
    ctx.enabled = ctx.valid_profile;

    for id in 0..MAX_DEVICES as u32 {
        if data.runtime.device_class(id) == DeviceClass::Invalid {
            continue;
        }

        if !ctx.enabled {
            data.driver
                .set_device_transform(&SetDeviceTransform::disabled(id))?;
            continue;
        }

        let Ok(system) = data
            .runtime
            .string_property(id, DeviceProperty::TrackingSystemName)
        else {
            data.driver
                .set_device_transform(&SetDeviceTransform::disabled(id))?;
            continue;
        };

        if id == HMD_DEVICE {
            if system != ctx.reference_tracking_system {
                log::warn!(
                    "HMD tracking system changed ({} != {}), disabling calibration",
                    system,
                    ctx.reference_tracking_system
                );
                ctx.enabled = false;
            }
            data.driver
                .set_device_transform(&SetDeviceTransform::disabled(id))?;
            continue;
        }

        if system != ctx.target_tracking_system {
            data.driver
                .set_device_transform(&SetDeviceTransform::disabled(id))?;
            continue;
        }

        data.driver.set_device_transform(&SetDeviceTransform::new(
            id,
            ctx.calibrated_translation / 100.0,
            math::quat_from_euler_deg(&ctx.calibrated_rotation),
            ctx.calibrated_scale,
        ))?;
    }

    if ctx.enabled {
        if let Some(snapshot) = ctx.chaperone.clone() {
            if snapshot.auto_apply {
                let live = data.chaperone.live_collision_bounds()?;
                if live.len() != snapshot.bounds.len() {
                    ctx.message("Play area geometry changed, restoring stored chaperone");
                    apply_chaperone_bounds(&snapshot, data.chaperone)?;
                }
            }
        }
    }

    Ok(())
}

/// Pushes a stored snapshot back through the working copy and commits it
/// live.
pub fn apply_chaperone_bounds(
    snapshot: &ChaperoneSnapshot,
    chaperone: &mut dyn ChaperoneSetup,
) -> Result<()> {
    chaperone.revert_working_copy()?;
    chaperone.set_working_collision_bounds(&snapshot.bounds)?;
    chaperone.set_working_standing_zero_pose(&snapshot.standing_center)?;
    chaperone.set_working_play_area_size(snapshot.play_area.0, snapshot.play_area.1)?;
    chaperone.commit_working_copy_live()
}

/// Captures the live play-area geometry for persistence alongside a
/// calibration.
pub fn capture_chaperone(
    chaperone: &mut dyn ChaperoneSetup,
    auto_apply: bool,
) -> Result<ChaperoneSnapshot> {
    chaperone.revert_working_copy()?;
    let bounds = chaperone.live_collision_bounds()?;
    anyhow::ensure!(!bounds.is_empty(), "no chaperone geometry to capture");
    let standing_center = chaperone.working_standing_zero_pose()?;
    let play_area = chaperone.working_play_area_size()?;
    Ok(ChaperoneSnapshot {
        bounds,
        standing_center,
        play_area,
        auto_apply,
    })
}
