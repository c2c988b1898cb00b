mod quality;
mod rotation;
mod translation;

pub use quality::{
    compute_independence, compute_sensitivity, derive_ref_to_target_offset,
    retargeting_error_rms,
};
pub use rotation::{calibrate_rotation, DeltaSample};
pub use translation::calibrate_translation;

use anyhow::Result;

use crate::apply;
use crate::context::{CalCtx, CalibrationState};
use crate::driver::{OffsetDriver, SetDeviceTransform};
use crate::math;
use crate::pose::Pose;
use crate::profile::ProfileStore;
use crate::runtime::{ChaperoneSetup, DeviceProperty, TrackingRuntime, TrackingUniverse};

/// Minimum spacing between processed ticks, seconds.
const TICK_INTERVAL: f64 = 0.05;

/// One paired observation of both devices, drawn from a single pose query
/// so the two halves are temporally coherent.
#[derive(Clone, Copy)]
pub struct Sample {
    pub reference: Pose,
    pub target: Pose,
    pub valid: bool,
}

impl Sample {
    fn invalid() -> Self {
        Self {
            reference: Pose::default(),
            target: Pose::default(),
            valid: false,
        }
    }
}

/// External collaborators threaded into every tick.
pub struct CalibratorData<'a> {
    pub runtime: &'a dyn TrackingRuntime,
    pub chaperone: &'a mut dyn ChaperoneSetup,
    pub driver: &'a mut dyn OffsetDriver,
    pub store: &'a mut dyn ProfileStore,
}

/// Tick-driven calibration state machine. The sample buffer lives across
/// the ticks of one collection session and is dropped on commit, reject,
/// or abort.
pub struct Calibrator {
    pub ctx: CalCtx,
    samples: Option<Vec<Sample>>,
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Calibrator {
    pub fn new() -> Self {
        Self {
            ctx: CalCtx::new(),
            samples: None,
        }
    }

    /// Hydrates the context from the profile store. Returns whether a
    /// stored profile was found.
    pub fn load_profile(&mut self, store: &dyn ProfileStore) -> Result<bool> {
        match store.load()? {
            Some(profile) => {
                self.ctx.apply_profile(profile);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Requests a calibration session; the devices are validated on the
    /// next tick.
    pub fn start_calibration(&mut self) {
        self.ctx.messages.clear();
        self.ctx.wanted_update_interval = 0.0;
        self.ctx.state = CalibrationState::Begin;
    }

    /// Drops any in-flight session without touching the stored profile.
    pub fn cancel_calibration(&mut self) {
        if self.samples.take().is_some() {
            self.ctx.message("Calibration cancelled");
        }
        self.ctx.state = CalibrationState::None;
    }

    pub fn start_editing(&mut self) {
        if self.ctx.state == CalibrationState::None {
            self.ctx.state = CalibrationState::Editing;
        }
    }

    pub fn stop_editing(&mut self) {
        if self.ctx.state == CalibrationState::Editing {
            self.ctx.state = CalibrationState::None;
        }
    }

    /// Main entry point, driven by the host at whatever cadence it likes;
    /// ticks closer than 50 ms are ignored. Must not be called
    /// re-entrantly.
    pub fn tick(&mut self, time: f64, data: &mut CalibratorData<'_>) -> Result<()> {
        if time - self.ctx.time_last_tick < TICK_INTERVAL {
            return Ok(());
        }
        self.ctx.time_last_tick = time;

        if data
            .runtime
            .device_poses(
                TrackingUniverse::RawAndUncalibrated,
                0.0,
                &mut self.ctx.device_poses,
            )
            .is_err()
        {
            log::debug!("tracking runtime unavailable, skipping tick");
            return Ok(());
        }

        match self.ctx.state {
            CalibrationState::None => {
                self.ctx.wanted_update_interval = 1.0;
                if time - self.ctx.time_last_scan >= 1.0 {
                    self.ctx.time_last_scan = time;
                    apply::scan_and_apply_profile(&mut self.ctx, data)?;
                }
            }
            CalibrationState::Editing => {
                self.ctx.wanted_update_interval = 0.1;
                if time - self.ctx.time_last_scan >= 0.1 {
                    self.ctx.time_last_scan = time;
                    apply::scan_and_apply_profile(&mut self.ctx, data)?;
                }
            }
            CalibrationState::Begin => self.begin(data)?,
            CalibrationState::Rotation => self.collect(data)?,
        }

        Ok(())
    }

    fn begin(&mut self, data: &mut CalibratorData<'_>) -> Result<()> {
        self.ctx.wanted_update_interval = 0.0;

        let (Some(ref_id), Some(target_id)) =
            (self.ctx.reference_device, self.ctx.target_device)
        else {
            self.ctx.message("Missing reference or target device");
            self.ctx.state = CalibrationState::None;
            return Ok(());
        };

        let ref_tracking = self
            .ctx
            .device_poses
            .get(ref_id as usize)
            .is_some_and(|p| p.valid);
        let target_tracking = self
            .ctx
            .device_poses
            .get(target_id as usize)
            .is_some_and(|p| p.valid);
        if !ref_tracking {
            self.ctx.message("Reference device is not tracking");
            self.ctx.state = CalibrationState::None;
            return Ok(());
        }
        if !target_tracking {
            self.ctx.message("Target device is not tracking");
            self.ctx.state = CalibrationState::None;
            return Ok(());
        }

        let ref_serial = data
            .runtime
            .string_property(ref_id, DeviceProperty::SerialNumber)
            .unwrap_or_else(|_| String::from("unknown"));
        let target_serial = data
            .runtime
            .string_property(target_id, DeviceProperty::SerialNumber)
            .unwrap_or_else(|_| String::from("unknown"));
        self.ctx.message(format!(
            "Starting calibration, reference {} target {}",
            ref_serial, target_serial
        ));

        if let Ok(system) = data
            .runtime
            .string_property(ref_id, DeviceProperty::TrackingSystemName)
        {
            self.ctx.reference_tracking_system = system;
        }
        if let Ok(system) = data
            .runtime
            .string_property(target_id, DeviceProperty::TrackingSystemName)
        {
            self.ctx.target_tracking_system = system;
        }

        // A leftover offset would contaminate the raw target poses.
        data.driver
            .set_device_transform(&SetDeviceTransform::disabled(target_id))?;

        self.samples = Some(Vec::with_capacity(self.ctx.sample_count));
        self.ctx.state = CalibrationState::Rotation;
        Ok(())
    }

    fn collect(&mut self, data: &mut CalibratorData<'_>) -> Result<()> {
        self.ctx.wanted_update_interval = 0.0;

        let sample = self.collect_sample();
        if !sample.valid {
            self.ctx
                .message("Device lost tracking, aborting calibration");
            self.samples = None;
            self.ctx.state = CalibrationState::None;
            return Ok(());
        }

        let wanted = self.ctx.sample_count;
        let Some(samples) = self.samples.as_mut() else {
            self.ctx.state = CalibrationState::None;
            return Ok(());
        };
        samples.push(sample);
        log::debug!("Collected sample {}/{}", samples.len(), wanted);

        if samples.len() >= wanted {
            self.finish(data)?;
        }
        Ok(())
    }

    fn collect_sample(&self) -> Sample {
        let (Some(ref_id), Some(target_id)) =
            (self.ctx.reference_device, self.ctx.target_device)
        else {
            return Sample::invalid();
        };
        let (Some(reference), Some(target)) = (
            self.ctx.device_poses.get(ref_id as usize),
            self.ctx.device_poses.get(target_id as usize),
        ) else {
            return Sample::invalid();
        };
        if !reference.valid || !target.valid {
            return Sample::invalid();
        }
        Sample {
            reference: reference.pose,
            target: target.pose,
            valid: true,
        }
    }

    fn finish(&mut self, data: &mut CalibratorData<'_>) -> Result<()> {
        let Some(mut samples) = self.samples.take() else {
            self.ctx.state = CalibrationState::None;
            return Ok(());
        };
        self.ctx.state = CalibrationState::None;

        let euler_deg = calibrate_rotation(&samples);
        let rot = math::rotation_from_euler_deg(&euler_deg);
        let rot_quat = math::quat_from_euler_deg(&euler_deg);

        let originals = samples.clone();
        for s in samples.iter_mut() {
            s.target.rot = rot * s.target.rot;
            s.target.trans = rot * s.target.trans;
        }

        let translation_cm = calibrate_translation(&samples)?;
        let trans_m = translation_cm / 100.0;

        let reject = compute_sensitivity(&mut self.ctx, &originals, &trans_m, &rot_quat);
        let coplanar = compute_independence(&mut self.ctx, &originals, &trans_m, &rot);

        if reject || (coplanar && self.ctx.reject_coplanar) {
            self.ctx.message("Rejecting low quality calibration");
            return Ok(());
        }

        self.ctx.calibrated_rotation = euler_deg;
        self.ctx.calibrated_translation = translation_cm;

        if let Some(target_id) = self.ctx.target_device {
            data.driver.set_device_transform(&SetDeviceTransform::new(
                target_id,
                trans_m,
                rot_quat,
                self.ctx.calibrated_scale,
            ))?;
        }

        self.ctx.valid_profile = true;
        self.ctx.enabled = true;
        data.store.save(&self.ctx.to_profile())?;

        self.ctx.message(format!(
            "Calibration complete, yaw {:.2} pitch {:.2} roll {:.2}, offset ({:.1}, {:.1}, {:.1}) cm",
            euler_deg[1],
            euler_deg[2],
            euler_deg[0],
            translation_cm.x,
            translation_cm.y,
            translation_cm.z
        ));
        Ok(())
    }
}
