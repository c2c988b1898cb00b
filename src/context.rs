use nalgebra::Vector3;

use crate::profile::{ChaperoneSnapshot, Profile};
use crate::runtime::{DevicePose, MAX_DEVICES};

/// Default number of pose pairs collected per calibration session.
pub const DEFAULT_SAMPLE_COUNT: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CalibrationState {
    /// Nothing in flight; devices are scanned at 1 Hz.
    #[default]
    None,
    /// Manual adjustment in progress; devices are scanned at 10 Hz so
    /// tweaks take effect quickly.
    Editing,
    /// Session requested; devices are validated on the next tick.
    Begin,
    /// Collecting paired samples until the buffer is full.
    Rotation,
}

/// Process-wide calibration record, threaded through every tick.
pub struct CalCtx {
    pub state: CalibrationState,
    pub reference_device: Option<u32>,
    pub target_device: Option<u32>,
    pub device_poses: Vec<DevicePose>,

    pub reference_tracking_system: String,
    pub target_tracking_system: String,

    /// ZYX Euler, degrees.
    pub calibrated_rotation: Vector3<f64>,
    /// Centimetres.
    pub calibrated_translation: Vector3<f64>,
    /// Externally configured; the solver never writes this.
    pub calibrated_scale: f64,

    pub valid_profile: bool,
    pub enabled: bool,
    /// Makes the coplanarity check fatal instead of advisory.
    pub reject_coplanar: bool,

    pub sample_count: usize,
    pub time_last_tick: f64,
    pub time_last_scan: f64,
    /// Tick cadence this component would like from the host, seconds.
    /// Zero means "as fast as possible".
    pub wanted_update_interval: f64,

    pub chaperone: Option<ChaperoneSnapshot>,
    pub messages: Vec<String>,
}

impl Default for CalCtx {
    fn default() -> Self {
        Self::new()
    }
}

impl CalCtx {
    pub fn new() -> Self {
        Self {
            state: CalibrationState::None,
            reference_device: None,
            target_device: None,
            device_poses: vec![DevicePose::default(); MAX_DEVICES],
            reference_tracking_system: String::new(),
            target_tracking_system: String::new(),
            calibrated_rotation: Vector3::zeros(),
            calibrated_translation: Vector3::zeros(),
            calibrated_scale: 1.0,
            valid_profile: false,
            enabled: false,
            reject_coplanar: false,
            sample_count: DEFAULT_SAMPLE_COUNT,
            time_last_tick: 0.0,
            time_last_scan: 0.0,
            wanted_update_interval: 1.0,
            chaperone: None,
            messages: Vec::new(),
        }
    }

    /// Logs and keeps the message for the host UI.
    pub fn message(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        log::info!("{}", msg);
        self.messages.push(msg);
    }

    pub fn to_profile(&self) -> Profile {
        Profile {
            reference_tracking_system: self.reference_tracking_system.clone(),
            target_tracking_system: self.target_tracking_system.clone(),
            rotation_deg: self.calibrated_rotation,
            translation_cm: self.calibrated_translation,
            scale: self.calibrated_scale,
            chaperone: self.chaperone.clone(),
        }
    }

    pub fn apply_profile(&mut self, profile: Profile) {
        self.reference_tracking_system = profile.reference_tracking_system;
        self.target_tracking_system = profile.target_tracking_system;
        self.calibrated_rotation = profile.rotation_deg;
        self.calibrated_translation = profile.translation_cm;
        self.calibrated_scale = profile.scale;
        self.chaperone = profile.chaperone;
        self.valid_profile = self.calibrated_rotation.iter().all(|v| v.is_finite())
            && self.calibrated_translation.iter().all(|v| v.is_finite());
    }
}
