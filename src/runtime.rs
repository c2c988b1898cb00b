use anyhow::Result;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::pose::Pose;

/// Fixed size of the runtime's device table.
pub const MAX_DEVICES: usize = 64;

/// Index the runtime reserves for the head-mounted display.
pub const HMD_DEVICE: u32 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackingUniverse {
    /// Driver-space poses with no seated/standing transform applied.
    RawAndUncalibrated,
    Standing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceClass {
    Invalid,
    Hmd,
    Controller,
    GenericTracker,
    TrackingReference,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceProperty {
    TrackingSystemName,
    SerialNumber,
}

/// One slot of the runtime's pose table.
#[derive(Clone, Copy, Debug, Default)]
pub struct DevicePose {
    pub valid: bool,
    pub pose: Pose,
}

/// Narrow contract onto the tracking runtime supplying device state. The
/// host binds this to whatever runtime it talks to.
pub trait TrackingRuntime {
    /// Samples poses for every slot of the device table in one call, so a
    /// reference/target pair drawn from the result is temporally coherent.
    /// Slots without a tracked device come back with `valid == false`.
    fn device_poses(
        &self,
        universe: TrackingUniverse,
        prediction_s: f64,
        poses: &mut [DevicePose],
    ) -> Result<()>;

    fn device_class(&self, id: u32) -> DeviceClass;

    fn string_property(&self, id: u32, prop: DeviceProperty) -> Result<String>;
}

/// One collision-bounds wall segment, four corners.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundsQuad {
    pub corners: [Vector3<f64>; 4],
}

/// Working-copy editing surface of the runtime's play-area setup.
pub trait ChaperoneSetup {
    fn revert_working_copy(&mut self) -> Result<()>;
    fn live_collision_bounds(&self) -> Result<Vec<BoundsQuad>>;
    fn set_working_collision_bounds(&mut self, quads: &[BoundsQuad]) -> Result<()>;
    fn working_standing_zero_pose(&self) -> Result<Pose>;
    fn set_working_standing_zero_pose(&mut self, pose: &Pose) -> Result<()>;
    fn working_play_area_size(&self) -> Result<(f64, f64)>;
    fn set_working_play_area_size(&mut self, x: f64, z: f64) -> Result<()>;
    fn commit_working_copy_live(&mut self) -> Result<()>;
}
