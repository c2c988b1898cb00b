//! Rigid-body calibration between two independently tracked coordinate
//! systems. A target device is strapped to a reference device (usually
//! the HMD); while the pair moves, paired pose samples constrain the
//! rotation and translation mapping the target universe onto the
//! reference one. Once solved, the transform is pushed to a pose-offset
//! driver for every device living in the target universe.

pub mod apply;
pub mod calibrator;
pub mod context;
pub mod driver;
pub mod math;
pub mod pose;
pub mod profile;
pub mod runtime;


pub use calibrator::{Calibrator, CalibratorData, Sample};
pub use context::{CalCtx, CalibrationState};
pub use pose::Pose;
