use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::pose::Pose;
use crate::runtime::BoundsQuad;

/// Play-area geometry captured alongside a calibration, restored whenever
/// the live bounds drift away from the stored ones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChaperoneSnapshot {
    pub bounds: Vec<BoundsQuad>,
    pub standing_center: Pose,
    pub play_area: (f64, f64),
    pub auto_apply: bool,
}

/// Persisted calibration result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Profile {
    pub reference_tracking_system: String,
    pub target_tracking_system: String,
    /// ZYX Euler, degrees (see `math`).
    pub rotation_deg: Vector3<f64>,
    /// Centimetres.
    pub translation_cm: Vector3<f64>,
    pub scale: f64,
    #[serde(default)]
    pub chaperone: Option<ChaperoneSnapshot>,
}

pub trait ProfileStore {
    fn load(&self) -> Result<Option<Profile>>;
    fn save(&mut self, profile: &Profile) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

/// Profile persisted as a single JSON file.
pub struct JsonProfileStore {
    path: PathBuf,
}

impl JsonProfileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store under the XDG config home, `spacecal/profile.json`.
    pub fn from_xdg() -> Result<Self> {
        let dirs = xdg::BaseDirectories::with_prefix("spacecal");
        let path = dirs
            .place_config_file("profile.json")
            .context("could not create profile directory")?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProfileStore for JsonProfileStore {
    fn load(&self) -> Result<Option<Profile>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context("could not read profile"),
        };
        Ok(Some(serde_json::from_str(&raw).context("malformed profile")?))
    }

    fn save(&mut self, profile: &Profile) -> Result<()> {
        let raw = serde_json::to_string_pretty(profile)?;
        fs::write(&self.path, raw)
            .with_context(|| format!("could not write {}", self.path.display()))
    }

    fn clear(&mut self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("could not delete profile"),
        }
    }
}
