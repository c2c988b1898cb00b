use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::{env, fs};

use anyhow::{ensure, Context as _, Result};
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Environment override for the offset driver's socket path.
pub const DRIVER_SOCKET_ENV: &str = "SPACECAL_DRIVER_SOCKET";

/// Shared-memory channel the driver publishes raw device poses on.
pub const RAW_POSE_SHMEM_NAME: &str = "spacecal-driver-poses";

/// Pose offset request for a single device. Translation is metres, the
/// quaternion is scalar-first `(w, x, y, z)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SetDeviceTransform {
    pub id: u32,
    pub enabled: bool,
    pub translation: mint::Vector3<f64>,
    pub rotation: mint::Quaternion<f64>,
    pub scale: f64,
}

impl SetDeviceTransform {
    pub fn new(
        id: u32,
        translation: Vector3<f64>,
        rotation: UnitQuaternion<f64>,
        scale: f64,
    ) -> Self {
        Self {
            id,
            enabled: true,
            translation: translation.into(),
            rotation: rotation.into_inner().into(),
            scale,
        }
    }

    /// Identity offset with the override switched off.
    pub fn disabled(id: u32) -> Self {
        Self {
            id,
            enabled: false,
            translation: mint::Vector3 {
                x: 0.0,
                y: 0.0,
                z: 0.0,
            },
            rotation: mint::Quaternion {
                v: mint::Vector3 {
                    x: 0.0,
                    y: 0.0,
                    z: 0.0,
                },
                s: 1.0,
            },
            scale: 1.0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
enum DriverRequest {
    SetDeviceTransform(SetDeviceTransform),
}

#[derive(Debug, Serialize, Deserialize)]
struct DriverResponse {
    ok: bool,
}

/// Synchronous transport pushing pose offsets to the driver.
pub trait OffsetDriver {
    fn set_device_transform(&mut self, req: &SetDeviceTransform) -> Result<()>;
}

/// Line-delimited JSON client over the driver's unix socket. Every request
/// blocks until the driver acknowledges it.
pub struct IpcOffsetDriver {
    stream: UnixStream,
    reader: BufReader<UnixStream>,
}

impl IpcOffsetDriver {
    pub fn connect(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path)
            .with_context(|| format!("offset driver not reachable at {}", path.display()))?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self { stream, reader })
    }

    /// `SPACECAL_DRIVER_SOCKET`, or `driver.sock` in the XDG runtime
    /// directory.
    pub fn socket_path() -> Result<PathBuf> {
        if let Ok(path) = env::var(DRIVER_SOCKET_ENV) {
            return Ok(path.into());
        }
        let dirs = xdg::BaseDirectories::with_prefix("spacecal");
        dirs.place_runtime_file("driver.sock")
            .context("no runtime directory for the driver socket")
    }

    fn send_blocking(&mut self, req: &DriverRequest) -> Result<DriverResponse> {
        let mut raw = serde_json::to_vec(req)?;
        raw.push(b'\n');
        self.stream.write_all(&raw)?;

        let mut line = String::new();
        self.reader.read_line(&mut line)?;
        serde_json::from_str(&line).context("malformed driver response")
    }
}

impl OffsetDriver for IpcOffsetDriver {
    fn set_device_transform(&mut self, req: &SetDeviceTransform) -> Result<()> {
        let resp = self.send_blocking(&DriverRequest::SetDeviceTransform(*req))?;
        ensure!(resp.ok, "driver rejected transform for device {}", req.id);
        Ok(())
    }
}

/// Driver-side handles, acquired once at startup and held for the process
/// lifetime. Dropping them closes the socket and releases the channel.
pub struct DriverHandles {
    pub ipc: IpcOffsetDriver,
    pub raw_poses: Option<RawPoseChannel>,
}

impl DriverHandles {
    pub fn acquire() -> Result<Self> {
        let ipc = IpcOffsetDriver::connect(&IpcOffsetDriver::socket_path()?)?;
        let raw_poses = match RawPoseChannel::open() {
            Ok(channel) => Some(channel),
            Err(e) => {
                log::warn!("{:#}", e);
                None
            }
        };
        Ok(Self { ipc, raw_poses })
    }
}

/// One record of the raw-pose shared-memory channel.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DriverPose {
    pub device_id: u32,
    pub position: mint::Vector3<f64>,
    pub orientation: mint::Quaternion<f64>,
}

/// Handle on the raw-pose channel. Acquired at startup and held for the
/// process lifetime; reserved for per-device overrides, nothing consumes
/// the records yet.
pub struct RawPoseChannel {
    _shmem: fs::File,
}

impl RawPoseChannel {
    pub fn open() -> Result<Self> {
        let path = Path::new("/dev/shm").join(RAW_POSE_SHMEM_NAME);
        let shmem = fs::File::open(&path)
            .with_context(|| format!("raw pose channel missing at {}", path.display()))?;
        Ok(Self { _shmem: shmem })
    }
}
