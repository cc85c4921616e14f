use crate::error::MediaError;

/// A capture device with an explicit acquire/release lifecycle.
pub trait CameraDevice: Send {
    fn acquire(&mut self) -> Result<(), MediaError>;
    fn release(&mut self);
}

/// On/off switch that owns a camera. The device is released when toggled off,
/// on [`CameraToggle::release`], and as a last resort on drop.
pub struct CameraToggle {
    device: Box<dyn CameraDevice>,
    active: bool,
}

impl CameraToggle {
    pub fn new(device: Box<dyn CameraDevice>) -> Self {
        Self {
            device,
            active: false,
        }
    }

    pub fn is_on(&self) -> bool {
        self.active
    }

    /// Flips the camera and returns the new state.
    pub fn toggle(&mut self) -> Result<bool, MediaError> {
        if self.active {
            self.release();
        } else {
            self.device.acquire()?;
            tracing::info!("Camera acquired");
            self.active = true;
        }
        Ok(self.active)
    }

    pub fn release(&mut self) {
        if self.active {
            self.device.release();
            self.active = false;
            tracing::info!("Camera released");
        }
    }
}

impl Drop for CameraToggle {
    fn drop(&mut self) {
        self.release();
    }
}
