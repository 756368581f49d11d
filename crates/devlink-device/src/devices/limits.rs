//! Capture limits a camera accepts.

use devlink_core::{CameraStartOptions, DeviceProfile};
use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, Result};

/// Largest geometry and rate a camera accepts.
///
/// Read from the profile options `max_width`, `max_height` and `max_fps`,
/// each falling back to the device kind's default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraLimits {
    /// Largest accepted width in pixels.
    pub max_width: u32,

    /// Largest accepted height in pixels.
    pub max_height: u32,

    /// Highest accepted frame rate.
    pub max_fps: u32,
}

impl CameraLimits {
    /// Create limits.
    pub const fn new(max_width: u32, max_height: u32, max_fps: u32) -> Self {
        Self {
            max_width,
            max_height,
            max_fps,
        }
    }

    /// Limits from `profile`, with `defaults` for absent options.
    ///
    /// # Errors
    ///
    /// Returns an invalid profile error if an option does not parse.
    pub fn from_profile(profile: &DeviceProfile, defaults: Self) -> devlink_core::Result<Self> {
        Ok(Self {
            max_width: profile
                .option_parsed("max_width")?
                .unwrap_or(defaults.max_width),
            max_height: profile
                .option_parsed("max_height")?
                .unwrap_or(defaults.max_height),
            max_fps: profile.option_parsed("max_fps")?.unwrap_or(defaults.max_fps),
        })
    }

    /// Check `options` for positivity and against these limits.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::InvalidOptions`] naming the rejected field.
    pub fn check(&self, device_id: &str, options: &CameraStartOptions) -> Result<()> {
        options
            .validate()
            .map_err(|e| DeviceError::invalid_options(device_id, e.to_string()))?;

        if options.width > self.max_width || options.height > self.max_height {
            return Err(DeviceError::invalid_options(
                device_id,
                format!(
                    "resolution {}x{} exceeds {}x{}",
                    options.width, options.height, self.max_width, self.max_height
                ),
            ));
        }
        if options.fps > self.max_fps {
            return Err(DeviceError::invalid_options(
                device_id,
                format!("{} fps exceeds {} fps", options.fps, self.max_fps),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const LIMITS: CameraLimits = CameraLimits::new(1920, 1080, 30);

    #[rstest]
    #[case(1280, 720, 30, true)]
    #[case(1920, 1080, 1, true)]
    #[case(1921, 1080, 30, false)]
    #[case(1280, 720, 31, false)]
    #[case(0, 720, 30, false)]
    #[case(1280, 720, 0, false)]
    fn test_check(#[case] width: u32, #[case] height: u32, #[case] fps: u32, #[case] ok: bool) {
        let result = LIMITS.check("cam", &CameraStartOptions::new(width, height, fps));
        assert_eq!(result.is_ok(), ok);
        if let Err(e) = result {
            assert!(matches!(e, DeviceError::InvalidOptions { .. }));
        }
    }

    #[test]
    fn test_from_profile_overrides() {
        let profile = DeviceProfile::new("Acme", "X", "mjpeg").with_option("max_fps", "15");
        let limits = CameraLimits::from_profile(&profile, LIMITS).unwrap();
        assert_eq!(limits, CameraLimits::new(1920, 1080, 15));

        let bad = DeviceProfile::new("Acme", "X", "mjpeg").with_option("max_fps", "fast");
        assert!(CameraLimits::from_profile(&bad, LIMITS).is_err());
    }
}
