//! Brightness scale conversion
//!
//! The hub dims over 0-254, the device slider over 0-99. The relay is the
//! single conversion point; device-link messages always carry the device
//! scale.

use serde::Deserialize;

use crate::{DEVICE_BRIGHTNESS_MAX, HUB_BRIGHTNESS_MAX};

/// Scale factor between the two brightness ranges
const SCALE: f64 = 2.56;

/// Light state as the hub reports it
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LightState {
    pub on: bool,
    /// Hub-scale brightness; absent for lights that cannot dim
    #[serde(default)]
    pub bri: Option<u16>,
}

/// Convert a device-scale level (0-99) to the hub scale (0-254)
pub fn to_hub_scale(level: u8) -> u16 {
    let level = level.min(DEVICE_BRIGHTNESS_MAX);
    let scaled = (level as f64 * SCALE).round() as u16;
    scaled.min(HUB_BRIGHTNESS_MAX)
}

/// Convert a hub-scale brightness (0-254) to the device scale (0-99)
pub fn to_device_scale(bri: u16) -> u8 {
    let bri = bri.min(HUB_BRIGHTNESS_MAX);
    let scaled = (bri as f64 / SCALE).round() as u8;
    scaled.min(DEVICE_BRIGHTNESS_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_range_maps_to_full_range() {
        assert_eq!(to_device_scale(HUB_BRIGHTNESS_MAX), DEVICE_BRIGHTNESS_MAX);
        assert_eq!(to_hub_scale(DEVICE_BRIGHTNESS_MAX), 253);
        assert_eq!(to_hub_scale(0), 0);
        assert_eq!(to_device_scale(0), 0);
    }

    #[test]
    fn test_round_trip_within_one_step() {
        let device = to_device_scale(HUB_BRIGHTNESS_MAX);
        let back = to_hub_scale(device);
        assert!((HUB_BRIGHTNESS_MAX as i32 - back as i32).abs() <= 1);

        for bri in [1u16, 50, 127, 128, 200, 254] {
            let back = to_hub_scale(to_device_scale(bri));
            assert!(
                (bri as i32 - back as i32).abs() <= 2,
                "hub {} came back as {}",
                bri,
                back
            );
        }
    }

    #[test]
    fn test_out_of_range_input_clamps() {
        assert_eq!(to_hub_scale(120), 253);
        assert_eq!(to_device_scale(400), 99);
    }

    #[test]
    fn test_midpoint() {
        assert_eq!(to_hub_scale(50), 128);
        assert_eq!(to_device_scale(128), 50);
    }
}
