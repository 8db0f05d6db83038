//! Device settings
//!
//! Reads the settings this firmware cares about from the config store.
//! Missing keys are written with their defaults on first boot.

use alloc::string::String;
use defmt::*;

use flashcfg_core::ConfigStore;
use flashcfg_hal_rp2040::FlashFilesystem;

/// Default values written on first boot
const DEFAULT_DEVICE_NAME: &str = "flashcfg-node";
const DEFAULT_LED_BRIGHTNESS: u32 = 128;
const DEFAULT_SAMPLE_RATE_HZ: f64 = 10.0;
const DEFAULT_TELEMETRY: bool = true;

/// Settings loaded at boot
#[derive(Debug, Clone)]
pub struct Settings {
    pub device_name: String,
    pub led_brightness: u32,
    pub sample_rate_hz: f64,
    pub telemetry_enabled: bool,
    /// Number of boots including this one
    pub boot_count: u32,
}

impl Settings {
    /// Load settings, defaulting missing keys, and record this boot
    pub fn load<F: FlashFilesystem>(store: &mut ConfigStore<F>) -> Self {
        let device_name = store.get_or_default_str("device_name", DEFAULT_DEVICE_NAME);
        let led_brightness = store
            .get_or_default("led_brightness", DEFAULT_LED_BRIGHTNESS)
            .min(255);
        let sample_rate_hz = store.get_or_default("sample_rate_hz", DEFAULT_SAMPLE_RATE_HZ);
        let telemetry_enabled = store.get_or_default("telemetry_enabled", DEFAULT_TELEMETRY);

        let previous = store.get_or_default("boot_count", 0u32);
        let boot_count = store.update("boot_count", previous.saturating_add(1));

        Self {
            device_name,
            led_brightness,
            sample_rate_hz,
            telemetry_enabled,
            boot_count,
        }
    }

    /// Log a summary of the settings
    pub fn log(&self) {
        info!("Settings loaded (boot #{})", self.boot_count);
        debug!("  device_name: {}", self.device_name.as_str());
        debug!("  led_brightness: {}", self.led_brightness);
        debug!("  sample_rate_hz: {}", self.sample_rate_hz);
        debug!("  telemetry_enabled: {}", self.telemetry_enabled);
    }
}
