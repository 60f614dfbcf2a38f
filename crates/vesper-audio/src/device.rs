use cpal::traits::{DeviceTrait, HostTrait};

use vesper_foundation::AudioError;

/// Enumerate input device names on the default host.
pub fn list_input_devices() -> Result<Vec<String>, AudioError> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| AudioError::Fatal(format!("Failed to enumerate input devices: {}", e)))?;
    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

/// Open the preferred input device by name, falling back to the host
/// default. No device at all is fatal; there is no useful recovery
/// without operator intervention.
pub fn open_input_device(preferred: Option<&str>) -> Result<cpal::Device, AudioError> {
    let host = cpal::default_host();

    if let Some(name) = preferred {
        let mut devices = host
            .input_devices()
            .map_err(|e| AudioError::Fatal(format!("Failed to enumerate input devices: {}", e)))?;
        if let Some(device) = devices.find(|d| d.name().map(|n| n == name).unwrap_or(false)) {
            return Ok(device);
        }
        tracing::warn!(device = name, "Requested input device not found, using default");
    }

    host.default_input_device().ok_or(AudioError::DeviceNotFound {
        name: preferred.map(str::to_string),
    })
}
