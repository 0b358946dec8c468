//! Output device discovery
//!
//! Every cpal host is searched, so a saved device keeps working when it lives
//! on a host other than the platform default (ALSA hardware while JACK runs,
//! for instance).

use std::fmt;

use cpal::traits::{DeviceTrait, HostTrait};

use super::config::DeviceId;
use super::error::{AudioError, AudioResult};

/// An entry of the device list shown to the operator
#[derive(Debug, Clone)]
pub struct OutputDevice {
    /// Host-qualified id, ready to be saved in the config
    pub id: DeviceId,
    pub is_default: bool,
    /// Widest output configuration the device offers
    pub channels: u16,
}

impl fmt::Display for OutputDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} ch)", self.id, self.channels)?;
        if self.is_default {
            f.write_str(" default")?;
        }
        Ok(())
    }
}

fn hosts() -> impl Iterator<Item = (String, cpal::Host)> {
    cpal::available_hosts().into_iter().filter_map(|id| match cpal::host_from_id(id) {
        Ok(host) => Some((id.name().to_string(), host)),
        Err(e) => {
            log::debug!("Skipping audio host {}: {}", id.name(), e);
            None
        }
    })
}

fn output_channels(device: &cpal::Device) -> u16 {
    device
        .supported_output_configs()
        .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
        .unwrap_or(0)
}

/// Every usable output on every host, default devices first
pub fn output_devices() -> AudioResult<Vec<OutputDevice>> {
    let mut found = Vec::new();
    for (host_name, host) in hosts() {
        let default_name = host.default_output_device().and_then(|d| d.name().ok());
        let devices = match host.output_devices() {
            Ok(devices) => devices,
            Err(e) => {
                log::debug!("Could not list {} outputs: {}", host_name, e);
                continue;
            }
        };
        for device in devices {
            let Ok(name) = device.name() else { continue };
            let channels = output_channels(&device);
            if channels == 0 {
                continue;
            }
            found.push(OutputDevice {
                is_default: default_name.as_deref() == Some(name.as_str()),
                id: DeviceId::with_host(name, host_name.as_str()),
                channels,
            });
        }
    }

    if found.is_empty() {
        return Err(AudioError::NoDevices);
    }
    found.sort_by(|a, b| {
        b.is_default
            .cmp(&a.is_default)
            .then_with(|| a.id.to_string().cmp(&b.id.to_string()))
    });
    Ok(found)
}

/// Device list for display; a failed enumeration is an empty list
pub fn available_output_devices() -> Vec<OutputDevice> {
    output_devices().unwrap_or_else(|e| {
        log::warn!("Failed to list audio devices: {}", e);
        Vec::new()
    })
}

fn find_device(id: &DeviceId) -> AudioResult<cpal::Device> {
    for (host_name, host) in hosts() {
        if id.host.as_deref().is_some_and(|wanted| wanted != host_name) {
            continue;
        }
        let Ok(mut devices) = host.output_devices() else { continue };
        if let Some(device) = devices.find(|d| d.name().is_ok_and(|name| name == id.name)) {
            return Ok(device);
        }
    }
    Err(AudioError::DeviceNotFound(id.to_string()))
}

fn default_device() -> AudioResult<cpal::Device> {
    let host = cpal::default_host();
    host.default_output_device().ok_or_else(|| AudioError::NoDefaultDevice {
        host: host.id().name().to_string(),
    })
}

/// The device to open: the saved one if it is connected, else the default
pub fn resolve_output_device(preferred: Option<&DeviceId>) -> AudioResult<cpal::Device> {
    if let Some(id) = preferred {
        match find_device(id) {
            Ok(device) => return Ok(device),
            Err(e) => log::warn!("{}, using the system default", e),
        }
    }
    default_device()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumeration_tolerates_machines_without_audio() {
        match output_devices() {
            Ok(devices) => assert!(devices.iter().all(|d| d.channels > 0)),
            Err(AudioError::NoDevices) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    #[test]
    fn test_unknown_host_never_matches() {
        let id = DeviceId::with_host("definitely-not-a-real-device", "NoSuchHost");
        assert!(matches!(find_device(&id), Err(AudioError::DeviceNotFound(_))));
    }

    #[test]
    fn test_display() {
        let device = OutputDevice {
            id: DeviceId::with_host("Scarlett 2i2", "ALSA"),
            is_default: true,
            channels: 2,
        };
        assert_eq!(device.to_string(), "[ALSA] Scarlett 2i2 (2 ch) default");
    }
}
