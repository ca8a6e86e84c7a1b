//! Device enumeration, selection and grabbing

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use dualrole_config::{DeviceInfo, DeviceSelector};
use evdev::Device;

use crate::error::DeviceError;

/// Enumerate all input devices that can be opened, sorted by path
pub fn enumerate_devices() -> Result<Vec<DeviceInfo>, DeviceError> {
    dualrole_config::enumerate_devices().map_err(DeviceError::Enumerate)
}

/// Open the device node at `path`
pub fn open_device(path: &Path) -> Result<Device, DeviceError> {
    Device::open(path).map_err(|source| DeviceError::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// Decide which device to grab.
///
/// An explicit path (from the command line) wins, then the configured
/// selector. Without either the user is asked to pick a keyboard.
pub fn resolve_device_path(
    explicit: Option<PathBuf>,
    selector: Option<&DeviceSelector>,
) -> Result<PathBuf, DeviceError> {
    if let Some(path) = explicit {
        return Ok(path);
    }

    match selector {
        Some(DeviceSelector::Path(path)) => Ok(path.clone()),
        Some(DeviceSelector::Name(name)) => {
            let devices = enumerate_devices()?;
            find_by_name(&devices, name)
                .map(|d| d.path.clone())
                .ok_or_else(|| DeviceError::NotFound { name: name.clone() })
        }
        None => {
            let keyboards: Vec<DeviceInfo> = enumerate_devices()?
                .into_iter()
                .filter(|d| d.is_keyboard)
                .collect();
            let stdin = std::io::stdin();
            let index = choose_device(&keyboards, stdin.lock(), std::io::stdout())?;
            Ok(keyboards[index].path.clone())
        }
    }
}

/// First device whose name matches exactly
pub fn find_by_name<'a>(devices: &'a [DeviceInfo], name: &str) -> Option<&'a DeviceInfo> {
    devices.iter().find(|d| d.name == name)
}

/// Ask the user to pick one of `keyboards`, returning its index.
///
/// A single keyboard is picked without asking. Invalid answers are asked again;
/// end of input aborts.
pub fn choose_device<R: BufRead, W: Write>(
    keyboards: &[DeviceInfo],
    mut input: R,
    mut output: W,
) -> Result<usize, DeviceError> {
    match keyboards.len() {
        0 => return Err(DeviceError::NoKeyboards),
        1 => {
            tracing::info!("Using the only keyboard found: {}", keyboards[0].name);
            return Ok(0);
        }
        _ => {}
    }

    let aborted = |e: std::io::Error| DeviceError::SelectionAborted(Some(e));

    writeln!(output, "Available keyboards:").map_err(aborted)?;
    for (i, device) in keyboards.iter().enumerate() {
        writeln!(
            output,
            "  [{}] {} ({}, {})",
            i,
            device.name,
            device.path.display(),
            device.vendor_product()
        )
        .map_err(aborted)?;
    }

    loop {
        write!(output, "Select a device [0-{}]: ", keyboards.len() - 1).map_err(aborted)?;
        output.flush().map_err(aborted)?;

        let mut line = String::new();
        if input.read_line(&mut line).map_err(aborted)? == 0 {
            return Err(DeviceError::SelectionAborted(None));
        }

        match line.trim().parse::<usize>() {
            Ok(index) if index < keyboards.len() => return Ok(index),
            _ => {
                writeln!(output, "Invalid choice: {}", line.trim()).map_err(aborted)?;
            }
        }
    }
}

/// Grab a device for exclusive access
pub fn grab_device(device: &mut Device) -> Result<(), DeviceError> {
    device.grab().map_err(|source| DeviceError::Grab {
        name: device.name().unwrap_or("Unknown").to_string(),
        source,
    })
}
