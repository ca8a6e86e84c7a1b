//! Error types for device acquisition

use std::path::PathBuf;
use thiserror::Error;

/// Failures while finding, grabbing or creating input devices.
///
/// All of these are fatal: the daemon reports them and exits.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// `/dev/input` could not be listed
    #[error("Failed to list input devices: {0}")]
    Enumerate(#[source] std::io::Error),

    /// The device node could not be opened
    #[error("Failed to open input device at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No device carries the configured name
    #[error("No input device named '{name}' found")]
    NotFound { name: String },

    /// Nothing that looks like a keyboard is available
    #[error("No keyboard devices found (are you allowed to read /dev/input?)")]
    NoKeyboards,

    /// Reading the interactive choice failed or input ended
    #[error("Device selection aborted")]
    SelectionAborted(#[source] Option<std::io::Error>),

    /// Exclusive access was refused
    #[error("Failed to grab device '{name}' for exclusive access. Is another application using it?")]
    Grab {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The uinput output device could not be created
    #[error("Failed to create virtual output device: {0}")]
    VirtualDevice(#[source] std::io::Error),
}
