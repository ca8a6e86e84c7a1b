//! Configuration data model

use std::path::PathBuf;
use std::time::Duration;

use evdev::Key;

/// Tap threshold used when the configuration omits `max-delay`.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(200);

/// Root configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    pub global: GlobalConfig,
    /// Which input device to grab; `None` means ask at startup
    pub device: Option<DeviceSelector>,
    pub dual_role: DualRoleConfig,
}

/// Global settings
#[derive(Debug, Clone, Default)]
pub struct GlobalConfig {
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

/// How the input device is picked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    /// Exact evdev device name (e.g., "AT Translated Set 2 keyboard")
    Name(String),
    /// Device node (e.g., `/dev/input/event3`)
    Path(PathBuf),
}

/// The two dual-role keys and the tap threshold.
///
/// `mod1` and `mod2` are guaranteed distinct by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DualRoleConfig {
    pub mod1: DualRoleKey,
    pub mod2: DualRoleKey,
    /// A release within this long of the key's own press is a tap
    pub max_delay: Duration,
}

/// A key that acts as itself when tapped and as `secondary` when held
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DualRoleKey {
    pub key: Key,
    pub secondary: Key,
}
