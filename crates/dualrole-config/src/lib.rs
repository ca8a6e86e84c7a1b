//! Configuration parsing for dualrole
//!
//! This crate parses the KDL configuration file that names the two dual-role
//! keys, their secondary functions and the tap threshold, and resolves every
//! key name against a fixed name-to-code table. It also holds the input
//! device discovery shared by the daemon and the CLI.

mod devices;
mod error;
mod keys;
mod model;
mod parser;

pub use devices::{enumerate_devices, is_keyboard, DeviceInfo};
pub use error::{ConfigError, InvalidKeyInfo, SourceLocation};
pub use keys::{key_name, parse_key};
pub use model::*;
pub use parser::{parse_config, parse_config_str};
