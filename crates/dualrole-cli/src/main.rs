//! dualrole CLI
//!
//! Configuration checking and device discovery for dualrole.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use dualrole_config::{key_name, DeviceInfo, DeviceSelector, DualRoleKey};
use miette::IntoDiagnostic;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "dualrole")]
#[command(about = "Dual-role key remapping tool")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/dualrole/config.kdl")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration file
    Validate,

    /// List available input devices
    Devices {
        /// Print the list as JSON
        #[arg(long)]
        json: bool,
    },
}

/// An input device as listed by `dualrole devices`
#[derive(Debug, Serialize)]
struct DeviceEntry {
    name: String,
    path: PathBuf,
    id: String,
    keyboard: bool,
}

fn main() -> miette::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&cli.config).into_owned().into();

    match cli.command {
        Commands::Validate => cmd_validate(&config_path),
        Commands::Devices { json } => cmd_devices(json),
    }
}

fn describe(role: &str, binding: &DualRoleKey) -> String {
    format!(
        "{}: tap {} / hold {}",
        role,
        key_name(binding.key),
        key_name(binding.secondary)
    )
}

fn cmd_validate(config_path: &Path) -> miette::Result<()> {
    println!("Validating configuration: {}", config_path.display());

    let config = dualrole_config::parse_config(config_path)?;

    println!("Configuration is valid!");
    println!("  {}", describe("mod1", &config.dual_role.mod1));
    println!("  {}", describe("mod2", &config.dual_role.mod2));
    println!("  max delay: {}ms", config.dual_role.max_delay.as_millis());
    match &config.device {
        Some(DeviceSelector::Name(name)) => println!("  device: \"{}\"", name),
        Some(DeviceSelector::Path(path)) => println!("  device: {}", path.display()),
        None => println!("  device: chosen at startup"),
    }
    Ok(())
}

impl From<DeviceInfo> for DeviceEntry {
    fn from(info: DeviceInfo) -> Self {
        Self {
            id: info.vendor_product(),
            name: info.name,
            path: info.path,
            keyboard: info.is_keyboard,
        }
    }
}

fn list_devices() -> miette::Result<Vec<DeviceEntry>> {
    let devices = dualrole_config::enumerate_devices().into_diagnostic()?;
    Ok(devices.into_iter().map(DeviceEntry::from).collect())
}

fn cmd_devices(json: bool) -> miette::Result<()> {
    let devices = list_devices()?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&devices).into_diagnostic()?
        );
        return Ok(());
    }

    println!("Available input devices:\n");
    for device in &devices {
        let device_type = if device.keyboard { "keyboard" } else { "other" };
        println!("  {} [{}]", device.name, device_type);
        println!("    Path: {}", device.path.display());
        println!("    ID: {}", device.id);
        println!();
    }

    if devices.is_empty() {
        println!("  (none readable; try running as root)");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use evdev::Key;

    #[test]
    fn test_describe_binding() {
        let binding = DualRoleKey {
            key: Key::KEY_CAPSLOCK,
            secondary: Key::KEY_LEFTCTRL,
        };
        assert_eq!(describe("mod1", &binding), "mod1: tap CAPSLOCK / hold LEFTCTRL");
    }

    #[test]
    fn test_device_entry_json_shape() {
        let entry = DeviceEntry {
            name: "Test Keyboard".to_string(),
            path: PathBuf::from("/dev/input/event3"),
            id: "3434:0361".to_string(),
            keyboard: true,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["name"], "Test Keyboard");
        assert_eq!(value["path"], "/dev/input/event3");
        assert_eq!(value["keyboard"], true);
    }

    #[test]
    fn test_device_entry_from_info() {
        let entry = DeviceEntry::from(DeviceInfo {
            path: PathBuf::from("/dev/input/event5"),
            name: "Laptop Keyboard".to_string(),
            vendor: 0x0001,
            product: 0x00ab,
            is_keyboard: true,
        });
        assert_eq!(entry.id, "0001:00ab");
        assert_eq!(entry.name, "Laptop Keyboard");
        assert!(entry.keyboard);
    }

    #[test]
    fn test_cli_parses_devices_json() {
        let cli = Cli::try_parse_from(["dualrole", "devices", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Devices { json: true }));
        assert_eq!(cli.config, "~/.config/dualrole/config.kdl");
    }
}
