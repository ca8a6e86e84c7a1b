//! dualrole daemon
//!
//! Grabs a keyboard and turns two configured keys into dual-role keys: tapped
//! they send themselves, held with another key they act as a modifier.

mod clock;
mod device;
mod disambiguator;
mod error;
mod event_loop;
mod injector;
mod logging;
mod modifier;
mod shutdown;

#[cfg(test)]
mod test_support;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use dualrole_config::key_name;

use crate::disambiguator::Disambiguator;
use crate::event_loop::LoopExit;
use crate::injector::VirtualDevice;
use crate::shutdown::ShutdownSignal;

/// Name of the uinput device the remapped stream is written to
const VIRTUAL_DEVICE_NAME: &str = "dualrole virtual keyboard";

#[derive(Parser, Debug)]
#[command(name = "dualroled")]
#[command(about = "Make keys act as modifiers when held")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/dualrole/config.kdl")]
    config: String,

    /// Input device to grab (e.g., /dev/input/event3); overrides the config
    #[arg(short, long)]
    device: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Installed first so configuration warnings are not lost
    let log = logging::init();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&args.config).into_owned().into();

    let config = dualrole_config::parse_config(&config_path).with_context(|| {
        format!("Failed to load configuration from {}", config_path.display())
    })?;
    log.apply(config.global.log_level)
        .context("Failed to apply the configured log level")?;

    let dual_role = config.dual_role;
    tracing::info!(
        "Loaded configuration from {}: {} -> {}, {} -> {}, max delay {}ms",
        config_path.display(),
        key_name(dual_role.mod1.key),
        key_name(dual_role.mod1.secondary),
        key_name(dual_role.mod2.key),
        key_name(dual_role.mod2.secondary),
        dual_role.max_delay.as_millis()
    );

    let device_path = device::resolve_device_path(args.device, config.device.as_ref())?;
    let mut input = device::open_device(&device_path)?;
    let device_name = input.name().unwrap_or("Unknown").to_string();

    let mut output = VirtualDevice::new_keyboard(VIRTUAL_DEVICE_NAME, &input, &dual_role)
        .map_err(|e| {
            if nix::unistd::Uid::effective().is_root() {
                anyhow::Error::new(e)
            } else {
                anyhow::Error::new(e).context("Writing to /dev/uinput usually requires root")
            }
        })?;

    device::grab_device(&mut input)?;
    tracing::info!(
        "Grabbed '{}' at {}",
        device_name,
        device_path.display()
    );

    let stream = input
        .into_event_stream()
        .with_context(|| format!("Failed to read events from '{}'", device_name))?;
    let mut source = Box::pin(futures::stream::unfold(stream, |mut stream| async move {
        let event = stream.next_event().await;
        Some((event, stream))
    }));

    let shutdown = ShutdownSignal::register().context("Failed to install signal handlers")?;
    let mut disambiguator = Disambiguator::new(dual_role);

    tracing::info!("dualrole daemon running");

    let exit = event_loop::run(&mut source, &mut disambiguator, &mut output, shutdown.wait())
        .await
        .context("Event loop failed")?;

    match exit {
        LoopExit::StreamClosed => {
            tracing::info!("Input device '{}' closed, exiting", device_name)
        }
        LoopExit::Shutdown => tracing::info!("Shutting down..."),
    }

    // Dropping the stream closes the device, which releases the grab
    Ok(())
}
