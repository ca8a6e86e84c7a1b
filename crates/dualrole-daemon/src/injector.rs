//! Virtual device injection via uinput
//!
//! The [`VirtualDevice`] is the only writer of synthesized output. It buffers
//! events handed to it through [`EventSink`] and writes each batch on
//! `synchronize`.

use std::io;

use dualrole_config::DualRoleConfig;
use evdev::{
    uinput::VirtualDeviceBuilder, AbsInfo, AttributeSet, AttributeSetRef, Device, InputEvent,
    Key, UinputAbsSetup,
};

use crate::disambiguator::{EventSink, KeyState};
use crate::error::DeviceError;

/// A virtual input device for injecting events
pub struct VirtualDevice {
    device: evdev::uinput::VirtualDevice,
    pending: Vec<InputEvent>,
}

impl VirtualDevice {
    /// Create a new virtual keyboard device mirroring `source`.
    ///
    /// Supports all standard keys, anything the source reports and every key
    /// named in `config`, so secondary functions outside the standard range can
    /// still be emitted. The source's relative axes, absolute axes and switches
    /// are copied so non-key events on combined devices can be forwarded.
    pub fn new_keyboard(
        name: &str,
        source: &Device,
        config: &DualRoleConfig,
    ) -> Result<Self, DeviceError> {
        Self::build(name, source, config).map_err(DeviceError::VirtualDevice)
    }

    fn build(name: &str, source: &Device, config: &DualRoleConfig) -> io::Result<Self> {
        let keys = output_keys(source.supported_keys(), config);

        let mut builder = VirtualDeviceBuilder::new()?.name(name).with_keys(&keys)?;
        if let Some(axes) = source.supported_relative_axes() {
            builder = builder.with_relative_axes(axes)?;
        }
        if let Some(axes) = source.supported_absolute_axes() {
            let state = source.get_abs_state()?;
            for axis in axes.iter() {
                let Some(info) = state.get(axis.0 as usize) else {
                    continue;
                };
                let setup = UinputAbsSetup::new(
                    axis,
                    AbsInfo::new(
                        info.value,
                        info.minimum,
                        info.maximum,
                        info.fuzz,
                        info.flat,
                        info.resolution,
                    ),
                );
                builder = builder.with_absolute_axis(&setup)?;
            }
        }
        if let Some(switches) = source.supported_switches() {
            builder = builder.with_switches(switches)?;
        }

        Ok(Self {
            device: builder.build()?,
            pending: Vec::with_capacity(8),
        })
    }
}

/// Keys the virtual device must be able to emit.
fn output_keys(
    source: Option<&AttributeSetRef<Key>>,
    config: &DualRoleConfig,
) -> AttributeSet<Key> {
    let mut keys = AttributeSet::<Key>::new();

    // Add all standard keys
    for code in 0..256u16 {
        keys.insert(Key::new(code));
    }
    if let Some(supported) = source {
        for key in supported.iter() {
            keys.insert(key);
        }
    }
    for binding in [config.mod1, config.mod2] {
        keys.insert(binding.key);
        keys.insert(binding.secondary);
    }

    keys
}

impl EventSink for VirtualDevice {
    fn emit(&mut self, key: Key, state: KeyState) -> io::Result<()> {
        self.pending.push(InputEvent::new(
            evdev::EventType::KEY,
            key.code(),
            state.value(),
        ));
        Ok(())
    }

    fn forward(&mut self, event: InputEvent) -> io::Result<()> {
        self.pending.push(event);
        Ok(())
    }

    fn synchronize(&mut self) -> io::Result<()> {
        // evdev terminates every emitted batch with SYN_REPORT
        let batch = std::mem::take(&mut self.pending);
        tracing::trace!("writing batch of {} event(s)", batch.len());
        self.device.emit(&batch)
    }
}
