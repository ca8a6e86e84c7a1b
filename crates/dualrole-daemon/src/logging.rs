//! Tracing setup
//!
//! The subscriber is installed before the configuration is read so parser
//! warnings are visible. Its filter starts from `RUST_LOG` (or `info`) and is
//! swapped for the configured `log-level` once that is known, unless
//! `RUST_LOG` was set.

use dualrole_config::LogLevel;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

/// Level used until the configuration has been read
const STARTUP_LEVEL: &str = "info";

/// Handle for adjusting the installed filter
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

/// Install the global subscriber.
pub fn init() -> LogHandle {
    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(STARTUP_LEVEL), false),
    };
    let (layer, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(layer)
        .with(fmt::layer())
        .init();

    LogHandle {
        filter: handle,
        from_env,
    }
}

impl LogHandle {
    /// Switch to the configured level. `RUST_LOG` keeps precedence.
    pub fn apply(&self, level: LogLevel) -> Result<(), reload::Error> {
        if self.from_env {
            return Ok(());
        }
        self.filter.reload(EnvFilter::new(level.as_filter()))
    }
}
