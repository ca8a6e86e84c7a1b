//! KDL configuration parser

use std::path::Path;
use std::time::Duration;

use evdev::Key;

use crate::error::{ConfigError, InvalidKeyInfo, SourceLocation};
use crate::keys::{key_name, parse_key};
use crate::model::*;

/// Extract source location from a KDL entry
fn get_entry_location(entry: &kdl::KdlEntry, source: &str) -> SourceLocation {
    let span = entry.span();
    let (line, column) = offset_to_line_col(source, span.offset());
    SourceLocation::new(line, column, span.offset(), span.len())
}

/// Convert byte offset to line and column (1-indexed)
fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;

    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// Parse a configuration file from the given path
pub fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse configuration from a string
pub fn parse_config_str(content: &str) -> Result<Config, ConfigError> {
    let doc: kdl::KdlDocument = content.parse().map_err(|e: kdl::KdlError| {
        // kdl carries its own miette version, so rebuild the span by hand
        let span = miette::SourceSpan::from((e.span.offset(), e.span.len()));
        ConfigError::ParseError {
            src: content.to_string(),
            span,
            source: e,
        }
    })?;

    let mut global = GlobalConfig::default();
    let mut device = None;
    let mut mod1 = None;
    let mut mod2 = None;
    let mut max_delay = DEFAULT_MAX_DELAY;
    let mut invalid_keys = Vec::new();

    for node in doc.nodes() {
        match node.name().value() {
            "global" => {
                global = parse_global(node)?;
            }
            "device" => {
                set_once(&mut device, parse_device(node)?, "device")?;
            }
            "mod1" => {
                let key = parse_dual_role_key(node, "mod1", content, &mut invalid_keys)?;
                set_once(&mut mod1, key, "mod1")?;
            }
            "mod2" => {
                let key = parse_dual_role_key(node, "mod2", content, &mut invalid_keys)?;
                set_once(&mut mod2, key, "mod2")?;
            }
            "max-delay" => {
                max_delay = parse_max_delay(node)?;
            }
            name => {
                tracing::warn!("Unknown top-level node: {}", name);
            }
        }
    }

    // Report every unknown key name at once
    if !invalid_keys.is_empty() {
        return Err(ConfigError::invalid_keys(content, invalid_keys));
    }

    let mod1 = resolved(mod1, "mod1")?;
    let mod2 = resolved(mod2, "mod2")?;

    if mod1.key == mod2.key {
        return Err(ConfigError::Invalid {
            message: format!(
                "mod1 and mod2 must be different keys, both are {}",
                key_name(mod1.key)
            ),
        });
    }

    Ok(Config {
        global,
        device,
        dual_role: DualRoleConfig {
            mod1,
            mod2,
            max_delay,
        },
    })
}

/// Store a node's value, rejecting a second definition of the same node.
fn set_once<T>(slot: &mut Option<T>, value: T, name: &str) -> Result<(), ConfigError> {
    if slot.is_some() {
        return Err(ConfigError::Invalid {
            message: format!("`{}` is defined more than once", name),
        });
    }
    *slot = Some(value);
    Ok(())
}

/// Unwrap a parsed dual-role key.
///
/// The inner `None` means the node existed but one of its names did not
/// resolve; that case was already reported through the invalid key list.
fn resolved(
    slot: Option<Option<DualRoleKey>>,
    role: &str,
) -> Result<DualRoleKey, ConfigError> {
    match slot.flatten() {
        Some(key) => Ok(key),
        None => Err(ConfigError::MissingField {
            field: format!(
                "{role} (e.g., `{role} \"CapsLock\" secondary=\"LeftCtrl\"`)"
            ),
        }),
    }
}

fn parse_global(node: &kdl::KdlNode) -> Result<GlobalConfig, ConfigError> {
    let mut global = GlobalConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "log-level" => {
                    if let Some(val) = first_argument(child).and_then(|v| v.as_string()) {
                        global.log_level = val
                            .parse()
                            .map_err(|e| ConfigError::Invalid { message: e })?;
                    }
                }
                name => {
                    tracing::warn!("Unknown global config option: {}", name);
                }
            }
        }
    }

    Ok(global)
}

fn parse_device(node: &kdl::KdlNode) -> Result<DeviceSelector, ConfigError> {
    if let Some(path) = property(node, "path").and_then(|v| v.as_string()) {
        let expanded: String = shellexpand::tilde(path).into_owned();
        return Ok(DeviceSelector::Path(expanded.into()));
    }

    match first_argument(node).and_then(|v| v.as_string()) {
        Some(name) => Ok(DeviceSelector::Name(name.to_string())),
        None => Err(ConfigError::MissingField {
            field: "device name or path (e.g., `device \"My Keyboard\"` or `device path=\"/dev/input/event3\"`)"
                .to_string(),
        }),
    }
}

/// Parse `modN "Key" secondary="Key"`.
///
/// Names that do not resolve are pushed onto `invalid_keys` and `Ok(None)` is
/// returned so the remaining nodes can still be checked.
fn parse_dual_role_key(
    node: &kdl::KdlNode,
    role: &str,
    source: &str,
    invalid_keys: &mut Vec<InvalidKeyInfo>,
) -> Result<Option<DualRoleKey>, ConfigError> {
    let key_entry = node.entries().iter().find(|e| e.name().is_none());
    let secondary_entry = node
        .entries()
        .iter()
        .find(|e| e.name().map(|n| n.value()) == Some("secondary"));

    let (key_entry, secondary_entry) = match (key_entry, secondary_entry) {
        (Some(k), Some(s)) => (k, s),
        (None, _) => {
            return Err(ConfigError::MissingField {
                field: format!("{role} key name (e.g., `{role} \"CapsLock\"`)"),
            })
        }
        (_, None) => {
            return Err(ConfigError::MissingField {
                field: format!("{role} secondary (e.g., `{role} \"CapsLock\" secondary=\"LeftCtrl\"`)"),
            })
        }
    };

    let key = resolve_entry(key_entry, role.to_string(), source, invalid_keys)?;
    let secondary = resolve_entry(
        secondary_entry,
        format!("{} secondary", role),
        source,
        invalid_keys,
    )?;

    Ok(match (key, secondary) {
        (Some(key), Some(secondary)) => Some(DualRoleKey { key, secondary }),
        _ => None,
    })
}

fn resolve_entry(
    entry: &kdl::KdlEntry,
    context: String,
    source: &str,
    invalid_keys: &mut Vec<InvalidKeyInfo>,
) -> Result<Option<Key>, ConfigError> {
    let name = entry.value().as_string().ok_or_else(|| ConfigError::Invalid {
        message: format!("{} must be a quoted key name", context),
    })?;

    match parse_key(name) {
        Some(key) => Ok(Some(key)),
        None => {
            invalid_keys.push(InvalidKeyInfo {
                key: name.to_string(),
                context,
                location: get_entry_location(entry, source),
            });
            Ok(None)
        }
    }
}

fn parse_max_delay(node: &kdl::KdlNode) -> Result<Duration, ConfigError> {
    match first_argument(node).and_then(|v| v.as_i64()) {
        Some(ms) if ms > 0 => Ok(Duration::from_millis(ms as u64)),
        Some(ms) => Err(ConfigError::Invalid {
            message: format!("max-delay must be a positive number of milliseconds, got {}", ms),
        }),
        None => Err(ConfigError::Invalid {
            message: "max-delay expects an integer number of milliseconds (e.g., `max-delay 200`)"
                .to_string(),
        }),
    }
}

fn first_argument(node: &kdl::KdlNode) -> Option<&kdl::KdlValue> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .map(|e| e.value())
}

fn property<'a>(node: &'a kdl::KdlNode, name: &str) -> Option<&'a kdl::KdlValue> {
    node.entries()
        .iter()
        .find(|e| e.name().map(|n| n.value()) == Some(name))
        .map(|e| e.value())
}
