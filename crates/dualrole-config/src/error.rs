use miette::{Diagnostic, LabeledSpan};
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Failed to parse KDL")]
    #[diagnostic(code(dualrole::config::parse_error))]
    ParseError {
        #[source_code]
        src: String,
        #[label("here")]
        span: miette::SourceSpan,
        #[source]
        source: kdl::KdlError,
    },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(dualrole::config::invalid))]
    Invalid { message: String },

    #[error("Missing required field: {field}")]
    #[diagnostic(code(dualrole::config::missing_field))]
    MissingField { field: String },

    #[error("Unknown key name(s): {}", format_invalid_keys(.invalid_keys))]
    #[diagnostic(
        code(dualrole::config::unknown_key),
        help("use a name like `CapsLock`, `LeftCtrl`, `Space` or a raw kernel name like `KEY_CAPSLOCK`")
    )]
    InvalidKeys {
        #[source_code]
        src: String,
        #[label(collection)]
        labels: Vec<LabeledSpan>,
        invalid_keys: Vec<InvalidKeyInfo>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Position of a node or entry in the configuration source.
///
/// `line` and `column` are 1-indexed; `offset` and `len` are byte based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
    pub len: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize, offset: usize, len: usize) -> Self {
        Self {
            line,
            column,
            offset,
            len,
        }
    }
}

/// A key name that did not resolve to a key code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidKeyInfo {
    /// The name as written in the configuration
    pub key: String,
    /// Which setting it belongs to (e.g. `mod1` or `mod1 secondary`)
    pub context: String,
    pub location: SourceLocation,
}

impl InvalidKeyInfo {
    fn label(&self) -> LabeledSpan {
        LabeledSpan::new(
            Some(format!("unknown {} key", self.context)),
            self.location.offset,
            self.location.len,
        )
    }
}

impl ConfigError {
    pub(crate) fn invalid_keys(src: &str, invalid_keys: Vec<InvalidKeyInfo>) -> Self {
        ConfigError::InvalidKeys {
            src: src.to_string(),
            labels: invalid_keys.iter().map(InvalidKeyInfo::label).collect(),
            invalid_keys,
        }
    }
}

fn format_invalid_keys(invalid_keys: &[InvalidKeyInfo]) -> String {
    invalid_keys
        .iter()
        .map(|k| {
            format!(
                "'{}' ({} at line {}, column {})",
                k.key, k.context, k.location.line, k.location.column
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}
