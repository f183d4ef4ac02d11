//! Error types for loading and configuring the framework.
//!
//! Every load-time failure is represented by the `KiError` enum. Runtime
//! outcomes such as a vetoed transformation or a Ki shortfall are not errors
//! and never show up here.

use thiserror::Error;

/// Errors raised while building registries or reading configuration.
///
/// # Examples
///
/// ```rust
/// use kiform::KiError;
///
/// let err = KiError::InvalidIdentifier(String::from("Saiyan/Forms"));
/// assert!(err.to_string().contains("Saiyan/Forms"));
/// ```
#[derive(Debug, Error)]
pub enum KiError {
    /// An ID was registered twice.
    ///
    /// `kind` names the registry ("definition" or "chain").
    #[error("Duplicate {kind} id: {id}")]
    DuplicateKey { kind: &'static str, id: String },

    /// Two definitions claimed the same host status handle.
    #[error("Status handle {handle} is already used by {id}")]
    DuplicateHandle { handle: u32, id: String },

    /// An identifier contains the reserved `/` separator or is empty.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A runtime call named a definition that is not registered.
    #[error("Unknown definition: {0}")]
    UnknownDefinition(String),

    /// A configuration value is out of its allowed range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A contributor tried to load after the chains were finalized.
    #[error("Registries are already finalized")]
    AlreadyFinalized,

    /// Configuration text could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Config(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_key_display() {
        let err = KiError::DuplicateKey {
            kind: "chain",
            id: String::from("mod/SaiyanForms"),
        };
        let display = err.to_string();
        assert!(display.contains("chain"));
        assert!(display.contains("mod/SaiyanForms"));
    }

    #[test]
    fn test_config_error_from_json() {
        let parse = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err: KiError = parse.into();
        assert!(matches!(err, KiError::Config(_)));
    }
}
