//! Identifier module.
//!
//! Provides `QualifiedId`, the interned `"{contributor}/{name}"` identifier
//! shared by definitions and chains, plus the lightweight numeric handles the
//! host hands out for entities and status slots.

use crate::error::KiError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

/// Separator between the contributor and the local name of an ID.
pub const SEPARATOR: char = '/';

/// Interned identifier for definitions and chains.
///
/// Uses `Arc<str>` so IDs can be cloned into entity state, pending
/// insertions and event payloads without reallocating.
///
/// # Examples
///
/// ```rust
/// use kiform::QualifiedId;
///
/// let ssj = QualifiedId::qualified("mod", "SSJ").unwrap();
/// assert_eq!(ssj.as_str(), "mod/SSJ");
/// assert_eq!(ssj.contributor(), "mod");
/// assert_eq!(ssj.name(), "SSJ");
///
/// let same: QualifiedId = "mod/SSJ".into();
/// assert_eq!(ssj, same);
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct QualifiedId(Arc<str>);

impl Serialize for QualifiedId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for QualifiedId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(QualifiedId::from(s))
    }
}

impl QualifiedId {
    /// Build `"{contributor}/{name}"`.
    ///
    /// Neither part may be empty or contain [`SEPARATOR`].
    pub fn qualified(contributor: &str, name: &str) -> Result<Self, KiError> {
        validate_segment(contributor)?;
        validate_segment(name)?;
        Ok(Self(Arc::from(format!("{contributor}{SEPARATOR}{name}"))))
    }

    /// Wrap a raw string without validation.
    pub fn from_str(s: &str) -> Self {
        Self(Arc::from(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Part before the first separator (the whole ID if there is none).
    pub fn contributor(&self) -> &str {
        self.0.split_once(SEPARATOR).map_or(&self.0, |(c, _)| c)
    }

    /// Part after the first separator (the whole ID if there is none).
    pub fn name(&self) -> &str {
        self.0.split_once(SEPARATOR).map_or(&self.0, |(_, n)| n)
    }
}

/// Check one segment of a qualified ID.
pub(crate) fn validate_segment(segment: &str) -> Result<(), KiError> {
    if segment.is_empty() || segment.contains(SEPARATOR) {
        return Err(KiError::InvalidIdentifier(segment.to_string()));
    }
    Ok(())
}

impl From<&str> for QualifiedId {
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}

impl From<String> for QualifiedId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl std::fmt::Display for QualifiedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque host handle of a player or actor.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityHandle(pub u32);

impl std::fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Host-assigned numeric handle of a status-effect slot.
///
/// Every registered definition owns exactly one.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StatusHandle(pub u32);

impl std::fmt::Display for StatusHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_id_parts() {
        let id = QualifiedId::qualified("mod", "SSJ2").unwrap();
        assert_eq!(id.as_str(), "mod/SSJ2");
        assert_eq!(id.contributor(), "mod");
        assert_eq!(id.name(), "SSJ2");
    }

    #[test]
    fn test_qualified_id_rejects_separator() {
        assert!(matches!(
            QualifiedId::qualified("mod", "Saiyan/Forms"),
            Err(KiError::InvalidIdentifier(_))
        ));
        assert!(QualifiedId::qualified("", "SSJ").is_err());
    }

    #[test]
    fn test_unqualified_parts() {
        let id = QualifiedId::from_str("Base");
        assert_eq!(id.contributor(), "Base");
        assert_eq!(id.name(), "Base");
    }

    #[test]
    fn test_qualified_id_serde() {
        let id = QualifiedId::from_str("mod/SSJ");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"mod/SSJ\"");
        let back: QualifiedId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
