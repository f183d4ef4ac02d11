//! Server-side configuration consumed by the resource pool and the
//! transformation state machine.

use crate::error::KiError;
use serde::{Deserialize, Serialize};

/// Tunable values supplied by the host.
///
/// Missing fields fall back to their defaults when deserialized.
///
/// # Examples
///
/// ```rust
/// use kiform::KiConfig;
///
/// let config = KiConfig::from_json(r#"{ "starting_ki": 250 }"#).unwrap();
/// assert_eq!(config.starting_ki, 250);
/// assert_eq!(config.base_charge_rate, 10.0);
/// assert_eq!(config.tick_rate, 60);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KiConfig {
    /// Base Ki capacity before mastery and contributor modifiers.
    pub starting_ki: i32,
    /// Active charge rate, percent of capacity per second.
    pub base_charge_rate: f64,
    /// Passive regeneration, percent of capacity per second.
    pub base_regen_rate: f64,
    /// Skip entry timers for every transformation.
    pub force_instant_transformations: bool,
    /// Simulation ticks per second.
    pub tick_rate: u32,
}

impl KiConfig {
    pub const DEFAULT_STARTING_KI: i32 = 100;
    pub const DEFAULT_CHARGE_RATE: f64 = 10.0;
    pub const DEFAULT_REGEN_RATE: f64 = 1.0;
    pub const DEFAULT_TICK_RATE: u32 = 60;

    pub fn new() -> Self {
        Self {
            starting_ki: Self::DEFAULT_STARTING_KI,
            base_charge_rate: Self::DEFAULT_CHARGE_RATE,
            base_regen_rate: Self::DEFAULT_REGEN_RATE,
            force_instant_transformations: false,
            tick_rate: Self::DEFAULT_TICK_RATE,
        }
    }

    /// Parse and validate a JSON document.
    pub fn from_json(text: &str) -> Result<Self, KiError> {
        let config: KiConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values outside the ranges the host UI allows.
    pub fn validate(&self) -> Result<(), KiError> {
        if self.starting_ki < 0 {
            return Err(KiError::InvalidConfig(format!(
                "starting_ki must be non-negative, got {}",
                self.starting_ki
            )));
        }
        for (name, value) in [
            ("base_charge_rate", self.base_charge_rate),
            ("base_regen_rate", self.base_regen_rate),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(KiError::InvalidConfig(format!(
                    "{name} must be within 0..=100, got {value}"
                )));
            }
        }
        if self.tick_rate == 0 {
            return Err(KiError::InvalidConfig(String::from(
                "tick_rate must be at least 1",
            )));
        }
        Ok(())
    }

    /// Convert a per-second amount into a per-tick amount.
    pub fn per_tick(&self, per_second: f64) -> f64 {
        per_second / f64::from(self.tick_rate)
    }
}

impl Default for KiConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KiConfig::default();
        assert_eq!(config.starting_ki, 100);
        assert_eq!(config.base_regen_rate, 1.0);
        assert!(!config.force_instant_transformations);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_per_tick() {
        let config = KiConfig::new();
        assert_eq!(config.per_tick(60.0), 1.0);
    }

    #[test]
    fn test_rejects_out_of_range_rate() {
        let result = KiConfig::from_json(r#"{ "base_regen_rate": 150.0 }"#);
        assert!(matches!(result, Err(KiError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_zero_tick_rate() {
        let config = KiConfig {
            tick_rate: 0,
            ..KiConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            KiConfig::from_json("{ starting_ki: }"),
            Err(KiError::Config(_))
        ));
    }
}
