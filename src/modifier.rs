//! Stat modifier module.
//!
//! A `StatModifier` pairs a multiplier with a flat bonus. The convention is
//! **multiplicative first**: `apply(base) = base * multiplicative + additive`.
//! Every capacity, rate, usage and mastery computation in this crate uses
//! that order.

use serde::{Deserialize, Serialize};

/// An (additive, multiplicative) pair applied to a base value.
///
/// Modifiers are `Copy` values. Adjusting one produces a new modifier that
/// replaces the old one wholesale.
///
/// # Examples
///
/// ```rust
/// use kiform::StatModifier;
///
/// let regen = StatModifier::percent(1.0);
/// assert_eq!(regen.apply(200.0), 2.0);
///
/// let boosted = regen.scaled(2.0).plus(0.5);
/// assert_eq!(boosted.apply(200.0), 4.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatModifier {
    /// Flat amount added after scaling.
    pub additive: f64,
    /// Factor the base is scaled by.
    pub multiplicative: f64,
}

impl StatModifier {
    /// Leaves the base unchanged.
    pub const IDENTITY: StatModifier = StatModifier {
        additive: 0.0,
        multiplicative: 1.0,
    };

    pub fn new(additive: f64, multiplicative: f64) -> Self {
        Self {
            additive,
            multiplicative,
        }
    }

    /// A pure multiplier of `percent / 100`.
    pub fn percent(percent: f64) -> Self {
        Self::new(0.0, percent / 100.0)
    }

    /// Apply to a base value: `base * multiplicative + additive`.
    pub fn apply(&self, base: f64) -> f64 {
        base * self.multiplicative + self.additive
    }

    /// Same modifier with `amount` added to the flat bonus.
    pub fn plus(self, amount: f64) -> Self {
        Self::new(self.additive + amount, self.multiplicative)
    }

    /// Same modifier with the multiplier scaled by `factor`.
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.additive, self.multiplicative * factor)
    }
}

impl Default for StatModifier {
    fn default() -> Self {
        Self::IDENTITY
    }
}
