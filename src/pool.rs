//! Ki resource pool.
//!
//! Tracks an entity's Ki balance together with the modifiers that shape its
//! capacity, regeneration, charging and spending, and converts spending into
//! mastery. Modifiers are rebuilt from configuration at the start of every
//! tick by [`KiPool::reset_modifiers`]; contributors adjust them afterwards
//! for the rest of the tick.

use crate::config::KiConfig;
use crate::events::{EventPipeline, KiChange, MasteryGain, MasteryLevelUp};
use crate::id::EntityHandle;
use crate::modifier::StatModifier;
use tracing::info;

/// Mastery needed per level.
pub const MASTERY_PER_LEVEL: f64 = 1000.0;

/// Base mastery earned by one spending event, before `mastery_rate`.
pub const MASTERY_GAIN_UNIT: f64 = 0.0001;

/// Capacity gained and usage cost shed per mastery level.
pub const MASTERY_LEVEL_STEP: f64 = 0.02;

/// Per-entity Ki balance, modifiers and mastery.
///
/// # Examples
///
/// ```rust
/// use kiform::{EntityHandle, EventPipeline, KiConfig, KiPool};
///
/// let config = KiConfig::default();
/// let events = EventPipeline::new();
/// let mut pool = KiPool::new(EntityHandle(1), &config);
///
/// // Level 1 mastery grants +2% capacity.
/// assert_eq!(pool.max_capacity(), 102);
///
/// pool.refill();
/// pool.add(-10.0, &events);
/// // Spending is discounted 2% at level 1.
/// assert!((pool.current() - 92.2).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct KiPool {
    owner: EntityHandle,
    current: f64,
    base_capacity: i32,
    mastery: f64,
    mastery_level: u32,
    /// Scales the configured starting Ki into the capacity.
    pub max_ki: StatModifier,
    /// Active charge per second, applied to capacity.
    pub charge_rate: StatModifier,
    /// Passive regeneration per second, applied to capacity.
    pub regen_rate: StatModifier,
    /// Applied to every negative `add`.
    pub usage: StatModifier,
    /// Applied to [`MASTERY_GAIN_UNIT`].
    pub mastery_rate: StatModifier,
}

impl KiPool {
    /// A fresh pool at mastery level 1 with modifiers built from `config`.
    ///
    /// The balance starts empty; see [`KiPool::refill`].
    pub fn new(owner: EntityHandle, config: &KiConfig) -> Self {
        let mut pool = Self {
            owner,
            current: 0.0,
            base_capacity: config.starting_ki,
            mastery: 0.0,
            mastery_level: 1,
            max_ki: StatModifier::IDENTITY,
            charge_rate: StatModifier::IDENTITY,
            regen_rate: StatModifier::IDENTITY,
            usage: StatModifier::IDENTITY,
            mastery_rate: StatModifier::IDENTITY,
        };
        pool.rebuild_modifiers(config);
        pool
    }

    pub fn owner(&self) -> EntityHandle {
        self.owner
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn mastery(&self) -> f64 {
        self.mastery
    }

    pub fn mastery_level(&self) -> u32 {
        self.mastery_level
    }

    /// Capacity truncated toward zero.
    pub fn max_capacity(&self) -> i32 {
        self.max_ki.apply(f64::from(self.base_capacity)) as i32
    }

    /// Fill the pool to capacity (entering the world).
    pub fn refill(&mut self) {
        self.current = f64::from(self.max_capacity());
    }

    /// Overwrite the balance. Clamping happens on the next reset.
    pub fn set_current(&mut self, ki: f64) {
        self.current = ki;
    }

    /// Add or spend Ki.
    ///
    /// Negative amounts pass through `usage` and earn mastery. A Ki-change
    /// notification with the final delta fires for either sign. The balance
    /// is not clamped here; [`KiPool::reset_modifiers`] does that.
    pub fn add(&mut self, amount: f64, events: &EventPipeline) {
        let mut amount = amount;
        if amount < 0.0 {
            amount = self.usage.apply(amount);
            self.gain_mastery(events);
        }

        self.current += amount;

        events.ki_change.publish(&KiChange {
            entity: self.owner,
            amount,
        });
    }

    /// Debit upkeep directly, bypassing usage, mastery and notifications.
    pub(crate) fn drain(&mut self, amount: f64) {
        self.current -= amount;
    }

    /// Earn mastery and convert every full 1000 into levels.
    ///
    /// The level saturates at `u32::MAX`; mastery beyond it is discarded.
    pub fn gain_mastery(&mut self, events: &EventPipeline) {
        let gain = self.mastery_rate.apply(MASTERY_GAIN_UNIT);
        self.mastery += gain;

        events.mastery_gain.publish(&MasteryGain {
            entity: self.owner,
            amount: gain,
        });

        if self.mastery >= MASTERY_PER_LEVEL {
            let levels = (self.mastery / MASTERY_PER_LEVEL).floor();
            let previous = self.mastery_level;
            self.mastery_level = previous.saturating_add(levels as u32);
            self.mastery -= MASTERY_PER_LEVEL * levels;

            let gained = self.mastery_level - previous;
            if gained == 0 {
                return;
            }

            info!(
                target: "kiform::pool",
                entity = self.owner.0,
                level = self.mastery_level,
                "ki mastery level has reached {}",
                self.mastery_level
            );

            events.mastery_level.publish(&MasteryLevelUp {
                entity: self.owner,
                previous_level: previous,
                current_level: self.mastery_level,
                levels_gained: gained,
            });
        }
    }

    /// Passive regeneration plus optional charging for one tick.
    ///
    /// Does nothing while the pool is at or above capacity.
    pub fn regen_tick(&mut self, charging: bool, config: &KiConfig) {
        let capacity = f64::from(self.max_capacity());
        if self.current >= capacity {
            return;
        }

        self.current += config.per_tick(self.regen_rate.apply(capacity));
        if charging {
            self.current += config.per_tick(self.charge_rate.apply(capacity));
        }
    }

    /// Start-of-tick reset.
    ///
    /// Clamps the balance against the capacity contributors produced last
    /// tick, then rebuilds every modifier from `config` and mastery level.
    pub fn reset_modifiers(&mut self, config: &KiConfig) {
        let capacity = f64::from(self.max_capacity());
        self.current = self.current.min(capacity).max(0.0);
        self.rebuild_modifiers(config);
    }

    fn rebuild_modifiers(&mut self, config: &KiConfig) {
        let level_bonus = f64::from(self.mastery_level) * MASTERY_LEVEL_STEP;
        self.base_capacity = config.starting_ki;
        self.charge_rate = StatModifier::percent(config.base_charge_rate);
        self.regen_rate = StatModifier::percent(config.base_regen_rate);
        self.max_ki = StatModifier::new(0.0, 1.0 + level_bonus);
        self.usage = StatModifier::new(0.0, (1.0 - level_bonus).max(0.0));
        self.mastery_rate = StatModifier::IDENTITY;
    }

    /// Restore persisted mastery. Levels below 1 are raised to 1.
    pub fn restore_mastery(&mut self, level: u32, mastery: f64) {
        self.mastery_level = level.max(1);
        self.mastery = mastery.max(0.0);
    }
}
