//! Per-entity runtime state.
//!
//! An [`Entity`] bundles the Ki pool, transformation state, trait slot and
//! menu selections of one character together with the host accessor used to
//! reach the game. Everything here is driven once per tick by
//! [`Entity::tick`].

use crate::config::KiConfig;
use crate::definition::Color;
use crate::error::KiError;
use crate::framework::Framework;
use crate::host::{EntityHost, FieldStore};
use crate::id::{EntityHandle, QualifiedId};
use crate::pool::KiPool;
use crate::state::TransformationState;
use tracing::warn;

/// Keys of persisted entity fields.
pub mod fields {
    pub const MASTERY_LEVEL: &str = "mastery_level";
    pub const MASTERY: &str = "mastery";
    pub const TRAIT: &str = "trait";
    pub const CHAIN: &str = "chain";
    pub const TRANSFORMATION: &str = "transformation";
}

/// Runtime state of one character.
///
/// # Examples
///
/// ```rust
/// use kiform::{Entity, EntityHandle, Framework, KiConfig, MemoryHost};
///
/// let fw = Framework::load(KiConfig::default(), &[]).unwrap();
/// let mut entity = Entity::new(EntityHandle(7), fw.config(), MemoryHost::new());
///
/// entity.enter_world(&fw);
/// assert_eq!(entity.ki.current(), 102.0);
///
/// entity.ki.add(-50.0, fw.events());
/// entity.tick(&fw);
/// assert!(entity.ki.current() > 52.0);
/// ```
pub struct Entity {
    handle: EntityHandle,
    pub ki: KiPool,
    pub(crate) transformations: TransformationState,
    pub(crate) trait_id: Option<QualifiedId>,
    /// Chain highlighted in the transformation menu.
    pub selected_chain: Option<QualifiedId>,
    /// Transformation bound to the transform input.
    pub selected_transformation: Option<QualifiedId>,
    host: Box<dyn EntityHost>,
}

impl Entity {
    pub fn new(handle: EntityHandle, config: &KiConfig, host: impl EntityHost + 'static) -> Self {
        Self {
            handle,
            ki: KiPool::new(handle, config),
            transformations: TransformationState::new(),
            trait_id: None,
            selected_chain: None,
            selected_transformation: None,
            host: Box::new(host),
        }
    }

    pub fn handle(&self) -> EntityHandle {
        self.handle
    }

    pub fn host(&self) -> &dyn EntityHost {
        self.host.as_ref()
    }

    pub fn host_mut(&mut self) -> &mut dyn EntityHost {
        self.host.as_mut()
    }

    /// Run one tick.
    ///
    /// Order: modifier reset (which clamps Ki), transformations, trait, then
    /// regeneration with the modifiers contributors produced this tick.
    pub fn tick(&mut self, fw: &Framework) {
        self.ki.reset_modifiers(fw.config());
        self.tick_transformations(fw);
        self.tick_trait(fw);

        let charging = self.host.is_charging();
        self.ki.regen_tick(charging, fw.config());
    }

    /// Entering the world fills the pool to capacity.
    pub fn enter_world(&mut self, fw: &Framework) {
        self.ki.reset_modifiers(fw.config());
        self.ki.refill();
    }

    /// Ki tint: the exclusive transformation's color, else the latest
    /// stackable with one, else the trait's first color.
    pub fn ki_color(&self, fw: &Framework) -> Option<Color> {
        let definitions = fw.definitions();
        let from_forms = self
            .transformations
            .current()
            .into_iter()
            .chain(self.transformations.stackables().iter().rev())
            .filter_map(|id| definitions.transformation(id))
            .find_map(|form| form.info.ki_color);

        from_forms.or_else(|| {
            self.trait_id
                .as_ref()
                .and_then(|id| definitions.trait_definition(id))
                .and_then(|def| def.info.ki_colors.first().copied())
        })
    }

    /// Write persisted fields.
    ///
    /// Every key is written; empty selections are stored as `null`.
    pub fn save(&self, store: &mut FieldStore) {
        store.set(fields::MASTERY_LEVEL, self.ki.mastery_level());
        store.set(fields::MASTERY, self.ki.mastery());
        store.set(fields::TRAIT, &self.trait_id);
        store.set(fields::CHAIN, &self.selected_chain);
        store.set(fields::TRANSFORMATION, &self.selected_transformation);
    }

    /// Restore persisted fields.
    ///
    /// Missing mastery fields fall back to their defaults and missing
    /// selections keep their current value. A `null` selection clears it.
    /// IDs no longer registered are skipped with a warning.
    pub fn load(&mut self, fw: &Framework, store: &FieldStore) -> Result<(), KiError> {
        let level = store.get(fields::MASTERY_LEVEL).unwrap_or(1);
        let mastery = store.get(fields::MASTERY).unwrap_or(0.0);
        self.ki.restore_mastery(level, mastery);

        match store.get::<Option<QualifiedId>>(fields::TRAIT) {
            Some(Some(id)) if fw.definitions().trait_definition(&id).is_none() => {
                warn!(target: "kiform::entity", entity = self.handle.0, id = %id, "unknown trait in saved data");
            }
            Some(id) => self.set_trait(fw, id)?,
            None => {}
        }

        match store.get::<Option<QualifiedId>>(fields::CHAIN) {
            Some(Some(id)) if fw.chains().get(&id).is_none() => {
                warn!(target: "kiform::entity", entity = self.handle.0, id = %id, "unknown chain in saved data");
            }
            Some(id) => self.selected_chain = id,
            None => {}
        }

        match store.get::<Option<QualifiedId>>(fields::TRANSFORMATION) {
            Some(Some(id)) if fw.definitions().transformation(&id).is_none() => {
                warn!(
                    target: "kiform::entity",
                    entity = self.handle.0,
                    id = %id,
                    "unknown transformation in saved data"
                );
            }
            Some(id) => self.selected_transformation = id,
            None => {}
        }

        Ok(())
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("handle", &self.handle)
            .field("ki", &self.ki)
            .field("transformations", &self.transformations)
            .field("trait_id", &self.trait_id)
            .field("selected_chain", &self.selected_chain)
            .field("selected_transformation", &self.selected_transformation)
            .finish_non_exhaustive()
    }
}
