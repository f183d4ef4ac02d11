//! Trait slot of an entity.
//!
//! An entity holds at most one trait. Non-silent traits keep a host status
//! alive for as long as they are assigned; silent ones never touch the host.

use crate::entity::Entity;
use crate::error::KiError;
use crate::framework::Framework;
use crate::id::QualifiedId;
use crate::state::KEEP_ALIVE_TICKS;
use tracing::debug;

impl Entity {
    pub fn current_trait(&self) -> Option<&QualifiedId> {
        self.trait_id.as_ref()
    }

    /// Assign a trait, or clear the slot with `None`.
    ///
    /// The previous trait's status is removed. Fails with
    /// `UnknownDefinition` if `trait_id` is not a registered trait, leaving
    /// the slot unchanged.
    pub fn set_trait(&mut self, fw: &Framework, trait_id: Option<QualifiedId>) -> Result<(), KiError> {
        let next = match &trait_id {
            Some(id) => Some(
                fw.definitions()
                    .trait_definition(id)
                    .ok_or_else(|| KiError::UnknownDefinition(id.to_string()))?,
            ),
            None => None,
        };

        if let Some(previous) = self.trait_id.take() {
            if let Some(def) = fw.definitions().trait_definition(&previous) {
                if !def.info.silent {
                    self.host_mut().remove_status(def.status);
                }
            }
        }

        if let Some(def) = next {
            debug!(target: "kiform::trait", entity = self.handle().0, id = %def.id, "trait assigned");
            if !def.info.silent {
                self.host_mut().apply_status(def.status, KEEP_ALIVE_TICKS);
            }
            self.trait_id = Some(def.id);
        }
        Ok(())
    }

    /// Keep the trait's status alive and run its per-tick behaviour.
    pub fn tick_trait(&mut self, fw: &Framework) {
        let Some(id) = self.trait_id.clone() else {
            return;
        };
        let Some(def) = fw.definitions().trait_definition(&id) else {
            self.trait_id = None;
            return;
        };

        if !def.info.silent {
            self.host_mut().apply_status(def.status, KEEP_ALIVE_TICKS);
        }
        def.behavior.update(self, fw);
    }
}
