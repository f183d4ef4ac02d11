//! Transformation state machine.
//!
//! Each entity has one exclusive slot for non-stackable transformations, an
//! ordered set of active stackable transformations and one pending entry
//! timer per slot:
//!
//! ```text
//! Idle ──begin──▶ Transforming(target, elapsed) ──timer──▶ Active(target)
//!   ▲      └──────── zero duration / forced instant ─────────▲   │
//!   └──── host removed status / Ki shortfall / superseded ───────┘
//! ```
//!
//! While a timer runs the previous exclusive transformation stays active; it
//! is ended right before the new non-stackable one activates. Stackable
//! transformations are never cleared by exclusivity, and their timer never
//! touches the exclusive one.

use crate::definition::TransformationRef;
use crate::entity::Entity;
use crate::events::CanTransform;
use crate::framework::Framework;
use crate::id::{QualifiedId, StatusHandle};
use tracing::debug;

/// Ticks a host status survives without a refresh.
pub const KEEP_ALIVE_TICKS: u32 = 10;

/// An entry timer in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransformation {
    pub target: QualifiedId,
    pub elapsed_ticks: u32,
    pub required_ticks: u32,
}

/// Coarse view of the exclusive slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformationPhase {
    Idle,
    Transforming,
    Active,
}

/// Result of a transformation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformOutcome {
    /// The entry timer started.
    Started,
    /// The transformation became active immediately.
    Activated,
    /// The transformation is already active.
    AlreadyActive,
    /// The definition or a listener refused.
    Vetoed,
    /// No such transformation is registered.
    Unknown,
}

/// Active and pending transformations of one entity.
#[derive(Debug, Clone, Default)]
pub struct TransformationState {
    exclusive: Option<QualifiedId>,
    stackables: Vec<QualifiedId>,
    pending: Option<PendingTransformation>,
    pending_stackable: Option<PendingTransformation>,
}

impl TransformationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The active non-stackable transformation.
    pub fn current(&self) -> Option<&QualifiedId> {
        self.exclusive.as_ref()
    }

    /// Active stackable transformations in activation order.
    pub fn stackables(&self) -> &[QualifiedId] {
        &self.stackables
    }

    /// Entry timer of a non-stackable transformation.
    pub fn pending(&self) -> Option<&PendingTransformation> {
        self.pending.as_ref()
    }

    /// Entry timer of a stackable transformation.
    pub fn pending_stackable(&self) -> Option<&PendingTransformation> {
        self.pending_stackable.as_ref()
    }

    pub fn phase(&self) -> TransformationPhase {
        if self.pending.is_some() {
            TransformationPhase::Transforming
        } else if self.exclusive.is_some() {
            TransformationPhase::Active
        } else {
            TransformationPhase::Idle
        }
    }

    pub fn is_active(&self, id: &QualifiedId) -> bool {
        self.exclusive.as_ref() == Some(id) || self.stackables.contains(id)
    }

    pub fn is_transformed(&self, ignore_stackables: bool) -> bool {
        self.exclusive.is_some() || (!ignore_stackables && !self.stackables.is_empty())
    }

    /// Exclusive first, then stackables.
    pub fn active_ids(&self) -> Vec<QualifiedId> {
        self.exclusive
            .iter()
            .chain(self.stackables.iter())
            .cloned()
            .collect()
    }

    fn pending_slot(&mut self, stackable: bool) -> &mut Option<PendingTransformation> {
        if stackable {
            &mut self.pending_stackable
        } else {
            &mut self.pending
        }
    }

    fn remove(&mut self, id: &QualifiedId) -> bool {
        if self.exclusive.as_ref() == Some(id) {
            self.exclusive = None;
            return true;
        }
        let before = self.stackables.len();
        self.stackables.retain(|active| active != id);
        self.stackables.len() != before
    }
}

impl Entity {
    /// Request a transformation.
    ///
    /// The definition's `can_transform` and the `can_transform` veto query
    /// must both allow it. A zero entry time, or the forced-instant config
    /// flag, activates it right away; otherwise the entry timer starts. Either
    /// way an earlier pending request of the same kind (stackable or not) is
    /// dropped.
    pub fn begin_transformation(&mut self, fw: &Framework, id: &QualifiedId) -> TransformOutcome {
        let Some(form) = fw.definitions().transformation(id) else {
            return TransformOutcome::Unknown;
        };
        if self.transformations.is_active(id) {
            return TransformOutcome::AlreadyActive;
        }

        let query = CanTransform {
            transformation: id.clone(),
        };
        if !(form.behavior.can_transform(self) && fw.events().can_transform.query(self, &query)) {
            debug!(
                target: "kiform::state",
                entity = self.handle().0,
                transformation = %id,
                "transformation refused"
            );
            return TransformOutcome::Vetoed;
        }

        let config = fw.config();
        let required_ticks = if config.force_instant_transformations {
            0
        } else {
            (form.info.transformation_time.max(0.0) * f64::from(config.tick_rate)).ceil() as u32
        };

        let stackable = form.info.stackable;
        if required_ticks == 0 {
            *self.transformations.pending_slot(stackable) = None;
            self.activate(fw, form);
            return TransformOutcome::Activated;
        }

        debug!(
            target: "kiform::state",
            entity = self.handle().0,
            transformation = %id,
            ticks = required_ticks,
            "transformation started"
        );
        *self.transformations.pending_slot(stackable) = Some(PendingTransformation {
            target: id.clone(),
            elapsed_ticks: 0,
            required_ticks,
        });
        TransformOutcome::Started
    }

    /// Begin the transformation currently selected in the menu.
    pub fn transform_selected(&mut self, fw: &Framework) -> TransformOutcome {
        match self.selected_transformation.clone() {
            Some(id) => self.begin_transformation(fw, &id),
            None => TransformOutcome::Unknown,
        }
    }

    /// End an active transformation, firing its end hook once.
    ///
    /// Returns `false` if it was not active.
    pub fn end_transformation(&mut self, fw: &Framework, id: &QualifiedId) -> bool {
        if !self.transformations.remove(id) {
            return false;
        }

        debug!(
            target: "kiform::state",
            entity = self.handle().0,
            transformation = %id,
            "transformation ended"
        );
        if let Some(form) = fw.definitions().transformation(id) {
            self.host_mut().remove_status(form.status);
            form.behavior.on_end_transformation(self, fw);
        }
        true
    }

    /// End the exclusive transformation, and stackables unless ignored.
    pub fn clear_transformations(&mut self, fw: &Framework, ignore_stackables: bool) {
        if let Some(current) = self.transformations.exclusive.clone() {
            self.end_transformation(fw, &current);
        }
        if !ignore_stackables {
            for id in self.transformations.stackables.clone() {
                self.end_transformation(fw, &id);
            }
        }
    }

    /// Cancel pending entries and drop the exclusive transformation.
    pub fn power_down(&mut self, fw: &Framework) {
        self.transformations.pending = None;
        self.transformations.pending_stackable = None;
        self.clear_transformations(fw, true);
    }

    pub fn transformations(&self) -> &TransformationState {
        &self.transformations
    }

    pub fn is_transformed(&self, ignore_stackables: bool) -> bool {
        self.transformations.is_transformed(ignore_stackables)
    }

    pub fn current_transformation(&self) -> Option<&QualifiedId> {
        self.transformations.current()
    }

    pub fn stackable_transformations(&self) -> &[QualifiedId] {
        self.transformations.stackables()
    }

    pub fn pending_transformation(&self) -> Option<&PendingTransformation> {
        self.transformations.pending()
    }

    pub fn pending_stackable_transformation(&self) -> Option<&PendingTransformation> {
        self.transformations.pending_stackable()
    }

    /// Per-tick work: host reconciliation, the entry timers, then upkeep of
    /// every active transformation.
    ///
    /// A transformation whose per-tick drain exceeds the current Ki ends this
    /// tick without any debit.
    pub fn tick_transformations(&mut self, fw: &Framework) {
        self.reconcile_with_host(fw);
        self.tick_pending(fw, false);
        self.tick_pending(fw, true);

        for id in self.transformations.active_ids() {
            if !self.transformations.is_active(&id) {
                continue;
            }
            let Some(form) = fw.definitions().transformation(&id) else {
                self.transformations.remove(&id);
                continue;
            };

            if form.info.ki_drain > 0.0 {
                let per_tick = fw.config().per_tick(form.info.ki_drain);
                if self.ki.current() < per_tick {
                    debug!(
                        target: "kiform::state",
                        entity = self.handle().0,
                        transformation = %id,
                        ki = self.ki.current(),
                        "insufficient ki, forcing transformation off"
                    );
                    self.end_transformation(fw, &id);
                    continue;
                }
                self.ki.drain(per_tick);
            }

            self.host_mut().apply_status(form.status, KEEP_ALIVE_TICKS);
            form.behavior.update(self, fw);
        }
    }

    fn tick_pending(&mut self, fw: &Framework, stackable: bool) {
        let Some(pending) = self.transformations.pending_slot(stackable).as_mut() else {
            return;
        };
        pending.elapsed_ticks += 1;
        let target = pending.target.clone();

        let Some(form) = fw.definitions().transformation(&target) else {
            *self.transformations.pending_slot(stackable) = None;
            return;
        };
        form.behavior.on_transform(self, fw);

        // The hook may have cancelled or replaced the request.
        let slot = self.transformations.pending_slot(stackable);
        let complete = slot
            .as_ref()
            .is_some_and(|p| p.target == target && p.elapsed_ticks >= p.required_ticks);
        if complete {
            *slot = None;
            self.activate(fw, form);
        }
    }

    fn activate(&mut self, fw: &Framework, form: TransformationRef) {
        if self.transformations.is_active(&form.id) {
            self.host_mut().apply_status(form.status, KEEP_ALIVE_TICKS);
            return;
        }

        if form.info.stackable {
            self.transformations.stackables.push(form.id.clone());
        } else {
            if let Some(previous) = self.transformations.exclusive.clone() {
                self.end_transformation(fw, &previous);
            }
            self.transformations.exclusive = Some(form.id.clone());
        }

        debug!(
            target: "kiform::state",
            entity = self.handle().0,
            transformation = %form.id,
            stackable = form.info.stackable,
            "transformation active"
        );
        self.host_mut().apply_status(form.status, KEEP_ALIVE_TICKS);
        form.behavior.on_post_transform(self, fw);
    }

    /// Match tracked state against the statuses the host actually carries.
    ///
    /// Tracked transformations whose status disappeared are ended. Statuses
    /// the host applied on its own are adopted: stackables all, and the first
    /// non-stackable in registration order, with any further non-stackable
    /// statuses removed from the host.
    fn reconcile_with_host(&mut self, fw: &Framework) {
        let definitions = fw.definitions();

        for id in self.transformations.active_ids() {
            let status = definitions.lookup_by_id(&id).map(|def| def.status);
            match status {
                Some(status) if self.host().has_status(status) => {}
                Some(_) => {
                    self.end_transformation(fw, &id);
                }
                None => {
                    self.transformations.remove(&id);
                }
            }
        }

        let tracked: Vec<StatusHandle> = self
            .transformations
            .active_ids()
            .iter()
            .filter_map(|id| definitions.lookup_by_id(id).map(|def| def.status))
            .collect();

        let foreign: Vec<StatusHandle> = definitions
            .list_non_stackable(&tracked)
            .into_iter()
            .filter(|&status| self.host().has_status(status))
            .collect();
        if let Some((&adopted, rest)) = foreign.split_first() {
            for &status in rest {
                self.host_mut().remove_status(status);
            }
            self.adopt(fw, adopted);
        }

        for status in definitions.list_stackable(&tracked) {
            if self.host().has_status(status) {
                self.adopt(fw, status);
            }
        }
    }

    fn adopt(&mut self, fw: &Framework, status: StatusHandle) {
        let Some(id) = fw.definitions().lookup_by_numeric_handle(status) else {
            return;
        };
        if let Some(form) = fw.definitions().transformation(id) {
            debug!(
                target: "kiform::state",
                entity = self.handle().0,
                transformation = %form.id,
                "adopting host status"
            );
            self.activate(fw, form);
        }
    }
}
