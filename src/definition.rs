//! Transformation and trait definitions.
//!
//! A definition couples static metadata (name, entry time, drain, ...) with a
//! behaviour object implementing one of the capability traits below. The
//! behaviour fills in its metadata through `configure` right before it is
//! registered; after that both are immutable.

use crate::entity::Entity;
use crate::framework::Framework;
use crate::id::{QualifiedId, StatusHandle};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An RGB color used for popup text and Ki tinting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Metadata of a transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationInfo {
    pub display_name: String,
    pub description: String,
    /// Seconds needed to enter the transformation.
    pub transformation_time: f64,
    pub text_color: Color,
    /// Tint applied to the Ki pool while active.
    pub ki_color: Option<Color>,
    /// Stackable transformations ignore exclusivity.
    pub stackable: bool,
    /// Ki consumed per second while active. Zero disables upkeep.
    pub ki_drain: f64,
}

impl TransformationInfo {
    pub const DEFAULT_TRANSFORMATION_TIME: f64 = 3.0;

    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            description: String::new(),
            transformation_time: Self::DEFAULT_TRANSFORMATION_TIME,
            text_color: Color::WHITE,
            ki_color: None,
            stackable: false,
            ki_drain: 0.0,
        }
    }
}

/// Metadata of a trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitInfo {
    pub display_name: String,
    pub description: String,
    /// Ki color options; empty leaves the Ki color alone.
    pub ki_colors: Vec<Color>,
    /// Silent traits grant no visible status.
    pub silent: bool,
}

impl TraitInfo {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            description: String::new(),
            ki_colors: Vec::new(),
            silent: false,
        }
    }
}

/// Behaviour of a transformation.
///
/// Only [`Transformation::update`] is required; every other capability has a
/// permissive or empty default. Mutating hooks receive the framework so they
/// can spend Ki through [`crate::KiPool::add`] with `fw.events()` or end
/// transformations.
pub trait Transformation: Send + Sync {
    /// Adjust metadata before registration.
    fn configure(&self, _info: &mut TransformationInfo) {}

    /// Unlock conditions, cooldowns and similar gates.
    fn can_transform(&self, _entity: &Entity) -> bool {
        true
    }

    /// Whether the transformation shows up in menus.
    fn can_see(&self, _entity: &Entity) -> bool {
        true
    }

    /// Called every tick while the entry timer runs.
    fn on_transform(&self, _entity: &mut Entity, _fw: &Framework) {}

    /// Called once the transformation becomes active.
    fn on_post_transform(&self, _entity: &mut Entity, _fw: &Framework) {}

    /// Called exactly once when an active transformation ends.
    fn on_end_transformation(&self, _entity: &mut Entity, _fw: &Framework) {}

    /// Called every tick the transformation stays active, after upkeep.
    fn update(&self, entity: &mut Entity, fw: &Framework);
}

/// Behaviour of a trait.
pub trait Trait: Send + Sync {
    fn configure(&self, _info: &mut TraitInfo) {}

    /// Called every tick while the trait is assigned.
    fn update(&self, entity: &mut Entity, fw: &Framework);
}

/// What a registered definition is.
#[derive(Clone)]
pub enum DefinitionKind {
    Transformation {
        info: TransformationInfo,
        behavior: Arc<dyn Transformation>,
    },
    Trait {
        info: TraitInfo,
        behavior: Arc<dyn Trait>,
    },
}

/// A registered definition.
#[derive(Clone)]
pub struct Definition {
    pub id: QualifiedId,
    pub status: StatusHandle,
    pub kind: DefinitionKind,
}

impl Definition {
    /// Build a transformation definition, running its `configure` hook.
    ///
    /// The display name defaults to the local part of the ID.
    pub fn transformation(
        id: QualifiedId,
        status: StatusHandle,
        behavior: Arc<dyn Transformation>,
    ) -> Self {
        let mut info = TransformationInfo::new(id.name());
        behavior.configure(&mut info);
        Self {
            id,
            status,
            kind: DefinitionKind::Transformation { info, behavior },
        }
    }

    /// Build a trait definition, running its `configure` hook.
    pub fn trait_definition(id: QualifiedId, status: StatusHandle, behavior: Arc<dyn Trait>) -> Self {
        let mut info = TraitInfo::new(id.name());
        behavior.configure(&mut info);
        Self {
            id,
            status,
            kind: DefinitionKind::Trait { info, behavior },
        }
    }

    pub fn is_transformation(&self) -> bool {
        matches!(self.kind, DefinitionKind::Transformation { .. })
    }

    /// `true` only for stackable transformations.
    pub fn is_stackable(&self) -> bool {
        matches!(
            &self.kind,
            DefinitionKind::Transformation { info, .. } if info.stackable
        )
    }

    pub fn display_name(&self) -> &str {
        match &self.kind {
            DefinitionKind::Transformation { info, .. } => &info.display_name,
            DefinitionKind::Trait { info, .. } => &info.display_name,
        }
    }

    pub fn as_transformation(&self) -> Option<TransformationRef> {
        match &self.kind {
            DefinitionKind::Transformation { info, behavior } => Some(TransformationRef {
                id: self.id.clone(),
                status: self.status,
                info: info.clone(),
                behavior: Arc::clone(behavior),
            }),
            DefinitionKind::Trait { .. } => None,
        }
    }

    pub fn as_trait(&self) -> Option<TraitRef> {
        match &self.kind {
            DefinitionKind::Trait { info, behavior } => Some(TraitRef {
                id: self.id.clone(),
                status: self.status,
                info: info.clone(),
                behavior: Arc::clone(behavior),
            }),
            DefinitionKind::Transformation { .. } => None,
        }
    }
}

impl std::fmt::Debug for Definition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            DefinitionKind::Transformation { .. } => "transformation",
            DefinitionKind::Trait { .. } => "trait",
        };
        f.debug_struct("Definition")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("kind", &kind)
            .finish()
    }
}

/// An owned view of a transformation, detached from the registry borrow so
/// hooks can mutate the entity while it is held.
#[derive(Clone)]
pub struct TransformationRef {
    pub id: QualifiedId,
    pub status: StatusHandle,
    pub info: TransformationInfo,
    pub behavior: Arc<dyn Transformation>,
}

/// An owned view of a trait.
#[derive(Clone)]
pub struct TraitRef {
    pub id: QualifiedId,
    pub status: StatusHandle,
    pub info: TraitInfo,
    pub behavior: Arc<dyn Trait>,
}
