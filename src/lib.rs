//! # kiform - Ki Resource and Transformation Framework
//!
//! A game-agnostic runtime for energy-based character transformations:
//! - **Ki pool** with mastery-driven capacity, regeneration and spending
//! - **Transformations** with entry timers, exclusivity, stacking and upkeep
//! - **Chains** that order transformations for menus, extensible by any
//!   contributor through deferred insertions
//! - **Events** for notifications and veto queries
//!
//! ## Core Concepts
//!
//! ### Load phase
//!
//! ```text
//! [Contributor] → [Loader] → register / create_chain / enqueue_insertion
//!                                   │
//!                        [Framework::finalize] → read-only registries
//! ```
//!
//! ### Tick
//!
//! Every tick an [`Entity`] resets its modifiers (clamping Ki to the capacity
//! of the previous tick), reconciles transformations against the statuses the
//! host reports, advances the entry timer, pays upkeep, runs its trait and
//! finally regenerates Ki.
//!
//! ## Example
//!
//! ```rust
//! use kiform::chain::{always_visible, InsertAt};
//! use kiform::*;
//!
//! struct SuperSaiyan;
//! impl Transformation for SuperSaiyan {
//!     fn configure(&self, info: &mut TransformationInfo) {
//!         info.transformation_time = 0.0;
//!         info.ki_drain = 6.0;
//!     }
//!
//!     fn update(&self, entity: &mut Entity, _fw: &Framework) {
//!         entity.ki.max_ki = entity.ki.max_ki.scaled(1.5);
//!     }
//! }
//!
//! let mut fw = Framework::new(KiConfig::default()).unwrap();
//! {
//!     let mut loader = fw.loader("saiyan").unwrap();
//!     let ssj = loader.register_transformation("SSJ", StatusHandle(1), SuperSaiyan).unwrap();
//!     let chain = loader.create_chain("Forms", always_visible()).unwrap();
//!     loader.enqueue_insertion(chain, ssj, always_visible(), InsertAt::End);
//! }
//! fw.finalize();
//!
//! let mut goku = Entity::new(EntityHandle(1), fw.config(), MemoryHost::new());
//! goku.enter_world(&fw);
//!
//! let ssj = QualifiedId::from_str("saiyan/SSJ");
//! assert_eq!(goku.begin_transformation(&fw, &ssj), TransformOutcome::Activated);
//!
//! goku.tick(&fw);
//! assert_eq!(goku.ki.max_capacity(), 153);
//! assert!(goku.ki.current() < 102.0);
//! ```
//!
//! ## Modules
//!
//! - [`id`] - Qualified IDs and host handles
//! - [`modifier`] - Additive/multiplicative stat modifiers
//! - [`config`] - Tunable configuration
//! - [`pool`] - Ki pool and mastery
//! - [`definition`] - Transformation and trait definitions
//! - [`registry`] - Definition registry
//! - [`chain`] - Transformation chains and deferred insertions
//! - [`events`] - Notification channels and veto queries
//! - [`host`] - Host boundary and persisted fields
//! - [`entity`] - Per-entity runtime state
//! - [`state`] - Transformation state machine
//! - [`framework`] - Load, finalize and unload
//! - [`error`] - Error types

pub mod chain;
pub mod config;
pub mod definition;
pub mod entity;
pub mod error;
pub mod events;
pub mod framework;
pub mod host;
pub mod id;
pub mod modifier;
pub mod pool;
pub mod registry;
pub mod state;
mod trait_slot;

// Re-export main types for convenience
pub use chain::{Chain, ChainRegistry, InsertAt};
pub use config::KiConfig;
pub use definition::{Color, Definition, Trait, TraitInfo, Transformation, TransformationInfo};
pub use entity::Entity;
pub use error::KiError;
pub use events::EventPipeline;
pub use framework::{Contributor, Framework, Loader};
pub use host::{EntityHost, FieldStore, MemoryHost};
pub use id::{EntityHandle, QualifiedId, StatusHandle};
pub use modifier::StatModifier;
pub use pool::KiPool;
pub use registry::DefinitionRegistry;
pub use state::{TransformOutcome, TransformationPhase};
