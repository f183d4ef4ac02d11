//! Framework lifecycle.
//!
//! Contributors register definitions, chains, insertions and listeners
//! through a [`Loader`] during the load phase. [`Framework::finalize`] then
//! applies every queued chain insertion, after which the registries are
//! read-only until [`Framework::unload`].

use crate::chain::{ChainRegistry, FinalizeReport, InsertAt, Visibility};
use crate::config::KiConfig;
use crate::definition::{Definition, Trait, Transformation};
use crate::entity::Entity;
use crate::error::KiError;
use crate::events::EventPipeline;
use crate::id::{validate_segment, QualifiedId, StatusHandle};
use crate::registry::DefinitionRegistry;
use std::sync::Arc;
use tracing::{debug, info};

/// A content pack that plugs transformations into the framework.
pub trait Contributor {
    /// Namespace prefixed to every ID this contributor registers.
    fn name(&self) -> &str;

    fn load(&self, loader: &mut Loader<'_>) -> Result<(), KiError>;
}

/// Shared, process-wide framework state.
///
/// # Examples
///
/// ```rust
/// use kiform::chain::{always_visible, InsertAt};
/// use kiform::{Contributor, Entity, Framework, KiConfig, KiError, Loader, StatusHandle, Transformation};
///
/// struct SuperSaiyan;
/// impl Transformation for SuperSaiyan {
///     fn update(&self, _entity: &mut Entity, _fw: &Framework) {}
/// }
///
/// struct Saiyans;
/// impl Contributor for Saiyans {
///     fn name(&self) -> &str {
///         "saiyan"
///     }
///
///     fn load(&self, loader: &mut Loader<'_>) -> Result<(), KiError> {
///         let ssj = loader.register_transformation("SSJ", StatusHandle(1), SuperSaiyan)?;
///         let chain = loader.create_chain("Forms", always_visible())?;
///         loader.enqueue_insertion(chain, ssj, always_visible(), InsertAt::End);
///         Ok(())
///     }
/// }
///
/// let fw = Framework::load(KiConfig::default(), &[&Saiyans]).unwrap();
/// let chain = fw.chains().get(&"saiyan/Forms".into()).unwrap();
/// assert_eq!(chain.transformation_ids()[0].as_str(), "saiyan/SSJ");
/// ```
#[derive(Debug)]
pub struct Framework {
    config: KiConfig,
    definitions: DefinitionRegistry,
    chains: ChainRegistry,
    events: EventPipeline,
    finalized: bool,
}

impl Framework {
    /// Empty framework in its load phase.
    pub fn new(config: KiConfig) -> Result<Self, KiError> {
        config.validate()?;
        Ok(Self {
            config,
            definitions: DefinitionRegistry::new(),
            chains: ChainRegistry::new(),
            events: EventPipeline::new(),
            finalized: false,
        })
    }

    /// Load every contributor in order, then finalize.
    pub fn load(config: KiConfig, contributors: &[&dyn Contributor]) -> Result<Self, KiError> {
        let mut fw = Self::new(config)?;
        for contributor in contributors {
            let mut loader = fw.loader(contributor.name())?;
            contributor.load(&mut loader)?;
        }
        fw.finalize();
        Ok(fw)
    }

    /// Open a loader scoped to one contributor namespace.
    pub fn loader(&mut self, contributor: &str) -> Result<Loader<'_>, KiError> {
        if self.finalized {
            return Err(KiError::AlreadyFinalized);
        }
        validate_segment(contributor)?;
        Ok(Loader {
            contributor: contributor.to_string(),
            definitions: &mut self.definitions,
            chains: &mut self.chains,
            events: &mut self.events,
        })
    }

    /// Apply queued chain insertions and end the load phase.
    ///
    /// Calling it again applies nothing new.
    pub fn finalize(&mut self) -> FinalizeReport {
        let report = self.chains.finalize(&self.definitions);
        if !self.finalized {
            info!(
                target: "kiform::framework",
                definitions = self.definitions.len(),
                chains = self.chains.len(),
                applied = report.applied,
                dropped = report.dropped,
                "framework finalized"
            );
        }
        self.finalized = true;
        report
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Drop every definition, chain and listener, reopening the load phase.
    pub fn unload(&mut self) {
        self.definitions.clear();
        self.chains.clear();
        self.events.clear();
        self.finalized = false;
        info!(target: "kiform::framework", "framework unloaded");
    }

    pub fn config(&self) -> &KiConfig {
        &self.config
    }

    pub fn definitions(&self) -> &DefinitionRegistry {
        &self.definitions
    }

    pub fn chains(&self) -> &ChainRegistry {
        &self.chains
    }

    pub fn events(&self) -> &EventPipeline {
        &self.events
    }

    /// Listener registration outside a loader.
    pub fn events_mut(&mut self) -> &mut EventPipeline {
        &mut self.events
    }

    /// Whether the chain shows up for the entity.
    pub fn chain_visibility(&self, entity: &Entity, chain: &QualifiedId) -> bool {
        self.chains.chain_visibility(entity, chain, &self.events)
    }

    /// Whether a node shows up for the entity inside its chain.
    pub fn node_visibility(&self, entity: &Entity, chain: &QualifiedId, node: &QualifiedId) -> bool {
        self.chains.node_visibility(entity, chain, node, &self.events)
    }

    pub fn visible_chains(&self, entity: &Entity) -> Vec<QualifiedId> {
        self.chains.visible_chains(entity, &self.events)
    }

    pub fn visible_nodes(&self, entity: &Entity, chain: &QualifiedId) -> Vec<QualifiedId> {
        self.chains.visible_nodes(entity, chain, &self.events)
    }

    /// The transformation's own `can_see` gate.
    pub fn can_see_transformation(&self, entity: &Entity, id: &QualifiedId) -> bool {
        self.definitions
            .transformation(id)
            .is_some_and(|form| form.behavior.can_see(entity))
    }
}

/// Registration handle for one contributor.
pub struct Loader<'a> {
    contributor: String,
    definitions: &'a mut DefinitionRegistry,
    chains: &'a mut ChainRegistry,
    events: &'a mut EventPipeline,
}

impl Loader<'_> {
    pub fn contributor(&self) -> &str {
        &self.contributor
    }

    /// Register a transformation as `"{contributor}/{name}"`.
    pub fn register_transformation(
        &mut self,
        name: &str,
        status: StatusHandle,
        behavior: impl Transformation + 'static,
    ) -> Result<QualifiedId, KiError> {
        let id = QualifiedId::qualified(&self.contributor, name)?;
        self.register_definition(Definition::transformation(id.clone(), status, Arc::new(behavior)))?;
        Ok(id)
    }

    /// Register a trait as `"{contributor}/{name}"`.
    pub fn register_trait(
        &mut self,
        name: &str,
        status: StatusHandle,
        behavior: impl Trait + 'static,
    ) -> Result<QualifiedId, KiError> {
        let id = QualifiedId::qualified(&self.contributor, name)?;
        self.register_definition(Definition::trait_definition(id.clone(), status, Arc::new(behavior)))?;
        Ok(id)
    }

    /// Register a prebuilt definition under its own ID.
    pub fn register_definition(&mut self, definition: Definition) -> Result<(), KiError> {
        let def = self.definitions.register(definition)?;
        debug!(
            target: "kiform::framework",
            contributor = %self.contributor,
            id = %def.id,
            status = %def.status,
            "definition registered"
        );
        Ok(())
    }

    /// Create `"{contributor}/{name}"`.
    pub fn create_chain(&mut self, name: &str, visibility: Visibility) -> Result<QualifiedId, KiError> {
        self.chains.create_chain(&self.contributor, name, visibility)
    }

    /// Queue a node for any contributor's chain.
    pub fn enqueue_insertion(
        &mut self,
        chain: impl Into<QualifiedId>,
        transformation: impl Into<QualifiedId>,
        visibility: Visibility,
        at: InsertAt,
    ) {
        self.chains
            .enqueue_insertion(chain.into(), transformation.into(), visibility, at);
    }

    pub fn events_mut(&mut self) -> &mut EventPipeline {
        self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::always_visible;

    struct Plain;

    impl Transformation for Plain {
        fn update(&self, _entity: &mut Entity, _fw: &Framework) {}
    }

    struct Broken;

    impl Contributor for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn load(&self, loader: &mut Loader<'_>) -> Result<(), KiError> {
            loader.register_transformation("A", StatusHandle(1), Plain)?;
            loader.register_transformation("A", StatusHandle(2), Plain)?;
            Ok(())
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = KiConfig {
            tick_rate: 0,
            ..KiConfig::default()
        };
        assert!(matches!(Framework::new(config), Err(KiError::InvalidConfig(_))));
    }

    #[test]
    fn test_contributor_name_validated() {
        let mut fw = Framework::new(KiConfig::default()).unwrap();
        assert!(matches!(fw.loader("a/b"), Err(KiError::InvalidIdentifier(_))));
        assert!(matches!(fw.loader(""), Err(KiError::InvalidIdentifier(_))));
    }

    #[test]
    fn test_load_propagates_contributor_error() {
        let result = Framework::load(KiConfig::default(), &[&Broken]);
        assert!(matches!(result, Err(KiError::DuplicateKey { .. })));
    }

    #[test]
    fn test_loader_closed_after_finalize() {
        let mut fw = Framework::new(KiConfig::default()).unwrap();
        fw.finalize();
        assert!(fw.is_finalized());
        assert!(matches!(fw.loader("mod"), Err(KiError::AlreadyFinalized)));

        fw.unload();
        assert!(fw.loader("mod").is_ok());
    }

    #[test]
    fn test_unload_clears_everything() {
        let mut fw = Framework::new(KiConfig::default()).unwrap();
        {
            let mut loader = fw.loader("mod").unwrap();
            loader.register_transformation("A", StatusHandle(1), Plain).unwrap();
            loader.create_chain("Forms", always_visible()).unwrap();
            loader.events_mut().ki_change.subscribe(|_| {});
        }
        fw.finalize();
        fw.unload();

        assert!(fw.definitions().is_empty());
        assert!(fw.chains().is_empty());
        assert!(fw.events().ki_change.is_empty());
        assert!(!fw.is_finalized());
    }

    #[test]
    fn test_cross_contributor_insertion() {
        let mut fw = Framework::new(KiConfig::default()).unwrap();
        {
            let mut loader = fw.loader("base").unwrap();
            loader.create_chain("Forms", always_visible()).unwrap();
        }
        {
            let mut loader = fw.loader("addon").unwrap();
            let id = loader.register_transformation("Beast", StatusHandle(9), Plain).unwrap();
            loader.enqueue_insertion("base/Forms", id, always_visible(), InsertAt::End);
        }
        let report = fw.finalize();
        assert_eq!(report.applied, 1);
        assert_eq!(report.dropped, 0);
        let chain = fw.chains().get(&"base/Forms".into()).unwrap();
        assert_eq!(chain.transformation_ids()[0].as_str(), "addon/Beast");
    }
}
