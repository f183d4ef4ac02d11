//! Chain registry.
//!
//! Chains are named, ordered progressions of transformations. Contributors
//! create chains and queue node insertions while loading; nothing is
//! validated until [`ChainRegistry::finalize`] resolves the queue against the
//! complete definition registry. Insertions naming an unknown chain or
//! transformation at that point are dropped, never retried, so contributor
//! load order decides what is available.
//!
//! Insertion rule: `InsertAt::Index(i)` with `i` below the current node count
//! inserts before the node at `i`, so a later insertion at the same index
//! lands in front of an earlier one. Any other index, and `InsertAt::End`,
//! appends.

use crate::entity::Entity;
use crate::error::KiError;
use crate::events::{CanSeeChain, CanSeeNode, EventPipeline};
use crate::id::{validate_segment, QualifiedId};
use crate::registry::DefinitionRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Visibility predicate of a chain or node.
pub type Visibility = Arc<dyn Fn(&Entity) -> bool + Send + Sync>;

/// Wrap a closure as a [`Visibility`].
pub fn visibility(predicate: impl Fn(&Entity) -> bool + Send + Sync + 'static) -> Visibility {
    Arc::new(predicate)
}

/// A predicate that always shows the chain or node.
pub fn always_visible() -> Visibility {
    visibility(|_| true)
}

/// Where a queued node goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertAt {
    #[default]
    End,
    Index(usize),
}

/// A transformation reference inside a chain.
#[derive(Clone)]
pub struct ChainNode {
    pub transformation: QualifiedId,
    pub visibility: Visibility,
}

impl std::fmt::Debug for ChainNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainNode")
            .field("transformation", &self.transformation)
            .finish()
    }
}

/// A named progression of transformations.
#[derive(Clone)]
pub struct Chain {
    id: QualifiedId,
    visibility: Visibility,
    nodes: Vec<ChainNode>,
}

impl Chain {
    fn new(id: QualifiedId, visibility: Visibility) -> Self {
        Self {
            id,
            visibility,
            nodes: Vec::new(),
        }
    }

    pub fn id(&self) -> &QualifiedId {
        &self.id
    }

    pub fn nodes(&self) -> &[ChainNode] {
        &self.nodes
    }

    pub fn node(&self, transformation: &QualifiedId) -> Option<&ChainNode> {
        self.nodes
            .iter()
            .find(|node| &node.transformation == transformation)
    }

    /// Transformation IDs in chain order.
    pub fn transformation_ids(&self) -> Vec<&QualifiedId> {
        self.nodes.iter().map(|node| &node.transformation).collect()
    }

    fn insert(&mut self, node: ChainNode, at: InsertAt) {
        match at {
            InsertAt::Index(index) if index < self.nodes.len() => self.nodes.insert(index, node),
            _ => self.nodes.push(node),
        }
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("id", &self.id)
            .field("nodes", &self.nodes)
            .finish()
    }
}

/// A node insertion waiting for finalize.
#[derive(Clone)]
pub struct PendingInsertion {
    pub chain: QualifiedId,
    pub transformation: QualifiedId,
    pub visibility: Visibility,
    pub at: InsertAt,
}

/// Outcome of one finalize pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FinalizeReport {
    pub applied: usize,
    pub dropped: usize,
}

/// Registry of chains plus the queue of deferred insertions.
#[derive(Default)]
pub struct ChainRegistry {
    chains: Vec<Chain>,
    index: HashMap<QualifiedId, usize>,
    pending: Vec<PendingInsertion>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the chain `"{contributor}/{name}"`.
    ///
    /// A `name` containing `/` is rejected with `InvalidIdentifier`; an
    /// existing ID with `DuplicateKey`.
    pub fn create_chain(
        &mut self,
        contributor: &str,
        name: &str,
        visibility: Visibility,
    ) -> Result<QualifiedId, KiError> {
        validate_segment(name)?;
        let id = QualifiedId::qualified(contributor, name)?;
        if self.index.contains_key(&id) {
            return Err(KiError::DuplicateKey {
                kind: "chain",
                id: id.to_string(),
            });
        }

        self.index.insert(id.clone(), self.chains.len());
        self.chains.push(Chain::new(id.clone(), visibility));
        Ok(id)
    }

    /// Queue a node insertion. Validity is only checked at finalize.
    pub fn enqueue_insertion(
        &mut self,
        chain: QualifiedId,
        transformation: QualifiedId,
        visibility: Visibility,
        at: InsertAt,
    ) {
        self.pending.push(PendingInsertion {
            chain,
            transformation,
            visibility,
            at,
        });
    }

    /// Resolve every queued insertion in enqueue order and clear the queue.
    ///
    /// Never fails. Running it again on an empty queue changes nothing.
    pub fn finalize(&mut self, definitions: &DefinitionRegistry) -> FinalizeReport {
        let mut report = FinalizeReport::default();

        for insertion in std::mem::take(&mut self.pending) {
            let Some(&slot) = self.index.get(&insertion.chain) else {
                debug!(
                    target: "kiform::chain",
                    chain = %insertion.chain,
                    transformation = %insertion.transformation,
                    "dropping insertion into unknown chain"
                );
                report.dropped += 1;
                continue;
            };
            if !definitions
                .lookup_by_id(&insertion.transformation)
                .is_some_and(|def| def.is_transformation())
            {
                debug!(
                    target: "kiform::chain",
                    chain = %insertion.chain,
                    transformation = %insertion.transformation,
                    "dropping insertion of unknown transformation"
                );
                report.dropped += 1;
                continue;
            }

            let node = ChainNode {
                transformation: insertion.transformation,
                visibility: insertion.visibility,
            };
            self.chains[slot].insert(node, insertion.at);
            report.applied += 1;
        }

        report
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn get(&self, id: &QualifiedId) -> Option<&Chain> {
        self.index.get(id).map(|&slot| &self.chains[slot])
    }

    /// Chains in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Chain> {
        self.chains.iter()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Chain predicate AND no `can_see_chain` veto. Unknown chains are hidden.
    pub fn chain_visibility(
        &self,
        entity: &Entity,
        chain_id: &QualifiedId,
        events: &EventPipeline,
    ) -> bool {
        let Some(chain) = self.get(chain_id) else {
            return false;
        };
        (chain.visibility)(entity)
            && events.can_see_chain.query(
                entity,
                &CanSeeChain {
                    chain: chain_id.clone(),
                },
            )
    }

    /// Node predicate AND no `can_see_node` veto. Missing nodes are hidden.
    pub fn node_visibility(
        &self,
        entity: &Entity,
        chain_id: &QualifiedId,
        node_id: &QualifiedId,
        events: &EventPipeline,
    ) -> bool {
        let Some(node) = self.get(chain_id).and_then(|chain| chain.node(node_id)) else {
            return false;
        };
        (node.visibility)(entity)
            && events.can_see_node.query(
                entity,
                &CanSeeNode {
                    chain: chain_id.clone(),
                    transformation: node_id.clone(),
                },
            )
    }

    /// IDs of every chain visible to the entity, in creation order.
    pub fn visible_chains(&self, entity: &Entity, events: &EventPipeline) -> Vec<QualifiedId> {
        self.chains
            .iter()
            .filter(|chain| self.chain_visibility(entity, &chain.id, events))
            .map(|chain| chain.id.clone())
            .collect()
    }

    /// Visible nodes of a chain, in chain order. Empty if the chain itself
    /// is hidden.
    pub fn visible_nodes(
        &self,
        entity: &Entity,
        chain_id: &QualifiedId,
        events: &EventPipeline,
    ) -> Vec<QualifiedId> {
        if !self.chain_visibility(entity, chain_id, events) {
            return Vec::new();
        }
        self.get(chain_id)
            .map(|chain| {
                chain
                    .nodes
                    .iter()
                    .filter(|node| {
                        self.node_visibility(entity, chain_id, &node.transformation, events)
                    })
                    .map(|node| node.transformation.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drop every chain and queued insertion.
    pub fn clear(&mut self) {
        self.chains.clear();
        self.index.clear();
        self.pending.clear();
    }
}

impl std::fmt::Debug for ChainRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainRegistry")
            .field("chains", &self.chains)
            .field("pending", &self.pending.len())
            .finish()
    }
}
