//! Notification and veto pipeline.
//!
//! Two channel shapes are provided:
//!
//! - [`Channel`] for pure notifications. Every subscriber is called in
//!   subscription order and nothing is returned.
//! - [`VetoChannel`] for veto queries. Every subscriber is called, even after
//!   an earlier one vetoed, and the query is allowed only if no subscriber
//!   recorded a veto on the shared [`Verdict`].
//!
//! Subscribers are registered while the framework loads and are read-only
//! afterwards. A panicking subscriber is the subscriber's responsibility; the
//! pipeline does not catch it.

use crate::entity::Entity;
use crate::id::{EntityHandle, QualifiedId};

/// Mastery accumulated by one `gain_mastery` call.
#[derive(Debug, Clone, PartialEq)]
pub struct MasteryGain {
    pub entity: EntityHandle,
    pub amount: f64,
}

/// One or more mastery levels were reached in a single update.
#[derive(Debug, Clone, PartialEq)]
pub struct MasteryLevelUp {
    pub entity: EntityHandle,
    pub previous_level: u32,
    pub current_level: u32,
    pub levels_gained: u32,
}

/// Ki changed through `KiPool::add`; `amount` is the delta after modifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct KiChange {
    pub entity: EntityHandle,
    pub amount: f64,
}

/// An entity is about to start a transformation.
#[derive(Debug, Clone, PartialEq)]
pub struct CanTransform {
    pub transformation: QualifiedId,
}

/// A chain is checked for visibility.
#[derive(Debug, Clone, PartialEq)]
pub struct CanSeeChain {
    pub chain: QualifiedId,
}

/// A node of a chain is checked for visibility.
#[derive(Debug, Clone, PartialEq)]
pub struct CanSeeNode {
    pub chain: QualifiedId,
    pub transformation: QualifiedId,
}

/// Vetoes recorded while a query is dispatched.
#[derive(Debug, Default)]
pub struct Verdict {
    vetoes: usize,
}

impl Verdict {
    /// Object to the queried decision.
    pub fn veto(&mut self) {
        self.vetoes += 1;
    }

    pub fn vetoes(&self) -> usize {
        self.vetoes
    }

    pub fn is_allowed(&self) -> bool {
        self.vetoes == 0
    }
}

type Listener<E> = Box<dyn Fn(&E) + Send + Sync>;
type VetoListener<Q> = Box<dyn Fn(&Entity, &Q, &mut Verdict) + Send + Sync>;

/// A notification channel.
pub struct Channel<E> {
    listeners: Vec<Listener<E>>,
}

impl<E> Channel<E> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: impl Fn(&E) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Call every subscriber in subscription order.
    pub fn publish(&self, event: &E) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    fn clear(&mut self) {
        self.listeners.clear();
    }
}

impl<E> Default for Channel<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// A veto query channel.
///
/// # Examples
///
/// ```rust
/// use kiform::events::{CanSeeChain, VetoChannel};
/// use kiform::{Entity, EntityHandle, KiConfig, MemoryHost, QualifiedId};
///
/// let mut channel: VetoChannel<CanSeeChain> = VetoChannel::new();
/// channel.subscribe(|_entity, query, verdict| {
///     if query.chain.contributor() == "hidden" {
///         verdict.veto();
///     }
/// });
///
/// let entity = Entity::new(EntityHandle(1), &KiConfig::default(), MemoryHost::new());
/// let visible = CanSeeChain { chain: QualifiedId::from_str("mod/Forms") };
/// let hidden = CanSeeChain { chain: QualifiedId::from_str("hidden/Forms") };
/// assert!(channel.query(&entity, &visible));
/// assert!(!channel.query(&entity, &hidden));
/// ```
pub struct VetoChannel<Q> {
    listeners: Vec<VetoListener<Q>>,
}

impl<Q> VetoChannel<Q> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(
        &mut self,
        listener: impl Fn(&Entity, &Q, &mut Verdict) + Send + Sync + 'static,
    ) {
        self.listeners.push(Box::new(listener));
    }

    /// Dispatch to every subscriber and return the full verdict.
    pub fn dispatch(&self, entity: &Entity, query: &Q) -> Verdict {
        let mut verdict = Verdict::default();
        for listener in &self.listeners {
            listener(entity, query, &mut verdict);
        }
        verdict
    }

    /// `true` unless at least one subscriber vetoed.
    pub fn query(&self, entity: &Entity, query: &Q) -> bool {
        self.dispatch(entity, query).is_allowed()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    fn clear(&mut self) {
        self.listeners.clear();
    }
}

impl<Q> Default for VetoChannel<Q> {
    fn default() -> Self {
        Self::new()
    }
}

/// Every channel the framework publishes on.
#[derive(Default)]
pub struct EventPipeline {
    pub mastery_gain: Channel<MasteryGain>,
    pub mastery_level: Channel<MasteryLevelUp>,
    pub ki_change: Channel<KiChange>,
    pub can_transform: VetoChannel<CanTransform>,
    pub can_see_node: VetoChannel<CanSeeNode>,
    pub can_see_chain: VetoChannel<CanSeeChain>,
}

impl EventPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every subscriber (unload).
    pub fn clear(&mut self) {
        self.mastery_gain.clear();
        self.mastery_level.clear();
        self.ki_change.clear();
        self.can_transform.clear();
        self.can_see_node.clear();
        self.can_see_chain.clear();
    }
}

impl std::fmt::Debug for EventPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPipeline")
            .field("mastery_gain", &self.mastery_gain.len())
            .field("mastery_level", &self.mastery_level.len())
            .field("ki_change", &self.ki_change.len())
            .field("can_transform", &self.can_transform.len())
            .field("can_see_node", &self.can_see_node.len())
            .field("can_see_chain", &self.can_see_chain.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KiConfig;
    use crate::host::MemoryHost;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn entity() -> Entity {
        Entity::new(EntityHandle(7), &KiConfig::default(), MemoryHost::new())
    }

    fn can_transform() -> CanTransform {
        CanTransform {
            transformation: QualifiedId::from_str("mod/SSJ"),
        }
    }

    #[test]
    fn test_veto_without_subscribers_is_allowed() {
        let channel: VetoChannel<CanTransform> = VetoChannel::new();
        assert!(channel.query(&entity(), &can_transform()));
    }

    #[test]
    fn test_single_veto_wins() {
        let mut channel: VetoChannel<CanTransform> = VetoChannel::new();
        channel.subscribe(|_, _, _| {});
        channel.subscribe(|_, _, verdict| verdict.veto());
        channel.subscribe(|_, _, _| {});
        channel.subscribe(|_, _, _| {});
        assert!(!channel.query(&entity(), &can_transform()));
    }

    #[test]
    fn test_veto_does_not_short_circuit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut channel: VetoChannel<CanTransform> = VetoChannel::new();
        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            channel.subscribe(move |_, _, verdict| {
                calls.fetch_add(1, Ordering::SeqCst);
                verdict.veto();
            });
        }

        let verdict = channel.dispatch(&entity(), &can_transform());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(verdict.vetoes(), 3);
        assert!(!verdict.is_allowed());
    }

    #[test]
    fn test_notifications_in_subscription_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut channel: Channel<KiChange> = Channel::new();
        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            channel.subscribe(move |_| order.lock().unwrap().push(tag));
        }

        channel.publish(&KiChange {
            entity: EntityHandle(1),
            amount: -5.0,
        });
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_clear_drops_listeners() {
        let mut pipeline = EventPipeline::new();
        pipeline.ki_change.subscribe(|_| {});
        pipeline.can_see_chain.subscribe(|_, _, verdict| verdict.veto());
        pipeline.clear();
        assert!(pipeline.ki_change.is_empty());
        assert!(pipeline.can_see_chain.is_empty());
    }
}
