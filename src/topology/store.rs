//! Aggregation store and snapshot assembly.
//!
//! Each entity kind is kept in an [`EntityStore`]: an identity index plus an
//! insertion-ordered list. Both are only ever written together by
//! [`EntityStore::insert_if_absent`], so they always hold the same members.

use std::fmt;
use std::hash::Hash;

use hashbrown::HashMap;

use crate::model::{NodeId, RelId};
use super::{Application, Connection, Entity, QueueManager, Snapshot};

/// Types stored by identity.
pub trait Keyed {
    type Key: Copy + Eq + Hash + fmt::Debug;

    fn key(&self) -> Self::Key;
}

impl Keyed for QueueManager {
    type Key = NodeId;
    fn key(&self) -> NodeId { self.id }
}

impl Keyed for Application {
    type Key = NodeId;
    fn key(&self) -> NodeId { self.id }
}

impl Keyed for Connection {
    type Key = RelId;
    fn key(&self) -> RelId { self.id }
}

// ============================================================================
// EntityStore
// ============================================================================

/// Identity-unique, insertion-ordered collection. First writer wins.
#[derive(Debug, Clone)]
pub struct EntityStore<T: Keyed> {
    index: HashMap<T::Key, usize>,
    items: Vec<T>,
}

impl<T: Keyed> Default for EntityStore<T> {
    fn default() -> Self {
        Self { index: HashMap::new(), items: Vec::new() }
    }
}

impl<T: Keyed> EntityStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `item` unless its identity is already present.
    /// Returns whether it was inserted.
    pub fn insert_if_absent(&mut self, item: T) -> bool {
        let key = item.key();
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.items.len());
        self.items.push(item);
        true
    }

    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.index.get(key).map(|&i| &self.items[i])
    }

    pub fn contains(&self, key: &T::Key) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<'a, T: Keyed> IntoIterator for &'a EntityStore<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// ============================================================================
// Aggregation
// ============================================================================

/// The three stores of one traversal. Built fresh per call, never shared.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub queue_managers: EntityStore<QueueManager>,
    pub applications: EntityStore<Application>,
    pub connections: EntityStore<Connection>,
}

impl Aggregation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node entity into the store of its kind.
    pub fn insert(&mut self, entity: Entity) -> bool {
        match entity {
            Entity::QueueManager(qm) => self.queue_managers.insert_if_absent(qm),
            Entity::Application(app) => self.applications.insert_if_absent(app),
        }
    }

    pub fn insert_connection(&mut self, connection: Connection) -> bool {
        self.connections.insert_if_absent(connection)
    }

    /// Whether the node id is already known as any entity kind.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.queue_managers.contains(&id) || self.applications.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.queue_managers.len() + self.applications.len() + self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Assemble the snapshot: queue managers, applications, connections,
    /// each in discovery order.
    pub fn into_snapshot(self) -> Snapshot {
        Snapshot {
            queue_managers: self.queue_managers.into_vec(),
            applications: self.applications.into_vec(),
            connections: self.connections.into_vec(),
        }
    }
}
