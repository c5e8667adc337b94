//! In-memory query executor.
//!
//! This is the reference implementation of `QueryExecutor`.
//! It holds a small property graph in maps protected by RwLock.
//!
//! ## Query support
//!
//! There is no Cypher engine here. Two kinds of query are answered:
//!
//! - **Neighbourhood queries**: any query carrying an integer `qmid`
//!   parameter returns one path record per relationship touching a node
//!   whose `qmid` property matches, in relationship-id order.
//! - **Registered queries**: any other query text returns the records
//!   registered for it with [`MemoryExecutor::register`], or nothing.
//!
//! Failures can be injected per query text, per `qmid`, or for session
//! opening, so traversal error paths can be exercised.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use parking_lot::{Mutex, RwLock};
use async_trait::async_trait;

use crate::model::*;
use crate::session::{Session, SessionId, SessionMode};
use crate::{Error, Result};
use super::{Params, QueryExecutor, Record};

// ============================================================================
// MemoryExecutor
// ============================================================================

/// In-memory graph that answers topology queries.
#[derive(Clone, Default)]
pub struct MemoryExecutor {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    nodes: RwLock<BTreeMap<NodeId, Node>>,
    relationships: RwLock<BTreeMap<RelId, Relationship>>,
    registered: RwLock<HashMap<String, Vec<Record>>>,
    failing_queries: RwLock<HashSet<String>>,
    failing_qmids: RwLock<HashSet<i64>>,
    failing_qmids_once: Mutex<HashSet<i64>>,
    refuse_sessions: AtomicBool,
    query_log: Mutex<Vec<(String, Params)>>,
    next_node_id: AtomicI64,
    next_rel_id: AtomicI64,
    next_session_id: AtomicU64,
    open_sessions: AtomicUsize,
    sessions_opened: AtomicUsize,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Graph population
    // ========================================================================

    /// Add a node with a store-assigned id.
    pub fn add_node(&self, labels: &[&str], properties: PropertyMap) -> NodeId {
        let id = NodeId(self.inner.next_node_id.fetch_add(1, Ordering::Relaxed) + 1);
        let node = Node::new(id).with_labels(labels.iter().copied());
        self.insert_node(Node { properties, ..node });
        id
    }

    /// Insert a node with a caller-chosen id, replacing any node with that id.
    pub fn insert_node(&self, node: Node) {
        self.inner.next_node_id.fetch_max(node.id.0, Ordering::Relaxed);
        self.inner.nodes.write().insert(node.id, node);
    }

    /// Add a relationship with a store-assigned id.
    pub fn add_relationship(&self, src: NodeId, dst: NodeId, rel_type: &str) -> Result<RelId> {
        let id = RelId(self.inner.next_rel_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.insert_relationship(Relationship::new(id, src, dst, rel_type))?;
        Ok(id)
    }

    /// Insert a relationship with a caller-chosen id. Both endpoints must exist.
    pub fn insert_relationship(&self, rel: Relationship) -> Result<()> {
        {
            let nodes = self.inner.nodes.read();
            for end in [rel.src, rel.dst] {
                if !nodes.contains_key(&end) {
                    return Err(Error::Query {
                        query: format!("insert relationship {}", rel.id),
                        message: format!("node {end} does not exist"),
                    });
                }
            }
        }
        self.inner.next_rel_id.fetch_max(rel.id.0, Ordering::Relaxed);
        self.inner.relationships.write().insert(rel.id, rel);
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<Node> {
        self.inner.nodes.read().get(&id).cloned()
    }

    /// Register the records returned for an exact query text.
    pub fn register(&self, query: impl Into<String>, records: Vec<Record>) {
        self.inner.registered.write().insert(query.into(), records);
    }

    // ========================================================================
    // Failure injection
    // ========================================================================

    /// Make every run of `query` fail.
    pub fn fail_on(&self, query: impl Into<String>) {
        self.inner.failing_queries.write().insert(query.into());
    }

    /// Make every neighbourhood query for `qmid` fail.
    pub fn fail_on_qmid(&self, qmid: i64) {
        self.inner.failing_qmids.write().insert(qmid);
    }

    /// Make the next neighbourhood query for `qmid` fail; later ones succeed.
    pub fn fail_once_on_qmid(&self, qmid: i64) {
        self.inner.failing_qmids_once.lock().insert(qmid);
    }

    /// Make `open_session` fail as if the store were unreachable.
    pub fn refuse_sessions(&self) {
        self.inner.refuse_sessions.store(true, Ordering::Relaxed);
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Every query run so far, with its parameters, in order.
    pub fn queries_run(&self) -> Vec<(String, Params)> {
        self.inner.query_log.lock().clone()
    }

    /// Sessions currently open.
    pub fn open_sessions(&self) -> usize {
        self.inner.open_sessions.load(Ordering::Relaxed)
    }

    /// Sessions opened over the executor's lifetime.
    pub fn sessions_opened(&self) -> usize {
        self.inner.sessions_opened.load(Ordering::Relaxed)
    }

    /// One path per relationship touching a node with the given `qmid`.
    fn neighbourhood(&self, qmid: i64) -> Vec<Record> {
        let nodes = self.inner.nodes.read();
        let relationships = self.inner.relationships.read();

        let mut records = Vec::new();
        for centre in nodes.values().filter(|n| n.get("qmid").and_then(Value::as_int) == Some(qmid)) {
            for rel in relationships.values().filter(|r| r.touches(centre.id)) {
                let Some(other) = rel.other_node(centre.id).and_then(|id| nodes.get(&id)) else {
                    continue;
                };
                let path = Path::single(centre.clone()).append(rel.clone(), other.clone());
                records.push(Record::single(path));
            }
        }
        records
    }
}

// ============================================================================
// MemorySession
// ============================================================================

/// In-memory session (a marker; the graph has no isolation levels).
#[derive(Debug)]
pub struct MemorySession {
    id: SessionId,
    mode: SessionMode,
}

impl Session for MemorySession {
    fn mode(&self) -> SessionMode { self.mode }
    fn id(&self) -> SessionId { self.id }
}

// ============================================================================
// QueryExecutor impl
// ============================================================================

#[async_trait]
impl QueryExecutor for MemoryExecutor {
    type Session = MemorySession;

    async fn open_session(&self, mode: SessionMode) -> Result<MemorySession> {
        if self.inner.refuse_sessions.load(Ordering::Relaxed) {
            return Err(Error::Connection("memory executor refused the session".into()));
        }
        let id = SessionId(self.inner.next_session_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.inner.open_sessions.fetch_add(1, Ordering::Relaxed);
        self.inner.sessions_opened.fetch_add(1, Ordering::Relaxed);
        Ok(MemorySession { id, mode })
    }

    async fn run(
        &self,
        _session: &mut MemorySession,
        query: &str,
        params: &Params,
    ) -> Result<Vec<Record>> {
        self.inner.query_log.lock().push((query.to_owned(), params.clone()));

        if self.inner.failing_queries.read().contains(query) {
            return Err(Error::Query {
                query: query.to_owned(),
                message: "injected failure".into(),
            });
        }

        if let Some(qmid) = params.get("qmid").and_then(Value::as_int) {
            if self.inner.failing_qmids.read().contains(&qmid)
                || self.inner.failing_qmids_once.lock().remove(&qmid)
            {
                return Err(Error::Query {
                    query: query.to_owned(),
                    message: format!("injected failure for qmid {qmid}"),
                });
            }
            return Ok(self.neighbourhood(qmid));
        }

        Ok(self.inner.registered.read().get(query).cloned().unwrap_or_default())
    }

    async fn close_session(&self, _session: MemorySession) -> Result<()> {
        self.inner.open_sessions.fetch_sub(1, Ordering::Relaxed);
        Ok(())
    }
}
