//! # Query Executor Trait
//!
//! This is THE contract between the topology engine and a graph store.
//! The engine never speaks a wire protocol itself: it opens one session,
//! runs queries through it one at a time, and closes it.
//!
//! ## Implementations
//!
//! | Executor | Module | Description |
//! |---------|--------|-------------|
//! | `MemoryExecutor` | `memory` | In-memory graph for testing/embedding |
//!
//! A Bolt-backed executor lives with the host process; it only needs to map
//! driver values onto [`Record`] and driver failures onto [`Error`](crate::Error).

pub mod memory;

use async_trait::async_trait;
use crate::model::*;
use crate::session::{Session, SessionMode};
use crate::Result;

pub use memory::MemoryExecutor;

/// Query parameters, bound by name (`$qmid` → `params["qmid"]`).
pub type Params = PropertyMap;

// ============================================================================
// Records
// ============================================================================

/// One positional value of a result record.
///
/// A pattern query (`MATCH p=(a)-[]-(b) RETURN p`) yields paths; a filtered
/// single-node match (`MATCH (q) WHERE ... RETURN q`) yields bare nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    Node(Box<Node>),
    Relationship(Box<Relationship>),
    Path(Box<Path>),
    Scalar(Value),
}

impl From<Node> for RecordValue {
    fn from(n: Node) -> Self { RecordValue::Node(Box::new(n)) }
}
impl From<Relationship> for RecordValue {
    fn from(r: Relationship) -> Self { RecordValue::Relationship(Box::new(r)) }
}
impl From<Path> for RecordValue {
    fn from(p: Path) -> Self { RecordValue::Path(Box::new(p)) }
}
impl From<Value> for RecordValue {
    fn from(v: Value) -> Self { RecordValue::Scalar(v) }
}

/// A single result row, values in RETURN-clause order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub values: Vec<RecordValue>,
}

impl Record {
    pub fn new(values: impl IntoIterator<Item = impl Into<RecordValue>>) -> Self {
        Self { values: values.into_iter().map(Into::into).collect() }
    }

    /// Record with a single positional value.
    pub fn single(value: impl Into<RecordValue>) -> Self {
        Self { values: vec![value.into()] }
    }
}

// ============================================================================
// QueryExecutor Trait
// ============================================================================

/// The graph store collaborator.
///
/// Implementations report unreachable or unauthenticated stores from
/// `open_session` as `Error::Connection`, and failed queries from `run` as
/// `Error::Query`.
#[async_trait]
pub trait QueryExecutor: Send + Sync + 'static {
    /// The session type for this executor.
    type Session: Session;

    /// Open a session.
    async fn open_session(&self, mode: SessionMode) -> Result<Self::Session>;

    /// Run one query to completion and return all of its records.
    async fn run(
        &self,
        session: &mut Self::Session,
        query: &str,
        params: &Params,
    ) -> Result<Vec<Record>>;

    /// Release a session. Called exactly once per opened session.
    async fn close_session(&self, session: Self::Session) -> Result<()>;
}
