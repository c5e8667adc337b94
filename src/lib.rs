//! # mq-topology — Layered MQ Topology Snapshots
//!
//! Turns a query against a Neo4j-style graph store into one deduplicated
//! snapshot of a messaging network: queue managers, applications, and the
//! channels between them, expanded a caller-chosen number of layers around
//! whatever the root query found.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `QueryExecutor` is the contract between the engine and the store
//! 2. **Clean DTOs**: raw `Node`/`Relationship`/`Path` in, typed `Snapshot` out
//! 3. **Classification is pure**: node and channel classification never touch I/O
//! 4. **Deterministic**: expansion follows discovery order, so output order is reproducible
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mq_topology::{Topology, TraversalRequest};
//!
//! # async fn example() -> mq_topology::Result<()> {
//! let topology = Topology::open_memory();
//!
//! let request = TraversalRequest::new("MATCH p=(q:QueueManager {name: 'QM1'})--() RETURN p")
//!     .with_layers(2);
//! let snapshot = topology.run_query(&request).await?;
//!
//! for qm in &snapshot.queue_managers {
//!     println!("{} (layer {})", qm.name, qm.layer);
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod session;
pub mod executor;
pub mod topology;
pub mod traversal;
pub mod config;
pub mod export;

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{Node, Relationship, Path, Value, PropertyMap, NodeId, RelId};
pub use session::{Session, SessionMode, SessionId};
pub use executor::{QueryExecutor, MemoryExecutor, Record, RecordValue, Params};
pub use topology::{
    QueueManager, Application, Connection, Snapshot, ReposRole,
    ChannelType, classify_channel, classify_node, ExtractionError,
};
pub use traversal::{Traversal, TraversalOutcome, ExpansionFailure};
pub use config::{TraversalRequest, TraversalConfig};

use std::time::Duration;

use tracing::{warn, Instrument};

// ============================================================================
// Top-level Topology handle
// ============================================================================

/// The primary entry point. A `Topology` wraps a query executor and runs
/// layered traversals against it.
pub struct Topology<E: QueryExecutor> {
    executor: E,
    config: TraversalConfig,
}

impl<E: QueryExecutor> Topology<E> {
    /// Create a Topology with the given executor and default configuration.
    pub fn with_executor(executor: E) -> Self {
        Self { executor, config: TraversalConfig::default() }
    }

    pub fn with_config(mut self, config: TraversalConfig) -> Self {
        self.config = config;
        self
    }

    /// Run a traversal and return the snapshot, or the first fatal error.
    pub async fn run_query(&self, request: &TraversalRequest) -> Result<Snapshot> {
        self.traverse(request).await.into_result()
    }

    /// Run a traversal and return everything it produced, including the
    /// partial snapshot when a fatal error stopped it.
    ///
    /// One session is opened per call and always closed before returning.
    pub async fn traverse(&self, request: &TraversalRequest) -> TraversalOutcome {
        let span = tracing::info_span!(
            "traversal",
            layers = request.layers,
            user = request.user.as_deref().unwrap_or("-"),
            session = tracing::field::Empty,
        );
        self.traverse_in_session(request).instrument(span).await
    }

    async fn traverse_in_session(&self, request: &TraversalRequest) -> TraversalOutcome {
        if let Err(err) = request.validate(&self.config) {
            return TraversalOutcome::failed(err);
        }

        let mut session = match self.executor.open_session(self.config.session_mode).await {
            Ok(session) => session,
            Err(err) => {
                tracing::error!(error = %err, "could not open session");
                return TraversalOutcome::failed(err);
            }
        };
        tracing::Span::current().record("session", session.id().0);

        let mut traversal = Traversal::new(request);
        let result = match self.config.deadline {
            Some(deadline) => tokio::time::timeout(deadline, traversal.run(&self.executor, &mut session))
                .await
                .unwrap_or(Err(Error::Timeout(deadline))),
            None => traversal.run(&self.executor, &mut session).await,
        };
        let closed = self.executor.close_session(session).await;

        let mut outcome = traversal.finish(result.err());
        if let Err(err) = closed {
            warn!(error = %err, "failed to close session");
            if outcome.error.is_none() {
                outcome.error = Some(Error::Session(err.to_string()));
            }
        }
        outcome
    }

    /// Access the underlying executor (for advanced use).
    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn config(&self) -> &TraversalConfig {
        &self.config
    }
}

/// In-memory topology for testing and embedding.
impl Topology<MemoryExecutor> {
    pub fn open_memory() -> Self {
        Self::with_executor(MemoryExecutor::new())
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {message} (query: {query})")]
    Query { query: String, message: String },

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Traversal timed out after {0:?}")]
    Timeout(Duration),

    #[error("Session error: {0}")]
    Session(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
