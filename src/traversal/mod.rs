//! # Layered Traversal
//!
//! Drives one topology traversal over an open session:
//!
//! ```text
//! round 1:  root query ──────────────► classify ─► Aggregation (layer 1)
//! round k:  for each queue manager not yet expanded successfully, in discovery order:
//!             neighbourhood query(qmid) ─► classify ─► Aggregation (layer k)
//! ```
//!
//! ## Failure policy
//!
//! | failure | round 1 | round ≥ 2 |
//! |---------|---------|-----------|
//! | query fails | fatal | recorded in `failures`, that queue manager is retried next round |
//! | extraction fails | fatal | fatal |
//!
//! A failed follow-up query contributes nothing, so the aggregation is left
//! exactly as it was before that query. The queue manager stays in the
//! frontier and is queried again in the next round, if there is one. A fatal error stops the traversal;
//! whatever was aggregated up to that point is still returned.

use hashbrown::HashSet;
use tracing::{debug, error, trace, warn};

use crate::config::TraversalRequest;
use crate::executor::{Params, QueryExecutor, Record, RecordValue};
use crate::model::{Node, NodeId, Relationship, Value};
use crate::topology::extract::{extract, extract_connection};
use crate::topology::{Aggregation, EntityKind, Layer, Snapshot};
use crate::{Error, Result};

/// Follow-up query run around one queue manager.
pub const NEIGHBOURHOOD_QUERY: &str = "MATCH p=(q {qmid: $qmid})-[]-() RETURN p";

/// Query and parameters for the neighbourhood of the queue manager with external id `qmid`.
pub fn neighbourhood_query(qmid: i64) -> (&'static str, Params) {
    let mut params = Params::new();
    params.insert("qmid".into(), Value::Int(qmid));
    (NEIGHBOURHOOD_QUERY, params)
}

/// A follow-up query that failed and was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionFailure {
    pub layer: Layer,
    pub queue_manager: NodeId,
    pub qmgr_id: i64,
    pub message: String,
}

/// Everything a traversal produced.
#[derive(Debug)]
pub struct TraversalOutcome {
    pub snapshot: Snapshot,
    /// First fatal error, if any. Skipped follow-up queries are not reported here.
    pub error: Option<Error>,
    pub failures: Vec<ExpansionFailure>,
    pub queries_issued: usize,
}

impl TraversalOutcome {
    /// Outcome of a traversal that never started.
    pub fn failed(error: Error) -> Self {
        Self {
            snapshot: Snapshot::default(),
            error: Some(error),
            failures: Vec::new(),
            queries_issued: 0,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// The snapshot, or the fatal error (dropping the partial snapshot).
    pub fn into_result(self) -> Result<Snapshot> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.snapshot),
        }
    }
}

/// What a single round classifies.
#[derive(Debug, Clone, Copy)]
struct Round {
    layer: Layer,
    relationships_only: bool,
}

// ============================================================================
// Traversal
// ============================================================================

/// State of one traversal. Created per call and never shared.
pub struct Traversal<'r> {
    request: &'r TraversalRequest,
    aggregation: Aggregation,
    expanded: HashSet<NodeId>,
    failures: Vec<ExpansionFailure>,
    queries_issued: usize,
}

impl<'r> Traversal<'r> {
    pub fn new(request: &'r TraversalRequest) -> Self {
        Self {
            request,
            aggregation: Aggregation::new(),
            expanded: HashSet::new(),
            failures: Vec::new(),
            queries_issued: 0,
        }
    }

    /// Run every round. Returns the fatal error that stopped the traversal, if any.
    pub async fn run<E: QueryExecutor>(&mut self, executor: &E, session: &mut E::Session) -> Result<()> {
        let request = self.request;
        let root = Round { layer: 1, relationships_only: false };
        let records = self.execute(executor, session, &request.query, &Params::new()).await
            .inspect_err(|err| error!(error = %err, "root query failed"))?;
        self.absorb(&records, root)?;
        debug!(
            queue_managers = self.aggregation.queue_managers.len(),
            applications = self.aggregation.applications.len(),
            connections = self.aggregation.connections.len(),
            "root round complete"
        );

        for layer in 2..=request.layers {
            let round = Round { layer, relationships_only: !request.include_nodes };

            let frontier: Vec<(NodeId, i64)> = self.aggregation.queue_managers.iter()
                .filter(|qm| !self.expanded.contains(&qm.id))
                .map(|qm| (qm.id, qm.qmgr_id))
                .collect();
            if frontier.is_empty() {
                debug!(layer, "no queue managers left to expand");
                break;
            }
            debug!(layer, frontier = frontier.len(), "expanding");

            for (id, qmgr_id) in frontier {
                let (query, params) = neighbourhood_query(qmgr_id);
                let records = match self.execute(executor, session, query, &params).await {
                    Ok(records) => records,
                    Err(err) => {
                        warn!(layer, queue_manager = %id, qmgr_id, error = %err, "queue manager expansion failed");
                        self.failures.push(ExpansionFailure {
                            layer,
                            queue_manager: id,
                            qmgr_id,
                            message: err.to_string(),
                        });
                        continue;
                    }
                };
                self.expanded.insert(id);
                self.absorb(&records, round)?;
            }
        }
        Ok(())
    }

    /// Assemble the outcome from whatever has been aggregated.
    pub fn finish(self, error: Option<Error>) -> TraversalOutcome {
        TraversalOutcome {
            snapshot: self.aggregation.into_snapshot(),
            error,
            failures: self.failures,
            queries_issued: self.queries_issued,
        }
    }

    async fn execute<E: QueryExecutor>(
        &mut self,
        executor: &E,
        session: &mut E::Session,
        query: &str,
        params: &Params,
    ) -> Result<Vec<Record>> {
        self.queries_issued += 1;
        trace!(query, "running query");
        executor.run(session, query, params).await
    }

    // ========================================================================
    // Classification
    // ========================================================================

    fn absorb(&mut self, records: &[Record], round: Round) -> Result<()> {
        for record in records {
            for value in &record.values {
                match value {
                    RecordValue::Path(path) => {
                        if !round.relationships_only {
                            for node in &path.nodes {
                                self.absorb_node(node, round.layer)?;
                            }
                        }
                        for rel in &path.relationships {
                            self.absorb_relationship(rel);
                        }
                    }
                    RecordValue::Node(node) => {
                        if !round.relationships_only {
                            self.absorb_node(node, round.layer)?;
                        }
                    }
                    RecordValue::Relationship(rel) => self.absorb_relationship(rel),
                    RecordValue::Scalar(v) => trace!(value = %v, "ignoring scalar column"),
                }
            }
        }
        Ok(())
    }

    fn absorb_node(&mut self, node: &Node, layer: Layer) -> Result<()> {
        let Some(kind) = EntityKind::of(node) else {
            trace!(node = %node.id, labels = ?node.labels, "skipping unmanaged node");
            return Ok(());
        };
        if kind == EntityKind::Application && !self.request.include_applications {
            return Ok(());
        }
        // Already aggregated: keeps its first-discovery record.
        if self.aggregation.contains_node(node.id) {
            return Ok(());
        }

        let entity = extract(kind, node, layer).inspect_err(|err| error!(error = %err, "extraction failed"))?;
        self.aggregation.insert(entity);
        Ok(())
    }

    fn absorb_relationship(&mut self, rel: &Relationship) {
        self.aggregation.insert_connection(extract_connection(rel));
    }
}
