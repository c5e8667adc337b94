//! End-to-end integration tests for failure handling.
//!
//! Tests the fatal/non-fatal split between rounds, extraction errors,
//! connection failures, request validation, deadlines and session release.

use std::time::Duration;

use async_trait::async_trait;
use mq_topology::model::property_map::props;
use mq_topology::executor::memory::MemorySession;
use mq_topology::{
    Error, ExtractionError, MemoryExecutor, NodeId, Params, QueryExecutor, Record, SessionMode,
    Topology, TraversalConfig, TraversalRequest, Value,
};

// ============================================================================
// Helper: two root queue managers, each with one neighbour.
//
//   QM10 -[:CLUSSDR]-> QM11        QM20 -[:CLUSSDR]-> QM21
// ============================================================================

fn qm_props(qmid: i64) -> mq_topology::PropertyMap {
    props([
        ("qmid", Value::from(qmid)),
        ("name", format!("QM{qmid}").into()),
        ("host", format!("host{qmid}").into()),
    ])
}

fn setup_clusters() -> Topology<MemoryExecutor> {
    let topology = Topology::open_memory();
    let db = topology.executor();

    let mut roots = Vec::new();
    for qmid in [10, 20] {
        let root = db.add_node(&["QueueManager"], qm_props(qmid));
        let neighbour = db.add_node(&["QueueManager"], qm_props(qmid + 1));
        db.add_relationship(root, neighbour, "CLUSSDR").unwrap();
        roots.push(Record::single(db.node(root).unwrap()));
    }
    db.register("ROOT", roots);
    topology
}

fn names(outcome: &mq_topology::TraversalOutcome) -> Vec<&str> {
    outcome.snapshot.queue_managers.iter().map(|qm| qm.name.as_str()).collect()
}

fn qmids_queried(topology: &Topology<MemoryExecutor>) -> Vec<i64> {
    topology.executor().queries_run()
        .iter()
        .filter_map(|(_, params)| params.get("qmid").and_then(Value::as_int))
        .collect()
}

// ============================================================================
// 1. Query failures
// ============================================================================

#[tokio::test]
async fn test_root_query_failure_is_fatal() {
    let topology = setup_clusters();
    topology.executor().fail_on("ROOT");

    let outcome = topology.traverse(&TraversalRequest::new("ROOT").with_layers(3)).await;

    assert!(matches!(outcome.error, Some(Error::Query { .. })));
    assert!(outcome.snapshot.is_empty());
    assert_eq!(outcome.queries_issued, 1);
    assert_eq!(topology.executor().open_sessions(), 0);

    let result = topology.run_query(&TraversalRequest::new("ROOT")).await;
    assert!(matches!(result, Err(Error::Query { .. })));
}

#[tokio::test]
async fn test_follow_up_failure_is_skipped() {
    let topology = setup_clusters();
    topology.executor().fail_on_qmid(10);

    let outcome = topology.traverse(&TraversalRequest::new("ROOT").with_layers(2)).await;

    assert!(outcome.error.is_none());
    assert_eq!(outcome.failures.len(), 1);
    let failure = &outcome.failures[0];
    assert_eq!(failure.layer, 2);
    assert_eq!(failure.qmgr_id, 10);
    assert_eq!(failure.queue_manager, NodeId(1));
    assert!(failure.message.contains("qmid 10"));

    // QM20 was still expanded after QM10 failed.
    assert_eq!(names(&outcome), vec!["QM10", "QM20", "QM21"]);
    assert_eq!(outcome.snapshot.connections.len(), 1);
}

#[tokio::test]
async fn test_follow_up_failure_continues_into_later_rounds() {
    let topology = setup_clusters();
    topology.executor().fail_on_qmid(20);

    let outcome = topology.traverse(&TraversalRequest::new("ROOT").with_layers(3)).await;

    assert!(outcome.is_ok());
    // QM20 failed in round 2 and again when retried in round 3.
    let layers: Vec<usize> = outcome.failures.iter().map(|f| f.layer).collect();
    assert_eq!(layers, vec![2, 3]);
    // Round 3 also expanded QM11, discovered in round 2.
    assert_eq!(qmids_queried(&topology), vec![10, 20, 20, 11]);
    assert_eq!(names(&outcome), vec!["QM10", "QM20", "QM11"]);
    assert_eq!(outcome.snapshot.queue_managers[2].layer, 2);
}

#[tokio::test]
async fn test_failed_expansion_is_retried_next_round() {
    let topology = setup_clusters();
    topology.executor().fail_once_on_qmid(20);

    let outcome = topology.traverse(&TraversalRequest::new("ROOT").with_layers(3)).await;

    assert!(outcome.is_ok());
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].layer, 2);
    assert_eq!(qmids_queried(&topology), vec![10, 20, 20, 11]);

    // QM21 is found by the retry, one round late.
    assert_eq!(names(&outcome), vec!["QM10", "QM20", "QM11", "QM21"]);
    let qm21 = outcome.snapshot.queue_manager(NodeId(4)).unwrap();
    assert_eq!(qm21.layer, 3);
    assert_eq!(outcome.snapshot.connections.len(), 2);
}

#[tokio::test]
async fn test_failed_expansion_in_last_round_is_not_retried() {
    let topology = setup_clusters();
    topology.executor().fail_once_on_qmid(20);

    let outcome = topology.traverse(&TraversalRequest::new("ROOT").with_layers(2)).await;

    assert!(outcome.is_ok());
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(qmids_queried(&topology), vec![10, 20]);
    assert_eq!(names(&outcome), vec!["QM10", "QM20", "QM11"]);
}

// ============================================================================
// 2. Extraction failures
// ============================================================================

#[tokio::test]
async fn test_missing_field_in_root_round() {
    let topology = Topology::open_memory();
    let db = topology.executor();
    let good = db.add_node(&["QueueManager"], qm_props(1));
    let broken = db.add_node(&["QueueManager"], props([("qmid", Value::from(2)), ("host", "h".into())]));
    let after = db.add_node(&["QueueManager"], qm_props(3));
    db.register("ROOT", vec![
        Record::single(db.node(good).unwrap()),
        Record::single(db.node(broken).unwrap()),
        Record::single(db.node(after).unwrap()),
    ]);

    let outcome = topology.traverse(&TraversalRequest::new("ROOT").with_layers(2)).await;

    match &outcome.error {
        Some(Error::Extraction(ExtractionError::MissingField { field, node, .. })) => {
            assert_eq!(*field, "name");
            assert_eq!(*node, broken);
        }
        other => panic!("expected a missing field error, got {other:?}"),
    }
    // Aggregated before the failure, nothing after it.
    assert_eq!(names(&outcome), vec!["QM1"]);
    assert_eq!(outcome.queries_issued, 1);
    assert_eq!(db.open_sessions(), 0);
}

#[tokio::test]
async fn test_missing_field_in_follow_up_round_is_fatal() {
    let topology = setup_clusters();
    let db = topology.executor();
    let qm10 = NodeId(1);
    let stray = db.add_node(&["Application"], props([("id", Value::from(7)), ("name", "NO_OWNER".into())]));
    db.add_relationship(stray, qm10, "CLNTCONN").unwrap();

    let outcome = topology.traverse(&TraversalRequest::new("ROOT").with_layers(2)).await;

    assert!(matches!(
        outcome.error,
        Some(Error::Extraction(ExtractionError::MissingField { field: "owner", .. }))
    ));
    // QM20 was never expanded.
    assert_eq!(outcome.queries_issued, 2);
    assert!(outcome.snapshot.applications.is_empty());
}

// ============================================================================
// 3. Connection and request errors
// ============================================================================

#[tokio::test]
async fn test_connection_failure() {
    let topology = setup_clusters();
    topology.executor().refuse_sessions();

    let outcome = topology.traverse(&TraversalRequest::new("ROOT")).await;

    assert!(matches!(outcome.error, Some(Error::Connection(_))));
    assert!(topology.executor().queries_run().is_empty());
}

#[tokio::test]
async fn test_invalid_requests() {
    let topology = setup_clusters().with_config(TraversalConfig::default().with_layer_limit(4));

    for request in [
        TraversalRequest::new("ROOT").with_layers(0),
        TraversalRequest::new("ROOT").with_layers(5),
        TraversalRequest::new(""),
    ] {
        let result = topology.run_query(&request).await;
        assert!(matches!(result, Err(Error::InvalidRequest(_))), "{request:?}");
    }
    assert_eq!(topology.executor().sessions_opened(), 0);
}

// ============================================================================
// 4. Deadline and session release
// ============================================================================

/// Delegates to a MemoryExecutor, sleeping before every follow-up query.
struct SlowExecutor {
    inner: MemoryExecutor,
    delay: Duration,
}

#[async_trait]
impl QueryExecutor for SlowExecutor {
    type Session = MemorySession;

    async fn open_session(&self, mode: SessionMode) -> mq_topology::Result<MemorySession> {
        self.inner.open_session(mode).await
    }

    async fn run(&self, session: &mut MemorySession, query: &str, params: &Params) -> mq_topology::Result<Vec<Record>> {
        if params.contains_key("qmid") {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.run(session, query, params).await
    }

    async fn close_session(&self, session: MemorySession) -> mq_topology::Result<()> {
        self.inner.close_session(session).await
    }
}

#[tokio::test]
async fn test_deadline_returns_partial_snapshot() {
    let inner = setup_clusters().executor().clone();
    let topology = Topology::with_executor(SlowExecutor { inner: inner.clone(), delay: Duration::from_secs(5) })
        .with_config(TraversalConfig::default().with_deadline(Duration::from_millis(50)));

    let outcome = topology.traverse(&TraversalRequest::new("ROOT").with_layers(2)).await;

    assert!(matches!(outcome.error, Some(Error::Timeout(_))));
    // The root round finished before the deadline.
    assert_eq!(names(&outcome), vec!["QM10", "QM20"]);
    assert_eq!(inner.open_sessions(), 0);
}

/// Refuses to close sessions.
struct StickyExecutor(MemoryExecutor);

#[async_trait]
impl QueryExecutor for StickyExecutor {
    type Session = MemorySession;

    async fn open_session(&self, mode: SessionMode) -> mq_topology::Result<MemorySession> {
        self.0.open_session(mode).await
    }

    async fn run(&self, session: &mut MemorySession, query: &str, params: &Params) -> mq_topology::Result<Vec<Record>> {
        self.0.run(session, query, params).await
    }

    async fn close_session(&self, _session: MemorySession) -> mq_topology::Result<()> {
        Err(Error::Session("socket already closed".into()))
    }
}

#[tokio::test]
async fn test_close_failure_is_reported() {
    let inner = setup_clusters().executor().clone();
    let topology = Topology::with_executor(StickyExecutor(inner.clone()));

    let outcome = topology.traverse(&TraversalRequest::new("ROOT")).await;
    assert!(matches!(outcome.error, Some(Error::Session(_))));
    assert_eq!(outcome.snapshot.queue_managers.len(), 2);

    // A traversal error takes precedence over the close failure.
    inner.fail_on("ROOT");
    let outcome = topology.traverse(&TraversalRequest::new("ROOT")).await;
    assert!(matches!(outcome.error, Some(Error::Query { .. })));
}
