//! Node classification and entity extraction.
//!
//! A raw node becomes a topology entity based on its first label only.
//! Extraction either yields a complete record or an [`ExtractionError`];
//! a node that fails extraction contributes nothing.

use crate::model::{Node, NodeId, Relationship, Value};
use super::{classify_channel, Application, Connection, Layer, QueueManager, ReposRole};

/// Property `type` value assumed when a queue manager has none.
const DEFAULT_REPOS_TYPE: &str = "Partial";

/// A classified node that lacks a required property or carries one of the wrong type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("missing required field {field} on {label} node {node}")]
    MissingField {
        label: &'static str,
        node: NodeId,
        field: &'static str,
    },
    #[error("field {field} on {label} node {node}: expected {expected}, got {got}")]
    WrongType {
        label: &'static str,
        node: NodeId,
        field: &'static str,
        expected: &'static str,
        got: &'static str,
    },
}

/// The entity kinds a node can classify to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    QueueManager,
    Application,
}

impl EntityKind {
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::QueueManager => "QueueManager",
            EntityKind::Application => "Application",
        }
    }

    /// Kind of a node, decided by its first label. Other labels are ignored.
    pub fn of(node: &Node) -> Option<Self> {
        match node.primary_label()? {
            "QueueManager" => Some(EntityKind::QueueManager),
            "Application" => Some(EntityKind::Application),
            _ => None,
        }
    }
}

/// A typed record extracted from a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    QueueManager(QueueManager),
    Application(Application),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::QueueManager(_) => EntityKind::QueueManager,
            Entity::Application(_) => EntityKind::Application,
        }
    }
}

/// Classify a node and extract its entity, tagged with `layer`.
///
/// `Ok(None)` means the node is not a topology entity and is skipped.
pub fn classify_node(node: &Node, layer: Layer) -> Result<Option<Entity>, ExtractionError> {
    EntityKind::of(node)
        .map(|kind| extract(kind, node, layer))
        .transpose()
}

/// Extract an entity of a known kind.
pub fn extract(kind: EntityKind, node: &Node, layer: Layer) -> Result<Entity, ExtractionError> {
    match kind {
        EntityKind::QueueManager => extract_queue_manager(node, layer).map(Entity::QueueManager),
        EntityKind::Application => extract_application(node, layer).map(Entity::Application),
    }
}

pub fn extract_queue_manager(node: &Node, layer: Layer) -> Result<QueueManager, ExtractionError> {
    let props = Props { node, label: EntityKind::QueueManager.label() };

    let qmgr_id = props.required_int("qmid")?;
    let name = props.required_str("name")?;
    let host = props.required_str("host")?;
    let host2 = props.optional_str("host2", "")?;
    let repos_type = props.optional_str("type", DEFAULT_REPOS_TYPE)?;
    let multi_instance = props.optional_flag("multi", 0)?;

    // A queue manager without an integer decom flag has an unknown role,
    // whatever its type says.
    let (decom, repos) = match node.get("decom").and_then(Value::as_int) {
        Some(decom) => (decom, ReposRole::from_type_name(repos_type)),
        None => (0, ReposRole::Unknown),
    };

    Ok(QueueManager {
        id: node.id,
        qmgr_id,
        name: name.to_owned(),
        repos,
        tooltip: format!("id:{}, qmid:{qmgr_id}, name:{name}, type:Full-Partial, server:{host}", node.id),
        layer,
        decom,
        host: host.to_owned(),
        host2: host2.to_owned(),
        multi_instance,
    })
}

pub fn extract_application(node: &Node, layer: Layer) -> Result<Application, ExtractionError> {
    let props = Props { node, label: EntityKind::Application.label() };

    let app_id = props.required_int("id")?;
    let name = props.required_str("name")?;
    let owner = props.required_str("owner")?;

    Ok(Application {
        id: node.id,
        app_id,
        name: name.to_owned(),
        owner: owner.to_owned(),
        tooltip: format!("id:{}, appid:{app_id}, name:{name}, owner:{owner}", node.id),
        layer,
    })
}

/// Connection for a relationship. Never fails: unknown types are `Unknown`.
pub fn extract_connection(rel: &Relationship) -> Connection {
    Connection {
        id: rel.id,
        channel_name: rel.rel_type.clone(),
        channel_type: classify_channel(&rel.rel_type),
        start_id: rel.src,
        end_id: rel.dst,
    }
}

// ============================================================================
// Property coercion
// ============================================================================

struct Props<'a> {
    node: &'a Node,
    label: &'static str,
}

impl<'a> Props<'a> {
    fn required(&self, field: &'static str) -> Result<&'a Value, ExtractionError> {
        self.node.get(field).ok_or(ExtractionError::MissingField {
            label: self.label,
            node: self.node.id,
            field,
        })
    }

    fn wrong_type(&self, field: &'static str, expected: &'static str, got: &Value) -> ExtractionError {
        ExtractionError::WrongType {
            label: self.label,
            node: self.node.id,
            field,
            expected,
            got: got.type_name(),
        }
    }

    fn required_int(&self, field: &'static str) -> Result<i64, ExtractionError> {
        let value = self.required(field)?;
        value.as_int().ok_or_else(|| self.wrong_type(field, "INTEGER", value))
    }

    fn required_str(&self, field: &'static str) -> Result<&'a str, ExtractionError> {
        let value = self.required(field)?;
        value.as_str().ok_or_else(|| self.wrong_type(field, "STRING", value))
    }

    fn optional_str(&self, field: &'static str, default: &'a str) -> Result<&'a str, ExtractionError> {
        match self.node.get(field) {
            None => Ok(default),
            Some(value) => value.as_str().ok_or_else(|| self.wrong_type(field, "STRING", value)),
        }
    }

    /// Integer flag; booleans read as 1/0.
    fn optional_flag(&self, field: &'static str, default: i64) -> Result<i64, ExtractionError> {
        match self.node.get(field) {
            None => Ok(default),
            Some(Value::Int(i)) => Ok(*i),
            Some(Value::Bool(b)) => Ok(i64::from(*b)),
            Some(value) => Err(self.wrong_type(field, "INTEGER", value)),
        }
    }
}
