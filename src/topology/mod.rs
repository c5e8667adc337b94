//! # MQ Topology
//!
//! Typed entities of a messaging network as seen through the graph store:
//! queue managers, the applications attached to them, and the channels
//! between the two.
//!
//! Field names on the serialized forms are an external contract, consumed
//! verbatim by the topology viewer.

pub mod channel;
pub mod extract;
pub mod store;

use serde::{Deserialize, Serialize};

use crate::model::{NodeId, RelId};

pub use channel::{classify_channel, ChannelType};
pub use extract::{classify_node, extract_connection, Entity, EntityKind, ExtractionError};
pub use store::{Aggregation, EntityStore, Keyed};

/// Hop distance at which an entity was first discovered. The root query is layer 1.
pub type Layer = usize;

// ============================================================================
// Repository role
// ============================================================================

/// Cluster repository role of a queue manager. Serialized as its code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", from = "u8")]
pub enum ReposRole {
    Full = 0,
    Partial = 1,
    Normal = 2,
    Unknown = 3,
}

impl ReposRole {
    /// Role from the `type` property. Case-sensitive.
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "Full" => ReposRole::Full,
            "Partial" => ReposRole::Partial,
            "Normal" => ReposRole::Normal,
            _ => ReposRole::Unknown,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<ReposRole> for u8 {
    fn from(role: ReposRole) -> u8 { role.code() }
}

impl From<u8> for ReposRole {
    fn from(code: u8) -> Self {
        match code {
            0 => ReposRole::Full,
            1 => ReposRole::Partial,
            2 => ReposRole::Normal,
            _ => ReposRole::Unknown,
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A queue manager (broker instance).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueManager {
    pub id: NodeId,
    /// Queue manager id from the data extract.
    #[serde(rename = "qmgrid")]
    pub qmgr_id: i64,
    pub name: String,
    pub repos: ReposRole,
    pub tooltip: String,
    pub layer: Layer,
    /// 0 - in service, 9 - decommissioned
    pub decom: i64,
    pub host: String,
    /// Standby host of a multi-instance queue manager; empty otherwise.
    pub host2: String,
    #[serde(rename = "multi")]
    pub multi_instance: i64,
}

/// A client program attached to the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: NodeId,
    /// Application id from the data extract.
    #[serde(rename = "appid")]
    pub app_id: i64,
    pub name: String,
    pub owner: String,
    pub tooltip: String,
    pub layer: Layer,
}

/// A channel between two topology nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: RelId,
    /// The raw relationship type, e.g. `CLUSSDR`.
    pub channel_name: String,
    pub channel_type: ChannelType,
    pub start_id: NodeId,
    pub end_id: NodeId,
}

/// The consolidated, deduplicated result of one traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "queuemanagers")]
    pub queue_managers: Vec<QueueManager>,
    pub applications: Vec<Application>,
    pub connections: Vec<Connection>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.queue_managers.is_empty() && self.applications.is_empty() && self.connections.is_empty()
    }

    pub fn queue_manager(&self, id: NodeId) -> Option<&QueueManager> {
        self.queue_managers.iter().find(|qm| qm.id == id)
    }

    pub fn application(&self, id: NodeId) -> Option<&Application> {
        self.applications.iter().find(|app| app.id == id)
    }

    pub fn connection(&self, id: RelId) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_repos_role_from_type_name() {
        assert_eq!(ReposRole::from_type_name("Full").code(), 0);
        assert_eq!(ReposRole::from_type_name("Partial").code(), 1);
        assert_eq!(ReposRole::from_type_name("Normal").code(), 2);
        assert_eq!(ReposRole::from_type_name("full"), ReposRole::Unknown);
    }

    #[test]
    fn test_snapshot_wire_field_names() {
        let snapshot = Snapshot {
            queue_managers: vec![QueueManager {
                id: NodeId(1),
                qmgr_id: 10,
                name: "QM1".into(),
                repos: ReposRole::Partial,
                tooltip: "t".into(),
                layer: 1,
                decom: 0,
                host: "h1".into(),
                host2: String::new(),
                multi_instance: 0,
            }],
            applications: vec![Application {
                id: NodeId(2),
                app_id: 5,
                name: "APP1".into(),
                owner: "team1".into(),
                tooltip: "t".into(),
                layer: 2,
            }],
            connections: vec![Connection {
                id: RelId(99),
                channel_name: "SVRCONN".into(),
                channel_type: ChannelType::ServerConn,
                start_id: NodeId(2),
                end_id: NodeId(1),
            }],
        };

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(
            value,
            json!({
                "queuemanagers": [{
                    "id": 1, "qmgrid": 10, "name": "QM1", "repos": 1, "tooltip": "t",
                    "layer": 1, "decom": 0, "host": "h1", "host2": "", "multi": 0
                }],
                "applications": [{
                    "id": 2, "appid": 5, "name": "APP1", "owner": "team1",
                    "tooltip": "t", "layer": 2
                }],
                "connections": [{
                    "id": 99, "channelName": "SVRCONN", "channelType": 7,
                    "startId": 2, "endId": 1
                }]
            })
        );

        let back: Snapshot = serde_json::from_value(value).unwrap();
        assert_eq!(back, snapshot);
    }
}
