//! Channel type classification.
//!
//! Relationship type names map onto the MQ channel type codes (MQCHT_*).
//! Both the PCF spelling (`SVRCONN`) and the long spelling (`SERVER_CONN`)
//! are accepted. Lookup is exact and case-sensitive.

use serde::{Deserialize, Serialize};

/// MQ channel type. Serialized as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", from = "u8")]
pub enum ChannelType {
    Sender = 1,
    Server = 2,
    Receiver = 3,
    Requester = 4,
    ClientConn = 6,
    ServerConn = 7,
    ClusterReceiver = 8,
    ClusterSender = 9,
    Mqtt = 10,
    Unknown = 99,
}

impl ChannelType {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Classify a relationship type name. Total: unrecognized names are `Unknown`.
pub fn classify_channel(name: &str) -> ChannelType {
    match name {
        "SENDER" => ChannelType::Sender,
        "SERVER" => ChannelType::Server,
        "RECEIVER" => ChannelType::Receiver,
        "REQUESTER" => ChannelType::Requester,
        "CLIENT_CONN" | "CLNTCONN" => ChannelType::ClientConn,
        "SERVER_CONN" | "SVRCONN" => ChannelType::ServerConn,
        "CLUSTER_RECEIVER" | "CLUSRCVR" => ChannelType::ClusterReceiver,
        "CLUSTER_SENDER" | "CLUSSDR" => ChannelType::ClusterSender,
        "MQTT" => ChannelType::Mqtt,
        _ => ChannelType::Unknown,
    }
}

impl From<ChannelType> for u8 {
    fn from(t: ChannelType) -> u8 { t.code() }
}

impl From<u8> for ChannelType {
    fn from(code: u8) -> Self {
        match code {
            1 => ChannelType::Sender,
            2 => ChannelType::Server,
            3 => ChannelType::Receiver,
            4 => ChannelType::Requester,
            6 => ChannelType::ClientConn,
            7 => ChannelType::ServerConn,
            8 => ChannelType::ClusterReceiver,
            9 => ChannelType::ClusterSender,
            10 => ChannelType::Mqtt,
            _ => ChannelType::Unknown,
        }
    }
}
