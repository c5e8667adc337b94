//! Session management.
//!
//! A session is the scoped resource a traversal holds against the graph
//! store for its whole lifetime. Opening and closing it belongs to the
//! [`QueryExecutor`](crate::executor::QueryExecutor).

use serde::{Deserialize, Serialize};

/// Session access mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    #[default]
    Read,
    Write,
}

/// Opaque session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session trait that all executors must implement.
pub trait Session: Send + Sync {
    fn mode(&self) -> SessionMode;
    fn id(&self) -> SessionId;
}
