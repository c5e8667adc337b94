//! Traversal request and engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::session::SessionMode;
use crate::{Error, Result};

/// Upper bound on `layers` unless configured otherwise.
pub const DEFAULT_LAYER_LIMIT: usize = 16;

/// What a caller asks for: a root query and how far to expand around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalRequest {
    /// Root query, run verbatim as round 1.
    pub query: String,
    /// Rounds to run, root query included. At least 1.
    pub layers: usize,
    /// Classify nodes in follow-up rounds. When false, rounds after the
    /// first only collect connections.
    pub include_nodes: bool,
    /// Classify `Application` nodes. When false they are skipped like any
    /// unrecognized label.
    pub include_applications: bool,
    /// Requesting user, recorded on the traversal span.
    pub user: Option<String>,
}

impl Default for TraversalRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            layers: 1,
            include_nodes: true,
            include_applications: true,
            user: None,
        }
    }
}

impl TraversalRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), ..Self::default() }
    }

    pub fn with_layers(mut self, layers: usize) -> Self {
        self.layers = layers;
        self
    }

    /// Only collect connections beyond the root round.
    pub fn relationships_only_beyond_root(mut self) -> Self {
        self.include_nodes = false;
        self
    }

    pub fn without_applications(mut self) -> Self {
        self.include_applications = false;
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Check the request against the engine limits.
    pub fn validate(&self, config: &TraversalConfig) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(Error::InvalidRequest("query is empty".into()));
        }
        if self.layers == 0 {
            return Err(Error::InvalidRequest("layers must be at least 1".into()));
        }
        if self.layers > config.layer_limit {
            return Err(Error::InvalidRequest(format!(
                "layers {} exceeds the limit of {}",
                self.layers, config.layer_limit
            )));
        }
        Ok(())
    }
}

/// Engine tunables, shared by every traversal a [`Topology`](crate::Topology) runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalConfig {
    pub session_mode: SessionMode,
    /// Bound on a whole traversal, all rounds included.
    #[serde(with = "opt_millis")]
    pub deadline: Option<Duration>,
    pub layer_limit: usize,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            session_mode: SessionMode::Read,
            deadline: None,
            layer_limit: DEFAULT_LAYER_LIMIT,
        }
    }
}

impl TraversalConfig {
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_layer_limit(mut self, limit: usize) -> Self {
        self.layer_limit = limit;
        self
    }
}

/// `Option<Duration>` as whole milliseconds.
mod opt_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        value.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
