//! # Raw Graph Model
//!
//! The DTOs a graph store hands back: nodes, relationships, paths and their
//! property values. The topology layer reads these; it never mutates them.
//!
//! Design rule: NO topology types here. This module is pure data — no I/O,
//! no state, no async.

pub mod node;
pub mod relationship;
pub mod path;
pub mod value;
pub mod property_map;

pub use node::{Node, NodeId};
pub use relationship::{Relationship, RelId};
pub use path::Path;
pub use value::Value;
pub use property_map::PropertyMap;
