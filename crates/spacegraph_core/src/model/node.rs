//! Node domain model.
//!
//! # Responsibility
//! - Define the content unit forming the subnode adjacency graph.
//! - Provide lifecycle helpers for soft-delete semantics.
//!
//! # Invariants
//! - `public_id` is stable and never reused for another node.
//! - `is_removed` is the source of truth for tombstone state.
//! - Subnode adjacency lives in its own index table, never on this record.

use crate::model::space::SpaceId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable external identifier for a node.
pub type NodeId = Uuid;

/// Content unit optionally scoped to one space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Stable global ID used in every external reference.
    pub public_id: NodeId,
    /// User-facing name.
    pub name: String,
    /// Owning space. `None` means unscoped, which makes the node invisible
    /// to list/retrieve paths unless a space exposes it via membership.
    pub space_uuid: Option<SpaceId>,
    /// Soft delete tombstone.
    pub is_removed: bool,
    /// Epoch ms creation timestamp, server-set.
    pub created_at: i64,
    /// Epoch ms update timestamp, server-set.
    pub updated_at: i64,
}

impl Node {
    /// Returns whether this node should be considered visible/active.
    pub fn is_active(&self) -> bool {
        !self.is_removed
    }
}

/// Listing projection for one node.
///
/// `has_subnodes` is a one-level lookahead: it reports whether the node has
/// any surviving direct subnodes, without fetching them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSummary {
    /// Stable node ID.
    pub public_id: NodeId,
    /// User-facing name.
    pub name: String,
    /// Whether any active direct subnode exists.
    pub has_subnodes: bool,
}
