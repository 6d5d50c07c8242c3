//! Space domain model.
//!
//! # Responsibility
//! - Define the access-control scope that owns nodes and grants roles.
//! - Provide lifecycle helpers for soft-delete semantics.
//!
//! # Invariants
//! - `public_id` is stable and never reused for another space.
//! - `is_removed` is the source of truth for tombstone state.
//! - A removed space hides every node it scopes, without touching them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable external identifier for a space.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type SpaceId = Uuid;

/// Stable identifier for an acting identity (user).
pub type PrincipalId = Uuid;

/// Access-control scope owning a set of nodes.
///
/// Role bindings live in their own storage tables (`owner_uuid` column,
/// `space_viewers` rows); this record carries the owner only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    /// Stable global ID used in every external reference.
    pub public_id: SpaceId,
    /// User-facing title.
    pub title: String,
    /// Owning principal with full control. `None` means unowned.
    pub owner_uuid: Option<PrincipalId>,
    /// Soft delete tombstone.
    pub is_removed: bool,
    /// Epoch ms creation timestamp, server-set.
    pub created_at: i64,
    /// Epoch ms update timestamp, server-set.
    pub updated_at: i64,
}

impl Space {
    /// Returns whether this space should be considered visible/active.
    pub fn is_active(&self) -> bool {
        !self.is_removed
    }
}
