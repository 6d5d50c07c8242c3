//! Domain model for spaces, nodes and acting principals.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep one stable-identity shape shared by storage and services.
//!
//! # Invariants
//! - Every entity is identified by a stable `public_id` UUID, never reused.
//! - Deletion is represented by soft-delete tombstones, not hard delete.

pub mod node;
pub mod space;
