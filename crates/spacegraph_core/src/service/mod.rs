//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate permission engine, repositories and graph interpreter into
//!   the boundary-facing facade.
//! - Keep the HTTP/view layer decoupled from storage details.
//!
//! # Invariants
//! - The read facade never mutates; boundary writes are rejected.
//! - Administrative mutations enforce soft-delete invariants on write.

pub mod admin_service;
pub mod node_service;
