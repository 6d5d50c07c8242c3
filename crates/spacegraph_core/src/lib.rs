//! Core domain logic for the spacegraph content hierarchy.
//! This crate is the single source of truth for business invariants.

pub mod db;
pub mod graph;
pub mod logging;
pub mod model;
pub mod perm;
pub mod repo;
pub mod service;

pub use graph::{compute_context_actions, parse_payload, ContextAction, GraphDocumentPayload,
    GraphEdge};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::node::{Node, NodeId, NodeSummary};
pub use model::space::{PrincipalId, Space, SpaceId};
pub use perm::{
    node_visibility_filter, space_narrow_filter, space_visibility_filter, Action, Filter, Principal,
};
pub use repo::node_repo::{NodeRepository, SqliteNodeRepository};
pub use repo::soft_delete::Scope;
pub use repo::space_repo::{SpaceRepository, SqliteSpaceRepository};
pub use repo::{RepoError, RepoResult};
pub use service::admin_service::{AdminError, AdminService};
pub use service::node_service::{NodeDetail, NodeList, NodeQuery, NodeService, ServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
