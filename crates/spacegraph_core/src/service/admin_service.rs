//! Administrative command service for spaces and nodes.
//!
//! # Responsibility
//! - Provide the trusted mutation path the read-only boundary excludes.
//! - Validate hierarchy and payload invariants above the repositories.
//!
//! # Invariants
//! - Writes only bind to surviving rows: removed spaces accept no grants,
//!   removed nodes accept no links or documents.
//! - A node is never linked as its own subnode.
//! - Graph document payloads must be JSON objects; their inner structure
//!   stays opaque until interpretation.

use crate::model::node::{Node, NodeId};
use crate::model::space::{PrincipalId, Space, SpaceId};
use crate::repo::node_repo::NodeRepository;
use crate::repo::soft_delete::Scope;
use crate::repo::space_repo::SpaceRepository;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from administrative mutations.
#[derive(Debug)]
pub enum AdminError {
    /// Space title is blank after trim.
    InvalidTitle,
    /// Node name is blank after trim.
    InvalidName,
    /// Target space does not exist or is soft-deleted.
    SpaceNotFound(SpaceId),
    /// Target node does not exist or is soft-deleted.
    NodeNotFound(NodeId),
    /// A node cannot be its own subnode.
    SelfLink(NodeId),
    /// Graph document payload is not a JSON object.
    InvalidDocument(String),
    /// Repository-level failure.
    Repo(RepoError),
}

impl Display for AdminError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTitle => write!(f, "space title must not be blank"),
            Self::InvalidName => write!(f, "node name must not be blank"),
            Self::SpaceNotFound(id) => write!(f, "space not found: {id}"),
            Self::NodeNotFound(id) => write!(f, "node not found: {id}"),
            Self::SelfLink(id) => write!(f, "node cannot be its own subnode: {id}"),
            Self::InvalidDocument(message) => {
                write!(f, "invalid graph document payload: {message}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AdminError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AdminError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "space",
                public_id,
            } => Self::SpaceNotFound(public_id),
            RepoError::NotFound {
                entity: "node",
                public_id,
            } => Self::NodeNotFound(public_id),
            other => Self::Repo(other),
        }
    }
}

/// Administrative mutation facade over both repositories.
pub struct AdminService<S: SpaceRepository, N: NodeRepository> {
    spaces: S,
    nodes: N,
}

impl<S: SpaceRepository, N: NodeRepository> AdminService<S, N> {
    /// Creates a service from repository implementations.
    pub fn new(spaces: S, nodes: N) -> Self {
        Self { spaces, nodes }
    }

    /// Creates one space with an optional owner.
    pub fn create_space(
        &self,
        title: impl Into<String>,
        owner: Option<PrincipalId>,
    ) -> Result<Space, AdminError> {
        let normalized = normalize_label(title.into()).ok_or(AdminError::InvalidTitle)?;
        self.spaces
            .create_space(normalized.as_str(), owner)
            .map_err(Into::into)
    }

    /// Grants the read-only viewer role on an active space.
    pub fn grant_viewer(
        &self,
        space: SpaceId,
        principal: PrincipalId,
    ) -> Result<(), AdminError> {
        self.spaces.add_viewer(space, principal).map_err(Into::into)
    }

    /// Exposes an existing active node into a space's viewport without
    /// reassigning node ownership.
    pub fn expose_node(&self, space: SpaceId, node: NodeId) -> Result<(), AdminError> {
        self.ensure_active_node(node)?;
        self.spaces.attach_node(space, node).map_err(Into::into)
    }

    /// Creates one node, optionally scoped to an active space.
    pub fn create_node(
        &self,
        name: impl Into<String>,
        space: Option<SpaceId>,
    ) -> Result<Node, AdminError> {
        let normalized = normalize_label(name.into()).ok_or(AdminError::InvalidName)?;
        if let Some(space) = space {
            self.ensure_active_space(space)?;
        }
        self.nodes
            .create_node(normalized.as_str(), space)
            .map_err(Into::into)
    }

    /// Records a directed subnode link between two active nodes.
    pub fn link_subnode(&self, parent: NodeId, child: NodeId) -> Result<(), AdminError> {
        if parent == child {
            return Err(AdminError::SelfLink(parent));
        }
        self.ensure_active_node(parent)?;
        self.ensure_active_node(child)?;
        self.nodes.link_subnode(parent, child).map_err(Into::into)
    }

    /// Creates or replaces the graph document attached to an active node.
    ///
    /// The payload must be a JSON object; its `nodes`/`edges` content is
    /// stored verbatim and only interpreted at read time.
    pub fn set_graph_document(&self, node: NodeId, payload: &str) -> Result<(), AdminError> {
        self.ensure_active_node(node)?;
        match serde_json::from_str::<serde_json::Value>(payload) {
            Ok(serde_json::Value::Object(_)) => {}
            Ok(other) => {
                return Err(AdminError::InvalidDocument(format!(
                    "expected a JSON object, got {other}"
                )));
            }
            Err(err) => return Err(AdminError::InvalidDocument(err.to_string())),
        }
        self.nodes
            .set_graph_document(node, payload)
            .map_err(Into::into)
    }

    /// Tombstones one node. Idempotent.
    pub fn remove_node(&self, node: NodeId) -> Result<(), AdminError> {
        self.nodes.remove_node(node).map_err(Into::into)
    }

    /// Tombstones one space. Idempotent. Scoped nodes stay untouched and
    /// disappear from visibility through the cascade predicate.
    pub fn remove_space(&self, space: SpaceId) -> Result<(), AdminError> {
        self.spaces.remove_space(space).map_err(Into::into)
    }

    /// Tombstones every active node owned by a space, returning a
    /// best-effort affected count.
    pub fn remove_space_nodes(&self, space: SpaceId) -> Result<usize, AdminError> {
        if self.spaces.get_space(space, Scope::All)?.is_none() {
            return Err(AdminError::SpaceNotFound(space));
        }
        self.nodes.remove_nodes_in_space(space).map_err(Into::into)
    }

    /// Physically deletes one node and its references. Escape hatch.
    pub fn hard_remove_node(&self, node: NodeId) -> Result<(), AdminError> {
        self.nodes.hard_remove_node(node).map_err(Into::into)
    }

    fn ensure_active_space(&self, space: SpaceId) -> Result<(), AdminError> {
        if self.spaces.get_space(space, Scope::Active)?.is_none() {
            return Err(AdminError::SpaceNotFound(space));
        }
        Ok(())
    }

    fn ensure_active_node(&self, node: NodeId) -> Result<(), AdminError> {
        if self.nodes.get_node(node, Scope::Active)?.is_none() {
            return Err(AdminError::NodeNotFound(node));
        }
        Ok(())
    }
}

fn normalize_label(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}
