//! Read-oriented node facade consumed by the boundary layer.
//!
//! # Responsibility
//! - Translate external parameters into permission-filtered store calls.
//! - Shape list/retrieve/context-action results for the boundary.
//!
//! # Invariants
//! - Retrieval by id distinguishes absence (`NotFound`) from denied access
//!   (`Forbidden`); listing narrows silently instead of failing.
//! - Every listing is a single compiled query: result size never changes
//!   the storage round-trip count.
//! - Mutation through this facade is rejected for every principal.

use crate::graph::{compute_context_actions, parse_payload};
use crate::model::node::{Node, NodeId, NodeSummary};
use crate::model::space::SpaceId;
use crate::perm::{node_visibility_filter, space_narrow_filter, Action, Principal};
use crate::repo::node_repo::NodeRepository;
use crate::repo::RepoError;
use log::{info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// External listing parameters, carried as raw boundary input.
#[derive(Debug, Clone, Default)]
pub struct NodeQuery {
    /// Optional `space=<public_id>` narrowing, unparsed.
    pub space: Option<String>,
}

/// Listing envelope returned to the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeList {
    pub count: usize,
    pub items: Vec<NodeSummary>,
}

/// Retrieval shape returned to the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDetail {
    pub public_id: NodeId,
    pub name: String,
    pub subnodes: Vec<NodeSummary>,
    /// Present only when the caller requested permission evaluation.
    pub allowed_actions: Option<Vec<Action>>,
}

/// Facade error taxonomy surfaced verbatim to the boundary.
#[derive(Debug)]
pub enum ServiceError {
    /// Entity absent or soft-deleted.
    NotFound(Uuid),
    /// Entity exists and is active, but the principal lacks the action.
    Forbidden(Uuid),
    /// Malformed boundary input, e.g. a non-UUID identifier.
    Validation(String),
    /// Attempted mutation through the read-only boundary.
    MethodNotAllowed(&'static str),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "node not found: {id}"),
            Self::Forbidden(id) => write!(f, "access denied to node: {id}"),
            Self::Validation(message) => write!(f, "invalid request input: {message}"),
            Self::MethodNotAllowed(operation) => {
                write!(f, "operation `{operation}` is not allowed on this boundary")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Read facade over the node graph store.
pub struct NodeService<R: NodeRepository> {
    repo: R,
}

impl<R: NodeRepository> NodeService<R> {
    /// Creates a facade from a repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Lists active nodes visible to `principal`, optionally narrowed to
    /// one space.
    ///
    /// # Contract
    /// - Items keep creation order.
    /// - Narrowing to an invisible or unknown space yields zero rows, not
    ///   `Forbidden`: listing is inherently visibility-narrowing.
    pub fn list_nodes(
        &self,
        principal: &Principal,
        query: &NodeQuery,
    ) -> Result<NodeList, ServiceError> {
        let space: Option<SpaceId> = query.space.as_deref().map(parse_public_id).transpose()?;

        let visibility = node_visibility_filter(principal, Action::Read, "n");
        let narrow = space.map(|space| space_narrow_filter(principal, Action::Read, space, "n"));
        let items = self.repo.list_visible(&visibility, narrow.as_ref())?;
        info!(
            "event=node_list module=service status=ok count={} narrowed={}",
            items.len(),
            space.is_some()
        );
        Ok(NodeList {
            count: items.len(),
            items,
        })
    }

    /// Retrieves one node by its external identifier.
    ///
    /// # Contract
    /// - Absent or soft-deleted node: `NotFound`, even for principals who
    ///   would otherwise hold access.
    /// - Active but invisible node: `Forbidden`.
    /// - `subnodes` lists surviving direct children with the one-level
    ///   `has_subnodes` lookahead.
    /// - `show_permissions` attaches the granted action set, evaluated for
    ///   all four actions in one query.
    pub fn get_node(
        &self,
        principal: &Principal,
        id: &str,
        show_permissions: bool,
    ) -> Result<NodeDetail, ServiceError> {
        let public_id = parse_public_id(id)?;
        let node = self.require_visible(principal, public_id)?;
        let subnodes = self.repo.subnodes_of(public_id, None)?;

        let allowed_actions = if show_permissions {
            let filters = Action::ALL
                .map(|action| (action, node_visibility_filter(principal, action, "n")));
            Some(self.repo.allowed_actions(public_id, &filters)?)
        } else {
            None
        };

        info!(
            "event=node_get module=service status=ok node={public_id} subnodes={} permissions_requested={show_permissions}",
            subnodes.len()
        );

        Ok(NodeDetail {
            public_id: node.public_id,
            name: node.name,
            subnodes,
            allowed_actions,
        })
    }

    /// Computes prerequisite statements for one node's graph document.
    ///
    /// # Contract
    /// - Access is gated like `get_node`.
    /// - A missing document yields an empty sequence.
    /// - A malformed document degrades to an empty sequence.
    /// - Only edges between currently visible subnodes produce statements.
    pub fn get_context_actions(
        &self,
        principal: &Principal,
        id: &str,
    ) -> Result<Vec<String>, ServiceError> {
        let public_id = parse_public_id(id)?;
        self.require_visible(principal, public_id)?;

        let Some(raw) = self.repo.graph_document(public_id)? else {
            return Ok(Vec::new());
        };

        let Some(payload) = parse_payload(&raw) else {
            warn!(
                "event=context_actions module=service status=degraded reason=malformed_document node={public_id}"
            );
            return Ok(Vec::new());
        };

        let visibility = node_visibility_filter(principal, Action::Read, "c");
        let visible_subnodes: HashSet<String> = self
            .repo
            .subnodes_of(public_id, Some(&visibility))?
            .into_iter()
            .map(|summary| summary.public_id.to_string())
            .collect();

        let statements: Vec<String> = compute_context_actions(&payload, &visible_subnodes)
            .into_iter()
            .map(|action| action.statement)
            .collect();
        info!(
            "event=context_actions module=service status=ok node={public_id} statements={}",
            statements.len()
        );
        Ok(statements)
    }

    /// Boundary write rejection: node creation is administrative only.
    pub fn create_node(&self, _principal: &Principal) -> Result<NodeDetail, ServiceError> {
        Err(ServiceError::MethodNotAllowed("create_node"))
    }

    /// Boundary write rejection: node update is administrative only.
    pub fn update_node(&self, _principal: &Principal, _id: &str) -> Result<NodeDetail, ServiceError> {
        Err(ServiceError::MethodNotAllowed("update_node"))
    }

    /// Boundary write rejection: node deletion is administrative only.
    pub fn delete_node(&self, _principal: &Principal, _id: &str) -> Result<(), ServiceError> {
        Err(ServiceError::MethodNotAllowed("delete_node"))
    }

    fn require_visible(
        &self,
        principal: &Principal,
        public_id: NodeId,
    ) -> Result<Node, ServiceError> {
        let visibility = node_visibility_filter(principal, Action::Read, "n");
        let access = self
            .repo
            .get_node_with_access(public_id, &visibility)?
            .ok_or(ServiceError::NotFound(public_id))?;
        if !access.visible {
            return Err(ServiceError::Forbidden(public_id));
        }
        Ok(access.node)
    }
}

fn parse_public_id(raw: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw.trim()).map_err(|_| {
        ServiceError::Validation(format!("invalid identifier `{raw}`; expected a UUID"))
    })
}
