//! Permission engine: actions, principals and visibility predicates.
//!
//! # Responsibility
//! - Define the enumerated action set and its capability ordering.
//! - Build declarative visibility filters for spaces and nodes.
//!
//! # Invariants
//! - Owner holds all four actions; viewer holds `Read` only; anonymous
//!   principals hold nothing.
//! - Visibility of a node is derived transitively through spaces: the
//!   owning space (foreign key) or any space exposing the node via
//!   membership, each evaluated only while the space survives.
//! - A node whose owning space is removed is invisible regardless of any
//!   other grant.
//! - Filters compile to one SQL predicate so listing N rows costs a
//!   constant number of storage round trips.

use rusqlite::types::Value;
use uuid::Uuid;

pub mod filter;

pub use filter::{CompiledFilter, Filter};

use crate::model::space::{PrincipalId, SpaceId};

/// Enumerated permission actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
    Manage,
    Delete,
}

impl Action {
    /// All actions in stable reporting order.
    pub const ALL: [Action; 4] = [Action::Read, Action::Write, Action::Manage, Action::Delete];

    /// Stable lowercase label for serialization and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Manage => "manage",
            Self::Delete => "delete",
        }
    }

    /// Whether the viewer role grants this action. Viewers are read-only.
    pub fn granted_to_viewers(self) -> bool {
        matches!(self, Self::Read)
    }
}

/// Acting identity for which visibility is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    /// Unauthenticated caller. Matches no role binding.
    Anonymous,
    /// Authenticated user with a stable principal ID.
    User(PrincipalId),
}

impl Principal {
    /// Returns the user ID for authenticated principals.
    pub fn user_id(&self) -> Option<PrincipalId> {
        match self {
            Self::Anonymous => None,
            Self::User(id) => Some(*id),
        }
    }
}

/// Builds the predicate deciding whether space `alias` grants `action` to
/// `principal`.
///
/// Owner match covers every action; the viewer binding only contributes for
/// read. Anonymous principals compile to a match-nothing predicate.
pub fn space_grant_filter(principal: &Principal, action: Action, alias: &str) -> Filter {
    let Principal::User(user) = principal else {
        return Filter::Any(Vec::new());
    };

    let mut grants = vec![Filter::Eq(format!("{alias}.owner_uuid"), text(*user))];
    if action.granted_to_viewers() {
        grants.push(Filter::Exists {
            from: "space_viewers v".to_string(),
            predicate: Box::new(Filter::All(vec![
                Filter::ColEq("v.space_uuid".to_string(), format!("{alias}.public_id")),
                Filter::Eq("v.principal_uuid".to_string(), text(*user)),
            ])),
        });
    }
    Filter::Any(grants)
}

/// Builds the visibility predicate for space rows under alias `alias`.
pub fn space_visibility_filter(principal: &Principal, action: Action, alias: &str) -> Filter {
    Filter::All(vec![
        Filter::Eq(format!("{alias}.is_removed"), Value::Integer(0)),
        space_grant_filter(principal, action, alias),
    ])
}

/// Builds the visibility predicate for node rows under alias `alias`.
///
/// Does not include the node's own tombstone condition; callers combine this
/// with an explicit scope so intent stays visible at the query site.
pub fn node_visibility_filter(principal: &Principal, action: Action, alias: &str) -> Filter {
    // Cascade: a removed owning space hides the node regardless of grants.
    let owning_space_alive = Filter::Any(vec![
        Filter::IsNull(format!("{alias}.space_uuid")),
        Filter::Exists {
            from: "spaces os".to_string(),
            predicate: Box::new(Filter::All(vec![
                Filter::ColEq("os.public_id".to_string(), format!("{alias}.space_uuid")),
                Filter::Eq("os.is_removed".to_string(), Value::Integer(0)),
            ])),
        },
    ]);

    let granted_via_space = match principal {
        Principal::Anonymous => Filter::Any(Vec::new()),
        Principal::User(_) => Filter::Exists {
            from: "spaces s".to_string(),
            predicate: Box::new(Filter::All(vec![
                Filter::Eq("s.is_removed".to_string(), Value::Integer(0)),
                Filter::Any(vec![
                    Filter::ColEq("s.public_id".to_string(), format!("{alias}.space_uuid")),
                    Filter::Exists {
                        from: "space_nodes m".to_string(),
                        predicate: Box::new(Filter::All(vec![
                            Filter::ColEq("m.space_uuid".to_string(), "s.public_id".to_string()),
                            Filter::ColEq("m.node_uuid".to_string(), format!("{alias}.public_id")),
                        ])),
                    },
                ]),
                space_grant_filter(principal, action, "s"),
            ])),
        },
    };

    Filter::All(vec![owning_space_alive, granted_via_space])
}

/// Builds the predicate narrowing node rows under alias `alias` to one
/// space, matched by foreign key or membership.
///
/// The narrowing space must itself be active and grant `action` to
/// `principal`: narrowing to an invisible or unknown space matches nothing,
/// so a listing never discloses which rows a hidden space references.
pub fn space_narrow_filter(
    principal: &Principal,
    action: Action,
    space: SpaceId,
    alias: &str,
) -> Filter {
    Filter::All(vec![
        Filter::Any(vec![
            Filter::Eq(format!("{alias}.space_uuid"), text(space)),
            Filter::Exists {
                from: "space_nodes narrow".to_string(),
                predicate: Box::new(Filter::All(vec![
                    Filter::Eq("narrow.space_uuid".to_string(), text(space)),
                    Filter::ColEq("narrow.node_uuid".to_string(), format!("{alias}.public_id")),
                ])),
            },
        ]),
        Filter::Exists {
            from: "spaces fsp".to_string(),
            predicate: Box::new(Filter::All(vec![
                Filter::Eq("fsp.public_id".to_string(), text(space)),
                Filter::Eq("fsp.is_removed".to_string(), Value::Integer(0)),
                space_grant_filter(principal, action, "fsp"),
            ])),
        },
    ])
}

fn text(value: Uuid) -> Value {
    Value::Text(value.to_string())
}
