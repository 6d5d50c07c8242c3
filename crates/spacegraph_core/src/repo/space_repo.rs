//! Space repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide persistence APIs for spaces and their role bindings.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Only active (`is_removed = 0`) spaces accept new bindings.
//! - Role bindings are insert-or-ignore: granting twice is a no-op.
//! - Visibility listings apply one compiled predicate per query.

use crate::model::node::NodeId;
use crate::model::space::{PrincipalId, Space, SpaceId};
use crate::perm::Filter;
use crate::repo::soft_delete::{Scope, SPACES};
use crate::repo::{ensure_connection_ready, parse_tombstone, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const SPACE_SELECT_SQL: &str = "SELECT
    sp.public_id AS public_id,
    sp.title AS title,
    sp.owner_uuid AS owner_uuid,
    sp.is_removed AS is_removed,
    sp.created_at AS created_at,
    sp.updated_at AS updated_at
FROM spaces sp";

/// Repository interface for space operations.
pub trait SpaceRepository {
    /// Creates one space with an optional owner binding.
    fn create_space(&self, title: &str, owner: Option<PrincipalId>) -> RepoResult<Space>;
    /// Loads one space by id within the requested scope.
    fn get_space(&self, public_id: SpaceId, scope: Scope) -> RepoResult<Option<Space>>;
    /// Lists spaces matching a compiled visibility predicate (alias `sp`).
    fn list_visible(&self, visibility: &Filter) -> RepoResult<Vec<Space>>;
    /// Grants the read-only viewer role to a principal.
    fn add_viewer(&self, space: SpaceId, principal: PrincipalId) -> RepoResult<()>;
    /// Exposes an existing node into this space's viewport without
    /// reassigning node ownership.
    fn attach_node(&self, space: SpaceId, node: NodeId) -> RepoResult<()>;
    /// Tombstones one space. Idempotent.
    fn remove_space(&self, public_id: SpaceId) -> RepoResult<()>;
}

/// SQLite-backed space repository.
pub struct SqliteSpaceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSpaceRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl SpaceRepository for SqliteSpaceRepository<'_> {
    fn create_space(&self, title: &str, owner: Option<PrincipalId>) -> RepoResult<Space> {
        let public_id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO spaces (public_id, title, owner_uuid)
             VALUES (?1, ?2, ?3);",
            params![
                public_id.to_string(),
                title,
                owner.map(|value| value.to_string()),
            ],
        )?;
        load_required_space(self.conn, public_id)
    }

    fn get_space(&self, public_id: SpaceId, scope: Scope) -> RepoResult<Option<Space>> {
        let sql = format!(
            "{SPACE_SELECT_SQL}
             WHERE sp.public_id = ?1
               AND {condition};",
            condition = scope.condition("sp"),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([public_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_space_row(row)?));
        }
        Ok(None)
    }

    fn list_visible(&self, visibility: &Filter) -> RepoResult<Vec<Space>> {
        let compiled = visibility.compile();
        let sql = format!(
            "{SPACE_SELECT_SQL}
             WHERE {predicate}
             ORDER BY sp.id ASC;",
            predicate = compiled.sql,
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(compiled.params))?;
        let mut spaces = Vec::new();
        while let Some(row) = rows.next()? {
            spaces.push(parse_space_row(row)?);
        }
        Ok(spaces)
    }

    fn add_viewer(&self, space: SpaceId, principal: PrincipalId) -> RepoResult<()> {
        self.ensure_active_space(space)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO space_viewers (space_uuid, principal_uuid)
             VALUES (?1, ?2);",
            params![space.to_string(), principal.to_string()],
        )?;
        Ok(())
    }

    fn attach_node(&self, space: SpaceId, node: NodeId) -> RepoResult<()> {
        self.ensure_active_space(space)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO space_nodes (space_uuid, node_uuid)
             VALUES (?1, ?2);",
            params![space.to_string(), node.to_string()],
        )?;
        Ok(())
    }

    fn remove_space(&self, public_id: SpaceId) -> RepoResult<()> {
        SPACES.remove(self.conn, public_id)
    }
}

impl SqliteSpaceRepository<'_> {
    fn ensure_active_space(&self, space: SpaceId) -> RepoResult<()> {
        if !SPACES.exists(self.conn, space, Scope::Active)? {
            return Err(RepoError::NotFound {
                entity: "space",
                public_id: space,
            });
        }
        Ok(())
    }
}

fn load_required_space(conn: &Connection, public_id: SpaceId) -> RepoResult<Space> {
    let sql = format!(
        "{SPACE_SELECT_SQL}
         WHERE sp.public_id = ?1
           AND sp.is_removed = 0;"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([public_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return parse_space_row(row);
    }
    Err(RepoError::NotFound {
        entity: "space",
        public_id,
    })
}

fn parse_space_row(row: &Row<'_>) -> RepoResult<Space> {
    let public_id_text: String = row.get("public_id")?;
    let public_id = parse_uuid(&public_id_text, "spaces.public_id")?;

    let owner_uuid = row
        .get::<_, Option<String>>("owner_uuid")?
        .map(|value| parse_uuid(&value, "spaces.owner_uuid"))
        .transpose()?;

    let is_removed = parse_tombstone(row.get("is_removed")?, "spaces.is_removed")?;

    Ok(Space {
        public_id,
        title: row.get("title")?,
        owner_uuid,
        is_removed,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
