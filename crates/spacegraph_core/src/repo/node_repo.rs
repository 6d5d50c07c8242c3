//! Node repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide persistence APIs for nodes, subnode adjacency and graph
//!   documents.
//! - Apply compiled visibility predicates in single queries.
//!
//! # Invariants
//! - Listing issues one SELECT regardless of result-set size.
//! - Subnode views resolve to surviving nodes at read time; tombstoned
//!   children disappear without an explicit unlink.
//! - `has_subnodes` is a one-level lookahead, never a subtree fetch.
//! - Graph document payloads are opaque text at this layer.

use crate::model::node::{Node, NodeId, NodeSummary};
use crate::model::space::SpaceId;
use crate::perm::{Action, Filter};
use crate::repo::soft_delete::{Scope, NODES};
use crate::repo::{ensure_connection_ready, parse_tombstone, parse_uuid, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, Transaction,
    TransactionBehavior};
use uuid::Uuid;

const NODE_SELECT_SQL: &str = "SELECT
    n.public_id AS public_id,
    n.name AS name,
    n.space_uuid AS space_uuid,
    n.is_removed AS is_removed,
    n.created_at AS created_at,
    n.updated_at AS updated_at
FROM nodes n";

// One-level lookahead over the adjacency index, restricted to survivors.
const HAS_SUBNODES_SQL: &str = "EXISTS(
    SELECT 1
    FROM node_subnodes ns_probe
    INNER JOIN nodes probe ON probe.public_id = ns_probe.child_uuid
    WHERE ns_probe.parent_uuid = {alias}.public_id
      AND probe.is_removed = 0
)";

/// Retrieval outcome pairing the row with its visibility verdict, so the
/// boundary can distinguish absence from denied access in one round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAccess {
    pub node: Node,
    pub visible: bool,
}

/// Repository interface for node graph operations.
pub trait NodeRepository {
    /// Creates one node, optionally scoped to a space.
    fn create_node(&self, name: &str, space: Option<SpaceId>) -> RepoResult<Node>;
    /// Loads one node by id within the requested scope.
    fn get_node(&self, public_id: NodeId, scope: Scope) -> RepoResult<Option<Node>>;
    /// Loads one active node together with its visibility verdict under the
    /// compiled predicate (alias `n`).
    fn get_node_with_access(
        &self,
        public_id: NodeId,
        visibility: &Filter,
    ) -> RepoResult<Option<NodeAccess>>;
    /// Lists active nodes matching a visibility predicate (alias `n`) in
    /// creation order, optionally conjoined with a narrowing predicate
    /// (alias `n`) built by the permission engine.
    fn list_visible(
        &self,
        visibility: &Filter,
        narrow: Option<&Filter>,
    ) -> RepoResult<Vec<NodeSummary>>;
    /// Lists active direct subnodes of `parent`, each annotated with the
    /// one-level `has_subnodes` lookahead. An optional predicate (alias
    /// `c`) further narrows to visible children.
    fn subnodes_of(
        &self,
        parent: NodeId,
        visibility: Option<&Filter>,
    ) -> RepoResult<Vec<NodeSummary>>;
    /// Evaluates the provided per-action predicates (alias `n`) against one
    /// active node in a single query, returning the granted actions.
    fn allowed_actions(
        &self,
        public_id: NodeId,
        filters: &[(Action, Filter)],
    ) -> RepoResult<Vec<Action>>;
    /// Records `child` as a direct subnode of `parent`. Idempotent.
    fn link_subnode(&self, parent: NodeId, child: NodeId) -> RepoResult<()>;
    /// Creates or replaces the graph document attached to `node`.
    fn set_graph_document(&self, node: NodeId, payload: &str) -> RepoResult<()>;
    /// Loads the raw graph document payload for `node`, if any.
    fn graph_document(&self, node: NodeId) -> RepoResult<Option<String>>;
    /// Tombstones one node. Idempotent.
    fn remove_node(&self, public_id: NodeId) -> RepoResult<()>;
    /// Tombstones every active node owned by `space` (foreign key), and
    /// reports a best-effort affected count.
    fn remove_nodes_in_space(&self, space: SpaceId) -> RepoResult<usize>;
    /// Physically deletes one node with its adjacency, membership and graph
    /// document rows. Administrative escape hatch.
    fn hard_remove_node(&self, public_id: NodeId) -> RepoResult<()>;
}

/// SQLite-backed node repository.
pub struct SqliteNodeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNodeRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl NodeRepository for SqliteNodeRepository<'_> {
    fn create_node(&self, name: &str, space: Option<SpaceId>) -> RepoResult<Node> {
        let public_id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO nodes (public_id, name, space_uuid)
             VALUES (?1, ?2, ?3);",
            params![
                public_id.to_string(),
                name,
                space.map(|value| value.to_string()),
            ],
        )?;
        load_required_node(self.conn, public_id)
    }

    fn get_node(&self, public_id: NodeId, scope: Scope) -> RepoResult<Option<Node>> {
        let sql = format!(
            "{NODE_SELECT_SQL}
             WHERE n.public_id = ?1
               AND {condition};",
            condition = scope.condition("n"),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([public_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_node_row(row)?));
        }
        Ok(None)
    }

    fn get_node_with_access(
        &self,
        public_id: NodeId,
        visibility: &Filter,
    ) -> RepoResult<Option<NodeAccess>> {
        let compiled = visibility.compile();
        let sql = format!(
            "SELECT
                n.public_id AS public_id,
                n.name AS name,
                n.space_uuid AS space_uuid,
                n.is_removed AS is_removed,
                n.created_at AS created_at,
                n.updated_at AS updated_at,
                CASE WHEN {predicate} THEN 1 ELSE 0 END AS visible
             FROM nodes n
             WHERE n.public_id = ?
               AND n.is_removed = 0;",
            predicate = compiled.sql,
        );

        // Predicate placeholders appear in the SELECT clause, so their bind
        // values precede the id.
        let mut bind_values = compiled.params;
        bind_values.push(Value::Text(public_id.to_string()));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        if let Some(row) = rows.next()? {
            let node = parse_node_row(row)?;
            let visible = row.get::<_, i64>("visible")? != 0;
            return Ok(Some(NodeAccess { node, visible }));
        }
        Ok(None)
    }

    fn list_visible(
        &self,
        visibility: &Filter,
        narrow: Option<&Filter>,
    ) -> RepoResult<Vec<NodeSummary>> {
        let compiled = visibility.compile();
        let mut sql = format!(
            "SELECT
                n.public_id AS public_id,
                n.name AS name,
                {lookahead} AS has_subnodes
             FROM nodes n
             WHERE n.is_removed = 0
               AND ({predicate})",
            lookahead = HAS_SUBNODES_SQL.replace("{alias}", "n"),
            predicate = compiled.sql,
        );
        let mut bind_values = compiled.params;

        if let Some(filter) = narrow {
            let compiled = filter.compile();
            sql.push_str("\n               AND (");
            sql.push_str(&compiled.sql);
            sql.push(')');
            bind_values.extend(compiled.params);
        }

        sql.push_str("\n             ORDER BY n.id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_summary_row(row)?);
        }
        Ok(items)
    }

    fn subnodes_of(
        &self,
        parent: NodeId,
        visibility: Option<&Filter>,
    ) -> RepoResult<Vec<NodeSummary>> {
        let mut sql = format!(
            "SELECT
                c.public_id AS public_id,
                c.name AS name,
                {lookahead} AS has_subnodes
             FROM node_subnodes ns
             INNER JOIN nodes c ON c.public_id = ns.child_uuid
             WHERE ns.parent_uuid = ?
               AND c.is_removed = 0",
            lookahead = HAS_SUBNODES_SQL.replace("{alias}", "c"),
        );
        let mut bind_values = vec![Value::Text(parent.to_string())];

        if let Some(filter) = visibility {
            let compiled = filter.compile();
            sql.push_str("\n               AND (");
            sql.push_str(&compiled.sql);
            sql.push(')');
            bind_values.extend(compiled.params);
        }

        sql.push_str("\n             ORDER BY c.id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_summary_row(row)?);
        }
        Ok(items)
    }

    fn allowed_actions(
        &self,
        public_id: NodeId,
        filters: &[(Action, Filter)],
    ) -> RepoResult<Vec<Action>> {
        if filters.is_empty() {
            return Ok(Vec::new());
        }

        let mut columns = Vec::new();
        let mut bind_values = Vec::new();
        for (index, (_, filter)) in filters.iter().enumerate() {
            let compiled = filter.compile();
            columns.push(format!(
                "CASE WHEN {predicate} THEN 1 ELSE 0 END AS granted_{index}",
                predicate = compiled.sql,
            ));
            bind_values.extend(compiled.params);
        }
        bind_values.push(Value::Text(public_id.to_string()));

        let sql = format!(
            "SELECT {columns}
             FROM nodes n
             WHERE n.public_id = ?
               AND n.is_removed = 0;",
            columns = columns.join(",\n                    "),
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let granted = stmt
            .query_row(params_from_iter(bind_values), |row| {
                let mut flags = Vec::with_capacity(filters.len());
                for index in 0..filters.len() {
                    flags.push(row.get::<_, i64>(index)?);
                }
                Ok(flags)
            })
            .optional()?;

        let Some(flags) = granted else {
            return Err(RepoError::NotFound {
                entity: "node",
                public_id,
            });
        };

        Ok(filters
            .iter()
            .zip(flags)
            .filter(|(_, flag)| *flag == 1)
            .map(|((action, _), _)| *action)
            .collect())
    }

    fn link_subnode(&self, parent: NodeId, child: NodeId) -> RepoResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO node_subnodes (parent_uuid, child_uuid)
             VALUES (?1, ?2);",
            params![parent.to_string(), child.to_string()],
        )?;
        Ok(())
    }

    fn set_graph_document(&self, node: NodeId, payload: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO graph_documents (public_id, payload)
             VALUES (?1, ?2)
             ON CONFLICT(public_id) DO UPDATE SET
                payload = excluded.payload,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![node.to_string(), payload],
        )?;
        Ok(())
    }

    fn graph_document(&self, node: NodeId) -> RepoResult<Option<String>> {
        let payload = self
            .conn
            .query_row(
                "SELECT payload
                 FROM graph_documents
                 WHERE public_id = ?1;",
                [node.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(payload)
    }

    fn remove_node(&self, public_id: NodeId) -> RepoResult<()> {
        NODES.remove(self.conn, public_id)
    }

    fn remove_nodes_in_space(&self, space: SpaceId) -> RepoResult<usize> {
        NODES.remove_where(
            self.conn,
            &Filter::Eq("space_uuid".to_string(), Value::Text(space.to_string())),
        )
    }

    fn hard_remove_node(&self, public_id: NodeId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let id_text = public_id.to_string();

        tx.execute(
            "DELETE FROM node_subnodes WHERE parent_uuid = ?1 OR child_uuid = ?1;",
            [id_text.as_str()],
        )?;
        tx.execute(
            "DELETE FROM space_nodes WHERE node_uuid = ?1;",
            [id_text.as_str()],
        )?;
        tx.execute(
            "DELETE FROM graph_documents WHERE public_id = ?1;",
            [id_text.as_str()],
        )?;
        let changed = tx.execute("DELETE FROM nodes WHERE public_id = ?1;", [id_text.as_str()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "node",
                public_id,
            });
        }
        tx.commit()?;
        Ok(())
    }
}

fn load_required_node(conn: &Connection, public_id: NodeId) -> RepoResult<Node> {
    let sql = format!(
        "{NODE_SELECT_SQL}
         WHERE n.public_id = ?1
           AND n.is_removed = 0;"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([public_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return parse_node_row(row);
    }
    Err(RepoError::NotFound {
        entity: "node",
        public_id,
    })
}

fn parse_node_row(row: &Row<'_>) -> RepoResult<Node> {
    let public_id_text: String = row.get("public_id")?;
    let public_id = parse_uuid(&public_id_text, "nodes.public_id")?;

    let space_uuid = row
        .get::<_, Option<String>>("space_uuid")?
        .map(|value| parse_uuid(&value, "nodes.space_uuid"))
        .transpose()?;

    let is_removed = parse_tombstone(row.get("is_removed")?, "nodes.is_removed")?;

    Ok(Node {
        public_id,
        name: row.get("name")?,
        space_uuid,
        is_removed,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_summary_row(row: &Row<'_>) -> RepoResult<NodeSummary> {
    let public_id_text: String = row.get("public_id")?;
    let public_id = parse_uuid(&public_id_text, "nodes.public_id")?;
    let has_subnodes = row.get::<_, i64>("has_subnodes")? == 1;

    Ok(NodeSummary {
        public_id,
        name: row.get("name")?,
        has_subnodes,
    })
}
