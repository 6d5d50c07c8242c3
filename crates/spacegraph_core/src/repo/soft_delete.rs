//! Soft-delete storage wrapper shared by every tombstoned table.
//!
//! # Responsibility
//! - Enforce the soft-delete invariant for one entity table.
//! - Keep the active/all distinction explicit at every call site.
//!
//! # Invariants
//! - `remove` is idempotent: removing an already-removed row is a no-op.
//! - `Scope::Active` never exposes a row whose tombstone is set.
//! - Bulk removal substitutes tombstoning for physical deletion and reports
//!   a best-effort affected-row count.

use crate::perm::Filter;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params_from_iter, Connection};
use uuid::Uuid;

/// Read scope for tombstoned tables.
///
/// There is deliberately no default: callers state intent explicitly so the
/// administrative view is never reachable by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Only rows with `is_removed = 0`. The default surface for every
    /// non-administrative component.
    Active,
    /// Every row regardless of removal state. Administrative access.
    All,
}

impl Scope {
    /// SQL condition for this scope against alias `alias`.
    pub fn condition(self, alias: &str) -> String {
        match self {
            Self::Active => format!("{alias}.is_removed = 0"),
            Self::All => "1 = 1".to_string(),
        }
    }
}

/// Soft-delete operations for one entity table.
///
/// Every wrapped table carries `public_id`, `is_removed` and `updated_at`
/// columns in the shapes created by the embedded migrations.
#[derive(Debug, Clone, Copy)]
pub struct SoftDeleteTable {
    pub table: &'static str,
    pub entity: &'static str,
}

/// Wrapper for the `spaces` table.
pub const SPACES: SoftDeleteTable = SoftDeleteTable {
    table: "spaces",
    entity: "space",
};

/// Wrapper for the `nodes` table.
pub const NODES: SoftDeleteTable = SoftDeleteTable {
    table: "nodes",
    entity: "node",
};

impl SoftDeleteTable {
    /// Returns whether a row with `public_id` exists in `scope`.
    pub fn exists(&self, conn: &Connection, public_id: Uuid, scope: Scope) -> RepoResult<bool> {
        let sql = format!(
            "SELECT EXISTS(
                SELECT 1 FROM {table} t
                WHERE t.public_id = ?1 AND {condition}
            );",
            table = self.table,
            condition = scope.condition("t"),
        );
        let exists: i64 = conn.query_row(&sql, [public_id.to_string()], |row| row.get(0))?;
        Ok(exists == 1)
    }

    /// Sets the tombstone on one row.
    ///
    /// # Contract
    /// - Removing an already-removed row succeeds with no further effect.
    /// - Removing an absent row is `NotFound`.
    /// - The tombstone flip is a single-column atomic update.
    pub fn remove(&self, conn: &Connection, public_id: Uuid) -> RepoResult<()> {
        let changed = conn.execute(
            &format!(
                "UPDATE {table}
                 SET is_removed = 1,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE public_id = ?1
                   AND is_removed = 0;",
                table = self.table,
            ),
            [public_id.to_string()],
        )?;

        if changed == 0 && !self.exists(conn, public_id, Scope::All)? {
            return Err(RepoError::NotFound {
                entity: self.entity,
                public_id,
            });
        }

        Ok(())
    }

    /// Physically deletes one row. Administrative escape hatch.
    pub fn hard_remove(&self, conn: &Connection, public_id: Uuid) -> RepoResult<()> {
        let changed = conn.execute(
            &format!(
                "DELETE FROM {table} WHERE public_id = ?1;",
                table = self.table
            ),
            [public_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: self.entity,
                public_id,
            });
        }
        Ok(())
    }

    /// Tombstones every active row matching `filter`.
    ///
    /// Filter columns are bare (unaliased) column names of this table. The
    /// returned count is best-effort: it reports rows flipped by this call,
    /// which is not required to be an exact affected-row accounting.
    pub fn remove_where(&self, conn: &Connection, filter: &Filter) -> RepoResult<usize> {
        let compiled = filter.compile();
        let sql = format!(
            "UPDATE {table}
             SET is_removed = 1,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE is_removed = 0
               AND ({predicate});",
            table = self.table,
            predicate = compiled.sql,
        );
        let changed = conn.execute(&sql, params_from_iter(compiled.params))?;
        Ok(changed)
    }
}
