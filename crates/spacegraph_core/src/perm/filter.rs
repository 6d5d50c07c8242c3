//! Declarative predicate expressions compiled to SQL.
//!
//! # Responsibility
//! - Describe row predicates as a small expression tree.
//! - Compile one tree into a single SQL fragment plus bind values.
//!
//! # Invariants
//! - Compilation is pure: the same tree always yields the same SQL text.
//! - Bind values appear in the exact order of their `?` placeholders.
//! - A compiled fragment is always a valid boolean expression, never a
//!   statement of its own.

use rusqlite::types::Value;

/// Row predicate expression.
///
/// Column operands are raw SQL column references (optionally alias-qualified)
/// supplied by core code only; user input is always carried as a bind value.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Conjunction. Empty matches every row.
    All(Vec<Filter>),
    /// Disjunction. Empty matches no row.
    Any(Vec<Filter>),
    /// Column equals bound value.
    Eq(String, Value),
    /// Column equals column (correlated reference).
    ColEq(String, String),
    /// Column is SQL NULL.
    IsNull(String),
    /// Correlated `EXISTS (SELECT 1 FROM <from> WHERE <predicate>)`.
    Exists {
        from: String,
        predicate: Box<Filter>,
    },
}

/// Compiled form of a `Filter`: SQL fragment plus ordered bind values.
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Filter {
    /// Compiles this expression into one SQL fragment and its bind values.
    pub fn compile(&self) -> CompiledFilter {
        let mut sql = String::new();
        let mut params = Vec::new();
        self.write_sql(&mut sql, &mut params);
        CompiledFilter { sql, params }
    }

    fn write_sql(&self, sql: &mut String, params: &mut Vec<Value>) {
        match self {
            Self::All(items) if items.is_empty() => sql.push_str("1 = 1"),
            Self::Any(items) if items.is_empty() => sql.push_str("0 = 1"),
            Self::All(items) | Self::Any(items) => {
                let separator = match self {
                    Self::All(_) => " AND ",
                    _ => " OR ",
                };
                sql.push('(');
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        sql.push_str(separator);
                    }
                    item.write_sql(sql, params);
                }
                sql.push(')');
            }
            Self::Eq(column, value) => {
                sql.push_str(column);
                sql.push_str(" = ?");
                params.push(value.clone());
            }
            Self::ColEq(left, right) => {
                sql.push_str(left);
                sql.push_str(" = ");
                sql.push_str(right);
            }
            Self::IsNull(column) => {
                sql.push_str(column);
                sql.push_str(" IS NULL");
            }
            Self::Exists { from, predicate } => {
                sql.push_str("EXISTS (SELECT 1 FROM ");
                sql.push_str(from);
                sql.push_str(" WHERE ");
                predicate.write_sql(sql, params);
                sql.push(')');
            }
        }
    }
}
