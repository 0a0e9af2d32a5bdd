//! Append-only inventory history for chemicals.
//!
//! Entries are only ever inserted. Deleting a chemical leaves its history
//! in place, and nothing here ever writes back to `chemicals.quantity`;
//! the log records movements, it does not apply them.

use std::fmt;
use std::str::FromStr;

use may_postgres::Row;
use sea_query::{Asterisk, Expr, ExprTrait, Iden, InsertStatement, Order, SelectStatement};
use serde::{Deserialize, Serialize};

use crate::chemicals::chemical_exists;
use crate::config::DatabaseConfig;
use crate::connection::connect;
use crate::error::{DbError, StoreError};
use crate::pool::PgPool;
use crate::query::{self, FromRow};
use crate::transaction::Transaction;

/// `inventory_logs` table and column identifiers for the query builder
pub enum InventoryLogs {
    Table,
    Id,
    ChemicalId,
    ActionType,
    Quantity,
    Timestamp,
}

impl Iden for InventoryLogs {
    fn unquoted(&self) -> &str {
        match self {
            InventoryLogs::Table => "inventory_logs",
            InventoryLogs::Id => "id",
            InventoryLogs::ChemicalId => "chemical_id",
            InventoryLogs::ActionType => "action_type",
            InventoryLogs::Quantity => "quantity",
            InventoryLogs::Timestamp => "timestamp",
        }
    }
}

/// The movement kinds a log entry may record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Add,
    Remove,
    Update,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Add => "add",
            ActionType::Remove => "remove",
            ActionType::Update => "update",
        }
    }
}

impl FromStr for ActionType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(ActionType::Add),
            "remove" => Ok(ActionType::Remove),
            "update" => Ok(ActionType::Update),
            _ => Err(StoreError::InvalidInput(format!(
                "action_type must be one of: add, remove, update (got '{s}')"
            ))),
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A log entry as stored, including the server-assigned id and timestamp
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryLog {
    pub id: i32,
    pub chemical_id: i32,
    pub action_type: ActionType,
    pub quantity: f64,
    pub timestamp: chrono::NaiveDateTime,
}

impl FromRow for InventoryLog {
    fn from_row(row: &Row) -> Result<Self, DbError> {
        let action: String = row.try_get("action_type")?;
        Ok(InventoryLog {
            id: row.try_get("id")?,
            chemical_id: row.try_get("chemical_id")?,
            action_type: action
                .parse()
                .map_err(|_| DbError::DecodeError(format!("unknown action_type '{action}'")))?,
            quantity: row.try_get("quantity")?,
            timestamp: row.try_get("timestamp")?,
        })
    }
}

/// Fields required to append a log entry.
///
/// The action type stays a plain string on the wire; the store validates
/// it before touching the database.
#[derive(Debug, Clone, Deserialize)]
pub struct NewInventoryLog {
    pub action_type: String,
    pub quantity: f64,
}

fn insert_stmt(chemical_id: i32, action: ActionType, quantity: f64) -> InsertStatement {
    let mut stmt = InsertStatement::default();
    stmt.into_table(InventoryLogs::Table)
        .columns([
            InventoryLogs::ChemicalId,
            InventoryLogs::ActionType,
            InventoryLogs::Quantity,
        ])
        .values_panic([
            Expr::val(chemical_id),
            Expr::val(action.as_str()),
            Expr::val(quantity),
        ])
        .returning_col(Asterisk);
    stmt
}

fn select_all_stmt() -> SelectStatement {
    let mut stmt = SelectStatement::default();
    stmt.column(Asterisk)
        .from(InventoryLogs::Table)
        .order_by(InventoryLogs::Timestamp, Order::Desc);
    stmt
}

fn select_by_id_stmt(id: i32) -> SelectStatement {
    let mut stmt = SelectStatement::default();
    stmt.column(Asterisk)
        .from(InventoryLogs::Table)
        .and_where(Expr::col(InventoryLogs::Id).eq(id));
    stmt
}

fn select_by_chemical_stmt(chemical_id: i32) -> SelectStatement {
    let mut stmt = SelectStatement::default();
    stmt.column(Asterisk)
        .from(InventoryLogs::Table)
        .and_where(Expr::col(InventoryLogs::ChemicalId).eq(chemical_id))
        .order_by(InventoryLogs::Timestamp, Order::Desc);
    stmt
}

/// Append-only access to the `inventory_logs` table.
///
/// Connection handling mirrors [`ChemicalStore`](crate::chemicals::ChemicalStore):
/// single-record reads use a fresh direct connection, list reads and the
/// append use the shared pool.
#[derive(Clone)]
pub struct InventoryLogStore {
    pool: PgPool,
    database_url: String,
}

impl InventoryLogStore {
    pub fn new(pool: PgPool, cfg: &DatabaseConfig) -> Self {
        InventoryLogStore {
            pool,
            database_url: cfg.url.clone(),
        }
    }

    /// Validate and append one history entry for a chemical.
    ///
    /// The existence check and the insert share a transaction, so an entry
    /// can never land for a chemical deleted in between.
    ///
    /// # Errors
    ///
    /// `StoreError::InvalidInput` for an unknown action type,
    /// `StoreError::NotFound` when the chemical does not exist.
    pub fn append(
        &self,
        chemical_id: i32,
        new: &NewInventoryLog,
    ) -> Result<InventoryLog, StoreError> {
        let action: ActionType = new.action_type.parse()?;

        let conn = self.pool.get()?;
        let txn = Transaction::begin(conn.client())?;
        if !chemical_exists(&txn, chemical_id)? {
            return Err(StoreError::NotFound("Chemical"));
        }
        let entry: InventoryLog =
            query::insert_returning(&txn, &insert_stmt(chemical_id, action, new.quantity))?;
        txn.commit()?;

        log::debug!(
            "appended {} log {} for chemical {}",
            entry.action_type,
            entry.id,
            chemical_id
        );
        Ok(entry)
    }

    /// List every log entry, newest first
    pub fn all(&self) -> Result<Vec<InventoryLog>, StoreError> {
        let client = self.pool.get()?;
        Ok(query::select_all(&client, &select_all_stmt())?)
    }

    /// Fetch one log entry by id
    pub fn by_id(&self, id: i32) -> Result<InventoryLog, StoreError> {
        let client = connect(&self.database_url)?;
        query::select_opt(&client, &select_by_id_stmt(id))?
            .ok_or(StoreError::NotFound("Inventory log"))
    }

    /// List one chemical's history, newest first.
    ///
    /// The chemical must still exist: history of a deleted chemical stays
    /// in the table but is only reachable through [`Self::all`].
    pub fn by_chemical(&self, chemical_id: i32) -> Result<Vec<InventoryLog>, StoreError> {
        let client = connect(&self.database_url)?;
        if !chemical_exists(&client, chemical_id)? {
            return Err(StoreError::NotFound("Chemical"));
        }
        Ok(query::select_all(&client, &select_by_chemical_stmt(chemical_id))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_query::PostgresQueryBuilder;

    #[test]
    fn test_action_type_parse_and_display() {
        assert_eq!("add".parse::<ActionType>().unwrap(), ActionType::Add);
        assert_eq!("remove".parse::<ActionType>().unwrap(), ActionType::Remove);
        assert_eq!("update".parse::<ActionType>().unwrap(), ActionType::Update);
        assert_eq!(ActionType::Remove.to_string(), "remove");
    }

    #[test]
    fn test_action_type_rejects_unknown_values() {
        let err = "destroy".parse::<ActionType>().unwrap_err();
        assert!(err.is_client_error());
        assert!(err
            .to_string()
            .contains("action_type must be one of: add, remove, update"));
    }

    #[test]
    fn test_action_type_is_case_sensitive() {
        assert!("Add".parse::<ActionType>().is_err());
        assert!("ADD".parse::<ActionType>().is_err());
    }

    #[test]
    fn test_action_type_wire_format() {
        assert_eq!(serde_json::to_string(&ActionType::Add).unwrap(), r#""add""#);
    }

    #[test]
    fn test_insert_statement_shape() {
        let (sql, values) = insert_stmt(4, ActionType::Add, 1.5).build(PostgresQueryBuilder);
        assert_eq!(
            sql,
            r#"INSERT INTO "inventory_logs" ("chemical_id", "action_type", "quantity") VALUES ($1, $2, $3) RETURNING *"#
        );
        assert_eq!(values.iter().count(), 3);
    }

    #[test]
    fn test_list_statements_return_newest_first() {
        let (sql, _) = select_all_stmt().build(PostgresQueryBuilder);
        assert_eq!(sql, r#"SELECT * FROM "inventory_logs" ORDER BY "timestamp" DESC"#);

        let (sql, values) = select_by_chemical_stmt(4).build(PostgresQueryBuilder);
        assert_eq!(
            sql,
            r#"SELECT * FROM "inventory_logs" WHERE "chemical_id" = $1 ORDER BY "timestamp" DESC"#
        );
        assert_eq!(values.iter().count(), 1);
    }
}
