//! Chemical records: wire types and the CRUD store.

use may_postgres::Row;
use sea_query::{
    Asterisk, DeleteStatement, Expr, ExprTrait, Iden, InsertStatement, SelectStatement,
    UpdateStatement,
};
use serde::{Deserialize, Serialize};

use crate::config::DatabaseConfig;
use crate::connection::connect;
use crate::error::{DbError, StoreError};
use crate::executor::PgExecutor;
use crate::pool::PgPool;
use crate::query::{self, FromRow};

/// `chemicals` table and column identifiers for the query builder
pub enum Chemicals {
    Table,
    Id,
    Name,
    CasNumber,
    Quantity,
    Unit,
    CreatedAt,
    UpdatedAt,
}

impl Iden for Chemicals {
    fn unquoted(&self) -> &str {
        match self {
            Chemicals::Table => "chemicals",
            Chemicals::Id => "id",
            Chemicals::Name => "name",
            Chemicals::CasNumber => "cas_number",
            Chemicals::Quantity => "quantity",
            Chemicals::Unit => "unit",
            Chemicals::CreatedAt => "created_at",
            Chemicals::UpdatedAt => "updated_at",
        }
    }
}

/// A chemical as stored, including the server-assigned id and timestamps
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chemical {
    pub id: i32,
    pub name: String,
    pub cas_number: String,
    pub quantity: f64,
    pub unit: String,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

impl FromRow for Chemical {
    fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Chemical {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            cas_number: row.try_get("cas_number")?,
            quantity: row.try_get("quantity")?,
            unit: row.try_get("unit")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Fields required to create a chemical
#[derive(Debug, Clone, Deserialize)]
pub struct NewChemical {
    pub name: String,
    pub cas_number: String,
    pub quantity: f64,
    pub unit: String,
}

/// A partial update; absent and `null` fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChemicalChanges {
    pub name: Option<String>,
    pub cas_number: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

impl ChemicalChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.cas_number.is_none()
            && self.quantity.is_none()
            && self.unit.is_none()
    }
}

fn insert_stmt(new: &NewChemical) -> InsertStatement {
    let mut stmt = InsertStatement::default();
    stmt.into_table(Chemicals::Table)
        .columns([
            Chemicals::Name,
            Chemicals::CasNumber,
            Chemicals::Quantity,
            Chemicals::Unit,
        ])
        .values_panic([
            Expr::val(new.name.as_str()),
            Expr::val(new.cas_number.as_str()),
            Expr::val(new.quantity),
            Expr::val(new.unit.as_str()),
        ])
        .returning_col(Asterisk);
    stmt
}

fn select_all_stmt() -> SelectStatement {
    let mut stmt = SelectStatement::default();
    stmt.column(Asterisk).from(Chemicals::Table);
    stmt
}

fn select_by_id_stmt(id: i32) -> SelectStatement {
    let mut stmt = SelectStatement::default();
    stmt.column(Asterisk)
        .from(Chemicals::Table)
        .and_where(Expr::col(Chemicals::Id).eq(id));
    stmt
}

fn update_stmt(id: i32, changes: &ChemicalChanges) -> UpdateStatement {
    let mut stmt = UpdateStatement::default();
    stmt.table(Chemicals::Table);
    if let Some(name) = &changes.name {
        stmt.value(Chemicals::Name, Expr::val(name.as_str()));
    }
    if let Some(cas_number) = &changes.cas_number {
        stmt.value(Chemicals::CasNumber, Expr::val(cas_number.as_str()));
    }
    if let Some(quantity) = changes.quantity {
        stmt.value(Chemicals::Quantity, Expr::val(quantity));
    }
    if let Some(unit) = &changes.unit {
        stmt.value(Chemicals::Unit, Expr::val(unit.as_str()));
    }
    // Touched in the database so the clock is the server's, like the
    // insert defaults.
    stmt.value(Chemicals::UpdatedAt, Expr::cust("timezone('utc', now())"))
        .and_where(Expr::col(Chemicals::Id).eq(id))
        .returning_col(Asterisk);
    stmt
}

fn delete_stmt(id: i32) -> DeleteStatement {
    let mut stmt = DeleteStatement::default();
    stmt.from_table(Chemicals::Table)
        .and_where(Expr::col(Chemicals::Id).eq(id));
    stmt
}

/// Whether a chemical row with this id exists
pub(crate) fn chemical_exists<E: PgExecutor>(executor: &E, id: i32) -> Result<bool, DbError> {
    let row = executor.query_one(
        "SELECT EXISTS (SELECT 1 FROM chemicals WHERE id = $1)",
        &[&id],
    )?;
    row.try_get(0).map_err(DbError::from)
}

/// CRUD access to the `chemicals` table.
///
/// Single-record reads open a fresh direct connection; everything else
/// checks a client out of the shared pool. Both paths hand the connection
/// back as soon as the operation returns, success or error.
#[derive(Clone)]
pub struct ChemicalStore {
    pool: PgPool,
    database_url: String,
}

impl ChemicalStore {
    pub fn new(pool: PgPool, cfg: &DatabaseConfig) -> Self {
        ChemicalStore {
            pool,
            database_url: cfg.url.clone(),
        }
    }

    /// Insert a new chemical and return the stored record
    pub fn create(&self, new: &NewChemical) -> Result<Chemical, StoreError> {
        let client = self.pool.get()?;
        let chemical: Chemical = query::insert_returning(&client, &insert_stmt(new))?;
        log::debug!("created chemical {}", chemical.id);
        Ok(chemical)
    }

    /// List every chemical
    pub fn all(&self) -> Result<Vec<Chemical>, StoreError> {
        let client = self.pool.get()?;
        Ok(query::select_all(&client, &select_all_stmt())?)
    }

    /// Fetch one chemical by id
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` when no row has this id.
    pub fn by_id(&self, id: i32) -> Result<Chemical, StoreError> {
        let client = connect(&self.database_url)?;
        query::select_opt(&client, &select_by_id_stmt(id))?
            .ok_or(StoreError::NotFound("Chemical"))
    }

    /// Apply a partial update and return the stored record.
    ///
    /// An empty change set reads the record back without writing, so
    /// `updated_at` only moves when a field actually changes.
    pub fn update(&self, id: i32, changes: &ChemicalChanges) -> Result<Chemical, StoreError> {
        if changes.is_empty() {
            return self.by_id(id);
        }
        let client = self.pool.get()?;
        query::update_returning(&client, &update_stmt(id, changes))?
            .ok_or(StoreError::NotFound("Chemical"))
    }

    /// Delete one chemical by id.
    ///
    /// Log rows referring to the deleted chemical are left in place.
    pub fn delete(&self, id: i32) -> Result<(), StoreError> {
        let client = self.pool.get()?;
        let deleted = query::delete_count(&client, &delete_stmt(id))?;
        if deleted == 0 {
            return Err(StoreError::NotFound("Chemical"));
        }
        log::debug!("deleted chemical {id}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_query::PostgresQueryBuilder;

    fn sample() -> NewChemical {
        NewChemical {
            name: "Acetone".to_string(),
            cas_number: "67-64-1".to_string(),
            quantity: 2.5,
            unit: "L".to_string(),
        }
    }

    #[test]
    fn test_insert_statement_shape() {
        let (sql, values) = insert_stmt(&sample()).build(PostgresQueryBuilder);
        assert_eq!(
            sql,
            r#"INSERT INTO "chemicals" ("name", "cas_number", "quantity", "unit") VALUES ($1, $2, $3, $4) RETURNING *"#
        );
        assert_eq!(values.iter().count(), 4);
    }

    #[test]
    fn test_select_by_id_statement_shape() {
        let (sql, values) = select_by_id_stmt(7).build(PostgresQueryBuilder);
        assert_eq!(
            sql,
            r#"SELECT * FROM "chemicals" WHERE "id" = $1"#
        );
        assert_eq!(values.iter().count(), 1);
    }

    #[test]
    fn test_update_statement_touches_updated_at_in_the_database() {
        let changes = ChemicalChanges {
            name: Some("Propanone".to_string()),
            ..ChemicalChanges::default()
        };
        let (sql, values) = update_stmt(3, &changes).build(PostgresQueryBuilder);
        assert_eq!(
            sql,
            r#"UPDATE "chemicals" SET "name" = $1, "updated_at" = timezone('utc', now()) WHERE "id" = $2 RETURNING *"#
        );
        // The timestamp is an inline expression, not a bind parameter.
        assert_eq!(values.iter().count(), 2);
    }

    #[test]
    fn test_update_statement_skips_absent_fields() {
        let changes = ChemicalChanges {
            quantity: Some(9.0),
            unit: Some("kg".to_string()),
            ..ChemicalChanges::default()
        };
        let (sql, _) = update_stmt(3, &changes).build(PostgresQueryBuilder);
        assert!(sql.contains(r#""quantity" = $1"#));
        assert!(sql.contains(r#""unit" = $2"#));
        assert!(!sql.contains(r#""name""#));
        assert!(!sql.contains(r#""cas_number""#));
    }

    #[test]
    fn test_delete_statement_shape() {
        let (sql, _) = delete_stmt(9).build(PostgresQueryBuilder);
        assert_eq!(sql, r#"DELETE FROM "chemicals" WHERE "id" = $1"#);
    }

    #[test]
    fn test_changes_null_and_absent_both_mean_unchanged() {
        let changes: ChemicalChanges = serde_json::from_str(r#"{"name": null}"#).unwrap();
        assert!(changes.is_empty());

        let changes: ChemicalChanges = serde_json::from_str("{}").unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn test_new_chemical_requires_every_field() {
        let result: Result<NewChemical, _> =
            serde_json::from_str(r#"{"name": "Acetone", "quantity": 1.0, "unit": "L"}"#);
        assert!(result.is_err());
    }
}
