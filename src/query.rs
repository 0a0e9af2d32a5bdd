//! Running sea-query statements through a [`PgExecutor`].
//!
//! Statements are rendered for PostgreSQL with `$N` placeholders and their
//! collected values converted into `may_postgres` bind parameters.

use may_postgres::types::ToSql;
use may_postgres::Row;
use sea_query::{
    DeleteStatement, InsertStatement, PostgresQueryBuilder, SelectStatement, UpdateStatement,
    Value, Values,
};

use crate::error::DbError;
use crate::executor::PgExecutor;

/// Conversion from a database row into a model type
///
/// Implementations read columns by name with `try_get`, so SELECT column
/// order does not matter.
pub trait FromRow: Sized {
    /// Build a value from one row
    ///
    /// # Errors
    ///
    /// Returns `DbError::DecodeError` (or the underlying postgres error)
    /// when a column is missing or has an unexpected type.
    fn from_row(row: &Row) -> Result<Self, DbError>;
}

/// Convert collected sea-query values into `ToSql` parameters and run `f`
///
/// Two passes: values are first copied into typed storage, then referenced
/// in statement order. Only the types this schema binds ever appear here;
/// anything else is a `DecodeError`.
pub fn with_bind_params<F, R>(values: &Values, f: F) -> Result<R, DbError>
where
    F: FnOnce(&[&dyn ToSql]) -> Result<R, DbError>,
{
    let mut bools: Vec<bool> = Vec::new();
    let mut ints: Vec<i32> = Vec::new();
    let mut big_ints: Vec<i64> = Vec::new();
    let mut floats: Vec<f32> = Vec::new();
    let mut doubles: Vec<f64> = Vec::new();
    let mut strings: Vec<String> = Vec::new();

    // First pass: collect values into typed vectors
    for value in values.iter() {
        match value {
            Value::Bool(Some(b)) => bools.push(*b),
            Value::Int(Some(i)) => ints.push(*i),
            Value::BigInt(Some(i)) => big_ints.push(*i),
            Value::Float(Some(v)) => floats.push(*v),
            Value::Double(Some(d)) => doubles.push(*d),
            Value::String(Some(s)) => strings.push(s.clone()),
            other => {
                return Err(DbError::DecodeError(format!(
                    "Unsupported bind parameter: {other:?}"
                )));
            }
        }
    }

    // Second pass: reference the stored values in statement order
    let mut bool_idx = 0;
    let mut int_idx = 0;
    let mut big_int_idx = 0;
    let mut float_idx = 0;
    let mut double_idx = 0;
    let mut string_idx = 0;

    let mut params: Vec<&dyn ToSql> = Vec::new();

    for value in values.iter() {
        match value {
            Value::Bool(Some(_)) => {
                params.push(&bools[bool_idx] as &dyn ToSql);
                bool_idx += 1;
            }
            Value::Int(Some(_)) => {
                params.push(&ints[int_idx] as &dyn ToSql);
                int_idx += 1;
            }
            Value::BigInt(Some(_)) => {
                params.push(&big_ints[big_int_idx] as &dyn ToSql);
                big_int_idx += 1;
            }
            Value::Float(Some(_)) => {
                params.push(&floats[float_idx] as &dyn ToSql);
                float_idx += 1;
            }
            Value::Double(Some(_)) => {
                params.push(&doubles[double_idx] as &dyn ToSql);
                double_idx += 1;
            }
            Value::String(Some(_)) => {
                params.push(&strings[string_idx] as &dyn ToSql);
                string_idx += 1;
            }
            other => {
                return Err(DbError::DecodeError(format!(
                    "Unsupported bind parameter: {other:?}"
                )));
            }
        }
    }

    f(&params)
}

/// Run a SELECT and map every returned row
pub fn select_all<M, E>(executor: &E, stmt: &SelectStatement) -> Result<Vec<M>, DbError>
where
    M: FromRow,
    E: PgExecutor,
{
    let (sql, values) = stmt.build(PostgresQueryBuilder);
    with_bind_params(&values, |params| {
        let rows = executor.query_all(&sql, params)?;
        rows.iter().map(M::from_row).collect()
    })
}

/// Run a SELECT expected to match at most one row
pub fn select_opt<M, E>(executor: &E, stmt: &SelectStatement) -> Result<Option<M>, DbError>
where
    M: FromRow,
    E: PgExecutor,
{
    let (sql, values) = stmt.build(PostgresQueryBuilder);
    with_bind_params(&values, |params| {
        let rows = executor.query_all(&sql, params)?;
        rows.first().map(M::from_row).transpose()
    })
}

/// Run an INSERT ... RETURNING and map the returned row
pub fn insert_returning<M, E>(executor: &E, stmt: &InsertStatement) -> Result<M, DbError>
where
    M: FromRow,
    E: PgExecutor,
{
    let (sql, values) = stmt.build(PostgresQueryBuilder);
    with_bind_params(&values, |params| {
        let row = executor.query_one(&sql, params)?;
        M::from_row(&row)
    })
}

/// Run an UPDATE ... RETURNING, `None` when no row matched the condition
pub fn update_returning<M, E>(executor: &E, stmt: &UpdateStatement) -> Result<Option<M>, DbError>
where
    M: FromRow,
    E: PgExecutor,
{
    let (sql, values) = stmt.build(PostgresQueryBuilder);
    with_bind_params(&values, |params| {
        let rows = executor.query_all(&sql, params)?;
        rows.first().map(M::from_row).transpose()
    })
}

/// Run a DELETE and report the number of rows removed
pub fn delete_count<E>(executor: &E, stmt: &DeleteStatement) -> Result<u64, DbError>
where
    E: PgExecutor,
{
    let (sql, values) = stmt.build(PostgresQueryBuilder);
    with_bind_params(&values, |params| executor.execute(&sql, params))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_params_preserve_order_and_count() {
        let values = Values(vec![
            Value::from(7i32),
            Value::from("acetone"),
            Value::from(2.5f64),
            Value::from(true),
        ]);

        let count = with_bind_params(&values, |params| Ok(params.len())).unwrap();
        assert_eq!(count, 4);
    }

    #[test]
    fn test_bind_params_empty() {
        let values = Values(vec![]);
        let count = with_bind_params(&values, |params| Ok(params.len())).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_bind_params_reject_unsupported_type() {
        let values = Values(vec![Value::Bytes(Some(vec![0u8, 1u8]))]);
        let err = with_bind_params(&values, |params| Ok(params.len())).unwrap_err();
        assert!(err.to_string().contains("Unsupported bind parameter"));
    }

    #[test]
    fn test_bind_params_reject_null() {
        // This schema never binds NULL; a None value is a builder bug.
        let values = Values(vec![Value::Int(None)]);
        assert!(with_bind_params(&values, |params| Ok(params.len())).is_err());
    }
}
