//! Schema bootstrap for the inventory tables.
//!
//! Run once at startup against a direct connection. Every statement is
//! idempotent, so restarting against an already-provisioned database is a
//! no-op.

use crate::error::DbError;
use crate::executor::PgExecutor;

const CREATE_CHEMICALS: &str = "\
CREATE TABLE IF NOT EXISTS chemicals (
    id SERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    cas_number TEXT NOT NULL,
    quantity DOUBLE PRECISION NOT NULL,
    unit TEXT NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT (timezone('utc', now())),
    updated_at TIMESTAMP NOT NULL DEFAULT (timezone('utc', now()))
)";

// No foreign key on chemical_id: log rows outlive the chemical they refer
// to, and deleting a chemical must leave its history untouched. The stores
// enforce existence at write time instead.
const CREATE_INVENTORY_LOGS: &str = "\
CREATE TABLE IF NOT EXISTS inventory_logs (
    id SERIAL PRIMARY KEY,
    chemical_id INTEGER NOT NULL,
    action_type TEXT NOT NULL,
    quantity DOUBLE PRECISION NOT NULL,
    timestamp TIMESTAMP NOT NULL DEFAULT (timezone('utc', now()))
)";

const CREATE_LOGS_CHEMICAL_IDX: &str =
    "CREATE INDEX IF NOT EXISTS idx_inventory_logs_chemical_id ON inventory_logs (chemical_id)";

/// Create the `chemicals` and `inventory_logs` tables if they do not exist.
pub fn ensure_schema<E: PgExecutor>(executor: &E) -> Result<(), DbError> {
    executor.execute(CREATE_CHEMICALS, &[])?;
    executor.execute(CREATE_INVENTORY_LOGS, &[])?;
    executor.execute(CREATE_LOGS_CHEMICAL_IDX, &[])?;
    log::info!("database schema is up to date");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ddl_is_idempotent() {
        assert!(CREATE_CHEMICALS.contains("IF NOT EXISTS"));
        assert!(CREATE_INVENTORY_LOGS.contains("IF NOT EXISTS"));
        assert!(CREATE_LOGS_CHEMICAL_IDX.contains("IF NOT EXISTS"));
    }

    #[test]
    fn history_survives_chemical_deletion() {
        // Deleting a chemical must not cascade into its log rows.
        assert!(!CREATE_INVENTORY_LOGS.contains("REFERENCES"));
        assert!(!CREATE_INVENTORY_LOGS.contains("FOREIGN KEY"));
    }
}
