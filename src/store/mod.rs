//! Persistence boundary.
//!
//! The application only ever selects whole tables and writes whole records
//! keyed by id. Which backend answers is decided once at start-up from the
//! configuration: the hosted REST store when credentials exist, the encrypted
//! local file otherwise.

use std::fmt;

use chrono::Utc;
use serde_json::{json, Value};

use crate::error::StoreError;

mod document;
mod local;
mod memory;
mod rest;

pub use local::{LocalStore, DATA_FILE};
pub use memory::MemoryStore;
pub use rest::RestStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Schools,
    Franchises,
    InvestmentTransactions,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Schools, Table::Franchises, Table::InvestmentTransactions];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Schools => "schools",
            Table::Franchises => "franchises",
            Table::InvestmentTransactions => "investment_transactions",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub trait Store {
    /// Short label for logs and the storage info command.
    fn describe(&self) -> String;

    fn select(&self, table: Table) -> Result<Vec<Value>, StoreError>;

    /// Inserts one record and returns it as stored, with its id.
    fn insert(&mut self, table: Table, record: Value) -> Result<Value, StoreError>;

    /// Merges `patch` into the record with `id`.
    fn update(&mut self, table: Table, id: &str, patch: Value) -> Result<(), StoreError>;

    /// Deleting an id that does not exist is not an error.
    fn delete(&mut self, table: Table, id: &str) -> Result<(), StoreError>;
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn select(&self, table: Table) -> Result<Vec<Value>, StoreError> {
        (**self).select(table)
    }

    fn insert(&mut self, table: Table, record: Value) -> Result<Value, StoreError> {
        (**self).insert(table, record)
    }

    fn update(&mut self, table: Table, id: &str, patch: Value) -> Result<(), StoreError> {
        (**self).update(table, id, patch)
    }

    fn delete(&mut self, table: Table, id: &str) -> Result<(), StoreError> {
        (**self).delete(table, id)
    }
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Fills in `id` and `created_at` the way the hosted store's column defaults do.
pub fn prepare_insert(table: Table, record: Value) -> Result<Value, StoreError> {
    let Value::Object(mut obj) = record else {
        return Err(StoreError::Malformed {
            table,
            reason: "record is not an object".to_string(),
        });
    };
    let has_id = obj
        .get("id")
        .is_some_and(|v| v.as_str().is_some_and(|s| !s.is_empty()) || v.is_number());
    if !has_id {
        obj.insert("id".to_string(), json!(new_id()));
    }
    if !obj.get("created_at").is_some_and(|v| v.is_string()) {
        obj.insert("created_at".to_string(), json!(Utc::now().to_rfc3339()));
    }
    Ok(Value::Object(obj))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_insert_assigns_id_and_timestamp() {
        let record = prepare_insert(Table::Schools, json!({ "name": "Escola" })).unwrap();
        assert_eq!(record["name"], "Escola");
        assert!(uuid::Uuid::parse_str(record["id"].as_str().unwrap()).is_ok());
        assert!(crate::lenient::timestamp_value(record.get("created_at")).is_some());
    }

    #[test]
    fn prepare_insert_keeps_given_values() {
        let record = prepare_insert(
            Table::Franchises,
            json!({ "id": "f-9", "created_at": "2024-01-01T00:00:00+00:00" }),
        )
        .unwrap();
        assert_eq!(record["id"], "f-9");
        assert_eq!(record["created_at"], "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn prepare_insert_rejects_non_objects() {
        assert!(matches!(
            prepare_insert(Table::Schools, json!([1, 2])),
            Err(StoreError::Malformed { table: Table::Schools, .. })
        ));
    }
}
