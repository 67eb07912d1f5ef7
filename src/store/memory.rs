use serde_json::Value;

use super::document::{default_db_value, delete_row, insert_row, rows, update_row};
use super::{Store, Table};
use crate::error::StoreError;

/// Tables held in process memory; nothing survives the process.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    db: Value,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            db: default_db_value(),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn select(&self, table: Table) -> Result<Vec<Value>, StoreError> {
        Ok(rows(&self.db, table))
    }

    fn insert(&mut self, table: Table, record: Value) -> Result<Value, StoreError> {
        insert_row(&mut self.db, table, record)
    }

    fn update(&mut self, table: Table, id: &str, patch: Value) -> Result<(), StoreError> {
        update_row(&mut self.db, table, id, patch)
    }

    fn delete(&mut self, table: Table, id: &str) -> Result<(), StoreError> {
        delete_row(&mut self.db, table, id).map(|_| ())
    }
}
