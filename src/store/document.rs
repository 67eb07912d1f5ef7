//! The single JSON document that backs the in-process and local stores.

use serde_json::{json, Value};

use super::{prepare_insert, Table};
use crate::error::StoreError;
use crate::lenient::text_value;

const DB_VERSION: u8 = 1;

pub(super) fn default_db_value() -> Value {
    json!({
        "version": DB_VERSION,
        "schools": [],
        "franchises": [],
        "investment_transactions": [],
    })
}

/// Repairs a loaded document so every table exists and is an array.
pub(super) fn ensure_db_shape_value(value: Value) -> Value {
    let mut out = value;
    let Some(obj) = out.as_object_mut() else {
        return default_db_value();
    };
    if !obj.get("version").is_some_and(|v| v.is_number()) {
        obj.insert("version".to_string(), json!(DB_VERSION));
    }
    for table in Table::ALL {
        if !obj.get(table.name()).is_some_and(|v| v.is_array()) {
            obj.insert(table.name().to_string(), json!([]));
        }
    }
    out
}

fn row_id(row: &Value) -> Option<String> {
    text_value(row.get("id"))
}

pub(super) fn rows(db: &Value, table: Table) -> Vec<Value> {
    db.get(table.name())
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
}

fn rows_mut(db: &mut Value, table: Table) -> Result<&mut Vec<Value>, StoreError> {
    db.get_mut(table.name())
        .and_then(|v| v.as_array_mut())
        .ok_or_else(|| StoreError::Malformed {
            table,
            reason: "table is missing from the database".to_string(),
        })
}

pub(super) fn insert_row(db: &mut Value, table: Table, record: Value) -> Result<Value, StoreError> {
    let row = prepare_insert(table, record)?;
    rows_mut(db, table)?.push(row.clone());
    Ok(row)
}

pub(super) fn update_row(
    db: &mut Value,
    table: Table,
    id: &str,
    patch: Value,
) -> Result<(), StoreError> {
    let Value::Object(patch) = patch else {
        return Err(StoreError::Malformed {
            table,
            reason: "update patch is not an object".to_string(),
        });
    };
    let row = rows_mut(db, table)?
        .iter_mut()
        .find(|row| row_id(row).as_deref() == Some(id))
        .ok_or_else(|| StoreError::NotFound {
            table,
            id: id.to_string(),
        })?;
    let Some(obj) = row.as_object_mut() else {
        return Err(StoreError::Malformed {
            table,
            reason: format!("row {id} is not an object"),
        });
    };
    for (key, value) in patch {
        if key == "id" {
            continue;
        }
        obj.insert(key, value);
    }
    Ok(())
}

/// Returns whether a row was removed.
pub(super) fn delete_row(db: &mut Value, table: Table, id: &str) -> Result<bool, StoreError> {
    let rows = rows_mut(db, table)?;
    let before = rows.len();
    rows.retain(|row| row_id(row).as_deref() != Some(id));
    Ok(rows.len() != before)
}
