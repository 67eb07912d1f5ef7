//! User actions over the store: load, create, save and delete.
//!
//! Each method is one request/response round against the store. Failures are
//! logged here and handed back as [`AppError`]; callers show
//! [`AppError::user_message`] and reload.

use std::collections::HashMap;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::editor::FranchiseDraft;
use crate::error::{AppError, Operation, StoreError};
use crate::fund::{history, NewTransaction};
use crate::lenient::clean_text;
use crate::model::{Franchise, InvestmentTransaction, School, SchoolFinancials};
use crate::store::{Store, Table};

const MAX_NAME_LEN: usize = 80;

pub struct UniformService<S: Store> {
    store: S,
}

fn failed(op: Operation, err: StoreError) -> AppError {
    log::error!("{op} failed: {err}");
    AppError::store(op, err)
}

fn decode_row<T: DeserializeOwned>(table: Table, row: Value) -> Result<T, StoreError> {
    serde_json::from_value(row).map_err(|err| StoreError::Malformed {
        table,
        reason: err.to_string(),
    })
}

/// Rows that do not fit the record type are skipped so one bad row cannot hide the rest.
fn decode_rows<T: DeserializeOwned>(table: Table, rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match decode_row(table, row) {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("skipping row: {err}");
                None
            }
        })
        .collect()
}

impl<S: Store> UniformService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn describe_store(&self) -> String {
        self.store.describe()
    }

    /// Schools with their franchises, both in creation order.
    pub fn load_schools(&self) -> Result<Vec<School>, AppError> {
        let op = Operation::LoadSchools;
        let school_rows = self.store.select(Table::Schools).map_err(|e| failed(op, e))?;
        let franchise_rows = self.store.select(Table::Franchises).map_err(|e| failed(op, e))?;

        let mut schools: Vec<School> = decode_rows(Table::Schools, school_rows);
        let mut franchises: Vec<Franchise> = decode_rows(Table::Franchises, franchise_rows);
        franchises.sort_by_key(|f| f.created_at);

        let mut by_school: HashMap<String, Vec<Franchise>> = HashMap::new();
        for franchise in franchises {
            by_school
                .entry(franchise.school_id.clone())
                .or_default()
                .push(franchise);
        }
        for school in &mut schools {
            school.franchises = by_school.remove(&school.id).unwrap_or_default();
        }
        if !by_school.is_empty() {
            log::debug!("{} franchise group(s) without a school", by_school.len());
        }
        schools.sort_by_key(|s| s.created_at);
        log::debug!("loaded {} school(s)", schools.len());
        Ok(schools)
    }

    /// Newest first.
    pub fn load_transactions(&self) -> Result<Vec<InvestmentTransaction>, AppError> {
        let rows = self
            .store
            .select(Table::InvestmentTransactions)
            .map_err(|e| failed(Operation::LoadTransactions, e))?;
        let transactions: Vec<InvestmentTransaction> =
            decode_rows(Table::InvestmentTransactions, rows);
        Ok(history(&transactions))
    }

    /// A blank name does nothing and returns `Ok(None)`.
    pub fn add_school(&mut self, name: &str) -> Result<Option<School>, AppError> {
        let name = clean_text(name, MAX_NAME_LEN);
        if name.is_empty() {
            return Ok(None);
        }
        let op = Operation::AddSchool;
        let row = self
            .store
            .insert(Table::Schools, json!({ "name": name, "financials": {} }))
            .map_err(|e| failed(op, e))?;
        let school = decode_row(Table::Schools, row).map_err(|e| failed(op, e))?;
        log::info!("school created: {name}");
        Ok(Some(school))
    }

    /// New unit with an empty inventory; a blank name does nothing.
    pub fn add_franchise(
        &mut self,
        school_id: &str,
        name: &str,
    ) -> Result<Option<Franchise>, AppError> {
        let name = clean_text(name, MAX_NAME_LEN);
        if name.is_empty() {
            return Ok(None);
        }
        if school_id.trim().is_empty() {
            return Err(AppError::Missing("Escola".to_string()));
        }
        let op = Operation::AddFranchise;
        let record = json!({
            "school_id": school_id,
            "name": name,
            "inventory": {},
            "financials": {},
        });
        let row = self
            .store
            .insert(Table::Franchises, record)
            .map_err(|e| failed(op, e))?;
        let franchise = decode_row(Table::Franchises, row).map_err(|e| failed(op, e))?;
        log::info!("franchise created: {name}");
        Ok(Some(franchise))
    }

    /// Writes name, inventory and financials as a whole.
    pub fn save_franchise(&mut self, franchise: &Franchise) -> Result<(), AppError> {
        let patch = json!({
            "name": franchise.name,
            "inventory": franchise.inventory,
            "financials": franchise.financials,
        });
        self.store
            .update(Table::Franchises, &franchise.id, patch)
            .map_err(|e| failed(Operation::SaveFranchise, e))?;
        log::info!("franchise saved: {}", franchise.id);
        Ok(())
    }

    /// Saves the edited record. The draft stays dirty when the store refuses it.
    pub fn save_draft(&mut self, draft: &mut FranchiseDraft) -> Result<(), AppError> {
        self.save_franchise(&draft.to_franchise())?;
        draft.mark_saved();
        Ok(())
    }

    pub fn update_school_financials(
        &mut self,
        school_id: &str,
        financials: &SchoolFinancials,
    ) -> Result<(), AppError> {
        self.store
            .update(Table::Schools, school_id, json!({ "financials": financials }))
            .map_err(|e| failed(Operation::UpdateSchool, e))
    }

    pub fn rename_school(&mut self, school_id: &str, name: &str) -> Result<(), AppError> {
        let name = clean_text(name, MAX_NAME_LEN);
        if name.is_empty() {
            return Err(AppError::Validation("O nome da escola não pode ficar vazio.".to_string()));
        }
        self.store
            .update(Table::Schools, school_id, json!({ "name": name }))
            .map_err(|e| failed(Operation::RenameSchool, e))
    }

    /// Removes the school's franchises first, then the school.
    pub fn delete_school(&mut self, school_id: &str) -> Result<(), AppError> {
        let op = Operation::DeleteSchool;
        let rows = self.store.select(Table::Franchises).map_err(|e| failed(op, e))?;
        let franchises: Vec<Franchise> = decode_rows(Table::Franchises, rows);
        for franchise in franchises.iter().filter(|f| f.school_id == school_id) {
            self.store
                .delete(Table::Franchises, &franchise.id)
                .map_err(|e| failed(op, e))?;
        }
        self.store
            .delete(Table::Schools, school_id)
            .map_err(|e| failed(op, e))?;
        log::info!("school deleted: {school_id}");
        Ok(())
    }

    pub fn delete_franchise(&mut self, franchise_id: &str) -> Result<(), AppError> {
        self.store
            .delete(Table::Franchises, franchise_id)
            .map_err(|e| failed(Operation::DeleteFranchise, e))
    }

    pub fn add_transaction(
        &mut self,
        transaction: NewTransaction,
    ) -> Result<InvestmentTransaction, AppError> {
        let op = Operation::AddTransaction;
        let transaction = transaction.validated()?;
        let row = self
            .store
            .insert(Table::InvestmentTransactions, transaction.to_record(Utc::now()))
            .map_err(|e| failed(op, e))?;
        decode_row(Table::InvestmentTransactions, row).map_err(|e| failed(op, e))
    }

    pub fn delete_transaction(&mut self, transaction_id: &str) -> Result<(), AppError> {
        self.store
            .delete(Table::InvestmentTransactions, transaction_id)
            .map_err(|e| failed(Operation::DeleteTransaction, e))
    }
}
