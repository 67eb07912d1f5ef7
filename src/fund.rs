//! Investment fund ledger: money in and out, optionally traced to a school.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::lenient::clean_text;
use crate::model::{Category, InvestmentTransaction, School, TransactionKind};

pub const DEFAULT_FUND_TARGET: f64 = 27_000.0;

const GENERAL_SOURCE_LABEL: &str = "Geral";
const REMOVED_SCHOOL_LABEL: &str = "Escola Removida";
const MAX_DESCRIPTION_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FundError {
    #[error("amount must be a positive number, got {0}")]
    InvalidAmount(f64),
}

/// A movement as typed in the form, before the store assigns it an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source_school_id: Option<String>,
    #[serde(default)]
    pub category: Category,
}

impl NewTransaction {
    pub fn validated(self) -> Result<Self, FundError> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(FundError::InvalidAmount(self.amount));
        }
        let source_school_id = self
            .source_school_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        Ok(Self {
            description: clean_text(&self.description, MAX_DESCRIPTION_LEN),
            source_school_id,
            ..self
        })
    }

    pub fn to_record(&self, created_at: DateTime<Utc>) -> Value {
        json!({
            "amount": self.amount,
            "type": self.kind,
            "description": self.description,
            "source_school_id": self.source_school_id,
            "category": self.category,
            "created_at": created_at.to_rfc3339(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FundSummary {
    pub total_in: f64,
    pub total_out: f64,
    pub balance: f64,
    pub target: f64,
    pub progress_percent: f64,
}

impl FundSummary {
    pub fn from_transactions(transactions: &[InvestmentTransaction], target: f64) -> Self {
        let total_for = |kind: TransactionKind| -> f64 {
            transactions
                .iter()
                .filter(|tx| tx.kind == kind)
                .map(|tx| tx.amount)
                .sum()
        };
        let total_in = total_for(TransactionKind::In);
        let total_out = total_for(TransactionKind::Out);
        let balance = total_in - total_out;
        Self {
            total_in,
            total_out,
            balance,
            target,
            progress_percent: progress_percent(balance, target),
        }
    }
}

/// Share of the target reached, clamped to 0..=100.
pub fn progress_percent(balance: f64, target: f64) -> f64 {
    if !(target > 0.0) || !balance.is_finite() {
        return 0.0;
    }
    (balance / target * 100.0).clamp(0.0, 100.0)
}

/// Newest first; undated rows go last.
pub fn history(transactions: &[InvestmentTransaction]) -> Vec<InvestmentTransaction> {
    let mut out = transactions.to_vec();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
}

pub fn source_label(transaction: &InvestmentTransaction, schools: &[School]) -> String {
    match transaction.source_school_id.as_deref() {
        None => GENERAL_SOURCE_LABEL.to_string(),
        Some(id) => schools
            .iter()
            .find(|school| school.id == id)
            .map(|school| school.name.clone())
            .unwrap_or_else(|| REMOVED_SCHOOL_LABEL.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchoolContribution {
    pub school_id: String,
    pub label: String,
    pub total_in: f64,
    pub total_out: f64,
    pub net: f64,
}

/// Net movement per source school, largest first. Movements without a source are left out.
pub fn contributions_by_school(
    transactions: &[InvestmentTransaction],
    schools: &[School],
) -> Vec<SchoolContribution> {
    let mut totals: HashMap<&str, (f64, f64, &InvestmentTransaction)> = HashMap::new();
    for tx in transactions {
        let Some(id) = tx.source_school_id.as_deref() else {
            continue;
        };
        let entry = totals.entry(id).or_insert((0.0, 0.0, tx));
        match tx.kind {
            TransactionKind::In => entry.0 += tx.amount,
            TransactionKind::Out => entry.1 += tx.amount,
        }
    }
    let mut out: Vec<SchoolContribution> = totals
        .into_iter()
        .map(|(id, (total_in, total_out, sample))| SchoolContribution {
            school_id: id.to_string(),
            label: source_label(sample, schools),
            total_in,
            total_out,
            net: total_in - total_out,
        })
        .collect();
    out.sort_by(|a, b| {
        b.net
            .total_cmp(&a.net)
            .then_with(|| a.label.cmp(&b.label))
    });
    out
}
