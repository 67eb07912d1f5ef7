use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::inventory::Inventory;
use crate::lenient;

/// Manually entered school figures. Every field is optional; see
/// [`crate::financials::school_summary`] for how they override the unit sums.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchoolFinancials {
    #[serde(default, deserialize_with = "lenient::amount", skip_serializing_if = "Option::is_none")]
    pub total_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient::amount", skip_serializing_if = "Option::is_none")]
    pub production_cost: Option<f64>,
    /// Down payment received when the order was placed.
    #[serde(default, deserialize_with = "lenient::amount", skip_serializing_if = "Option::is_none")]
    pub entry_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient::amount", skip_serializing_if = "Option::is_none")]
    pub fabric_cost: Option<f64>,
    #[serde(default, deserialize_with = "lenient::amount", skip_serializing_if = "Option::is_none")]
    pub sewing_cost: Option<f64>,
    #[serde(default, deserialize_with = "lenient::amount", skip_serializing_if = "Option::is_none")]
    pub printing_cost: Option<f64>,
    #[serde(default, deserialize_with = "lenient::amount", skip_serializing_if = "Option::is_none")]
    pub packaging_cost: Option<f64>,
    #[serde(default, deserialize_with = "lenient::amount", skip_serializing_if = "Option::is_none")]
    pub shipping_cost: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub payment_terms: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub payment_history: Option<String>,
    /// Keys written by other clients; saved back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FranchiseFinancials {
    #[serde(default, deserialize_with = "lenient::amount", skip_serializing_if = "Option::is_none")]
    pub total_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient::amount", skip_serializing_if = "Option::is_none")]
    pub value_paid: Option<f64>,
    #[serde(default, deserialize_with = "lenient::amount", skip_serializing_if = "Option::is_none")]
    pub production_cost: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub shirt_color: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub shorts_color: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub logo_color: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Franchise {
    #[serde(deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub school_id: String,
    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub name: String,
    #[serde(default)]
    pub inventory: Inventory,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub financials: FranchiseFinancials,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct School {
    #[serde(deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub financials: SchoolFinancials,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Filled in by the service from the `franchises` table.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub franchises: Vec<Franchise>,
}

impl School {
    pub fn franchise(&self, franchise_id: &str) -> Option<&Franchise> {
        self.franchises.iter().find(|f| f.id == franchise_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    In,
    Out,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::In => f.write_str("in"),
            TransactionKind::Out => f.write_str("out"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "Option<String>")]
pub enum Category {
    #[default]
    Reinvestment,
    Material,
    Labor,
    Other,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Reinvestment => "Reinvestimento",
            Category::Material => "Compra de Material",
            Category::Labor => "Mão de Obra",
            Category::Other => "Outros",
        }
    }
}

impl From<Option<String>> for Category {
    fn from(value: Option<String>) -> Self {
        match value.as_deref().map(str::trim) {
            None | Some("") | Some("reinvestment") => Category::Reinvestment,
            Some("material") => Category::Material,
            Some("labor") => Category::Labor,
            Some(_) => Category::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentTransaction {
    #[serde(deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::amount_or_zero")]
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::optional_id")]
    pub source_school_id: Option<String>,
    #[serde(default)]
    pub category: Category,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl InvestmentTransaction {
    /// Amount with its sign: positive for `in`, negative for `out`.
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionKind::In => self.amount,
            TransactionKind::Out => -self.amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn school_reads_loose_financials() {
        let school: School = serde_json::from_value(json!({
            "id": 7,
            "name": "Colégio Santa Maria",
            "financials": {
                "total_value": "1500,00",
                "production_cost": "",
                "payment_terms": "50% na entrada",
                "entry_value": null
            },
            "created_at": "2025-02-01T12:00:00+00:00"
        }))
        .unwrap();
        assert_eq!(school.id, "7");
        assert_eq!(school.financials.total_value, Some(1500.0));
        assert_eq!(school.financials.production_cost, None);
        assert_eq!(school.financials.entry_value, None);
        assert_eq!(school.financials.payment_terms.as_deref(), Some("50% na entrada"));
        assert!(school.franchises.is_empty());
        assert!(school.created_at.is_some());
    }

    #[test]
    fn unknown_financial_keys_are_kept() {
        let franchise: Franchise = serde_json::from_value(json!({
            "id": "f-1",
            "financials": { "total_value": "100", "discount": "5", "notes": "pago em 2x" }
        }))
        .unwrap();
        assert_eq!(franchise.financials.total_value, Some(100.0));
        assert_eq!(franchise.financials.extra.get("discount"), Some(&json!("5")));

        let written = serde_json::to_value(&franchise.financials).unwrap();
        assert_eq!(
            written,
            json!({ "total_value": 100.0, "discount": "5", "notes": "pago em 2x" })
        );
    }

    #[test]
    fn franchise_tolerates_missing_fields() {
        let franchise: Franchise = serde_json::from_value(json!({
            "id": "f-1",
            "financials": null,
            "inventory": null
        }))
        .unwrap();
        assert_eq!(franchise.id, "f-1");
        assert_eq!(franchise.school_id, "");
        assert!(franchise.inventory.is_empty());
    }

    #[test]
    fn transaction_category_falls_back() {
        let tx: InvestmentTransaction = serde_json::from_value(json!({
            "id": "t-1",
            "amount": "250.5",
            "type": "out",
            "category": "marketing",
            "source_school_id": null
        }))
        .unwrap();
        assert_eq!(tx.amount, 250.5);
        assert_eq!(tx.kind, TransactionKind::Out);
        assert_eq!(tx.category, Category::Other);
        assert_eq!(tx.signed_amount(), -250.5);
        assert_eq!(tx.source_school_id, None);

        let written = serde_json::to_value(tx.category).unwrap();
        assert_eq!(written, json!("other"));
    }
}
