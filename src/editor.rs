//! Transient edit buffer for one franchise.
//!
//! The draft starts as a copy of the stored record. Nothing reaches the store
//! the caller saves [`FranchiseDraft::to_franchise`]; dropping the draft
//! discards the edits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::financials::FinancialSummary;
use crate::inventory::{Inventory, InventoryError};
use crate::lenient::{clean_text, parse_amount_text};
use crate::model::{Franchise, FranchiseFinancials};

const MAX_NAME_LEN: usize = 80;
const MAX_COLOR_LEN: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FranchiseField {
    TotalValue,
    ValuePaid,
    ProductionCost,
    ShirtColor,
    ShortsColor,
    LogoColor,
}

impl FranchiseField {
    pub const ALL: [FranchiseField; 6] = [
        FranchiseField::TotalValue,
        FranchiseField::ValuePaid,
        FranchiseField::ProductionCost,
        FranchiseField::ShirtColor,
        FranchiseField::ShortsColor,
        FranchiseField::LogoColor,
    ];

    pub fn is_amount(self) -> bool {
        matches!(
            self,
            FranchiseField::TotalValue | FranchiseField::ValuePaid | FranchiseField::ProductionCost
        )
    }
}

/// Accepts what a decimal input box may hold while typing: `""`, `"12"`, `"12."`, `".5"`.
pub fn is_amount_input(value: &str) -> bool {
    let mut dots = 0;
    value.chars().all(|ch| {
        if ch == '.' {
            dots += 1;
            dots <= 1
        } else {
            ch.is_ascii_digit()
        }
    })
}

#[derive(Debug, Clone)]
pub struct FranchiseDraft {
    original: Franchise,
    name: String,
    inventory: Inventory,
    fields: BTreeMap<FranchiseField, String>,
    dirty: bool,
}

impl FranchiseDraft {
    pub fn new(franchise: &Franchise) -> Self {
        let f = &franchise.financials;
        let amount_text = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();
        let mut fields = BTreeMap::new();
        fields.insert(FranchiseField::TotalValue, amount_text(f.total_value));
        fields.insert(FranchiseField::ValuePaid, amount_text(f.value_paid));
        fields.insert(FranchiseField::ProductionCost, amount_text(f.production_cost));
        fields.insert(FranchiseField::ShirtColor, f.shirt_color.clone().unwrap_or_default());
        fields.insert(FranchiseField::ShortsColor, f.shorts_color.clone().unwrap_or_default());
        fields.insert(FranchiseField::LogoColor, f.logo_color.clone().unwrap_or_default());
        Self {
            original: franchise.clone(),
            name: franchise.name.clone(),
            inventory: franchise.inventory.clone(),
            fields,
            dirty: false,
        }
    }

    pub fn franchise_id(&self) -> &str {
        &self.original.id
    }

    pub fn school_id(&self) -> &str {
        &self.original.school_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn field(&self, field: FranchiseField) -> &str {
        self.fields.get(&field).map(String::as_str).unwrap_or("")
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = clean_text(name, MAX_NAME_LEN);
        self.dirty = true;
    }

    /// Returns `false` and keeps the previous text when an amount field gets non-numeric input.
    pub fn set_field(&mut self, field: FranchiseField, value: &str) -> bool {
        let next = if field.is_amount() {
            if !is_amount_input(value) {
                return false;
            }
            value.to_string()
        } else {
            clean_text(value, MAX_COLOR_LEN)
        };
        self.fields.insert(field, next);
        self.dirty = true;
        true
    }

    pub fn add_item(
        &mut self,
        product: &str,
        size: &str,
        quantity: u32,
    ) -> Result<u32, InventoryError> {
        let total = self.inventory.add(product, size, quantity)?;
        self.dirty = true;
        Ok(total)
    }

    pub fn set_quantity(
        &mut self,
        product: &str,
        size: &str,
        quantity: u32,
    ) -> Result<(), InventoryError> {
        self.inventory.set_quantity(product, size, quantity)?;
        self.dirty = true;
        Ok(())
    }

    pub fn remove_item(&mut self, product: &str, size: &str) -> Option<u32> {
        let removed = self.inventory.remove(product, size)?;
        self.dirty = true;
        Some(removed)
    }

    pub fn rename_product(&mut self, from: &str, to: &str) -> Result<(), InventoryError> {
        self.inventory.rename_product(from, to)?;
        self.dirty = true;
        Ok(())
    }

    pub fn rename_size(
        &mut self,
        product: &str,
        from: &str,
        to: &str,
    ) -> Result<(), InventoryError> {
        self.inventory.rename_size(product, from, to)?;
        self.dirty = true;
        Ok(())
    }

    pub fn total_items(&self) -> u64 {
        self.inventory.total_items()
    }

    /// Live figures from whatever is typed right now; unreadable text counts as zero.
    pub fn summary(&self) -> FinancialSummary {
        let read = |field| parse_amount_text(self.field(field)).unwrap_or(0.0);
        FinancialSummary::new(
            read(FranchiseField::TotalValue),
            read(FranchiseField::ProductionCost),
        )
    }

    fn financials(&self) -> FranchiseFinancials {
        let amount = |field| parse_amount_text(self.field(field));
        let text = |field| Some(self.field(field).to_string()).filter(|v| !v.is_empty());
        FranchiseFinancials {
            total_value: amount(FranchiseField::TotalValue),
            value_paid: amount(FranchiseField::ValuePaid),
            production_cost: amount(FranchiseField::ProductionCost),
            shirt_color: text(FranchiseField::ShirtColor),
            shorts_color: text(FranchiseField::ShortsColor),
            logo_color: text(FranchiseField::LogoColor),
            extra: self.original.financials.extra.clone(),
        }
    }

    /// Full record with the edits applied.
    pub fn to_franchise(&self) -> Franchise {
        Franchise {
            name: self.name.clone(),
            inventory: self.inventory.clone(),
            financials: self.financials(),
            ..self.original.clone()
        }
    }

    /// Call once the store accepted [`Self::to_franchise`].
    pub fn mark_saved(&mut self) {
        self.original = self.to_franchise();
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> Franchise {
        let mut inventory = Inventory::new();
        inventory.add("Camisetas", "10", 4).unwrap();
        Franchise {
            id: "f-1".into(),
            school_id: "s-1".into(),
            name: "Unidade Centro".into(),
            inventory,
            financials: FranchiseFinancials {
                total_value: Some(1200.0),
                production_cost: Some(450.5),
                shirt_color: Some("Azul".into()),
                ..Default::default()
            },
            created_at: None,
        }
    }

    #[test]
    fn starts_clean_with_stored_values() {
        let draft = FranchiseDraft::new(&stored());
        assert!(!draft.is_dirty());
        assert_eq!(draft.field(FranchiseField::TotalValue), "1200");
        assert_eq!(draft.field(FranchiseField::ProductionCost), "450.5");
        assert_eq!(draft.field(FranchiseField::ValuePaid), "");
        assert_eq!(draft.field(FranchiseField::ShirtColor), "Azul");
        assert_eq!(draft.summary().profit, 749.5);
    }

    #[test]
    fn amount_fields_reject_non_numeric_input() {
        let mut draft = FranchiseDraft::new(&stored());
        assert!(!draft.set_field(FranchiseField::TotalValue, "12a"));
        assert!(!draft.set_field(FranchiseField::TotalValue, "1.2.3"));
        assert!(!draft.is_dirty());
        assert_eq!(draft.field(FranchiseField::TotalValue), "1200");
        assert!(draft.set_field(FranchiseField::TotalValue, "15."));
        assert!(draft.is_dirty());
        assert_eq!(draft.summary().revenue, 15.0);
        assert!(draft.set_field(FranchiseField::ValuePaid, ""));
    }

    #[test]
    fn rejected_inventory_edit_keeps_draft_clean() {
        let mut draft = FranchiseDraft::new(&stored());
        assert!(draft.add_item("Camisetas", "12", 0).is_err());
        assert!(draft.remove_item("Moletom", "P").is_none());
        assert!(!draft.is_dirty());
        draft.add_item("Camisetas", "10", 2).unwrap();
        assert!(draft.is_dirty());
        assert_eq!(draft.total_items(), 6);
    }

    #[test]
    fn to_franchise_returns_full_record() {
        let mut draft = FranchiseDraft::new(&stored());
        draft.set_name("  Unidade Norte ");
        draft.add_item("Moletom", "p", 3).unwrap();
        draft.set_field(FranchiseField::ValuePaid, "300");
        draft.set_field(FranchiseField::ShirtColor, "");

        let saved = draft.to_franchise();
        assert!(draft.is_dirty());
        draft.mark_saved();
        assert!(!draft.is_dirty());
        assert_eq!(saved.id, "f-1");
        assert_eq!(saved.school_id, "s-1");
        assert_eq!(saved.name, "Unidade Norte");
        assert_eq!(saved.inventory.quantity("Moletom", "P"), Some(3));
        assert_eq!(saved.financials.value_paid, Some(300.0));
        assert_eq!(saved.financials.total_value, Some(1200.0));
        assert_eq!(saved.financials.shirt_color, None);
    }

    #[test]
    fn amount_input_pattern() {
        for ok in ["", "0", "12", "12.", ".5", "12.50"] {
            assert!(is_amount_input(ok), "{ok}");
        }
        for bad in ["-1", "1,5", "1.2.3", "R$1", " 1"] {
            assert!(!is_amount_input(bad), "{bad}");
        }
    }
}
