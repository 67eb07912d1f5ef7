//! Per-unit production counts: product name → size label → quantity.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::lenient::{clean_text, parse_int_prefix, quantity_value};

/// Products offered by the unit editor. Free-form names are still accepted.
pub const PRODUCT_OPTIONS: [&str; 5] =
    ["Camisetas", "Bermudas", "Shorts Saia", "Moletom", "Calça"];

const MAX_LABEL_LEN: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    #[error("product name is required")]
    BlankProduct,
    #[error("size label is required")]
    BlankSize,
    #[error("quantity must be greater than zero")]
    ZeroQuantity,
    #[error("product {0} is not in the inventory")]
    UnknownProduct(String),
    #[error("size {size} of {product} is not in the inventory")]
    UnknownEntry { product: String, size: String },
    #[error("quantity of size {size} in {product} is too large")]
    QuantityOverflow { product: String, size: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Inventory(BTreeMap<String, BTreeMap<String, u32>>);

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Adds `quantity` to the entry, creating it when missing.
    pub fn add(&mut self, product: &str, size: &str, quantity: u32) -> Result<u32, InventoryError> {
        let product = product_label(product)?;
        let size = size_label(size)?;
        if quantity == 0 {
            return Err(InventoryError::ZeroQuantity);
        }
        let current = self.quantity(&product, &size).unwrap_or(0);
        let total = current
            .checked_add(quantity)
            .ok_or_else(|| overflow(&product, &size))?;
        self.0.entry(product).or_default().insert(size, total);
        Ok(total)
    }

    /// Overwrites the quantity of an existing entry.
    pub fn set_quantity(
        &mut self,
        product: &str,
        size: &str,
        quantity: u32,
    ) -> Result<(), InventoryError> {
        if quantity == 0 {
            return Err(InventoryError::ZeroQuantity);
        }
        let slot = self
            .0
            .get_mut(product)
            .and_then(|sizes| sizes.get_mut(size))
            .ok_or_else(|| InventoryError::UnknownEntry {
                product: product.to_string(),
                size: size.to_string(),
            })?;
        *slot = quantity;
        Ok(())
    }

    /// Removes one size; the product goes too once it has no sizes left.
    pub fn remove(&mut self, product: &str, size: &str) -> Option<u32> {
        let sizes = self.0.get_mut(product)?;
        let removed = sizes.remove(size);
        if sizes.is_empty() {
            self.0.remove(product);
        }
        removed
    }

    /// Moves every size of `from` under `to`, summing sizes that already exist there.
    pub fn rename_product(&mut self, from: &str, to: &str) -> Result<(), InventoryError> {
        let to = product_label(to)?;
        if from == to {
            return if self.0.contains_key(from) {
                Ok(())
            } else {
                Err(InventoryError::UnknownProduct(from.to_string()))
            };
        }
        let source = self
            .0
            .get(from)
            .ok_or_else(|| InventoryError::UnknownProduct(from.to_string()))?;
        let mut target = self.0.get(&to).cloned().unwrap_or_default();
        for (size, quantity) in source {
            let slot = target.entry(size.clone()).or_insert(0);
            *slot = slot.checked_add(*quantity).ok_or_else(|| overflow(&to, size))?;
        }
        self.0.remove(from);
        self.0.insert(to, target);
        Ok(())
    }

    /// Relabels a size inside one product, summing into `to` if it already exists.
    pub fn rename_size(
        &mut self,
        product: &str,
        from: &str,
        to: &str,
    ) -> Result<(), InventoryError> {
        let to = size_label(to)?;
        let sizes = self
            .0
            .get_mut(product)
            .ok_or_else(|| InventoryError::UnknownProduct(product.to_string()))?;
        if from == to {
            return if sizes.contains_key(from) {
                Ok(())
            } else {
                Err(InventoryError::UnknownEntry {
                    product: product.to_string(),
                    size: from.to_string(),
                })
            };
        }
        let quantity = *sizes.get(from).ok_or_else(|| InventoryError::UnknownEntry {
            product: product.to_string(),
            size: from.to_string(),
        })?;
        let total = sizes
            .get(&to)
            .copied()
            .unwrap_or(0)
            .checked_add(quantity)
            .ok_or_else(|| overflow(product, &to))?;
        sizes.remove(from);
        sizes.insert(to, total);
        Ok(())
    }

    pub fn quantity(&self, product: &str, size: &str) -> Option<u32> {
        self.0.get(product)?.get(size).copied()
    }

    pub fn products(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn sizes(&self, product: &str) -> Option<&BTreeMap<String, u32>> {
        self.0.get(product)
    }

    /// Sizes of `product` in display order with their quantities.
    pub fn sorted_sizes(&self, product: &str) -> Vec<(&str, u32)> {
        let Some(sizes) = self.0.get(product) else {
            return Vec::new();
        };
        let mut out: Vec<(&str, u32)> = sizes
            .iter()
            .map(|(size, qty)| (size.as_str(), *qty))
            .collect();
        out.sort_by(|a, b| compare_sizes(a.0, b.0));
        out
    }

    pub fn product_total(&self, product: &str) -> u64 {
        self.0
            .get(product)
            .map(|sizes| sizes.values().map(|qty| u64::from(*qty)).sum())
            .unwrap_or(0)
    }

    pub fn total_items(&self) -> u64 {
        self.0
            .values()
            .flat_map(|sizes| sizes.values())
            .map(|qty| u64::from(*qty))
            .sum()
    }

    /// Every (product, size, quantity) triple, products in name order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, u32)> {
        self.0.iter().flat_map(|(product, sizes)| {
            sizes
                .iter()
                .map(move |(size, qty)| (product.as_str(), size.as_str(), *qty))
        })
    }

    /// Adds every entry of `other` into `self`. Used for read-only order
    /// totals, so a sum past `u32::MAX` is capped there instead of failing.
    pub fn merge(&mut self, other: &Inventory) {
        for (product, size, quantity) in other.entries() {
            let slot = self
                .0
                .entry(product.to_string())
                .or_default()
                .entry(size.to_string())
                .or_insert(0);
            *slot = slot.saturating_add(quantity);
        }
    }
}

impl<'de> Deserialize<'de> for Inventory {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(Inventory::from_value(value.as_ref()))
    }
}

impl Inventory {
    /// Builds an inventory from loosely shaped JSON, keeping only positive quantities.
    pub fn from_value(value: Option<&Value>) -> Self {
        let mut out = BTreeMap::new();
        let Some(products) = value.and_then(Value::as_object) else {
            return Inventory(out);
        };
        for (product, sizes) in products {
            let Some(sizes) = sizes.as_object() else {
                continue;
            };
            let kept: BTreeMap<String, u32> = sizes
                .iter()
                .filter_map(|(size, qty)| {
                    quantity_value(qty)
                        .filter(|qty| *qty > 0)
                        .map(|qty| (size.clone(), qty))
                })
                .collect();
            if !kept.is_empty() {
                out.insert(product.clone(), kept);
            }
        }
        Inventory(out)
    }
}

/// Numeric labels sort by value and come before text labels, which sort lexically.
pub fn compare_sizes(a: &str, b: &str) -> Ordering {
    match (parse_int_prefix(a), parse_int_prefix(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn product_label(value: &str) -> Result<String, InventoryError> {
    let label = clean_text(value, MAX_LABEL_LEN);
    if label.is_empty() {
        Err(InventoryError::BlankProduct)
    } else {
        Ok(label)
    }
}

fn size_label(value: &str) -> Result<String, InventoryError> {
    let label = clean_text(value, MAX_LABEL_LEN).to_uppercase();
    if label.is_empty() {
        Err(InventoryError::BlankSize)
    } else {
        Ok(label)
    }
}

fn overflow(product: &str, size: &str) -> InventoryError {
    InventoryError::QuantityOverflow {
        product: product.to_string(),
        size: size.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Inventory {
        let mut inv = Inventory::new();
        inv.add("Camisetas", "10", 5).unwrap();
        inv.add("Camisetas", "12", 3).unwrap();
        inv.add("Camisetas", "gg", 2).unwrap();
        inv.add("Moletom", "P", 4).unwrap();
        inv
    }

    #[test]
    fn add_accumulates_and_uppercases_size() {
        let mut inv = sample();
        assert_eq!(inv.add("Camisetas", " gg ", 3), Ok(5));
        assert_eq!(inv.quantity("Camisetas", "GG"), Some(5));
        assert_eq!(inv.quantity("Camisetas", "gg"), None);
    }

    #[test]
    fn add_refuses_to_overflow_a_size() {
        let mut inv = Inventory::new();
        assert_eq!(inv.add("Camisetas", "10", u32::MAX), Ok(u32::MAX));
        assert_eq!(
            inv.add("Camisetas", "10", 1),
            Err(InventoryError::QuantityOverflow {
                product: "Camisetas".into(),
                size: "10".into()
            })
        );
        assert_eq!(inv.quantity("Camisetas", "10"), Some(u32::MAX));
    }

    #[test]
    fn overflowing_renames_leave_inventory_untouched() {
        let mut inv = Inventory::new();
        inv.add("Camisetas", "10", u32::MAX).unwrap();
        inv.add("Camisetas", "12", 1).unwrap();
        inv.add("Camiseta", "10", 2).unwrap();
        let before = inv.clone();

        assert!(matches!(
            inv.rename_size("Camisetas", "12", "10"),
            Err(InventoryError::QuantityOverflow { .. })
        ));
        assert!(matches!(
            inv.rename_product("Camiseta", "Camisetas"),
            Err(InventoryError::QuantityOverflow { .. })
        ));
        assert_eq!(inv, before);
    }

    #[test]
    fn add_rejects_blank_and_zero() {
        let mut inv = Inventory::new();
        assert_eq!(inv.add(" ", "P", 1), Err(InventoryError::BlankProduct));
        assert_eq!(inv.add("Moletom", "", 1), Err(InventoryError::BlankSize));
        assert_eq!(inv.add("Moletom", "P", 0), Err(InventoryError::ZeroQuantity));
        assert!(inv.is_empty());
    }

    #[test]
    fn set_quantity_requires_existing_entry() {
        let mut inv = sample();
        inv.set_quantity("Moletom", "P", 9).unwrap();
        assert_eq!(inv.quantity("Moletom", "P"), Some(9));
        assert_eq!(inv.set_quantity("Moletom", "P", 0), Err(InventoryError::ZeroQuantity));
        assert!(matches!(
            inv.set_quantity("Moletom", "G", 1),
            Err(InventoryError::UnknownEntry { .. })
        ));
    }

    #[test]
    fn remove_drops_empty_products() {
        let mut inv = sample();
        assert_eq!(inv.remove("Moletom", "P"), Some(4));
        assert!(inv.sizes("Moletom").is_none());
        assert_eq!(inv.remove("Moletom", "P"), None);
        assert_eq!(inv.products().collect::<Vec<_>>(), vec!["Camisetas"]);
    }

    #[test]
    fn totals_agree_per_product_and_per_leaf() {
        let inv = sample();
        let per_product: u64 = inv.products().map(|p| inv.product_total(p)).sum();
        let per_leaf: u64 = inv.entries().map(|(_, _, qty)| u64::from(qty)).sum();
        assert_eq!(per_product, 14);
        assert_eq!(per_leaf, 14);
        assert_eq!(inv.total_items(), 14);
    }

    #[test]
    fn rename_product_preserves_counts() {
        let mut inv = sample();
        let before = inv.product_total("Camisetas");
        inv.rename_product("Camisetas", "Camisetas Polo").unwrap();
        assert_eq!(inv.product_total("Camisetas Polo"), before);
        assert_eq!(inv.product_total("Camisetas"), 0);
        assert_eq!(inv.total_items(), 14);
    }

    #[test]
    fn rename_product_merges_into_existing() {
        let mut inv = sample();
        inv.add("Blusas", "10", 1).unwrap();
        inv.rename_product("Blusas", "Camisetas").unwrap();
        assert_eq!(inv.quantity("Camisetas", "10"), Some(6));
        assert_eq!(inv.total_items(), 15);
    }

    #[test]
    fn rename_size_preserves_counts() {
        let mut inv = sample();
        inv.rename_size("Moletom", "P", "m").unwrap();
        assert_eq!(inv.quantity("Moletom", "M"), Some(4));
        assert_eq!(inv.quantity("Moletom", "P"), None);
        inv.rename_size("Camisetas", "12", "10").unwrap();
        assert_eq!(inv.quantity("Camisetas", "10"), Some(8));
        assert_eq!(inv.total_items(), 14);
        assert_eq!(
            inv.rename_size("Camisetas", "14", "16"),
            Err(InventoryError::UnknownEntry {
                product: "Camisetas".into(),
                size: "14".into()
            })
        );
    }

    #[test]
    fn sizes_sort_numerically_then_lexically() {
        let mut inv = Inventory::new();
        for size in ["GG", "12", "2", "P", "10", "M"] {
            inv.add("Camisetas", size, 1).unwrap();
        }
        let order: Vec<&str> = inv.sorted_sizes("Camisetas").into_iter().map(|(s, _)| s).collect();
        assert_eq!(order, vec!["2", "10", "12", "GG", "M", "P"]);
    }

    #[test]
    fn deserialize_drops_bad_quantities() {
        let inv: Inventory = serde_json::from_value(json!({
            "Camisetas": { "10": 3, "12": "2", "14": -1, "16": "x", "18": 0 },
            "Moletom": { "P": -5 },
            "Broken": 7
        }))
        .unwrap();
        assert_eq!(inv.quantity("Camisetas", "10"), Some(3));
        assert_eq!(inv.quantity("Camisetas", "12"), Some(2));
        assert_eq!(inv.sizes("Camisetas").map(|s| s.len()), Some(2));
        assert!(inv.sizes("Moletom").is_none());
        assert!(inv.sizes("Broken").is_none());

        let empty: Inventory = serde_json::from_value(json!(null)).unwrap();
        assert!(empty.is_empty());
    }
}
