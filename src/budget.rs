//! Quick price simulation for a uniform order, copied to WhatsApp as text.

use std::fmt;
use std::ops::{Add, Mul};

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Money in centavos.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cents(pub u64);

impl Cents {
    pub fn as_reais(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// `R$ 1234,50`: comma decimal mark, no thousands grouping.
    pub fn brl(self) -> String {
        format!("R$ {self}")
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Add for Cents {
    type Output = Cents;

    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0.saturating_add(rhs.0))
    }
}

impl Mul<u32> for Cents {
    type Output = Cents;

    fn mul(self, rhs: u32) -> Cents {
        Cents(self.0.saturating_mul(u64::from(rhs)))
    }
}

impl Serialize for Cents {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_reais())
    }
}

pub const PRICE_TABLE: [(&str, Cents); 5] = [
    ("Camiseta", Cents(1190)),
    ("Bermuda", Cents(1025)),
    ("Shorts Saia", Cents(1025)),
    ("Moletom", Cents(2050)),
    ("Calça", Cents(1850)),
];

pub fn unit_price(item: &str) -> Option<Cents> {
    PRICE_TABLE
        .iter()
        .find(|(name, _)| *name == item)
        .map(|(_, price)| *price)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BudgetError {
    #[error("{0} is not in the price table")]
    UnknownItem(String),
    #[error("invalid quantity {0:?}")]
    InvalidQuantity(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetLine {
    pub item: &'static str,
    pub quantity: u32,
    pub unit_price: Cents,
    pub subtotal: Cents,
}

/// Quantities per price-table item, in table order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BudgetQuote {
    quantities: [u32; PRICE_TABLE.len()],
}

impl BudgetQuote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the raw text of a quantity box: empty clears it, anything but digits is refused.
    pub fn set_quantity(&mut self, item: &str, text: &str) -> Result<(), BudgetError> {
        let idx = PRICE_TABLE
            .iter()
            .position(|(name, _)| *name == item)
            .ok_or_else(|| BudgetError::UnknownItem(item.to_string()))?;
        let text = text.trim();
        let quantity = if text.is_empty() {
            0
        } else if text.chars().all(|ch| ch.is_ascii_digit()) {
            text.parse::<u32>()
                .map_err(|_| BudgetError::InvalidQuantity(text.to_string()))?
        } else {
            return Err(BudgetError::InvalidQuantity(text.to_string()));
        };
        self.quantities[idx] = quantity;
        Ok(())
    }

    pub fn quantity(&self, item: &str) -> u32 {
        PRICE_TABLE
            .iter()
            .position(|(name, _)| *name == item)
            .map(|idx| self.quantities[idx])
            .unwrap_or(0)
    }

    /// Every table row, including the ones left at zero.
    pub fn lines(&self) -> Vec<BudgetLine> {
        PRICE_TABLE
            .iter()
            .zip(self.quantities.iter())
            .map(|(&(item, price), &quantity)| BudgetLine {
                item,
                quantity,
                unit_price: price,
                subtotal: price * quantity,
            })
            .collect()
    }

    pub fn line_subtotal(&self, item: &str) -> Cents {
        unit_price(item).map(|price| price * self.quantity(item)).unwrap_or_default()
    }

    pub fn total(&self) -> Cents {
        self.lines()
            .into_iter()
            .fold(Cents::default(), |acc, line| acc + line.subtotal)
    }

    pub fn total_items(&self) -> u64 {
        self.quantities.iter().map(|qty| u64::from(*qty)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == Cents(0)
    }

    pub fn render(&self) -> String {
        let mut text = String::from("*ORÇAMENTO UNIFORME*\n\n");
        for line in self.lines().into_iter().filter(|line| line.quantity > 0) {
            text.push_str(&format!(
                "{}x {} ({}) = {}\n",
                line.quantity,
                line.item,
                line.unit_price.brl(),
                line.subtotal.brl()
            ));
        }
        text.push_str(&format!("\n*TOTAL: {}*\n", self.total().brl()));
        text
    }
}
