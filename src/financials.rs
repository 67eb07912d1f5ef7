//! Derived money figures for units, schools and the dashboard.
//!
//! Nothing here is stored: profit, balances and dashboard totals are recomputed
//! from the records every time they are shown.

use serde::Serialize;

use crate::model::{Franchise, School, SchoolFinancials};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FinancialSummary {
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
}

impl FinancialSummary {
    pub fn new(revenue: f64, cost: f64) -> Self {
        Self {
            revenue,
            cost,
            profit: revenue - cost,
        }
    }
}

impl std::ops::Add for FinancialSummary {
    type Output = FinancialSummary;

    fn add(self, rhs: Self) -> Self::Output {
        FinancialSummary::new(self.revenue + rhs.revenue, self.cost + rhs.cost)
    }
}

impl std::iter::Sum for FinancialSummary {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(FinancialSummary::default(), |acc, item| acc + item)
    }
}

/// Where a school's displayed revenue and cost came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FigureSource {
    Manual,
    FranchiseSum,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SchoolFigures {
    #[serde(flatten)]
    pub summary: FinancialSummary,
    pub source: FigureSource,
}

fn amount(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

pub fn franchise_summary(franchise: &Franchise) -> FinancialSummary {
    FinancialSummary::new(
        amount(franchise.financials.total_value),
        amount(franchise.financials.production_cost),
    )
}

/// What the unit still owes; negative when it paid more than the order value.
pub fn franchise_outstanding(franchise: &Franchise) -> f64 {
    amount(franchise.financials.total_value) - amount(franchise.financials.value_paid)
}

/// Manual figures win as a pair as soon as either of them is positive.
///
/// The unset side of the pair then reads as zero; it is never filled in from
/// the unit sums.
pub fn school_summary(school: &School) -> SchoolFigures {
    let manual_revenue = amount(school.financials.total_value);
    let manual_cost = amount(school.financials.production_cost);
    if manual_revenue > 0.0 || manual_cost > 0.0 {
        return SchoolFigures {
            summary: FinancialSummary::new(manual_revenue, manual_cost),
            source: FigureSource::Manual,
        };
    }
    SchoolFigures {
        summary: school.franchises.iter().map(franchise_summary).sum(),
        source: FigureSource::FranchiseSum,
    }
}

/// Sum of the itemised cost lines.
pub fn school_cost_breakdown(financials: &SchoolFinancials) -> f64 {
    [
        financials.fabric_cost,
        financials.sewing_cost,
        financials.printing_cost,
        financials.packaging_cost,
        financials.shipping_cost,
    ]
    .into_iter()
    .map(amount)
    .sum()
}

/// Displayed revenue minus the down payment already received.
pub fn school_entry_balance(school: &School) -> f64 {
    school_summary(school).summary.revenue - amount(school.financials.entry_value)
}

pub fn school_total_items(school: &School) -> u64 {
    school
        .franchises
        .iter()
        .map(|f| f.inventory.total_items())
        .sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardLevel {
    Root,
    School,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub level: DashboardLevel,
    #[serde(flatten)]
    pub summary: FinancialSummary,
    pub total_items: u64,
    pub school_count: usize,
    pub franchise_count: usize,
}

/// Totals across every school, each one counted with its displayed figures.
pub fn root_dashboard(schools: &[School]) -> DashboardStats {
    DashboardStats {
        level: DashboardLevel::Root,
        summary: schools.iter().map(|s| school_summary(s).summary).sum(),
        total_items: schools.iter().map(school_total_items).sum(),
        school_count: schools.len(),
        franchise_count: schools.iter().map(|s| s.franchises.len()).sum(),
    }
}

pub fn school_dashboard(school: &School) -> DashboardStats {
    DashboardStats {
        level: DashboardLevel::School,
        summary: school_summary(school).summary,
        total_items: school_total_items(school),
        school_count: 1,
        franchise_count: school.franchises.len(),
    }
}

pub fn school_card_caption(school: &School) -> String {
    format!("{} unidades", school.franchises.len())
}

pub fn franchise_card_caption(franchise: &Franchise) -> String {
    format!("{} itens", franchise.inventory.total_items())
}
