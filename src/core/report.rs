//! Spending aggregation and report formatting.
//!
//! This module rolls entries up into per-category and per-trip totals in the
//! home currency and compares them with the trip budget. All functions are
//! pure and framework-agnostic; rounding only happens in the `format_*`
//! helpers at display time.

use crate::core::{
    entry::Entry,
    trip::{BudgetPeriod, Trip},
};
use std::collections::BTreeMap;

/// Sums converted cost per category.
///
/// Empty input yields an empty map, which callers treat as "no data".
#[must_use]
pub fn aggregate_by_category(entries: &[Entry]) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for entry in entries {
        *totals.entry(entry.category.clone()).or_insert(0.0) += entry.converted_cost;
    }
    totals
}

/// Sums converted cost over all entries.
#[must_use]
pub fn total_spend(entries: &[Entry]) -> f64 {
    entries.iter().map(|e| e.converted_cost).sum()
}

/// How breakdown values are shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayMode {
    /// Share of the grand total, e.g. `"42.50%"`
    #[default]
    Percentage,
    /// Amount in the home currency, e.g. `"$650.00"`
    Currency,
}

impl DisplayMode {
    /// The other mode.
    #[must_use]
    pub const fn toggle(self) -> Self {
        match self {
            Self::Percentage => Self::Currency,
            Self::Currency => Self::Percentage,
        }
    }
}

/// Per-category totals with their grand total.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryBreakdown {
    /// Converted cost per category
    pub totals: BTreeMap<String, f64>,
    /// Sum of all converted costs
    pub grand_total: f64,
}

impl CategoryBreakdown {
    /// Aggregates `entries` once; display modes reuse the result.
    #[must_use]
    pub fn from_entries(entries: &[Entry]) -> Self {
        Self {
            totals: aggregate_by_category(entries),
            grand_total: total_spend(entries),
        }
    }

    /// Whether there is nothing to show.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// Share of the grand total for `category` as a fraction in `[0, 1]`.
    #[must_use]
    pub fn share(&self, category: &str) -> f64 {
        match self.totals.get(category) {
            Some(total) if self.grand_total > 0.0 => total / self.grand_total,
            _ => 0.0,
        }
    }

    /// Categories ordered by descending total, ties broken by name.
    #[must_use]
    pub fn ranked(&self) -> Vec<(&str, f64)> {
        let mut rows: Vec<(&str, f64)> = self
            .totals
            .iter()
            .map(|(category, total)| (category.as_str(), *total))
            .collect();
        rows.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        rows
    }

    /// Display rows `(category, label)` for `mode`.
    ///
    /// `symbol` is the home-currency symbol used in [`DisplayMode::Currency`].
    #[must_use]
    pub fn display(&self, mode: DisplayMode, symbol: &str) -> Vec<(String, String)> {
        self.ranked()
            .into_iter()
            .map(|(category, total)| {
                let label = match mode {
                    DisplayMode::Percentage => format_percent(self.share(category)),
                    DisplayMode::Currency => format_amount(total, symbol),
                };
                (category.to_string(), label)
            })
            .collect()
    }
}

/// A trip's spending measured against its budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetStatus {
    /// Total spend the budget allows for the whole trip
    pub allowance: f64,
    /// Total converted spend so far
    pub spent: f64,
    /// `allowance - spent`, negative when over budget
    pub remaining: f64,
    /// Whether spend exceeds the allowance
    pub over_budget: bool,
}

impl BudgetStatus {
    /// Compares `entries` against `trip`'s budget.
    #[must_use]
    pub fn for_trip(trip: &Trip, entries: &[Entry]) -> Self {
        Self::new(budget_allowance(trip), total_spend(entries))
    }

    /// Builds a status from an allowance and a spend.
    #[must_use]
    pub fn new(allowance: f64, spent: f64) -> Self {
        Self {
            allowance,
            spent,
            remaining: allowance - spent,
            over_budget: spent > allowance,
        }
    }

    /// Percentage of the allowance spent (can exceed 100).
    #[must_use]
    pub fn percent_used(&self) -> f64 {
        if self.allowance == 0.0 {
            return 0.0;
        }
        (self.spent / self.allowance) * 100.0
    }
}

/// Days the budget is spread over; a same-day trip counts as one day.
#[must_use]
pub fn budget_days(trip: &Trip) -> i64 {
    trip.length_days().max(1)
}

/// Total spend the trip budget allows.
///
/// A daily budget is multiplied by the trip's days; a trip budget is used as is.
#[must_use]
pub fn budget_allowance(trip: &Trip) -> f64 {
    match trip.budget_period {
        BudgetPeriod::Daily => trip.budget * days_f64(trip),
        BudgetPeriod::Trip => trip.budget,
    }
}

/// The budget expressed in the other period, as shown while editing a trip.
///
/// Daily budgets return the trip total; trip budgets return the per-day amount.
#[must_use]
pub fn budget_equivalent(trip: &Trip) -> f64 {
    match trip.budget_period {
        BudgetPeriod::Daily => trip.budget * days_f64(trip),
        BudgetPeriod::Trip => trip.budget / days_f64(trip),
    }
}

#[allow(clippy::cast_precision_loss)]
fn days_f64(trip: &Trip) -> f64 {
    budget_days(trip) as f64
}

/// Everything needed to render one trip's spending screen.
#[derive(Debug, Clone, PartialEq)]
pub struct TripSummary {
    /// The trip
    pub trip: Trip,
    /// Number of entries aggregated
    pub entry_count: usize,
    /// Spending per category
    pub breakdown: CategoryBreakdown,
    /// Spending against the budget
    pub budget: BudgetStatus,
}

impl TripSummary {
    /// Aggregates `entries` for `trip`.
    #[must_use]
    pub fn new(trip: Trip, entries: &[Entry]) -> Self {
        let budget = BudgetStatus::for_trip(&trip, entries);
        Self {
            trip,
            entry_count: entries.len(),
            breakdown: CategoryBreakdown::from_entries(entries),
            budget,
        }
    }
}

/// Formats a fraction as a percentage with two decimals, e.g. `0.425` → `"42.50%"`.
#[must_use]
pub fn format_percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

/// Formats an amount with a currency symbol, e.g. `"$650.00"` or `"-€3.50"`.
#[must_use]
pub fn format_amount(amount: f64, symbol: &str) -> String {
    if amount < 0.0 {
        format!("-{symbol}{:.2}", amount.abs())
    } else {
        format!("{symbol}{amount:.2}")
    }
}

/// Generates a progress bar string for visual representation.
///
/// Creates a text-based progress bar like: `[████████░░] 80.0%`
///
/// # Arguments
/// * `progress_percent` - Progress percentage (0-100)
/// * `bar_length` - Length of the progress bar in characters (default 10)
#[must_use]
pub fn format_progress_bar(progress_percent: f64, bar_length: Option<usize>) -> String {
    let length = bar_length.unwrap_or(10);
    let clamped_progress = progress_percent.clamp(0.0, 100.0);

    // clamped_progress ∈ [0, 100] and length is small, so the cast is exact enough for display.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let filled = ((clamped_progress / 100.0) * length as f64).round() as usize;
    let empty = length.saturating_sub(filled);

    let filled_str = "█".repeat(filled);
    let empty_str = "░".repeat(empty);

    format!("[{filled_str}{empty_str}] {progress_percent:.1}%")
}
