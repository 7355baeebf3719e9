//! Per-product KPI aggregation and guarded percentage math.
//!
//! All functions here are pure over the records they are handed, so the
//! persistence layer can recompute aggregates product by product without
//! any cross-product leakage. Summation is order-independent and running
//! it twice over unchanged input yields identical results.

use crate::domain::sale::Sale;

/// Derived sale totals for a single product.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct KpiTotals {
    pub total_gmv: f64,
    pub total_units: i64,
    pub total_refunds: f64,
}

impl KpiTotals {
    pub fn from_sales(sales: &[Sale]) -> Self {
        sales.iter().fold(Self::default(), |mut totals, sale| {
            totals.total_gmv += sale.gmv;
            totals.total_units += sale.units_sold;
            totals.total_refunds += sale.refunds;
            totals
        })
    }
}

/// Arithmetic mean of ratings rounded to 2 decimals; 0 with no reviews.
pub fn average_rating(ratings: &[i64]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: i64 = ratings.iter().sum();
    round2(sum as f64 / ratings.len() as f64)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Percentage change between two values, rounded to 1 decimal. Returns
/// 0.0 when the previous value is zero so sparse weeks never divide by
/// zero.
pub fn safe_pct_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    round1(((current - previous) / previous) * 100.0)
}

/// Returns as a percentage of units sold, rounded to 1 decimal; 0.0 when
/// no units were sold.
pub fn return_rate(total_returns: i64, total_units: i64) -> f64 {
    if total_units == 0 {
        return 0.0;
    }
    round1((total_returns as f64 / total_units as f64) * 100.0)
}
