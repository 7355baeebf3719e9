//! Dashboard and export queries.
//!
//! Filtering narrows the product set up front with one dynamic query;
//! everything derived from it (KPI totals, week-over-week deltas, the GMV
//! series, reason breakdowns) is folded in memory from the filtered
//! products' records.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Row};

use merchpulse_core::{aggregate, Product, SuggestedAction};

use crate::repositories::{
    RepositoryError, ReturnRepository, ReviewRepository, SaleRepository, SqlReturnRepository,
    SqlReviewRepository, SqlSaleRepository, SqlSuggestionRepository, SuggestionRepository,
};
use crate::DbPool;

const TOP_REASON_LIMIT: usize = 6;

/// Rating bands partition products by average rating: `low` strictly
/// below 3, `mid` from 3 through 4 inclusive, `high` strictly above 4.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingBand {
    Low,
    Mid,
    High,
}

impl FromStr for RatingBand {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "mid" => Ok(Self::Mid),
            "high" => Ok(Self::High),
            other => Err(format!("unknown rating band `{other}`")),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DashboardFilter {
    pub asin: Option<String>,
    pub issue: Option<String>,
    pub rating_band: Option<RatingBand>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct KpiSummary {
    pub total_gmv: f64,
    pub total_units: i64,
    pub total_returns: i64,
    pub average_rating: f64,
    pub return_percentage: f64,
    pub gmv_wow_change: f64,
    pub units_wow_change: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReasonBreakdown {
    pub reason: String,
    pub count: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProductSeries {
    pub asin: String,
    pub name: String,
    pub gmv: Vec<f64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct GmvSeries {
    pub weeks: Vec<String>,
    pub products: Vec<ProductSeries>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProductRow {
    pub asin: String,
    pub name: String,
    pub total_gmv: f64,
    pub average_rating: f64,
    pub total_refunds: f64,
    pub issues: Vec<ReasonBreakdown>,
    pub suggested_action: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct DashboardReport {
    pub kpis: KpiSummary,
    pub gmv_series: GmvSeries,
    pub top_return_reasons: Vec<ReasonBreakdown>,
    pub products: Vec<ProductRow>,
}

/// One CSV line per filtered product. Numeric fields are pre-rounded so
/// the writer emits them verbatim.
#[derive(Clone, Debug, Serialize)]
pub struct ExportRow {
    pub asin: String,
    pub name: String,
    pub average_rating: f64,
    pub total_gmv: f64,
    pub units_sold: i64,
    pub total_refunds: f64,
    pub top_issue: String,
    pub suggested_action: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct PdfRow {
    pub name: String,
    pub total_gmv: f64,
    pub average_rating: f64,
    pub return_rate: f64,
    pub top_issue: String,
    pub suggested_action: String,
}

/// Products matching the filter, ordered by name. The issue filter keeps
/// products with at least one return reason containing the substring.
pub async fn filtered_products(
    pool: &DbPool,
    filter: &DashboardFilter,
) -> Result<Vec<Product>, RepositoryError> {
    let mut builder = QueryBuilder::new(
        r#"
        SELECT asin, name, average_rating, total_gmv, total_units, total_refunds
        FROM product
        "#,
    );
    builder.push(" WHERE 1=1");

    if let Some(asin) = filter.asin.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        builder.push(" AND asin = ");
        builder.push_bind(asin.to_string());
    }

    if let Some(issue) = filter.issue.as_deref().map(str::trim).filter(|i| !i.is_empty()) {
        builder.push(
            " AND EXISTS (SELECT 1 FROM product_return r \
             WHERE r.asin = product.asin AND LOWER(r.return_reason) LIKE ",
        );
        builder.push_bind(format!("%{}%", issue.to_lowercase()));
        builder.push(")");
    }

    match filter.rating_band {
        Some(RatingBand::Low) => {
            builder.push(" AND average_rating < 3.0");
        }
        Some(RatingBand::Mid) => {
            builder.push(" AND average_rating >= 3.0 AND average_rating <= 4.0");
        }
        Some(RatingBand::High) => {
            builder.push(" AND average_rating > 4.0");
        }
        None => {}
    }

    builder.push(" ORDER BY name ASC");

    let rows = builder.build().fetch_all(pool).await?;
    rows.iter()
        .map(|row| {
            Ok(Product {
                asin: row.try_get("asin")?,
                name: row.try_get("name")?,
                average_rating: row.try_get("average_rating")?,
                total_gmv: row.try_get("total_gmv")?,
                total_units: row.try_get("total_units")?,
                total_refunds: row.try_get("total_refunds")?,
            })
        })
        .collect()
}

pub async fn dashboard_report(
    pool: &DbPool,
    filter: &DashboardFilter,
) -> Result<DashboardReport, RepositoryError> {
    let products = filtered_products(pool, filter).await?;

    let sales = SqlSaleRepository::new(pool.clone());
    let reviews = SqlReviewRepository::new(pool.clone());
    let returns = SqlReturnRepository::new(pool.clone());
    let suggestions = SqlSuggestionRepository::new(pool.clone());

    let mut kpis = KpiSummary::default();
    let mut ratings: Vec<i64> = Vec::new();
    let mut gmv_by_week: HashMap<String, f64> = HashMap::new();
    let mut units_by_week: HashMap<String, i64> = HashMap::new();
    let mut reason_totals: Vec<ReasonBreakdown> = Vec::new();
    let mut product_sales = Vec::with_capacity(products.len());
    let mut product_rows = Vec::with_capacity(products.len());

    for product in &products {
        kpis.total_gmv += product.total_gmv;
        kpis.total_units += product.total_units;

        let product_week_sales = sales.list_for_product(&product.asin).await?;
        for sale in &product_week_sales {
            *gmv_by_week.entry(sale.week.clone()).or_default() += sale.gmv;
            *units_by_week.entry(sale.week.clone()).or_default() += sale.units_sold;
        }
        product_sales.push(product_week_sales);

        for review in reviews.list_for_product(&product.asin).await? {
            ratings.push(review.rating);
        }

        let mut issues = Vec::new();
        for product_return in returns.list_for_product(&product.asin).await? {
            kpis.total_returns += product_return.count;
            accumulate_reason(&mut reason_totals, &product_return.return_reason, product_return.count);
            issues.push(ReasonBreakdown {
                reason: product_return.return_reason,
                count: product_return.count,
            });
        }

        product_rows.push(ProductRow {
            asin: product.asin.clone(),
            name: product.name.clone(),
            total_gmv: aggregate::round2(product.total_gmv),
            average_rating: aggregate::round2(product.average_rating),
            total_refunds: aggregate::round2(product.total_refunds),
            issues,
            suggested_action: suggestion_text(&suggestions, &product.asin).await?,
        });
    }

    kpis.total_gmv = aggregate::round2(kpis.total_gmv);
    kpis.average_rating = aggregate::average_rating(&ratings);
    kpis.return_percentage = aggregate::return_rate(kpis.total_returns, kpis.total_units);

    let weeks = sorted_weeks(gmv_by_week.keys());
    (kpis.gmv_wow_change, kpis.units_wow_change) =
        week_over_week(&weeks, &gmv_by_week, &units_by_week);

    let gmv_series = GmvSeries {
        products: products
            .iter()
            .zip(&product_sales)
            .map(|(product, sales)| {
                let by_week: HashMap<&str, f64> =
                    sales.iter().map(|sale| (sale.week.as_str(), sale.gmv)).collect();
                ProductSeries {
                    asin: product.asin.clone(),
                    name: product.name.clone(),
                    gmv: weeks
                        .iter()
                        .map(|week| by_week.get(week.as_str()).copied().unwrap_or(0.0))
                        .collect(),
                }
            })
            .collect(),
        weeks,
    };

    reason_totals.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reason.cmp(&b.reason)));
    reason_totals.truncate(TOP_REASON_LIMIT);

    Ok(DashboardReport {
        kpis,
        gmv_series,
        top_return_reasons: reason_totals,
        products: product_rows,
    })
}

pub async fn export_rows(
    pool: &DbPool,
    filter: &DashboardFilter,
) -> Result<Vec<ExportRow>, RepositoryError> {
    let products = filtered_products(pool, filter).await?;
    let returns = SqlReturnRepository::new(pool.clone());
    let suggestions = SqlSuggestionRepository::new(pool.clone());

    let mut rows = Vec::with_capacity(products.len());
    for product in products {
        rows.push(ExportRow {
            average_rating: aggregate::round2(product.average_rating),
            total_gmv: aggregate::round2(product.total_gmv),
            units_sold: product.total_units,
            total_refunds: product.total_refunds,
            top_issue: returns
                .top_reason(&product.asin)
                .await?
                .unwrap_or_else(|| "N/A".to_string()),
            suggested_action: suggestion_text(&suggestions, &product.asin).await?,
            asin: product.asin,
            name: product.name,
        });
    }

    Ok(rows)
}

/// Rows for the printable report, all products, ordered by name.
pub async fn pdf_rows(pool: &DbPool) -> Result<Vec<PdfRow>, RepositoryError> {
    let products = filtered_products(pool, &DashboardFilter::default()).await?;
    let returns = SqlReturnRepository::new(pool.clone());
    let suggestions = SqlSuggestionRepository::new(pool.clone());

    let mut rows = Vec::with_capacity(products.len());
    for product in products {
        let return_count: i64 = returns
            .list_for_product(&product.asin)
            .await?
            .iter()
            .map(|r| r.count)
            .sum();

        rows.push(PdfRow {
            total_gmv: aggregate::round2(product.total_gmv),
            average_rating: aggregate::round2(product.average_rating),
            return_rate: aggregate::return_rate(return_count, product.total_units),
            top_issue: returns
                .top_reason(&product.asin)
                .await?
                .unwrap_or_else(|| "N/A".to_string()),
            suggested_action: suggestion_text(&suggestions, &product.asin).await?,
            name: product.name,
        });
    }

    Ok(rows)
}

async fn suggestion_text(
    suggestions: &SqlSuggestionRepository,
    asin: &str,
) -> Result<String, RepositoryError> {
    Ok(suggestions
        .find_for_product(asin)
        .await?
        .map(|suggestion| suggestion.action_text)
        .unwrap_or_else(|| SuggestedAction::PLACEHOLDER.to_string()))
}

fn accumulate_reason(totals: &mut Vec<ReasonBreakdown>, reason: &str, count: i64) {
    match totals.iter_mut().find(|entry| entry.reason == reason) {
        Some(entry) => entry.count += count,
        None => totals.push(ReasonBreakdown { reason: reason.to_string(), count }),
    }
}

/// Week labels sorted numerically when every label parses as an integer,
/// lexically otherwise.
fn sorted_weeks<'a>(labels: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut weeks: Vec<String> = labels.cloned().collect();
    weeks.sort_by(|a, b| match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(left), Ok(right)) => left.cmp(&right),
        _ => a.cmp(b),
    });
    weeks
}

fn week_over_week(
    weeks: &[String],
    gmv_by_week: &HashMap<String, f64>,
    units_by_week: &HashMap<String, i64>,
) -> (f64, f64) {
    if weeks.len() < 2 {
        return (0.0, 0.0);
    }

    let previous = &weeks[weeks.len() - 2];
    let current = &weeks[weeks.len() - 1];
    let gmv_change = aggregate::safe_pct_change(
        gmv_by_week.get(current).copied().unwrap_or(0.0),
        gmv_by_week.get(previous).copied().unwrap_or(0.0),
    );
    let units_change = aggregate::safe_pct_change(
        units_by_week.get(current).copied().unwrap_or(0) as f64,
        units_by_week.get(previous).copied().unwrap_or(0) as f64,
    );

    (gmv_change, units_change)
}

#[cfg(test)]
mod tests {
    use merchpulse_core::Dataset;

    use super::{
        dashboard_report, export_rows, filtered_products, pdf_rows, DashboardFilter, RatingBand,
    };
    use crate::ingest::DatasetReload;
    use crate::{connect_with_settings, migrations, DbPool};

    const SEED: &str = r#"{
        "products": [
            {
                "asin": "B00ALPHA1",
                "product": "Alpha Bottle",
                "sales": [
                    {"week": "1", "units_sold": 10, "gmv": 100.0, "refunds": 0.0},
                    {"week": "2", "units_sold": 20, "gmv": 300.0, "refunds": 5.0}
                ],
                "reviews": [
                    {"review_text": "leaks at the cap", "rating": 2},
                    {"review_text": "fine otherwise", "rating": 3}
                ],
                "returns": [
                    {"return_reason": "Late Delivery", "count": 3}
                ]
            },
            {
                "asin": "B00BRAVO1",
                "product": "Bravo Mug",
                "sales": [
                    {"week": "2", "units_sold": 5, "gmv": 50.0, "refunds": 0.0}
                ],
                "reviews": [
                    {"review_text": "love it", "rating": 5}
                ],
                "returns": []
            }
        ]
    }"#;

    #[tokio::test]
    async fn rating_band_filter_narrows_products() {
        let pool = seeded_pool().await;

        let low = filtered_products(
            &pool,
            &DashboardFilter { rating_band: Some(RatingBand::Low), ..Default::default() },
        )
        .await
        .expect("low band");
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].asin, "B00ALPHA1");

        let high = filtered_products(
            &pool,
            &DashboardFilter { rating_band: Some(RatingBand::High), ..Default::default() },
        )
        .await
        .expect("high band");
        assert_eq!(high.len(), 1);
        assert_eq!(high[0].asin, "B00BRAVO1");

        pool.close().await;
    }

    #[tokio::test]
    async fn issue_filter_matches_reason_substring_case_insensitively() {
        let pool = seeded_pool().await;

        let matched = filtered_products(
            &pool,
            &DashboardFilter { issue: Some("LATE".to_string()), ..Default::default() },
        )
        .await
        .expect("issue filter");
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].asin, "B00ALPHA1");

        pool.close().await;
    }

    #[tokio::test]
    async fn dashboard_kpis_cover_totals_and_week_over_week() {
        let pool = seeded_pool().await;

        let report =
            dashboard_report(&pool, &DashboardFilter::default()).await.expect("dashboard");

        assert_eq!(report.kpis.total_gmv, 450.0);
        assert_eq!(report.kpis.total_units, 35);
        assert_eq!(report.kpis.total_returns, 3);
        // week 1 totals 100 gmv / 10 units, week 2 totals 350 gmv / 25 units
        assert_eq!(report.kpis.gmv_wow_change, 250.0);
        assert_eq!(report.kpis.units_wow_change, 150.0);

        pool.close().await;
    }

    #[tokio::test]
    async fn gmv_series_fills_missing_weeks_with_zero() {
        let pool = seeded_pool().await;

        let report =
            dashboard_report(&pool, &DashboardFilter::default()).await.expect("dashboard");

        assert_eq!(report.gmv_series.weeks, vec!["1", "2"]);
        let bravo = report
            .gmv_series
            .products
            .iter()
            .find(|series| series.asin == "B00BRAVO1")
            .expect("bravo series");
        assert_eq!(bravo.gmv, vec![0.0, 50.0]);

        pool.close().await;
    }

    #[tokio::test]
    async fn export_rows_carry_top_issue_or_placeholder() {
        let pool = seeded_pool().await;

        let rows = export_rows(&pool, &DashboardFilter::default()).await.expect("export");
        assert_eq!(rows.len(), 2);

        let alpha = rows.iter().find(|row| row.asin == "B00ALPHA1").expect("alpha row");
        assert_eq!(alpha.top_issue, "Late Delivery");
        assert_eq!(alpha.average_rating, 2.5);

        let bravo = rows.iter().find(|row| row.asin == "B00BRAVO1").expect("bravo row");
        assert_eq!(bravo.top_issue, "N/A");

        pool.close().await;
    }

    #[tokio::test]
    async fn pdf_rows_are_name_ordered_with_return_rates() {
        let pool = seeded_pool().await;

        let rows = pdf_rows(&pool).await.expect("pdf rows");
        assert_eq!(
            rows.iter().map(|row| row.name.as_str()).collect::<Vec<_>>(),
            vec!["Alpha Bottle", "Bravo Mug"]
        );
        assert_eq!(rows[0].return_rate, 10.0);
        assert_eq!(rows[1].return_rate, 0.0);

        pool.close().await;
    }

    async fn seeded_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 30)
            .await
            .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        let dataset = Dataset::parse(SEED).expect("parse seed");
        DatasetReload::apply(&pool, &dataset).await.expect("seed reload");
        pool
    }
}
