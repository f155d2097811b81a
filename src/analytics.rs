//! Analytics over a (filtered) view of the integrated dataset
//!
//! All grouping happens on unrounded values; figures are rounded to two
//! decimals only when the result structs are assembled.

use crate::error::AnalysisError;
use crate::integrate::{IntegratedRecord, View};
use crate::models::{OrderStatus, Severity};
use crate::schema::Field;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_EXPLAIN_LIMIT: usize = 10;
pub const DEFAULT_RANK_LIMIT: usize = 5;
pub const NO_ISSUES_MESSAGE: &str = "No delivery issues found in the specified criteria";

const WORST_DAYS: usize = 3;
const TOP_CITIES: usize = 5;
const TOP_WAREHOUSES: usize = 5;

// ============================================================================
// Result Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CauseStats {
    pub failure_count: usize,
    pub avg_delay_days: f64,
    pub lost_revenue: f64,
    pub avg_rating: Option<f64>,
    pub critical_cases: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityImpact {
    pub orders: usize,
    pub lost_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub worst_days: IndexMap<String, usize>,
    pub most_affected_cities: IndexMap<String, CityImpact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problematic_warehouses: Option<IndexMap<String, usize>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CauseReport {
    pub root_cause_breakdown: IndexMap<String, CauseStats>,
    pub total_affected_orders: usize,
    pub total_lost_revenue: f64,
    pub average_delay: f64,
    pub insights: Insights,
}

/// Outcome of a root-cause explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CauseAnalysis {
    Report(CauseReport),
    NoIssues { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupPerformance {
    pub total_orders: usize,
    pub delayed_orders: usize,
    pub avg_delay_days: f64,
    pub total_revenue: f64,
    pub avg_rating: Option<f64>,
    pub delay_rate: f64,
}

/// Dimension value → performance, highest delay rate first
pub type ComparisonTable = IndexMap<String, GroupPerformance>;

/// Which analysis a query asks for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Analysis {
    ExplainCauses { limit: usize },
    Compare { dimension: String },
    Rank,
}

impl Analysis {
    pub fn name(&self) -> &'static str {
        match self {
            Analysis::ExplainCauses { .. } => "explain_causes",
            Analysis::Compare { .. } => "compare",
            Analysis::Rank => "rank",
        }
    }
}

/// Structured result handed to presentation and recommendation collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisResult {
    Causes(CauseAnalysis),
    Comparison(ComparisonTable),
    Error { error: String },
}

// ============================================================================
// Aggregation
// ============================================================================

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[derive(Debug, Default)]
struct Tally {
    count: usize,
    delayed: usize,
    delay_sum: i64,
    amount_sum: f64,
    rating_sum: f64,
    rating_n: usize,
    critical: usize,
}

impl Tally {
    fn add(&mut self, r: &IntegratedRecord) {
        self.count += 1;
        if r.features.is_delayed {
            self.delayed += 1;
        }
        self.delay_sum += r.features.delivery_delay_days;
        self.amount_sum += r.order.amount.filter(|a| !a.is_nan()).unwrap_or(0.0);
        if let Some(rating) = r.rating().filter(|v| !v.is_nan()) {
            self.rating_sum += rating;
            self.rating_n += 1;
        }
        if r.features.severity == Severity::Critical {
            self.critical += 1;
        }
    }

    fn avg_delay(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.delay_sum as f64 / self.count as f64
        }
    }

    fn avg_rating(&self) -> Option<f64> {
        (self.rating_n > 0).then(|| self.rating_sum / self.rating_n as f64)
    }

    fn delay_rate(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.delayed as f64 / self.count as f64 * 100.0
        }
    }
}

/// Group records by key, skipping null keys. Groups come back in key order.
fn group_by<'a, I, K>(records: I, key: K) -> BTreeMap<String, Tally>
where
    I: IntoIterator<Item = &'a IntegratedRecord>,
    K: Fn(&IntegratedRecord) -> Option<String>,
{
    let mut groups: BTreeMap<String, Tally> = BTreeMap::new();
    for r in records {
        if let Some(k) = key(r) {
            groups.entry(k).or_default().add(r);
        }
    }
    groups
}

/// Sort groups descending by `metric`; stable, so ties keep key order
fn ranked<F>(groups: BTreeMap<String, Tally>, metric: F) -> Vec<(String, Tally)>
where
    F: Fn(&Tally) -> f64,
{
    let mut rows: Vec<(String, Tally)> = groups.into_iter().collect();
    rows.sort_by(|a, b| metric(&b.1).total_cmp(&metric(&a.1)));
    rows
}

fn by_count(t: &Tally) -> f64 {
    t.count as f64
}

pub fn is_problem(r: &IntegratedRecord) -> bool {
    r.features.is_delayed || matches!(r.status(), Some(OrderStatus::Failed | OrderStatus::Returned))
}

// ============================================================================
// Operations
// ============================================================================

/// Root causes of problem orders with impact metrics and insights
pub fn explain_delivery_causes(view: &View<'_>, limit: usize) -> CauseAnalysis {
    let problems: Vec<&IntegratedRecord> = view.iter().filter(|r| is_problem(r)).collect();
    if problems.is_empty() {
        return CauseAnalysis::NoIssues {
            message: NO_ISSUES_MESSAGE.to_string(),
        };
    }

    let causes = group_by(problems.iter().copied(), |r| Some(r.features.primary_root_cause.clone()));
    let root_cause_breakdown = ranked(causes, by_count)
        .into_iter()
        .take(limit)
        .map(|(cause, t)| {
            let stats = CauseStats {
                failure_count: t.count,
                avg_delay_days: round2(t.avg_delay()),
                lost_revenue: round2(t.amount_sum),
                avg_rating: t.avg_rating().map(round2),
                critical_cases: t.critical,
            };
            (cause, stats)
        })
        .collect();

    let days = group_by(problems.iter().copied(), |r| r.features.order_day_of_week.clone());
    let worst_days = ranked(days, by_count)
        .into_iter()
        .take(WORST_DAYS)
        .map(|(day, t)| (day, t.count))
        .collect();

    let cities = group_by(problems.iter().copied(), |r| r.order.city.clone());
    let most_affected_cities = ranked(cities, by_count)
        .into_iter()
        .take(TOP_CITIES)
        .map(|(city, t)| {
            let impact = CityImpact {
                orders: t.count,
                lost_revenue: round2(t.amount_sum),
            };
            (city, impact)
        })
        .collect();

    let problematic_warehouses = view.schema().has(Field::WarehouseName).then(|| {
        let warehouses = group_by(problems.iter().copied(), |r| r.warehouse_name().map(String::from));
        ranked(warehouses, by_count)
            .into_iter()
            .take(TOP_WAREHOUSES)
            .map(|(name, t)| (name, t.count))
            .collect()
    });

    let mut totals = Tally::default();
    for r in &problems {
        totals.add(r);
    }

    CauseAnalysis::Report(CauseReport {
        root_cause_breakdown,
        total_affected_orders: totals.count,
        total_lost_revenue: round2(totals.amount_sum),
        average_delay: round2(totals.avg_delay()),
        insights: Insights {
            worst_days,
            most_affected_cities,
            problematic_warehouses,
        },
    })
}

/// Performance per value of `dimension`, worst delay rate first
pub fn compare_performance(view: &View<'_>, dimension: &str) -> Result<ComparisonTable, AnalysisError> {
    let field = view
        .schema()
        .field(dimension)
        .ok_or_else(|| AnalysisError::UnknownDimension(dimension.to_string()))?;

    let groups = group_by(view.iter(), |r| r.value(field));
    Ok(ranked(groups, Tally::delay_rate)
        .into_iter()
        .map(|(key, t)| {
            let perf = GroupPerformance {
                total_orders: t.count,
                delayed_orders: t.delayed,
                avg_delay_days: round2(t.avg_delay()),
                total_revenue: round2(t.amount_sum),
                avg_rating: t.avg_rating().map(round2),
                delay_rate: round2(t.delay_rate()),
            };
            (key, perf)
        })
        .collect())
}

/// Top root causes, shorter list
pub fn rank(view: &View<'_>) -> CauseAnalysis {
    explain_delivery_causes(view, DEFAULT_RANK_LIMIT)
}

/// Dispatch an analysis selector; query errors become structured results
pub fn run(view: &View<'_>, analysis: &Analysis) -> AnalysisResult {
    match analysis {
        Analysis::ExplainCauses { limit } => AnalysisResult::Causes(explain_delivery_causes(view, *limit)),
        Analysis::Rank => AnalysisResult::Causes(rank(view)),
        Analysis::Compare { dimension } => match compare_performance(view, dimension) {
            Ok(table) => AnalysisResult::Comparison(table),
            Err(e) => AnalysisResult::Error { error: e.to_string() },
        },
    }
}
