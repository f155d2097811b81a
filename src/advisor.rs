//! Recommendation collaborator
//!
//! Turns an [`AnalysisResult`] into actionable recommendations. An external
//! [`RecommendationSource`] may be injected through [`Capabilities`]; when it
//! is absent, declines, or fails, the built-in playbooks are used.

use crate::analytics::{AnalysisResult, CauseAnalysis, CauseReport, ComparisonTable};
use crate::error::AdvisorError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ============================================================================
// Playbooks
// ============================================================================

/// Actions for a family of root causes
#[derive(Debug, Clone)]
pub struct Playbook {
    /// Lowercase fragment looked for in the top cause label
    pub keyword: &'static str,
    pub name: &'static str,
    pub actions: &'static [&'static str],
}

/// Checked in order; the first playbook whose keyword occurs in the top cause applies
pub const PLAYBOOKS: &[Playbook] = &[
    Playbook {
        keyword: "traffic",
        name: "Traffic Congestion",
        actions: &[
            "Optimize delivery routes to avoid peak traffic hours",
            "Implement real-time traffic monitoring and route adjustment",
            "Consider alternative delivery time slots during low-traffic periods",
        ],
    },
    Playbook {
        keyword: "weather",
        name: "Weather Disruption",
        actions: &[
            "Develop weather contingency plans for deliveries",
            "Invest in weather-appropriate delivery vehicles",
            "Implement proactive customer communication during weather events",
        ],
    },
    Playbook {
        keyword: "warehouse",
        name: "Warehouse Operations",
        actions: &[
            "Review and optimize warehouse picking processes",
            "Implement better inventory management systems",
            "Increase staffing during peak periods",
        ],
    },
    Playbook {
        keyword: "address",
        name: "Address Issues",
        actions: &[
            "Implement address verification at order placement",
            "Train drivers on GPS navigation and customer communication",
            "Create a system for updating incorrect addresses",
        ],
    },
    Playbook {
        keyword: "stock",
        name: "Stock Unavailability",
        actions: &[
            "Improve demand forecasting and inventory planning",
            "Implement real-time stock visibility across warehouses",
            "Set up automatic stock replenishment alerts",
        ],
    },
    Playbook {
        keyword: "vehicle",
        name: "Vehicle Issues",
        actions: &[
            "Schedule preventive maintenance for the delivery fleet",
            "Keep standby vehicles at high-volume hubs",
            "Track breakdowns per vehicle and retire repeat offenders",
        ],
    },
];

pub fn playbook_for(cause: &str) -> Option<&'static Playbook> {
    let cause = cause.to_lowercase();
    PLAYBOOKS.iter().find(|p| cause.contains(p.keyword))
}

// ============================================================================
// Sources
// ============================================================================

/// Something that can propose recommendations for an analysis result.
///
/// `Ok(None)` means the source has nothing to add.
pub trait RecommendationSource: Send + Sync {
    fn name(&self) -> &str;

    fn recommend(&self, result: &AnalysisResult) -> Result<Option<Vec<String>>, AdvisorError>;
}

/// Optional enhancements available to the advisor
#[derive(Default)]
pub struct Capabilities {
    pub external: Option<Box<dyn RecommendationSource>>,
}

impl Capabilities {
    pub fn rules_only() -> Self {
        Self::default()
    }

    pub fn with_source(source: Box<dyn RecommendationSource>) -> Self {
        Self {
            external: Some(source),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Rules,
    External(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub source: Origin,
    pub items: Vec<String>,
}

pub struct Advisor {
    capabilities: Capabilities,
}

impl Advisor {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }

    pub fn recommend(&self, result: &AnalysisResult) -> Recommendations {
        if let Some(source) = &self.capabilities.external {
            match source.recommend(result) {
                Ok(Some(items)) if !items.is_empty() => {
                    debug!("Using {} recommendations from {}", items.len(), source.name());
                    return Recommendations {
                        source: Origin::External(source.name().to_string()),
                        items,
                    };
                }
                Ok(_) => debug!("{} had no recommendations; using rules", source.name()),
                Err(e) => warn!("{}; falling back to rule-based recommendations", e),
            }
        }

        Recommendations {
            source: Origin::Rules,
            items: rule_based(result),
        }
    }
}

impl Default for Advisor {
    fn default() -> Self {
        Self::new(Capabilities::rules_only())
    }
}

// ============================================================================
// Rules
// ============================================================================

pub fn rule_based(result: &AnalysisResult) -> Vec<String> {
    match result {
        AnalysisResult::Causes(CauseAnalysis::Report(report)) => for_report(report),
        AnalysisResult::Comparison(table) => for_comparison(table),
        AnalysisResult::Causes(CauseAnalysis::NoIssues { .. }) | AnalysisResult::Error { .. } => Vec::new(),
    }
}

fn for_report(report: &CauseReport) -> Vec<String> {
    let mut recs = Vec::new();

    // breakdown is sorted by count, so the first entry is the top cause
    if let Some(book) = report.root_cause_breakdown.keys().next().and_then(|c| playbook_for(c)) {
        recs.extend(book.actions.iter().map(|a| a.to_string()));
    }

    if let Some(day) = report.insights.worst_days.keys().next() {
        recs.push(format!(
            "Focus additional resources on {}s to handle higher failure rates",
            day
        ));
    }

    if let Some(city) = report.insights.most_affected_cities.keys().next() {
        recs.push(format!("Prioritize operational improvements in {}", city));
    }

    recs
}

fn for_comparison(table: &ComparisonTable) -> Vec<String> {
    let Some((name, worst)) = table.first() else {
        return Vec::new();
    };
    if worst.delayed_orders == 0 {
        return Vec::new();
    }

    let mut recs = vec![format!(
        "Review operations for {}: {:.1}% of {} orders delayed",
        name, worst.delay_rate, worst.total_orders
    )];
    if let Some((best, perf)) = table.last().filter(|(k, _)| *k != name) {
        recs.push(format!(
            "Use {} ({:.1}% delayed) as the benchmark for process improvements",
            best, perf.delay_rate
        ));
    }
    recs
}
