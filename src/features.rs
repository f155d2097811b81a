//! Root-cause feature engine
//!
//! Appends the derived columns (delay, delayed flag, root cause, severity,
//! calendar breakdown) to integrated records. Classification is driven by
//! ordered rule tables where a later matching rule overrides an earlier one.
//! Every derived value is a pure function of the joined columns, so running
//! the engine twice yields the same result.

use crate::integrate::IntegratedRecord;
use crate::models::{OrderStatus, Severity};
use crate::schema::{Field, Schema, DERIVED_COLUMNS};
use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Features {
    pub delivery_delay_days: i64,
    pub is_delayed: bool,
    pub primary_root_cause: String,
    pub severity: Severity,
    pub order_hour: Option<u32>,
    pub order_day_of_week: Option<String>,
    pub order_month: Option<String>,
}

pub const DEFAULT_ROOT_CAUSE: &str = "Other/Unknown";

/// Inputs the classification rules look at
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub failure_reason: Option<&'a str>,
    pub status: Option<OrderStatus>,
    pub delay_days: i64,
}

impl<'a> RuleContext<'a> {
    fn reason(&self) -> Option<&'a str> {
        self.failure_reason.filter(|r| !r.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Condition {
    /// Case-insensitive substring match on the failure reason
    ReasonContains(&'static [&'static str]),
    StatusIs(OrderStatus),
    DelayOver(i64),
}

impl Condition {
    pub fn holds(&self, ctx: &RuleContext<'_>) -> bool {
        match self {
            Condition::ReasonContains(keywords) => ctx.reason().is_some_and(|reason| {
                let reason = reason.to_lowercase();
                keywords.iter().any(|k| reason.contains(k))
            }),
            Condition::StatusIs(status) => ctx.status == Some(*status),
            Condition::DelayOver(days) => ctx.delay_days > *days,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum CauseLabel {
    Fixed(&'static str),
    /// The failure reason verbatim, or the fallback when it is empty
    FailureReasonOr(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct CauseRule {
    pub condition: Condition,
    pub label: CauseLabel,
}

/// Root-cause rules in precedence order; the last match wins
pub const ROOT_CAUSE_RULES: &[CauseRule] = &[
    CauseRule {
        condition: Condition::ReasonContains(&["traffic", "congestion"]),
        label: CauseLabel::Fixed("Traffic Congestion"),
    },
    CauseRule {
        condition: Condition::ReasonContains(&["weather", "disruption"]),
        label: CauseLabel::Fixed("Weather Disruption"),
    },
    CauseRule {
        condition: Condition::ReasonContains(&["warehouse", "delay"]),
        label: CauseLabel::Fixed("Warehouse Operations"),
    },
    CauseRule {
        condition: Condition::ReasonContains(&["address"]),
        label: CauseLabel::Fixed("Address Issues"),
    },
    CauseRule {
        condition: Condition::ReasonContains(&["stock"]),
        label: CauseLabel::Fixed("Stock Unavailability"),
    },
    CauseRule {
        condition: Condition::ReasonContains(&["vehicle", "breakdown"]),
        label: CauseLabel::Fixed("Vehicle Issues"),
    },
    CauseRule {
        condition: Condition::StatusIs(OrderStatus::Failed),
        label: CauseLabel::FailureReasonOr("Unknown Failure"),
    },
    CauseRule {
        condition: Condition::StatusIs(OrderStatus::Returned),
        label: CauseLabel::Fixed("Customer Return"),
    },
    CauseRule {
        condition: Condition::StatusIs(OrderStatus::Pending),
        label: CauseLabel::Fixed("Processing Delay"),
    },
];

#[derive(Debug, Clone, Copy)]
pub struct SeverityRule {
    pub condition: Condition,
    pub severity: Severity,
}

/// Severity tiers in precedence order; the last match wins, default Low
pub const SEVERITY_RULES: &[SeverityRule] = &[
    SeverityRule {
        condition: Condition::DelayOver(2),
        severity: Severity::Medium,
    },
    SeverityRule {
        condition: Condition::DelayOver(5),
        severity: Severity::High,
    },
    SeverityRule {
        condition: Condition::StatusIs(OrderStatus::Failed),
        severity: Severity::Critical,
    },
];

pub fn classify_root_cause(ctx: &RuleContext<'_>) -> String {
    ROOT_CAUSE_RULES
        .iter()
        .rev()
        .find(|rule| rule.condition.holds(ctx))
        .map(|rule| match rule.label {
            CauseLabel::Fixed(label) => label.to_string(),
            CauseLabel::FailureReasonOr(fallback) => ctx.reason().unwrap_or(fallback).to_string(),
        })
        .unwrap_or_else(|| DEFAULT_ROOT_CAUSE.to_string())
}

pub fn classify_severity(ctx: &RuleContext<'_>) -> Severity {
    SEVERITY_RULES
        .iter()
        .rev()
        .find(|rule| rule.condition.holds(ctx))
        .map(|rule| rule.severity)
        .unwrap_or_default()
}

/// Whole days from promised to actual delivery, floored; 0 when either is missing
pub fn delay_days(promised: Option<NaiveDateTime>, actual: Option<NaiveDateTime>) -> i64 {
    match (promised, actual) {
        (Some(p), Some(a)) => (a - p).num_seconds().div_euclid(86_400),
        _ => 0,
    }
}

pub fn is_delayed(delay_days: i64, status: Option<OrderStatus>) -> bool {
    delay_days > 0
        || matches!(
            status,
            Some(OrderStatus::Failed | OrderStatus::Returned | OrderStatus::Pending)
        )
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

fn month_name(dt: &NaiveDateTime) -> Option<String> {
    MONTH_NAMES.get(dt.month0() as usize).map(|m| m.to_string())
}

/// Compute derived features for one record
pub fn derive(record: &IntegratedRecord) -> Features {
    let order = &record.order;
    let delay = delay_days(order.promised_delivery_date, order.actual_delivery_date);
    let ctx = RuleContext {
        failure_reason: order.failure_reason.as_deref(),
        status: record.status(),
        delay_days: delay,
    };

    Features {
        delivery_delay_days: delay,
        is_delayed: is_delayed(delay, ctx.status),
        primary_root_cause: classify_root_cause(&ctx),
        severity: classify_severity(&ctx),
        order_hour: order.order_date.map(|d| d.hour()),
        order_day_of_week: order.order_date.map(|d| weekday_name(d.weekday()).to_string()),
        order_month: order.order_date.as_ref().and_then(month_name),
    }
}

/// Derive features for every record in place. Returns warnings for columns
/// that had to be defaulted.
pub fn derive_features(schema: &mut Schema, records: &mut [IntegratedRecord]) -> Vec<String> {
    let mut warnings = Vec::new();

    if !schema.has(Field::Status) {
        let msg = format!(
            "'status' column missing after merges; defaulting to '{}'",
            OrderStatus::SENTINEL
        );
        warn!("{}", msg);
        warnings.push(msg);
        schema.register("status", Field::Status, "order");
        for r in records.iter_mut() {
            r.order.status = Some(OrderStatus::SENTINEL.to_string());
        }
    }

    for r in records.iter_mut() {
        r.features = derive(r);
    }

    for (name, field) in DERIVED_COLUMNS {
        schema.register(name, *field, "derived");
    }

    warnings
}
