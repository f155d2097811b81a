//! One-to-many → one-to-one reduction of secondary sources
//!
//! Each multi-row source picks a [`TextReducer`] or [`NumberReducer`] per
//! column; rows are grouped by `order_id` and collapsed so that a later left
//! join can never multiply orders.

use crate::models::{ExternalFactor, Feedback, FleetLog, WarehouseLog};
use std::collections::HashMap;

/// Reduction strategy for a text column
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextReducer {
    /// First non-null value
    First,
    /// Non-null, non-empty values joined with the separator
    Join(&'static str),
}

impl TextReducer {
    pub fn reduce<'a, I>(self, values: I) -> Option<String>
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut values = values.into_iter().flatten();
        match self {
            TextReducer::First => values.next().map(str::to_string),
            TextReducer::Join(sep) => {
                let parts: Vec<&str> = values.filter(|v| !v.trim().is_empty()).collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join(sep))
                }
            }
        }
    }
}

/// Reduction strategy for a numeric column; NaN counts as missing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberReducer {
    /// First non-null value
    First,
    /// Arithmetic mean of non-null values
    Mean,
}

impl NumberReducer {
    pub fn reduce<I>(self, values: I) -> Option<f64>
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let mut values = values.into_iter().flatten().filter(|v| !v.is_nan());
        match self {
            NumberReducer::First => values.next(),
            NumberReducer::Mean => {
                let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
                (n > 0).then(|| sum / n as f64)
            }
        }
    }
}

/// A multi-row source that collapses to one row per order
pub trait Reduce: Sized {
    fn order_id(&self) -> &str;
    fn reduce(order_id: &str, group: &[&Self]) -> Self;
}

/// Group rows by `order_id` and reduce each group
pub fn reduce_by_order<T: Reduce>(rows: &[T]) -> HashMap<String, T> {
    let mut groups: HashMap<&str, Vec<&T>> = HashMap::new();
    for row in rows {
        groups.entry(row.order_id()).or_default().push(row);
    }
    groups
        .into_iter()
        .map(|(id, group)| (id.to_string(), T::reduce(id, &group)))
        .collect()
}

/// Separator for free-text notes
pub const NOTES_SEPARATOR: &str = ", ";
/// Distinct separator for customer feedback text
pub const FEEDBACK_SEPARATOR: &str = " | ";

impl Reduce for FleetLog {
    fn order_id(&self) -> &str {
        &self.order_id
    }

    fn reduce(order_id: &str, group: &[&Self]) -> Self {
        let first = |f: fn(&FleetLog) -> Option<&str>| TextReducer::First.reduce(group.iter().map(|r| f(r)));
        FleetLog {
            order_id: order_id.to_string(),
            driver_id: first(|r| r.driver_id.as_deref()),
            vehicle_number: first(|r| r.vehicle_number.as_deref()),
            route_code: first(|r| r.route_code.as_deref()),
            gps_delay_notes: TextReducer::Join(NOTES_SEPARATOR)
                .reduce(group.iter().map(|r| r.gps_delay_notes.as_deref())),
            departure_time: first(|r| r.departure_time.as_deref()),
            arrival_time: first(|r| r.arrival_time.as_deref()),
        }
    }
}

impl Reduce for WarehouseLog {
    fn order_id(&self) -> &str {
        &self.order_id
    }

    fn reduce(order_id: &str, group: &[&Self]) -> Self {
        let first = |f: fn(&WarehouseLog) -> Option<&str>| TextReducer::First.reduce(group.iter().map(|r| f(r)));
        WarehouseLog {
            order_id: order_id.to_string(),
            picking_start: first(|r| r.picking_start.as_deref()),
            picking_end: first(|r| r.picking_end.as_deref()),
            dispatch_time: first(|r| r.dispatch_time.as_deref()),
            notes: TextReducer::Join(NOTES_SEPARATOR).reduce(group.iter().map(|r| r.notes.as_deref())),
        }
    }
}

impl Reduce for ExternalFactor {
    fn order_id(&self) -> &str {
        &self.order_id
    }

    fn reduce(order_id: &str, group: &[&Self]) -> Self {
        ExternalFactor {
            order_id: order_id.to_string(),
            traffic_condition: TextReducer::First.reduce(group.iter().map(|r| r.traffic_condition.as_deref())),
            weather_condition: TextReducer::First.reduce(group.iter().map(|r| r.weather_condition.as_deref())),
            event_type: TextReducer::Join(NOTES_SEPARATOR).reduce(group.iter().map(|r| r.event_type.as_deref())),
        }
    }
}

impl Reduce for Feedback {
    fn order_id(&self) -> &str {
        &self.order_id
    }

    fn reduce(order_id: &str, group: &[&Self]) -> Self {
        Feedback {
            order_id: order_id.to_string(),
            feedback_text: TextReducer::Join(FEEDBACK_SEPARATOR)
                .reduce(group.iter().map(|r| r.feedback_text.as_deref())),
            sentiment: TextReducer::First.reduce(group.iter().map(|r| r.sentiment.as_deref())),
            rating: NumberReducer::Mean.reduce(group.iter().map(|r| r.rating)),
        }
    }
}
