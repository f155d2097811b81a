//! Declarative record filters
//!
//! A [`FilterSpec`] is AND across keys and OR within a key's list. Empty or
//! absent keys do not constrain anything; a null in a constrained column
//! never matches.

use crate::integrate::{Dataset, IntegratedRecord, View};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    /// Exact city names, case-insensitive
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cities: Vec<String>,
    /// Inclusive lower bound on the order date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on the order date (whole day)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
    /// Client name substrings, case-insensitive
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub clients: Vec<String>,
    /// Warehouse name substrings, case-insensitive
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warehouses: Vec<String>,
}

impl FilterSpec {
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
            && self.date_from.is_none()
            && self.date_to.is_none()
            && self.clients.is_empty()
            && self.warehouses.is_empty()
    }

    /// Union with `other`; bounds from `other` take precedence when set
    pub fn merge(mut self, other: FilterSpec) -> FilterSpec {
        self.cities.extend(other.cities);
        self.clients.extend(other.clients);
        self.warehouses.extend(other.warehouses);
        self.date_from = other.date_from.or(self.date_from);
        self.date_to = other.date_to.or(self.date_to);
        self
    }

    pub fn matches(&self, record: &IntegratedRecord) -> bool {
        let order = &record.order;

        if !self.cities.is_empty() {
            let Some(city) = order.city.as_deref().map(str::to_lowercase) else { return false };
            if !self.cities.iter().any(|c| c.to_lowercase() == city) {
                return false;
            }
        }

        if self.date_from.is_some() || self.date_to.is_some() {
            let Some(day) = order.order_date.map(|d| d.date()) else { return false };
            if self.date_from.is_some_and(|from| day < from) {
                return false;
            }
            if self.date_to.is_some_and(|to| day > to) {
                return false;
            }
        }

        if !self.clients.is_empty() && !contains_any(record.client_name(), &self.clients) {
            return false;
        }

        if !self.warehouses.is_empty() && !contains_any(record.warehouse_name(), &self.warehouses) {
            return false;
        }

        true
    }
}

fn contains_any(value: Option<&str>, needles: &[String]) -> bool {
    let Some(value) = value else { return false };
    let value = value.to_lowercase();
    needles.iter().any(|n| value.contains(&n.to_lowercase()))
}

impl Dataset {
    /// Records matching `spec`; the dataset itself is untouched
    pub fn filter(&self, spec: &FilterSpec) -> View<'_> {
        let records = self.records().iter().filter(|r| spec.matches(r)).collect();
        View::new(self.schema(), records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderRow;

    fn record(city: Option<&str>, date: Option<&str>) -> IntegratedRecord {
        let order = OrderRow {
            order_id: "O1".into(),
            city: city.map(String::from),
            order_date: date.map(String::from),
            ..Default::default()
        }
        .into_order();
        IntegratedRecord::new(order)
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_empty_spec_matches_everything() {
        let spec = FilterSpec::default();
        assert!(spec.is_empty());
        assert!(spec.matches(&record(None, None)));
    }

    #[test]
    fn test_city_is_case_insensitive_exact() {
        let spec = FilterSpec {
            cities: vec!["mumbai".into()],
            ..Default::default()
        };
        assert!(spec.matches(&record(Some("Mumbai"), None)));
        assert!(!spec.matches(&record(Some("Navi Mumbai"), None)));
        assert!(!spec.matches(&record(None, None)));
    }

    #[test]
    fn test_date_bounds_are_inclusive() {
        let spec = FilterSpec {
            date_from: Some(day("2024-02-01")),
            date_to: Some(day("2024-02-29")),
            ..Default::default()
        };
        assert!(spec.matches(&record(None, Some("2024-02-01 00:00:00"))));
        assert!(spec.matches(&record(None, Some("2024-02-29 23:15:00"))));
        assert!(!spec.matches(&record(None, Some("2024-01-31 23:59:59"))));
        assert!(!spec.matches(&record(None, None)));
    }

    #[test]
    fn test_client_filter_requires_client_name() {
        let spec = FilterSpec {
            clients: vec!["acme".into()],
            ..Default::default()
        };
        assert!(!spec.matches(&record(Some("Pune"), None)));
    }

    #[test]
    fn test_deserialize_from_json() {
        let spec: FilterSpec =
            serde_json::from_str(r#"{"cities":["Delhi"],"date_from":"2024-03-01"}"#).unwrap();
        assert_eq!(spec.cities, vec!["Delhi".to_string()]);
        assert_eq!(spec.date_from, Some(day("2024-03-01")));
        assert!(spec.clients.is_empty());
    }

    #[test]
    fn test_merge_prefers_explicit_bounds() {
        let base = FilterSpec {
            cities: vec!["Delhi".into()],
            date_from: Some(day("2024-01-01")),
            ..Default::default()
        };
        let merged = base.merge(FilterSpec {
            cities: vec!["Pune".into()],
            date_from: Some(day("2024-02-01")),
            ..Default::default()
        });
        assert_eq!(merged.cities.len(), 2);
        assert_eq!(merged.date_from, Some(day("2024-02-01")));
    }
}
