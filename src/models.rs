use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw order row from `orders.csv`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderRow {
    pub order_id: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub order_date: Option<String>,
    #[serde(default)]
    pub promised_delivery_date: Option<String>,
    #[serde(default)]
    pub actual_delivery_date: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub amount: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Order with its date columns parsed
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub order_id: String,
    pub client_id: Option<String>,
    pub city: Option<String>,
    pub order_date: Option<NaiveDateTime>,
    pub promised_delivery_date: Option<NaiveDateTime>,
    pub actual_delivery_date: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
    pub status: Option<String>,
    pub failure_reason: Option<String>,
    pub amount: Option<f64>,
    pub notes: Option<String>,
}

impl OrderRow {
    /// Unparsable dates become `None` instead of failing the row.
    pub fn into_order(self) -> Order {
        Order {
            order_date: self.order_date.as_deref().and_then(parse_timestamp),
            promised_delivery_date: self.promised_delivery_date.as_deref().and_then(parse_timestamp),
            actual_delivery_date: self.actual_delivery_date.as_deref().and_then(parse_timestamp),
            created_at: self.created_at.as_deref().and_then(parse_timestamp),
            order_id: self.order_id,
            client_id: self.client_id,
            city: self.city,
            status: self.status,
            failure_reason: self.failure_reason,
            amount: self.amount,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Warehouse {
    pub warehouse_id: String,
    #[serde(default)]
    pub warehouse_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub capacity: Option<f64>,
    #[serde(default)]
    pub manager_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Client {
    pub client_id: String,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub contact_person: Option<String>,
}

/// One fleet log entry; several may exist per order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetLog {
    pub order_id: String,
    #[serde(default)]
    pub driver_id: Option<String>,
    #[serde(default)]
    pub vehicle_number: Option<String>,
    #[serde(default)]
    pub route_code: Option<String>,
    #[serde(default)]
    pub gps_delay_notes: Option<String>,
    #[serde(default)]
    pub departure_time: Option<String>,
    #[serde(default)]
    pub arrival_time: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Driver {
    pub driver_id: String,
    #[serde(default)]
    pub driver_name: Option<String>,
    #[serde(default)]
    pub partner_company: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Warehouse picking/dispatch activity for an order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WarehouseLog {
    pub order_id: String,
    #[serde(default)]
    pub picking_start: Option<String>,
    #[serde(default)]
    pub picking_end: Option<String>,
    #[serde(default)]
    pub dispatch_time: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalFactor {
    pub order_id: String,
    #[serde(default)]
    pub traffic_condition: Option<String>,
    #[serde(default)]
    pub weather_condition: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Feedback {
    pub order_id: String,
    #[serde(default)]
    pub feedback_text: Option<String>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub rating: Option<f64>,
}

/// Order lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderStatus {
    Delivered,
    Failed,
    Returned,
    Pending,
    Unknown,
    Other,
}

/// Exact, case-sensitive match; anything else is `Other`
impl From<&str> for OrderStatus {
    fn from(s: &str) -> Self {
        match s {
            "Delivered" => OrderStatus::Delivered,
            "Failed" => OrderStatus::Failed,
            "Returned" => OrderStatus::Returned,
            "Pending" => OrderStatus::Pending,
            "Unknown" => OrderStatus::Unknown,
            _ => OrderStatus::Other,
        }
    }
}

impl OrderStatus {
    /// Sentinel written when the status column is missing entirely
    pub const SENTINEL: &'static str = "Unknown";
}

/// Impact tier of a problem order
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        };
        f.write_str(s)
    }
}

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%m/%d/%Y"];

/// Parse a timestamp or plain date (midnight); anything else is `None`
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_timestamp_formats() {
        let dt = parse_timestamp("2024-01-10 14:30:00").unwrap();
        assert_eq!(dt.hour(), 14);
        let dt = parse_timestamp("2024-01-10").unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert!(parse_timestamp("2024-01-10T08:00:00Z").is_some());
    }

    #[test]
    fn test_unparsable_timestamp_is_none() {
        assert!(parse_timestamp("not a date").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(OrderStatus::from("Failed"), OrderStatus::Failed);
        assert_eq!(OrderStatus::from("Returned"), OrderStatus::Returned);
        assert_eq!(OrderStatus::from(" returned "), OrderStatus::Other);
        assert_eq!(OrderStatus::from("failed"), OrderStatus::Other);
        assert_eq!(OrderStatus::from("In Transit"), OrderStatus::Other);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert_eq!(Severity::default().to_string(), "Low");
    }
}
