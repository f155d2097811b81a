//! Column registry of the integrated table
//!
//! Maps visible column names to typed [`Field`]s. Stages register what they
//! produce; an incoming name that is already taken is suffixed instead of
//! replacing the existing column.

use indexmap::IndexMap;

/// Every typed column an integrated record can expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    OrderId,
    ClientId,
    City,
    OrderDate,
    PromisedDeliveryDate,
    ActualDeliveryDate,
    CreatedAt,
    Status,
    FailureReason,
    Amount,
    OrderNotes,
    WarehouseId,
    WarehouseName,
    Capacity,
    ManagerName,
    ClientName,
    ContactPerson,
    DriverId,
    VehicleNumber,
    RouteCode,
    GpsDelayNotes,
    DepartureTime,
    ArrivalTime,
    DriverName,
    PartnerCompany,
    DriverStatus,
    PickingStart,
    PickingEnd,
    DispatchTime,
    WarehouseNotes,
    TrafficCondition,
    WeatherCondition,
    EventType,
    FeedbackText,
    Sentiment,
    Rating,
    DeliveryDelayDays,
    IsDelayed,
    PrimaryRootCause,
    Severity,
    OrderHour,
    OrderDayOfWeek,
    OrderMonth,
}

/// Order columns, keyed by their CSV header
pub const ORDER_COLUMNS: &[(&str, Field)] = &[
    ("order_id", Field::OrderId),
    ("client_id", Field::ClientId),
    ("city", Field::City),
    ("order_date", Field::OrderDate),
    ("promised_delivery_date", Field::PromisedDeliveryDate),
    ("actual_delivery_date", Field::ActualDeliveryDate),
    ("created_at", Field::CreatedAt),
    ("status", Field::Status),
    ("failure_reason", Field::FailureReason),
    ("amount", Field::Amount),
    ("notes", Field::OrderNotes),
];

/// Columns appended by the feature engine
pub const DERIVED_COLUMNS: &[(&str, Field)] = &[
    ("delivery_delay_days", Field::DeliveryDelayDays),
    ("is_delayed", Field::IsDelayed),
    ("primary_root_cause", Field::PrimaryRootCause),
    ("severity", Field::Severity),
    ("order_hour", Field::OrderHour),
    ("order_day_of_week", Field::OrderDayOfWeek),
    ("order_month", Field::OrderMonth),
];

#[derive(Debug, Clone, Default)]
pub struct Schema {
    columns: IndexMap<String, Field>,
}

impl Schema {
    /// Schema of an order table that carried the given header
    pub fn for_orders<S: AsRef<str>>(header: &[S]) -> Self {
        let mut schema = Schema::default();
        for (name, field) in ORDER_COLUMNS {
            if header.iter().any(|h| h.as_ref() == *name) {
                schema.columns.insert(name.to_string(), *field);
            }
        }
        schema
    }

    pub fn field(&self, name: &str) -> Option<Field> {
        self.columns.get(name).copied()
    }

    pub fn has(&self, field: Field) -> bool {
        self.columns.values().any(|f| *f == field)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Name under which `field` is exposed, if present
    pub fn name_of(&self, field: Field) -> Option<&str> {
        self.columns
            .iter()
            .find(|(_, f)| **f == field)
            .map(|(name, _)| name.as_str())
    }

    /// Register `field` as `name`, or `name_suffix` when `name` is taken.
    /// Re-registering a field that is already present is a no-op.
    pub fn register(&mut self, name: &str, field: Field, suffix: &str) {
        if self.has(field) {
            return;
        }
        let name = if self.contains(name) {
            format!("{}_{}", name, suffix)
        } else {
            name.to_string()
        };
        self.columns.insert(name, field);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_schema_follows_header() {
        let schema = Schema::for_orders(&["order_id", "city", "amount", "extra"]);
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.field("city"), Some(Field::City));
        assert!(!schema.contains("status"));
        assert!(!schema.contains("extra"));
    }

    #[test]
    fn test_collision_gets_suffix() {
        let mut schema = Schema::for_orders(&["order_id", "status", "notes"]);
        schema.register("status", Field::DriverStatus, "driver");
        schema.register("notes", Field::WarehouseNotes, "warehouse");
        assert_eq!(schema.field("status"), Some(Field::Status));
        assert_eq!(schema.field("status_driver"), Some(Field::DriverStatus));
        assert_eq!(schema.name_of(Field::WarehouseNotes), Some("notes_warehouse"));
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut schema = Schema::for_orders(&["order_id"]);
        schema.register("rating", Field::Rating, "feedback");
        schema.register("rating", Field::Rating, "feedback");
        assert_eq!(schema.len(), 2);
        assert!(!schema.contains("rating_feedback"));
    }
}
