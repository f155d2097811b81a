//! Dataset integrator
//!
//! Builds one integrated record per order by running a fixed list of
//! enrichment [`Stage`]s over the order table. Every stage is a left join:
//! lookup tables are indexed first-seen per key and multi-row sources are
//! reduced per order beforehand, so the record count always equals the
//! order count.

use crate::error::DatasetError;
use crate::features::{self, Features};
use crate::loader::{Source, SourceSet};
use crate::models::{
    Client, Driver, ExternalFactor, Feedback, FleetLog, Order, OrderStatus, Warehouse,
    WarehouseLog,
};
use crate::reduce::reduce_by_order;
use crate::schema::{Field, Schema};
use std::collections::HashMap;
use tracing::{debug, info};

/// One order with everything joined onto it
#[derive(Debug, Clone)]
pub struct IntegratedRecord {
    pub order: Order,
    pub warehouse: Option<Warehouse>,
    pub client: Option<Client>,
    pub fleet: Option<FleetLog>,
    pub driver: Option<Driver>,
    pub warehouse_log: Option<WarehouseLog>,
    pub external: Option<ExternalFactor>,
    pub feedback: Option<Feedback>,
    pub features: Features,
}

impl IntegratedRecord {
    pub fn new(order: Order) -> Self {
        Self {
            order,
            warehouse: None,
            client: None,
            fleet: None,
            driver: None,
            warehouse_log: None,
            external: None,
            feedback: None,
            features: Features::default(),
        }
    }

    pub fn status(&self) -> Option<OrderStatus> {
        self.order.status.as_deref().map(OrderStatus::from)
    }

    pub fn warehouse_name(&self) -> Option<&str> {
        self.warehouse.as_ref().and_then(|w| w.warehouse_name.as_deref())
    }

    pub fn client_name(&self) -> Option<&str> {
        self.client.as_ref().and_then(|c| c.client_name.as_deref())
    }

    pub fn rating(&self) -> Option<f64> {
        self.feedback.as_ref().and_then(|f| f.rating)
    }

    /// Text value of a column, `None` for nulls
    pub fn value(&self, field: Field) -> Option<String> {
        fn text(v: &Option<String>) -> Option<String> {
            v.clone()
        }
        fn num(v: Option<f64>) -> Option<String> {
            v.map(|v| v.to_string())
        }
        fn stamp(v: Option<chrono::NaiveDateTime>) -> Option<String> {
            v.map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
        }

        let o = &self.order;
        let wh = self.warehouse.as_ref();
        let fleet = self.fleet.as_ref();
        let log = self.warehouse_log.as_ref();
        let ext = self.external.as_ref();
        let fb = self.feedback.as_ref();
        let ft = &self.features;

        match field {
            Field::OrderId => Some(o.order_id.clone()),
            Field::ClientId => text(&o.client_id),
            Field::City => text(&o.city),
            Field::OrderDate => stamp(o.order_date),
            Field::PromisedDeliveryDate => stamp(o.promised_delivery_date),
            Field::ActualDeliveryDate => stamp(o.actual_delivery_date),
            Field::CreatedAt => stamp(o.created_at),
            Field::Status => text(&o.status),
            Field::FailureReason => text(&o.failure_reason),
            Field::Amount => num(o.amount),
            Field::OrderNotes => text(&o.notes),
            Field::WarehouseId => wh.map(|w| w.warehouse_id.clone()),
            Field::WarehouseName => wh.and_then(|w| text(&w.warehouse_name)),
            Field::Capacity => wh.and_then(|w| num(w.capacity)),
            Field::ManagerName => wh.and_then(|w| text(&w.manager_name)),
            Field::ClientName => self.client.as_ref().and_then(|c| text(&c.client_name)),
            Field::ContactPerson => self.client.as_ref().and_then(|c| text(&c.contact_person)),
            Field::DriverId => fleet.and_then(|f| text(&f.driver_id)),
            Field::VehicleNumber => fleet.and_then(|f| text(&f.vehicle_number)),
            Field::RouteCode => fleet.and_then(|f| text(&f.route_code)),
            Field::GpsDelayNotes => fleet.and_then(|f| text(&f.gps_delay_notes)),
            Field::DepartureTime => fleet.and_then(|f| text(&f.departure_time)),
            Field::ArrivalTime => fleet.and_then(|f| text(&f.arrival_time)),
            Field::DriverName => self.driver.as_ref().and_then(|d| text(&d.driver_name)),
            Field::PartnerCompany => self.driver.as_ref().and_then(|d| text(&d.partner_company)),
            Field::DriverStatus => self.driver.as_ref().and_then(|d| text(&d.status)),
            Field::PickingStart => log.and_then(|l| text(&l.picking_start)),
            Field::PickingEnd => log.and_then(|l| text(&l.picking_end)),
            Field::DispatchTime => log.and_then(|l| text(&l.dispatch_time)),
            Field::WarehouseNotes => log.and_then(|l| text(&l.notes)),
            Field::TrafficCondition => ext.and_then(|e| text(&e.traffic_condition)),
            Field::WeatherCondition => ext.and_then(|e| text(&e.weather_condition)),
            Field::EventType => ext.and_then(|e| text(&e.event_type)),
            Field::FeedbackText => fb.and_then(|f| text(&f.feedback_text)),
            Field::Sentiment => fb.and_then(|f| text(&f.sentiment)),
            Field::Rating => fb.and_then(|f| num(f.rating)),
            Field::DeliveryDelayDays => Some(ft.delivery_delay_days.to_string()),
            Field::IsDelayed => Some(ft.is_delayed.to_string()),
            Field::PrimaryRootCause => Some(ft.primary_root_cause.clone()),
            Field::Severity => Some(ft.severity.to_string()),
            Field::OrderHour => ft.order_hour.map(|h| h.to_string()),
            Field::OrderDayOfWeek => ft.order_day_of_week.clone(),
            Field::OrderMonth => ft.order_month.clone(),
        }
    }
}

/// Enrichment stages, run in [`Stage::PIPELINE`] order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Warehouses,
    Clients,
    FleetLogs,
    Drivers,
    WarehouseLogs,
    ExternalFactors,
    Feedback,
}

impl Stage {
    pub const PIPELINE: [Stage; 7] = [
        Stage::Warehouses,
        Stage::Clients,
        Stage::FleetLogs,
        Stage::Drivers,
        Stage::WarehouseLogs,
        Stage::ExternalFactors,
        Stage::Feedback,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Warehouses => "warehouse assignment",
            Stage::Clients => "client details",
            Stage::FleetLogs => "fleet summary",
            Stage::Drivers => "driver details",
            Stage::WarehouseLogs => "warehouse activity",
            Stage::ExternalFactors => "external factors",
            Stage::Feedback => "customer feedback",
        }
    }

    pub fn source(&self) -> Source {
        match self {
            Stage::Warehouses => Source::Warehouses,
            Stage::Clients => Source::Clients,
            Stage::FleetLogs => Source::FleetLogs,
            Stage::Drivers => Source::Drivers,
            Stage::WarehouseLogs => Source::WarehouseLogs,
            Stage::ExternalFactors => Source::ExternalFactors,
            Stage::Feedback => Source::Feedback,
        }
    }

    /// Columns the working table must already expose
    pub fn requires(&self) -> &'static [Field] {
        match self {
            Stage::Warehouses => &[Field::City],
            Stage::Clients => &[Field::ClientId],
            Stage::Drivers => &[Field::DriverId],
            Stage::FleetLogs | Stage::WarehouseLogs | Stage::ExternalFactors | Stage::Feedback => {
                &[Field::OrderId]
            }
        }
    }

    pub fn produces(&self) -> &'static [(&'static str, Field)] {
        match self {
            Stage::Warehouses => &[
                ("warehouse_id", Field::WarehouseId),
                ("warehouse_name", Field::WarehouseName),
                ("capacity", Field::Capacity),
                ("manager_name", Field::ManagerName),
            ],
            Stage::Clients => &[
                ("client_name", Field::ClientName),
                ("contact_person", Field::ContactPerson),
            ],
            Stage::FleetLogs => &[
                ("driver_id", Field::DriverId),
                ("vehicle_number", Field::VehicleNumber),
                ("route_code", Field::RouteCode),
                ("gps_delay_notes", Field::GpsDelayNotes),
                ("departure_time", Field::DepartureTime),
                ("arrival_time", Field::ArrivalTime),
            ],
            Stage::Drivers => &[
                ("driver_name", Field::DriverName),
                ("partner_company", Field::PartnerCompany),
                ("status", Field::DriverStatus),
            ],
            Stage::WarehouseLogs => &[
                ("picking_start", Field::PickingStart),
                ("picking_end", Field::PickingEnd),
                ("dispatch_time", Field::DispatchTime),
                ("notes", Field::WarehouseNotes),
            ],
            Stage::ExternalFactors => &[
                ("traffic_condition", Field::TrafficCondition),
                ("weather_condition", Field::WeatherCondition),
                ("event_type", Field::EventType),
            ],
            Stage::Feedback => &[
                ("feedback_text", Field::FeedbackText),
                ("sentiment", Field::Sentiment),
                ("rating", Field::Rating),
            ],
        }
    }

    /// Suffix for produced columns whose name is already taken
    pub fn suffix(&self) -> &'static str {
        match self {
            Stage::Warehouses | Stage::WarehouseLogs => "warehouse",
            Stage::Clients => "client",
            Stage::FleetLogs => "fleet",
            Stage::Drivers => "driver",
            Stage::ExternalFactors => "external",
            Stage::Feedback => "feedback",
        }
    }

    fn apply(&self, sources: &SourceSet, records: &mut [IntegratedRecord]) {
        match self {
            Stage::Warehouses => {
                let Some(table) = &sources.warehouses else { return };
                let mut by_city: HashMap<&str, &str> = HashMap::new();
                for w in table.rows() {
                    if let Some(city) = w.city.as_deref() {
                        by_city.entry(city).or_insert(w.warehouse_id.as_str());
                    }
                }
                let by_id = index_first(table.rows(), |w| w.warehouse_id.as_str());
                for r in records.iter_mut() {
                    r.warehouse = r
                        .order
                        .city
                        .as_deref()
                        .and_then(|city| by_city.get(city))
                        .and_then(|id| by_id.get(id))
                        .map(|w| (*w).clone());
                }
            }
            Stage::Clients => {
                let Some(table) = &sources.clients else { return };
                let by_id = index_first(table.rows(), |c| c.client_id.as_str());
                for r in records.iter_mut() {
                    r.client = r
                        .order
                        .client_id
                        .as_deref()
                        .and_then(|id| by_id.get(id))
                        .map(|c| (*c).clone());
                }
            }
            Stage::FleetLogs => {
                let Some(table) = &sources.fleet_logs else { return };
                let reduced = reduce_by_order(table.rows());
                for r in records.iter_mut() {
                    r.fleet = reduced.get(&r.order.order_id).cloned();
                }
            }
            Stage::Drivers => {
                let Some(table) = &sources.drivers else { return };
                let by_id = index_first(table.rows(), |d| d.driver_id.as_str());
                for r in records.iter_mut() {
                    r.driver = r
                        .fleet
                        .as_ref()
                        .and_then(|f| f.driver_id.as_deref())
                        .and_then(|id| by_id.get(id))
                        .map(|d| (*d).clone());
                }
            }
            Stage::WarehouseLogs => {
                let Some(table) = &sources.warehouse_logs else { return };
                let reduced = reduce_by_order(table.rows());
                for r in records.iter_mut() {
                    r.warehouse_log = reduced.get(&r.order.order_id).cloned();
                }
            }
            Stage::ExternalFactors => {
                let Some(table) = &sources.external_factors else { return };
                let reduced = reduce_by_order(table.rows());
                for r in records.iter_mut() {
                    r.external = reduced.get(&r.order.order_id).cloned();
                }
            }
            Stage::Feedback => {
                let Some(table) = &sources.feedback else { return };
                let reduced = reduce_by_order(table.rows());
                for r in records.iter_mut() {
                    r.feedback = reduced.get(&r.order.order_id).cloned();
                }
            }
        }
    }
}

/// First row per key; later duplicates are ignored
fn index_first<'a, T>(rows: &'a [T], key: impl Fn(&'a T) -> &'a str) -> HashMap<&'a str, &'a T> {
    let mut index = HashMap::new();
    for row in rows {
        index.entry(key(row)).or_insert(row);
    }
    index
}

/// The integrated, feature-enriched record set; immutable once built
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Schema,
    records: Vec<IntegratedRecord>,
    warnings: Vec<String>,
}

impl Dataset {
    pub fn build(sources: &SourceSet) -> Result<Self, DatasetError> {
        info!("Creating integrated dataset...");

        let orders = sources.orders.as_ref().ok_or(DatasetError::MissingSource {
            source_name: Source::Orders.name(),
            file_name: Source::Orders.file_name(),
        })?;
        debug!("Base orders columns: {:?}", orders.columns());

        let mut schema = Schema::for_orders(orders.columns());
        let mut records: Vec<IntegratedRecord> = orders
            .rows()
            .iter()
            .cloned()
            .map(|row| IntegratedRecord::new(row.into_order()))
            .collect();

        for stage in Stage::PIPELINE {
            if !sources.is_present(stage.source()) {
                debug!("Skipping {}: {} not loaded", stage.name(), stage.source());
                continue;
            }
            if let Some(missing) = stage.requires().iter().find(|f| !schema.has(**f)) {
                info!("Skipping {}: working table lacks {:?}", stage.name(), missing);
                continue;
            }
            stage.apply(sources, &mut records);
            for (name, field) in stage.produces() {
                schema.register(name, *field, stage.suffix());
            }
            debug!("Applied {}", stage.name());
        }

        let warnings = features::derive_features(&mut schema, &mut records);
        debug!("Integrated columns: {:?}", schema.names().collect::<Vec<_>>());

        info!(
            "Integrated dataset created: {} records with {} features",
            records.len(),
            schema.len()
        );

        Ok(Self {
            schema,
            records,
            warnings,
        })
    }

    /// Recompute derived columns; returns any new warnings
    pub fn rederive(&mut self) -> Vec<String> {
        features::derive_features(&mut self.schema, &mut self.records)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[IntegratedRecord] {
        &self.records
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Borrowed view over every record
    pub fn view(&self) -> View<'_> {
        View::new(&self.schema, self.records.iter().collect())
    }
}

/// A borrowed subset of a [`Dataset`]
#[derive(Debug, Clone)]
pub struct View<'a> {
    schema: &'a Schema,
    records: Vec<&'a IntegratedRecord>,
}

impl<'a> View<'a> {
    pub(crate) fn new(schema: &'a Schema, records: Vec<&'a IntegratedRecord>) -> Self {
        Self { schema, records }
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    pub fn records(&self) -> &[&'a IntegratedRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a IntegratedRecord> + '_ {
        self.records.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
