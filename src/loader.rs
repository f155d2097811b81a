//! Source loader
//!
//! Reads each logical CSV source into an in-memory [`Table`]. Missing or
//! unreadable files are logged and treated as absent; only the integrator
//! decides whether an absent source is fatal.

use crate::error::DatasetError;
use crate::models::{
    Client, Driver, ExternalFactor, Feedback, FleetLog, OrderRow, Warehouse, WarehouseLog,
};
use csv::ReaderBuilder;
use serde::de::DeserializeOwned;
use std::fmt;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Logical source names, in load order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Orders,
    FleetLogs,
    WarehouseLogs,
    ExternalFactors,
    Feedback,
    Warehouses,
    Clients,
    Drivers,
}

impl Source {
    pub const ALL: [Source; 8] = [
        Source::Orders,
        Source::FleetLogs,
        Source::WarehouseLogs,
        Source::ExternalFactors,
        Source::Feedback,
        Source::Warehouses,
        Source::Clients,
        Source::Drivers,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Source::Orders => "orders",
            Source::FleetLogs => "fleet_logs",
            Source::WarehouseLogs => "warehouse_logs",
            Source::ExternalFactors => "external_factors",
            Source::Feedback => "feedback",
            Source::Warehouses => "warehouses",
            Source::Clients => "clients",
            Source::Drivers => "drivers",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Source::Orders => "orders.csv",
            Source::FleetLogs => "fleet_logs.csv",
            Source::WarehouseLogs => "warehouse_logs.csv",
            Source::ExternalFactors => "external_factors.csv",
            Source::Feedback => "feedback.csv",
            Source::Warehouses => "warehouses.csv",
            Source::Clients => "clients.csv",
            Source::Drivers => "drivers.csv",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Row type of a logical source
pub trait SourceRow: DeserializeOwned {
    const SOURCE: Source;
    /// Every column the row type knows about
    const COLUMNS: &'static [&'static str];
}

macro_rules! source_row {
    ($ty:ty, $source:expr, [$($col:literal),* $(,)?]) => {
        impl SourceRow for $ty {
            const SOURCE: Source = $source;
            const COLUMNS: &'static [&'static str] = &[$($col),*];
        }
    };
}

source_row!(OrderRow, Source::Orders, [
    "order_id", "client_id", "city", "order_date", "promised_delivery_date",
    "actual_delivery_date", "created_at", "status", "failure_reason", "amount", "notes",
]);
source_row!(Warehouse, Source::Warehouses, ["warehouse_id", "warehouse_name", "city", "capacity", "manager_name"]);
source_row!(Client, Source::Clients, ["client_id", "client_name", "contact_person"]);
source_row!(FleetLog, Source::FleetLogs, [
    "order_id", "driver_id", "vehicle_number", "route_code", "gps_delay_notes",
    "departure_time", "arrival_time",
]);
source_row!(Driver, Source::Drivers, ["driver_id", "driver_name", "partner_company", "status"]);
source_row!(WarehouseLog, Source::WarehouseLogs, ["order_id", "picking_start", "picking_end", "dispatch_time", "notes"]);
source_row!(ExternalFactor, Source::ExternalFactors, ["order_id", "traffic_condition", "weather_condition", "event_type"]);
source_row!(Feedback, Source::Feedback, ["order_id", "feedback_text", "sentiment", "rating"]);

/// Rows of one source plus the header columns it actually carried
#[derive(Debug, Clone)]
pub struct Table<T> {
    columns: Vec<String>,
    rows: Vec<T>,
}

impl<T: SourceRow> Table<T> {
    /// Table whose header is every column the row type knows about
    pub fn from_rows(rows: Vec<T>) -> Self {
        Self {
            columns: T::COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Deserialize a CSV stream into a table, skipping malformed rows
pub fn read_table<T: SourceRow, R: Read>(reader: R) -> Result<Table<T>, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let mut rows = Vec::new();
    let mut error_count = 0;
    for (i, result) in reader.deserialize::<T>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                if error_count < 5 {
                    warn!("Skipping malformed {} row {}: {}", T::SOURCE, i + 1, e);
                }
                error_count += 1;
            }
        }
    }
    if error_count > 0 {
        warn!("{}: skipped {} malformed rows", T::SOURCE, error_count);
    }

    Ok(Table { columns, rows })
}

/// Every source the integrator may use; any subset can be absent
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    pub orders: Option<Table<OrderRow>>,
    pub warehouses: Option<Table<Warehouse>>,
    pub clients: Option<Table<Client>>,
    pub fleet_logs: Option<Table<FleetLog>>,
    pub drivers: Option<Table<Driver>>,
    pub warehouse_logs: Option<Table<WarehouseLog>>,
    pub external_factors: Option<Table<ExternalFactor>>,
    pub feedback: Option<Table<Feedback>>,
}

impl SourceSet {
    pub fn is_present(&self, source: Source) -> bool {
        match source {
            Source::Orders => self.orders.is_some(),
            Source::Warehouses => self.warehouses.is_some(),
            Source::Clients => self.clients.is_some(),
            Source::FleetLogs => self.fleet_logs.is_some(),
            Source::Drivers => self.drivers.is_some(),
            Source::WarehouseLogs => self.warehouse_logs.is_some(),
            Source::ExternalFactors => self.external_factors.is_some(),
            Source::Feedback => self.feedback.is_some(),
        }
    }

    pub fn present(&self) -> Vec<Source> {
        Source::ALL.into_iter().filter(|s| self.is_present(*s)).collect()
    }
}

/// Load every known source file under `dir`
pub fn load_dir(dir: &Path) -> SourceSet {
    info!("Loading data files from {}", dir.display());
    SourceSet {
        orders: load_file(dir),
        fleet_logs: load_file(dir),
        warehouse_logs: load_file(dir),
        external_factors: load_file(dir),
        feedback: load_file(dir),
        warehouses: load_file(dir),
        clients: load_file(dir),
        drivers: load_file(dir),
    }
}

fn load_file<T: SourceRow>(dir: &Path) -> Option<Table<T>> {
    let path = dir.join(T::SOURCE.file_name());
    if !path.exists() {
        warn!("File not found: {}", path.display());
        return None;
    }
    match open_table(&path) {
        Ok(table) => {
            info!("Loaded {}: {} records", T::SOURCE.file_name(), table.len());
            Some(table)
        }
        Err(e) => {
            warn!("Error loading {}: {}", path.display(), e);
            None
        }
    }
}

fn open_table<T: SourceRow>(path: &Path) -> Result<Table<T>, DatasetError> {
    let file = std::fs::File::open(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_table(file).map_err(|source| DatasetError::Csv {
        path: path.to_path_buf(),
        source,
    })
}
