//! Sample data generator for delivery root-cause analysis
//!
//! Writes all eight CSV sources into one directory with controlled random
//! variation: late and failed orders, multi-row fleet and feedback entries,
//! missing dates and blank failure reasons.
//!
//! Usage:
//!   cargo run --release --bin generate_sample -- [OPTIONS]
//!
//! Options:
//!   --orders <N>       Number of orders to generate (default: 500)
//!   --seed <N>         Random seed for reproducibility (optional)
//!   --output <PATH>    Output directory (default: data)

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use clap::Parser;
use delivery_rca::loader::Source;
use delivery_rca::models::{
    Client, Driver, ExternalFactor, Feedback, FleetLog, OrderRow, Warehouse, WarehouseLog,
};
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "generate_sample")]
#[command(about = "Generate sample delivery data for all sources")]
struct Args {
    /// Number of orders to generate
    #[arg(long, default_value = "500")]
    orders: usize,

    /// Number of clients
    #[arg(long, default_value = "12")]
    clients: usize,

    /// Number of drivers
    #[arg(long, default_value = "40")]
    drivers: usize,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Output directory
    #[arg(long, default_value = "data")]
    output: PathBuf,
}

const CITIES: &[&str] = &[
    "Ahmedabad", "Mumbai", "Delhi", "Bangalore", "Chennai", "Pune", "Surat", "Coimbatore",
    "Mysuru", "Nagpur",
];

const FAILURE_REASONS: &[&str] = &[
    "Heavy traffic congestion",
    "Weather disruption",
    "Warehouse delay",
    "Address not found",
    "Stock out",
    "Vehicle breakdown",
    "Customer not available",
];

const CLIENT_NAMES: &[&str] = &[
    "Saini LLC", "Mehta Retail", "Kapoor Traders", "Sharma Foods", "Iyer Electronics",
    "Reddy Pharma", "Nair Textiles", "Joshi Home", "Patel Hardware", "Das Books",
];

const PERSON_NAMES: &[&str] = &[
    "Aarav", "Diya", "Ishaan", "Kavya", "Rohan", "Ananya", "Vikram", "Meera", "Arjun", "Priya",
];

const PARTNERS: &[&str] = &["SwiftMove", "CityLink", "ExpressWay", "RapidRoute"];

const GPS_NOTES: &[&str] = &["Stuck at signal", "Detour due to roadwork", "Slow traffic", "On route"];

const WAREHOUSE_NOTES: &[&str] = &["Picker shortage", "Inventory mismatch", "Smooth dispatch", "Late truck"];

const TRAFFIC: &[&str] = &["Clear", "Moderate", "Heavy"];

const WEATHER: &[&str] = &["Clear", "Rain", "Fog", "Storm"];

const EVENTS: &[&str] = &["Festival", "Strike", "Road closure", "Concert"];

const FEEDBACK: &[(&str, &str, f64)] = &[
    ("Delivered on time, great service", "Positive", 5.0),
    ("Package arrived in good condition", "Positive", 4.0),
    ("Delivery was late", "Negative", 2.0),
    ("Never received my order", "Negative", 1.0),
    ("Okay experience", "Neutral", 3.0),
];

fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn pick<'a>(items: &[&'a str], rng: &mut impl Rng) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

fn write_csv<T: Serialize>(dir: &Path, source: Source, rows: &[T]) -> Result<()> {
    let path = dir.join(source.file_name());
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

struct Generated {
    orders: Vec<OrderRow>,
    warehouses: Vec<Warehouse>,
    clients: Vec<Client>,
    fleet_logs: Vec<FleetLog>,
    drivers: Vec<Driver>,
    warehouse_logs: Vec<WarehouseLog>,
    external_factors: Vec<ExternalFactor>,
    feedback: Vec<Feedback>,
}

fn generate(args: &Args, rng: &mut StdRng) -> Generated {
    let warehouses: Vec<Warehouse> = CITIES
        .iter()
        .enumerate()
        .map(|(i, city)| Warehouse {
            warehouse_id: format!("W{:03}", i + 1),
            warehouse_name: Some(format!("{} Warehouse {}", city, i + 1)),
            city: Some(city.to_string()),
            capacity: Some(rng.gen_range(500..5000) as f64),
            manager_name: Some(pick(PERSON_NAMES, rng).to_string()),
        })
        .collect();

    let clients: Vec<Client> = (0..args.clients)
        .map(|i| Client {
            client_id: format!("C{:03}", i + 1),
            client_name: Some(CLIENT_NAMES[i % CLIENT_NAMES.len()].to_string()),
            contact_person: Some(pick(PERSON_NAMES, rng).to_string()),
        })
        .collect();

    let drivers: Vec<Driver> = (0..args.drivers)
        .map(|i| Driver {
            driver_id: format!("D{:03}", i + 1),
            driver_name: Some(pick(PERSON_NAMES, rng).to_string()),
            partner_company: Some(pick(PARTNERS, rng).to_string()),
            status: Some(if rng.gen_bool(0.9) { "Active" } else { "Inactive" }.to_string()),
        })
        .collect();

    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();

    let mut orders = Vec::with_capacity(args.orders);
    let mut fleet_logs = Vec::new();
    let mut warehouse_logs = Vec::new();
    let mut external_factors = Vec::new();
    let mut feedback = Vec::new();

    for i in 0..args.orders {
        let order_id = format!("O{:05}", i + 1);
        let order_date = start
            + Duration::days(rng.gen_range(0..180))
            + Duration::minutes(rng.gen_range(6 * 60..22 * 60));
        let promised = order_date + Duration::days(rng.gen_range(1..=4));

        let roll: f64 = rng.gen();
        let (status, delay) = if roll < 0.60 {
            ("Delivered", 0)
        } else if roll < 0.80 {
            ("Delivered", rng.gen_range(1..=8))
        } else if roll < 0.90 {
            ("Failed", rng.gen_range(0..=3))
        } else if roll < 0.95 {
            ("Returned", rng.gen_range(0..=2))
        } else {
            ("Pending", 0)
        };

        let actual = match status {
            "Pending" => None,
            _ if rng.gen_bool(0.03) => None,
            _ => Some(promised + Duration::days(delay) + Duration::hours(rng.gen_range(0..6))),
        };

        let failure_reason = match status {
            "Failed" | "Returned" if rng.gen_bool(0.85) => Some(pick(FAILURE_REASONS, rng).to_string()),
            "Delivered" if delay > 0 && rng.gen_bool(0.7) => Some(pick(FAILURE_REASONS, rng).to_string()),
            _ => None,
        };

        orders.push(OrderRow {
            order_id: order_id.clone(),
            client_id: clients.choose(rng).map(|c| c.client_id.clone()),
            city: Some(pick(CITIES, rng).to_string()),
            order_date: Some(format_datetime(&order_date)),
            promised_delivery_date: Some(format_datetime(&promised)),
            actual_delivery_date: actual.as_ref().map(format_datetime),
            created_at: Some(format_datetime(&order_date)),
            status: Some(status.to_string()),
            failure_reason,
            amount: Some((rng.gen_range(200.0..20000.0_f64) * 100.0).round() / 100.0),
            notes: None,
        });

        // one leg normally, occasionally a hand-over
        let legs = if rng.gen_bool(0.15) { 2 } else { 1 };
        for leg in 0..legs {
            let departure = promised - Duration::hours(rng.gen_range(4..24)) + Duration::hours(leg * 3);
            fleet_logs.push(FleetLog {
                order_id: order_id.clone(),
                driver_id: drivers.choose(rng).map(|d| d.driver_id.clone()),
                vehicle_number: Some(format!("MH{:02}-{:04}", rng.gen_range(1..50), rng.gen_range(0..10000))),
                route_code: Some(format!("R{:03}", rng.gen_range(1..120))),
                gps_delay_notes: Some(pick(GPS_NOTES, rng).to_string()),
                departure_time: Some(format_datetime(&departure)),
                arrival_time: actual.as_ref().map(format_datetime),
            });
        }

        let picking_start = order_date + Duration::hours(rng.gen_range(1..12));
        let picking_end = picking_start + Duration::minutes(rng.gen_range(10..180));
        warehouse_logs.push(WarehouseLog {
            order_id: order_id.clone(),
            picking_start: Some(format_datetime(&picking_start)),
            picking_end: Some(format_datetime(&picking_end)),
            dispatch_time: Some(format_datetime(&(picking_end + Duration::minutes(rng.gen_range(15..240))))),
            notes: Some(pick(WAREHOUSE_NOTES, rng).to_string()),
        });

        if rng.gen_bool(0.7) {
            external_factors.push(ExternalFactor {
                order_id: order_id.clone(),
                traffic_condition: Some(pick(TRAFFIC, rng).to_string()),
                weather_condition: Some(pick(WEATHER, rng).to_string()),
                event_type: rng.gen_bool(0.2).then(|| pick(EVENTS, rng).to_string()),
            });
        }

        let reviews = match rng.gen_range(0..10) {
            0..=5 => 0,
            6..=8 => 1,
            _ => 2,
        };
        for _ in 0..reviews {
            let (text, sentiment, rating) = FEEDBACK[rng.gen_range(0..FEEDBACK.len())];
            feedback.push(Feedback {
                order_id: order_id.clone(),
                feedback_text: Some(text.to_string()),
                sentiment: Some(sentiment.to_string()),
                rating: Some(rating),
            });
        }
    }

    Generated {
        orders,
        warehouses,
        clients,
        fleet_logs,
        drivers,
        warehouse_logs,
        external_factors,
        feedback,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    println!("🔧 Sample Data Generator");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Output:           {}", args.output.display());
    println!("Orders:           {}", args.orders);
    println!("Clients:          {}", args.clients);
    println!("Drivers:          {}", args.drivers);
    if let Some(seed) = args.seed {
        println!("Random seed:      {}", seed);
    }
    println!();

    let mut rng: StdRng = match args.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    let data = generate(&args, &mut rng);

    write_csv(&args.output, Source::Orders, &data.orders)?;
    write_csv(&args.output, Source::Warehouses, &data.warehouses)?;
    write_csv(&args.output, Source::Clients, &data.clients)?;
    write_csv(&args.output, Source::FleetLogs, &data.fleet_logs)?;
    write_csv(&args.output, Source::Drivers, &data.drivers)?;
    write_csv(&args.output, Source::WarehouseLogs, &data.warehouse_logs)?;
    write_csv(&args.output, Source::ExternalFactors, &data.external_factors)?;
    write_csv(&args.output, Source::Feedback, &data.feedback)?;

    println!("\n✅ Done! Wrote {} orders to {}", data.orders.len(), args.output.display());
    Ok(())
}
