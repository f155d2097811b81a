use chrono::NaiveDate;
use delivery_rca::analytics::{self, Analysis, AnalysisResult, CauseAnalysis, NO_ISSUES_MESSAGE};
use delivery_rca::features::Features;
use delivery_rca::models::Severity;
use delivery_rca::schema::Field;
use delivery_rca::{read_table, Advisor, Analyzer, AnalysisError, Dataset, FilterSpec, SourceSet};

const ORDERS: &str = "\
order_id,client_id,city,order_date,promised_delivery_date,actual_delivery_date,status,failure_reason,amount
O1,C1,Mumbai,2024-01-05 10:00:00,2024-01-10,2024-01-13,Delivered,Heavy traffic,1000
O2,C2,Mumbai,2024-02-03 09:00:00,2024-02-06,,Failed,Stock out,500
O3,C1,Delhi,2024-02-10 14:00:00,2024-02-12,2024-02-12,Delivered,,800
O4,C2,Pune,2024-02-15 08:00:00,2024-02-18,2024-02-25,Delivered,Weather,300
O5,C1,Mumbai,2024-03-01 11:00:00,2024-03-04,2024-03-04,Returned,Address not found,200
";

const WAREHOUSES: &str = "\
warehouse_id,warehouse_name,city,capacity,manager_name
W1,Mumbai Central,Mumbai,1000,Asha
W2,Mumbai West,Mumbai,500,Ravi
W3,Delhi Hub,Delhi,800,Kiran
";

const CLIENTS: &str = "\
client_id,client_name,contact_person
C1,Acme Retail,Asha
C2,Globex Foods,Ravi
C2,Globex Duplicate,Meera
";

const FLEET_LOGS: &str = "\
order_id,driver_id,vehicle_number,route_code,gps_delay_notes,departure_time,arrival_time
O1,D1,MH01-1111,R1,Stuck at signal,,
O1,D2,MH01-2222,R1,Detour,,
O2,D2,MH01-2222,R2,,,
";

const DRIVERS: &str = "\
driver_id,driver_name,partner_company,status
D1,Rohan,SwiftMove,Active
D2,Vikram,CityLink,Inactive
";

const FEEDBACK: &str = "\
order_id,feedback_text,sentiment,rating
O1,Late again,Negative,2
O1,Driver was polite,Neutral,4
O2,Never arrived,Negative,1
";

const WAREHOUSE_LOGS: &str = "\
order_id,picking_start,picking_end,dispatch_time,notes
O1,2024-01-05 11:00:00,2024-01-05 12:00:00,2024-01-05 15:00:00,Picker shortage
O1,2024-01-06 09:00:00,2024-01-06 09:30:00,,Late truck
O4,2024-02-15 09:00:00,2024-02-15 10:00:00,2024-02-15 12:00:00,
";

const EXTERNAL_FACTORS: &str = "\
order_id,traffic_condition,weather_condition,event_type
O1,Heavy,Clear,Festival
O1,Moderate,Rain,Strike
O4,,Storm,
";

fn orders_only() -> SourceSet {
    SourceSet {
        orders: Some(read_table(ORDERS.as_bytes()).unwrap()),
        ..Default::default()
    }
}

fn all_sources() -> SourceSet {
    SourceSet {
        orders: Some(read_table(ORDERS.as_bytes()).unwrap()),
        warehouses: Some(read_table(WAREHOUSES.as_bytes()).unwrap()),
        clients: Some(read_table(CLIENTS.as_bytes()).unwrap()),
        fleet_logs: Some(read_table(FLEET_LOGS.as_bytes()).unwrap()),
        drivers: Some(read_table(DRIVERS.as_bytes()).unwrap()),
        feedback: Some(read_table(FEEDBACK.as_bytes()).unwrap()),
        warehouse_logs: Some(read_table(WAREHOUSE_LOGS.as_bytes()).unwrap()),
        external_factors: Some(read_table(EXTERNAL_FACTORS.as_bytes()).unwrap()),
    }
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn report(result: CauseAnalysis) -> analytics::CauseReport {
    match result {
        CauseAnalysis::Report(r) => r,
        CauseAnalysis::NoIssues { message } => panic!("expected a report, got: {}", message),
    }
}

#[test]
fn row_count_matches_orders_for_any_source_combination() {
    let full = all_sources();
    // every subset of the seven secondary sources, one bit each
    for mask in 0u8..128 {
        let sources = SourceSet {
            orders: full.orders.clone(),
            warehouses: (mask & 1 != 0).then(|| full.warehouses.clone()).flatten(),
            clients: (mask & 2 != 0).then(|| full.clients.clone()).flatten(),
            fleet_logs: (mask & 4 != 0).then(|| full.fleet_logs.clone()).flatten(),
            drivers: (mask & 8 != 0).then(|| full.drivers.clone()).flatten(),
            feedback: (mask & 16 != 0).then(|| full.feedback.clone()).flatten(),
            warehouse_logs: (mask & 32 != 0).then(|| full.warehouse_logs.clone()).flatten(),
            external_factors: (mask & 64 != 0).then(|| full.external_factors.clone()).flatten(),
        };
        let ds = Dataset::build(&sources).unwrap();
        assert_eq!(ds.len(), 5, "mask {:#08b}", mask);
    }
}

#[test]
fn multi_row_sources_do_not_duplicate_orders() {
    let ds = Dataset::build(&all_sources()).unwrap();
    let ids: Vec<&str> = ds.records().iter().map(|r| r.order.order_id.as_str()).collect();
    assert_eq!(ids, vec!["O1", "O2", "O3", "O4", "O5"]);

    let o1 = &ds.records()[0];
    assert_eq!(o1.value(Field::DriverId).as_deref(), Some("D1"));
    assert_eq!(o1.value(Field::DriverName).as_deref(), Some("Rohan"));
    assert_eq!(o1.value(Field::GpsDelayNotes).as_deref(), Some("Stuck at signal, Detour"));
    assert_eq!(o1.rating(), Some(3.0));
    assert_eq!(o1.value(Field::FeedbackText).as_deref(), Some("Late again | Driver was polite"));
    assert_eq!(o1.value(Field::PickingStart).as_deref(), Some("2024-01-05 11:00:00"));
    assert_eq!(o1.value(Field::DispatchTime).as_deref(), Some("2024-01-05 15:00:00"));
    assert_eq!(o1.value(Field::WarehouseNotes).as_deref(), Some("Picker shortage, Late truck"));
    assert_eq!(o1.value(Field::TrafficCondition).as_deref(), Some("Heavy"));
    assert_eq!(o1.value(Field::WeatherCondition).as_deref(), Some("Clear"));
    assert_eq!(o1.value(Field::EventType).as_deref(), Some("Festival, Strike"));

    let o4 = &ds.records()[3];
    assert_eq!(o4.value(Field::WarehouseNotes), None);
    assert_eq!(o4.value(Field::TrafficCondition), None);
    assert_eq!(o4.value(Field::WeatherCondition).as_deref(), Some("Storm"));
    assert!(ds.records()[2].external.is_none());

    // order notes were not in the header, so warehouse notes keep their own name
    assert_eq!(ds.schema().field("notes"), Some(Field::WarehouseNotes));

    let o2 = &ds.records()[1];
    assert_eq!(o2.client_name(), Some("Globex Foods"));
    assert_eq!(o2.warehouse_name(), Some("Mumbai Central"));
}

#[test]
fn failed_status_keeps_failure_reason_as_root_cause() {
    let ds = Dataset::build(&orders_only()).unwrap();
    let o2 = &ds.records()[1].features;
    assert_eq!(o2.primary_root_cause, "Stock out");
    assert_eq!(o2.severity, Severity::Critical);
}

#[test]
fn status_matching_is_exact() {
    let csv = "order_id,city,promised_delivery_date,actual_delivery_date,status,failure_reason\n\
               O1,Pune,2024-01-10,2024-01-10,failed,Stock out\n\
               O2,Pune,2024-01-10,2024-01-10,Failed,Stock out\n";
    let sources = SourceSet {
        orders: Some(read_table(csv.as_bytes()).unwrap()),
        ..Default::default()
    };
    let ds = Dataset::build(&sources).unwrap();

    let lower = &ds.records()[0].features;
    assert_eq!(lower.primary_root_cause, "Stock Unavailability");
    assert_eq!(lower.severity, Severity::Low);
    assert!(!lower.is_delayed);

    let exact = &ds.records()[1].features;
    assert_eq!(exact.primary_root_cause, "Stock out");
    assert_eq!(exact.severity, Severity::Critical);
    assert!(exact.is_delayed);

    let view = ds.view();
    let report = report(analytics::explain_delivery_causes(&view, 10));
    assert_eq!(report.total_affected_orders, 1);
}

#[test]
fn derived_features_follow_dates_and_status() {
    let ds = Dataset::build(&orders_only()).unwrap();
    let f: Vec<&Features> = ds.records().iter().map(|r| &r.features).collect();

    assert_eq!(f[0].delivery_delay_days, 3);
    assert!(f[0].is_delayed);
    assert_eq!(f[0].primary_root_cause, "Traffic Congestion");
    assert_eq!(f[0].severity, Severity::Medium);
    assert_eq!(f[0].order_day_of_week.as_deref(), Some("Friday"));

    // missing actual date: no delay, delayed only because it failed
    assert_eq!(f[1].delivery_delay_days, 0);
    assert!(f[1].is_delayed);

    assert!(!f[2].is_delayed);
    assert_eq!(f[2].primary_root_cause, "Other/Unknown");
    assert_eq!(f[2].severity, Severity::Low);

    assert_eq!(f[3].delivery_delay_days, 7);
    assert_eq!(f[3].primary_root_cause, "Weather Disruption");
    assert_eq!(f[3].severity, Severity::High);

    assert_eq!(f[4].primary_root_cause, "Customer Return");
}

#[test]
fn feature_derivation_is_idempotent() {
    let mut ds = Dataset::build(&all_sources()).unwrap();
    let before: Vec<Features> = ds.records().iter().map(|r| r.features.clone()).collect();
    let columns = ds.schema().len();

    assert!(ds.rederive().is_empty());

    let after: Vec<Features> = ds.records().iter().map(|r| r.features.clone()).collect();
    assert_eq!(before, after);
    assert_eq!(ds.schema().len(), columns);
}

#[test]
fn missing_status_column_defaults_to_unknown() {
    let csv = "order_id,city,promised_delivery_date,actual_delivery_date\n\
               O1,Pune,2024-01-10,2024-01-12\n\
               O2,Pune,2024-01-10,2024-01-10\n";
    let sources = SourceSet {
        orders: Some(read_table(csv.as_bytes()).unwrap()),
        ..Default::default()
    };
    let ds = Dataset::build(&sources).unwrap();

    assert_eq!(ds.warnings().len(), 1);
    assert!(ds.warnings()[0].contains("status"));
    assert!(ds.schema().contains("status"));
    for r in ds.records() {
        assert_eq!(r.order.status.as_deref(), Some("Unknown"));
    }
    assert!(ds.records()[0].features.is_delayed);
    assert!(!ds.records()[1].features.is_delayed);
}

#[test]
fn empty_filter_is_identity() {
    let ds = Dataset::build(&all_sources()).unwrap();
    assert_eq!(ds.filter(&FilterSpec::default()).len(), ds.len());
}

#[test]
fn filters_compose_with_and() {
    let ds = Dataset::build(&all_sources()).unwrap();
    let spec = FilterSpec {
        cities: vec!["Mumbai".into()],
        date_from: Some(day("2024-02-01")),
        ..Default::default()
    };
    let view = ds.filter(&spec);
    let ids: Vec<&str> = view.iter().map(|r| r.order.order_id.as_str()).collect();
    assert_eq!(ids, vec!["O2", "O5"]);

    let spec = FilterSpec {
        clients: vec!["globex".into()],
        warehouses: vec!["central".into()],
        ..Default::default()
    };
    let view = ds.filter(&spec);
    assert_eq!(view.len(), 1);
    assert_eq!(view.records()[0].order.order_id, "O2");
}

#[test]
fn explain_groups_problem_orders_by_cause() {
    let ds = Dataset::build(&all_sources()).unwrap();
    let report = report(analytics::explain_delivery_causes(&ds.view(), 10));

    assert_eq!(report.total_affected_orders, 4);
    assert_eq!(report.total_lost_revenue, 2000.0);
    assert_eq!(report.average_delay, 2.5);

    // all causes tie at one order, so key order decides
    let causes: Vec<&str> = report.root_cause_breakdown.keys().map(String::as_str).collect();
    assert_eq!(
        causes,
        vec!["Customer Return", "Stock out", "Traffic Congestion", "Weather Disruption"]
    );
    let traffic = &report.root_cause_breakdown["Traffic Congestion"];
    assert_eq!(traffic.avg_rating, Some(3.0));
    assert_eq!(report.root_cause_breakdown["Weather Disruption"].avg_rating, None);
    assert_eq!(report.root_cause_breakdown["Stock out"].critical_cases, 1);

    let cities = &report.insights.most_affected_cities;
    assert_eq!(cities.keys().next().map(String::as_str), Some("Mumbai"));
    assert_eq!(cities["Mumbai"].orders, 3);
    assert_eq!(cities["Mumbai"].lost_revenue, 1700.0);

    let warehouses = report.insights.problematic_warehouses.as_ref().unwrap();
    assert_eq!(warehouses["Mumbai Central"], 3);
    assert!(report.insights.worst_days.len() <= 3);
}

#[test]
fn explain_respects_limit_and_rank_uses_five() {
    let ds = Dataset::build(&orders_only()).unwrap();
    let limited = report(analytics::explain_delivery_causes(&ds.view(), 2));
    assert_eq!(limited.root_cause_breakdown.len(), 2);
    assert_eq!(limited.total_affected_orders, 4);

    let ranked = report(analytics::rank(&ds.view()));
    assert_eq!(ranked.root_cause_breakdown.len(), 4);
    assert!(ranked.insights.problematic_warehouses.is_none());
}

#[test]
fn explain_without_problems_returns_sentinel() {
    let ds = Dataset::build(&orders_only()).unwrap();
    let view = ds.filter(&FilterSpec {
        cities: vec!["Delhi".into()],
        ..Default::default()
    });
    assert_eq!(
        analytics::explain_delivery_causes(&view, 10),
        CauseAnalysis::NoIssues {
            message: NO_ISSUES_MESSAGE.to_string()
        }
    );
}

#[test]
fn compare_sorts_by_delay_rate() {
    let ds = Dataset::build(&orders_only()).unwrap();
    let table = analytics::compare_performance(&ds.view(), "city").unwrap();
    let keys: Vec<&str> = table.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["Mumbai", "Pune", "Delhi"]);

    let mumbai = &table["Mumbai"];
    assert_eq!(mumbai.total_orders, 3);
    assert_eq!(mumbai.delayed_orders, 3);
    assert_eq!(mumbai.delay_rate, 100.0);
    assert_eq!(mumbai.total_revenue, 1700.0);
    assert_eq!(table["Delhi"].delay_rate, 0.0);
}

#[test]
fn compare_drops_null_group_keys() {
    let ds = Dataset::build(&all_sources()).unwrap();
    let table = analytics::compare_performance(&ds.view(), "warehouse_name").unwrap();
    // Pune has no warehouse
    let total: usize = table.values().map(|p| p.total_orders).sum();
    assert_eq!(total, 4);
}

#[test]
fn compare_unknown_dimension_is_structured_error() {
    let ds = Dataset::build(&orders_only()).unwrap();
    let err = analytics::compare_performance(&ds.view(), "carrier").unwrap_err();
    assert_eq!(err, AnalysisError::UnknownDimension("carrier".into()));
    assert_eq!(err.to_string(), "Field 'carrier' not found");

    // warehouse columns only exist once warehouses are joined
    let result = analytics::run(
        &ds.view(),
        &Analysis::Compare {
            dimension: "warehouse_name".into(),
        },
    );
    assert_eq!(
        result,
        AnalysisResult::Error {
            error: "Field 'warehouse_name' not found".into()
        }
    );
}

#[test]
fn analyzer_answers_queries_with_recommendations() {
    let analyzer = Analyzer::from_sources(&all_sources(), Advisor::default()).unwrap();
    let filters = FilterSpec {
        cities: vec!["Mumbai".into()],
        ..Default::default()
    };
    let response = analyzer.query(&filters, &Analysis::ExplainCauses { limit: 10 });

    assert_eq!(response.analysis_type, "explain_causes");
    assert_eq!(response.matched_records, 3);
    assert!(response
        .recommendations
        .items
        .iter()
        .any(|r| r == "Prioritize operational improvements in Mumbai"));

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["results"]["total_affected_orders"], 3);
    assert_eq!(json["filters_applied"]["cities"][0], "Mumbai");
}
