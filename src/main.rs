//! Delivery root-cause analysis CLI
//!
//! Loads the CSV sources from a data directory, builds the integrated
//! dataset, and prints one analysis as a text report or JSON.
//!
//! Run: ./target/release/delivery_rca --city Mumbai --from 2024-02-01
//!      ./target/release/delivery_rca --analysis compare --dimension city --json

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use delivery_rca::analytics::{
    Analysis, AnalysisResult, CauseAnalysis, CauseReport, ComparisonTable, DEFAULT_EXPLAIN_LIMIT,
};
use delivery_rca::{load_dir, Advisor, Analyzer, FilterSpec, QueryResponse};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "delivery_rca")]
#[command(about = "Explain why deliveries fail or run late")]
struct Args {
    /// Directory holding orders.csv and the secondary sources
    #[arg(long, env = "DELIVERY_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Restrict to a city (repeatable)
    #[arg(long = "city")]
    cities: Vec<String>,

    /// Restrict to clients whose name contains this text (repeatable)
    #[arg(long = "client")]
    clients: Vec<String>,

    /// Restrict to warehouses whose name contains this text (repeatable)
    #[arg(long = "warehouse")]
    warehouses: Vec<String>,

    /// First order date to include (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last order date to include (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Filter spec as JSON, merged with the flags above
    #[arg(long)]
    filters: Option<String>,

    #[arg(long, value_enum, default_value_t = AnalysisKind::Explain)]
    analysis: AnalysisKind,

    /// Column to group by for `--analysis compare`
    #[arg(long, default_value = "warehouse_name")]
    dimension: String,

    /// Maximum number of root causes for `--analysis explain`
    #[arg(long, default_value_t = DEFAULT_EXPLAIN_LIMIT)]
    limit: usize,

    /// Print the full response as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum AnalysisKind {
    Explain,
    Compare,
    Rank,
}

impl Args {
    fn filter_spec(&self) -> Result<FilterSpec> {
        let base = match &self.filters {
            Some(json) => serde_json::from_str(json).context("Invalid --filters JSON")?,
            None => FilterSpec::default(),
        };
        Ok(base.merge(FilterSpec {
            cities: self.cities.clone(),
            date_from: self.from,
            date_to: self.to,
            clients: self.clients.clone(),
            warehouses: self.warehouses.clone(),
        }))
    }

    fn analysis(&self) -> Analysis {
        match self.analysis {
            AnalysisKind::Explain => Analysis::ExplainCauses { limit: self.limit },
            AnalysisKind::Compare => Analysis::Compare {
                dimension: self.dimension.clone(),
            },
            AnalysisKind::Rank => Analysis::Rank,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let filters = args.filter_spec()?;

    let sources = load_dir(&args.data_dir);
    info!("Sources available: {:?}", sources.present());
    let analyzer = Analyzer::from_sources(&sources, Advisor::default())
        .with_context(|| format!("Failed to build dataset from {}", args.data_dir.display()))?;

    for warning in analyzer.dataset().warnings() {
        warn!("{}", warning);
    }
    info!("Dataset ready: {} orders", analyzer.dataset().len());

    let response = analyzer.query(&filters, &args.analysis());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_report(&response);
    }

    Ok(())
}

// ============================================================================
// Text report
// ============================================================================

fn print_section_header(title: &str) {
    println!("\n{}", "═".repeat(85));
    println!("  {}", title);
    println!("{}\n", "═".repeat(85));
}

fn print_subsection(title: &str) {
    println!("\n{}", title);
    println!("{}", "─".repeat(75));
}

fn print_report(response: &QueryResponse) {
    print_section_header(&format!(
        "DELIVERY ANALYSIS - {}",
        response.analysis_type.to_uppercase()
    ));
    println!("Records analysed: {}", response.matched_records);
    if !response.filters_applied.is_empty() {
        if let Ok(json) = serde_json::to_string(&response.filters_applied) {
            println!("Filters:          {}", json);
        }
    }

    match &response.results {
        AnalysisResult::Causes(CauseAnalysis::Report(report)) => print_causes(report),
        AnalysisResult::Causes(CauseAnalysis::NoIssues { message }) => println!("\n{}", message),
        AnalysisResult::Comparison(table) => print_comparison(table),
        AnalysisResult::Error { error } => println!("\nError: {}", error),
    }

    if !response.recommendations.items.is_empty() {
        print_subsection("Recommendations");
        for (i, rec) in response.recommendations.items.iter().enumerate() {
            println!("  {}. {}", i + 1, rec);
        }
    }
    println!();
}

fn fmt_rating(rating: Option<f64>) -> String {
    rating.map(|r| format!("{:.2}", r)).unwrap_or_else(|| "-".to_string())
}

fn print_causes(report: &CauseReport) {
    println!("Affected orders:  {}", report.total_affected_orders);
    println!("Lost revenue:     {:.2}", report.total_lost_revenue);
    println!("Average delay:    {:.2} days", report.average_delay);

    print_subsection("Root Cause Breakdown");
    println!(
        "{:<28} {:>8} {:>10} {:>14} {:>8} {:>9}",
        "Cause", "Orders", "Avg Delay", "Lost Revenue", "Rating", "Critical"
    );
    for (cause, s) in &report.root_cause_breakdown {
        println!(
            "{:<28} {:>8} {:>10.2} {:>14.2} {:>8} {:>9}",
            cause,
            s.failure_count,
            s.avg_delay_days,
            s.lost_revenue,
            fmt_rating(s.avg_rating),
            s.critical_cases
        );
    }

    let insights = &report.insights;
    print_subsection("Worst Days");
    for (day, count) in &insights.worst_days {
        println!("  {:<12} {:>6} problem orders", day, count);
    }

    print_subsection("Most Affected Cities");
    for (city, impact) in &insights.most_affected_cities {
        println!(
            "  {:<16} {:>6} orders {:>14.2} lost",
            city, impact.orders, impact.lost_revenue
        );
    }

    if let Some(warehouses) = &insights.problematic_warehouses {
        print_subsection("Problematic Warehouses");
        for (name, count) in warehouses {
            println!("  {:<28} {:>6} problem orders", name, count);
        }
    }
}

fn print_comparison(table: &ComparisonTable) {
    print_subsection("Performance Comparison");
    println!(
        "{:<28} {:>8} {:>8} {:>10} {:>14} {:>8} {:>8}",
        "Group", "Orders", "Delayed", "Avg Delay", "Revenue", "Rating", "Delay %"
    );
    for (key, p) in table {
        println!(
            "{:<28} {:>8} {:>8} {:>10.2} {:>14.2} {:>8} {:>7.1}%",
            key,
            p.total_orders,
            p.delayed_orders,
            p.avg_delay_days,
            p.total_revenue,
            fmt_rating(p.avg_rating),
            p.delay_rate
        );
    }
}
