//! Terminal report over one engine run.
//!
//! Run: olist_insight --data-dir data/olist [section]
//! Sections: all, kpi, charts, segments, model, quality

use std::fs::File;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use olist_insight::engine::{self, EngineConfig, InsightReport, ModelOutcome};
use olist_insight::model;
use tracing::info;

/// Batch analytics over the Olist e-commerce dataset.
#[derive(Parser, Debug)]
#[command(name = "olist_insight")]
#[command(about = "Compute KPIs, segments, delay predictions and quality findings")]
struct Args {
    /// Directory containing the nine dataset CSV files
    #[arg(long, default_value = "data/olist")]
    data_dir: PathBuf,

    /// Report section to print
    #[arg(default_value = "all")]
    section: String,

    /// Random seed for the model's train/test split
    #[arg(long, default_value_t = model::DEFAULT_SEED)]
    seed: u64,

    /// Also write the full report as JSON to this path
    #[arg(long)]
    json: Option<PathBuf>,
}

fn print_section_header(title: &str) {
    println!("\n{}", "═".repeat(80));
    println!("  {}", title);
    println!("{}\n", "═".repeat(80));
}

fn print_subsection(title: &str) {
    println!("\n{}", title);
    println!("{}", "─".repeat(70));
}

fn fmt_ratio(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v * 100.0),
        None => "undefined".to_string(),
    }
}

fn fmt_score(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => "undefined".to_string(),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args = Args::parse();
    let config = EngineConfig {
        data_dir: args.data_dir,
        seed: args.seed,
    };

    let report = engine::run(&config)?;

    if let Some(path) = &args.json {
        serde_json::to_writer_pretty(File::create(path)?, &report)?;
        info!(path = %path.display(), "wrote json report");
    }

    match args.section.as_str() {
        "all" => {
            print_kpi_section(&report);
            print_chart_section(&report);
            print_segment_section(&report);
            print_model_section(&report);
            print_quality_section(&report);
        }
        "kpi" => print_kpi_section(&report),
        "charts" => print_chart_section(&report),
        "segments" => print_segment_section(&report),
        "model" => print_model_section(&report),
        "quality" => print_quality_section(&report),
        other => {
            println!("Unknown section: {}", other);
            println!("Available: all, kpi, charts, segments, model, quality");
        }
    }

    Ok(())
}

fn print_kpi_section(report: &InsightReport) {
    print_section_header("1. BUSINESS KPIs");

    let kpis = &report.kpis;
    println!("  Total Orders:         {:>14}", kpis.total_orders);
    println!("  Total Revenue:        {:>14}", kpis.total_revenue.to_string());
    println!("  Delayed Orders:       {:>14}", kpis.delayed_orders);
    println!("  Delayed Order Rate:   {:>14}", fmt_ratio(kpis.delayed_order_rate));
    println!("  Avg Review Score:     {:>14}", fmt_score(kpis.average_review_score));
    println!("  Repeat Customer Rate: {:>14}", fmt_ratio(kpis.repeat_customer_rate));

    print_subsection("Delivery Outcome Distribution");
    let dist = &report.delay_distribution;
    let total = (dist.on_time + dist.delayed + dist.unknown).max(1) as f64;
    for (label, count) in [
        ("On Time", dist.on_time),
        ("Delayed", dist.delayed),
        ("Unknown", dist.unknown),
    ] {
        let pct = count as f64 / total * 100.0;
        let bar = "█".repeat((pct / 2.0) as usize);
        println!("  {:10} {:>10} {:>9.1}% {}", label, count, pct, bar);
    }
}

fn print_chart_section(report: &InsightReport) {
    print_section_header("2. TRENDS & BREAKDOWNS");

    print_subsection("Orders per Month");
    let max_orders = report
        .orders_over_time
        .iter()
        .map(|m| m.orders)
        .max()
        .unwrap_or(1) as f64;
    for month in &report.orders_over_time {
        let bar = "▓".repeat(((month.orders as f64 / max_orders) * 40.0) as usize);
        println!(
            "  {}-{:02} {:>10} {}",
            month.year, month.month, month.orders, bar
        );
    }

    print_subsection("Average Order Value per Month");
    for month in &report.aov_over_time {
        println!("  {}-{:02} {:>12}", month.year, month.month, month.aov.to_string());
    }

    print_subsection("Revenue by Category (Top 10)");
    for row in report.revenue_by_category.iter().take(10) {
        println!("  {:32} {:>14}", row.category, row.revenue.to_string());
    }

    print_subsection("Revenue by Seller (Top 10)");
    for row in report.revenue_by_seller.iter().take(10) {
        println!("  {:32} {:>14}", row.seller_id, row.revenue.to_string());
    }

    print_subsection("Orders & Revenue by Payment Method");
    println!("  {:16} {:>10} {:>14}", "Method", "Orders", "Revenue");
    println!("  {}", "─".repeat(44));
    for row in &report.payment_methods {
        println!(
            "  {:16} {:>10} {:>14}",
            row.method,
            row.orders,
            row.revenue.to_string()
        );
    }

    print_subsection("Review Score by Delivery Outcome");
    for row in &report.review_by_delay {
        println!(
            "  {:10} {:>8} orders   avg review {}",
            row.delivery_status,
            row.orders,
            fmt_score(row.avg_review)
        );
    }
}

fn print_segment_section(report: &InsightReport) {
    print_section_header("3. CUSTOMER SEGMENTATION");

    println!(
        "  {:12} {:>12} {:>12} {:>14}",
        "Segment", "Customers", "Orders", "Revenue"
    );
    println!("  {}", "─".repeat(54));
    for row in &report.segments {
        println!(
            "  {:12} {:>12} {:>12} {:>14}",
            row.segment.to_string(),
            row.customers,
            row.orders,
            row.revenue.to_string()
        );
    }
    println!("\n  Profiled customers: {}", report.customer_profiles.len());
}

fn print_model_section(report: &InsightReport) {
    print_section_header("4. DELIVERY DELAY MODEL");

    match &report.model {
        ModelOutcome::Unavailable { reason } => {
            println!("  Model unavailable: {}", reason);
        }
        ModelOutcome::Trained { artifact } => {
            print_subsection("Coefficients");
            for (name, coef) in artifact.feature_names.iter().zip(&artifact.coefficients) {
                println!("  {:16} {:>12.4}", name, coef);
            }
            println!("  {:16} {:>12.4}", "intercept", artifact.intercept);

            print_subsection("Held-Out Evaluation");
            let m = &artifact.metrics;
            println!("  Accuracy:   {:>10.3}", m.accuracy);
            println!("  Precision:  {:>10}", fmt_score(m.precision));
            println!("  Recall:     {:>10}", fmt_score(m.recall));

            let c = &artifact.confusion;
            print_subsection("Confusion Matrix (held-out)");
            println!("  {:>18} {:>12} {:>12}", "", "pred on-time", "pred delayed");
            println!(
                "  {:>18} {:>12} {:>12}",
                "actual on-time", c.true_negatives, c.false_positives
            );
            println!(
                "  {:>18} {:>12} {:>12}",
                "actual delayed", c.false_negatives, c.true_positives
            );
        }
    }
}

fn print_quality_section(report: &InsightReport) {
    print_section_header("5. DATA QUALITY");

    if report.quality_findings.is_empty() {
        println!("  No findings. All tables passed every check.");
        return;
    }

    println!(
        "  {:22} {:18} {:>8}  {}",
        "Table", "Kind", "Count", "Columns"
    );
    println!("  {}", "─".repeat(72));
    for finding in &report.quality_findings {
        println!(
            "  {:22} {:18} {:>8}  {}",
            finding.table,
            finding.kind.to_string(),
            finding.count,
            finding.columns.join(", ")
        );
    }
}
