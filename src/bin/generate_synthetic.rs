//! Synthetic dataset generator for the analytics engine.
//!
//! Writes a complete, clean nine-file dataset with a seeded RNG: no
//! missing values, no duplicate keys, no broken references, and freight
//! values drawn from two disjoint ranges correlated with the delay label,
//! so the quality audit is empty and the delay model has signal.
//!
//! Usage:
//!   cargo run --release --bin generate_synthetic -- [OPTIONS]
//!
//! Options:
//!   --orders <N>       Number of orders (default: 200)
//!   --customers <N>    Number of customers (default: 60)
//!   --delay-rate <F>   Probability of a delayed delivery (default: 0.3)
//!   --seed <N>         Random seed for reproducibility (default: 42)
//!   --output <PATH>    Output directory (default: data/synthetic)

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use clap::Parser;
use csv::Writer;
use rand::prelude::*;
use rand::rngs::StdRng;
use tracing::info;

use olist_insight::loader;

/// Synthetic Olist-style dataset generator.
#[derive(Parser, Debug)]
#[command(name = "generate_synthetic")]
#[command(about = "Generate a clean synthetic e-commerce dataset")]
struct Args {
    /// Number of orders
    #[arg(long, default_value = "200")]
    orders: usize,

    /// Number of customers
    #[arg(long, default_value = "60")]
    customers: usize,

    /// Number of sellers
    #[arg(long, default_value = "8")]
    sellers: usize,

    /// Number of products
    #[arg(long, default_value = "12")]
    products: usize,

    /// Probability of a delayed delivery (0.0 - 1.0)
    #[arg(long, default_value = "0.3")]
    delay_rate: f64,

    /// Random seed for reproducibility
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Output directory
    #[arg(long, default_value = "data/synthetic")]
    output: PathBuf,
}

const CATEGORIES: [(&str, &str); 6] = [
    ("informatica_acessorios", "computers_accessories"),
    ("cama_mesa_banho", "bed_bath_table"),
    ("beleza_saude", "health_beauty"),
    ("esporte_lazer", "sports_leisure"),
    ("moveis_decoracao", "furniture_decor"),
    ("brinquedos", "toys"),
];

const CITIES: [(&str, &str); 5] = [
    ("sao paulo", "SP"),
    ("rio de janeiro", "RJ"),
    ("belo horizonte", "MG"),
    ("curitiba", "PR"),
    ("porto alegre", "RS"),
];

const COMMENTS: [&str; 4] = [
    "entrega rapida, produto conforme anunciado",
    "chegou depois do prazo combinado",
    "produto de boa qualidade",
    "recomendo o vendedor",
];

fn fmt_ts(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn write_csv(path: &Path, header: &[&str], rows: &[Vec<String>]) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);
    fs::create_dir_all(&args.output)?;

    let base = NaiveDate::from_ymd_opt(2017, 1, 1)
        .and_then(|d| d.and_hms_opt(8, 0, 0))
        .ok_or_else(|| anyhow::anyhow!("invalid base date"))?;

    // Reference entities first; orders pick from them by index so every
    // foreign key resolves.
    let customer_ids: Vec<String> = (0..args.customers).map(|i| format!("c{i:05}")).collect();
    let seller_ids: Vec<String> = (0..args.sellers).map(|i| format!("s{i:03}")).collect();
    let product_ids: Vec<String> = (0..args.products).map(|i| format!("p{i:04}")).collect();

    let mut customers = Vec::new();
    let mut customer_zips = Vec::new();
    for (i, id) in customer_ids.iter().enumerate() {
        let (city, state) = CITIES[rng.gen_range(0..CITIES.len())];
        let zip = format!("{:05}", 10000 + rng.gen_range(0..80000));
        customer_zips.push(zip.clone());
        customers.push(vec![
            id.clone(),
            format!("u{i:05}"),
            zip,
            city.to_string(),
            state.to_string(),
        ]);
    }

    let mut sellers = Vec::new();
    for id in &seller_ids {
        let (city, state) = CITIES[rng.gen_range(0..CITIES.len())];
        sellers.push(vec![
            id.clone(),
            format!("{:05}", 10000 + rng.gen_range(0..80000)),
            city.to_string(),
            state.to_string(),
        ]);
    }

    let mut products = Vec::new();
    for id in &product_ids {
        let (category, _) = CATEGORIES[rng.gen_range(0..CATEGORIES.len())];
        products.push(vec![
            id.clone(),
            category.to_string(),
            format!("{}", rng.gen_range(100..5000)),
        ]);
    }

    let mut orders = Vec::new();
    let mut order_items = Vec::new();
    let mut payments = Vec::new();
    let mut reviews = Vec::new();
    let mut delayed_count = 0u64;

    for i in 0..args.orders {
        let order_id = format!("o{i:05}");
        let customer = &customer_ids[rng.gen_range(0..customer_ids.len())];
        let purchase =
            base + Duration::days(rng.gen_range(0..540)) + Duration::hours(rng.gen_range(0..12));
        let approved = purchase + Duration::hours(rng.gen_range(1..12));
        let carrier = purchase + Duration::days(rng.gen_range(1..3));
        let estimated = purchase + Duration::days(rng.gen_range(7..21));

        let delayed = rng.gen_bool(args.delay_rate);
        let delivered = if delayed {
            delayed_count += 1;
            estimated + Duration::days(rng.gen_range(1..6))
        } else {
            estimated - Duration::days(rng.gen_range(0..4)) - Duration::hours(1)
        };

        orders.push(vec![
            order_id.clone(),
            customer.clone(),
            "delivered".to_string(),
            fmt_ts(purchase),
            fmt_ts(approved),
            fmt_ts(carrier),
            fmt_ts(delivered),
            fmt_ts(estimated),
        ]);

        let item_count = rng.gen_range(1..=3);
        let mut order_total = 0i64;
        for seq in 1..=item_count {
            let product_idx = rng.gen_range(0..product_ids.len());
            let seller = &seller_ids[rng.gen_range(0..seller_ids.len())];
            let price_cents = rng.gen_range(2000..25000);
            // Disjoint freight ranges keep the delay signal separable.
            let freight_cents = if delayed {
                rng.gen_range(6000..10000)
            } else {
                rng.gen_range(500..3500)
            };
            order_total += price_cents + freight_cents;
            order_items.push(vec![
                order_id.clone(),
                seq.to_string(),
                product_ids[product_idx].clone(),
                seller.clone(),
                fmt_ts(purchase + Duration::days(4)),
                format!("{}.{:02}", price_cents / 100, price_cents % 100),
                format!("{}.{:02}", freight_cents / 100, freight_cents % 100),
            ]);
        }

        if rng.gen_bool(0.1) && order_total > 2000 {
            let voucher = 1000i64;
            let rest = order_total - voucher;
            payments.push(vec![
                order_id.clone(),
                "1".to_string(),
                "credit_card".to_string(),
                rng.gen_range(1..6).to_string(),
                format!("{}.{:02}", rest / 100, rest % 100),
            ]);
            payments.push(vec![
                order_id.clone(),
                "2".to_string(),
                "voucher".to_string(),
                "1".to_string(),
                format!("{}.{:02}", voucher / 100, voucher % 100),
            ]);
        } else {
            let method = if rng.gen_bool(0.7) { "credit_card" } else { "boleto" };
            payments.push(vec![
                order_id.clone(),
                "1".to_string(),
                method.to_string(),
                rng.gen_range(1..6).to_string(),
                format!("{}.{:02}", order_total / 100, order_total % 100),
            ]);
        }

        let score = if delayed {
            rng.gen_range(1..=3)
        } else {
            rng.gen_range(4..=5)
        };
        reviews.push(vec![
            format!("r{i:05}"),
            order_id.clone(),
            score.to_string(),
            COMMENTS[rng.gen_range(0..COMMENTS.len())].to_string(),
            fmt_ts(delivered + Duration::days(1)),
        ]);
    }

    let translations: Vec<Vec<String>> = CATEGORIES
        .iter()
        .map(|(pt, en)| vec![pt.to_string(), en.to_string()])
        .collect();

    let mut geolocation = Vec::new();
    let mut seen_zips = std::collections::BTreeSet::new();
    for zip in &customer_zips {
        if seen_zips.insert(zip.clone()) {
            let (city, state) = CITIES[rng.gen_range(0..CITIES.len())];
            geolocation.push(vec![
                zip.clone(),
                format!("{:.6}", -23.5 + rng.gen_range(-2.0..2.0)),
                format!("{:.6}", -46.6 + rng.gen_range(-2.0..2.0)),
                city.to_string(),
                state.to_string(),
            ]);
        }
    }

    let out = &args.output;
    write_csv(
        &out.join(loader::ORDERS_FILE),
        &[
            "order_id",
            "customer_id",
            "order_status",
            "order_purchase_timestamp",
            "order_approved_at",
            "order_delivered_carrier_date",
            "order_delivered_customer_date",
            "order_estimated_delivery_date",
        ],
        &orders,
    )?;
    write_csv(
        &out.join(loader::CUSTOMERS_FILE),
        &[
            "customer_id",
            "customer_unique_id",
            "customer_zip_code_prefix",
            "customer_city",
            "customer_state",
        ],
        &customers,
    )?;
    write_csv(
        &out.join(loader::ORDER_ITEMS_FILE),
        &[
            "order_id",
            "order_item_id",
            "product_id",
            "seller_id",
            "shipping_limit_date",
            "price",
            "freight_value",
        ],
        &order_items,
    )?;
    write_csv(
        &out.join(loader::PRODUCTS_FILE),
        &["product_id", "product_category_name", "product_weight_g"],
        &products,
    )?;
    write_csv(
        &out.join(loader::REVIEWS_FILE),
        &[
            "review_id",
            "order_id",
            "review_score",
            "review_comment_message",
            "review_creation_date",
        ],
        &reviews,
    )?;
    write_csv(
        &out.join(loader::PAYMENTS_FILE),
        &[
            "order_id",
            "payment_sequential",
            "payment_type",
            "payment_installments",
            "payment_value",
        ],
        &payments,
    )?;
    write_csv(
        &out.join(loader::SELLERS_FILE),
        &[
            "seller_id",
            "seller_zip_code_prefix",
            "seller_city",
            "seller_state",
        ],
        &sellers,
    )?;
    write_csv(
        &out.join(loader::CATEGORY_TRANSLATION_FILE),
        &["product_category_name", "product_category_name_english"],
        &translations,
    )?;
    write_csv(
        &out.join(loader::GEOLOCATION_FILE),
        &[
            "geolocation_zip_code_prefix",
            "geolocation_lat",
            "geolocation_lng",
            "geolocation_city",
            "geolocation_state",
        ],
        &geolocation,
    )?;

    info!(
        orders = args.orders,
        delayed = delayed_count,
        customers = args.customers,
        dir = %out.display(),
        "synthetic dataset written"
    );

    Ok(())
}
