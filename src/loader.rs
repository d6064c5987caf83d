//! Dataset loader: reads the nine raw CSV files into typed tables.
//!
//! Parsing is tolerant by design. A malformed non-key field loads as
//! `None` and surfaces later through the missing-values audit; only a row
//! whose key columns are unusable is excluded, and every exclusion is
//! counted as a `malformed_row` finding instead of being silently dropped.

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord};
use tracing::{info, warn};

use crate::error::DataError;
use crate::money::Money;
use crate::quality::{FindingKind, QualityFinding, SAMPLE_CAP};
use crate::tables::{
    CategoryTranslation, Customer, Dataset, Geolocation, Order, OrderItem, Payment, Product,
    Record, Review, Seller,
};

pub const ORDERS_FILE: &str = "olist_orders_dataset.csv";
pub const CUSTOMERS_FILE: &str = "olist_customers_dataset.csv";
pub const ORDER_ITEMS_FILE: &str = "olist_order_items_dataset.csv";
pub const PRODUCTS_FILE: &str = "olist_products_dataset.csv";
pub const REVIEWS_FILE: &str = "olist_order_reviews_dataset.csv";
pub const PAYMENTS_FILE: &str = "olist_order_payments_dataset.csv";
pub const SELLERS_FILE: &str = "olist_sellers_dataset.csv";
pub const CATEGORY_TRANSLATION_FILE: &str = "product_category_name_translation.csv";
pub const GEOLOCATION_FILE: &str = "olist_geolocation_dataset.csv";

/// All nine files a dataset directory must contain.
pub const REQUIRED_FILES: [&str; 9] = [
    ORDERS_FILE,
    CUSTOMERS_FILE,
    ORDER_ITEMS_FILE,
    PRODUCTS_FILE,
    REVIEWS_FILE,
    PAYMENTS_FILE,
    SELLERS_FILE,
    CATEGORY_TRANSLATION_FILE,
    GEOLOCATION_FILE,
];

/// Timestamp format used throughout the dataset.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

type HeaderMap = HashMap<String, usize>;

/// Load all nine tables from `dir`, or fail naming the first absent file.
pub fn load_dataset(dir: &Path) -> Result<Dataset, DataError> {
    for file in REQUIRED_FILES {
        let path = dir.join(file);
        if !path.is_file() {
            return Err(DataError::MissingFile(path));
        }
    }

    let mut findings = Vec::new();
    let dataset = Dataset {
        orders: read_table(dir, ORDERS_FILE, &mut findings, parse_order)?,
        customers: read_table(dir, CUSTOMERS_FILE, &mut findings, parse_customer)?,
        order_items: read_table(dir, ORDER_ITEMS_FILE, &mut findings, parse_order_item)?,
        products: read_table(dir, PRODUCTS_FILE, &mut findings, parse_product)?,
        reviews: read_table(dir, REVIEWS_FILE, &mut findings, parse_review)?,
        payments: read_table(dir, PAYMENTS_FILE, &mut findings, parse_payment)?,
        sellers: read_table(dir, SELLERS_FILE, &mut findings, parse_seller)?,
        category_translation: read_table(
            dir,
            CATEGORY_TRANSLATION_FILE,
            &mut findings,
            parse_translation,
        )?,
        geolocation: read_table(dir, GEOLOCATION_FILE, &mut findings, parse_geolocation)?,
        load_findings: Vec::new(),
    };

    Ok(Dataset {
        load_findings: findings,
        ..dataset
    })
}

fn read_table<T: Record>(
    dir: &Path,
    file: &str,
    findings: &mut Vec<QualityFinding>,
    parse: impl Fn(&StringRecord, &HeaderMap) -> Option<T>,
) -> Result<Vec<T>, DataError> {
    let path = dir.join(file);
    let read_err = |source| DataError::Read {
        path: path.clone(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(&path)
        .map_err(read_err)?;
    let headers: HeaderMap = reader
        .headers()
        .map_err(read_err)?
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim().to_string(), i))
        .collect();

    let mut rows = Vec::new();
    let mut excluded = 0u64;
    let mut samples = Vec::new();
    for (i, record) in reader.records().enumerate() {
        // +2: 1-based, after the header line
        let row_id = format!("row {}", i + 2);
        match record {
            Ok(rec) => match parse(&rec, &headers) {
                Some(row) => rows.push(row),
                None => {
                    excluded += 1;
                    if samples.len() < SAMPLE_CAP {
                        samples.push(row_id);
                    }
                }
            },
            Err(err) => {
                excluded += 1;
                if excluded <= 5 {
                    warn!(table = T::TABLE, %err, "skipping unreadable csv record");
                }
                if samples.len() < SAMPLE_CAP {
                    samples.push(row_id);
                }
            }
        }
    }

    if excluded > 0 {
        warn!(table = T::TABLE, excluded, "excluded rows with unusable keys");
        findings.push(QualityFinding {
            table: T::TABLE.to_string(),
            kind: FindingKind::MalformedRow,
            columns: T::KEY_COLUMNS.iter().map(|c| c.to_string()).collect(),
            count: excluded,
            samples,
        });
    }
    info!(table = T::TABLE, rows = rows.len(), "loaded table");
    Ok(rows)
}

fn text(rec: &StringRecord, headers: &HeaderMap, name: &str) -> Option<String> {
    let value = rec.get(*headers.get(name)?)?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn timestamp(rec: &StringRecord, headers: &HeaderMap, name: &str) -> Option<NaiveDateTime> {
    text(rec, headers, name).and_then(|v| NaiveDateTime::parse_from_str(&v, TIMESTAMP_FORMAT).ok())
}

fn currency(rec: &StringRecord, headers: &HeaderMap, name: &str) -> Option<Money> {
    text(rec, headers, name).and_then(|v| Money::parse(&v))
}

fn uint(rec: &StringRecord, headers: &HeaderMap, name: &str) -> Option<u32> {
    text(rec, headers, name).and_then(|v| v.parse().ok())
}

fn float(rec: &StringRecord, headers: &HeaderMap, name: &str) -> Option<f64> {
    text(rec, headers, name).and_then(|v| v.parse().ok())
}

fn parse_order(rec: &StringRecord, headers: &HeaderMap) -> Option<Order> {
    Some(Order {
        order_id: text(rec, headers, "order_id")?,
        customer_id: text(rec, headers, "customer_id"),
        status: text(rec, headers, "order_status"),
        purchase_ts: timestamp(rec, headers, "order_purchase_timestamp"),
        approved_at: timestamp(rec, headers, "order_approved_at"),
        delivered_carrier_at: timestamp(rec, headers, "order_delivered_carrier_date"),
        delivered_customer_at: timestamp(rec, headers, "order_delivered_customer_date"),
        estimated_delivery_at: timestamp(rec, headers, "order_estimated_delivery_date"),
    })
}

fn parse_customer(rec: &StringRecord, headers: &HeaderMap) -> Option<Customer> {
    Some(Customer {
        customer_id: text(rec, headers, "customer_id")?,
        customer_unique_id: text(rec, headers, "customer_unique_id"),
        zip_prefix: text(rec, headers, "customer_zip_code_prefix"),
        city: text(rec, headers, "customer_city"),
        state: text(rec, headers, "customer_state"),
    })
}

fn parse_order_item(rec: &StringRecord, headers: &HeaderMap) -> Option<OrderItem> {
    Some(OrderItem {
        order_id: text(rec, headers, "order_id")?,
        item_seq: uint(rec, headers, "order_item_id")?,
        product_id: text(rec, headers, "product_id"),
        seller_id: text(rec, headers, "seller_id"),
        shipping_limit_at: timestamp(rec, headers, "shipping_limit_date"),
        price: currency(rec, headers, "price"),
        freight_value: currency(rec, headers, "freight_value"),
    })
}

fn parse_product(rec: &StringRecord, headers: &HeaderMap) -> Option<Product> {
    Some(Product {
        product_id: text(rec, headers, "product_id")?,
        category_name: text(rec, headers, "product_category_name"),
        weight_g: float(rec, headers, "product_weight_g"),
    })
}

fn parse_review(rec: &StringRecord, headers: &HeaderMap) -> Option<Review> {
    Some(Review {
        review_id: text(rec, headers, "review_id")?,
        order_id: text(rec, headers, "order_id")?,
        score: uint(rec, headers, "review_score").and_then(|v| u8::try_from(v).ok()),
        comment_message: text(rec, headers, "review_comment_message"),
        created_at: timestamp(rec, headers, "review_creation_date"),
    })
}

fn parse_payment(rec: &StringRecord, headers: &HeaderMap) -> Option<Payment> {
    Some(Payment {
        order_id: text(rec, headers, "order_id")?,
        sequential: uint(rec, headers, "payment_sequential")?,
        payment_type: text(rec, headers, "payment_type"),
        installments: uint(rec, headers, "payment_installments"),
        value: currency(rec, headers, "payment_value"),
    })
}

fn parse_seller(rec: &StringRecord, headers: &HeaderMap) -> Option<Seller> {
    Some(Seller {
        seller_id: text(rec, headers, "seller_id")?,
        zip_prefix: text(rec, headers, "seller_zip_code_prefix"),
        city: text(rec, headers, "seller_city"),
        state: text(rec, headers, "seller_state"),
    })
}

fn parse_translation(rec: &StringRecord, headers: &HeaderMap) -> Option<CategoryTranslation> {
    Some(CategoryTranslation {
        category_name: text(rec, headers, "product_category_name")?,
        category_name_english: text(rec, headers, "product_category_name_english"),
    })
}

fn parse_geolocation(rec: &StringRecord, headers: &HeaderMap) -> Option<Geolocation> {
    Some(Geolocation {
        zip_prefix: text(rec, headers, "geolocation_zip_code_prefix")?,
        lat: float(rec, headers, "geolocation_lat")?,
        lng: float(rec, headers, "geolocation_lng")?,
        city: text(rec, headers, "geolocation_city"),
        state: text(rec, headers, "geolocation_state"),
    })
}
