//! End-to-end pipeline tests over synthetic datasets written to disk.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use olist_insight::engine::{self, EngineConfig, ModelOutcome};
use olist_insight::loader;
use olist_insight::money::Money;
use olist_insight::quality::FindingKind;
use olist_insight::segmentation::Segment;
use olist_insight::DataError;
use tempfile::TempDir;

/// Which customer places order `i`.
///
/// 20 customers with a single order, 10 with three, 5 with ten:
/// 100 orders over 35 customers with a known segment partition.
fn customer_for(i: usize) -> String {
    if i < 20 {
        format!("n{i:02}")
    } else if i < 50 {
        format!("r{:02}", (i - 20) % 10)
    } else {
        format!("l{:02}", (i - 50) % 5)
    }
}

fn is_delayed(i: usize) -> bool {
    i % 10 < 3
}

/// Write a clean 100-order dataset: every field populated, every
/// reference resolvable, 30 delayed orders, and freight drawn from two
/// disjoint ranges perfectly correlated with the delay label.
fn write_clean_dataset(dir: &Path) {
    let mut orders = String::from(
        "order_id,customer_id,order_status,order_purchase_timestamp,order_approved_at,\
         order_delivered_carrier_date,order_delivered_customer_date,order_estimated_delivery_date\n",
    );
    let mut items = String::from(
        "order_id,order_item_id,product_id,seller_id,shipping_limit_date,price,freight_value\n",
    );
    let mut payments = String::from(
        "order_id,payment_sequential,payment_type,payment_installments,payment_value\n",
    );
    let mut reviews = String::from(
        "review_id,order_id,review_score,review_comment_message,review_creation_date\n",
    );

    for i in 0..100 {
        let order_id = format!("o{i:03}");
        let customer = customer_for(i);
        let month = if i < 50 { 1 } else { 2 };
        let purchase = format!("2018-{month:02}-10 {:02}:00:00", i % 24);
        let estimated = format!("2018-{month:02}-20 12:00:00");
        let delivered = if is_delayed(i) {
            format!("2018-{month:02}-22 12:00:00")
        } else {
            format!("2018-{month:02}-18 12:00:00")
        };

        writeln!(
            orders,
            "{order_id},{customer},delivered,{purchase},{purchase},{purchase},{delivered},{estimated}"
        )
        .unwrap();

        let freight = if is_delayed(i) { "85.00" } else { "15.00" };
        writeln!(
            items,
            "{order_id},1,prod1,sell1,{purchase},50.00,{freight}"
        )
        .unwrap();

        let payment_value = if is_delayed(i) { "135.00" } else { "65.00" };
        writeln!(payments, "{order_id},1,credit_card,1,{payment_value}").unwrap();

        let score = if is_delayed(i) { 2 } else { 5 };
        writeln!(
            reviews,
            "r{i:03},{order_id},{score},produto conforme anunciado,{delivered}"
        )
        .unwrap();
    }

    let mut customers = String::from(
        "customer_id,customer_unique_id,customer_zip_code_prefix,customer_city,customer_state\n",
    );
    for i in 0..100 {
        let customer = customer_for(i);
        // One row per distinct customer.
        if !customers.contains(&format!("\n{customer},")) {
            writeln!(customers, "{customer},u-{customer},01310,sao paulo,SP").unwrap();
        }
    }

    fs::write(dir.join(loader::ORDERS_FILE), orders).unwrap();
    fs::write(dir.join(loader::ORDER_ITEMS_FILE), items).unwrap();
    fs::write(dir.join(loader::PAYMENTS_FILE), payments).unwrap();
    fs::write(dir.join(loader::REVIEWS_FILE), reviews).unwrap();
    fs::write(dir.join(loader::CUSTOMERS_FILE), customers).unwrap();
    fs::write(
        dir.join(loader::PRODUCTS_FILE),
        "product_id,product_category_name,product_weight_g\nprod1,brinquedos,300\n",
    )
    .unwrap();
    fs::write(
        dir.join(loader::SELLERS_FILE),
        "seller_id,seller_zip_code_prefix,seller_city,seller_state\nsell1,13023,campinas,SP\n",
    )
    .unwrap();
    fs::write(
        dir.join(loader::CATEGORY_TRANSLATION_FILE),
        "product_category_name,product_category_name_english\nbrinquedos,toys\n",
    )
    .unwrap();
    fs::write(
        dir.join(loader::GEOLOCATION_FILE),
        "geolocation_zip_code_prefix,geolocation_lat,geolocation_lng,geolocation_city,geolocation_state\n\
         01310,-23.561354,-46.656596,sao paulo,SP\n",
    )
    .unwrap();
}

#[test]
fn end_to_end_clean_dataset() {
    let tmp = TempDir::new().unwrap();
    write_clean_dataset(tmp.path());

    let report = engine::run(&EngineConfig::new(tmp.path())).unwrap();

    // KPIs: 100 orders, 30 delayed, revenue = price + freight.
    let kpis = &report.kpis;
    assert_eq!(kpis.total_orders, 100);
    assert_eq!(kpis.delayed_orders, 30);
    assert_eq!(
        kpis.total_revenue,
        Money::parse("8600.00").unwrap() // 100*50 + 30*85 + 70*15
    );
    let rate = kpis.delayed_order_rate.unwrap();
    assert!((rate - 0.30).abs() < 1e-12);
    let avg_review = kpis.average_review_score.unwrap();
    assert!((avg_review - 4.1).abs() < 1e-9); // (30*2 + 70*5) / 100
    let repeat = kpis.repeat_customer_rate.unwrap();
    assert!((repeat - 15.0 / 35.0).abs() < 1e-12);

    // Delivery outcome buckets: every order has both dates.
    assert_eq!(report.delay_distribution.on_time, 70);
    assert_eq!(report.delay_distribution.delayed, 30);
    assert_eq!(report.delay_distribution.unknown, 0);

    // Segmentation partition from the known per-customer order counts.
    let by_segment: Vec<_> = report.segments.iter().collect();
    assert_eq!(by_segment[0].segment, Segment::New);
    assert_eq!(by_segment[0].customers, 20);
    assert_eq!(by_segment[0].orders, 20);
    assert_eq!(by_segment[0].revenue, Money::parse("1000.00").unwrap());
    assert_eq!(by_segment[1].segment, Segment::Returning);
    assert_eq!(by_segment[1].customers, 10);
    assert_eq!(by_segment[1].orders, 30);
    assert_eq!(by_segment[2].segment, Segment::Loyal);
    assert_eq!(by_segment[2].customers, 5);
    assert_eq!(by_segment[2].orders, 50);
    assert_eq!(report.customer_profiles.len(), 35);

    // Monthly series: two months, no zero-filled gaps.
    assert_eq!(report.orders_over_time.len(), 2);
    assert_eq!(report.orders_over_time[0].orders, 50);
    assert_eq!(report.orders_over_time[1].orders, 50);
    assert_eq!(report.aov_over_time.len(), 2);
    assert_eq!(report.aov_over_time[0].aov, Money::parse("50.00").unwrap());

    // Category and seller revenue are item-price based.
    assert_eq!(report.revenue_by_category.len(), 1);
    assert_eq!(report.revenue_by_category[0].category, "toys");
    assert_eq!(
        report.revenue_by_category[0].revenue,
        Money::parse("5000.00").unwrap()
    );
    assert_eq!(report.revenue_by_seller[0].seller_id, "sell1");

    // Separable freight: the held-out split must classify perfectly.
    match &report.model {
        ModelOutcome::Trained { artifact } => {
            assert_eq!(artifact.metrics.accuracy, 1.0);
            assert_eq!(artifact.metrics.precision, Some(1.0));
            assert_eq!(artifact.metrics.recall, Some(1.0));
            assert_eq!(artifact.confusion.total(), 20);
            assert_eq!(artifact.coefficients.len(), 1);
            assert!(artifact.coefficients[0] > 0.0);
            assert_eq!(artifact.feature_names, vec!["freight_value".to_string()]);
        }
        ModelOutcome::Unavailable { reason } => panic!("model unavailable: {reason}"),
    }

    // Synthetic data is clean by construction.
    assert!(
        report.quality_findings.is_empty(),
        "unexpected findings: {:?}",
        report.quality_findings
    );
}

#[test]
fn identical_inputs_produce_identical_reports() {
    let tmp = TempDir::new().unwrap();
    write_clean_dataset(tmp.path());

    let config = EngineConfig::new(tmp.path());
    let first = serde_json::to_string(&engine::run(&config).unwrap()).unwrap();
    let second = serde_json::to_string(&engine::run(&config).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn missing_input_file_aborts_the_run() {
    let tmp = TempDir::new().unwrap();
    write_clean_dataset(tmp.path());
    fs::remove_file(tmp.path().join(loader::SELLERS_FILE)).unwrap();

    let err = engine::run(&EngineConfig::new(tmp.path())).unwrap_err();
    match err {
        DataError::MissingFile(path) => {
            assert!(path.to_string_lossy().contains(loader::SELLERS_FILE));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn dirty_rows_become_findings_not_errors() {
    let tmp = TempDir::new().unwrap();
    write_clean_dataset(tmp.path());

    // A duplicated order key, an orphan item row, and a malformed price.
    let orders_path = tmp.path().join(loader::ORDERS_FILE);
    let mut orders = fs::read_to_string(&orders_path).unwrap();
    orders.push_str(
        "o000,n00,delivered,2018-01-10 00:00:00,2018-01-10 00:00:00,2018-01-10 00:00:00,\
         2018-01-18 12:00:00,2018-01-20 12:00:00\n",
    );
    fs::write(&orders_path, orders).unwrap();

    let items_path = tmp.path().join(loader::ORDER_ITEMS_FILE);
    let mut items = fs::read_to_string(&items_path).unwrap();
    items.push_str("o-missing,1,prod1,sell1,2018-01-10 00:00:00,10.00,1.00\n");
    items.push_str("o001,2,prod1,sell1,2018-01-10 00:00:00,not-a-price,1.00\n");
    fs::write(&items_path, items).unwrap();

    let report = engine::run(&EngineConfig::new(tmp.path())).unwrap();

    let duplicate = report
        .quality_findings
        .iter()
        .find(|f| f.table == "orders" && f.kind == FindingKind::DuplicateKey)
        .unwrap();
    assert_eq!(duplicate.count, 2);
    assert_eq!(duplicate.samples, vec!["o000".to_string()]);

    let orphan = report
        .quality_findings
        .iter()
        .find(|f| {
            f.table == "order_items"
                && f.kind == FindingKind::BrokenReference
                && f.columns == vec!["order_id".to_string()]
        })
        .unwrap();
    assert_eq!(orphan.count, 1);
    assert_eq!(orphan.samples, vec!["o-missing/1".to_string()]);

    let missing_price = report
        .quality_findings
        .iter()
        .find(|f| {
            f.table == "order_items"
                && f.kind == FindingKind::MissingValues
                && f.columns == vec!["price".to_string()]
        })
        .unwrap();
    assert_eq!(missing_price.count, 1);

    // Dirty rows never abort: the duplicated order still yields one fact.
    assert_eq!(report.kpis.total_orders, 100);
}

#[test]
fn untrainable_model_does_not_abort_the_run() {
    let tmp = TempDir::new().unwrap();
    write_clean_dataset(tmp.path());

    // Strip every delivered date: no order has a known delay outcome.
    let orders_path = tmp.path().join(loader::ORDERS_FILE);
    let orders = fs::read_to_string(&orders_path).unwrap();
    let mut stripped = String::new();
    for (i, line) in orders.lines().enumerate() {
        if i == 0 {
            stripped.push_str(line);
        } else {
            let mut fields: Vec<&str> = line.split(',').collect();
            fields[6] = "";
            stripped.push_str(&fields.join(","));
        }
        stripped.push('\n');
    }
    fs::write(&orders_path, stripped).unwrap();

    let report = engine::run(&EngineConfig::new(tmp.path())).unwrap();

    assert!(matches!(report.model, ModelOutcome::Unavailable { .. }));
    assert_eq!(report.kpis.delayed_order_rate, None);
    assert_eq!(report.delay_distribution.unknown, 100);
    // Everything else is still computed.
    assert_eq!(report.kpis.total_orders, 100);
    assert_eq!(report.segments.len(), 3);
}
