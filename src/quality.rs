//! Data-quality auditing over the raw and derived tables.
//!
//! Every check is read-only and returns [`QualityFinding`] values; dirty
//! rows are reported, never repaired or filtered, so downstream
//! computations see the same data the auditor saw.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::facts::{FactTables, OrderFact};
use crate::tables::{
    CategoryTranslation, Customer, Dataset, Geolocation, Order, OrderItem, Payment, Product,
    Record, Review, Seller,
};

/// Upper bound on sample identifiers per finding, keeping report size
/// independent of dataset size.
pub const SAMPLE_CAP: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    MissingValues,
    DuplicateKey,
    BrokenReference,
    MalformedRow,
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FindingKind::MissingValues => "missing_values",
            FindingKind::DuplicateKey => "duplicate_key",
            FindingKind::BrokenReference => "broken_reference",
            FindingKind::MalformedRow => "malformed_row",
        };
        f.write_str(label)
    }
}

/// One detected data-quality issue. Purely informational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityFinding {
    pub table: String,
    pub kind: FindingKind,
    pub columns: Vec<String>,
    pub count: u64,
    /// Affected row identifiers, capped at [`SAMPLE_CAP`].
    pub samples: Vec<String>,
}

/// Count null/empty entries per column. All columns are reported
/// uniformly; severity judgment is left to the consumer.
pub fn missing_values<R: Record>(rows: &[R]) -> Vec<QualityFinding> {
    let mut counts = vec![0u64; R::COLUMNS.len()];
    let mut samples: Vec<Vec<String>> = vec![Vec::new(); R::COLUMNS.len()];

    for row in rows {
        for (i, missing) in row.null_mask().into_iter().enumerate() {
            if missing {
                counts[i] += 1;
                if samples[i].len() < SAMPLE_CAP {
                    samples[i].push(row.key());
                }
            }
        }
    }

    R::COLUMNS
        .iter()
        .enumerate()
        .filter(|(i, _)| counts[*i] > 0)
        .map(|(i, column)| QualityFinding {
            table: R::TABLE.to_string(),
            kind: FindingKind::MissingValues,
            columns: vec![column.to_string()],
            count: counts[i],
            samples: std::mem::take(&mut samples[i]),
        })
        .collect()
}

/// Report rows sharing a declared primary key. The count is the total
/// number of rows involved: K rows sharing one key report count = K.
pub fn duplicate_keys<R: Record>(rows: &[R]) -> Option<QualityFinding> {
    let mut by_key: BTreeMap<String, u64> = BTreeMap::new();
    for row in rows {
        *by_key.entry(row.key()).or_insert(0) += 1;
    }

    let mut count = 0;
    let mut samples = Vec::new();
    for (key, rows_sharing) in &by_key {
        if *rows_sharing > 1 {
            count += rows_sharing;
            if samples.len() < SAMPLE_CAP {
                samples.push(key.clone());
            }
        }
    }

    (count > 0).then(|| QualityFinding {
        table: R::TABLE.to_string(),
        kind: FindingKind::DuplicateKey,
        columns: R::KEY_COLUMNS.iter().map(|c| c.to_string()).collect(),
        count,
        samples,
    })
}

/// Count child rows whose foreign-key value has no parent. Rows with a
/// missing foreign-key value are not counted here; they already surface
/// through the missing-values check.
fn broken_reference<'a>(
    table: &str,
    column: &str,
    links: impl Iterator<Item = (String, Option<&'a str>)>,
    parents: &HashSet<&'a str>,
) -> Option<QualityFinding> {
    let mut count = 0;
    let mut samples = Vec::new();
    for (row_key, value) in links {
        if let Some(value) = value {
            if !parents.contains(value) {
                count += 1;
                if samples.len() < SAMPLE_CAP {
                    samples.push(row_key);
                }
            }
        }
    }

    (count > 0).then(|| QualityFinding {
        table: table.to_string(),
        kind: FindingKind::BrokenReference,
        columns: vec![column.to_string()],
        count,
        samples,
    })
}

fn audit_facts(facts: &[OrderFact]) -> Vec<QualityFinding> {
    let mut findings = Vec::new();
    for (column, predicate) in [
        ("items", (|f: &OrderFact| f.item_count == 0) as fn(&OrderFact) -> bool),
        ("payments", |f: &OrderFact| f.payment_count == 0),
    ] {
        let affected: Vec<&OrderFact> = facts.iter().filter(|f| predicate(f)).collect();
        if !affected.is_empty() {
            findings.push(QualityFinding {
                table: "order_facts".to_string(),
                kind: FindingKind::MissingValues,
                columns: vec![column.to_string()],
                count: affected.len() as u64,
                samples: affected
                    .iter()
                    .take(SAMPLE_CAP)
                    .map(|f| f.order_id.clone())
                    .collect(),
            });
        }
    }
    findings
}

/// Run every check: loader exclusions, per-table missing values and
/// duplicate keys, the declared foreign-key relationships, derivation
/// findings, and the derived-fact integrity checks.
pub fn audit(data: &Dataset, derived: &FactTables) -> Vec<QualityFinding> {
    let mut findings = data.load_findings.clone();

    findings.extend(missing_values(&data.orders));
    findings.extend(missing_values(&data.customers));
    findings.extend(missing_values(&data.order_items));
    findings.extend(missing_values(&data.products));
    findings.extend(missing_values(&data.reviews));
    findings.extend(missing_values(&data.payments));
    findings.extend(missing_values(&data.sellers));
    findings.extend(missing_values(&data.category_translation));
    findings.extend(missing_values(&data.geolocation));

    findings.extend(duplicate_keys::<Order>(&data.orders));
    findings.extend(duplicate_keys::<Customer>(&data.customers));
    findings.extend(duplicate_keys::<OrderItem>(&data.order_items));
    findings.extend(duplicate_keys::<Product>(&data.products));
    findings.extend(duplicate_keys::<Review>(&data.reviews));
    findings.extend(duplicate_keys::<Payment>(&data.payments));
    findings.extend(duplicate_keys::<Seller>(&data.sellers));
    findings.extend(duplicate_keys::<CategoryTranslation>(&data.category_translation));
    findings.extend(duplicate_keys::<Geolocation>(&data.geolocation));

    let order_ids: HashSet<&str> = data.orders.iter().map(|o| o.order_id.as_str()).collect();
    let customer_ids: HashSet<&str> = data
        .customers
        .iter()
        .map(|c| c.customer_id.as_str())
        .collect();
    let product_ids: HashSet<&str> = data.products.iter().map(|p| p.product_id.as_str()).collect();
    let seller_ids: HashSet<&str> = data.sellers.iter().map(|s| s.seller_id.as_str()).collect();

    findings.extend(broken_reference(
        "orders",
        "customer_id",
        data.orders
            .iter()
            .map(|o| (o.key(), o.customer_id.as_deref())),
        &customer_ids,
    ));
    findings.extend(broken_reference(
        "order_items",
        "order_id",
        data.order_items
            .iter()
            .map(|i| (i.key(), Some(i.order_id.as_str()))),
        &order_ids,
    ));
    findings.extend(broken_reference(
        "order_items",
        "product_id",
        data.order_items
            .iter()
            .map(|i| (i.key(), i.product_id.as_deref())),
        &product_ids,
    ));
    findings.extend(broken_reference(
        "order_items",
        "seller_id",
        data.order_items
            .iter()
            .map(|i| (i.key(), i.seller_id.as_deref())),
        &seller_ids,
    ));
    findings.extend(broken_reference(
        "order_payments",
        "order_id",
        data.payments
            .iter()
            .map(|p| (p.key(), Some(p.order_id.as_str()))),
        &order_ids,
    ));
    findings.extend(broken_reference(
        "order_reviews",
        "order_id",
        data.reviews
            .iter()
            .map(|r| (r.key(), Some(r.order_id.as_str()))),
        &order_ids,
    ));

    findings.extend(derived.findings.iter().cloned());
    findings.extend(audit_facts(&derived.facts));
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::Order;

    fn order(id: &str) -> Order {
        Order {
            order_id: id.to_string(),
            customer_id: Some("c1".into()),
            status: Some("delivered".into()),
            purchase_ts: None,
            approved_at: None,
            delivered_carrier_at: None,
            delivered_customer_at: None,
            estimated_delivery_at: None,
        }
    }

    #[test]
    fn duplicate_count_is_total_rows_sharing_key() {
        let rows = vec![order("a"), order("a"), order("a"), order("b")];
        let finding = duplicate_keys::<Order>(&rows).unwrap();
        assert_eq!(finding.count, 3);
        assert_eq!(finding.samples, vec!["a".to_string()]);
    }

    #[test]
    fn no_duplicates_no_finding() {
        let rows = vec![order("a"), order("b")];
        assert!(duplicate_keys::<Order>(&rows).is_none());
    }

    #[test]
    fn duplicate_samples_are_capped() {
        let mut rows = Vec::new();
        for i in 0..(SAMPLE_CAP + 5) {
            rows.push(order(&format!("k{i:03}")));
            rows.push(order(&format!("k{i:03}")));
        }
        let finding = duplicate_keys::<Order>(&rows).unwrap();
        assert_eq!(finding.count, 2 * (SAMPLE_CAP as u64 + 5));
        assert_eq!(finding.samples.len(), SAMPLE_CAP);
    }

    #[test]
    fn missing_values_counts_per_column() {
        let mut with_gap = order("a");
        with_gap.status = None;
        let rows = vec![with_gap, order("b")];
        let findings = missing_values(&rows);

        let status = findings
            .iter()
            .find(|f| f.columns == vec!["order_status".to_string()])
            .unwrap();
        assert_eq!(status.count, 1);
        assert_eq!(status.samples, vec!["a".to_string()]);

        // Every date column is empty on both fixtures.
        let purchase = findings
            .iter()
            .find(|f| f.columns == vec!["order_purchase_timestamp".to_string()])
            .unwrap();
        assert_eq!(purchase.count, 2);
    }

    #[test]
    fn orphan_child_row_reports_single_finding() {
        let parents: HashSet<&str> = ["o1"].into_iter().collect();
        let links = vec![
            ("i1".to_string(), Some("o1")),
            ("i2".to_string(), Some("missing")),
        ];
        let finding =
            broken_reference("order_items", "order_id", links.into_iter(), &parents).unwrap();
        assert_eq!(finding.count, 1);
        assert_eq!(finding.samples, vec!["i2".to_string()]);
    }

    #[test]
    fn null_foreign_keys_are_not_broken_references() {
        let parents: HashSet<&str> = ["c1"].into_iter().collect();
        let links = vec![("o1".to_string(), None)];
        assert!(broken_reference("orders", "customer_id", links.into_iter(), &parents).is_none());
    }
}
