//! Customer segmentation by purchase frequency.
//!
//! Thresholds are fixed: one order is a new customer, two or three a
//! returning one, four or more a loyal one. Profiles are rebuilt from the
//! fact table on every run; customers with no orders cannot appear.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::facts::OrderFact;
use crate::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    New,
    Returning,
    Loyal,
}

impl Segment {
    pub const ALL: [Segment; 3] = [Segment::New, Segment::Returning, Segment::Loyal];

    pub fn from_order_count(order_count: u64) -> Segment {
        match order_count {
            0 | 1 => Segment::New,
            2 | 3 => Segment::Returning,
            _ => Segment::Loyal,
        }
    }

    fn index(self) -> usize {
        match self {
            Segment::New => 0,
            Segment::Returning => 1,
            Segment::Loyal => 2,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Segment::New => "new",
            Segment::Returning => "returning",
            Segment::Loyal => "loyal",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerProfile {
    pub customer_id: String,
    pub order_count: u64,
    pub first_order: Option<NaiveDateTime>,
    pub last_order: Option<NaiveDateTime>,
    pub segment: Segment,
}

/// Per-segment totals: distinct customers, their orders, and their
/// item-price revenue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentSummary {
    pub segment: Segment,
    pub customers: u64,
    pub orders: u64,
    pub revenue: Money,
}

#[derive(Default)]
struct CustomerAgg {
    orders: u64,
    revenue: Money,
    first_order: Option<NaiveDateTime>,
    last_order: Option<NaiveDateTime>,
}

fn by_customer(facts: &[OrderFact]) -> BTreeMap<String, CustomerAgg> {
    let mut per_customer: BTreeMap<String, CustomerAgg> = BTreeMap::new();
    for fact in facts {
        let Some(key) = fact.customer_key() else {
            continue;
        };
        let agg = per_customer.entry(key.to_string()).or_default();
        agg.orders += 1;
        agg.revenue += fact.item_total;
        if let Some(ts) = fact.purchase_ts {
            agg.first_order = Some(agg.first_order.map_or(ts, |first| first.min(ts)));
            agg.last_order = Some(agg.last_order.map_or(ts, |last| last.max(ts)));
        }
    }
    per_customer
}

/// One profile per customer, ordered by customer id.
pub fn build_profiles(facts: &[OrderFact]) -> Vec<CustomerProfile> {
    by_customer(facts)
        .into_iter()
        .map(|(customer_id, agg)| CustomerProfile {
            customer_id,
            order_count: agg.orders,
            first_order: agg.first_order,
            last_order: agg.last_order,
            segment: Segment::from_order_count(agg.orders),
        })
        .collect()
}

/// Totals per segment, in fixed new → returning → loyal order. Empty
/// segments are reported with zero counts so the shape is stable.
pub fn summarize(facts: &[OrderFact]) -> Vec<SegmentSummary> {
    let mut summaries: Vec<SegmentSummary> = Segment::ALL
        .iter()
        .map(|&segment| SegmentSummary {
            segment,
            customers: 0,
            orders: 0,
            revenue: Money::ZERO,
        })
        .collect();

    for agg in by_customer(facts).values() {
        let summary = &mut summaries[Segment::from_order_count(agg.orders).index()];
        summary.customers += 1;
        summary.orders += agg.orders;
        summary.revenue += agg.revenue;
    }

    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn fact(id: &str, customer: &str, item_total: &str) -> OrderFact {
        OrderFact {
            order_id: id.to_string(),
            customer_id: Some(customer.to_string()),
            customer_unique_id: Some(customer.to_string()),
            purchase_ts: None,
            estimated_delivery_at: None,
            delivered_at: None,
            is_delayed: None,
            item_total: Money::parse(item_total).unwrap(),
            freight_total: Money::ZERO,
            payment_total: Money::ZERO,
            primary_payment: None,
            payment_methods: BTreeSet::new(),
            avg_review_score: None,
            seller_ids: BTreeSet::new(),
            categories: BTreeSet::new(),
            item_count: 1,
            payment_count: 1,
        }
    }

    fn orders_for(customer: &str, n: u64) -> Vec<OrderFact> {
        (0..n)
            .map(|i| fact(&format!("{customer}-o{i}"), customer, "10.00"))
            .collect()
    }

    #[test]
    fn thresholds_are_exact() {
        assert_eq!(Segment::from_order_count(1), Segment::New);
        assert_eq!(Segment::from_order_count(2), Segment::Returning);
        assert_eq!(Segment::from_order_count(3), Segment::Returning);
        assert_eq!(Segment::from_order_count(4), Segment::Loyal);
        assert_eq!(Segment::from_order_count(10), Segment::Loyal);
    }

    #[test]
    fn profiles_count_orders_per_customer() {
        let mut facts = orders_for("alice", 1);
        facts.extend(orders_for("bob", 3));
        facts.extend(orders_for("carol", 5));

        let profiles = build_profiles(&facts);
        assert_eq!(profiles.len(), 3);
        assert_eq!(profiles[0].customer_id, "alice");
        assert_eq!(profiles[0].segment, Segment::New);
        assert_eq!(profiles[1].segment, Segment::Returning);
        assert_eq!(profiles[2].order_count, 5);
        assert_eq!(profiles[2].segment, Segment::Loyal);
    }

    #[test]
    fn summary_totals_match_members() {
        let mut facts = orders_for("alice", 2);
        facts.extend(orders_for("bob", 2));
        facts.extend(orders_for("carol", 1));

        let summary = summarize(&facts);
        assert_eq!(summary[0].segment, Segment::New);
        assert_eq!(summary[0].customers, 1);
        assert_eq!(summary[0].revenue, Money::parse("10.00").unwrap());
        assert_eq!(summary[1].segment, Segment::Returning);
        assert_eq!(summary[1].customers, 2);
        assert_eq!(summary[1].orders, 4);
        assert_eq!(summary[1].revenue, Money::parse("40.00").unwrap());
        assert_eq!(summary[2].customers, 0);
    }

    #[test]
    fn facts_without_customer_are_skipped() {
        let mut orphan = fact("o1", "x", "10.00");
        orphan.customer_id = None;
        orphan.customer_unique_id = None;
        assert!(build_profiles(&[orphan]).is_empty());
    }
}
