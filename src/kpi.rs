//! KPI and aggregation functions over the order-fact table.
//!
//! Every function is pure and deterministic. Ratios with a zero
//! denominator return `None` ("undefined") so callers branch explicitly
//! instead of receiving a misleading zero.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::Serialize;

use crate::facts::{OrderFact, RevenueRollup};
use crate::money::Money;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyOrders {
    pub year: i32,
    pub month: u32,
    pub orders: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyAov {
    pub year: i32,
    pub month: u32,
    pub aov: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRevenue {
    pub category: String,
    pub revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SellerRevenue {
    pub seller_id: String,
    pub revenue: Money,
}

/// On-time / delayed / unknown delivery counts. Unknown covers orders
/// missing either delivery date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DelayDistribution {
    pub on_time: u64,
    pub delayed: u64,
    pub unknown: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewDelaySplit {
    pub delivery_status: String,
    pub orders: u64,
    pub avg_review: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentMethodBreakdown {
    pub method: String,
    pub orders: u64,
    pub revenue: Money,
}

pub fn total_orders(facts: &[OrderFact]) -> u64 {
    facts.len() as u64
}

/// Gross revenue: item price plus freight across every order.
pub fn total_revenue(facts: &[OrderFact]) -> Money {
    facts.iter().map(|f| f.item_total + f.freight_total).sum()
}

pub fn delayed_orders(facts: &[OrderFact]) -> u64 {
    facts.iter().filter(|f| f.is_delayed == Some(true)).count() as u64
}

/// Delayed fraction among orders with both delivery dates present.
pub fn delayed_order_rate(facts: &[OrderFact]) -> Option<f64> {
    let known = facts.iter().filter(|f| f.is_delayed.is_some()).count();
    (known > 0).then(|| delayed_orders(facts) as f64 / known as f64)
}

pub fn average_review_score(facts: &[OrderFact]) -> Option<f64> {
    let scores: Vec<f64> = facts.iter().filter_map(|f| f.avg_review_score).collect();
    (!scores.is_empty()).then(|| scores.iter().sum::<f64>() / scores.len() as f64)
}

/// Orders per (year, month) in ascending order. Months absent from the
/// source produce no entry; nothing is zero-filled.
pub fn orders_over_time(facts: &[OrderFact]) -> Vec<MonthlyOrders> {
    let mut by_month: BTreeMap<(i32, u32), u64> = BTreeMap::new();
    for fact in facts {
        if let Some(ts) = fact.purchase_ts {
            *by_month.entry((ts.year(), ts.month())).or_insert(0) += 1;
        }
    }
    by_month
        .into_iter()
        .map(|((year, month), orders)| MonthlyOrders {
            year,
            month,
            orders,
        })
        .collect()
}

/// Item-price revenue per category, descending by revenue (name breaks
/// ties) for presentation.
pub fn revenue_by_category(rollup: &RevenueRollup) -> Vec<CategoryRevenue> {
    let mut rows: Vec<CategoryRevenue> = rollup
        .by_category
        .iter()
        .map(|(category, revenue)| CategoryRevenue {
            category: category.clone(),
            revenue: *revenue,
        })
        .collect();
    rows.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.category.cmp(&b.category)));
    rows
}

/// Item-price revenue per seller, descending by revenue.
pub fn revenue_by_seller(rollup: &RevenueRollup) -> Vec<SellerRevenue> {
    let mut rows: Vec<SellerRevenue> = rollup
        .by_seller
        .iter()
        .map(|(seller_id, revenue)| SellerRevenue {
            seller_id: seller_id.clone(),
            revenue: *revenue,
        })
        .collect();
    rows.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.seller_id.cmp(&b.seller_id)));
    rows
}

pub fn delivery_delay_distribution(facts: &[OrderFact]) -> DelayDistribution {
    let mut dist = DelayDistribution::default();
    for fact in facts {
        match fact.is_delayed {
            Some(true) => dist.delayed += 1,
            Some(false) => dist.on_time += 1,
            None => dist.unknown += 1,
        }
    }
    dist
}

/// Average order value (item-price revenue / orders) per month. A period
/// with zero orders simply has no entry; AOV is never reported as zero
/// for an empty month.
pub fn average_order_value_over_time(facts: &[OrderFact]) -> Vec<MonthlyAov> {
    let mut by_month: BTreeMap<(i32, u32), (Money, u64)> = BTreeMap::new();
    for fact in facts {
        if let Some(ts) = fact.purchase_ts {
            let entry = by_month.entry((ts.year(), ts.month())).or_insert((Money::ZERO, 0));
            entry.0 += fact.item_total;
            entry.1 += 1;
        }
    }
    by_month
        .into_iter()
        .map(|((year, month), (revenue, orders))| MonthlyAov {
            year,
            month,
            aov: revenue.div_round(orders),
        })
        .collect()
}

/// Fraction of distinct customers with more than one order.
pub fn repeat_customer_rate(facts: &[OrderFact]) -> Option<f64> {
    let mut per_customer: BTreeMap<&str, u64> = BTreeMap::new();
    for fact in facts {
        if let Some(key) = fact.customer_key() {
            *per_customer.entry(key).or_insert(0) += 1;
        }
    }
    let total = per_customer.len();
    let repeat = per_customer.values().filter(|&&n| n > 1).count();
    (total > 0).then(|| repeat as f64 / total as f64)
}

/// Average review score split by delivery outcome. Orders with unknown
/// delay status are excluded.
pub fn review_score_by_delay(facts: &[OrderFact]) -> Vec<ReviewDelaySplit> {
    let mut splits = Vec::with_capacity(2);
    for (status, delayed) in [("On-Time", false), ("Delayed", true)] {
        let group: Vec<&OrderFact> = facts
            .iter()
            .filter(|f| f.is_delayed == Some(delayed))
            .collect();
        let scores: Vec<f64> = group.iter().filter_map(|f| f.avg_review_score).collect();
        splits.push(ReviewDelaySplit {
            delivery_status: status.to_string(),
            orders: group.len() as u64,
            avg_review: (!scores.is_empty())
                .then(|| scores.iter().sum::<f64>() / scores.len() as f64),
        });
    }
    splits
}

/// Orders and item-price revenue per payment method, descending by
/// revenue. An order with several methods counts under each of them.
pub fn payment_method_breakdown(facts: &[OrderFact]) -> Vec<PaymentMethodBreakdown> {
    let mut by_method: BTreeMap<&str, (u64, Money)> = BTreeMap::new();
    for fact in facts {
        for method in &fact.payment_methods {
            let entry = by_method.entry(method).or_insert((0, Money::ZERO));
            entry.0 += 1;
            entry.1 += fact.item_total;
        }
    }
    let mut rows: Vec<PaymentMethodBreakdown> = by_method
        .into_iter()
        .map(|(method, (orders, revenue))| PaymentMethodBreakdown {
            method: method.to_string(),
            orders,
            revenue,
        })
        .collect();
    rows.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.method.cmp(&b.method)));
    rows
}
