//! Join & derivation layer: one denormalized fact per order.
//!
//! All joins are explicit keyed aggregations with declared keys. Item and
//! freight totals are recomputed from the item rows on every run; nothing
//! is copied from a denormalized cache, so identical inputs always yield
//! identical facts.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::money::Money;
use crate::quality::{FindingKind, QualityFinding, SAMPLE_CAP};
use crate::tables::Dataset;

/// One row per order id, enriched with item, payment, review and delivery
/// timing data.
#[derive(Debug, Clone, Serialize)]
pub struct OrderFact {
    pub order_id: String,
    pub customer_id: Option<String>,
    /// The cross-order customer identity from the customers table; falls
    /// back to `customer_id` when the customer row is missing.
    pub customer_unique_id: Option<String>,
    pub purchase_ts: Option<NaiveDateTime>,
    pub estimated_delivery_at: Option<NaiveDateTime>,
    pub delivered_at: Option<NaiveDateTime>,
    /// `None` when either delivery date is missing.
    pub is_delayed: Option<bool>,
    pub item_total: Money,
    pub freight_total: Money,
    pub payment_total: Money,
    /// Highest-value payment method for this order.
    pub primary_payment: Option<String>,
    /// Every payment method seen on the order.
    pub payment_methods: BTreeSet<String>,
    pub avg_review_score: Option<f64>,
    pub seller_ids: BTreeSet<String>,
    /// Translated category labels; untranslated codes keep the raw code.
    pub categories: BTreeSet<String>,
    pub item_count: u32,
    pub payment_count: u32,
}

impl OrderFact {
    /// The customer identity used for segmentation.
    pub fn customer_key(&self) -> Option<&str> {
        self.customer_unique_id
            .as_deref()
            .or(self.customer_id.as_deref())
    }
}

/// Item-price revenue rolled up by translated category and by seller.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RevenueRollup {
    pub by_category: BTreeMap<String, Money>,
    pub by_seller: BTreeMap<String, Money>,
}

/// Output of the derivation step: the fact table, the revenue rollup, and
/// any findings raised while deriving (untranslated category codes).
#[derive(Debug, Default)]
pub struct FactTables {
    pub facts: Vec<OrderFact>,
    pub revenue: RevenueRollup,
    pub findings: Vec<QualityFinding>,
}

#[derive(Default)]
struct ItemAgg {
    price: Money,
    freight: Money,
    count: u32,
    sellers: BTreeSet<String>,
    categories: BTreeSet<String>,
}

#[derive(Default)]
struct PaymentAgg {
    total: Money,
    count: u32,
    by_method: BTreeMap<String, Money>,
}

#[derive(Default)]
struct ReviewAgg {
    score_sum: u64,
    count: u64,
}

/// Build the order-fact table and revenue rollup from the raw tables.
pub fn derive(data: &Dataset) -> FactTables {
    let translations: HashMap<&str, &str> = data
        .category_translation
        .iter()
        .filter_map(|t| {
            t.category_name_english
                .as_deref()
                .map(|en| (t.category_name.as_str(), en))
        })
        .collect();

    let product_categories: HashMap<&str, Option<&str>> = data
        .products
        .iter()
        .map(|p| (p.product_id.as_str(), p.category_name.as_deref()))
        .collect();

    let customer_unique: HashMap<&str, Option<&str>> = data
        .customers
        .iter()
        .map(|c| (c.customer_id.as_str(), c.customer_unique_id.as_deref()))
        .collect();

    // Aggregate items per order; record raw category codes that have no
    // translation along the way.
    let mut items: BTreeMap<&str, ItemAgg> = BTreeMap::new();
    let mut untranslated: BTreeSet<String> = BTreeSet::new();
    let mut revenue = RevenueRollup::default();
    for item in &data.order_items {
        let agg = items.entry(item.order_id.as_str()).or_default();
        agg.count += 1;
        let price = item.price.unwrap_or(Money::ZERO);
        agg.price += price;
        agg.freight += item.freight_value.unwrap_or(Money::ZERO);

        if let Some(seller_id) = item.seller_id.as_deref() {
            agg.sellers.insert(seller_id.to_string());
            *revenue
                .by_seller
                .entry(seller_id.to_string())
                .or_insert(Money::ZERO) += price;
        }

        let raw_category = item
            .product_id
            .as_deref()
            .and_then(|pid| product_categories.get(pid).copied())
            .flatten();
        if let Some(raw) = raw_category {
            let label = match translations.get(raw) {
                Some(en) => (*en).to_string(),
                None => {
                    untranslated.insert(raw.to_string());
                    raw.to_string()
                }
            };
            agg.categories.insert(label.clone());
            *revenue.by_category.entry(label).or_insert(Money::ZERO) += price;
        }
    }

    let mut payments: BTreeMap<&str, PaymentAgg> = BTreeMap::new();
    for payment in &data.payments {
        let agg = payments.entry(payment.order_id.as_str()).or_default();
        agg.count += 1;
        let value = payment.value.unwrap_or(Money::ZERO);
        agg.total += value;
        if let Some(method) = payment.payment_type.as_deref() {
            *agg
                .by_method
                .entry(method.to_string())
                .or_insert(Money::ZERO) += value;
        }
    }

    let mut reviews: BTreeMap<&str, ReviewAgg> = BTreeMap::new();
    for review in &data.reviews {
        if let Some(score) = review.score {
            let agg = reviews.entry(review.order_id.as_str()).or_default();
            agg.score_sum += u64::from(score);
            agg.count += 1;
        }
    }

    // One fact per order id; when the orders table itself carries a
    // duplicate key the first occurrence wins and the duplicate-key audit
    // reports the rest.
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut facts = Vec::with_capacity(data.orders.len());
    for order in &data.orders {
        if !seen.insert(order.order_id.as_str()) {
            continue;
        }

        let item_agg = items.get(order.order_id.as_str());
        let payment_agg = payments.get(order.order_id.as_str());
        let review_agg = reviews.get(order.order_id.as_str());

        let is_delayed = match (order.delivered_customer_at, order.estimated_delivery_at) {
            (Some(delivered), Some(estimated)) => Some(delivered > estimated),
            _ => None,
        };

        let primary_payment = payment_agg.and_then(|agg| {
            agg.by_method
                .iter()
                .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
                .map(|(method, _)| method.clone())
        });

        let customer_unique_id = order
            .customer_id
            .as_deref()
            .and_then(|cid| customer_unique.get(cid).copied().flatten())
            .map(str::to_string)
            .or_else(|| order.customer_id.clone());

        facts.push(OrderFact {
            order_id: order.order_id.clone(),
            customer_id: order.customer_id.clone(),
            customer_unique_id,
            purchase_ts: order.purchase_ts,
            estimated_delivery_at: order.estimated_delivery_at,
            delivered_at: order.delivered_customer_at,
            is_delayed,
            item_total: item_agg.map_or(Money::ZERO, |a| a.price),
            freight_total: item_agg.map_or(Money::ZERO, |a| a.freight),
            payment_total: payment_agg.map_or(Money::ZERO, |a| a.total),
            primary_payment,
            payment_methods: payment_agg
                .map(|a| a.by_method.keys().cloned().collect())
                .unwrap_or_default(),
            avg_review_score: review_agg
                .filter(|a| a.count > 0)
                .map(|a| a.score_sum as f64 / a.count as f64),
            seller_ids: item_agg.map(|a| a.sellers.clone()).unwrap_or_default(),
            categories: item_agg.map(|a| a.categories.clone()).unwrap_or_default(),
            item_count: item_agg.map_or(0, |a| a.count),
            payment_count: payment_agg.map_or(0, |a| a.count),
        });
    }
    facts.sort_by(|a, b| a.order_id.cmp(&b.order_id));

    let mut findings = Vec::new();
    if !untranslated.is_empty() {
        findings.push(QualityFinding {
            table: "products".to_string(),
            kind: FindingKind::BrokenReference,
            columns: vec!["product_category_name".to_string()],
            count: untranslated.len() as u64,
            samples: untranslated.iter().take(SAMPLE_CAP).cloned().collect(),
        });
    }

    FactTables {
        facts,
        revenue,
        findings,
    }
}
