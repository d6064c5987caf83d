//! Typed rows for the nine raw dataset tables.
//!
//! Each table declares its name, column list and primary key through the
//! [`Record`] trait so the quality auditor can run the same checks against
//! every table. Optional fields stay `None` when the source value was
//! empty or unparsable; only an unusable key excludes a row at load time.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::money::Money;
use crate::quality::QualityFinding;

/// A row of one of the raw source tables.
pub trait Record {
    const TABLE: &'static str;

    /// Column names in source order, aligned with [`Record::null_mask`].
    const COLUMNS: &'static [&'static str];

    /// Declared primary-key columns.
    const KEY_COLUMNS: &'static [&'static str];

    /// The row's primary-key value; composite keys are joined with `/`.
    fn key(&self) -> String;

    /// `true` per column when the value is missing, aligned with `COLUMNS`.
    fn null_mask(&self) -> Vec<bool>;
}

fn text_missing(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub order_id: String,
    pub customer_id: Option<String>,
    pub status: Option<String>,
    pub purchase_ts: Option<NaiveDateTime>,
    pub approved_at: Option<NaiveDateTime>,
    pub delivered_carrier_at: Option<NaiveDateTime>,
    pub delivered_customer_at: Option<NaiveDateTime>,
    pub estimated_delivery_at: Option<NaiveDateTime>,
}

impl Record for Order {
    const TABLE: &'static str = "orders";
    const COLUMNS: &'static [&'static str] = &[
        "order_id",
        "customer_id",
        "order_status",
        "order_purchase_timestamp",
        "order_approved_at",
        "order_delivered_carrier_date",
        "order_delivered_customer_date",
        "order_estimated_delivery_date",
    ];
    const KEY_COLUMNS: &'static [&'static str] = &["order_id"];

    fn key(&self) -> String {
        self.order_id.clone()
    }

    fn null_mask(&self) -> Vec<bool> {
        vec![
            false,
            text_missing(&self.customer_id),
            text_missing(&self.status),
            self.purchase_ts.is_none(),
            self.approved_at.is_none(),
            self.delivered_carrier_at.is_none(),
            self.delivered_customer_at.is_none(),
            self.estimated_delivery_at.is_none(),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    pub customer_id: String,
    pub customer_unique_id: Option<String>,
    pub zip_prefix: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

impl Record for Customer {
    const TABLE: &'static str = "customers";
    const COLUMNS: &'static [&'static str] = &[
        "customer_id",
        "customer_unique_id",
        "customer_zip_code_prefix",
        "customer_city",
        "customer_state",
    ];
    const KEY_COLUMNS: &'static [&'static str] = &["customer_id"];

    fn key(&self) -> String {
        self.customer_id.clone()
    }

    fn null_mask(&self) -> Vec<bool> {
        vec![
            false,
            text_missing(&self.customer_unique_id),
            text_missing(&self.zip_prefix),
            text_missing(&self.city),
            text_missing(&self.state),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub order_id: String,
    pub item_seq: u32,
    pub product_id: Option<String>,
    pub seller_id: Option<String>,
    pub shipping_limit_at: Option<NaiveDateTime>,
    pub price: Option<Money>,
    pub freight_value: Option<Money>,
}

impl Record for OrderItem {
    const TABLE: &'static str = "order_items";
    const COLUMNS: &'static [&'static str] = &[
        "order_id",
        "order_item_id",
        "product_id",
        "seller_id",
        "shipping_limit_date",
        "price",
        "freight_value",
    ];
    const KEY_COLUMNS: &'static [&'static str] = &["order_id", "order_item_id"];

    fn key(&self) -> String {
        format!("{}/{}", self.order_id, self.item_seq)
    }

    fn null_mask(&self) -> Vec<bool> {
        vec![
            false,
            false,
            text_missing(&self.product_id),
            text_missing(&self.seller_id),
            self.shipping_limit_at.is_none(),
            self.price.is_none(),
            self.freight_value.is_none(),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub product_id: String,
    pub category_name: Option<String>,
    pub weight_g: Option<f64>,
}

impl Record for Product {
    const TABLE: &'static str = "products";
    const COLUMNS: &'static [&'static str] =
        &["product_id", "product_category_name", "product_weight_g"];
    const KEY_COLUMNS: &'static [&'static str] = &["product_id"];

    fn key(&self) -> String {
        self.product_id.clone()
    }

    fn null_mask(&self) -> Vec<bool> {
        vec![
            false,
            text_missing(&self.category_name),
            self.weight_g.is_none(),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub review_id: String,
    pub order_id: String,
    pub score: Option<u8>,
    pub comment_message: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

impl Record for Review {
    const TABLE: &'static str = "order_reviews";
    const COLUMNS: &'static [&'static str] = &[
        "review_id",
        "order_id",
        "review_score",
        "review_comment_message",
        "review_creation_date",
    ];
    const KEY_COLUMNS: &'static [&'static str] = &["review_id", "order_id"];

    fn key(&self) -> String {
        format!("{}/{}", self.review_id, self.order_id)
    }

    fn null_mask(&self) -> Vec<bool> {
        vec![
            false,
            false,
            self.score.is_none(),
            text_missing(&self.comment_message),
            self.created_at.is_none(),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    pub order_id: String,
    pub sequential: u32,
    pub payment_type: Option<String>,
    pub installments: Option<u32>,
    pub value: Option<Money>,
}

impl Record for Payment {
    const TABLE: &'static str = "order_payments";
    const COLUMNS: &'static [&'static str] = &[
        "order_id",
        "payment_sequential",
        "payment_type",
        "payment_installments",
        "payment_value",
    ];
    const KEY_COLUMNS: &'static [&'static str] = &["order_id", "payment_sequential"];

    fn key(&self) -> String {
        format!("{}/{}", self.order_id, self.sequential)
    }

    fn null_mask(&self) -> Vec<bool> {
        vec![
            false,
            false,
            text_missing(&self.payment_type),
            self.installments.is_none(),
            self.value.is_none(),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Seller {
    pub seller_id: String,
    pub zip_prefix: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

impl Record for Seller {
    const TABLE: &'static str = "sellers";
    const COLUMNS: &'static [&'static str] = &[
        "seller_id",
        "seller_zip_code_prefix",
        "seller_city",
        "seller_state",
    ];
    const KEY_COLUMNS: &'static [&'static str] = &["seller_id"];

    fn key(&self) -> String {
        self.seller_id.clone()
    }

    fn null_mask(&self) -> Vec<bool> {
        vec![
            false,
            text_missing(&self.zip_prefix),
            text_missing(&self.city),
            text_missing(&self.state),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryTranslation {
    pub category_name: String,
    pub category_name_english: Option<String>,
}

impl Record for CategoryTranslation {
    const TABLE: &'static str = "category_translation";
    const COLUMNS: &'static [&'static str] =
        &["product_category_name", "product_category_name_english"];
    const KEY_COLUMNS: &'static [&'static str] = &["product_category_name"];

    fn key(&self) -> String {
        self.category_name.clone()
    }

    fn null_mask(&self) -> Vec<bool> {
        vec![false, text_missing(&self.category_name_english)]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Geolocation {
    pub zip_prefix: String,
    pub lat: f64,
    pub lng: f64,
    pub city: Option<String>,
    pub state: Option<String>,
}

impl Record for Geolocation {
    const TABLE: &'static str = "geolocation";
    const COLUMNS: &'static [&'static str] = &[
        "geolocation_zip_code_prefix",
        "geolocation_lat",
        "geolocation_lng",
        "geolocation_city",
        "geolocation_state",
    ];
    const KEY_COLUMNS: &'static [&'static str] = &[
        "geolocation_zip_code_prefix",
        "geolocation_lat",
        "geolocation_lng",
    ];

    fn key(&self) -> String {
        format!("{}/{}/{}", self.zip_prefix, self.lat, self.lng)
    }

    fn null_mask(&self) -> Vec<bool> {
        vec![
            false,
            false,
            false,
            text_missing(&self.city),
            text_missing(&self.state),
        ]
    }
}

/// The nine raw tables of one dataset, plus the findings the loader raised
/// while reading them (excluded rows with unusable keys).
#[derive(Debug, Default)]
pub struct Dataset {
    pub orders: Vec<Order>,
    pub customers: Vec<Customer>,
    pub order_items: Vec<OrderItem>,
    pub products: Vec<Product>,
    pub reviews: Vec<Review>,
    pub payments: Vec<Payment>,
    pub sellers: Vec<Seller>,
    pub category_translation: Vec<CategoryTranslation>,
    pub geolocation: Vec<Geolocation>,
    pub load_findings: Vec<QualityFinding>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_keys_join_with_slash() {
        let item = OrderItem {
            order_id: "o1".into(),
            item_seq: 2,
            product_id: None,
            seller_id: None,
            shipping_limit_at: None,
            price: None,
            freight_value: None,
        };
        assert_eq!(item.key(), "o1/2");
    }

    #[test]
    fn null_mask_matches_column_count() {
        let order = Order {
            order_id: "o1".into(),
            customer_id: Some("c1".into()),
            status: None,
            purchase_ts: None,
            approved_at: None,
            delivered_carrier_at: None,
            delivered_customer_at: None,
            estimated_delivery_at: None,
        };
        let mask = order.null_mask();
        assert_eq!(mask.len(), Order::COLUMNS.len());
        assert!(!mask[0]);
        assert!(!mask[1]);
        assert!(mask[2]);
    }

    #[test]
    fn whitespace_only_text_counts_as_missing() {
        let customer = Customer {
            customer_id: "c1".into(),
            customer_unique_id: Some("  ".into()),
            zip_prefix: Some("01310".into()),
            city: None,
            state: None,
        };
        let mask = customer.null_mask();
        assert!(mask[1]);
        assert!(!mask[2]);
    }
}
