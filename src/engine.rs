//! Pipeline orchestration: load → derive → KPIs, segmentation, model,
//! quality audit. Produces one plain serializable report; the caller only
//! formats it.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{DataError, ModelError};
use crate::facts;
use crate::kpi::{
    self, CategoryRevenue, DelayDistribution, MonthlyAov, MonthlyOrders, PaymentMethodBreakdown,
    ReviewDelaySplit, SellerRevenue,
};
use crate::loader;
use crate::model::{self, ModelArtifact};
use crate::money::Money;
use crate::quality::{self, QualityFinding};
use crate::segmentation::{self, CustomerProfile, SegmentSummary};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    /// Seed for the model's train/test split.
    pub seed: u64,
}

impl EngineConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> EngineConfig {
        EngineConfig {
            data_dir: data_dir.into(),
            seed: model::DEFAULT_SEED,
        }
    }
}

/// Scalar business metrics. Undefined ratios are `None`.
#[derive(Debug, Clone, Serialize)]
pub struct Kpis {
    pub total_orders: u64,
    pub total_revenue: Money,
    pub delayed_orders: u64,
    pub delayed_order_rate: Option<f64>,
    pub average_review_score: Option<f64>,
    pub repeat_customer_rate: Option<f64>,
}

/// The delay model either trained or explains why it could not. An
/// untrainable model never aborts the run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModelOutcome {
    Trained { artifact: ModelArtifact },
    Unavailable { reason: String },
}

/// Everything one engine run produces. Plain data; the presentation layer
/// renders it without re-deriving anything.
#[derive(Debug, Clone, Serialize)]
pub struct InsightReport {
    pub kpis: Kpis,
    pub orders_over_time: Vec<MonthlyOrders>,
    pub revenue_by_category: Vec<CategoryRevenue>,
    pub revenue_by_seller: Vec<SellerRevenue>,
    pub delay_distribution: DelayDistribution,
    pub aov_over_time: Vec<MonthlyAov>,
    pub review_by_delay: Vec<ReviewDelaySplit>,
    pub payment_methods: Vec<PaymentMethodBreakdown>,
    pub segments: Vec<SegmentSummary>,
    pub customer_profiles: Vec<CustomerProfile>,
    pub model: ModelOutcome,
    pub quality_findings: Vec<QualityFinding>,
}

/// Run the full pipeline once over a dataset directory.
pub fn run(config: &EngineConfig) -> Result<InsightReport, DataError> {
    info!(dir = %config.data_dir.display(), "loading dataset");
    let data = loader::load_dataset(&config.data_dir)?;

    let derived = facts::derive(&data);
    info!(
        orders = derived.facts.len(),
        categories = derived.revenue.by_category.len(),
        "derived order facts"
    );

    let kpis = Kpis {
        total_orders: kpi::total_orders(&derived.facts),
        total_revenue: kpi::total_revenue(&derived.facts),
        delayed_orders: kpi::delayed_orders(&derived.facts),
        delayed_order_rate: kpi::delayed_order_rate(&derived.facts),
        average_review_score: kpi::average_review_score(&derived.facts),
        repeat_customer_rate: kpi::repeat_customer_rate(&derived.facts),
    };

    let samples = model::delay_samples(&derived.facts);
    let model = match model::train_delay_model(&samples, config.seed) {
        Ok(artifact) => {
            info!(
                accuracy = artifact.metrics.accuracy,
                held_out = artifact.held_out.len(),
                "delay model trained"
            );
            ModelOutcome::Trained { artifact }
        }
        Err(err @ ModelError::InsufficientData { .. }) => {
            warn!(%err, "delay model unavailable");
            ModelOutcome::Unavailable {
                reason: err.to_string(),
            }
        }
        Err(err) => {
            warn!(%err, "delay model fitting failed");
            ModelOutcome::Unavailable {
                reason: err.to_string(),
            }
        }
    };

    let quality_findings = quality::audit(&data, &derived);
    if !quality_findings.is_empty() {
        warn!(findings = quality_findings.len(), "data quality issues detected");
    }

    Ok(InsightReport {
        kpis,
        orders_over_time: kpi::orders_over_time(&derived.facts),
        revenue_by_category: kpi::revenue_by_category(&derived.revenue),
        revenue_by_seller: kpi::revenue_by_seller(&derived.revenue),
        delay_distribution: kpi::delivery_delay_distribution(&derived.facts),
        aov_over_time: kpi::average_order_value_over_time(&derived.facts),
        review_by_delay: kpi::review_score_by_delay(&derived.facts),
        payment_methods: kpi::payment_method_breakdown(&derived.facts),
        segments: segmentation::summarize(&derived.facts),
        customer_profiles: segmentation::build_profiles(&derived.facts),
        model,
        quality_findings,
    })
}
