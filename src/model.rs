//! Delay-prediction model: logistic regression on order freight value.
//!
//! Deliberately a single-feature, fully explainable classifier. The fitted
//! coefficient and intercept are exposed verbatim on the artifact; a fixed
//! seed reproduces the identical train/test split and metrics.

use linfa::prelude::*;
use linfa_logistic::LogisticRegression;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::facts::OrderFact;

pub const DEFAULT_SEED: u64 = 42;
pub const TEST_FRACTION: f64 = 0.2;
pub const MIN_CLASS_EXAMPLES: usize = 2;
const MAX_ITERATIONS: u64 = 250;

/// One training example: an order's freight value and delay outcome.
#[derive(Debug, Clone, Serialize)]
pub struct DelaySample {
    pub order_id: String,
    pub freight_value: f64,
    pub delayed: bool,
}

/// Extract training samples from the fact table. Orders with an unknown
/// delay outcome are excluded.
pub fn delay_samples(facts: &[OrderFact]) -> Vec<DelaySample> {
    facts
        .iter()
        .filter_map(|f| {
            f.is_delayed.map(|delayed| DelaySample {
                order_id: f.order_id.clone(),
                freight_value: f.freight_total.as_f64(),
                delayed,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_negatives: u64,
    pub false_positives: u64,
    pub false_negatives: u64,
    pub true_positives: u64,
}

impl ConfusionMatrix {
    pub fn record(&mut self, actual: bool, predicted: bool) {
        match (actual, predicted) {
            (false, false) => self.true_negatives += 1,
            (false, true) => self.false_positives += 1,
            (true, false) => self.false_negatives += 1,
            (true, true) => self.true_positives += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.true_negatives + self.false_positives + self.false_negatives + self.true_positives
    }

    /// `None` when no sample was predicted positive.
    pub fn precision(&self) -> Option<f64> {
        let predicted_positive = self.true_positives + self.false_positives;
        (predicted_positive > 0).then(|| self.true_positives as f64 / predicted_positive as f64)
    }

    /// `None` when no sample was actually positive.
    pub fn recall(&self) -> Option<f64> {
        let actual_positive = self.true_positives + self.false_negatives;
        (actual_positive > 0).then(|| self.true_positives as f64 / actual_positive as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvalMetrics {
    pub accuracy: f64,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeldOutPrediction {
    pub order_id: String,
    pub actual: bool,
    pub predicted: bool,
    /// Probability of a delayed delivery.
    pub probability: f64,
}

/// Immutable result of one training + evaluation run.
#[derive(Debug, Clone, Serialize)]
pub struct ModelArtifact {
    /// Ordered feature names, matching `coefficients`.
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub metrics: EvalMetrics,
    pub confusion: ConfusionMatrix,
    pub held_out: Vec<HeldOutPrediction>,
}

/// Train and evaluate the delay classifier on an 80/20 split shuffled by
/// the given seed. The same seed always reproduces the same split,
/// metrics and coefficients.
pub fn train_delay_model(samples: &[DelaySample], seed: u64) -> Result<ModelArtifact, ModelError> {
    let delayed = samples.iter().filter(|s| s.delayed).count();
    let on_time = samples.len() - delayed;
    if delayed < MIN_CLASS_EXAMPLES || on_time < MIN_CLASS_EXAMPLES {
        return Err(ModelError::InsufficientData {
            delayed,
            on_time,
            min: MIN_CLASS_EXAMPLES,
        });
    }

    let mut indices: Vec<usize> = (0..samples.len()).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));
    let n_test =
        ((samples.len() as f64 * TEST_FRACTION).round() as usize).clamp(1, samples.len() - 1);
    let (test_idx, train_idx) = indices.split_at(n_test);

    let train_delayed = train_idx.iter().filter(|&&i| samples[i].delayed).count();
    if train_delayed == 0 || train_delayed == train_idx.len() {
        return Err(ModelError::InsufficientData {
            delayed: train_delayed,
            on_time: train_idx.len() - train_delayed,
            min: 1,
        });
    }

    let feature_matrix = |idx: &[usize]| {
        Array2::from_shape_vec(
            (idx.len(), 1),
            idx.iter().map(|&i| samples[i].freight_value).collect(),
        )
        .map_err(|e| ModelError::Fit(e.to_string()))
    };
    let x_train = feature_matrix(train_idx)?;
    let x_test = feature_matrix(test_idx)?;
    let y_train = Array1::from_iter(train_idx.iter().map(|&i| samples[i].delayed));

    let fitted = LogisticRegression::default()
        .max_iterations(MAX_ITERATIONS)
        .fit(&Dataset::new(x_train, y_train))
        .map_err(|e| ModelError::Fit(e.to_string()))?;

    let predicted = fitted.predict(&x_test);
    let probabilities = fitted.predict_probabilities(&x_test);

    let mut confusion = ConfusionMatrix::default();
    let mut held_out = Vec::with_capacity(test_idx.len());
    for (row, &i) in test_idx.iter().enumerate() {
        let actual = samples[i].delayed;
        confusion.record(actual, predicted[row]);
        held_out.push(HeldOutPrediction {
            order_id: samples[i].order_id.clone(),
            actual,
            predicted: predicted[row],
            probability: probabilities[row],
        });
    }

    // The split guarantees at least one held-out row.
    let correct = confusion.true_positives + confusion.true_negatives;
    let metrics = EvalMetrics {
        accuracy: correct as f64 / confusion.total() as f64,
        precision: confusion.precision(),
        recall: confusion.recall(),
    };

    Ok(ModelArtifact {
        feature_names: vec!["freight_value".to_string()],
        coefficients: fitted.params().iter().copied().collect(),
        intercept: fitted.intercept(),
        metrics,
        confusion,
        held_out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: usize, freight: f64, delayed: bool) -> DelaySample {
        DelaySample {
            order_id: format!("o{id:03}"),
            freight_value: freight,
            delayed,
        }
    }

    /// Freight values from two disjoint ranges, perfectly correlated with
    /// the delay label.
    fn separable_samples(n_per_class: usize) -> Vec<DelaySample> {
        let mut samples = Vec::new();
        for i in 0..n_per_class {
            samples.push(sample(i, 100.0 + i as f64, true));
            samples.push(sample(n_per_class + i, 10.0 + i as f64 * 0.1, false));
        }
        samples
    }

    #[test]
    fn too_few_examples_per_class_is_an_error() {
        let samples = vec![
            sample(0, 100.0, true),
            sample(1, 10.0, false),
            sample(2, 11.0, false),
        ];
        match train_delay_model(&samples, DEFAULT_SEED) {
            Err(ModelError::InsufficientData {
                delayed, on_time, ..
            }) => {
                assert_eq!(delayed, 1);
                assert_eq!(on_time, 2);
            }
            other => panic!("expected InsufficientData, got {other:?}"),
        }
    }

    #[test]
    fn separable_data_reaches_perfect_held_out_accuracy() {
        let samples = separable_samples(25);
        let artifact = train_delay_model(&samples, DEFAULT_SEED).unwrap();

        assert_eq!(artifact.metrics.accuracy, 1.0);
        assert_eq!(artifact.metrics.precision, Some(1.0));
        assert_eq!(artifact.metrics.recall, Some(1.0));
        assert_eq!(artifact.confusion.total(), 10);
        assert_eq!(artifact.held_out.len(), 10);

        // Higher freight must push towards "delayed".
        assert_eq!(artifact.feature_names, vec!["freight_value".to_string()]);
        assert_eq!(artifact.coefficients.len(), 1);
        assert!(artifact.coefficients[0] > 0.0);
    }

    #[test]
    fn same_seed_reproduces_identical_results() {
        let samples = separable_samples(25);
        let a = train_delay_model(&samples, 7).unwrap();
        let b = train_delay_model(&samples, 7).unwrap();

        assert_eq!(a.metrics, b.metrics);
        assert_eq!(a.confusion, b.confusion);
        assert_eq!(a.coefficients, b.coefficients);
        assert_eq!(a.intercept, b.intercept);
        let ids: Vec<&str> = a.held_out.iter().map(|p| p.order_id.as_str()).collect();
        let other_ids: Vec<&str> = b.held_out.iter().map(|p| p.order_id.as_str()).collect();
        assert_eq!(ids, other_ids);
    }

    #[test]
    fn precision_undefined_without_predicted_positives() {
        let confusion = ConfusionMatrix {
            true_negatives: 5,
            false_positives: 0,
            false_negatives: 3,
            true_positives: 0,
        };
        assert_eq!(confusion.precision(), None);
        assert_eq!(confusion.recall(), Some(0.0));

        let empty_positive = ConfusionMatrix {
            true_negatives: 5,
            false_positives: 1,
            false_negatives: 0,
            true_positives: 0,
        };
        assert_eq!(empty_positive.recall(), None);
    }

    #[test]
    fn unknown_outcomes_are_excluded_from_samples() {
        use crate::money::Money;
        use std::collections::BTreeSet;

        let fact = |id: &str, delayed: Option<bool>| OrderFact {
            order_id: id.to_string(),
            customer_id: None,
            customer_unique_id: None,
            purchase_ts: None,
            estimated_delivery_at: None,
            delivered_at: None,
            is_delayed: delayed,
            item_total: Money::ZERO,
            freight_total: Money::parse("12.50").unwrap(),
            payment_total: Money::ZERO,
            primary_payment: None,
            payment_methods: BTreeSet::new(),
            avg_review_score: None,
            seller_ids: BTreeSet::new(),
            categories: BTreeSet::new(),
            item_count: 0,
            payment_count: 0,
        };

        let facts = vec![fact("o1", Some(true)), fact("o2", None), fact("o3", Some(false))];
        let samples = delay_samples(&facts);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].order_id, "o1");
        assert!((samples[0].freight_value - 12.5).abs() < 1e-12);
    }
}
