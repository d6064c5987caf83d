//! Analytics and insight engine for the Olist e-commerce dataset.
//!
//! Loads the nine raw tables, derives one denormalized fact per order, and
//! computes KPIs, customer segments, an explainable delivery-delay
//! classifier, and data-quality findings. Everything is recomputed
//! deterministically per run; given identical inputs and seed, the full
//! report is byte-identical.

pub mod engine;
pub mod error;
pub mod facts;
pub mod kpi;
pub mod loader;
pub mod model;
pub mod money;
pub mod quality;
pub mod segmentation;
pub mod tables;

pub use engine::{run, EngineConfig, InsightReport, Kpis, ModelOutcome};
pub use error::{DataError, ModelError};
pub use money::Money;
