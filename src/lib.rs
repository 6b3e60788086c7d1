//! Tariffscope: market-position analysis for mobile-data product catalogs
//!
//! The pipeline splits a product catalog into three offer segments, projects
//! each segment's standardized features onto a 2-D principal-component
//! embedding, groups offers per segment with fuzzy c-means, and ranks
//! operators and clusters by value-per-price yield. Each stage is a pure
//! transform over the previous stage's output, so every stage is testable on
//! fixed fixtures.

pub mod catalog;
pub mod chart;
pub mod cli;
pub mod cluster;
pub mod error;
pub mod pipeline;
pub mod reduce;
pub mod segment;
pub mod vocab;
pub mod yields;

// Re-export public items for easier access
pub use catalog::{load_catalog, CatalogRecord};
pub use cli::Args;
pub use cluster::{cluster, fitness, fitness_scan, FcmFit, LabeledRecord, Termination};
pub use error::{Error, Result};
pub use pipeline::{prepare_data, run, Analysis, PipelineParams, Session};
pub use reduce::{reduce, Pca};
pub use segment::{segment_and_scale, Segment, SegmentKind, SegmentedCatalog, StandardScaler};
pub use vocab::{ClusterLabel, Vocabulary};
pub use yields::{all_cluster_yield, cluster_yield, operator_yield, OfferKind, YieldTable};
