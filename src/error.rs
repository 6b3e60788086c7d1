use thiserror::Error;

/// Errors surfaced by the analysis pipeline.
///
/// Every variant names the failing stage and carries enough context for a
/// caller to tell bad input apart from an empty selection.
#[derive(Debug, Error)]
pub enum Error {
    /// The input table is missing a required column.
    #[error("missing required column `{0}`")]
    MissingColumn(&'static str),

    /// A record matched none of the segment classification arms.
    #[error(
        "record {row} ({operator}) is unclassifiable: \
         main={main_gb} GB, app={app_gb} GB, fup={fup_gb} GB"
    )]
    Unclassifiable {
        /// Zero-based row index in the input catalog.
        row: usize,
        /// Operator name of the offending record.
        operator: String,
        /// Main quota of the offending record.
        main_gb: f64,
        /// App quota of the offending record.
        app_gb: f64,
        /// Fair-usage-policy threshold of the offending record.
        fup_gb: f64,
    },

    /// A segment ended up with fewer records than its cluster count.
    #[error("segment `{segment}` has {n_records} records, fewer than its {k} clusters")]
    SegmentTooSmall {
        /// Segment name.
        segment: &'static str,
        /// Records classified into the segment.
        n_records: usize,
        /// Clusters the segment is configured for.
        k: usize,
    },

    /// A non-finite value reached a numeric stage.
    #[error("non-finite value in {stage} input at row {row}, column {col}")]
    NonFinite {
        /// Stage that rejected the value.
        stage: &'static str,
        /// Row of the offending entry.
        row: usize,
        /// Column of the offending entry.
        col: usize,
    },

    /// A matrix is too small for the requested reduction.
    #[error("matrix of shape {rows}x{cols} cannot be reduced to {target} components")]
    InsufficientData {
        /// Rows in the input matrix.
        rows: usize,
        /// Columns in the input matrix.
        cols: usize,
        /// Requested component count.
        target: usize,
    },

    /// Requested cluster count is incompatible with the dataset.
    #[error("invalid cluster count: requested {requested}, but dataset has {n_items} items")]
    InvalidClusterCount {
        /// Requested number of clusters.
        requested: usize,
        /// Number of items in the dataset.
        n_items: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: String,
    },

    /// Paired inputs have inconsistent row cardinality.
    #[error("dimension mismatch: expected {expected} rows, found {found}")]
    DimensionMismatch {
        /// Expected row count.
        expected: usize,
        /// Found row count.
        found: usize,
    },

    /// A cluster selector resolved to nothing in the vocabulary.
    #[error("unknown cluster `{0}`")]
    UnknownCluster(String),

    /// Failure while reading the catalog table.
    #[error("catalog read failed: {0}")]
    Data(#[from] polars::prelude::PolarsError),

    /// Failure while rendering a chart.
    #[error("chart rendering failed: {0}")]
    Chart(String),
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
