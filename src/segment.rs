//! Catalog segmentation and per-segment feature standardization.
//!
//! Every record classifies into exactly one of three offer segments through a
//! fixed precedence rule; each segment then gets its own standardized feature
//! matrix, scaled with that segment's statistics only.

use ndarray::{Array1, Array2};

use crate::catalog::CatalogRecord;
use crate::error::{Error, Result};

/// The three mutually exclusive offer categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// Offers with a fixed main quota and no app bundle.
    Capped,
    /// Offers with no main quota, throttled past a fair-usage threshold.
    Uncapped,
    /// Offers bundling dedicated app quota on top of a main quota.
    AppBundle,
}

impl SegmentKind {
    /// All kinds in declaration order; also the global label-code order.
    pub const ALL: [SegmentKind; 3] =
        [SegmentKind::Capped, SegmentKind::Uncapped, SegmentKind::AppBundle];

    /// Classification rule, evaluated in fixed precedence.
    ///
    /// Returns `None` for records with no quota fields set at all.
    pub fn classify(record: &CatalogRecord) -> Option<SegmentKind> {
        if record.main_quota_gb <= 0.0 && record.fup_gb > 0.0 {
            Some(SegmentKind::Uncapped)
        } else if record.app_quota_gb > 0.0 {
            Some(SegmentKind::AppBundle)
        } else if record.main_quota_gb > 0.0 {
            Some(SegmentKind::Capped)
        } else {
            None
        }
    }

    /// Segment name used in output tables and error messages.
    pub fn name(self) -> &'static str {
        match self {
            SegmentKind::Capped => "capped",
            SegmentKind::Uncapped => "uncapped",
            SegmentKind::AppBundle => "app-bundle",
        }
    }

    /// Number of clusters fitted in this segment.
    pub fn cluster_count(self) -> usize {
        match self {
            SegmentKind::Capped => 3,
            SegmentKind::Uncapped => 2,
            SegmentKind::AppBundle => 3,
        }
    }

    /// Fuzziness exponent the reference analysis uses for this segment.
    pub fn fuzziness(self) -> f64 {
        match self {
            SegmentKind::Capped => 1.3,
            SegmentKind::Uncapped => 1.3,
            SegmentKind::AppBundle => 1.1,
        }
    }

    /// Names of the feature columns selected for this segment.
    pub fn feature_names(self) -> &'static [&'static str] {
        match self {
            SegmentKind::Capped => &["main_quota_gb", "price", "validity_days"],
            SegmentKind::Uncapped => &["fup_gb", "price", "validity_days"],
            SegmentKind::AppBundle => {
                &["main_quota_gb", "app_quota_gb", "price", "validity_days"]
            }
        }
    }

    /// Feature values of one record, in [`feature_names`](Self::feature_names)
    /// order.
    pub fn feature_row(self, record: &CatalogRecord) -> Vec<f64> {
        match self {
            SegmentKind::Capped => {
                vec![record.main_quota_gb, record.price, record.validity_days]
            }
            SegmentKind::Uncapped => vec![record.fup_gb, record.price, record.validity_days],
            SegmentKind::AppBundle => vec![
                record.main_quota_gb,
                record.app_quota_gb,
                record.price,
                record.validity_days,
            ],
        }
    }
}

impl std::fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-column standardization fitted on one segment's raw feature matrix.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    /// Column means.
    pub means: Array1<f64>,
    /// Column standard deviations; constant columns keep 1 so scaling stays
    /// well-defined.
    pub stds: Array1<f64>,
}

impl StandardScaler {
    /// Fit means and standard deviations per column.
    pub fn fit(matrix: &Array2<f64>) -> Self {
        let n = matrix.nrows().max(1) as f64;
        let mut means = Array1::zeros(matrix.ncols());
        let mut stds = Array1::zeros(matrix.ncols());

        for j in 0..matrix.ncols() {
            let col = matrix.column(j);
            let mean = col.sum() / n;
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let sd = var.sqrt();
            means[j] = mean;
            stds[j] = if sd > 0.0 { sd } else { 1.0 };
        }

        Self { means, stds }
    }

    /// Scale a matrix with the fitted statistics.
    pub fn transform(&self, matrix: &Array2<f64>) -> Array2<f64> {
        let mut out = matrix.clone();
        for mut row in out.rows_mut() {
            for j in 0..row.len() {
                row[j] = (row[j] - self.means[j]) / self.stds[j];
            }
        }
        out
    }
}

/// One segment's slice of the catalog plus its standardized feature matrix.
#[derive(Debug, Clone)]
pub struct Segment {
    /// Which of the three categories this is.
    pub kind: SegmentKind,
    /// Raw records with all original fields, in catalog order.
    pub records: Vec<CatalogRecord>,
    /// Standardized feature matrix; row i corresponds to `records[i]`.
    pub features: Array2<f64>,
    /// Scaler fitted on this segment's own statistics.
    pub scaler: StandardScaler,
}

/// The catalog split into the three segments.
#[derive(Debug, Clone)]
pub struct SegmentedCatalog {
    /// Capped-quota offers.
    pub capped: Segment,
    /// Uncapped offers.
    pub uncapped: Segment,
    /// Quota-plus-app-bundle offers.
    pub app_bundle: Segment,
}

impl SegmentedCatalog {
    /// Segments in declaration order.
    pub fn segments(&self) -> [&Segment; 3] {
        [&self.capped, &self.uncapped, &self.app_bundle]
    }

    /// Segment of the given kind.
    pub fn get(&self, kind: SegmentKind) -> &Segment {
        match kind {
            SegmentKind::Capped => &self.capped,
            SegmentKind::Uncapped => &self.uncapped,
            SegmentKind::AppBundle => &self.app_bundle,
        }
    }

    /// Total record count across all segments.
    pub fn total_records(&self) -> usize {
        self.segments().iter().map(|s| s.records.len()).sum()
    }
}

/// Split the catalog into segments and standardize each segment's features.
///
/// Pure and deterministic; an unclassifiable record or a segment smaller than
/// its cluster count is an error, never a silent drop.
pub fn segment_and_scale(catalog: &[CatalogRecord]) -> Result<SegmentedCatalog> {
    let mut buckets: [Vec<CatalogRecord>; 3] = [Vec::new(), Vec::new(), Vec::new()];

    for (row, record) in catalog.iter().enumerate() {
        match SegmentKind::classify(record) {
            Some(kind) => buckets[kind as usize].push(record.clone()),
            None => {
                return Err(Error::Unclassifiable {
                    row,
                    operator: record.operator.clone(),
                    main_gb: record.main_quota_gb,
                    app_gb: record.app_quota_gb,
                    fup_gb: record.fup_gb,
                })
            }
        }
    }

    let [capped, uncapped, app_bundle] = buckets;
    Ok(SegmentedCatalog {
        capped: build_segment(SegmentKind::Capped, capped)?,
        uncapped: build_segment(SegmentKind::Uncapped, uncapped)?,
        app_bundle: build_segment(SegmentKind::AppBundle, app_bundle)?,
    })
}

fn build_segment(kind: SegmentKind, records: Vec<CatalogRecord>) -> Result<Segment> {
    let k = kind.cluster_count();
    if records.len() < k {
        return Err(Error::SegmentTooSmall {
            segment: kind.name(),
            n_records: records.len(),
            k,
        });
    }

    let width = kind.feature_names().len();
    let mut raw = Array2::zeros((records.len(), width));
    for (i, record) in records.iter().enumerate() {
        for (j, value) in kind.feature_row(record).into_iter().enumerate() {
            raw[[i, j]] = value;
        }
    }

    let scaler = StandardScaler::fit(&raw);
    let features = scaler.transform(&raw);
    Ok(Segment {
        kind,
        records,
        features,
        scaler,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        operator: &str,
        price: f64,
        main: f64,
        validity: f64,
        app: f64,
        fup: f64,
    ) -> CatalogRecord {
        CatalogRecord {
            operator: operator.to_string(),
            price,
            main_quota_gb: main,
            validity_days: validity,
            app_quota_gb: app,
            fup_gb: fup,
        }
    }

    fn sample_catalog() -> Vec<CatalogRecord> {
        let mut catalog = Vec::new();
        // Four capped offers with spread-out quotas and prices.
        for i in 0..4 {
            let f = i as f64;
            catalog.push(record("Alpha", 8.0 + 2.0 * f, 2.0 + 3.0 * f, 30.0, 0.0, 0.0));
        }
        // Three uncapped offers.
        for i in 0..3 {
            let f = i as f64;
            catalog.push(record("Beta", 20.0 + 5.0 * f, 0.0, 30.0 + f, 0.0, 50.0 + 25.0 * f));
        }
        // Three app-bundle offers.
        for i in 0..3 {
            let f = i as f64;
            catalog.push(record("Gamma", 12.0 + 3.0 * f, 3.0 + f, 28.0, 5.0 + 2.0 * f, 0.0));
        }
        catalog
    }

    #[test]
    fn test_classification_precedence() {
        let uncapped = record("X", 10.0, 0.0, 30.0, 0.0, 100.0);
        assert_eq!(SegmentKind::classify(&uncapped), Some(SegmentKind::Uncapped));

        // FUP wins over app quota because the uncapped arm is checked first.
        let uncapped_with_app = record("X", 10.0, 0.0, 30.0, 3.0, 100.0);
        assert_eq!(
            SegmentKind::classify(&uncapped_with_app),
            Some(SegmentKind::Uncapped)
        );

        let app = record("X", 10.0, 4.0, 30.0, 3.0, 0.0);
        assert_eq!(SegmentKind::classify(&app), Some(SegmentKind::AppBundle));

        let capped = record("X", 10.0, 4.0, 30.0, 0.0, 0.0);
        assert_eq!(SegmentKind::classify(&capped), Some(SegmentKind::Capped));

        let nothing = record("X", 10.0, 0.0, 30.0, 0.0, 0.0);
        assert_eq!(SegmentKind::classify(&nothing), None);
    }

    #[test]
    fn test_partition_property() {
        let catalog = sample_catalog();
        let segmented = segment_and_scale(&catalog).unwrap();

        assert_eq!(segmented.capped.records.len(), 4);
        assert_eq!(segmented.uncapped.records.len(), 3);
        assert_eq!(segmented.app_bundle.records.len(), 3);
        assert_eq!(segmented.total_records(), catalog.len());
    }

    #[test]
    fn test_standardization_statistics() {
        let catalog = sample_catalog();
        let segmented = segment_and_scale(&catalog).unwrap();

        for segment in segmented.segments() {
            let features = &segment.features;
            let n = features.nrows() as f64;
            for j in 0..features.ncols() {
                let col = features.column(j);
                let mean = col.sum() / n;
                let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                assert!(mean.abs() < 1e-9, "column {j} mean {mean} not centered");
                // Constant columns scale by 1 and keep zero variance.
                assert!(
                    (var - 1.0).abs() < 1e-9 || var.abs() < 1e-9,
                    "column {j} variance {var} not unit"
                );
            }
        }
    }

    #[test]
    fn test_unclassifiable_record_is_an_error() {
        let mut catalog = sample_catalog();
        catalog.push(record("Omega", 10.0, 0.0, 30.0, 0.0, 0.0));

        match segment_and_scale(&catalog) {
            Err(Error::Unclassifiable { row, operator, .. }) => {
                assert_eq!(row, catalog.len() - 1);
                assert_eq!(operator, "Omega");
            }
            other => panic!("expected Unclassifiable, got {other:?}"),
        }
    }

    #[test]
    fn test_segment_smaller_than_cluster_count_is_an_error() {
        // Only one uncapped record, but the uncapped segment wants 2 clusters.
        let catalog = vec![
            record("Alpha", 8.0, 2.0, 30.0, 0.0, 0.0),
            record("Alpha", 10.0, 5.0, 30.0, 0.0, 0.0),
            record("Alpha", 12.0, 8.0, 30.0, 0.0, 0.0),
            record("Beta", 20.0, 0.0, 30.0, 0.0, 50.0),
            record("Gamma", 12.0, 3.0, 28.0, 5.0, 0.0),
            record("Gamma", 15.0, 4.0, 28.0, 7.0, 0.0),
            record("Gamma", 18.0, 5.0, 28.0, 9.0, 0.0),
        ];

        match segment_and_scale(&catalog) {
            Err(Error::SegmentTooSmall { segment, n_records, k }) => {
                assert_eq!(segment, "uncapped");
                assert_eq!(n_records, 1);
                assert_eq!(k, 2);
            }
            other => panic!("expected SegmentTooSmall, got {other:?}"),
        }
    }

    #[test]
    fn test_row_order_preserved() {
        let catalog = sample_catalog();
        let segmented = segment_and_scale(&catalog).unwrap();

        // Capped records keep their catalog order, and feature row 0 maps back
        // onto record 0 once unscaled.
        let segment = &segmented.capped;
        let first = &segment.records[0];
        let row = segment.features.row(0);
        let unscaled: Vec<f64> = row
            .iter()
            .enumerate()
            .map(|(j, v)| v * segment.scaler.stds[j] + segment.scaler.means[j])
            .collect();
        assert!((unscaled[0] - first.main_quota_gb).abs() < 1e-9);
        assert!((unscaled[1] - first.price).abs() < 1e-9);
        assert!((unscaled[2] - first.validity_days).abs() < 1e-9);
    }
}
