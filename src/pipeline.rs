//! End-to-end orchestration of the analysis stages.
//!
//! Data flows strictly forward: catalog → segments → embeddings → clusters →
//! labeled records. Every stage produces new tables; nothing mutates shared
//! state, so a run is deterministic for a given catalog and parameter set.

use ndarray::Array2;

use crate::catalog::CatalogRecord;
use crate::cluster::{self, LabeledRecord, SegmentClustering};
use crate::error::Result;
use crate::reduce;
use crate::segment::{segment_and_scale, Segment, SegmentKind, SegmentedCatalog};
use crate::vocab::Vocabulary;

/// Embedding dimensionality used throughout the analysis.
pub const EMBEDDING_DIMS: usize = 2;

/// Tunable inputs of one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineParams {
    /// Fuzziness exponent per segment, in [`SegmentKind::ALL`] order.
    pub fuzziness: [f64; 3],
}

impl PipelineParams {
    /// Fuzziness exponent for one segment.
    pub fn fuzziness_for(&self, kind: SegmentKind) -> f64 {
        self.fuzziness[kind as usize]
    }
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            fuzziness: [
                SegmentKind::Capped.fuzziness(),
                SegmentKind::Uncapped.fuzziness(),
                SegmentKind::AppBundle.fuzziness(),
            ],
        }
    }
}

/// Split and standardize the catalog. Entry point for presentation callers.
pub fn prepare_data(catalog: &[CatalogRecord]) -> Result<SegmentedCatalog> {
    segment_and_scale(catalog)
}

/// Everything one full forward pass produces.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Segmented raw and standardized tables.
    pub segmented: SegmentedCatalog,
    /// 2-D embeddings per segment, in [`SegmentKind::ALL`] order.
    pub embeddings: [Array2<f64>; 3],
    /// Clustering outcomes per segment, in [`SegmentKind::ALL`] order.
    pub clusterings: [SegmentClustering; 3],
}

impl Analysis {
    /// All labeled records, segments concatenated in declaration order.
    pub fn labeled_catalog(&self) -> Vec<LabeledRecord> {
        self.clusterings
            .iter()
            .flat_map(|c| c.labeled.iter().cloned())
            .collect()
    }

    /// Clustering outcome of one segment.
    pub fn clustering(&self, kind: SegmentKind) -> &SegmentClustering {
        &self.clusterings[kind as usize]
    }

    /// Embedding of one segment.
    pub fn embedding(&self, kind: SegmentKind) -> &Array2<f64> {
        &self.embeddings[kind as usize]
    }
}

/// Run the full pipeline: segment, reduce, cluster.
pub fn run(
    catalog: &[CatalogRecord],
    params: &PipelineParams,
    vocabulary: &Vocabulary,
) -> Result<Analysis> {
    let segmented = prepare_data(catalog)?;

    let (capped_embedding, capped) = run_segment(&segmented.capped, params, vocabulary)?;
    let (uncapped_embedding, uncapped) = run_segment(&segmented.uncapped, params, vocabulary)?;
    let (app_embedding, app_bundle) = run_segment(&segmented.app_bundle, params, vocabulary)?;

    Ok(Analysis {
        segmented,
        embeddings: [capped_embedding, uncapped_embedding, app_embedding],
        clusterings: [capped, uncapped, app_bundle],
    })
}

fn run_segment(
    segment: &Segment,
    params: &PipelineParams,
    vocabulary: &Vocabulary,
) -> Result<(Array2<f64>, SegmentClustering)> {
    let embedding = reduce::reduce(&segment.features, EMBEDDING_DIMS)?;
    let clustering = cluster::cluster(
        segment.kind,
        &segment.records,
        &embedding,
        segment.kind.cluster_count(),
        params.fuzziness_for(segment.kind),
        vocabulary,
    )?;
    Ok((embedding, clustering))
}

/// A memoized analysis session over one catalog snapshot.
///
/// Yield and vocabulary queries reuse the cached analysis; only a parameter
/// change invalidates it, so inspecting a different cluster never retriggers
/// segmentation, reduction, or clustering.
#[derive(Debug)]
pub struct Session {
    catalog: Vec<CatalogRecord>,
    params: PipelineParams,
    vocabulary: Vocabulary,
    cached: Option<Analysis>,
    runs: usize,
}

impl Session {
    /// Session with default parameters and the standard vocabulary.
    pub fn new(catalog: Vec<CatalogRecord>) -> Self {
        Self::with_params(catalog, PipelineParams::default())
    }

    /// Session with explicit parameters.
    pub fn with_params(catalog: Vec<CatalogRecord>, params: PipelineParams) -> Self {
        Self {
            catalog,
            params,
            vocabulary: Vocabulary::standard(),
            cached: None,
            runs: 0,
        }
    }

    /// The injected label vocabulary.
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Current parameters.
    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    /// Replace parameters, dropping the cache only when they actually change.
    pub fn set_params(&mut self, params: PipelineParams) {
        if params != self.params {
            self.params = params;
            self.cached = None;
        }
    }

    /// The analysis for the current catalog and parameters, computed at most
    /// once until invalidated.
    pub fn analysis(&mut self) -> Result<&Analysis> {
        if self.cached.is_none() {
            let analysis = run(&self.catalog, &self.params, &self.vocabulary)?;
            self.runs += 1;
            return Ok(self.cached.insert(analysis));
        }
        match &self.cached {
            Some(analysis) => Ok(analysis),
            None => unreachable!("checked is_none above"),
        }
    }

    /// How many times the expensive stages actually ran.
    pub fn run_count(&self) -> usize {
        self.runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yields::{cluster_yield, operator_yield, OfferKind};

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
        for i in 0..6 {
            let f = i as f64;
            catalog.push(record("Alpha", 6.0 + 4.0 * f, 1.0 + 5.0 * f, 30.0, 0.0, 0.0));
        }
        for i in 0..4 {
            let f = i as f64;
            catalog.push(record("Beta", 20.0 + 6.0 * f, 0.0, 30.0, 0.0, 40.0 + 30.0 * f));
        }
        for i in 0..4 {
            let f = i as f64;
            catalog.push(record("Gamma", 10.0 + 4.0 * f, 2.0 + f, 28.0, 4.0 + 3.0 * f, 0.0));
        }
        catalog
    }

    #[test]
    fn test_run_produces_consistent_shapes() {
        let catalog = sample_catalog();
        let analysis = run(
            &catalog,
            &PipelineParams::default(),
            &Vocabulary::standard(),
        )
        .unwrap();

        assert_eq!(analysis.embedding(SegmentKind::Capped).dim(), (6, 2));
        assert_eq!(analysis.embedding(SegmentKind::Uncapped).dim(), (4, 2));
        assert_eq!(analysis.embedding(SegmentKind::AppBundle).dim(), (4, 2));

        let labeled = analysis.labeled_catalog();
        assert_eq!(labeled.len(), catalog.len());
    }

    #[test]
    fn test_labels_stay_in_segment_vocabulary() {
        let analysis = run(
            &sample_catalog(),
            &PipelineParams::default(),
            &Vocabulary::standard(),
        )
        .unwrap();

        for labeled in &analysis.clustering(SegmentKind::Capped).labeled {
            assert!((1..=3).contains(&labeled.cluster));
        }
        for labeled in &analysis.clustering(SegmentKind::Uncapped).labeled {
            assert!((4..=5).contains(&labeled.cluster));
        }
        for labeled in &analysis.clustering(SegmentKind::AppBundle).labeled {
            assert!((6..=8).contains(&labeled.cluster));
        }
    }

    #[test]
    fn test_session_memoizes_across_yield_queries() {
        let mut session = Session::new(sample_catalog());

        let labeled = session.analysis().unwrap().labeled_catalog();
        let vocabulary = session.vocabulary().clone();
        operator_yield(&labeled, OfferKind::NonApp).unwrap();
        cluster_yield(&labeled, "High Main", OfferKind::NonApp, &vocabulary).unwrap();
        cluster_yield(&labeled, "Low Main", OfferKind::NonApp, &vocabulary).unwrap();
        session.analysis().unwrap();

        assert_eq!(session.run_count(), 1);
    }

    #[test]
    fn test_session_recomputes_on_param_change() {
        let mut session = Session::new(sample_catalog());
        session.analysis().unwrap();

        // Unchanged parameters keep the cache.
        session.set_params(PipelineParams::default());
        session.analysis().unwrap();
        assert_eq!(session.run_count(), 1);

        session.set_params(PipelineParams {
            fuzziness: [1.5, 1.3, 1.1],
        });
        session.analysis().unwrap();
        assert_eq!(session.run_count(), 2);
    }
}
