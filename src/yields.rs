//! Yield (value-per-price) ranking over the labeled catalog.
//!
//! Yield is GB of delivered value per currency unit. Uncapped offers count
//! their fair-usage threshold as delivered value; app bundles report the main
//! and app components separately because users value them differently.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::cluster::LabeledRecord;
use crate::error::Result;
use crate::segment::SegmentKind;
use crate::vocab::Vocabulary;

/// Which side of the catalog a yield query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferKind {
    /// Offers bundling dedicated app quota.
    AppInclusive,
    /// Capped and uncapped offers without an app bundle.
    NonApp,
}

impl OfferKind {
    fn matches(self, segment: SegmentKind) -> bool {
        match self {
            OfferKind::AppInclusive => segment == SegmentKind::AppBundle,
            OfferKind::NonApp => segment != SegmentKind::AppBundle,
        }
    }

    /// Name used in table titles.
    pub fn name(self) -> &'static str {
        match self {
            OfferKind::AppInclusive => "app-inclusive",
            OfferKind::NonApp => "non-app",
        }
    }
}

/// One ranked row of a yield table.
#[derive(Debug, Clone, PartialEq)]
pub struct YieldRow {
    /// Grouping key: operator name, or cluster label name.
    pub key: String,
    /// Mean main-quota GB per currency unit (FUP GB for uncapped offers).
    pub main_yield: f64,
    /// Mean app-quota GB per currency unit; `None` for non-app queries.
    pub app_yield: Option<f64>,
    /// Records aggregated into this row.
    pub n_offers: usize,
}

impl YieldRow {
    /// Scalar used for ranking only: main and app components summed. The
    /// reported components stay separate.
    pub fn rank_value(&self) -> f64 {
        self.main_yield + self.app_yield.unwrap_or(0.0)
    }
}

/// Why a record was left out of a yield aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionReason {
    /// Price was zero or negative; the ratio is undefined.
    NonPositivePrice,
    /// Quota or price produced a non-finite ratio.
    NonFiniteValue,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::NonPositivePrice => f.write_str("non-positive price"),
            ExclusionReason::NonFiniteValue => f.write_str("non-finite value"),
        }
    }
}

/// A record excluded from ranking, with the reason recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludedOffer {
    /// Operator of the excluded record.
    pub operator: String,
    /// Why it was excluded.
    pub reason: ExclusionReason,
}

/// Ranked yield rows plus the records that could not be ranked.
#[derive(Debug, Clone, Default)]
pub struct YieldTable {
    /// Rows sorted descending by yield, ties ascending by key.
    pub rows: Vec<YieldRow>,
    /// Records excluded from aggregation.
    pub excluded: Vec<ExcludedOffer>,
}

#[derive(Default)]
struct Accumulator {
    main_sum: f64,
    app_sum: f64,
    count: usize,
}

/// Delivered value in GB for one record: main quota, or the FUP threshold for
/// uncapped offers.
fn value_gb(labeled: &LabeledRecord) -> f64 {
    match labeled.segment {
        SegmentKind::Uncapped => labeled.record.fup_gb,
        _ => labeled.record.main_quota_gb,
    }
}

fn aggregate<'a, I, F>(records: I, key_fn: F, kind: OfferKind) -> YieldTable
where
    I: Iterator<Item = &'a LabeledRecord>,
    F: Fn(&LabeledRecord) -> String,
{
    let mut groups: BTreeMap<String, Accumulator> = BTreeMap::new();
    let mut excluded = Vec::new();

    for labeled in records {
        let price = labeled.record.price;
        if price <= 0.0 {
            excluded.push(ExcludedOffer {
                operator: labeled.record.operator.clone(),
                reason: ExclusionReason::NonPositivePrice,
            });
            continue;
        }

        let main_yield = value_gb(labeled) / price;
        let app_yield = labeled.record.app_quota_gb / price;
        if !main_yield.is_finite() || !app_yield.is_finite() {
            excluded.push(ExcludedOffer {
                operator: labeled.record.operator.clone(),
                reason: ExclusionReason::NonFiniteValue,
            });
            continue;
        }

        let entry = groups.entry(key_fn(labeled)).or_default();
        entry.main_sum += main_yield;
        entry.app_sum += app_yield;
        entry.count += 1;
    }

    let mut rows: Vec<YieldRow> = groups
        .into_iter()
        .map(|(key, acc)| {
            let n = acc.count.max(1) as f64;
            YieldRow {
                key,
                main_yield: acc.main_sum / n,
                app_yield: match kind {
                    OfferKind::AppInclusive => Some(acc.app_sum / n),
                    OfferKind::NonApp => None,
                },
                n_offers: acc.count,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.rank_value()
            .partial_cmp(&a.rank_value())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.key.cmp(&b.key))
    });

    YieldTable { rows, excluded }
}

/// Mean yield per operator over offers of the given kind, best value first.
pub fn operator_yield(catalog: &[LabeledRecord], kind: OfferKind) -> Result<YieldTable> {
    Ok(aggregate(
        catalog.iter().filter(|l| kind.matches(l.segment)),
        |l| l.record.operator.clone(),
        kind,
    ))
}

/// Per-operator yield restricted to one cluster, selected by code or name.
pub fn cluster_yield(
    catalog: &[LabeledRecord],
    cluster: &str,
    kind: OfferKind,
    vocabulary: &Vocabulary,
) -> Result<YieldTable> {
    let label = vocabulary.resolve(cluster)?;
    Ok(aggregate(
        catalog
            .iter()
            .filter(|l| l.cluster == label.code && kind.matches(l.segment)),
        |l| l.record.operator.clone(),
        kind,
    ))
}

/// Mean yield per cluster over the whole labeled catalog.
pub fn all_cluster_yield(
    catalog: &[LabeledRecord],
    kind: OfferKind,
    vocabulary: &Vocabulary,
) -> Result<YieldTable> {
    Ok(aggregate(
        catalog.iter().filter(|l| kind.matches(l.segment)),
        |l| {
            vocabulary
                .by_code(l.cluster)
                .map(|label| label.name.to_string())
                .unwrap_or_else(|_| format!("cluster {}", l.cluster))
        },
        kind,
    ))
}
