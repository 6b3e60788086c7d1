//! The fixed global cluster-label vocabulary.
//!
//! Eight market clusters exist across the three segments. The table is an
//! explicit immutable value handed into the engines, not ambient state, so a
//! caller can swap label wording without touching the pipeline.

use crate::error::{Error, Result};
use crate::segment::SegmentKind;

/// One entry in the global cluster vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterLabel {
    /// Global integer code, 1 through 8.
    pub code: u8,
    /// Human-readable market-position name.
    pub name: &'static str,
    /// Segment the cluster belongs to.
    pub segment: SegmentKind,
}

/// Immutable mapping between global codes, label names, and segments.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    entries: Vec<ClusterLabel>,
}

impl Vocabulary {
    /// The standard eight-cluster market vocabulary.
    pub fn standard() -> Self {
        Self {
            entries: vec![
                ClusterLabel { code: 1, name: "High Main", segment: SegmentKind::Capped },
                ClusterLabel { code: 2, name: "Medium Main", segment: SegmentKind::Capped },
                ClusterLabel { code: 3, name: "Low Main", segment: SegmentKind::Capped },
                ClusterLabel { code: 4, name: "Low Unlimited", segment: SegmentKind::Uncapped },
                ClusterLabel { code: 5, name: "High Unlimited", segment: SegmentKind::Uncapped },
                ClusterLabel {
                    code: 6,
                    name: "80:20 High Main and App",
                    segment: SegmentKind::AppBundle,
                },
                ClusterLabel {
                    code: 7,
                    name: "50:50 Low Main and App",
                    segment: SegmentKind::AppBundle,
                },
                ClusterLabel {
                    code: 8,
                    name: "20:80 Medium Main and App",
                    segment: SegmentKind::AppBundle,
                },
            ],
        }
    }

    /// All entries in code order.
    pub fn entries(&self) -> &[ClusterLabel] {
        &self.entries
    }

    /// Number of clusters in the vocabulary.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for a global code.
    pub fn by_code(&self, code: u8) -> Result<&ClusterLabel> {
        self.entries
            .iter()
            .find(|label| label.code == code)
            .ok_or_else(|| Error::UnknownCluster(code.to_string()))
    }

    /// Resolve a selector that is either a numeric code or a label name.
    pub fn resolve(&self, selector: &str) -> Result<&ClusterLabel> {
        let trimmed = selector.trim();
        if let Ok(code) = trimmed.parse::<u8>() {
            return self.by_code(code);
        }
        self.entries
            .iter()
            .find(|label| label.name.eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| Error::UnknownCluster(selector.to_string()))
    }

    /// Entries owned by one segment, in code order.
    pub fn labels_for(&self, segment: SegmentKind) -> Vec<&ClusterLabel> {
        self.entries
            .iter()
            .filter(|label| label.segment == segment)
            .collect()
    }

    /// Static lookup from a segment's local cluster index to the global code.
    pub fn global_code(&self, segment: SegmentKind, local_index: usize) -> Result<u8> {
        self.labels_for(segment)
            .get(local_index)
            .map(|label| label.code)
            .ok_or_else(|| {
                Error::UnknownCluster(format!("{} local index {}", segment.name(), local_index))
            })
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::standard()
    }
}
