//! Data models for the NCT meta description.
//!
//! These types mirror the `meta.json` document produced by the NCT framework:
//! an array of NCT entries, each carrying a per-neuron list of feature pairs.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{GraphError, Result};

/// Integer identifier of a feature (a node in the correlation graph).
pub type FeatureId = i64;

/// Position of a neuron inside an entry's `synapses` array.
pub type NeuronIndex = usize;

/// A single `[feature_i, feature_t]` co-activation link attached to one neuron.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synapse(pub FeatureId, pub FeatureId);

impl Synapse {
    pub fn new(feature_i: FeatureId, feature_t: FeatureId) -> Self {
        Self(feature_i, feature_t)
    }

    /// True when both ends name the same feature.
    pub fn is_self_pair(&self) -> bool {
        self.0 == self.1
    }
}

/// One NCT network: `synapses[neuron]` lists the feature pairs wired through that neuron.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NctEntry {
    #[serde(default)]
    pub synapses: Vec<Vec<Synapse>>,
}

impl NctEntry {
    pub fn new(synapses: Vec<Vec<Synapse>>) -> Self {
        Self { synapses }
    }

    /// Total number of synapse entries across all neurons.
    pub fn synapse_count(&self) -> usize {
        self.synapses.iter().map(Vec::len).sum()
    }
}

/// Parsed `meta.json`.
///
/// `neurons_count` and `feature_count` are declared cardinalities. They are
/// carried for reporting only and never used as bounds.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MetaDescription {
    pub ncts: Vec<NctEntry>,
    pub neurons_count: usize,
    pub feature_count: usize,
}

impl MetaDescription {
    /// Load and parse a meta description from disk.
    ///
    /// # Errors
    ///
    /// - `InputNotFound` if `path` does not exist
    /// - `InputUnreadable` if it exists but cannot be read
    /// - `InvalidMeta` if the content is not a valid meta document
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GraphError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                GraphError::InputNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                GraphError::InputUnreadable {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        Self::from_json_str(&content).map_err(|source| GraphError::InvalidMeta {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a meta description from a JSON string.
    pub fn from_json_str(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// Select one NCT entry.
    pub fn entry(&self, nct_index: usize) -> Result<&NctEntry> {
        self.ncts
            .get(nct_index)
            .ok_or(GraphError::IndexOutOfRange {
                index: nct_index,
                len: self.ncts.len(),
            })
    }
}

/// A deduplication key for an undirected feature pair.
///
/// Only constructed through [`PairKey::normalize`], so `(a, b)` and `(b, a)`
/// map to the same value and plain structural equality is enough.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey {
    low: FeatureId,
    high: FeatureId,
}

impl PairKey {
    /// Order the pair so the numerically smaller id comes first.
    pub fn normalize(a: FeatureId, b: FeatureId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn low(&self) -> FeatureId {
        self.low
    }

    pub fn high(&self) -> FeatureId {
        self.high
    }

    pub fn is_self_pair(&self) -> bool {
        self.low == self.high
    }
}

impl From<Synapse> for PairKey {
    fn from(synapse: Synapse) -> Self {
        PairKey::normalize(synapse.0, synapse.1)
    }
}
