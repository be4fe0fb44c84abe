//! JSON graph exporter.
//!
//! Produces the `graph.json` document:
//!
//! ```json
//! {
//!   "nct_index": 0,
//!   "features": {
//!     "1": {
//!       "degree": 1,
//!       "importance": 1.0,
//!       "neurons": [0, 1],
//!       "neurons_count": 2,
//!       "partners": { "2": 0.0 }
//!     }
//!   }
//! }
//! ```
//!
//! Features are ordered by importance descending, partners by partner
//! importance descending, equal scores by ascending id. Key order is written
//! explicitly so the output is byte-for-byte reproducible.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

use super::round_importance;
use crate::error::{GraphError, Result};
use crate::graph::CorrelationGraph;
use crate::types::{FeatureId, NeuronIndex};

/// Outcome of [`CorrelationGraph::save_graph_to_json`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SaveReport {
    pub path: PathBuf,
    pub bytes: u64,
}

impl SaveReport {
    pub fn size_kb(&self) -> f64 {
        self.bytes as f64 / 1024.0
    }
}

/// One feature as written to `graph.json`. Importances are already rounded.
#[derive(Clone, Debug, PartialEq)]
pub struct SerializedFeature {
    pub feature_id: FeatureId,
    pub degree: usize,
    pub importance: f64,
    pub neurons: Vec<NeuronIndex>,
    /// (partner id, partner importance), in output order
    pub partners: Vec<(FeatureId, f64)>,
}

/// Export-ready view of a graph, in output order.
#[derive(Clone, Debug, PartialEq)]
pub struct SerializedGraph {
    pub nct_index: usize,
    pub features: Vec<SerializedFeature>,
}

impl SerializedGraph {
    /// Snapshot `graph` in export order.
    pub fn from_graph(graph: &CorrelationGraph) -> Self {
        let mut feature_ids = graph.feature_ids();
        graph.sort_by_importance(&mut feature_ids);

        let features = feature_ids
            .into_iter()
            .map(|feature_id| {
                let mut partner_ids = graph.partners(feature_id, None);
                graph.sort_by_importance(&mut partner_ids);

                SerializedFeature {
                    feature_id,
                    degree: partner_ids.len(),
                    importance: round_importance(graph.feature_importance(feature_id)),
                    neurons: graph.neurons_for(feature_id),
                    partners: partner_ids
                        .into_iter()
                        .map(|id| (id, round_importance(graph.feature_importance(id))))
                        .collect(),
                }
            })
            .collect();

        Self {
            nct_index: graph.nct_index(),
            features,
        }
    }

    /// Pretty-printed JSON with two-space indentation.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn feature(&self, feature_id: FeatureId) -> Option<&SerializedFeature> {
        self.features.iter().find(|f| f.feature_id == feature_id)
    }
}

impl Serialize for SerializedGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SerializedGraph", 2)?;
        state.serialize_field("nct_index", &self.nct_index)?;
        state.serialize_field("features", &FeatureTable(&self.features))?;
        state.end()
    }
}

/// Ordered `"<feature_id>": {...}` map.
struct FeatureTable<'a>(&'a [SerializedFeature]);

impl Serialize for FeatureTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for feature in self.0 {
            map.serialize_entry(&feature.feature_id.to_string(), feature)?;
        }
        map.end()
    }
}

impl Serialize for SerializedFeature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SerializedFeature", 5)?;
        state.serialize_field("degree", &self.degree)?;
        state.serialize_field("importance", &self.importance)?;
        state.serialize_field("neurons", &self.neurons)?;
        state.serialize_field("neurons_count", &self.neurons.len())?;
        state.serialize_field("partners", &PartnerTable(&self.partners))?;
        state.end()
    }
}

/// Ordered `"<partner_id>": importance` map.
struct PartnerTable<'a>(&'a [(FeatureId, f64)]);

impl Serialize for PartnerTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (partner_id, importance) in self.0 {
            map.serialize_entry(&partner_id.to_string(), importance)?;
        }
        map.end()
    }
}

impl CorrelationGraph {
    /// Export-ready snapshot of this graph.
    pub fn to_serialized(&self) -> SerializedGraph {
        SerializedGraph::from_graph(self)
    }

    /// The exact bytes [`save_graph_to_json`](Self::save_graph_to_json) writes.
    pub fn to_json_string(&self) -> Result<String> {
        self.to_serialized().to_json_string()
    }

    /// Write the graph to `output_path`, creating parent directories.
    ///
    /// An existing file is replaced atomically: on failure it is left
    /// untouched. Calling this twice on the same graph produces identical files.
    pub fn save_graph_to_json(&self, output_path: impl AsRef<Path>) -> Result<SaveReport> {
        let path = output_path.as_ref();
        let content = self.to_json_string()?;

        let write_failure = |source: std::io::Error| GraphError::WriteFailure {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_failure)?;
        }

        // Write a sibling temp file and rename it over the target, so a failed
        // write leaves any previous graph intact.
        let temp_path = temp_sibling(path);
        let written = (|| -> std::io::Result<()> {
            {
                let mut writer = BufWriter::new(File::create(&temp_path)?);
                writer.write_all(content.as_bytes())?;
                writer.flush()?;
            }
            fs::rename(&temp_path, path)
        })();
        if let Err(source) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(write_failure(source));
        }

        let report = SaveReport {
            path: path.to_path_buf(),
            bytes: content.len() as u64,
        };
        self.observer().graph_saved(&report);
        Ok(report)
    }
}

/// `model/graph.json` -> `model/.graph.json.tmp`
fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "graph".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}
