//! NCT Core - Correlation graph construction for NCT adjacency data.
//!
//! This crate turns the neuron → feature-pair adjacency of one NCT entry into
//! a feature correlation graph: per-feature degree, bounded importance, an
//! ownership-resolved partner list and the neurons that reference each
//! feature. The result is written as a deterministic, sorted JSON document.
//!
//! # Pipeline
//!
//! ```text
//! meta.json -> MetaDescription -> CorrelationGraph -> graph.json
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use nct_core::{CorrelationGraph, TracingObserver};
//! use std::sync::Arc;
//!
//! let graph = CorrelationGraph::from_meta_path("model/meta.json", 0, Arc::new(TracingObserver))?;
//! graph.save_graph_to_json("model/graph.json")?;
//! # Ok::<(), nct_core::GraphError>(())
//! ```

pub mod error;
pub mod exporter;
pub mod graph;
pub mod observer;
pub mod types;

pub use error::{GraphError, Result};
pub use exporter::json::{SaveReport, SerializedGraph};
pub use graph::{CorrelationGraph, FeatureStats, PartnerScore};
pub use observer::{BuildObserver, BuildStats, SilentObserver, TracingObserver};
pub use types::{FeatureId, MetaDescription, NctEntry, NeuronIndex, PairKey, Synapse};

/// Get the version of nct-core.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
