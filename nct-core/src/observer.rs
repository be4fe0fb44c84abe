//! Build progress reporting.
//!
//! The graph never logs through hidden global state. Callers hand an observer
//! to [`CorrelationGraph::build`](crate::CorrelationGraph::build) and own its
//! lifecycle; [`TracingObserver`] forwards everything to `tracing`.

use serde::Serialize;
use tracing::info;

use crate::exporter::json::SaveReport;

/// Summary of a finished build pass.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BuildStats {
    pub nct_index: usize,
    /// Features that own at least one edge.
    pub owner_count: usize,
    /// Largest ownership degree.
    pub max_degree: usize,
    /// Distinct undirected feature pairs.
    pub pair_count: usize,
    /// Features referenced by at least one neuron.
    pub referenced_features: usize,
    /// Neurons in the selected entry.
    pub neuron_count: usize,
}

/// Receives advisory progress events from the builder.
///
/// Events are informational only; an observer cannot influence the build.
pub trait BuildObserver: Send + Sync {
    /// Called once after the graph has been fully built.
    fn graph_built(&self, stats: &BuildStats);

    /// Called after a graph file has been written.
    fn graph_saved(&self, _report: &SaveReport) {}
}

/// Default observer: logs events at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl BuildObserver for TracingObserver {
    fn graph_built(&self, stats: &BuildStats) {
        info!(
            nct_index = stats.nct_index,
            pairs = stats.pair_count,
            "Graph built: {} owning features, max partners per feature: {}",
            stats.owner_count,
            stats.max_degree
        );
    }

    fn graph_saved(&self, report: &SaveReport) {
        info!(
            "Graph saved to {} ({:.1} KB)",
            report.path.display(),
            report.size_kb()
        );
    }
}

/// Observer that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl BuildObserver for SilentObserver {
    fn graph_built(&self, _stats: &BuildStats) {}
}
