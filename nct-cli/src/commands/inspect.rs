//! Inspect command - show the graph statistics of one feature

use crate::output::{format_importance, Output, OutputConfig, TableDisplay, TableOutput};
use anyhow::{Context, Result};
use colored::Colorize;
use nct_core::{CorrelationGraph, FeatureId, FeatureStats, TracingObserver};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Resolved arguments for `nct-graph inspect`.
#[derive(Debug, Clone)]
pub struct InspectArgs {
    pub feature: FeatureId,
    pub meta_path: PathBuf,
    pub nct_index: usize,
    pub top: usize,
}

#[derive(Debug, Serialize)]
pub struct InspectResult {
    pub nct_index: usize,
    /// False when no neuron references the feature.
    pub in_graph: bool,
    #[serde(flatten)]
    pub stats: FeatureStats,
    /// Every owned partner, in construction order.
    pub partners: Vec<FeatureId>,
}

impl TableDisplay for InspectResult {
    fn to_table(&self, config: &OutputConfig) -> String {
        let mut output = String::new();

        let title = format!("Feature {} (NCT {})", self.stats.feature_id, self.nct_index);
        if config.use_colors() {
            output.push_str(&format!("{}\n", title.cyan().bold()));
        } else {
            output.push_str(&format!("{}\n", title));
        }

        if !self.in_graph {
            output.push_str("  Not referenced by any neuron.\n");
        }

        let pairs = [
            ("Importance", format_importance(self.stats.importance)),
            ("Occurrences", self.stats.occurrences.to_string()),
            ("Neurons", self.stats.neurons_involved.to_string()),
            ("Partners", self.stats.partners_count.to_string()),
        ];
        output.push_str(&TableOutput::format_key_value(&pairs, config));
        output.push('\n');

        let rows: Vec<Vec<String>> = self
            .stats
            .top_partners
            .iter()
            .map(|p| vec![p.feature_id.to_string(), format_importance(p.importance)])
            .collect();
        output.push_str(&TableOutput::from_rows(&["Top partner", "Importance"], &rows, config));
        output
    }
}

/// Run the inspect command.
pub fn run(args: InspectArgs, output: OutputConfig) -> Result<()> {
    let graph = CorrelationGraph::from_meta_path(&args.meta_path, args.nct_index, Arc::new(TracingObserver))
        .with_context(|| {
            format!(
                "Failed to build graph for NCT {} from {}",
                args.nct_index,
                args.meta_path.display()
            )
        })?;

    let result = inspect(&graph, args.feature, args.top);
    if !result.in_graph {
        warn!("Feature {} does not appear in NCT {}", args.feature, args.nct_index);
    }
    Output::new(result, output).render()
}

fn inspect(graph: &CorrelationGraph, feature: FeatureId, top: usize) -> InspectResult {
    let mut stats = graph.feature_stats(feature);
    stats.top_partners = graph.top_partners(feature, top);

    InspectResult {
        nct_index: graph.nct_index(),
        in_graph: graph.contains(feature),
        stats,
        partners: graph.partners(feature, None),
    }
}
