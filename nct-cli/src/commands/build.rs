//! Build command - construct and save correlation graphs
//!
//! - `nct-graph build` builds one NCT entry into the output path
//! - `nct-graph build --all` builds every entry in parallel, one file each

use crate::output::{Output, OutputConfig, TableDisplay, TableOutput};
use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use nct_core::{BuildObserver, CorrelationGraph, MetaDescription, TracingObserver};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Resolved arguments for `nct-graph build`.
#[derive(Debug, Clone)]
pub struct BuildArgs {
    pub meta_path: PathBuf,
    pub output_path: PathBuf,
    pub nct_index: usize,
    pub all: bool,
}

/// One saved graph.
#[derive(Debug, Serialize)]
pub struct GraphSummary {
    pub nct_index: usize,
    pub graph_path: PathBuf,
    pub owner_count: usize,
    pub max_degree: usize,
    pub pair_count: usize,
    pub feature_count: usize,
    pub bytes: u64,
}

/// Result of a build invocation.
#[derive(Debug, Serialize)]
pub struct BuildResult {
    pub meta_path: PathBuf,
    pub graphs: Vec<GraphSummary>,
    pub duration_ms: u128,
}

impl TableDisplay for BuildResult {
    fn to_table(&self, config: &OutputConfig) -> String {
        let mut output = String::new();

        let title = format!("Built {} graph(s) from {}", self.graphs.len(), self.meta_path.display());
        if config.use_colors() {
            output.push_str(&format!("{}\n", title.green().bold()));
        } else {
            output.push_str(&format!("{}\n", title));
        }

        let rows: Vec<Vec<String>> = self
            .graphs
            .iter()
            .map(|g| {
                vec![
                    g.nct_index.to_string(),
                    g.owner_count.to_string(),
                    g.max_degree.to_string(),
                    g.pair_count.to_string(),
                    g.feature_count.to_string(),
                    format!("{:.1} KB", g.bytes as f64 / 1024.0),
                    g.graph_path.display().to_string(),
                ]
            })
            .collect();

        output.push_str(&TableOutput::from_rows(
            &["NCT", "Owners", "Max degree", "Pairs", "Features", "Size", "Output"],
            &rows,
            config,
        ));
        output.push_str(&format!("\nCompleted in {} ms", self.duration_ms));
        output
    }
}

/// Run the build command.
pub fn run(args: BuildArgs, output: OutputConfig) -> Result<()> {
    let start = Instant::now();
    let observer: Arc<dyn BuildObserver> = Arc::new(TracingObserver);

    info!("Loading meta description from {}", args.meta_path.display());
    let meta = MetaDescription::load(&args.meta_path)
        .with_context(|| format!("Failed to load {}", args.meta_path.display()))?;
    debug!(
        entries = meta.ncts.len(),
        neurons_count = meta.neurons_count,
        feature_count = meta.feature_count,
        "Meta description loaded"
    );

    let graphs = if args.all {
        build_all(&meta, &args.output_path, observer)?
    } else {
        vec![build_one(&meta, args.nct_index, &args.output_path, observer)?]
    };

    let result = BuildResult {
        meta_path: args.meta_path,
        graphs,
        duration_ms: start.elapsed().as_millis(),
    };
    Output::new(result, output).render()
}

fn build_one(
    meta: &MetaDescription,
    nct_index: usize,
    output_path: &Path,
    observer: Arc<dyn BuildObserver>,
) -> Result<GraphSummary> {
    let graph = CorrelationGraph::build(meta, nct_index, observer)
        .with_context(|| format!("Failed to build graph for NCT {}", nct_index))?;
    let report = graph
        .save_graph_to_json(output_path)
        .with_context(|| format!("Failed to save graph for NCT {}", nct_index))?;

    let stats = graph.stats();
    Ok(GraphSummary {
        nct_index,
        graph_path: report.path,
        owner_count: stats.owner_count,
        max_degree: stats.max_degree,
        pair_count: stats.pair_count,
        feature_count: graph.feature_ids().len(),
        bytes: report.bytes,
    })
}

/// Build every entry on the rayon pool. Any failure aborts the whole run.
fn build_all(
    meta: &MetaDescription,
    output_path: &Path,
    observer: Arc<dyn BuildObserver>,
) -> Result<Vec<GraphSummary>> {
    let count = meta.ncts.len();
    if count == 0 {
        anyhow::bail!("Meta description contains no NCT entries");
    }

    let progress = ProgressBar::new(count as u64);
    if let Ok(style) = ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} NCT graphs") {
        progress.set_style(style.progress_chars("=> "));
    }

    let graphs = (0..count)
        .into_par_iter()
        .map(|nct_index| {
            let path = indexed_output_path(output_path, nct_index);
            let summary = build_one(meta, nct_index, &path, observer.clone());
            progress.inc(1);
            summary
        })
        .collect::<Result<Vec<_>>>();

    progress.finish_and_clear();
    graphs
}

/// `model/graph.json` + 3 -> `model/graph_3.json`
pub fn indexed_output_path(base: &Path, nct_index: usize) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "graph".to_string());
    let file_name = match base.extension() {
        Some(ext) => format!("{}_{}.{}", stem, nct_index, ext.to_string_lossy()),
        None => format!("{}_{}", stem, nct_index),
    };
    base.with_file_name(file_name)
}
