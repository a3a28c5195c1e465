//! Single-row decision-path tracing and tree images.

use astrobit_forest::{DecisionPath, NodeIndex};
use astrobit_io::{coerce_and_impute, resolve, ColumnMapping, RawRecord, RawTable};
use astrobit_render::{to_data_uri, Highlight, RenderError, RenderOptions, TreeRenderer};
use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, instrument};

use crate::{ModelArtifacts, PipelineError};

/// Tree shown by the overview and decision-path images.
pub const DEFAULT_TREE: usize = 0;
/// Display depth of the overview images.
pub const OVERVIEW_DEPTH: usize = 4;

/// One row followed through one tree, with the class decoded.
#[derive(Debug, Clone, Serialize)]
pub struct RowTrace {
    /// Tree position in the ensemble.
    pub tree: usize,
    /// Visited node ids, root first.
    pub path: DecisionPath,
    /// Final node; always the last element of `path`.
    pub leaf: NodeIndex,
    /// Class name voted by the leaf.
    pub class: String,
}

/// A rendered tree and which tree it was.
#[derive(Debug, Clone)]
pub struct TreeImage {
    /// Tree position in the ensemble.
    pub tree: usize,
    /// The SVG document.
    pub svg: String,
}

impl TreeImage {
    /// Return the image as `data:image/svg+xml;base64,...`.
    #[must_use]
    pub fn data_uri(&self) -> String {
        to_data_uri(&self.svg)
    }
}

/// Prepare one flat row with the identity mapping and scale it.
fn scaled_row(artifacts: &ModelArtifacts, row: &Value) -> Result<Vec<f64>, PipelineError> {
    let Value::Object(fields) = row else {
        return Err(PipelineError::invalid_request("row must be a JSON object"));
    };
    let table = RawTable::new(vec![RawRecord::new(fields.clone())]);
    let schema = artifacts.schema();
    let mapped = resolve(&table, &ColumnMapping::identity(schema), schema);
    let (matrix, report) = coerce_and_impute(&mapped)?;
    debug!(imputed = report.total, "row prepared");
    let scaled = artifacts.scaler().transform(&matrix)?;
    Ok(scaled.into_rows().into_iter().next().unwrap_or_default())
}

/// Follow a single row through tree `tree`.
///
/// # Errors
///
/// | Variant | When |
/// |---|---|
/// | [`PipelineError::InvalidRequest`] | `row` is not an object |
/// | [`PipelineError::ConfigMismatch`] | `tree` is out of range or dimensions disagree |
#[instrument(skip(artifacts, row))]
pub fn trace_row(artifacts: &ModelArtifacts, row: &Value, tree: usize) -> Result<RowTrace, PipelineError> {
    let sample = scaled_row(artifacts, row)?;
    let trace = artifacts.forest().trace(tree, &sample)?;
    let class = artifacts.labels().decode(trace.class)?.to_string();
    debug!(path_len = trace.path.len(), leaf = %trace.leaf, "row traced");
    Ok(RowTrace {
        tree: trace.tree,
        path: trace.path,
        leaf: trace.leaf,
        class,
    })
}

/// Render tree `tree` with `row`'s decision path highlighted, full depth.
///
/// # Errors
///
/// As [`trace_row`], plus [`PipelineError::RenderingFailure`].
#[instrument(skip(artifacts, row))]
pub fn decision_path_image(
    artifacts: &ModelArtifacts,
    row: &Value,
    tree: usize,
) -> Result<TreeImage, PipelineError> {
    let trace = trace_row(artifacts, row, tree)?;
    trace_image(artifacts, &trace)
}

/// Render the tree of an existing trace with its path highlighted, full depth.
///
/// # Errors
///
/// [`PipelineError::RenderingFailure`] if the path does not fit the tree or drawing fails.
pub fn trace_image(artifacts: &ModelArtifacts, trace: &RowTrace) -> Result<TreeImage, PipelineError> {
    let highlight = Highlight::from(&trace.path);
    render(artifacts, trace.tree, RenderOptions::default(), Some(highlight))
}

/// Render tree `tree` without highlighting.
///
/// # Errors
///
/// [`PipelineError::ConfigMismatch`] for an unknown tree,
/// [`PipelineError::RenderingFailure`] if drawing fails.
#[instrument(skip(artifacts, options))]
pub fn tree_image(
    artifacts: &ModelArtifacts,
    tree: usize,
    options: RenderOptions,
) -> Result<TreeImage, PipelineError> {
    render(artifacts, tree, options, None)
}

/// Render a uniformly chosen tree to [`OVERVIEW_DEPTH`], titled with its 1-based number.
///
/// # Errors
///
/// [`PipelineError::RenderingFailure`] if drawing fails.
pub fn random_tree_image<R: Rng + ?Sized>(
    artifacts: &ModelArtifacts,
    rng: &mut R,
) -> Result<TreeImage, PipelineError> {
    let tree = rng.gen_range(0..artifacts.forest().n_trees());
    let options = RenderOptions::default()
        .with_max_depth(OVERVIEW_DEPTH)
        .with_title(format!("Random tree #{}", tree + 1));
    tree_image(artifacts, tree, options)
}

fn render(
    artifacts: &ModelArtifacts,
    tree: usize,
    options: RenderOptions,
    highlight: Option<Highlight>,
) -> Result<TreeImage, PipelineError> {
    let decision_tree = artifacts.forest().tree(tree)?;
    let mut renderer = TreeRenderer::new(
        decision_tree,
        artifacts.schema().names(),
        artifacts.labels().classes(),
    )
    .with_options(options);
    if let Some(h) = highlight {
        renderer = renderer.with_highlight(h);
    }
    let svg = renderer.render().map_err(|e: RenderError| {
        error!(tree, error = %e, "tree rendering failed");
        PipelineError::from(e)
    })?;
    Ok(TreeImage { tree, svg })
}
