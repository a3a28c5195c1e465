use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use astrobit_forest::{RandomForest, VotingPolicy};
use astrobit_io::{ColumnMapping, RecordReader};
use astrobit_pipeline::{
    classify, trace_image, trace_row, tree_image, ArtifactPaths, ClassifyRequest, ModelArtifacts,
    ModelSummary, RowTrace,
};
use astrobit_render::RenderOptions;

mod handlers;
mod server;

#[derive(Parser)]
#[command(name = "astrobit")]
#[command(about = "Exoplanet transit classification with inspectable decision paths")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for batch inference (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Locations of the model artifacts.
#[derive(Args, Debug, Clone)]
struct ArtifactArgs {
    /// Ensemble file: `.json` exported tree arrays or `.bin` envelope
    #[arg(long)]
    model: PathBuf,

    /// Scaler parameters JSON
    #[arg(long)]
    scaler: PathBuf,

    /// Label encoder JSON
    #[arg(long)]
    labels: PathBuf,

    /// Evaluation metrics JSON served at /model_metrics
    #[arg(long)]
    metrics: Option<PathBuf>,

    /// How tree votes are combined: "majority" or "soft". Pass "soft" to match
    /// the probability averaging of the library that exported the model
    #[arg(long, default_value = "majority")]
    voting: String,
}

impl ArtifactArgs {
    fn load(&self) -> Result<ModelArtifacts> {
        let voting: VotingPolicy = self.voting.parse().map_err(anyhow::Error::msg)?;
        let paths = ArtifactPaths {
            model: self.model.clone(),
            scaler: self.scaler.clone(),
            labels: self.labels.clone(),
            metrics: self.metrics.clone(),
        };
        let artifacts = ModelArtifacts::load(&paths).context("failed to load model artifacts")?;
        Ok(artifacts.with_voting(voting))
    }
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API
    Serve {
        #[command(flatten)]
        artifacts: ArtifactArgs,

        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:5000")]
        addr: SocketAddr,
    },

    /// Classify every row of a CSV file
    Classify {
        #[command(flatten)]
        artifacts: ArtifactArgs,

        /// Input CSV with a header row
        #[arg(long)]
        input: PathBuf,

        /// JSON object mapping model features to CSV columns (identity if omitted)
        #[arg(long)]
        mapping: Option<PathBuf>,
    },

    /// Print the decision path of one row through one tree
    Trace {
        #[command(flatten)]
        artifacts: ArtifactArgs,

        /// The row as a JSON object keyed by model feature name
        #[arg(long)]
        row: String,

        /// Tree index in the ensemble
        #[arg(long, default_value_t = 0)]
        tree: usize,
    },

    /// Render a tree to an SVG file
    Render {
        #[command(flatten)]
        artifacts: ArtifactArgs,

        /// Tree index in the ensemble
        #[arg(long, default_value_t = 0)]
        tree: usize,

        /// Collapse nodes deeper than this (ignored with --row)
        #[arg(long)]
        max_depth: Option<usize>,

        /// Highlight this row's decision path (JSON object)
        #[arg(long)]
        row: Option<String>,

        /// Heading drawn above the tree
        #[arg(long)]
        title: Option<String>,

        /// Output SVG path
        #[arg(long)]
        output: PathBuf,
    },

    /// Convert an exported JSON ensemble into the binary envelope
    Convert {
        /// Exported forest JSON
        #[arg(long)]
        input: PathBuf,

        /// Output `.bin` path
        #[arg(long)]
        output: PathBuf,
    },

    /// Print a summary of the loaded model
    Inspect {
        #[command(flatten)]
        artifacts: ArtifactArgs,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct ClassifyOutput {
    n_rows: usize,
    imputed_cells: usize,
    imputed_per_feature: Vec<(String, usize)>,
    rows: Vec<Value>,
}

#[derive(Serialize)]
struct RenderOutput {
    tree: usize,
    output: String,
    highlighted: Option<RowTrace>,
    n_bytes: usize,
}

#[derive(Serialize)]
struct ConvertOutput {
    input: String,
    output: String,
    n_trees: usize,
    n_features: usize,
    n_classes: usize,
}

fn parse_row(row: &str) -> Result<Value> {
    serde_json::from_str(row).context("--row is not valid JSON")
}

fn read_mapping(path: Option<&Path>, artifacts: &ModelArtifacts) -> Result<ColumnMapping> {
    let Some(path) = path else {
        return Ok(ColumnMapping::identity(artifacts.schema()));
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read mapping {}", path.display()))?;
    let value: Value = serde_json::from_str(&text).context("mapping file is not valid JSON")?;
    ColumnMapping::from_json(&value).context("invalid mapping")
}

fn run_classify(
    artifacts: &ModelArtifacts,
    input: &Path,
    mapping: Option<&Path>,
) -> Result<ClassifyOutput> {
    let table = RecordReader::new(input)
        .read()
        .context("failed to read input CSV")?;
    info!(n_rows = table.len(), "records loaded");
    let mapping = read_mapping(mapping, artifacts)?;
    let classified = classify(artifacts, ClassifyRequest { table, mapping })
        .context("classification failed")?;

    let imputed_per_feature = artifacts
        .schema()
        .names()
        .iter()
        .cloned()
        .zip(classified.imputation.per_feature.iter().copied())
        .collect();
    let imputed_cells = classified.imputation.total;
    let rows: Vec<Value> = match classified.into_json() {
        Value::Array(rows) => rows,
        other => vec![other],
    };
    Ok(ClassifyOutput {
        n_rows: rows.len(),
        imputed_cells,
        imputed_per_feature,
        rows,
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Serve { artifacts, addr } => {
            let artifacts = artifacts.load()?;
            let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
            runtime.block_on(server::serve(addr, server::AppState::new(artifacts)))?;
        }

        Command::Classify {
            artifacts,
            input,
            mapping,
        } => {
            let artifacts = artifacts.load()?;
            let output = run_classify(&artifacts, &input, mapping.as_deref())?;
            info!(
                n_rows = output.n_rows,
                imputed = output.imputed_cells,
                "classification complete"
            );
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Trace { artifacts, row, tree } => {
            let artifacts = artifacts.load()?;
            let row = parse_row(&row)?;
            let trace = trace_row(&artifacts, &row, tree).context("tracing failed")?;
            println!("{}", serde_json::to_string_pretty(&trace)?);
        }

        Command::Render {
            artifacts,
            tree,
            max_depth,
            row,
            title,
            output,
        } => {
            let artifacts = artifacts.load()?;
            let (image, highlighted) = match row {
                Some(row) => {
                    let row = parse_row(&row)?;
                    let trace = trace_row(&artifacts, &row, tree).context("tracing failed")?;
                    let image = trace_image(&artifacts, &trace).context("rendering failed")?;
                    (image, Some(trace))
                }
                None => {
                    let options = RenderOptions { max_depth, title };
                    let image = tree_image(&artifacts, tree, options).context("rendering failed")?;
                    (image, None)
                }
            };
            std::fs::write(&output, &image.svg)
                .with_context(|| format!("failed to write {}", output.display()))?;
            info!(path = %output.display(), tree, "tree rendered");

            let out = RenderOutput {
                tree,
                output: output.display().to_string(),
                highlighted,
                n_bytes: image.svg.len(),
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }

        Command::Convert { input, output } => {
            let forest = RandomForest::load_json(&input).context("failed to load exported forest")?;
            forest.save(&output).context("failed to save model")?;
            info!(path = %output.display(), "model saved");

            let out = ConvertOutput {
                input: input.display().to_string(),
                output: output.display().to_string(),
                n_trees: forest.n_trees(),
                n_features: forest.n_features(),
                n_classes: forest.n_classes(),
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }

        Command::Inspect { artifacts } => {
            let artifacts = artifacts.load()?;
            let summary: ModelSummary = artifacts.summary();
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use clap::CommandFactory;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn voting_flag_parses() {
        let cli = Cli::try_parse_from([
            "astrobit", "inspect", "--model", "m.json", "--scaler", "s.json", "--labels",
            "l.json", "--voting", "soft",
        ])
        .unwrap();
        let Command::Inspect { artifacts } = cli.command else {
            panic!("expected inspect");
        };
        assert_eq!(artifacts.voting.parse::<VotingPolicy>().unwrap(), VotingPolicy::SoftProbability);
    }

    #[test]
    fn voting_help_points_to_soft_for_parity() {
        let cmd = Cli::command();
        let inspect = cmd.find_subcommand("inspect").unwrap();
        let voting = inspect
            .get_arguments()
            .find(|a| a.get_id() == "voting")
            .unwrap();
        let help = voting.get_help().unwrap().to_string();
        assert!(help.contains("\"soft\" to match"));
    }

    #[test]
    fn classify_csv_with_mapping_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("koi.csv");
        fs::write(&input, "kepid,P\n1,3.5\n2,abc\n").unwrap();
        let mapping = dir.path().join("mapping.json");
        fs::write(&mapping, r#"{"orbital_period": "P"}"#).unwrap();

        let state = server::tests::test_state();
        let out = run_classify(&state.artifacts, &input, Some(&mapping)).unwrap();
        assert_eq!(out.n_rows, 2);
        assert_eq!(out.rows[0]["classification"], "CONFIRMED");
        assert_eq!(out.rows[1]["classification"], "CANDIDATE");
        // row 0 imputes six features, row 1 all seven
        assert_eq!(out.imputed_cells, 13);
        assert_eq!(out.imputed_per_feature[0], ("orbital_period".to_string(), 1));
    }

    #[test]
    fn identity_mapping_when_omitted() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("rows.csv");
        fs::write(&input, "orbital_period,stellar_temp\n9,5700\n").unwrap();
        let state = server::tests::test_state();
        let out = run_classify(&state.artifacts, &input, None).unwrap();
        assert_eq!(out.rows[0]["classification"], "CONFIRMED");
        assert_eq!(out.imputed_cells, 5);
    }
}
