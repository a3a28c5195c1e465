//! Batch classification: raw rows in, labelled rows out.

use astrobit_io::{coerce_and_impute, resolve, ColumnMapping, ImputationReport, RawRecord, RawTable};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::{ModelArtifacts, PipelineError};

/// Field added to every classified row.
pub const CLASSIFICATION_FIELD: &str = "classification";

/// A parsed `{data, mapping}` request body.
#[derive(Debug, Clone)]
pub struct ClassifyRequest {
    /// Rows to classify.
    pub table: RawTable,
    /// Canonical feature → caller column.
    pub mapping: ColumnMapping,
}

impl ClassifyRequest {
    /// Parse a request body.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidRequest`] when the body is not an
    /// object, `data` or `mapping` is absent, or either is malformed.
    pub fn from_json(body: &Value) -> Result<Self, PipelineError> {
        let Value::Object(fields) = body else {
            return Err(PipelineError::invalid_request("body must be a JSON object"));
        };
        let data = fields
            .get("data")
            .ok_or_else(|| PipelineError::invalid_request("missing `data`"))?;
        let mapping = fields
            .get("mapping")
            .ok_or_else(|| PipelineError::invalid_request("missing `mapping`"))?;
        Ok(Self {
            table: RawTable::from_json(data)?,
            mapping: ColumnMapping::from_json(mapping)?,
        })
    }
}

/// Classified rows in input order.
#[derive(Debug, Clone)]
pub struct Classified {
    /// Each input row with [`CLASSIFICATION_FIELD`] set.
    pub rows: Vec<RawRecord>,
    /// Cells replaced by the default fill.
    pub imputation: ImputationReport,
}

impl Classified {
    /// Return the rows as a JSON array.
    #[must_use]
    pub fn into_json(self) -> Value {
        Value::Array(
            self.rows
                .into_iter()
                .map(|r| Value::Object(r.into_fields()))
                .collect(),
        )
    }
}

/// Classify every row of a parsed request.
///
/// # Errors
///
/// [`PipelineError::ConfigMismatch`] if the artifacts disagree with the
/// prepared matrix; request validation has already happened.
#[instrument(skip_all, fields(n_rows = request.table.len()))]
pub fn classify(
    artifacts: &ModelArtifacts,
    request: ClassifyRequest,
) -> Result<Classified, PipelineError> {
    let ClassifyRequest { table, mapping } = request;
    if table.is_empty() {
        debug!("empty request, nothing to classify");
        return Ok(Classified {
            rows: Vec::new(),
            imputation: ImputationReport::default(),
        });
    }

    let mapped = resolve(&table, &mapping, artifacts.schema());
    let (matrix, imputation) = coerce_and_impute(&mapped)?;
    let scaled = artifacts.scaler().transform(&matrix)?;
    let predictions = artifacts
        .forest()
        .predict_batch(scaled.rows(), artifacts.voting())?;

    let labels = artifacts.labels();
    let mut rows = table.into_rows();
    for (row, class) in rows.iter_mut().zip(&predictions) {
        let label = labels.decode(*class)?;
        row.insert(CLASSIFICATION_FIELD, Value::String(label.to_string()));
    }

    info!(
        n_rows = rows.len(),
        imputed = imputation.total,
        voting = %artifacts.voting(),
        "rows classified"
    );
    Ok(Classified { rows, imputation })
}

/// Parse and classify a `{data, mapping}` body in one step.
///
/// # Errors
///
/// See [`ClassifyRequest::from_json`] and [`classify`].
pub fn classify_json(artifacts: &ModelArtifacts, body: &Value) -> Result<Value, PipelineError> {
    let request = ClassifyRequest::from_json(body)?;
    Ok(classify(artifacts, request)?.into_json())
}
