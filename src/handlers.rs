//! HTTP handlers. Pipeline calls run on the blocking pool so one heavy
//! request cannot stall the async workers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use astrobit_pipeline::{
    classify_json, decision_path_image, random_tree_image, trace_row, tree_image, ModelArtifacts,
    PipelineError, RowTrace, DEFAULT_TREE, OVERVIEW_DEPTH,
};
use astrobit_render::RenderOptions;

use crate::server::AppState;

/// A failed request, rendered as `{"error": "..."}` with its status code.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The blocking task panicked or was cancelled.
    #[error("request task failed")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Pipeline(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self, "request failed");
        } else {
            debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Unwrap a JSON body, turning extractor rejections into `InvalidRequest`.
fn body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    payload.map(|Json(v)| v).map_err(|rejection| {
        ApiError::Pipeline(PipelineError::InvalidRequest {
            reason: rejection.body_text(),
        })
    })
}

/// Run `f` against the shared artifacts on tokio's blocking pool.
async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&ModelArtifacts) -> Result<T, PipelineError> + Send + 'static,
    T: Send + 'static,
{
    let artifacts = Arc::clone(&state.artifacts);
    Ok(tokio::task::spawn_blocking(move || f(&artifacts)).await??)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImageResponse {
    pub image: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub n_trees: usize,
    pub n_features: usize,
    pub classes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TraceRequest {
    row: Value,
    #[serde(default)]
    tree: Option<usize>,
}

/// `POST /predict`: `{data, mapping}` → rows with `classification`.
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let body = body(payload)?;
    let rows = blocking(&state, move |a| classify_json(a, &body)).await?;
    Ok(Json(rows))
}

/// `POST /decision_path`: one flat row → tree 0 with its path highlighted.
pub async fn decision_path(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<ImageResponse> {
    let row = body(payload)?;
    let img = blocking(&state, move |a| decision_path_image(a, &row, DEFAULT_TREE)).await?;
    Ok(Json(ImageResponse {
        image: img.data_uri(),
    }))
}

/// `GET /general_tree_image`
pub async fn general_tree_image(State(state): State<AppState>) -> ApiResult<ImageResponse> {
    let options = RenderOptions::default().with_max_depth(OVERVIEW_DEPTH);
    let img = blocking(&state, move |a| tree_image(a, DEFAULT_TREE, options)).await?;
    Ok(Json(ImageResponse {
        image: img.data_uri(),
    }))
}

/// `GET /random_tree_image`
pub async fn random_tree(State(state): State<AppState>) -> ApiResult<ImageResponse> {
    let img = blocking(&state, |a| random_tree_image(a, &mut rand::thread_rng())).await?;
    debug!(tree = img.tree, "random tree chosen");
    Ok(Json(ImageResponse {
        image: img.data_uri(),
    }))
}

/// `GET /model_metrics`: the metrics file as it is on disk now.
pub async fn model_metrics(State(state): State<AppState>) -> ApiResult<Value> {
    Ok(Json(blocking(&state, ModelArtifacts::metrics).await?))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let summary = state.artifacts.summary();
    let health = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        n_trees: summary.n_trees,
        n_features: summary.n_features,
        classes: summary.classes,
    };
    (StatusCode::OK, Json(health))
}

/// `POST /trace`: `{row, tree?}` → raw decision path of one tree.
pub async fn trace(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<RowTrace> {
    let request: TraceRequest = serde_json::from_value(body(payload)?).map_err(|e| {
        ApiError::Pipeline(PipelineError::InvalidRequest {
            reason: e.to_string(),
        })
    })?;
    let tree = request.tree.unwrap_or(DEFAULT_TREE);
    let trace = blocking(&state, move |a| trace_row(a, &request.row, tree)).await?;
    Ok(Json(trace))
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::json;

    use super::*;
    use crate::server::tests::test_state;

    async fn into_parts(resp: Response) -> (StatusCode, Value) {
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn predict_adds_classification() {
        let body = json!({"data": [{"P": "3.5"}], "mapping": {"orbital_period": "P"}});
        let Json(out) = predict(State(test_state()), Ok(Json(body))).await.unwrap();
        assert_eq!(out[0]["classification"], "CONFIRMED");
        assert_eq!(out[0]["P"], "3.5");
    }

    #[tokio::test]
    async fn predict_empty_data() {
        let body = json!({"data": [], "mapping": {}});
        let Json(out) = predict(State(test_state()), Ok(Json(body))).await.unwrap();
        assert_eq!(out, json!([]));
    }

    #[tokio::test]
    async fn predict_missing_mapping_is_400() {
        let body = json!({"data": [{"P": 1}]});
        let err = predict(State(test_state()), Ok(Json(body))).await.unwrap_err();
        let (status, body) = into_parts(err.into_response()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("mapping"));
    }

    #[tokio::test]
    async fn decision_path_returns_data_uri() {
        let row = json!({"orbital_period": "3.5", "planet_radius": ""});
        let Json(out) = decision_path(State(test_state()), Ok(Json(row))).await.unwrap();
        assert!(out.image.starts_with("data:image/svg+xml;base64,"));
    }

    #[tokio::test]
    async fn decision_path_rejects_non_object() {
        let err = decision_path(State(test_state()), Ok(Json(json!("row"))))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn tree_images() {
        let Json(general) = general_tree_image(State(test_state())).await.unwrap();
        assert!(general.image.starts_with("data:image/svg+xml;base64,"));
        let Json(random) = random_tree(State(test_state())).await.unwrap();
        assert!(random.image.starts_with("data:image/svg+xml;base64,"));
    }

    #[tokio::test]
    async fn metrics_present_and_absent() {
        let Json(m) = model_metrics(State(test_state())).await.unwrap();
        assert!(m.get("classification_report").is_some());

        let err = model_metrics(State(crate::server::tests::test_state_without_metrics()))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn corrupt_metrics_file_is_500() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("metrics.json");
        std::fs::write(&path, "{truncated").unwrap();
        let state = crate::server::tests::test_state_with_metrics_file(path);

        let err = model_metrics(State(state)).await.unwrap_err();
        let (status, body) = into_parts(err.into_response()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("metrics"));
    }

    #[tokio::test]
    async fn panicking_task_is_500() {
        let err = blocking(&test_state(), |_| -> Result<(), PipelineError> {
            panic!("boom")
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Task(_)));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn health_reports_model_shape() {
        let (status, Json(h)) = health(State(test_state())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(h.status, "ok");
        assert_eq!(h.n_features, 7);
        assert_eq!(h.classes.len(), 2);
    }

    #[tokio::test]
    async fn trace_returns_path_ending_at_leaf() {
        let body = json!({"row": {"orbital_period": 1.0}});
        let Json(t) = trace(State(test_state()), Ok(Json(body))).await.unwrap();
        assert_eq!(t.tree, 0);
        assert_eq!(t.leaf, t.path.leaf());
    }

    #[tokio::test]
    async fn trace_out_of_range_tree_is_500() {
        let body = json!({"row": {}, "tree": 50});
        let err = trace(State(test_state()), Ok(Json(body))).await.unwrap_err();
        let (status, body) = into_parts(err.into_response()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("50"));
    }

    #[tokio::test]
    async fn trace_without_row_is_400() {
        let err = trace(State(test_state()), Ok(Json(json!({"tree": 0}))))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
