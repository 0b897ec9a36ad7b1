use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::PUBLIC_KEY_LENGTH;
use mesh_core::capability;
use mesh_core::envelope;
use mesh_core::ids::{TaskId, WorkerId};
use mesh_core::quorum;
use mesh_core::task::Task;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};

use crate::seer::MortalityModel;
use crate::store::{StoreError, SCAN_LIMIT};
use crate::AppState;

/// Batch size of the synthetic-task generator.
const GENERATED_BATCH: usize = 10;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-worker-id")]);

    Router::new()
        .route("/health", get(health).options(no_content))
        .route("/register", post(register_worker).options(no_content))
        .route("/get_task", get(get_task).options(no_content))
        .route("/submit_result", post(submit_result).options(no_content))
        .route("/balance", get(get_balance).options(no_content))
        .route("/create_task", post(create_task).options(no_content))
        .route("/generate_tasks", post(generate_tasks).options(no_content))
        .route("/tasks_overview", get(tasks_overview).options(no_content))
        .route("/seer/predict", post(seer_predict).options(no_content))
        .route("/seer/model", get(seer_model).options(no_content))
        .layer(cors)
        .with_state(state)
}

async fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn health() -> &'static str {
    "ok"
}

fn internal(err: StoreError) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

#[derive(Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub worker_id: String,
    /// Base64-encoded Ed25519 public key.
    #[serde(default)]
    pub pub_key: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

async fn register_worker(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<StatusCode, (StatusCode, String)> {
    // Decode failures fall back to empty fields; the key check below is
    // what actually gates registration.
    let req: RegisterRequest = serde_json::from_slice(&body).unwrap_or_default();

    let decoded = BASE64.decode(&req.pub_key);
    if !matches!(&decoded, Ok(key) if key.len() == PUBLIC_KEY_LENGTH) {
        return Err((StatusCode::BAD_REQUEST, "invalid public key".to_string()));
    }

    let mut tx = state.store.begin().await;
    tx.upsert_worker(WorkerId(req.worker_id), req.pub_key, req.capabilities);
    tx.commit().map_err(internal)?;

    Ok(StatusCode::OK)
}

#[derive(Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: TaskId,
    pub operation: String,
    pub input: f64,
    pub price: i64,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default)]
    pub required_capabilities: Vec<String>,
}

impl From<&Task> for TaskResponse {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            operation: task.operation.clone(),
            input: task.input,
            price: task.price,
            kind: task.kind.clone(),
            payload: task.payload.clone(),
            required_capabilities: task.required_capabilities.clone(),
        }
    }
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, (StatusCode, String)> {
    let worker_id = WorkerId(
        headers
            .get("x-worker-id")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string(),
    );

    let mut tx = state.store.begin().await;
    let Some(worker) = tx.worker(&worker_id).cloned() else {
        return Err((StatusCode::NOT_FOUND, "unknown worker".to_string()));
    };

    let offered = tx
        .dispatchable_tasks(SCAN_LIMIT)
        .into_iter()
        .find(|task| capability::matches(&worker.capabilities, &task.required_capabilities));

    let Some(task) = offered else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    tx.assign_task(&task.id, &worker.id);
    tx.commit().map_err(internal)?;

    tracing::debug!(task = %task.id, worker = %worker.id, "task dispatched");
    Ok(Json(TaskResponse::from(&task)).into_response())
}

#[derive(Deserialize)]
pub struct SubmitResultRequest {
    pub id: TaskId,
    pub worker: WorkerId,
    pub output: f64,
    /// Base64-encoded detached signature over the canonical envelope.
    pub signature: String,
    /// Base64-encoded Ed25519 public key.
    pub pub_key: String,
    // Workers attach these for their peers; the coordinator ignores them.
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub payload: Option<Value>,
}

async fn submit_result(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<StatusCode, (StatusCode, String)> {
    let res: SubmitResultRequest = serde_json::from_slice(&body)
        .map_err(|_| (StatusCode::BAD_REQUEST, "invalid payload".to_string()))?;

    let submitted_key = BASE64
        .decode(&res.pub_key)
        .ok()
        .filter(|key| key.len() == PUBLIC_KEY_LENGTH)
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "invalid public key".to_string()))?;
    let signature = BASE64
        .decode(&res.signature)
        .map_err(|_| (StatusCode::BAD_REQUEST, "invalid signature".to_string()))?;

    let message = envelope::signable_bytes(res.id.as_str(), res.worker.as_str(), res.output);

    let mut tx = state.store.begin().await;

    // Every ledger row must reference a registered worker.
    let Some(worker) = tx.worker(&res.worker) else {
        return Err((StatusCode::NOT_FOUND, "unknown worker".to_string()));
    };

    let verifying_key = if state.config.require_registered_key {
        BASE64.decode(&worker.pub_key).unwrap_or_default()
    } else {
        submitted_key
    };

    if !envelope::verify(&verifying_key, &message, &signature) {
        tx.adjust_trust(&res.worker, -1);
        tx.commit().map_err(internal)?;
        return Err((
            StatusCode::UNAUTHORIZED,
            "signature verification failed".to_string(),
        ));
    }

    tx.record_result(res.id.clone(), res.worker.clone(), res.output);
    let outputs = tx.outputs_for(&res.id);

    match quorum::majority(&outputs, state.config.vote_policy) {
        Some(value) => {
            tx.mark_results_verified(&res.id);
            tx.adjust_trust(&res.worker, 1);
            tx.credit_token(&res.worker);
            // The submitted result id doubles as the task id; completion
            // is keyed on it.
            tx.finalize_task(&res.id);
            tracing::info!(task = %res.id, worker = %res.worker, value, "quorum reached");
        }
        None if state.config.minority_penalty => {
            tx.adjust_trust(&res.worker, -1);
        }
        None => {}
    }

    tx.commit().map_err(internal)?;
    Ok(StatusCode::OK)
}

#[derive(Default, Deserialize)]
pub struct BalanceQuery {
    #[serde(default)]
    pub worker: String,
}

#[derive(Serialize, Deserialize)]
pub struct BalanceResponse {
    pub trust: i64,
    pub token: u64,
}

async fn get_balance(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BalanceQuery>,
) -> Json<BalanceResponse> {
    let tx = state.store.begin().await;
    let balance = match tx.worker(&WorkerId(query.worker)) {
        Some(worker) => BalanceResponse {
            trust: worker.trust,
            token: worker.token,
        },
        // Unknown workers read as zero balances.
        None => BalanceResponse { trust: 0, token: 0 },
    };
    Json(balance)
}

#[derive(Default, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub input: f64,
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub required_capabilities: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct CreateTaskResponse {
    pub id: TaskId,
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<CreateTaskResponse>), (StatusCode, String)> {
    let mut req: CreateTaskRequest = serde_json::from_slice(&body)
        .map_err(|_| (StatusCode::BAD_REQUEST, "invalid payload".to_string()))?;

    if req.kind.is_empty() {
        req.kind = "custom".to_string();
    }
    if req.price < 0 {
        req.price = 0;
    }

    let task = Task {
        id: TaskId::generate(10),
        operation: req.operation,
        input: req.input,
        price: req.price,
        kind: req.kind,
        payload: req.payload,
        required_capabilities: req.required_capabilities,
        redundancy: 1,
        results_collected: 0,
        assigned_to: None,
        completed: false,
        verified: false,
    };
    let id = task.id.clone();

    let mut tx = state.store.begin().await;
    tx.insert_task(task);
    tx.commit().map_err(internal)?;

    Ok((StatusCode::CREATED, Json(CreateTaskResponse { id })))
}

/// Synthesize a batch of load-generation tasks cycling through three
/// templates: basic arithmetic, extended math, vector analytics.
async fn generate_tasks(
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, (StatusCode, String)> {
    let mut tx = state.store.begin().await;
    for i in 0..GENERATED_BATCH {
        let id = TaskId::generate(8);
        let (operation, kind, required, payload) = match i % 3 {
            1 => (
                "factorial",
                "math_extended",
                vec!["math:advanced".to_string()],
                serde_json::json!({ "note": format!("Auto-generated factorial task {id}") }),
            ),
            2 => {
                let values: Vec<f64> = (0..3)
                    .map(|_| rand::thread_rng().gen::<f64>() * 10.0 + 1.0)
                    .collect();
                (
                    "vector_sum",
                    "dataset",
                    vec!["math:basic".to_string(), "analytics:vector".to_string()],
                    serde_json::json!({ "values": values }),
                )
            }
            _ => (
                "square",
                "arithmetic",
                vec!["math:basic".to_string()],
                serde_json::json!({ "note": format!("Auto-generated square task {id}") }),
            ),
        };
        tx.insert_task(Task {
            id,
            operation: operation.to_string(),
            input: rand::thread_rng().gen::<f64>() * 100.0 + 1.0,
            price: 1,
            kind: kind.to_string(),
            payload: Some(payload),
            required_capabilities: required,
            redundancy: 3,
            results_collected: 0,
            assigned_to: None,
            completed: false,
            verified: false,
        });
    }
    tx.commit().map_err(internal)?;

    Ok(StatusCode::OK)
}

#[derive(Serialize, Deserialize)]
pub struct TaskOverview {
    pub id: TaskId,
    pub operation: String,
    pub kind: String,
    pub price: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<WorkerId>,
    pub completed: bool,
    pub verified: bool,
    pub remaining_slots: u32,
    #[serde(default)]
    pub required_capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

async fn tasks_overview(State(state): State<Arc<AppState>>) -> Json<Vec<TaskOverview>> {
    let tx = state.store.begin().await;
    let overview = tx
        .all_tasks()
        .map(|task| TaskOverview {
            id: task.id.clone(),
            operation: task.operation.clone(),
            kind: task.kind.clone(),
            price: task.price,
            assigned_to: task.assigned_to.clone(),
            completed: task.completed,
            verified: task.verified,
            remaining_slots: task.remaining_slots(),
            required_capabilities: task.required_capabilities.clone(),
            payload: task.payload.clone(),
        })
        .collect();
    Json(overview)
}

#[derive(Default, Deserialize)]
pub struct SeerRequest {
    #[serde(default)]
    pub age: f64,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub ethnicity: String,
}

#[derive(Serialize, Deserialize)]
pub struct SeerResponse {
    pub prediction: String,
    #[serde(rename = "yearsRemaining")]
    pub years_remaining: i64,
    #[serde(rename = "riskScore")]
    pub risk_score: f64,
    pub advisory: String,
    pub reason: String,
}

async fn seer_predict(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<SeerResponse>, (StatusCode, String)> {
    let req: SeerRequest = serde_json::from_slice(&body)
        .map_err(|_| (StatusCode::BAD_REQUEST, "invalid payload".to_string()))?;

    let (risk, reason) = state
        .seer
        .predict(req.age, &req.city, &req.country, &req.ethnicity);
    let years_remaining = (95.0 - req.age - risk * 12.0).max(5.0) as i64;

    let (prediction, advisory) = if risk > 0.65 {
        (
            "A storm gathers sooner than expected.",
            "Course-correct habits, seek preventative care, and lean on community trust.",
        )
    } else if risk > 0.45 {
        (
            "Fate balances on a knife-edge.",
            "Moderate stressors and nurture trusted alliances to improve the odds.",
        )
    } else {
        (
            "The threads favour a long life.",
            "Share compute wisely; benevolence extends longevity.",
        )
    };

    Ok(Json(SeerResponse {
        prediction: prediction.to_string(),
        years_remaining,
        risk_score: risk,
        advisory: advisory.to_string(),
        reason,
    }))
}

async fn seer_model(State(state): State<Arc<AppState>>) -> Json<MortalityModel> {
    Json(state.seer.clone())
}
