//! Durable record of workers, tasks, and results.
//!
//! The three relations live behind one async mutex. Every verb that reads
//! and writes runs inside a single [`StoreTx`], which serializes the whole
//! read-modify-write sequence and persists a snapshot on commit. A store
//! opened without a path keeps everything in memory; the tests use that.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use mesh_core::ids::{TaskId, WorkerId};
use mesh_core::task::{ResultRecord, Task};
use mesh_core::worker::WorkerProfile;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

const SNAPSHOT_FILE: &str = "coordinator_state.json";

/// Page size for the dispatchable-task scan. Repeated scans eventually
/// visit every dispatchable task because the order is shuffled.
pub const SCAN_LIMIT: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Default, Serialize, Deserialize)]
struct Relations {
    #[serde(default)]
    workers: BTreeMap<WorkerId, WorkerProfile>,
    #[serde(default)]
    tasks: BTreeMap<TaskId, Task>,
    #[serde(default)]
    results: Vec<ResultRecord>,
    #[serde(default)]
    next_result_id: u64,
}

pub struct Store {
    relations: Mutex<Relations>,
    snapshot_path: Option<PathBuf>,
}

impl Store {
    /// In-memory store with no backing snapshot.
    pub fn in_memory() -> Self {
        Self {
            relations: Mutex::new(Relations::default()),
            snapshot_path: None,
        }
    }

    /// Open the on-disk store, restoring (and migrating) any snapshot at
    /// `path`.
    pub fn open(path: PathBuf) -> Self {
        let relations = load_snapshot(&path);
        Self {
            relations: Mutex::new(relations),
            snapshot_path: Some(path),
        }
    }

    /// Enter the serialized critical section. All reads and writes of a
    /// single verb happen on the returned transaction.
    pub async fn begin(&self) -> StoreTx<'_> {
        StoreTx {
            relations: self.relations.lock().await,
            snapshot_path: self.snapshot_path.as_deref(),
        }
    }
}

pub struct StoreTx<'a> {
    relations: MutexGuard<'a, Relations>,
    snapshot_path: Option<&'a Path>,
}

impl StoreTx<'_> {
    // ---- worker registry ----

    /// Insert a fresh worker row, or update only the key and capability
    /// set of an existing one. Trust and token survive re-registration.
    pub fn upsert_worker(&mut self, id: WorkerId, pub_key: String, capabilities: Vec<String>) {
        self.relations
            .workers
            .entry(id.clone())
            .and_modify(|worker| {
                worker.pub_key = pub_key.clone();
                worker.capabilities = capabilities.clone();
            })
            .or_insert_with(|| WorkerProfile::new(id, pub_key, capabilities));
    }

    pub fn worker(&self, id: &WorkerId) -> Option<&WorkerProfile> {
        self.relations.workers.get(id)
    }

    pub fn adjust_trust(&mut self, id: &WorkerId, delta: i64) {
        if let Some(worker) = self.relations.workers.get_mut(id) {
            worker.trust += delta;
        }
    }

    pub fn credit_token(&mut self, id: &WorkerId) {
        if let Some(worker) = self.relations.workers.get_mut(id) {
            worker.token += 1;
        }
    }

    // ---- tasks ----

    pub fn insert_task(&mut self, task: Task) {
        self.relations.tasks.insert(task.id.clone(), task);
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.relations.tasks.get(id)
    }

    pub fn all_tasks(&self) -> impl Iterator<Item = &Task> {
        self.relations.tasks.values()
    }

    /// Uncompleted tasks with redundancy budget left, in shuffled order so
    /// contending dispatchers spread across candidates.
    pub fn dispatchable_tasks(&self, limit: usize) -> Vec<Task> {
        let mut candidates: Vec<Task> = self
            .relations
            .tasks
            .values()
            .filter(|task| task.dispatchable())
            .cloned()
            .collect();
        candidates.shuffle(&mut rand::thread_rng());
        candidates.truncate(limit);
        candidates
    }

    /// Debit one redundancy slot and record the assignee. Refuses once the
    /// budget is exhausted or the task has completed.
    pub fn assign_task(&mut self, id: &TaskId, worker: &WorkerId) -> bool {
        match self.relations.tasks.get_mut(id) {
            Some(task) if task.dispatchable() => {
                task.results_collected += 1;
                task.assigned_to = Some(worker.clone());
                true
            }
            _ => false,
        }
    }

    /// Terminal transition: completed and verified flip together and never
    /// flip back.
    pub fn finalize_task(&mut self, id: &TaskId) {
        if let Some(task) = self.relations.tasks.get_mut(id) {
            task.completed = true;
            task.verified = true;
        }
    }

    // ---- result ledger ----

    pub fn record_result(&mut self, task_id: TaskId, worker_id: WorkerId, output: f64) -> u64 {
        self.relations.next_result_id += 1;
        let result_id = self.relations.next_result_id;
        self.relations.results.push(ResultRecord {
            result_id,
            task_id,
            worker_id,
            output,
            verified: false,
        });
        result_id
    }

    pub fn outputs_for(&self, task_id: &TaskId) -> Vec<f64> {
        self.relations
            .results
            .iter()
            .filter(|record| &record.task_id == task_id)
            .map(|record| record.output)
            .collect()
    }

    pub fn mark_results_verified(&mut self, task_id: &TaskId) {
        for record in self
            .relations
            .results
            .iter_mut()
            .filter(|record| &record.task_id == task_id)
        {
            record.verified = true;
        }
    }

    pub fn results(&self) -> &[ResultRecord] {
        &self.relations.results
    }

    /// Persist the snapshot. A no-op for in-memory stores.
    pub fn commit(self) -> Result<(), StoreError> {
        let Some(path) = self.snapshot_path else {
            return Ok(());
        };
        save_snapshot(path, &self.relations)
    }
}

pub fn snapshot_path() -> PathBuf {
    let dir = std::env::var("DATA_DIR").unwrap_or_else(|_| ".".to_string());
    Path::new(&dir).join(SNAPSHOT_FILE)
}

fn load_snapshot(path: &Path) -> Relations {
    let data = match fs::read_to_string(path) {
        Ok(d) if !d.is_empty() => d,
        _ => {
            tracing::info!(?path, "no snapshot found, starting with empty relations");
            return Relations::default();
        }
    };

    let raw: serde_json::Value = match serde_json::from_str(&data) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(?path, error = %e, "failed to parse snapshot, starting fresh");
            return Relations::default();
        }
    };

    match serde_json::from_value::<Relations>(strip_legacy_tasks(raw)) {
        Ok(mut relations) => {
            let max_recorded = relations
                .results
                .iter()
                .map(|record| record.result_id)
                .max()
                .unwrap_or(0);
            relations.next_result_id = relations.next_result_id.max(max_recorded);
            tracing::info!(
                ?path,
                workers = relations.workers.len(),
                tasks = relations.tasks.len(),
                results = relations.results.len(),
                "restored snapshot"
            );
            relations
        }
        Err(e) => {
            tracing::warn!(?path, error = %e, "failed to decode snapshot, starting fresh");
            Relations::default()
        }
    }
}

/// A snapshot written before `operation` became a string cannot be carried
/// forward; its task and result relations are rebuilt while the worker
/// registry survives.
fn strip_legacy_tasks(mut raw: serde_json::Value) -> serde_json::Value {
    let legacy = raw
        .get("tasks")
        .and_then(|tasks| tasks.as_object())
        .is_some_and(|tasks| {
            tasks
                .values()
                .any(|task| task.get("operation").is_some_and(|op| op.is_number()))
        });
    if legacy {
        tracing::warn!("legacy task snapshot detected, rebuilding task and result relations");
        if let Some(map) = raw.as_object_mut() {
            map.remove("tasks");
            map.remove("results");
            map.remove("next_result_id");
        }
    }
    raw
}

fn save_snapshot(path: &Path, relations: &Relations) -> Result<(), StoreError> {
    let data = serde_json::to_string_pretty(relations)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
