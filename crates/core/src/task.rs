use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{TaskId, WorkerId};

/// A unit of work offered to the network. `redundancy` is how many
/// independent results the coordinator collects before the outputs are
/// put to a vote; each dispatch consumes one slot of that budget.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub operation: String,
    pub input: f64,
    pub price: i64,
    pub kind: String,
    /// Opaque structured data passed through to workers uninterpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default)]
    pub required_capabilities: Vec<String>,
    pub redundancy: u32,
    #[serde(default)]
    pub results_collected: u32,
    /// Most recent assignee only; earlier dispatches are not retained.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<WorkerId>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub verified: bool,
}

impl Task {
    /// A task stays visible to dispatch until it completes or exhausts
    /// its redundancy budget.
    pub fn dispatchable(&self) -> bool {
        !self.completed && self.results_collected < self.redundancy
    }

    pub fn remaining_slots(&self) -> u32 {
        self.redundancy.saturating_sub(self.results_collected)
    }
}

/// One accepted submission in the result ledger. The signature and public
/// key are consumed at admission and not retained.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub result_id: u64,
    pub task_id: TaskId,
    pub worker_id: WorkerId,
    pub output: f64,
    pub verified: bool,
}
