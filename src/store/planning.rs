//! Planning workflow manager
//!
//! Tracks planning requests and their task lists through the
//! plan / work / approve cycle: `request_planning` registers a request,
//! `get_next_task` hands out the first unfinished task, `mark_task_done`
//! and the approval operations drive each task and finally the whole
//! request to completion.
//!
//! Wire fields are camelCase to stay compatible with existing data files
//! and clients. Persistence mirrors the project store: whole-file JSON
//! rewrites under the data directory.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{PmAgentError, Result};

const REQUESTS_FILE: &str = "requests.json";
const REQUEST_TASKS_FILE: &str = "request_tasks.json";

/// Confirmation string required by [`PlanningManager::clear_all_data`]
pub const CLEAR_CONFIRMATION: &str = "CLEAR_ALL_MY_DATA";

/// Lifecycle of a planning request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    InProgress,
    Completed,
}

/// Lifecycle of a planned task
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanTaskStatus {
    Pending,
    Done,
}

/// A planning request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub request_id: String,
    pub original_request: String,
    #[serde(default)]
    pub split_details: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// A task planned under a request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanTask {
    pub id: String,
    pub request_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: PlanTaskStatus,
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_details: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A task to be added to a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlanTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Parameters for `request_planning`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPlanningParams {
    pub original_request: String,
    pub tasks: Vec<NewPlanTask>,
    #[serde(default)]
    pub split_details: Option<String>,
}

/// Parameters for `mark_task_done`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkTaskDoneParams {
    pub request_id: String,
    pub task_id: String,
    #[serde(default)]
    pub completed_details: Option<String>,
}

/// Parameters for the planning-level task update
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlanTaskParams {
    pub request_id: String,
    pub task_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Receipt returned by `request_planning` and `add_tasks_to_request`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanningReceipt {
    pub request_id: String,
    pub task_count: usize,
}

/// One row of the per-request progress table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskProgress {
    pub id: String,
    pub title: String,
    pub status: PlanTaskStatus,
    pub approved: bool,
}

/// Result of `get_next_task`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextTask {
    pub has_next_task: bool,
    pub all_tasks_done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<PlanTask>,
    pub tasks_progress: Vec<TaskProgress>,
}

/// Result of `mark_task_done`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkDoneOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub tasks_progress: Vec<TaskProgress>,
}

/// Per-request summary returned by `list_requests`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSummary {
    pub request_id: String,
    pub original_request: String,
    pub status: RequestStatus,
    pub total_tasks: usize,
    pub done_tasks: usize,
    pub approved_tasks: usize,
}

/// Result of `open_task_details`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetails {
    pub found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<PlanTask>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct State {
    requests: Vec<PlanRequest>,
    tasks: Vec<PlanTask>,
}

impl State {
    fn progress_for(&self, request_id: &str) -> Vec<TaskProgress> {
        self.tasks
            .iter()
            .filter(|t| t.request_id == request_id)
            .map(|t| TaskProgress {
                id: t.id.clone(),
                title: t.title.clone(),
                status: t.status,
                approved: t.approved,
            })
            .collect()
    }

    fn request_mut(&mut self, request_id: &str) -> Result<&mut PlanRequest> {
        self.requests
            .iter_mut()
            .find(|r| r.request_id == request_id)
            .ok_or_else(|| PmAgentError::NotFound(format!("request {request_id}")).into())
    }
}

/// File-backed planning manager
pub struct PlanningManager {
    dir: PathBuf,
    state: Mutex<State>,
}

impl PlanningManager {
    /// Open a manager rooted at `dir`, loading any existing data files
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let state = State {
            requests: load_file(&dir.join(REQUESTS_FILE))?,
            tasks: load_file(&dir.join(REQUEST_TASKS_FILE))?,
        };
        tracing::debug!(
            requests = state.requests.len(),
            tasks = state.tasks.len(),
            dir = %dir.display(),
            "planning manager loaded"
        );
        Ok(Self {
            dir,
            state: Mutex::new(state),
        })
    }

    fn persist(&self, state: &State) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        save_file(&self.dir.join(REQUESTS_FILE), &state.requests)?;
        save_file(&self.dir.join(REQUEST_TASKS_FILE), &state.tasks)?;
        Ok(())
    }

    /// Register a new planning request with its initial task split
    pub async fn request_planning(&self, params: RequestPlanningParams) -> Result<PlanningReceipt> {
        if params.tasks.is_empty() {
            return Err(
                PmAgentError::InvalidParams("at least one task is required".to_string()).into(),
            );
        }
        let now = Utc::now();
        let request = PlanRequest {
            request_id: Uuid::new_v4().to_string(),
            original_request: params.original_request,
            split_details: params.split_details.unwrap_or_default(),
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        let mut state = self.state.lock().await;
        let task_count = params.tasks.len();
        for new_task in params.tasks {
            state.tasks.push(make_task(&request.request_id, new_task, now));
        }
        let receipt = PlanningReceipt {
            request_id: request.request_id.clone(),
            task_count,
        };
        state.requests.push(request);
        self.persist(&state)?;
        tracing::info!(request_id = %receipt.request_id, task_count, "planning request registered");
        Ok(receipt)
    }

    /// Hand out the first unfinished task of a request
    ///
    /// `all_tasks_done` is true only once every task is both done and
    /// approved.
    pub async fn get_next_task(&self, request_id: &str) -> Result<NextTask> {
        let mut state = self.state.lock().await;
        state.request_mut(request_id)?;

        let progress = state.progress_for(request_id);
        let next = state
            .tasks
            .iter()
            .find(|t| t.request_id == request_id && t.status != PlanTaskStatus::Done)
            .cloned();
        let all_done = progress
            .iter()
            .all(|t| t.status == PlanTaskStatus::Done && t.approved);
        Ok(NextTask {
            has_next_task: next.is_some(),
            all_tasks_done: all_done,
            task: next,
            tasks_progress: progress,
        })
    }

    /// Mark a task as done
    ///
    /// Marking a task that is already done is reported through the outcome
    /// rather than as an error.
    pub async fn mark_task_done(&self, params: MarkTaskDoneParams) -> Result<MarkDoneOutcome> {
        let mut state = self.state.lock().await;
        state.request_mut(&params.request_id)?;
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.request_id == params.request_id && t.id == params.task_id)
            .ok_or_else(|| PmAgentError::NotFound(format!("task {}", params.task_id)))?;

        if task.status == PlanTaskStatus::Done {
            let progress = state.progress_for(&params.request_id);
            return Ok(MarkDoneOutcome {
                success: false,
                message: Some("task is already done".to_string()),
                tasks_progress: progress,
            });
        }

        task.status = PlanTaskStatus::Done;
        task.completed_details = params.completed_details;
        task.updated_at = Utc::now();
        self.persist(&state)?;
        Ok(MarkDoneOutcome {
            success: true,
            message: None,
            tasks_progress: state.progress_for(&params.request_id),
        })
    }

    /// Approve a completed task
    pub async fn approve_task_completion(&self, request_id: &str, task_id: &str) -> Result<PlanTask> {
        let mut state = self.state.lock().await;
        state.request_mut(request_id)?;
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.request_id == request_id && t.id == task_id)
            .ok_or_else(|| PmAgentError::NotFound(format!("task {task_id}")))?;

        if task.status != PlanTaskStatus::Done {
            return Err(
                PmAgentError::InvalidParams("task is not done yet".to_string()).into(),
            );
        }
        if task.approved {
            return Err(
                PmAgentError::InvalidParams("task is already approved".to_string()).into(),
            );
        }
        task.approved = true;
        task.approved_at = Some(Utc::now());
        task.updated_at = Utc::now();
        let approved = task.clone();
        self.persist(&state)?;
        Ok(approved)
    }

    /// Approve a whole request once every task is done and approved
    pub async fn approve_request_completion(&self, request_id: &str) -> Result<PlanRequest> {
        let mut state = self.state.lock().await;
        let unfinished = state.tasks.iter().any(|t| {
            t.request_id == request_id && (t.status != PlanTaskStatus::Done || !t.approved)
        });
        if unfinished {
            return Err(PmAgentError::InvalidParams(
                "all tasks must be done and approved first".to_string(),
            )
            .into());
        }
        let now = Utc::now();
        let request = state.request_mut(request_id)?;
        request.status = RequestStatus::Completed;
        request.completed_at = Some(now);
        request.updated_at = now;
        let completed = request.clone();
        self.persist(&state)?;
        tracing::info!(request_id, "planning request completed");
        Ok(completed)
    }

    /// Append tasks to an existing request
    ///
    /// A COMPLETED request is reopened to IN_PROGRESS.
    pub async fn add_tasks_to_request(
        &self,
        request_id: &str,
        tasks: Vec<NewPlanTask>,
    ) -> Result<PlanningReceipt> {
        if tasks.is_empty() {
            return Err(
                PmAgentError::InvalidParams("at least one task is required".to_string()).into(),
            );
        }
        let mut state = self.state.lock().await;
        let now = Utc::now();
        {
            let request = state.request_mut(request_id)?;
            if request.status == RequestStatus::Completed {
                request.status = RequestStatus::InProgress;
                request.completed_at = None;
            }
            request.updated_at = now;
        }
        let task_count = tasks.len();
        for new_task in tasks {
            state.tasks.push(make_task(request_id, new_task, now));
        }
        self.persist(&state)?;
        Ok(PlanningReceipt {
            request_id: request_id.to_string(),
            task_count,
        })
    }

    /// Retitle or redescribe a task that is not done yet
    pub async fn update_task(&self, params: UpdatePlanTaskParams) -> Result<PlanTask> {
        let mut state = self.state.lock().await;
        state.request_mut(&params.request_id)?;
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.request_id == params.request_id && t.id == params.task_id)
            .ok_or_else(|| PmAgentError::NotFound(format!("task {}", params.task_id)))?;

        if task.status == PlanTaskStatus::Done {
            return Err(
                PmAgentError::InvalidParams("cannot update a task that is done".to_string()).into(),
            );
        }
        if let Some(title) = params.title {
            task.title = title;
        }
        if let Some(description) = params.description {
            task.description = description;
        }
        task.updated_at = Utc::now();
        let updated = task.clone();
        self.persist(&state)?;
        Ok(updated)
    }

    /// Remove a task unless it is done and approved
    pub async fn delete_task(&self, request_id: &str, task_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.request_mut(request_id)?;
        let position = state
            .tasks
            .iter()
            .position(|t| t.request_id == request_id && t.id == task_id)
            .ok_or_else(|| PmAgentError::NotFound(format!("task {task_id}")))?;

        let task = &state.tasks[position];
        if task.status == PlanTaskStatus::Done && task.approved {
            return Err(PmAgentError::InvalidParams(
                "cannot delete a task that is done and approved".to_string(),
            )
            .into());
        }
        state.tasks.remove(position);
        self.persist(&state)?;
        Ok(())
    }

    /// Summaries of all requests
    pub async fn list_requests(&self) -> Vec<RequestSummary> {
        let state = self.state.lock().await;
        state
            .requests
            .iter()
            .map(|r| {
                let tasks: Vec<_> = state
                    .tasks
                    .iter()
                    .filter(|t| t.request_id == r.request_id)
                    .collect();
                RequestSummary {
                    request_id: r.request_id.clone(),
                    original_request: r.original_request.clone(),
                    status: r.status,
                    total_tasks: tasks.len(),
                    done_tasks: tasks
                        .iter()
                        .filter(|t| t.status == PlanTaskStatus::Done)
                        .count(),
                    approved_tasks: tasks.iter().filter(|t| t.approved).count(),
                }
            })
            .collect()
    }

    /// Look up a task by id across all requests
    pub async fn open_task_details(&self, task_id: &str) -> TaskDetails {
        let state = self.state.lock().await;
        match state.tasks.iter().find(|t| t.id == task_id) {
            Some(task) => TaskDetails {
                found: true,
                request_id: Some(task.request_id.clone()),
                task: Some(task.clone()),
            },
            None => TaskDetails {
                found: false,
                request_id: None,
                task: None,
            },
        }
    }

    /// Wipe all planning data
    ///
    /// Refuses unless `confirmation` equals [`CLEAR_CONFIRMATION`].
    pub async fn clear_all_data(&self, confirmation: &str) -> Result<()> {
        if confirmation != CLEAR_CONFIRMATION {
            return Err(PmAgentError::InvalidParams(format!(
                "confirmation must be \"{CLEAR_CONFIRMATION}\""
            ))
            .into());
        }
        let mut state = self.state.lock().await;
        state.requests.clear();
        state.tasks.clear();
        self.persist(&state)?;
        tracing::warn!("all planning data cleared");
        Ok(())
    }
}

fn make_task(request_id: &str, new_task: NewPlanTask, now: DateTime<Utc>) -> PlanTask {
    PlanTask {
        id: Uuid::new_v4().to_string(),
        request_id: request_id.to_string(),
        title: new_task.title,
        description: new_task.description,
        status: PlanTaskStatus::Pending,
        approved: false,
        approved_at: None,
        completed_details: None,
        created_at: now,
        updated_at: now,
    }
}

fn load_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|err| {
        PmAgentError::Store(format!("corrupt data file {}: {err}", path.display())).into()
    })
}

fn save_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let raw = serde_json::to_string_pretty(value)?;
    std::fs::write(path, raw)?;
    Ok(())
}
