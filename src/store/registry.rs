//! Tool registry
//!
//! Owns the tool catalog and dispatches invocations into the project store
//! and the planning manager. Every server surface (REST, JSON-RPC over
//! HTTP, WebSocket) funnels through [`ToolRegistry::invoke`], so error
//! mapping to HTTP statuses and JSON-RPC codes lives here in one place.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::PmAgentError;
use crate::mcp::types::{ToolDefinition, ERROR_INTERNAL, ERROR_INVALID_PARAMS, ERROR_SERVER};
use crate::store::planning::{
    MarkTaskDoneParams, NewPlanTask, PlanningManager, RequestPlanningParams,
};
use crate::store::projects::{
    CreateProjectParams, CreateTaskParams, ListTasksParams, ProjectStore, UpdateProjectParams,
    UpdateTaskParams,
};

/// How a tool invocation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorKind {
    /// The tool itself is not registered
    UnknownTool,
    /// A referenced domain object does not exist
    NotFound,
    /// Parameters were missing or malformed
    InvalidParams,
    /// The store failed internally
    Internal,
}

/// A failed tool invocation
#[derive(Debug, Clone)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn unknown_tool(name: &str) -> Self {
        Self {
            kind: ToolErrorKind::UnknownTool,
            message: format!("unknown tool: {name}"),
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::InvalidParams,
            message: message.into(),
        }
    }

    /// HTTP status for the REST `/invoke` surface
    pub fn http_status(&self) -> u16 {
        match self.kind {
            ToolErrorKind::UnknownTool | ToolErrorKind::NotFound => 404,
            ToolErrorKind::InvalidParams => 400,
            ToolErrorKind::Internal => 500,
        }
    }

    /// JSON-RPC error code for the RPC surfaces
    pub fn jsonrpc_code(&self) -> i64 {
        match self.kind {
            ToolErrorKind::UnknownTool | ToolErrorKind::NotFound => ERROR_SERVER,
            ToolErrorKind::InvalidParams => ERROR_INVALID_PARAMS,
            ToolErrorKind::Internal => ERROR_INTERNAL,
        }
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<anyhow::Error> for ToolError {
    fn from(err: anyhow::Error) -> Self {
        let kind = match err.downcast_ref::<PmAgentError>() {
            Some(PmAgentError::NotFound(_)) => ToolErrorKind::NotFound,
            Some(PmAgentError::InvalidParams(_)) => ToolErrorKind::InvalidParams,
            _ => ToolErrorKind::Internal,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

type ToolResult = std::result::Result<Value, ToolError>;

// Parameter shells for the id-only tools. The project side speaks
// snake_case, the planning side camelCase, matching their stores.

#[derive(Deserialize)]
struct ProjectIdParams {
    project_id: String,
}

#[derive(Deserialize)]
struct TaskIdParams {
    task_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestIdParams {
    request_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestTaskParams {
    request_id: String,
    task_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanTaskIdParams {
    task_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddTasksParams {
    request_id: String,
    tasks: Vec<NewPlanTask>,
}

#[derive(Deserialize)]
struct ClearParams {
    confirmation: String,
}

/// The tool catalog plus dispatch into the domain stores
pub struct ToolRegistry {
    projects: Arc<ProjectStore>,
    planning: Arc<PlanningManager>,
}

impl ToolRegistry {
    pub fn new(projects: Arc<ProjectStore>, planning: Arc<PlanningManager>) -> Self {
        Self { projects, planning }
    }

    /// The advertised tool catalog
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            tool("list_projects", "List all projects", schema(json!({}), &[])),
            tool(
                "create_project",
                "Create a new project",
                schema(
                    json!({
                        "name": {"type": "string"},
                        "description": {"type": "string"}
                    }),
                    &["name"],
                ),
            ),
            tool(
                "get_project",
                "Fetch a project by id",
                schema(json!({"project_id": {"type": "string"}}), &["project_id"]),
            ),
            tool(
                "update_project",
                "Update a project's name or description",
                schema(
                    json!({
                        "project_id": {"type": "string"},
                        "name": {"type": "string"},
                        "description": {"type": "string"}
                    }),
                    &["project_id"],
                ),
            ),
            tool(
                "delete_project",
                "Delete a project and all of its tasks",
                schema(json!({"project_id": {"type": "string"}}), &["project_id"]),
            ),
            tool(
                "list_tasks",
                "List tasks, optionally filtered by project and status",
                schema(
                    json!({
                        "project_id": {"type": "string"},
                        "status": {"type": "string"}
                    }),
                    &[],
                ),
            ),
            tool(
                "create_task",
                "Create a task under an existing project",
                schema(
                    json!({
                        "project_id": {"type": "string"},
                        "name": {"type": "string"},
                        "description": {"type": "string"},
                        "status": {"type": "string"},
                        "due_date": {"type": "string"},
                        "assignee": {"type": "string"}
                    }),
                    &["project_id", "name"],
                ),
            ),
            tool(
                "get_task",
                "Fetch a task by id",
                schema(json!({"task_id": {"type": "string"}}), &["task_id"]),
            ),
            tool(
                "update_task",
                "Update a task's fields",
                schema(
                    json!({
                        "task_id": {"type": "string"},
                        "name": {"type": "string"},
                        "description": {"type": "string"},
                        "status": {"type": "string"},
                        "due_date": {"type": "string"},
                        "assignee": {"type": "string"}
                    }),
                    &["task_id"],
                ),
            ),
            tool(
                "delete_task",
                "Delete a task",
                schema(json!({"task_id": {"type": "string"}}), &["task_id"]),
            ),
            tool(
                "request_planning",
                "Register a planning request with its initial task split",
                schema(
                    json!({
                        "originalRequest": {"type": "string"},
                        "tasks": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "title": {"type": "string"},
                                    "description": {"type": "string"}
                                },
                                "required": ["title"]
                            }
                        },
                        "splitDetails": {"type": "string"}
                    }),
                    &["originalRequest", "tasks"],
                ),
            ),
            tool(
                "get_next_task",
                "Get the next unfinished task of a request",
                schema(json!({"requestId": {"type": "string"}}), &["requestId"]),
            ),
            tool(
                "mark_task_done",
                "Mark a planned task as done",
                schema(
                    json!({
                        "requestId": {"type": "string"},
                        "taskId": {"type": "string"},
                        "completedDetails": {"type": "string"}
                    }),
                    &["requestId", "taskId"],
                ),
            ),
            tool(
                "approve_task_completion",
                "Approve a completed task",
                schema(
                    json!({
                        "requestId": {"type": "string"},
                        "taskId": {"type": "string"}
                    }),
                    &["requestId", "taskId"],
                ),
            ),
            tool(
                "approve_request_completion",
                "Approve a request once every task is done and approved",
                schema(json!({"requestId": {"type": "string"}}), &["requestId"]),
            ),
            tool(
                "add_tasks_to_request",
                "Append tasks to an existing request",
                schema(
                    json!({
                        "requestId": {"type": "string"},
                        "tasks": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "title": {"type": "string"},
                                    "description": {"type": "string"}
                                },
                                "required": ["title"]
                            }
                        }
                    }),
                    &["requestId", "tasks"],
                ),
            ),
            tool("list_requests", "List all planning requests", schema(json!({}), &[])),
            tool(
                "open_task_details",
                "Look up a planned task by id",
                schema(json!({"taskId": {"type": "string"}}), &["taskId"]),
            ),
            tool(
                "clear_all_data",
                "Wipe all planning data (requires confirmation)",
                schema(json!({"confirmation": {"type": "string"}}), &["confirmation"]),
            ),
        ]
    }

    /// Invoke a tool by name
    pub async fn invoke(&self, name: &str, params: Value) -> ToolResult {
        tracing::debug!(tool = name, "invoking tool");
        match name {
            "list_projects" => {
                let projects = self.projects.list_projects().await;
                encode(json!({ "projects": projects }))
            }
            "create_project" => {
                let params: CreateProjectParams = parse(params)?;
                encode_value(self.projects.create_project(params).await?)
            }
            "get_project" => {
                let params: ProjectIdParams = parse(params)?;
                encode_value(self.projects.get_project(&params.project_id).await?)
            }
            "update_project" => {
                let params: UpdateProjectParams = parse(params)?;
                encode_value(self.projects.update_project(params).await?)
            }
            "delete_project" => {
                let params: ProjectIdParams = parse(params)?;
                let tasks_deleted = self.projects.delete_project(&params.project_id).await?;
                encode(json!({
                    "deleted": true,
                    "id": params.project_id,
                    "tasks_deleted": tasks_deleted
                }))
            }
            "list_tasks" => {
                let params: ListTasksParams = parse(params)?;
                let tasks = self.projects.list_tasks(params).await;
                encode(json!({ "tasks": tasks }))
            }
            "create_task" => {
                let params: CreateTaskParams = parse(params)?;
                encode_value(self.projects.create_task(params).await?)
            }
            "get_task" => {
                let params: TaskIdParams = parse(params)?;
                encode_value(self.projects.get_task(&params.task_id).await?)
            }
            "update_task" => {
                let params: UpdateTaskParams = parse(params)?;
                encode_value(self.projects.update_task(params).await?)
            }
            "delete_task" => {
                let params: TaskIdParams = parse(params)?;
                self.projects.delete_task(&params.task_id).await?;
                encode(json!({"deleted": true, "id": params.task_id}))
            }
            "request_planning" => {
                let params: RequestPlanningParams = parse(params)?;
                encode_value(self.planning.request_planning(params).await?)
            }
            "get_next_task" => {
                let params: RequestIdParams = parse(params)?;
                encode_value(self.planning.get_next_task(&params.request_id).await?)
            }
            "mark_task_done" => {
                let params: MarkTaskDoneParams = parse(params)?;
                encode_value(self.planning.mark_task_done(params).await?)
            }
            "approve_task_completion" => {
                let params: RequestTaskParams = parse(params)?;
                encode_value(
                    self.planning
                        .approve_task_completion(&params.request_id, &params.task_id)
                        .await?,
                )
            }
            "approve_request_completion" => {
                let params: RequestIdParams = parse(params)?;
                encode_value(
                    self.planning
                        .approve_request_completion(&params.request_id)
                        .await?,
                )
            }
            "add_tasks_to_request" => {
                let params: AddTasksParams = parse(params)?;
                encode_value(
                    self.planning
                        .add_tasks_to_request(&params.request_id, params.tasks)
                        .await?,
                )
            }
            "list_requests" => {
                let requests = self.planning.list_requests().await;
                encode(json!({ "requests": requests }))
            }
            "open_task_details" => {
                let params: PlanTaskIdParams = parse(params)?;
                encode_value(self.planning.open_task_details(&params.task_id).await)
            }
            "clear_all_data" => {
                let params: ClearParams = parse(params)?;
                self.planning.clear_all_data(&params.confirmation).await?;
                encode(json!({"cleared": true}))
            }
            other => Err(ToolError::unknown_tool(other)),
        }
    }
}

fn tool(name: &str, description: &str, parameters: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        parameters,
    }
}

fn schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

fn parse<T: serde::de::DeserializeOwned>(params: Value) -> std::result::Result<T, ToolError> {
    serde_json::from_value(params).map_err(|err| ToolError::invalid_params(err.to_string()))
}

fn encode_value<T: serde::Serialize>(value: T) -> ToolResult {
    serde_json::to_value(value).map_err(|err| ToolError {
        kind: ToolErrorKind::Internal,
        message: err.to_string(),
    })
}

fn encode(value: Value) -> ToolResult {
    Ok(value)
}
