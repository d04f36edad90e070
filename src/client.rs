//! Typed REST client
//!
//! Drives the server's plain HTTP surface (`GET /tools`, `POST /invoke`)
//! and wraps every tool in a typed method. Error responses surface the
//! server's `detail` message, mapped back onto the matching error variant.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::error::{PmAgentError, Result};
use crate::mcp::types::{InvokeResult, ListToolsResponse, ServerInfo, ToolDefinition};
use crate::store::planning::{
    MarkDoneOutcome, MarkTaskDoneParams, NewPlanTask, NextTask, PlanRequest, PlanTask,
    PlanningReceipt, RequestPlanningParams, RequestSummary, TaskDetails,
};
use crate::store::projects::{
    CreateProjectParams, CreateTaskParams, ListTasksParams, Project, Task, UpdateProjectParams,
    UpdateTaskParams,
};

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Deserialize)]
struct ProjectsEnvelope {
    projects: Vec<Project>,
}

#[derive(Deserialize)]
struct TasksEnvelope {
    tasks: Vec<Task>,
}

#[derive(Deserialize)]
struct RequestsEnvelope {
    requests: Vec<RequestSummary>,
}

#[derive(Deserialize)]
struct DetailBody {
    detail: String,
}

/// Client for the server's REST surface
#[derive(Debug)]
pub struct PmClient {
    http: reqwest::Client,
    base: Url,
}

impl PmClient {
    /// Create a client for the given base URL
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with an explicit request timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        // A trailing slash keeps Url::join from eating the last path segment
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base = Url::parse(&normalized)
            .map_err(|err| PmAgentError::Config(format!("invalid server URL: {err}")))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(PmAgentError::Http)?;
        Ok(Self { http, base })
    }

    /// Base URL this client talks to
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|err| PmAgentError::Config(format!("invalid endpoint path: {err}")).into())
    }

    /// `GET /` server identity
    pub async fn server_info(&self) -> Result<ServerInfo> {
        let response = self.http.get(self.base.clone()).send().await?;
        Ok(check(response).await?.json().await.map_err(PmAgentError::Http)?)
    }

    /// `GET /health`
    pub async fn health(&self) -> Result<()> {
        let response = self.http.get(self.endpoint("health")?).send().await?;
        check(response).await?;
        Ok(())
    }

    /// `GET /tools` tool catalog
    pub async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        let response = self.http.get(self.endpoint("tools")?).send().await?;
        let catalog: ListToolsResponse =
            check(response).await?.json().await.map_err(PmAgentError::Http)?;
        Ok(catalog.tools)
    }

    /// `POST /invoke` a tool by name
    pub async fn invoke(&self, name: &str, parameters: Value) -> Result<Value> {
        let response = self
            .http
            .post(self.endpoint("invoke")?)
            .json(&json!({"name": name, "parameters": parameters}))
            .send()
            .await?;
        let envelope: InvokeResult =
            check(response).await?.json().await.map_err(PmAgentError::Http)?;
        Ok(envelope.result)
    }

    async fn invoke_typed<T: serde::de::DeserializeOwned>(
        &self,
        name: &str,
        parameters: Value,
    ) -> Result<T> {
        let result = self.invoke(name, parameters).await?;
        serde_json::from_value(result).map_err(|err| {
            PmAgentError::Protocol(format!("malformed {name} result: {err}")).into()
        })
    }

    // Project tools

    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        let envelope: ProjectsEnvelope = self.invoke_typed("list_projects", json!({})).await?;
        Ok(envelope.projects)
    }

    pub async fn create_project(&self, params: CreateProjectParams) -> Result<Project> {
        self.invoke_typed("create_project", serde_json::to_value(params)?)
            .await
    }

    pub async fn get_project(&self, project_id: &str) -> Result<Project> {
        self.invoke_typed("get_project", json!({"project_id": project_id}))
            .await
    }

    pub async fn update_project(&self, params: UpdateProjectParams) -> Result<Project> {
        self.invoke_typed("update_project", serde_json::to_value(params)?)
            .await
    }

    pub async fn delete_project(&self, project_id: &str) -> Result<Value> {
        self.invoke("delete_project", json!({"project_id": project_id}))
            .await
    }

    pub async fn list_tasks(&self, filter: ListTasksParams) -> Result<Vec<Task>> {
        let envelope: TasksEnvelope = self
            .invoke_typed("list_tasks", serde_json::to_value(filter)?)
            .await?;
        Ok(envelope.tasks)
    }

    pub async fn create_task(&self, params: CreateTaskParams) -> Result<Task> {
        self.invoke_typed("create_task", serde_json::to_value(params)?)
            .await
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Task> {
        self.invoke_typed("get_task", json!({"task_id": task_id})).await
    }

    pub async fn update_task(&self, params: UpdateTaskParams) -> Result<Task> {
        self.invoke_typed("update_task", serde_json::to_value(params)?)
            .await
    }

    pub async fn delete_task(&self, task_id: &str) -> Result<Value> {
        self.invoke("delete_task", json!({"task_id": task_id})).await
    }

    // Planning tools

    pub async fn request_planning(&self, params: RequestPlanningParams) -> Result<PlanningReceipt> {
        self.invoke_typed("request_planning", serde_json::to_value(params)?)
            .await
    }

    pub async fn get_next_task(&self, request_id: &str) -> Result<NextTask> {
        self.invoke_typed("get_next_task", json!({"requestId": request_id}))
            .await
    }

    pub async fn mark_task_done(&self, params: MarkTaskDoneParams) -> Result<MarkDoneOutcome> {
        self.invoke_typed("mark_task_done", serde_json::to_value(params)?)
            .await
    }

    pub async fn approve_task_completion(
        &self,
        request_id: &str,
        task_id: &str,
    ) -> Result<PlanTask> {
        self.invoke_typed(
            "approve_task_completion",
            json!({"requestId": request_id, "taskId": task_id}),
        )
        .await
    }

    pub async fn approve_request_completion(&self, request_id: &str) -> Result<PlanRequest> {
        self.invoke_typed("approve_request_completion", json!({"requestId": request_id}))
            .await
    }

    pub async fn add_tasks_to_request(
        &self,
        request_id: &str,
        tasks: Vec<NewPlanTask>,
    ) -> Result<PlanningReceipt> {
        self.invoke_typed(
            "add_tasks_to_request",
            json!({"requestId": request_id, "tasks": tasks}),
        )
        .await
    }

    pub async fn list_requests(&self) -> Result<Vec<RequestSummary>> {
        let envelope: RequestsEnvelope = self.invoke_typed("list_requests", json!({})).await?;
        Ok(envelope.requests)
    }

    pub async fn open_task_details(&self, task_id: &str) -> Result<TaskDetails> {
        self.invoke_typed("open_task_details", json!({"taskId": task_id}))
            .await
    }

    pub async fn clear_all_data(&self, confirmation: &str) -> Result<Value> {
        self.invoke("clear_all_data", json!({"confirmation": confirmation}))
            .await
    }
}

/// Map non-success statuses onto error variants, keeping the `detail`
/// message the server sent.
async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let detail = match response.json::<DetailBody>().await {
        Ok(body) => body.detail,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };
    let err = match status.as_u16() {
        401 => PmAgentError::Authentication(detail),
        404 => PmAgentError::NotFound(detail),
        400 => PmAgentError::InvalidParams(detail),
        _ => PmAgentError::Tool(format!("HTTP {status}: {detail}")),
    };
    Err(err.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = PmClient::new("http://localhost:8080").unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8080/");
    }

    #[test]
    fn test_invalid_url_rejected() {
        let err = PmClient::new("not a url").unwrap_err();
        assert!(err.to_string().contains("invalid server URL"));
    }

    #[test]
    fn test_endpoint_join_preserves_path() {
        let client = PmClient::new("http://localhost:8080/api").unwrap();
        assert_eq!(
            client.endpoint("tools").unwrap().as_str(),
            "http://localhost:8080/api/tools"
        );
    }
}
