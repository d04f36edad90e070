//! Project and task store
//!
//! CRUD over projects and their tasks, persisted as JSON files
//! (`projects.json`, `tasks.json`) under the data directory. The whole
//! state is rewritten on every mutation; the files are small and this
//! keeps them readable and diffable.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{PmAgentError, Result};

const PROJECTS_FILE: &str = "projects.json";
const TASKS_FILE: &str = "tasks.json";

/// Default status assigned to new tasks
pub const DEFAULT_TASK_STATUS: &str = "TODO";

/// A project
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A task belonging to a project
///
/// `status` is an opaque label; no state machine is enforced beyond the
/// `"TODO"` default on creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub project_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for `create_project`
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateProjectParams {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Parameters for `update_project`
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateProjectParams {
    pub project_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Parameters for `create_task`
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTaskParams {
    pub project_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
}

/// Parameters for `update_task`
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateTaskParams {
    pub task_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
}

/// Task list filter
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListTasksParams {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct State {
    projects: Vec<Project>,
    tasks: Vec<Task>,
}

/// File-backed project store
#[derive(Debug)]
pub struct ProjectStore {
    dir: PathBuf,
    state: Mutex<State>,
}

impl ProjectStore {
    /// Open a store rooted at `dir`, loading any existing data files
    ///
    /// Missing files mean an empty store; corrupt files are an error.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let state = State {
            projects: load_file(&dir.join(PROJECTS_FILE))?,
            tasks: load_file(&dir.join(TASKS_FILE))?,
        };
        tracing::debug!(
            projects = state.projects.len(),
            tasks = state.tasks.len(),
            dir = %dir.display(),
            "project store loaded"
        );
        Ok(Self {
            dir,
            state: Mutex::new(state),
        })
    }

    fn persist(&self, state: &State) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        save_file(&self.dir.join(PROJECTS_FILE), &state.projects)?;
        save_file(&self.dir.join(TASKS_FILE), &state.tasks)?;
        Ok(())
    }

    /// All projects, in creation order
    pub async fn list_projects(&self) -> Vec<Project> {
        self.state.lock().await.projects.clone()
    }

    /// Create a project
    pub async fn create_project(&self, params: CreateProjectParams) -> Result<Project> {
        if params.name.trim().is_empty() {
            return Err(PmAgentError::InvalidParams("project name must not be empty".to_string()).into());
        }
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4().to_string(),
            name: params.name,
            description: params.description,
            created_at: now,
            updated_at: now,
        };
        let mut state = self.state.lock().await;
        state.projects.push(project.clone());
        self.persist(&state)?;
        tracing::info!(project_id = %project.id, name = %project.name, "project created");
        Ok(project)
    }

    /// Fetch a project by id
    pub async fn get_project(&self, project_id: &str) -> Result<Project> {
        self.state
            .lock()
            .await
            .projects
            .iter()
            .find(|p| p.id == project_id)
            .cloned()
            .ok_or_else(|| PmAgentError::NotFound(format!("project {project_id}")).into())
    }

    /// Update a project's name and/or description
    pub async fn update_project(&self, params: UpdateProjectParams) -> Result<Project> {
        let mut state = self.state.lock().await;
        let project = state
            .projects
            .iter_mut()
            .find(|p| p.id == params.project_id)
            .ok_or_else(|| PmAgentError::NotFound(format!("project {}", params.project_id)))?;
        if let Some(name) = params.name {
            if name.trim().is_empty() {
                return Err(
                    PmAgentError::InvalidParams("project name must not be empty".to_string()).into(),
                );
            }
            project.name = name;
        }
        if let Some(description) = params.description {
            project.description = Some(description);
        }
        project.updated_at = Utc::now();
        let updated = project.clone();
        self.persist(&state)?;
        Ok(updated)
    }

    /// Delete a project and all of its tasks
    ///
    /// Returns the number of cascade-deleted tasks.
    pub async fn delete_project(&self, project_id: &str) -> Result<usize> {
        let mut state = self.state.lock().await;
        let before = state.projects.len();
        state.projects.retain(|p| p.id != project_id);
        if state.projects.len() == before {
            return Err(PmAgentError::NotFound(format!("project {project_id}")).into());
        }
        let task_count = state.tasks.iter().filter(|t| t.project_id == project_id).count();
        state.tasks.retain(|t| t.project_id != project_id);
        self.persist(&state)?;
        tracing::info!(project_id, task_count, "project deleted");
        Ok(task_count)
    }

    /// Tasks, optionally filtered by project and/or status
    pub async fn list_tasks(&self, params: ListTasksParams) -> Vec<Task> {
        self.state
            .lock()
            .await
            .tasks
            .iter()
            .filter(|t| {
                params
                    .project_id
                    .as_deref()
                    .map_or(true, |p| t.project_id == p)
                    && params.status.as_deref().map_or(true, |s| t.status == s)
            })
            .cloned()
            .collect()
    }

    /// Create a task under an existing project
    pub async fn create_task(&self, params: CreateTaskParams) -> Result<Task> {
        if params.name.trim().is_empty() {
            return Err(PmAgentError::InvalidParams("task name must not be empty".to_string()).into());
        }
        let mut state = self.state.lock().await;
        if !state.projects.iter().any(|p| p.id == params.project_id) {
            return Err(PmAgentError::NotFound(format!("project {}", params.project_id)).into());
        }
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4().to_string(),
            project_id: params.project_id,
            name: params.name,
            description: params.description,
            status: params.status.unwrap_or_else(|| DEFAULT_TASK_STATUS.to_string()),
            due_date: params.due_date,
            assignee: params.assignee,
            created_at: now,
            updated_at: now,
        };
        state.tasks.push(task.clone());
        self.persist(&state)?;
        tracing::info!(task_id = %task.id, project_id = %task.project_id, "task created");
        Ok(task)
    }

    /// Fetch a task by id
    pub async fn get_task(&self, task_id: &str) -> Result<Task> {
        self.state
            .lock()
            .await
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .cloned()
            .ok_or_else(|| PmAgentError::NotFound(format!("task {task_id}")).into())
    }

    /// Update a task's fields
    pub async fn update_task(&self, params: UpdateTaskParams) -> Result<Task> {
        let mut state = self.state.lock().await;
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.id == params.task_id)
            .ok_or_else(|| PmAgentError::NotFound(format!("task {}", params.task_id)))?;
        if let Some(name) = params.name {
            if name.trim().is_empty() {
                return Err(
                    PmAgentError::InvalidParams("task name must not be empty".to_string()).into(),
                );
            }
            task.name = name;
        }
        if let Some(description) = params.description {
            task.description = Some(description);
        }
        if let Some(status) = params.status {
            task.status = status;
        }
        if let Some(due_date) = params.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(assignee) = params.assignee {
            task.assignee = Some(assignee);
        }
        task.updated_at = Utc::now();
        let updated = task.clone();
        self.persist(&state)?;
        Ok(updated)
    }

    /// Delete a task
    pub async fn delete_task(&self, task_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let before = state.tasks.len();
        state.tasks.retain(|t| t.id != task_id);
        if state.tasks.len() == before {
            return Err(PmAgentError::NotFound(format!("task {task_id}")).into());
        }
        self.persist(&state)?;
        Ok(())
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

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn store() -> (ProjectStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = ProjectStore::open(dir.path()).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_create_and_list_projects() {
        let (store, _dir) = store().await;
        let project = store
            .create_project(CreateProjectParams {
                name: "website".to_string(),
                description: Some("marketing site".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(project.name, "website");

        let projects = store.list_projects().await;
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, project.id);
    }

    #[tokio::test]
    async fn test_create_project_rejects_empty_name() {
        let (store, _dir) = store().await;
        let err = store
            .create_project(CreateProjectParams {
                name: "  ".to_string(),
                description: None,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[tokio::test]
    async fn test_get_missing_project_is_not_found() {
        let (store, _dir) = store().await;
        let err = store.get_project("nope").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PmAgentError>(),
            Some(PmAgentError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_task_requires_project() {
        let (store, _dir) = store().await;
        let err = store
            .create_task(CreateTaskParams {
                project_id: "missing".to_string(),
                name: "design".to_string(),
                description: None,
                status: None,
                due_date: None,
                assignee: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PmAgentError>(),
            Some(PmAgentError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_task_defaults_to_todo() {
        let (store, _dir) = store().await;
        let project = store
            .create_project(CreateProjectParams {
                name: "website".to_string(),
                description: None,
            })
            .await
            .unwrap();
        let task = store
            .create_task(CreateTaskParams {
                project_id: project.id,
                name: "design".to_string(),
                description: None,
                status: None,
                due_date: None,
                assignee: None,
            })
            .await
            .unwrap();
        assert_eq!(task.status, DEFAULT_TASK_STATUS);
    }

    #[tokio::test]
    async fn test_delete_project_cascades_tasks() {
        let (store, _dir) = store().await;
        let project = store
            .create_project(CreateProjectParams {
                name: "website".to_string(),
                description: None,
            })
            .await
            .unwrap();
        for name in ["design", "build"] {
            store
                .create_task(CreateTaskParams {
                    project_id: project.id.clone(),
                    name: name.to_string(),
                    description: None,
                    status: None,
                    due_date: None,
                    assignee: None,
                })
                .await
                .unwrap();
        }

        let removed = store.delete_project(&project.id).await.unwrap();
        assert_eq!(removed, 2);
        assert!(store.list_tasks(ListTasksParams::default()).await.is_empty());
    }

    #[tokio::test]
    async fn test_list_tasks_filters_by_status() {
        let (store, _dir) = store().await;
        let project = store
            .create_project(CreateProjectParams {
                name: "website".to_string(),
                description: None,
            })
            .await
            .unwrap();
        let task = store
            .create_task(CreateTaskParams {
                project_id: project.id.clone(),
                name: "design".to_string(),
                description: None,
                status: None,
                due_date: None,
                assignee: Some("sam".to_string()),
            })
            .await
            .unwrap();
        store
            .update_task(UpdateTaskParams {
                task_id: task.id.clone(),
                name: None,
                description: None,
                status: Some("DONE".to_string()),
                due_date: None,
                assignee: None,
            })
            .await
            .unwrap();

        let done = store
            .list_tasks(ListTasksParams {
                project_id: Some(project.id.clone()),
                status: Some("DONE".to_string()),
            })
            .await;
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].assignee.as_deref(), Some("sam"));

        let todo = store
            .list_tasks(ListTasksParams {
                project_id: Some(project.id),
                status: Some(DEFAULT_TASK_STATUS.to_string()),
            })
            .await;
        assert!(todo.is_empty());
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = tempdir().unwrap();
        let project_id = {
            let store = ProjectStore::open(dir.path()).unwrap();
            let project = store
                .create_project(CreateProjectParams {
                    name: "website".to_string(),
                    description: None,
                })
                .await
                .unwrap();
            project.id
        };

        let store = ProjectStore::open(dir.path()).unwrap();
        let project = store.get_project(&project_id).await.unwrap();
        assert_eq!(project.name, "website");
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(PROJECTS_FILE), "{not json").unwrap();
        let err = ProjectStore::open(dir.path()).unwrap_err();
        assert!(err.to_string().contains("corrupt data file"));
    }
}
