//! `pmagent tasks`

use crate::cli::TaskCommand;
use crate::config::Config;
use crate::error::Result;
use crate::store::projects::{CreateTaskParams, ListTasksParams, UpdateTaskParams};

pub async fn run_tasks(config: &Config, command: TaskCommand) -> Result<()> {
    let client = super::client(config)?;
    match command {
        TaskCommand::List { project, status } => {
            let tasks = client
                .list_tasks(ListTasksParams {
                    project_id: project,
                    status,
                })
                .await?;
            super::print_json(&tasks)
        }
        TaskCommand::Create {
            project_id,
            name,
            description,
            status,
            due_date,
            assignee,
        } => {
            let task = client
                .create_task(CreateTaskParams {
                    project_id,
                    name,
                    description,
                    status,
                    due_date,
                    assignee,
                })
                .await?;
            super::print_json(&task)
        }
        TaskCommand::Show { task_id } => {
            let task = client.get_task(&task_id).await?;
            super::print_json(&task)
        }
        TaskCommand::Update {
            task_id,
            name,
            description,
            status,
            due_date,
            assignee,
        } => {
            let task = client
                .update_task(UpdateTaskParams {
                    task_id,
                    name,
                    description,
                    status,
                    due_date,
                    assignee,
                })
                .await?;
            super::print_json(&task)
        }
        TaskCommand::Delete { task_id } => {
            let receipt = client.delete_task(&task_id).await?;
            super::print_json(&receipt)
        }
    }
}
