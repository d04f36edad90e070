//! `pmagent plan`

use crate::cli::PlanCommand;
use crate::config::Config;
use crate::error::Result;
use crate::store::planning::{MarkTaskDoneParams, NewPlanTask, RequestPlanningParams};

fn to_plan_tasks(titles: Vec<String>) -> Vec<NewPlanTask> {
    titles
        .into_iter()
        .map(|title| NewPlanTask {
            title,
            description: String::new(),
        })
        .collect()
}

pub async fn run_plan(config: &Config, command: PlanCommand) -> Result<()> {
    let client = super::client(config)?;
    match command {
        PlanCommand::New {
            request,
            tasks,
            split_details,
        } => {
            let receipt = client
                .request_planning(RequestPlanningParams {
                    original_request: request,
                    tasks: to_plan_tasks(tasks),
                    split_details,
                })
                .await?;
            super::print_json(&receipt)
        }
        PlanCommand::Next { request_id } => {
            let next = client.get_next_task(&request_id).await?;
            super::print_json(&next)
        }
        PlanCommand::Done {
            request_id,
            task_id,
            details,
        } => {
            let outcome = client
                .mark_task_done(MarkTaskDoneParams {
                    request_id,
                    task_id,
                    completed_details: details,
                })
                .await?;
            super::print_json(&outcome)
        }
        PlanCommand::ApproveTask {
            request_id,
            task_id,
        } => {
            let task = client.approve_task_completion(&request_id, &task_id).await?;
            super::print_json(&task)
        }
        PlanCommand::ApproveRequest { request_id } => {
            let request = client.approve_request_completion(&request_id).await?;
            super::print_json(&request)
        }
        PlanCommand::Add { request_id, tasks } => {
            let receipt = client
                .add_tasks_to_request(&request_id, to_plan_tasks(tasks))
                .await?;
            super::print_json(&receipt)
        }
        PlanCommand::List => {
            let requests = client.list_requests().await?;
            super::print_json(&requests)
        }
        PlanCommand::Show { task_id } => {
            let details = client.open_task_details(&task_id).await?;
            super::print_json(&details)
        }
        PlanCommand::Clear { confirmation } => {
            let receipt = client.clear_all_data(&confirmation).await?;
            super::print_json(&receipt)
        }
    }
}
