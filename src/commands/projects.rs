//! `pmagent projects`

use crate::cli::ProjectCommand;
use crate::config::Config;
use crate::error::Result;
use crate::store::projects::{CreateProjectParams, UpdateProjectParams};

pub async fn run_projects(config: &Config, command: ProjectCommand) -> Result<()> {
    let client = super::client(config)?;
    match command {
        ProjectCommand::List => {
            let projects = client.list_projects().await?;
            super::print_json(&projects)
        }
        ProjectCommand::Create { name, description } => {
            let project = client
                .create_project(CreateProjectParams { name, description })
                .await?;
            super::print_json(&project)
        }
        ProjectCommand::Show { project_id } => {
            let project = client.get_project(&project_id).await?;
            super::print_json(&project)
        }
        ProjectCommand::Update {
            project_id,
            name,
            description,
        } => {
            let project = client
                .update_project(UpdateProjectParams {
                    project_id,
                    name,
                    description,
                })
                .await?;
            super::print_json(&project)
        }
        ProjectCommand::Delete { project_id } => {
            let receipt = client.delete_project(&project_id).await?;
            super::print_json(&receipt)
        }
    }
}
