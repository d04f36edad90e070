//! Command-line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Project-management MCP server and client
#[derive(Parser, Debug, Default)]
#[command(name = "pmagent", version, about)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Server base URL for client commands
    #[arg(long, global = true, env = "PMAGENT_URL")]
    pub url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the MCP server
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,
        /// Bind port
        #[arg(long)]
        port: Option<u16>,
        /// Directory for the JSON data files
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Print the server's tool catalog
    Tools {
        /// Compact JSON output
        #[arg(long)]
        json: bool,
    },
    /// Invoke an arbitrary tool by name
    Invoke {
        /// Tool name
        name: String,
        /// Tool parameters as a JSON object
        #[arg(long)]
        params: Option<String>,
    },
    /// Manage projects
    Projects {
        #[command(subcommand)]
        command: ProjectCommand,
    },
    /// Manage project tasks
    Tasks {
        #[command(subcommand)]
        command: TaskCommand,
    },
    /// Drive the planning workflow
    Plan {
        #[command(subcommand)]
        command: PlanCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// List all projects
    List,
    /// Create a project
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Show one project
    Show { project_id: String },
    /// Update a project
    Update {
        project_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a project and its tasks
    Delete { project_id: String },
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// List tasks, optionally filtered
    List {
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    /// Create a task under a project
    Create {
        project_id: String,
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        due_date: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
    },
    /// Show one task
    Show { task_id: String },
    /// Update a task
    Update {
        task_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        due_date: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
    },
    /// Delete a task
    Delete { task_id: String },
}

#[derive(Subcommand, Debug)]
pub enum PlanCommand {
    /// Register a planning request
    New {
        /// The original request being planned
        request: String,
        /// Task title; repeat for each task
        #[arg(long = "task", required = true)]
        tasks: Vec<String>,
        /// How the request was split
        #[arg(long)]
        split_details: Option<String>,
    },
    /// Get the next unfinished task
    Next { request_id: String },
    /// Mark a task done
    Done {
        request_id: String,
        task_id: String,
        #[arg(long)]
        details: Option<String>,
    },
    /// Approve a completed task
    ApproveTask {
        request_id: String,
        task_id: String,
    },
    /// Approve a whole request
    ApproveRequest { request_id: String },
    /// Append tasks to a request
    Add {
        request_id: String,
        /// Task title; repeat for each task
        #[arg(long = "task", required = true)]
        tasks: Vec<String>,
    },
    /// List all planning requests
    List,
    /// Look up a planned task by id
    Show { task_id: String },
    /// Wipe all planning data
    Clear {
        /// Must be "CLEAR_ALL_MY_DATA"
        #[arg(long)]
        confirmation: String,
    },
}
