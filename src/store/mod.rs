//! Domain stores and the tool registry
//!
//! - `projects`: project/task CRUD with JSON-file persistence
//! - `planning`: the plan / work / approve request workflow
//! - `registry`: the tool catalog and dispatch layer the server exposes

pub mod planning;
pub mod projects;
pub mod registry;

pub use planning::PlanningManager;
pub use projects::ProjectStore;
pub use registry::{ToolError, ToolErrorKind, ToolRegistry};
