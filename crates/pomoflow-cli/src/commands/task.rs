//! Task management commands for CLI.

use clap::Subcommand;
use pomoflow_core::{AppConfig, TaskPatch, ToggleOutcome};

use crate::session;

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task
    Add {
        /// Task title
        title: String,
        /// Estimated pomodoros (1-10)
        #[arg(long, default_value = "1")]
        estimate: u32,
    },
    /// List tasks in order
    List {
        /// Only tasks that are not completed
        #[arg(long)]
        open: bool,
    },
    /// Edit a task
    Edit {
        /// Task ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New estimate
        #[arg(long)]
        estimate: Option<u32>,
    },
    /// Remove a task
    Remove {
        /// Task ID
        id: String,
    },
    /// Flip a task between open and completed
    Toggle {
        /// Task ID
        id: String,
    },
    /// Select the task that receives pomodoro credit
    Select {
        /// Task ID; omit to clear the selection
        id: Option<String>,
    },
    /// Reorder tasks; every task ID must be given exactly once
    Reorder {
        /// Task IDs in their new order
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

pub fn run(action: TaskAction, config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = session::open(config);

    match action {
        TaskAction::Add { title, estimate } => {
            let task = app.add_task(&title, estimate)?;
            eprintln!("Task created: {}", task.id);
            session::print_json(&task)?;
        }
        TaskAction::List { open } => {
            let tasks: Vec<_> = app
                .tasks()
                .tasks()
                .iter()
                .filter(|t| !open || !t.is_completed)
                .collect();
            session::print_json(&tasks)?;
        }
        TaskAction::Edit {
            id,
            title,
            estimate,
        } => {
            let task = app.edit_task(
                &id,
                TaskPatch {
                    title,
                    estimated_pomodoros: estimate,
                },
            )?;
            session::print_json(&task)?;
        }
        TaskAction::Remove { id } => {
            let task = app.remove_task(&id)?;
            eprintln!("Task removed: {}", task.id);
        }
        TaskAction::Toggle { id } => match app.toggle_task(&id)? {
            ToggleOutcome::Completed => eprintln!("Task completed: {id}"),
            ToggleOutcome::Reopened => eprintln!("Task reopened: {id}"),
        },
        TaskAction::Select { id } => {
            app.select_task(id.as_deref())?;
            match id {
                Some(id) => eprintln!("Selected: {id}"),
                None => eprintln!("Selection cleared"),
            }
        }
        TaskAction::Reorder { ids } => {
            app.reorder_tasks(&ids)?;
            session::print_json(&app.tasks().tasks())?;
        }
    }
    Ok(())
}
