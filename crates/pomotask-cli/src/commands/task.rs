//! Task list commands for CLI.

use clap::Subcommand;
use pomotask_core::Database;

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task
    Add {
        /// Task title
        title: String,
    },
    /// List tasks in the order the timer falls back to them
    List {
        /// Include finished tasks
        #[arg(long)]
        all: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Mark a task as done
    Done {
        /// Task ID
        id: String,
    },
    /// Delete a task
    Remove {
        /// Task ID
        id: String,
    },
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        TaskAction::Add { title } => {
            let task = db.add_task(&title)?;
            eprintln!("Task created: {}", task.id);
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::List { all, json } => {
            let tasks = db.list_tasks(all)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
            } else if tasks.is_empty() {
                println!("no tasks");
            } else {
                for task in &tasks {
                    let mark = if task.done { "x" } else { " " };
                    println!("[{mark}] {}  {}", task.id, task.title);
                }
            }
        }
        TaskAction::Done { id } => {
            db.complete_task(&id)?;
            println!("Task done: {id}");
        }
        TaskAction::Remove { id } => {
            db.remove_task(&id)?;
            println!("Task deleted: {id}");
        }
    }
    Ok(())
}
