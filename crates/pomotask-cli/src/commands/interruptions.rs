use clap::Subcommand;
use pomotask_core::Database;

#[derive(Subcommand)]
pub enum InterruptionsAction {
    /// List recorded interruptions, newest first
    List {
        /// Maximum number of entries
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

pub fn run(action: InterruptionsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        InterruptionsAction::List { limit } => {
            let interruptions = db.list_interruptions(limit)?;
            println!("{}", serde_json::to_string_pretty(&interruptions)?);
        }
    }
    Ok(())
}
