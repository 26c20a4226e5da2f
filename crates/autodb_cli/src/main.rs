//! CLI smoke entry point.
//!
//! # Responsibility
//! - Bootstrap a file database through `autodb_core` and touch its demo table.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `autodb_cli [note text...]`. Settings come from `AUTODB_*`
//! variables; `AUTODB_LOG_DIR` turns on file logging.

mod notebook;

use autodb_core::{AutoDbEngine, DbConfig, ListQuery, OrderBy};
use log::info;
use notebook::entities::Note;
use notebook::NotebookContext;
use std::error::Error;
use std::process::ExitCode;

const ENV_LOG_DIR: &str = "AUTODB_LOG_DIR";
const LATEST_NOTES: i64 = 5;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("autodb_cli error={err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    if let Ok(log_dir) = std::env::var(ENV_LOG_DIR) {
        autodb_core::init_logging(autodb_core::default_log_level(), &log_dir)?;
    }

    let config = DbConfig::from_env()?;
    println!("autodb_core version={}", autodb_core::core_version());
    println!("database={}", config.path.display());

    let engine = AutoDbEngine::builder(NotebookContext::new(config))?;
    let notes = engine
        .repository::<Note>()
        .ok_or("notes repository was not registered")?;

    let body = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if !body.trim().is_empty() {
        let note = Note::new(body.trim());
        notes.add(Some(&note))?;
        info!("event=cli_add_note module=cli status=ok id={}", note.id);
        println!("added id={}", note.id);
    }

    let listing = notes
        .get_list_from_db(
            ListQuery::new()
                .order_by(OrderBy::desc("created_at_ms"))
                .page(0, LATEST_NOTES),
        )
        .await?;
    println!("notes total={}", listing.total);
    for note in &listing.items {
        println!("{} {}", note.id, note.body);
    }

    engine.dispose();
    Ok(())
}
