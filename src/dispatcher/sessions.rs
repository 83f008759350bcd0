use anyhow::{bail, Result};
use colored::Colorize;
use serde_json::json;

use crate::cli::{formatters, SessionCommands};
use importa::db::{self, StoredSession};

fn session_json(session: &StoredSession) -> serde_json::Value {
    json!({
        "id": session.id,
        "updated_at": session.updated_at,
        "inputs": session.inputs,
        "result": session.result,
    })
}

pub fn dispatch_session(action: SessionCommands, json_output: bool) -> Result<()> {
    let conn = db::init_database(None)?;

    match action {
        SessionCommands::Show { id } => {
            let Some(session) = db::get_session(&conn, &id)? else {
                bail!("Session '{}' not found", id);
            };

            if json_output {
                println!("{}", formatters::to_json(&session_json(&session)));
            } else {
                println!(
                    "{} Session {} (updated {})",
                    "ℹ".blue().bold(),
                    session.id,
                    session.updated_at.format("%d/%m/%Y %H:%M")
                );
                print!("{}", formatters::format_simulation(&session.result));
            }
        }
        SessionCommands::List => {
            let sessions = db::list_sessions(&conn)?;

            if json_output {
                let items: Vec<_> = sessions.iter().map(session_json).collect();
                println!("{}", formatters::to_json(&items));
            } else {
                print!("{}", formatters::format_sessions(&sessions));
            }
        }
        SessionCommands::Delete { id } => {
            if !db::delete_session(&conn, &id)? {
                bail!("Session '{}' not found", id);
            }

            if json_output {
                println!("{}", json!({ "id": id, "deleted": true }));
            } else {
                println!("{} Deleted session {}", "✓".green().bold(), id);
            }
        }
    }
    Ok(())
}
