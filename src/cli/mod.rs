pub mod commands;

use std::io::Write;
use thiserror::Error;

use crate::api::middleware::{AuthUser, Role};
use crate::cli::commands::{Commands, ConversationAction, EntryAction};
use crate::config::AppConfig;
use crate::db::{
    self,
    models::{Category, NewEntry},
    service::DbService,
    StoreError,
};
use crate::gateway::{requests::AskRequest, Gateway, GatewayError};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to load config: {0}")]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Invalid(String),
}

impl From<duckdb::Error> for CliError {
    fn from(e: duckdb::Error) -> Self {
        CliError::Store(StoreError::Database(e))
    }
}

pub async fn run_cli(command: Commands, config_path: &str) -> Result<(), CliError> {
    let config = AppConfig::load(config_path)?;

    match command {
        Commands::Serve => Err(CliError::Invalid(
            "serve is handled by the HTTP server entrypoint".to_string(),
        )),
        Commands::Status => {
            let gateway = Gateway::from_config(&config)?;
            let status = gateway.status();
            let conversations = {
                let conn = db::lock(gateway.pool())?;
                DbService::count_conversations(&conn)?
            };
            match (status.provider, status.model) {
                (Some(provider), Some(model)) => println!("AI available: {} ({})", provider, model),
                _ => println!("AI unavailable: no provider configured"),
            }
            println!("Stored conversations: {}", conversations);
            Ok(())
        }
        Commands::Ask {
            user,
            conversation,
            include_entries,
            question,
        } => {
            let gateway = Gateway::from_config(&config)?;
            let caller = AuthUser::new(user, Role::User);
            let request = AskRequest {
                question,
                include_entries,
                conversation_id: conversation,
                ..Default::default()
            };

            let answer = gateway.ask(&caller, request).await.map_err(|e| match e {
                GatewayError::Validation(errors) => CliError::Invalid(
                    errors
                        .into_iter()
                        .map(|e| e.message)
                        .collect::<Vec<_>>()
                        .join("; "),
                ),
                other => other.into(),
            })?;

            println!("{}", answer.answer);
            println!();
            println!("Conversation: {} ({} / {})", answer.conversation_id, answer.provider, answer.model);
            Ok(())
        }
        Commands::Conversation { action } => run_conversation(action, &config),
        Commands::Entry { action } => run_entry(action, &config),
    }
}

fn run_conversation(action: ConversationAction, config: &AppConfig) -> Result<(), CliError> {
    let gateway = Gateway::from_config(config)?;

    match action {
        ConversationAction::List { user } => {
            let conversations = gateway.list_conversations(&AuthUser::new(user, Role::User), 50, 0)?;
            if conversations.is_empty() {
                println!("No conversations found.");
            } else {
                println!("{:<38} | {:<8} | {}", "ID", "Messages", "Title");
                println!("{:-<38}-+-{:-<8}-+-{:-<20}", "", "", "");
                for c in conversations {
                    println!(
                        "{:<38} | {:<8} | {}",
                        c.conversation.id.to_string(),
                        c.message_count,
                        c.conversation.title
                    );
                }
            }
        }
        ConversationAction::Show { user, id } => {
            let detail = gateway.get_conversation(&AuthUser::new(user, Role::User), id)?;
            println!("{} ({})", detail.conversation.title, detail.conversation.id);
            for m in detail.messages {
                println!("\n[{}] {}", m.role.as_str().to_uppercase(), m.content);
            }
        }
        ConversationAction::Delete { user, admin, id } => {
            let role = if admin { Role::Admin } else { Role::User };
            gateway.delete_conversation(&AuthUser::new(user, role), id)?;
            println!("Deleted conversation {}", id);
        }
        ConversationAction::Export { user, id, path } => {
            let export = gateway.export_conversation(&AuthUser::new(user, Role::User), id)?;
            let export_path = path.unwrap_or_else(|| format!("conversation_{}.txt", id));
            let mut file = std::fs::File::create(&export_path)?;
            file.write_all(export.as_bytes())?;
            println!("Conversation exported successfully to: {}", export_path);
        }
    }

    Ok(())
}

fn run_entry(action: EntryAction, config: &AppConfig) -> Result<(), CliError> {
    let pool = db::get_connection(&config.database)?;
    let conn = db::lock(&pool)?;

    match action {
        EntryAction::Add {
            user,
            title,
            description,
            category,
            cultural_context,
            country,
            published,
        } => {
            let category = category.parse::<Category>().map_err(CliError::Invalid)?;
            let entry = DbService::insert_entry(
                &conn,
                &NewEntry {
                    owner_id: user,
                    title,
                    description,
                    cultural_context,
                    category,
                    country,
                    published,
                },
            )?;
            println!("Created entry: {} ({})", entry.title, entry.id);
        }
        EntryAction::List { user } => {
            let entries = DbService::list_entries(&conn, &user)?;
            if entries.is_empty() {
                println!("No entries found.");
            } else {
                println!("{:<38} | {:<12} | {:<9} | {}", "ID", "Category", "Published", "Title");
                println!("{:-<38}-+-{:-<12}-+-{:-<9}-+-{:-<20}", "", "", "", "");
                for e in entries {
                    println!(
                        "{:<38} | {:<12} | {:<9} | {}",
                        e.id.to_string(),
                        e.category.as_str(),
                        e.published,
                        e.title
                    );
                }
            }
        }
    }

    Ok(())
}
