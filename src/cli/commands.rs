use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "heritage-ai", version, about = "Cultural heritage AI gateway", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override the config file path globally
    #[arg(short, long, global = true, default_value = "config.yaml")]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    Serve,

    /// Ask a single question on behalf of a user
    Ask {
        /// The user the question is asked as
        #[arg(short, long)]
        user: String,

        /// Continue an existing conversation
        #[arg(long)]
        conversation: Option<Uuid>,

        /// Include the user's published entries as reference context
        #[arg(long)]
        include_entries: bool,

        question: String,
    },

    /// Manage stored conversations
    Conversation {
        #[command(subcommand)]
        action: ConversationAction,
    },

    /// Manage reference entries
    Entry {
        #[command(subcommand)]
        action: EntryAction,
    },

    /// Show which AI provider is configured
    Status,
}

#[derive(Subcommand)]
pub enum ConversationAction {
    /// List a user's conversations
    List {
        #[arg(short, long)]
        user: String,
    },

    /// Print a conversation with all of its messages
    Show {
        #[arg(short, long)]
        user: String,
        id: Uuid,
    },

    /// Delete a conversation
    Delete {
        #[arg(short, long)]
        user: String,
        /// Act as an administrator (may delete any conversation)
        #[arg(long)]
        admin: bool,
        id: Uuid,
    },

    /// Export a conversation to a .txt file
    Export {
        #[arg(short, long)]
        user: String,
        id: Uuid,
        /// The path to the output file (optional)
        #[arg(short, long)]
        path: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum EntryAction {
    /// Add an entry owned by a user
    Add {
        #[arg(short, long)]
        user: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "other")]
        category: String,
        #[arg(long)]
        cultural_context: Option<String>,
        #[arg(long)]
        country: Option<String>,
        /// Mark the entry as published
        #[arg(long)]
        published: bool,
    },

    /// List a user's entries
    List {
        #[arg(short, long)]
        user: String,
    },
}
