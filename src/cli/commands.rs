use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "guro")]
#[command(author, version, about = "Conversational tutoring backend", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask a single question and wait for the full answer
    Ask {
        question: String,

        /// Grade-level persona to answer as
        #[arg(short, long)]
        grade: Option<String>,

        /// Conversation session to continue
        #[arg(long)]
        session: Option<String>,
    },

    /// Ask a single question and stream the answer as it is generated
    Stream {
        question: String,

        #[arg(short, long)]
        grade: Option<String>,

        #[arg(long)]
        session: Option<String>,
    },

    /// Start an interactive tutoring session
    Chat {
        #[arg(short, long)]
        grade: Option<String>,

        /// Session ID (default: "default")
        #[arg(long, default_value = "default")]
        session: String,
    },

    /// Manage grade-level personas
    Personas {
        #[command(subcommand)]
        action: PersonaAction,
    },

    /// Index a text document for retrieval context
    Ingest {
        /// Path to a plain-text document
        file: String,
    },

    /// Query the retrieval index directly
    Search {
        query: String,

        #[arg(short, long, default_value = "2")]
        k: usize,
    },

    /// Show the current health gate reading
    Health,
}

#[derive(Subcommand)]
pub enum PersonaAction {
    /// List all personas
    List,

    /// Create or update a persona
    Set {
        grade_level: String,
        description: String,
    },

    /// Delete a persona
    Delete { grade_level: String },
}
