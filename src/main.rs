use anyhow::Result;
use clap::Parser;
use guro::cli::{Cli, Commands, PersonaAction};
use guro::{init, shutdown, utils};
use tokio::io::{self, AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    // Initialize the system
    init().await?;

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Ask {
            question,
            grade,
            session,
        } => handle_ask(question, grade, session).await,
        Commands::Stream {
            question,
            grade,
            session,
        } => handle_stream(question, grade, session).await,
        Commands::Chat { grade, session } => handle_chat(grade, session).await,
        Commands::Personas { action } => handle_personas(action).await,
        Commands::Ingest { file } => handle_ingest(file).await,
        Commands::Search { query, k } => handle_search(query, k).await,
        Commands::Health => handle_health(),
    };

    // Shutdown gracefully
    shutdown().await?;

    result
}

async fn handle_ask(
    question: String,
    grade: Option<String>,
    session: Option<String>,
) -> Result<()> {
    utils::print_info("Asking Guro...");

    let reply = guro::ask_in_session(question, grade, session).await?;

    println!("\n{}", reply.answer);
    Ok(())
}

async fn handle_stream(
    question: String,
    grade: Option<String>,
    session: Option<String>,
) -> Result<()> {
    guro::ask_stream(question, grade, session, |fragment| {
        utils::print_fragment(&fragment);
    })
    .await?;

    println!();
    Ok(())
}

async fn handle_chat(grade: Option<String>, session: String) -> Result<()> {
    utils::print_header("Guro Tutoring Session");
    if let Some(grade) = &grade {
        utils::print_info(&format!("Grade level: {}", grade));
    }
    utils::print_info(&format!("Session: {}", session));
    utils::print_info("Type your questions (Ctrl+C to exit)\n");

    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin);

    loop {
        utils::print_prompt("You: ");
        let mut input = String::new();
        if reader.read_line(&mut input).await? == 0 {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        utils::print_info("Guro: ");
        guro::ask_stream(input, grade.clone(), Some(session.clone()), |fragment| {
            utils::print_fragment(&fragment);
        })
        .await?;
        println!("\n");
    }

    Ok(())
}

async fn handle_personas(action: PersonaAction) -> Result<()> {
    match action {
        PersonaAction::List => {
            let personas = guro::personas::list().await?;
            if personas.is_empty() {
                utils::print_info("No personas stored");
                return Ok(());
            }
            for (grade_level, description) in personas {
                utils::print_success(&grade_level);
                println!("  {}", description);
            }
        }
        PersonaAction::Set {
            grade_level,
            description,
        } => {
            guro::personas::save(&grade_level, &description).await?;
            utils::print_success(&format!("Successfully saved {}", grade_level));
        }
        PersonaAction::Delete { grade_level } => {
            guro::personas::delete(&grade_level).await?;
            utils::print_success(&format!("Deleted {}", grade_level));
        }
    }
    Ok(())
}

async fn handle_ingest(file: String) -> Result<()> {
    utils::print_info(&format!("Ingesting {}...", file));

    let text = tokio::fs::read_to_string(&file).await?;
    let chunks = guro::documents::ingest(&text).await?;

    utils::print_success(&format!("Indexed {} chunks from {}", chunks, file));
    Ok(())
}

async fn handle_search(query: String, k: usize) -> Result<()> {
    let passages = guro::documents::search(&query, k).await?;

    if passages.is_empty() {
        utils::print_info("No context available (no index built yet?)");
        return Ok(());
    }

    for (i, passage) in passages.iter().enumerate() {
        utils::print_success(&format!("--- Passage {} ---", i + 1));
        println!("{}", passage);
    }
    Ok(())
}

fn handle_health() -> Result<()> {
    let status = guro::health::status();
    if status.healthy {
        utils::print_success(&format!("Status: {}", status.reason));
    } else {
        utils::print_error(&format!("Status: {}", status.reason));
    }
    Ok(())
}
