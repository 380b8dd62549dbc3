//! Terminal entry point: line-oriented session loop for Campus Companion.
//!
//! The loop is a thin driver: read a line, hand it to the dialogue engine,
//! print the reply. After every fallback-answered turn a teach-back prompt
//! lets the user persist a new question/answer pair.

use campus_core::{CoreConfig, DialogueEngine, KnowledgeStore, SessionContext, TurnOutcome};
use campus_llm::{GeminiClient, LlmMode};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        eprintln!("campus-cli: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = CoreConfig::load()?;
    let ctx = SessionContext::new();
    tracing::info!(
        target: "campus::session",
        session = %ctx.session_id,
        app = %config.app_name,
        llm_mode = %config.llm_mode,
        "session starting"
    );

    let store = KnowledgeStore::new(&config.knowledge_path);
    let model = GeminiClient::new(LlmMode::from_config(&config.llm_mode));
    // A malformed or missing knowledge base is fatal: better to fail loudly
    // than to silently start with an empty one.
    let mut engine = DialogueEngine::open(
        store,
        model,
        config.match_threshold,
        config.exit_token.clone(),
    )?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Bot: Hello, how can I help you?");

    loop {
        prompt("You: ")?;
        let Some(line) = lines.next_line().await? else {
            break; // EOF ends the session like the exit token
        };
        let input = line.trim().to_string();
        if input.is_empty() {
            continue;
        }

        match engine.handle(&input).await {
            TurnOutcome::Exit => {
                println!(
                    "Bot: Okay. Let me know if you need help with anything else. Have a productive day!"
                );
                break;
            }
            TurnOutcome::Local { answer, .. } => println!("Bot: {answer}"),
            TurnOutcome::Unavailable { reply } => println!("Bot: {reply}"),
            TurnOutcome::Fallback { reply } => {
                println!("Bot: {reply}");
                prompt("Would you like to teach me this answer? (yes/no): ")?;
                let Some(choice) = lines.next_line().await? else {
                    break;
                };
                if !choice.trim().eq_ignore_ascii_case("yes") {
                    continue;
                }
                prompt("Please provide the answer: ")?;
                let Some(answer) = lines.next_line().await? else {
                    break;
                };
                let answer = answer.trim();
                if answer.is_empty() {
                    println!("Bot: No answer given, so I'll leave my notes unchanged.");
                    continue;
                }
                match engine.teach(&input, answer) {
                    Ok(()) => println!("Bot: Thank you! I learned a new response!"),
                    Err(e) => {
                        tracing::warn!(
                            target: "campus::session",
                            error = %e,
                            "teach-back could not be persisted"
                        );
                        println!(
                            "Bot: I'll remember that for this session, but I couldn't save it: {e}"
                        );
                    }
                }
            }
        }
    }

    Ok(())
}

fn prompt(text: &str) -> std::io::Result<()> {
    print!("{text}");
    std::io::stdout().flush()
}
