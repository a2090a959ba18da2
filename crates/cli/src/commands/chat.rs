//! `promptwright chat`: Interactive or single-message mode.

use promptwright_config::AppConfig;
use promptwright_core::session::{Session, SessionId};
use promptwright_orchestrator::{Orchestrator, TurnOutcome};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::serve::print_missing_key_help;

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Check for the API key before building anything
    if !config.has_api_key() {
        print_missing_key_help();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider = promptwright_providers::build_from_config(&config)?;
    let orchestrator = Orchestrator::from_config(provider, &config);
    let mut session = Session::new(SessionId::new());

    if let Some(msg) = message {
        // Single message mode: one clarifying round.
        eprint!("  Thinking...");
        let outcome = orchestrator.handle_turn(&mut session, &msg).await;
        eprint!("\r              \r");
        println!("{}", render(&outcome?));
        return Ok(());
    }

    println!();
    println!("  Promptwright — Interactive Mode");
    println!();
    println!("  Model:     {}", config.default_model);
    println!("  Provider:  {}", config.provider.name);
    println!();
    println!("  Describe what you need. The assistant will ask a few questions,");
    println!("  then summarize, pick a persona and answer.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt_marker()?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }
        if line.is_empty() {
            prompt_marker()?;
            continue;
        }

        eprint!("  ...");
        let outcome = orchestrator.handle_turn(&mut session, line).await;
        eprint!("\r     \r");

        match outcome {
            Ok(outcome) => {
                println!();
                println!("{}", render(&outcome));
                println!();
            }
            Err(e) => {
                tracing::debug!(error = %e, "Turn failed");
                eprintln!("  [Error] {}", e.public_message());
                println!();
            }
        }

        prompt_marker()?;
    }

    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}

fn prompt_marker() -> std::io::Result<()> {
    use std::io::Write;
    print!("  You > ");
    std::io::stdout().flush()
}

/// Format an outcome for the terminal.
fn render(outcome: &TurnOutcome) -> String {
    match outcome {
        TurnOutcome::Clarification { response } => prefixed("Assistant > ", response),
        TurnOutcome::Finalized {
            summary,
            final_response,
        } => format!(
            "  ── Summary & persona ──\n{}\n\n  ── Final response ──\n{}",
            prefixed("  ", summary),
            prefixed("  ", final_response)
        ),
    }
}

fn prefixed(prefix: &str, text: &str) -> String {
    text.lines()
        .map(|line| format!("  {prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
