use anyhow::Result;
use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use moe_api::QaApiClient;
use moe_core::session::{
    ConversationController, Sender, SubmitOutcome, VoteDirection, VoteOutcome,
};

use super::print_reply;

/// Runs the interactive chat REPL.
///
/// Lines are submitted as questions; `:vote <answer-id> <up|down>` rates a
/// previous answer, `quit` or Ctrl-D exits. In-flight work is cancelled on
/// exit so teardown never leaves a dangling request.
pub async fn run(controller: &ConversationController<QaApiClient>) -> Result<()> {
    let capabilities = controller.context().capabilities();

    let mut rl = DefaultEditor::new()?;

    println!("{}", "=== Moe Chat ===".bright_magenta().bold());
    println!(
        "{}",
        format!(
            "{} | Model: {}",
            capabilities.quota_label, capabilities.model_label
        )
        .bright_black()
    );
    println!(
        "{}",
        "Type ':vote <answer-id> <up|down>' to rate an answer, 'quit' to exit.".bright_black()
    );
    println!();

    loop {
        match rl.readline("moe> ") {
            Ok(line) => {
                let trimmed = line.trim();

                if trimmed == "quit" || trimmed == "exit" {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }
                if trimmed.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(&line);

                if let Some(rest) = trimmed.strip_prefix(":vote") {
                    handle_vote(controller, rest).await;
                    continue;
                }

                match controller.submit_query(trimmed).await {
                    SubmitOutcome::Submitted => {
                        let messages = controller.messages().await;
                        if let Some(reply) = messages.iter().rev().find(|m| m.sender == Sender::Bot)
                        {
                            print_reply(reply);
                        }
                    }
                    SubmitOutcome::Busy => {
                        println!("{}", "Still working on the previous question.".yellow());
                    }
                    SubmitOutcome::EmptyInput => {}
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {err:?}").red());
                break;
            }
        }
    }

    controller.context().shutdown();
    Ok(())
}

async fn handle_vote(controller: &ConversationController<QaApiClient>, rest: &str) {
    let Some((answer_id, direction)) = parse_vote(rest) else {
        println!("{}", "Usage: :vote <answer-id> <up|down>".bright_black());
        return;
    };

    match controller.submit_vote(answer_id, direction).await {
        VoteOutcome::Recorded => {
            println!("{}", "Thanks for the feedback!".green());
        }
        VoteOutcome::LocalOnly => {
            // Backend failures are not surfaced; the local vote stands
            println!("{}", "Thanks for the feedback!".green());
        }
        VoteOutcome::UnknownAnswer => {
            println!("{}", format!("No answer with id '{answer_id}'.").yellow());
        }
    }
}

fn parse_vote(rest: &str) -> Option<(&str, VoteDirection)> {
    let mut parts = rest.split_whitespace();
    let answer_id = parts.next()?;
    let direction = match parts.next()? {
        "up" => VoteDirection::Up,
        "down" => VoteDirection::Down,
        _ => return None,
    };
    if parts.next().is_some() {
        return None;
    }
    Some((answer_id, direction))
}
