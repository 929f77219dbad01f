use anyhow::Result;
use colored::Colorize;

use moe_api::QaApiClient;
use moe_core::session::{ConversationController, Sender, SubmitOutcome};

use super::print_reply;

/// Submits one question and prints the reply.
pub async fn run(controller: &ConversationController<QaApiClient>, question: &str) -> Result<()> {
    match controller.submit_query(question).await {
        SubmitOutcome::EmptyInput => {
            println!("{}", "Nothing to ask.".bright_black());
        }
        SubmitOutcome::Busy => {
            println!("{}", "Another question is still in flight.".yellow());
        }
        SubmitOutcome::Submitted => {
            let messages = controller.messages().await;
            match messages.iter().rev().find(|m| m.sender == Sender::Bot) {
                Some(reply) => print_reply(reply),
                None => println!("{}", "The request was cancelled.".yellow()),
            }
        }
    }
    Ok(())
}
