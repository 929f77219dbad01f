pub mod ask;
pub mod chat;
pub mod upload;

use colored::Colorize;
use moe_core::session::Message;

/// Renders a bot entry to the terminal: upgrade prompts in yellow, error
/// bubbles in red, answers with their sources and footer metadata.
pub(crate) fn print_reply(message: &Message) {
    if message.upgrade_required {
        println!("{}", message.text.yellow());
        return;
    }
    if message.error {
        println!("{}", message.text.red());
        return;
    }

    for line in message.text.lines() {
        println!("{}", line.bright_blue());
    }
    if !message.sources.is_empty() {
        println!("{}", "Sources:".bright_black());
        for source in &message.sources {
            println!("{}", format!("  - {source}").bright_black());
        }
    }

    let mut footer = Vec::new();
    if let Some(model) = &message.model_used {
        footer.push(model.clone());
    }
    if message.is_cache_hit {
        footer.push("cached".to_string());
    }
    if let Some(id) = &message.answer_id {
        footer.push(format!("answer id: {id}"));
    }
    if !footer.is_empty() {
        println!("{}", footer.join(" | ").bright_black());
    }
}
