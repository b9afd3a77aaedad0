//! Structured prompt assembly.
//!
//! Shape: one system message (persona text, plus retrieved passages when
//! present), then the history turns in original order, then the current
//! question as the final user message.

use crate::core::llm::ChatMessage;
use crate::history::Turn;

pub fn assemble(
    persona: &str,
    context: &[String],
    history: &[Turn],
    question: &str,
) -> Vec<ChatMessage> {
    let mut system = persona.to_string();
    if !context.is_empty() {
        system.push_str("\n\nContext from local files:\n");
        system.push_str(&context.join("\n\n"));
    }

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system));
    for turn in history {
        messages.push(turn.to_chat_message());
    }
    messages.push(ChatMessage::user(question));
    messages
}
