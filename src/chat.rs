// Chat session with a fine-tuned model. The conversation lives only in
// memory for the duration of one session and grows without bound; the
// whole history is sent on every turn.

use anyhow::Result;
use crossterm::style::Stylize;
use tracing::debug;

use crate::api::{ChatMessage, FineTuningService, Role};
use crate::console::Console;
use crate::selection::is_exit;

/// System message every conversation starts with.
pub const CHAT_SYSTEM_PROMPT: &str =
    "I am here to help you work with your EMC models through robust physics software!";

const SEPARATOR_WIDTH: usize = 70;

/// Ordered, role-tagged message history.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Default for Conversation {
    fn default() -> Self {
        Conversation::new(CHAT_SYSTEM_PROMPT)
    }
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Conversation {
            messages: vec![ChatMessage::new(Role::System, system_prompt)],
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::new(Role::User, content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::new(Role::Assistant, content));
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }
}

/// Talk to `model` until the user types "exit". Returns the final
/// conversation.
pub fn run_session<S, C>(service: &S, console: &mut C, model: &str) -> Result<Conversation>
where
    S: FineTuningService + ?Sized,
    C: Console,
{
    let mut convo = Conversation::default();
    let prompt_label = format!(
        "{} (type 'exit' and press Enter to exit)",
        "User prompt".underlined()
    );

    loop {
        console.say(&format!("\n{}", "-".repeat(SEPARATOR_WIDTH)));
        let prompt = console.read_line(&prompt_label)?;
        if is_exit(&prompt) {
            break;
        }

        convo.push_user(prompt);
        debug!(model, turns = convo.messages().len(), "sending conversation");
        let replies = console.busy("Waiting for the model...", || {
            service.chat_completion(model, convo.messages(), 1)
        })?;

        console.say("");
        for reply in replies {
            console.say(&format!("{} {}", "Model response:".underlined(), reply));
            convo.push_assistant(reply);
        }
    }

    console.say("Exiting conversation.");
    Ok(convo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_conversation_holds_only_the_seed() {
        let convo = Conversation::default();
        assert_eq!(convo.messages().len(), 1);
        assert_eq!(convo.messages()[0].role, Role::System);
        assert_eq!(convo.messages()[0].content, CHAT_SYSTEM_PROMPT);
    }

    #[test]
    fn buffer_grows_by_two_per_exchange_and_alternates() {
        let mut convo = Conversation::new("seed");
        for k in 1..=4 {
            convo.push_user(format!("q{}", k));
            convo.push_assistant(format!("a{}", k));
            assert_eq!(convo.messages().len(), 1 + 2 * k);
        }
        for (i, msg) in convo.messages().iter().enumerate().skip(1) {
            let expected = if i % 2 == 1 { Role::User } else { Role::Assistant };
            assert_eq!(msg.role, expected);
        }
    }
}
