use console::{Style, StyledObject};
use std::time::Duration;
use twinchat_core::session::{Role, Session, Turn};

/// Represents the type of a chat message, used for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMessageType {
    /// The prompt for user input.
    Prompt,
    /// Connecting words in the prompt line.
    PromptMeta,
    User,
    Assistant,
    /// Footer information, like timing or session stats.
    Footer,
    /// A non fatal problem shown inline.
    Warning,
    /// An error message.
    Error,
}

/// Styles a string of text according to the specified `ChatMessageType`.
pub fn style_chat_text(text: &str, style: ChatMessageType) -> StyledObject<&str> {
    let style_obj = match style {
        ChatMessageType::Prompt => Style::new().blue().bold(),
        ChatMessageType::PromptMeta => Style::new().blue(),
        ChatMessageType::User => Style::new().cyan().bold(),
        ChatMessageType::Assistant => Style::new().green().bold(),
        ChatMessageType::Footer => Style::new().white().dim(),
        ChatMessageType::Warning => Style::new().yellow(),
        ChatMessageType::Error => Style::new().red().bold(),
    };
    style_obj.apply_to(text)
}

/// Renders a turn as a header line with time and speaker, followed by its text.
pub fn format_turn(turn: &Turn) -> String {
    let (speaker, style) = match turn.role {
        Role::User => ("You", ChatMessageType::User),
        Role::Assistant => (
            turn.model_name.as_deref().unwrap_or("Assistant"),
            ChatMessageType::Assistant,
        ),
    };
    let header = format!("[{}] {speaker}:", turn.timestamp);
    format!("{}\n{}", style_chat_text(&header, style), turn.content)
}

/// Input prompt: `@<backend> on <model>` over a `> ` marker.
pub fn format_prompt(backend: &str, model: &str) -> String {
    let meta = [
        style_chat_text("@", ChatMessageType::Prompt).to_string(),
        style_chat_text(backend, ChatMessageType::Prompt).to_string(),
        style_chat_text(" on ", ChatMessageType::PromptMeta).to_string(),
        style_chat_text(model, ChatMessageType::Prompt).to_string(),
    ]
    .join("");
    format!(
        "\n{}\n{}",
        meta,
        style_chat_text("> ", ChatMessageType::Prompt)
    )
}

/// Footer printed after an exchange.
pub fn format_footer(elapsed: Duration, session: &Session) -> String {
    let footer = format!(
        "◼ Completed. {:.2}s total. {} messages. ~{} tokens.",
        elapsed.as_secs_f32(),
        session.message_count(),
        session.token_estimate()
    );
    style_chat_text(&footer, ChatMessageType::Footer).to_string()
}
