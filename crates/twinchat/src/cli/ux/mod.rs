mod presenter;
mod progress;

pub use presenter::{ChatMessageType, format_footer, format_prompt, format_turn, style_chat_text};
pub use progress::GenerationSpinner;

use console::style;

/// Prints a formatted error message, with its causes, to stderr.
pub fn present_error(error: anyhow::Error) {
    let error_text = style("ERROR:").red().bold();
    eprintln!("\n{error_text} {error:#}");
}
