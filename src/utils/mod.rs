use tiktoken_rs::{o200k_base, CoreBPE};
use tracing::warn;

use crate::clients::openai::types::Message;

fn bpe() -> Option<CoreBPE> {
    match o200k_base() {
        Ok(bpe) => Some(bpe),
        Err(e) => {
            warn!("Tokenizer unavailable, skipping token estimate: {}", e);
            None
        }
    }
}

pub fn count_text_tokens(text: &str) -> Option<usize> {
    let bpe = bpe()?;
    Some(bpe.encode_with_special_tokens(text).len())
}

/// Prompt-side token estimate for when the service omits its usage object.
pub fn count_chat_tokens(messages: &[Message]) -> Option<usize> {
    let bpe = bpe()?;
    let mut num_tokens = 0;
    for message in messages {
        num_tokens += 4; // Every message follows <|start|>{role/name}\n{content}<|end|>\n
        num_tokens += bpe.encode_with_special_tokens(&message.role).len();
        num_tokens += bpe.encode_with_special_tokens(&message.content).len();
    }
    num_tokens += 3; // Every reply is primed with <|start|>assistant<|message|>
    Some(num_tokens)
}

/// First `max_chars` characters, with an ellipsis when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= max_chars {
        return single_line;
    }
    let cut: String = single_line.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}
