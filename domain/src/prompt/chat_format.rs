//! ChatML prompt formatting for engines that take a single prompt string.

use crate::session::entities::{ConversationTurn, Role};

pub const IM_START: &str = "<|im_start|>";
pub const IM_END: &str = "<|im_end|>";

/// Render turns as ChatML and prime the assistant reply.
///
/// Unknown roles never reach here; system turns use the `system` tag.
pub fn format_chatml(turns: &[ConversationTurn]) -> String {
    let mut prompt = String::new();
    for turn in turns {
        let tag = match turn.role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        };
        prompt.push_str(&format!("{IM_START}{tag}\n{}{IM_END}\n", turn.content));
    }
    prompt.push_str(IM_START);
    prompt.push_str("assistant\n");
    prompt
}

/// Drop an echoed prompt prefix from decoded engine output.
pub fn strip_prompt_echo<'a>(decoded: &'a str, prompt: &str) -> &'a str {
    decoded.strip_prefix(prompt).unwrap_or(decoded)
}

/// Cut generated text at the end-of-turn marker, if any.
pub fn trim_end_of_turn(text: &str) -> &str {
    match text.find(IM_END) {
        Some(idx) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_chatml() {
        let turns = vec![
            ConversationTurn::system("rubric"),
            ConversationTurn::user("patient 1"),
            ConversationTurn::assistant("<think>x</think>"),
        ];
        assert_eq!(
            format_chatml(&turns),
            "<|im_start|>system\nrubric<|im_end|>\n\
<|im_start|>user\npatient 1<|im_end|>\n\
<|im_start|>assistant\n<think>x</think><|im_end|>\n\
<|im_start|>assistant\n"
        );
    }

    #[test]
    fn test_empty_turns_only_prime() {
        assert_eq!(format_chatml(&[]), "<|im_start|>assistant\n");
    }

    #[test]
    fn test_strip_prompt_echo() {
        assert_eq!(strip_prompt_echo("PROMPT<answer>a</answer>", "PROMPT"), "<answer>a</answer>");
        assert_eq!(strip_prompt_echo("<answer>a</answer>", "PROMPT"), "<answer>a</answer>");
    }

    #[test]
    fn test_trim_end_of_turn() {
        assert_eq!(trim_end_of_turn("<answer>a</answer><|im_end|>\n"), "<answer>a</answer>");
        assert_eq!(trim_end_of_turn("no marker"), "no marker");
    }
}
