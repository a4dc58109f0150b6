pub const GENERATE_PROMPT_TEMPLATE: &str = "Translate the following text {direction}. \
     Preserve meaning, lists and punctuation. Return only the translated text.\n\n{text}";

pub const SYSTEM_PROMPT_TEMPLATE: &str = "You are a translator. Translate the user's text {direction}. \
     Preserve meaning, lists and punctuation. \
     Output only the translated text without any explanations.";

/// Builds the single prompt sent to generate-style backends.
#[allow(clippy::literal_string_with_formatting_args)]
pub fn build_generate_prompt(source_language: Option<&str>, target_language: &str, text: &str) -> String {
    // {direction} and {text} are placeholders for string replacement, not format arguments
    GENERATE_PROMPT_TEMPLATE
        .replace("{direction}", &direction(source_language, target_language))
        .replace("{text}", text)
}

/// Builds the system prompt sent to chat-style backends.
#[allow(clippy::literal_string_with_formatting_args)]
pub fn build_system_prompt(source_language: Option<&str>, target_language: &str) -> String {
    SYSTEM_PROMPT_TEMPLATE.replace("{direction}", &direction(source_language, target_language))
}

fn direction(source_language: Option<&str>, target_language: &str) -> String {
    match source_language {
        Some(from) => format!("from {from} to {target_language}"),
        None => format!("to {target_language}"),
    }
}
