/// Instruction prefix used when `SUMMARY_SYSTEM_PROMPT` is not set.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that writes concise, faithful summaries. \
Summarize the following text in a few sentences, keeping key facts, names and numbers. \
Do not add information that is not in the text.";

/// Maximum number of characters kept from a configured system prompt
pub const MAX_SYSTEM_PROMPT_LEN: usize = 2000;

/// Removes control characters (except newlines and tabs) and hard-truncates
/// to `MAX_SYSTEM_PROMPT_LEN` characters.
#[must_use]
pub fn sanitize_system_prompt(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|&c| c == '\n' || c == '\t' || !c.is_control())
        .take(MAX_SYSTEM_PROMPT_LEN)
        .collect()
}

/// Composes the instruction prefix with the user's text.
///
/// Without a prefix the text is passed through untouched, which is the
/// "direct" completion call; with one, the prefix and text are joined by a
/// single newline.
#[must_use]
pub fn compose_prompt(system_prompt: Option<&str>, text: &str) -> String {
    match system_prompt.filter(|p| !p.trim().is_empty()) {
        Some(prefix) => format!("{prefix}\n{text}"),
        None => text.to_string(),
    }
}
