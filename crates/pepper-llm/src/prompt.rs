use pepper_types::{Role, Turn};

/// Renders `history` followed by the new user message as a single prompt.
///
/// Each turn becomes one `User: ...` or `Assistant: ...` line in order, and
/// the prompt ends with an open `Assistant:` cue for the model to complete.
pub fn build_prompt(user_message: &str, history: &[Turn]) -> String {
    let mut prompt = String::new();
    for turn in history {
        let speaker = match turn.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        prompt.push_str(speaker);
        prompt.push_str(": ");
        prompt.push_str(&turn.text);
        prompt.push('\n');
    }
    prompt.push_str("User: ");
    prompt.push_str(user_message);
    prompt.push_str("\nAssistant:");
    prompt
}
