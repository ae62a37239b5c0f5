//! Prompt construction from an agent's declarative reasoning block.

use crate::models::ReasoningConfig;
use serde_json::Value;

/// User message when a trigger fires without any input text.
pub const DEFAULT_USER_PROMPT: &str = "Proceed according to your role and goals.";

/// Build the system/user prompt pair. The system message concatenates
/// the role line, goals block, rules block, and serialized context, in
/// that order, skipping sections whose source is empty. Deterministic by
/// construction.
pub fn build_prompt(
    reasoning: &ReasoningConfig,
    input: Option<&str>,
    context: Option<&Value>,
) -> (String, String) {
    let mut sections = Vec::new();
    if !reasoning.role.trim().is_empty() {
        sections.push(format!("Role: {}", reasoning.role));
    }
    if !reasoning.goals.trim().is_empty() {
        sections.push(format!("Goals:\n{}", reasoning.goals));
    }
    if !reasoning.rules.trim().is_empty() {
        sections.push(format!("Rules:\n{}", reasoning.rules));
    }
    if let Some(context) = context {
        if !context.is_null() {
            sections.push(format!("Context:\n{context}"));
        }
    }
    let system = sections.join("\n\n");

    let user = input
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_USER_PROMPT.to_string());

    (system, user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reasoning(role: &str, goals: &str, rules: &str) -> ReasoningConfig {
        ReasoningConfig {
            role: role.to_string(),
            goals: goals.to_string(),
            rules: rules.to_string(),
            llm_provider: None,
            llm_model: None,
        }
    }

    #[test]
    fn empty_sections_are_omitted() {
        let (system, user) = build_prompt(&reasoning("R", "G", ""), Some("hello"), None);
        assert_eq!(system, "Role: R\n\nGoals:\nG");
        assert_eq!(user, "hello");
    }

    #[test]
    fn all_sections_in_order() {
        let context = json!({"url": "https://example.test"});
        let (system, _) = build_prompt(&reasoning("R", "G", "No lists"), None, Some(&context));
        assert_eq!(
            system,
            format!("Role: R\n\nGoals:\nG\n\nRules:\nNo lists\n\nContext:\n{context}")
        );
    }

    #[test]
    fn missing_input_uses_the_generic_instruction() {
        let (_, user) = build_prompt(&reasoning("R", "G", ""), None, None);
        assert_eq!(user, DEFAULT_USER_PROMPT);

        let (_, blank) = build_prompt(&reasoning("R", "G", ""), Some("   "), None);
        assert_eq!(blank, DEFAULT_USER_PROMPT);
    }

    #[test]
    fn construction_is_deterministic() {
        let block = reasoning("R", "G", "Rules");
        let first = build_prompt(&block, Some("go"), None);
        let second = build_prompt(&block, Some("go"), None);
        assert_eq!(first, second);
    }
}
