//! Prompt template rendering.
//!
//! All prompts in the pipeline are fixed f-string style templates
//! (`"Hello {name}"`) rendered through [`format_fstring`] with an explicit
//! variable map. Required variables are validated before rendering, so a
//! template/call-site mismatch fails fast instead of sending a half-filled
//! prompt to the provider.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::messages::Message;

/// Extract the variable names of an f-string template.
///
/// Finds all `{variable}` patterns, deduplicated in order of appearance.
#[must_use]
pub fn extract_fstring_variables(template: &str) -> Vec<String> {
    let re = regex::Regex::new(r"\{([^{}]+)\}");
    let mut variables = Vec::new();
    if let Ok(re) = re {
        for cap in re.captures_iter(template) {
            if let Some(var) = cap.get(1) {
                let name = var.as_str().to_string();
                if !variables.contains(&name) {
                    variables.push(name);
                }
            }
        }
    }
    variables
}

/// Render an f-string template with the given variables.
///
/// Every `{variable}` in the template must be present in `variables`;
/// a missing one is an [`Error::InvalidInput`]. Text outside braces is
/// copied through untouched, and an unmatched `{` is treated as literal.
pub fn format_fstring(template: &str, variables: &HashMap<String, String>) -> Result<String> {
    let mut result = String::with_capacity(template.len());
    let mut remaining = template;

    while let Some(start) = remaining.find('{') {
        result.push_str(&remaining[..start]);
        remaining = &remaining[start..];

        if let Some(end) = remaining.find('}') {
            let key = &remaining[1..end];
            match variables.get(key) {
                Some(value) => result.push_str(value),
                None => {
                    return Err(Error::invalid_input(format!(
                        "missing template variable '{key}'"
                    )))
                }
            }
            remaining = &remaining[end + 1..];
        } else {
            result.push('{');
            remaining = &remaining[1..];
        }
    }

    result.push_str(remaining);
    Ok(result)
}

/// Truncate a string to at most `max_chars` characters.
///
/// Counts characters rather than bytes, so multi-byte text is never split
/// mid-character. Used for the 1 token ≈ 4 characters context-window
/// heuristic.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

/// A question/answer prompt: system instructions, an optional one-shot
/// example, and a user input template.
///
/// Rendering produces the message sequence `[system, example user,
/// example assistant, user]`, omitting the example pair when absent.
#[derive(Debug, Clone)]
pub struct QaPromptTemplate {
    /// System prompt template
    pub system_prompt: String,
    /// Example user input, shown verbatim
    pub example_input: Option<String>,
    /// Example assistant output, shown verbatim
    pub example_output: Option<String>,
    /// User input template
    pub user_input_template: String,
}

impl QaPromptTemplate {
    /// Create a template without a one-shot example
    pub fn new(system_prompt: impl Into<String>, user_input_template: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            example_input: None,
            example_output: None,
            user_input_template: user_input_template.into(),
        }
    }

    /// Attach a one-shot example exchange
    #[must_use]
    pub fn with_example(mut self, input: impl Into<String>, output: impl Into<String>) -> Self {
        self.example_input = Some(input.into());
        self.example_output = Some(output.into());
        self
    }

    /// Render the template into a chat message sequence.
    pub fn to_messages(
        &self,
        system_vars: &HashMap<String, String>,
        user_vars: &HashMap<String, String>,
    ) -> Result<Vec<Message>> {
        let mut messages = vec![Message::system(format_fstring(
            &self.system_prompt,
            system_vars,
        )?)];

        if let (Some(input), Some(output)) = (&self.example_input, &self.example_output) {
            messages.push(Message::human(input.clone()));
            messages.push(Message::ai(output.clone()));
        }

        messages.push(Message::human(format_fstring(
            &self.user_input_template,
            user_vars,
        )?));

        Ok(messages)
    }
}

/// Build a single-entry variable map.
pub fn vars<const N: usize>(entries: [(&str, &str); N]) -> HashMap<String, String> {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
