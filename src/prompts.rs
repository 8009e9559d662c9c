//! Prompt template for turning a paper into card JSON.
//!
//! Every prompt the pipeline sends is produced here by [`render_prompt`], a
//! pure string function, so the exact wording can be inspected in tests
//! without a model. Callers can swap the built-in template through
//! [`crate::config::CardConfig::prompt_template`].

use crate::schema::CardSchema;

/// Placeholder replaced with the cleaned paper text.
pub const PAPER_TEXT_PLACEHOLDER: &str = "{paper_text}";

/// Placeholder replaced with the enumerated schema fields.
pub const FIELDS_PLACEHOLDER: &str = "{fields}";

/// Built-in template.
pub const DEFAULT_TEMPLATE: &str = r#"I have a scientific paper, and I want to turn it into a series of engaging, easy-to-understand text chunks for a layman audience on social media.
Each chunk should be brief and suitable for being read on a card that people can swipe through.

Rules:
- Use simple language a non-scientist understands.
- Keep each field to no more than two sentences.
- Do not use markdown, code, bullet points, emojis or special characters. Plain sentences only.

Return a JSON object with exactly these keys:
{fields}

Here is the text of the scientific paper:
"""
{paper_text}
"""

Respond with ONLY the JSON object. Do not add any introduction, explanation or text before or after it."#;

/// Enumerate the schema as `- "key": description` lines.
pub fn render_fields(schema: &CardSchema) -> String {
    schema
        .fields()
        .iter()
        .map(|f| format!("- \"{}\": {}", f.key, f.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the built-in template for `cleaned_text`.
pub fn render_prompt(cleaned_text: &str, schema: &CardSchema) -> String {
    render_with_template(DEFAULT_TEMPLATE, cleaned_text, schema)
}

/// Render an arbitrary template.
///
/// `{fields}` is substituted before `{paper_text}` so paper text that happens
/// to contain the literal `{fields}` is left alone.
pub fn render_with_template(template: &str, cleaned_text: &str, schema: &CardSchema) -> String {
    template
        .replace(FIELDS_PLACEHOLDER, &render_fields(schema))
        .replace(PAPER_TEXT_PLACEHOLDER, cleaned_text)
}
