// Prompts sent ahead of the text being enhanced.

/// Used when the caller supplies no prompt of its own.
pub const DEFAULT_PROMPT: &str =
    "Enhance the following text to make it more professional and impactful for a resume:";

/// Prompt naming the field being enhanced, e.g. "description" or "skills".
pub fn field_prompt(field_name: &str) -> String {
    format!(
        "Enhance the following {field_name} text to make it more professional and impactful for a resume:"
    )
}

/// Field-specific prompt for prose fields, the generic prompt for anything else
/// (names, phone numbers, dates).
pub fn prompt_for_field(field_name: &str) -> String {
    const PROSE_FIELDS: [&str; 9] = [
        "description",
        "content",
        "skills",
        "position",
        "degree",
        "title",
        "technologies",
        "company",
        "institution",
    ];
    if PROSE_FIELDS.contains(&field_name) {
        field_prompt(field_name)
    } else {
        DEFAULT_PROMPT.to_string()
    }
}

/// The caller's prompt if it has any content, else `fallback`.
pub fn choose_prompt(custom: Option<&str>, fallback: impl FnOnce() -> String) -> String {
    match custom.map(str::trim) {
        Some(prompt) if !prompt.is_empty() => prompt.to_string(),
        _ => fallback(),
    }
}
