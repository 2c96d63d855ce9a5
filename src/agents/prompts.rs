//! Prompt templates for the migration planning request.

use std::collections::BTreeSet;

use crate::models::{ExtractedContent, PlanRequest, TargetCloud};

/// Marks document boundaries inside the combined payload.
pub const DOCUMENT_SEPARATOR: &str = "\n\n---\n\n";

pub const SYSTEM_PROMPT: &str = "You are an Enterprise Cloud Migration Architect.
Produce a full migration strategy including:
- Cloud service mapping
- Migration phases
- Cost estimation
- Timeline
- Dependencies
- Risks & mitigations
- Final roadmap";

/// Build the request for one generation. Content is passed through as-is:
/// nothing is truncated or sanitized, so very large uploads reach the model
/// at full size.
pub fn assemble<'a>(
    items: impl IntoIterator<Item = &'a ExtractedContent>,
    context: &str,
    clouds: &BTreeSet<TargetCloud>,
    model: &str,
) -> PlanRequest {
    let combined_text = combine(items.into_iter().map(|c| c.normalized_text.as_str()));
    let user_prompt = user_prompt(&combined_text, context, clouds);

    PlanRequest {
        combined_text,
        user_context: context.to_string(),
        target_clouds: clouds.clone(),
        model_name: model.to_string(),
        system_prompt: SYSTEM_PROMPT.to_string(),
        user_prompt,
    }
}

pub fn combine<'a>(texts: impl IntoIterator<Item = &'a str>) -> String {
    texts.into_iter().collect::<Vec<_>>().join(DOCUMENT_SEPARATOR)
}

pub fn render_clouds(clouds: &BTreeSet<TargetCloud>) -> String {
    clouds.iter().map(|c| c.label()).collect::<Vec<_>>().join(", ")
}

fn user_prompt(combined_text: &str, context: &str, clouds: &BTreeSet<TargetCloud>) -> String {
    format!(
        "Input Data:\n{}\n\nBusiness Context:\n{}\n\nTarget Clouds: {}\n",
        combined_text,
        context,
        render_clouds(clouds)
    )
}
