use crate::db::models::{Category, Entry};
use crate::gateway::requests::SuggestionFocus;

pub const TITLE_MAX_CHARS: usize = 50;

pub const SYSTEM_PROMPT: &str = "You are a knowledgeable assistant for a cultural heritage platform. \
You help people document, understand and share traditions, crafts, cuisine, music, dance, \
festivals, architecture, languages and folklore from communities around the world.

Guidelines:
- Be accurate and respectful of every culture you discuss.
- Prefer the community's own names and terms, with a short explanation.
- Say plainly when you are unsure or when practices vary between regions.
- Do not invent sources, dates or people.
- Keep answers focused and readable; use short paragraphs or lists.";

/// Conversation title derived from the first question.
pub fn conversation_title(question: &str) -> String {
    let question = question.trim();
    if question.chars().count() <= TITLE_MAX_CHARS {
        return question.to_string();
    }
    let mut title: String = question.chars().take(TITLE_MAX_CHARS).collect();
    title.push_str("...");
    title
}

pub fn ask_prompt(question: &str, extra_context: Option<&str>, references: &str) -> String {
    let mut prompt = String::new();

    if let Some(context) = extra_context.map(str::trim).filter(|c| !c.is_empty()) {
        prompt.push_str("Additional context from the user:\n");
        prompt.push_str(context);
        prompt.push_str("\n\n");
    }

    if !references.is_empty() {
        prompt.push_str("Relevant entries from the user's own collection:\n");
        prompt.push_str(references);
        prompt.push('\n');
    }

    prompt.push_str("Question: ");
    prompt.push_str(question.trim());
    prompt
}

fn describe_entry(entry: &Entry) -> String {
    let mut text = format!(
        "Title: {}\nCategory: {}\nDescription: {}\n",
        entry.title, entry.category, entry.description
    );
    if let Some(context) = entry.cultural_context.as_deref().filter(|c| !c.trim().is_empty()) {
        text.push_str(&format!("Cultural context: {}\n", context));
    }
    if let Some(country) = entry.country.as_deref().filter(|c| !c.trim().is_empty()) {
        text.push_str(&format!("Country: {}\n", country));
    }
    text
}

pub fn suggestion_prompt(entry: &Entry, focus: SuggestionFocus) -> String {
    let task = match focus {
        SuggestionFocus::General => {
            "Suggest concrete improvements to this entry: missing details, clearer wording, \
             and cultural background worth adding."
        }
        SuggestionFocus::Title => "Suggest three alternative titles that are clear, accurate and respectful.",
        SuggestionFocus::Description => {
            "Suggest an improved description that keeps the author's facts and voice \
             but is clearer and more complete."
        }
        SuggestionFocus::CulturalContext => {
            "Suggest cultural and historical context that would help readers from other \
             communities understand this entry."
        }
        SuggestionFocus::Tags => "Suggest relevant tags for this entry with a one-line reason for each.",
    };

    format!("Here is a cultural heritage entry:\n\n{}\n{}", describe_entry(entry), task)
}

pub fn tags_prompt(title: &str, description: &str, category: Option<Category>, cultural_context: Option<&str>) -> String {
    let mut prompt = format!("Title: {}\n", title.trim());
    if let Some(category) = category {
        prompt.push_str(&format!("Category: {}\n", category));
    }
    prompt.push_str(&format!("Description: {}\n", description.trim()));
    if let Some(context) = cultural_context.map(str::trim).filter(|c| !c.is_empty()) {
        prompt.push_str(&format!("Cultural context: {}\n", context));
    }
    prompt.push_str(
        "\nGenerate up to 15 short, relevant tags for this cultural heritage content. \
         Respond with the tags only, separated by commas, without numbering or explanations.",
    );
    prompt
}

pub fn analysis_prompt(entry: &Entry) -> String {
    format!(
        "Analyze the cultural significance of the following heritage entry.\n\n{}\n\
         Cover its historical background, its role in the community today, related practices \
         in other regions, and any preservation concerns.",
        describe_entry(entry)
    )
}
