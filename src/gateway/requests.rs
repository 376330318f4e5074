use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::Category;

pub const MAX_QUESTION_CHARS: usize = 2000;
pub const MAX_CONTEXT_CHARS: usize = 2000;
pub const MAX_TAG_INPUT_CHARS: usize = 5000;
pub const MAX_TOKENS_LIMIT: u32 = 4000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Default)]
struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    fn required(&mut self, field: &str, value: &str, max_chars: usize) {
        let len = value.trim().chars().count();
        if len == 0 {
            self.errors.push(FieldError::new(field, format!("{} is required", field)));
        } else if len > max_chars {
            self.errors.push(FieldError::new(
                field,
                format!("{} must be at most {} characters", field, max_chars),
            ));
        }
    }

    fn optional(&mut self, field: &str, value: Option<&str>, max_chars: usize) {
        if let Some(value) = value {
            if value.chars().count() > max_chars {
                self.errors.push(FieldError::new(
                    field,
                    format!("{} must be at most {} characters", field, max_chars),
                ));
            }
        }
    }

    fn sampling(&mut self, temperature: Option<f32>, max_tokens: Option<u32>) {
        if let Some(t) = temperature {
            if !(0.0..=2.0).contains(&t) {
                self.errors
                    .push(FieldError::new("temperature", "temperature must be between 0 and 2"));
            }
        }
        if let Some(m) = max_tokens {
            if m == 0 || m > MAX_TOKENS_LIMIT {
                self.errors.push(FieldError::new(
                    "maxTokens",
                    format!("maxTokens must be between 1 and {}", MAX_TOKENS_LIMIT),
                ));
            }
        }
    }

    fn parsed<T: std::str::FromStr>(&mut self, field: &str, value: Option<&str>, allowed: &[&str]) -> Option<T> {
        let raw = value?;
        match raw.parse::<T>() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                self.errors.push(FieldError::new(
                    field,
                    format!("{} must be one of: {}", field, allowed.join(", ")),
                ));
                None
            }
        }
    }

    fn finish<T>(self, value: T) -> Result<T, Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self.errors)
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    #[serde(default)]
    pub question: String,
    pub context: Option<String>,
    #[serde(default)]
    pub include_entries: bool,
    pub conversation_id: Option<Uuid>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl AskRequest {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut v = Validator::default();
        v.required("question", &self.question, MAX_QUESTION_CHARS);
        v.optional("context", self.context.as_deref(), MAX_CONTEXT_CHARS);
        v.sampling(self.temperature, self.max_tokens);
        v.finish(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionFocus {
    #[default]
    General,
    Title,
    Description,
    CulturalContext,
    Tags,
}

impl SuggestionFocus {
    pub const NAMES: [&'static str; 5] = ["general", "title", "description", "cultural_context", "tags"];
}

impl std::str::FromStr for SuggestionFocus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "general" => Ok(SuggestionFocus::General),
            "title" => Ok(SuggestionFocus::Title),
            "description" => Ok(SuggestionFocus::Description),
            "cultural_context" | "culturalcontext" => Ok(SuggestionFocus::CulturalContext),
            "tags" => Ok(SuggestionFocus::Tags),
            other => Err(format!("unknown suggestion focus '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    pub focus: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl SuggestionRequest {
    pub fn validate(&self) -> Result<SuggestionFocus, Vec<FieldError>> {
        let mut v = Validator::default();
        let focus = v.parsed::<SuggestionFocus>("focus", self.focus.as_deref(), &SuggestionFocus::NAMES);
        v.sampling(self.temperature, self.max_tokens);
        v.finish(focus.unwrap_or_default())
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TagRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: Option<String>,
    pub cultural_context: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl TagRequest {
    pub fn validate(&self) -> Result<Option<Category>, Vec<FieldError>> {
        let mut v = Validator::default();
        v.required("title", &self.title, 200);
        v.required("description", &self.description, MAX_TAG_INPUT_CHARS);
        v.optional("culturalContext", self.cultural_context.as_deref(), MAX_TAG_INPUT_CHARS);
        let names: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
        let category = v.parsed::<Category>("category", self.category.as_deref(), &names);
        v.sampling(self.temperature, self.max_tokens);
        v.finish(category)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl AnalysisRequest {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut v = Validator::default();
        v.sampling(self.temperature, self.max_tokens);
        v.finish(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_reports_every_invalid_field() {
        let request = AskRequest {
            question: "   ".into(),
            temperature: Some(2.5),
            max_tokens: Some(0),
            ..Default::default()
        };
        let errors = request.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["question", "temperature", "maxTokens"]);
    }

    #[test]
    fn ask_accepts_boundary_sampling_values() {
        let request = AskRequest {
            question: "What is gamelan?".into(),
            temperature: Some(2.0),
            max_tokens: Some(MAX_TOKENS_LIMIT),
            ..Default::default()
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn ask_rejects_overlong_question() {
        let request = AskRequest {
            question: "q".repeat(MAX_QUESTION_CHARS + 1),
            ..Default::default()
        };
        assert_eq!(request.validate().unwrap_err()[0].field, "question");
    }

    #[test]
    fn tag_category_must_be_enumerated() {
        let mut request = TagRequest {
            title: "Songket".into(),
            description: "Hand-woven brocade".into(),
            category: Some("Craft".into()),
            ..Default::default()
        };
        assert_eq!(request.validate().unwrap(), Some(Category::Craft));

        request.category = Some("spaceships".into());
        let errors = request.validate().unwrap_err();
        assert_eq!(errors[0].field, "category");
        assert!(errors[0].message.contains("folklore"));
    }

    #[test]
    fn suggestion_focus_defaults_to_general() {
        assert_eq!(SuggestionRequest::default().validate().unwrap(), SuggestionFocus::General);

        let request = SuggestionRequest {
            focus: Some("cultural_context".into()),
            ..Default::default()
        };
        assert_eq!(request.validate().unwrap(), SuggestionFocus::CulturalContext);

        let bad = SuggestionRequest {
            focus: Some("everything".into()),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
