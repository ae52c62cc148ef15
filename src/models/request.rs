use serde_json::{Map, Value};

use crate::error::{AppError, Result};

pub const INVALID_BODY: &str = "Invalid JSON or missing request body";
pub const MISSING_USER_ID: &str = "Missing userId";
pub const MISSING_APP_ID: &str = "Missing appId";
pub const MISSING_KEYWORDS: &str = "Missing keywords for story generation";

/// The fields of an invocation body. Non-string values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoryRequest {
    pub keywords: Option<String>,
    pub user_id: Option<String>,
    pub app_id: Option<String>,
    pub feedback_type: Option<String>,
}

/// Who the stored preferences belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub user_id: String,
    pub app_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoryAction {
    Feedback { owner: Owner, feedback_type: String },
    Generate { owner: Owner, keywords: String },
}

impl StoryRequest {
    /// A missing body, invalid JSON, `null`, a non-object or an empty object are all rejected
    /// the same way.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        if body.is_empty() {
            return Err(AppError::Validation(INVALID_BODY.into()));
        }
        let parsed: Value =
            serde_json::from_slice(body).map_err(|_| AppError::Validation(INVALID_BODY.into()))?;
        match parsed {
            Value::Object(fields) if !fields.is_empty() => Ok(Self {
                keywords: string_field(&fields, "keywords"),
                user_id: string_field(&fields, "userId"),
                app_id: string_field(&fields, "appId"),
                feedback_type: string_field(&fields, "feedbackType"),
            }),
            _ => Err(AppError::Validation(INVALID_BODY.into())),
        }
    }

    /// Validates in a fixed order: user, app, then keywords unless this is a feedback call.
    pub fn into_action(self) -> Result<StoryAction> {
        let user_id = non_empty(self.user_id)
            .ok_or_else(|| AppError::Validation(MISSING_USER_ID.into()))?;
        let app_id =
            non_empty(self.app_id).ok_or_else(|| AppError::Validation(MISSING_APP_ID.into()))?;
        let owner = Owner { user_id, app_id };

        if let Some(feedback_type) = non_empty(self.feedback_type) {
            return Ok(StoryAction::Feedback { owner, feedback_type });
        }

        let keywords = non_empty(self.keywords.map(|k| k.trim().to_string()))
            .ok_or_else(|| AppError::Validation(MISSING_KEYWORDS.into()))?;
        Ok(StoryAction::Generate { owner, keywords })
    }
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(Value::as_str).map(String::from)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
