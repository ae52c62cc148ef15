use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::document::DocValue;

pub const DEFAULT_TONE: &str = "neutral";
pub const FALLBACK_LENGTH_IN_WORDS: u32 = 150;

/// Intermediate result that guides story writing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryPlan {
    pub tone: String,
    pub plot_outline: String,
    /// Expected between 100 and 200; taken as the model gives it. Models sometimes send
    /// `150.0` or `"150"`, so any non-negative number or numeric string is accepted and rounded.
    #[serde(deserialize_with = "lenient_word_count")]
    pub length_in_words: u32,
}

impl StoryPlan {
    /// Deterministic plan used whenever the planner's reply cannot be read.
    pub fn fallback(preferred_tone: Option<&str>, keywords: &str) -> Self {
        Self {
            tone: preferred_tone.unwrap_or(DEFAULT_TONE).to_string(),
            plot_outline: format!("Story based on: {keywords}"),
            length_in_words: FALLBACK_LENGTH_IN_WORDS,
        }
    }

    /// Parses a planner reply. Accepts bare JSON or JSON wrapped in one Markdown code fence.
    pub fn parse_reply(text: &str) -> Option<Self> {
        serde_json::from_str(strip_code_fence(text)).ok()
    }

    pub fn to_doc_value(&self) -> DocValue {
        DocValue::Map(
            [
                ("tone".to_string(), DocValue::from(self.tone.as_str())),
                ("plot_outline".to_string(), DocValue::from(self.plot_outline.as_str())),
                ("length_in_words".to_string(), DocValue::Integer(i64::from(self.length_in_words))),
            ]
            .into_iter()
            .collect(),
        )
    }

    pub fn from_doc_value(value: &DocValue) -> Option<Self> {
        serde_json::from_value(value.to_json()).ok()
    }
}

/// How a plan was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    Structured(StoryPlan),
    Fallback(StoryPlan),
}

impl PlanOutcome {
    pub fn plan(&self) -> &StoryPlan {
        match self {
            PlanOutcome::Structured(plan) | PlanOutcome::Fallback(plan) => plan,
        }
    }

    pub fn into_plan(self) -> StoryPlan {
        match self {
            PlanOutcome::Structured(plan) | PlanOutcome::Fallback(plan) => plan,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, PlanOutcome::Fallback(_))
    }
}

fn lenient_word_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let raw = Value::deserialize(deserializer)?;
    let number = match &raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number.map(f64::round) {
        Some(n) if n.is_finite() && (0.0..=f64::from(u32::MAX)).contains(&n) => Ok(n as u32),
        _ => Err(D::Error::custom(format!("length_in_words is not a word count: {raw}"))),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line.
    match body.split_once('\n') {
        Some((_, inner)) => inner.trim(),
        None => body.trim(),
    }
}
