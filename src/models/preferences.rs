use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::document::{DocValue, Document};
use crate::models::plan::StoryPlan;

pub const PREFERRED_TONE: &str = "preferred_tone";
pub const LAST_KEYWORDS: &str = "last_keywords";
pub const LAST_PLAN: &str = "last_plan";
pub const FEEDBACK_COUNTS: &str = "feedback_counts";
/// Stamped by the store on every write.
pub const LAST_UPDATED: &str = "last_updated";

/// The stored `story_prefs` document for one (app, user) pair. Empty for first-time users.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Preferences {
    fields: Document,
}

impl Preferences {
    pub fn from_fields(fields: Document) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &Document {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn preferred_tone(&self) -> Option<&str> {
        self.fields.get(PREFERRED_TONE).and_then(DocValue::as_str)
    }

    pub fn last_keywords(&self) -> Option<&str> {
        self.fields.get(LAST_KEYWORDS).and_then(DocValue::as_str)
    }

    pub fn last_plan(&self) -> Option<StoryPlan> {
        self.fields.get(LAST_PLAN).and_then(StoryPlan::from_doc_value)
    }

    /// Entries that are not numeric are skipped.
    pub fn feedback_counts(&self) -> BTreeMap<String, i64> {
        self.fields
            .get(FEEDBACK_COUNTS)
            .and_then(DocValue::as_map)
            .map(|counts| {
                counts
                    .iter()
                    .filter_map(|(kind, count)| count.as_i64().map(|c| (kind.clone(), c)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        match self.fields.get(LAST_UPDATED) {
            Some(DocValue::Timestamp(ts)) => Some(*ts),
            _ => None,
        }
    }
}

/// Fields to merge into the preferences document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferenceUpdate {
    fields: Document,
}

impl PreferenceUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preferred_tone(mut self, tone: &str) -> Self {
        self.fields.insert(PREFERRED_TONE.into(), tone.into());
        self
    }

    pub fn last_keywords(mut self, keywords: &str) -> Self {
        self.fields.insert(LAST_KEYWORDS.into(), keywords.into());
        self
    }

    pub fn last_plan(mut self, plan: &StoryPlan) -> Self {
        self.fields.insert(LAST_PLAN.into(), plan.to_doc_value());
        self
    }

    pub fn feedback_counts(mut self, counts: &BTreeMap<String, i64>) -> Self {
        let map = counts.iter().map(|(k, v)| (k.clone(), DocValue::Integer(*v))).collect();
        self.fields.insert(FEEDBACK_COUNTS.into(), DocValue::Map(map));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &Document {
        &self.fields
    }

    pub fn into_fields(self) -> Document {
        self.fields
    }
}
