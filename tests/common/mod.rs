#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use story_agent::clients::TextGenerator;
use story_agent::models::preferences::{PreferenceUpdate, Preferences};
use story_agent::models::request::Owner;
use story_agent::store::PreferenceStore;
use story_agent::store::memory::MemoryPreferenceStore;
use story_agent::{AppError, Result, StoryConfig, StoryFunction};

pub const PLAN_JSON: &str =
    r#"{"tone":"adventurous","plot_outline":"A crew of space pirates steals a comet. The comet steals them back.","length_in_words":160}"#;
pub const STORY: &str = "Captain Vega had stolen many things, but never a comet...";

/// Replays queued replies in order and records every call.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedGenerator {
    pub fn replying(replies: &[&str]) -> Arc<Self> {
        let generator = Self::default();
        generator
            .replies
            .lock()
            .unwrap()
            .extend(replies.iter().map(|r| Ok(r.to_string())));
        Arc::new(generator)
    }

    pub fn failing(message: &str) -> Arc<Self> {
        let generator = Self::default();
        generator.replies.lock().unwrap().push_back(Err(AppError::External(message.to_string())));
        Arc::new(generator)
    }

    /// (model, prompt) pairs in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        self.calls.lock().unwrap().push((model.to_string(), prompt.to_string()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::External("no scripted reply left".into())))
    }
}

/// A store whose every call fails, to exercise the 500 path.
pub struct BrokenStore;

#[async_trait]
impl PreferenceStore for BrokenStore {
    async fn get_preferences(&self, _owner: &Owner) -> Result<Preferences> {
        Err(AppError::Store("connection reset".into()))
    }

    async fn update_preferences(&self, _owner: &Owner, _update: PreferenceUpdate) -> Result<()> {
        Err(AppError::Store("connection reset".into()))
    }
}

pub fn config(extra: &[(&str, &str)]) -> StoryConfig {
    StoryConfig::from_lookup(|key| {
        if key == "GEMINI_API_KEY" {
            return Some("test-key".to_string());
        }
        extra.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())
    })
    .expect("test config")
}

pub fn function(
    generator: Arc<ScriptedGenerator>,
    store: Arc<MemoryPreferenceStore>,
) -> StoryFunction {
    StoryFunction::new(&config(&[]), generator, store)
}

pub fn owner(user_id: &str, app_id: &str) -> Owner {
    Owner { user_id: user_id.into(), app_id: app_id.into() }
}
