//! The story function: CORS, validation, then feedback recording or plan-and-write.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};
use vercel_runtime::StatusCode;

use crate::clients::TextGenerator;
use crate::clients::gemini::GeminiClient;
use crate::config::{StoreBackend, StoryConfig, StoryMode};
use crate::error::Result;
use crate::http::cors::CorsPolicy;
use crate::http::response::FunctionResponse;
use crate::models::plan::StoryPlan;
use crate::models::preferences::PreferenceUpdate;
use crate::models::request::{Owner, StoryAction, StoryRequest};
use crate::services::{executor, feedback, planner};
use crate::store::PreferenceStore;
use crate::store::firestore::FirestoreStore;
use crate::store::memory::MemoryPreferenceStore;

#[derive(Debug, Serialize)]
struct GenerationResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    plan: Option<StoryPlan>,
    story: String,
}

/// Everything one invocation needs. Built once per process and shared by all invocations.
pub struct StoryFunction {
    cors: CorsPolicy,
    mode: StoryMode,
    planner_model: String,
    executor_model: String,
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn PreferenceStore>,
}

impl StoryFunction {
    pub fn new(
        config: &StoryConfig,
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn PreferenceStore>,
    ) -> Self {
        Self {
            cors: config.cors.clone(),
            mode: config.mode,
            planner_model: config.planner_model.clone(),
            executor_model: config.executor_model.clone(),
            generator,
            store,
        }
    }

    /// Wires up the Gemini client and the configured store.
    pub async fn from_config(config: &StoryConfig) -> Result<Self> {
        let gemini = GeminiClient::new(config.gemini_api_key.clone(), config.gemini_api_base.clone());
        match gemini.check_api_key().await {
            Ok(count) => tracing::info!(models = count, "gemini API key valid"),
            Err(err) => tracing::error!(error = %err, "gemini API key check failed"),
        }

        let store: Arc<dyn PreferenceStore> = match config.store {
            StoreBackend::Firestore => Arc::new(FirestoreStore::from_config(&config.firestore).await?),
            StoreBackend::Memory => {
                tracing::warn!("using in-memory preference store; nothing survives a restart");
                Arc::new(MemoryPreferenceStore::new())
            }
        };

        Ok(Self::new(config, Arc::new(gemini), store))
    }

    pub async fn handle(&self, method: &str, origin: Option<&str>, body: &[u8]) -> FunctionResponse {
        let headers = self.cors.headers_for(origin);

        if method.eq_ignore_ascii_case("OPTIONS") {
            return FunctionResponse::empty(StatusCode::NO_CONTENT, headers);
        }

        match self.dispatch(body).await {
            Ok((status, payload)) => FunctionResponse::json(status, &payload, headers),
            Err(err) => {
                if err.is_client_error() {
                    tracing::info!(error = %err, "rejected request");
                } else {
                    tracing::error!(error = %err, "story request failed");
                }
                FunctionResponse::error(&err, headers)
            }
        }
    }

    async fn dispatch(&self, body: &[u8]) -> Result<(StatusCode, Value)> {
        match StoryRequest::from_body(body)?.into_action()? {
            StoryAction::Feedback { owner, feedback_type } => {
                tracing::info!(user_id = %owner.user_id, app_id = %owner.app_id, "recording feedback");
                feedback::record_feedback(self.store.as_ref(), &owner, &feedback_type).await?;
                Ok((
                    StatusCode::OK,
                    json!({ "message": format!("Feedback {feedback_type} processed.") }),
                ))
            }
            StoryAction::Generate { owner, keywords } => {
                tracing::info!(user_id = %owner.user_id, app_id = %owner.app_id, mode = ?self.mode, "generating story");
                let response = match self.mode {
                    StoryMode::Planned => self.plan_and_write(&owner, &keywords).await?,
                    StoryMode::Direct => self.write_directly(&owner, &keywords).await?,
                };
                Ok((StatusCode::OK, serde_json::to_value(response)?))
            }
        }
    }

    async fn plan_and_write(&self, owner: &Owner, keywords: &str) -> Result<GenerationResponse> {
        let preferences = self.store.get_preferences(owner).await?;
        let outcome =
            planner::plan_story(self.generator.as_ref(), &self.planner_model, &preferences, keywords)
                .await?;
        tracing::debug!(fallback = outcome.is_fallback(), "plan ready");
        let plan = outcome.into_plan();

        let story = executor::write_story(self.generator.as_ref(), &self.executor_model, &plan).await?;

        let update = PreferenceUpdate::new()
            .preferred_tone(&plan.tone)
            .last_keywords(keywords)
            .last_plan(&plan);
        self.store.update_preferences(owner, update).await?;

        Ok(GenerationResponse { plan: Some(plan), story })
    }

    async fn write_directly(&self, owner: &Owner, keywords: &str) -> Result<GenerationResponse> {
        let story =
            executor::write_story_from_keywords(self.generator.as_ref(), &self.executor_model, keywords)
                .await?;
        self.store
            .update_preferences(owner, PreferenceUpdate::new().last_keywords(keywords))
            .await?;
        Ok(GenerationResponse { plan: None, story })
    }
}
