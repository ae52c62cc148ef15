use crate::clients::TextGenerator;
use crate::error::Result;
use crate::http::response::to_json_body;
use crate::models::plan::{PlanOutcome, StoryPlan};
use crate::models::preferences::Preferences;

pub fn build_planner_prompt(preferences: &Preferences, keywords: &str) -> String {
    format!(
        "You are a creative story planning agent.\n\
         User preferences: {prefs}\n\
         Keywords: {keywords}\n\
         \n\
         Based on these, plan the best story approach.\n\
         Reply with only a JSON object with these fields:\n\
         - tone: the tone to use (\"humorous\", \"adventurous\", \"positive\", \"neutral\", etc.)\n\
         - plot_outline: 2-4 sentences describing the story's main arc\n\
         - length_in_words: integer (between 100 and 200)\n",
        prefs = to_json_body(preferences),
    )
}

/// Asks the planner model for a plan. Transport errors propagate; an unreadable reply does
/// not, it yields the fallback plan instead.
pub async fn plan_story(
    generator: &dyn TextGenerator,
    model: &str,
    preferences: &Preferences,
    keywords: &str,
) -> Result<PlanOutcome> {
    let reply = generator.generate(model, &build_planner_prompt(preferences, keywords)).await?;
    Ok(interpret_reply(&reply, preferences, keywords))
}

pub fn interpret_reply(reply: &str, preferences: &Preferences, keywords: &str) -> PlanOutcome {
    match StoryPlan::parse_reply(reply) {
        Some(plan) => PlanOutcome::Structured(plan),
        None => {
            tracing::warn!(reply_len = reply.len(), "planner reply was not a plan, using fallback");
            PlanOutcome::Fallback(StoryPlan::fallback(preferences.preferred_tone(), keywords))
        }
    }
}
