use crate::clients::TextGenerator;
use crate::error::Result;
use crate::models::plan::StoryPlan;

pub fn build_execution_prompt(plan: &StoryPlan) -> String {
    format!(
        "Write a {}-word story.\n\
         Tone: {}\n\
         Plot outline: {}\n\
         Ensure it's engaging, coherent, and tailored to the tone.\n",
        plan.length_in_words, plan.tone, plan.plot_outline,
    )
}

pub fn build_direct_prompt(keywords: &str) -> String {
    format!(
        "Write a short, engaging story of about 150 words based on these keywords: {keywords}\n"
    )
}

/// The reply is returned as-is; length and tone are not checked.
pub async fn write_story(generator: &dyn TextGenerator, model: &str, plan: &StoryPlan) -> Result<String> {
    generator.generate(model, &build_execution_prompt(plan)).await
}

pub async fn write_story_from_keywords(
    generator: &dyn TextGenerator,
    model: &str,
    keywords: &str,
) -> Result<String> {
    generator.generate(model, &build_direct_prompt(keywords)).await
}
