use crate::error::Result;
use crate::models::preferences::PreferenceUpdate;
use crate::models::request::Owner;
use crate::store::PreferenceStore;

/// Bumps `feedback_counts[feedback_type]` and returns the new count.
///
/// Plain read-modify-write of the whole map: two concurrent calls for the same owner can
/// both read the old value, and one increment is lost.
pub async fn record_feedback(
    store: &dyn PreferenceStore,
    owner: &Owner,
    feedback_type: &str,
) -> Result<i64> {
    let mut counts = store.get_preferences(owner).await?.feedback_counts();
    let count = counts.entry(feedback_type.to_string()).or_insert(0);
    *count = count.saturating_add(1);
    let updated = *count;

    store.update_preferences(owner, PreferenceUpdate::new().feedback_counts(&counts)).await?;
    tracing::info!(feedback_type, count = updated, "feedback recorded");
    Ok(updated)
}
