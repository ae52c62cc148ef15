//! Per-user story preferences, one document per (app, user).

pub mod firestore;
pub mod memory;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::preferences::{PreferenceUpdate, Preferences};
use crate::models::request::Owner;

pub const PREFERENCES_DOCUMENT: &str = "story_prefs";

/// Reads and merge-writes the preferences document.
///
/// Implementations must treat a missing document as empty preferences, create the document
/// on first write, merge rather than overwrite, and stamp `last_updated` on every write.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get_preferences(&self, owner: &Owner) -> Result<Preferences>;
    async fn update_preferences(&self, owner: &Owner, update: PreferenceUpdate) -> Result<()>;
}

/// `artifacts/{app}/users/{user}/preferences/story_prefs`, as path segments.
pub fn preferences_path(owner: &Owner) -> Result<Vec<String>> {
    for id in [&owner.app_id, &owner.user_id] {
        if !is_valid_id(id) {
            return Err(AppError::Store(format!("'{id}' is not a valid document id")));
        }
    }
    Ok(vec![
        "artifacts".to_string(),
        owner.app_id.clone(),
        "users".to_string(),
        owner.user_id.clone(),
        "preferences".to_string(),
        PREFERENCES_DOCUMENT.to_string(),
    ])
}

/// Rejects ids that would change the path shape once it becomes a URL (`/`, `.`, `..`) and
/// Firestore's reserved `__name__` form.
fn is_valid_id(id: &str) -> bool {
    let reserved = id.len() >= 4 && id.starts_with("__") && id.ends_with("__");
    !id.is_empty() && !id.contains('/') && id != "." && id != ".." && !reserved
}
