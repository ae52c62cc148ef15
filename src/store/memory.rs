use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::document::{DocValue, Document, merge_document};
use crate::models::preferences::{LAST_UPDATED, PreferenceUpdate, Preferences};
use crate::models::request::Owner;
use crate::store::{PreferenceStore, preferences_path};

/// Process-local store for development and tests. Same merge rules as Firestore.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    documents: Mutex<HashMap<String, Document>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a document as if it had been written earlier.
    pub fn insert(&self, owner: &Owner, fields: Document) -> Result<()> {
        let key = preferences_path(owner)?.join("/");
        self.lock()?.insert(key, fields);
        Ok(())
    }

    pub fn document_count(&self) -> usize {
        self.documents.lock().map(|docs| docs.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Document>>> {
        self.documents.lock().map_err(|_| AppError::Store("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn get_preferences(&self, owner: &Owner) -> Result<Preferences> {
        let key = preferences_path(owner)?.join("/");
        let fields = self.lock()?.get(&key).cloned().unwrap_or_default();
        Ok(Preferences::from_fields(fields))
    }

    async fn update_preferences(&self, owner: &Owner, update: PreferenceUpdate) -> Result<()> {
        let key = preferences_path(owner)?.join("/");
        let mut documents = self.lock()?;
        let document = documents.entry(key).or_default();
        merge_document(document, update.into_fields());
        document.insert(LAST_UPDATED.to_string(), DocValue::Timestamp(Utc::now()));
        Ok(())
    }
}
