//! Firestore over its REST API.
//!
//! Reads fetch the document directly; writes go through `documents:commit` so the field mask
//! (merge) and the server timestamp land in a single upsert.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::config::FirestoreConfig;
use crate::error::{AppError, Result};
use crate::models::document::{DocValue, Document, format_timestamp};
use crate::models::preferences::{LAST_UPDATED, PreferenceUpdate, Preferences};
use crate::models::request::Owner;
use crate::store::{PreferenceStore, preferences_path};

pub const FIRESTORE_API_BASE: &str = "https://firestore.googleapis.com";
pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

/// Where the bearer token comes from.
pub enum TokenSource {
    /// Emulator: no real credentials, but `owner` bypasses security rules.
    Emulator,
    Static(String),
    /// A service account or Application Default Credentials. `gcp_auth` caches and refreshes
    /// the token itself.
    Provider(Arc<dyn TokenProvider>),
}

impl TokenSource {
    async fn bearer(&self) -> Result<String> {
        match self {
            TokenSource::Emulator => Ok("owner".to_string()),
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::Provider(provider) => {
                let token = provider
                    .token(&[DATASTORE_SCOPE])
                    .await
                    .map_err(|e| AppError::Store(format!("could not obtain an access token: {e}")))?;
                Ok(token.as_str().to_string())
            }
        }
    }
}

impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::Emulator => f.write_str("Emulator"),
            TokenSource::Static(_) => f.write_str("Static([REDACTED])"),
            TokenSource::Provider(_) => f.write_str("Provider"),
        }
    }
}

/// Picks credentials in order: emulator, static token, inline service account JSON, then
/// Application Default Credentials (`GOOGLE_APPLICATION_CREDENTIALS`, gcloud, metadata server).
async fn token_source(config: &FirestoreConfig) -> Result<TokenSource> {
    if config.emulator_host.is_some() {
        return Ok(TokenSource::Emulator);
    }
    if let Some(token) = &config.access_token {
        return Ok(TokenSource::Static(token.clone()));
    }
    let provider: Arc<dyn TokenProvider> = match &config.credentials_json {
        Some(json) => Arc::new(CustomServiceAccount::from_json(json).map_err(|e| {
            AppError::Config(format!("FIRESTORE_CREDENTIALS_JSON is not a usable service account: {e}"))
        })?),
        None => gcp_auth::provider()
            .await
            .map_err(|e| AppError::Config(format!("no Google credentials found: {e}")))?,
    };
    Ok(TokenSource::Provider(provider))
}

pub struct FirestoreStore {
    http: reqwest::Client,
    api_base: Url,
    /// `projects/{project}/databases/{database}`
    database_path: String,
    auth: TokenSource,
}

impl fmt::Debug for FirestoreStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirestoreStore")
            .field("api_base", &self.api_base.as_str())
            .field("database_path", &self.database_path)
            .field("auth", &self.auth)
            .finish()
    }
}

impl FirestoreStore {
    pub fn new(api_base: &str, project_id: &str, database: &str, auth: TokenSource) -> Result<Self> {
        let api_base = Url::parse(api_base)
            .map_err(|e| AppError::Config(format!("invalid Firestore base URL '{api_base}': {e}")))?;
        Ok(Self {
            http: reqwest::Client::new(),
            api_base,
            database_path: format!("projects/{project_id}/databases/{database}"),
            auth,
        })
    }

    /// Resolves the endpoint, credentials and project from configuration. An unset project is
    /// taken from the credentials when they carry one.
    pub async fn from_config(config: &FirestoreConfig) -> Result<Self> {
        let api_base = match &config.emulator_host {
            Some(host) => format!("http://{host}"),
            None => FIRESTORE_API_BASE.to_string(),
        };
        let auth = token_source(config).await?;

        let project_id = match (&config.project_id, &auth) {
            (Some(project), _) => project.clone(),
            (None, TokenSource::Provider(provider)) => provider
                .project_id()
                .await
                .map_err(|e| AppError::Config(format!("could not determine the project id: {e}")))?
                .to_string(),
            (None, _) => {
                return Err(AppError::Config(
                    "GOOGLE_CLOUD_PROJECT must be set when using the emulator or a static token".into(),
                ));
            }
        };

        tracing::info!(project = %project_id, database = %config.database, api_base = %api_base, auth = ?auth, "using firestore");
        Self::new(&api_base, &project_id, &config.database, auth)
    }

    fn document_name(&self, segments: &[String]) -> String {
        format!("{}/documents/{}", self.database_path, segments.join("/"))
    }

    fn url_for(&self, tail: &[&str]) -> Result<Url> {
        let mut url = self.api_base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| AppError::Config("Firestore base URL cannot carry a path".into()))?;
            path.pop_if_empty().push("v1");
            path.extend(self.database_path.split('/'));
            path.extend(tail);
        }
        Ok(url)
    }

    async fn authorized(&self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder> {
        let token = self.auth.bearer().await?;
        Ok(request.bearer_auth(token))
    }
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    #[serde(default)]
    fields: Map<String, Value>,
}

#[async_trait]
impl PreferenceStore for FirestoreStore {
    async fn get_preferences(&self, owner: &Owner) -> Result<Preferences> {
        let segments = preferences_path(owner)?;
        let mut tail = vec!["documents"];
        tail.extend(segments.iter().map(String::as_str));
        let url = self.url_for(&tail)?;

        let response = self
            .authorized(self.http.get(url))
            .await?
            .send()
            .await
            .map_err(|e| AppError::Store(format!("document read failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Preferences::default());
        }
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(status_error("document read", status, &body));
        }

        let document: FirestoreDocument = serde_json::from_str(&body)
            .map_err(|e| AppError::Store(format!("document read returned malformed JSON: {e}")))?;
        Ok(Preferences::from_fields(decode_fields(&document.fields)))
    }

    async fn update_preferences(&self, owner: &Owner, update: PreferenceUpdate) -> Result<()> {
        let segments = preferences_path(owner)?;
        let mut fields = update.into_fields();
        // The timestamp comes from the transform; a client value would collide with it.
        fields.remove(LAST_UPDATED);

        let body = commit_body(&self.document_name(&segments), &fields);
        let url = self.url_for(&["documents:commit"])?;
        let response = self
            .authorized(self.http.post(url).json(&body))
            .await?
            .send()
            .await
            .map_err(|e| AppError::Store(format!("document write failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error("document write", status, &text));
        }
        Ok(())
    }
}

fn status_error(operation: &str, status: StatusCode, body: &str) -> AppError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| body.trim().to_string());
    AppError::Store(format!("{operation} returned {}: {detail}", status.as_u16()))
}

/// One upsert write: merge the given fields and stamp `last_updated` with the request time.
fn commit_body(document_name: &str, fields: &Document) -> Value {
    json!({
        "writes": [{
            "update": {
                "name": document_name,
                "fields": encode_fields(fields),
            },
            "updateMask": { "fieldPaths": field_paths(fields) },
            "updateTransforms": [{
                "fieldPath": LAST_UPDATED,
                "setToServerValue": "REQUEST_TIME",
            }],
        }]
    })
}

/// Leaf paths of `fields`, so nested maps merge instead of being replaced wholesale.
/// Empty maps are listed as-is, which clears them.
pub fn field_paths(fields: &Document) -> Vec<String> {
    let mut paths = Vec::new();
    collect_paths(fields, "", &mut paths);
    paths
}

fn collect_paths(fields: &Document, prefix: &str, out: &mut Vec<String>) {
    for (key, value) in fields {
        let path = if prefix.is_empty() {
            quote_segment(key)
        } else {
            format!("{prefix}.{}", quote_segment(key))
        };
        match value {
            DocValue::Map(inner) if !inner.is_empty() => collect_paths(inner, &path, out),
            _ => out.push(path),
        }
    }
}

/// Field names outside `[A-Za-z_][A-Za-z0-9_]*` must be backquoted.
fn quote_segment(segment: &str) -> String {
    let mut chars = segment.chars();
    let simple = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        segment.to_string()
    } else {
        format!("`{}`", segment.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

pub fn encode_fields(fields: &Document) -> Value {
    Value::Object(fields.iter().map(|(k, v)| (k.clone(), encode_value(v))).collect())
}

pub fn encode_value(value: &DocValue) -> Value {
    match value {
        DocValue::Null => json!({ "nullValue": null }),
        DocValue::Bool(b) => json!({ "booleanValue": b }),
        DocValue::Integer(i) => json!({ "integerValue": i.to_string() }),
        DocValue::Double(f) if f.is_nan() => json!({ "doubleValue": "NaN" }),
        DocValue::Double(f) if f.is_infinite() => {
            json!({ "doubleValue": if *f > 0.0 { "Infinity" } else { "-Infinity" } })
        }
        DocValue::Double(f) => json!({ "doubleValue": f }),
        DocValue::String(s) => json!({ "stringValue": s }),
        DocValue::Timestamp(ts) => json!({ "timestampValue": format_timestamp(ts) }),
        DocValue::Array(items) => {
            json!({ "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() } })
        }
        DocValue::Map(inner) => json!({ "mapValue": { "fields": encode_fields(inner) } }),
        DocValue::Opaque(text) => json!({ "stringValue": text }),
    }
}

pub fn decode_fields(fields: &Map<String, Value>) -> Document {
    fields.iter().map(|(k, v)| (k.clone(), decode_value(v))).collect()
}

pub fn decode_value(value: &Value) -> DocValue {
    let Some((kind, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return DocValue::Opaque(value.to_string());
    };
    match kind.as_str() {
        "nullValue" => DocValue::Null,
        "booleanValue" => inner.as_bool().map(DocValue::Bool).unwrap_or(DocValue::Null),
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse().ok())
            .or_else(|| inner.as_i64())
            .map(DocValue::Integer)
            .unwrap_or_else(|| DocValue::Opaque(inner.to_string())),
        "doubleValue" => match inner {
            Value::Number(n) => DocValue::Double(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => match s.as_str() {
                "Infinity" => DocValue::Double(f64::INFINITY),
                "-Infinity" => DocValue::Double(f64::NEG_INFINITY),
                _ => DocValue::Double(s.parse().unwrap_or(f64::NAN)),
            },
            other => DocValue::Opaque(other.to_string()),
        },
        "stringValue" => DocValue::String(inner.as_str().unwrap_or_default().to_string()),
        "timestampValue" => match inner.as_str() {
            Some(text) => DateTime::parse_from_rfc3339(text)
                .map(|ts| DocValue::Timestamp(ts.with_timezone(&Utc)))
                .unwrap_or_else(|_| DocValue::Opaque(text.to_string())),
            None => DocValue::Opaque(inner.to_string()),
        },
        "arrayValue" => DocValue::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => DocValue::Map(
            inner.get("fields").and_then(Value::as_object).map(decode_fields).unwrap_or_default(),
        ),
        // referenceValue, bytesValue, geoPointValue and anything newer.
        _ => match inner {
            Value::String(text) => DocValue::Opaque(text.clone()),
            other => DocValue::Opaque(other.to_string()),
        },
    }
}
