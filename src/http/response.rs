use serde::Serialize;
use serde_json::{Value, json};
use vercel_runtime::{Body, Response, StatusCode};

use crate::error::AppError;

/// Host-independent result of one invocation: status, headers and a JSON (or empty) body.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionResponse {
    pub status: StatusCode,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

impl FunctionResponse {
    pub fn json<T: Serialize>(
        status: StatusCode,
        value: &T,
        headers: Vec<(&'static str, String)>,
    ) -> Self {
        Self { status, headers, body: to_json_body(value) }
    }

    pub fn empty(status: StatusCode, headers: Vec<(&'static str, String)>) -> Self {
        Self { status, headers, body: String::new() }
    }

    pub fn error(err: &AppError, headers: Vec<(&'static str, String)>) -> Self {
        let (status, value) = error_response(err);
        Self::json(status, &value, headers)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    pub fn into_response(self) -> anyhow::Result<Response<Body>> {
        let mut builder = Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(*name, value.as_str());
        }
        if self.body.is_empty() {
            return Ok(builder.body(Body::Empty)?);
        }
        Ok(builder.header("Content-Type", "application/json").body(self.body.into())?)
    }
}

pub fn error_response(err: &AppError) -> (StatusCode, Value) {
    match err {
        AppError::Validation(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
        other => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": other.to_string() })),
    }
}

/// Serializes a response payload. Database values already render themselves as JSON-safe
/// text (see `DocValue`), so failure here only happens for payloads serde cannot express at
/// all; those become an error object instead of a panic.
pub fn to_json_body<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "response payload was not serializable");
        json!({ "error": format!("Response serialization failed: {err}") }).to_string()
    })
}
