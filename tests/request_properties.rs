mod common;

use std::sync::Arc;

use common::{ScriptedGenerator, function};
use proptest::prelude::*;
use serde_json::json;
use story_agent::StoryFunction;
use story_agent::http::response::FunctionResponse;
use story_agent::store::memory::MemoryPreferenceStore;
use vercel_runtime::StatusCode;

fn run(function: &StoryFunction, method: &str, body: &[u8]) -> FunctionResponse {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(function.handle(method, None, body))
}

fn optional_string() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("[a-z ]{0,12}")
}

proptest! {
    #[test]
    fn options_is_always_204(body in proptest::collection::vec(any::<u8>(), 0..64)) {
        let generator = ScriptedGenerator::replying(&[]);
        let function = function(generator.clone(), Arc::new(MemoryPreferenceStore::new()));

        let resp = run(&function, "OPTIONS", &body);

        prop_assert_eq!(resp.status, StatusCode::NO_CONTENT);
        prop_assert!(resp.body.is_empty());
        prop_assert_eq!(resp.header("Access-Control-Max-Age"), Some("3600"));
        prop_assert!(generator.calls().is_empty());
    }

    #[test]
    fn missing_user_id_wins_over_everything_else(
        app_id in optional_string(),
        keywords in optional_string(),
        feedback_type in optional_string(),
    ) {
        let mut body = serde_json::Map::new();
        body.insert("padding".into(), json!(true));
        for (key, value) in [("appId", app_id), ("keywords", keywords), ("feedbackType", feedback_type)] {
            if let Some(value) = value {
                body.insert(key.into(), json!(value));
            }
        }
        let function = function(ScriptedGenerator::replying(&[]), Arc::new(MemoryPreferenceStore::new()));

        let resp = run(&function, "POST", serde_json::to_string(&body).unwrap().as_bytes());

        prop_assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        prop_assert_eq!(resp.body_json(), Some(json!({ "error": "Missing userId" })));
    }
}
