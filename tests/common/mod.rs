use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use moti::config::ProviderConfig;
use moti::credentials::{CredentialKind, Credentials, MemoryStore};

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Provider settings pointing at a mock server
#[allow(dead_code)]
pub fn provider_config(base_uri: &str) -> ProviderConfig {
    ProviderConfig {
        api_base: format!("{}/v1", base_uri),
        model: "gpt-test".to_string(),
        timeout_seconds: 5,
    }
}

/// In-memory credentials holding `key` for `kind`
#[allow(dead_code)]
pub fn credentials_with(kind: CredentialKind, key: &str) -> (Credentials, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::with_key(kind, key));
    (Credentials::load(store.clone()), store)
}

/// Chat completions response whose message content is `content`
#[allow(dead_code)]
pub fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 34 }
    })
}

/// Completion response carrying a well-formed proposal
#[allow(dead_code)]
pub fn proposal_body(task: &str, minutes: f64) -> serde_json::Value {
    let content = json!({
        "reflection": "the user is stuck at the start",
        "task": task,
        "timeMinutes": minutes,
        "hope": "a first line on the page"
    });
    completion_body(&content.to_string())
}
