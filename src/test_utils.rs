//! Test utilities for Moti
//!
//! Scripted generation services and proposal builders shared by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::providers::{GenerationError, GenerationService, ProposedTask, TaskRequest};

/// Builds a proposal with fixed reflection `r` and hope `h`
pub fn proposal(task: &str, minutes: f64) -> ProposedTask {
    ProposedTask {
        reflection: "r".to_string(),
        task: task.to_string(),
        time_minutes: minutes,
        hope: "h".to_string(),
    }
}

/// Generation service that replays queued results and records requests
///
/// Once the queue is empty every call fails with a transport error.
pub struct ScriptedService {
    replies: Mutex<VecDeque<Result<ProposedTask, GenerationError>>>,
    requests: Mutex<Vec<TaskRequest>>,
}

impl ScriptedService {
    pub fn new(replies: Vec<Result<ProposedTask, GenerationError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<TaskRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    async fn propose_task(&self, request: &TaskRequest) -> Result<ProposedTask, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Transport("no scripted reply".to_string())))
    }

    fn model(&self) -> String {
        "scripted".to_string()
    }
}

/// Generation service that blocks inside `propose_task` until released
///
/// Holds a request in flight so a test can act on the session meanwhile.
pub struct GatedService {
    reply: Result<ProposedTask, GenerationError>,
    entered: tokio::sync::Notify,
    release: tokio::sync::Notify,
}

impl GatedService {
    pub fn new(reply: Result<ProposedTask, GenerationError>) -> Self {
        Self {
            reply,
            entered: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
        }
    }

    /// Resolves once a request has reached the service
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Lets the pending request complete
    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl GenerationService for GatedService {
    async fn propose_task(&self, _request: &TaskRequest) -> Result<ProposedTask, GenerationError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.reply.clone()
    }

    fn model(&self) -> String {
        "gated".to_string()
    }
}
