//! Test doubles shared by module tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;

use crate::config::Config;
use crate::llm_client::{GenerativeModel, LlmError, ModelRequest};
use crate::session::{MemoryStore, SessionStore};
use crate::state::AppState;

#[derive(Clone)]
enum Reply {
    Text(String),
    Fail(String),
}

/// A `GenerativeModel` that replays scripted replies and records every request.
/// Queued replies are used first; afterwards the fallback reply repeats.
pub struct ScriptedModel {
    queue: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    calls: AtomicUsize,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    fn with_fallback(fallback: Reply) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_text(text: &str) -> Self {
        Self::with_fallback(Reply::Text(text.to_string()))
    }

    pub fn with_json<T: Serialize>(value: &T) -> Self {
        Self::with_text(&serde_json::to_string(value).unwrap())
    }

    pub fn failing() -> Self {
        Self::with_fallback(Reply::Fail("scripted upstream failure".to_string()))
    }

    /// Queues a reply to be returned before the fallback.
    pub fn then_json<T: Serialize>(self, value: &T) -> Self {
        self.queue
            .lock()
            .unwrap()
            .push_back(Reply::Text(serde_json::to_string(value).unwrap()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ModelRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(&self, request: &ModelRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Fail(message) => Err(LlmError::Api {
                status: 500,
                message,
            }),
        }
    }
}

/// App state over an in-memory store and the given model.
pub fn app_state(model: Arc<ScriptedModel>) -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(
        store.clone() as Arc<dyn SessionStore>,
        model as Arc<dyn GenerativeModel>,
        Config::for_tests(),
    );
    (state, store)
}
