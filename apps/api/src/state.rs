use std::sync::Arc;
use std::time::Duration;

use crate::assessment::hr_stage::{HrStageRegistry, StageContext};
use crate::config::Config;
use crate::llm_client::GenerativeModel;
use crate::session::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    /// Gemini in production; scripted in tests.
    pub model: Arc<dyn GenerativeModel>,
    /// Live timed HR stages, keyed by session.
    pub hr_stages: Arc<HrStageRegistry>,
    pub config: Config,
}

impl AppState {
    pub fn new(
        store: Arc<dyn SessionStore>,
        model: Arc<dyn GenerativeModel>,
        config: Config,
    ) -> Self {
        let stage_ttl = Duration::from_secs(config.session_ttl_seconds);
        Self {
            store,
            model,
            hr_stages: Arc::new(HrStageRegistry::new(stage_ttl)),
            config,
        }
    }

    pub fn stage_context(&self) -> StageContext {
        StageContext {
            store: self.store.clone(),
            model: self.model.clone(),
        }
    }
}
