//! Timed HR stage.
//!
//! Phases: Loading → Answering → Analyzing → Result | Error.
//! `begin_analysis` is the only way into Analyzing, so the countdown and a
//! manual submit can race freely: whichever arrives second is a no-op
//! (timeout) or a precondition error (manual).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::assessment::models::{
    AssessmentConfig, HrQuestion, QuestionSet, Stage, StageOutcome, StageResult,
};
use crate::assessment::scoring::analyze_hr_answers;
use crate::errors::AppError;
use crate::llm_client::GenerativeModel;
use crate::session::{self, SessionKey, SessionStore};

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagePhase {
    Loading,
    Answering,
    Analyzing,
    Result(StageResult),
    Error(String),
}

impl StagePhase {
    pub fn name(&self) -> &'static str {
        match self {
            StagePhase::Loading => "loading",
            StagePhase::Answering => "answering",
            StagePhase::Analyzing => "analyzing",
            StagePhase::Result(_) => "result",
            StagePhase::Error(_) => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Manual,
    Timeout,
}

/// Outcome of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Running(u64),
    Expired,
    /// The stage left Answering; the countdown should stop.
    Stopped,
}

/// Snapshot handed to the scoring adapter once analysis has begun.
#[derive(Debug, Clone)]
pub struct AnalysisJob {
    pub questions: Vec<HrQuestion>,
    pub answers: Vec<Option<usize>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HrStageView {
    pub session_id: Uuid,
    pub phase: &'static str,
    pub time_left_seconds: u64,
    pub questions: Vec<HrQuestion>,
    pub answers: Vec<Option<usize>>,
    pub can_submit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<StageResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct HrStage {
    session_id: Uuid,
    phase: StagePhase,
    questions: Vec<HrQuestion>,
    answers: Vec<Option<usize>>,
    remaining_seconds: u64,
    /// Set once the stage is no longer registered for its session.
    retired: bool,
}

impl HrStage {
    pub fn new(session_id: Uuid, duration_seconds: u64) -> Self {
        Self {
            session_id,
            phase: StagePhase::Loading,
            questions: Vec::new(),
            answers: Vec::new(),
            remaining_seconds: duration_seconds,
            retired: false,
        }
    }

    pub fn phase(&self) -> &StagePhase {
        &self.phase
    }

    /// Reads the persisted question set. On failure the stage moves to Error and
    /// the error is returned; the model is never involved.
    pub async fn load(&mut self, store: &dyn SessionStore) -> Result<(), AppError> {
        match self.read_questions(store).await {
            Ok(questions) => {
                self.answers = vec![None; questions.len()];
                self.questions = questions;
                self.phase = StagePhase::Answering;
                info!(
                    "HR stage loaded {} questions for session {}",
                    self.questions.len(),
                    self.session_id
                );
                Ok(())
            }
            Err(e) => {
                warn!("Failed to load HR questions for session {}: {e}", self.session_id);
                self.phase = StagePhase::Error(e.user_message());
                Err(e)
            }
        }
    }

    async fn read_questions(&self, store: &dyn SessionStore) -> Result<Vec<HrQuestion>, AppError> {
        let set: QuestionSet = session::load(store, self.session_id, SessionKey::Questions)
            .await?
            .ok_or_else(|| {
                AppError::MissingPrecondition(
                    "Personalized questions not found. Please start from the resume step."
                        .to_string(),
                )
            })?;
        if set.hr_questions.is_empty() {
            return Err(AppError::MissingPrecondition(
                "HR questions are missing from the assessment data.".to_string(),
            ));
        }
        Ok(set.hr_questions)
    }

    pub fn select(&mut self, question: usize, option: usize) -> Result<(), AppError> {
        if self.phase != StagePhase::Answering {
            return Err(AppError::MissingPrecondition(format!(
                "HR stage is {}; it is not accepting answers.",
                self.phase.name()
            )));
        }
        let options = self
            .questions
            .get(question)
            .map(|q| q.options.len())
            .ok_or_else(|| AppError::Validation(format!("question {question} does not exist")))?;
        if option >= options {
            return Err(AppError::Validation(format!(
                "question {question} has {options} options; {option} is out of range"
            )));
        }
        self.answers[question] = Some(option);
        Ok(())
    }

    /// True only while answering and once every question has a selection.
    pub fn can_submit(&self) -> bool {
        self.phase == StagePhase::Answering && self.answers.iter().all(Option::is_some)
    }

    /// Moves Answering → Analyzing exactly once.
    ///
    /// Manual submission requires every question answered. A timeout submits
    /// whatever is selected, and is a no-op (`Ok(None)`) if analysis already began.
    pub fn begin_analysis(&mut self, trigger: SubmitTrigger) -> Result<Option<AnalysisJob>, AppError> {
        if self.retired {
            return match trigger {
                SubmitTrigger::Timeout => Ok(None),
                SubmitTrigger::Manual => Err(AppError::MissingPrecondition(
                    "This HR stage was replaced. Start the HR stage again.".to_string(),
                )),
            };
        }
        if self.phase != StagePhase::Answering {
            return match trigger {
                SubmitTrigger::Timeout => Ok(None),
                SubmitTrigger::Manual => Err(AppError::MissingPrecondition(format!(
                    "HR stage is {}; it is not accepting submissions.",
                    self.phase.name()
                ))),
            };
        }
        if trigger == SubmitTrigger::Manual && !self.can_submit() {
            return Err(AppError::Validation(
                "Answer every question before submitting.".to_string(),
            ));
        }

        self.phase = StagePhase::Analyzing;
        Ok(Some(AnalysisJob {
            questions: self.questions.clone(),
            answers: self.answers.clone(),
        }))
    }

    /// Records the analysis outcome. Ignored unless analysis is in progress.
    pub fn finish(&mut self, outcome: Result<StageResult, String>) {
        if self.phase != StagePhase::Analyzing {
            return;
        }
        self.phase = match outcome {
            Ok(result) => StagePhase::Result(result),
            Err(message) => StagePhase::Error(message),
        };
    }

    pub fn tick(&mut self) -> Tick {
        if self.retired || self.phase != StagePhase::Answering {
            return Tick::Stopped;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            Tick::Expired
        } else {
            Tick::Running(self.remaining_seconds)
        }
    }

    pub fn view(&self) -> HrStageView {
        let (result, error) = match &self.phase {
            StagePhase::Result(r) => (Some(r.clone()), None),
            StagePhase::Error(e) => (None, Some(e.clone())),
            _ => (None, None),
        };
        HrStageView {
            session_id: self.session_id,
            phase: self.phase.name(),
            time_left_seconds: self.remaining_seconds,
            questions: self.questions.clone(),
            answers: self.answers.clone(),
            can_submit: self.can_submit(),
            result,
            error,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Driving the stage
// ────────────────────────────────────────────────────────────────────────────

/// What a stage needs to analyze and persist.
#[derive(Clone)]
pub struct StageContext {
    pub store: Arc<dyn SessionStore>,
    pub model: Arc<dyn GenerativeModel>,
}

/// Submits the stage. The lock is released while the model call is in flight
/// and held again while the outcome is persisted.
///
/// Analysis failures do not surface as `Err`: they land in the Error phase and an
/// error marker is persisted under the stage key. `Err` means the submission
/// itself was refused. A stage retired during the model call persists nothing.
pub async fn submit(
    stage: &Mutex<HrStage>,
    trigger: SubmitTrigger,
    ctx: &StageContext,
) -> Result<HrStageView, AppError> {
    let (session_id, job) = {
        let mut guard = stage.lock().await;
        (guard.session_id, guard.begin_analysis(trigger)?)
    };
    let Some(job) = job else {
        return Ok(stage.lock().await.view());
    };

    info!("Analyzing HR answers for session {session_id} ({trigger:?})");
    let outcome = analyze(session_id, job, ctx).await;

    let mut guard = stage.lock().await;
    if guard.retired {
        info!("HR stage for session {session_id} was replaced during analysis; outcome dropped");
        return Ok(guard.view());
    }

    let persisted = match &outcome {
        Ok(result) => StageOutcome::Completed(result.clone()),
        Err(e) => StageOutcome::failed(e.user_message()),
    };
    let outcome = match session::save(
        ctx.store.as_ref(),
        session_id,
        SessionKey::StageResult(Stage::Hr),
        &persisted,
    )
    .await
    {
        Ok(()) => outcome,
        Err(e) => {
            error!("Failed to persist HR outcome for session {session_id}: {e}");
            Err(AppError::Storage(e))
        }
    };

    match outcome {
        Ok(result) => guard.finish(Ok(result)),
        Err(e) => {
            warn!("HR analysis failed for session {session_id}: {e}");
            guard.finish(Err(e.user_message()));
        }
    }
    Ok(guard.view())
}

async fn analyze(
    session_id: Uuid,
    job: AnalysisJob,
    ctx: &StageContext,
) -> Result<StageResult, AppError> {
    let config: AssessmentConfig = session::load(ctx.store.as_ref(), session_id, SessionKey::Config)
        .await?
        .ok_or_else(|| {
            AppError::MissingPrecondition("Assessment configuration not found.".to_string())
        })?;
    analyze_hr_answers(ctx.model.as_ref(), &job.questions, &job.answers, &config.role).await
}

/// Ticks once per second while the stage is answering and submits on expiry.
pub fn spawn_countdown(stage: Arc<Mutex<HrStage>>, ctx: StageContext) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + TICK, TICK);
        loop {
            ticker.tick().await;
            let tick = stage.lock().await.tick();
            match tick {
                Tick::Running(_) => {}
                Tick::Stopped => return,
                Tick::Expired => {
                    if let Err(e) = submit(&stage, SubmitTrigger::Timeout, &ctx).await {
                        warn!("Timed submission failed: {e}");
                    }
                    return;
                }
            }
        }
    })
}

struct LiveStage {
    stage: Arc<Mutex<HrStage>>,
    countdown: Option<JoinHandle<()>>,
    started_at: Instant,
}

impl LiveStage {
    /// Stops the countdown and marks the stage so it never persists again.
    async fn retire(self) {
        self.stage.lock().await.retired = true;
        if let Some(handle) = self.countdown {
            handle.abort();
        }
    }
}

/// The live HR stage of each session. Starting a stage again replaces the old
/// one; entries older than the session TTL are evicted.
pub struct HrStageRegistry {
    live: Mutex<HashMap<Uuid, LiveStage>>,
    ttl: Duration,
}

impl HrStageRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            live: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Creates and loads a fresh stage, starting its countdown if the questions loaded.
    /// A load failure is returned as the error, and the failed stage stays visible.
    pub async fn start(
        &self,
        session_id: Uuid,
        duration_seconds: u64,
        ctx: &StageContext,
    ) -> Result<HrStageView, AppError> {
        let mut stage = HrStage::new(session_id, duration_seconds);
        let loaded = stage.load(ctx.store.as_ref()).await;
        let view = stage.view();

        let stage = Arc::new(Mutex::new(stage));
        let countdown = loaded
            .is_ok()
            .then(|| spawn_countdown(stage.clone(), ctx.clone()));
        let entry = LiveStage {
            stage,
            countdown,
            started_at: Instant::now(),
        };

        let previous = {
            let mut live = self.live.lock().await;
            self.evict_expired(&mut live);
            live.insert(session_id, entry)
        };
        if let Some(previous) = previous {
            previous.retire().await;
        }

        loaded.map(|()| view)
    }

    pub async fn get(&self, session_id: Uuid) -> Option<Arc<Mutex<HrStage>>> {
        let mut live = self.live.lock().await;
        self.evict_expired(&mut live);
        live.get(&session_id).map(|entry| entry.stage.clone())
    }

    /// Drops the session's stage and stops its countdown. An analysis already
    /// in flight still completes, but its outcome is not persisted.
    pub async fn discard(&self, session_id: Uuid) {
        let removed = self.live.lock().await.remove(&session_id);
        if let Some(entry) = removed {
            info!("Discarding HR stage for session {session_id}");
            entry.retire().await;
        }
    }

    fn evict_expired(&self, live: &mut HashMap<Uuid, LiveStage>) {
        let ttl = self.ttl;
        live.retain(|session_id, entry| {
            let keep = entry.started_at.elapsed() < ttl;
            if !keep {
                debug!("Evicting expired HR stage for session {session_id}");
                if let Some(handle) = &entry.countdown {
                    handle.abort();
                }
            }
            keep
        });
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.live.lock().await.len()
    }
}
