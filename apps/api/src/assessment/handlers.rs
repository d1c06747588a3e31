//! Axum route handlers for the assessment API.

use std::collections::BTreeMap;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::assessment::generator::generate_question_set;
use crate::assessment::hr_stage::{self, HrStageView, SubmitTrigger};
use crate::assessment::models::{
    AssessmentConfig, CareerReport, FinalReport, QuestionSet, Score, Stage, StageOutcome,
    StageResult,
};
use crate::assessment::report::{analyze_quiz, generate_final_report, StageResults};
use crate::assessment::scoring::{
    analyze_essays, analyze_voice_answers, score_resume_answers, AudioAnswer, AudioPayload,
    EssayAnswer,
};
use crate::document::{extract_resume_text, ResumeFormat};
use crate::errors::AppError;
use crate::session::{self, SessionKey};
use crate::state::AppState;

const RESUME_FIELD: &str = "resume";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub session_id: Uuid,
    pub config: AssessmentConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Serialize)]
pub struct StageSummary {
    pub stage: Stage,
    pub status: StageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,
}

#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub config: AssessmentConfig,
    pub resume_uploaded: bool,
    pub questions_ready: bool,
    pub stages: Vec<StageSummary>,
    pub report_ready: bool,
}

/// A multiple-choice question as shown to the candidate: no answer key.
#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub question: String,
    pub options: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct QuestionsResponse {
    pub resume_questions: Vec<QuestionView>,
    pub hr_questions: Vec<QuestionView>,
    pub voice_prompts: Vec<String>,
    pub essay_prompts: Vec<String>,
}

impl From<&QuestionSet> for QuestionsResponse {
    fn from(set: &QuestionSet) -> Self {
        Self {
            resume_questions: set
                .resume_questions
                .iter()
                .map(|q| QuestionView {
                    question: q.question.clone(),
                    options: q.options.clone(),
                })
                .collect(),
            hr_questions: set
                .hr_questions
                .iter()
                .map(|q| QuestionView {
                    question: q.question.clone(),
                    options: q.options.clone(),
                })
                .collect(),
            voice_prompts: set.voice_prompts.clone(),
            essay_prompts: set.essay_prompts.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnswersRequest {
    pub answers: Vec<Option<usize>>,
}

#[derive(Debug, Deserialize)]
pub struct SelectOptionRequest {
    pub option: usize,
}

#[derive(Debug, Deserialize)]
pub struct VoiceRequest {
    pub recordings: Vec<AudioPayload>,
}

#[derive(Debug, Deserialize)]
pub struct EssayRequest {
    pub essays: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuizRequest {
    pub answers: BTreeMap<String, String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn require_config(state: &AppState, session_id: Uuid) -> Result<AssessmentConfig, AppError> {
    session::load(state.store.as_ref(), session_id, SessionKey::Config)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))
}

async fn require_questions(state: &AppState, session_id: Uuid) -> Result<QuestionSet, AppError> {
    session::load(state.store.as_ref(), session_id, SessionKey::Questions)
        .await?
        .ok_or_else(|| {
            AppError::MissingPrecondition(
                "Personalized questions not found. Please start from the resume step.".to_string(),
            )
        })
}

/// Persists a stage outcome. Upstream failures leave an error marker under the
/// stage key before the error is returned; rejected input leaves the key alone.
async fn record_outcome(
    state: &AppState,
    session_id: Uuid,
    stage: Stage,
    outcome: Result<StageResult, AppError>,
) -> Result<StageResult, AppError> {
    let key = SessionKey::StageResult(stage);
    match outcome {
        Ok(result) => {
            let stored = StageOutcome::Completed(result.clone());
            session::save(state.store.as_ref(), session_id, key, &stored).await?;
            Ok(result)
        }
        Err(e @ AppError::Llm(_)) => {
            warn!("{} analysis failed for session {session_id}: {e}", stage.label());
            let marker = StageOutcome::failed(e.user_message());
            session::save(state.store.as_ref(), session_id, key, &marker).await?;
            Err(e)
        }
        Err(e) => Err(e),
    }
}

async fn read_resume_field(multipart: &mut Multipart) -> Result<(Bytes, ResumeFormat), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some(RESUME_FIELD) {
            continue;
        }
        let format = ResumeFormat::detect(field.content_type(), field.file_name())?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("failed to read upload: {e}")))?;
        return Ok((bytes, format));
    }
    Err(AppError::Validation(format!(
        "multipart field '{RESUME_FIELD}' is required"
    )))
}

// ────────────────────────────────────────────────────────────────────────────
// Sessions
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
    Json(config): Json<AssessmentConfig>,
) -> Result<(StatusCode, Json<SessionCreated>), AppError> {
    config.validate().map_err(AppError::Validation)?;

    let session_id = Uuid::new_v4();
    session::save(state.store.as_ref(), session_id, SessionKey::Config, &config).await?;
    info!(
        "Session {session_id} created for '{}' ({}, {})",
        config.role, config.level, config.domain
    );

    Ok((
        StatusCode::CREATED,
        Json(SessionCreated { session_id, config }),
    ))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionSummary>, AppError> {
    let config = require_config(&state, session_id).await?;
    let store = state.store.as_ref();

    let resume_text: Option<String> = session::load(store, session_id, SessionKey::ResumeText).await?;
    let questions: Option<QuestionSet> = session::load(store, session_id, SessionKey::Questions).await?;
    let report: Option<FinalReport> = session::load(store, session_id, SessionKey::FinalReport).await?;

    let mut stages = Vec::with_capacity(Stage::ALL.len());
    for stage in Stage::ALL {
        let outcome: Option<StageOutcome> =
            session::load(store, session_id, SessionKey::StageResult(stage)).await?;
        let (status, score) = match outcome {
            None => (StageStatus::Pending, None),
            Some(StageOutcome::Failed { .. }) => (StageStatus::Failed, None),
            Some(StageOutcome::Completed(result)) => (StageStatus::Completed, Some(result.score)),
        };
        stages.push(StageSummary {
            stage,
            status,
            score,
        });
    }

    Ok(Json(SessionSummary {
        session_id,
        config,
        resume_uploaded: resume_text.is_some(),
        questions_ready: questions.is_some(),
        stages,
        report_ready: report.is_some(),
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Resume stage
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions/:id/resume
///
/// Multipart upload (field `resume`). Extracts the text and generates the
/// question set. On success the live HR stage and every result derived from a
/// previous set are discarded; on failure the stored session is left untouched.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<QuestionsResponse>, AppError> {
    let config = require_config(&state, session_id).await?;
    let (bytes, format) = read_resume_field(&mut multipart).await?;
    info!(
        "Resume upload for session {session_id}: {} bytes ({format:?})",
        bytes.len()
    );

    let resume_text = extract_resume_text(bytes, format).await?;
    let set = generate_question_set(state.model.as_ref(), &resume_text, &config).await?;

    // Discard before clearing keys: an HR outcome already being persisted lands first.
    state.hr_stages.discard(session_id).await;

    let store = state.store.as_ref();
    for key in SessionKey::downstream_of_questions() {
        session::remove(store, session_id, key).await?;
    }
    session::save(store, session_id, SessionKey::ResumeText, &resume_text).await?;
    session::save(store, session_id, SessionKey::Questions, &set).await?;

    Ok(Json(QuestionsResponse::from(&set)))
}

/// GET /api/v1/sessions/:id/questions
pub async fn handle_get_questions(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<QuestionsResponse>, AppError> {
    require_config(&state, session_id).await?;
    let set = require_questions(&state, session_id).await?;
    Ok(Json(QuestionsResponse::from(&set)))
}

/// POST /api/v1/sessions/:id/resume/answers
pub async fn handle_submit_resume_answers(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<AnswersRequest>,
) -> Result<Json<StageResult>, AppError> {
    require_config(&state, session_id).await?;
    let set = require_questions(&state, session_id).await?;

    let outcome = score_resume_answers(&set.resume_questions, &request.answers);
    let result = record_outcome(&state, session_id, Stage::Resume, outcome).await?;
    Ok(Json(result))
}

// ────────────────────────────────────────────────────────────────────────────
// HR stage
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions/:id/hr/start
///
/// (Re)starts the timed stage. Fails with 409 when no questions were generated.
pub async fn handle_start_hr(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<HrStageView>, AppError> {
    require_config(&state, session_id).await?;
    let view = state
        .hr_stages
        .start(session_id, state.config.hr_stage_seconds, &state.stage_context())
        .await?;
    Ok(Json(view))
}

/// GET /api/v1/sessions/:id/hr
pub async fn handle_get_hr(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<HrStageView>, AppError> {
    let stage = state
        .hr_stages
        .get(session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("No HR stage started for session {session_id}")))?;
    let view = stage.lock().await.view();
    Ok(Json(view))
}

/// PUT /api/v1/sessions/:id/hr/answers/:index
pub async fn handle_select_hr_option(
    State(state): State<AppState>,
    Path((session_id, index)): Path<(Uuid, usize)>,
    Json(request): Json<SelectOptionRequest>,
) -> Result<Json<HrStageView>, AppError> {
    let stage = state
        .hr_stages
        .get(session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("No HR stage started for session {session_id}")))?;
    let mut guard = stage.lock().await;
    guard.select(index, request.option)?;
    Ok(Json(guard.view()))
}

/// POST /api/v1/sessions/:id/hr/submit
pub async fn handle_submit_hr(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<HrStageView>, AppError> {
    let stage = state
        .hr_stages
        .get(session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("No HR stage started for session {session_id}")))?;
    let view = hr_stage::submit(&stage, SubmitTrigger::Manual, &state.stage_context()).await?;
    Ok(Json(view))
}

// ────────────────────────────────────────────────────────────────────────────
// Voice and essay stages
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions/:id/voice
///
/// Recordings are paired with the stored voice prompts in order.
pub async fn handle_submit_voice(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<VoiceRequest>,
) -> Result<Json<StageResult>, AppError> {
    require_config(&state, session_id).await?;
    let set = require_questions(&state, session_id).await?;
    if request.recordings.len() != set.voice_prompts.len() {
        return Err(AppError::Validation(format!(
            "expected {} recordings, got {}",
            set.voice_prompts.len(),
            request.recordings.len()
        )));
    }

    let answers: Vec<AudioAnswer> = set
        .voice_prompts
        .into_iter()
        .zip(request.recordings)
        .map(|(prompt, audio)| AudioAnswer { prompt, audio })
        .collect();

    let outcome = analyze_voice_answers(state.model.as_ref(), &answers).await;
    let result = record_outcome(&state, session_id, Stage::Voice, outcome).await?;
    Ok(Json(result))
}

/// POST /api/v1/sessions/:id/essay
pub async fn handle_submit_essay(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<EssayRequest>,
) -> Result<Json<StageResult>, AppError> {
    require_config(&state, session_id).await?;
    let set = require_questions(&state, session_id).await?;
    if request.essays.len() != set.essay_prompts.len() {
        return Err(AppError::Validation(format!(
            "expected {} essays, got {}",
            set.essay_prompts.len(),
            request.essays.len()
        )));
    }

    let essays: Vec<EssayAnswer> = set
        .essay_prompts
        .into_iter()
        .zip(request.essays)
        .map(|(prompt, text)| EssayAnswer { prompt, text })
        .collect();

    let outcome = analyze_essays(state.model.as_ref(), &essays).await;
    let result = record_outcome(&state, session_id, Stage::Essay, outcome).await?;
    Ok(Json(result))
}

// ────────────────────────────────────────────────────────────────────────────
// Reports
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions/:id/report
///
/// Requires all four stages completed. Regenerates on every call.
pub async fn handle_generate_report(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<FinalReport>, AppError> {
    let config = require_config(&state, session_id).await?;
    let results = StageResults::load(state.store.as_ref(), session_id).await?;

    let report = generate_final_report(state.model.as_ref(), &results, &config.role).await?;
    session::save(state.store.as_ref(), session_id, SessionKey::FinalReport, &report).await?;

    Ok(Json(report))
}

/// GET /api/v1/sessions/:id/report
pub async fn handle_get_report(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<FinalReport>, AppError> {
    require_config(&state, session_id).await?;
    session::load(state.store.as_ref(), session_id, SessionKey::FinalReport)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No report generated for session {session_id}")))
}

/// POST /api/v1/quiz
///
/// Stateless career recommendation from personality-quiz answers.
pub async fn handle_quiz(
    State(state): State<AppState>,
    Json(request): Json<QuizRequest>,
) -> Result<Json<CareerReport>, AppError> {
    let report = analyze_quiz(state.model.as_ref(), &request.answers).await?;
    Ok(Json(report))
}
