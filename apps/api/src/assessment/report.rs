//! Final report: meta-analysis over the four stage results, plus the career quiz.

use std::collections::BTreeMap;

use tracing::info;
use uuid::Uuid;

use crate::assessment::models::{CareerReport, FinalReport, Stage, StageOutcome, StageResult};
use crate::assessment::prompts::{CAREER_QUIZ_PROMPT, FINAL_REPORT_PROMPT};
use crate::assessment::schemas;
use crate::errors::AppError;
use crate::llm_client::prompts::ASSESSOR_SYSTEM;
use crate::llm_client::{call_json, GenerativeModel, ModelRequest};
use crate::session::{self, SessionKey, SessionStore};

/// The four completed stage results a report is built from.
#[derive(Debug, Clone)]
pub struct StageResults {
    pub resume: StageResult,
    pub hr: StageResult,
    pub voice: StageResult,
    pub essay: StageResult,
}

impl StageResults {
    /// Loads all four stage outcomes. Any stage that is absent or failed is a
    /// missing precondition, named in the error.
    pub async fn load(store: &dyn SessionStore, session_id: Uuid) -> Result<Self, AppError> {
        let resume = load_completed(store, session_id, Stage::Resume).await?;
        let hr = load_completed(store, session_id, Stage::Hr).await?;
        let voice = load_completed(store, session_id, Stage::Voice).await?;
        let essay = load_completed(store, session_id, Stage::Essay).await?;

        match (resume, hr, voice, essay) {
            (Some(resume), Some(hr), Some(voice), Some(essay)) => Ok(Self {
                resume,
                hr,
                voice,
                essay,
            }),
            (resume, hr, voice, essay) => {
                let missing: Vec<&str> = [
                    (Stage::Resume, resume.is_none()),
                    (Stage::Hr, hr.is_none()),
                    (Stage::Voice, voice.is_none()),
                    (Stage::Essay, essay.is_none()),
                ]
                .into_iter()
                .filter(|(_, absent)| *absent)
                .map(|(stage, _)| stage.label())
                .collect();
                Err(AppError::MissingPrecondition(format!(
                    "Complete every assessment before requesting the report. Missing: {}.",
                    missing.join(", ")
                )))
            }
        }
    }
}

async fn load_completed(
    store: &dyn SessionStore,
    session_id: Uuid,
    stage: Stage,
) -> Result<Option<StageResult>, AppError> {
    let outcome: Option<StageOutcome> =
        session::load(store, session_id, SessionKey::StageResult(stage)).await?;
    Ok(match outcome {
        Some(StageOutcome::Completed(result)) => Some(result),
        Some(StageOutcome::Failed { .. }) | None => None,
    })
}

/// One model call turning the stage results into the final report.
pub async fn generate_final_report(
    model: &dyn GenerativeModel,
    results: &StageResults,
    role: &str,
) -> Result<FinalReport, AppError> {
    let prompt = FINAL_REPORT_PROMPT
        .replace("{role}", role)
        .replace("{resume_score}", &results.resume.score.to_string())
        .replace("{hr_score}", &results.hr.score.to_string())
        .replace("{voice_score}", &results.voice.score.to_string())
        .replace("{essay_score}", &results.essay.score.to_string())
        .replace("{hr_feedback}", &results.hr.feedback.to_string())
        .replace("{voice_feedback}", &results.voice.feedback.to_string())
        .replace("{essay_feedback}", &results.essay.feedback.to_string());

    let request = ModelRequest::new(prompt, schemas::final_report()).with_system(ASSESSOR_SYSTEM);
    let report: FinalReport = call_json(model, &request)
        .await
        .map_err(|e| AppError::Llm(format!("Final report generation failed: {e}")))?;

    info!("Final report generated for role '{}'", role);
    Ok(report)
}

/// Career recommendation from personality-quiz answers. Stateless.
pub async fn analyze_quiz(
    model: &dyn GenerativeModel,
    answers: &BTreeMap<String, String>,
) -> Result<CareerReport, AppError> {
    if answers.is_empty() {
        return Err(AppError::Validation("quiz answers cannot be empty".to_string()));
    }
    let answers_json = serde_json::to_string_pretty(answers)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize quiz answers: {e}")))?;

    let request = ModelRequest::new(
        CAREER_QUIZ_PROMPT.replace("{answers_json}", &answers_json),
        schemas::career_report(),
    )
    .with_system(ASSESSOR_SYSTEM);

    call_json(model, &request)
        .await
        .map_err(|e| AppError::Llm(format!("Quiz analysis failed: {e}")))
}
