//! Question generation. One model call turns resume text + config into a QuestionSet.

use tracing::{info, warn};

use crate::assessment::models::{AssessmentConfig, QuestionSet};
use crate::assessment::prompts::QUESTION_GENERATION_PROMPT;
use crate::assessment::schemas;
use crate::errors::AppError;
use crate::llm_client::prompts::ASSESSOR_SYSTEM;
use crate::llm_client::{call_json, GenerativeModel, ModelRequest};

/// Generates the personalized question set for a session.
///
/// The shape (10/10/2/2, four options, in-range answer index) is requested via the
/// response schema and checked again here; a mismatch is an upstream failure.
/// No retry.
pub async fn generate_question_set(
    model: &dyn GenerativeModel,
    resume_text: &str,
    config: &AssessmentConfig,
) -> Result<QuestionSet, AppError> {
    if resume_text.trim().is_empty() {
        return Err(AppError::Validation("resume text cannot be empty".to_string()));
    }
    config.validate().map_err(AppError::Validation)?;

    let request = ModelRequest::new(build_prompt(resume_text, config), schemas::question_set())
        .with_system(ASSESSOR_SYSTEM);

    let set: QuestionSet = call_json(model, &request)
        .await
        .map_err(|e| AppError::Llm(format!("Question generation failed: {e}")))?;

    if let Err(violations) = set.validate() {
        warn!("Generated question set has the wrong shape: {:?}", violations);
        return Err(AppError::Llm(format!(
            "Question generation returned a malformed set: {}",
            violations.join("; ")
        )));
    }

    info!(
        "Generated question set for role '{}' ({})",
        config.role, config.level
    );
    Ok(set)
}

fn build_prompt(resume_text: &str, config: &AssessmentConfig) -> String {
    // Resume text goes in last so braces inside it are never treated as placeholders.
    QUESTION_GENERATION_PROMPT
        .replace("{role}", &config.role)
        .replace("{domain}", &config.domain)
        .replace("{level}", &config.level.to_string())
        .replace("{resume_text}", resume_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::models::fixtures;
    use crate::testing::ScriptedModel;

    const RESUME: &str = "Jane Doe. Built a Placement Readiness Analyzer with Streamlit and pandas.";

    #[test]
    fn test_prompt_includes_every_parameter() {
        let prompt = build_prompt(RESUME, &fixtures::config());
        assert!(prompt.contains("Placement Readiness Analyzer with Streamlit"));
        assert!(prompt.contains("target_role: \"Data Analyst\""));
        assert!(prompt.contains("domain: \"Healthcare\""));
        assert!(prompt.contains("skill_level: \"Beginner\""));
    }

    #[test]
    fn test_placeholder_lookalikes_in_resume_survive() {
        let prompt = build_prompt("Templating: {role} and {level}", &fixtures::config());
        assert!(prompt.contains("Templating: {role} and {level}"));
    }

    #[tokio::test]
    async fn test_well_formed_response_is_returned() {
        let model = ScriptedModel::with_json(&fixtures::question_set());
        let set = generate_question_set(&model, RESUME, &fixtures::config())
            .await
            .unwrap();

        assert_eq!(set.resume_questions.len(), 10);
        assert_eq!(set.hr_questions.len(), 10);
        assert_eq!(set.voice_prompts.len(), 2);
        assert_eq!(set.essay_prompts.len(), 2);
        assert_eq!(model.calls(), 1);

        let request = model.last_request().unwrap();
        assert_eq!(request.system.as_deref(), Some(ASSESSOR_SYSTEM));
        assert!(request.prompt_text().contains("Streamlit"));
    }

    #[tokio::test]
    async fn test_short_set_is_an_upstream_error() {
        let mut set = fixtures::question_set();
        set.hr_questions.truncate(7);
        let model = ScriptedModel::with_json(&set);

        let err = generate_question_set(&model, RESUME, &fixtures::config())
            .await
            .unwrap_err();
        match err {
            AppError::Llm(msg) => assert!(msg.contains("hr_questions: expected 10, got 7")),
            other => panic!("expected Llm error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_json_is_an_upstream_error() {
        let model = ScriptedModel::with_text("{\"resume_questions\": ");
        let err = generate_question_set(&model, RESUME, &fixtures::config())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));
    }

    #[tokio::test]
    async fn test_model_failure_is_not_retried() {
        let model = ScriptedModel::failing();
        let err = generate_question_set(&model, RESUME, &fixtures::config())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_resume_skips_model() {
        let model = ScriptedModel::failing();
        let err = generate_question_set(&model, "   ", &fixtures::config())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(model.calls(), 0);
    }
}
