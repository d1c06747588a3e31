//! Per-stage scoring.
//!
//! The resume stage is scored locally against the generated answer key. HR,
//! voice and essay answers go to the model with a prompt and a response schema;
//! the adapters only template, check the response shape and clamp scores.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::assessment::models::{
    Feedback, HrQuestion, ItemAnalysis, ResumeQuestion, Score, StageResult, ESSAY_PROMPT_COUNT,
    MAX_SCORE, VOICE_PROMPT_COUNT,
};
use crate::assessment::prompts::{
    ESSAY_ANALYSIS_PROMPT, HR_ANALYSIS_PROMPT, NO_ANSWER, VOICE_ANALYSIS_PROMPT,
};
use crate::assessment::schemas::{self, MAX_HR_FEEDBACK_POINTS};
use crate::errors::AppError;
use crate::llm_client::prompts::{ASSESSOR_SYSTEM, SCORING_INSTRUCTION};
use crate::llm_client::{call_json, GenerativeModel, InlineData, ModelRequest, Part};

// ────────────────────────────────────────────────────────────────────────────
// Inputs
// ────────────────────────────────────────────────────────────────────────────

/// A recorded answer as uploaded by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioPayload {
    pub mime_type: String,
    /// Base64-encoded audio bytes.
    pub data: String,
}

#[derive(Debug, Clone)]
pub struct AudioAnswer {
    pub prompt: String,
    pub audio: AudioPayload,
}

#[derive(Debug, Clone)]
pub struct EssayAnswer {
    pub prompt: String,
    pub text: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Model response shapes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct HrAnalysis {
    feedback: Vec<String>,
    score: Score,
}

#[derive(Debug, Deserialize)]
struct VoiceAnalyses {
    analyses: Vec<VoiceItem>,
}

#[derive(Debug, Deserialize)]
struct VoiceItem {
    transcription: String,
    feedback: String,
    score: Score,
}

#[derive(Debug, Deserialize)]
struct EssayAnalyses {
    analyses: Vec<EssayItem>,
}

#[derive(Debug, Deserialize)]
struct EssayItem {
    feedback: String,
    score: Score,
}

// ────────────────────────────────────────────────────────────────────────────
// Resume stage (local)
// ────────────────────────────────────────────────────────────────────────────

/// Scores the technical MCQs against their answer key. Unanswered counts as wrong.
pub fn score_resume_answers(
    questions: &[ResumeQuestion],
    answers: &[Option<usize>],
) -> Result<StageResult, AppError> {
    check_answers(answers, questions.iter().map(|q| q.options.len()))?;
    if questions.is_empty() {
        return Err(AppError::MissingPrecondition(
            "Resume questions are missing from the assessment data.".to_string(),
        ));
    }

    let mut missed = Vec::new();
    for (i, (question, answer)) in questions.iter().zip(answers).enumerate() {
        if *answer != Some(question.answer_index) {
            let correct = question
                .options
                .get(question.answer_index)
                .map(String::as_str)
                .unwrap_or_default();
            missed.push(format!(
                "Question {}: the correct answer was \"{}\".",
                i + 1,
                correct
            ));
        }
    }

    let total = questions.len();
    let correct = total - missed.len();
    let score = Score::new(((correct * MAX_SCORE as usize * 2 + total) / (total * 2)) as i64);

    let mut feedback = vec![format!("{correct} of {total} answers correct.")];
    feedback.extend(missed);

    info!("Resume stage scored locally: {}", score);
    Ok(StageResult {
        score,
        feedback: Feedback::Points(feedback),
        analyses: Vec::new(),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// HR stage
// ────────────────────────────────────────────────────────────────────────────

pub async fn analyze_hr_answers(
    model: &dyn GenerativeModel,
    questions: &[HrQuestion],
    answers: &[Option<usize>],
    role: &str,
) -> Result<StageResult, AppError> {
    check_answers(answers, questions.iter().map(|q| q.options.len()))?;

    let request = ModelRequest::new(build_hr_prompt(questions, answers, role), schemas::hr_analysis())
        .with_system(ASSESSOR_SYSTEM);

    let analysis: HrAnalysis = call_json(model, &request)
        .await
        .map_err(|e| AppError::Llm(format!("HR analysis failed: {e}")))?;

    let mut feedback: Vec<String> = analysis
        .feedback
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if feedback.is_empty() {
        return Err(AppError::Llm("HR analysis returned no feedback".to_string()));
    }
    if feedback.len() > MAX_HR_FEEDBACK_POINTS {
        warn!(
            "HR analysis returned {} feedback points; keeping {}",
            feedback.len(),
            MAX_HR_FEEDBACK_POINTS
        );
        feedback.truncate(MAX_HR_FEEDBACK_POINTS);
    }

    info!("HR stage scored: {}", analysis.score);
    Ok(StageResult {
        score: analysis.score,
        feedback: Feedback::Points(feedback),
        analyses: Vec::new(),
    })
}

fn build_hr_prompt(questions: &[HrQuestion], answers: &[Option<usize>], role: &str) -> String {
    let listing = questions
        .iter()
        .zip(answers)
        .enumerate()
        .map(|(i, (q, answer))| {
            let choice = answer
                .and_then(|a| q.options.get(a))
                .map(String::as_str)
                .unwrap_or(NO_ANSWER);
            format!(
                "Question {}: {}\nCandidate's Choice: \"{}\"",
                i + 1,
                q.question,
                choice
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    HR_ANALYSIS_PROMPT
        .replace("{role}", role)
        .replace("{scoring_instruction}", SCORING_INSTRUCTION)
        .replace("{answers}", &listing)
}

// ────────────────────────────────────────────────────────────────────────────
// Voice stage
// ────────────────────────────────────────────────────────────────────────────

/// Transcribes and evaluates the recorded answers in one call. Audio is inlined
/// after the text prompt, in prompt order.
pub async fn analyze_voice_answers(
    model: &dyn GenerativeModel,
    answers: &[AudioAnswer],
) -> Result<StageResult, AppError> {
    if answers.len() != VOICE_PROMPT_COUNT {
        return Err(AppError::Validation(format!(
            "expected {VOICE_PROMPT_COUNT} recordings, got {}",
            answers.len()
        )));
    }
    for (i, answer) in answers.iter().enumerate() {
        validate_audio(&answer.audio)
            .map_err(|msg| AppError::Validation(format!("recording {}: {msg}", i + 1)))?;
    }

    let prompts = answers
        .iter()
        .enumerate()
        .map(|(i, a)| format!("Prompt {}: \"{}\"", i + 1, a.prompt))
        .collect::<Vec<_>>()
        .join("\n");
    let prompt = VOICE_ANALYSIS_PROMPT
        .replace("{clip_count}", &answers.len().to_string())
        .replace("{scoring_instruction}", SCORING_INSTRUCTION)
        .replace("{prompts}", &prompts);

    let request = answers.iter().fold(
        ModelRequest::new(prompt, schemas::voice_analysis(answers.len())).with_system(ASSESSOR_SYSTEM),
        |request, answer| {
            request.with_part(Part::InlineData(InlineData {
                mime_type: answer.audio.mime_type.clone(),
                data: answer.audio.data.clone(),
            }))
        },
    );

    let response: VoiceAnalyses = call_json(model, &request)
        .await
        .map_err(|e| AppError::Llm(format!("Voice analysis failed: {e}")))?;
    if response.analyses.len() != answers.len() {
        return Err(AppError::Llm(format!(
            "Voice analysis returned {} analyses for {} recordings",
            response.analyses.len(),
            answers.len()
        )));
    }

    let analyses = answers
        .iter()
        .zip(response.analyses)
        .map(|(answer, item)| ItemAnalysis {
            prompt: answer.prompt.clone(),
            transcription: Some(item.transcription),
            feedback: item.feedback,
            score: item.score,
        })
        .collect();

    let result = aggregate(analyses);
    info!("Voice stage scored: {}", result.score);
    Ok(result)
}

fn validate_audio(audio: &AudioPayload) -> Result<(), String> {
    if !audio.mime_type.starts_with("audio/") {
        return Err(format!("unsupported mime type '{}'", audio.mime_type));
    }
    let decoded = STANDARD
        .decode(audio.data.as_bytes())
        .map_err(|e| format!("audio data is not valid base64: {e}"))?;
    if decoded.is_empty() {
        return Err("audio data is empty".to_string());
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Essay stage
// ────────────────────────────────────────────────────────────────────────────

pub async fn analyze_essays(
    model: &dyn GenerativeModel,
    essays: &[EssayAnswer],
) -> Result<StageResult, AppError> {
    if essays.len() != ESSAY_PROMPT_COUNT {
        return Err(AppError::Validation(format!(
            "expected {ESSAY_PROMPT_COUNT} essays, got {}",
            essays.len()
        )));
    }

    let listing = essays
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let text = if e.text.trim().is_empty() {
                "(no response)"
            } else {
                e.text.as_str()
            };
            format!(
                "Essay Prompt {n}: \"{prompt}\"\nEssay {n}: \"{text}\"",
                n = i + 1,
                prompt = e.prompt
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    let prompt = ESSAY_ANALYSIS_PROMPT
        .replace("{essay_count}", &essays.len().to_string())
        .replace("{scoring_instruction}", SCORING_INSTRUCTION)
        .replace("{essays}", &listing);

    let request =
        ModelRequest::new(prompt, schemas::essay_analysis(essays.len())).with_system(ASSESSOR_SYSTEM);

    let response: EssayAnalyses = call_json(model, &request)
        .await
        .map_err(|e| AppError::Llm(format!("Essay analysis failed: {e}")))?;
    if response.analyses.len() != essays.len() {
        return Err(AppError::Llm(format!(
            "Essay analysis returned {} analyses for {} essays",
            response.analyses.len(),
            essays.len()
        )));
    }

    let analyses = essays
        .iter()
        .zip(response.analyses)
        .map(|(essay, item)| ItemAnalysis {
            prompt: essay.prompt.clone(),
            transcription: None,
            feedback: item.feedback,
            score: item.score,
        })
        .collect();

    let result = aggregate(analyses);
    info!("Essay stage scored: {}", result.score);
    Ok(result)
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

/// Stage score is the rounded mean of the item scores; feedback is one point per item.
fn aggregate(analyses: Vec<ItemAnalysis>) -> StageResult {
    let scores: Vec<Score> = analyses.iter().map(|a| a.score).collect();
    StageResult {
        score: Score::mean(&scores),
        feedback: Feedback::Points(analyses.iter().map(|a| a.feedback.clone()).collect()),
        analyses,
    }
}

/// One answer slot per question; selected indices must exist.
fn check_answers(
    answers: &[Option<usize>],
    option_counts: impl ExactSizeIterator<Item = usize>,
) -> Result<(), AppError> {
    if answers.len() != option_counts.len() {
        return Err(AppError::Validation(format!(
            "expected {} answers, got {}",
            option_counts.len(),
            answers.len()
        )));
    }
    for (i, (answer, options)) in answers.iter().zip(option_counts).enumerate() {
        if let Some(a) = answer {
            if *a >= options {
                return Err(AppError::Validation(format!(
                    "answer {} selects option {a}, but the question has {options} options",
                    i + 1
                )));
            }
        }
    }
    Ok(())
}
