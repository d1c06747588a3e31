//! Assessment data model.
//!
//! Types that travel to and from the model keep the field names of their
//! response schemas (`answerIndex`, `consolidatedStrengths`, ...) so a stored
//! value, a model response and an API response share one JSON shape.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const RESUME_QUESTION_COUNT: usize = 10;
pub const HR_QUESTION_COUNT: usize = 10;
pub const VOICE_PROMPT_COUNT: usize = 2;
pub const ESSAY_PROMPT_COUNT: usize = 2;
pub const OPTIONS_PER_QUESTION: usize = 4;
pub const MAX_SCORE: u8 = 10;

// ────────────────────────────────────────────────────────────────────────────
// Session configuration
// ────────────────────────────────────────────────────────────────────────────

/// Candidate skill level. Drives question complexity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Expert,
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SkillLevel::Beginner => "Beginner",
            SkillLevel::Intermediate => "Intermediate",
            SkillLevel::Expert => "Expert",
        };
        f.write_str(label)
    }
}

/// Chosen once at session start; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentConfig {
    pub role: String,
    pub level: SkillLevel,
    pub domain: String,
}

impl AssessmentConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.role.trim().is_empty() {
            return Err("role cannot be empty".to_string());
        }
        if self.domain.trim().is_empty() {
            return Err("domain cannot be empty".to_string());
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Question set
// ────────────────────────────────────────────────────────────────────────────

/// Technical multiple-choice question with a known correct option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeQuestion {
    pub question: String,
    pub options: Vec<String>,
    #[serde(rename = "answerIndex")]
    pub answer_index: usize,
}

/// Situational-judgment question. No option is "correct"; the model judges the choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HrQuestion {
    pub question: String,
    pub options: Vec<String>,
}

/// Everything generated from the resume for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSet {
    pub resume_questions: Vec<ResumeQuestion>,
    pub hr_questions: Vec<HrQuestion>,
    pub voice_prompts: Vec<String>,
    pub essay_prompts: Vec<String>,
}

impl QuestionSet {
    /// Checks the fixed shape: 10 + 10 four-option questions, 2 voice and 2 essay prompts.
    /// Returns every violation found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut violations = Vec::new();

        check_count(
            &mut violations,
            "resume_questions",
            self.resume_questions.len(),
            RESUME_QUESTION_COUNT,
        );
        check_count(
            &mut violations,
            "hr_questions",
            self.hr_questions.len(),
            HR_QUESTION_COUNT,
        );
        check_count(
            &mut violations,
            "voice_prompts",
            self.voice_prompts.len(),
            VOICE_PROMPT_COUNT,
        );
        check_count(
            &mut violations,
            "essay_prompts",
            self.essay_prompts.len(),
            ESSAY_PROMPT_COUNT,
        );

        for (i, q) in self.resume_questions.iter().enumerate() {
            check_count(
                &mut violations,
                &format!("resume_questions[{i}].options"),
                q.options.len(),
                OPTIONS_PER_QUESTION,
            );
            if q.answer_index >= q.options.len() {
                violations.push(format!(
                    "resume_questions[{i}].answerIndex {} is out of range",
                    q.answer_index
                ));
            }
        }
        for (i, q) in self.hr_questions.iter().enumerate() {
            check_count(
                &mut violations,
                &format!("hr_questions[{i}].options"),
                q.options.len(),
                OPTIONS_PER_QUESTION,
            );
        }
        for (field, prompts) in [
            ("voice_prompts", &self.voice_prompts),
            ("essay_prompts", &self.essay_prompts),
        ] {
            if prompts.iter().any(|p| p.trim().is_empty()) {
                violations.push(format!("{field} contains an empty prompt"));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

fn check_count(violations: &mut Vec<String>, field: &str, actual: usize, expected: usize) {
    if actual != expected {
        violations.push(format!("{field}: expected {expected}, got {actual}"));
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stage results
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Resume,
    Hr,
    Voice,
    Essay,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Resume, Stage::Hr, Stage::Voice, Stage::Essay];

    pub fn label(self) -> &'static str {
        match self {
            Stage::Resume => "Resume",
            Stage::Hr => "HR",
            Stage::Voice => "Voice",
            Stage::Essay => "Essay",
        }
    }
}

/// A stage score. Always an integer in `0..=10`: anything outside is clamped on the way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub struct Score(u8);

impl Score {
    pub fn new(raw: i64) -> Self {
        Score(raw.clamp(0, MAX_SCORE as i64) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Rounded mean of the given scores (half rounds up); zero for an empty slice.
    pub fn mean(scores: &[Score]) -> Score {
        if scores.is_empty() {
            return Score(0);
        }
        let total: u32 = scores.iter().map(|s| s.0 as u32).sum();
        let count = scores.len() as u32;
        Score::new(((total * 2 + count) / (count * 2)) as i64)
    }
}

impl From<i64> for Score {
    fn from(raw: i64) -> Self {
        Score::new(raw)
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> Self {
        score.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, MAX_SCORE)
    }
}

/// Stage feedback: a single paragraph or a list of points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Feedback {
    Points(Vec<String>),
    Text(String),
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feedback::Points(points) => f.write_str(&points.join(" ")),
            Feedback::Text(text) => f.write_str(text),
        }
    }
}

/// Per-prompt evaluation inside the voice and essay stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAnalysis {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
    pub feedback: String,
    pub score: Score,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResult {
    pub score: Score,
    pub feedback: Feedback,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub analyses: Vec<ItemAnalysis>,
}

/// What is persisted under a stage key: a result, or the marker written when analysis failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageOutcome {
    Failed { error: String },
    Completed(StageResult),
}

impl StageOutcome {
    pub fn failed(message: impl Into<String>) -> Self {
        StageOutcome::Failed {
            error: message.into(),
        }
    }

    pub fn result(&self) -> Option<&StageResult> {
        match self {
            StageOutcome::Completed(result) => Some(result),
            StageOutcome::Failed { .. } => None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Reports
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapStep {
    pub step: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeImprovement {
    pub area: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectIdea {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub technologies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    pub url: String,
}

/// Meta-analysis across all four stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalReport {
    pub summary: String,
    pub consolidated_strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub career_roadmap: Vec<RoadmapStep>,
    pub resume_improvements: Vec<ResumeImprovement>,
    pub sample_projects: Vec<ProjectIdea>,
    pub suggested_certifications: Vec<Link>,
    pub resources: Vec<Link>,
}

/// Career recommendation from the personality quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerReport {
    pub job_role: String,
    pub strengths: Vec<String>,
    pub roadmap: Vec<RoadmapStep>,
    pub projects: Vec<ProjectIdea>,
    pub resources: Vec<Link>,
}
