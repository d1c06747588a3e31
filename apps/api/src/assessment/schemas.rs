//! Response schemas for every assessment call.

use crate::assessment::models::{
    ESSAY_PROMPT_COUNT, HR_QUESTION_COUNT, OPTIONS_PER_QUESTION, RESUME_QUESTION_COUNT,
    VOICE_PROMPT_COUNT,
};
use crate::llm_client::Schema;

/// Upper bound on HR feedback points. The prompt asks for 2-3.
pub const MAX_HR_FEEDBACK_POINTS: usize = 5;

fn options() -> Schema {
    Schema::array(Schema::string()).exactly(OPTIONS_PER_QUESTION as u32)
}

fn name_url() -> Schema {
    Schema::object([("name", Schema::string()), ("url", Schema::string())])
}

fn roadmap_step() -> Schema {
    Schema::object([
        ("step", Schema::string()),
        ("description", Schema::string()),
    ])
}

pub fn question_set() -> Schema {
    Schema::object([
        (
            "resume_questions",
            Schema::array(Schema::object([
                ("question", Schema::string()),
                ("options", options()),
                (
                    "answerIndex",
                    Schema::integer().describe("Zero-based index of the correct option."),
                ),
            ]))
            .exactly(RESUME_QUESTION_COUNT as u32),
        ),
        (
            "hr_questions",
            Schema::array(Schema::object([
                ("question", Schema::string()),
                ("options", options()),
            ]))
            .exactly(HR_QUESTION_COUNT as u32),
        ),
        (
            "voice_prompts",
            Schema::array(Schema::string()).exactly(VOICE_PROMPT_COUNT as u32),
        ),
        (
            "essay_prompts",
            Schema::array(Schema::string()).exactly(ESSAY_PROMPT_COUNT as u32),
        ),
    ])
}

pub fn hr_analysis() -> Schema {
    Schema::object([
        (
            "feedback",
            Schema::array(Schema::string())
                .bounded(1, MAX_HR_FEEDBACK_POINTS as u32)
                .describe("A list of constructive, short feedback points on the candidate's choices."),
        ),
        (
            "score",
            Schema::integer().describe("A score from 0 to 10 based on the quality of judgment."),
        ),
    ])
}

pub fn voice_analysis(clip_count: usize) -> Schema {
    Schema::object([(
        "analyses",
        Schema::array(Schema::object([
            (
                "prompt",
                Schema::string().describe("The original prompt for this audio clip."),
            ),
            (
                "transcription",
                Schema::string().describe("The transcribed text from the audio."),
            ),
            (
                "feedback",
                Schema::string()
                    .describe("Feedback on fluency, grammar, and clarity for this answer."),
            ),
            (
                "score",
                Schema::integer().describe("A score from 0 to 10 for this answer."),
            ),
        ]))
        .exactly(clip_count as u32),
    )])
}

pub fn essay_analysis(essay_count: usize) -> Schema {
    Schema::object([(
        "analyses",
        Schema::array(Schema::object([
            (
                "prompt",
                Schema::string().describe("The original prompt for this essay."),
            ),
            (
                "feedback",
                Schema::string().describe("Feedback on clarity and structure for this essay."),
            ),
            (
                "score",
                Schema::integer().describe("A score from 0 to 10 for this essay."),
            ),
        ]))
        .exactly(essay_count as u32),
    )])
}

pub fn final_report() -> Schema {
    Schema::object([
        ("summary", Schema::string()),
        ("consolidatedStrengths", Schema::array(Schema::string())),
        ("areasForImprovement", Schema::array(Schema::string())),
        ("careerRoadmap", Schema::array(roadmap_step())),
        (
            "resumeImprovements",
            Schema::array(Schema::object([
                ("area", Schema::string()),
                ("suggestion", Schema::string()),
            ]))
            .describe("Actionable feedback on the resume."),
        ),
        (
            "sampleProjects",
            Schema::array(Schema::object([
                ("name", Schema::string()),
                ("description", Schema::string()),
                ("technologies", Schema::array(Schema::string())),
            ]))
            .describe("Relevant project ideas."),
        ),
        (
            "suggestedCertifications",
            Schema::array(name_url()).describe("Relevant certification suggestions."),
        ),
        (
            "resources",
            Schema::array(name_url()).describe("Links to suggested learning resources."),
        ),
    ])
}

pub fn career_report() -> Schema {
    Schema::object([
        (
            "jobRole",
            Schema::string().describe("A suggested job role for the user."),
        ),
        (
            "strengths",
            Schema::array(Schema::string()).describe("A list of the user's key strengths."),
        ),
        (
            "roadmap",
            Schema::array(roadmap_step()).describe("A beginner's roadmap with clear steps."),
        ),
        (
            "projects",
            Schema::array(Schema::object([
                ("name", Schema::string()),
                ("description", Schema::string()),
            ]))
            .describe("Sample project ideas."),
        ),
        (
            "resources",
            Schema::array(name_url()).describe("Links to learning resources."),
        ),
    ])
}
