// Shared prompt fragments.
// Each adapter that needs LLM calls defines its own prompts alongside it.
// This file contains cross-cutting fragments.

/// System instruction for every assessment call.
pub const ASSESSOR_SYSTEM: &str = "You are an experienced technical interviewer and \
    career coach on a placement readiness platform. \
    You respond with JSON that matches the provided response schema exactly. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Instruction appended to every evaluation prompt.
pub const SCORING_INSTRUCTION: &str = "\
    Scores are whole numbers from 0 to 10, where 10 is outstanding. \
    Feedback must be concise and actionable. \
    Do not just state whether an answer is right or wrong; explain the reasoning behind the evaluation.";
