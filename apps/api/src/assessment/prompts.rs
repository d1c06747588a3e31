// All LLM prompt templates for the assessment pipeline.
// Placeholders in braces are replaced before sending.

/// Question generation prompt.
/// Replace: {resume_text}, {role}, {domain}, {level}
pub const QUESTION_GENERATION_PROMPT: &str = r#"You are an intelligent Interview Question Generator for a placement readiness platform. Your task is to generate a full set of professional assessment questions by analyzing a candidate's uploaded resume.

INPUT PARAMETERS:
1. resume_text: """{resume_text}"""
2. target_role: "{role}"
3. domain: "{domain}"
4. skill_level: "{level}"

PROCESSING INSTRUCTIONS:
1. Analyze the resume_text to identify key projects, internships, skills, and achievements.
2. Generate questions that directly reference these elements. Use project names and technologies.
3. Adjust question complexity based on skill_level (Beginner: simple explanations; Intermediate: reasoning and scenarios; Expert: optimization and strategy).
4. Each question must be short (max 2 lines), professional, and sound like a real interviewer.

OUTPUT REQUIREMENTS:
- 10 technical resume questions in multiple-choice format (question, 4 options, answerIndex of the correct option, zero-based).
- 10 HR situational questions in multiple-choice format (scenario, 4 plausible action-oriented options).
- 2 open-ended voice prompts for verbal assessment.
- 2 open-ended essay prompts for written assessment.
- All questions must feel personalized to the candidate's background.

EXAMPLE QUESTION LOGIC:
If the resume mentions a "Placement Readiness Analyzer" project:
- A good resume question tests a technology used in it (e.g., Streamlit).
- A good HR question: "Your Placement Analyzer project seems interesting. If a stakeholder requested a feature you knew was technically unfeasible with Streamlit, how would you handle the conversation?"
- A good voice prompt: "Walk me through the most challenging technical problem you solved while building your Placement Readiness Analyzer.""#;

/// HR evaluation prompt.
/// Replace: {role}, {scoring_instruction}, {answers}
pub const HR_ANALYSIS_PROMPT: &str = r#"A candidate applying for a "{role}" role answered a set of situational questions. Evaluate their choices based on professional conduct, problem-solving skills, and team collaboration. Provide a final score out of 10 and concise, actionable feedback as a list of 2-3 short bullet points.

{scoring_instruction}

Here are the questions and the candidate's chosen answers:
{answers}

Based on this, generate the feedback as a list of strings and the score."#;

/// Shown in place of an option when the timer ran out before the candidate chose.
pub const NO_ANSWER: &str = "No answer selected";

/// Voice evaluation prompt. Audio clips follow as inline parts, in prompt order.
/// Replace: {clip_count}, {scoring_instruction}, {prompts}
pub const VOICE_ANALYSIS_PROMPT: &str = r#"I will provide {clip_count} audio clips of a candidate answering different interview prompts, in the order the prompts are listed. For each audio clip, provide a separate analysis. Each analysis must include:
1. An accurate transcription of the candidate's spoken content.
2. Concise feedback on verbal fluency, grammar, clarity, and relevance to the prompt.
3. A score out of 10.

{scoring_instruction}

The prompts were:
{prompts}"#;

/// Essay evaluation prompt.
/// Replace: {essay_count}, {scoring_instruction}, {essays}
pub const ESSAY_ANALYSIS_PROMPT: &str = r#"Analyze these {essay_count} candidate-written essays. For each essay, provide separate, concise feedback on clarity, structure, and articulation, and a separate score out of 10. Return the analyses in the order the essays are listed.

{scoring_instruction}

{essays}"#;

/// Final meta-analysis prompt.
/// Replace: {role}, {resume_score}, {hr_score}, {voice_score}, {essay_score},
///          {hr_feedback}, {voice_feedback}, {essay_feedback}
pub const FINAL_REPORT_PROMPT: &str = r#"Perform a meta-analysis on a candidate's performance across four assessments (Resume, HR, Voice, Essay) for a target role of "{role}".

Here is their performance data:
- Resume Assessment Score: {resume_score}
- HR Questions Score: {hr_score}
- Voice Assessment Score: {voice_score}
- Essay Writing Score: {essay_score}
- HR Feedback: "{hr_feedback}"
- Voice Feedback: "{voice_feedback}"
- Essay Feedback: "{essay_feedback}"

Based on all this data, generate a final report. The report MUST be concise, crisp, and highly readable. Use short phrases instead of long paragraphs.
1. A holistic summary (2-3 sentences max).
2. A consolidated list of 3-4 key strengths.
3. A list of 2-3 main areas for improvement.
4. A 3-step career roadmap with brief, actionable descriptions.
5. Two specific, actionable suggestions for their resume.
6. Two project ideas suitable for their skill level, each with a list of 2-4 relevant technologies.
7. Two relevant certifications for their target role.
8. Two relevant online learning resources."#;

/// Career quiz prompt.
/// Replace: {answers_json}
pub const CAREER_QUIZ_PROMPT: &str = r#"Based on these personality quiz answers, generate a personalized career recommendation report. The user's answers are:
{answers_json}

Provide a specific job role, key strengths, a beginner's roadmap, sample projects, and learning resources."#;
