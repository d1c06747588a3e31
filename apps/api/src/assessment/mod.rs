// Interview-preparation pipeline: resume → question set → four scored stages → final report.
// Every model call goes through llm_client; every persisted value through session.

pub mod generator;
pub mod handlers;
pub mod hr_stage;
pub mod models;
pub mod prompts;
pub mod report;
pub mod schemas;
pub mod scoring;
