pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::assessment::handlers;
use crate::state::AppState;

/// Resume PDFs and base64 audio both arrive in request bodies.
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/quiz", post(handlers::handle_quiz))
        // Sessions
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route("/api/v1/sessions/:id", get(handlers::handle_get_session))
        .route(
            "/api/v1/sessions/:id/questions",
            get(handlers::handle_get_questions),
        )
        // Resume stage
        .route(
            "/api/v1/sessions/:id/resume",
            post(handlers::handle_upload_resume),
        )
        .route(
            "/api/v1/sessions/:id/resume/answers",
            post(handlers::handle_submit_resume_answers),
        )
        // HR stage
        .route("/api/v1/sessions/:id/hr", get(handlers::handle_get_hr))
        .route(
            "/api/v1/sessions/:id/hr/start",
            post(handlers::handle_start_hr),
        )
        .route(
            "/api/v1/sessions/:id/hr/answers/:index",
            put(handlers::handle_select_hr_option),
        )
        .route(
            "/api/v1/sessions/:id/hr/submit",
            post(handlers::handle_submit_hr),
        )
        // Voice and essay stages
        .route(
            "/api/v1/sessions/:id/voice",
            post(handlers::handle_submit_voice),
        )
        .route(
            "/api/v1/sessions/:id/essay",
            post(handlers::handle_submit_essay),
        )
        // Final report
        .route(
            "/api/v1/sessions/:id/report",
            post(handlers::handle_generate_report).get(handlers::handle_get_report),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::models::{fixtures, Stage, StageOutcome};
    use crate::errors::LLM_FAILURE_MESSAGE;
    use crate::session::{self, MemoryStore, SessionKey};
    use crate::testing::{app_state, ScriptedModel};
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;
    use uuid::Uuid;

    const BOUNDARY: &str = "ascend-test-boundary";
    const RESUME: &str = "Jane Doe\nData analyst intern. Built a Placement Readiness Analyzer in Streamlit.";

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        read(response).await
    }

    async fn read(response: axum::response::Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn upload_resume(app: &Router, session_id: &str, file_name: &str, mime: &str, content: &str) -> (StatusCode, Value) {
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"resume\"; filename=\"{file_name}\"\r\nContent-Type: {mime}\r\n\r\n{content}\r\n--{BOUNDARY}--\r\n"
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/v1/sessions/{session_id}/resume"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        read(app.clone().oneshot(request).await.unwrap()).await
    }

    async fn create_session(app: &Router) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/v1/sessions",
            Some(json!({"role": "Data Analyst", "level": "Beginner", "domain": "Healthcare"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["session_id"].as_str().unwrap().to_string()
    }

    fn hr_reply() -> Value {
        json!({"feedback": ["Balanced judgment."], "score": 8})
    }

    fn voice_reply() -> Value {
        json!({"analyses": [
            {"transcription": "I fixed a race in the loader.", "feedback": "Clear.", "score": 7},
            {"transcription": "I changed my chart choice.", "feedback": "Good reflection.", "score": 8}
        ]})
    }

    fn essay_reply() -> Value {
        json!({"analyses": [
            {"feedback": "Well argued.", "score": 9},
            {"feedback": "Needs structure.", "score": 6}
        ]})
    }

    fn report_reply() -> Value {
        json!({
            "summary": "Ready for junior analyst interviews.",
            "consolidatedStrengths": ["SQL"],
            "areasForImprovement": ["Storytelling"],
            "careerRoadmap": [{"step": "Portfolio", "description": "Publish two case studies."}],
            "resumeImprovements": [{"area": "Summary", "suggestion": "Lead with impact."}],
            "sampleProjects": [{"name": "Readmission model", "description": "Predict 30-day readmissions."}],
            "suggestedCertifications": [{"name": "Google Data Analytics", "url": "https://example.com/gda"}],
            "resources": [{"name": "Kaggle Learn", "url": "https://example.com/kaggle"}]
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _) = app_state(Arc::new(ScriptedModel::failing()));
        let app = build_router(state);
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "ascend-api");
    }

    #[tokio::test]
    async fn test_create_session_rejects_blank_role() {
        let (state, _) = app_state(Arc::new(ScriptedModel::failing()));
        let app = build_router(state);
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/sessions",
            Some(json!({"role": " ", "level": "Expert", "domain": "Fintech"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let (state, _) = app_state(Arc::new(ScriptedModel::failing()));
        let app = build_router(state);
        let uri = format!("/api/v1/sessions/{}", Uuid::new_v4());
        let (status, _) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_hr_start_without_questions_is_409_and_never_calls_model() {
        let model = Arc::new(ScriptedModel::with_json(&hr_reply()));
        let (state, _) = app_state(model.clone());
        let app = build_router(state);
        let id = create_session(&app).await;

        let (status, body) = send(&app, Method::POST, &format!("/api/v1/sessions/{id}/hr/start"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "PRECONDITION_FAILED");
        assert_eq!(
            body["error"]["message"],
            "Personalized questions not found. Please start from the resume step."
        );

        let (status, body) = send(&app, Method::GET, &format!("/api/v1/sessions/{id}/hr"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phase"], "error");

        let (status, _) = send(&app, Method::POST, &format!("/api/v1/sessions/{id}/hr/submit"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_report_requires_every_stage() {
        let model = Arc::new(ScriptedModel::with_json(&report_reply()));
        let (state, _) = app_state(model.clone());
        let app = build_router(state);
        let id = create_session(&app).await;

        let (status, body) = send(&app, Method::POST, &format!("/api/v1/sessions/{id}/report"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Resume, HR, Voice, Essay"));
        assert_eq!(model.calls(), 0);

        let (status, _) = send(&app, Method::GET, &format!("/api/v1/sessions/{id}/report"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unsupported_upload_is_rejected_before_model() {
        let model = Arc::new(ScriptedModel::with_json(&fixtures::question_set()));
        let (state, _) = app_state(model.clone());
        let app = build_router(state);
        let id = create_session(&app).await;

        let (status, body) = upload_resume(&app, &id, "resume.docx", "application/msword", "binary").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "DOCUMENT_PARSE_ERROR");

        let (status, body) = upload_resume(&app, &id, "resume.pdf", "application/pdf", "not a pdf").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body["error"]["message"],
            "Could not parse the PDF file. It might be corrupted or in an unsupported format."
        );
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_voice_failure_is_502_and_leaves_error_marker() {
        let model = Arc::new(ScriptedModel::failing());
        let (state, store) = app_state(model.clone());
        let app = build_router(state);
        let id = create_session(&app).await;
        let session_id: Uuid = id.parse().unwrap();
        session::save(store.as_ref(), session_id, SessionKey::Questions, &fixtures::question_set())
            .await
            .unwrap();

        let recordings = json!({"recordings": [
            {"mime_type": "audio/webm", "data": "GkXfow=="},
            {"mime_type": "audio/webm", "data": "GkXfow=="}
        ]});
        let (status, body) = send(&app, Method::POST, &format!("/api/v1/sessions/{id}/voice"), Some(recordings)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["message"], LLM_FAILURE_MESSAGE);

        let stored: Option<StageOutcome> =
            session::load(store.as_ref(), session_id, SessionKey::StageResult(Stage::Voice))
                .await
                .unwrap();
        assert_eq!(stored, Some(StageOutcome::failed(LLM_FAILURE_MESSAGE)));

        let (_, summary) = send(&app, Method::GET, &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(summary["stages"][2]["stage"], "voice");
        assert_eq!(summary["stages"][2]["status"], "failed");
    }

    async fn stored_stage(store: &MemoryStore, id: &str, stage: Stage) -> Option<StageOutcome> {
        session::load(store, id.parse().unwrap(), SessionKey::StageResult(stage))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_full_assessment_flow() {
        let model = Arc::new(
            ScriptedModel::with_json(&fixtures::question_set())
                .then_json(&fixtures::question_set())
                .then_json(&hr_reply())
                .then_json(&voice_reply())
                .then_json(&essay_reply())
                .then_json(&report_reply()),
        );
        let (state, store) = app_state(model.clone());
        let app = build_router(state);
        let id = create_session(&app).await;

        // Resume upload generates the question set; answer keys stay server-side.
        let (status, questions) = upload_resume(&app, &id, "resume.txt", "text/plain", RESUME).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(questions["resume_questions"].as_array().unwrap().len(), 10);
        assert!(questions["resume_questions"][0].get("answerIndex").is_none());
        assert!(model
            .last_request()
            .unwrap()
            .prompt_text()
            .contains("Placement Readiness Analyzer"));

        // Resume MCQs: fixture answer keys are i % 4; answer all but one correctly.
        let mut answers: Vec<Value> = (0..10).map(|i| json!(i % 4)).collect();
        answers[9] = Value::Null;
        let (status, result) = send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/resume/answers"),
            Some(json!({"answers": answers})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result["score"], 9);
        assert_eq!(result["feedback"][0], "9 of 10 answers correct.");

        // HR stage.
        let (status, view) = send(&app, Method::POST, &format!("/api/v1/sessions/{id}/hr/start"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["phase"], "answering");
        assert_eq!(view["time_left_seconds"], 300);
        assert_eq!(view["can_submit"], false);

        let (status, _) = send(&app, Method::POST, &format!("/api/v1/sessions/{id}/hr/submit"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        for q in 0..10 {
            let (status, view) = send(
                &app,
                Method::PUT,
                &format!("/api/v1/sessions/{id}/hr/answers/{q}"),
                Some(json!({"option": 0})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(view["can_submit"], q == 9);
        }
        let (status, view) = send(&app, Method::POST, &format!("/api/v1/sessions/{id}/hr/submit"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["phase"], "result");
        assert_eq!(view["result"]["score"], 8);

        // Voice stage.
        let (status, result) = send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/voice"),
            Some(json!({"recordings": [
                {"mime_type": "audio/webm", "data": "GkXfow=="},
                {"mime_type": "audio/webm", "data": "GkXfow=="}
            ]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result["score"], 8);
        assert_eq!(result["analyses"][0]["transcription"], "I fixed a race in the loader.");

        // Essay stage.
        let (status, result) = send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/essay"),
            Some(json!({"essays": ["Healthcare data saves lives.", ""]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result["score"], 8);

        // Final report.
        let (status, report) = send(&app, Method::POST, &format!("/api/v1/sessions/{id}/report"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["summary"], "Ready for junior analyst interviews.");
        let prompt = model.last_request().unwrap().prompt_text();
        assert!(prompt.contains("Resume Assessment Score: 9/10"));
        assert!(prompt.contains("HR Questions Score: 8/10"));

        let (status, fetched) = send(&app, Method::GET, &format!("/api/v1/sessions/{id}/report"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, report);

        let (_, summary) = send(&app, Method::GET, &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(summary["questions_ready"], true);
        assert_eq!(summary["report_ready"], true);
        assert!(summary["stages"]
            .as_array()
            .unwrap()
            .iter()
            .all(|s| s["status"] == "completed"));
        assert_eq!(model.calls(), 5);

        // A new upload regenerates the questions and clears every downstream result.
        let (status, _) = upload_resume(&app, &id, "resume.txt", "text/plain", RESUME).await;
        assert_eq!(status, StatusCode::OK);
        assert!(stored_stage(&store, &id, Stage::Resume).await.is_none());
        assert!(stored_stage(&store, &id, Stage::Essay).await.is_none());
        let (status, _) = send(&app, Method::GET, &format!("/api/v1/sessions/{id}/report"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_resume_discards_live_hr_stage() {
        let mut replacement = fixtures::question_set();
        replacement.hr_questions[0].question =
            "A teammate misses a deadline. What do you do?".to_string();
        let model = Arc::new(
            ScriptedModel::with_json(&hr_reply())
                .then_json(&fixtures::question_set())
                .then_json(&replacement),
        );
        let (state, store) = app_state(model.clone());
        let app = build_router(state);
        let id = create_session(&app).await;

        let (status, _) = upload_resume(&app, &id, "resume.txt", "text/plain", RESUME).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, Method::POST, &format!("/api/v1/sessions/{id}/hr/start"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = upload_resume(&app, &id, "resume.txt", "text/plain", RESUME).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, Method::GET, &format!("/api/v1/sessions/{id}/hr"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // Well past the old stage's countdown.
        tokio::time::sleep(Duration::from_secs(400)).await;
        assert!(stored_stage(&store, &id, Stage::Hr).await.is_none());
        assert_eq!(model.calls(), 2);

        let (status, view) = send(&app, Method::POST, &format!("/api/v1/sessions/{id}/hr/start"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            view["questions"][0]["question"],
            "A teammate misses a deadline. What do you do?"
        );
    }

    #[tokio::test]
    async fn test_failed_generation_keeps_previous_resume() {
        let model = Arc::new(ScriptedModel::failing().then_json(&fixtures::question_set()));
        let (state, store) = app_state(model.clone());
        let app = build_router(state);
        let id = create_session(&app).await;
        let session_id: Uuid = id.parse().unwrap();

        let (status, _) = upload_resume(&app, &id, "resume.txt", "text/plain", RESUME).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) =
            upload_resume(&app, &id, "resume.txt", "text/plain", "A different candidate.").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "LLM_ERROR");

        let text: Option<String> = session::load(store.as_ref(), session_id, SessionKey::ResumeText)
            .await
            .unwrap();
        assert_eq!(text.as_deref(), Some(RESUME));
        let (status, _) = send(&app, Method::GET, &format!("/api/v1/sessions/{id}/questions"), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_quiz() {
        let model = Arc::new(ScriptedModel::with_json(&json!({
            "jobRole": "Product Analyst",
            "strengths": ["Curiosity"],
            "roadmap": [{"step": "SQL", "description": "Learn joins."}],
            "projects": [{"name": "Churn study", "description": "Explore churn drivers."}],
            "resources": [{"name": "Mode", "url": "https://example.com/mode"}]
        })));
        let (state, _) = app_state(model);
        let app = build_router(state);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/quiz",
            Some(json!({"answers": {"Favourite task?": "Finding patterns"}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["jobRole"], "Product Analyst");
    }
}
