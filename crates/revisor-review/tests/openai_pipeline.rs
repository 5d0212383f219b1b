use std::sync::Arc;

use revisor_core::{AgentsConfig, CodeSubmission, LlmConfig, SearchConfig};
use revisor_docs::ReferenceCorpus;
use revisor_review::{LlmClient, PipelineResult, ReviewPipeline, SerperSearch};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn text_reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

fn llm(server: &MockServer) -> Arc<LlmClient> {
    let config = LlmConfig {
        api_key: Some("sk-test".into()),
        base_url: Some(server.uri()),
        ..LlmConfig::default()
    };
    Arc::new(LlmClient::new(&config).unwrap())
}

#[tokio::test]
async fn reviewer_then_optimizer_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_string_contains("ABAP Code Reviewer"))
        .respond_with(text_reply("Line 1: SELECT * reads every column."))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("ABAP Optimizer"))
        .and(body_string_contains("SELECT * reads every column"))
        .respond_with(text_reply(
            r#"{"kind":"markup","content":"<review><line n=\"1\">list fields</line></review>"}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = ReviewPipeline::new(llm(&server), None, &AgentsConfig::default());
    let submission = CodeSubmission::new("z.abap", "SELECT * FROM TABLE.");
    let corpus = ReferenceCorpus::from_text("Avoid SELECT *.", 8000);

    let result = pipeline.run(&submission, &corpus).await.unwrap();
    assert!(matches!(result, PipelineResult::MarkupDocument(ref xml) if xml.starts_with("<review>")));
}

#[tokio::test]
async fn reviewer_searches_the_web() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("ABAP Code Reviewer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_9",
                    "type": "function",
                    "function": { "name": "web_search", "arguments": "{\"query\":\"ABAP SELECT star\"}" }
                }]
            } }]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("ABAP Code Reviewer"))
        .and(body_string_contains("call_9"))
        .respond_with(text_reply("Use a field list, see SAP Help."))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("ABAP Optimizer"))
        .respond_with(text_reply("SELECT matnr FROM mara."))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(header("X-API-KEY", "serper-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "organic": [{ "title": "SAP Help", "link": "https://help.sap.com", "snippet": "Field lists" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let search = SerperSearch::new(&SearchConfig {
        api_key: Some("serper-key".into()),
        base_url: server.uri(),
        ..SearchConfig::default()
    })
    .unwrap();
    let pipeline = ReviewPipeline::new(llm(&server), Some(Arc::new(search)), &AgentsConfig::default());
    let submission = CodeSubmission::new("z.abap", "SELECT * FROM mara.");

    let result = pipeline
        .run(&submission, &ReferenceCorpus::empty())
        .await
        .unwrap();
    assert_eq!(result, PipelineResult::SourceCode("SELECT matnr FROM mara.".into()));
}

#[tokio::test]
async fn provider_error_aborts_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let pipeline = ReviewPipeline::new(llm(&server), None, &AgentsConfig::default());
    let err = pipeline
        .run(&CodeSubmission::new("z.abap", "WRITE 'x'."), &ReferenceCorpus::empty())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("overloaded"));
}
