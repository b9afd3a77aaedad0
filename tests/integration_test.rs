//! Integration tests for the Guro response pipeline
//!
//! These run against a mock model backend; no local Ollama or API key is
//! required.

use std::path::Path;
use std::sync::Arc;

use guro::pipeline::{HealthGate, MemoryProbe, ResponsePipeline, BUSY_MESSAGE};
use guro::retrieval::ContextRetriever;
use guro::storage::memory::InMemoryPersonaStore;
use guro::storage::{seed_default_personas, PersonaStore};
use guro::{GuroError, Settings, Turn};
use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn test_settings(base_url: &str, data_dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.llm.base_url = base_url.to_string();
    settings.storage.index_path = data_dir
        .join("vectorstore")
        .join("index.json")
        .to_string_lossy()
        .into_owned();
    settings
}

async fn seeded_personas() -> Arc<dyn PersonaStore> {
    let store = Arc::new(InMemoryPersonaStore::new());
    seed_default_personas(store.as_ref()).await.unwrap();
    store
}

struct PinnedProbe(f32);

impl MemoryProbe for PinnedProbe {
    fn utilization_percent(&self) -> f32 {
        self.0
    }
}

/// Responds to the embeddings endpoint deterministically: each input
/// string maps to a one-hot vector keyed off its byte sum, so identical
/// texts get identical embeddings.
struct EmbeddingStub;

fn fake_embedding(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 8];
    let h: usize = text.bytes().map(|b| b as usize).sum();
    v[h % 8] = 1.0;
    v
}

impl Respond for EmbeddingStub {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        let data: Vec<serde_json::Value> = body["input"]
            .as_array()
            .unwrap()
            .iter()
            .enumerate()
            .map(|(i, text)| {
                json!({
                    "index": i,
                    "embedding": fake_embedding(text.as_str().unwrap()),
                })
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({ "data": data }))
    }
}

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "choices": [{
            "message": { "role": "assistant", "content": content }
        }]
    })
}

const SSE_BODY: &str = "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n\
                        data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n\
                        data: [DONE]\n\n";

#[tokio::test]
async fn single_shot_ask_returns_answer() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
            "Ang photosynthesis ay paraan ng halaman para gumawa ng pagkain.",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let settings = test_settings(&server.uri(), dir.path());
    let pipeline = ResponsePipeline::new(&settings, seeded_personas().await);

    let answer = pipeline
        .invoke("What is photosynthesis?", "Grade 7", &[])
        .await
        .unwrap();

    assert!(answer.contains("photosynthesis"));
}

#[tokio::test]
async fn history_and_persona_flow_into_the_prompt() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
        .mount(&server)
        .await;

    let settings = test_settings(&server.uri(), dir.path());
    let pipeline = ResponsePipeline::new(&settings, seeded_personas().await);

    let history = vec![Turn::human("What is an atom?"), Turn::ai("A tiny unit.")];
    pipeline
        .invoke("And a molecule?", "Grade 7", &history)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let messages = body["messages"].as_array().unwrap();

    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0]["role"], "system");
    assert!(messages[0]["content"]
        .as_str()
        .unwrap()
        .contains("Mentor vibe"));
    assert_eq!(messages[1]["role"], "user");
    assert_eq!(messages[1]["content"], "What is an atom?");
    assert_eq!(messages[2]["role"], "assistant");
    assert_eq!(messages[3]["content"], "And a molecule?");
}

#[tokio::test]
async fn unknown_grade_still_gets_an_answer() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("fallback answer")))
        .mount(&server)
        .await;

    let settings = test_settings(&server.uri(), dir.path());
    let pipeline = ResponsePipeline::new(&settings, seeded_personas().await);

    let answer = pipeline.invoke("hello", "Grade 99", &[]).await.unwrap();
    assert_eq!(answer, "fallback answer");

    // The default persona was substituted, not an error raised.
    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body["messages"][0]["content"]
        .as_str()
        .unwrap()
        .contains("Mentor vibe"));
}

#[tokio::test]
async fn stream_yields_fragments_in_order_and_matches_single_shot() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "stream": true })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(SSE_BODY),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Hello")))
        .mount(&server)
        .await;

    let settings = test_settings(&server.uri(), dir.path());
    let pipeline = ResponsePipeline::new(&settings, seeded_personas().await);

    let (tx, mut rx) = mpsc::channel(16);
    pipeline
        .invoke_stream("greet me", "Grade 7", &[], tx)
        .await
        .unwrap();

    let mut fragments = Vec::new();
    while let Some(fragment) = rx.recv().await {
        fragments.push(fragment);
    }
    assert_eq!(fragments, vec!["Hel".to_string(), "lo".to_string()]);

    let single_shot = pipeline.invoke("greet me", "Grade 7", &[]).await.unwrap();
    assert_eq!(fragments.concat(), single_shot);
}

#[tokio::test]
async fn health_gate_trip_short_circuits_before_the_model() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("unreachable")))
        .expect(0)
        .mount(&server)
        .await;

    let settings = test_settings(&server.uri(), dir.path());
    let pipeline = ResponsePipeline::new(&settings, seeded_personas().await)
        .with_gate(HealthGate::with_probe(90.0, Box::new(PinnedProbe(95.0))));

    let answer = pipeline.invoke("anything", "Grade 7", &[]).await.unwrap();
    assert_eq!(answer, BUSY_MESSAGE);

    // Streaming short-circuits the same way: one busy fragment, no model call.
    let (tx, mut rx) = mpsc::channel(16);
    pipeline
        .invoke_stream("anything", "Grade 7", &[], tx)
        .await
        .unwrap();
    assert_eq!(rx.recv().await.unwrap(), BUSY_MESSAGE);
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn retrieval_without_an_index_still_answers() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion_body("answer without context")),
        )
        .expect(1)
        .mount(&server)
        .await;

    // No index was ever built, so the embeddings endpoint is never hit.
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let mut settings = test_settings(&server.uri(), dir.path());
    settings.pipeline.retrieval_enabled = true;

    let pipeline = ResponsePipeline::new(&settings, seeded_personas().await);
    let answer = pipeline.invoke("what do my notes say?", "Grade 7", &[]).await.unwrap();

    assert_eq!(answer, "answer without context");
}

#[tokio::test]
async fn ingest_then_search_returns_the_matching_chunk() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(EmbeddingStub)
        .mount(&server)
        .await;

    let settings = test_settings(&server.uri(), dir.path());
    let retriever = ContextRetriever::new(&settings);

    let indexed = retriever.ingest("A\n\nB\n\n  \n\nC").await.unwrap();
    assert_eq!(indexed, 3);

    let passages = retriever.retrieve("B", 2).await.unwrap();
    assert_eq!(passages.len(), 2);
    assert_eq!(passages[0], "B");
}

#[tokio::test]
async fn retrieved_context_lands_in_the_system_message() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(EmbeddingStub)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("grounded")))
        .mount(&server)
        .await;

    let mut settings = test_settings(&server.uri(), dir.path());
    settings.pipeline.retrieval_enabled = true;

    let retriever = ContextRetriever::new(&settings);
    retriever
        .ingest("Photosynthesis turns light into food.\n\nMitochondria make energy.")
        .await
        .unwrap();

    let pipeline = ResponsePipeline::new(&settings, seeded_personas().await);
    pipeline
        .invoke("Photosynthesis turns light into food.", "Grade 7", &[])
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let chat_request = requests
        .iter()
        .find(|r| r.url.path() == "/chat/completions")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&chat_request.body).unwrap();
    let system = body["messages"][0]["content"].as_str().unwrap();

    assert!(system.contains("Context from local files:"));
    assert!(system.contains("Photosynthesis turns light into food."));
}

#[tokio::test]
async fn ingesting_whitespace_only_text_is_a_validation_error() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    // Chunking fails before any embedding request is made.
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(EmbeddingStub)
        .expect(0)
        .mount(&server)
        .await;

    let settings = test_settings(&server.uri(), dir.path());
    let retriever = ContextRetriever::new(&settings);

    let err = retriever.ingest("   \n\n \t \n\n").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GuroError>(),
        Some(GuroError::Validation(_))
    ));
}

#[tokio::test]
async fn model_failure_surfaces_as_upstream_error() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend exploded"))
        .mount(&server)
        .await;

    let settings = test_settings(&server.uri(), dir.path());
    let pipeline = ResponsePipeline::new(&settings, seeded_personas().await);

    let err = pipeline.invoke("q", "Grade 7", &[]).await.unwrap_err();
    assert!(matches!(err, GuroError::Upstream(_)));
}
