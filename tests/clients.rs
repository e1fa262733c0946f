//! HTTP-level tests for the collaborator clients, against a local mock
//! server. These pin down the request shapes and the response parsing the
//! pipeline depends on, without touching the real services.

use mockito::Matcher;
use pagelens::{
    CloudinaryStore, MediaStore, OpenAiVision, RenderOptions, StoreError, VisionError,
    VisionModel,
};
use serde_json::json;

// ── Media store client ───────────────────────────────────────────────────────

fn store_against(server: &mockito::Server) -> CloudinaryStore {
    CloudinaryStore::new("democloud", "key", "secret", "ml_default")
        .with_api_base(server.url())
        .with_delivery_base("https://res.cloudinary.com")
}

#[tokio::test]
async fn upload_posts_multipart_and_returns_asset_id() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1_1/democloud/image/upload")
        .match_header(
            "content-type",
            Matcher::Regex("multipart/form-data.*".into()),
        )
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "public_id": "pagelens/pdfs/1722800000000-doc.pdf",
                "secure_url": "https://res.cloudinary.com/democloud/image/upload/x.pdf",
            })
            .to_string(),
        )
        .create_async()
        .await;

    let store = store_against(&server);
    let asset_id = store
        .upload(b"%PDF-1.4", "pagelens/pdfs/1722800000000-doc.pdf", "pdf")
        .await
        .unwrap();

    assert_eq!(asset_id, "pagelens/pdfs/1722800000000-doc.pdf");
    mock.assert_async().await;
}

#[tokio::test]
async fn upload_rejection_surfaces_status_and_body() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1_1/democloud/image/upload")
        .with_status(400)
        .with_body(json!({"error": {"message": "Invalid image file"}}).to_string())
        .create_async()
        .await;

    let store = store_against(&server);
    let err = store.upload(b"not a pdf", "pagelens/pdfs/x", "pdf").await;

    match err {
        Err(StoreError::Api { status, body }) => {
            assert_eq!(status, 400);
            assert!(body.contains("Invalid image file"));
        }
        other => panic!("expected StoreError::Api, got {other:?}"),
    }
}

#[tokio::test]
async fn upload_without_public_id_is_a_missing_field() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1_1/democloud/image/upload")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("{}")
        .create_async()
        .await;

    let store = store_against(&server);
    let err = store.upload(b"%PDF", "pagelens/pdfs/x", "pdf").await;
    assert!(matches!(err, Err(StoreError::MissingField("public_id"))));
}

#[tokio::test]
async fn page_count_queries_the_resource_api_with_auth() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v1_1/democloud/resources/image/upload/pagelens/pdfs/x")
        .match_query(Matcher::UrlEncoded("pages".into(), "true".into()))
        .match_header("authorization", Matcher::Regex("Basic .*".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"pages": 7, "format": "pdf"}).to_string())
        .create_async()
        .await;

    let store = store_against(&server);
    let count = store.page_count("pagelens/pdfs/x").await.unwrap();

    assert_eq!(count, 7);
    mock.assert_async().await;
}

#[tokio::test]
async fn page_count_defaults_to_one_when_field_is_absent() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/v1_1/democloud/resources/image/upload/single")
        .match_query(Matcher::UrlEncoded("pages".into(), "true".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"format": "jpg"}).to_string())
        .create_async()
        .await;

    let store = store_against(&server);
    assert_eq!(store.page_count("single").await.unwrap(), 1);
}

#[tokio::test]
async fn page_count_error_is_reported_not_swallowed() {
    // Swallowing happens one level up (pipeline::count); the client itself
    // must report the failure so the caller can log it.
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/v1_1/democloud/resources/image/upload/missing")
        .match_query(Matcher::UrlEncoded("pages".into(), "true".into()))
        .with_status(404)
        .with_body(json!({"error": {"message": "Resource not found"}}).to_string())
        .create_async()
        .await;

    let store = store_against(&server);
    let err = store.page_count("missing").await;
    assert!(matches!(err, Err(StoreError::Api { status: 404, .. })));
}

#[test]
fn page_url_needs_no_network_round_trip() {
    let store = CloudinaryStore::new("democloud", "key", "secret", "ml_default");
    let url = store.page_url("pagelens/pdfs/x", 4, &RenderOptions::default());
    assert_eq!(
        url,
        "https://res.cloudinary.com/democloud/image/upload/\
         pg_4,f_jpg,q_auto:best,w_1200,h_1600,c_limit,dpr_2.0/pagelens/pdfs/x"
    );
}

// ── Vision client ────────────────────────────────────────────────────────────

#[tokio::test]
async fn analyze_sends_prompt_and_image_url_and_returns_content() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::PartialJson(json!({
            "model": "gpt-4o",
            "max_completion_tokens": 800,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": "Extract all text from page 1." },
                    { "type": "image_url", "image_url": { "url": "https://res.example/p1.jpg" } },
                ],
            }],
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "choices": [{ "message": { "content": "Page one says hello." } }],
            })
            .to_string(),
        )
        .create_async()
        .await;

    let vision = OpenAiVision::new("sk-test", "gpt-4o").with_api_base(server.url());
    let text = vision
        .analyze(
            "https://res.example/p1.jpg",
            "Extract all text from page 1.",
            800,
        )
        .await
        .unwrap();

    assert_eq!(text, "Page one says hello.");
    mock.assert_async().await;
}

#[tokio::test]
async fn analyze_maps_api_errors_with_provider_message() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(500)
        .with_body(json!({"error": {"message": "The server is overloaded"}}).to_string())
        .create_async()
        .await;

    let vision = OpenAiVision::new("sk-test", "gpt-4o").with_api_base(server.url());
    let err = vision.analyze("https://res.example/p1.jpg", "prompt", 800).await;

    match err {
        Err(VisionError::Api { status, message }) => {
            assert_eq!(status, 500);
            assert!(message.contains("overloaded"));
        }
        other => panic!("expected VisionError::Api, got {other:?}"),
    }
}

#[tokio::test]
async fn analyze_treats_empty_content_as_an_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"choices": [{ "message": { "content": "" } }]}).to_string())
        .create_async()
        .await;

    let vision = OpenAiVision::new("sk-test", "gpt-4o").with_api_base(server.url());
    let err = vision.analyze("https://res.example/p1.jpg", "prompt", 800).await;
    assert!(matches!(err, Err(VisionError::EmptyResponse)));
}
