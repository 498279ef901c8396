use futures_util::StreamExt;
use kernel_connectors::{
    AudioContent, AudioToTextService, AuthorRole, ChatCompletionService, ChatHistory,
    ChatMessageContent, ContentItem, DomainError, FinishReason, HttpClientConfig, ImageContent,
    ImageGenerationRequest, ModerationService, OpenAiAudioToText, OpenAiChatCompletion,
    OpenAiConfig, OpenAiModeration, OpenAiTextEmbedding, OpenAiTextToAudio, OpenAiTextToImage,
    PromptExecutionSettings, RetryConfig, TextEmbeddingService, TextToAudioService,
    TextToImageService,
};
use kernel_connectors::connector::adapter::openai::MAX_INPUTS_PER_REQUEST;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn fast_http() -> HttpClientConfig {
    HttpClientConfig::default().with_retry(
        RetryConfig::new()
            .with_max_retries(2)
            .with_initial_delay(1)
            .with_max_delay(5)
            .without_jitter(),
    )
}

fn openai_config(server: &MockServer, model: &str) -> OpenAiConfig {
    OpenAiConfig::openai("sk-test", model)
        .with_base_url(server.uri())
        .with_http(fast_http())
}

fn chat_response() -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "created": 1700000000,
        "model": "gpt-4o-mini-2024-07-18",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "Paris."},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 12, "completion_tokens": 2, "total_tokens": 14}
    })
}

#[tokio::test]
async fn chat_completion_maps_request_and_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "temperature": 0.2,
            "messages": [
                {"role": "system", "content": "Answer briefly."},
                {"role": "user", "content": "Capital of France?"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response()))
        .expect(1)
        .mount(&server)
        .await;

    let service = OpenAiChatCompletion::new(openai_config(&server, "gpt-4o-mini")).unwrap();
    let mut history = ChatHistory::with_system_message("Answer briefly.");
    history.add_user_message("Capital of France?");
    let settings = PromptExecutionSettings::new().with_temperature(0.2);

    let replies = service
        .get_chat_message_contents(&history, &settings)
        .await
        .unwrap();

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].role, AuthorRole::Assistant);
    assert_eq!(replies[0].content().as_deref(), Some("Paris."));
    assert_eq!(replies[0].finish_reason, Some(FinishReason::Stop));
    assert_eq!(replies[0].model_id.as_deref(), Some("gpt-4o-mini-2024-07-18"));
    assert_eq!(replies[0].metadata["usage"]["total_tokens"], 14);
}

#[tokio::test]
async fn chat_completion_sends_images_as_content_parts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": "What is this?"},
                    {"type": "image_url", "image_url": {"url": "https://example.com/cat.png"}}
                ]
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response()))
        .expect(1)
        .mount(&server)
        .await;

    let service = OpenAiChatCompletion::new(openai_config(&server, "gpt-4o")).unwrap();
    let mut history = ChatHistory::new();
    history.add_message(ChatMessageContent::new(
        AuthorRole::User,
        vec![
            ContentItem::text("What is this?"),
            ContentItem::Image(ImageContent::from_uri("https://example.com/cat.png")),
        ],
    ));

    service
        .get_chat_message_contents(&history, &PromptExecutionSettings::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn chat_streaming_yields_deltas_until_done() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"model\":\"gpt-4o-mini\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"}}]}\n\n",
        "data: {\"model\":\"gpt-4o-mini\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {\"model\":\"gpt-4o-mini\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"lo\"}}]}\n\n",
        "data: {\"model\":\"gpt-4o-mini\",\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let service = OpenAiChatCompletion::new(openai_config(&server, "gpt-4o-mini")).unwrap();
    let mut history = ChatHistory::new();
    history.add_user_message("Say hello");

    let chunks: Vec<_> = service
        .get_streaming_chat_message_contents(&history, &PromptExecutionSettings::default())
        .await
        .unwrap()
        .collect()
        .await;

    let chunks: Vec<_> = chunks.into_iter().map(|c| c.unwrap()).collect();
    let text: String = chunks.iter().map(|c| c.text()).collect();
    assert_eq!(text, "Hello");
    assert_eq!(chunks[0].role, Some(AuthorRole::Assistant));
    assert_eq!(chunks.last().unwrap().finish_reason, Some(FinishReason::Stop));
}

#[tokio::test]
async fn empty_history_is_rejected_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response()))
        .expect(0)
        .mount(&server)
        .await;

    let service = OpenAiChatCompletion::new(openai_config(&server, "gpt-4o-mini")).unwrap();
    let err = service
        .get_chat_message_contents(&ChatHistory::new(), &PromptExecutionSettings::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidInput(_)));
}

#[tokio::test]
async fn rate_limited_requests_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after-ms", "1")
                .set_body_json(json!({"error": {"message": "slow down"}})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response()))
        .mount(&server)
        .await;

    let service = OpenAiChatCompletion::new(openai_config(&server, "gpt-4o-mini")).unwrap();
    let mut history = ChatHistory::new();
    history.add_user_message("hi");

    let replies = service
        .get_chat_message_contents(&history, &PromptExecutionSettings::default())
        .await
        .unwrap();
    assert_eq!(replies[0].content().as_deref(), Some("Paris."));
}

#[tokio::test]
async fn retry_after_seconds_override_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "0")
                .set_body_json(json!({"error": {"message": "slow down"}})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response()))
        .mount(&server)
        .await;

    // Computed backoff alone would wait a minute.
    let slow_backoff = HttpClientConfig::default().with_retry(
        RetryConfig::new()
            .with_max_retries(1)
            .with_initial_delay(60_000)
            .with_max_delay(60_000)
            .without_jitter(),
    );
    let config = openai_config(&server, "gpt-4o-mini").with_http(slow_backoff);
    let service = OpenAiChatCompletion::new(config).unwrap();
    let mut history = ChatHistory::new();
    history.add_user_message("hi");

    let replies = tokio::time::timeout(
        Duration::from_secs(10),
        service.get_chat_message_contents(&history, &PromptExecutionSettings::default()),
    )
    .await
    .expect("retry-after was not honored")
    .unwrap();
    assert_eq!(replies[0].content().as_deref(), Some("Paris."));
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn bad_requests_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "max_tokens is too large", "type": "invalid_request_error"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = OpenAiChatCompletion::new(openai_config(&server, "gpt-4o-mini")).unwrap();
    let mut history = ChatHistory::new();
    history.add_user_message("hi");

    let err = service
        .get_chat_message_contents(&history, &PromptExecutionSettings::default())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn client_errors_surface_vendor_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = OpenAiChatCompletion::new(openai_config(&server, "gpt-4o-mini")).unwrap();
    let mut history = ChatHistory::new();
    history.add_user_message("hi");

    let err = service
        .get_chat_message_contents(&history, &PromptExecutionSettings::default())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(err.to_string().contains("Incorrect API key provided"));
}

#[tokio::test]
async fn embeddings_are_returned_in_input_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(body_partial_json(json!({
            "model": "text-embedding-3-small",
            "input": ["first", "second"],
            "dimensions": 2
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ],
            "model": "text-embedding-3-small"
        })))
        .mount(&server)
        .await;

    let service = OpenAiTextEmbedding::new(openai_config(&server, "text-embedding-3-small"))
        .unwrap()
        .with_dimensions(2);
    let embeddings = service
        .generate_embeddings(&["first".to_string(), "second".to_string()])
        .await
        .unwrap();

    assert_eq!(embeddings[0].vector(), &[1.0, 0.0]);
    assert_eq!(embeddings[1].vector(), &[0.0, 1.0]);
}

/// Answers each input `t<n>` with the one-dimensional embedding `[n]`.
struct IndexedEmbeddings;

impl Respond for IndexedEmbeddings {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        let data: Vec<_> = body["input"]
            .as_array()
            .unwrap()
            .iter()
            .enumerate()
            .map(|(index, text)| {
                let n: f32 = text.as_str().unwrap()[1..].parse().unwrap();
                json!({"index": index, "embedding": [n]})
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({"data": data, "model": "m"}))
    }
}

#[tokio::test]
async fn large_embedding_inputs_are_split_into_batches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(IndexedEmbeddings)
        .expect(2)
        .mount(&server)
        .await;

    let texts: Vec<String> = (0..=MAX_INPUTS_PER_REQUEST).map(|i| format!("t{i}")).collect();
    let service =
        OpenAiTextEmbedding::new(openai_config(&server, "text-embedding-3-small")).unwrap();
    let embeddings = service.generate_embeddings(&texts).await.unwrap();

    assert_eq!(embeddings.len(), MAX_INPUTS_PER_REQUEST + 1);
    assert!(embeddings
        .iter()
        .enumerate()
        .all(|(i, e)| e.vector() == [i as f32].as_slice()));

    let requests = server.received_requests().await.unwrap();
    let sizes: Vec<usize> = requests
        .iter()
        .map(|r| {
            let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
            body["input"].as_array().unwrap().len()
        })
        .collect();
    assert_eq!(sizes, vec![MAX_INPUTS_PER_REQUEST, 1]);
}

#[tokio::test]
async fn unsupported_image_size_is_rejected_locally() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let service = OpenAiTextToImage::new(openai_config(&server, "dall-e-3")).unwrap();
    let err = service
        .generate_image(&ImageGenerationRequest::new("a red fox", 640, 480))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidInput(_)));
    assert!(err.to_string().contains("640x480"));
}

#[tokio::test]
async fn image_generation_returns_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .and(body_partial_json(json!({"prompt": "a red fox", "size": "1024x1024", "response_format": "url"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "created": 1,
            "data": [{"url": "https://images.example/fox.png"}]
        })))
        .mount(&server)
        .await;

    let service = OpenAiTextToImage::new(openai_config(&server, "dall-e-3")).unwrap();
    let image = service
        .generate_image(&ImageGenerationRequest::new("a red fox", 1024, 1024))
        .await
        .unwrap();
    assert_eq!(image.uri.as_deref(), Some("https://images.example/fox.png"));

    let err = service
        .generate_image(&ImageGenerationRequest::new("a red fox", 100, 100))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidInput(_)));
}

#[tokio::test]
async fn speech_returns_raw_audio() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/speech"))
        .and(body_partial_json(json!({"input": "hello", "voice": "nova", "model": "tts-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![1u8, 2, 3, 4], "audio/mpeg"))
        .mount(&server)
        .await;

    let service = OpenAiTextToAudio::new(openai_config(&server, "tts-1")).unwrap();
    let audio = service.generate_audio("hello", "nova").await.unwrap();
    assert_eq!(audio.data, vec![1u8, 2, 3, 4]);
    assert_eq!(audio.mime_type, "audio/mpeg");
}

#[tokio::test]
async fn transcription_uploads_audio_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "hello world"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("clip.wav");
    std::fs::write(&file, b"RIFF....WAVE").unwrap();
    let audio = AudioContent::from_file(&file).unwrap();

    let service = OpenAiAudioToText::new(openai_config(&server, "whisper-1")).unwrap();
    let text = service.transcribe(&audio, "clip.wav").await.unwrap();
    assert_eq!(text.text, "hello world");
}

#[tokio::test]
async fn moderation_reports_flagged_categories() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/moderations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "modr-1",
            "model": "omni-moderation-latest",
            "results": [{
                "flagged": true,
                "categories": {"violence": true, "hate": false, "self-harm/intent": null},
                "category_scores": {"violence": 0.91, "hate": 0.01}
            }]
        })))
        .mount(&server)
        .await;

    let service = OpenAiModeration::new(openai_config(&server, "omni-moderation-latest")).unwrap();
    let results = service.moderate(&["some text".to_string()]).await.unwrap();
    assert!(results[0].flagged);
    assert_eq!(results[0].flagged_categories(), vec!["violence"]);
}

#[tokio::test]
async fn azure_uses_deployment_path_api_version_and_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/deployments/gpt4o-prod/chat/completions"))
        .and(query_param("api-version", "2024-06-01"))
        .and(header("api-key", "azure-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response()))
        .expect(1)
        .mount(&server)
        .await;

    let config = OpenAiConfig::azure(server.uri(), "gpt4o-prod", "azure-key")
        .with_api_version("2024-06-01")
        .with_http(fast_http());
    let service = OpenAiChatCompletion::new(config).unwrap();
    assert_eq!(service.model_id(), "gpt4o-prod");

    let mut history = ChatHistory::new();
    history.add_user_message("hi");
    let replies = service
        .get_chat_message_contents(&history, &PromptExecutionSettings::default())
        .await
        .unwrap();
    assert_eq!(replies[0].content().as_deref(), Some("Paris."));
}

#[tokio::test]
async fn azure_requests_omit_model_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/deployments/embed/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"index": 0, "embedding": [0.5]}]
        })))
        .mount(&server)
        .await;

    let config = OpenAiConfig::azure(server.uri(), "embed", "azure-key").with_http(fast_http());
    let service = OpenAiTextEmbedding::new(config).unwrap();
    service.generate_embedding("x").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.get("model").is_none());
}
