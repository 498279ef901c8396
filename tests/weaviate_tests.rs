use kernel_connectors::domain::storage_id_for_key;
use kernel_connectors::{
    DomainError, Embedding, HttpClientConfig, MemoryRecord, MemorySearch, MemoryStore,
    MetadataFilter, RetryConfig, WeaviateMemoryStore,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store(server: &MockServer) -> WeaviateMemoryStore {
    WeaviateMemoryStore::new(
        &server.uri(),
        Some("wv-key".to_string()),
        HttpClientConfig::default().with_retry(RetryConfig::disabled()),
    )
    .unwrap()
}

async fn class_present(server: &MockServer, class: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/schema/{class}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"class": class})))
        .mount(server)
        .await;
}

fn record(key: &str, text: &str) -> MemoryRecord {
    MemoryRecord::local_record(
        key,
        text,
        None,
        Embedding::new(vec![0.1, 0.2]),
        None,
        None,
        None,
    )
}

#[tokio::test]
async fn create_collection_posts_class_without_vectorizer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/schema/SKNotes"))
        .and(header("authorization", "Bearer wv-key"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/schema"))
        .and(body_partial_json(json!({"class": "SKNotes", "vectorizer": "none"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"class": "SKNotes"})))
        .expect(1)
        .mount(&server)
        .await;

    store(&server).create_collection("notes").await.unwrap();
}

#[tokio::test]
async fn collections_are_listed_without_class_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/schema"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "classes": [{"class": "SKNotes"}, {"class": "SKDocs"}]
        })))
        .mount(&server)
        .await;

    let collections = store(&server).get_collections().await.unwrap();
    assert_eq!(collections, vec!["Notes", "Docs"]);
}

#[tokio::test]
async fn upsert_into_missing_collection_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/schema/SKGhost"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = store(&server)
        .upsert("ghost", record("k", "text"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() != "/v1/batch/objects"));
}

#[tokio::test]
async fn batch_upsert_sends_objects_with_derived_ids() {
    let server = MockServer::start().await;
    class_present(&server, "SKNotes").await;
    let id = storage_id_for_key("greeting").to_string();
    Mock::given(method("POST"))
        .and(path("/v1/batch/objects"))
        .and(body_partial_json(json!({
            "objects": [{
                "class": "SKNotes",
                "id": id,
                "properties": {"sk_key": "greeting", "sk_text": "hello"},
                "vector": [0.1, 0.2]
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": id, "result": {}}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let keys = store(&server)
        .upsert_batch("notes", vec![record("greeting", "hello")])
        .await
        .unwrap();
    assert_eq!(keys, vec!["greeting"]);
}

#[tokio::test]
async fn batch_item_errors_fail_the_upsert() {
    let server = MockServer::start().await;
    class_present(&server, "SKNotes").await;
    Mock::given(method("POST"))
        .and(path("/v1/batch/objects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "x",
            "result": {"errors": {"error": [{"message": "vector lengths don't match"}]}}
        }])))
        .mount(&server)
        .await;

    let err = store(&server)
        .upsert("notes", record("k", "text"))
        .await
        .unwrap_err();
    assert!(err.is_storage_error());
    assert!(err.to_string().contains("vector lengths don't match"));
}

#[tokio::test]
async fn get_reads_object_and_treats_404_as_missing() {
    let server = MockServer::start().await;
    let id = storage_id_for_key("greeting");
    Mock::given(method("GET"))
        .and(path(format!("/v1/objects/SKNotes/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id.to_string(),
            "class": "SKNotes",
            "properties": {
                "sk_id": "greeting",
                "sk_key": "greeting",
                "sk_text": "hello",
                "sk_is_reference": false,
                "sk_timestamp": "2024-03-01T12:00:00Z"
            },
            "vector": [0.1, 0.2]
        })))
        .mount(&server)
        .await;
    let ghost = storage_id_for_key("ghost");
    Mock::given(method("GET"))
        .and(path(format!("/v1/objects/SKNotes/{ghost}")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = store(&server);
    let found = store.get("notes", "greeting", true).await.unwrap().unwrap();
    assert_eq!(found.key, "greeting");
    assert_eq!(found.metadata.text, "hello");
    assert_eq!(found.embedding.vector(), &[0.1, 0.2]);
    assert!(found.timestamp.is_some());

    let without = store.get("notes", "greeting", false).await.unwrap().unwrap();
    assert!(without.embedding.is_empty());

    let batch = store
        .get_batch("notes", &["ghost".to_string(), "greeting".to_string()], false)
        .await
        .unwrap();
    assert_eq!(batch.len(), 1);
}

#[tokio::test]
async fn remove_ignores_missing_objects() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;

    store(&server)
        .remove_batch("notes", &["a".to_string(), "b".to_string()])
        .await
        .unwrap();
}

#[tokio::test]
async fn near_vector_search_maps_certainty_to_relevance() {
    let server = MockServer::start().await;
    class_present(&server, "SKNotes").await;
    Mock::given(method("POST"))
        .and(path("/v1/graphql"))
        .and(body_string_contains("SKNotes(nearVector"))
        .and(body_string_contains("certainty: 0.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"Get": {"SKNotes": [
                {
                    "sk_id": "b", "sk_key": "b", "sk_text": "second",
                    "sk_description": null,
                    "_additional": {"id": "2", "certainty": 0.75}
                },
                {
                    "sk_id": "a", "sk_key": "a", "sk_text": "first",
                    "_additional": {"id": "1", "certainty": 0.95}
                }
            ]}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let results = store(&server)
        .get_nearest_matches("notes", &Embedding::new(vec![0.1, 0.2]), 5, 0.7, false)
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].record.key, "a");
    assert_eq!(results[1].record.metadata.description, "");
    assert!((results[0].relevance - 0.95).abs() < 1e-9);
}

#[tokio::test]
async fn graphql_errors_become_storage_errors() {
    let server = MockServer::start().await;
    class_present(&server, "SKNotes").await;
    Mock::given(method("POST"))
        .and(path("/v1/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{"message": "Cannot query field \"SKNotes\" on type \"GetObjectsObj\"."}]
        })))
        .mount(&server)
        .await;

    let err = store(&server)
        .get_nearest_match("notes", &Embedding::new(vec![0.1, 0.2]), 0.0, false)
        .await
        .unwrap_err();
    assert!(err.is_storage_error());
}

#[tokio::test]
async fn searching_missing_class_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/schema/SKGhost"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = store(&server)
        .get_nearest_matches("ghost", &Embedding::new(vec![0.1, 0.2]), 3, 0.0, false)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() != "/v1/graphql"));
}

#[tokio::test]
async fn filtered_search_renders_where_and_offset() {
    let server = MockServer::start().await;
    class_present(&server, "SKNotes").await;
    Mock::given(method("POST"))
        .and(path("/v1/graphql"))
        .and(body_string_contains("sk_external_source_name"))
        .and(body_string_contains("operator: Equal"))
        .and(body_string_contains("limit: 2 offset: 2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"Get": {"SKNotes": [{
                "sk_id": "c", "sk_key": "c", "sk_text": "third",
                "sk_external_source_name": "github",
                "_additional": {"id": "3", "certainty": 0.6}
            }]}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let options = MemorySearch::new(2)
        .with_offset(2)
        .with_filter("external_source_name=github".parse::<MetadataFilter>().unwrap());
    let results = store(&server)
        .search("notes", &Embedding::new(vec![0.1, 0.2]), &options)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].record.metadata.external_source_name, "github");
}

#[tokio::test]
async fn non_finite_query_vectors_are_rejected() {
    let server = MockServer::start().await;
    let err = store(&server)
        .get_nearest_matches("notes", &Embedding::new(vec![f32::NAN, 0.0]), 3, 0.0, false)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidInput(_)));
}
