use serde_json::json;
use viewsync::conversion::ConversionClient;
use viewsync::elastic::ElasticIndex;
use viewsync::storage::StorageClient;
use viewsync_core::config::SyncConfig;
use viewsync_core::contract::{
    ConversionService, Credentials, EntryKind, IndexEntry, SearchIndex, StorageService,
    UploadLocation,
};
use viewsync_core::error::ServiceError;
use viewsync_core::index_sync::IndexOutcome;
use viewsync_core::Synchroniser;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_index_creation(server: &MockServer, times: u64) {
    Mock::given(method("PUT"))
        .and(path("/files"))
        .and(body_json(ElasticIndex::mappings()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "acknowledged": true })))
        .expect(times)
        .mount(server)
        .await;
}

fn credentials() -> Credentials {
    Credentials::new("token-abc")
}

fn file_json() -> serde_json::Value {
    json!({
        "type": "file",
        "id": "42",
        "name": "report.docx",
        "modified_at": "2024-01-10T00:00:00-08:00",
        "created_by": { "type": "user", "id": "owner-9" },
        "parent": { "type": "folder", "id": "0" }
    })
}

#[tokio::test]
async fn storage_fetch_file_maps_metadata_and_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/42"))
        .and(header("authorization", "Bearer token-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_json()))
        .expect(1)
        .mount(&server)
        .await;

    let client = StorageClient::new(server.uri()).unwrap();
    let file = client.fetch_file(&credentials(), "42").await.expect("file");
    assert_eq!(file.id, "42");
    assert_eq!(file.name, "report.docx");
    assert_eq!(file.owner_id, "owner-9");
    assert_eq!(file.parent_id.as_deref(), Some("0"));
    assert_eq!(file.modified_at.to_rfc3339(), "2024-01-10T00:00:00-08:00");
}

#[tokio::test]
async fn storage_missing_file_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = StorageClient::new(server.uri()).unwrap();
    let err = client.fetch_file(&credentials(), "404").await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn storage_server_error_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/42"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = StorageClient::new(server.uri()).unwrap();
    let err = client.fetch_file(&credentials(), "42").await.unwrap_err();
    assert!(matches!(err, ServiceError::Failed(_)));
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn storage_list_folder_keeps_files_and_folders() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/folders/0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "folder",
            "id": "0",
            "name": "All Files",
            "item_collection": {
                "total_count": 3,
                "entries": [
                    { "type": "folder", "id": "7", "name": "Reports" },
                    { "type": "file", "id": "42", "name": "report.docx" },
                    { "type": "web_link", "id": "99", "name": "Bookmark" }
                ]
            }
        })))
        .mount(&server)
        .await;

    let client = StorageClient::new(server.uri()).unwrap();
    let listing = client.list_folder(&credentials(), "0").await.expect("listing");
    assert_eq!(listing.name, "All Files");
    assert_eq!(listing.entries.len(), 2);
    assert_eq!(listing.entries[0].kind, EntryKind::Folder);
    assert_eq!(listing.entries[1].href(), "/files/42");
}

#[tokio::test]
async fn conversion_lists_documents_in_response_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/documents"))
        .and(header("authorization", "Token view-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "document_collection": {
                "total_count": 2,
                "entries": [
                    { "type": "document", "id": "d2", "name": "42", "created_at": "2024-01-11T00:00:00Z", "status": "done" },
                    { "type": "document", "id": "d1", "name": "42", "created_at": "2024-01-12T00:00:00Z", "status": "done" }
                ]
            }
        })))
        .mount(&server)
        .await;

    let client = ConversionClient::new(server.uri(), server.uri(), "view-key").unwrap();
    let documents = client.list_converted_documents().await.expect("documents");
    let ids: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["d2", "d1"]);
}

#[tokio::test]
async fn conversion_location_comes_from_redirect_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/42/content"))
        .and(header("authorization", "Bearer token-abc"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "https://dl.example/42/blob"),
        )
        .mount(&server)
        .await;

    let client = ConversionClient::new(server.uri(), server.uri(), "view-key").unwrap();
    let location = client
        .acquire_upload_location(&credentials(), "42")
        .await
        .expect("location");
    assert_eq!(location, UploadLocation("https://dl.example/42/blob".to_string()));
}

#[tokio::test]
async fn conversion_location_without_header_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/42/content"))
        .respond_with(ResponseTemplate::new(200).set_body_string("raw bytes"))
        .mount(&server)
        .await;

    let client = ConversionClient::new(server.uri(), server.uri(), "view-key").unwrap();
    let err = client
        .acquire_upload_location(&credentials(), "42")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Location"));
}

#[tokio::test]
async fn conversion_upload_session_and_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/documents"))
        .and(body_json(json!({ "url": "https://dl.example/42/blob", "name": "42" })))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "type": "document", "id": "d-new" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sessions"))
        .and(body_json(json!({ "document_id": "d-new" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "type": "session",
            "id": "s1",
            "urls": { "view": "https://view.example/sessions/s1/view" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/documents/d-new/content.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("quarterly numbers"))
        .mount(&server)
        .await;

    let client = ConversionClient::new(server.uri(), server.uri(), "view-key").unwrap();
    let location = UploadLocation("https://dl.example/42/blob".to_string());
    let document_id = client.upload_and_convert(&location, "42").await.expect("upload");
    assert_eq!(document_id, "d-new");

    let session = client.create_view_session(&document_id).await.expect("session");
    assert_eq!(session.viewer_url, "https://view.example/sessions/s1/view");

    let text = client.extract_text(&document_id).await.expect("text");
    assert_eq!(text, "quarterly numbers");
}

#[tokio::test]
async fn elastic_upsert_uses_key_derived_document_id() {
    let server = MockServer::start().await;
    mount_index_creation(&server, 1).await;
    Mock::given(method("PUT"))
        .and(path("/files/_doc/42:user-1"))
        .and(query_param("refresh", "wait_for"))
        .and(body_partial_json(json!({ "file_id": "42", "user_id": "user-1", "text": "body" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "updated" })))
        .expect(1)
        .mount(&server)
        .await;

    let index = ElasticIndex::new(server.uri(), "files").unwrap();
    let entry = IndexEntry {
        file_id: "42".to_string(),
        user_id: "user-1".to_string(),
        owner_id: "owner-9".to_string(),
        name: "report.docx".to_string(),
        modified_at: "2024-01-10T00:00:00-08:00".to_string(),
        text: "body".to_string(),
    };
    index.upsert_entry(&entry).await.expect("upsert");
}

#[tokio::test]
async fn elastic_lookup_and_query_parse_hits() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "type": "resource_already_exists_exception", "reason": "index [files] already exists" },
            "status": 400
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/files/_search"))
        .and(body_partial_json(json!({ "_source": ["file_id", "name", "modified_at"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": { "hits": [
                { "_id": "42:user-1", "_score": 2.5, "_source": { "file_id": "42", "name": "report.docx", "modified_at": "2024-01-10T00:00:00-08:00" } }
            ] }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/files/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": { "hits": [
                { "_id": "42:user-1", "_score": 0.0, "_source": {
                    "file_id": "42", "user_id": "user-1", "owner_id": "owner-9",
                    "name": "report.docx", "modified_at": "2024-01-10T00:00:00-08:00", "text": "body"
                } }
            ] }
        })))
        .mount(&server)
        .await;

    let index = ElasticIndex::new(server.uri(), "files").unwrap();
    let hits = index.query("user-1", "report").await.expect("query");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].score, 2.5);

    let entries = index.lookup_entries("42", "user-1").await.expect("lookup");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].owner_id, "owner-9");
}

#[tokio::test]
async fn indexing_over_http_converts_extracts_and_upserts_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_json()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "document_collection": { "entries": [
                { "id": "d-old", "name": "42", "created_at": "2024-01-09T00:00:00Z" }
            ] }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/42/content"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "https://dl.example/42"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/documents"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "id": "d-new" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sessions"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    mount_index_creation(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/files/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "hits": { "hits": [] } })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/documents/d-new/content.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("quarterly numbers"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/files/_doc/42:user-1"))
        .and(body_partial_json(json!({ "modified_at": "2024-01-10T00:00:00-08:00" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "result": "created" })))
        .expect(1)
        .mount(&server)
        .await;

    let storage = StorageClient::new(server.uri()).unwrap();
    let conversion = ConversionClient::new(server.uri(), server.uri(), "view-key").unwrap();
    let index = ElasticIndex::new(server.uri(), "files").unwrap();
    let config = SyncConfig::default();

    let sync = Synchroniser::new(&storage, &conversion, &index, &config);
    let report = sync
        .synchronise_for_indexing("user-1", &credentials(), "42")
        .await
        .expect("indexing over http");
    assert!(report.converted);
    assert_eq!(report.document_id, "d-new");
    assert_eq!(report.outcome, IndexOutcome::Reindexed);
}

#[tokio::test]
async fn elastic_missing_index_yields_no_entries_and_no_hits() {
    let server = MockServer::start().await;
    mount_index_creation(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/files/_search"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "type": "index_not_found_exception", "reason": "no such index [files]" },
            "status": 404
        })))
        .mount(&server)
        .await;

    let index = ElasticIndex::new(server.uri(), "files").unwrap();
    let entries = index.lookup_entries("42", "user-1").await.expect("lookup");
    assert!(entries.is_empty());
    let hits = index.query("user-1", "report").await.expect("query");
    assert!(hits.is_empty());
}

#[tokio::test]
async fn elastic_creates_keyword_mapping_once_and_filters_on_exact_ids() {
    let server = MockServer::start().await;
    mount_index_creation(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/files/_search"))
        .and(body_json(json!({
            "query": { "bool": { "filter": [
                { "term": { "file_id": "42" } },
                { "term": { "user_id": "user-1" } }
            ] } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "hits": { "hits": [] } })))
        .expect(2)
        .mount(&server)
        .await;

    let mappings = ElasticIndex::mappings();
    for field in ["file_id", "user_id", "owner_id"] {
        assert_eq!(mappings["mappings"]["properties"][field]["type"], "keyword");
    }

    let index = ElasticIndex::new(server.uri(), "files").unwrap();
    index.lookup_entries("42", "user-1").await.expect("first lookup");
    index.lookup_entries("42", "user-1").await.expect("second lookup");
}

#[tokio::test]
async fn elastic_index_creation_failure_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "type": "mapper_parsing_exception" },
            "status": 400
        })))
        .mount(&server)
        .await;

    let index = ElasticIndex::new(server.uri(), "files").unwrap();
    let err = index.lookup_entries("42", "user-1").await.unwrap_err();
    assert!(matches!(err, ServiceError::Failed(_)));
    assert!(err.to_string().contains("mapper_parsing_exception"));
}
