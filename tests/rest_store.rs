use std::time::Duration;

use ministry_site::auth::AuthProvider;
use ministry_site::model::{LivestreamUpdate, MeetingDraft, MeetingType};
use ministry_site::storage::{RecordStore, RestStore, RetryPolicy, Table, TableStatus};
use ministry_site::Error;
use serde_json::json;
use wiremock::{
    matchers::{body_json, header, method, path, query_param},
    Mock, MockServer, Request, ResponseTemplate,
};

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        attempts: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        timeout: Duration::from_secs(5),
    }
}

fn store(server: &MockServer) -> RestStore {
    RestStore::new(&server.uri(), "anon-key", Some("service-key"), fast_retry()).unwrap()
}

fn prefers(fragment: &'static str) -> impl Fn(&Request) -> bool + Send + Sync + 'static {
    move |req: &Request| {
        req.headers
            .get("prefer")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains(fragment))
    }
}

fn sermon_row(id: &str, title: &str, date: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "description": null,
        "date": date,
        "youtube_url": "https://www.youtube.com/watch?v=abc",
        "thumbnail_url": null,
        "created_at": "2024-01-07T10:00:00+00:00",
        "updated_at": "2024-01-07T10:00:00+00:00"
    })
}

#[tokio::test]
async fn probe_maps_missing_relation_to_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/meetings"))
        .and(header("apikey", "anon-key"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "42P01",
            "message": "relation \"public.meetings\" does not exist"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/sermons"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = store(&server);
    assert_eq!(store.probe_table(Table::Meetings).await.unwrap(), TableStatus::Missing);
    assert_eq!(store.probe_table(Table::Sermons).await.unwrap(), TableStatus::Present);
}

#[tokio::test]
async fn probe_propagates_other_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/livestream"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Invalid API key"
        })))
        .mount(&server)
        .await;

    let err = store(&server).probe_table(Table::Livestream).await.unwrap_err();
    assert!(!err.is_schema_missing());
    assert!(err.to_string().contains("Invalid API key"));
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/sermons"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/sermons"))
        .and(query_param("order", "date.desc,created_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            sermon_row("b", "Newer", "2024-02-04"),
            sermon_row("a", "Older", "2024-01-07"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let sermons = store(&server).list_sermons().await.unwrap();
    assert_eq!(sermons.len(), 2);
    assert_eq!(sermons[0].title, "Newer");
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/sermons"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "null value in column \"title\" violates not-null constraint"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let draft = ministry_site::model::SermonDraft {
        title: String::new(),
        description: None,
        date: "2024-01-07".to_string(),
        youtube_url: "https://youtu.be/x".to_string(),
        thumbnail_url: None,
    };
    let err = store(&server).create_sermon(&draft).await.unwrap_err();
    assert!(matches!(err, Error::Store(_)));
}

#[tokio::test]
async fn livestream_upsert_merges_on_singleton_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/livestream"))
        .and(query_param("on_conflict", "id"))
        .and(prefers("resolution=merge-duplicates"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": 1,
            "youtube_id": "Xy12Ab",
            "description": null,
            "is_live": true,
            "created_at": "2024-01-07T10:00:00+00:00",
            "updated_at": "2024-01-08T10:00:00+00:00"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let written = store(&server)
        .upsert_livestream(&LivestreamUpdate {
            id: None,
            youtube_id: "Xy12Ab".to_string(),
            description: None,
            is_live: true,
        })
        .await
        .unwrap();
    assert_eq!(written.id, 1);
    assert!(written.is_live);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body[0]["id"], json!(1));
    assert_eq!(body[0]["youtube_id"], json!("Xy12Ab"));
}

#[tokio::test]
async fn meeting_upsert_omits_absent_optional_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/meetings"))
        .and(query_param("on_conflict", "meeting_type"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": "m-1",
            "title": "Bible Study",
            "meeting_type": "evening",
            "time": "8 PM",
            "location": "Community Church Hall",
            "zoom_link": null,
            "maps_link": null,
            "created_at": null,
            "updated_at": null
        }])))
        .mount(&server)
        .await;

    let meeting = store(&server)
        .upsert_meeting(&MeetingDraft::new(MeetingType::Evening, "Bible Study", "8 PM"))
        .await
        .unwrap();
    assert_eq!(meeting.location.as_deref(), Some("Community Church Hall"));

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let row = body[0].as_object().unwrap();
    assert_eq!(row["meeting_type"], json!("evening"));
    assert!(!row.contains_key("location"));
    assert!(!row.contains_key("id"));
}

#[tokio::test]
async fn deleting_missing_sermon_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/sermons"))
        .and(query_param("id", "eq.missing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = store(&server).delete_sermon("missing").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn count_reads_content_range_total() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/prayer_requests"))
        .and(prefers("count=exact"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-range", "*/12")
                .set_body_json(json!([])),
        )
        .mount(&server)
        .await;

    assert_eq!(store(&server).count_rows(Table::PrayerRequests).await.unwrap(), 12);
}

#[tokio::test]
async fn execute_sql_uses_service_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/exec_sql"))
        .and(header("apikey", "service-key"))
        .and(body_json(json!({ "sql": "SELECT 1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let result = store(&server).execute_sql("SELECT 1").await.unwrap();
    assert_eq!(result, json!({ "success": true }));
}

#[tokio::test]
async fn schema_operations_require_service_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = RestStore::new(&server.uri(), "anon-key", None, fast_retry()).unwrap();
    assert!(matches!(store.apply_schema().await, Err(Error::Config(_))));
    assert!(matches!(store.execute_sql("SELECT 1").await, Err(Error::Config(_))));
}

#[tokio::test]
async fn sign_in_uses_password_grant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(body_json(json!({ "email": "pastor@example.org", "password": "right" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-123",
            "expires_in": 3600,
            "user": { "email": "pastor@example.org" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let store = store(&server);
    let session = store.sign_in("pastor@example.org", "right").await.unwrap();
    assert_eq!(session.token, "tok-123");
    assert_eq!(session.email, "pastor@example.org");

    match store.sign_in("pastor@example.org", "wrong").await {
        Err(Error::Auth(msg)) => assert_eq!(msg, "Invalid login credentials"),
        other => panic!("expected Auth error, got {:?}", other),
    }
}

#[tokio::test]
async fn unknown_token_has_no_session_user() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer good"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u-1",
            "email": "pastor@example.org"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "msg": "invalid JWT" })))
        .mount(&server)
        .await;

    let store = store(&server);
    let user = store.session_user("good").await.unwrap().unwrap();
    assert_eq!(user.email, "pastor@example.org");
    assert_eq!(store.session_user("bad").await.unwrap(), None);
}
