use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use precedence_api::client::HttpProvenanceClient;
use precedence_api::request::RegistrationRequest;
use precedence_api::{ProvenanceApi, RegistrationOutcome};
use precedence_core::CanonicalRecord;
use serde_json::json;

#[derive(Debug, Clone)]
struct Captured {
    query: Option<String>,
    content_type: Option<String>,
    body: Vec<u8>,
}

#[derive(Clone)]
struct Fake {
    status: StatusCode,
    reply: &'static str,
    seen: Arc<Mutex<Vec<Captured>>>,
}

async fn records(
    State(fake): State<Fake>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    fake.seen
        .lock()
        .expect("capture lock")
        .push(Captured {
            query,
            content_type,
            body: body.to_vec(),
        });
    (fake.status, fake.reply)
}

async fn serve(status: StatusCode, reply: &'static str) -> (String, Arc<Mutex<Vec<Captured>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/records", post(records))
        .with_state(Fake {
            status,
            reply,
            seen: seen.clone(),
        });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    (format!("http://{addr}"), seen)
}

fn sample_request(store: bool) -> RegistrationRequest {
    let record = CanonicalRecord {
        id: "0f".repeat(32),
        chain: "dbserver.table{\"id\":5}".to_string(),
        data: json!({"name": "x", "id": 5}),
    };
    RegistrationRequest::from_record(&record, store).expect("request")
}

#[tokio::test]
async fn created_response_posts_octet_stream_with_query() {
    let (base, seen) = serve(
        StatusCode::CREATED,
        r#"{"data":{"provable":{"id":"prov-1"}}}"#,
    )
    .await;
    let client = HttpProvenanceClient::new(&base, None).expect("client");
    let req = sample_request(true);

    let out = client.register(&req).await;
    assert_eq!(
        out,
        RegistrationOutcome::Created {
            provable_id: "prov-1".to_string()
        }
    );

    let seen = seen.lock().expect("capture lock");
    assert_eq!(seen.len(), 1);
    let call = &seen[0];
    assert_eq!(call.content_type.as_deref(), Some("application/octet-stream"));
    assert_eq!(call.body, br#"{"id":5,"name":"x"}"#.to_vec());
    let query = call.query.as_deref().expect("query string");
    assert_eq!(
        query,
        format!(
            "id={}&store=true&hash={}&chain=dbserver.table%7B%22id%22%3A5%7D",
            req.id, req.hash
        )
    );
}

#[tokio::test]
async fn duplicate_conflict_is_reported() {
    let (base, _seen) = serve(
        StatusCode::CONFLICT,
        r#"{"error":{"code":3,"data":{"id":"prov-0"}}}"#,
    )
    .await;
    let client = HttpProvenanceClient::new(&base, None).expect("client");
    assert_eq!(
        client.register(&sample_request(false)).await,
        RegistrationOutcome::Conflict {
            existing_id: Some("prov-0".to_string())
        }
    );
}

#[tokio::test]
async fn server_error_is_transient() {
    let (base, _seen) = serve(StatusCode::INTERNAL_SERVER_ERROR, "boom").await;
    let client = HttpProvenanceClient::new(&base, None).expect("client");
    assert!(!client.register(&sample_request(false)).await.is_terminal());
}

#[tokio::test]
async fn unreachable_service_is_transient() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client = HttpProvenanceClient::new(&format!("http://{addr}"), None).expect("client");
    match client.register(&sample_request(false)).await {
        RegistrationOutcome::TransientFailure { reason } => {
            assert!(reason.starts_with("transport error"))
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}
