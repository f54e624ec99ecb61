use anyhow::{Result, anyhow};
use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use leadgate::models::{Contact, Lead, LeadType, NewContact, NewLead, NewsletterSignup};
use leadgate::rate_limit::{InMemoryRateLimiter, RateLimitConfig};
use leadgate::state::AppState;
use leadgate::store::{LeadStore, SqliteStore};

const PDF: &[u8] = b"%PDF-1.4\n% steel automation guide\n";

struct TestApp {
    app: Router,
    store: SqliteStore,
    dir: TempDir,
}

fn state_with(store: Arc<dyn LeadStore>, dir: &Path) -> Arc<AppState> {
    Arc::new(AppState {
        store,
        rate_limiter: Arc::new(InMemoryRateLimiter::new()),
        form_limit: RateLimitConfig::default(),
        download_limit: RateLimitConfig::download(),
        guide_path: dir.join("steel-automation-guide.pdf"),
        public_dir: dir.join("public"),
    })
}

fn spawn_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("steel-automation-guide.pdf"), PDF).unwrap();
    std::fs::create_dir(dir.path().join("public")).unwrap();

    let store = SqliteStore::in_memory().unwrap();
    let app = leadgate::router(state_with(Arc::new(store.clone()), dir.path()));
    TestApp { app, store, dir }
}

fn post_json(uri: &str, ip: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", ip)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, ip: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-real-ip", ip)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn contact_body() -> Value {
    json!({
        "name": "Ana Ruiz",
        "email": "ana@steelworks.io",
        "subject": "Quote",
        "message": "We fabricate 400 tonnes a month."
    })
}

fn lead_body(email: &str, lead_type: &str) -> Value {
    json!({
        "name": "Ana Ruiz",
        "email": email,
        "company": "Steelworks",
        "role": "Estimator",
        "phone": "+1 555 0100",
        "leadType": lead_type
    })
}

#[tokio::test]
async fn test_contact_success() {
    let t = spawn_app();
    let response = send(&t.app, post_json("/api/contact", "1.1.1.1", &contact_body())).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert!(body["data"]["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert_eq!(
        body["message"],
        "Message sent successfully! We'll get back to you soon."
    );
}

#[tokio::test]
async fn test_contact_invalid_email() {
    let t = spawn_app();
    let body = json!({"name": "A", "email": "bad", "subject": "s", "message": "hello world"});
    let response = send(&t.app, post_json("/api/contact", "1.1.1.2", &body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body, json!({"success": false, "error": "Invalid email format"}));
}

#[tokio::test]
async fn test_contact_malformed_json() {
    let t = spawn_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/contact")
        .header("x-forwarded-for", "1.1.1.3")
        .body(Body::from("{not json"))
        .unwrap();
    let response = send(&t.app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Invalid request body");
}

#[tokio::test]
async fn test_sixth_submission_is_rate_limited() {
    let t = spawn_app();
    for _ in 0..5 {
        let response = send(&t.app, post_json("/api/contact", "1.2.3.4", &contact_body())).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = send(&t.app, post_json("/api/contact", "1.2.3.4", &contact_body())).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        json_body(response).await["error"],
        "Too many requests. Please try again later."
    );

    // other clients keep their own budget
    let response = send(&t.app, post_json("/api/contact", "5.6.7.8", &contact_body())).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_runs_before_validation() {
    let t = spawn_app();
    let bad = json!({"email": "bad"});
    for _ in 0..5 {
        let response = send(&t.app, post_json("/api/newsletter", "2.2.2.2", &bad)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
    let response = send(&t.app, post_json("/api/newsletter", "2.2.2.2", &bad)).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_budget_is_shared_across_form_endpoints() {
    let t = spawn_app();
    for _ in 0..3 {
        send(&t.app, post_json("/api/contact", "3.3.3.3", &contact_body())).await;
    }
    for _ in 0..2 {
        let body = json!({"email": "reader@example.com"});
        send(&t.app, post_json("/api/newsletter", "3.3.3.3", &body)).await;
    }
    let response = send(
        &t.app,
        post_json("/api/leads", "3.3.3.3", &lead_body("a@b.co", "DEMO")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_clients_without_address_share_unknown_bucket() {
    let t = spawn_app();
    let anonymous = || {
        Request::builder()
            .method("POST")
            .uri("/api/newsletter")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"email": "x@example.com"}).to_string()))
            .unwrap()
    };

    for _ in 0..5 {
        assert_eq!(send(&t.app, anonymous()).await.status(), StatusCode::OK);
    }
    assert_eq!(
        send(&t.app, anonymous()).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn test_lead_success_and_persisted() {
    let t = spawn_app();
    let response = send(
        &t.app,
        post_json("/api/leads", "4.4.4.4", &lead_body("ana@steelworks.io", "CONSULTATION")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(
        body["message"],
        "Thank you for your interest! We'll contact you within 24 hours."
    );

    let stored = t
        .store
        .find_lead("ana@steelworks.io", LeadType::Consultation)
        .await
        .unwrap()
        .expect("lead stored");
    assert_eq!(body["data"]["id"], stored.id.as_str());
    assert_eq!(stored.company, "Steelworks");
}

#[tokio::test]
async fn test_lead_rejects_unknown_type() {
    let t = spawn_app();
    let response = send(
        &t.app,
        post_json("/api/leads", "4.4.4.5", &lead_body("ana@steelworks.io", "WEBINAR")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Invalid lead type");
    assert_eq!(t.store.count_leads().await.unwrap(), 0);
}

#[tokio::test]
async fn test_lead_rejects_null_optional_fields() {
    let t = spawn_app();
    let mut body = lead_body("ana@steelworks.io", "DEMO");
    body["phone"] = Value::Null;

    let response = send(&t.app, post_json("/api/leads", "4.4.4.6", &body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Expected string, received null");

    // leaving the key out is fine
    body.as_object_mut().unwrap().remove("phone");
    let response = send(&t.app, post_json("/api/leads", "4.4.4.6", &body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(t.store.count_leads().await.unwrap(), 1);
}

#[tokio::test]
async fn test_missing_fields_report_required() {
    let t = spawn_app();
    let response = send(
        &t.app,
        post_json("/api/contact", "4.4.4.7", &json!({"email": "ana@steelworks.io"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Required");

    let response = send(&t.app, post_json("/api/newsletter", "4.4.4.7", &json!({}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Required");
}

#[tokio::test]
async fn test_newsletter_signup_is_idempotent() {
    let t = spawn_app();
    let body = json!({"email": "reader@example.com"});

    let first = json_body(send(&t.app, post_json("/api/newsletter", "6.6.6.6", &body)).await).await;
    assert_eq!(first["success"], true);
    assert!(first["data"]["id"].is_string());
    assert_eq!(first["message"], "Successfully subscribed to newsletter!");

    let second = json_body(send(&t.app, post_json("/api/newsletter", "6.6.6.6", &body)).await).await;
    assert_eq!(second["data"], json!({"alreadySubscribed": true}));
    assert_eq!(second["message"], "You're already subscribed to our newsletter!");

    assert_eq!(t.store.count_leads().await.unwrap(), 1);
    let lead = t
        .store
        .find_lead("reader@example.com", LeadType::Newsletter)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lead.name, "Newsletter Subscriber");
    assert_eq!(lead.company, "Unknown");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_newsletter_signups_store_one_lead() {
    let t = spawn_app();
    let body = json!({"email": "race@example.com"});
    let mut handles = Vec::new();

    // distinct addresses so the rate limiter stays out of the way
    for i in 0..32 {
        let app = t.app.clone();
        let request = post_json("/api/newsletter", &format!("10.1.0.{i}"), &body);
        handles.push(tokio::spawn(async move {
            json_body(app.oneshot(request).await.unwrap()).await
        }));
    }

    let mut created = 0;
    for handle in handles {
        let response = handle.await.unwrap();
        assert_eq!(response["success"], true);
        if response["data"]["id"].is_string() {
            created += 1;
        } else {
            assert_eq!(response["data"], json!({"alreadySubscribed": true}));
        }
    }
    assert_eq!(created, 1);
    assert_eq!(t.store.count_leads().await.unwrap(), 1);
}

#[tokio::test]
async fn test_newsletter_ignores_other_lead_types() {
    let t = spawn_app();
    send(
        &t.app,
        post_json("/api/leads", "6.6.6.7", &lead_body("reader@example.com", "GUIDE")),
    )
    .await;

    let body = json!({"email": "reader@example.com"});
    let response = json_body(send(&t.app, post_json("/api/newsletter", "6.6.6.7", &body)).await).await;
    assert!(response["data"]["id"].is_string());
    assert_eq!(t.store.count_leads().await.unwrap(), 2);
}

#[tokio::test]
async fn test_guide_requires_email() {
    let t = spawn_app();
    for uri in ["/api/guide/download", "/api/guide/download?email="] {
        let response = send(&t.app, get(uri, "7.7.7.1")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Email parameter required");
    }
}

#[tokio::test]
async fn test_guide_gated_on_guide_lead() {
    let t = spawn_app();
    let uri = "/api/guide/download?email=ana%40steelworks.io";

    let response = send(&t.app, get(uri, "7.7.7.2")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        json_body(response).await["error"],
        "Please submit your information first to download the guide"
    );

    // a demo request doesn't unlock the guide
    t.store
        .create_lead(NewLead {
            lead_type: LeadType::Demo,
            ..NewLead::newsletter("ana@steelworks.io".into())
        })
        .await
        .unwrap();
    assert_eq!(send(&t.app, get(uri, "7.7.7.2")).await.status(), StatusCode::FORBIDDEN);

    let response = send(
        &t.app,
        post_json("/api/leads", "7.7.7.2", &lead_body("ana@steelworks.io", "GUIDE")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&t.app, get(uri, "7.7.7.2")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    assert!(
        headers[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("attachment")
    );
    assert_eq!(headers[header::CACHE_CONTROL], "private, no-cache");

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], PDF);
}

#[tokio::test]
async fn test_guide_missing_file_is_not_found() {
    let t = spawn_app();
    std::fs::remove_file(t.dir.path().join("steel-automation-guide.pdf")).unwrap();
    t.store
        .create_lead(NewLead {
            lead_type: LeadType::Guide,
            ..NewLead::newsletter("ana@steelworks.io".into())
        })
        .await
        .unwrap();

    let response = send(&t.app, get("/api/guide/download?email=ana@steelworks.io", "7.7.7.3")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(response).await["error"],
        "Guide temporarily unavailable. Please try again later."
    );
}

#[tokio::test]
async fn test_guide_download_allows_ten_per_window() {
    let t = spawn_app();
    let uri = "/api/guide/download?email=nobody@example.com";
    for _ in 0..10 {
        assert_eq!(send(&t.app, get(uri, "7.7.7.4")).await.status(), StatusCode::FORBIDDEN);
    }
    assert_eq!(
        send(&t.app, get(uri, "7.7.7.4")).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

struct BrokenStore;

#[async_trait]
impl LeadStore for BrokenStore {
    async fn create_contact(&self, _contact: NewContact) -> Result<Contact> {
        Err(anyhow!("database is locked"))
    }

    async fn create_lead(&self, _lead: NewLead) -> Result<Lead> {
        Err(anyhow!("database is locked"))
    }

    async fn find_lead(&self, _email: &str, _lead_type: LeadType) -> Result<Option<Lead>> {
        Err(anyhow!("database is locked"))
    }

    async fn subscribe_newsletter(&self, _email: &str) -> Result<NewsletterSignup> {
        Err(anyhow!("database is locked"))
    }

    async fn count_leads(&self) -> Result<usize> {
        Err(anyhow!("database is locked"))
    }
}

#[tokio::test]
async fn test_store_failures_return_generic_messages() {
    let dir = tempfile::tempdir().unwrap();
    let app = leadgate::router(state_with(Arc::new(BrokenStore), dir.path()));

    let cases = [
        (
            post_json("/api/contact", "8.8.8.1", &contact_body()),
            "Failed to send message. Please try again.",
        ),
        (
            post_json("/api/leads", "8.8.8.2", &lead_body("a@b.co", "DEMO")),
            "Failed to submit lead. Please try again.",
        ),
        (
            post_json("/api/newsletter", "8.8.8.3", &json!({"email": "a@b.co"})),
            "Failed to subscribe. Please try again.",
        ),
        (
            get("/api/guide/download?email=a@b.co", "8.8.8.4"),
            "Failed to download guide. Please try again.",
        ),
    ];

    for (request, message) in cases {
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body, json!({"success": false, "error": message}));
    }
}

#[tokio::test]
async fn test_health_and_metrics() {
    let t = spawn_app();
    let response = send(&t.app, get("/health", "9.9.9.9")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "ok");

    send(&t.app, post_json("/api/contact", "9.9.9.9", &contact_body())).await;
    let response = send(&t.app, get("/metrics", "9.9.9.9")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("leadgate_requests_total"));
}

#[tokio::test]
async fn test_health_reports_unavailable_store() {
    let dir = tempfile::tempdir().unwrap();
    let app = leadgate::router(state_with(Arc::new(BrokenStore), dir.path()));

    let response = send(&app, get("/health", "9.9.9.7")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["database"], "unavailable");
}

#[tokio::test]
async fn test_static_assets_fall_through() {
    let t = spawn_app();
    std::fs::write(t.dir.path().join("public/robots.txt"), "User-agent: *\n").unwrap();

    let response = send(&t.app, get("/robots.txt", "9.9.9.8")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"User-agent: *\n");

    let response = send(&t.app, get("/missing.css", "9.9.9.8")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // the guide lives outside the public dir and stays behind the gate
    let response = send(&t.app, get("/steel-automation-guide.pdf", "9.9.9.8")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
