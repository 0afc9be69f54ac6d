//! End-to-end API tests against an in-process server.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use common::TestFixture;
use helpdesk_core::testing::MockLlmClient;
use helpdesk_core::{ClassificationService, ClassifierConfig, Config, LlmProvider};

fn classifier_with(client: MockLlmClient) -> ClassificationService {
    ClassificationService::new(Arc::new(client), Duration::from_secs(1), 200)
}

// ============================================================================
// Health / config / metrics
// ============================================================================

#[tokio::test]
async fn health_returns_ok() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/health").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn config_endpoint_redacts_api_key() {
    let config = Config {
        classifier: Some(ClassifierConfig {
            provider: LlmProvider::Anthropic,
            model: "claude-3-5-haiku-latest".to_string(),
            api_key: Some("sk-very-secret".to_string()),
            api_base: None,
            timeout_secs: 10,
            max_tokens: 200,
        }),
        ..Default::default()
    };
    let fixture = TestFixture::with_config(config, ClassificationService::disabled());

    let response = fixture.get("/api/v1/config").await;

    assert_status!(response, StatusCode::OK);
    let body = serde_json::to_string(&response.body).unwrap();
    assert!(!body.contains("sk-very-secret"));
    assert_eq!(response.body["classifier"]["api_key_set"], true);
    assert_eq!(response.body["server"]["port"], 8080);
}

#[tokio::test]
async fn metrics_endpoint_exposes_counters() {
    let fixture = TestFixture::new();

    // generate some traffic first
    fixture.get("/api/v1/health").await;

    let (status, body) = fixture.get_text("/api/v1/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("helpdesk_http_requests_total"));
}

// ============================================================================
// Ticket creation
// ============================================================================

#[tokio::test]
async fn create_ticket_returns_created_with_defaults() {
    let fixture = TestFixture::new();

    let response = fixture
        .post(
            "/api/v1/tickets",
            json!({
                "title": "Printer on fire",
                "description": "Smoke is coming out of the office printer",
                "category": "technical",
                "priority": "high"
            }),
        )
        .await;

    assert_status!(response, StatusCode::CREATED);
    assert_eq!(response.body["title"], "Printer on fire");
    assert_eq!(response.body["category"], "technical");
    assert_eq!(response.body["priority"], "high");
    // status defaults to open
    assert_eq!(response.body["status"], "open");
    assert!(response.body["id"].as_i64().is_some());
    assert!(response.body["created_at"].as_str().is_some());
}

#[tokio::test]
async fn create_ticket_accepts_explicit_status() {
    let fixture = TestFixture::new();

    let response = fixture
        .post(
            "/api/v1/tickets",
            json!({
                "title": "Already being handled",
                "description": "Imported from the old system",
                "category": "general",
                "priority": "low",
                "status": "in_progress"
            }),
        )
        .await;

    assert_status!(response, StatusCode::CREATED);
    assert_eq!(response.body["status"], "in_progress");
}

#[tokio::test]
async fn create_ticket_rejects_blank_title() {
    let fixture = TestFixture::new();

    let response = fixture
        .post(
            "/api/v1/tickets",
            json!({
                "title": "   ",
                "description": "Something broke",
                "category": "technical",
                "priority": "low"
            }),
        )
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    let fields = response.body["fields"].as_array().unwrap();
    assert!(fields.iter().any(|f| f["field"] == "title"));

    // nothing was stored
    let list = fixture.get("/api/v1/tickets").await;
    assert_eq!(list.body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn create_ticket_rejects_oversized_title() {
    let fixture = TestFixture::new();

    let response = fixture
        .post(
            "/api/v1/tickets",
            json!({
                "title": "x".repeat(201),
                "description": "Long title",
                "category": "general",
                "priority": "low"
            }),
        )
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    let fields = response.body["fields"].as_array().unwrap();
    assert!(fields.iter().any(|f| f["field"] == "title"));
}

#[tokio::test]
async fn create_ticket_rejects_unknown_category_with_field_detail() {
    let fixture = TestFixture::new();

    let response = fixture
        .post(
            "/api/v1/tickets",
            json!({
                "title": "Weird category",
                "description": "This should bounce",
                "category": "complaints",
                "priority": "nope"
            }),
        )
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    let fields = response.body["fields"].as_array().unwrap();
    assert!(fields.iter().any(|f| f["field"] == "category"));
    assert!(fields.iter().any(|f| f["field"] == "priority"));
}

#[tokio::test]
async fn create_ticket_rejects_missing_body_fields() {
    let fixture = TestFixture::new();

    let response = fixture
        .post("/api/v1/tickets", json!({ "title": "No description" }))
        .await;

    assert!(
        response.status.is_client_error(),
        "expected a 4xx, got {:?}",
        response.status
    );
}

// ============================================================================
// Retrieval and listing
// ============================================================================

#[tokio::test]
async fn get_ticket_roundtrips_created_fields() {
    let fixture = TestFixture::new();

    let created = fixture
        .post(
            "/api/v1/tickets",
            json!({
                "title": "VPN drops every hour",
                "description": "Connection resets at minute zero",
                "category": "technical",
                "priority": "medium"
            }),
        )
        .await;
    let id = created.body["id"].as_i64().unwrap();

    let fetched = fixture.get(&format!("/api/v1/tickets/{id}")).await;

    assert_status!(fetched, StatusCode::OK);
    assert_eq!(fetched.body["id"], created.body["id"]);
    assert_eq!(fetched.body["title"], "VPN drops every hour");
    assert_eq!(fetched.body["created_at"], created.body["created_at"]);
}

#[tokio::test]
async fn get_unknown_ticket_is_not_found() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/tickets/9999").await;

    assert_status!(response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_returns_newest_first() {
    let fixture = TestFixture::new();

    for title in ["first", "second", "third"] {
        let response = fixture
            .post(
                "/api/v1/tickets",
                json!({
                    "title": title,
                    "description": "ordering probe",
                    "category": "general",
                    "priority": "low"
                }),
            )
            .await;
        assert_status!(response, StatusCode::CREATED);
    }

    let list = fixture.get("/api/v1/tickets").await;

    assert_status!(list, StatusCode::OK);
    let titles: Vec<&str> = list
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn list_filters_combine_as_intersection() {
    let fixture = TestFixture::new();

    let tickets = [
        ("Invoice is wrong", "billing", "high"),
        ("Refund pending", "billing", "low"),
        ("Server down", "technical", "high"),
    ];
    for (title, category, priority) in tickets {
        fixture
            .post(
                "/api/v1/tickets",
                json!({
                    "title": title,
                    "description": "filter probe",
                    "category": category,
                    "priority": priority
                }),
            )
            .await;
    }

    let response = fixture
        .get("/api/v1/tickets?category=billing&priority=high")
        .await;

    assert_status!(response, StatusCode::OK);
    let results = response.body.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["title"], "Invoice is wrong");
}

#[tokio::test]
async fn list_search_matches_title_and_description() {
    let fixture = TestFixture::new();

    fixture
        .post(
            "/api/v1/tickets",
            json!({
                "title": "Cannot reset password",
                "description": "Reset email never arrives",
                "category": "account",
                "priority": "medium"
            }),
        )
        .await;
    fixture
        .post(
            "/api/v1/tickets",
            json!({
                "title": "Slow dashboard",
                "description": "Charts take a minute, maybe a PASSWORD cache issue",
                "category": "technical",
                "priority": "low"
            }),
        )
        .await;
    fixture
        .post(
            "/api/v1/tickets",
            json!({
                "title": "Unrelated",
                "description": "Nothing to see",
                "category": "general",
                "priority": "low"
            }),
        )
        .await;

    // case-insensitive, matches either field
    let response = fixture.get("/api/v1/tickets?search=password").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn list_rejects_unknown_status_filter() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/tickets?status=pending").await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    let fields = response.body["fields"].as_array().unwrap();
    assert!(fields.iter().any(|f| f["field"] == "status"));
}

#[tokio::test]
async fn list_ignores_empty_filter_values() {
    let fixture = TestFixture::new();

    fixture
        .post(
            "/api/v1/tickets",
            json!({
                "title": "Only ticket",
                "description": "here",
                "category": "general",
                "priority": "low"
            }),
        )
        .await;

    let response = fixture.get("/api/v1/tickets?category=&search=").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body.as_array().unwrap().len(), 1);
}

// ============================================================================
// Updates
// ============================================================================

#[tokio::test]
async fn update_status_preserves_identity() {
    let fixture = TestFixture::new();

    let created = fixture
        .post(
            "/api/v1/tickets",
            json!({
                "title": "Login broken",
                "description": "Users cannot sign in since this morning",
                "category": "technical",
                "priority": "high"
            }),
        )
        .await;
    assert_status!(created, StatusCode::CREATED);
    let id = created.body["id"].as_i64().unwrap();

    let updated = fixture
        .patch(
            &format!("/api/v1/tickets/{id}"),
            json!({ "status": "in_progress" }),
        )
        .await;

    assert_status!(updated, StatusCode::OK);
    assert_eq!(updated.body["status"], "in_progress");
    assert_eq!(updated.body["id"], created.body["id"]);
    assert_eq!(updated.body["created_at"], created.body["created_at"]);
    // untouched fields survive
    assert_eq!(updated.body["title"], "Login broken");
    assert_eq!(updated.body["priority"], "high");
}

#[tokio::test]
async fn update_revalidates_text_fields() {
    let fixture = TestFixture::new();

    let created = fixture
        .post(
            "/api/v1/tickets",
            json!({
                "title": "Valid title",
                "description": "Valid description",
                "category": "general",
                "priority": "low"
            }),
        )
        .await;
    let id = created.body["id"].as_i64().unwrap();

    let response = fixture
        .patch(&format!("/api/v1/tickets/{id}"), json!({ "title": "" }))
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);

    // the stored ticket is unchanged
    let fetched = fixture.get(&format!("/api/v1/tickets/{id}")).await;
    assert_eq!(fetched.body["title"], "Valid title");
}

#[tokio::test]
async fn update_with_empty_body_is_rejected() {
    let fixture = TestFixture::new();

    let created = fixture
        .post(
            "/api/v1/tickets",
            json!({
                "title": "A ticket",
                "description": "exists",
                "category": "general",
                "priority": "low"
            }),
        )
        .await;
    let id = created.body["id"].as_i64().unwrap();

    let response = fixture
        .patch(&format!("/api/v1/tickets/{id}"), json!({}))
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_unknown_ticket_is_not_found() {
    let fixture = TestFixture::new();

    let response = fixture
        .patch("/api/v1/tickets/424242", json!({ "status": "closed" }))
        .await;

    assert_status!(response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_rejects_unknown_enum_value() {
    let fixture = TestFixture::new();

    let created = fixture
        .post(
            "/api/v1/tickets",
            json!({
                "title": "A ticket",
                "description": "exists",
                "category": "general",
                "priority": "low"
            }),
        )
        .await;
    let id = created.body["id"].as_i64().unwrap();

    let response = fixture
        .patch(&format!("/api/v1/tickets/{id}"), json!({ "status": "done" }))
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    let fields = response.body["fields"].as_array().unwrap();
    assert!(fields.iter().any(|f| f["field"] == "status"));
}

// ============================================================================
// Stats
// ============================================================================

#[tokio::test]
async fn stats_on_empty_store_are_all_zero() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/tickets/stats").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["total_tickets"], 0);
    assert_eq!(response.body["open_tickets"], 0);
    assert_eq!(response.body["avg_tickets_per_day"], 0.0);
    // breakdowns always carry every bucket
    assert_eq!(response.body["priority_breakdown"]["critical"], 0);
    assert_eq!(response.body["category_breakdown"]["billing"], 0);
}

#[tokio::test]
async fn stats_reflect_created_and_updated_tickets() {
    let fixture = TestFixture::new();

    let tickets = [
        ("Invoice", "billing", "high"),
        ("Outage", "technical", "critical"),
        ("Question", "general", "low"),
    ];
    for (title, category, priority) in tickets {
        fixture
            .post(
                "/api/v1/tickets",
                json!({
                    "title": title,
                    "description": "stats probe",
                    "category": category,
                    "priority": priority
                }),
            )
            .await;
    }

    // resolve one ticket so open count drops
    let list = fixture.get("/api/v1/tickets").await;
    let id = list.body.as_array().unwrap()[0]["id"].as_i64().unwrap();
    fixture
        .patch(
            &format!("/api/v1/tickets/{id}"),
            json!({ "status": "resolved" }),
        )
        .await;

    let response = fixture.get("/api/v1/tickets/stats").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["total_tickets"], 3);
    assert_eq!(response.body["open_tickets"], 2);
    assert_eq!(response.body["priority_breakdown"]["high"], 1);
    assert_eq!(response.body["priority_breakdown"]["critical"], 1);
    assert_eq!(response.body["priority_breakdown"]["low"], 1);
    assert_eq!(response.body["priority_breakdown"]["medium"], 0);
    assert_eq!(response.body["category_breakdown"]["billing"], 1);
    assert_eq!(response.body["category_breakdown"]["technical"], 1);
    assert_eq!(response.body["category_breakdown"]["account"], 0);
    // everything was created just now, within a single day
    assert_eq!(response.body["avg_tickets_per_day"], 3.0);
}

// ============================================================================
// Classification
// ============================================================================

#[tokio::test]
async fn classify_without_provider_is_unavailable() {
    let fixture = TestFixture::new();

    let response = fixture
        .post(
            "/api/v1/tickets/classify",
            json!({ "description": "Cannot log in" }),
        )
        .await;

    assert_status!(response, StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.body["error"].as_str().is_some());
}

#[tokio::test]
async fn classify_returns_provider_suggestion() {
    let client = MockLlmClient::new()
        .with_response(r#"{"category": "account", "priority": "high"}"#);
    let fixture = TestFixture::with_classifier(classifier_with(client));

    let response = fixture
        .post(
            "/api/v1/tickets/classify",
            json!({ "description": "Users locked out of their accounts" }),
        )
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["suggested_category"], "account");
    assert_eq!(response.body["suggested_priority"], "high");
}

#[tokio::test]
async fn classify_malformed_provider_output_is_unavailable() {
    let client = MockLlmClient::new().with_response("I am not JSON");
    let fixture = TestFixture::with_classifier(classifier_with(client));

    let response = fixture
        .post(
            "/api/v1/tickets/classify",
            json!({ "description": "whatever" }),
        )
        .await;

    assert_status!(response, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn classify_failure_does_not_affect_ticket_writes() {
    let client = MockLlmClient::new().with_response("garbage");
    let fixture = TestFixture::with_classifier(classifier_with(client));

    let classify = fixture
        .post(
            "/api/v1/tickets/classify",
            json!({ "description": "Server room is flooding" }),
        )
        .await;
    assert_status!(classify, StatusCode::SERVICE_UNAVAILABLE);

    // manual submission still works
    let created = fixture
        .post(
            "/api/v1/tickets",
            json!({
                "title": "Server room is flooding",
                "description": "Water everywhere",
                "category": "technical",
                "priority": "critical"
            }),
        )
        .await;
    assert_status!(created, StatusCode::CREATED);
}

// ============================================================================
// End-to-end scenario
// ============================================================================

#[tokio::test]
async fn full_ticket_lifecycle() {
    let client = MockLlmClient::new()
        .with_response(r#"{"category": "technical", "priority": "high"}"#);
    let fixture = TestFixture::with_classifier(classifier_with(client));

    // agent asks for a suggestion first
    let suggestion = fixture
        .post(
            "/api/v1/tickets/classify",
            json!({ "description": "Login page returns 500 for every user since the deploy" }),
        )
        .await;
    assert_status!(suggestion, StatusCode::OK);
    let category = suggestion.body["suggested_category"].as_str().unwrap();
    let priority = suggestion.body["suggested_priority"].as_str().unwrap();

    // then files the ticket with the suggested values
    let created = fixture
        .post(
            "/api/v1/tickets",
            json!({
                "title": "Login broken",
                "description": "Login page returns 500 for every user since the deploy",
                "category": category,
                "priority": priority
            }),
        )
        .await;
    assert_status!(created, StatusCode::CREATED);
    assert_eq!(created.body["status"], "open");
    let id = created.body["id"].as_i64().unwrap();

    // work starts
    let in_progress = fixture
        .patch(
            &format!("/api/v1/tickets/{id}"),
            json!({ "status": "in_progress" }),
        )
        .await;
    assert_status!(in_progress, StatusCode::OK);
    assert_eq!(in_progress.body["created_at"], created.body["created_at"]);

    // and finishes
    let resolved = fixture
        .patch(
            &format!("/api/v1/tickets/{id}"),
            json!({ "status": "resolved" }),
        )
        .await;
    assert_status!(resolved, StatusCode::OK);

    let stats = fixture.get("/api/v1/tickets/stats").await;
    assert_eq!(stats.body["total_tickets"], 1);
    assert_eq!(stats.body["open_tickets"], 0);
    assert_eq!(stats.body["category_breakdown"]["technical"], 1);
}
