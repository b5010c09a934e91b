//! Integration tests for the billing webhook flow.
//!
//! These tests drive the public router end to end against the in-memory store:
//! 1. Signed events mutate the right organization
//! 2. Rejections map to the documented status codes
//! 3. Replays and ignored types leave state untouched

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;

use billing_sync::adapters::{webhook_router, HttpLimits, InMemoryOrganizationStore, WebhookAppState};
use billing_sync::domain::billing::{
    compute_signature, signature_entry, BillingInterval, Organization, PriceTierMap,
    SubscriptionRecord, SubscriptionTier, WebhookVerifier,
};
use billing_sync::domain::foundation::{OrganizationId, Timestamp};

const SECRET: &str = "whsec_integration_secret";

// =============================================================================
// Test Infrastructure
// =============================================================================

struct TestApp {
    router: Router,
    store: Arc<InMemoryOrganizationStore>,
}

impl TestApp {
    async fn new() -> Self {
        let store = Arc::new(InMemoryOrganizationStore::new());
        store
            .seed([
                organization("org_pro", Some("cus_1"), SubscriptionTier::Professional),
                organization("org_free", None, SubscriptionTier::Free),
            ])
            .await;

        let mut prices = PriceTierMap::default();
        prices.insert("price_starter_monthly", SubscriptionTier::Starter);
        prices.insert("price_pro_monthly", SubscriptionTier::Professional);
        prices.insert("price_business_yearly", SubscriptionTier::Business);

        let state = WebhookAppState::new(
            WebhookVerifier::new(SecretString::new(SECRET.to_string())),
            prices,
            store.clone(),
        );

        Self {
            router: webhook_router(state, HttpLimits::default()),
            store,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn post_signed(&self, body: &Value) -> (StatusCode, Value) {
        let payload = body.to_string();
        let header = signature_entry(SECRET.as_bytes(), now_secs(), payload.as_bytes());
        self.send(webhook_request(&header, payload)).await
    }

    async fn record(&self, id: &str) -> SubscriptionRecord {
        self.store
            .get(&OrganizationId::new(id).unwrap())
            .await
            .unwrap()
            .subscription
    }
}

fn organization(id: &str, customer_id: Option<&str>, tier: SubscriptionTier) -> Organization {
    Organization::new(OrganizationId::new(id).unwrap(), id).with_subscription(SubscriptionRecord {
        tier,
        status: tier.is_paid().then(|| "active".to_string()),
        billing_interval: tier.is_paid().then_some(BillingInterval::Monthly),
        external_customer_id: customer_id.map(str::to_string),
        external_subscription_id: customer_id.map(|_| "sub_existing".to_string()),
        trial_end: None,
    })
}

fn now_secs() -> i64 {
    Timestamp::now().as_unix_secs()
}

fn webhook_request(signature: &str, payload: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/webhooks/flowglad")
        .header("content-type", "application/json")
        .header("x-flowglad-signature", signature)
        .body(Body::from(payload))
        .unwrap()
}

// =============================================================================
// Lifecycle Scenarios
// =============================================================================

#[tokio::test]
async fn cancellation_downgrades_professional_org_to_free() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post_signed(&json!({
            "type": "subscription.canceled",
            "data": {"subscription": {"id": "sub_existing", "customerId": "cus_1", "status": "canceled"}}
        }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"received": true}));
    let record = app.record("org_pro").await;
    assert_eq!(record.tier, SubscriptionTier::Free);
    assert_eq!(record.status.as_deref(), Some("canceled"));
    assert_eq!(record.external_subscription_id.as_deref(), Some("sub_existing"));
}

#[tokio::test]
async fn customer_then_subscription_activates_new_org() {
    let app = TestApp::new().await;

    let (status, _) = app
        .post_signed(&json!({
            "type": "customer.created",
            "data": {"customer": {"id": "cus_new", "externalId": "org_free"}}
        }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.record("org_free").await.external_customer_id.as_deref(), Some("cus_new"));

    let (status, _) = app
        .post_signed(&json!({
            "type": "subscription.created",
            "data": {"subscription": {
                "id": "sub_new",
                "customerId": "cus_new",
                "priceId": "price_business_yearly",
                "interval": "year",
                "status": "trialing",
                "trialEnd": "2030-01-15T00:00:00Z"
            }}
        }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let record = app.record("org_free").await;
    assert_eq!(record.tier, SubscriptionTier::Business);
    assert_eq!(record.billing_interval, Some(BillingInterval::Yearly));
    assert_eq!(record.status.as_deref(), Some("trialing"));
    assert_eq!(record.external_subscription_id.as_deref(), Some("sub_new"));
    assert!(record.trial_end.is_some());
}

#[tokio::test]
async fn replayed_delivery_matches_single_delivery() {
    let app = TestApp::new().await;
    let payload = json!({
        "type": "subscription.updated",
        "data": {"subscription": {
            "customerId": "cus_1",
            "priceId": "price_starter_monthly",
            "interval": "month",
            "status": "active"
        }}
    })
    .to_string();
    let header = signature_entry(SECRET.as_bytes(), now_secs(), payload.as_bytes());

    let (first, _) = app.send(webhook_request(&header, payload.clone())).await;
    let once = app.record("org_pro").await;
    let (second, _) = app.send(webhook_request(&header, payload)).await;
    let twice = app.record("org_pro").await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(once.tier, SubscriptionTier::Starter);
    assert_eq!(once, twice);
}

#[tokio::test]
async fn invoice_and_unknown_events_are_acknowledged_without_mutation() {
    let app = TestApp::new().await;
    let before = app.record("org_pro").await;

    for body in [
        json!({"type": "invoice.paid", "data": {"invoice": {"id": "inv_1", "customerId": "cus_1"}}}),
        json!({"type": "invoice.payment_failed", "data": {"invoice": {"customerId": "cus_1"}}}),
        json!({"type": "subscription.paused", "data": {"subscription": {"customerId": "cus_1"}}}),
    ] {
        let (status, response) = app.post_signed(&body).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(response, json!({"received": true}));
    }

    assert_eq!(app.record("org_pro").await, before);
}

// =============================================================================
// Rejections
// =============================================================================

#[tokio::test]
async fn unknown_customer_without_hint_is_404_and_mutates_nothing() {
    let app = TestApp::new().await;
    let before_pro = app.record("org_pro").await;
    let before_free = app.record("org_free").await;

    let (status, body) = app
        .post_signed(&json!({
            "type": "subscription.canceled",
            "data": {"subscription": {"customerId": "cus_ghost", "status": "canceled"}}
        }))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["retryable"], true);
    assert_eq!(app.record("org_pro").await, before_pro);
    assert_eq!(app.record("org_free").await, before_free);
}

#[tokio::test]
async fn expired_signature_is_rejected_even_when_correct() {
    let app = TestApp::new().await;
    let payload = json!({
        "type": "subscription.canceled",
        "data": {"subscription": {"customerId": "cus_1", "status": "canceled"}}
    })
    .to_string();
    let header = signature_entry(SECRET.as_bytes(), now_secs() - 3_600, payload.as_bytes());

    let (status, body) = app.send(webhook_request(&header, payload)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "NO_VALID_SIGNATURE");
    assert_eq!(app.record("org_pro").await.tier, SubscriptionTier::Professional);
}

#[tokio::test]
async fn rotated_header_with_expired_first_entry_is_accepted() {
    let app = TestApp::new().await;
    let payload = json!({"type": "invoice.paid", "data": {}}).to_string();
    let ts = now_secs();
    let stale = format!(
        "v1,{},{}",
        ts - 3_600,
        compute_signature(SECRET.as_bytes(), ts - 3_600, payload.as_bytes())
    );
    let fresh = signature_entry(SECRET.as_bytes(), ts, payload.as_bytes());

    let (status, _) = app
        .send(webhook_request(&format!("{} {}", stale, fresh), payload))
        .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn body_altered_after_signing_is_rejected() {
    let app = TestApp::new().await;
    let signed_payload = json!({
        "type": "subscription.updated",
        "data": {"subscription": {"customerId": "cus_1", "priceId": "price_starter_monthly", "status": "active"}}
    })
    .to_string();
    let header = signature_entry(SECRET.as_bytes(), now_secs(), signed_payload.as_bytes());
    let altered = signed_payload.replace("price_starter_monthly", "price_business_yearly");

    let (status, _) = app.send(webhook_request(&header, altered)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.record("org_pro").await.tier, SubscriptionTier::Professional);
}

#[tokio::test]
async fn subscription_event_missing_status_is_400() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post_signed(&json!({
            "type": "subscription.created",
            "data": {"subscription": {"customerId": "cus_1", "priceId": "price_pro_monthly"}}
        }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "MISSING_FIELD");
    assert_eq!(body["error"]["retryable"], false);
}
