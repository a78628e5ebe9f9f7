use std::sync::Arc;
use std::time::Duration;

use dispatch_api::create_app;
use dispatch_core::{ApiConfig, AppConfig};
use dispatch_dispatcher::{
    DeliveryService, DispatchCollaborators, DispatchEngine, DispatchReport, SessionRegistry,
};
use dispatch_domain::{Address, PlaceOrder};
use dispatch_infrastructure::{
    DispatchMetrics, DistrictGeocoder, InMemoryDeliveryStore, InMemoryMessageQueue,
    LoggingNotifier, StaticRosterSelector,
};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

struct TestServer {
    base_url: String,
    engine: Arc<DispatchEngine>,
    registry: Arc<SessionRegistry>,
    client: reqwest::Client,
}

impl TestServer {
    async fn start() -> Self {
        let config = AppConfig::default();
        let dispatch_config = dispatch_core::DispatchConfig {
            offer_deadline_seconds: 5,
            rider_roster: vec!["R1".to_string(), "R2".to_string(), "R3".to_string()],
            ..config.dispatch
        };

        let registry = Arc::new(SessionRegistry::new(dispatch_config.retired_retention()));
        let store = Arc::new(InMemoryDeliveryStore::new());
        let metrics = Arc::new(DispatchMetrics::new());
        let collaborators = DispatchCollaborators {
            selector: Arc::new(StaticRosterSelector::new(dispatch_config.rider_roster.clone())),
            resolver: Arc::new(DistrictGeocoder::new()),
            notifier: Arc::new(LoggingNotifier::new()),
            store: store.clone(),
            message_queue: Arc::new(InMemoryMessageQueue::new()),
        };
        let engine = Arc::new(DispatchEngine::new(
            registry.clone(),
            collaborators,
            metrics.clone(),
            &dispatch_config,
            &config.message_queue,
        ));
        let service = Arc::new(DeliveryService::new(registry.clone(), store, metrics));

        let app = create_app(service, &ApiConfig::default());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            engine,
            registry,
            client: reqwest::Client::new(),
        }
    }

    async fn dispatch(&self, order_id: &str) -> JoinHandle<DispatchReport> {
        let engine = self.engine.clone();
        let address = |district: &str| Address {
            district: district.to_string(),
            province: "Chiang Mai".to_string(),
            ..Default::default()
        };
        let order = PlaceOrder {
            order_id: order_id.to_string(),
            merchant_id: "merchant-1".to_string(),
            merchant_address: address("Mueang"),
            customer_address: address("Hang Dong"),
        };
        let handle = tokio::spawn(async move { engine.dispatch(order).await.unwrap() });

        while !self.registry.is_known(order_id) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        handle
    }

    async fn accept(&self, order_id: &str, rider_id: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/api/deliveries/{order_id}/accept", self.base_url))
            .json(&json!({ "rider_id": rider_id }))
            .send()
            .await
            .unwrap()
    }

    async fn report(&self, order_id: &str, rider_id: &str, status: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/api/deliveries/{order_id}/status", self.base_url))
            .json(&json!({ "rider_id": rider_id, "status": status }))
            .send()
            .await
            .unwrap()
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_health_reports_live_sessions() {
    let server = TestServer::start().await;
    let dispatch = server.dispatch("order-500").await;

    let response = server.get("/health").await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["live_sessions"], 1);

    assert_eq!(server.accept("order-500", "R1").await.status(), 200);
    dispatch.await.unwrap();
}

#[tokio::test]
async fn test_accept_flow_over_http() {
    let server = TestServer::start().await;
    let dispatch = server.dispatch("order-501").await;

    let response = server.accept("order-501", "R2").await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["pickup_code"].as_str().unwrap().len(), 3);

    let response = server.accept("order-501", "R1").await;
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["type"], "ALREADY_CLAIMED");
    assert_eq!(body["error"]["code"], 409);

    let report = dispatch.await.unwrap();
    assert_eq!(report.order_id, "order-501");

    let response = server.get("/api/deliveries/order-501").await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["record"]["rider_id"], "R2");
    assert_eq!(body["data"]["record"]["status"], "accepted");
    assert!(body["data"]["dispatch"].is_null());
}

#[tokio::test]
async fn test_claim_rejections_over_http() {
    let server = TestServer::start().await;

    let response = server.accept("order-missing", "R1").await;
    assert_eq!(response.status(), 404);

    let dispatch = server.dispatch("order-502").await;
    let response = server.accept("order-502", "R9").await;
    assert_eq!(response.status(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["type"], "RIDER_NOT_ELIGIBLE");

    let response = server.accept("order-502", " ").await;
    assert_eq!(response.status(), 400);

    let report = dispatch.await.unwrap();
    assert!(matches!(
        report.outcome,
        dispatch_dispatcher::DispatchOutcome::Expired { .. }
    ));
    let response = server.accept("order-502", "R1").await;
    assert_eq!(response.status(), 410);
}

#[tokio::test]
async fn test_missing_body_fields_are_invalid_arguments() {
    let server = TestServer::start().await;

    let response = server
        .client
        .post(format!("{}/api/deliveries/order-504/accept", server.base_url))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["type"], "INVALID_ARGUMENT");
    assert_eq!(body["error"]["code"], 400);

    let response = server
        .client
        .post(format!("{}/api/deliveries/order-504/status", server.base_url))
        .json(&json!({ "rider_id": "R1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["type"], "INVALID_ARGUMENT");
}

#[tokio::test]
async fn test_status_reports_over_http() {
    let server = TestServer::start().await;
    let dispatch = server.dispatch("order-503").await;
    assert_eq!(server.accept("order-503", "R3").await.status(), 200);
    dispatch.await.unwrap();

    assert_eq!(
        server.report("order-503", "R1", "picked_up").await.status(),
        403
    );
    assert_eq!(
        server.report("order-503", "R3", "teleported").await.status(),
        400
    );

    let response = server.report("order-503", "R3", "picked_up").await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["status"], "picked_up");

    let response = server.report("order-503", "R3", "delivered").await;
    assert_eq!(response.status(), 200);

    assert_eq!(server.get("/api/deliveries/unknown").await.status(), 404);
}

#[tokio::test]
async fn test_delivery_fee_quote() {
    let server = TestServer::start().await;

    let response = server
        .get("/api/delivery-fee?merchant_lat=18.7883&merchant_lng=98.9853&customer_lat=18.7883&customer_lng=98.9853")
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["fee"], 0);

    let response = server
        .get("/api/delivery-fee?merchant_lat=18.7883&merchant_lng=98.9853&customer_lat=13.7563&customer_lng=100.5018")
        .await;
    assert_eq!(response.status(), 400);

    let response = server
        .get("/api/delivery-fee?merchant_lat=95&merchant_lng=98.9853&customer_lat=18.7&customer_lng=98.9")
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["type"], "BAD_REQUEST");
}
