#![allow(dead_code)]

use std::sync::Arc;

use dispatch_core::{AppConfig, DispatchConfig, MessageQueueConfig};
use dispatch_dispatcher::{DeliveryService, DispatchCollaborators, DispatchEngine, SessionRegistry};
use dispatch_domain::{Address, DeliveryRecordStore, Message, MessageQueue, PlaceOrder};
use dispatch_infrastructure::{
    DispatchMetrics, DistrictGeocoder, InMemoryDeliveryStore, InMemoryMessageQueue,
    LoggingNotifier, StaticRosterSelector,
};

pub struct HarnessOptions {
    pub roster: Vec<String>,
    pub notify_interval_ms: u64,
    pub offer_deadline_seconds: u64,
    pub store: Option<Arc<dyn DeliveryRecordStore>>,
    pub notifier: Option<Arc<LoggingNotifier>>,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            roster: vec!["R1".to_string(), "R2".to_string(), "R3".to_string()],
            notify_interval_ms: 0,
            offer_deadline_seconds: 15 * 60,
            store: None,
            notifier: None,
        }
    }
}

pub struct Harness {
    pub registry: Arc<SessionRegistry>,
    pub engine: Arc<DispatchEngine>,
    pub service: Arc<DeliveryService>,
    pub notifier: Arc<LoggingNotifier>,
    pub store: Arc<dyn DeliveryRecordStore>,
    pub queue: Arc<InMemoryMessageQueue>,
    pub metrics: Arc<DispatchMetrics>,
    pub dispatch_config: DispatchConfig,
    pub queue_config: MessageQueueConfig,
}

impl Harness {
    pub fn new(options: HarnessOptions) -> Self {
        let app_config = AppConfig::default();
        let dispatch_config = DispatchConfig {
            offer_deadline_seconds: options.offer_deadline_seconds,
            notify_interval_ms: options.notify_interval_ms,
            rider_roster: options.roster.clone(),
            ..app_config.dispatch
        };
        let queue_config = app_config.message_queue;

        let registry = Arc::new(SessionRegistry::new(dispatch_config.retired_retention()));
        let notifier = options
            .notifier
            .unwrap_or_else(|| Arc::new(LoggingNotifier::new()));
        let store = options
            .store
            .unwrap_or_else(|| Arc::new(InMemoryDeliveryStore::new()));
        let queue = Arc::new(InMemoryMessageQueue::new());
        let metrics = Arc::new(DispatchMetrics::new());

        let collaborators = DispatchCollaborators {
            selector: Arc::new(StaticRosterSelector::new(options.roster)),
            resolver: Arc::new(DistrictGeocoder::new()),
            notifier: notifier.clone(),
            store: store.clone(),
            message_queue: queue.clone(),
        };
        let engine = Arc::new(DispatchEngine::new(
            registry.clone(),
            collaborators,
            metrics.clone(),
            &dispatch_config,
            &queue_config,
        ));
        let service = Arc::new(DeliveryService::new(
            registry.clone(),
            store.clone(),
            metrics.clone(),
        ));

        Self {
            registry,
            engine,
            service,
            notifier,
            store,
            queue,
            metrics,
            dispatch_config,
            queue_config,
        }
    }

    pub async fn drain(&self, queue: &str) -> Vec<Message> {
        self.queue.consume_messages(queue).await.unwrap()
    }
}

pub fn address(district: &str) -> Address {
    Address {
        address_name: "99/1 Nimman Rd".to_string(),
        district: district.to_string(),
        province: "Chiang Mai".to_string(),
        ..Default::default()
    }
}

pub fn order(order_id: &str) -> PlaceOrder {
    order_between(order_id, "Mueang", "San Sai")
}

pub fn order_between(order_id: &str, merchant: &str, customer: &str) -> PlaceOrder {
    PlaceOrder {
        order_id: order_id.to_string(),
        merchant_id: "merchant-1".to_string(),
        merchant_address: address(merchant),
        customer_address: address(customer),
    }
}
