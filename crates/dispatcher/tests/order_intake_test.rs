mod common;

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use dispatch_dispatcher::OrderIntake;
    use dispatch_domain::{Message, MessageQueue, MessageType, RiderAssignedMessage};

    use crate::common::{order, order_between, Harness, HarnessOptions};

    fn intake(harness: &Harness) -> Arc<OrderIntake> {
        Arc::new(OrderIntake::new(
            harness.engine.clone(),
            harness.queue.clone(),
            harness.metrics.clone(),
            &harness.dispatch_config,
            &harness.queue_config,
        ))
    }

    async fn settle(intake: &OrderIntake) {
        while intake.in_flight() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_intake_initial_state() {
        let harness = Harness::new(HarnessOptions::default());
        let intake = intake(&harness);

        assert!(!intake.is_running().await);
        assert_eq!(intake.in_flight(), 0);
        intake.stop().await.unwrap();
        assert!(!intake.is_running().await);
    }

    #[tokio::test]
    async fn test_refresh_backlog_counts_waiting_orders() {
        let harness = Harness::new(HarnessOptions::default());
        let intake = intake(&harness);
        assert_eq!(intake.refresh_backlog().await.unwrap(), 0);

        for id in ["order-205", "order-206"] {
            harness
                .queue
                .publish_message(
                    &harness.queue_config.order_placed_queue,
                    &Message::order_placed(order(id)).unwrap(),
                )
                .await
                .unwrap();
        }
        assert_eq!(intake.refresh_backlog().await.unwrap(), 2);

        harness.drain(&harness.queue_config.order_placed_queue).await;
        assert_eq!(intake.refresh_backlog().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_retryable_failure_is_requeued() {
        let harness = Harness::new(HarnessOptions::default());
        let intake = intake(&harness);

        let message =
            Message::order_placed(order_between("order-200", "Atlantis", "Mueang")).unwrap();
        intake.handle_message(message).await;
        settle(&intake).await;

        let requeued = harness.drain(&harness.queue_config.order_placed_queue).await;
        assert_eq!(requeued.len(), 1);
        assert_eq!(requeued[0].retry_count, 1);
        assert_eq!(requeued[0].order_id(), "order-200");
        assert!(harness
            .drain(&harness.queue_config.dispatch_failed_queue)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_retries_publish_failure_event() {
        let harness = Harness::new(HarnessOptions::default());
        let intake = intake(&harness);

        let mut message =
            Message::order_placed(order_between("order-201", "Atlantis", "Mueang")).unwrap();
        for _ in 0..harness.queue_config.max_retries {
            message.increment_retry();
        }
        intake.handle_message(message).await;
        settle(&intake).await;

        assert!(harness
            .drain(&harness.queue_config.order_placed_queue)
            .await
            .is_empty());
        let failed = harness
            .drain(&harness.queue_config.dispatch_failed_queue)
            .await;
        assert_eq!(failed.len(), 1);
        match &failed[0].message_type {
            MessageType::DispatchFailed(event) => {
                assert_eq!(event.order_id, "order-201");
                assert_eq!(event.retry_count, harness.queue_config.max_retries);
                assert!(!event.error_message.is_empty());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unrelated_messages_are_ignored() {
        let harness = Harness::new(HarnessOptions::default());
        let intake = intake(&harness);

        let message = Message::rider_assigned(RiderAssignedMessage {
            order_id: "order-202".to_string(),
            rider_id: "R1".to_string(),
            accepted_at: Utc::now(),
        })
        .unwrap();
        intake.handle_message(message).await;

        assert_eq!(intake.in_flight(), 0);
        assert!(!harness.registry.is_known("order-202"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_listener_dispatches_queued_orders() {
        let harness = Harness::new(HarnessOptions {
            offer_deadline_seconds: 120,
            ..Default::default()
        });
        let intake = intake(&harness);

        harness
            .queue
            .publish_message(
                &harness.queue_config.order_placed_queue,
                &Message::order_placed(order("order-203")).unwrap(),
            )
            .await
            .unwrap();

        let listener = intake.clone();
        let handle = tokio::spawn(async move { listener.listen_for_orders().await });
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(intake.is_running().await);
        assert_eq!(intake.in_flight(), 1);
        harness
            .service
            .accept_order("order-203", "R2")
            .await
            .unwrap();
        settle(&intake).await;

        let assigned = harness
            .drain(&harness.queue_config.rider_assigned_queue)
            .await;
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].order_id(), "order-203");

        intake.stop().await.unwrap();
        handle.await.unwrap().unwrap();
        assert!(!intake.is_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_redelivered_event_is_dropped() {
        let harness = Harness::new(HarnessOptions {
            offer_deadline_seconds: 60,
            ..Default::default()
        });
        let intake = intake(&harness);
        let event = Message::order_placed(order("order-204")).unwrap();

        intake.handle_message(event.clone()).await;
        settle(&intake).await;
        intake.handle_message(event).await;
        settle(&intake).await;

        assert_eq!(harness.notifier.pushed_riders("order-204").await.len(), 3);
        assert!(harness
            .drain(&harness.queue_config.order_placed_queue)
            .await
            .is_empty());
        assert!(harness
            .drain(&harness.queue_config.dispatch_failed_queue)
            .await
            .is_empty());
        assert_eq!(
            harness
                .drain(&harness.queue_config.dispatch_expired_queue)
                .await
                .len(),
            1
        );
    }
}
