mod common;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use dispatch_core::DispatchError;
    use dispatch_domain::{DeliveryStatus, Point, SessionStatus};

    use crate::common::{order, Harness, HarnessOptions};

    async fn assigned_order(harness: &Harness, order_id: &str, rider_id: &str) {
        let engine = harness.engine.clone();
        let placed = order(order_id);
        let dispatch = tokio::spawn(async move { engine.dispatch(placed).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        harness.service.accept_order(order_id, rider_id).await.unwrap();
        dispatch.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_accept_rejects_blank_identifiers() {
        let harness = Harness::new(HarnessOptions::default());

        let blank_order = harness.service.accept_order("", "R1").await;
        assert!(matches!(blank_order, Err(DispatchError::InvalidArgument(_))));

        let blank_rider = harness.service.accept_order("order-300", "  ").await;
        assert!(matches!(blank_rider, Err(DispatchError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_accept_unknown_order() {
        let harness = Harness::new(HarnessOptions::default());
        let result = harness.service.accept_order("order-301", "R1").await;
        assert!(matches!(result, Err(DispatchError::SessionNotFound { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_accept_by_rider_outside_candidates() {
        let harness = Harness::new(HarnessOptions {
            offer_deadline_seconds: 30,
            ..Default::default()
        });
        let engine = harness.engine.clone();
        let dispatch = tokio::spawn(async move { engine.dispatch(order("order-302")).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let result = harness.service.accept_order("order-302", "R9").await;
        assert!(matches!(
            result,
            Err(DispatchError::RiderNotEligible { ref rider_id, .. }) if rider_id == "R9"
        ));
        assert_eq!(harness.service.live_sessions(), 1);

        dispatch.await.unwrap().unwrap();
        assert_eq!(harness.service.live_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_track_order_during_and_after_dispatch() {
        let harness = Harness::new(HarnessOptions {
            offer_deadline_seconds: 30,
            ..Default::default()
        });
        let engine = harness.engine.clone();
        let dispatch = tokio::spawn(async move { engine.dispatch(order("order-303")).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let tracking = harness.service.track_order("order-303").await.unwrap();
        assert_eq!(tracking.record.status, DeliveryStatus::Unaccepted);
        assert_eq!(tracking.dispatch, Some(SessionStatus::Open));

        harness.service.accept_order("order-303", "R1").await.unwrap();
        dispatch.await.unwrap().unwrap();

        let tracking = harness.service.track_order("order-303").await.unwrap();
        assert_eq!(tracking.record.status, DeliveryStatus::Accepted);
        assert_eq!(tracking.record.rider_id.as_deref(), Some("R1"));
        assert_eq!(tracking.dispatch, None);

        let missing = harness.service.track_order("order-404").await;
        assert!(matches!(missing, Err(DispatchError::DeliveryNotFound { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_reports_follow_delivery_lifecycle() {
        let harness = Harness::new(HarnessOptions::default());
        assigned_order(&harness, "order-304", "R2").await;

        let stranger = harness
            .service
            .report_status("order-304", "R1", DeliveryStatus::PickedUp)
            .await;
        assert!(matches!(stranger, Err(DispatchError::PermissionDenied(_))));

        let skipped = harness
            .service
            .report_status("order-304", "R2", DeliveryStatus::Accepted)
            .await;
        assert!(matches!(skipped, Err(DispatchError::InvalidArgument(_))));

        let picked_up = harness
            .service
            .report_status("order-304", "R2", DeliveryStatus::PickedUp)
            .await
            .unwrap();
        assert_eq!(picked_up.status, DeliveryStatus::PickedUp);
        assert!(picked_up.picked_up_at.is_some());

        let delivered = harness
            .service
            .report_status("order-304", "R2", DeliveryStatus::Delivered)
            .await
            .unwrap();
        assert_eq!(delivered.status, DeliveryStatus::Delivered);
        assert!(delivered.delivered_at.is_some());

        let backwards = harness
            .service
            .report_status("order-304", "R2", DeliveryStatus::PickedUp)
            .await;
        assert!(matches!(backwards, Err(DispatchError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_delivery_fee_tiers() {
        let harness = Harness::new(HarnessOptions::default());
        let mueang = Point::new(18.7883, 98.9853);

        assert_eq!(harness.service.delivery_fee(mueang, mueang).unwrap(), 0);
        assert_eq!(
            harness
                .service
                .delivery_fee(mueang, Point::new(18.8578, 99.0631))
                .unwrap(),
            100
        );
        assert!(harness
            .service
            .delivery_fee(mueang, Point::new(13.7563, 100.5018))
            .is_err());
    }
}
