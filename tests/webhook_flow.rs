//! Webhook idempotency and refund notices.

mod common;

use common::TestApp;
use event_payments::adapters::mock::{payment_succeeded_event, refund_issued_event};
use event_payments::application::HandleGatewayWebhookCommand;
use event_payments::domain::billing::{InvoiceStatus, PaymentStatus, RefundStatus, WebhookError};
use event_payments::domain::foundation::PaymentReference;
use event_payments::ports::{PaymentRepository, RefundRepository, WebhookResult};

/// A checkout settled by a `payment_succeeded` webhook; returns its
/// reference and gateway transaction id.
async fn settled(app: &TestApp) -> (PaymentReference, String) {
    let checkout = app.checkout("stripe", 100_000).await;
    let txn = checkout.handle.transaction_id().unwrap().to_string();
    app.deliver(&payment_succeeded_event("evt_paid", &txn))
        .await
        .unwrap();
    (checkout.payment.reference, txn)
}

#[tokio::test]
async fn unknown_transaction_is_acknowledged_without_changes() {
    let app = TestApp::new().await;
    let checkout = app.checkout("stripe", 100_000).await;

    let result = app
        .deliver(&payment_succeeded_event("evt_stray", "pi_nobody"))
        .await
        .unwrap();

    assert_eq!(result, WebhookResult::Ignored);
    assert_eq!(
        app.payment(&checkout.payment.reference).await.status,
        PaymentStatus::Pending
    );
    assert_eq!(
        app.invoice(&checkout.invoice.id).await.status,
        InvoiceStatus::Sent
    );
    assert_eq!(app.webhooks.len().await, 1);
}

#[tokio::test]
async fn redelivered_success_does_not_double_count() {
    let app = TestApp::new().await;
    let checkout = app.checkout("stripe", 100_000).await;
    let txn = checkout.handle.transaction_id().unwrap().to_string();
    let event = payment_succeeded_event("evt_1", &txn);

    assert_eq!(app.deliver(&event).await.unwrap(), WebhookResult::Processed);
    let after_first = app.invoice(&checkout.invoice.id).await;

    assert_eq!(
        app.deliver(&event).await.unwrap(),
        WebhookResult::AlreadyProcessed
    );
    let after_second = app.invoice(&checkout.invoice.id).await;

    assert_eq!(after_second.paid_amount, after_first.paid_amount);
    assert_eq!(after_second.paid_amount.minor_units(), 118_000);
    assert_eq!(after_second.version, after_first.version);
    assert_eq!(app.webhooks.len().await, 1);
}

#[tokio::test]
async fn refund_notice_is_applied_once_per_event() {
    let app = TestApp::new().await;
    let (reference, txn) = settled(&app).await;
    let payment_id = app.payment(&reference).await.id;
    let notice = refund_issued_event("evt_r1", &txn, Some("re_1"), 20_000);

    assert_eq!(app.deliver(&notice).await.unwrap(), WebhookResult::Processed);
    assert_eq!(
        app.deliver(&notice).await.unwrap(),
        WebhookResult::AlreadyProcessed
    );

    let refunds = app.refunds.find_by_payment(&payment_id).await.unwrap();
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].status, RefundStatus::Completed);
    assert_eq!(refunds[0].amount.minor_units(), 20_000);
    assert_eq!(app.payment(&reference).await.status, PaymentStatus::Refunded);
}

#[tokio::test]
async fn distinct_refund_notices_create_distinct_refunds() {
    let app = TestApp::new().await;
    let (reference, txn) = settled(&app).await;
    let payment_id = app.payment(&reference).await.id;

    app.deliver(&refund_issued_event("evt_r1", &txn, Some("re_1"), 20_000))
        .await
        .unwrap();
    app.deliver(&refund_issued_event("evt_r2", &txn, Some("re_2"), 30_000))
        .await
        .unwrap();

    let refunds = app.refunds.find_by_payment(&payment_id).await.unwrap();
    assert_eq!(refunds.len(), 2);
    let total: i64 = refunds.iter().map(|r| r.amount.minor_units()).sum();
    assert_eq!(total, 50_000);
}

#[tokio::test]
async fn same_provider_refund_under_new_event_is_ignored() {
    let app = TestApp::new().await;
    let (reference, txn) = settled(&app).await;
    let payment_id = app.payment(&reference).await.id;

    app.deliver(&refund_issued_event("evt_r1", &txn, Some("re_1"), 20_000))
        .await
        .unwrap();
    let result = app
        .deliver(&refund_issued_event("evt_r1_retry", &txn, Some("re_1"), 20_000))
        .await
        .unwrap();

    assert_eq!(result, WebhookResult::Ignored);
    assert_eq!(app.refunds.find_by_payment(&payment_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn missing_signature_is_rejected_before_any_read() {
    let app = TestApp::new().await;
    let checkout = app.checkout("stripe", 100_000).await;
    let txn = checkout.handle.transaction_id().unwrap().to_string();

    let err = app
        .state
        .webhook_handler()
        .handle(HandleGatewayWebhookCommand {
            provider: "stripe".into(),
            payload: serde_json::to_vec(&payment_succeeded_event("evt_1", &txn)).unwrap(),
            signature: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, WebhookError::InvalidSignature));
    assert!(app.webhooks.is_empty().await);
    let payment = app
        .payments
        .find_by_reference(&checkout.payment.reference)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
}

#[tokio::test]
async fn unknown_provider_is_not_found() {
    let app = TestApp::new().await;

    let err = app
        .state
        .webhook_handler()
        .handle(HandleGatewayWebhookCommand {
            provider: "paypal".into(),
            payload: b"{}".to_vec(),
            signature: Some("sig".into()),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, WebhookError::UnknownProvider(ref p) if p == "paypal"));
}
