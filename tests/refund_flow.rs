//! User refund requests and their settlement by gateway notices.

mod common;

use common::TestApp;
use event_payments::adapters::mock::{payment_succeeded_event, refund_issued_event};
use event_payments::application::{
    ConfirmManualPaymentCommand, ManualConfirmation, RequestRefundCommand, RequestRefundResult,
};
use event_payments::domain::billing::{BillingError, PaymentStatus, RefundStatus};
use event_payments::domain::foundation::{PaymentReference, UserId};
use event_payments::ports::{RefundReceipt, RefundRepository, WebhookResult};
use rust_decimal::Decimal;

async fn settled(app: &TestApp) -> (PaymentReference, String) {
    let checkout = app.checkout("stripe", 100_000).await;
    let txn = checkout.handle.transaction_id().unwrap().to_string();
    app.deliver(&payment_succeeded_event("evt_paid", &txn))
        .await
        .unwrap();
    (checkout.payment.reference, txn)
}

async fn refund(
    app: &TestApp,
    user: &UserId,
    reference: &PaymentReference,
    amount: Option<&str>,
) -> Result<RequestRefundResult, BillingError> {
    app.state
        .refund_handler()
        .handle(RequestRefundCommand {
            user_id: user.clone(),
            payment_reference: reference.clone(),
            amount: amount.map(|a| a.parse::<Decimal>().unwrap()),
            reason: "Cannot attend".into(),
        })
        .await
}

#[tokio::test]
async fn refund_over_payment_is_rejected() {
    let app = TestApp::new().await;
    let (reference, _) = settled(&app).await;

    let err = refund(&app, &app.user_id, &reference, Some("1180.01"))
        .await
        .unwrap_err();

    assert!(
        matches!(err, BillingError::RefundExceedsPayment { .. }),
        "got {:?}",
        err
    );
    assert!(!app.stripe.was_called("create_refund"));
    assert_eq!(app.payment(&reference).await.status, PaymentStatus::Completed);
}

#[tokio::test]
async fn partial_refunds_are_capped_cumulatively() {
    let app = TestApp::new().await;
    let (reference, _) = settled(&app).await;

    refund(&app, &app.user_id, &reference, Some("500.00"))
        .await
        .unwrap();
    refund(&app, &app.user_id, &reference, Some("680.00"))
        .await
        .unwrap();
    let err = refund(&app, &app.user_id, &reference, Some("0.01"))
        .await
        .unwrap_err();

    assert!(matches!(err, BillingError::RefundExceedsPayment { .. }));
    assert_eq!(app.stripe.call_count("create_refund"), 2);
}

#[tokio::test]
async fn other_users_cannot_refund() {
    let app = TestApp::new().await;
    let (reference, _) = settled(&app).await;
    let intruder = UserId::new("user-2").unwrap();

    let err = refund(&app, &intruder, &reference, None).await.unwrap_err();

    assert!(matches!(err, BillingError::PaymentNotFound(_)), "got {:?}", err);
    assert!(app.refunds.is_empty().await);
}

#[tokio::test]
async fn pending_payment_cannot_be_refunded() {
    let app = TestApp::new().await;
    let checkout = app.checkout("stripe", 100_000).await;

    let err = refund(&app, &app.user_id, &checkout.payment.reference, None)
        .await
        .unwrap_err();

    assert!(matches!(err, BillingError::InvalidState { .. }), "got {:?}", err);
}

#[tokio::test]
async fn gateway_notice_completes_requested_refund() {
    let app = TestApp::new().await;
    let (reference, txn) = settled(&app).await;
    app.stripe.push_refund_receipt(RefundReceipt::accepted("re_42"));

    let requested = refund(&app, &app.user_id, &reference, None).await.unwrap();
    assert_eq!(requested.refund.status, RefundStatus::Processing);
    assert!(!requested.requires_manual_processing);

    let result = app
        .deliver(&refund_issued_event("evt_r", &txn, Some("re_42"), 118_000))
        .await
        .unwrap();
    assert_eq!(result, WebhookResult::Processed);

    let payment = app.payment(&reference).await;
    let refunds = app.refunds.find_by_payment(&payment.id).await.unwrap();
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].id, requested.refund.id);
    assert_eq!(refunds[0].status, RefundStatus::Completed);
    assert!(refunds[0].refund_date.is_some());
    assert_eq!(payment.status, PaymentStatus::Refunded);
    assert!(app.sender.kinds().contains(&"refund_processed"));
}

#[tokio::test]
async fn gateway_notices_are_not_capped() {
    let app = TestApp::new().await;
    let (reference, txn) = settled(&app).await;

    let result = app
        .deliver(&refund_issued_event("evt_big", &txn, Some("re_big"), 500_000))
        .await
        .unwrap();
    assert_eq!(result, WebhookResult::Processed);

    let payment = app.payment(&reference).await;
    let refunds = app.refunds.find_by_payment(&payment.id).await.unwrap();
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].amount.minor_units(), 500_000);
}

#[tokio::test]
async fn manual_payment_refund_needs_staff_action() {
    let app = TestApp::new().await;
    let checkout = app.checkout("bank_transfer", 100_000).await;
    app.state
        .confirm_handler()
        .handle(ConfirmManualPaymentCommand {
            payment_reference: checkout.payment.reference.clone(),
            confirmation: ManualConfirmation::Received,
            is_staff: true,
        })
        .await
        .unwrap();

    let requested = refund(&app, &app.user_id, &checkout.payment.reference, None)
        .await
        .unwrap();

    assert!(requested.requires_manual_processing);
    assert!(app.sender.kinds().contains(&"refund_requested"));
}
