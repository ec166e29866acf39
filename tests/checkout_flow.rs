//! Checkout through settlement, driven through the public handler API.

mod common;

use common::TestApp;
use event_payments::adapters::mock::{payment_failed_event, payment_succeeded_event};
use event_payments::domain::billing::{
    BillingError, Invoice, InvoiceStatus, PaymentStatus, TAX_RATE_BPS,
};
use event_payments::domain::foundation::{EventId, Timestamp, UserId};
use event_payments::ports::{PaymentError, PaymentHandle, WebhookResult};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn non_positive_amounts_never_create_rows(minor in -1_000_000i64..=0) {
        let rt = runtime();
        rt.block_on(async {
            let app = TestApp::new().await;

            let err = app.try_checkout("stripe", minor).await.unwrap_err();

            assert!(matches!(err, BillingError::InvalidAmount(_)), "got {:?}", err);
            assert!(app.invoices.is_empty().await);
            assert!(app.payments.is_empty().await);
            assert!(!app.stripe.was_called("create_payment"));
        });
    }

    #[test]
    fn invoice_total_is_subtotal_plus_tax(minor in 1i64..=100_000_000) {
        let invoice = Invoice::issue(
            EventId::new(),
            UserId::new("user-1").unwrap(),
            TestApp::inr(minor),
            Timestamp::now(),
        )
        .unwrap();

        prop_assert_eq!(
            invoice.total_amount.minor_units(),
            invoice.subtotal.minor_units() + invoice.tax_amount.minor_units()
        );
        prop_assert_eq!(invoice.tax_amount, invoice.subtotal.percentage(TAX_RATE_BPS));
        prop_assert!(invoice.paid_amount.is_zero());
    }
}

#[tokio::test]
async fn card_checkout_settles_through_webhook() {
    let app = TestApp::new().await;

    let checkout = app.checkout("stripe", 100_000).await;
    assert_eq!(checkout.invoice.total_amount.to_major(), Decimal::new(118_000, 2));
    assert_eq!(checkout.invoice.status, InvoiceStatus::Sent);
    assert_eq!(checkout.payment.status, PaymentStatus::Pending);

    let txn = checkout.handle.transaction_id().unwrap().to_string();
    let result = app
        .deliver(&payment_succeeded_event("evt_paid", &txn))
        .await
        .unwrap();
    assert_eq!(result, WebhookResult::Processed);

    let payment = app.payment(&checkout.payment.reference).await;
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert!(payment.payment_date.is_some());

    let invoice = app.invoice(&checkout.invoice.id).await;
    assert_eq!(invoice.status, InvoiceStatus::Paid);
    assert_eq!(invoice.paid_amount.to_major(), Decimal::new(118_000, 2));
    assert_eq!(invoice.paid_amount.to_string(), "1180.00 INR");

    assert!(app.sender.kinds().contains(&"payment_confirmed"));
}

#[tokio::test]
async fn declined_card_fails_payment_and_keeps_invoice_open() {
    let app = TestApp::new().await;
    app.stripe
        .set_method_error("create_payment", PaymentError::card_declined("Card declined"));

    let err = app.try_checkout("stripe", 100_000).await.unwrap_err();
    let BillingError::GatewayFailed {
        reason,
        payment_id: Some(reference),
    } = err
    else {
        panic!("Expected GatewayFailed with a payment reference");
    };
    assert_eq!(reason, "Card declined");

    let payment = app.payment(&reference).await;
    assert_eq!(payment.status, PaymentStatus::Failed);

    let invoice = app.invoice(&payment.invoice_id).await;
    assert_eq!(invoice.status, InvoiceStatus::Sent);
    assert!(invoice.paid_amount.is_zero());
}

#[tokio::test]
async fn failed_webhook_marks_payment_failed() {
    let app = TestApp::new().await;
    let checkout = app.checkout("stripe", 50_000).await;
    let txn = checkout.handle.transaction_id().unwrap().to_string();

    let result = app
        .deliver(&payment_failed_event("evt_fail", &txn, "insufficient_funds"))
        .await
        .unwrap();
    assert_eq!(result, WebhookResult::Processed);

    let payment = app.payment(&checkout.payment.reference).await;
    assert_eq!(payment.status, PaymentStatus::Failed);
    assert_eq!(
        app.invoice(&checkout.invoice.id).await.status,
        InvoiceStatus::Sent
    );
    assert!(app.sender.kinds().contains(&"payment_failed"));
}

#[tokio::test]
async fn manual_checkout_returns_instructions_without_remote_call() {
    let app = TestApp::new().await;

    let checkout = app.checkout("bank_transfer", 100_000).await;

    match &checkout.handle {
        PaymentHandle::Instructions { message } => {
            assert_eq!(message, "Payment instructions sent to your email.")
        }
        other => panic!("Expected instructions, got {:?}", other),
    }
    assert_eq!(checkout.payment.status, PaymentStatus::Pending);
    assert!(checkout.payment.transaction_id.is_none());
    assert!(app.sender.kinds().contains(&"payment_instructions"));
}

#[tokio::test]
async fn unknown_method_is_rejected_before_any_write() {
    let app = TestApp::new().await;

    let err = app.try_checkout("cheque", 100_000).await.unwrap_err();

    assert!(matches!(err, BillingError::UnknownPaymentMethod(_)), "got {:?}", err);
    assert!(app.invoices.is_empty().await);
}
