//! Manual payment channels (bank transfer, UPI QR).
//!
//! No remote call is made. Checkout tells the user how to pay, staff confirm
//! receipt by hand, and refunds are queued for staff to move the money.

use async_trait::async_trait;

use crate::domain::billing::MANUAL_GATEWAY;
use crate::ports::{
    CreatePaymentRequest, CreateRefundRequest, GatewayEvent, PaymentError, PaymentGateway,
    PaymentHandle, RefundReceipt,
};

/// Registry key of the manual gateway.
pub const MANUAL_PROVIDER: &str = MANUAL_GATEWAY;

const INSTRUCTIONS: &str = "Payment instructions sent to your email.";

#[derive(Debug, Clone, Default)]
pub struct ManualGateway;

impl ManualGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PaymentGateway for ManualGateway {
    fn provider(&self) -> &str {
        MANUAL_PROVIDER
    }

    fn signature_header(&self) -> &'static str {
        "X-Manual-Signature"
    }

    async fn create_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<PaymentHandle, PaymentError> {
        tracing::info!(
            payment_id = %request.payment_reference,
            amount = %request.amount,
            "Manual payment awaiting transfer"
        );
        Ok(PaymentHandle::Instructions {
            message: INSTRUCTIONS.to_string(),
        })
    }

    async fn create_refund(
        &self,
        request: CreateRefundRequest,
    ) -> Result<RefundReceipt, PaymentError> {
        tracing::info!(
            refund_id = %request.refund_reference,
            amount = %request.amount,
            "Manual refund queued for staff"
        );
        Ok(RefundReceipt::manual())
    }

    async fn verify_webhook(
        &self,
        _payload: &[u8],
        _signature: &str,
    ) -> Result<GatewayEvent, PaymentError> {
        Err(PaymentError::invalid_webhook(
            "Manual payments do not send webhooks",
        ))
    }
}
