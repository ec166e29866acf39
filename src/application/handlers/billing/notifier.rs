//! BillingNotifier - Best-effort customer and staff mail for billing flows.
//!
//! Every method logs and swallows failures. A missing contact, a failed
//! document render or a mail outage never changes the outcome of the flow
//! that triggered the notification.

use std::sync::Arc;

use crate::domain::billing::{Invoice, Payment, Refund};
use crate::domain::foundation::{InvoiceId, UserId};
use crate::ports::{
    EventDirectory, EventSummary, InvoiceDocumentGenerator, InvoiceDocumentInput,
    InvoiceRepository, Notification, NotificationSender, UserContact,
};

const UNKNOWN_EVENT_TITLE: &str = "your event";

#[derive(Clone)]
pub struct BillingNotifier {
    directory: Arc<dyn EventDirectory>,
    invoices: Arc<dyn InvoiceRepository>,
    sender: Arc<dyn NotificationSender>,
    documents: Arc<dyn InvoiceDocumentGenerator>,
}

impl BillingNotifier {
    pub fn new(
        directory: Arc<dyn EventDirectory>,
        invoices: Arc<dyn InvoiceRepository>,
        sender: Arc<dyn NotificationSender>,
        documents: Arc<dyn InvoiceDocumentGenerator>,
    ) -> Self {
        Self {
            directory,
            invoices,
            sender,
            documents,
        }
    }

    /// Confirmation mail with the rendered invoice attached.
    pub async fn payment_confirmed(&self, payment: &Payment, invoice: &Invoice) {
        let Some(to) = self.contact(&payment.user_id).await else {
            return;
        };
        let event = self.event(invoice).await;

        let invoice_document = match self.documents.generate(InvoiceDocumentInput {
            invoice,
            event: &event,
            customer: Some(&to),
            payment: Some(payment),
        }) {
            Ok(document) => Some(document),
            Err(e) => {
                tracing::warn!(
                    invoice_number = %invoice.invoice_number,
                    error = %e,
                    "Invoice document generation failed"
                );
                None
            }
        };

        self.send(Notification::PaymentConfirmed {
            to,
            event_title: event.title,
            payment_reference: payment.reference.clone(),
            amount: payment.amount.clone(),
            invoice_number: invoice.invoice_number.clone(),
            invoice_document,
        })
        .await;
    }

    pub async fn payment_failed(&self, payment: &Payment) {
        let Some(to) = self.contact(&payment.user_id).await else {
            return;
        };
        let event_title = self.event_title_for(&payment.invoice_id).await;

        self.send(Notification::PaymentFailed {
            to,
            event_title,
            payment_reference: payment.reference.clone(),
            reason: payment.failure_reason().unwrap_or("Unknown error").to_string(),
        })
        .await;
    }

    /// How to complete a bank transfer or QR payment.
    pub async fn payment_instructions(&self, payment: &Payment, invoice: &Invoice) {
        let Some(to) = self.contact(&payment.user_id).await else {
            return;
        };
        let event = self.event(invoice).await;

        self.send(Notification::PaymentInstructions {
            to,
            event_title: event.title,
            payment_reference: payment.reference.clone(),
            amount: payment.amount.clone(),
            payment_method: payment.payment_method.clone(),
        })
        .await;
    }

    pub async fn refund_processed(&self, refund: &Refund, payment: &Payment) {
        let Some(to) = self.contact(&refund.user_id).await else {
            return;
        };
        let event_title = self.event_title_for(&payment.invoice_id).await;

        self.send(Notification::RefundProcessed {
            to,
            event_title,
            refund_reference: refund.reference.clone(),
            amount: refund.amount.clone(),
        })
        .await;
    }

    /// Staff mail for a refund that has to be paid out by hand.
    pub async fn refund_requested(&self, refund: &Refund, payment: &Payment) {
        let Some(requested_by) = self.contact(&refund.user_id).await else {
            return;
        };
        let event_title = self.event_title_for(&payment.invoice_id).await;

        self.send(Notification::RefundRequested {
            requested_by,
            event_title,
            refund_reference: refund.reference.clone(),
            payment_reference: payment.reference.clone(),
            amount: refund.amount.clone(),
            reason: refund.reason.clone(),
        })
        .await;
    }

    async fn send(&self, notification: Notification) {
        let kind = notification.kind();
        if let Err(e) = self.sender.send(notification).await {
            tracing::warn!(notification = kind, error = %e, "Billing notification failed");
        }
    }

    async fn contact(&self, user_id: &UserId) -> Option<UserContact> {
        match self.directory.find_user_contact(user_id).await {
            Ok(Some(contact)) => Some(contact),
            Ok(None) => {
                tracing::debug!(user_id = %user_id, "No contact on file, skipping notification");
                None
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Contact lookup failed");
                None
            }
        }
    }

    async fn event(&self, invoice: &Invoice) -> EventSummary {
        let found = self
            .directory
            .find_event(&invoice.event_id)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(event_id = %invoice.event_id, error = %e, "Event lookup failed");
                None
            });

        found.unwrap_or_else(|| EventSummary {
            id: invoice.event_id,
            title: UNKNOWN_EVENT_TITLE.to_string(),
        })
    }

    async fn event_title_for(&self, invoice_id: &InvoiceId) -> String {
        match self.invoices.find_by_id(invoice_id).await {
            Ok(Some(invoice)) => self.event(&invoice).await.title,
            Ok(None) => UNKNOWN_EVENT_TITLE.to_string(),
            Err(e) => {
                tracing::warn!(invoice_id = %invoice_id, error = %e, "Invoice lookup failed");
                UNKNOWN_EVENT_TITLE.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::document::MarkdownInvoiceGenerator;
    use crate::adapters::memory::{
        InMemoryEventDirectory, InMemoryInvoiceRepository, RecordingNotificationSender,
    };
    use crate::domain::billing::test_support::{card_method, issued_invoice};
    use crate::domain::foundation::Timestamp;

    struct Setup {
        notifier: BillingNotifier,
        directory: Arc<InMemoryEventDirectory>,
        invoices: Arc<InMemoryInvoiceRepository>,
        sender: Arc<RecordingNotificationSender>,
    }

    fn setup(sender: RecordingNotificationSender) -> Setup {
        let directory = Arc::new(InMemoryEventDirectory::new());
        let invoices = Arc::new(InMemoryInvoiceRepository::new());
        let sender = Arc::new(sender);
        let notifier = BillingNotifier::new(
            directory.clone(),
            invoices.clone(),
            sender.clone(),
            Arc::new(MarkdownInvoiceGenerator::new()),
        );
        Setup {
            notifier,
            directory,
            invoices,
            sender,
        }
    }

    fn contact() -> UserContact {
        UserContact {
            user_id: UserId::new("user-1").unwrap(),
            email: "asha@example.com".into(),
            name: "Asha".into(),
        }
    }

    #[tokio::test]
    async fn confirmation_attaches_invoice_document() {
        let s = setup(RecordingNotificationSender::new());
        s.directory.add_contact(contact()).await;
        let event_id = s.directory.add_event("RustConf").await;

        let mut invoice = issued_invoice(100_000);
        invoice.event_id = event_id;
        let mut payment = Payment::initiate(&invoice, &card_method(), Timestamp::now());
        payment.complete(Timestamp::now()).unwrap();
        invoice.record_payment(&payment).unwrap();

        s.notifier.payment_confirmed(&payment, &invoice).await;

        match s.sender.sent().as_slice() {
            [Notification::PaymentConfirmed {
                event_title,
                invoice_document,
                ..
            }] => {
                assert_eq!(event_title, "RustConf");
                assert!(invoice_document
                    .as_deref()
                    .unwrap()
                    .contains(invoice.invoice_number.as_str()));
            }
            other => panic!("Expected one confirmation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn skips_users_without_contact() {
        let s = setup(RecordingNotificationSender::new());
        let invoice = issued_invoice(100_000);
        let payment = Payment::initiate(&invoice, &card_method(), Timestamp::now());

        s.notifier.payment_instructions(&payment, &invoice).await;

        assert!(s.sender.sent().is_empty());
    }

    #[tokio::test]
    async fn failure_mail_falls_back_to_generic_event_title() {
        let s = setup(RecordingNotificationSender::new());
        s.directory.add_contact(contact()).await;
        let invoice = issued_invoice(100_000);
        s.invoices.save(&invoice).await.unwrap();
        let mut payment = Payment::initiate(&invoice, &card_method(), Timestamp::now());
        payment.fail("Card declined").unwrap();

        s.notifier.payment_failed(&payment).await;

        match s.sender.sent().as_slice() {
            [Notification::PaymentFailed {
                event_title,
                reason,
                ..
            }] => {
                assert_eq!(event_title, "your event");
                assert_eq!(reason, "Card declined");
            }
            other => panic!("Expected one failure mail, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn sender_errors_are_swallowed() {
        let s = setup(RecordingNotificationSender::failing());
        s.directory.add_contact(contact()).await;
        let invoice = issued_invoice(100_000);
        let payment = Payment::initiate(&invoice, &card_method(), Timestamp::now());

        s.notifier.payment_instructions(&payment, &invoice).await;

        assert!(s.sender.sent().is_empty());
    }
}
