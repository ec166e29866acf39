//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the billing domain and the outside world. Adapters implement these ports.
//!
//! ## Gateway Ports
//!
//! - `PaymentGateway` - Remote payment intents/orders, refunds, webhook verification
//! - `GatewayRegistry` - Gateways keyed by provider name
//!
//! ## Repository Ports
//!
//! - `InvoiceRepository`, `PaymentRepository`, `RefundRepository`
//! - `PaymentMethodCatalog` - Active payment channels and fee schedules
//! - `WebhookEventRepository` - Processed webhook deduplication
//!
//! ## Collaborator Ports
//!
//! - `EventDirectory` - Events and user contacts owned by other modules
//! - `NotificationSender` - Billing mail
//! - `InvoiceDocumentGenerator` - Rendered invoices

mod document_generator;
mod event_directory;
mod invoice_repository;
mod notification_sender;
mod payment_gateway;
mod payment_method_catalog;
mod payment_repository;
mod refund_repository;
mod webhook_event_repository;

pub use document_generator::{DocumentError, InvoiceDocumentGenerator, InvoiceDocumentInput};
pub use event_directory::{EventDirectory, EventSummary, UserContact};
pub use invoice_repository::InvoiceRepository;
pub use notification_sender::{Notification, NotificationSender};
pub use payment_gateway::{
    CreatePaymentRequest, CreateRefundRequest, GatewayEvent, GatewayEventData, GatewayEventType,
    GatewayRegistry, PaymentError, PaymentErrorCode, PaymentGateway, PaymentHandle,
    RefundReceipt,
};
pub use payment_method_catalog::PaymentMethodCatalog;
pub use payment_repository::PaymentRepository;
pub use refund_repository::RefundRepository;
pub use webhook_event_repository::{
    SaveResult, WebhookEventRecord, WebhookEventRepository, WebhookOutcome, WebhookResult,
};
