//! Event Payments - Payment, invoice and refund lifecycle for event registrations
//!
//! Users pay for an event through a card processor, a regional wallet or a
//! manual transfer. Gateway webhooks are the authority for payment and refund
//! state; every transition is checked against an explicit state machine.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
