//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the billing domain to external systems:
//! - `stripe`, `razorpay`, `manual` - Payment gateways
//! - `mock` - Configurable gateway for tests
//! - `postgres` - SQLx repositories
//! - `memory` - In-memory repositories for tests and local runs
//! - `email` - Resend notification sender
//! - `document` - Invoice rendering
//! - `http` - Axum REST API

pub mod document;
pub mod email;
pub mod http;
pub mod manual;
pub mod memory;
pub mod mock;
pub mod postgres;
pub mod razorpay;
pub mod stripe;
