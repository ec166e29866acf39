//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, money, errors)
//! - `billing` - Invoice, payment and refund lifecycles, payment methods

pub mod billing;
pub mod foundation;
