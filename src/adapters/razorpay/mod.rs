//! Razorpay regional wallet gateway adapter.
//!
//! Orders API checkout, refunds against captured payments, and
//! `X-Razorpay-Signature` webhook verification.

mod razorpay_gateway;
mod types;

pub use razorpay_gateway::{RazorpayConfig, RazorpayGateway, RAZORPAY_PROVIDER};
