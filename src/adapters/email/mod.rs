//! Resend email adapter.

mod resend_sender;

pub use resend_sender::ResendNotificationSender;
