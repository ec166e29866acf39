//! Strongly-typed identifier value objects.
//!
//! Two families live here: internal UUID identifiers for aggregates, and the
//! short human-facing references (`INV…`, `PAY…`, `REF…`) that are safe to show
//! to users and to pass to gateways as correlation metadata.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id!(
    /// Identifier of an event a user pays for (owned by the event directory).
    EventId
);
uuid_id!(
    /// Unique identifier for an invoice.
    InvoiceId
);
uuid_id!(
    /// Unique identifier for a payment attempt.
    PaymentId
);
uuid_id!(
    /// Unique identifier for a refund.
    RefundId
);

/// User identifier from the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a UserId, rejecting empty values.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("user_id"));
        }
        Ok(Self(id))
    }

    /// Returns the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! reference {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// Generates a fresh reference: the prefix followed by eight
            /// upper-case hex characters.
            pub fn generate() -> Self {
                Self(short_reference(Self::PREFIX))
            }

            /// Parses a stored or user-supplied reference.
            pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
                let value = value.into();
                let field = stringify!($name);
                let Some(suffix) = value.strip_prefix(Self::PREFIX) else {
                    return Err(ValidationError::invalid_format(
                        field,
                        format!("must start with {}", Self::PREFIX),
                    ));
                };
                if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_alphanumeric()) {
                    return Err(ValidationError::invalid_format(
                        field,
                        "suffix must be alphanumeric",
                    ));
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

reference!(
    /// Human-facing invoice number, e.g. `INV3FA91C07`.
    InvoiceNumber,
    "INV"
);
reference!(
    /// External-safe payment identifier returned to clients as `payment_id`.
    PaymentReference,
    "PAY"
);
reference!(
    /// External-safe refund identifier.
    RefundReference,
    "REF"
);

fn short_reference(prefix: &str) -> String {
    let simple = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("{}{}", prefix, &simple[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_are_unique() {
        assert_ne!(PaymentId::new(), PaymentId::new());
    }

    #[test]
    fn uuid_id_parses_from_string() {
        let id = InvoiceId::new();
        let parsed: InvoiceId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn event_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<EventId>().is_err());
    }

    #[test]
    fn user_id_rejects_blank() {
        assert!(UserId::new("   ").is_err());
        assert_eq!(UserId::new("user-1").unwrap().as_str(), "user-1");
    }

    #[test]
    fn generated_references_have_prefix_and_eight_hex_chars() {
        let reference = PaymentReference::generate();
        let s = reference.as_str();
        assert!(s.starts_with("PAY"));
        assert_eq!(s.len(), 11);
        assert!(s[3..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn reference_parse_checks_prefix() {
        assert!(InvoiceNumber::parse("INV0A1B2C3D").is_ok());
        assert!(InvoiceNumber::parse("PAY0A1B2C3D").is_err());
        assert!(RefundReference::parse("REF").is_err());
        assert!(RefundReference::parse("REF12-34").is_err());
    }
}
