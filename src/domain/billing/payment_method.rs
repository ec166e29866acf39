//! Payment method registry entries and their fee schedules.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Money, ValidationError};

/// Gateway key of channels settled by staff rather than a remote provider.
pub const MANUAL_GATEWAY: &str = "manual";

/// Kind of payment channel a method represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    CreditCard,
    DebitCard,
    BankTransfer,
    Wallet,
    Upi,
    Paypal,
    Cash,
    Check,
    Crypto,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::CreditCard => "credit_card",
            PaymentType::DebitCard => "debit_card",
            PaymentType::BankTransfer => "bank_transfer",
            PaymentType::Wallet => "wallet",
            PaymentType::Upi => "upi",
            PaymentType::Paypal => "paypal",
            PaymentType::Cash => "cash",
            PaymentType::Check => "check",
            PaymentType::Crypto => "crypto",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "credit_card" => Ok(PaymentType::CreditCard),
            "debit_card" => Ok(PaymentType::DebitCard),
            "bank_transfer" => Ok(PaymentType::BankTransfer),
            "wallet" => Ok(PaymentType::Wallet),
            "upi" => Ok(PaymentType::Upi),
            "paypal" => Ok(PaymentType::Paypal),
            "cash" => Ok(PaymentType::Cash),
            "check" => Ok(PaymentType::Check),
            "crypto" => Ok(PaymentType::Crypto),
            other => Err(ValidationError::invalid_format(
                "payment_type",
                format!("unknown payment type '{}'", other),
            )),
        }
    }
}

/// Fees charged for paying a given amount through a method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeeBreakdown {
    pub percentage_fee: Money,
    pub fixed_fee: Money,
    pub total_fee: Money,
    /// Amount plus fees.
    pub total_amount: Money,
}

/// A configured payment channel.
///
/// `gateway` names the entry in the gateway registry that processes payments
/// made with this method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub name: String,
    pub description: String,
    pub payment_type: PaymentType,
    pub gateway: String,
    /// Percentage fee in basis points (290 = 2.90%).
    pub processing_fee_bps: i64,
    /// Fixed fee in minor units of the charged currency.
    pub processing_fee_fixed_minor: i64,
    pub is_active: bool,
    /// Seconds a pending payment stays payable (QR codes).
    pub payment_window_secs: Option<i64>,
}

impl PaymentMethod {
    /// Bank transfers and QR codes: no remote API, staff confirm receipt.
    pub fn is_manual(&self) -> bool {
        self.gateway == MANUAL_GATEWAY
    }

    pub fn calculate_fees(&self, amount: &Money) -> FeeBreakdown {
        let percentage_fee = amount.percentage(self.processing_fee_bps);
        let fixed_fee = Money::from_minor(self.processing_fee_fixed_minor, amount.currency().clone());
        let total_fee = Money::from_minor(
            percentage_fee.minor_units().saturating_add(fixed_fee.minor_units()),
            amount.currency().clone(),
        );
        let total_amount = Money::from_minor(
            amount.minor_units().saturating_add(total_fee.minor_units()),
            amount.currency().clone(),
        );
        FeeBreakdown {
            percentage_fee,
            fixed_fee,
            total_fee,
            total_amount,
        }
    }

    /// Payment channels seeded on a fresh install.
    pub fn default_channels() -> Vec<PaymentMethod> {
        vec![
            PaymentMethod {
                name: "stripe".to_string(),
                description: "Credit or debit card".to_string(),
                payment_type: PaymentType::CreditCard,
                gateway: "stripe".to_string(),
                processing_fee_bps: 290,
                processing_fee_fixed_minor: 30,
                is_active: true,
                payment_window_secs: None,
            },
            PaymentMethod {
                name: "razorpay".to_string(),
                description: "Cards, UPI and wallets via Razorpay".to_string(),
                payment_type: PaymentType::Wallet,
                gateway: "razorpay".to_string(),
                processing_fee_bps: 200,
                processing_fee_fixed_minor: 0,
                is_active: true,
                payment_window_secs: None,
            },
            PaymentMethod {
                name: "bank_transfer".to_string(),
                description: "Direct bank transfer".to_string(),
                payment_type: PaymentType::BankTransfer,
                gateway: MANUAL_GATEWAY.to_string(),
                processing_fee_bps: 0,
                processing_fee_fixed_minor: 0,
                is_active: true,
                payment_window_secs: None,
            },
            PaymentMethod {
                name: "upi_qr".to_string(),
                description: "Scan a UPI QR code".to_string(),
                payment_type: PaymentType::Upi,
                gateway: MANUAL_GATEWAY.to_string(),
                processing_fee_bps: 0,
                processing_fee_fixed_minor: 0,
                is_active: true,
                payment_window_secs: Some(120),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Currency;

    fn channel(name: &str) -> PaymentMethod {
        PaymentMethod::default_channels()
            .into_iter()
            .find(|m| m.name == name)
            .unwrap()
    }

    #[test]
    fn card_fee_combines_percentage_and_fixed() {
        let fees = channel("stripe").calculate_fees(&Money::from_minor(10_000, Currency::usd()));
        assert_eq!(fees.percentage_fee.minor_units(), 290);
        assert_eq!(fees.fixed_fee.minor_units(), 30);
        assert_eq!(fees.total_fee.minor_units(), 320);
        assert_eq!(fees.total_amount.minor_units(), 10_320);
    }

    #[test]
    fn manual_channels_are_free() {
        let fees = channel("bank_transfer").calculate_fees(&Money::from_minor(50_000, Currency::inr()));
        assert!(fees.total_fee.is_zero());
        assert_eq!(fees.total_amount.minor_units(), 50_000);
        assert!(channel("bank_transfer").is_manual());
        assert!(!channel("razorpay").is_manual());
    }

    #[test]
    fn only_upi_qr_has_a_payment_window() {
        let windows: Vec<_> = PaymentMethod::default_channels()
            .into_iter()
            .filter_map(|m| m.payment_window_secs.map(|w| (m.name, w)))
            .collect();
        assert_eq!(windows, vec![("upi_qr".to_string(), 120)]);
    }

    #[test]
    fn payment_type_parses_its_own_names() {
        for ty in [PaymentType::CreditCard, PaymentType::Upi, PaymentType::Crypto] {
            assert_eq!(PaymentType::parse(ty.as_str()).unwrap(), ty);
        }
        assert!(PaymentType::parse("barter").is_err());
    }
}
