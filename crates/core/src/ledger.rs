//! Ledger service types and monetary arithmetic rules.
//!
//! All monetary amounts are decimals rounded to two places at storage time.
//! `profit_loss` is derived here at write time (income minus expenses) and
//! the database enforces the same relation with a CHECK constraint, so
//! aggregation can trust the stored column without re-deriving it.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Service types
// ---------------------------------------------------------------------------

/// Booking service modules a financial record can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Hotel,
    Visa,
    Transport,
    Ticket,
    Umrah,
    Other,
}

/// All valid service types.
pub const ALL_SERVICE_TYPES: &[ServiceType] = &[
    ServiceType::Hotel,
    ServiceType::Visa,
    ServiceType::Transport,
    ServiceType::Ticket,
    ServiceType::Umrah,
    ServiceType::Other,
];

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Hotel => "hotel",
            ServiceType::Visa => "visa",
            ServiceType::Transport => "transport",
            ServiceType::Ticket => "ticket",
            ServiceType::Umrah => "umrah",
            ServiceType::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "hotel" => Ok(ServiceType::Hotel),
            "visa" => Ok(ServiceType::Visa),
            "transport" => Ok(ServiceType::Transport),
            "ticket" => Ok(ServiceType::Ticket),
            "umrah" => Ok(ServiceType::Umrah),
            "other" => Ok(ServiceType::Other),
            unknown => Err(CoreError::Validation(format!(
                "Unknown service type '{unknown}'. Must be one of: hotel, visa, transport, ticket, umrah, other"
            ))),
        }
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Monetary arithmetic
// ---------------------------------------------------------------------------

/// Round a monetary amount to two decimal places (half up).
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Derive the stored `profit_loss` value: rounded income minus rounded expenses.
pub fn derive_profit(income: Decimal, expenses: Decimal) -> Decimal {
    round_money(income) - round_money(expenses)
}

/// Reject negative monetary inputs before they reach storage.
pub fn validate_amount(field: &'static str, amount: Decimal) -> Result<(), CoreError> {
    if amount.is_sign_negative() {
        return Err(CoreError::Validation(format!(
            "{field} must not be negative, got {amount}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn service_types_round_trip() {
        for st in ALL_SERVICE_TYPES {
            assert_eq!(ServiceType::parse(st.as_str()).unwrap(), *st);
        }
    }

    #[test]
    fn unknown_service_type_rejected() {
        assert!(ServiceType::parse("cargo").is_err());
    }

    #[test]
    fn rounds_half_up_to_two_places() {
        assert_eq!(round_money(dec("10.005")), dec("10.01"));
        assert_eq!(round_money(dec("10.004")), dec("10.00"));
    }

    #[test]
    fn profit_is_income_minus_expenses() {
        assert_eq!(derive_profit(dec("1500.00"), dec("400.50")), dec("1099.50"));
    }

    #[test]
    fn profit_can_be_negative() {
        assert_eq!(derive_profit(dec("100"), dec("250.25")), dec("-150.25"));
    }

    #[test]
    fn profit_rounds_inputs_first() {
        // 100.005 -> 100.01, 0.004 -> 0.00
        assert_eq!(derive_profit(dec("100.005"), dec("0.004")), dec("100.01"));
    }

    #[test]
    fn negative_amounts_rejected() {
        assert!(validate_amount("income_amount", dec("-1")).is_err());
        assert!(validate_amount("income_amount", dec("0")).is_ok());
    }
}
