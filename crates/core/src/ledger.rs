//! Ledger reason tags and amount validation.
//!
//! Every row in `ledger_transactions` carries one of these reasons. The
//! running sum of a user's deltas is their balance; the tags exist so an
//! auditor can attribute every movement.

use crate::error::CoreError;
use crate::types::Credits;

/// Why a ledger transaction was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerReason {
    /// A hold taken before a job is admitted. Delta is `-price`.
    Reserve,
    /// Finalization marker for a successful job. Delta is zero; the debit
    /// happened at reserve time.
    Commit,
    /// Compensation for a failed or cancelled job. Delta is `+price`.
    Refund,
    /// Administrator credit grant. Delta is positive.
    Grant,
    /// Administrator correction. Delta may have either sign.
    AdminAdjust,
}

impl LedgerReason {
    /// Tag stored in the `reason` column.
    pub fn as_str(self) -> &'static str {
        match self {
            LedgerReason::Reserve => "reserve",
            LedgerReason::Commit => "commit",
            LedgerReason::Refund => "refund",
            LedgerReason::Grant => "grant",
            LedgerReason::AdminAdjust => "admin_adjust",
        }
    }

    /// Parse a stored tag.
    pub fn from_str(tag: &str) -> Option<Self> {
        match tag {
            "reserve" => Some(LedgerReason::Reserve),
            "commit" => Some(LedgerReason::Commit),
            "refund" => Some(LedgerReason::Refund),
            "grant" => Some(LedgerReason::Grant),
            "admin_adjust" => Some(LedgerReason::AdminAdjust),
            _ => None,
        }
    }
}

/// Validate an amount to be reserved. Must be strictly positive.
pub fn validate_reserve_amount(amount: Credits) -> Result<(), CoreError> {
    if amount <= 0 {
        return Err(CoreError::InvalidAmount(amount));
    }
    Ok(())
}

/// Validate an administrator grant. Zero is allowed (a no-op grant),
/// negative is not; corrections go through `AdminAdjust`.
pub fn validate_grant_amount(amount: Credits) -> Result<(), CoreError> {
    if amount < 0 {
        return Err(CoreError::InvalidAmount(amount));
    }
    Ok(())
}

/// Validate a price table entry. Prices are strictly positive.
pub fn validate_price(price: Credits) -> Result<(), CoreError> {
    if price <= 0 {
        return Err(CoreError::InvalidPrice(price));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_tags_round_trip() {
        for reason in [
            LedgerReason::Reserve,
            LedgerReason::Commit,
            LedgerReason::Refund,
            LedgerReason::Grant,
            LedgerReason::AdminAdjust,
        ] {
            assert_eq!(LedgerReason::from_str(reason.as_str()), Some(reason));
        }
    }

    #[test]
    fn unknown_reason_tag_rejected() {
        assert_eq!(LedgerReason::from_str("bonus"), None);
    }

    #[test]
    fn zero_reserve_rejected() {
        assert!(validate_reserve_amount(0).is_err());
    }

    #[test]
    fn negative_reserve_rejected() {
        assert!(validate_reserve_amount(-5).is_err());
    }

    #[test]
    fn positive_reserve_accepted() {
        assert!(validate_reserve_amount(40).is_ok());
    }

    #[test]
    fn zero_grant_accepted() {
        assert!(validate_grant_amount(0).is_ok());
    }

    #[test]
    fn negative_grant_rejected() {
        assert!(validate_grant_amount(-1).is_err());
    }

    #[test]
    fn zero_price_rejected() {
        assert!(validate_price(0).is_err());
    }

    #[test]
    fn negative_price_rejected() {
        assert!(validate_price(-10).is_err());
    }

    #[test]
    fn positive_price_accepted() {
        assert!(validate_price(20).is_ok());
    }
}
